//! Raw native handles shared by the Mono and IL2CPP sides
//!
//! Everything native is an address. These newtypes keep the three kinds of
//! address (instances, classes, functions) from being mixed up.

use std::fmt;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// Address of a live native object instance (`Il2CppObject*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NativePtr(NonZeroUsize);

impl NativePtr {
    /// Wrap a raw address, `None` for null
    pub fn new(addr: usize) -> Option<Self> {
        NonZeroUsize::new(addr).map(NativePtr)
    }

    pub fn from_raw<T>(ptr: *const T) -> Option<Self> {
        Self::new(ptr as usize)
    }

    pub fn addr(self) -> usize {
        self.0.get()
    }

    pub fn as_ptr<T>(self) -> *mut T {
        self.0.get() as *mut T
    }
}

impl fmt::Display for NativePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Address of a native class descriptor (`Il2CppClass*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassHandle(NonZeroUsize);

impl ClassHandle {
    pub fn new(addr: usize) -> Option<Self> {
        NonZeroUsize::new(addr).map(ClassHandle)
    }

    pub fn from_raw<T>(ptr: *const T) -> Option<Self> {
        Self::new(ptr as usize)
    }

    pub fn addr(self) -> usize {
        self.0.get()
    }

    pub fn as_ptr<T>(self) -> *mut T {
        self.0.get() as *mut T
    }
}

impl fmt::Display for ClassHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class@0x{:x}", self.0)
    }
}

/// A resolved native function pointer.
///
/// Immutable once resolved; the resolver keeps it for the lifetime of the
/// process, so copies can be handed out freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeSymbol(NonZeroUsize);

impl NativeSymbol {
    pub fn new(addr: usize) -> Option<Self> {
        NonZeroUsize::new(addr).map(NativeSymbol)
    }

    pub fn addr(self) -> usize {
        self.0.get()
    }

    /// Reinterpret the symbol as a function pointer type.
    ///
    /// # Safety
    /// `F` must be a function pointer type whose signature matches the native
    /// function behind this address.
    pub unsafe fn cast<F: Copy>(self) -> F {
        debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of::<usize>());
        let addr = self.0.get();
        std::mem::transmute_copy::<usize, F>(&addr)
    }
}

impl fmt::Display for NativeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn@0x{:x}", self.0)
    }
}
