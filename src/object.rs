//! Handles to live instances on either side of the bridge

use std::fmt;
use std::sync::Arc;

use crate::common::NativePtr;
use crate::type_definition::TypeRef;

/// A plain managed instance with no native backing
#[derive(Debug)]
pub struct ManagedObject {
    ty: TypeRef,
}

impl ManagedObject {
    pub fn new(ty: TypeRef) -> Arc<Self> {
        Arc::new(ManagedObject { ty })
    }

    pub fn managed_type(&self) -> &TypeRef {
        &self.ty
    }
}

/// A managed proxy allocated around a native instance.
///
/// Several wrappers can exist for the same native pointer, each with its own
/// managed identity.
#[derive(Debug)]
pub struct WrapperObject {
    ty: TypeRef,
    ptr: NativePtr,
}

impl WrapperObject {
    pub fn new(ty: TypeRef, ptr: NativePtr) -> Arc<Self> {
        Arc::new(WrapperObject { ty, ptr })
    }

    pub fn managed_type(&self) -> &TypeRef {
        &self.ty
    }

    pub fn pointer(&self) -> NativePtr {
        self.ptr
    }
}

/// Which type system owns an instance's representation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Managed,
    Wrapper,
    Native,
}

#[derive(Debug, Clone)]
pub enum ObjectHandle {
    Managed(Arc<ManagedObject>),
    Wrapper(Arc<WrapperObject>),
    /// A native instance nothing on the managed side has wrapped
    Native(NativePtr),
}

impl ObjectHandle {
    pub fn managed(ty: TypeRef) -> Self {
        ObjectHandle::Managed(ManagedObject::new(ty))
    }

    pub fn wrapper(ty: TypeRef, ptr: NativePtr) -> Self {
        ObjectHandle::Wrapper(WrapperObject::new(ty, ptr))
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            ObjectHandle::Managed(_) => ObjectKind::Managed,
            ObjectHandle::Wrapper(_) => ObjectKind::Wrapper,
            ObjectHandle::Native(_) => ObjectKind::Native,
        }
    }

    /// Static managed type of the handle, if it has a managed side
    pub fn managed_type(&self) -> Option<&TypeRef> {
        match self {
            ObjectHandle::Managed(obj) => Some(obj.managed_type()),
            ObjectHandle::Wrapper(obj) => Some(obj.managed_type()),
            ObjectHandle::Native(_) => None,
        }
    }

    pub fn native_ptr(&self) -> Option<NativePtr> {
        match self {
            ObjectHandle::Managed(_) => None,
            ObjectHandle::Wrapper(obj) => Some(obj.pointer()),
            ObjectHandle::Native(ptr) => Some(*ptr),
        }
    }

    /// Managed reference equality: the very same allocation.
    pub fn is_same_allocation(&self, other: &ObjectHandle) -> bool {
        match (self, other) {
            (ObjectHandle::Managed(a), ObjectHandle::Managed(b)) => Arc::ptr_eq(a, b),
            (ObjectHandle::Wrapper(a), ObjectHandle::Wrapper(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectHandle::Managed(obj) => write!(f, "{}", obj.managed_type()),
            ObjectHandle::Wrapper(obj) => write!(f, "{} @ {}", obj.managed_type(), obj.pointer()),
            ObjectHandle::Native(ptr) => write!(f, "<native> @ {}", ptr),
        }
    }
}
