//! Registry of classes injected into the native type system at runtime
//!
//! A plugin that registers its own managed class with IL2CPP gets a native
//! class handle back. Instances of that class already have a managed object
//! attached, which must be reused rather than wrapped a second time.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tracing::debug;

use crate::common::{ClassHandle, NativePtr};
use crate::object::{ObjectHandle, WrapperObject};
use crate::type_definition::TypeRef;

#[derive(Default)]
pub struct InjectionRegistry {
    classes: DashMap<ClassHandle, TypeRef>,
    /// Native instance -> the managed object attached to it
    instances: DashMap<NativePtr, Weak<WrapperObject>>,
}

impl InjectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_class(&self, class: ClassHandle, ty: TypeRef) {
        debug!("Injected class {} -> {}", class, ty);
        self.classes.insert(class, ty);
    }

    /// Remember the managed object of an injected instance.
    pub fn attach(&self, object: &Arc<WrapperObject>) {
        self.instances.insert(object.pointer(), Arc::downgrade(object));
    }

    pub fn type_for(&self, class: ClassHandle) -> Option<TypeRef> {
        self.classes.get(&class).map(|ty| ty.value().clone())
    }

    /// Live managed object attached to `ptr`. Dead entries are dropped.
    pub fn wrapper_for(&self, ptr: NativePtr) -> Option<ObjectHandle> {
        let weak = self.instances.get(&ptr)?.value().clone();
        match weak.upgrade() {
            Some(object) => Some(ObjectHandle::Wrapper(object)),
            None => {
                self.instances.remove(&ptr);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
