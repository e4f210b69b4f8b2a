//! Best-effort casts and cross-model reference equality

use tracing::{debug, warn};

use super::ReflectionBridge;
use crate::object::ObjectHandle;
use crate::type_definition::TypeIdentity;

impl ReflectionBridge {
    /// Reinterpret `object` as `target`.
    ///
    /// Never fails: when the instance's native class is not assignable to the
    /// target, or anything needed for the check is unavailable, the input
    /// handle is returned unchanged.
    pub fn cast(&self, object: &ObjectHandle, target: &TypeIdentity) -> ObjectHandle {
        self.try_cast(object, target)
            .unwrap_or_else(|| object.clone())
    }

    fn try_cast(&self, object: &ObjectHandle, target: &TypeIdentity) -> Option<ObjectHandle> {
        let native = self.native.as_ref()?;
        let ptr = object.native_ptr()?;

        let Some(target_class) = self.native_class_of(target) else {
            debug!("Cast of {} to {}: target has no native class", object, target);
            return None;
        };
        let source_class = native.class_of(ptr)?;

        if !native.is_assignable_from(target_class, source_class) {
            warn!("Cannot cast {} to {}", object, target);
            return None;
        }

        let Some(target_type) = target.managed() else {
            return Some(ObjectHandle::Native(ptr));
        };

        if let ObjectHandle::Wrapper(wrapper) = object {
            if wrapper.managed_type() == target_type {
                return Some(object.clone());
            }
        }

        if native.injected_type(target_class).is_some() {
            if let Some(existing) = native.injected_wrapper(ptr) {
                return Some(existing);
            }
        }

        let cast = self.managed.construct_wrapper(target_type, ptr);
        if cast.is_none() {
            warn!("{} has no pointer constructor, cannot cast {}", target_type, object);
        }
        cast
    }

    /// Identity across object models.
    ///
    /// True for the same managed allocation, and for any two handles over the
    /// same native instance even when their wrappers are distinct.
    pub fn reference_equals(&self, a: &ObjectHandle, b: &ObjectHandle) -> bool {
        if a.is_same_allocation(b) {
            return true;
        }
        match (a.native_ptr(), b.native_ptr()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }
}
