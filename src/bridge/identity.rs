//! Actual runtime type of a live object
//!
//! Wrapper objects frequently carry an erased static type (`Il2CppSystem.Object`
//! for anything that came back through a native collection). The real type is
//! recovered from the native class of the instance and matched back to a
//! managed wrapper type, by injection registry, by name, or by obfuscation
//! attribute.

use tracing::{debug, trace};

use super::ReflectionBridge;
use crate::common::type_name::{native_to_wrapper_name, wrapper_to_native_name};
use crate::common::{ClassHandle, NativePtr, TypeName};
use crate::object::ObjectHandle;
use crate::type_definition::{ManagedType, TypeIdentity, TypeRef};

impl ReflectionBridge {
    /// Most specific runtime type of `object`.
    ///
    /// Without a native runtime this is always the managed-side type.
    pub fn actual_type_of(&self, object: &ObjectHandle) -> TypeIdentity {
        match object {
            ObjectHandle::Managed(obj) => TypeIdentity::Managed(obj.managed_type().clone()),
            ObjectHandle::Wrapper(obj) => {
                let declared = obj.managed_type();

                if declared.full_name() == self.config.native_type_descriptor {
                    return TypeIdentity::Managed(self.descriptor_type());
                }
                if self.is_concrete(declared) {
                    return TypeIdentity::Managed(declared.clone());
                }

                match self.identity_of_pointer(obj.pointer()) {
                    Some(TypeIdentity::Native(_)) | None => TypeIdentity::Managed(declared.clone()),
                    Some(identity) => identity,
                }
            }
            ObjectHandle::Native(ptr) => self
                .identity_of_pointer(*ptr)
                .unwrap_or_else(|| TypeIdentity::Managed(self.object_type())),
        }
    }

    /// Native class behind a type identity, cached per managed type.
    pub fn native_class_of(&self, identity: &TypeIdentity) -> Option<ClassHandle> {
        match identity {
            TypeIdentity::Native(class) | TypeIdentity::Bridged { class, .. } => Some(*class),
            TypeIdentity::Managed(ty) => self.class_of_type(ty),
        }
    }

    /// Native class of a wrapper type, found by its native name.
    pub(crate) fn class_of_type(&self, ty: &ManagedType) -> Option<ClassHandle> {
        let native = self.native.as_ref()?;
        if !ty.is_wrapper {
            return None;
        }

        self.class_handles
            .get_or_try_init(ty.key(), || {
                let native_name = match &ty.obfuscated_name {
                    Some(name) => name.clone(),
                    None => wrapper_to_native_name(&ty.full_name(), &self.config.wrapper_system_prefix),
                };
                native
                    .class_from_name(&TypeName::parse(&native_name))
                    .ok_or(())
            })
            .ok()
    }

    /// Native class by native full name
    pub(crate) fn named_class(&self, native_full_name: &str) -> Option<ClassHandle> {
        let native = self.native.as_ref()?;
        self.named_classes
            .get_or_try_init(native_full_name.to_string(), || {
                native
                    .class_from_name(&TypeName::parse(native_full_name))
                    .ok_or(())
            })
            .ok()
    }

    /// Sentinel type for native runtime type objects
    pub fn descriptor_type(&self) -> TypeRef {
        self.descriptor_type
            .get_or_init(|| self.well_known(&self.config.native_type_descriptor))
            .clone()
    }

    /// Root wrapper type, for native objects whose class cannot be read
    fn object_type(&self) -> TypeRef {
        self.object_type
            .get_or_init(|| {
                let name = self
                    .config
                    .erased_wrapper_types
                    .first()
                    .map_or("Il2CppSystem.Object", String::as_str);
                self.well_known(name)
            })
            .clone()
    }

    fn well_known(&self, full_name: &str) -> TypeRef {
        self.type_by_name(full_name).unwrap_or_else(|| {
            let name = TypeName::parse(full_name);
            ManagedType::class(name.namespace, name.name).wrapper().into_ref()
        })
    }

    /// The declared type is as specific as it gets.
    fn is_concrete(&self, ty: &ManagedType) -> bool {
        if self.config.is_erased_wrapper(&ty.full_name()) {
            return false;
        }
        ty.is_final() || self.config.is_concrete_namespace(&ty.namespace)
    }

    fn identity_of_pointer(&self, ptr: NativePtr) -> Option<TypeIdentity> {
        let native = self.native.as_ref()?;
        let class = native.class_of(ptr)?;
        let name = native.class_name(class);

        if let Some(name) = &name {
            if self.config.is_native_type_class(&name.full_name()) {
                return Some(TypeIdentity::Managed(self.descriptor_type()));
            }
        }

        Some(match self.resolve_class(class, name.as_ref()) {
            Some(managed) => TypeIdentity::Bridged { managed, class },
            None => TypeIdentity::Native(class),
        })
    }

    /// Match a native class to a managed type.
    fn resolve_class(&self, class: ClassHandle, name: Option<&TypeName>) -> Option<TypeRef> {
        let native = self.native.as_ref()?;

        if let Some(injected) = native.injected_type(class) {
            trace!("{} is injected type {}", class, injected);
            self.class_handles.insert(injected.key(), class);
            return Some(injected);
        }

        let native_name = name?.full_name();
        if let Some(ty) = self.native_types.get(&native_name) {
            return Some(ty.value().clone());
        }

        let wrapper_name = native_to_wrapper_name(&native_name, &self.config.wrapper_system_prefix);
        let found = self
            .type_by_name(&wrapper_name)
            .or_else(|| self.index.find_deobfuscated(self.managed.as_ref(), &native_name))?;

        debug!("Matched native class {} to {}", native_name, found);
        self.class_handles.insert(found.key(), class);
        Some(
            self.native_types
                .entry(native_name)
                .or_insert(found)
                .value()
                .clone(),
        )
    }
}
