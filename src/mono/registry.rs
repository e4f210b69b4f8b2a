//! Managed type registry
//!
//! The host's reflection layer pushes each loaded assembly into the registry
//! (types and their declared members); the bridge reads it back through the
//! `ManagedRuntime` trait.

use std::collections::HashSet;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info};

use super::manifest::ModuleManifest;
use crate::backend::{BackendError, ManagedRuntime, ModuleInfo, ModuleLoadedCallback};
use crate::common::NativePtr;
use crate::member_definition::{signature_of, FieldInfo, MethodInfo, PropertyInfo, TypeMembers};
use crate::object::ObjectHandle;
use crate::type_definition::{ManagedType, TypeRef};

/// Managed runtime backed by host-fed type descriptors
#[derive(Default)]
pub struct ManagedRegistry {
    modules: RwLock<Vec<ModuleInfo>>,
    module_types: DashMap<String, Vec<TypeRef>>,
    /// Full name -> type. The first module to define a name wins.
    types: DashMap<String, TypeRef>,
    /// Type key -> declared (not inherited) members
    members: DashMap<String, TypeMembers>,
    subscribers: RwLock<Vec<ModuleLoadedCallback>>,
}

impl ManagedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loaded module and notify subscribers.
    ///
    /// Types with no assembly are assigned to the module.
    pub fn load_module(&self, module: ModuleInfo, types: Vec<ManagedType>) -> Vec<TypeRef> {
        let types: Vec<TypeRef> = types
            .into_iter()
            .map(|mut ty| {
                if ty.assembly.is_empty() {
                    ty.assembly = module.name.clone();
                }
                ty.into_ref()
            })
            .collect();

        for ty in &types {
            self.types
                .entry(ty.full_name())
                .or_insert_with(|| ty.clone());
        }
        self.module_types.insert(module.name.clone(), types.clone());

        {
            let mut modules = self.modules.write();
            if !modules.iter().any(|m| m.name == module.name) {
                modules.push(module.clone());
            }
        }

        info!("Loaded module {} with {} types", module.name, types.len());

        // Callbacks may call back into the registry, so no lock is held here
        let subscribers = self.subscribers.read().clone();
        for callback in subscribers {
            callback(&module);
        }

        types
    }

    /// Register a module from its JSON manifest.
    pub fn load_manifest(&self, json: &str) -> Result<Vec<TypeRef>, BackendError> {
        let manifest = ModuleManifest::from_json(json)?;
        let module = manifest.module;

        let (types, members): (Vec<ManagedType>, Vec<TypeMembers>) = manifest
            .types
            .into_iter()
            .map(|entry| (entry.ty, entry.members))
            .unzip();

        // Members first: subscribers may look them up during the notification
        for (ty, members) in types.iter().zip(members) {
            let mut key_type = ty.clone();
            if key_type.assembly.is_empty() {
                key_type.assembly = module.name.clone();
            }
            self.set_members(&key_type, members);
        }

        Ok(self.load_module(module, types))
    }

    /// Replace the declared members of a type
    pub fn set_members(&self, ty: &ManagedType, members: TypeMembers) {
        debug!(
            "{}: {} fields, {} properties, {} methods",
            ty,
            members.fields.len(),
            members.properties.len(),
            members.methods.len()
        );
        self.members.insert(ty.key(), members);
    }

    /// Declared members of `ty` followed by those of each base type.
    ///
    /// A base member is skipped when a more derived type already declares one
    /// with the same `hide_key` (overrides and `new` redeclarations). Members
    /// declared side by side on one type are all kept.
    fn collect<T, F, K>(&self, ty: &ManagedType, select: F, hide_key: K) -> Result<Vec<T>, BackendError>
    where
        T: Clone,
        F: Fn(&TypeMembers) -> &[T],
        K: Fn(&T) -> String,
    {
        if !self.types.contains_key(&ty.full_name()) && !self.members.contains_key(&ty.key()) {
            return Err(BackendError::TypeNotFound(ty.full_name()));
        }

        let mut result = Vec::new();
        let mut hidden = HashSet::new();
        let mut seen = HashSet::new();
        let mut current = Some(ty.key());
        let mut base = ty.base_type.clone();

        while let Some(key) = current.take() {
            if !seen.insert(key.clone()) {
                break;
            }
            if let Some(members) = self.members.get(&key) {
                let declared: Vec<&T> = select(members.value())
                    .iter()
                    .filter(|&member| !hidden.contains(&hide_key(member)))
                    .collect();
                hidden.extend(declared.iter().map(|&member| hide_key(member)));
                result.extend(declared.into_iter().cloned());
            }

            if let Some(base_type) = base.take().and_then(|name| self.find_type(&name)) {
                current = Some(base_type.key());
                base = base_type.base_type.clone();
            }
        }

        Ok(result)
    }

    #[cfg(test)]
    pub fn type_named(&self, full_name: &str) -> TypeRef {
        self.find_type(full_name)
            .unwrap_or_else(|| panic!("no registered type {}", full_name))
    }
}

impl ManagedRuntime for ManagedRegistry {
    fn runtime_name(&self) -> &'static str {
        "Mono"
    }

    fn modules(&self) -> Vec<ModuleInfo> {
        self.modules.read().clone()
    }

    fn module_types(&self, module: &ModuleInfo) -> Result<Vec<TypeRef>, BackendError> {
        self.module_types
            .get(&module.name)
            .map(|types| types.value().clone())
            .ok_or_else(|| BackendError::ScanFailed {
                target: module.name.clone(),
                reason: "module not loaded".to_string(),
            })
    }

    fn find_type(&self, full_name: &str) -> Option<TypeRef> {
        self.types.get(full_name).map(|ty| ty.value().clone())
    }

    fn fields(&self, ty: &ManagedType) -> Result<Vec<FieldInfo>, BackendError> {
        self.collect(ty, |members| members.fields.as_slice(), |field| field.name.clone())
    }

    fn properties(&self, ty: &ManagedType) -> Result<Vec<PropertyInfo>, BackendError> {
        self.collect(
            ty,
            |members| members.properties.as_slice(),
            |property| {
                let index = property.index_parameters.iter().map(|p| p.type_name.as_str());
                format!("{}[{}]", property.name, signature_of(index))
            },
        )
    }

    fn methods(&self, ty: &ManagedType) -> Result<Vec<MethodInfo>, BackendError> {
        self.collect(
            ty,
            |members| members.methods.as_slice(),
            |method| format!("{}`{}({})", method.name, method.generic_arity, method.signature()),
        )
    }

    fn construct_wrapper(&self, ty: &TypeRef, ptr: NativePtr) -> Option<ObjectHandle> {
        if ty.is_wrapper && !ty.is_interface && !ty.is_abstract {
            Some(ObjectHandle::wrapper(ty.clone(), ptr))
        } else {
            None
        }
    }

    fn subscribe_module_loaded(&self, callback: ModuleLoadedCallback) {
        self.subscribers.write().push(callback);
    }
}
