//! Name index over every loaded managed type
//!
//! Built once at start-up and extended on each module-loaded notification.
//! Also records the native names declared by obfuscation attributes, in both
//! directions.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use tracing::{debug, error, info};

use crate::backend::{ManagedRuntime, ModuleInfo};
use crate::type_definition::TypeRef;
use crate::Error;

#[derive(Default)]
pub struct TypeIndex {
    /// Full name -> type. The first module to define a name wins.
    types: DashMap<String, TypeRef>,
    /// Native (obfuscated) full name -> managed type
    deobfuscated: DashMap<String, TypeRef>,
    /// Managed full name -> native (obfuscated) full name
    obfuscated: DashMap<String, String>,
    fully_indexed: AtomicBool,
}

impl TypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index one module and return the types it added.
    ///
    /// A module whose types cannot be enumerated is logged and skipped.
    pub fn index_module(&self, managed: &dyn ManagedRuntime, module: &ModuleInfo) -> Vec<TypeRef> {
        let types = match managed.module_types(module) {
            Ok(types) => types,
            Err(source) => {
                let err = Error::ReflectionScan {
                    context: format!("module {}", module.name),
                    source,
                };
                error!(error = ?err, "{}", err);
                return Vec::new();
            }
        };

        let mut added = Vec::new();
        for ty in types {
            let full_name = ty.full_name();

            if let Some(native_name) = &ty.obfuscated_name {
                self.deobfuscated
                    .entry(native_name.clone())
                    .or_insert_with(|| ty.clone());
                self.obfuscated
                    .entry(full_name.clone())
                    .or_insert_with(|| native_name.clone());
            }

            let mut inserted = false;
            self.types.entry(full_name).or_insert_with(|| {
                inserted = true;
                ty.clone()
            });
            if inserted {
                added.push(ty);
            }
        }

        debug!("Indexed {} new types from {}", added.len(), module.name);
        added
    }

    /// Index every module currently loaded.
    pub fn index_all(&self, managed: &dyn ManagedRuntime) -> usize {
        let modules = managed.modules();
        let added: usize = modules
            .iter()
            .map(|module| self.index_module(managed, module).len())
            .sum();

        self.fully_indexed.store(true, Ordering::Release);
        info!("Indexed {} types from {} modules", added, modules.len());
        added
    }

    /// Look a type up by full name, asking the managed runtime on a miss.
    pub fn type_by_name(&self, managed: &dyn ManagedRuntime, full_name: &str) -> Option<TypeRef> {
        if let Some(ty) = self.types.get(full_name) {
            return Some(ty.value().clone());
        }

        let ty = managed.find_type(full_name)?;
        Some(
            self.types
                .entry(full_name.to_string())
                .or_insert(ty)
                .value()
                .clone(),
        )
    }

    /// Managed type whose obfuscation attribute names `native_name`.
    pub fn find_deobfuscated(&self, managed: &dyn ManagedRuntime, native_name: &str) -> Option<TypeRef> {
        if let Some(ty) = self.deobfuscated.get(native_name) {
            return Some(ty.value().clone());
        }

        if !self.fully_indexed.load(Ordering::Acquire) {
            self.index_all(managed);
            return self.deobfuscated.get(native_name).map(|ty| ty.value().clone());
        }

        None
    }

    pub fn obfuscated_name(&self, managed_full_name: &str) -> Option<String> {
        self.obfuscated
            .get(managed_full_name)
            .map(|name| name.value().clone())
    }

    pub fn snapshot(&self) -> Vec<TypeRef> {
        self.types.iter().map(|ty| ty.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
