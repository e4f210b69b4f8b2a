//! Memoised field, property and method lookups
//!
//! Every lookup key is scanned at most once. "Not found", "ambiguous" and
//! "scan failed" are all cached as `None`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{error, trace, warn};

use super::cache::OnceMap;
use super::ReflectionBridge;
use crate::backend::{BackendError, ManagedRuntime};
use crate::member_definition::{
    signature_of, FieldInfo, MemberKind, MemberLookupKey, MethodInfo, PropertyInfo,
};
use crate::type_definition::ManagedType;
use crate::Error;

#[derive(Default)]
pub struct MemberCache {
    fields: OnceMap<MemberLookupKey, Option<Arc<FieldInfo>>>,
    properties: OnceMap<MemberLookupKey, Option<Arc<PropertyInfo>>>,
    methods: OnceMap<MemberLookupKey, Option<Arc<MethodInfo>>>,
    scans: AtomicUsize,
}

impl MemberCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reflection scans performed so far
    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::Relaxed)
    }

    /// Number of cached lookups, including misses
    pub fn len(&self) -> usize {
        self.fields.len() + self.properties.len() + self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn field(&self, managed: &dyn ManagedRuntime, ty: &ManagedType, name: &str) -> Option<Arc<FieldInfo>> {
        let key = MemberLookupKey::new(ty, MemberKind::Field, name, None);
        self.fields.get_or_init(key.clone(), || {
            self.scan(&key, ty, || managed.fields(ty), |field: &FieldInfo| field.name == name)
        })
    }

    pub fn property(&self, managed: &dyn ManagedRuntime, ty: &ManagedType, name: &str) -> Option<Arc<PropertyInfo>> {
        let key = MemberLookupKey::new(ty, MemberKind::Property, name, None);
        self.properties.get_or_init(key.clone(), || {
            self.scan(&key, ty, || managed.properties(ty), |property: &PropertyInfo| {
                property.name == name && property.index_parameters.is_empty()
            })
        })
    }

    pub fn method(
        &self,
        managed: &dyn ManagedRuntime,
        ty: &ManagedType,
        name: &str,
        parameter_types: &[&str],
    ) -> Option<Arc<MethodInfo>> {
        let signature = signature_of(parameter_types.iter().copied());
        let key = MemberLookupKey::new(ty, MemberKind::Method, name, Some(signature.clone()));
        self.methods.get_or_init(key.clone(), || {
            self.scan(&key, ty, || managed.methods(ty), |method: &MethodInfo| {
                method.name == name && method.signature() == signature
            })
        })
    }

    fn scan<T, L, M>(&self, key: &MemberLookupKey, ty: &ManagedType, list: L, matches: M) -> Option<Arc<T>>
    where
        L: FnOnce() -> Result<Vec<T>, BackendError>,
        M: Fn(&T) -> bool,
    {
        self.scans.fetch_add(1, Ordering::Relaxed);
        trace!("Scanning for {}", key);

        let members = match list() {
            Ok(members) => members,
            Err(source) => {
                let err = Error::ReflectionScan {
                    context: key.to_string(),
                    source,
                };
                error!(error = ?err, "{}", err);
                return None;
            }
        };

        let mut found: Vec<T> = members.into_iter().filter(|m| matches(m)).collect();
        match found.len() {
            0 => None,
            1 => found.pop().map(Arc::new),
            candidates => {
                let err = Error::AmbiguousMember {
                    type_name: ty.full_name(),
                    kind: key.kind,
                    member: key.name.clone(),
                    candidates,
                };
                warn!("{}", err);
                None
            }
        }
    }
}

impl ReflectionBridge {
    pub fn get_field(&self, ty: &ManagedType, name: &str) -> Option<Arc<FieldInfo>> {
        self.members.field(self.managed.as_ref(), ty, name)
    }

    pub fn get_property(&self, ty: &ManagedType, name: &str) -> Option<Arc<PropertyInfo>> {
        self.members.property(self.managed.as_ref(), ty, name)
    }

    /// Look a method up by name and parameter type full names.
    pub fn get_method(&self, ty: &ManagedType, name: &str, parameter_types: &[&str]) -> Option<Arc<MethodInfo>> {
        self.members.method(self.managed.as_ref(), ty, name, parameter_types)
    }
}
