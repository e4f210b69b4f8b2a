//! Sets of loaded concrete types assignable to a base type
//!
//! A set is built from the type index on first request and then kept up to
//! date by merging each newly loaded module into it.

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing::debug;

use super::ReflectionBridge;
use crate::type_definition::{GenericParameter, ManagedType, TypeRef, Variance};

/// Which kinds of type count as implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImplementorFilter {
    pub allow_abstract: bool,
    pub allow_generic: bool,
    pub allow_enum: bool,
}

impl Default for ImplementorFilter {
    fn default() -> Self {
        ImplementorFilter {
            allow_abstract: false,
            allow_generic: false,
            allow_enum: true,
        }
    }
}

impl ImplementorFilter {
    fn admits(&self, ty: &ManagedType) -> bool {
        if ty.is_interface || ty.is_generic_parameter() {
            return false;
        }
        (self.allow_abstract || !ty.is_abstract)
            && (self.allow_generic || !ty.kind.is_generic_open())
            && (self.allow_enum || !ty.is_enum)
    }
}

/// Set key of a base type.
///
/// Generic parameters have no meaningful name: two parameters with the same
/// variance and constraints accept the same types, so they share a set.
pub fn implementation_key(ty: &ManagedType) -> String {
    match &ty.generic_parameter {
        Some(parameter) => parameter_key(parameter),
        None => ty.full_name(),
    }
}

fn parameter_key(parameter: &GenericParameter) -> String {
    let variance = match parameter.variance {
        Variance::Invariant => "invariant",
        Variance::Covariant => "out",
        Variance::Contravariant => "in",
    };

    let mut special = Vec::new();
    if parameter.constraints.reference_type {
        special.push("class");
    }
    if parameter.constraints.value_type {
        special.push("struct");
    }
    if parameter.constraints.default_constructor {
        special.push("new()");
    }

    let mut types = parameter.constraint_types.clone();
    types.sort();

    format!("{}:{}~{}", variance, special.join(","), types.join(","))
}

pub struct ImplementorSet {
    base: TypeRef,
    filter: ImplementorFilter,
    /// Type key -> type
    types: RwLock<BTreeMap<String, TypeRef>>,
    populated: OnceCell<()>,
}

impl ImplementorSet {
    fn new(base: TypeRef, filter: ImplementorFilter) -> Self {
        ImplementorSet {
            base,
            filter,
            types: RwLock::new(BTreeMap::new()),
            populated: OnceCell::new(),
        }
    }

    pub fn base(&self) -> &TypeRef {
        &self.base
    }

    pub fn filter(&self) -> ImplementorFilter {
        self.filter
    }

    /// Members ordered by type key
    pub fn types(&self) -> Vec<TypeRef> {
        self.types.read().values().cloned().collect()
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.types.read().values().any(|ty| ty.full_name() == full_name)
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, ty: TypeRef) {
        self.types.write().entry(ty.key()).or_insert(ty);
    }
}

impl ReflectionBridge {
    /// Every loaded type assignable to `base` that `filter` admits.
    pub fn implementations_of(&self, base: &TypeRef, filter: ImplementorFilter) -> Arc<ImplementorSet> {
        let key = (implementation_key(base), filter);
        let set = self
            .implementors
            .entry(key)
            .or_insert_with(|| Arc::new(ImplementorSet::new(base.clone(), filter)))
            .value()
            .clone();

        set.populated.get_or_init(|| {
            let candidates = self.index.snapshot();
            self.merge_into(&set, &candidates);
            debug!("Built implementor set of {} with {} types", set.base, set.len());
        });
        set
    }

    pub(crate) fn merge_into(&self, set: &ImplementorSet, candidates: &[TypeRef]) {
        for ty in candidates {
            if set.filter.admits(ty) && self.implements(&set.base, ty) {
                set.insert(ty.clone());
            }
        }
    }

    fn implements(&self, base: &ManagedType, ty: &ManagedType) -> bool {
        match &base.generic_parameter {
            Some(parameter) => self.satisfies(parameter, ty),
            None => self.managed_assignable(base, ty),
        }
    }

    fn satisfies(&self, parameter: &GenericParameter, ty: &ManagedType) -> bool {
        let constraints = parameter.constraints;
        if constraints.reference_type && ty.is_value_type {
            return false;
        }
        if constraints.value_type && !ty.is_value_type {
            return false;
        }
        if constraints.default_constructor && !(ty.has_default_constructor || ty.is_value_type) {
            return false;
        }

        parameter.constraint_types.iter().all(|name| match self.type_by_name(name) {
            Some(constraint) => self.managed_assignable(&constraint, ty),
            None => false,
        })
    }
}
