//! Managed type descriptors and the unified type identity
//!
//! A [`ManagedType`] is what the managed reflection layer knows about a type.
//! A [`TypeIdentity`] is what the bridge hands out: the managed view, the
//! native class, or both once they have been matched up.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::common::{ClassHandle, ClassKind, TypeName};

/// Shared managed type descriptor
pub type TypeRef = Arc<ManagedType>;

/// Variance of a generic parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variance {
    #[default]
    Invariant,
    Covariant,
    Contravariant,
}

/// Special (non-type) constraints on a generic parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialConstraints {
    /// `where T : class`
    pub reference_type: bool,
    /// `where T : struct`
    pub value_type: bool,
    /// `where T : new()`
    pub default_constructor: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenericParameter {
    pub variance: Variance,
    pub constraints: SpecialConstraints,
    /// Full names of the types the parameter is constrained to
    pub constraint_types: Vec<String>,
}

/// Managed-side type descriptor, as reported by the host's reflection layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagedType {
    pub namespace: String,
    pub name: String,
    pub assembly: String,
    pub kind: ClassKind,
    pub is_interface: bool,
    pub is_value_type: bool,
    pub is_enum: bool,
    pub is_abstract: bool,
    pub is_sealed: bool,
    /// Managed proxy over a native class, constructible from a native pointer
    pub is_wrapper: bool,
    pub has_default_constructor: bool,
    pub base_type: Option<String>,
    /// Directly implemented interfaces, by full name
    pub interfaces: Vec<String>,
    pub generic_arguments: Vec<String>,
    pub generic_parameter: Option<GenericParameter>,
    /// Native name declared by an obfuscation attribute on the managed type
    pub obfuscated_name: Option<String>,
}

impl ManagedType {
    pub fn class(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        ManagedType {
            namespace: namespace.into(),
            name: name.into(),
            has_default_constructor: true,
            ..Default::default()
        }
    }

    pub fn interface(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        ManagedType {
            namespace: namespace.into(),
            name: name.into(),
            is_interface: true,
            is_abstract: true,
            ..Default::default()
        }
    }

    pub fn generic_parameter(name: impl Into<String>, parameter: GenericParameter) -> Self {
        ManagedType {
            name: name.into(),
            kind: ClassKind::GenericParam,
            generic_parameter: Some(parameter),
            ..Default::default()
        }
    }

    pub fn in_assembly(mut self, assembly: impl Into<String>) -> Self {
        self.assembly = assembly.into();
        self
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base_type = Some(base.into());
        self
    }

    pub fn with_interfaces<I, S>(mut self, interfaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interfaces.extend(interfaces.into_iter().map(Into::into));
        self
    }

    pub fn with_generic_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kind = ClassKind::GenericInst;
        self.generic_arguments.extend(arguments.into_iter().map(Into::into));
        self
    }

    pub fn wrapper(mut self) -> Self {
        self.is_wrapper = true;
        self
    }

    pub fn sealed(mut self) -> Self {
        self.is_sealed = true;
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn value_type(mut self) -> Self {
        self.is_value_type = true;
        self.is_sealed = true;
        self
    }

    pub fn obfuscated_as(mut self, native_name: impl Into<String>) -> Self {
        self.obfuscated_name = Some(native_name.into());
        self
    }

    pub fn into_ref(self) -> TypeRef {
        Arc::new(self)
    }

    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// Cache key unique per loaded type: `assembly::Namespace.Name`, with
    /// generic arguments appended for constructed generics.
    pub fn key(&self) -> String {
        if self.generic_arguments.is_empty() {
            format!("{}::{}", self.assembly, self.full_name())
        } else {
            format!(
                "{}::{}[{}]",
                self.assembly,
                self.full_name(),
                self.generic_arguments.join(",")
            )
        }
    }

    pub fn type_name(&self) -> TypeName {
        TypeName::new(self.namespace.clone(), self.name.clone())
    }

    pub fn is_generic_parameter(&self) -> bool {
        self.kind == ClassKind::GenericParam
    }

    /// No instance can have a more derived runtime type than this one.
    pub fn is_final(&self) -> bool {
        self.is_sealed || self.is_value_type || self.is_enum
    }
}

impl PartialEq for ManagedType {
    fn eq(&self, other: &Self) -> bool {
        self.assembly == other.assembly
            && self.namespace == other.namespace
            && self.name == other.name
            && self.generic_arguments == other.generic_arguments
    }
}

impl Eq for ManagedType {}

impl Hash for ManagedType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.assembly.hash(state);
        self.namespace.hash(state);
        self.name.hash(state);
        self.generic_arguments.hash(state);
    }
}

impl fmt::Display for ManagedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.namespace, self.name)
        }
    }
}

/// Unified view of a type across the managed and native type systems.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeIdentity {
    /// Known only to managed reflection (plain Mono types, or wrappers whose
    /// native class has not been matched yet)
    Managed(TypeRef),
    /// A native class with no managed counterpart
    Native(ClassHandle),
    /// A managed type matched to its native class
    Bridged { managed: TypeRef, class: ClassHandle },
}

impl TypeIdentity {
    pub fn managed(&self) -> Option<&TypeRef> {
        match self {
            TypeIdentity::Managed(ty) | TypeIdentity::Bridged { managed: ty, .. } => Some(ty),
            TypeIdentity::Native(_) => None,
        }
    }

    pub fn native_class(&self) -> Option<ClassHandle> {
        match self {
            TypeIdentity::Native(class) | TypeIdentity::Bridged { class, .. } => Some(*class),
            TypeIdentity::Managed(_) => None,
        }
    }
}

impl From<TypeRef> for TypeIdentity {
    fn from(ty: TypeRef) -> Self {
        TypeIdentity::Managed(ty)
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeIdentity::Managed(ty) => write!(f, "{}", ty),
            TypeIdentity::Native(class) => write!(f, "{}", class),
            TypeIdentity::Bridged { managed, class } => write!(f, "{} ({})", managed, class),
        }
    }
}
