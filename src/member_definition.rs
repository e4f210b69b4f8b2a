//! Field, property and method descriptors and the keys they are cached under

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::type_definition::ManagedType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub name: String,
    /// Full name of the parameter type
    pub type_name: String,
}

impl ParameterInfo {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        ParameterInfo {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub field_type: String,
    #[serde(default)]
    pub is_static: bool,
}

impl FieldInfo {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        FieldInfo {
            name: name.into(),
            field_type: field_type.into(),
            is_static: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub name: String,
    pub property_type: String,
    #[serde(default = "default_true")]
    pub can_read: bool,
    #[serde(default)]
    pub can_write: bool,
    #[serde(default)]
    pub is_static: bool,
    /// Non-empty for indexers
    #[serde(default)]
    pub index_parameters: Vec<ParameterInfo>,
}

fn default_true() -> bool {
    true
}

impl PropertyInfo {
    pub fn new(name: impl Into<String>, property_type: impl Into<String>) -> Self {
        PropertyInfo {
            name: name.into(),
            property_type: property_type.into(),
            can_read: true,
            can_write: false,
            is_static: false,
            index_parameters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodInfo {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterInfo>,
    #[serde(default = "default_void")]
    pub return_type: String,
    #[serde(default)]
    pub is_static: bool,
    /// Number of generic parameters on the method itself
    #[serde(default)]
    pub generic_arity: u32,
    /// Constraint type names on the method's generic parameters
    #[serde(default)]
    pub generic_constraints: Vec<String>,
}

fn default_void() -> String {
    "System.Void".to_string()
}

impl MethodInfo {
    pub fn new<I>(name: impl Into<String>, parameters: I) -> Self
    where
        I: IntoIterator<Item = ParameterInfo>,
    {
        MethodInfo {
            name: name.into(),
            parameters: parameters.into_iter().collect(),
            return_type: default_void(),
            is_static: false,
            generic_arity: 0,
            generic_constraints: Vec::new(),
        }
    }

    pub fn returning(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = return_type.into();
        self
    }

    /// Textual parameter signature used to tell overloads apart
    pub fn signature(&self) -> String {
        signature_of(self.parameters.iter().map(|p| p.type_name.as_str()))
    }
}

/// Everything the reflection layer reports for one type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeMembers {
    pub fields: Vec<FieldInfo>,
    pub properties: Vec<PropertyInfo>,
    pub methods: Vec<MethodInfo>,
}

/// Build the overload signature from parameter type full names
pub fn signature_of<'a, I>(param_types: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    param_types.into_iter().collect::<Vec<_>>().join(",")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Field,
    Property,
    Method,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Field => write!(f, "field"),
            MemberKind::Property => write!(f, "property"),
            MemberKind::Method => write!(f, "method"),
        }
    }
}

/// Cache key for one member lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberLookupKey {
    /// `assembly::Namespace.Name` of the declaring type
    pub declaring: String,
    pub kind: MemberKind,
    pub name: String,
    /// Parameter signature, methods only
    pub signature: Option<String>,
}

impl MemberLookupKey {
    pub fn new(declaring: &ManagedType, kind: MemberKind, name: &str, signature: Option<String>) -> Self {
        MemberLookupKey {
            declaring: declaring.key(),
            kind,
            name: name.to_string(),
            signature,
        }
    }
}

impl fmt::Display for MemberLookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.signature {
            Some(sig) => write!(f, "{} {}.{}({})", self.kind, self.declaring, self.name, sig),
            None => write!(f, "{} {}.{}", self.kind, self.declaring, self.name),
        }
    }
}
