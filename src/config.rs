//! Bridge configuration
//!
//! Names of the well-known types the bridge has to recognise. They differ
//! between wrapper generators (Unhollower vs Il2CppInterop) and Unity versions,
//! so they are data rather than constants.

use serde::{Deserialize, Serialize};

use crate::backend::detection::IL2CPP_LIBRARY;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// File name of the IL2CPP runtime library
    pub native_library: String,
    /// Managed type every native runtime type object maps to
    pub native_type_descriptor: String,
    /// Native names of runtime type objects
    pub native_type_classes: Vec<String>,
    /// Wrapper base types that say nothing about the real runtime type
    pub erased_wrapper_types: Vec<String>,
    /// Namespaces whose wrapper types are taken at face value
    pub concrete_namespaces: Vec<String>,
    /// Prefix wrapper assemblies put in front of native `System.*` names
    pub wrapper_system_prefix: String,
    /// Managed interfaces that make a type enumerable
    pub enumerable_interfaces: Vec<String>,
    /// Native names of the runtime's own enumerable interfaces
    pub native_enumerable_interfaces: Vec<String>,
    /// Managed interfaces that make a type a dictionary
    pub dictionary_interfaces: Vec<String>,
    /// Native names of the runtime's own dictionary interfaces
    pub native_dictionary_interfaces: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            native_library: IL2CPP_LIBRARY.to_string(),
            native_type_descriptor: "Il2CppSystem.Type".to_string(),
            native_type_classes: vec!["System.Type".to_string(), "System.RuntimeType".to_string()],
            erased_wrapper_types: vec![
                "Il2CppSystem.Object".to_string(),
                "Il2CppInterop.Runtime.InteropTypes.Il2CppObjectBase".to_string(),
                "UnhollowerBaseLib.Il2CppObjectBase".to_string(),
            ],
            concrete_namespaces: vec!["System.".to_string(), "Il2CppSystem.".to_string()],
            wrapper_system_prefix: "Il2Cpp".to_string(),
            enumerable_interfaces: vec![
                "System.Collections.IEnumerable".to_string(),
                "System.Collections.Generic.IEnumerable`1".to_string(),
            ],
            native_enumerable_interfaces: vec![
                "System.Collections.IEnumerable".to_string(),
            ],
            dictionary_interfaces: vec![
                "System.Collections.IDictionary".to_string(),
                "System.Collections.Generic.IDictionary`2".to_string(),
            ],
            native_dictionary_interfaces: vec!["System.Collections.IDictionary".to_string()],
        }
    }
}

impl BridgeConfig {
    /// Parse a JSON config; missing keys keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_erased_wrapper(&self, full_name: &str) -> bool {
        self.erased_wrapper_types.iter().any(|t| t == full_name)
    }

    pub fn is_concrete_namespace(&self, namespace: &str) -> bool {
        self.concrete_namespaces.iter().any(|prefix| {
            let bare = prefix.trim_end_matches('.');
            namespace == bare || namespace.starts_with(prefix.as_str())
        })
    }

    pub fn is_native_type_class(&self, native_full_name: &str) -> bool {
        self.native_type_classes.iter().any(|t| t == native_full_name)
    }
}
