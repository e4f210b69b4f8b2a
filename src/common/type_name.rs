//! Namespace-qualified type names and the renaming rules between the two sides
//!
//! Wrapper assemblies re-home the native `System.*` types under a prefixed
//! namespace (`Il2CppSystem.*`), so the same class has a different full name
//! depending on which side is asking.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeName {
    pub namespace: String,
    pub name: String,
}

impl TypeName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        TypeName {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Split a full name at the last namespace separator outside of any
    /// generic argument list.
    pub fn parse(full_name: &str) -> Self {
        let head = generic_definition_name(full_name);
        match head.rfind('.') {
            Some(idx) => TypeName {
                namespace: full_name[..idx].to_string(),
                name: full_name[idx + 1..].to_string(),
            },
            None => TypeName {
                namespace: String::new(),
                name: full_name.to_string(),
            },
        }
    }

    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.namespace, self.name)
        }
    }
}

/// Strip generic arguments from a full name:
/// ``System.Collections.Generic.List`1[[System.Int32]]`` becomes
/// ``System.Collections.Generic.List`1``.
pub fn generic_definition_name(full_name: &str) -> &str {
    match full_name.find(&['[', '<'][..]) {
        Some(idx) => &full_name[..idx],
        None => full_name,
    }
}

/// Map a native full name to the name the wrapper assemblies give it.
///
/// A native type can never live in the managed `System` namespace, so every
/// `System.*` name gets the wrapper prefix.
pub fn native_to_wrapper_name(native_full_name: &str, prefix: &str) -> String {
    if native_full_name == "System" || native_full_name.starts_with("System.") {
        format!("{}{}", prefix, native_full_name)
    } else {
        native_full_name.to_string()
    }
}

/// Inverse of [`native_to_wrapper_name`].
pub fn wrapper_to_native_name(managed_full_name: &str, prefix: &str) -> String {
    match managed_full_name.strip_prefix(prefix) {
        Some(rest) if rest == "System" || rest.starts_with("System.") => rest.to_string(),
        _ => managed_full_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_name() {
        let name = TypeName::parse("UnityEngine.Transform");
        assert_eq!(name.namespace, "UnityEngine");
        assert_eq!(name.name, "Transform");

        let global = TypeName::parse("GameManager");
        assert_eq!(global.namespace, "");
        assert_eq!(global.full_name(), "GameManager");

        let generic = TypeName::parse("System.Collections.Generic.List`1[[System.Int32]]");
        assert_eq!(generic.namespace, "System.Collections.Generic");
        assert_eq!(generic.name, "List`1[[System.Int32]]");
    }

    #[test]
    fn test_system_prefix_mapping() {
        assert_eq!(
            native_to_wrapper_name("System.Collections.IEnumerable", "Il2Cpp"),
            "Il2CppSystem.Collections.IEnumerable"
        );
        assert_eq!(native_to_wrapper_name("UnityEngine.Camera", "Il2Cpp"), "UnityEngine.Camera");
        assert_eq!(native_to_wrapper_name("SystemManager", "Il2Cpp"), "SystemManager");

        assert_eq!(wrapper_to_native_name("Il2CppSystem.Type", "Il2Cpp"), "System.Type");
        assert_eq!(wrapper_to_native_name("Il2CppSystemX.Foo", "Il2Cpp"), "Il2CppSystemX.Foo");
    }

    #[test]
    fn test_generic_definition_name() {
        assert_eq!(
            generic_definition_name("System.Collections.Generic.IEnumerable`1[[System.String]]"),
            "System.Collections.Generic.IEnumerable`1"
        );
        assert_eq!(generic_definition_name("Foo<Bar>"), "Foo");
        assert_eq!(generic_definition_name("Plain"), "Plain");
    }
}
