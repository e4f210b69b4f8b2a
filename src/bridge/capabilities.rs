//! Assignability and collection classification across both type systems
//!
//! The managed answer is tried first. Wrapper types only mirror part of the
//! native hierarchy (native interfaces in particular are often missing), so a
//! negative managed answer falls back to asking the native runtime.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tracing::trace;

use super::ReflectionBridge;
use crate::common::type_name::{generic_definition_name, native_to_wrapper_name};
use crate::common::ClassKind;
use crate::type_definition::{ManagedType, TypeIdentity};

/// Never enumerable, although it exposes child iteration.
pub const TRANSFORM_TYPE: &str = "UnityEngine.Transform";

const OBJECT_TYPE: &str = "System.Object";

/// Transitive base types and interfaces of a type, by full name
#[derive(Debug, Default)]
pub(crate) struct Ancestry {
    /// Nearest first
    pub bases: Vec<String>,
    pub interfaces: BTreeSet<String>,
    /// Every base and interface name resolved to a loaded type
    pub complete: bool,
}

impl Ancestry {
    fn has_base(&self, full_name: &str) -> bool {
        self.bases.iter().any(|base| base == full_name)
    }

    fn has_interface(&self, full_name: &str) -> bool {
        self.interfaces
            .iter()
            .any(|iface| iface == full_name || generic_definition_name(iface) == full_name)
    }
}

/// Element types of a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryTypes {
    Sequence(String),
    Dictionary { key: String, value: String },
}

impl ReflectionBridge {
    /// Ancestry of `ty`. Only complete closures are cached; one that stops at
    /// a type not loaded yet is recomputed on the next query.
    pub(crate) fn ancestry(&self, ty: &ManagedType) -> Arc<Ancestry> {
        let key = ty.key();
        self.ancestry
            .get_or_try_init(key.clone(), || {
                let ancestry = Arc::new(self.compute_ancestry(ty));
                if ancestry.complete {
                    self.incomplete_ancestry.remove(&key);
                    Ok(ancestry)
                } else {
                    trace!("Ancestry of {} is incomplete", ty);
                    self.incomplete_ancestry
                        .entry(key.clone())
                        .or_insert_with(|| Arc::new(ty.clone()));
                    Err(ancestry)
                }
            })
            .unwrap_or_else(|partial| partial)
    }

    fn compute_ancestry(&self, ty: &ManagedType) -> Ancestry {
        let mut ancestry = Ancestry {
            complete: true,
            ..Ancestry::default()
        };
        let mut pending: Vec<String> = ty.interfaces.clone();
        let mut seen = HashSet::new();
        seen.insert(ty.full_name());

        let mut current = ty.base_type.clone();
        while let Some(base) = current.take() {
            if !seen.insert(base.clone()) {
                break;
            }
            match self.type_by_name(&base) {
                Some(base_type) => {
                    pending.extend(base_type.interfaces.iter().cloned());
                    current = base_type.base_type.clone();
                }
                None => ancestry.complete = false,
            }
            ancestry.bases.push(base);
        }

        while let Some(iface) = pending.pop() {
            if !ancestry.interfaces.insert(iface.clone()) {
                continue;
            }
            match self.type_by_name(&iface) {
                Some(iface_type) => pending.extend(iface_type.interfaces.iter().cloned()),
                None => ancestry.complete = false,
            }
        }

        ancestry
    }

    /// Full names of every base type, nearest first
    pub fn base_types(&self, ty: &ManagedType) -> Vec<String> {
        self.ancestry(ty).bases.clone()
    }

    /// Full names of every implemented interface, inherited ones included
    pub fn interfaces_of(&self, ty: &ManagedType) -> Vec<String> {
        self.ancestry(ty).interfaces.iter().cloned().collect()
    }

    pub(crate) fn managed_assignable(&self, target: &ManagedType, source: &ManagedType) -> bool {
        let target_name = target.full_name();
        if target == source || target_name == OBJECT_TYPE {
            return true;
        }
        // An open definition accepts any of its instances
        if target_name == source.full_name() {
            return target.generic_arguments.is_empty() || target.generic_arguments == source.generic_arguments;
        }

        let ancestry = self.ancestry(source);
        if target.is_interface {
            ancestry.has_interface(&target_name)
        } else {
            ancestry.has_base(&target_name)
        }
    }

    /// Whether a value of `source` can be used where `target` is expected.
    pub fn is_assignable_from(&self, target: &TypeIdentity, source: &TypeIdentity) -> bool {
        if let (Some(t), Some(s)) = (target.managed(), source.managed()) {
            if self.managed_assignable(t, s) {
                return true;
            }
        }

        let Some(native) = self.native.as_ref() else {
            return false;
        };
        match (self.native_class_of(target), self.native_class_of(source)) {
            (Some(t), Some(s)) => native.is_assignable_from(t, s),
            _ => false,
        }
    }

    pub fn is_enumerable_like(&self, ty: &TypeIdentity) -> bool {
        if self.is_transform(ty) {
            return false;
        }

        if let Some(managed) = ty.managed() {
            if managed.kind == ClassKind::Array {
                return true;
            }
            if self.implements_managed(
                managed,
                &self.config.enumerable_interfaces,
                &self.config.native_enumerable_interfaces,
            ) {
                return true;
            }
        }

        self.implements_native(ty, &self.config.native_enumerable_interfaces)
    }

    pub fn is_dictionary_like(&self, ty: &TypeIdentity) -> bool {
        if let Some(managed) = ty.managed() {
            if self.implements_managed(
                managed,
                &self.config.dictionary_interfaces,
                &self.config.native_dictionary_interfaces,
            ) {
                return true;
            }
        }

        self.implements_native(ty, &self.config.native_dictionary_interfaces)
    }

    /// Key/value or element types of a collection type, `None` if it is not
    /// one. Missing generic arguments default to `System.Object`.
    pub fn entry_types(&self, ty: &ManagedType) -> Option<EntryTypes> {
        let identity = TypeIdentity::Managed(Arc::new(ty.clone()));
        let argument = |i: usize| {
            ty.generic_arguments
                .get(i)
                .cloned()
                .unwrap_or_else(|| OBJECT_TYPE.to_string())
        };

        if self.is_dictionary_like(&identity) {
            return Some(EntryTypes::Dictionary {
                key: argument(0),
                value: argument(1),
            });
        }

        if !self.is_enumerable_like(&identity) {
            return None;
        }

        if ty.kind == ClassKind::Array {
            let full_name = ty.full_name();
            let element = full_name.strip_suffix("[]").unwrap_or(&full_name);
            return Some(EntryTypes::Sequence(element.to_string()));
        }
        Some(EntryTypes::Sequence(argument(0)))
    }

    fn is_transform(&self, ty: &TypeIdentity) -> bool {
        if let Some(managed) = ty.managed() {
            if managed.full_name() == TRANSFORM_TYPE || self.ancestry(managed).has_base(TRANSFORM_TYPE) {
                return true;
            }
        }

        match (self.native.as_ref(), ty) {
            (Some(native), TypeIdentity::Native(class)) => self
                .named_class(TRANSFORM_TYPE)
                .map_or(false, |transform| native.is_assignable_from(transform, *class)),
            _ => false,
        }
    }

    /// Managed interface check. Native names are also tried under their
    /// wrapper names.
    fn implements_managed(&self, ty: &ManagedType, managed_names: &[String], native_names: &[String]) -> bool {
        let prefix = &self.config.wrapper_system_prefix;
        let full_name = ty.full_name();
        let definition = generic_definition_name(&full_name);

        let mut candidates = managed_names
            .iter()
            .cloned()
            .chain(native_names.iter().map(|name| native_to_wrapper_name(name, prefix)));

        candidates.any(|name| {
            name == full_name || name == definition || self.ancestry(ty).has_interface(&name)
        })
    }

    fn implements_native(&self, ty: &TypeIdentity, native_names: &[String]) -> bool {
        let Some(native) = self.native.as_ref() else {
            return false;
        };
        let Some(class) = self.native_class_of(ty) else {
            return false;
        };

        native_names.iter().any(|name| {
            self.named_class(name)
                .map_or(false, |iface| native.is_assignable_from(iface, class))
        })
    }
}

#[cfg(all(test, feature = "mono"))]
mod tests {
    use super::*;
    use crate::backend::mock::{fixture, managed_only};

    #[test]
    fn test_transform_is_never_enumerable() {
        let fx = fixture();
        let transform = fx.registry.type_named(TRANSFORM_TYPE);

        // Both sides say it implements IEnumerable
        assert!(fx
            .bridge
            .interfaces_of(&transform)
            .contains(&"Il2CppSystem.Collections.IEnumerable".to_string()));
        assert!(fx.native.implements("UnityEngine.Transform", "System.Collections.IEnumerable"));

        assert!(!fx.bridge.is_enumerable_like(&TypeIdentity::Managed(transform)));
        let rect = fx.registry.type_named("UnityEngine.RectTransform");
        assert!(!fx.bridge.is_enumerable_like(&TypeIdentity::Managed(rect)));
        assert!(!fx
            .bridge
            .is_enumerable_like(&TypeIdentity::Native(fx.native.class(TRANSFORM_TYPE))));
    }

    #[test]
    fn test_managed_enumerable_and_dictionary() {
        let (registry, bridge) = managed_only();

        let list = TypeIdentity::Managed(registry.type_named("System.Collections.Generic.List`1"));
        assert!(bridge.is_enumerable_like(&list));
        assert!(!bridge.is_dictionary_like(&list));

        let dict = TypeIdentity::Managed(registry.type_named("System.Collections.Generic.Dictionary`2"));
        assert!(bridge.is_dictionary_like(&dict));
        assert!(bridge.is_enumerable_like(&dict));

        let player = TypeIdentity::Managed(registry.type_named("Game.Player"));
        assert!(!bridge.is_enumerable_like(&player));
    }

    #[test]
    fn test_native_enumerable_fallback() {
        let fx = fixture();

        // The wrapper type does not declare the interface, the native class does
        let inventory = fx.registry.type_named("Game.Inventory");
        assert!(inventory.interfaces.is_empty());
        assert!(fx.bridge.is_enumerable_like(&TypeIdentity::Managed(inventory)));
        assert!(!fx.bridge.is_dictionary_like(&TypeIdentity::Managed(fx.registry.type_named("Game.Player"))));
    }

    #[test]
    fn test_managed_assignability() {
        let (registry, bridge) = managed_only();
        let id = |name: &str| TypeIdentity::Managed(registry.type_named(name));

        assert!(bridge.is_assignable_from(&id("Game.Player"), &id("Game.Boss")));
        assert!(bridge.is_assignable_from(&id("UnityEngine.Component"), &id("Game.Boss")));
        assert!(!bridge.is_assignable_from(&id("Game.Boss"), &id("Game.Player")));
        assert!(bridge.is_assignable_from(
            &id("System.Collections.IEnumerable"),
            &id("System.Collections.Generic.List`1")
        ));
        assert!(bridge.is_assignable_from(&id("System.Object"), &id("Game.Player")));
        assert_eq!(
            bridge.base_types(&registry.type_named("Game.Boss")),
            vec![
                "Game.Player".to_string(),
                "UnityEngine.Component".to_string(),
                "UnityEngine.Object".to_string(),
                "Il2CppSystem.Object".to_string(),
            ]
        );
    }

    #[test]
    fn test_native_assignability_fallback() {
        let fx = fixture();
        let secret = TypeIdentity::Native(fx.native.class("Game.Secret"));
        let component = TypeIdentity::Managed(fx.registry.type_named("UnityEngine.Component"));

        assert!(fx.bridge.is_assignable_from(&component, &secret));
        assert!(!fx.bridge.is_assignable_from(&secret, &component));
    }

    #[test]
    fn test_entry_types() {
        let (registry, bridge) = managed_only();

        let dict = registry.type_named("System.Collections.Generic.Dictionary`2");
        assert_eq!(
            bridge.entry_types(&dict),
            Some(EntryTypes::Dictionary {
                key: OBJECT_TYPE.to_string(),
                value: OBJECT_TYPE.to_string(),
            })
        );

        let strings = ManagedType::class("System.Collections.Generic", "List`1")
            .in_assembly("mscorlib")
            .with_interfaces(["System.Collections.Generic.IEnumerable`1[[System.String]]"])
            .with_generic_arguments(["System.String"]);
        assert_eq!(
            bridge.entry_types(&strings),
            Some(EntryTypes::Sequence("System.String".to_string()))
        );

        let mut array = ManagedType::class("System", "Int32[]").in_assembly("mscorlib");
        array.kind = ClassKind::Array;
        assert_eq!(
            bridge.entry_types(&array),
            Some(EntryTypes::Sequence("System.Int32".to_string()))
        );

        assert_eq!(bridge.entry_types(&registry.type_named("Game.Player")), None);
    }
}
