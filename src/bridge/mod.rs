//! The reflection bridge
//!
//! [`ReflectionBridge`] owns every cache the bridge keeps. Caches only grow:
//! a key goes from missing to populated once and is never evicted for the
//! life of the bridge. The host normally creates one bridge per process with
//! [`ReflectionBridge::start`]; tests build a fresh one per case.

mod cache;
mod capabilities;
mod casting;
mod identity;
mod implementors;
mod members;
mod symbols;
mod type_index;

pub use cache::OnceMap;
pub use capabilities::{EntryTypes, TRANSFORM_TYPE};
pub use implementors::{implementation_key, ImplementorFilter, ImplementorSet};
pub use members::MemberCache;
pub use symbols::SymbolResolver;
pub use type_index::TypeIndex;

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::backend::{ManagedRuntime, ModuleInfo, NativeRuntime, SharedManaged, SharedNative};
use crate::common::type_name::generic_definition_name;
use crate::common::ClassHandle;
use crate::config::BridgeConfig;
use crate::type_definition::TypeRef;

use capabilities::Ancestry;

pub struct ReflectionBridge {
    config: BridgeConfig,
    managed: SharedManaged,
    native: Option<SharedNative>,
    symbols: SymbolResolver,
    index: TypeIndex,
    members: MemberCache,
    /// (implementation key of the base, filter) -> implementor set
    implementors: DashMap<(String, ImplementorFilter), Arc<ImplementorSet>>,
    /// Native full name -> managed type it was matched to
    native_types: DashMap<String, TypeRef>,
    /// Managed type key -> native class. Only hits are stored.
    class_handles: OnceMap<String, ClassHandle>,
    /// Native full name -> native class. Only hits are stored.
    named_classes: OnceMap<String, ClassHandle>,
    ancestry: OnceMap<String, Arc<Ancestry>>,
    /// Type key -> type whose ancestry stopped at a type not loaded yet
    incomplete_ancestry: DashMap<String, TypeRef>,
    descriptor_type: OnceCell<TypeRef>,
    object_type: OnceCell<TypeRef>,
}

impl ReflectionBridge {
    /// Create a bridge without indexing or subscribing to anything.
    ///
    /// Types are then indexed lazily as they are looked up.
    pub fn new(managed: SharedManaged, native: Option<SharedNative>, config: BridgeConfig) -> Self {
        ReflectionBridge {
            symbols: SymbolResolver::new(native.clone()),
            config,
            managed,
            native,
            index: TypeIndex::new(),
            members: MemberCache::new(),
            implementors: DashMap::new(),
            native_types: DashMap::new(),
            class_handles: OnceMap::new(),
            named_classes: OnceMap::new(),
            ancestry: OnceMap::new(),
            incomplete_ancestry: DashMap::new(),
            descriptor_type: OnceCell::new(),
            object_type: OnceCell::new(),
        }
    }

    /// Create a bridge, subscribe it to module-loaded notifications and index
    /// every module loaded so far.
    ///
    /// The subscription comes first so no module can slip in between the
    /// initial scan and the first notification.
    pub fn start(managed: SharedManaged, native: Option<SharedNative>, config: BridgeConfig) -> Arc<Self> {
        let bridge = Arc::new(Self::new(managed, native, config));

        let weak = Arc::downgrade(&bridge);
        bridge.managed.subscribe_module_loaded(Arc::new(move |module: &ModuleInfo| {
            if let Some(bridge) = weak.upgrade() {
                bridge.on_module_loaded(module);
            }
        }));

        bridge.index.index_all(bridge.managed.as_ref());
        info!(
            "Reflection bridge started on {} ({})",
            bridge.managed.runtime_name(),
            bridge
                .native
                .as_ref()
                .map_or("no native runtime", |native| native.runtime_name())
        );
        bridge
    }

    /// Merge a freshly loaded module into the type index and into every
    /// implementor set built so far.
    ///
    /// Types whose ancestry was incomplete are checked again alongside the
    /// new ones, since the module may supply their missing bases. Resolved
    /// symbols are unaffected: signatures are stable for the life of the
    /// process.
    pub fn on_module_loaded(&self, module: &ModuleInfo) {
        let added = self.index.index_module(self.managed.as_ref(), module);
        if added.is_empty() {
            return;
        }

        let retried: Vec<TypeRef> = self
            .incomplete_ancestry
            .iter()
            .map(|ty| ty.value().clone())
            .collect();
        let candidates: Vec<TypeRef> = added.iter().chain(retried.iter()).cloned().collect();

        let sets: Vec<Arc<ImplementorSet>> = self
            .implementors
            .iter()
            .map(|set| set.value().clone())
            .collect();
        for set in &sets {
            self.merge_into(set, &candidates);
        }

        debug!(
            "Module {} added {} types ({} retried), {} implementor sets updated",
            module.name,
            added.len(),
            retried.len(),
            sets.len()
        );
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn managed(&self) -> &dyn ManagedRuntime {
        self.managed.as_ref()
    }

    pub fn native(&self) -> Option<&dyn NativeRuntime> {
        self.native.as_deref()
    }

    pub fn symbols(&self) -> &SymbolResolver {
        &self.symbols
    }

    pub fn members(&self) -> &MemberCache {
        &self.members
    }

    pub fn type_index(&self) -> &TypeIndex {
        &self.index
    }

    /// Look a loaded type up by full name. Generic instance names fall back
    /// to their definition.
    pub fn type_by_name(&self, full_name: &str) -> Option<TypeRef> {
        self.index
            .type_by_name(self.managed.as_ref(), full_name)
            .or_else(|| {
                let definition = generic_definition_name(full_name);
                if definition == full_name {
                    None
                } else {
                    self.index.type_by_name(self.managed.as_ref(), definition)
                }
            })
    }

    /// Managed full name matched to a native (possibly obfuscated) class name
    pub fn deobfuscated_name(&self, native_full_name: &str) -> Option<String> {
        if let Some(ty) = self.native_types.get(native_full_name) {
            return Some(ty.value().full_name());
        }
        self.index
            .find_deobfuscated(self.managed.as_ref(), native_full_name)
            .map(|ty| ty.full_name())
    }

    /// Native name an obfuscated managed type was generated from
    pub fn obfuscated_name(&self, managed_full_name: &str) -> Option<String> {
        self.index.obfuscated_name(managed_full_name)
    }
}
