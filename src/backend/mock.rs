//! Test doubles for the runtime backends
//!
//! `MockNative` simulates an IL2CPP runtime with an in-memory class table;
//! the managed side is a real `ManagedRegistry` filled with a small Unity-like
//! type world.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::{BackendError, ManagedRuntime, ModuleInfo, ModuleLoadedCallback, NativeRuntime, SharedManaged, SharedNative};
use crate::bridge::ReflectionBridge;
use crate::common::{ClassHandle, NativePtr, TypeName};
use crate::config::BridgeConfig;
use crate::member_definition::{FieldInfo, MethodInfo, PropertyInfo, TypeMembers};
use crate::mono::ManagedRegistry;
use crate::object::ObjectHandle;
use crate::type_definition::{ManagedType, TypeRef};

struct MockClass {
    name: TypeName,
    parents: Vec<ClassHandle>,
}

pub struct MockNative {
    symbols: DashMap<String, usize>,
    classes: DashMap<ClassHandle, MockClass>,
    by_name: DashMap<String, ClassHandle>,
    instances: DashMap<NativePtr, ClassHandle>,
    injected_types: DashMap<ClassHandle, TypeRef>,
    injected_objects: DashMap<NativePtr, ObjectHandle>,
    next_address: AtomicUsize,
    symbol_lookups: AtomicUsize,
    class_queries: AtomicUsize,
    /// Native full name -> `class_from_name` calls
    name_lookups: DashMap<String, usize>,
}

impl MockNative {
    pub fn new() -> Self {
        MockNative {
            symbols: DashMap::new(),
            classes: DashMap::new(),
            by_name: DashMap::new(),
            instances: DashMap::new(),
            injected_types: DashMap::new(),
            injected_objects: DashMap::new(),
            next_address: AtomicUsize::new(0x1000),
            symbol_lookups: AtomicUsize::new(0),
            class_queries: AtomicUsize::new(0),
            name_lookups: DashMap::new(),
        }
    }

    fn allocate(&self) -> usize {
        self.next_address.fetch_add(0x100, Ordering::Relaxed)
    }

    pub fn add_symbol(&self, signature: &str, address: usize) {
        self.symbols.insert(signature.to_string(), address);
    }

    /// Register a class deriving from (or implementing) the named parents
    pub fn add_class(&self, full_name: &str, parents: &[&str]) -> ClassHandle {
        let handle = ClassHandle::new(self.allocate()).unwrap();
        let parents = parents.iter().map(|p| self.class(p)).collect();
        self.classes.insert(
            handle,
            MockClass {
                name: TypeName::parse(full_name),
                parents,
            },
        );
        self.by_name.insert(full_name.to_string(), handle);
        handle
    }

    pub fn class(&self, full_name: &str) -> ClassHandle {
        *self
            .by_name
            .get(full_name)
            .unwrap_or_else(|| panic!("no mock class {}", full_name))
    }

    /// Allocate a new instance of a registered class
    pub fn instance_of(&self, full_name: &str) -> NativePtr {
        let ptr = NativePtr::new(self.allocate()).unwrap();
        self.instances.insert(ptr, self.class(full_name));
        ptr
    }

    pub fn inject(&self, full_name: &str, ty: TypeRef) {
        self.injected_types.insert(self.class(full_name), ty);
    }

    pub fn attach_wrapper(&self, ptr: NativePtr, wrapper: ObjectHandle) {
        self.injected_objects.insert(ptr, wrapper);
    }

    pub fn implements(&self, class: &str, parent: &str) -> bool {
        self.is_assignable_from(self.class(parent), self.class(class))
    }

    pub fn symbol_lookups(&self) -> usize {
        self.symbol_lookups.load(Ordering::SeqCst)
    }

    /// Number of `class_of` calls
    pub fn class_queries(&self) -> usize {
        self.class_queries.load(Ordering::SeqCst)
    }

    /// Number of `class_from_name` calls for one native name
    pub fn name_lookups(&self, full_name: &str) -> usize {
        self.name_lookups.get(full_name).map_or(0, |count| *count)
    }

    /// Number of `class_from_name` calls for all names
    pub fn total_name_lookups(&self) -> usize {
        self.name_lookups.iter().map(|count| *count.value()).sum()
    }

    fn ancestors(&self, class: ClassHandle) -> HashSet<ClassHandle> {
        let mut seen = HashSet::new();
        let mut pending = vec![class];
        while let Some(next) = pending.pop() {
            if seen.insert(next) {
                if let Some(entry) = self.classes.get(&next) {
                    pending.extend(entry.parents.iter().copied());
                }
            }
        }
        seen
    }
}

impl NativeRuntime for MockNative {
    fn runtime_name(&self) -> &'static str {
        "MockNative"
    }

    fn resolve_symbol(&self, signature: &str) -> Option<usize> {
        self.symbol_lookups.fetch_add(1, Ordering::SeqCst);
        self.symbols.get(signature).map(|addr| *addr)
    }

    fn class_of(&self, instance: NativePtr) -> Option<ClassHandle> {
        self.class_queries.fetch_add(1, Ordering::SeqCst);
        self.instances.get(&instance).map(|class| *class)
    }

    fn is_assignable_from(&self, target: ClassHandle, source: ClassHandle) -> bool {
        self.ancestors(source).contains(&target)
    }

    fn injected_wrapper(&self, instance: NativePtr) -> Option<ObjectHandle> {
        self.injected_objects.get(&instance).map(|obj| obj.value().clone())
    }

    fn injected_type(&self, class: ClassHandle) -> Option<TypeRef> {
        self.injected_types.get(&class).map(|ty| ty.value().clone())
    }

    fn class_name(&self, class: ClassHandle) -> Option<TypeName> {
        self.classes.get(&class).map(|entry| entry.name.clone())
    }

    fn class_from_name(&self, name: &TypeName) -> Option<ClassHandle> {
        *self.name_lookups.entry(name.full_name()).or_insert(0) += 1;
        self.by_name.get(&name.full_name()).map(|class| *class)
    }
}

/// Managed runtime whose scans fail for chosen modules and types
pub struct FailingManaged {
    inner: SharedManaged,
    modules: Vec<String>,
    types: Vec<String>,
}

impl FailingManaged {
    pub fn new(inner: Arc<ManagedRegistry>) -> Self {
        FailingManaged {
            inner,
            modules: Vec::new(),
            types: Vec::new(),
        }
    }

    pub fn fail_module(mut self, name: &str) -> Self {
        self.modules.push(name.to_string());
        self
    }

    pub fn fail_type(mut self, full_name: &str) -> Self {
        self.types.push(full_name.to_string());
        self
    }

    fn check(&self, ty: &ManagedType) -> Result<(), BackendError> {
        if self.types.contains(&ty.full_name()) {
            return Err(BackendError::ScanFailed {
                target: ty.full_name(),
                reason: "TypeLoadException: could not resolve field layout".to_string(),
            });
        }
        Ok(())
    }
}

impl ManagedRuntime for FailingManaged {
    fn runtime_name(&self) -> &'static str {
        "FailingManaged"
    }

    fn modules(&self) -> Vec<ModuleInfo> {
        self.inner.modules()
    }

    fn module_types(&self, module: &ModuleInfo) -> Result<Vec<TypeRef>, BackendError> {
        if self.modules.contains(&module.name) {
            return Err(BackendError::ScanFailed {
                target: module.name.clone(),
                reason: "ReflectionTypeLoadException".to_string(),
            });
        }
        self.inner.module_types(module)
    }

    fn find_type(&self, full_name: &str) -> Option<TypeRef> {
        self.inner.find_type(full_name)
    }

    fn fields(&self, ty: &ManagedType) -> Result<Vec<FieldInfo>, BackendError> {
        self.check(ty)?;
        self.inner.fields(ty)
    }

    fn properties(&self, ty: &ManagedType) -> Result<Vec<PropertyInfo>, BackendError> {
        self.check(ty)?;
        self.inner.properties(ty)
    }

    fn methods(&self, ty: &ManagedType) -> Result<Vec<MethodInfo>, BackendError> {
        self.check(ty)?;
        self.inner.methods(ty)
    }

    fn construct_wrapper(&self, ty: &TypeRef, ptr: NativePtr) -> Option<ObjectHandle> {
        self.inner.construct_wrapper(ty, ptr)
    }

    fn subscribe_module_loaded(&self, callback: ModuleLoadedCallback) {
        self.inner.subscribe_module_loaded(callback)
    }
}

fn wrapper(namespace: &str, name: &str) -> ManagedType {
    ManagedType::class(namespace, name).wrapper()
}

/// Load the shared test type world into a registry
pub fn load_world(registry: &ManagedRegistry) {
    registry.load_module(
        ModuleInfo::new("mscorlib"),
        vec![
            ManagedType::class("System", "Object"),
            ManagedType::interface("System.Collections", "IEnumerable"),
            ManagedType::interface("System.Collections", "IDictionary")
                .with_interfaces(["System.Collections.IEnumerable"]),
            ManagedType {
                kind: crate::common::ClassKind::GenericTypeDef,
                ..ManagedType::interface("System.Collections.Generic", "IEnumerable`1")
                    .with_interfaces(["System.Collections.IEnumerable"])
            },
            ManagedType {
                kind: crate::common::ClassKind::GenericTypeDef,
                ..ManagedType::class("System.Collections.Generic", "List`1")
                    .with_base("System.Object")
                    .with_interfaces(["System.Collections.Generic.IEnumerable`1"])
            },
            ManagedType {
                kind: crate::common::ClassKind::GenericTypeDef,
                ..ManagedType::class("System.Collections.Generic", "Dictionary`2")
                    .with_base("System.Object")
                    .with_interfaces(["System.Collections.IDictionary"])
            },
        ],
    );

    registry.load_module(
        ModuleInfo::new("Il2Cppmscorlib"),
        vec![
            wrapper("Il2CppSystem", "Object"),
            wrapper("Il2CppSystem", "Type")
                .abstract_class()
                .with_base("Il2CppSystem.Object"),
            ManagedType::interface("Il2CppSystem.Collections", "IEnumerable").wrapper(),
        ],
    );

    let types = registry.load_module(
        ModuleInfo::new("UnityEngine.CoreModule"),
        vec![
            wrapper("UnityEngine", "Object").with_base("Il2CppSystem.Object"),
            wrapper("UnityEngine", "Component").with_base("UnityEngine.Object"),
            wrapper("UnityEngine", "Transform")
                .with_base("UnityEngine.Component")
                .with_interfaces(["Il2CppSystem.Collections.IEnumerable"]),
            wrapper("UnityEngine", "RectTransform")
                .sealed()
                .with_base("UnityEngine.Transform"),
            wrapper("UnityEngine", "Camera")
                .sealed()
                .with_base("UnityEngine.Component"),
        ],
    );
    registry.set_members(
        &types[1],
        TypeMembers {
            properties: vec![PropertyInfo::new("transform", "UnityEngine.Transform")],
            ..Default::default()
        },
    );

    let types = registry.load_module(
        ModuleInfo::new("Assembly-CSharp"),
        vec![
            wrapper("Game", "Player").with_base("UnityEngine.Component"),
            wrapper("Game", "Boss").with_base("Game.Player"),
            wrapper("Game", "Inventory")
                .obfuscated_as("AXBQ")
                .with_base("Il2CppSystem.Object"),
            ManagedType::class("Plain", "Data"),
        ],
    );
    registry.set_members(
        &types[0],
        TypeMembers {
            fields: vec![FieldInfo::new("health", "System.Single")],
            ..Default::default()
        },
    );
}

/// Native classes matching the test type world
pub fn native_world() -> MockNative {
    let native = MockNative::new();
    native.add_class("System.Object", &[]);
    native.add_class("System.Collections.IEnumerable", &[]);
    native.add_class("System.Collections.IDictionary", &["System.Collections.IEnumerable"]);
    native.add_class("System.Type", &["System.Object"]);
    native.add_class("System.RuntimeType", &["System.Type"]);
    native.add_class("UnityEngine.Object", &["System.Object"]);
    native.add_class("UnityEngine.Component", &["UnityEngine.Object"]);
    native.add_class(
        "UnityEngine.Transform",
        &["UnityEngine.Component", "System.Collections.IEnumerable"],
    );
    native.add_class("UnityEngine.RectTransform", &["UnityEngine.Transform"]);
    native.add_class("UnityEngine.Camera", &["UnityEngine.Component"]);
    native.add_class("Game.Player", &["UnityEngine.Component"]);
    native.add_class("Game.Boss", &["Game.Player"]);
    native.add_class("AXBQ", &["System.Object", "System.Collections.IEnumerable"]);
    native.add_class("Game.Secret", &["UnityEngine.Component"]);
    native.add_class("Plugin.Injected", &["UnityEngine.Component"]);
    native
}

pub struct Fixture {
    pub registry: Arc<ManagedRegistry>,
    pub native: Arc<MockNative>,
    pub bridge: Arc<ReflectionBridge>,
    /// Managed type registered for the injected `Plugin.Injected` class
    pub injected: TypeRef,
}

/// Bridge over the test world with a simulated native runtime
pub fn fixture() -> Fixture {
    let registry = Arc::new(ManagedRegistry::new());
    load_world(&registry);

    let native = Arc::new(native_world());
    let injected = wrapper("Plugin", "Injected")
        .in_assembly("Plugin")
        .with_base("UnityEngine.Component")
        .into_ref();
    native.inject("Plugin.Injected", injected.clone());

    let bridge = ReflectionBridge::start(
        registry.clone() as SharedManaged,
        Some(native.clone() as SharedNative),
        BridgeConfig::default(),
    );

    Fixture {
        registry,
        native,
        bridge,
        injected,
    }
}

/// Bridge over the test world with no native runtime (Mono mode)
pub fn managed_only() -> (Arc<ManagedRegistry>, Arc<ReflectionBridge>) {
    let registry = Arc::new(ManagedRegistry::new());
    load_world(&registry);

    let bridge = ReflectionBridge::start(registry.clone() as SharedManaged, None, BridgeConfig::default());
    (registry, bridge)
}
