//! Core traits for runtime backend abstraction
//!
//! These traits define the two collaborators the bridge is built on: the
//! managed reflection layer (Mono-style descriptors, including the generated
//! wrapper assemblies) and the native IL2CPP runtime. The rest of the crate
//! works against these traits only, so either side can be swapped for a test
//! double.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::common::{ClassHandle, NativePtr, TypeName};
use crate::member_definition::{FieldInfo, MethodInfo, PropertyInfo};
use crate::object::ObjectHandle;
use crate::type_definition::{ManagedType, TypeRef};

/// Error type for backend operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// The runtime library is not present in the process
    #[error("Library not loaded: {0}")]
    LibraryNotLoaded(String),
    /// A required export is missing from the runtime library
    #[error("Export not found: {0}")]
    ExportMissing(String),
    /// Failed to initialize the runtime
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),
    /// Type or class not found
    #[error("Type not found: {0}")]
    TypeNotFound(String),
    /// Enumerating a module's types or a type's members failed
    #[error("Scan of {target} failed: {reason}")]
    ScanFailed { target: String, reason: String },
    /// A module manifest could not be read
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),
    /// Generic backend error
    #[error("Error: {0}")]
    Other(String),
}

/// A loaded module (assembly image)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
}

impl ModuleInfo {
    pub fn new(name: impl Into<String>) -> Self {
        ModuleInfo {
            name: name.into(),
            path: None,
        }
    }
}

/// Push notification fired after a module has been loaded
pub type ModuleLoadedCallback = Arc<dyn Fn(&ModuleInfo) + Send + Sync>;

/// Host object model provider: the managed reflection layer.
pub trait ManagedRuntime: Send + Sync {
    /// Get the runtime name (e.g. "Mono")
    fn runtime_name(&self) -> &'static str;

    /// Get all loaded modules
    fn modules(&self) -> Vec<ModuleInfo>;

    /// Enumerate the types defined in a module
    fn module_types(&self, module: &ModuleInfo) -> Result<Vec<TypeRef>, BackendError>;

    /// Direct lookup by full name
    fn find_type(&self, full_name: &str) -> Option<TypeRef>;

    /// Fields visible on the type, inherited ones included
    fn fields(&self, ty: &ManagedType) -> Result<Vec<FieldInfo>, BackendError>;

    /// Properties visible on the type, inherited ones included
    fn properties(&self, ty: &ManagedType) -> Result<Vec<PropertyInfo>, BackendError>;

    /// Methods visible on the type, inherited ones included
    fn methods(&self, ty: &ManagedType) -> Result<Vec<MethodInfo>, BackendError>;

    /// Run the type's pointer-taking constructor: a new wrapper around `ptr`
    fn construct_wrapper(&self, ty: &TypeRef, ptr: NativePtr) -> Option<ObjectHandle>;

    /// Register a callback for module-loaded notifications
    fn subscribe_module_loaded(&self, callback: ModuleLoadedCallback);
}

/// Native runtime accessor: the primitives the IL2CPP runtime exports.
pub trait NativeRuntime: Send + Sync {
    /// Get the runtime name (e.g. "IL2CPP")
    fn runtime_name(&self) -> &'static str;

    /// Resolve an internal call by its full signature string
    fn resolve_symbol(&self, signature: &str) -> Option<usize>;

    /// Native class of a live instance
    fn class_of(&self, instance: NativePtr) -> Option<ClassHandle>;

    /// Whether an instance of `source` can be used where `target` is expected
    fn is_assignable_from(&self, target: ClassHandle, source: ClassHandle) -> bool;

    /// The managed object already attached to an instance of an injected class
    fn injected_wrapper(&self, instance: NativePtr) -> Option<ObjectHandle>;

    /// Managed type registered for a class injected at runtime
    fn injected_type(&self, class: ClassHandle) -> Option<TypeRef>;

    /// Namespace and name of a native class
    fn class_name(&self, class: ClassHandle) -> Option<TypeName>;

    /// Find a native class by namespace and name across all loaded images
    fn class_from_name(&self, name: &TypeName) -> Option<ClassHandle>;
}

/// Shared backend handles for dynamic dispatch
pub type SharedManaged = Arc<dyn ManagedRuntime>;
pub type SharedNative = Arc<dyn NativeRuntime>;
