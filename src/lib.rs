//! explorer-bridge: the reflection bridge of an in-process Unity inspector
//!
//! Unity games run either on Mono, where managed reflection sees everything,
//! or on IL2CPP, where the managed side only sees generated wrapper types
//! over native classes. This crate lets an inspector treat live objects from
//! both worlds the same way.
//!
//! # Architecture
//!
//! - **Backends**: the managed reflection layer ([`backend::ManagedRuntime`])
//!   and the native IL2CPP runtime ([`backend::NativeRuntime`])
//! - **Symbol resolver**: internal-call lookup by signature, cached
//! - **Type identity**: the most specific runtime type of a live object
//! - **Casting**: best-effort reinterpretation and pointer identity
//! - **Member cache**: memoised field/property/method lookups
//! - **Capabilities**: assignability, enumerable/dictionary classification,
//!   implementor sets

pub mod backend;
pub mod bridge;
pub mod common;
pub mod config;
pub mod member_definition;
pub mod object;
pub mod type_definition;

#[cfg(feature = "mono")]
pub mod mono;

#[cfg(feature = "il2cpp")]
pub mod il2cpp;

pub use backend::{BackendError, ManagedRuntime, ModuleInfo, NativeRuntime};
pub use bridge::{EntryTypes, ImplementorFilter, ReflectionBridge, SymbolResolver};
pub use common::{ClassHandle, ClassKind, NativePtr, NativeSymbol, TypeName};
pub use config::BridgeConfig;
pub use member_definition::{FieldInfo, MemberKind, MethodInfo, ParameterInfo, PropertyInfo};
pub use object::{ObjectHandle, ObjectKind};
pub use type_definition::{ManagedType, TypeIdentity, TypeRef};

/// Result type used throughout the library
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for the bridge
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No candidate signature resolved to a native function
    #[error("Native symbol not found: {}", .signatures.join(" | "))]
    SymbolNotFound {
        /// Every signature that was tried, in order
        signatures: Vec<String>,
    },

    /// More than one member matched a lookup
    #[error("Ambiguous {kind} '{member}' on {type_name} ({candidates} candidates)")]
    AmbiguousMember {
        type_name: String,
        kind: MemberKind,
        member: String,
        candidates: usize,
    },

    /// Reflection over a type or module failed
    #[error("Reflection scan of {context} failed: {source}")]
    ReflectionScan {
        context: String,
        source: BackendError,
    },

    /// Backend error
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging for the library.
///
/// Does nothing if the host already installed a global subscriber.
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("explorer_bridge=info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .try_init();
}
