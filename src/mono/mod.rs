//! Managed (Mono-side) runtime backend
//!
//! The managed reflection layer as the bridge sees it: a registry the host
//! fills with each loaded assembly's types and members. On IL2CPP games this
//! is where the generated wrapper assemblies live.

pub mod manifest;
pub mod registry;

pub use manifest::{ManifestType, ModuleManifest};
pub use registry::ManagedRegistry;
