//! IL2CPP runtime backend
//!
//! The native side of the bridge: class handles, assignability and internal
//! calls, read through the runtime's exported C API from inside the game
//! process.

pub mod api;
pub mod injection;

pub use api::Il2CppApi;
pub use injection::InjectionRegistry;
