//! Backend abstraction for Mono and IL2CPP runtimes

pub mod traits;
pub mod detection;

#[cfg(all(test, feature = "mono"))]
pub mod mock;

pub use traits::*;
pub use detection::{RuntimeType, detect_runtime, create_native_runtime};
