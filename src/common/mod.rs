//! Common types shared between Mono and IL2CPP backends

pub mod class_kind;
pub mod handles;
pub mod type_name;

pub use class_kind::ClassKind;
pub use handles::{ClassHandle, NativePtr, NativeSymbol};
pub use type_name::TypeName;
