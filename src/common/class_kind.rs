//! Class kind enumeration shared between Mono and IL2CPP

use serde::{Deserialize, Serialize};

/// Represents the kind of a class/type definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    /// Regular class definition
    #[default]
    Def,
    /// Open generic type definition (`List<>`)
    GenericTypeDef,
    /// Closed generic instance (`List<int>`)
    GenericInst,
    /// Generic parameter (`T`)
    GenericParam,
    /// Array type
    Array,
    /// Pointer type
    Pointer,
}

impl ClassKind {
    /// Whether the kind names an open or partially open generic
    pub fn is_generic_open(self) -> bool {
        matches!(self, ClassKind::GenericTypeDef | ClassKind::GenericParam)
    }
}

impl std::fmt::Display for ClassKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassKind::Def => write!(f, "Def"),
            ClassKind::GenericTypeDef => write!(f, "GenericTypeDef"),
            ClassKind::GenericInst => write!(f, "GenericInst"),
            ClassKind::GenericParam => write!(f, "GenericParam"),
            ClassKind::Array => write!(f, "Array"),
            ClassKind::Pointer => write!(f, "Pointer"),
        }
    }
}
