//! JSON module manifests
//!
//! A manifest describes one loaded assembly: its types and each type's
//! declared members, in the same shape as the serde descriptors.

use serde::{Deserialize, Serialize};

use crate::backend::{BackendError, ModuleInfo};
use crate::member_definition::TypeMembers;
use crate::type_definition::ManagedType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleManifest {
    pub module: ModuleInfo,
    #[serde(default)]
    pub types: Vec<ManifestType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestType {
    #[serde(flatten)]
    pub ty: ManagedType,
    #[serde(default)]
    pub members: TypeMembers,
}

impl ModuleManifest {
    pub fn from_json(json: &str) -> Result<Self, BackendError> {
        serde_json::from_str(json).map_err(|e| BackendError::InvalidManifest(e.to_string()))
    }
}
