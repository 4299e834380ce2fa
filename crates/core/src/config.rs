//! Portal configuration: the ordered list of hosted specs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PortalError, Result};

/// One OpenAPI spec entry in the configuration JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecConfig {
    /// Human-facing name shown in the portal UI.
    pub display_name: String,
    /// Unique identifier; also names the on-disk shard.
    pub name: String,
    /// Filesystem path to the OpenAPI 3 JSON document.
    pub file: String,
    /// Where the spec was fetched from. Informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Reads the configuration file as an ordered sequence of [`SpecConfig`].
pub fn load_config(path: &Path) -> Result<Vec<SpecConfig>> {
    let data = std::fs::read(path)
        .map_err(|e| PortalError::Config(format!("reading {}: {e}", path.display())))?;
    serde_json::from_slice(&data)
        .map_err(|e| PortalError::Config(format!("decoding {}: {e}", path.display())))
}
