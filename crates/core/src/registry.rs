//! The process-wide host registry.
//!
//! Built once at startup by the spec loader and read-only afterwards, so
//! handlers share it without locking.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{PortalError, Result};

/// Runtime metadata for one loaded spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecIndex {
    pub spec_name: String,
    /// Absolute path of the spec file on disk.
    pub file: String,
    /// Hostname of `servers[0].url`, the registry key.
    pub host: String,
    /// Path component of `servers[0].url`, trailing slash trimmed; `/`
    /// becomes empty. Never concatenated into templates.
    pub base_path: String,
    /// Hex SHA-256 of the raw spec bytes.
    pub content_hash: String,
}

/// Maps hostnames to their loaded [`SpecIndex`].
#[derive(Debug, Default, Clone)]
pub struct Registry {
    specs: HashMap<String, SpecIndex>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a spec under its host. Two specs declaring the same
    /// first-server host is a configuration error, not something to
    /// coalesce silently.
    pub fn insert(&mut self, spec: SpecIndex) -> Result<()> {
        if let Some(existing) = self.specs.get(&spec.host) {
            return Err(PortalError::Config(format!(
                "specs {:?} and {:?} both declare host {:?}",
                existing.spec_name, spec.spec_name, spec.host
            )));
        }
        self.specs.insert(spec.host.clone(), spec);
        Ok(())
    }

    pub fn get_by_host(&self, host: &str) -> Option<&SpecIndex> {
        self.specs.get(host)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpecIndex> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
