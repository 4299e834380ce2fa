//! Spec loading: configuration to host registry.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use sha2::{Digest, Sha256};
use specdeck_core::{load_config, PortalError, Registry, Result, SpecIndex};

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Loader-side `{name → hash}` mapping, written next to the shards. A
/// recovery hint only; failure to write it is not fatal.
pub const HASH_CACHE_FILE: &str = "hashes.json";

/// Extracts `(host, basePath)` from the first server URL of a raw spec.
fn first_server_info(raw: &Value) -> std::result::Result<(String, String), String> {
    let servers = raw
        .get("servers")
        .and_then(Value::as_array)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "spec has no servers[0] entry".to_string())?;
    let first = servers[0]
        .as_object()
        .ok_or_else(|| "invalid servers[0]".to_string())?;
    let url_str = first
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| "servers[0].url is not a string".to_string())?;
    let url = url::Url::parse(url_str).map_err(|e| format!("servers[0].url: {e}"))?;
    let host = url
        .host_str()
        .ok_or_else(|| format!("servers[0].url {url_str:?} has no host"))?
        .to_string();
    let base_path = url.path().trim_end_matches('/').to_string();
    Ok((host, base_path))
}

/// Reads the configuration and every referenced spec file and builds the
/// registry. Each spec contributes its content hash and the
/// `(host, basePath)` of its first declared server; a duplicate host or
/// an unusable spec fails the whole load.
pub fn load_registry(config_path: &Path, cache_dir: &Path) -> Result<Registry> {
    let configs = load_config(config_path)?;

    let mut registry = Registry::new();
    let mut hashes: HashMap<String, String> = HashMap::with_capacity(configs.len());

    for cfg in &configs {
        let abs = std::fs::canonicalize(&cfg.file).map_err(|e| PortalError::Spec {
            name: cfg.name.clone(),
            reason: format!("resolving {:?}: {e}", cfg.file),
        })?;
        let raw_bytes = std::fs::read(&abs).map_err(|e| PortalError::Spec {
            name: cfg.name.clone(),
            reason: format!("reading {}: {e}", abs.display()),
        })?;
        let hash = sha256_hex(&raw_bytes);
        hashes.insert(cfg.name.clone(), hash.clone());

        let raw: Value = serde_json::from_slice(&raw_bytes).map_err(|e| PortalError::Spec {
            name: cfg.name.clone(),
            reason: format!("parsing: {e}"),
        })?;
        if !raw.is_object() {
            return Err(PortalError::Spec {
                name: cfg.name.clone(),
                reason: "document is not a JSON object".to_string(),
            });
        }
        let (host, base_path) = first_server_info(&raw).map_err(|reason| PortalError::Spec {
            name: cfg.name.clone(),
            reason,
        })?;

        registry.insert(SpecIndex {
            spec_name: cfg.name.clone(),
            file: abs.to_string_lossy().into_owned(),
            host,
            base_path,
            content_hash: hash,
        })?;
    }

    persist_hashes(cache_dir, &hashes);
    tracing::info!(specs = registry.len(), "registry loaded");
    Ok(registry)
}

fn persist_hashes(cache_dir: &Path, hashes: &HashMap<String, String>) {
    let path = cache_dir.join(HASH_CACHE_FILE);
    let write = std::fs::create_dir_all(cache_dir).and_then(|()| {
        let data = serde_json::to_vec_pretty(hashes).unwrap_or_default();
        std::fs::write(&path, data)
    });
    if let Err(e) = write {
        tracing::warn!("failed to write hash cache {}: {e}", path.display());
    }
}
