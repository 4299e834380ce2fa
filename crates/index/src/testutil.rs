//! Shared fixtures for the crate's tests.

use std::path::Path;

use specdeck_core::{Registry, SpecIndex};

use crate::sha256_hex;

/// Writes a minimal OpenAPI document to `dir` and returns its
/// [`SpecIndex`] as the loader would produce it.
pub(crate) fn write_spec(
    dir: &Path,
    name: &str,
    server: &str,
    paths: serde_json::Value,
) -> SpecIndex {
    let body = serde_json::json!({
        "openapi": "3.0.0",
        "info": {"title": name, "version": "1.0.0"},
        "servers": [{"url": server}],
        "paths": paths
    });
    let file = dir.join(format!("{name}.json"));
    let bytes = serde_json::to_vec_pretty(&body).unwrap();
    std::fs::write(&file, &bytes).unwrap();

    let url = url::Url::parse(server).unwrap();
    SpecIndex {
        spec_name: name.to_string(),
        file: file.to_string_lossy().into_owned(),
        host: url.host_str().unwrap().to_string(),
        base_path: url.path().trim_end_matches('/').to_string(),
        content_hash: sha256_hex(&bytes),
    }
}

/// Two operations sharing the token "thing" in their summaries.
pub(crate) fn things_paths() -> serde_json::Value {
    serde_json::json!({
        "/things": {
            "get": {
                "operationId": "getThing",
                "summary": "Get a thing",
                "tags": ["things"],
                "responses": {}
            },
            "post": {
                "operationId": "createThing",
                "summary": "Create a thing",
                "tags": ["things", "write"],
                "responses": {}
            }
        }
    })
}

pub(crate) fn registry_of(specs: Vec<SpecIndex>) -> Registry {
    let mut reg = Registry::new();
    for s in specs {
        reg.insert(s).unwrap();
    }
    reg
}
