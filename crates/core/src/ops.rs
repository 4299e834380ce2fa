//! Extracted operations and search hits.

use serde::{Deserialize, Serialize};

/// The HTTP verbs a path item may carry, lower-cased as they appear
/// under `paths` in a well-formed document.
pub const CANONICAL_METHODS: [&str; 9] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace", "connect",
];

/// Whether `key` lower-cases to one of the canonical HTTP verbs.
pub fn is_canonical_method(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    CANONICAL_METHODS.contains(&lower.as_str())
}

/// One `(method, template)` operation extracted from a spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpEntry {
    /// Upper-cased HTTP method.
    pub method: String,
    /// Path template exactly as declared under `paths`.
    pub template: String,
    pub operation_id: String,
    /// Operation summary, falling back to its description.
    pub description: String,
    pub tags: Vec<String>,
}

/// One hit returned by the search service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub spec_name: String,
    pub operation_id: String,
    pub method: String,
    pub template: String,
    pub description: String,
    pub tags: Vec<String>,
}
