//! In-memory spec repair.
//!
//! Generators in the wild emit documents a strict OpenAPI loader rejects:
//! upper-cased verbs, vendor keys under path items, schema names whose
//! casing disagrees with their `$ref` spellings, refs to schemas that were
//! never emitted. These passes run on the raw JSON tree before any typed
//! model sees the document, repairing instead of reporting.

use std::collections::BTreeSet;

use serde_json::{json, Map, Value};
use specdeck_core::is_canonical_method;

const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Runs all three repair passes in order.
pub fn sanitize_document(raw: &mut Value) {
    sanitize_paths(raw);
    sanitize_components(raw);
    inject_missing_schemas(raw);
}

/// Lower-cases HTTP verbs under `paths` and drops every other key except
/// `parameters`. The extractor reads nothing else.
pub fn sanitize_paths(raw: &mut Value) {
    let Some(paths) = raw.get_mut("paths").and_then(Value::as_object_mut) else {
        return;
    };
    for item in paths.values_mut() {
        let Some(item) = item.as_object_mut() else {
            continue;
        };
        let keys: Vec<String> = item.keys().cloned().collect();
        for key in keys {
            let lower = key.to_ascii_lowercase();
            if is_canonical_method(&key) {
                if lower != key {
                    if let Some(op) = item.remove(&key) {
                        item.insert(lower, op);
                    }
                }
            } else if key != "parameters" {
                item.remove(&key);
            }
        }
    }
}

/// Title-cases the first character of every schema key. The original
/// spelling is kept too, so refs through either casing still resolve.
pub fn sanitize_components(raw: &mut Value) {
    let Some(schemas) = raw
        .get_mut("components")
        .and_then(|c| c.get_mut("schemas"))
        .and_then(Value::as_object_mut)
    else {
        return;
    };
    let keys: Vec<String> = schemas.keys().cloned().collect();
    for key in keys {
        let title = title_case(&key);
        if title != key && !schemas.contains_key(&title) {
            if let Some(schema) = schemas.get(&key).cloned() {
                schemas.insert(title, schema);
            }
        }
    }
}

/// Collects every `$ref` into `#/components/schemas/` and inserts a stub
/// `{"type": "object"}` for each name the document does not define.
pub fn inject_missing_schemas(raw: &mut Value) {
    let mut refs = BTreeSet::new();
    collect_schema_refs(raw, &mut refs);
    if refs.is_empty() {
        return;
    }

    let Some(root) = raw.as_object_mut() else {
        return;
    };
    let Some(components) = ensure_object(root, "components") else {
        return;
    };
    let Some(schemas) = ensure_object(components, "schemas") else {
        return;
    };

    for name in refs {
        if !schemas.contains_key(&name) {
            schemas.insert(name, json!({"type": "object"}));
        }
    }
}

/// Returns the object at `key`, replacing whatever non-object value may
/// sit there. Repair, not rejection: a document that declares
/// `"components": null` still gets its stubs.
fn ensure_object<'a>(
    parent: &'a mut Map<String, Value>,
    key: &str,
) -> Option<&'a mut Map<String, Value>> {
    if !parent.get(key).is_some_and(Value::is_object) {
        parent.insert(key.to_string(), Value::Object(Map::new()));
    }
    parent.get_mut(key).and_then(Value::as_object_mut)
}

fn collect_schema_refs(node: &Value, refs: &mut BTreeSet<String>) {
    match node {
        Value::Object(map) => {
            for (key, value) in map {
                if key == "$ref" {
                    if let Some(target) = value.as_str() {
                        if let Some(name) = target.strip_prefix(SCHEMA_REF_PREFIX) {
                            refs.insert(name.to_string());
                        }
                    }
                    continue;
                }
                collect_schema_refs(value, refs);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_schema_refs(item, refs);
            }
        }
        _ => {}
    }
}

fn title_case(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
