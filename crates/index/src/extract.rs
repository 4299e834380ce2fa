//! Operation extraction from a sanitized document.

use openapiv3::{OpenAPI, Operation, PathItem, ReferenceOr};
use serde_json::Value;
use specdeck_core::{OpEntry, PortalError, Result};

/// Hands the sanitized tree to the typed loader. Failure here means the
/// document is broken beyond what sanitization repairs, which is fatal
/// for the affected spec.
pub fn load_document(spec_name: &str, sanitized: Value) -> Result<OpenAPI> {
    serde_json::from_value(sanitized).map_err(|e| PortalError::Spec {
        name: spec_name.to_string(),
        reason: format!("sanitized document rejected by loader: {e}"),
    })
}

/// One [`OpEntry`] per `(method, template)` pair with a non-null
/// operation. Methods come out upper-cased; templates stay exactly as
/// declared under `paths`.
pub fn extract_entries(doc: &OpenAPI) -> Vec<OpEntry> {
    let mut entries = Vec::new();
    for (template, item) in doc.paths.iter() {
        let ReferenceOr::Item(item) = item else {
            continue;
        };
        for (method, op) in operations_of(item) {
            entries.push(OpEntry {
                method: method.to_string(),
                template: template.clone(),
                operation_id: op.operation_id.clone().unwrap_or_default(),
                description: describe(op.summary.as_deref(), op.description.as_deref()),
                tags: op.tags.clone(),
            });
        }
    }
    entries
}

/// The typed model stops at `trace`, but a sanitized document may still
/// carry `connect` operations; those are read off the raw tree so the
/// ninth verb indexes like the other eight.
pub fn extract_connect_entries(raw: &Value) -> Vec<OpEntry> {
    let mut entries = Vec::new();
    let Some(paths) = raw.get("paths").and_then(Value::as_object) else {
        return entries;
    };
    for (template, item) in paths {
        let Some(op) = item.get("connect").filter(|op| op.is_object()) else {
            continue;
        };
        let tags = op
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        entries.push(OpEntry {
            method: "CONNECT".to_string(),
            template: template.clone(),
            operation_id: op
                .get("operationId")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            description: describe(
                op.get("summary").and_then(Value::as_str),
                op.get("description").and_then(Value::as_str),
            ),
            tags,
        });
    }
    entries
}

/// Operation summary, falling back to its description.
fn describe(summary: Option<&str>, description: Option<&str>) -> String {
    match summary {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => description.unwrap_or_default().to_string(),
    }
}

fn operations_of(item: &PathItem) -> Vec<(&'static str, &Operation)> {
    let mut ops = Vec::new();
    macro_rules! verb {
        ($field:ident, $name:literal) => {
            if let Some(op) = item.$field.as_ref() {
                ops.push(($name, op));
            }
        };
    }
    verb!(get, "GET");
    verb!(put, "PUT");
    verb!(post, "POST");
    verb!(delete, "DELETE");
    verb!(options, "OPTIONS");
    verb!(head, "HEAD");
    verb!(patch, "PATCH");
    verb!(trace, "TRACE");
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize_document;
    use serde_json::json;

    fn doc(paths: Value) -> OpenAPI {
        let mut raw = json!({
            "openapi": "3.0.0",
            "info": {"title": "t", "version": "1"},
            "paths": paths
        });
        sanitize_document(&mut raw);
        load_document("test", raw).unwrap()
    }

    #[test]
    fn methods_are_uppercased_and_templates_verbatim() {
        let doc = doc(json!({
            "/items/{id}": {
                "GET": {"operationId": "getItem", "responses": {}},
                "delete": {"operationId": "deleteItem", "responses": {}}
            }
        }));
        let mut entries = extract_entries(&doc);
        entries.sort_by(|a, b| a.method.cmp(&b.method));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].method, "DELETE");
        assert_eq!(entries[1].method, "GET");
        assert!(entries.iter().all(|e| e.template == "/items/{id}"));
        assert!(entries
            .iter()
            .all(|e| specdeck_core::is_canonical_method(&e.method)));
    }

    #[test]
    fn summary_wins_over_description() {
        let doc = doc(json!({
            "/a": {
                "get": {
                    "operationId": "a",
                    "summary": "short",
                    "description": "long",
                    "responses": {}
                },
                "post": {
                    "operationId": "b",
                    "description": "only description",
                    "responses": {}
                }
            }
        }));
        let mut entries = extract_entries(&doc);
        entries.sort_by(|a, b| a.operation_id.cmp(&b.operation_id));

        assert_eq!(entries[0].description, "short");
        assert_eq!(entries[1].description, "only description");
    }

    #[test]
    fn tags_come_through_verbatim() {
        let doc = doc(json!({
            "/a": {
                "get": {"operationId": "a", "tags": ["pets", "Admin"], "responses": {}}
            }
        }));
        let entries = extract_entries(&doc);
        assert_eq!(entries[0].tags, vec!["pets", "Admin"]);
    }

    #[test]
    fn connect_operations_come_off_the_raw_tree() {
        let mut raw = json!({
            "openapi": "3.0.0",
            "info": {"title": "t", "version": "1"},
            "paths": {
                "/tunnel": {
                    "Connect": {
                        "operationId": "openTunnel",
                        "summary": "Open a tunnel",
                        "tags": ["proxy"],
                        "responses": {}
                    },
                    "get": {"operationId": "tunnelStatus", "responses": {}}
                }
            }
        });
        sanitize_document(&mut raw);

        let connect = extract_connect_entries(&raw);
        assert_eq!(connect.len(), 1);
        assert_eq!(connect[0].method, "CONNECT");
        assert_eq!(connect[0].template, "/tunnel");
        assert_eq!(connect[0].operation_id, "openTunnel");
        assert_eq!(connect[0].description, "Open a tunnel");
        assert_eq!(connect[0].tags, vec!["proxy"]);

        // The leftover connect key does not break the typed loader, and
        // the typed side still extracts the other verbs.
        let doc = load_document("test", raw).unwrap();
        let typed = extract_entries(&doc);
        assert_eq!(typed.len(), 1);
        assert_eq!(typed[0].operation_id, "tunnelStatus");
    }

    #[test]
    fn null_connect_is_not_an_operation() {
        let raw = json!({"paths": {"/tunnel": {"connect": null}}});
        assert!(extract_connect_entries(&raw).is_empty());
    }

    #[test]
    fn unrepairable_document_is_a_spec_error() {
        let err = load_document("bad", json!({"openapi": "3.0.0"})).unwrap_err();
        assert!(matches!(err, PortalError::Spec { .. }));
    }
}
