//! Plain-text renderings of parsed requests and replayed responses,
//! in the same console shape the parser consumes.

use std::collections::HashMap;
use std::fmt::Write;

use crate::{header_get, ParsedRequest, ParsedResponse};

/// Renders a [`ParsedRequest`] in console-log form.
pub fn request_string(pr: &ParsedRequest) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Request method: {}", pr.method);
    let _ = writeln!(out, "Request URI: {}", pr.uri);
    let _ = writeln!(out, "Proxy: <none>");

    if pr.params.is_empty() {
        let _ = writeln!(out, "Request params: <none>");
    } else {
        let _ = writeln!(out, "Request params:");
        write_multimap(&mut out, &pr.params);
    }

    let _ = writeln!(out, "Form params: <none>");
    let _ = writeln!(out, "Path params: <none>");

    write_headers(&mut out, &pr.headers);
    let _ = writeln!(out, "Cookies: <none>");
    let _ = writeln!(out, "Multiparts: <none>");
    write_body(&mut out, &pr.headers, &pr.body);
    out
}

/// Renders a [`ParsedResponse`] in console-log form.
pub fn response_string(pres: &ParsedResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "Response :");
    let _ = writeln!(out, "{} {}", pres.proto, pres.status);

    write_headers(&mut out, &pres.headers);
    let _ = writeln!(out, "Cookies: <none>");
    let _ = writeln!(out, "Multiparts: <none>");
    write_body(&mut out, &pres.headers, &pres.body);
    out
}

fn write_headers(out: &mut String, headers: &HashMap<String, Vec<String>>) {
    if headers.is_empty() {
        let _ = writeln!(out, "Headers: <none>");
    } else {
        let _ = writeln!(out, "Headers:");
        write_multimap(out, headers);
    }
}

fn write_multimap(out: &mut String, map: &HashMap<String, Vec<String>>) {
    let mut keys: Vec<_> = map.keys().collect();
    keys.sort();
    for k in keys {
        for v in &map[k] {
            let _ = writeln!(out, "    {k}={v}");
        }
    }
}

fn write_body(out: &mut String, headers: &HashMap<String, Vec<String>>, body: &[u8]) {
    if body.is_empty() {
        let _ = writeln!(out, "Body: <none>");
        return;
    }
    let _ = writeln!(out, "Body:");
    let text = String::from_utf8_lossy(body);
    let json_body = header_get(headers, "Content-Type")
        .is_some_and(|ct| ct.contains("application/json"));
    if json_body {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
            if let Ok(pretty) = serde_json::to_string_pretty(&value) {
                let _ = writeln!(out, "{pretty}");
                return;
            }
        }
    }
    let _ = writeln!(out, "{text}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_placeholders_for_empty_sections() {
        let pr = ParsedRequest {
            method: "GET".to_string(),
            uri: "http://example.com/a".to_string(),
            ..Default::default()
        };
        let text = request_string(&pr);
        assert!(text.contains("Request method: GET"));
        assert!(text.contains("Request params: <none>"));
        assert!(text.contains("Headers: <none>"));
        assert!(text.contains("Body: <none>"));
    }

    #[test]
    fn pretty_prints_json_bodies() {
        let mut pr = ParsedRequest {
            method: "POST".to_string(),
            uri: "http://example.com/a".to_string(),
            body: br#"{"id":1}"#.to_vec(),
            ..Default::default()
        };
        pr.headers.insert(
            "Content-Type".to_string(),
            vec!["application/json".to_string()],
        );
        let text = request_string(&pr);
        assert!(text.contains("\"id\": 1"));
    }

    #[test]
    fn round_trips_through_parser() {
        let mut pr = ParsedRequest {
            method: "POST".to_string(),
            uri: "http://example.com/api/items?x=1".to_string(),
            body: b"payload".to_vec(),
            ..Default::default()
        };
        pr.headers
            .insert("Accept".to_string(), vec!["text/plain".to_string()]);

        let reparsed = crate::parse_log(request_string(&pr).as_bytes()).unwrap();
        assert_eq!(reparsed.method, pr.method);
        assert_eq!(reparsed.uri, pr.uri);
        assert_eq!(reparsed.headers, pr.headers);
        assert_eq!(reparsed.body, pr.body);
    }
}
