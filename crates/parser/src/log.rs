//! Line-oriented log parsing.
//!
//! The parser is a single-pass state machine over `{None, Headers, Body}`.
//! Only `Method` and `URI` are mandatory; everything else is best-effort.

use std::collections::HashMap;
use std::io::BufRead;

use serde::{Deserialize, Serialize};
use specdeck_core::{PortalError, Result};

/// A captured HTTP request reconstructed from a console log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedRequest {
    pub method: String,
    /// Raw URI as it appeared in the log, query string included.
    pub uri: String,
    /// Header multi-map with MIME-canonicalized keys.
    pub headers: HashMap<String, Vec<String>>,
    /// Query parameters decoded from the URI.
    pub params: HashMap<String, Vec<String>>,
    /// Body lines joined with `\n`.
    #[serde(with = "text_bytes")]
    pub body: Vec<u8>,
    /// Filled in by the operation resolver, not the parser.
    #[serde(default)]
    pub path_params: HashMap<String, String>,
}

/// The reply obtained by replaying a [`ParsedRequest`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedResponse {
    /// Protocol version, e.g. `HTTP/1.1`.
    pub proto: String,
    /// Status line remainder, e.g. `200 OK`.
    pub status: String,
    pub headers: HashMap<String, Vec<String>>,
    #[serde(with = "text_bytes")]
    pub body: Vec<u8>,
}

/// Bodies travel as text in the log format, so their wire form is a
/// string rather than a byte array.
mod text_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&String::from_utf8_lossy(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        Ok(String::deserialize(de)?.into_bytes())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    None,
    Headers,
    Body,
}

/// Parses a captured log into a [`ParsedRequest`].
///
/// The input is consumed fully; a missing `Request method:` or
/// `Request URI:` line is reported only after the stream ends.
pub fn parse_log<R: BufRead>(reader: R) -> Result<ParsedRequest> {
    let mut pr = ParsedRequest::default();
    let mut body_lines: Vec<String> = Vec::new();
    let mut state = State::None;

    for line in reader.lines() {
        let line = line?;
        let trim = line.trim();

        if let Some(rest) = trim.strip_prefix("Request method:") {
            pr.method = rest.trim().to_string();
        } else if let Some(rest) = trim.strip_prefix("Request URI:") {
            pr.uri = rest.trim().to_string();
            if let Ok(u) = url::Url::parse(&pr.uri) {
                for (k, v) in u.query_pairs() {
                    pr.params
                        .entry(k.into_owned())
                        .or_default()
                        .push(v.into_owned());
                }
            }
        } else if let Some(rest) = trim.strip_prefix("Headers:") {
            let rest = rest.trim();
            if !rest.is_empty() && rest != "<none>" {
                add_header(&mut pr.headers, rest);
            }
            state = State::Headers;
        } else if let Some(rest) = trim.strip_prefix("Body:") {
            let rest = rest.trim();
            if !rest.is_empty() && rest != "<none>" {
                body_lines.push(rest.to_string());
            }
            state = State::Body;
        } else if state == State::Headers {
            if trim.is_empty() {
                state = State::None;
            } else {
                add_header(&mut pr.headers, trim);
            }
        } else if state == State::Body {
            if trim.is_empty() || trim.starts_with("Response") {
                state = State::None;
            } else {
                body_lines.push(trim.to_string());
            }
        }
    }

    pr.body = body_lines.join("\n").into_bytes();
    if pr.method.is_empty() || pr.uri.is_empty() {
        return Err(PortalError::MalformedLog(
            "missing method or URI".to_string(),
        ));
    }
    Ok(pr)
}

fn add_header(headers: &mut HashMap<String, Vec<String>>, line: &str) {
    if let Some((key, value)) = line.split_once('=') {
        headers
            .entry(canonical_header_key(key.trim()))
            .or_default()
            .push(value.trim().to_string());
    }
}

/// Canonicalizes a header key MIME-style: the first letter and every
/// letter following a `-` upper-cased, the rest lower-cased. Keys with
/// characters outside token syntax are left untouched.
pub fn canonical_header_key(key: &str) -> String {
    if key.chars().any(|c| !c.is_ascii_alphanumeric() && c != '-') {
        return key.to_string();
    }
    let mut out = String::with_capacity(key.len());
    let mut upper = true;
    for c in key.chars() {
        if c == '-' {
            out.push(c);
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c.to_ascii_lowercase());
        }
    }
    out
}

/// Case-insensitive single-value header lookup.
pub fn header_get<'a>(headers: &'a HashMap<String, Vec<String>>, key: &str) -> Option<&'a str> {
    headers
        .get(&canonical_header_key(key))
        .and_then(|vs| vs.first())
        .map(String::as_str)
}
