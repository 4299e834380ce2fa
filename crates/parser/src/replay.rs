//! Replays a parsed request against its origin server.

use std::collections::HashMap;

use specdeck_core::{PortalError, Result};

use crate::{canonical_header_key, ParsedRequest, ParsedResponse};

/// Re-issues the captured call and captures the reply.
///
/// Method, URI, headers, and body are copied verbatim; redirects and
/// retries are left to the caller's client configuration.
pub async fn do_request(client: &reqwest::Client, pr: &ParsedRequest) -> Result<ParsedResponse> {
    let method = reqwest::Method::from_bytes(pr.method.as_bytes())
        .map_err(|e| PortalError::Replay(format!("method {:?}: {e}", pr.method)))?;

    let mut req = client.request(method, &pr.uri);
    for (key, values) in &pr.headers {
        for value in values {
            req = req.header(key, value);
        }
    }
    let resp = req
        .body(pr.body.clone())
        .send()
        .await
        .map_err(|e| PortalError::Replay(e.to_string()))?;

    let proto = format!("{:?}", resp.version());
    let status = match resp.status().canonical_reason() {
        Some(reason) => format!("{} {reason}", resp.status().as_u16()),
        None => resp.status().as_u16().to_string(),
    };

    let mut headers: HashMap<String, Vec<String>> = HashMap::new();
    for (key, value) in resp.headers() {
        headers
            .entry(canonical_header_key(key.as_str()))
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }

    let body = resp
        .bytes()
        .await
        .map_err(|e| PortalError::Replay(e.to_string()))?;

    Ok(ParsedResponse {
        proto,
        status,
        headers,
        body: body.to_vec(),
    })
}
