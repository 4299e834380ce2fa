//! Method+URL resolution against the alias.

use std::collections::HashMap;

use serde::Serialize;
use specdeck_core::{PortalError, Registry, Result};

use crate::{Alias, SearchParams};

/// How many candidates the broad resolver query pulls per lookup.
/// Tokenisation of templated paths is imperfect, so the query casts a
/// wide net and the structural filter below does the real selection.
const RESOLVE_CANDIDATES: usize = 100;

/// A successful resolution of a captured call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedOperation {
    pub spec_name: String,
    pub operation_id: String,
    pub path_params: HashMap<String, String>,
}

/// Resolves `(method, rawURL)` to the operation that declared it.
///
/// The URL's hostname selects the spec; a broad full-text query over the
/// relative path produces candidates; candidates from other specs or
/// with a different method are skipped; the survivors are matched
/// structurally against the template. Among structural matches the one
/// with the most literal segments wins (so `/users/me` beats
/// `/users/{id}`), falling back to rank order on ties.
pub fn find_operation(
    alias: &Alias,
    registry: &Registry,
    method: &str,
    raw_url: &str,
) -> Result<ResolvedOperation> {
    let url = url::Url::parse(raw_url).map_err(|e| PortalError::InvalidUrl {
        url: raw_url.to_string(),
        reason: e.to_string(),
    })?;

    let host = url.host_str().unwrap_or_default();
    let meta = registry
        .get_by_host(host)
        .ok_or_else(|| PortalError::UnknownHost(host.to_string()))?;

    let base = meta.base_path.trim_end_matches('/');
    let full = url.path();
    let stripped = full.strip_prefix(base).unwrap_or(full);
    let rel = if stripped.starts_with('/') {
        stripped.to_string()
    } else {
        format!("/{stripped}")
    };
    let want_method = method.to_uppercase();

    tracing::debug!(spec = %meta.spec_name, path = %rel, "resolving operation");

    let params = SearchParams {
        query: rel.clone(),
        limit: RESOLVE_CANDIDATES,
        offset: 0,
        ..SearchParams::default()
    };
    let (hits, _) = alias.search_lenient(&params)?;

    let mut best: Option<(usize, &specdeck_core::SearchResult)> = None;
    for hit in &hits {
        if hit.spec_name != meta.spec_name || hit.method != want_method {
            continue;
        }
        if !match_template(&hit.template, full) && !match_template(&hit.template, &rel) {
            continue;
        }
        let literals = literal_segments(&hit.template);
        // Hits arrive in rank order, so strictly-greater keeps the
        // earlier hit on ties.
        if best.map_or(true, |(b, _)| literals > b) {
            best = Some((literals, hit));
        }
    }

    match best {
        Some((_, hit)) => Ok(ResolvedOperation {
            spec_name: hit.spec_name.clone(),
            operation_id: hit.operation_id.clone(),
            path_params: extract_path_params(&meta.base_path, &hit.template, full),
        }),
        None => Err(PortalError::NoOperation {
            method: want_method,
            path: rel,
            spec: meta.spec_name.clone(),
        }),
    }
}

fn is_param_segment(segment: &str) -> bool {
    segment.len() >= 2 && segment.starts_with('{') && segment.ends_with('}')
}

fn segments(path: &str) -> Vec<&str> {
    path.trim_matches('/').split('/').collect()
}

/// Whether `path` matches the template segment-wise.
///
/// Segment counts must be equal; a `{name}` segment matches any
/// non-empty path segment; every other segment must match byte-for-byte.
/// Leading and trailing slashes are ignored. A parameter embedded inside
/// a segment (`/foo{id}`) is not recognised and compares literally.
pub fn match_template(template: &str, path: &str) -> bool {
    let ts = segments(template);
    let ps = segments(path);
    if ts.len() != ps.len() {
        return false;
    }
    ts.iter().zip(&ps).all(|(t, p)| {
        if is_param_segment(t) {
            !p.is_empty()
        } else {
            t == p
        }
    })
}

/// Pairs the path with the template and returns `{name → segment}` for
/// every `{name}` template segment. A segment-count mismatch yields an
/// empty map; the operation still counts as matched and callers treat
/// the empty map as a diagnostic.
pub fn extract_path_params(
    base_path: &str,
    template: &str,
    full_path: &str,
) -> HashMap<String, String> {
    let clean = full_path.strip_prefix(base_path).unwrap_or(full_path);
    let clean = clean.strip_prefix('/').unwrap_or(clean);

    let ts = segments(template);
    let ps = segments(clean);

    let mut params = HashMap::new();
    if ts.len() != ps.len() {
        tracing::warn!(
            template,
            path = clean,
            "segment count mismatch while extracting path params"
        );
        return params;
    }
    for (t, p) in ts.iter().zip(&ps) {
        if is_param_segment(t) {
            params.insert(t[1..t.len() - 1].to_string(), (*p).to_string());
        }
    }
    params
}

fn literal_segments(template: &str) -> usize {
    segments(template)
        .iter()
        .filter(|s| !is_param_segment(s))
        .count()
}
