//! HTTP API server (Axum)
//!
//! The surface the portal UI talks to: federated search, captured-log
//! resolution, and captured-log replay. Every handler holds only a
//! reference to the read-only registry and the alias, so requests run
//! concurrently without locking.

use axum::{
    extract::{RawQuery, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use specdeck_core::{Registry, SearchResult};
use specdeck_index::{find_operation, Alias, SearchParams};
use specdeck_parser::{do_request, parse_log, response_string, ParsedRequest};

mod api_error;
pub use api_error::ApiError;

pub struct AppState {
    pub registry: Registry,
    pub alias: Alias,
    /// Client used to replay captured requests.
    pub client: reqwest::Client,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search))
        .route("/raSearch", post(ra_search))
        .route("/action", post(action))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    total: usize,
    results: Vec<SearchResult>,
}

async fn search(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<SearchResponse>, ApiError> {
    let params = parse_search_query(query.as_deref().unwrap_or(""));
    let (results, total) = state.alias.search(&params)?;
    Ok(Json(SearchResponse { total, results }))
}

/// Decodes `/search` parameters by hand: `spec` and `tag` repeat, and a
/// malformed or negative `limit`/`offset` falls back to its default
/// instead of failing the request.
fn parse_search_query(raw: &str) -> SearchParams {
    let mut params = SearchParams::default();
    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        match key.as_ref() {
            "q" => params.query = value.into_owned(),
            "spec" => params.specs.push(value.into_owned()),
            "tag" => params.tags.push(value.into_owned()),
            "limit" => {
                if let Ok(n) = value.parse::<usize>() {
                    if n > 0 {
                        params.limit = n;
                    }
                }
            }
            "offset" => {
                if let Ok(n) = value.parse::<usize>() {
                    params.offset = n;
                }
            }
            _ => {}
        }
    }
    params
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RaSearchResponse {
    spec_name: String,
    operation_id: String,
    parsed_info: ParsedRequest,
}

/// Resolves a captured request log back to its spec and operation.
async fn ra_search(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<RaSearchResponse>, ApiError> {
    let mut parsed = parse_log(body.as_bytes())?;
    tracing::debug!(method = %parsed.method, uri = %parsed.uri, "parsed captured request");

    let resolved = find_operation(&state.alias, &state.registry, &parsed.method, &parsed.uri)?;
    parsed.path_params = resolved.path_params;

    Ok(Json(RaSearchResponse {
        spec_name: resolved.spec_name,
        operation_id: resolved.operation_id,
        parsed_info: parsed,
    }))
}

/// Confirms a captured request resolves to a known operation, replays
/// it, and returns the plain-text rendering of the reply.
async fn action(State(state): State<Arc<AppState>>, body: String) -> Result<String, ApiError> {
    let parsed = parse_log(body.as_bytes())?;
    find_operation(&state.alias, &state.registry, &parsed.method, &parsed.uri)?;

    let reply = do_request(&state.client, &parsed).await?;
    Ok(response_string(&reply))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_filters_and_lenient_numbers() {
        let params =
            parse_search_query("q=thing&spec=a&spec=b&tag=write&limit=50&offset=10");
        assert_eq!(params.query, "thing");
        assert_eq!(params.specs, vec!["a", "b"]);
        assert_eq!(params.tags, vec!["write"]);
        assert_eq!(params.limit, 50);
        assert_eq!(params.offset, 10);
    }

    #[test]
    fn malformed_numbers_fall_back_to_defaults() {
        let params = parse_search_query("q=x&limit=banana&offset=-3");
        assert_eq!(params.limit, specdeck_index::DEFAULT_SEARCH_LIMIT);
        assert_eq!(params.offset, 0);

        let params = parse_search_query("q=x&limit=0");
        assert_eq!(params.limit, specdeck_index::DEFAULT_SEARCH_LIMIT);
    }
}
