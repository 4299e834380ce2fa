//! The federating alias over all shards.
//!
//! Queries fan out to every shard and merge by descending score; the
//! total is the sum of per-shard match counts. Cross-shard scores are
//! BM25 values computed against each shard's own statistics, so ranking
//! across shards is approximate. The alias itself is never persisted.

use std::path::Path;

use specdeck_core::{PortalError, Registry, Result, SearchResult};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::{build_or_open_shard, Shard};

/// Default page size for search queries.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Inputs of one search-service query.
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Free-text query, engine query-string syntax allowed.
    pub query: String,
    /// Exact-match filter on spec names; empty means all.
    pub specs: Vec<String>,
    /// Exact-match filter on tags; empty means all.
    pub tags: Vec<String>,
    pub limit: usize,
    pub offset: usize,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            query: String::new(),
            specs: Vec::new(),
            tags: Vec::new(),
            limit: DEFAULT_SEARCH_LIMIT,
            offset: 0,
        }
    }
}

/// An ordered collection of open shards; the query surface of the index.
#[derive(Debug)]
pub struct Alias {
    shards: Vec<Shard>,
}

impl Alias {
    /// Ranked federated search. Query-string syntax errors surface as
    /// search errors.
    pub fn search(&self, params: &SearchParams) -> Result<(Vec<SearchResult>, usize)> {
        self.query_all(params, false)
    }

    /// Like [`search`](Self::search) but parsing the query leniently, so
    /// raw URL paths with engine syntax characters cannot fail. Used by
    /// the resolver.
    pub(crate) fn search_lenient(
        &self,
        params: &SearchParams,
    ) -> Result<(Vec<SearchResult>, usize)> {
        self.query_all(params, true)
    }

    fn query_all(
        &self,
        params: &SearchParams,
        lenient: bool,
    ) -> Result<(Vec<SearchResult>, usize)> {
        // Each shard contributes up to offset+limit hits so the merged
        // page is correct wherever its entries come from.
        let fetch = params.offset.saturating_add(params.limit);
        let mut merged: Vec<(f32, SearchResult)> = Vec::new();
        let mut total = 0usize;
        for shard in &self.shards {
            let (hits, count) = shard.query(params, lenient, fetch)?;
            total += count;
            merged.extend(hits);
        }
        merged.sort_by(|a, b| b.0.total_cmp(&a.0));
        let results = merged
            .into_iter()
            .skip(params.offset)
            .take(params.limit)
            .map(|(_, result)| result)
            .collect();
        Ok((results, total))
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// How many shards this startup actually rebuilt.
    pub fn rebuilt_count(&self) -> usize {
        self.shards.iter().filter(|s| s.rebuilt).count()
    }
}

/// Builds or opens every spec's shard in parallel and federates them.
///
/// One blocking task per spec; all tasks run to completion even after a
/// failure so no half-built shard is left behind a dangling handle, and
/// the first error observed fails the startup after the join. The
/// cancellation token is checked at task boundaries.
pub async fn build_shards(
    base_dir: &Path,
    registry: &Registry,
    cancel: CancellationToken,
) -> Result<Alias> {
    let mut tasks = JoinSet::new();
    for spec in registry.iter() {
        let spec = spec.clone();
        let base = base_dir.to_path_buf();
        let cancel = cancel.clone();
        tasks.spawn_blocking(move || {
            if cancel.is_cancelled() {
                return Err(PortalError::Index(format!(
                    "startup cancelled before building shard {:?}",
                    spec.spec_name
                )));
            }
            build_or_open_shard(&base, &spec)
        });
    }

    let mut shards = Vec::new();
    let mut first_err = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(shard)) => shards.push(shard),
            Ok(Err(e)) => {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
            Err(e) => {
                if first_err.is_none() {
                    first_err = Some(PortalError::Index(format!("shard task panicked: {e}")));
                }
            }
        }
    }
    if let Some(e) = first_err {
        return Err(e);
    }

    shards.sort_by(|a, b| a.spec_name.cmp(&b.spec_name));
    tracing::info!(
        shards = shards.len(),
        rebuilt = shards.iter().filter(|s| s.rebuilt).count(),
        "index alias ready"
    );
    Ok(Alias { shards })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::testutil::{registry_of, things_paths, write_spec};

    async fn build(cache: &Path, registry: &Registry) -> Alias {
        build_shards(cache, registry, CancellationToken::new())
            .await
            .unwrap()
    }

    fn cache_dir(dir: &Path) -> PathBuf {
        dir.join("cache")
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn operation_id_query_returns_exactly_one_hit() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry_of(vec![write_spec(
            dir.path(),
            "things",
            "http://things.example.com/api",
            things_paths(),
        )]);
        let alias = build(&cache_dir(dir.path()), &reg).await;

        let (results, total) = alias.search(&SearchParams::new("getThing")).unwrap();
        assert_eq!(total, 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].operation_id, "getThing");
        assert_eq!(results[0].method, "GET");
        assert_eq!(results[0].template, "/things");
        assert_eq!(results[0].spec_name, "things");
        assert_eq!(results[0].description, "Get a thing");
        assert_eq!(results[0].tags, vec!["things"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shared_token_matches_both_operations() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry_of(vec![write_spec(
            dir.path(),
            "things",
            "http://things.example.com/api",
            things_paths(),
        )]);
        let alias = build(&cache_dir(dir.path()), &reg).await;

        let (results, total) = alias.search(&SearchParams::new("thing")).unwrap();
        assert_eq!(total, 2);
        assert_eq!(results.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn filters_narrow_by_spec_and_tag() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry_of(vec![
            write_spec(dir.path(), "things", "http://things.example.com/api", things_paths()),
            write_spec(
                dir.path(),
                "gadgets",
                "http://gadgets.example.com/",
                serde_json::json!({
                    "/gadgets": {
                        "get": {
                            "operationId": "listGadgets",
                            "summary": "List every thing we sell",
                            "tags": ["gadgets"],
                            "responses": {}
                        }
                    }
                }),
            ),
        ]);
        let alias = build(&cache_dir(dir.path()), &reg).await;
        assert_eq!(alias.shard_count(), 2);

        // Unfiltered, the shared token reaches both shards.
        let (_, total) = alias.search(&SearchParams::new("thing")).unwrap();
        assert_eq!(total, 3);

        let mut params = SearchParams::new("thing");
        params.specs = vec!["gadgets".to_string()];
        let (results, total) = alias.search(&params).unwrap();
        assert_eq!(total, 1);
        assert_eq!(results[0].operation_id, "listGadgets");

        let mut params = SearchParams::new("thing");
        params.tags = vec!["write".to_string()];
        let (results, total) = alias.search(&params).unwrap();
        assert_eq!(total, 1);
        assert_eq!(results[0].operation_id, "createThing");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn connect_operations_index_alongside_typed_verbs() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry_of(vec![write_spec(
            dir.path(),
            "proxy",
            "http://proxy.example.com/",
            serde_json::json!({
                "/tunnel": {
                    "Connect": {
                        "operationId": "openTunnel",
                        "summary": "Open a tunnel",
                        "responses": {}
                    },
                    "get": {
                        "operationId": "tunnelStatus",
                        "summary": "Inspect the tunnel",
                        "responses": {}
                    }
                }
            }),
        )]);
        let alias = build(&cache_dir(dir.path()), &reg).await;

        let (results, total) = alias.search(&SearchParams::new("openTunnel")).unwrap();
        assert_eq!(total, 1);
        assert_eq!(results[0].method, "CONNECT");
        assert_eq!(results[0].template, "/tunnel");
        assert_eq!(results[0].description, "Open a tunnel");

        let (_, total) = alias.search(&SearchParams::new("tunnel")).unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn second_startup_with_unchanged_bytes_rebuilds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry_of(vec![write_spec(
            dir.path(),
            "things",
            "http://things.example.com/api",
            things_paths(),
        )]);
        let cache = cache_dir(dir.path());

        let first = build(&cache, &reg).await;
        assert_eq!(first.rebuilt_count(), 1);
        drop(first);

        let second = build(&cache, &reg).await;
        assert_eq!(second.rebuilt_count(), 0);

        let (results, _) = second.search(&SearchParams::new("getThing")).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn content_change_triggers_rebuild_and_new_hash() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_dir(dir.path());

        let spec_v1 = write_spec(dir.path(), "things", "http://things.example.com/api", things_paths());
        let hash_v1 = spec_v1.content_hash.clone();
        drop(build(&cache, &registry_of(vec![spec_v1])).await);
        assert_eq!(
            std::fs::read_to_string(cache.join("things.hash")).unwrap(),
            hash_v1
        );

        // Edit the spec: new operation, new bytes, new hash.
        let mut paths = things_paths();
        paths["/things/{id}"] = serde_json::json!({
            "get": {"operationId": "getOneThing", "responses": {}}
        });
        let spec_v2 = write_spec(dir.path(), "things", "http://things.example.com/api", paths);
        assert_ne!(spec_v2.content_hash, hash_v1);
        let hash_v2 = spec_v2.content_hash.clone();

        let alias = build(&cache, &registry_of(vec![spec_v2])).await;
        assert_eq!(alias.rebuilt_count(), 1);
        assert_eq!(
            std::fs::read_to_string(cache.join("things.hash")).unwrap(),
            hash_v2
        );
        let (results, _) = alias.search(&SearchParams::new("getOneThing")).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cancelled_startup_fails_instead_of_building() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry_of(vec![write_spec(
            dir.path(),
            "things",
            "http://things.example.com/api",
            things_paths(),
        )]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = build_shards(&cache_dir(dir.path()), &reg, cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Index(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreadable_spec_fails_startup_and_leaves_no_hash() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_dir(dir.path());
        let mut spec = write_spec(dir.path(), "things", "http://things.example.com/api", things_paths());
        spec.file = dir.path().join("missing.json").to_string_lossy().into_owned();

        let err = build_shards(&cache, &registry_of(vec![spec]), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Io(_)));
        assert!(!cache.join("things.hash").exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pagination_defaults_and_offset() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry_of(vec![write_spec(
            dir.path(),
            "things",
            "http://things.example.com/api",
            things_paths(),
        )]);
        let alias = build(&cache_dir(dir.path()), &reg).await;

        let mut params = SearchParams::new("thing");
        params.limit = 1;
        let (page1, total) = alias.search(&params).unwrap();
        assert_eq!(total, 2);
        assert_eq!(page1.len(), 1);

        params.offset = 1;
        let (page2, _) = alias.search(&params).unwrap();
        assert_eq!(page2.len(), 1);
        assert_ne!(page1[0].operation_id, page2[0].operation_id);
    }
}
