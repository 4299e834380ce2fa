//! Disk-backed per-spec shards.
//!
//! One tantivy index per spec, living at `<base>/<specName>.tantivy` with
//! a `<specName>.hash` sibling holding the content hash of the spec bytes
//! at the last successful rebuild. A stale or missing hash forces a
//! rebuild; a rebuild that dies midway leaves no hash behind, so the next
//! startup retries from scratch.

use std::path::{Path, PathBuf};

use serde_json::Value;
use specdeck_core::{PortalError, Result, SearchResult, SpecIndex};
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{BooleanQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{
    Field, IndexRecordOption, OwnedValue, Schema, STORED, STRING, TEXT,
};
use tantivy::{Index, IndexReader, IndexWriter, TantivyDocument, Term};

use crate::{
    extract_connect_entries, extract_entries, load_document, sanitize_document, SearchParams,
};

/// Suffix of a shard directory.
pub const SHARD_SUFFIX: &str = "tantivy";

#[derive(Debug, Clone, Copy)]
pub(crate) struct ShardFields {
    pub id: Field,
    pub spec_name: Field,
    pub operation_id: Field,
    pub method: Field,
    pub template: Field,
    pub description: Field,
    pub tags: Field,
}

/// `spec_name` and `tags` are raw (keyword) fields so they behave as
/// exact-match filters; the rest are tokenized for ranked search.
fn build_schema() -> (Schema, ShardFields) {
    let mut builder = Schema::builder();
    let fields = ShardFields {
        id: builder.add_text_field("id", STRING | STORED),
        spec_name: builder.add_text_field("spec_name", STRING | STORED),
        operation_id: builder.add_text_field("operation_id", TEXT | STORED),
        method: builder.add_text_field("method", TEXT | STORED),
        template: builder.add_text_field("template", TEXT | STORED),
        description: builder.add_text_field("description", TEXT | STORED),
        tags: builder.add_text_field("tags", STRING | STORED),
    };
    (builder.build(), fields)
}

impl ShardFields {
    fn from_schema(schema: &Schema) -> Result<Self> {
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|e| PortalError::Index(e.to_string()))
        };
        Ok(Self {
            id: field("id")?,
            spec_name: field("spec_name")?,
            operation_id: field("operation_id")?,
            method: field("method")?,
            template: field("template")?,
            description: field("description")?,
            tags: field("tags")?,
        })
    }
}

/// An open, queryable index over the operations of exactly one spec.
pub struct Shard {
    pub spec_name: String,
    /// Whether this startup rebuilt the shard or reused it as-is.
    pub rebuilt: bool,
    index: Index,
    reader: IndexReader,
    fields: ShardFields,
}

impl std::fmt::Debug for Shard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shard")
            .field("spec_name", &self.spec_name)
            .field("rebuilt", &self.rebuilt)
            .finish_non_exhaustive()
    }
}

fn shard_dir(base_dir: &Path, spec_name: &str) -> PathBuf {
    base_dir.join(format!("{spec_name}.{SHARD_SUFFIX}"))
}

fn hash_path(base_dir: &Path, spec_name: &str) -> PathBuf {
    base_dir.join(format!("{spec_name}.hash"))
}

/// Creates or opens the disk-backed shard for `spec`.
///
/// The shard is rebuilt when the stored hash differs from the spec's
/// content hash or the directory is missing; otherwise the existing
/// index is opened read-write.
pub fn build_or_open_shard(base_dir: &Path, spec: &SpecIndex) -> Result<Shard> {
    std::fs::create_dir_all(base_dir)?;
    let dir = shard_dir(base_dir, &spec.spec_name);
    let hash_file = hash_path(base_dir, &spec.spec_name);

    let prev_hash = std::fs::read_to_string(&hash_file).unwrap_or_default();
    let needs_rebuild = prev_hash != spec.content_hash || !dir.exists();

    if needs_rebuild {
        tracing::info!(spec = %spec.spec_name, "rebuilding shard (hash changed or missing)");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir)?;

        let (schema, fields) = build_schema();
        let index = Index::create_in_dir(&dir, schema)
            .map_err(|e| PortalError::Index(format!("create shard {}: {e}", dir.display())))?;
        let mut writer: IndexWriter = index
            .writer(50_000_000)
            .map_err(|e| PortalError::Index(e.to_string()))?;

        let indexed = index_spec(&mut writer, &fields, spec)?;
        writer
            .commit()
            .map_err(|e| PortalError::Index(format!("commit shard {}: {e}", dir.display())))?;
        std::fs::write(&hash_file, &spec.content_hash)?;
        tracing::debug!(spec = %spec.spec_name, operations = indexed, "shard rebuilt");

        let reader = index.reader().map_err(|e| PortalError::Index(e.to_string()))?;
        return Ok(Shard {
            spec_name: spec.spec_name.clone(),
            rebuilt: true,
            index,
            reader,
            fields,
        });
    }

    let index = Index::open_in_dir(&dir)
        .map_err(|e| PortalError::Index(format!("open shard {}: {e}", dir.display())))?;
    let fields = ShardFields::from_schema(&index.schema())?;
    let reader = index.reader().map_err(|e| PortalError::Index(e.to_string()))?;
    Ok(Shard {
        spec_name: spec.spec_name.clone(),
        rebuilt: false,
        index,
        reader,
        fields,
    })
}

/// Sanitizes and extracts the spec, then writes one document per
/// operation. The document id is `specName|method|template|operationId`.
fn index_spec(writer: &mut IndexWriter, fields: &ShardFields, spec: &SpecIndex) -> Result<usize> {
    let data = std::fs::read(&spec.file)?;
    let mut raw: Value = serde_json::from_slice(&data).map_err(|e| PortalError::Spec {
        name: spec.spec_name.clone(),
        reason: format!("parsing: {e}"),
    })?;
    sanitize_document(&mut raw);
    let connect_entries = extract_connect_entries(&raw);
    let doc = load_document(&spec.spec_name, raw)?;

    let mut entries = extract_entries(&doc);
    entries.extend(connect_entries);
    for entry in &entries {
        let id = format!(
            "{}|{}|{}|{}",
            spec.spec_name, entry.method, entry.template, entry.operation_id
        );
        let mut document = TantivyDocument::new();
        document.add_text(fields.id, &id);
        document.add_text(fields.spec_name, &spec.spec_name);
        document.add_text(fields.operation_id, &entry.operation_id);
        document.add_text(fields.method, &entry.method);
        document.add_text(fields.template, &entry.template);
        document.add_text(fields.description, &entry.description);
        for tag in &entry.tags {
            document.add_text(fields.tags, tag);
        }
        writer
            .add_document(document)
            .map_err(|e| PortalError::Index(format!("indexing {id}: {e}")))?;
    }
    Ok(entries.len())
}

impl Shard {
    /// Runs one query against this shard, returning scored hits plus the
    /// shard's total match count. `fetch` bounds how many hits are pulled
    /// for later cross-shard merging.
    pub(crate) fn query(
        &self,
        params: &SearchParams,
        lenient: bool,
        fetch: usize,
    ) -> Result<(Vec<(f32, SearchResult)>, usize)> {
        let parser = QueryParser::for_index(
            &self.index,
            vec![
                self.fields.operation_id,
                self.fields.method,
                self.fields.template,
                self.fields.description,
            ],
        );
        let text_query: Box<dyn Query> = if lenient {
            parser.parse_query_lenient(&params.query).0
        } else {
            parser
                .parse_query(&params.query)
                .map_err(|e| PortalError::Search(e.to_string()))?
        };

        let query: Box<dyn Query> = if params.specs.is_empty() && params.tags.is_empty() {
            text_query
        } else {
            let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(Occur::Must, text_query)];
            if !params.specs.is_empty() {
                clauses.push((Occur::Must, disjunction(self.fields.spec_name, &params.specs)));
            }
            if !params.tags.is_empty() {
                clauses.push((Occur::Must, disjunction(self.fields.tags, &params.tags)));
            }
            Box::new(BooleanQuery::new(clauses))
        };

        let searcher = self.reader.searcher();
        let total = searcher
            .search(&query, &Count)
            .map_err(|e| PortalError::Search(e.to_string()))?;
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(fetch.max(1)))
            .map_err(|e| PortalError::Search(e.to_string()))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let document: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| PortalError::Search(e.to_string()))?;
            hits.push((score, self.materialize(&document)));
        }
        Ok((hits, total))
    }

    /// Splits the stored id back into its four components and pulls the
    /// remaining fields off the stored document.
    fn materialize(&self, document: &TantivyDocument) -> SearchResult {
        let tags: Vec<String> = document
            .get_all(self.fields.tags)
            .filter_map(owned_str)
            .collect();
        let description = document
            .get_first(self.fields.description)
            .and_then(owned_str)
            .unwrap_or_default();
        let id = document
            .get_first(self.fields.id)
            .and_then(owned_str)
            .unwrap_or_default();

        let parts: Vec<&str> = id.split('|').collect();
        if parts.len() == 4 {
            SearchResult {
                spec_name: parts[0].to_string(),
                method: parts[1].to_string(),
                template: parts[2].to_string(),
                operation_id: parts[3].to_string(),
                description,
                tags,
            }
        } else {
            SearchResult {
                description,
                tags,
                ..SearchResult::default()
            }
        }
    }
}

fn owned_str(value: &OwnedValue) -> Option<String> {
    match value {
        OwnedValue::Str(s) => Some(s.clone()),
        _ => None,
    }
}

/// OR of exact term matches on a keyword field.
fn disjunction(field: Field, values: &[String]) -> Box<dyn Query> {
    let terms: Vec<(Occur, Box<dyn Query>)> = values
        .iter()
        .map(|value| {
            let term = Term::from_field_text(field, value);
            (
                Occur::Should,
                Box::new(TermQuery::new(term, IndexRecordOption::Basic)) as Box<dyn Query>,
            )
        })
        .collect();
    Box::new(BooleanQuery::new(terms))
}
