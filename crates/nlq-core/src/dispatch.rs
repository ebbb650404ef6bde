//! Query dispatcher.
//!
//! [`QueryEngine::answer`] drives one question through the pipeline:
//!
//! ```text
//! RECEIVED → CACHE_CHECK ─hit─▶ DONE
//!                 │miss
//!                 ▼
//!             CLASSIFY → ROUTE ─┬─ SQL_PATH ────┐
//!                               ├─ DOC_PATH ────┼─▶ COMBINE → CACHE_STORE → DONE
//!                               └─ HYBRID_PATH ─┘
//! ```
//!
//! `answer` is total: every failure becomes a [`QueryResult`] carrying an
//! error, and failed results are never cached.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::QueryCache;
use crate::classify::{classify, QueryClassification};
use crate::database::Database;
use crate::documents::{DocumentSnapshot, DocumentStore, IngestError};
use crate::error::QueryError;
use crate::models::{
    Category, DocumentContent, DocumentMatch, DocumentRecord, DocumentSummary, FileKind,
    MergeOutcome, QueryResult, Row, SchemaInfo,
};
use crate::search::{contains_ignore_case, search_with, DEFAULT_EXCERPT_CHARS};
use crate::translate::{translate_with_limit, DEFAULT_ROW_LIMIT};

/// How the two halves of a hybrid answer are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Narrow both halves to entities they share, when there are any.
    #[default]
    FilterByEntity,
    /// Always return both halves in full.
    Concatenate,
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub merge_policy: MergePolicy,
    /// SQL result columns whose values identify an entity in documents.
    pub entity_columns: Vec<String>,
    pub excerpt_chars: usize,
    pub default_row_limit: u32,
    pub cache_enabled: bool,
    /// Most answers kept; `None` keeps every answer.
    pub cache_capacity: Option<usize>,
}

pub const DEFAULT_CACHE_CAPACITY: usize = 200;

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            merge_policy: MergePolicy::default(),
            entity_columns: vec!["full_name".to_string()],
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            default_row_limit: DEFAULT_ROW_LIMIT,
            cache_enabled: true,
            cache_capacity: Some(DEFAULT_CACHE_CAPACITY),
        }
    }
}

/// The query engine: a database, its discovered schema, the document
/// store, and the answer cache.
pub struct QueryEngine<D> {
    db: D,
    schema: SchemaInfo,
    documents: DocumentStore,
    cache: QueryCache,
    options: EngineOptions,
}

impl<D: Database> QueryEngine<D> {
    /// Describe `db` and build an engine around it.
    ///
    /// Fails with [`QueryError::SchemaUnavailable`] when the schema cannot
    /// be discovered; the engine never runs without one.
    pub async fn connect(db: D, options: EngineOptions) -> Result<Self, QueryError> {
        let schema = db.describe().await.map_err(QueryError::SchemaUnavailable)?;
        tracing::info!(tables = schema.tables.len(), "schema discovered");
        Ok(Self {
            db,
            schema,
            documents: DocumentStore::new(),
            cache: options
                .cache_capacity
                .map_or_else(QueryCache::new, QueryCache::with_capacity),
            options,
        })
    }

    pub fn schema(&self) -> &SchemaInfo {
        &self.schema
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn database(&self) -> &D {
        &self.db
    }

    pub fn ingest(
        &self,
        filename: &str,
        bytes: &[u8],
        kind: FileKind,
    ) -> Result<Arc<DocumentRecord>, IngestError> {
        self.documents.ingest(filename, bytes, kind)
    }

    pub fn remove_document(&self, filename: &str) -> Result<DocumentSummary, QueryError> {
        self.documents
            .remove(filename)
            .map(|d| d.summary())
            .ok_or_else(|| QueryError::DocumentNotFound(filename.to_string()))
    }

    pub fn documents(&self) -> Vec<DocumentSummary> {
        self.documents
            .snapshot()
            .documents()
            .iter()
            .map(|d| d.summary())
            .collect()
    }

    /// Answer one natural-language question.
    pub async fn answer(&self, raw_text: &str) -> QueryResult {
        let started = Instant::now();
        let key = QueryCache::key(raw_text);
        let snapshot = self.documents.snapshot();
        let generation = snapshot.generation();

        if self.options.cache_enabled {
            if let Some(mut hit) = self.cache.get(&key, generation) {
                hit.query = raw_text.to_string();
                hit.cache_hit = true;
                hit.elapsed_ms = elapsed_ms(started);
                tracing::debug!(query = %key, "cache hit");
                return hit;
            }
        }

        let classification = classify(raw_text, &self.schema);
        let category = classification.category;
        tracing::debug!(
            query = %key,
            category = %category,
            sql_signals = ?classification.sql_signals,
            document_signals = ?classification.document_signals,
            "classified"
        );

        let mut result = match self.route(raw_text, &classification, &snapshot).await {
            Ok(result) => result,
            Err(err) => {
                match &err {
                    QueryError::DatabaseExecution(source) => {
                        tracing::error!(query = %key, error = ?source, "database execution failed")
                    }
                    other => tracing::debug!(query = %key, error = %other, "query not answered"),
                }
                QueryResult::failure(raw_text, category, &err)
            }
        };
        result.elapsed_ms = elapsed_ms(started);

        if self.options.cache_enabled && result.is_success() {
            // SQL answers do not depend on the document store.
            let depends_on = (category != Category::Sql).then_some(generation);
            self.cache.insert(key, result.clone(), depends_on);
        }

        tracing::info!(
            source = %result.source,
            ok = result.is_success(),
            elapsed_ms = result.elapsed_ms,
            "query answered"
        );
        result
    }

    async fn route(
        &self,
        raw_text: &str,
        classification: &QueryClassification,
        snapshot: &DocumentSnapshot,
    ) -> Result<QueryResult, QueryError> {
        let mut result = QueryResult::new(raw_text, classification.category);
        match classification.category {
            Category::Sql => {
                let (sql, rows) = self.sql_path(classification).await?;
                result.sql = Some(sql);
                result.sql_rows = Some(rows);
            }
            Category::Document => {
                result.document_matches = Some(self.doc_path(classification, snapshot)?);
            }
            Category::Hybrid => {
                let (sql, rows) = self.sql_path(classification).await?;
                let matches = self.doc_path(classification, snapshot)?;
                let (rows, matches, merge) = self.combine(rows, matches, snapshot);
                result.sql = Some(sql);
                result.sql_rows = Some(rows);
                result.document_matches = Some(matches);
                result.merge = Some(merge);
            }
            Category::Unknown => {
                return Err(QueryError::UnrecognizedQuery(format!(
                    "\"{}\" does not mention any known data or document terms",
                    classification.normalized
                )));
            }
        }
        Ok(result)
    }

    async fn sql_path(
        &self,
        classification: &QueryClassification,
    ) -> Result<(String, Vec<Row>), QueryError> {
        let statement =
            translate_with_limit(classification, &self.schema, self.options.default_row_limit)?;
        tracing::debug!(pattern = ?statement.pattern(), sql = statement.sql(), "translated");
        let rows = self
            .db
            .execute(&statement)
            .await
            .map_err(QueryError::DatabaseExecution)?;
        Ok((statement.sql().to_string(), rows))
    }

    fn doc_path(
        &self,
        classification: &QueryClassification,
        snapshot: &DocumentSnapshot,
    ) -> Result<Vec<DocumentMatch>, QueryError> {
        let keyword = classification.params.keyword.as_deref().ok_or_else(|| {
            QueryError::UnrecognizedQuery("no search term found in the question".to_string())
        })?;
        let matches: Vec<DocumentMatch> =
            search_with(keyword, snapshot, self.options.excerpt_chars).collect();
        tracing::debug!(keyword, matches = matches.len(), "documents searched");
        Ok(matches)
    }

    fn combine(
        &self,
        rows: Vec<Row>,
        matches: Vec<DocumentMatch>,
        snapshot: &DocumentSnapshot,
    ) -> (Vec<Row>, Vec<DocumentMatch>, MergeOutcome) {
        if self.options.merge_policy == MergePolicy::Concatenate {
            return (rows, matches, MergeOutcome::Concatenated);
        }

        let texts: Vec<Cow<'_, str>> = matches.iter().map(|m| match_text(m, snapshot)).collect();
        let mut shared: Vec<String> = Vec::new();
        for entity in rows.iter().flat_map(|r| self.entities(r)) {
            if !shared.contains(&entity) && texts.iter().any(|t| contains_ignore_case(t, &entity)) {
                shared.push(entity);
            }
        }
        if shared.is_empty() {
            return (rows, matches, MergeOutcome::Concatenated);
        }

        let keep: Vec<bool> = texts
            .iter()
            .map(|text| shared.iter().any(|e| contains_ignore_case(text, e)))
            .collect();
        let rows = rows
            .into_iter()
            .filter(|r| self.entities(r).iter().any(|e| shared.contains(e)))
            .collect();
        let matches = matches
            .into_iter()
            .zip(keep)
            .filter_map(|(m, keep)| keep.then_some(m))
            .collect();
        (
            rows,
            matches,
            MergeOutcome::Intersected {
                shared_entities: shared,
            },
        )
    }

    /// Entity identifiers in one SQL row.
    fn entities(&self, row: &Row) -> Vec<String> {
        row.iter()
            .filter(|(column, _)| {
                self.options
                    .entity_columns
                    .iter()
                    .any(|c| c.eq_ignore_ascii_case(column))
            })
            .filter_map(|(_, value)| value.as_str())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Full text behind a match: the whole document or the whole row, so
/// entities outside the excerpt still count.
fn match_text<'a>(m: &'a DocumentMatch, snapshot: &'a DocumentSnapshot) -> Cow<'a, str> {
    match snapshot.get(&m.filename).map(|d| &d.content) {
        Some(DocumentContent::Text(text)) => Cow::Borrowed(text.as_str()),
        Some(content @ DocumentContent::Rows { .. }) => m
            .row
            .and_then(|i| content.row_text(i))
            .map_or(Cow::Borrowed(m.excerpt.as_str()), Cow::Owned),
        None => Cow::Borrowed(m.excerpt.as_str()),
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
