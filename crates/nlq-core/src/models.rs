//! Core data models shared by every stage of the pipeline.
//!
//! These types describe the discovered database schema, ingested
//! documents, and the structured answers returned to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ErrorKind, QueryError};

/// One result row, keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

// ============ Schema ============

/// A single column as reported by the database catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Declared type (e.g. `INTEGER`, `TEXT`); may be empty in SQLite.
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub primary_key: bool,
}

/// A likely foreign-key reference inferred from column naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub column: String,
    pub likely_ref_table: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Columns in catalog order.
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub sample: Vec<Row>,
}

impl TableInfo {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Table name → table metadata, discovered once per connected database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub tables: BTreeMap<String, TableInfo>,
    pub discovered_at: DateTime<Utc>,
}

impl SchemaInfo {
    /// Case-insensitive table lookup.
    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.tables
            .iter()
            .find(|(t, _)| t.eq_ignore_ascii_case(name))
            .map(|(_, info)| info)
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.table(table)
            .map(|t| t.column(column).is_some())
            .unwrap_or(false)
    }

    /// Fill in [`TableInfo::relationships`] from `*_id` column names.
    ///
    /// A non-primary-key column `x_id` refers to the table named `x` (or its
    /// plural), else the first table starting with `x`, else the first table
    /// `x` abbreviates (`dept` → `departments`). With no match the target is
    /// `x` itself.
    pub fn infer_relationships(&mut self) {
        let names: Vec<String> = self.tables.keys().cloned().collect();
        for info in self.tables.values_mut() {
            info.relationships = info
                .columns
                .iter()
                .filter(|c| !c.primary_key)
                .filter_map(|c| {
                    let lower = c.name.to_lowercase();
                    let prefix = lower.strip_suffix("_id")?;
                    if prefix.is_empty() {
                        return None;
                    }
                    let target = referenced_table(prefix, &names)
                        .unwrap_or_else(|| prefix.to_string());
                    Some(Relationship {
                        column: c.name.clone(),
                        likely_ref_table: target,
                    })
                })
                .collect();
        }
    }

    /// Phrases that identify database entities in free text.
    ///
    /// Includes every table and column name, their underscore-free forms
    /// (`annual salary`), and the singular of plural table names.
    pub fn vocabulary(&self) -> Vec<String> {
        let mut words = Vec::new();
        let mut push = |w: String| {
            if !w.is_empty() && !words.contains(&w) {
                words.push(w);
            }
        };
        for (table, info) in &self.tables {
            let t = table.to_lowercase();
            if let Some(singular) = t.strip_suffix('s') {
                push(singular.replace('_', " "));
            }
            push(t.replace('_', " "));
            push(t);
            for col in &info.columns {
                let c = col.name.to_lowercase();
                push(c.replace('_', " "));
                push(c);
            }
        }
        words
    }
}

fn referenced_table(prefix: &str, names: &[String]) -> Option<String> {
    let find = |matches: fn(&str, &str) -> bool| {
        names
            .iter()
            .find(|n| matches(prefix, &n.to_lowercase()))
            .cloned()
    };
    find(names_table)
        .or_else(|| find(|prefix, name| name.starts_with(prefix)))
        .or_else(|| find(abbreviates))
}

/// `name` is `prefix` or a plural of it.
fn names_table(prefix: &str, name: &str) -> bool {
    name == prefix || name.strip_suffix('s') == Some(prefix) || name.strip_suffix("es") == Some(prefix)
}

/// `short` shares the first letter of `name` and its letters occur in
/// `name` in order.
fn abbreviates(short: &str, name: &str) -> bool {
    let mut short_chars = short.chars();
    let mut name_chars = name.chars();
    if short_chars.next().is_none() || short.chars().next() != name_chars.next() {
        return false;
    }
    short_chars.all(|c| name_chars.any(|n| n == c))
}

// ============ Documents ============

/// Kind of uploaded file, which decides how its bytes are parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Txt,
    Csv,
}

impl FileKind {
    /// `.csv` files are parsed into rows; everything else is plain text.
    pub fn from_filename(filename: &str) -> Self {
        if filename.to_lowercase().ends_with(".csv") {
            FileKind::Csv
        } else {
            FileKind::Txt
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Txt => f.write_str("txt"),
            FileKind::Csv => f.write_str("csv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentContent {
    Text(String),
    Rows {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

impl DocumentContent {
    /// Flattened text of a single CSV row: its values joined by `", "`.
    pub fn row_text(&self, index: usize) -> Option<String> {
        match self {
            DocumentContent::Text(_) => None,
            DocumentContent::Rows { rows, .. } => rows.get(index).map(|r| r.join(", ")),
        }
    }

    pub fn row_count(&self) -> Option<usize> {
        match self {
            DocumentContent::Text(_) => None,
            DocumentContent::Rows { rows, .. } => Some(rows.len()),
        }
    }

    /// Total size of the stored text in bytes.
    pub fn byte_len(&self) -> usize {
        match self {
            DocumentContent::Text(t) => t.len(),
            DocumentContent::Rows { headers, rows } => {
                headers.iter().map(String::len).sum::<usize>()
                    + rows
                        .iter()
                        .flat_map(|r| r.iter())
                        .map(String::len)
                        .sum::<usize>()
            }
        }
    }
}

/// An ingested document. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub id: String,
    pub filename: String,
    pub kind: FileKind,
    pub content: DocumentContent,
    pub ingested_at: DateTime<Utc>,
}

impl DocumentRecord {
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id.clone(),
            filename: self.filename.clone(),
            kind: self.kind,
            ingested_at: self.ingested_at,
            bytes: self.content.byte_len(),
            rows: self.content.row_count(),
        }
    }
}

/// Lightweight view of a [`DocumentRecord`] for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    pub filename: String,
    pub kind: FileKind,
    pub ingested_at: DateTime<Utc>,
    pub bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
}

/// A keyword hit inside one document (or one row of a CSV document).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMatch {
    pub filename: String,
    /// Zero-based data row index for CSV documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    /// Text surrounding the hit.
    pub excerpt: String,
}

// ============ Query results ============

/// Classification tag, also used as the `source` label of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Sql,
    Document,
    Hybrid,
    Unknown,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Sql => "sql",
            Category::Document => "document",
            Category::Hybrid => "hybrid",
            Category::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// How the two halves of a hybrid answer were combined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// Both halves referenced the same entities and were narrowed to them.
    Intersected { shared_entities: Vec<String> },
    /// Both halves are returned in full.
    Concatenated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&QueryError> for ErrorInfo {
    fn from(err: &QueryError) -> Self {
        Self {
            kind: err.kind(),
            message: err.user_message(),
        }
    }
}

/// The answer to one natural-language query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// The query text as received.
    pub query: String,
    pub source: Category,
    /// SQL text that produced `sql_rows`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_rows: Option<Vec<Row>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_matches: Option<Vec<DocumentMatch>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergeOutcome>,
    pub cache_hit: bool,
    /// Wall-clock time spent answering this call.
    pub elapsed_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl QueryResult {
    pub fn new(query: &str, source: Category) -> Self {
        Self {
            query: query.to_string(),
            source,
            sql: None,
            sql_rows: None,
            document_matches: None,
            merge: None,
            cache_hit: false,
            elapsed_ms: 0.0,
            error: None,
        }
    }

    pub fn failure(query: &str, source: Category, err: &QueryError) -> Self {
        Self {
            error: Some(ErrorInfo::from(err)),
            ..Self::new(query, source)
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
