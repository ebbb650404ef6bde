//! In-memory document store and ingestion.
//!
//! The store is copy-on-append: readers take an immutable
//! [`DocumentSnapshot`] (an `Arc`), and every mutation builds a new
//! snapshot and swaps it in under a write lock. A search that started
//! before an ingest keeps seeing the old snapshot, so a document is
//! observed either complete or not at all.
//!
//! Every mutation also bumps the snapshot's `generation`, which the query
//! cache uses to recognize answers computed against older documents.

use chrono::Utc;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

use crate::models::{DocumentContent, DocumentRecord, FileKind};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("filename must not be empty")]
    EmptyFilename,
    #[error("invalid CSV in {filename}: {source}")]
    Csv {
        filename: String,
        #[source]
        source: csv::Error,
    },
}

/// An immutable view of the store at one point in time.
#[derive(Debug, Default)]
pub struct DocumentSnapshot {
    generation: u64,
    documents: Vec<Arc<DocumentRecord>>,
}

impl DocumentSnapshot {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Documents in insertion order.
    pub fn documents(&self) -> &[Arc<DocumentRecord>] {
        &self.documents
    }

    pub fn get(&self, filename: &str) -> Option<&Arc<DocumentRecord>> {
        self.documents.iter().find(|d| d.filename == filename)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Process-wide document store shared by ingestion and search.
#[derive(Debug, Default)]
pub struct DocumentStore {
    current: RwLock<Arc<DocumentSnapshot>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Arc<DocumentSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Parse `bytes` as `kind` and add the result to the store.
    ///
    /// Filenames are unique: ingesting a filename that is already present
    /// replaces the earlier document, and the new one moves to the end.
    pub fn ingest(
        &self,
        filename: &str,
        bytes: &[u8],
        kind: FileKind,
    ) -> Result<Arc<DocumentRecord>, IngestError> {
        let record = Arc::new(parse_document(filename, bytes, kind)?);

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut documents: Vec<Arc<DocumentRecord>> = current
            .documents
            .iter()
            .filter(|d| d.filename != record.filename)
            .cloned()
            .collect();
        documents.push(record.clone());
        *current = Arc::new(DocumentSnapshot {
            generation: current.generation + 1,
            documents,
        });

        tracing::debug!(
            filename = %record.filename,
            kind = %record.kind,
            generation = current.generation,
            "document ingested"
        );
        Ok(record)
    }

    /// Remove a document by filename. Returns the removed record, if any.
    pub fn remove(&self, filename: &str) -> Option<Arc<DocumentRecord>> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let removed = current.get(filename).cloned()?;
        let documents = current
            .documents
            .iter()
            .filter(|d| d.filename != filename)
            .cloned()
            .collect();
        *current = Arc::new(DocumentSnapshot {
            generation: current.generation + 1,
            documents,
        });
        Some(removed)
    }
}

/// Build a [`DocumentRecord`] from raw upload bytes.
///
/// Text is decoded as UTF-8, falling back to Latin-1 for other byte
/// sequences. CSV uses the first record as headers and tolerates ragged
/// rows; blank rows are dropped.
pub fn parse_document(
    filename: &str,
    bytes: &[u8],
    kind: FileKind,
) -> Result<DocumentRecord, IngestError> {
    let filename = filename.trim();
    if filename.is_empty() {
        return Err(IngestError::EmptyFilename);
    }

    let text = decode_text(bytes);
    let content = match kind {
        FileKind::Txt => DocumentContent::Text(text),
        FileKind::Csv => parse_csv(&text).map_err(|source| IngestError::Csv {
            filename: filename.to_string(),
            source,
        })?,
    };

    Ok(DocumentRecord {
        id: Uuid::new_v4().to_string(),
        filename: filename.to_string(),
        kind,
        content,
        ingested_at: Utc::now(),
    })
}

fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.trim_start_matches('\u{feff}').to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

fn parse_csv(text: &str) -> Result<DocumentContent, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(DocumentContent::Rows { headers, rows })
}
