use anyhow::{bail, Context, Result};
use nlq_core::database::Database;
use nlq_core::models::{DocumentSummary, FileKind};
use nlq_core::QueryEngine;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions picked up when a directory is ingested.
const DOCUMENT_EXTENSIONS: &[&str] = &["txt", "csv", "md"];

/// Expand files and directories into the list of files to ingest.
///
/// Explicit files are taken as given. Directories are walked recursively
/// for `.txt`, `.csv` and `.md` files, skipping hidden entries.
pub fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.exists() {
            bail!("Document path does not exist: {}", path.display());
        }
        if path.is_file() {
            files.push(path.clone());
            continue;
        }

        let mut found = Vec::new();
        let walker = WalkDir::new(path)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));
        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file() && has_document_extension(entry.path()) {
                found.push(entry.into_path());
            }
        }
        // Sort for deterministic ordering
        found.sort();
        files.extend(found);
    }
    Ok(files)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

fn has_document_extension(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .map(|e| DOCUMENT_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or(false)
}

/// Read one file and add it to the engine's document store under its
/// file name.
pub fn ingest_file<D: Database>(
    engine: &QueryEngine<D>,
    path: &Path,
    max_bytes: usize,
) -> Result<DocumentSummary> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| anyhow::anyhow!("Not a file: {}", path.display()))?;

    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    if bytes.len() > max_bytes {
        bail!(
            "{} is {} bytes, larger than documents.max_bytes ({})",
            path.display(),
            bytes.len(),
            max_bytes
        );
    }

    let record = engine.ingest(&filename, &bytes, FileKind::from_filename(&filename))?;
    tracing::info!(file = %path.display(), kind = %record.kind, "document loaded");
    Ok(record.summary())
}

/// Ingest every document under `paths`.
pub fn ingest_paths<D: Database>(
    engine: &QueryEngine<D>,
    paths: &[PathBuf],
    max_bytes: usize,
) -> Result<Vec<DocumentSummary>> {
    collect_files(paths)?
        .iter()
        .map(|p| ingest_file(engine, p, max_bytes))
        .collect()
}
