use anyhow::{Context, Result};
use nlq_core::models::MergeOutcome;
use nlq_core::{QueryEngine, QueryResult};
use std::path::PathBuf;

use crate::config::Config;
use crate::ingest;
use crate::sqlite_db::SqliteDatabase;

/// Open the configured database and build an engine over it.
pub async fn build_engine(config: &Config) -> Result<QueryEngine<SqliteDatabase>> {
    let db = SqliteDatabase::open(config).await?;
    let engine = QueryEngine::connect(db, config.engine_options())
        .await
        .with_context(|| format!("Failed to describe database {}", config.db.path.display()))?;
    Ok(engine)
}

/// `nlq ask`: answer one question, optionally after loading documents.
pub async fn run_ask(
    config: &Config,
    question: &str,
    docs: &[PathBuf],
    repeat: usize,
    json: bool,
) -> Result<()> {
    let engine = build_engine(config).await?;

    if !docs.is_empty() {
        let loaded = ingest::ingest_paths(&engine, docs, config.documents.max_bytes)?;
        if !json {
            println!("Loaded {} document(s).", loaded.len());
        }
    }

    for _ in 0..repeat.max(1) {
        let result = engine.answer(question).await;
        if json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print_result(&result);
        }
    }

    Ok(())
}

fn print_result(result: &QueryResult) {
    println!(
        "source: {}  cache_hit: {}  elapsed: {:.2} ms",
        result.source, result.cache_hit, result.elapsed_ms
    );

    if let Some(err) = &result.error {
        println!("error: {}: {}", err.kind, err.message);
        println!();
        return;
    }

    if let Some(sql) = &result.sql {
        println!("sql: {}", sql);
    }
    if let Some(rows) = &result.sql_rows {
        println!("rows ({}):", rows.len());
        for row in rows {
            println!("  {}", serde_json::Value::Object(row.clone()));
        }
    }
    if let Some(matches) = &result.document_matches {
        if matches.is_empty() {
            println!("documents: no matches.");
        } else {
            println!("documents ({}):", matches.len());
        }
        for m in matches {
            match m.row {
                Some(row) => println!("  {} [row {}]: {}", m.filename, row, m.excerpt),
                None => println!("  {}: {}", m.filename, m.excerpt),
            }
        }
    }
    match &result.merge {
        Some(MergeOutcome::Intersected { shared_entities }) => {
            println!("merge: intersected on {}", shared_entities.join(", "));
        }
        Some(MergeOutcome::Concatenated) => println!("merge: concatenated"),
        None => {}
    }
    println!();
}
