use anyhow::Result;
use nlq_core::database::Database;
use nlq_core::SchemaInfo;

use crate::config::Config;
use crate::sqlite_db::SqliteDatabase;

/// `nlq schema`: print the discovered tables.
pub async fn run_schema(config: &Config, json: bool) -> Result<()> {
    let db = SqliteDatabase::open(config).await?;
    let schema = db.describe().await?;
    db.pool().close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&schema)?);
    } else {
        print!("{}", render_schema(&schema));
    }
    Ok(())
}

fn render_schema(schema: &SchemaInfo) -> String {
    if schema.tables.is_empty() {
        return "No tables.\n".to_string();
    }

    let mut out = String::new();
    for (name, table) in &schema.tables {
        out.push_str(&format!("{}\n", name));
        for col in &table.columns {
            let pk = if col.primary_key { "  [pk]" } else { "" };
            out.push_str(&format!("  {:<20} {}{}\n", col.name, col.data_type, pk));
        }
        for rel in &table.relationships {
            out.push_str(&format!("  {} -> {}\n", rel.column, rel.likely_ref_table));
        }
        out.push_str(&format!("  ({} sample rows)\n", table.sample.len()));
    }
    out
}
