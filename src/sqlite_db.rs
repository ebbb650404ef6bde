//! SQLite implementation of the core [`Database`] trait.
//!
//! Schema discovery reads `sqlite_master` and `pragma_table_info`, takes up
//! to three sample rows per table, and infers `*_id` relationships.
//! Result cells are converted to JSON by their runtime storage class:
//!
//! | SQLite | JSON |
//! |--------|------|
//! | `INTEGER` | number |
//! | `REAL` | number |
//! | `TEXT` | string |
//! | `BLOB` | base64 string |
//! | `NULL` | null |

use anyhow::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use nlq_core::database::Database;
use nlq_core::models::{ColumnInfo, Row, SchemaInfo, TableInfo};
use nlq_core::translate::{SqlStatement, SqlValue};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row as _, SqlitePool, TypeInfo, ValueRef};
use std::collections::BTreeMap;

use crate::config::Config;
use crate::db;

const SAMPLE_ROWS: usize = 3;

pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the configured database read-only.
    pub async fn open(config: &Config) -> Result<Self> {
        Ok(Self::new(db::connect_read_only(config).await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn describe_table(&self, table: &str) -> Result<TableInfo> {
        let columns = sqlx::query("SELECT name, type, pk FROM pragma_table_info(?) ORDER BY cid")
            .bind(table)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| {
                Ok(ColumnInfo {
                    name: row.try_get("name")?,
                    data_type: row.try_get("type")?,
                    primary_key: row.try_get::<i64, _>("pk")? > 0,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let sample_sql = format!(
            "SELECT * FROM \"{}\" LIMIT {}",
            table.replace('"', "\"\""),
            SAMPLE_ROWS
        );
        let sample = sqlx::query(&sample_sql)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(row_to_json)
            .collect::<Result<Vec<_>>>()?;

        Ok(TableInfo {
            columns,
            relationships: Vec::new(),
            sample,
        })
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn describe(&self) -> Result<SchemaInfo> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut tables = BTreeMap::new();
        for name in names {
            let info = self.describe_table(&name).await?;
            tables.insert(name, info);
        }

        let mut schema = SchemaInfo {
            tables,
            discovered_at: Utc::now(),
        };
        schema.infer_relationships();
        Ok(schema)
    }

    async fn execute(&self, statement: &SqlStatement) -> Result<Vec<Row>> {
        let mut query = sqlx::query(statement.sql());
        for param in statement.params() {
            query = match param {
                SqlValue::Integer(n) => query.bind(*n),
                SqlValue::Text(s) => query.bind(s.clone()),
            };
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_json).collect()
    }
}

fn row_to_json(row: &SqliteRow) -> Result<Row> {
    let mut out = Row::new();
    for (i, column) in row.columns().iter().enumerate() {
        let storage = {
            let raw = row.try_get_raw(i)?;
            if raw.is_null() {
                None
            } else {
                Some(raw.type_info().name().to_string())
            }
        };
        let value = match storage.as_deref() {
            None => Value::Null,
            Some("INTEGER") => Value::from(row.try_get_unchecked::<i64, _>(i)?),
            Some("REAL") => Value::from(row.try_get_unchecked::<f64, _>(i)?),
            Some("BLOB") => Value::String(BASE64.encode(row.try_get_unchecked::<Vec<u8>, _>(i)?)),
            Some(_) => Value::String(row.try_get_unchecked::<String, _>(i)?),
        };
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}
