//! In-memory [`Database`] for tests and embedding without SQLite.
//!
//! Holds a fixed [`SchemaInfo`] and canned result rows per
//! [`QueryPattern`]. Statements are not interpreted; the rows registered
//! for the statement's pattern are returned as-is (empty if none).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::{Row, SchemaInfo};
use crate::translate::{QueryPattern, SqlStatement};

use super::Database;

pub struct InMemoryDatabase {
    schema: SchemaInfo,
    rows: RwLock<HashMap<QueryPattern, Vec<Row>>>,
    unavailable: bool,
    failing: AtomicBool,
    executions: AtomicUsize,
}

impl InMemoryDatabase {
    pub fn new(schema: SchemaInfo) -> Self {
        Self {
            schema,
            rows: RwLock::new(HashMap::new()),
            unavailable: false,
            failing: AtomicBool::new(false),
            executions: AtomicUsize::new(0),
        }
    }

    /// A database whose `describe` always fails.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new(SchemaInfo::default())
        }
    }

    /// Register the rows returned for `pattern`.
    pub fn with_rows(self, pattern: QueryPattern, rows: Vec<Row>) -> Self {
        self.rows.write().unwrap().insert(pattern, rows);
        self
    }

    /// Make every subsequent `execute` fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `execute` calls so far, failed ones included.
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Database for InMemoryDatabase {
    async fn describe(&self) -> Result<SchemaInfo> {
        if self.unavailable {
            bail!("in-memory database configured as unavailable");
        }
        Ok(self.schema.clone())
    }

    async fn execute(&self, statement: &SqlStatement) -> Result<Vec<Row>> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            bail!("no such table: {:?}", statement.pattern());
        }
        let rows = self.rows.read().unwrap();
        Ok(rows.get(&statement.pattern()).cloned().unwrap_or_default())
    }
}
