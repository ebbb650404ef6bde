//! Database abstraction for the query engine.
//!
//! The [`Database`] trait is the only way the core reaches a relational
//! backend: once to describe its schema at startup, then once per SQL
//! answer to run a [`SqlStatement`] produced by the translator.
//!
//! Implementations must be `Send + Sync` so a single engine can be shared
//! across request handlers.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`describe`](Database::describe) | Discover tables, columns, relationships, samples |
//! | [`execute`](Database::execute) | Run a read-only statement and return its rows |

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Row, SchemaInfo};
use crate::translate::SqlStatement;

#[async_trait]
pub trait Database: Send + Sync {
    /// Discover the current schema.
    async fn describe(&self) -> Result<SchemaInfo>;

    /// Execute a statement, binding its parameters in order.
    ///
    /// Rows keep the column order of the result set.
    async fn execute(&self, statement: &SqlStatement) -> Result<Vec<Row>>;
}

#[async_trait]
impl<D: Database + ?Sized> Database for std::sync::Arc<D> {
    async fn describe(&self) -> Result<SchemaInfo> {
        (**self).describe().await
    }

    async fn execute(&self, statement: &SqlStatement) -> Result<Vec<Row>> {
        (**self).execute(statement).await
    }
}
