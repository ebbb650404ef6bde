//! Typed failures of the query pipeline.
//!
//! Every failure the dispatcher can meet is a [`QueryError`]. The
//! dispatcher never lets one escape [`answer`](crate::QueryEngine::answer);
//! it is converted into an [`ErrorInfo`](crate::models::ErrorInfo) on the
//! returned result instead.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable error category, serialized verbatim into results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    SchemaUnavailable,
    UnrecognizedQuery,
    SchemaMismatch,
    DocumentNotFound,
    DatabaseExecutionError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::SchemaUnavailable => "SchemaUnavailable",
            ErrorKind::UnrecognizedQuery => "UnrecognizedQuery",
            ErrorKind::SchemaMismatch => "SchemaMismatch",
            ErrorKind::DocumentNotFound => "DocumentNotFound",
            ErrorKind::DatabaseExecutionError => "DatabaseExecutionError",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The database could not be reached or described at startup.
    #[error("database schema unavailable: {0}")]
    SchemaUnavailable(#[source] anyhow::Error),

    /// No heuristic could make sense of the input.
    #[error("could not understand this query: {0}")]
    UnrecognizedQuery(String),

    /// A matched template references a table or column the database lacks.
    #[error("query not supported for this dataset: {table}.{column} is missing")]
    SchemaMismatch { table: String, column: String },

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// The statement failed inside the database. The source is logged, not shown.
    #[error("database execution failed")]
    DatabaseExecution(#[source] anyhow::Error),
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::SchemaUnavailable(_) => ErrorKind::SchemaUnavailable,
            QueryError::UnrecognizedQuery(_) => ErrorKind::UnrecognizedQuery,
            QueryError::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            QueryError::DocumentNotFound(_) => ErrorKind::DocumentNotFound,
            QueryError::DatabaseExecution(_) => ErrorKind::DatabaseExecutionError,
        }
    }

    /// Message safe to show to an end user.
    ///
    /// Database internals are replaced with a generic sentence; the other
    /// variants already describe the problem in user terms.
    pub fn user_message(&self) -> String {
        match self {
            QueryError::SchemaUnavailable(_) => {
                "the database is not available right now".to_string()
            }
            QueryError::DatabaseExecution(_) => {
                "the database could not run this query".to_string()
            }
            other => other.to_string(),
        }
    }
}
