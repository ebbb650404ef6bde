//! # NLQ Core
//!
//! Shared, I/O-free logic for the NLQ engine: schema model, query
//! normalization, classification, heuristic SQL translation, document
//! keyword search, the answer cache, and the dispatcher that ties them
//! together.
//!
//! This crate contains no tokio, sqlx, or filesystem dependencies. The
//! database is reached only through the [`database::Database`] trait.
//!
//! ## Pipeline
//!
//! ```text
//!  raw text ─▶ normalize ─▶ cache? ──hit──▶ QueryResult (cache_hit)
//!                              │miss
//!                              ▼
//!                          classify ─┬─ sql ──────▶ translate ─▶ Database::execute
//!                                    ├─ document ─▶ search(DocumentSnapshot)
//!                                    ├─ hybrid ───▶ both ─▶ combine
//!                                    └─ unknown ──▶ error result (never cached)
//! ```

pub mod cache;
pub mod classify;
pub mod database;
pub mod dispatch;
pub mod documents;
pub mod error;
pub mod models;
pub mod normalize;
pub mod search;
pub mod translate;

pub use dispatch::{EngineOptions, MergePolicy, QueryEngine};
pub use error::{ErrorKind, QueryError};
pub use models::{QueryResult, SchemaInfo};
