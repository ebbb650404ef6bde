//! # NLQ Engine
//!
//! Answers natural-language questions from a SQLite database, from
//! uploaded text/CSV documents, or from both.
//!
//! The query pipeline itself (classification, SQL translation, document
//! search, caching, dispatch) lives in the `nlq-core` crate. This crate
//! wires it to SQLite via sqlx, adds configuration, file ingestion, the
//! CLI, and the HTTP server.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌──────────┐
//! │  Documents  │──▶│   QueryEngine    │◀──│  SQLite  │
//! │  txt / csv  │   │ classify+route   │   │ (sqlx)   │
//! └─────────────┘   └────────┬─────────┘   └──────────┘
//!                            │
//!                  ┌─────────┴─────────┐
//!                  ▼                   ▼
//!             ┌──────────┐       ┌──────────┐
//!             │   CLI    │       │   HTTP   │
//!             │  (nlq)   │       │  (axum)  │
//!             └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! nlq init                                   # create and seed the demo database
//! nlq ask "How many employees do we have?"
//! nlq ask "Employees with Python skills" --doc ./resumes
//! nlq serve                                  # start the HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Demo schema and seed data |
//! | [`sqlite_db`] | sqlx implementation of the core `Database` trait |
//! | [`ingest`] | Loading documents from disk |
//! | [`query`] | `nlq ask` |
//! | [`schema`] | `nlq schema` |
//! | [`server`] | HTTP server |
//! | [`page`] | HTML page served at `/` |

pub mod config;
pub mod db;
pub mod ingest;
pub mod migrate;
pub mod page;
pub mod query;
pub mod schema;
pub mod server;
pub mod sqlite_db;

pub use nlq_core;
