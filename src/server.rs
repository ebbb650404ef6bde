//! HTTP server for the query engine.
//!
//! Serves the single-page UI and a JSON API over one shared
//! [`QueryEngine`]. Uploaded documents live in memory for the lifetime of
//! the process.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | HTML page |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/api/schema` | Discovered database schema |
//! | `POST` | `/api/query` | Answer a question |
//! | `GET`  | `/api/documents` | List ingested documents |
//! | `POST` | `/api/documents` | Upload a document |
//! | `DELETE` | `/api/documents/{filename}` | Remove a document |
//! | `GET`  | `/api/cache` | Cache statistics |
//! | `DELETE` | `/api/cache` | Clear the cache |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404). A question the
//! engine cannot answer is not an HTTP error: `POST /api/query` returns 200
//! with the failure in the result's `error` field.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use nlq_core::cache::CacheStats;
use nlq_core::models::{DocumentSummary, FileKind};
use nlq_core::{QueryEngine, QueryResult, SchemaInfo};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::ingest;
use crate::page::INDEX_HTML;
use crate::query::build_engine;
use crate::sqlite_db::SqliteDatabase;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    engine: Arc<QueryEngine<SqliteDatabase>>,
}

impl AppState {
    pub fn new(config: Arc<Config>, engine: Arc<QueryEngine<SqliteDatabase>>) -> Self {
        Self { config, engine }
    }
}

/// Starts the HTTP server.
///
/// Opens the database, preloads `[documents].preload`, and binds to
/// `[server].bind`. Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let engine = build_engine(config).await?;

    if !config.documents.preload.is_empty() {
        let loaded =
            ingest::ingest_paths(&engine, &config.documents.preload, config.documents.max_bytes)?;
        println!("Preloaded {} document(s).", loaded.len());
    }

    let state = AppState::new(Arc::new(config.clone()), Arc::new(engine));
    let app = router(state);

    let bind_addr = &config.server.bind;
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    println!("NLQ server listening on http://{}", bind_addr);
    tracing::info!(addr = %bind_addr, "server started");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Base64 bodies are about 4/3 the size of the document they carry.
    let body_limit = state.config.documents.max_bytes / 3 * 4 + 64 * 1024;

    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/api/schema", get(handle_schema))
        .route("/api/query", post(handle_query))
        .route(
            "/api/documents",
            get(handle_list_documents).post(handle_upload_document),
        )
        .route("/api/documents/{filename}", delete(handle_delete_document))
        .route("/api/cache", get(handle_cache_stats).delete(handle_clear_cache))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_found"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Constructs a 404 Not Found error.
fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

// ============ GET / and /health ============

async fn handle_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/schema ============

async fn handle_schema(State(state): State<AppState>) -> Json<SchemaInfo> {
    Json(state.engine.schema().clone())
}

// ============ POST /api/query ============

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
}

/// Handler for `POST /api/query`.
///
/// Returns `400` for an empty query. Every other question gets a 200 with
/// a [`QueryResult`], successful or not.
async fn handle_query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResult>, AppError> {
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    Ok(Json(state.engine.answer(&req.query).await))
}

// ============ /api/documents ============

#[derive(Serialize)]
struct DocumentListResponse {
    documents: Vec<DocumentSummary>,
}

async fn handle_list_documents(State(state): State<AppState>) -> Json<DocumentListResponse> {
    Json(DocumentListResponse {
        documents: state.engine.documents(),
    })
}

/// Upload body. Exactly one of `content` (UTF-8 text) or `content_base64`
/// (raw bytes) must be set.
#[derive(Deserialize)]
struct UploadRequest {
    filename: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    content_base64: Option<String>,
}

async fn handle_upload_document(
    State(state): State<AppState>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<DocumentSummary>, AppError> {
    let bytes = match (req.content, req.content_base64) {
        (Some(text), None) => text.into_bytes(),
        (None, Some(encoded)) => BASE64
            .decode(encoded.trim())
            .map_err(|e| bad_request(format!("content_base64 is not valid base64: {}", e)))?,
        _ => {
            return Err(bad_request(
                "exactly one of content or content_base64 is required",
            ))
        }
    };

    let max_bytes = state.config.documents.max_bytes;
    if bytes.len() > max_bytes {
        return Err(bad_request(format!(
            "document is {} bytes, limit is {}",
            bytes.len(),
            max_bytes
        )));
    }

    let kind = FileKind::from_filename(&req.filename);
    let record = state
        .engine
        .ingest(&req.filename, &bytes, kind)
        .map_err(|e| bad_request(e.to_string()))?;
    tracing::info!(filename = %record.filename, kind = %record.kind, "document uploaded");

    Ok(Json(record.summary()))
}

async fn handle_delete_document(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<DocumentSummary>, AppError> {
    state
        .engine
        .remove_document(&filename)
        .map(Json)
        .map_err(|e| not_found(e.to_string()))
}

// ============ /api/cache ============

async fn handle_cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.engine.cache().stats())
}

#[derive(Serialize)]
struct ClearCacheResponse {
    cleared: usize,
}

async fn handle_clear_cache(State(state): State<AppState>) -> Json<ClearCacheResponse> {
    Json(ClearCacheResponse {
        cleared: state.engine.cache().clear(),
    })
}
