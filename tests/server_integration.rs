//! HTTP API tests against a server bound to an ephemeral port.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use nlq_engine::config::Config;
use nlq_engine::migrate::run_migrations;
use nlq_engine::query::build_engine;
use nlq_engine::server::{router, AppState};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

struct TestServer {
    _tmp: TempDir,
    base: String,
    client: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::minimal();
        config.db.path = tmp.path().join("nlq.sqlite");
        config.documents.max_bytes = 1024;
        run_migrations(&config).await.unwrap();

        let engine = build_engine(&config).await.unwrap();
        let app = router(AppState::new(Arc::new(config), Arc::new(engine)));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            _tmp: tmp,
            base: format!("http://{}", addr),
            client: reqwest::Client::new(),
        }
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap())
    }

    async fn delete(&self, path: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .delete(format!("{}{}", self.base, path))
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap())
    }

    async fn ask(&self, query: &str) -> Value {
        let (status, body) = self.post("/api/query", json!({ "query": query })).await;
        assert_eq!(status, StatusCode::OK);
        body
    }
}

#[tokio::test]
async fn test_health_and_index() {
    let server = TestServer::start().await;
    let (status, body) = server.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let html = server
        .client
        .get(format!("{}/", server.base))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("<title>NLQ Engine</title>"));
}

#[tokio::test]
async fn test_schema_endpoint() {
    let server = TestServer::start().await;
    let (status, body) = server.get("/api/schema").await;
    assert_eq!(status, StatusCode::OK);
    let columns = body["tables"]["employees"]["columns"].as_array().unwrap();
    assert!(columns.iter().any(|c| c["name"] == "full_name"));
}

#[tokio::test]
async fn test_empty_query_is_bad_request() {
    let server = TestServer::start().await;
    let (status, body) = server.post("/api/query", json!({ "query": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_query_then_cache_hit() {
    let server = TestServer::start().await;
    let first = server.ask("How many employees do we have?").await;
    assert_eq!(first["source"], "sql");
    assert_eq!(first["cache_hit"], false);
    assert_eq!(first["sql_rows"][0]["total"], 5);

    let second = server.ask("how many   employees do we have?").await;
    assert_eq!(second["cache_hit"], true);

    let (_, stats) = server.get("/api/cache").await;
    assert_eq!(stats["entries"], 1);
    assert_eq!(stats["hits"], 1);

    let (status, cleared) = server.delete("/api/cache").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["cleared"], 1);
    let third = server.ask("How many employees do we have?").await;
    assert_eq!(third["cache_hit"], false);
}

#[tokio::test]
async fn test_unanswerable_query_is_structured_error() {
    let server = TestServer::start().await;
    let body = server.ask("Show me John").await;
    assert_eq!(body["source"], "unknown");
    assert_eq!(body["error"]["kind"], "UnrecognizedQuery");
    assert!(body.get("sql_rows").is_none());
}

#[tokio::test]
async fn test_upload_and_search_documents() {
    let server = TestServer::start().await;

    let (status, doc) = server
        .post(
            "/api/documents",
            json!({ "filename": "alice_resume.txt", "content": "Alice Johnson. Skills: Python, Rust." }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["kind"], "txt");

    let csv = BASE64.encode("name,skills\nDiana Prince,Python\n");
    let (status, doc) = server
        .post(
            "/api/documents",
            json!({ "filename": "skills.csv", "content_base64": csv }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["kind"], "csv");
    assert_eq!(doc["rows"], 1);

    let (_, listing) = server.get("/api/documents").await;
    assert_eq!(listing["documents"].as_array().unwrap().len(), 2);

    let body = server.ask("Show me resumes mentioning Python").await;
    assert_eq!(body["source"], "document");
    assert_eq!(body["document_matches"].as_array().unwrap().len(), 2);

    let body = server.ask("Employees with Python skills").await;
    assert_eq!(body["source"], "hybrid");
    assert_eq!(body["merge"]["strategy"], "intersected");
}

#[tokio::test]
async fn test_upload_invalidates_cached_document_answer() {
    let server = TestServer::start().await;
    let before = server.ask("Show me resumes mentioning Kubernetes").await;
    assert_eq!(before["document_matches"], json!([]));

    server
        .post(
            "/api/documents",
            json!({ "filename": "bob.txt", "content": "Bob Smith: Go, Kubernetes" }),
        )
        .await;

    let after = server.ask("Show me resumes mentioning Kubernetes").await;
    assert_eq!(after["cache_hit"], false);
    assert_eq!(after["document_matches"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_upload_validation() {
    let server = TestServer::start().await;

    let (status, body) = server
        .post("/api/documents", json!({ "filename": "a.txt" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, _) = server
        .post(
            "/api/documents",
            json!({ "filename": "a.txt", "content_base64": "***" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .post(
            "/api/documents",
            json!({ "filename": "big.txt", "content": "x".repeat(2048) }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .post("/api/documents", json!({ "filename": " ", "content": "x" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_document() {
    let server = TestServer::start().await;
    server
        .post(
            "/api/documents",
            json!({ "filename": "notes.txt", "content": "hello" }),
        )
        .await;

    let (status, body) = server.delete("/api/documents/notes.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filename"], "notes.txt");

    let (status, body) = server.delete("/api/documents/notes.txt").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}
