//! Engine behavior against a real, migrated SQLite database.

use nlq_core::models::{Category, FileKind, MergeOutcome};
use nlq_core::QueryEngine;
use nlq_engine::config::Config;
use nlq_engine::migrate::run_migrations;
use nlq_engine::query::build_engine;
use nlq_engine::sqlite_db::SqliteDatabase;
use serde_json::{json, Value};
use tempfile::TempDir;

async fn setup() -> (TempDir, QueryEngine<SqliteDatabase>) {
    let tmp = TempDir::new().unwrap();
    let mut config = Config::minimal();
    config.db.path = tmp.path().join("data").join("nlq.sqlite");
    run_migrations(&config).await.unwrap();
    let engine = build_engine(&config).await.unwrap();
    (tmp, engine)
}

fn column<'a>(rows: &'a [serde_json::Map<String, Value>], name: &str) -> Vec<&'a Value> {
    rows.iter().map(|r| &r[name]).collect()
}

#[tokio::test]
async fn test_schema_discovery() {
    let (_tmp, engine) = setup().await;
    let schema = engine.schema();
    assert!(schema.has_column("employees", "annual_salary"));
    assert!(schema.has_column("departments", "dept_name"));
    let employees = schema.table("employees").unwrap();
    assert_eq!(employees.sample.len(), 3);
    assert!(employees.columns.iter().any(|c| c.name == "emp_id" && c.primary_key));
}

#[tokio::test]
async fn test_count_employees() {
    let (_tmp, engine) = setup().await;
    let r = engine.answer("How many employees do we have?").await;
    assert_eq!(r.source, Category::Sql);
    assert_eq!(r.sql_rows.unwrap()[0]["total"], json!(5));
}

#[tokio::test]
async fn test_average_salary_by_department() {
    let (_tmp, engine) = setup().await;
    let r = engine.answer("Average salary by department").await;
    let rows = r.sql_rows.unwrap();
    assert_eq!(
        column(&rows, "dept_name"),
        vec![&json!("Data"), &json!("Engineering"), &json!("Product")]
    );
    let engineering = rows[1]["avg_salary"].as_f64().unwrap();
    assert!((engineering - 101_666.666).abs() < 0.01);
}

#[tokio::test]
async fn test_top_paid_binds_limit() {
    let (_tmp, engine) = setup().await;
    let r = engine.answer("Top 3 highest paid employees").await;
    let rows = r.sql_rows.unwrap();
    assert_eq!(
        column(&rows, "full_name"),
        vec![
            &json!("Charlie Lee"),
            &json!("Alice Johnson"),
            &json!("Diana Prince")
        ]
    );
}

#[tokio::test]
async fn test_hired_in_year() {
    let (_tmp, engine) = setup().await;
    let r = engine.answer("Employees hired in 2022").await;
    let rows = r.sql_rows.unwrap();
    assert_eq!(column(&rows, "full_name"), vec![&json!("Bob Smith")]);
}

#[tokio::test]
async fn test_employees_in_department() {
    let (_tmp, engine) = setup().await;
    let r = engine.answer("employees in the Engineering department").await;
    let rows = r.sql_rows.unwrap();
    assert_eq!(column(&rows, "emp_id"), vec![&json!(1), &json!(2), &json!(5)]);
}

#[tokio::test]
async fn test_query_words_never_reach_sql_text() {
    let (_tmp, engine) = setup().await;
    let r = engine
        .answer("employees in x'); DROP TABLE employees; -- department")
        .await;
    assert!(r.is_success());
    assert!(!r.sql.unwrap().to_uppercase().contains("DROP"));

    let count = engine.answer("How many employees do we have?").await;
    assert_eq!(count.sql_rows.unwrap()[0]["total"], json!(5));
}

#[tokio::test]
async fn test_query_pool_is_read_only() {
    let (_tmp, engine) = setup().await;
    let write = sqlx::query("DELETE FROM employees")
        .execute(engine.database().pool())
        .await;
    assert!(write.is_err());
}

#[tokio::test]
async fn test_hybrid_intersects_with_database_names() {
    let (_tmp, engine) = setup().await;
    engine
        .ingest(
            "alice_resume.txt",
            b"Alice Johnson\nSkills: Rust, Python, SQL",
            FileKind::Txt,
        )
        .unwrap();
    engine
        .ingest("team_notes.txt", b"We should hire more Python people.", FileKind::Txt)
        .unwrap();

    let r = engine.answer("Employees with Python skills").await;
    assert_eq!(r.source, Category::Hybrid);
    assert_eq!(
        r.merge,
        Some(MergeOutcome::Intersected {
            shared_entities: vec!["Alice Johnson".to_string()],
        })
    );
    assert_eq!(r.sql_rows.unwrap().len(), 1);
    let matches = r.document_matches.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].filename, "alice_resume.txt");
}

#[tokio::test]
async fn test_schema_mismatch_on_unrelated_database() {
    let tmp = TempDir::new().unwrap();
    let mut config = Config::minimal();
    config.db.path = tmp.path().join("other.sqlite");

    let pool = nlq_engine::db::connect(&config).await.unwrap();
    sqlx::query("CREATE TABLE employees (emp_id INTEGER PRIMARY KEY, full_name TEXT)")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let engine = build_engine(&config).await.unwrap();
    let r = engine.answer("What is the average salary?").await;
    let err = r.error.unwrap();
    assert_eq!(err.kind, nlq_core::ErrorKind::SchemaMismatch);
    assert!(err.message.contains("annual_salary"));
}
