use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn nlq_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("nlq");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let docs_dir = root.join("docs");
    fs::create_dir_all(&docs_dir).unwrap();
    fs::write(
        docs_dir.join("alice_resume.txt"),
        "Alice Johnson\nSenior Engineer\n\nSkills: Rust, Python, PostgreSQL.\nLed the billing migration.",
    )
    .unwrap();
    fs::write(
        docs_dir.join("bob_resume.txt"),
        "Bob Smith\nEngineer\n\nSkills: Go, Kubernetes, Terraform.",
    )
    .unwrap();
    fs::write(
        docs_dir.join("skills.csv"),
        "name,skills\nDiana Prince,Python; pandas\nEvan Garcia,Java\n",
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/nlq.sqlite"

[server]
bind = "127.0.0.1:7341"

[query]
hybrid_merge = "filter_by_entity"
default_row_limit = 10
"#,
        root.display()
    );

    let config_path = config_dir.join("nlq.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_nlq(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = nlq_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run nlq binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

/// Every JSON document printed to stdout, in order.
fn json_outputs(stdout: &str) -> Vec<Value> {
    serde_json::Deserializer::from_str(stdout)
        .into_iter::<Value>()
        .map(|v| v.unwrap())
        .collect()
}

fn docs_dir(config_path: &Path) -> String {
    config_path
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("docs")
        .display()
        .to_string()
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_nlq(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(stdout.contains("Seeded 8 demo rows"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_nlq(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (stdout, _, success2) = run_nlq(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
    assert!(!stdout.contains("Seeded"));
}

#[test]
fn test_ask_before_init_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_nlq(&config_path, &["ask", "How many employees do we have?"]);
    assert!(!success);
    assert!(stderr.contains("nlq init"), "stderr={}", stderr);
}

#[test]
fn test_schema_lists_demo_tables() {
    let (_tmp, config_path) = setup_test_env();
    run_nlq(&config_path, &["init"]);

    let (stdout, stderr, success) = run_nlq(&config_path, &["schema"]);
    assert!(success, "schema failed: {}", stderr);
    assert!(stdout.contains("employees"));
    assert!(stdout.contains("annual_salary"));
    assert!(stdout.contains("dept_id -> departments"));
}

#[test]
fn test_ask_sql_question() {
    let (_tmp, config_path) = setup_test_env();
    run_nlq(&config_path, &["init"]);

    let (stdout, stderr, success) = run_nlq(
        &config_path,
        &["ask", "How many employees do we have?", "--json"],
    );
    assert!(success, "ask failed: {}", stderr);
    let results = json_outputs(&stdout);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["source"], "sql");
    assert_eq!(results[0]["sql_rows"][0]["total"], 5);
    assert_eq!(results[0]["cache_hit"], false);
}

#[test]
fn test_ask_repeat_hits_cache() {
    let (_tmp, config_path) = setup_test_env();
    run_nlq(&config_path, &["init"]);

    let (stdout, _, success) = run_nlq(
        &config_path,
        &["ask", "Average salary by department", "--repeat", "2", "--json"],
    );
    assert!(success);
    let results = json_outputs(&stdout);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["cache_hit"], false);
    assert_eq!(results[1]["cache_hit"], true);
    assert_eq!(results[0]["sql_rows"], results[1]["sql_rows"]);
}

#[test]
fn test_ask_document_question() {
    let (_tmp, config_path) = setup_test_env();
    run_nlq(&config_path, &["init"]);
    let docs = docs_dir(&config_path);

    let (stdout, stderr, success) = run_nlq(
        &config_path,
        &[
            "ask",
            "Show me resumes mentioning Python",
            "--doc",
            &docs,
            "--json",
        ],
    );
    assert!(success, "ask failed: {}", stderr);
    let result = &json_outputs(&stdout)[0];
    assert_eq!(result["source"], "document");
    let matches = result["document_matches"].as_array().unwrap();
    let files: Vec<&str> = matches
        .iter()
        .map(|m| m["filename"].as_str().unwrap())
        .collect();
    assert_eq!(files, vec!["alice_resume.txt", "skills.csv"]);
    assert_eq!(matches[1]["row"], 0);
}

#[test]
fn test_ask_hybrid_question() {
    let (_tmp, config_path) = setup_test_env();
    run_nlq(&config_path, &["init"]);
    let docs = docs_dir(&config_path);

    let (stdout, stderr, success) = run_nlq(
        &config_path,
        &["ask", "Employees with Python skills", "--doc", &docs, "--json"],
    );
    assert!(success, "ask failed: {}", stderr);
    let result = &json_outputs(&stdout)[0];
    assert_eq!(result["source"], "hybrid");
    assert_eq!(result["merge"]["strategy"], "intersected");
    assert_eq!(
        result["merge"]["shared_entities"],
        serde_json::json!(["Alice Johnson", "Diana Prince"])
    );
    assert_eq!(result["sql_rows"].as_array().unwrap().len(), 2);
    assert_eq!(result["document_matches"].as_array().unwrap().len(), 2);
}

#[test]
fn test_ask_unknown_reports_error() {
    let (_tmp, config_path) = setup_test_env();
    run_nlq(&config_path, &["init"]);

    let (stdout, _, success) = run_nlq(&config_path, &["ask", "Show me John"]);
    assert!(success);
    assert!(stdout.contains("source: unknown"));
    assert!(stdout.contains("UnrecognizedQuery"));
    assert!(stdout.contains("could not understand this query"));
}

#[test]
fn test_invalid_config_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("bad.toml");
    fs::write(
        &config_path,
        "[db]\npath = \"x.sqlite\"\n[query]\ndefault_row_limit = 0\n",
    )
    .unwrap();

    let (_, stderr, success) = run_nlq(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("default_row_limit"));
}

#[test]
fn test_completions() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, success) = run_nlq(&config_path, &["completions", "bash"]);
    assert!(success);
    assert!(stdout.contains("nlq"));
}
