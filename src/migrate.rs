use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

type EmployeeSeed = (i64, &'static str, i64, &'static str, f64, &'static str, &'static str);

const EMPLOYEES: &[EmployeeSeed] = &[
    (1, "Alice Johnson", 1, "Senior Engineer", 120000.0, "2023-02-15", "NY"),
    (2, "Bob Smith", 1, "Engineer", 90000.0, "2022-07-10", "NY"),
    (3, "Charlie Lee", 2, "Manager", 130000.0, "2020-11-01", "SF"),
    (4, "Diana Prince", 3, "Data Scientist", 115000.0, "2024-01-20", "Remote"),
    (5, "Evan Garcia", 1, "Engineer", 95000.0, "2021-06-30", "NY"),
];

const DEPARTMENTS: &[(i64, &str, i64)] = &[(1, "Engineering", 3), (2, "Product", 3), (3, "Data", 4)];

/// Create the demo tables and seed them when empty.
///
/// Returns the number of rows inserted; `0` on every run after the first.
pub async fn run_migrations(config: &Config) -> Result<usize> {
    let pool = db::connect(config).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS departments (
            dept_id INTEGER PRIMARY KEY,
            dept_name TEXT NOT NULL,
            manager_id INTEGER
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS employees (
            emp_id INTEGER PRIMARY KEY,
            full_name TEXT NOT NULL,
            dept_id INTEGER,
            position TEXT,
            annual_salary REAL,
            join_date TEXT,
            office_location TEXT,
            FOREIGN KEY (dept_id) REFERENCES departments(dept_id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_employees_dept_id ON employees(dept_id)")
        .execute(&pool)
        .await?;

    let seeded = seed_if_empty(&pool).await?;

    pool.close().await;
    Ok(seeded)
}

async fn seed_if_empty(pool: &SqlitePool) -> Result<usize> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employees")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    for &(id, name, manager) in DEPARTMENTS {
        sqlx::query("INSERT OR IGNORE INTO departments VALUES (?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(manager)
            .execute(&mut *tx)
            .await?;
    }
    for &(id, name, dept, position, salary, joined, office) in EMPLOYEES {
        sqlx::query("INSERT INTO employees VALUES (?, ?, ?, ?, ?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(dept)
            .bind(position)
            .bind(salary)
            .bind(joined)
            .bind(office)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    Ok(DEPARTMENTS.len() + EMPLOYEES.len())
}
