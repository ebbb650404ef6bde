//! Heuristic natural-language → SQL translation.
//!
//! Translation walks [`RULES`], an ordered table of tagged patterns, and
//! the **first** rule whose trigger matches wins. Later rules are never
//! consulted, even if they would match more specifically, so the table
//! lists specific phrasings ("average salary by department") before the
//! general ones ("average salary").
//!
//! # Read-only statements
//!
//! SQL text only ever comes from the `&'static str` templates below. Values
//! taken from the query (department, year, row limit) are bound as
//! parameters, never spliced into the text. [`SqlStatement`] has no public
//! constructor, so nothing outside this module can produce one.

use chrono::Datelike;

use crate::classify::{QueryClassification, YearRef};
use crate::error::QueryError;
use crate::models::SchemaInfo;
use crate::normalize::contains_phrase;

/// Row cap for open-ended listings when none is configured.
pub const DEFAULT_ROW_LIMIT: u32 = 10;

const DEFAULT_TOP_N: u32 = 5;
const MAX_ROW_LIMIT: u32 = 100;

/// Which rule produced a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryPattern {
    CountByDepartment,
    CountEmployees,
    AverageSalaryByDepartment,
    AverageSalary,
    TopPaid,
    HighestSalary,
    TotalPayroll,
    HiredInYear,
    EmployeesInDepartment,
    ListEmployees,
    ListDepartments,
}

/// A parameter that must have been extracted for a rule to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    Year,
    Department,
}

/// Condition on the normalized query text.
#[derive(Debug)]
pub enum Trigger {
    Phrase(&'static str),
    AnyOf(&'static [&'static str]),
    AllOf(&'static [Trigger]),
    WithParam(&'static Trigger, Param),
}

impl Trigger {
    pub fn matches(&self, classification: &QueryClassification) -> bool {
        let tokens = &classification.tokens;
        match self {
            Trigger::Phrase(p) => contains_phrase(tokens, p),
            Trigger::AnyOf(ps) => ps.iter().any(|p| contains_phrase(tokens, p)),
            Trigger::AllOf(ts) => ts.iter().all(|t| t.matches(classification)),
            Trigger::WithParam(t, param) => {
                let params = &classification.params;
                let present = match param {
                    Param::Year => params.year.is_some(),
                    Param::Department => params.department.is_some(),
                };
                present && t.matches(classification)
            }
        }
    }
}

/// How a template placeholder is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bind {
    /// The `N` of "top N", defaulting to 5.
    TopN,
    /// Four-digit year as text, for comparison with `substr(join_date, 1, 4)`.
    Year,
    Department,
    /// Configured listing cap.
    RowLimit,
}

/// A fixed SQL text plus the schema objects it depends on.
#[derive(Debug)]
pub struct SqlTemplate {
    pub sql: &'static str,
    /// `(table, columns)` pairs that must exist in the connected database.
    pub requires: &'static [(&'static str, &'static [&'static str])],
    /// One entry per `?` placeholder, in order.
    pub binds: &'static [Bind],
}

#[derive(Debug)]
pub struct Rule {
    pub pattern: QueryPattern,
    pub trigger: Trigger,
    pub template: SqlTemplate,
}

const GROUP_BY_DEPARTMENT: Trigger =
    Trigger::AnyOf(&["by department", "per department", "each department"]);
const AVERAGE_SALARY: Trigger = Trigger::AnyOf(&["average salary", "avg salary", "average pay"]);

const EMPLOYEES: (&str, &[&str]) = ("employees", &["emp_id"]);

/// The translation table, tested top to bottom.
pub const RULES: &[Rule] = &[
    Rule {
        pattern: QueryPattern::CountByDepartment,
        trigger: Trigger::AllOf(&[Trigger::Phrase("how many"), GROUP_BY_DEPARTMENT]),
        template: SqlTemplate {
            sql: "SELECT d.dept_name, COUNT(e.emp_id) AS employees \
                  FROM departments d LEFT JOIN employees e ON e.dept_id = d.dept_id \
                  GROUP BY d.dept_name ORDER BY d.dept_name",
            requires: &[
                ("employees", &["emp_id", "dept_id"]),
                ("departments", &["dept_id", "dept_name"]),
            ],
            binds: &[],
        },
    },
    Rule {
        pattern: QueryPattern::CountEmployees,
        trigger: Trigger::AllOf(&[
            Trigger::AnyOf(&["how many", "count", "headcount", "number of"]),
            Trigger::Phrase("employee"),
        ]),
        template: SqlTemplate {
            sql: "SELECT COUNT(*) AS total FROM employees",
            requires: &[EMPLOYEES],
            binds: &[],
        },
    },
    Rule {
        pattern: QueryPattern::AverageSalaryByDepartment,
        trigger: Trigger::AllOf(&[AVERAGE_SALARY, GROUP_BY_DEPARTMENT]),
        template: SqlTemplate {
            sql: "SELECT d.dept_name, AVG(e.annual_salary) AS avg_salary \
                  FROM employees e JOIN departments d ON e.dept_id = d.dept_id \
                  GROUP BY d.dept_name ORDER BY d.dept_name",
            requires: &[
                ("employees", &["annual_salary", "dept_id"]),
                ("departments", &["dept_id", "dept_name"]),
            ],
            binds: &[],
        },
    },
    Rule {
        pattern: QueryPattern::AverageSalary,
        trigger: AVERAGE_SALARY,
        template: SqlTemplate {
            sql: "SELECT AVG(annual_salary) AS avg_salary FROM employees",
            requires: &[("employees", &["annual_salary"])],
            binds: &[],
        },
    },
    Rule {
        pattern: QueryPattern::TopPaid,
        trigger: Trigger::AllOf(&[
            Trigger::Phrase("top"),
            Trigger::AnyOf(&["highest paid", "best paid"]),
        ]),
        template: SqlTemplate {
            sql: "SELECT * FROM employees ORDER BY annual_salary DESC LIMIT ?",
            requires: &[("employees", &["annual_salary"])],
            binds: &[Bind::TopN],
        },
    },
    Rule {
        pattern: QueryPattern::HighestSalary,
        trigger: Trigger::AnyOf(&[
            "highest salary",
            "highest paid",
            "max salary",
            "maximum salary",
        ]),
        template: SqlTemplate {
            sql: "SELECT * FROM employees ORDER BY annual_salary DESC LIMIT 1",
            requires: &[("employees", &["annual_salary"])],
            binds: &[],
        },
    },
    Rule {
        pattern: QueryPattern::TotalPayroll,
        trigger: Trigger::AnyOf(&["total salary", "total salaries", "payroll"]),
        template: SqlTemplate {
            sql: "SELECT SUM(annual_salary) AS total_salary FROM employees",
            requires: &[("employees", &["annual_salary"])],
            binds: &[],
        },
    },
    Rule {
        pattern: QueryPattern::HiredInYear,
        trigger: Trigger::WithParam(&Trigger::AnyOf(&["hired", "joined"]), Param::Year),
        template: SqlTemplate {
            sql: "SELECT * FROM employees WHERE substr(join_date, 1, 4) = ? ORDER BY join_date",
            requires: &[("employees", &["join_date"])],
            binds: &[Bind::Year],
        },
    },
    Rule {
        pattern: QueryPattern::EmployeesInDepartment,
        trigger: Trigger::WithParam(&Trigger::Phrase("employee"), Param::Department),
        template: SqlTemplate {
            sql: "SELECT e.* FROM employees e JOIN departments d ON e.dept_id = d.dept_id \
                  WHERE lower(d.dept_name) = lower(?) ORDER BY e.emp_id",
            requires: &[
                ("employees", &["emp_id", "dept_id"]),
                ("departments", &["dept_id", "dept_name"]),
            ],
            binds: &[Bind::Department],
        },
    },
    Rule {
        pattern: QueryPattern::ListEmployees,
        trigger: Trigger::Phrase("employee"),
        template: SqlTemplate {
            sql: "SELECT * FROM employees ORDER BY emp_id LIMIT ?",
            requires: &[EMPLOYEES],
            binds: &[Bind::RowLimit],
        },
    },
    Rule {
        pattern: QueryPattern::ListDepartments,
        trigger: Trigger::Phrase("department"),
        template: SqlTemplate {
            sql: "SELECT * FROM departments ORDER BY dept_id",
            requires: &[("departments", &["dept_id"])],
            binds: &[],
        },
    },
];

/// A bound value for a `?` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Integer(i64),
    Text(String),
}

/// A read-only statement ready for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatement {
    pattern: QueryPattern,
    sql: &'static str,
    params: Vec<SqlValue>,
}

impl SqlStatement {
    pub fn pattern(&self) -> QueryPattern {
        self.pattern
    }

    pub fn sql(&self) -> &'static str {
        self.sql
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }
}

/// Translate with the default listing cap.
pub fn translate(
    classification: &QueryClassification,
    schema: &SchemaInfo,
) -> Result<SqlStatement, QueryError> {
    translate_with_limit(classification, schema, DEFAULT_ROW_LIMIT)
}

/// Find the first matching rule, check it against `schema`, and bind its
/// parameters.
pub fn translate_with_limit(
    classification: &QueryClassification,
    schema: &SchemaInfo,
    row_limit: u32,
) -> Result<SqlStatement, QueryError> {
    let rule = RULES
        .iter()
        .find(|r| r.trigger.matches(classification))
        .ok_or_else(|| {
            QueryError::UnrecognizedQuery(format!(
                "no known question pattern matches \"{}\"",
                classification.normalized
            ))
        })?;

    check_schema(&rule.template, schema)?;

    let params = rule
        .template
        .binds
        .iter()
        .map(|b| bind_value(*b, classification, row_limit))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SqlStatement {
        pattern: rule.pattern,
        sql: rule.template.sql,
        params,
    })
}

fn check_schema(template: &SqlTemplate, schema: &SchemaInfo) -> Result<(), QueryError> {
    for (table, columns) in template.requires {
        for column in columns.iter() {
            if !schema.has_column(table, column) {
                return Err(QueryError::SchemaMismatch {
                    table: table.to_string(),
                    column: column.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn bind_value(
    bind: Bind,
    classification: &QueryClassification,
    row_limit: u32,
) -> Result<SqlValue, QueryError> {
    let params = &classification.params;
    let missing = |what: &str| {
        QueryError::UnrecognizedQuery(format!("could not find a {} in the question", what))
    };
    let value = match bind {
        Bind::TopN => {
            let n = params.limit.unwrap_or(DEFAULT_TOP_N).clamp(1, MAX_ROW_LIMIT);
            SqlValue::Integer(i64::from(n))
        }
        Bind::RowLimit => SqlValue::Integer(i64::from(row_limit.clamp(1, MAX_ROW_LIMIT))),
        Bind::Year => {
            let year = match params.year.ok_or_else(|| missing("year"))? {
                YearRef::Current => chrono::Local::now().year(),
                YearRef::Exact(y) => y,
            };
            SqlValue::Text(format!("{:04}", year))
        }
        Bind::Department => SqlValue::Text(
            params
                .department
                .clone()
                .ok_or_else(|| missing("department"))?,
        ),
    };
    Ok(value)
}
