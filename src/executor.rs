//! Runs vetted statements against the SQLite store and materializes rows.
//!
//! Each call opens its own connection; the workload is read-mostly and the
//! store is a local file, so connections are not pooled.

use crate::error::{InsightError, Result};
use crate::query_guard::ValidatedSql;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// One returned row, keyed by column alias. Values are JSON scalars.
pub type ResultRecord = Map<String, Value>;

pub struct QueryExecutor {
    db_path: PathBuf,
}

impl QueryExecutor {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path).map_err(|e| InsightError::Execution(e.to_string()))
    }

    /// Execute the statement once and fetch all rows.
    ///
    /// Rows whose `category` is null or absent are dropped: a null grouping
    /// key marks an ungroupable row (e.g. a join miss) and carries no meaning
    /// for the caller. Store-level failures surface with the store's message
    /// verbatim.
    pub fn execute(&self, sql: &ValidatedSql) -> Result<Vec<ResultRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(sql.as_str())
            .map_err(|e| InsightError::Execution(e.to_string()))?;

        let column_names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        let mut rows = stmt
            .query([])
            .map_err(|e| InsightError::Execution(e.to_string()))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| InsightError::Execution(e.to_string()))?
        {
            let mut record = ResultRecord::new();
            for (idx, name) in column_names.iter().enumerate() {
                let value = row
                    .get_ref(idx)
                    .map_err(|e| InsightError::Execution(e.to_string()))?;
                record.insert(name.clone(), json_scalar(value));
            }

            let keep = record.get("category").map(|v| !v.is_null()).unwrap_or(false);
            if keep {
                records.push(record);
            }
        }

        Ok(records)
    }

    /// Dataset-wide constant: total rows in the base entity table,
    /// independent of whatever the user asked.
    pub fn count_employees(&self) -> Result<i64> {
        let conn = self.connect()?;
        conn.query_row("SELECT COUNT(*) FROM employee", [], |row| row.get(0))
            .map_err(|e| InsightError::Execution(e.to_string()))
    }
}

fn json_scalar(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::from(n),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        // No blob columns in this schema; anything binary is untyped noise.
        ValueRef::Blob(_) => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_guard::{validate, CandidateSql};

    fn scratch_db() -> (tempfile::TempDir, QueryExecutor) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hr.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE employee (EmployeeID INTEGER, Department TEXT, Salary REAL);
             INSERT INTO employee VALUES (1, 'Sales', 50000.0);
             INSERT INTO employee VALUES (2, 'Sales', 70000.0);
             INSERT INTO employee VALUES (3, NULL, 60000.0);
             INSERT INTO employee VALUES (4, 'Technology', 90000.0);",
        )
        .unwrap();
        (dir, QueryExecutor::new(path))
    }

    fn vetted(sql: &str) -> ValidatedSql {
        validate(CandidateSql(sql.to_string())).unwrap()
    }

    #[test]
    fn rows_become_alias_keyed_records() {
        let (_dir, executor) = scratch_db();
        let records = executor
            .execute(&vetted(
                "SELECT Department AS category, AVG(Salary) AS metric \
                 FROM employee GROUP BY Department ORDER BY category",
            ))
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["category"], "Sales");
        assert_eq!(records[0]["metric"], 60000.0);
        assert_eq!(records[1]["category"], "Technology");
    }

    #[test]
    fn null_category_rows_are_dropped() {
        let (_dir, executor) = scratch_db();
        let records = executor
            .execute(&vetted("SELECT Department AS category FROM employee"))
            .unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| !r["category"].is_null()));
    }

    #[test]
    fn rows_without_category_alias_are_dropped() {
        let (_dir, executor) = scratch_db();
        let records = executor
            .execute(&vetted("SELECT Department FROM employee"))
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn store_errors_carry_the_store_message() {
        let (_dir, executor) = scratch_db();
        let err = executor
            .execute(&vetted("SELECT Nonexistent AS category FROM employee"))
            .unwrap_err();
        match err {
            InsightError::Execution(message) => {
                assert!(message.contains("Nonexistent"), "message: {message}")
            }
            other => panic!("expected Execution error, got {other:?}"),
        }
    }

    #[test]
    fn employee_count_is_table_cardinality() {
        let (_dir, executor) = scratch_db();
        assert_eq!(executor.count_employees().unwrap(), 4);
    }
}
