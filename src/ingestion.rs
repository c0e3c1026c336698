//! CSV -> SQLite bulk loading for the five workforce inputs.
//!
//! Tables are dropped and recreated on every load; column affinity is
//! inferred from the data so numeric columns aggregate correctly in SQL.

use crate::error::{InsightError, Result};
use csv::ReaderBuilder;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;
use tracing::info;

/// CSV file name -> target table, in load order. Table and column names must
/// match the schema descriptor exactly.
pub const WORKFORCE_SOURCES: [(&str, &str); 5] = [
    ("Employee.csv", "employee"),
    ("PerformanceRating.csv", "performance"),
    ("EducationLevel.csv", "education_level"),
    ("RatingLevel.csv", "rating_level"),
    ("SatisfiedLevel.csv", "satisfaction_level"),
];

/// Load all five workforce CSVs from `data_dir` into the store at `db_path`.
pub fn load_workforce_data(data_dir: &Path, db_path: &Path) -> Result<()> {
    let mut conn =
        Connection::open(db_path).map_err(|e| InsightError::Ingestion(e.to_string()))?;

    for (file, table) in WORKFORCE_SOURCES {
        let rows = load_csv_into_table(&mut conn, &data_dir.join(file), table)?;
        info!("loaded {} rows into {}", rows, table);
    }

    Ok(())
}

/// Replace `table` with the contents of one CSV file. Returns the row count.
pub fn load_csv_into_table(conn: &mut Connection, csv_path: &Path, table: &str) -> Result<usize> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(csv_path)
        .map_err(|e| InsightError::Ingestion(format!("{}: {}", csv_path.display(), e)))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| InsightError::Ingestion(format!("{}: {}", csv_path.display(), e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() {
        return Err(InsightError::Ingestion(format!(
            "{}: no header row",
            csv_path.display()
        )));
    }

    let mut rows: Vec<Vec<SqlValue>> = Vec::new();
    for result in reader.records() {
        let record =
            result.map_err(|e| InsightError::Ingestion(format!("{}: {}", csv_path.display(), e)))?;
        let row = (0..headers.len())
            .map(|idx| coerce_cell(record.get(idx).unwrap_or("")))
            .collect();
        rows.push(row);
    }

    let tx = conn
        .transaction()
        .map_err(|e| InsightError::Ingestion(e.to_string()))?;

    let column_ddl: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| format!("\"{}\" {}", name, column_affinity(&rows, idx)))
        .collect();

    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS \"{}\"; CREATE TABLE \"{}\" ({});",
        table,
        table,
        column_ddl.join(", ")
    ))
    .map_err(|e| InsightError::Ingestion(e.to_string()))?;

    {
        let placeholders = vec!["?"; headers.len()].join(", ");
        let mut stmt = tx
            .prepare(&format!("INSERT INTO \"{}\" VALUES ({})", table, placeholders))
            .map_err(|e| InsightError::Ingestion(e.to_string()))?;
        for row in &rows {
            stmt.execute(params_from_iter(row.iter()))
                .map_err(|e| InsightError::Ingestion(e.to_string()))?;
        }
    }

    tx.commit()
        .map_err(|e| InsightError::Ingestion(e.to_string()))?;

    Ok(rows.len())
}

/// Empty -> NULL, then integer, then real, else text.
fn coerce_cell(cell: &str) -> SqlValue {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return SqlValue::Null;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return SqlValue::Integer(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return SqlValue::Real(f);
    }
    SqlValue::Text(trimmed.to_string())
}

/// Declared affinity for one column, from the coerced values it holds.
fn column_affinity(rows: &[Vec<SqlValue>], idx: usize) -> &'static str {
    let mut any_real = false;
    let mut any_text = false;
    for row in rows {
        match row.get(idx) {
            Some(SqlValue::Real(_)) => any_real = true,
            Some(SqlValue::Text(_)) => any_text = true,
            _ => {}
        }
    }
    if any_text {
        "TEXT"
    } else if any_real {
        "REAL"
    } else {
        "INTEGER"
    }
}
