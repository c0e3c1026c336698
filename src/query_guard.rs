//! SQL safety gate.
//!
//! Everything coming back from the generation service is a `CandidateSql`;
//! the executor only accepts `ValidatedSql`, and the one way to obtain a
//! `ValidatedSql` is to pass `validate`. The gate is a boolean filter plus
//! terminator trimming, never a rewriter: a forbidden keyword inside a string
//! literal or comment still rejects, trading false positives for auditability.

use crate::error::{InsightError, Result};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Whole-word, case-insensitive patterns for DML/DDL keywords.
    /// `updated_at` must not match `update`.
    static ref FORBIDDEN: Vec<Regex> = ["drop", "delete", "update", "insert", "alter", "truncate"]
        .iter()
        .map(|word| Regex::new(&format!(r"(?i)\b{}\b", word)).expect("static keyword pattern"))
        .collect();
}

/// Raw SQL text extracted from the generation response. Not yet trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSql(pub String);

impl CandidateSql {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// SQL that has passed the safety gate. Only `validate` can construct one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSql(String);

impl ValidatedSql {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Vet a candidate statement. Checks run in order; each failure carries the
/// caller-visible message.
pub fn validate(candidate: CandidateSql) -> Result<ValidatedSql> {
    let sql = candidate.0.trim().trim_end_matches(';').trim_end().to_string();

    // A terminator left anywhere in the body means statement stacking.
    if sql.contains(';') {
        return Err(InsightError::UnsafeQuery(
            "Only one SQL statement allowed.".to_string(),
        ));
    }

    if !sql.to_lowercase().starts_with("select") {
        return Err(InsightError::UnsafeQuery(
            "Only SELECT queries are allowed.".to_string(),
        ));
    }

    if FORBIDDEN.iter().any(|pattern| pattern.is_match(&sql)) {
        return Err(InsightError::UnsafeQuery("Unsafe SQL detected.".to_string()));
    }

    Ok(ValidatedSql(sql))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(sql: &str) -> Result<ValidatedSql> {
        validate(CandidateSql(sql.to_string()))
    }

    fn rejected_with(sql: &str, message: &str) {
        match check(sql) {
            Err(InsightError::UnsafeQuery(m)) => assert_eq!(m, message),
            other => panic!("expected UnsafeQuery for {sql:?}, got {other:?}"),
        }
    }

    #[test]
    fn accepts_plain_select() {
        let validated = check("SELECT Department AS category FROM employee").unwrap();
        assert_eq!(validated.as_str(), "SELECT Department AS category FROM employee");
    }

    #[test]
    fn trims_whitespace_and_trailing_terminator() {
        let validated = check("  select 1 ;  ").unwrap();
        assert_eq!(validated.as_str(), "select 1");
    }

    #[test]
    fn rejects_statement_stacking() {
        rejected_with(
            "SELECT 1; DROP TABLE employee",
            "Only one SQL statement allowed.",
        );
        // Terminator mid-body rejects even with nothing after it worth running.
        rejected_with("SELECT 1 ; --", "Only one SQL statement allowed.");
    }

    #[test]
    fn rejects_non_select() {
        rejected_with("UPDATE employee SET Salary = 0", "Only SELECT queries are allowed.");
        rejected_with("WITH x AS (SELECT 1) SELECT * FROM x", "Only SELECT queries are allowed.");
        rejected_with("", "Only SELECT queries are allowed.");
    }

    #[test]
    fn rejects_forbidden_keywords_as_whole_words() {
        for sql in [
            "SELECT * FROM employee WHERE drop = 1",
            "select DELETE from employee",
            "SELECT 'insert' AS category FROM employee",
            "SELECT 1 WHERE TRUNCATE",
            "select Alter from employee",
        ] {
            rejected_with(sql, "Unsafe SQL detected.");
        }
    }

    #[test]
    fn keyword_substrings_inside_longer_words_pass() {
        assert!(check("SELECT updated_at AS category FROM employee").is_ok());
        assert!(check("SELECT drop_rate AS metric, Department AS category FROM employee").is_ok());
        assert!(check("SELECT inserted_count AS category FROM employee").is_ok());
    }

    #[test]
    fn case_insensitive_prefix_check() {
        assert!(check("SeLeCt 1").is_ok());
    }
}
