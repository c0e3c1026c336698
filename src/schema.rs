//! Static description of the HR warehouse: the tables, joins and generation
//! rules the SQL synthesizer is allowed to reference. Built once at startup
//! and passed by reference everywhere; never mutated afterwards.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<String>,
}

/// A join edge, rendered as `left = right` in the prompt
/// (e.g. `performance.EmployeeID = employee.EmployeeID`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub tables: Vec<TableSchema>,
    pub relationships: Vec<Relationship>,
    pub rules: Vec<String>,
}

impl SchemaDescriptor {
    /// The fixed HR warehouse: five tables loaded from the workforce CSVs.
    pub fn hr_default() -> Self {
        let table = |name: &str, columns: &[&str]| TableSchema {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        };
        let rel = |left: &str, right: &str| Relationship {
            left: left.to_string(),
            right: right.to_string(),
        };

        Self {
            tables: vec![
                table(
                    "employee",
                    &[
                        "EmployeeID",
                        "FirstName",
                        "LastName",
                        "Gender",
                        "Age",
                        "BusinessTravel",
                        "Department",
                        "DistanceFromHome_KM",
                        "State",
                        "Ethnicity",
                        "Education",
                        "EducationField",
                        "JobRole",
                        "MaritalStatus",
                        "Salary",
                        "StockOptionLevel",
                        "OverTime",
                        "HireDate",
                        "Attrition",
                        "YearsAtCompany",
                        "YearsInMostRecentRole",
                        "YearsSinceLastPromotion",
                        "YearsWithCurrManager",
                    ],
                ),
                table(
                    "performance",
                    &[
                        "PerformanceID",
                        "EmployeeID",
                        "ReviewDate",
                        "EnvironmentSatisfaction",
                        "JobSatisfaction",
                        "RelationshipSatisfaction",
                        "TrainingOpportunitiesWithinYear",
                        "TrainingOpportunitiesTaken",
                        "WorkLifeBalance",
                        "SelfRating",
                        "ManagerRating",
                    ],
                ),
                table("education_level", &["EducationLevelID", "EducationLevel"]),
                table("rating_level", &["RatingID", "RatingLevel"]),
                table("satisfaction_level", &["SatisfactionID", "SatisfactionLevel"]),
            ],
            relationships: vec![
                rel("performance.EmployeeID", "employee.EmployeeID"),
                rel("employee.Education", "education_level.EducationLevelID"),
                rel("performance.SelfRating", "rating_level.RatingID"),
            ],
            rules: vec![
                "Use ONLY exact column names listed above.".to_string(),
                "Always alias grouped column as category.".to_string(),
                "Always alias aggregated column as metric.".to_string(),
                "For yearly trend use: strftime('%Y', performance.ReviewDate)".to_string(),
                "For monthly trend use: strftime('%Y-%m', performance.ReviewDate)".to_string(),
                "When using aggregation ALWAYS include GROUP BY if grouping requested.".to_string(),
                "If grouping by date expression, GROUP BY the SAME expression.".to_string(),
                "Return ONLY one valid SQLite SELECT statement.".to_string(),
                "Do NOT include explanation.".to_string(),
                "Do NOT use semicolon.".to_string(),
                "Do NOT invent new column names.".to_string(),
            ],
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Whether `table.column` (dotted) names a real column of a real table.
    pub fn has_qualified_column(&self, qualified: &str) -> bool {
        match qualified.split_once('.') {
            Some((table, column)) => self
                .table(table)
                .map(|t| t.columns.iter().any(|c| c == column))
                .unwrap_or(false),
            None => false,
        }
    }

    /// Every relationship endpoint must resolve to an existing table.column.
    pub fn relationships_are_wellformed(&self) -> bool {
        self.relationships
            .iter()
            .all(|r| self.has_qualified_column(&r.left) && self.has_qualified_column(&r.right))
    }

    /// Render the schema block embedded in the generation prompt.
    pub fn prompt_text(&self) -> String {
        let mut out = String::new();
        out.push_str("STRICT DATABASE SCHEMA (Use ONLY these exact columns):\n");

        for table in &self.tables {
            out.push_str(&format!(
                "\nTable: {}\nColumns:\n{}\n",
                table.name,
                table.columns.join(", ")
            ));
        }

        out.push_str("\nRelationships:\n");
        for rel in &self.relationships {
            out.push_str(&format!("{} = {}\n", rel.left, rel.right));
        }

        out.push_str("\nRules:\n");
        for rule in &self.rules {
            out.push_str(&format!("- {}\n", rule));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schema_has_five_tables() {
        let schema = SchemaDescriptor::hr_default();
        assert_eq!(schema.tables.len(), 5);
        assert_eq!(schema.relationships.len(), 3);
    }

    #[test]
    fn relationships_resolve_to_real_columns() {
        let schema = SchemaDescriptor::hr_default();
        assert!(schema.relationships_are_wellformed());
        assert!(schema.has_qualified_column("employee.Department"));
        assert!(!schema.has_qualified_column("employee.NoSuchColumn"));
        assert!(!schema.has_qualified_column("Department"));
    }

    #[test]
    fn prompt_text_mentions_tables_joins_and_rules() {
        let text = SchemaDescriptor::hr_default().prompt_text();
        assert!(text.contains("Table: employee"));
        assert!(text.contains("Table: satisfaction_level"));
        assert!(text.contains("performance.EmployeeID = employee.EmployeeID"));
        assert!(text.contains("- Always alias grouped column as category."));
        assert!(text.contains("strftime('%Y-%m', performance.ReviewDate)"));
    }
}
