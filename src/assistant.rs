//! Top of the ask pipeline.
//!
//! Wires synthesizer, safety gate, executor and KPI derivation together and
//! converts every stage failure into the soft `{error}` payload. Nothing
//! here crosses the HTTP boundary as a transport failure.

use crate::error::{InsightError, Result};
use crate::executor::{QueryExecutor, ResultRecord};
use crate::kpi;
use crate::llm::LlmClient;
use crate::query_guard::validate;
use crate::schema::SchemaDescriptor;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

/// Wire envelope for `/ask`. Success and error are mutually exclusive JSON
/// shapes; the error text is the payload, not a transport status.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AskResponse {
    Success {
        sql: String,
        data: Vec<ResultRecord>,
        kpi: Option<f64>,
        total_employees: i64,
        is_time_series: bool,
    },
    Error {
        error: String,
    },
}

pub struct InsightAssistant {
    llm: LlmClient,
    schema: SchemaDescriptor,
    executor: QueryExecutor,
}

impl InsightAssistant {
    pub fn new(llm: LlmClient, schema: SchemaDescriptor, executor: QueryExecutor) -> Self {
        Self {
            llm,
            schema,
            executor,
        }
    }

    /// Answer one natural-language question. Never fails outward: every
    /// upstream error becomes the `{error}` shape.
    pub async fn ask(&self, question: &str) -> AskResponse {
        let request_id = Uuid::new_v4();
        info!(%request_id, question, "handling question");

        match self.run(question).await {
            Ok(response) => response,
            Err(e) => {
                error!(%request_id, "ask failed: {}", e);
                AskResponse::Error {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn run(&self, question: &str) -> Result<AskResponse> {
        let candidate = self.llm.generate_sql(question, &self.schema).await?;
        let validated = validate(candidate)?;
        info!("generated SQL: {}", validated.as_str());

        let data = self.executor.execute(&validated)?;
        if data.is_empty() {
            return Err(InsightError::NoData);
        }

        let kpi = kpi::mean_metric(&data);
        let total_employees = self.executor.count_employees()?;

        // Syntactic detector: a query can mention the bucketing function
        // without being a trend by intent; accepted approximation.
        let is_time_series = validated.as_str().to_lowercase().contains("strftime");

        Ok(AskResponse::Success {
            sql: validated.into_string(),
            data,
            kpi,
            total_employees,
            is_time_series,
        })
    }

    /// Executive summary over an already-returned result set. Empty string
    /// when generation is unavailable.
    pub async fn insight(&self, question: &str, data: &[ResultRecord]) -> String {
        self.llm.generate_insight(question, data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_shape_serializes_all_envelope_fields() {
        let mut record = ResultRecord::new();
        record.insert("category".to_string(), json!("Sales"));
        record.insert("metric".to_string(), json!(3.5));

        let response = AskResponse::Success {
            sql: "SELECT 1".to_string(),
            data: vec![record],
            kpi: Some(3.5),
            total_employees: 42,
            is_time_series: false,
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["sql"], "SELECT 1");
        assert_eq!(value["kpi"], 3.5);
        assert_eq!(value["total_employees"], 42);
        assert_eq!(value["is_time_series"], false);
        assert_eq!(value["data"][0]["category"], "Sales");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn absent_kpi_serializes_as_null() {
        let response = AskResponse::Success {
            sql: "SELECT 1".to_string(),
            data: vec![],
            kpi: None,
            total_employees: 0,
            is_time_series: false,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert!(value["kpi"].is_null());
    }

    #[test]
    fn error_shape_is_a_single_field() {
        let response = AskResponse::Error {
            error: "No data returned.".to_string(),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({"error": "No data returned."}));
    }
}
