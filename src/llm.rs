//! Chat-completions client for SQL synthesis.
//!
//! Renders the schema-constrained prompt, calls the generation service with
//! deterministic sampling, and post-processes the raw text into a single
//! `CandidateSql`. Malformed SQL is not repaired here; the safety gate and
//! the store are the arbiters downstream.

use crate::error::{InsightError, Result};
use crate::executor::ResultRecord;
use crate::query_guard::CandidateSql;
use crate::schema::SchemaDescriptor;
use std::time::Duration;
use tracing::warn;

const GENERATION_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

#[derive(Clone)]
pub struct LlmClient {
    api_key: String,
    model: String,
    base_url: String,
}

impl LlmClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model,
            base_url,
        }
    }

    /// Build a client from the environment. `GROQ_API_KEY` is mandatory;
    /// model and endpoint have Groq defaults.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY").map_err(|_| {
            InsightError::Config("GROQ_API_KEY not set. Please configure it in .env file.".to_string())
        })?;
        let model = std::env::var("GROQ_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url = std::env::var("GROQ_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::new(api_key, model, base_url))
    }

    /// Translate a user question into one candidate SQLite statement.
    pub async fn generate_sql(
        &self,
        question: &str,
        schema: &SchemaDescriptor,
    ) -> Result<CandidateSql> {
        let prompt = format!(
            "You are a senior HR analytics SQL expert.\n\
             Generate a valid SQLite query.\n\n{}\n\nUser Question:\n{}",
            schema.prompt_text(),
            question
        );

        let raw = self
            .call_chat("Generate ONLY SQL. No explanation.", &prompt, 0.0)
            .await?;

        Ok(CandidateSql(postprocess_sql(&raw)))
    }

    /// Two-line executive summary of an already-aggregated result set.
    ///
    /// Degrades to an empty string on upstream failure; a missing insight is
    /// cosmetic, not an error the caller has to handle.
    pub async fn generate_insight(&self, question: &str, data: &[ResultRecord]) -> String {
        let data_text = serde_json::to_string(data).unwrap_or_else(|_| "[]".to_string());
        let prompt = format!(
            "You are an HR analytics expert.\n\n\
             User Question:\n{}\n\n\
             Aggregated Data Result:\n{}\n\n\
             Write a concise 2-line executive-level business insight.\n\
             - Focus on trends, highs/lows, or key takeaways.\n\
             - Do NOT explain methodology.\n\
             - Do NOT repeat numbers excessively.\n\
             - Keep it professional and strategic.",
            question, data_text
        );

        match self
            .call_chat("Generate professional HR insights.", &prompt, 0.3)
            .await
        {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("insight generation failed: {}", e);
                String::new()
            }
        }
    }

    async fn call_chat(&self, system: &str, prompt: &str, temperature: f64) -> Result<String> {
        // Offline mode for tests and local runs without a key.
        if self.api_key == "dummy-api-key" {
            return Ok(canned_response(prompt));
        }

        let client = reqwest::Client::builder()
            .timeout(GENERATION_TIMEOUT)
            .build()
            .map_err(|e| InsightError::Generation(format!("LLM client setup failed: {}", e)))?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt}
            ],
            "temperature": temperature,
        });

        let response = client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| InsightError::Generation(format!("LLM API call failed: {}", e)))?;

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| InsightError::Generation(format!("Failed to parse LLM response: {}", e)))?;

        // Upstream failures arrive as an `error` field; surface the message
        // as-is when it is a plain string.
        if let Some(error) = response_json.get("error") {
            let message = match error.as_str() {
                Some(s) => s.to_string(),
                None => serde_json::to_string(error).unwrap_or_else(|_| "Unknown error".to_string()),
            };
            return Err(InsightError::Generation(message));
        }

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                InsightError::Generation(format!("Unexpected API response: {}", response_json))
            })?;

        Ok(content.to_string())
    }
}

/// Strip markdown fencing and a trailing statement terminator from the raw
/// generation output. No interpretation beyond that.
pub fn postprocess_sql(raw: &str) -> String {
    let mut sql = raw.trim();

    if sql.starts_with("```") {
        sql = sql
            .trim_start_matches("```sql")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
    }

    sql.trim_end_matches(';').trim_end().to_string()
}

/// Canned answers for the dummy-api-key offline mode, keyed off the prompt
/// text the same way the service would read it.
fn canned_response(prompt: &str) -> String {
    let lowered = prompt.to_lowercase();

    if lowered.contains("business insight") {
        return "Job satisfaction holds steady across departments. \
                Technology leads while Sales trails the company average."
            .to_string();
    }

    // The rendered rules also mention trend bucketing, so match against the
    // question section only.
    let lowered = lowered
        .rsplit("user question:")
        .next()
        .unwrap_or(&lowered)
        .to_string();

    if lowered.contains("monthly") {
        return "SELECT strftime('%Y-%m', performance.ReviewDate) AS category, \
                AVG(performance.JobSatisfaction) AS metric \
                FROM performance \
                GROUP BY strftime('%Y-%m', performance.ReviewDate)"
            .to_string();
    }

    if lowered.contains("yearly") || lowered.contains("annual") {
        return "SELECT strftime('%Y', performance.ReviewDate) AS category, \
                AVG(performance.JobSatisfaction) AS metric \
                FROM performance \
                GROUP BY strftime('%Y', performance.ReviewDate)"
            .to_string();
    }

    // Default: department-level average, fenced the way models often answer.
    "```sql\nSELECT employee.Department AS category, \
     AVG(performance.JobSatisfaction) AS metric \
     FROM employee \
     JOIN performance ON performance.EmployeeID = employee.EmployeeID \
     GROUP BY employee.Department;\n```"
        .to_string()
}
