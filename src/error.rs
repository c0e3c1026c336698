use thiserror::Error;

/// Error taxonomy for the ask pipeline.
///
/// The `Display` text of each variant is what the caller sees in the
/// `{"error": ...}` payload, so `Generation`, `UnsafeQuery` and `Execution`
/// carry their message verbatim.
#[derive(Error, Debug)]
pub enum InsightError {
    #[error("{0}")]
    Generation(String),

    #[error("{0}")]
    UnsafeQuery(String),

    #[error("{0}")]
    Execution(String),

    #[error("No data returned.")]
    NoData,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ingestion error: {0}")]
    Ingestion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, InsightError>;
