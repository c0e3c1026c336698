//! Natural-language HR analytics: question -> guarded SQL -> KPI.
//!
//! Pipeline: `llm` synthesizes a candidate statement from the schema-bound
//! prompt, `query_guard` vets it, `executor` runs it against the SQLite
//! store, `kpi` derives the scalar, and `assistant` assembles the envelope.

pub mod assistant;
pub mod error;
pub mod executor;
pub mod ingestion;
pub mod kpi;
pub mod llm;
pub mod query_guard;
pub mod schema;
