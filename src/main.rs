use hr_insights::assistant::{AskResponse, InsightAssistant};
use hr_insights::executor::QueryExecutor;
use hr_insights::ingestion;
use hr_insights::llm::LlmClient;
use hr_insights::schema::SchemaDescriptor;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hr-insights")]
#[command(about = "Natural-language HR analytics over a guarded SQL pipeline")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the five workforce CSVs into the SQLite store
    Load {
        /// Directory containing Employee.csv, PerformanceRating.csv, etc.
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,

        /// Path of the SQLite database to (re)build
        #[arg(long, default_value = "database.db")]
        db: PathBuf,
    },
    /// Ask a single question from the command line
    Ask {
        /// The question in natural language
        question: String,

        /// Path of the SQLite database
        #[arg(long, default_value = "database.db")]
        db: PathBuf,

        /// Groq API key (or set GROQ_API_KEY env var)
        #[arg(long)]
        api_key: Option<String>,

        /// Also print a short executive insight for the result
        #[arg(long)]
        insight: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Load { data_dir, db } => {
            ingestion::load_workforce_data(&data_dir, &db)?;
            println!("Loaded workforce data into {}", db.display());
        }
        Commands::Ask {
            question,
            db,
            api_key,
            insight,
        } => {
            if let Some(key) = api_key {
                std::env::set_var("GROQ_API_KEY", key);
            }
            let llm = LlmClient::from_env()?;
            let assistant =
                InsightAssistant::new(llm, SchemaDescriptor::hr_default(), QueryExecutor::new(db));

            let response = assistant.ask(&question).await;
            println!("{}", serde_json::to_string_pretty(&response)?);

            if insight {
                if let AskResponse::Success { ref data, .. } = response {
                    let summary = assistant.insight(&question, data).await;
                    if !summary.is_empty() {
                        println!("\n{}", summary);
                    }
                }
            }
        }
    }

    Ok(())
}
