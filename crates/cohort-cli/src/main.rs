use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cohort_storage::Database;
use cohort_sync::{IngestPipeline, IngestSummary, RecordIngestor, SyncConfig};
use cohort_web::{AppState, WebConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cohort-cli")]
#[command(about = "Cohort board ingestion and query service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Decode the roster and session log, enrich, and persist.
    Ingest,
    /// Serve the query API over the existing store.
    Serve,
    /// Ingest, then serve. A failed ingestion exits without serving.
    Run,
    /// Create the schema if it is missing.
    Migrate,
    /// Register a mentor by display name.
    AddMentor {
        #[arg(required = true)]
        name: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let sync_config = SyncConfig::from_env();
    let web_config = WebConfig::from_env();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Ingest => {
            let db = open(&sync_config).await?;
            let ingestor = Arc::new(RecordIngestor::from_config(db, &sync_config)?);
            let summary = ingest(&sync_config, ingestor).await?;
            print_summary(&summary);
        }
        Commands::Serve => {
            let db = open(&sync_config).await?;
            let ingestor = Arc::new(RecordIngestor::from_config(db, &sync_config)?);
            cohort_web::serve(AppState::new(ingestor, web_config.secret_path), web_config.port).await?;
        }
        Commands::Run => {
            let db = open(&sync_config).await?;
            let ingestor = Arc::new(RecordIngestor::from_config(db, &sync_config)?);
            let summary = ingest(&sync_config, Arc::clone(&ingestor)).await?;
            print_summary(&summary);
            cohort_web::serve(AppState::new(ingestor, web_config.secret_path), web_config.port).await?;
        }
        Commands::Migrate => {
            let db = open(&sync_config).await?;
            let counts = db.table_counts().await?;
            println!(
                "schema ready at {} ({} student rows)",
                sync_config.database_url, counts.students
            );
        }
        Commands::AddMentor { name } => {
            let name = name.join(" ");
            let db = open(&sync_config).await?;
            let id = db.insert_mentor(&name).await?;
            println!("mentor {name:?} -> id {id}");
        }
    }

    Ok(())
}

async fn open(config: &SyncConfig) -> Result<Database> {
    Database::connect(&config.database_url)
        .await
        .with_context(|| format!("opening {}", config.database_url))
}

async fn ingest(config: &SyncConfig, ingestor: Arc<RecordIngestor>) -> Result<IngestSummary> {
    info!(
        roster = %config.roster_path.display(),
        sessions = %config.sessions_path.display(),
        "starting ingestion"
    );
    IngestPipeline::from_config(ingestor, config)
        .run()
        .await
        .context("ingestion failed")
}

fn print_summary(summary: &IngestSummary) {
    println!(
        "ingest complete: run_id={} decoded={} persisted={} skipped={} already_present={} degraded={} sessions={}/{}",
        summary.run_id,
        summary.decoded,
        summary.persisted,
        summary.skipped,
        summary.already_present,
        summary.degraded,
        summary.sessions_written,
        summary.sessions_written + summary.sessions_skipped
    );
}
