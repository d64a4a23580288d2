//! Operator CLI for the extraction service.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use server_core::intake::{Intake, Submission};
use server_core::queue::JobQueue;
use server_core::store::{self, TherapyStore};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "revmine_cli", about = "Manage documents and extraction jobs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a document's page text and queue an extraction job
    Submit {
        /// Where the source file lives (object storage key, path, URL)
        file_location: String,

        /// Path to the extracted text, pages separated by form feeds
        text_file: PathBuf,

        /// Original file name; defaults to the last segment of the location
        #[arg(long)]
        file_name: Option<String>,

        /// Company hint used for therapy lookup before classification runs
        #[arg(long)]
        company: Option<String>,
    },

    /// Show job state and any stored result for a document
    Status {
        document_id: Uuid,
    },

    /// Queue a high-priority re-run for a document
    Reprocess {
        document_id: Uuid,
    },

    /// Register a therapy name for a company
    RegisterTherapy {
        company: String,
        name: String,
    },

    /// Delete completed jobs older than the given number of days
    Purge {
        #[arg(long, default_value_t = 30)]
        days: u64,
    },

    /// Show queue counts by status
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Submit {
            file_location,
            text_file,
            file_name,
            company,
        } => cmd_submit(file_location, text_file, file_name, company).await,
        Commands::Status { document_id } => cmd_status(document_id).await,
        Commands::Reprocess { document_id } => cmd_reprocess(document_id).await,
        Commands::RegisterTherapy { company, name } => cmd_register_therapy(company, name).await,
        Commands::Purge { days } => cmd_purge(days).await,
        Commands::Stats => cmd_stats().await,
    }
}

async fn get_pool() -> Result<PgPool> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;
    store::run_migrations(&pool).await?;
    Ok(pool)
}

async fn cmd_submit(
    file_location: String,
    text_file: PathBuf,
    file_name: Option<String>,
    company: Option<String>,
) -> Result<()> {
    let text = std::fs::read_to_string(&text_file)
        .with_context(|| format!("failed to read {}", text_file.display()))?;
    let pages: Vec<String> = text
        .split('\u{c}')
        .map(|page| page.trim().to_string())
        .filter(|page| !page.is_empty())
        .collect();
    ensure!(
        !pages.is_empty(),
        "no page text found in {}",
        text_file.display()
    );

    let file_name = file_name.unwrap_or_else(|| {
        file_location
            .rsplit('/')
            .next()
            .unwrap_or(&file_location)
            .to_string()
    });

    let pool = get_pool().await?;
    let submitted = Intake::new(pool)
        .submit_document(Submission {
            file_location,
            file_name,
            company_name: company,
            pages,
        })
        .await?;

    if submitted.reused_existing {
        println!("Document already known: {}", submitted.document_id);
    } else {
        println!("Document registered: {}", submitted.document_id);
    }
    println!("Job queued: {}", submitted.job_id);
    Ok(())
}

async fn cmd_status(document_id: Uuid) -> Result<()> {
    let pool = get_pool().await?;
    let status = Intake::new(pool).extraction_status(document_id).await?;

    println!(
        "Document: {} ({})",
        status.document.id, status.document.file_name
    );
    if let Some(company) = &status.document.company_name {
        println!("Company: {company}");
    }
    if let Some(period) = &status.document.reporting_period {
        println!("Period: {period}");
    }

    match &status.job {
        Some(job) => {
            println!(
                "Job: {} {} [{}] attempts {}/{}",
                job.id, job.job_type, job.status, job.attempts, job.max_attempts
            );
            if let Some(error) = &job.last_error {
                println!("Last error: {error}");
            }
        }
        None => println!("Job: none"),
    }

    match &status.result {
        Some(result) => {
            println!(
                "Result: confidence {} via {} ({} tokens)",
                result.confidence, result.strategy, result.tokens_used
            );
            println!("{}", serde_json::to_string_pretty(&result.records)?);
        }
        None => println!("Result: not yet available"),
    }
    Ok(())
}

async fn cmd_reprocess(document_id: Uuid) -> Result<()> {
    let pool = get_pool().await?;
    let job = Intake::new(pool).trigger_reprocess(document_id).await?;
    println!("Reprocess job queued: {} (priority {})", job.id, job.priority);
    Ok(())
}

async fn cmd_register_therapy(company: String, name: String) -> Result<()> {
    let pool = get_pool().await?;
    let row = TherapyStore::new(pool).register(&name, &company).await?;
    println!("Registered {} for {} ({})", row.name, row.manufacturer, row.id);
    Ok(())
}

async fn cmd_purge(days: u64) -> Result<()> {
    let pool = get_pool().await?;
    let purged = JobQueue::new(pool)
        .purge_completed(Duration::from_secs(days * 86_400))
        .await?;
    println!("Purged {purged} completed jobs older than {days} days");
    Ok(())
}

async fn cmd_stats() -> Result<()> {
    let pool = get_pool().await?;
    let stats = JobQueue::new(pool).stats().await?;
    println!("pending:    {}", stats.pending);
    println!("processing: {}", stats.processing);
    println!("completed:  {}", stats.completed);
    println!("failed:     {}", stats.failed);
    Ok(())
}
