//! Long-running extraction worker.
//!
//! Connects to Postgres, applies migrations, and polls the job queue until
//! interrupted. Ctrl-C finishes the job in flight before exiting.

use std::time::Duration;

use anyhow::Result;
use revmine::OpenAi;
use server_core::config::Config;
use server_core::store::{self, TherapyStore};
use server_core::worker::{Worker, WorkerConfig};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,revmine=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    store::run_migrations(&pool).await?;

    let mut ai = OpenAi::new(config.openai_api_key.clone());
    if let Some(model) = config.openai_model.as_deref() {
        ai = ai.with_model(model);
    }
    let therapies = TherapyStore::new(pool.clone());

    let worker_config = WorkerConfig {
        poll_interval: Duration::from_secs(config.worker_poll_seconds),
        sweep_interval: Duration::from_secs(config.worker_sweep_seconds),
        stuck_timeout: Duration::from_secs(config.stuck_timeout_seconds),
        ..WorkerConfig::default()
    };

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            signal.cancel();
        }
    });

    Worker::with_config(pool, ai, therapies, worker_config)
        .run(shutdown)
        .await
}
