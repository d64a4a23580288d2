//! Environment-driven configuration.

use std::env;

use anyhow::{Context, Result};
use dotenvy::dotenv;

/// Runtime configuration for the worker and CLI.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string
    pub database_url: String,

    /// API key for the extraction model
    pub openai_api_key: String,

    /// Model override; `None` uses the library default
    pub openai_model: Option<String>,

    /// Seconds to sleep between queue polls when idle
    pub worker_poll_seconds: u64,

    /// Seconds between stuck-job sweeps
    pub worker_sweep_seconds: u64,

    /// Seconds a job may stay leased before a sweep reclaims it
    pub stuck_timeout_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables, reading `.env` first
    /// if one is present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            openai_api_key: env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
            openai_model: env::var("OPENAI_MODEL").ok(),
            worker_poll_seconds: env::var("WORKER_POLL_SECONDS")
                .unwrap_or_else(|_| "2".into())
                .parse()
                .context("WORKER_POLL_SECONDS must be a number")?,
            worker_sweep_seconds: env::var("WORKER_SWEEP_SECONDS")
                .unwrap_or_else(|_| "60".into())
                .parse()
                .context("WORKER_SWEEP_SECONDS must be a number")?,
            stuck_timeout_seconds: env::var("STUCK_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "600".into())
                .parse()
                .context("STUCK_TIMEOUT_SECONDS must be a number")?,
        })
    }
}
