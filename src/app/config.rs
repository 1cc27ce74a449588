use anyhow::{Context, Result};
use std::env;

use crate::app::cli::{Cli, Command};
use crate::app::gateway::DEFAULT_MODEL;
use crate::app::source::Dialect;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub source: String,
    pub openai_api_key: Option<String>,
    pub model: String,
    pub dialect_override: Option<Dialect>,
    pub collect_summaries: bool,
}

pub fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let source = cli
        .source
        .clone()
        .or_else(|| env::var("DATABASE_URL").ok())
        .context("data source must be set via --source or DATABASE_URL")?;

    // Only the subcommands that talk to the model need a key; checked at
    // call time so `schema` works without one.
    let openai_api_key = env::var("OPENAI_API_KEY").ok();

    let model = cli
        .model
        .clone()
        .or_else(|| env::var("DATATALK_MODEL").ok())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let collect_summaries = match cli.command {
        Command::Schema { summaries } => summaries,
        // Prompt-backed commands always include summaries so the model sees
        // representative values.
        _ => true,
    };

    Ok(AppConfig {
        source,
        openai_api_key,
        model,
        dialect_override: cli.dialect,
        collect_summaries,
    })
}

impl AppConfig {
    pub fn require_api_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .context("OPENAI_API_KEY must be set in .env/environment variables")
    }
}
