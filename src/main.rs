#![allow(missing_docs)]

//! Almanac binary: CLI entry point.
//!
//! Wires the configured completion provider and calendar backend into
//! the dispatcher, then hands control to the CLI adapter.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use almanac::adapters;
use almanac::calendar::google::GoogleCalendar;
use almanac::calendar::CalendarBackend;
use almanac::config::{AlmanacConfig, CalendarConfig, LlmConfig};
use almanac::logging;
use almanac::pipeline::{Dispatcher, RequestContext};
use almanac::providers::ollama::OllamaProvider;
use almanac::providers::openai::OpenAiProvider;
use almanac::providers::CompletionProvider;

#[derive(Parser)]
#[command(name = "almanac", about = "Natural-language calendar assistant", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single query through the pipeline.
    Prompt {
        /// The natural-language request.
        query: String,
        /// Sampling temperature forwarded to every completion call.
        #[arg(long, default_value_t = 0.0)]
        temperature: f32,
    },
    /// Interactive loop reading queries from stdin.
    Repl {
        /// Sampling temperature forwarded to every completion call.
        #[arg(long, default_value_t = 0.0)]
        temperature: f32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = AlmanacConfig::load().context("failed to load configuration")?;
    logging::init();

    let cli = Cli::parse();

    let provider = build_provider(&config.llm)?;
    info!(model = provider.model_id(), "completion provider ready");
    let backend = build_backend(&config.calendar)?;

    let dispatcher = Dispatcher::new(provider, backend);

    match cli.command {
        Command::Prompt { query, temperature } => {
            let ctx = RequestContext::new(&config.request.user_timezone, temperature);
            adapters::cli::run_prompt(&dispatcher, &query, &ctx).await
        }
        Command::Repl { temperature } => {
            adapters::cli::run_repl(&dispatcher, &config.request.user_timezone, temperature).await
        }
    }
}

/// Build the configured completion provider.
fn build_provider(llm: &LlmConfig) -> Result<Arc<dyn CompletionProvider>> {
    match llm.provider.as_str() {
        "openai" => {
            let api_key = llm.openai.api_key.clone().context(
                "OPENAI_API_KEY is not set and [llm.openai].api_key is not configured",
            )?;
            Ok(Arc::new(OpenAiProvider::new(
                llm.openai.base_url.clone(),
                llm.openai.model.clone(),
                api_key,
            )))
        }
        "ollama" => Ok(Arc::new(OllamaProvider::new(
            llm.ollama.base_url.clone(),
            llm.ollama.model.clone(),
        ))),
        other => anyhow::bail!("unknown completion provider: {other}"),
    }
}

/// Build the Google Calendar backend from config.
fn build_backend(calendar: &CalendarConfig) -> Result<Arc<dyn CalendarBackend>> {
    let token = calendar.token.clone().context(
        "ALMANAC_GOOGLE_TOKEN is not set and [calendar].token is not configured",
    )?;
    Ok(Arc::new(GoogleCalendar::new(
        calendar.base_url.clone(),
        calendar.calendar_id.clone(),
        token,
    )))
}
