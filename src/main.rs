//! # Article Refinery
//!
//! A batch pipeline that takes news articles from a CSV store, strips their
//! HTML down to clean text, sends each one to an LLM with a fixed rewriting
//! instruction, parses the HTML-formatted response into structured fields,
//! and appends the results to an output CSV — checkpointing every few rows
//! so a crash loses at most one partial batch.
//!
//! ## Usage
//!
//! ```sh
//! article_refinery -c config.yaml
//! ```
//!
//! ## Pipeline
//!
//! For each input row, strictly one at a time:
//! 1. **Normalize**: strip markup (and all `<style>` content) from the raw
//!    article HTML, wrap the text in `<article>...</article>`
//! 2. **Complete**: send the normalized text with the fixed system
//!    instruction to the chat-completions endpoint (with retry/backoff)
//! 3. **Parse**: strip any ```` ```html ```` fence, extract title, meta
//!    description, and article body from the response
//! 4. **Emit**: append the row to the output store; failed rows become
//!    sentinel rows and the batch keeps going
//!
//! Token usage and cost accumulate across the run and are reported at the
//! end (cost to four decimal places).

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod api;
mod cli;
mod config;
mod driver;
mod error;
mod html;
mod models;
mod store;
mod tokens;
mod utils;

use api::{CompletionClient, RetryCompletion};
use cli::Cli;
use config::AppConfig;
use driver::BatchDriver;
use store::{read_input, CheckpointedWriter};
use tokens::TokenCounter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("article_refinery starting up");

    let args = Cli::parse();
    let mut config = AppConfig::load(&args.config)?;
    if let Some(input) = args.input {
        config.pipeline.input_path = input;
    }
    if let Some(output) = args.output {
        config.pipeline.output_path = output;
    }
    info!(
        config_path = %args.config,
        model = %config.model.name,
        input = %config.pipeline.input_path,
        output = %config.pipeline.output_path,
        "Loaded configuration"
    );

    let system_prompt = config.load_prompt()?;
    info!(
        prompt_path = %config.pipeline.prompt_path,
        bytes = system_prompt.len(),
        "Loaded system instruction"
    );

    // Single read of the input store; it drives the whole run.
    let articles = read_input(&config.pipeline.input_path)?;

    let counter = TokenCounter::for_model(&config.model.name)?;
    let client = CompletionClient::new(&config.api, &config.model, system_prompt)?;
    let client = RetryCompletion::new(client, config.api.max_retries, Duration::from_secs(1));
    let writer = CheckpointedWriter::new(&config.pipeline.output_path);

    let driver = BatchDriver::new(
        client,
        counter,
        config.model.cost_rates(),
        writer,
        config.pipeline.checkpoint_every,
    );

    let totals = match driver.run(articles).await {
        Ok(totals) => totals,
        Err(e) => {
            error!(error = %e, "Batch aborted");
            return Err(e.into());
        }
    };

    let elapsed = start_time.elapsed();
    info!(path = %config.pipeline.output_path, "Processed articles saved");
    info!(total_cost = format!("${:.4}", totals.total_cost), "Total cost");
    info!(
        total_output_tokens = totals.total_output_tokens,
        "Total output tokens"
    );
    info!(
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
