//! # AI Paper Digest
//!
//! A daily research digest that collects AI papers, lab blog posts and
//! researcher posts, optionally summarizes them with an LLM, and pushes a
//! single interactive card to one or more chat webhooks.
//!
//! ## Features
//!
//! - Hugging Face daily papers over a configurable lookback window, or the trending list
//! - RSS/Atom feeds from a built-in registry of lab and personal blogs
//! - Optional researcher posts from public syndication timelines
//! - One curated classic paper per digest
//! - Keyword category filter, deduplication and recency ranking
//! - Summaries through Claude, Gemini or any OpenAI-compatible endpoint
//!
//! ## Usage
//!
//! ```sh
//! FEISHU_WEBHOOK_URL=https://open.feishu.cn/open-apis/bot/v2/hook/xxx ai_paper_digest
//! ai_paper_digest --dry-run --categories alignment
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Fetching**: All sources run concurrently; a failing source contributes nothing
//! 2. **Selection**: Category filter, dedupe, and a recency cap per source
//! 3. **Summarizing**: Papers and blog posts go to the LLM, 3 at a time
//! 4. **Delivery**: The card is rendered once and posted to every webhook

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod categories;
mod cli;
mod config;
mod digest;
mod error;
mod models;
mod outputs;
mod pipeline;
mod pusher;
mod ranking;
mod sources;
mod summarizer;
mod utils;

use cli::Cli;
use config::Config;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // .env is optional; real environment variables take precedence.
    let dotenv = dotenvy::dotenv();

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
    info!(version = env!("CARGO_PKG_VERSION"), "ai_paper_digest starting up");
    match &dotenv {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(e) => debug!(error = %e, "No .env loaded"),
    }

    // Parse CLI
    let args = Cli::parse();
    debug!(
        days_back = args.days_back,
        max_papers = args.max_papers,
        categories = %args.categories,
        dry_run = args.dry_run,
        "Parsed CLI arguments"
    );

    let config = match Config::from_cli(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    info!(
        webhooks = config.push.webhooks.len(),
        blog_sources = config.blogs.sources.len(),
        summaries = config.summarizer.is_some(),
        classic = config.classic.is_some(),
        social = config.social.is_some(),
        filter = config.filter.is_enabled(),
        "Configuration loaded"
    );

    match pipeline::run(&config).await? {
        Some(report) => info!(
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "Digest pushed"
        ),
        None => info!("Nothing pushed"),
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
