//! # Article Fetch
//!
//! Fetches articles hosted on a content platform (WeChat official-account
//! pages and similar), extracts the title, publication date and body, and
//! saves each one as a Markdown document with YAML frontmatter ready for a
//! static-site content collection.
//!
//! ## Features
//!
//! - Multi-strategy extraction: ordered selector cascades for title, date and body
//! - Noise stripping (scripts, styles, QR-code and promotional blocks)
//! - HTML → Markdown conversion with platform boilerplate removal
//! - Summaries cut at a sentence boundary when possible
//! - Collision-safe file naming that never overwrites earlier runs
//! - Per-item success/failure report, optionally written as JSON
//!
//! ## Usage
//!
//! ```sh
//! article_fetch -g "张三" -t "访谈,AI" https://mp.weixin.qq.com/s/abc
//! article_fetch -f urls.txt -o ./src/content/blog --report report.json
//! ```
//!
//! ## Architecture
//!
//! Every URL runs through the same stages, one article at a time:
//! 1. **Fetch**: Download the page with browser-like headers
//! 2. **Extract**: Pick title, date and body via selector cascades
//! 3. **Normalize**: Convert to Markdown, strip boilerplate, derive a summary
//! 4. **Persist**: Render frontmatter and write under a free file name
//!
//! A failure in one article is recorded in the report and the batch continues.

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use cli::Cli;
use config::Config;
use outputs::report::write_report;
use pipeline::Pipeline;
use scrapers::fetcher::HttpFetcher;
use utils::{ensure_writable_dir, read_url_file};

#[tokio::main]
#[instrument]
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

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.file, ?args.output, ?args.config, "Parsed CLI arguments");

    // ---- Config ----
    let mut config = match &args.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!(path = %path.display(), "Loaded configuration");
            config
        }
        None => Config::default(),
    };
    args.apply_overrides(&mut config);

    // ---- Gather URLs ----
    let urls = match &args.file {
        Some(path) => read_url_file(path).await?,
        None => args.urls.clone(),
    };
    if urls.is_empty() {
        println!("No URLs given. Pass article URLs as arguments or use --file <PATH>.");
        println!("Run with --help for all options.");
        return Ok(());
    }
    info!(count = urls.len(), "Collected article URLs");

    // Early check: fail the whole run before fetching anything
    if let Err(e) = ensure_writable_dir(&config.output_dir).await {
        error!(
            path = %config.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    // ---- Run ----
    let fetcher = HttpFetcher::new(&config.request)?;
    let pipeline = Pipeline::new(&config, fetcher)?;
    let report = pipeline.run(args.requests(urls)).await;

    println!("{report}");

    if let Some(path) = &args.report {
        if let Err(e) = write_report(&report, path).await {
            error!(path = %path.display(), error = %e, "Failed to write JSON report");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        succeeded = report.succeeded,
        failed = report.failed,
        "Execution complete"
    );

    Ok(())
}
