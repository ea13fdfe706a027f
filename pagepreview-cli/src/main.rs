//! `pagepreview` command-line tool.
//!
//! Runs the preview pipeline for one URL and prints the result as JSON.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pagepreview::config::{FetchStrategy, MergeStrategy, PreviewConfig};
use pagepreview::pipeline::PreviewPipeline;

#[derive(Debug, Parser)]
#[command(name = "pagepreview")]
#[command(about = "Extract link-preview metadata and candidate images for a URL")]
struct Cli {
    /// URL to preview
    url: String,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    json_logs: bool,

    /// Overall deadline for the run, in seconds
    #[arg(long, value_name = "N")]
    timeout_secs: Option<u64>,

    /// How to retrieve the page
    #[arg(long, value_enum, default_value_t = FetchMode::DirectWithFallback)]
    fetch_strategy: FetchMode,

    /// How to combine page-level and domain-level images
    #[arg(long, value_enum, default_value_t = MergeMode::Interleave)]
    merge_strategy: MergeMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FetchMode {
    DirectOnly,
    DirectWithFallback,
}

impl From<FetchMode> for FetchStrategy {
    fn from(mode: FetchMode) -> Self {
        match mode {
            FetchMode::DirectOnly => Self::DirectOnly,
            FetchMode::DirectWithFallback => Self::DirectWithFallback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MergeMode {
    Interleave,
    FixedOffset,
}

impl From<MergeMode> for MergeStrategy {
    fn from(mode: MergeMode) -> Self {
        match mode {
            MergeMode::Interleave => Self::Interleave,
            MergeMode::FixedOffset => Self::FixedOffset,
        }
    }
}

impl Cli {
    fn preview_config(&self) -> PreviewConfig {
        let mut config = PreviewConfig::from_env();
        config.pipeline = config
            .pipeline
            .with_fetch_strategy(self.fetch_strategy.into())
            .with_merge_strategy(self.merge_strategy.into());
        config
    }
}

fn init_tracing(json_logs: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pagepreview=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json_logs {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let pipeline = PreviewPipeline::from_config(&cli.preview_config())
        .context("failed to set up the preview pipeline")?;

    let result = match cli.timeout_secs {
        Some(secs) => {
            pipeline
                .run_with_timeout(&cli.url, Duration::from_secs(secs))
                .await
        }
        None => pipeline.run(&cli.url).await,
    };
    info!(
        "Preview for {} finished with {} errors",
        cli.url,
        result.errors.len()
    );

    let rendered =
        serde_json::to_string_pretty(&result).context("failed to serialize the result")?;
    println!("{rendered}");
    Ok(())
}
