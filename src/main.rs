//! CLI entry point for the registry enrichment tool.

use std::sync::Arc;

use anyhow::Result;
use brreg_enrich::enrich::{SerperClient, WebsiteClassifier};
use brreg_enrich::prompt::{DecisionProvider, RunDecision, ScriptedDecision, TerminalPrompt};
use brreg_enrich::{Config, Enricher, IngestionPipeline, NoopEnricher, WebEnricher};
use clap::Parser;
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env from the working directory before anything reads the
    // environment; absence is fine.
    let _ = dotenvy::dotenv();

    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("Registry enrichment starting");

    let config = Config::from_env(args.data_dir.as_deref(), args.request_delay_ms)?;

    let enricher: Arc<dyn Enricher> = if config.enrichment_configured() {
        Arc::new(WebEnricher::new(
            SerperClient::new(config.serper_api_key.clone()),
            WebsiteClassifier::new(config.openai_api_key.clone()),
            config.request_delay,
        ))
    } else {
        warn!("SERPER_API_KEY or OPENAI_API_KEY not set; website lookup disabled");
        Arc::new(NoopEnricher)
    };

    let decisions: Arc<dyn DecisionProvider> = if args.refresh {
        Arc::new(ScriptedDecision(RunDecision::FullRefresh))
    } else if args.resume {
        Arc::new(ScriptedDecision(RunDecision::Resume))
    } else {
        Arc::new(TerminalPrompt)
    };

    let pipeline = IngestionPipeline::new(config, enricher, decisions);
    let summary = pipeline.run().await?;

    info!(
        processed = summary.processed_count,
        last_index = summary.last_processed_index,
        "Run complete"
    );

    Ok(())
}
