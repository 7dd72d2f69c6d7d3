use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use toolradar::catalog::store;
use toolradar::config::{self, TrackerConfig};
use toolradar::pipeline::Pipeline;
use toolradar::scoring::engine::ScoringEngine;

#[derive(Parser)]
#[command(name = "toolradar")]
#[command(version, about = "Catalog reconciliation and scoring for tracked AI tools")]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one full pass: resolve, enrich, reconcile, score
    Run {
        /// Existing catalog file (created if absent)
        #[arg(long, default_value = "catalog.json")]
        catalog: PathBuf,

        /// Candidate records discovered by upstream scrapers
        #[arg(long, default_value = "candidates.json")]
        candidates: PathBuf,

        /// Directory receiving the version log of this pass
        #[arg(long, default_value = "logs")]
        log_dir: PathBuf,
    },
    /// Recompute scores for the existing catalog without enrichment
    Rescore {
        #[arg(long, default_value = "catalog.json")]
        catalog: PathBuf,
    },
}

fn init_logging() -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_path = config::log_path();
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let log_dir = log_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = log_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "toolradar.log".into());
    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging()?;

    let config = TrackerConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Command::Run {
            catalog,
            candidates,
            log_dir,
        } => tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
            .block_on(run(config, catalog, candidates, log_dir)),
        Command::Rescore { catalog } => rescore(config, catalog),
    }
}

async fn run(
    config: TrackerConfig,
    catalog_path: PathBuf,
    candidates_path: PathBuf,
    log_dir: PathBuf,
) -> anyhow::Result<()> {
    let now = Utc::now();

    let document = store::load_catalog(&catalog_path).context("loading catalog")?;
    let candidates = store::load_candidates(&candidates_path).context("loading candidates")?;

    let data_dir = config::data_dir();
    fs::create_dir_all(&data_dir).context("creating data directory")?;

    let pipeline = Pipeline::with_defaults(config).context("initializing pipeline")?;
    let outcome = pipeline.run_pass(document.tools, candidates, now).await;

    let metadata = store::CatalogMetadata {
        last_updated: Some(now),
        total_tools: outcome.catalog.len(),
        new_tools_count: outcome.version_log.new_tools.len(),
        updated_tools_count: outcome.version_log.major_updates.len()
            + outcome.version_log.minor_updates.len(),
    };
    store::save_catalog(
        &catalog_path,
        &store::CatalogDocument {
            metadata: metadata.clone(),
            tools: outcome.catalog,
        },
    )
    .context("saving catalog")?;

    let log_path = log_dir.join(format!("versions_{}.json", now.format("%Y%m%d_%H%M%S")));
    store::save_report(&log_path, &outcome.version_log).context("saving version log")?;

    // Operator summary: actual outcomes, including degraded ones.
    info!("=== pass summary ===");
    info!(
        "tools: {} | new: {} | major: {} | minor: {} | candidates rejected: {}",
        metadata.total_tools,
        outcome.version_log.new_tools.len(),
        outcome.version_log.major_updates.len(),
        outcome.version_log.minor_updates.len(),
        outcome.rejected_candidates,
    );
    info!(
        "versions: {} tracked, {} updated, {} need analysis",
        outcome.tracking.total,
        outcome.tracking.updated.len(),
        outcome.tracking.needs_analysis.len(),
    );
    info!(
        "cost: {} cache hits, {} free, {}/{} paid, saved ${:.4}, spent ${:.4}",
        outcome.cost.cache_hits,
        outcome.cost.free_enriched,
        outcome.cost.paid_used,
        outcome.cost.paid_needed,
        outcome.cost.cost_saved,
        outcome.cost.cost_spent,
    );

    Ok(())
}

fn rescore(config: TrackerConfig, catalog_path: PathBuf) -> anyhow::Result<()> {
    let now = Utc::now();

    let mut document = store::load_catalog(&catalog_path).context("loading catalog")?;
    if document.tools.is_empty() {
        info!("catalog is empty, nothing to rescore");
        return Ok(());
    }

    let engine = ScoringEngine::new(config.scoring);
    for tool in document.tools.iter_mut() {
        tool.clear_scores();
    }
    engine.score_catalog(&mut document.tools, now);

    document.metadata.last_updated = Some(now);
    document.metadata.total_tools = document.tools.len();
    store::save_catalog(&catalog_path, &document).context("saving catalog")?;

    info!("rescored {} tools", document.metadata.total_tools);
    Ok(())
}
