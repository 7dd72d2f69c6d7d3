//! One batch pass over the catalog
//!
//! Sequence: qualify candidates, resolve versions for tracked tools, route
//! enrichment, reconcile into the existing catalog, score, and cap. Per-tool
//! failures are logged with the tool's identity and never abort the pass.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::catalog::record::ToolRecord;
use crate::config::TrackerConfig;
use crate::enrich::analyzer::{Analyzer, CompletionAnalyzer};
use crate::enrich::cache::{EnrichmentStore, SqliteEnrichmentCache};
use crate::enrich::error::CacheError;
use crate::enrich::router::{CostSummary, EnrichmentRouter};
use crate::enrich::scraper::WebScraper;
use crate::reconcile::merge::{VersionLog, merge_catalog};
use crate::scoring::engine::ScoringEngine;
use crate::version::resolver::{TrackingSummary, VersionResolver, track_catalog};
use crate::version::strategies::create_default_strategies;

/// Default confidence assigned to candidates by provenance, mirroring how
/// much each source tier can be trusted.
fn default_confidence(source: Option<&str>) -> u8 {
    let Some(source) = source.map(str::to_lowercase) else {
        // No source tag means a hand-added entry.
        return 100;
    };

    if source.contains("curated") {
        100
    } else if source.contains("official") || source.contains("blog") {
        95
    } else if source.contains("product_hunt") {
        85
    } else if source.contains("github") {
        80
    } else if source.contains("techcrunch") || source.contains("venturebeat") || source.contains("news") {
        75
    } else if source.contains("reddit") {
        40
    } else if source.contains("hn") || source.contains("hacker") {
        30
    } else {
        50
    }
}

/// Everything one pass produces for downstream collaborators.
#[derive(Debug)]
pub struct PassOutcome {
    pub catalog: Vec<ToolRecord>,
    pub version_log: VersionLog,
    pub cost: CostSummary,
    pub tracking: TrackingSummary,
    pub rejected_candidates: usize,
}

/// Statuses excluded from the final size-bounded output. The records are
/// not deleted, only left out of the published catalog.
const EXCLUDED_STATUSES: [&str; 3] = ["discontinued", "legacy", "replaced"];

pub struct Pipeline {
    resolver: VersionResolver,
    router: EnrichmentRouter,
    engine: ScoringEngine,
    config: TrackerConfig,
}

impl Pipeline {
    pub fn new(
        resolver: VersionResolver,
        router: EnrichmentRouter,
        engine: ScoringEngine,
        config: TrackerConfig,
    ) -> Self {
        Self {
            resolver,
            router,
            engine,
            config,
        }
    }

    /// Assemble a pipeline with the default strategy chain, the on-disk
    /// SQLite cache, the web scraper, and the paid analyzer when its
    /// credential is present.
    pub fn with_defaults(config: TrackerConfig) -> Result<Self, CacheError> {
        let store: Arc<dyn EnrichmentStore> =
            Arc::new(SqliteEnrichmentCache::new(&crate::config::db_path())?);
        let analyzer: Option<Arc<dyn Analyzer>> = CompletionAnalyzer::from_env(&config.analysis)
            .map(|a| Arc::new(a) as Arc<dyn Analyzer>);

        let router = EnrichmentRouter::new(
            store,
            Arc::new(WebScraper::default()),
            analyzer,
            Duration::milliseconds(config.cache.ttl_ms),
            config.analysis.cost_per_call,
        );

        Ok(Self {
            resolver: VersionResolver::new(create_default_strategies()),
            router,
            engine: ScoringEngine::new(config.scoring.clone()),
            config,
        })
    }

    /// Drop candidates that cannot be cataloged: no usable name, no URL, or
    /// confidence below the gate. Curated entries always pass. Candidates
    /// arriving without a confidence level get one from their source tier.
    fn qualify_candidates(&self, candidates: Vec<ToolRecord>) -> (Vec<ToolRecord>, usize) {
        let thresholds = &self.config.thresholds;
        let before = candidates.len();

        let qualified: Vec<ToolRecord> = candidates
            .into_iter()
            .filter_map(|mut candidate| {
                if candidate.name.trim().len() < thresholds.min_name_length {
                    debug!("rejected candidate with unusable name: {:?}", candidate.name);
                    return None;
                }
                if candidate.homepage().is_none() && candidate.repo_url.is_none() {
                    debug!("rejected candidate without URL: {}", candidate.name);
                    return None;
                }

                if candidate.confidence_level.is_none() {
                    candidate.confidence_level =
                        Some(default_confidence(candidate.source.as_deref()));
                }

                if !candidate.is_curated()
                    && candidate.confidence_level.unwrap_or(0) < thresholds.confidence_threshold
                {
                    debug!(
                        "rejected low-confidence candidate: {} ({:?})",
                        candidate.name, candidate.confidence_level
                    );
                    return None;
                }

                // Dimension gates apply only to candidates that arrive
                // pre-scored by discovery.
                if !candidate.is_curated() {
                    if let Some(vision) = candidate.vision
                        && vision < thresholds.min_vision
                    {
                        debug!("rejected low-vision candidate: {}", candidate.name);
                        return None;
                    }
                    if let Some(ability) = candidate.ability
                        && ability < thresholds.min_ability
                    {
                        debug!("rejected low-ability candidate: {}", candidate.name);
                        return None;
                    }
                    if let Some(buzz) = candidate.buzz_score
                        && buzz < thresholds.min_buzz_score
                    {
                        debug!("rejected low-buzz candidate: {}", candidate.name);
                        return None;
                    }
                }

                Some(candidate)
            })
            .collect();

        let rejected = before - qualified.len();
        info!(
            "candidate filter: {} in, {} qualified, {} rejected",
            before,
            qualified.len(),
            rejected
        );
        (qualified, rejected)
    }

    /// Run one full pass: resolve, enrich, reconcile, score, cap.
    pub async fn run_pass(
        &self,
        mut existing: Vec<ToolRecord>,
        candidates: Vec<ToolRecord>,
        now: DateTime<Utc>,
    ) -> PassOutcome {
        let (qualified, rejected_candidates) = self.qualify_candidates(candidates);

        // Latest upstream versions for the tracked (curated) tools.
        let tracking = track_catalog(&self.resolver, &mut existing).await;

        // Cost-aware enrichment of the qualified candidates.
        let (enriched, cost) = self.router.enrich(qualified, now).await;

        // Field-level merge into the existing catalog.
        let (mut catalog, version_log) =
            merge_catalog(existing, enriched, &self.config.reconcile, now);

        // Scores are recomputed from scratch on every pass.
        self.engine.score_catalog(&mut catalog, now);

        // Published output excludes retired records and keeps the top N;
        // the ranking order comes from the scoring engine.
        let before_cap = catalog.len();
        catalog.retain(|tool| {
            let excluded = tool
                .status
                .as_deref()
                .is_some_and(|status| EXCLUDED_STATUSES.contains(&status));
            if excluded {
                warn!("excluding retired tool from output: {}", tool.name);
            }
            !excluded
        });
        catalog.truncate(self.config.thresholds.max_tools);

        info!(
            "pass complete: {} tools ({} before cap), {} major, {} minor, {} new",
            catalog.len(),
            before_cap,
            version_log.major_updates.len(),
            version_log.minor_updates.len(),
            version_log.new_tools.len()
        );

        PassOutcome {
            catalog,
            version_log,
            cost,
            tracking,
            rejected_candidates,
        }
    }

    /// Recompute scores for an existing catalog without touching anything
    /// else. Useful after tuning the scoring configuration.
    pub fn rescore(&self, catalog: &mut Vec<ToolRecord>, now: DateTime<Utc>) {
        for tool in catalog.iter_mut() {
            tool.clear_scores();
        }
        self.engine.score_catalog(catalog, now);
    }
}
