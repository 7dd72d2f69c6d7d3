//! Enrichment decision engine
//!
//! Per tool, in order: reuse a fresh cache entry (zero cost), apply free
//! scrapers (zero cost), reassess gaps, and only then escalate to the paid
//! analyzer. Curated tools always escalate: their quality-sensitive
//! scoring fields deserve real analysis. Escalated tools go out in a single
//! batch; when no analyzer is configured they come back unenriched rather
//! than blocking the pass.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::record::ToolRecord;
use crate::enrich::analyzer::{AnalysisRequest, Analyzer};
use crate::enrich::cache::{CacheEntry, EnrichmentStore, fingerprint};
use crate::enrich::fields::{Enrichment, missing_paid_fields};
use crate::enrich::scraper::FreeScraper;

/// Cost accounting for one enrichment pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostSummary {
    pub total: usize,
    pub cache_hits: usize,
    pub free_enriched: usize,
    pub paid_needed: usize,
    pub paid_used: usize,
    pub fully_enriched: usize,
    pub cost_saved: f64,
    pub cost_spent: f64,
}

pub struct EnrichmentRouter {
    store: Arc<dyn EnrichmentStore>,
    scraper: Arc<dyn FreeScraper>,
    analyzer: Option<Arc<dyn Analyzer>>,
    ttl: Duration,
    cost_per_call: f64,
}

impl EnrichmentRouter {
    pub fn new(
        store: Arc<dyn EnrichmentStore>,
        scraper: Arc<dyn FreeScraper>,
        analyzer: Option<Arc<dyn Analyzer>>,
        ttl: Duration,
        cost_per_call: f64,
    ) -> Self {
        Self {
            store,
            scraper,
            analyzer,
            ttl,
            cost_per_call,
        }
    }

    /// Enrich a batch of tools, spending as little as possible.
    pub async fn enrich(
        &self,
        tools: Vec<ToolRecord>,
        now: DateTime<Utc>,
    ) -> (Vec<ToolRecord>, CostSummary) {
        let mut summary = CostSummary {
            total: tools.len(),
            ..CostSummary::default()
        };

        let mut enriched: Vec<ToolRecord> = Vec::with_capacity(tools.len());
        let mut escalated: Vec<(ToolRecord, Vec<crate::enrich::fields::EnrichmentField>)> =
            Vec::new();

        for mut tool in tools {
            let key = fingerprint(&tool.name, tool.homepage());

            // Step 1: fresh cache entry wins outright.
            match self.store.load(&key) {
                Ok(Some(entry)) if entry.is_fresh(self.ttl, now) => {
                    debug!("cache hit: {}", tool.name);
                    entry.payload.apply_to(&mut tool);
                    tool.last_enriched = Some(entry.cached_at);
                    summary.cache_hits += 1;
                    summary.cost_saved += self.cost_per_call;
                    enriched.push(tool);
                    continue;
                }
                Ok(Some(_)) => debug!("cache expired: {}", tool.name),
                Ok(None) => {}
                Err(err) => warn!("cache load failed for {}: {}", tool.name, err),
            }

            // Step 2: free scrapers.
            match self.scraper.scrape(&tool).await {
                Ok(free) if !free.is_empty() => {
                    free.apply_to(&mut tool);
                    summary.free_enriched += 1;
                    summary.cost_saved += self.cost_per_call;
                }
                Ok(_) => {}
                Err(err) => debug!("free scrape failed for {}: {}", tool.name, err),
            }

            // Step 3: gap assessment against the paid-required field set.
            let missing = missing_paid_fields(&tool);

            // Step 4: escalation: remaining gaps, or curated entries whose
            // quality-sensitive fields always get real analysis.
            if !missing.is_empty() || tool.is_curated() {
                if tool.is_curated() {
                    debug!("curated, forcing paid analysis: {}", tool.name);
                } else {
                    debug!(
                        "needs paid analysis: {} (missing: {})",
                        tool.name,
                        missing
                            .iter()
                            .map(|f| f.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                }
                summary.paid_needed += 1;
                escalated.push((tool, missing));
            } else {
                debug!("fully enriched for free: {}", tool.name);
                summary.fully_enriched += 1;
                tool.last_enriched = Some(now);
                enriched.push(tool);
            }
        }

        // Step 5: one paid batch for everything escalated.
        if !escalated.is_empty() {
            match &self.analyzer {
                Some(analyzer) => {
                    let batch: Vec<AnalysisRequest> = escalated
                        .iter()
                        .map(|(tool, missing)| AnalysisRequest {
                            tool_name: tool.name.clone(),
                            missing_fields: missing.clone(),
                            is_curated: tool.is_curated(),
                        })
                        .collect();

                    info!("submitting {} tools for paid analysis", batch.len());
                    match analyzer.analyze(&batch).await {
                        Ok(results) => {
                            let mut by_name: HashMap<String, Enrichment> = results
                                .into_iter()
                                .map(|r| (r.tool_name, r.fields))
                                .collect();

                            summary.paid_used = batch.len();
                            summary.cost_spent =
                                batch.len() as f64 * self.cost_per_call;

                            for (mut tool, _) in escalated {
                                if let Some(fields) = by_name.remove(&tool.name) {
                                    let filled = fields.apply_missing(&mut tool);
                                    debug!(
                                        "paid analysis filled {} field(s) for {}",
                                        filled.len(),
                                        tool.name
                                    );
                                }
                                tool.last_enriched = Some(now);
                                enriched.push(tool);
                            }
                        }
                        Err(err) => {
                            warn!("paid analysis batch failed: {}", err);
                            enriched.extend(escalated.into_iter().map(|(tool, _)| tool));
                        }
                    }
                }
                None => {
                    warn!(
                        "{} tools need paid analysis but no analyzer is configured",
                        escalated.len()
                    );
                    enriched.extend(escalated.into_iter().map(|(tool, _)| tool));
                }
            }
        }

        // Every successfully enriched tool refreshes its cache entry.
        for tool in enriched.iter().filter(|t| t.last_enriched.is_some()) {
            let entry = CacheEntry {
                fingerprint: fingerprint(&tool.name, tool.homepage()),
                tool_name: tool.name.clone(),
                payload: Enrichment::from_record(tool),
                cached_at: now,
            };
            if let Err(err) = self.store.save(&entry) {
                warn!("cache save failed for {}: {}", tool.name, err);
            }
        }

        info!(
            "enrichment: {} tools, {} cache hits, {} free, {} paid of {} needed, saved {:.4}, spent {:.4}",
            summary.total,
            summary.cache_hits,
            summary.free_enriched,
            summary.paid_used,
            summary.paid_needed,
            summary.cost_saved,
            summary.cost_spent
        );

        (enriched, summary)
    }
}
