//! End-to-end enrichment flows against the real SQLite cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{Duration, Utc};

use toolradar::catalog::record::ToolRecord;
use toolradar::enrich::analyzer::{AnalysisRequest, AnalysisResult, Analyzer};
use toolradar::enrich::cache::{
    CacheEntry, EnrichmentStore, SqliteEnrichmentCache, fingerprint,
};
use toolradar::enrich::error::{AnalysisError, ScrapeError};
use toolradar::enrich::fields::Enrichment;
use toolradar::enrich::router::EnrichmentRouter;
use toolradar::enrich::scraper::FreeScraper;

const COST: f64 = 0.0008;

/// Scraper that always returns the same payload and counts its calls.
struct FixedScraper {
    payload: Enrichment,
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl FreeScraper for FixedScraper {
    async fn scrape(&self, _tool: &ToolRecord) -> Result<Enrichment, ScrapeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.payload.clone())
    }
}

/// Analyzer that fills pricing for every requested tool.
struct FixedAnalyzer;

#[async_trait::async_trait]
impl Analyzer for FixedAnalyzer {
    async fn analyze(
        &self,
        batch: &[AnalysisRequest],
    ) -> Result<Vec<AnalysisResult>, AnalysisError> {
        Ok(batch
            .iter()
            .map(|request| AnalysisResult {
                tool_name: request.tool_name.clone(),
                fields: Enrichment {
                    pricing: Some("Usage-based, $0.01 per call".to_string()),
                    limitations: vec!["rate limited".to_string()],
                    use_cases: vec!["analysis".to_string()],
                    key_features: vec!["api".to_string()],
                    changelog: vec![toolradar::catalog::record::ChangelogEntry {
                        title: "initial release".to_string(),
                        description: "first public version".to_string(),
                        date: None,
                    }],
                    ..Enrichment::default()
                },
            })
            .collect())
    }
}

fn full_payload() -> Enrichment {
    Enrichment {
        description: Some("Complete AI developer platform".to_string()),
        pricing: Some("Free tier available".to_string()),
        key_features: vec!["generation".to_string()],
        limitations: vec!["cloud only".to_string()],
        use_cases: vec!["development".to_string()],
        changelog: vec![toolradar::catalog::record::ChangelogEntry {
            title: "v2 launch".to_string(),
            description: "bigger model".to_string(),
            date: None,
        }],
        status: Some("active".to_string()),
        ..Enrichment::default()
    }
}

fn router_with(
    store: Arc<dyn EnrichmentStore>,
    scraper: FixedScraper,
    analyzer: Option<Arc<dyn Analyzer>>,
) -> EnrichmentRouter {
    EnrichmentRouter::new(store, Arc::new(scraper), analyzer, Duration::days(7), COST)
}

fn tool(name: &str) -> ToolRecord {
    let mut tool = ToolRecord::new(name);
    tool.url = Some(format!("https://{}.example.com", name.to_lowercase()));
    tool
}

#[tokio::test]
async fn cache_round_trip_reproduces_original_enrichment() {
    let store: Arc<dyn EnrichmentStore> = Arc::new(SqliteEnrichmentCache::in_memory().unwrap());
    let calls = Arc::new(AtomicUsize::new(0));
    let now = Utc::now();

    // First pass: free scraping fills everything and populates the cache.
    let router = router_with(
        store.clone(),
        FixedScraper {
            payload: full_payload(),
            calls: calls.clone(),
        },
        None,
    );
    let (first, summary) = router.enrich(vec![tool("Replit")], now).await;
    assert_eq!(summary.free_enriched, 1);
    assert_eq!(summary.fully_enriched, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Second pass: the cache hit reproduces the same fields with no scrape.
    let router = router_with(
        store,
        FixedScraper {
            payload: Enrichment::default(),
            calls: calls.clone(),
        },
        None,
    );
    let (second, summary) = router.enrich(vec![tool("Replit")], now).await;

    assert_eq!(summary.cache_hits, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1); // scraper untouched
    assert_eq!(second[0].description, first[0].description);
    assert_eq!(second[0].pricing, first[0].pricing);
    assert_eq!(second[0].key_features, first[0].key_features);
    assert_eq!(second[0].changelog, first[0].changelog);
}

#[tokio::test]
async fn expired_cache_entry_is_treated_as_a_miss() {
    let store: Arc<dyn EnrichmentStore> = Arc::new(SqliteEnrichmentCache::in_memory().unwrap());
    let calls = Arc::new(AtomicUsize::new(0));
    let now = Utc::now();

    let subject = tool("Replit");
    store
        .save(&CacheEntry {
            fingerprint: fingerprint(&subject.name, subject.homepage()),
            tool_name: subject.name.clone(),
            payload: full_payload(),
            cached_at: now - Duration::days(8), // past the 7-day TTL
        })
        .unwrap();

    let router = router_with(
        store,
        FixedScraper {
            payload: full_payload(),
            calls: calls.clone(),
        },
        None,
    );
    let (_, summary) = router.enrich(vec![subject], now).await;

    // The stale entry does not count as a hit; free enrichment runs instead.
    assert_eq!(summary.cache_hits, 0);
    assert_eq!(summary.free_enriched, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn paid_analysis_fills_remaining_gaps_and_is_accounted() {
    let store: Arc<dyn EnrichmentStore> = Arc::new(SqliteEnrichmentCache::in_memory().unwrap());
    let calls = Arc::new(AtomicUsize::new(0));
    let now = Utc::now();

    let router = router_with(
        store,
        FixedScraper {
            payload: Enrichment {
                description: Some("A code search engine with AI answers".to_string()),
                ..Enrichment::default()
            },
            calls,
        },
        Some(Arc::new(FixedAnalyzer)),
    );

    let (tools, summary) = router.enrich(vec![tool("Sourcegraph")], now).await;

    assert_eq!(summary.paid_needed, 1);
    assert_eq!(summary.paid_used, 1);
    assert!((summary.cost_spent - COST).abs() < f64::EPSILON);
    assert_eq!(
        tools[0].pricing.as_deref(),
        Some("Usage-based, $0.01 per call")
    );
    // Free-scraped description survives; the analyzer only filled gaps.
    assert_eq!(
        tools[0].description.as_deref(),
        Some("A code search engine with AI answers")
    );
}

#[tokio::test]
async fn degraded_run_is_visible_in_the_summary() {
    let store: Arc<dyn EnrichmentStore> = Arc::new(SqliteEnrichmentCache::in_memory().unwrap());
    let calls = Arc::new(AtomicUsize::new(0));

    let router = router_with(
        store,
        FixedScraper {
            payload: Enrichment::default(),
            calls,
        },
        None, // no credential
    );

    let (tools, summary) = router.enrich(vec![tool("Mystery")], Utc::now()).await;

    // "0 paid calls succeeded" is visible, not hidden.
    assert_eq!(summary.paid_needed, 1);
    assert_eq!(summary.paid_used, 0);
    assert!(summary.cost_spent.abs() < f64::EPSILON);
    assert_eq!(tools.len(), 1);
}
