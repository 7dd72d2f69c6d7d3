//! Tool record types
//!
//! `ToolRecord` is the unit of the catalog. Fields are explicit and optional
//! rather than an open map; provenance-specific extras that have no schema
//! slot land in the flattened `extra` map.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Market quadrant classification derived from vision/ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quadrant {
    #[serde(rename = "Leader")]
    Leader,
    #[serde(rename = "Visionary")]
    Visionary,
    #[serde(rename = "Challenger")]
    Challenger,
    #[serde(rename = "Niche Player")]
    NichePlayer,
}

/// Vision/ability cutoff separating the quadrants.
pub const QUADRANT_THRESHOLD: f64 = 75.0;

impl Quadrant {
    /// Classify a (vision, ability) pair.
    pub fn from_scores(vision: f64, ability: f64) -> Self {
        match (
            vision >= QUADRANT_THRESHOLD,
            ability >= QUADRANT_THRESHOLD,
        ) {
            (true, true) => Quadrant::Leader,
            (true, false) => Quadrant::Visionary,
            (false, true) => Quadrant::Challenger,
            (false, false) => Quadrant::NichePlayer,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quadrant::Leader => "Leader",
            Quadrant::Visionary => "Visionary",
            Quadrant::Challenger => "Challenger",
            Quadrant::NichePlayer => "Niche Player",
        }
    }
}

/// One entry in a tool's bounded changelog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl ChangelogEntry {
    /// Deduplication key: entries with the same title and description are
    /// considered the same announcement regardless of date.
    pub fn dedup_key(&self) -> String {
        format!("{}{}", self.title, self.description)
    }
}

/// Snapshot of a tool's state taken just before a major version bump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSnapshot {
    pub version: String,
    pub snapshot_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quadrant: Option<Quadrant>,
}

/// Popularity and maturity telemetry gathered by scrapers.
///
/// Everything defaults to zero/false; the scoring dimensions decide what
/// counts as "no evidence at all".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Signals {
    pub github_stars: u64,
    pub upvotes: u64,
    pub reddit_score: u64,
    pub hn_points: u64,
    pub trending: bool,
    pub days_since_last_commit: Option<u32>,
    pub num_integrations: u32,
    pub has_documentation: bool,
    pub has_demo: bool,
    pub has_sdk: bool,
    pub github_dependents: u64,
    pub npm_downloads: u64,
    pub pip_downloads: u64,
    pub app_store_reviews: u64,
    pub community_size: u64,
    pub discord_members: u64,
    pub customer_count: u64,
    pub media_mentions: u64,
    pub has_social_proof: bool,
}

/// Audit trail of multipliers and adjustments applied by the scoring engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringMeta {
    pub confidence_multiplier: f64,
    pub source_multiplier: f64,
    pub maturity_adjustment: f64,
    pub penalties: Vec<String>,
    pub bonuses: Vec<String>,
}

fn default_record_version() -> String {
    "1.0".to_string()
}

/// One tracked tool in the catalog.
///
/// `name` is the identity key: the final catalog never holds two records with
/// the same name (exact, case-sensitive match).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub official_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blog_url: Option<String>,

    /// Provenance tag of the source that discovered this tool
    /// (e.g. "curated", "official_blog", "github_trending", "reddit").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Trust score [0,100] assigned from the originating source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<u8>,
    /// Normalized lowercase status: active, maintained, stale, beta, alpha,
    /// discontinued, inactive, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<String>,

    /// Catalog record version, starting at "1.0" and bumped on major updates.
    /// Monotonically non-decreasing per tool.
    #[serde(default = "default_record_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub version_history: Vec<VersionSnapshot>,
    /// Curated marker: hand-selected entries with guaranteed scoring floors
    /// and forced paid enrichment.
    #[serde(default)]
    pub tracking_versions: bool,
    /// Latest upstream product version discovered by the resolver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_known_version: Option<String>,
    /// Strategy that produced `last_known_version`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_source: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_features: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strengths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub limitations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub use_cases: Vec<String>,
    /// Most-recent-first, capped at the configured maximum.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changelog: Vec<ChangelogEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founding_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_stage: Option<String>,
    #[serde(default)]
    pub signals: Signals,

    // Scoring outputs. Always stripped and recomputed by the scoring engine;
    // never carried over from a previous pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buzz_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credibility: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adoption: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quadrant: Option<Quadrant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring: Option<ScoringMeta>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_enriched: Option<DateTime<Utc>>,

    /// Provenance-specific metadata with no schema slot.
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl ToolRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            description: None,
            url: None,
            official_url: None,
            repo_url: None,
            changelog_url: None,
            blog_url: None,
            source: None,
            confidence_level: None,
            status: None,
            pricing: None,
            version: default_record_version(),
            version_history: Vec::new(),
            tracking_versions: false,
            last_known_version: None,
            version_source: None,
            key_features: Vec::new(),
            strengths: Vec::new(),
            limitations: Vec::new(),
            use_cases: Vec::new(),
            changelog: Vec::new(),
            founding_year: None,
            funding_stage: None,
            signals: Signals::default(),
            buzz_score: None,
            vision: None,
            ability: None,
            credibility: None,
            adoption: None,
            base_score: None,
            final_score: None,
            quadrant: None,
            scoring: None,
            added_date: None,
            last_updated: None,
            last_enriched: None,
            extra: IndexMap::new(),
        }
    }

    /// Curated entries carry the `tracking_versions` marker or a curated
    /// provenance tag.
    pub fn is_curated(&self) -> bool {
        self.tracking_versions
            || self
                .source
                .as_deref()
                .is_some_and(|s| s.to_lowercase().contains("curated"))
    }

    /// Best homepage URL for this tool.
    pub fn homepage(&self) -> Option<&str> {
        self.url.as_deref().or(self.official_url.as_deref())
    }

    /// Remove every previously computed scoring field so scores from an older
    /// pass (or an older scoring algorithm) can never persist.
    pub fn clear_scores(&mut self) {
        self.buzz_score = None;
        self.vision = None;
        self.ability = None;
        self.credibility = None;
        self.adoption = None;
        self.base_score = None;
        self.final_score = None;
        self.quadrant = None;
        self.scoring = None;
    }

    /// Quadrant computed from the current vision/ability scores, falling back
    /// to the stored classification when either score is absent.
    pub fn effective_quadrant(&self) -> Option<Quadrant> {
        match (self.vision, self.ability) {
            (Some(v), Some(a)) => Some(Quadrant::from_scores(v, a)),
            _ => self.quadrant,
        }
    }

    /// Major component of the catalog record version, defaulting to 1 when
    /// the stored string is not parseable.
    pub fn major_component(&self) -> u64 {
        self.version
            .split('.')
            .next()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1)
    }
}

/// Deduplicate a list in place, preserving first-seen order.
pub fn dedup_preserving_order(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}
