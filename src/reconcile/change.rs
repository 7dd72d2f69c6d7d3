//! Major-update detection
//!
//! A tool's update is "major" when any one of the configured signals trips:
//! a large vision or ability swing, a quadrant or category change, or a
//! comeback from beta/discontinued/inactive to active. Every matched reason
//! is reported with old and new values, not just the first.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::catalog::record::ToolRecord;

fn default_score_change() -> f64 {
    15.0
}

fn default_true() -> bool {
    true
}

/// Thresholds that define a major update. Serde-configurable; the defaults
/// are the shipped tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeThresholds {
    /// Absolute vision change that counts as major.
    pub vision_change: f64,
    /// Absolute ability change that counts as major.
    pub ability_change: f64,
    /// Whether any quadrant change counts as major.
    pub quadrant_change: bool,
    /// Whether any category change counts as major.
    pub category_change: bool,
    /// Whether beta/discontinued/inactive -> active counts as major.
    pub status_to_active: bool,
}

impl Default for ChangeThresholds {
    fn default() -> Self {
        Self {
            vision_change: default_score_change(),
            ability_change: default_score_change(),
            quadrant_change: default_true(),
            category_change: default_true(),
            status_to_active: default_true(),
        }
    }
}

/// Old/new values for one changed metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricChange {
    pub old: Value,
    pub new: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<f64>,
}

/// Full change classification for one tool.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChangeReport {
    pub is_major: bool,
    pub reasons: Vec<String>,
    pub metric_changes: IndexMap<String, MetricChange>,
}

impl ChangeReport {
    fn record(&mut self, metric: &str, reason: String, change: MetricChange) {
        self.is_major = true;
        self.reasons.push(reason);
        self.metric_changes.insert(metric.to_string(), change);
    }
}

/// Statuses from which a move to "active" counts as a comeback.
const DORMANT_STATUSES: [&str; 3] = ["beta", "discontinued", "inactive"];

/// Classify the change between an existing record and its fresh counterpart.
///
/// Absence of either record yields a non-major, empty report. Signals that
/// the fresh record simply does not carry (no score, no category) never
/// trigger: an enrichment gap is not a change, and treating it as one would
/// re-fire the same "major" on every pass.
pub fn detect_major_update(
    old: Option<&ToolRecord>,
    new: Option<&ToolRecord>,
    thresholds: &ChangeThresholds,
) -> ChangeReport {
    let mut report = ChangeReport::default();

    let (Some(old), Some(new)) = (old, new) else {
        return report;
    };

    // Vision swing. Both sides must carry a score: an unscored record is
    // initial population, not a change.
    if let (Some(old_vision), Some(new_vision)) = (old.vision, new.vision) {
        let diff = (new_vision - old_vision).abs();
        if diff >= thresholds.vision_change {
            report.record(
                "vision",
                format!(
                    "vision changed significantly: {} -> {} (delta {})",
                    old_vision, new_vision, diff
                ),
                MetricChange {
                    old: json!(old_vision),
                    new: json!(new_vision),
                    diff: Some(diff),
                },
            );
        }
    }

    // Ability swing.
    if let (Some(old_ability), Some(new_ability)) = (old.ability, new.ability) {
        let diff = (new_ability - old_ability).abs();
        if diff >= thresholds.ability_change {
            report.record(
                "ability",
                format!(
                    "ability changed significantly: {} -> {} (delta {})",
                    old_ability, new_ability, diff
                ),
                MetricChange {
                    old: json!(old_ability),
                    new: json!(new_ability),
                    diff: Some(diff),
                },
            );
        }
    }

    // Quadrant move (computed classification, stored fallback).
    if thresholds.quadrant_change
        && let (Some(old_quadrant), Some(new_quadrant)) =
            (old.effective_quadrant(), new.effective_quadrant())
        && old_quadrant != new_quadrant
    {
        report.record(
            "quadrant",
            format!(
                "quadrant changed: {} -> {}",
                old_quadrant.as_str(),
                new_quadrant.as_str()
            ),
            MetricChange {
                old: json!(old_quadrant.as_str()),
                new: json!(new_quadrant.as_str()),
                diff: None,
            },
        );
    }

    // Category move.
    if thresholds.category_change
        && let (Some(old_category), Some(new_category)) =
            (old.category.as_deref(), new.category.as_deref())
        && old_category != new_category
    {
        report.record(
            "category",
            format!("category changed: {} -> {}", old_category, new_category),
            MetricChange {
                old: json!(old_category),
                new: json!(new_category),
                diff: None,
            },
        );
    }

    // Comeback: dormant -> active.
    if thresholds.status_to_active {
        let old_status = old
            .status
            .as_deref()
            .unwrap_or("unknown")
            .to_lowercase();
        let new_status = new
            .status
            .as_deref()
            .unwrap_or("unknown")
            .to_lowercase();
        if DORMANT_STATUSES.contains(&old_status.as_str()) && new_status == "active" {
            report.record(
                "status",
                format!("status changed to active: {} -> {}", old_status, new_status),
                MetricChange {
                    old: json!(old_status),
                    new: json!(new_status),
                    diff: None,
                },
            );
        }
    }

    report
}
