//! Field-level catalog merging
//!
//! Merges freshly enriched records into the existing catalog. Major changes
//! bump the record's major version, snapshot the pre-update state, and
//! overwrite every evolving field; minor changes apply narrow, field-scoped
//! updates. Scores are stripped up front: they are recomputed downstream on
//! every pass, and a stale score from an older scoring algorithm must never
//! survive reconciliation.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::policy::apply_major_update;
use crate::catalog::record::{
    ChangelogEntry, ToolRecord, VersionSnapshot, dedup_preserving_order,
};
use crate::reconcile::change::{ChangeReport, ChangeThresholds, detect_major_update};

fn default_changelog_cap() -> usize {
    4
}

fn default_overlap_threshold() -> f64 {
    0.5
}

/// Reconciliation tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Maximum changelog entries kept per tool.
    pub changelog_cap: usize,
    /// Feature-set overlap below which strengths/limitations refresh.
    pub feature_overlap_threshold: f64,
    pub thresholds: ChangeThresholds,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            changelog_cap: default_changelog_cap(),
            feature_overlap_threshold: default_overlap_threshold(),
            thresholds: ChangeThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MajorUpdate {
    pub tool: String,
    pub changes: ChangeReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct MinorUpdate {
    pub tool: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangelogUpdate {
    pub tool: String,
    pub reasons: Vec<String>,
}

/// Audit log of one reconciliation pass.
#[derive(Debug, Default, Serialize)]
pub struct VersionLog {
    pub timestamp: Option<DateTime<Utc>>,
    pub major_updates: Vec<MajorUpdate>,
    pub minor_updates: Vec<MinorUpdate>,
    pub new_tools: Vec<String>,
    pub changelog_updates: Vec<ChangelogUpdate>,
}

/// Merge changelogs: fresh entries first, deduplicated by title+description,
/// capped at `cap`.
pub fn merge_changelog(
    old: &[ChangelogEntry],
    fresh: &[ChangelogEntry],
    cap: usize,
) -> Vec<ChangelogEntry> {
    let mut seen = HashSet::new();
    let mut combined = Vec::new();

    for entry in fresh.iter().chain(old.iter()) {
        if seen.insert(entry.dedup_key()) {
            combined.push(entry.clone());
        }
    }

    combined.truncate(cap);
    combined
}

/// Jaccard overlap between two feature sets; None when either is empty.
fn feature_overlap(old: &[String], fresh: &[String]) -> Option<f64> {
    if old.is_empty() || fresh.is_empty() {
        return None;
    }

    let old_set: HashSet<&str> = old.iter().map(String::as_str).collect();
    let fresh_set: HashSet<&str> = fresh.iter().map(String::as_str).collect();

    let intersection = old_set.intersection(&fresh_set).count();
    let union = old_set.union(&fresh_set).count();
    Some(intersection as f64 / union as f64)
}

/// Whether the old and fresh feature sets differ at all.
fn feature_sets_differ(old: &[String], fresh: &[String]) -> bool {
    let old_set: HashSet<&str> = old.iter().map(String::as_str).collect();
    let fresh_set: HashSet<&str> = fresh.iter().map(String::as_str).collect();
    old_set != fresh_set
}

/// Bump the major version component and snapshot the pre-update state.
fn apply_version_bump(merged: &mut ToolRecord, old: &ToolRecord, now: DateTime<Utc>) {
    let snapshot = VersionSnapshot {
        version: old.version.clone(),
        snapshot_date: old.last_updated.unwrap_or(now),
        vision: old.vision,
        ability: old.ability,
        quadrant: old.effective_quadrant(),
    };

    merged.version = format!("{}.0", old.major_component() + 1);
    merged.version_history.push(snapshot);

    info!("MAJOR UPDATE: {} -> v{}", merged.name, merged.version);
}

/// Decide whether strengths/limitations should refresh on a minor update:
/// only when previously unpopulated, or when the feature sets have drifted
/// below the overlap threshold.
fn strengths_update_reasons(
    old: &ToolRecord,
    fresh: &ToolRecord,
    overlap_threshold: f64,
) -> Vec<String> {
    if old.strengths.is_empty() || old.limitations.is_empty() {
        return vec!["fields previously empty".to_string()];
    }

    if let Some(overlap) = feature_overlap(&old.key_features, &fresh.key_features)
        && overlap < overlap_threshold
    {
        return vec![format!(
            "features changed significantly ({:.0}% overlap)",
            overlap * 100.0
        )];
    }

    Vec::new()
}

/// Merge the existing catalog with freshly enriched records.
///
/// Identity matching is exact `name` equality; fuzzy matching belongs to the
/// discovery layer upstream. Existing tools with no fresh counterpart pass
/// through untouched apart from the score strip.
pub fn merge_catalog(
    existing: Vec<ToolRecord>,
    fresh: Vec<ToolRecord>,
    config: &ReconcileConfig,
    now: DateTime<Utc>,
) -> (Vec<ToolRecord>, VersionLog) {
    let mut log = VersionLog {
        timestamp: Some(now),
        ..VersionLog::default()
    };

    let existing_names: HashSet<String> =
        existing.iter().map(|tool| tool.name.clone()).collect();
    let fresh_by_name: HashMap<&str, &ToolRecord> =
        fresh.iter().map(|tool| (tool.name.as_str(), tool)).collect();

    let mut merged_catalog = Vec::with_capacity(existing.len());

    for old in &existing {
        let mut merged = old.clone();
        // Scores are always recomputed fresh downstream.
        merged.clear_scores();

        let Some(&fresh_tool) = fresh_by_name.get(old.name.as_str()) else {
            merged_catalog.push(merged);
            continue;
        };

        let report = detect_major_update(Some(old), Some(fresh_tool), &config.thresholds);

        if report.is_major {
            apply_version_bump(&mut merged, old, now);
            apply_major_update(&mut merged, fresh_tool);
            log.major_updates.push(MajorUpdate {
                tool: old.name.clone(),
                changes: report,
            });
        } else {
            debug!("minor update: {}", old.name);
            log.minor_updates.push(MinorUpdate {
                tool: old.name.clone(),
            });

            if !fresh_tool.changelog.is_empty() {
                merged.changelog = merge_changelog(
                    &old.changelog,
                    &fresh_tool.changelog,
                    config.changelog_cap,
                );
            }

            // Feature list replaces only when the sets actually differ.
            if !fresh_tool.key_features.is_empty()
                && feature_sets_differ(&old.key_features, &fresh_tool.key_features)
            {
                merged.key_features = fresh_tool.key_features.clone();
                dedup_preserving_order(&mut merged.key_features);
            }

            let reasons = strengths_update_reasons(
                old,
                fresh_tool,
                config.feature_overlap_threshold,
            );
            if !reasons.is_empty() {
                if !fresh_tool.strengths.is_empty() {
                    merged.strengths = fresh_tool.strengths.clone();
                    dedup_preserving_order(&mut merged.strengths);
                }
                if !fresh_tool.limitations.is_empty() {
                    merged.limitations = fresh_tool.limitations.clone();
                    dedup_preserving_order(&mut merged.limitations);
                }
                log.changelog_updates.push(ChangelogUpdate {
                    tool: old.name.clone(),
                    reasons,
                });
            }

            // Pricing and status churn freely without being "major".
            if fresh_tool.pricing.is_some() {
                merged.pricing = fresh_tool.pricing.clone();
            }
            if fresh_tool.status.is_some() {
                merged.status = fresh_tool.status.clone();
            }
        }

        merged.last_updated = Some(now);
        merged_catalog.push(merged);
    }

    // Tools seen for the first time join the catalog at version 1.0.
    for fresh_tool in fresh {
        if existing_names.contains(&fresh_tool.name) {
            continue;
        }

        let mut new_tool = fresh_tool;
        new_tool.version = "1.0".to_string();
        new_tool.version_history.clear();
        new_tool.added_date = Some(now);
        new_tool.last_updated = Some(now);
        log.new_tools.push(new_tool.name.clone());
        merged_catalog.push(new_tool);
    }

    info!(
        "reconciliation: {} major, {} minor, {} new",
        log.major_updates.len(),
        log.minor_updates.len(),
        log.new_tools.len()
    );

    (merged_catalog, log)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str) -> ChangelogEntry {
        ChangelogEntry {
            title: title.to_string(),
            description: format!("{} details", title),
            date: None,
        }
    }

    fn existing_tool(name: &str) -> ToolRecord {
        let mut tool = ToolRecord::new(name);
        tool.vision = Some(60.0);
        tool.ability = Some(60.0);
        tool.category = Some("Coding".to_string());
        tool.added_date = Some(Utc::now() - chrono::Duration::days(90));
        tool.key_features = vec!["completion".to_string(), "chat".to_string()];
        tool.strengths = vec!["fast".to_string()];
        tool.limitations = vec!["cloud only".to_string()];
        tool
    }

    #[test]
    fn merge_changelog_dedups_and_caps() {
        let old = vec![entry("v1.1"), entry("v1.0")];
        let fresh = vec![entry("v2.0"), entry("v1.1"), entry("v1.2")];

        let merged = merge_changelog(&old, &fresh, 4);

        let titles: Vec<&str> = merged.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["v2.0", "v1.1", "v1.2", "v1.0"]);

        let capped = merge_changelog(&old, &fresh, 3);
        assert_eq!(capped.len(), 3);
    }

    #[test]
    fn major_update_bumps_version_and_snapshots_prior_state() {
        let old = existing_tool("Copilot");
        let mut fresh = existing_tool("Copilot");
        fresh.vision = Some(80.0);
        fresh.ability = Some(80.0);

        let (catalog, log) = merge_catalog(
            vec![old],
            vec![fresh],
            &ReconcileConfig::default(),
            Utc::now(),
        );

        assert_eq!(log.major_updates.len(), 1);
        let merged = &catalog[0];
        assert_eq!(merged.version, "2.0");
        assert_eq!(merged.version_history.len(), 1);

        let snapshot = &merged.version_history[0];
        assert_eq!(snapshot.version, "1.0");
        assert_eq!(snapshot.vision, Some(60.0));
        assert_eq!(snapshot.ability, Some(60.0));
        assert_eq!(
            snapshot.quadrant,
            Some(crate::catalog::record::Quadrant::NichePlayer)
        );
    }

    #[test]
    fn scores_never_survive_reconciliation() {
        let mut old = existing_tool("Copilot");
        old.buzz_score = Some(88.0);
        old.final_score = Some(91.5);
        old.credibility = Some(70.0);
        old.adoption = Some(65.0);

        let (catalog, _) = merge_catalog(
            vec![old],
            vec![],
            &ReconcileConfig::default(),
            Utc::now(),
        );

        let merged = &catalog[0];
        assert_eq!(merged.buzz_score, None);
        assert_eq!(merged.vision, None);
        assert_eq!(merged.ability, None);
        assert_eq!(merged.credibility, None);
        assert_eq!(merged.adoption, None);
        assert_eq!(merged.final_score, None);
    }

    #[test]
    fn unmatched_existing_tools_pass_through_unstamped() {
        let old = existing_tool("Loner");
        let added = old.added_date;

        let (catalog, log) = merge_catalog(
            vec![old],
            vec![],
            &ReconcileConfig::default(),
            Utc::now(),
        );

        assert!(log.minor_updates.is_empty());
        assert_eq!(catalog[0].added_date, added);
        assert_eq!(catalog[0].last_updated, None);
    }

    #[test]
    fn minor_update_merges_changelog_and_refreshes_pricing_status() {
        let mut old = existing_tool("Copilot");
        old.changelog = vec![entry("v1.1"), entry("v1.0")];

        let mut fresh = existing_tool("Copilot");
        fresh.changelog = vec![entry("v1.2")];
        fresh.pricing = Some("$10/month".to_string());
        fresh.status = Some("active".to_string());

        let (catalog, log) = merge_catalog(
            vec![old],
            vec![fresh],
            &ReconcileConfig::default(),
            Utc::now(),
        );

        assert_eq!(log.minor_updates.len(), 1);
        assert!(log.major_updates.is_empty());

        let merged = &catalog[0];
        assert_eq!(merged.version, "1.0");
        let titles: Vec<&str> = merged.changelog.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["v1.2", "v1.1", "v1.0"]);
        assert_eq!(merged.pricing.as_deref(), Some("$10/month"));
        assert_eq!(merged.status.as_deref(), Some("active"));
        assert!(merged.last_updated.is_some());
    }

    #[test]
    fn changelog_never_exceeds_cap_after_any_merge() {
        let mut old = existing_tool("Copilot");
        old.changelog = vec![entry("a"), entry("b"), entry("c"), entry("d")];

        let mut fresh = existing_tool("Copilot");
        fresh.changelog = vec![entry("e"), entry("f")];

        let config = ReconcileConfig::default();
        let (catalog, _) = merge_catalog(vec![old], vec![fresh], &config, Utc::now());

        assert_eq!(catalog[0].changelog.len(), config.changelog_cap);
        let titles: Vec<&str> = catalog[0].changelog.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["e", "f", "a", "b"]);
    }

    #[test]
    fn identical_features_leave_feature_list_untouched() {
        let old = existing_tool("Copilot");
        let fresh = existing_tool("Copilot");

        let (catalog, _) = merge_catalog(
            vec![old.clone()],
            vec![fresh],
            &ReconcileConfig::default(),
            Utc::now(),
        );

        assert_eq!(catalog[0].key_features, old.key_features);
    }

    #[test]
    fn strengths_refresh_when_feature_overlap_collapses() {
        let old = existing_tool("Copilot");

        let mut fresh = existing_tool("Copilot");
        fresh.key_features = vec!["agents".to_string(), "workspace".to_string()];
        fresh.strengths = vec!["autonomous".to_string()];
        fresh.limitations = vec!["expensive".to_string()];

        let (catalog, log) = merge_catalog(
            vec![old],
            vec![fresh],
            &ReconcileConfig::default(),
            Utc::now(),
        );

        assert_eq!(catalog[0].strengths, vec!["autonomous"]);
        assert_eq!(catalog[0].limitations, vec!["expensive"]);
        assert_eq!(log.changelog_updates.len(), 1);
        assert!(log.changelog_updates[0].reasons[0].contains("0% overlap"));
    }

    #[test]
    fn strengths_kept_when_features_mostly_overlap() {
        let old = existing_tool("Copilot");

        let mut fresh = existing_tool("Copilot");
        fresh.strengths = vec!["different".to_string()];
        fresh.limitations = vec!["different".to_string()];

        let (catalog, log) = merge_catalog(
            vec![old],
            vec![fresh],
            &ReconcileConfig::default(),
            Utc::now(),
        );

        assert_eq!(catalog[0].strengths, vec!["fast"]);
        assert_eq!(catalog[0].limitations, vec!["cloud only"]);
        assert!(log.changelog_updates.is_empty());
    }

    #[test]
    fn new_tools_join_at_version_one_with_fresh_added_date() {
        let now = Utc::now();
        let mut fresh = ToolRecord::new("Windsurf");
        fresh.version = "9.9".to_string(); // whatever discovery claimed
        fresh.version_history.push(VersionSnapshot {
            version: "9.8".to_string(),
            snapshot_date: now,
            vision: None,
            ability: None,
            quadrant: None,
        });

        let (catalog, log) =
            merge_catalog(vec![], vec![fresh], &ReconcileConfig::default(), now);

        assert_eq!(log.new_tools, vec!["Windsurf".to_string()]);
        assert_eq!(catalog[0].version, "1.0");
        assert!(catalog[0].version_history.is_empty());
        assert_eq!(catalog[0].added_date, Some(now));
    }

    #[test]
    fn reconciliation_is_idempotent_on_major_detection() {
        let old = existing_tool("Copilot");
        let mut fresh = existing_tool("Copilot");
        fresh.vision = Some(80.0);
        fresh.ability = Some(80.0);
        fresh.category = Some("Agents".to_string());

        let config = ReconcileConfig::default();
        let now = Utc::now();

        let (first_pass, first_log) =
            merge_catalog(vec![old], vec![fresh.clone()], &config, now);
        assert_eq!(first_log.major_updates.len(), 1);
        assert_eq!(first_pass[0].version, "2.0");

        // Second pass with identical fresh data: the merged record already
        // carries the new category, and its scores were stripped, so no new
        // major classification fires.
        let (second_pass, second_log) =
            merge_catalog(first_pass, vec![fresh], &config, now);
        assert!(second_log.major_updates.is_empty());
        assert_eq!(second_pass[0].version, "2.0");
    }
}
