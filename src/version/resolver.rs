//! Version resolution strategy chain
//!
//! Strategies are tried in strict priority order and the first one that
//! yields a parseable version token wins. Total failure is not an error: it
//! is the `NeedsAnalysis` terminal state, which makes the tool eligible for
//! the paid analysis fallback downstream.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::record::ToolRecord;
use crate::version::error::StrategyError;
use crate::version::semver::{DeltaKind, classify_delta};

/// Identifies which strategy produced a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Releases,
    Changelog,
    BlogFeed,
    Homepage,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Releases => "releases",
            StrategyKind::Changelog => "changelog",
            StrategyKind::BlogFeed => "blog_feed",
            StrategyKind::Homepage => "homepage",
        }
    }
}

/// Provenance carried alongside a resolved version for audit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VersionMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes_excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Where within the source the token was found (e.g. "tags", "heading",
    /// "feed_entry", "meta").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found_in: Option<String>,
}

/// Result of a successful resolution attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionQueryResult {
    pub version: String,
    pub strategy: StrategyKind,
    pub metadata: VersionMetadata,
}

/// Terminal state of a resolution pass over the whole chain.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    Resolved(VersionQueryResult),
    /// No free source yielded a version; escalate to paid analysis.
    NeedsAnalysis,
}

/// One free source of version information.
///
/// `Ok(None)` means the source was reachable but held no version token;
/// `Err(_)` means the source itself failed. The resolver treats both as
/// "try the next strategy" but only the latter is a degraded source.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait VersionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn probe(
        &self,
        tool: &ToolRecord,
    ) -> Result<Option<VersionQueryResult>, StrategyError>;
}

/// Walks the strategy chain in priority order.
pub struct VersionResolver {
    strategies: Vec<Arc<dyn VersionStrategy>>,
}

impl VersionResolver {
    pub fn new(strategies: Vec<Arc<dyn VersionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Resolve the latest known version for a tool, or report that every
    /// free source came up empty.
    pub async fn resolve(&self, tool: &ToolRecord) -> ResolveOutcome {
        for strategy in &self.strategies {
            match strategy.probe(tool).await {
                Ok(Some(result)) => {
                    info!(
                        "resolved {} -> {} via {}",
                        tool.name,
                        result.version,
                        result.strategy.as_str()
                    );
                    return ResolveOutcome::Resolved(result);
                }
                Ok(None) => {
                    debug!(
                        "{}: no version via {}",
                        tool.name,
                        strategy.kind().as_str()
                    );
                }
                Err(err) => {
                    debug!(
                        "{}: {} strategy failed: {}",
                        tool.name,
                        strategy.kind().as_str(),
                        err
                    );
                }
            }
        }

        debug!("{}: no free source yielded a version", tool.name);
        ResolveOutcome::NeedsAnalysis
    }
}

/// One tool whose upstream version moved since the last pass.
#[derive(Debug, Clone, Serialize)]
pub struct VersionUpdate {
    pub name: String,
    pub old_version: String,
    pub new_version: String,
    pub delta: &'static str,
    pub is_major: bool,
    pub strategy: StrategyKind,
    pub metadata: VersionMetadata,
}

/// Outcome of a whole-catalog version tracking pass.
#[derive(Debug, Default, Serialize)]
pub struct TrackingSummary {
    pub total: usize,
    pub updated: Vec<VersionUpdate>,
    pub no_change: Vec<String>,
    pub needs_analysis: Vec<String>,
    /// Strategy name -> number of tools it resolved.
    pub found_via: IndexMap<&'static str, usize>,
    pub major_updates: usize,
    pub minor_updates: usize,
    pub patch_updates: usize,
}

/// Resolve versions for every tracked tool, updating `last_known_version`
/// and `version_source` in place and summarizing what moved.
pub async fn track_catalog(
    resolver: &VersionResolver,
    tools: &mut [ToolRecord],
) -> TrackingSummary {
    let mut summary = TrackingSummary::default();

    for tool in tools.iter_mut().filter(|t| t.tracking_versions) {
        summary.total += 1;
        let old_version = tool
            .last_known_version
            .clone()
            .unwrap_or_else(|| "0.0.0".to_string());

        match resolver.resolve(tool).await {
            ResolveOutcome::Resolved(result) => {
                *summary.found_via.entry(result.strategy.as_str()).or_insert(0) += 1;

                if result.version == old_version {
                    summary.no_change.push(tool.name.clone());
                    continue;
                }

                let delta = classify_delta(&old_version, &result.version);
                match delta.kind {
                    DeltaKind::Major => summary.major_updates += 1,
                    DeltaKind::Minor => summary.minor_updates += 1,
                    DeltaKind::Patch => summary.patch_updates += 1,
                    DeltaKind::NoChange | DeltaKind::Unknown => {}
                }

                tool.last_known_version = Some(result.version.clone());
                tool.version_source = Some(result.strategy.as_str().to_string());

                summary.updated.push(VersionUpdate {
                    name: tool.name.clone(),
                    old_version,
                    new_version: result.version,
                    delta: delta.kind.as_str(),
                    is_major: delta.is_major,
                    strategy: result.strategy,
                    metadata: result.metadata,
                });
            }
            ResolveOutcome::NeedsAnalysis => {
                summary.needs_analysis.push(tool.name.clone());
            }
        }
    }

    info!(
        "version tracking: {} tracked, {} updated ({} major / {} minor / {} patch), {} unresolved",
        summary.total,
        summary.updated.len(),
        summary.major_updates,
        summary.minor_updates,
        summary.patch_updates,
        summary.needs_analysis.len()
    );

    summary
}
