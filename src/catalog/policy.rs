//! Declarative per-field merge policy
//!
//! Every mergeable `ToolRecord` field is listed in [`Field`], and
//! [`Field::policy`] classifies it. The reconciler drives its full-overwrite
//! path through this table, so a field added to the schema without a policy
//! entry fails to compile rather than silently falling through.

use crate::catalog::record::{Signals, ToolRecord, dedup_preserving_order};

/// How a field behaves when a major update overwrites a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Never overwritten: part of the record's identity.
    Identity,
    /// Overwritten whenever the fresh record carries a value.
    Evolving,
    /// Copied from the fresh record only while the existing value is empty.
    FillIfEmpty,
}

/// Every field of `ToolRecord` that participates in reconciliation.
///
/// Scoring outputs are not listed: they are stripped before any merge and
/// recomputed downstream, so no merge policy can apply to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    AddedDate,
    VersionHistory,
    Version,
    TrackingVersions,
    Category,
    Description,
    Url,
    OfficialUrl,
    RepoUrl,
    ChangelogUrl,
    BlogUrl,
    Source,
    ConfidenceLevel,
    Status,
    Pricing,
    KeyFeatures,
    Strengths,
    Limitations,
    UseCases,
    Changelog,
    LastKnownVersion,
    VersionSource,
    FoundingYear,
    FundingStage,
    Signals,
    LastEnriched,
}

impl Field {
    pub const ALL: [Field; 27] = [
        Field::Name,
        Field::AddedDate,
        Field::VersionHistory,
        Field::Version,
        Field::TrackingVersions,
        Field::Category,
        Field::Description,
        Field::Url,
        Field::OfficialUrl,
        Field::RepoUrl,
        Field::ChangelogUrl,
        Field::BlogUrl,
        Field::Source,
        Field::ConfidenceLevel,
        Field::Status,
        Field::Pricing,
        Field::KeyFeatures,
        Field::Strengths,
        Field::Limitations,
        Field::UseCases,
        Field::Changelog,
        Field::LastKnownVersion,
        Field::VersionSource,
        Field::FoundingYear,
        Field::FundingStage,
        Field::Signals,
        Field::LastEnriched,
    ];

    /// Merge classification for this field.
    ///
    /// `Version` is `Identity` because the reconciler alone assigns catalog
    /// versions (monotonic bump on major updates); a candidate's default
    /// "1.0" must never clobber a bumped record.
    pub fn policy(self) -> MergePolicy {
        match self {
            Field::Name
            | Field::AddedDate
            | Field::VersionHistory
            | Field::Version
            | Field::TrackingVersions => MergePolicy::Identity,

            Field::Description | Field::FoundingYear | Field::FundingStage => {
                MergePolicy::FillIfEmpty
            }

            Field::Category
            | Field::Url
            | Field::OfficialUrl
            | Field::RepoUrl
            | Field::ChangelogUrl
            | Field::BlogUrl
            | Field::Source
            | Field::ConfidenceLevel
            | Field::Status
            | Field::Pricing
            | Field::KeyFeatures
            | Field::Strengths
            | Field::Limitations
            | Field::UseCases
            | Field::Changelog
            | Field::LastKnownVersion
            | Field::VersionSource
            | Field::Signals
            | Field::LastEnriched => MergePolicy::Evolving,
        }
    }

    /// Copy this field from `fresh` into `target` when `fresh` carries a
    /// value. Identity fields are no-ops.
    fn overwrite(self, target: &mut ToolRecord, fresh: &ToolRecord) {
        match self {
            Field::Name
            | Field::AddedDate
            | Field::VersionHistory
            | Field::Version
            | Field::TrackingVersions => {}

            Field::Category => overwrite_opt(&mut target.category, &fresh.category),
            Field::Description => overwrite_opt(&mut target.description, &fresh.description),
            Field::Url => overwrite_opt(&mut target.url, &fresh.url),
            Field::OfficialUrl => overwrite_opt(&mut target.official_url, &fresh.official_url),
            Field::RepoUrl => overwrite_opt(&mut target.repo_url, &fresh.repo_url),
            Field::ChangelogUrl => {
                overwrite_opt(&mut target.changelog_url, &fresh.changelog_url)
            }
            Field::BlogUrl => overwrite_opt(&mut target.blog_url, &fresh.blog_url),
            Field::Source => overwrite_opt(&mut target.source, &fresh.source),
            Field::ConfidenceLevel => {
                overwrite_opt(&mut target.confidence_level, &fresh.confidence_level)
            }
            Field::Status => overwrite_opt(&mut target.status, &fresh.status),
            Field::Pricing => overwrite_opt(&mut target.pricing, &fresh.pricing),
            Field::KeyFeatures => overwrite_list(&mut target.key_features, &fresh.key_features),
            Field::Strengths => overwrite_list(&mut target.strengths, &fresh.strengths),
            Field::Limitations => overwrite_list(&mut target.limitations, &fresh.limitations),
            Field::UseCases => overwrite_list(&mut target.use_cases, &fresh.use_cases),
            Field::Changelog => {
                if !fresh.changelog.is_empty() {
                    target.changelog = fresh.changelog.clone();
                }
            }
            Field::LastKnownVersion => {
                overwrite_opt(&mut target.last_known_version, &fresh.last_known_version)
            }
            Field::VersionSource => {
                overwrite_opt(&mut target.version_source, &fresh.version_source)
            }
            Field::FoundingYear => overwrite_opt(&mut target.founding_year, &fresh.founding_year),
            Field::FundingStage => overwrite_opt(&mut target.funding_stage, &fresh.funding_stage),
            Field::Signals => {
                if fresh.signals != Signals::default() {
                    target.signals = fresh.signals.clone();
                }
            }
            Field::LastEnriched => overwrite_opt(&mut target.last_enriched, &fresh.last_enriched),
        }
    }

    /// Copy this field from `fresh` only while `target`'s value is empty.
    fn fill_if_empty(self, target: &mut ToolRecord, fresh: &ToolRecord) {
        match self {
            Field::Description => {
                if target.description.as_deref().is_none_or(str::is_empty) {
                    overwrite_opt(&mut target.description, &fresh.description);
                }
            }
            Field::FoundingYear => {
                if target.founding_year.is_none() {
                    target.founding_year = fresh.founding_year;
                }
            }
            Field::FundingStage => {
                if target.funding_stage.as_deref().is_none_or(str::is_empty) {
                    overwrite_opt(&mut target.funding_stage, &fresh.funding_stage);
                }
            }
            _ => self.overwrite(target, fresh),
        }
    }
}

fn overwrite_opt<T: Clone>(target: &mut Option<T>, fresh: &Option<T>) {
    if fresh.is_some() {
        *target = fresh.clone();
    }
}

fn overwrite_list(target: &mut Vec<String>, fresh: &[String]) {
    if !fresh.is_empty() {
        *target = fresh.to_vec();
        dedup_preserving_order(target);
    }
}

/// Apply a full major-update overwrite of `fresh` onto `target`, honoring the
/// per-field policy: identity fields survive, evolving fields are replaced
/// when the fresh record carries them, fill-if-empty fields only fill gaps.
pub fn apply_major_update(target: &mut ToolRecord, fresh: &ToolRecord) {
    for field in Field::ALL {
        match field.policy() {
            MergePolicy::Identity => {}
            MergePolicy::Evolving => field.overwrite(target, fresh),
            MergePolicy::FillIfEmpty => field.fill_if_empty(target, fresh),
        }
    }
}
