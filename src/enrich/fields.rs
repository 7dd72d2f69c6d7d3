//! Enrichment payload and gap assessment
//!
//! Two field sets drive the router's decisions: the free-scrapable set
//! (filled by scrapers at zero cost) and the stricter paid-required set
//! (fields that need real analysis). A field counts as missing when it is
//! absent, too short to be useful, an empty list, or a placeholder value.

use serde::{Deserialize, Serialize};

use crate::catalog::record::{ChangelogEntry, ToolRecord, dedup_preserving_order};

/// Minimum length for a string field to count as populated.
const MIN_USEFUL_LEN: usize = 5;

/// Placeholder values that count as missing.
const PLACEHOLDERS: [&str; 3] = ["Unknown", "N/A", "TBD"];

/// Fields the enrichment layer can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentField {
    Description,
    Pricing,
    KeyFeatures,
    Strengths,
    Limitations,
    UseCases,
    Changelog,
    Status,
    FoundingYear,
}

impl EnrichmentField {
    /// Fields that require paid analysis when still missing after the free
    /// tier: these need synthesis, not scraping.
    pub const PAID_REQUIRED: [EnrichmentField; 5] = [
        EnrichmentField::Pricing,
        EnrichmentField::KeyFeatures,
        EnrichmentField::Limitations,
        EnrichmentField::UseCases,
        EnrichmentField::Changelog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnrichmentField::Description => "description",
            EnrichmentField::Pricing => "pricing",
            EnrichmentField::KeyFeatures => "key_features",
            EnrichmentField::Strengths => "strengths",
            EnrichmentField::Limitations => "limitations",
            EnrichmentField::UseCases => "use_cases",
            EnrichmentField::Changelog => "changelog",
            EnrichmentField::Status => "status",
            EnrichmentField::FoundingYear => "founding_year",
        }
    }

    /// Whether this field is missing (or a placeholder) on the record.
    pub fn is_missing_on(&self, tool: &ToolRecord) -> bool {
        match self {
            EnrichmentField::Description => is_blank(tool.description.as_deref()),
            EnrichmentField::Pricing => is_blank(tool.pricing.as_deref()),
            EnrichmentField::KeyFeatures => tool.key_features.is_empty(),
            EnrichmentField::Strengths => tool.strengths.is_empty(),
            EnrichmentField::Limitations => tool.limitations.is_empty(),
            EnrichmentField::UseCases => tool.use_cases.is_empty(),
            EnrichmentField::Changelog => tool.changelog.is_empty(),
            EnrichmentField::Status => is_blank(tool.status.as_deref()),
            EnrichmentField::FoundingYear => tool.founding_year.is_none(),
        }
    }
}

fn is_blank(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(s) => {
            let trimmed = s.trim();
            trimmed.len() < MIN_USEFUL_LEN || PLACEHOLDERS.contains(&trimmed)
        }
    }
}

/// Paid-required fields still missing on the record.
pub fn missing_paid_fields(tool: &ToolRecord) -> Vec<EnrichmentField> {
    EnrichmentField::PAID_REQUIRED
        .into_iter()
        .filter(|field| field.is_missing_on(tool))
        .collect()
}

/// A partial set of enriched field values, produced by the cache, a scraper,
/// or the paid analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Enrichment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub key_features: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub strengths: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub limitations: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub use_cases: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changelog: Vec<ChangelogEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub founding_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_stars: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
}

impl Enrichment {
    pub fn is_empty(&self) -> bool {
        *self == Enrichment::default()
    }

    /// Merge another enrichment into this one; the other side wins where it
    /// carries a value.
    pub fn merge(&mut self, other: Enrichment) {
        if other.description.is_some() {
            self.description = other.description;
        }
        if other.pricing.is_some() {
            self.pricing = other.pricing;
        }
        if !other.key_features.is_empty() {
            self.key_features = other.key_features;
        }
        if !other.strengths.is_empty() {
            self.strengths = other.strengths;
        }
        if !other.limitations.is_empty() {
            self.limitations = other.limitations;
        }
        if !other.use_cases.is_empty() {
            self.use_cases = other.use_cases;
        }
        if !other.changelog.is_empty() {
            self.changelog = other.changelog;
        }
        if other.status.is_some() {
            self.status = other.status;
        }
        if other.founding_year.is_some() {
            self.founding_year = other.founding_year;
        }
        if other.github_stars.is_some() {
            self.github_stars = other.github_stars;
        }
        if other.repo_url.is_some() {
            self.repo_url = other.repo_url;
        }
    }

    /// Apply every carried value onto the record, overwriting what was there.
    /// Lists are deduplicated preserving order.
    pub fn apply_to(&self, tool: &mut ToolRecord) {
        if let Some(description) = &self.description {
            tool.description = Some(description.clone());
        }
        if let Some(pricing) = &self.pricing {
            tool.pricing = Some(pricing.clone());
        }
        if !self.key_features.is_empty() {
            tool.key_features = self.key_features.clone();
            dedup_preserving_order(&mut tool.key_features);
        }
        if !self.strengths.is_empty() {
            tool.strengths = self.strengths.clone();
            dedup_preserving_order(&mut tool.strengths);
        }
        if !self.limitations.is_empty() {
            tool.limitations = self.limitations.clone();
            dedup_preserving_order(&mut tool.limitations);
        }
        if !self.use_cases.is_empty() {
            tool.use_cases = self.use_cases.clone();
            dedup_preserving_order(&mut tool.use_cases);
        }
        if !self.changelog.is_empty() {
            tool.changelog = self.changelog.clone();
        }
        if let Some(status) = &self.status {
            tool.status = Some(status.to_lowercase());
        }
        if let Some(year) = self.founding_year {
            tool.founding_year = Some(year);
        }
        if let Some(stars) = self.github_stars {
            tool.signals.github_stars = stars;
        }
        if let Some(repo_url) = &self.repo_url {
            tool.repo_url = Some(repo_url.clone());
        }
    }

    /// Apply only the values for fields still missing on the record. Used for
    /// paid analysis results, which must never clobber curated data.
    pub fn apply_missing(&self, tool: &mut ToolRecord) -> Vec<EnrichmentField> {
        let mut filled = Vec::new();

        for field in [
            EnrichmentField::Description,
            EnrichmentField::Pricing,
            EnrichmentField::KeyFeatures,
            EnrichmentField::Strengths,
            EnrichmentField::Limitations,
            EnrichmentField::UseCases,
            EnrichmentField::Changelog,
            EnrichmentField::Status,
            EnrichmentField::FoundingYear,
        ] {
            if !field.is_missing_on(tool) {
                continue;
            }
            if self.restricted_to(field).is_empty() {
                continue;
            }
            self.restricted_to(field).apply_to(tool);
            filled.push(field);
        }

        filled
    }

    /// An enrichment carrying only the given field's value.
    fn restricted_to(&self, field: EnrichmentField) -> Enrichment {
        let mut restricted = Enrichment::default();
        match field {
            EnrichmentField::Description => restricted.description = self.description.clone(),
            EnrichmentField::Pricing => restricted.pricing = self.pricing.clone(),
            EnrichmentField::KeyFeatures => restricted.key_features = self.key_features.clone(),
            EnrichmentField::Strengths => restricted.strengths = self.strengths.clone(),
            EnrichmentField::Limitations => restricted.limitations = self.limitations.clone(),
            EnrichmentField::UseCases => restricted.use_cases = self.use_cases.clone(),
            EnrichmentField::Changelog => restricted.changelog = self.changelog.clone(),
            EnrichmentField::Status => restricted.status = self.status.clone(),
            EnrichmentField::FoundingYear => restricted.founding_year = self.founding_year,
        }
        restricted
    }

    /// Capture the enrichable fields of a record for cache write-back.
    pub fn from_record(tool: &ToolRecord) -> Self {
        Self {
            description: tool.description.clone(),
            pricing: tool.pricing.clone(),
            key_features: tool.key_features.clone(),
            strengths: tool.strengths.clone(),
            limitations: tool.limitations.clone(),
            use_cases: tool.use_cases.clone(),
            changelog: tool.changelog.clone(),
            status: tool.status.clone(),
            founding_year: tool.founding_year,
            github_stars: (tool.signals.github_stars > 0).then_some(tool.signals.github_stars),
            repo_url: tool.repo_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, true)]
    #[case(Some(""), true)]
    #[case(Some("abc"), true)] // too short to be useful
    #[case(Some("Unknown"), true)]
    #[case(Some("N/A"), true)]
    #[case(Some("TBD"), true)]
    #[case(Some("Free tier plus $20/mo pro plan"), false)]
    fn is_blank_detects_placeholders(#[case] value: Option<&str>, #[case] expected: bool) {
        assert_eq!(is_blank(value), expected);
    }

    #[test]
    fn missing_paid_fields_reports_gaps_in_declaration_order() {
        let mut tool = ToolRecord::new("Jasper");
        tool.pricing = Some("Unknown".to_string());
        tool.key_features = vec!["templates".to_string()];
        tool.use_cases = vec!["marketing copy".to_string()];

        let missing = missing_paid_fields(&tool);
        assert_eq!(
            missing,
            vec![
                EnrichmentField::Pricing,
                EnrichmentField::Limitations,
                EnrichmentField::Changelog,
            ]
        );
    }

    #[test]
    fn apply_to_overwrites_and_dedups() {
        let mut tool = ToolRecord::new("Jasper");
        tool.description = Some("old text".to_string());

        let enrichment = Enrichment {
            description: Some("AI writing assistant for marketing teams".to_string()),
            key_features: vec![
                "templates".to_string(),
                "brand voice".to_string(),
                "templates".to_string(),
            ],
            status: Some("Active".to_string()),
            ..Enrichment::default()
        };
        enrichment.apply_to(&mut tool);

        assert_eq!(
            tool.description.as_deref(),
            Some("AI writing assistant for marketing teams")
        );
        assert_eq!(tool.key_features, vec!["templates", "brand voice"]);
        assert_eq!(tool.status.as_deref(), Some("active"));
    }

    #[test]
    fn apply_missing_never_clobbers_populated_fields() {
        let mut tool = ToolRecord::new("Jasper");
        tool.pricing = Some("$39/month Creator plan".to_string());

        let enrichment = Enrichment {
            pricing: Some("$49/month".to_string()),
            limitations: vec!["no offline mode".to_string()],
            ..Enrichment::default()
        };
        let filled = enrichment.apply_missing(&mut tool);

        assert_eq!(tool.pricing.as_deref(), Some("$39/month Creator plan"));
        assert_eq!(tool.limitations, vec!["no offline mode"]);
        assert_eq!(filled, vec![EnrichmentField::Limitations]);
    }

    #[test]
    fn from_record_roundtrips_through_apply_to() {
        let mut original = ToolRecord::new("Gamma");
        original.description = Some("AI presentation builder".to_string());
        original.pricing = Some("Free tier available".to_string());
        original.key_features = vec!["slide generation".to_string()];
        original.signals.github_stars = 420;

        let payload = Enrichment::from_record(&original);
        let mut restored = ToolRecord::new("Gamma");
        payload.apply_to(&mut restored);

        assert_eq!(restored.description, original.description);
        assert_eq!(restored.pricing, original.pricing);
        assert_eq!(restored.key_features, original.key_features);
        assert_eq!(restored.signals.github_stars, 420);
    }
}
