//! Scoring engine
//!
//! Combines the five dimension scores under configured weights, applies the
//! confidence and source-credibility multipliers, adds the maturity
//! adjustment, and orders the catalog by final score. Curated entries get
//! their buzz/vision/ability floored before the weighted combination.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::record::{Quadrant, ScoringMeta, ToolRecord};
use crate::scoring::dimensions::{
    FallbackBaselines, SignalCaps, ability_score, adoption_score, buzz_score,
    credibility_score, vision_score,
};

/// Weight of each dimension in the base score. Must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionWeights {
    pub buzz: f64,
    pub vision: f64,
    pub ability: f64,
    pub credibility: f64,
    pub adoption: f64,
}

impl Default for DimensionWeights {
    fn default() -> Self {
        Self {
            buzz: 0.25,
            vision: 0.20,
            ability: 0.20,
            credibility: 0.20,
            adoption: 0.15,
        }
    }
}

impl DimensionWeights {
    fn is_valid_weight(weight: f64) -> bool {
        (0.0..=1.0).contains(&weight)
    }

    /// Validate that each weight is in range and that they sum to 1.0 (with
    /// a small tolerance for floating point).
    pub fn validate(&self) -> Result<(), String> {
        for (name, weight) in [
            ("buzz", self.buzz),
            ("vision", self.vision),
            ("ability", self.ability),
            ("credibility", self.credibility),
            ("adoption", self.adoption),
        ] {
            if !Self::is_valid_weight(weight) {
                return Err(format!("{} weight must be between 0.0 and 1.0", name));
            }
        }

        let sum = self.buzz + self.vision + self.ability + self.credibility + self.adoption;
        if (sum - 1.0).abs() > 0.001 {
            return Err(format!(
                "dimension weights must sum to 1.0, but sum to {:.3}",
                sum
            ));
        }

        Ok(())
    }
}

/// Confidence multiplier tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceTiers {
    pub high_cutoff: u8,
    pub medium_cutoff: u8,
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for ConfidenceTiers {
    fn default() -> Self {
        Self {
            high_cutoff: 90,
            medium_cutoff: 70,
            high: 1.0,
            medium: 0.9,
            low: 0.7,
        }
    }
}

/// Additive maturity adjustments, applied after the multipliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaturityAdjustments {
    pub production: f64,
    pub beta: f64,
    pub alpha: f64,
    pub experimental: f64,
}

impl Default for MaturityAdjustments {
    fn default() -> Self {
        Self {
            production: 10.0,
            beta: -5.0,
            alpha: -10.0,
            experimental: -15.0,
        }
    }
}

/// Source-credibility multipliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceMultipliers {
    pub curated: f64,
    pub official_blog: f64,
    pub news: f64,
    pub community_validated: f64,
    pub reddit: f64,
    pub hacker_news: f64,
    pub default: f64,
}

impl Default for SourceMultipliers {
    fn default() -> Self {
        Self {
            curated: 1.2,
            official_blog: 1.15,
            news: 1.1,
            community_validated: 1.05,
            reddit: 0.8,
            hacker_news: 0.85,
            default: 1.0,
        }
    }
}

fn default_curated_floor() -> f64 {
    50.0
}

fn default_confidence_level() -> u8 {
    50
}

/// Full scoring configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: DimensionWeights,
    pub caps: SignalCaps,
    pub baselines: FallbackBaselines,
    pub confidence: ConfidenceTiers,
    pub maturity: MaturityAdjustments,
    pub sources: SourceMultipliers,
    /// Safety-net floor for curated entries' buzz/vision/ability.
    pub curated_floor: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: DimensionWeights::default(),
            caps: SignalCaps::default(),
            baselines: FallbackBaselines::default(),
            confidence: ConfidenceTiers::default(),
            maturity: MaturityAdjustments::default(),
            sources: SourceMultipliers::default(),
            curated_floor: default_curated_floor(),
        }
    }
}

pub struct ScoringEngine {
    config: ScoringConfig,
    beta_re: Regex,
    alpha_re: Regex,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            // Word boundaries: "beta" must not match "Betaworks" text blobs.
            beta_re: Regex::new(r"(?i)\bbeta\b").unwrap(),
            alpha_re: Regex::new(r"(?i)\balpha\b").unwrap(),
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    fn confidence_multiplier(&self, level: u8) -> f64 {
        let tiers = &self.config.confidence;
        if level >= tiers.high_cutoff {
            tiers.high
        } else if level >= tiers.medium_cutoff {
            tiers.medium
        } else {
            tiers.low
        }
    }

    fn source_multiplier(&self, source: Option<&str>) -> f64 {
        let sources = &self.config.sources;
        let Some(source) = source.map(str::to_lowercase) else {
            return sources.default;
        };

        if source.contains("curated") {
            sources.curated
        } else if source.contains("official") || source.contains("blog") {
            sources.official_blog
        } else if source.contains("techcrunch")
            || source.contains("venturebeat")
            || source.contains("news")
        {
            sources.news
        } else if source.contains("product_hunt") {
            sources.community_validated
        } else if source.contains("reddit") {
            sources.reddit
        } else if source.contains("hn") || source.contains("hacker") {
            sources.hacker_news
        } else {
            sources.default
        }
    }

    /// Additive maturity adjustment from declared status or textual signals,
    /// with the explanation strings for the audit trail.
    fn maturity_adjustment(&self, tool: &ToolRecord) -> (f64, Vec<String>, Vec<String>) {
        let maturity = &self.config.maturity;
        let mut adjustment = 0.0;
        let mut penalties = Vec::new();
        let mut bonuses = Vec::new();

        let text = format!(
            "{} {}",
            tool.name,
            tool.description.as_deref().unwrap_or_default()
        )
        .to_lowercase();
        let status = tool.status.as_deref().unwrap_or_default();

        if text.contains("production") || status == "production" {
            adjustment += maturity.production;
            bonuses.push(format!("production-ready ({:+} pts)", maturity.production));
        }
        if self.beta_re.is_match(&text) || status == "beta" {
            adjustment += maturity.beta;
            penalties.push(format!("beta stage ({:+} pts)", maturity.beta));
        }
        if self.alpha_re.is_match(&text) || status == "alpha" {
            adjustment += maturity.alpha;
            penalties.push(format!("alpha stage ({:+} pts)", maturity.alpha));
        }
        if text.contains("experimental") || text.contains("prototype") {
            adjustment += maturity.experimental;
            penalties.push(format!("experimental ({:+} pts)", maturity.experimental));
        }

        (adjustment, penalties, bonuses)
    }

    /// Compute and attach every scoring field for one record.
    pub fn score_record(&self, tool: &mut ToolRecord, now: DateTime<Utc>) {
        let config = &self.config;

        let mut buzz = buzz_score(tool, &config.caps, &config.baselines);
        let mut vision = vision_score(tool, &config.caps, &config.baselines);
        let mut ability = ability_score(tool, &config.caps, &config.baselines);
        let credibility = credibility_score(tool, &config.caps, &config.baselines, now);
        let adoption = adoption_score(tool, &config.caps, &config.baselines);

        let mut bonuses = Vec::new();
        let mut penalties = Vec::new();

        // Safety net: curated entries must never sink below the floor on the
        // dimensions that downstream quality thresholds read.
        if tool.is_curated() {
            let floor = config.curated_floor;
            if buzz < floor || vision < floor || ability < floor {
                bonuses.push(format!("curated safety net (floor {})", floor));
            }
            buzz = buzz.max(floor);
            vision = vision.max(floor);
            ability = ability.max(floor);
        }

        let weights = &config.weights;
        let base_score = buzz * weights.buzz
            + vision * weights.vision
            + ability * weights.ability
            + credibility * weights.credibility
            + adoption * weights.adoption;

        let confidence_level = tool
            .confidence_level
            .unwrap_or_else(default_confidence_level);
        let confidence_multiplier = self.confidence_multiplier(confidence_level);
        if confidence_level >= config.confidence.high_cutoff {
            bonuses.push(format!("high confidence ({})", confidence_level));
        } else if confidence_level < config.confidence.medium_cutoff {
            penalties.push(format!(
                "low confidence ({}) ({}x multiplier)",
                confidence_level, confidence_multiplier
            ));
        }

        let source_multiplier = self.source_multiplier(tool.source.as_deref());
        if source_multiplier > 1.0 {
            bonuses.push(format!("trusted source ({}x multiplier)", source_multiplier));
        } else if source_multiplier < 1.0 {
            penalties.push(format!("noisy source ({}x multiplier)", source_multiplier));
        }

        let (maturity_adjustment, maturity_penalties, maturity_bonuses) =
            self.maturity_adjustment(tool);
        penalties.extend(maturity_penalties);
        bonuses.extend(maturity_bonuses);

        let final_score = (base_score * confidence_multiplier * source_multiplier
            + maturity_adjustment)
            .clamp(0.0, 100.0);

        debug!(
            "{}: final {:.1} (base {:.1}, conf {}, source {})",
            tool.name, final_score, base_score, confidence_multiplier, source_multiplier
        );

        tool.buzz_score = Some(round2(buzz));
        tool.vision = Some(round2(vision));
        tool.ability = Some(round2(ability));
        tool.credibility = Some(round2(credibility));
        tool.adoption = Some(round2(adoption));
        tool.base_score = Some(round2(base_score));
        tool.final_score = Some(round2(final_score));
        tool.quadrant = Some(Quadrant::from_scores(vision, ability));
        tool.confidence_level = Some(confidence_level);
        tool.scoring = Some(ScoringMeta {
            confidence_multiplier,
            source_multiplier,
            maturity_adjustment,
            penalties,
            bonuses,
        });
    }

    /// Score every record and sort the catalog by final score, descending.
    /// The catalog-size cap is the caller's job; this ordering is what the
    /// cap relies on.
    pub fn score_catalog(&self, tools: &mut Vec<ToolRecord>, now: DateTime<Utc>) {
        info!("scoring {} tools", tools.len());

        for tool in tools.iter_mut() {
            self.score_record(tool, now);
        }

        tools.sort_by(|a, b| {
            b.final_score
                .unwrap_or(0.0)
                .total_cmp(&a.final_score.unwrap_or(0.0))
        });
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn engine() -> ScoringEngine {
        ScoringEngine::new(ScoringConfig::default())
    }

    #[test]
    fn default_weights_validate() {
        assert!(DimensionWeights::default().validate().is_ok());
    }

    #[test]
    fn unbalanced_weights_fail_validation() {
        let weights = DimensionWeights {
            buzz: 0.5,
            ..DimensionWeights::default()
        };
        assert!(weights.validate().is_err());

        let out_of_range = DimensionWeights {
            buzz: 1.5,
            vision: -0.5,
            ..DimensionWeights::default()
        };
        assert!(out_of_range.validate().is_err());
    }

    #[rstest]
    #[case(95, 1.0)]
    #[case(90, 1.0)]
    #[case(89, 0.9)]
    #[case(70, 0.9)]
    #[case(69, 0.7)]
    #[case(0, 0.7)]
    fn confidence_tiers_map_to_multipliers(#[case] level: u8, #[case] expected: f64) {
        assert!((engine().confidence_multiplier(level) - expected).abs() < f64::EPSILON);
    }

    #[rstest]
    #[case(Some("curated_list"), 1.2)]
    #[case(Some("official_blog"), 1.15)]
    #[case(Some("techcrunch"), 1.1)]
    #[case(Some("product_hunt"), 1.05)]
    #[case(Some("reddit_ai"), 0.8)]
    #[case(Some("hn_showhn"), 0.85)]
    #[case(Some("github_trending"), 1.0)]
    #[case(None, 1.0)]
    fn source_multipliers_match_provenance(
        #[case] source: Option<&str>,
        #[case] expected: f64,
    ) {
        assert!((engine().source_multiplier(source) - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn curated_tool_without_telemetry_gets_floored_dimensions() {
        let mut tool = ToolRecord::new("Claude");
        tool.tracking_versions = true;

        engine().score_record(&mut tool, Utc::now());

        let floor = ScoringConfig::default().curated_floor;
        assert!(tool.buzz_score.unwrap() >= floor);
        assert!(tool.vision.unwrap() >= floor);
        assert!(tool.ability.unwrap() >= floor);
        // Buzz has no evidence; its baseline does not exceed the floor.
        assert!((tool.buzz_score.unwrap() - floor).abs() < f64::EPSILON);
    }

    #[test]
    fn uncurated_tool_gets_no_floor() {
        let mut tool = ToolRecord::new("RandomTool");
        engine().score_record(&mut tool, Utc::now());

        // Ability baseline (40) is below the curated floor and stays there.
        assert!(tool.ability.unwrap() < ScoringConfig::default().curated_floor);
    }

    #[test]
    fn maturity_adjustment_is_additive_after_multipliers() {
        let config = ScoringConfig::default();
        let engine = ScoringEngine::new(config.clone());

        let mut plain = ToolRecord::new("Tool");
        plain.confidence_level = Some(95);
        engine.score_record(&mut plain, Utc::now());

        let mut beta = ToolRecord::new("Tool");
        beta.confidence_level = Some(95);
        beta.status = Some("beta".to_string());
        engine.score_record(&mut beta, Utc::now());

        // Identical base and multipliers; only the beta penalty differs.
        // (ability differs slightly because status is ability evidence, so
        // compare the scoring metadata instead.)
        assert_eq!(
            beta.scoring.as_ref().unwrap().maturity_adjustment,
            config.maturity.beta
        );
        assert_eq!(plain.scoring.as_ref().unwrap().maturity_adjustment, 0.0);
    }

    #[test]
    fn beta_word_boundary_does_not_match_substrings() {
        let engine = engine();
        let mut tool = ToolRecord::new("Betaworks Studio");
        tool.description = Some("An established venture studio".to_string());

        let (adjustment, penalties, _) = engine.maturity_adjustment(&tool);
        assert_eq!(adjustment, 0.0);
        assert!(penalties.is_empty());
    }

    #[test]
    fn final_score_formula_matches_hand_computation() {
        let config = ScoringConfig::default();
        let engine = ScoringEngine::new(config);

        let mut tool = ToolRecord::new("Windsurf");
        tool.source = Some("curated".to_string());
        tool.tracking_versions = true;
        tool.confidence_level = Some(80);
        engine.score_record(&mut tool, Utc::now());

        let base = tool.base_score.unwrap();
        let expected = (base * 0.9 * 1.2).clamp(0.0, 100.0);
        assert!((tool.final_score.unwrap() - round2(expected)).abs() < 0.01);
    }

    #[test]
    fn score_catalog_orders_descending() {
        let engine = engine();

        let mut strong = ToolRecord::new("Strong");
        strong.tracking_versions = true;
        strong.source = Some("curated".to_string());
        strong.confidence_level = Some(95);
        strong.signals.github_stars = 100_000;
        strong.signals.trending = true;

        let mut weak = ToolRecord::new("Weak");
        weak.source = Some("reddit".to_string());
        weak.confidence_level = Some(30);

        let mut catalog = vec![weak, strong];
        engine.score_catalog(&mut catalog, Utc::now());

        assert_eq!(catalog[0].name, "Strong");
        assert!(catalog[0].final_score.unwrap() > catalog[1].final_score.unwrap());
    }

    #[test]
    fn scoring_attaches_quadrant_and_metadata() {
        let mut tool = ToolRecord::new("Claude");
        tool.tracking_versions = true;
        tool.source = Some("curated".to_string());

        engine().score_record(&mut tool, Utc::now());

        assert!(tool.quadrant.is_some());
        let meta = tool.scoring.unwrap();
        assert!((meta.source_multiplier - 1.2).abs() < f64::EPSILON);
        assert!(meta.bonuses.iter().any(|b| b.contains("trusted source")));
    }
}
