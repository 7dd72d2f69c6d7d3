//! Dimension score calculators
//!
//! Every calculator sums monotone, capped per-signal contributions so no
//! single signal can dominate past its cap, and every calculator degrades
//! to a source-derived baseline when its evidence is entirely absent: a
//! credible tool without scrapeable telemetry must not collapse to zero.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::record::ToolRecord;

/// Per-signal contribution caps. Tunable configuration, not contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalCaps {
    /// Buzz: log-scaled repository stars.
    pub stars: f64,
    /// Buzz: community upvotes.
    pub upvotes: f64,
    /// Buzz: forum points (reddit + HN combined).
    pub forum_points: f64,
    /// Buzz: flat bonus for currently trending tools.
    pub trending_bonus: f64,
    /// Vision: description quality tiers.
    pub description: f64,
    /// Vision: feature list richness.
    pub features: f64,
    /// Vision: documentation presence.
    pub documentation: f64,
    /// Vision: demo/playground presence.
    pub demo: f64,
    /// Vision: use cases defined.
    pub use_cases: f64,
    /// Ability: recent development activity tiers.
    pub activity: f64,
    /// Ability: integration ecosystem.
    pub integrations: f64,
    /// Ability: stable API/SDK presence.
    pub sdk: f64,
    /// Ability: declared production status tiers.
    pub status: f64,
    /// Ability: a resolved upstream version exists.
    pub versioned: f64,
    /// Credibility: funding stage tiers.
    pub funding: f64,
    /// Credibility: company age tiers.
    pub company_age: f64,
    /// Credibility: social proof presence.
    pub social_proof: f64,
    /// Credibility: customer count tiers.
    pub customers: f64,
    /// Credibility: media coverage.
    pub media: f64,
    /// Adoption: sqrt-scaled dependents.
    pub dependents: f64,
    /// Adoption: package download tiers.
    pub downloads: f64,
    /// Adoption: app review tiers.
    pub reviews: f64,
    /// Adoption: community size tiers.
    pub community: f64,
}

impl Default for SignalCaps {
    fn default() -> Self {
        Self {
            stars: 40.0,
            upvotes: 30.0,
            forum_points: 20.0,
            trending_bonus: 10.0,
            description: 30.0,
            features: 25.0,
            documentation: 20.0,
            demo: 15.0,
            use_cases: 10.0,
            activity: 30.0,
            integrations: 25.0,
            sdk: 20.0,
            status: 15.0,
            versioned: 10.0,
            funding: 30.0,
            company_age: 20.0,
            social_proof: 15.0,
            customers: 20.0,
            media: 15.0,
            dependents: 30.0,
            downloads: 30.0,
            reviews: 20.0,
            community: 20.0,
        }
    }
}

/// Source-derived baselines used when a dimension has no evidence at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackBaselines {
    pub buzz_default: f64,
    pub buzz_news: f64,
    pub buzz_official: f64,
    pub vision: f64,
    pub ability: f64,
    pub credibility: f64,
    pub adoption: f64,
}

impl Default for FallbackBaselines {
    fn default() -> Self {
        Self {
            buzz_default: 50.0,
            buzz_news: 75.0,
            buzz_official: 80.0,
            vision: 50.0,
            ability: 40.0,
            credibility: 40.0,
            adoption: 30.0,
        }
    }
}

/// Bonus added to credibility for curated provenance.
pub const CURATED_CREDIBILITY_BONUS: f64 = 30.0;

fn source_contains(tool: &ToolRecord, needles: &[&str]) -> bool {
    tool.source
        .as_deref()
        .map(str::to_lowercase)
        .is_some_and(|source| needles.iter().any(|needle| source.contains(needle)))
}

fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

/// Buzz: trending momentum from popularity signals.
pub fn buzz_score(tool: &ToolRecord, caps: &SignalCaps, baselines: &FallbackBaselines) -> f64 {
    let signals = &tool.signals;
    let no_evidence = signals.github_stars == 0
        && signals.upvotes == 0
        && signals.reddit_score == 0
        && signals.hn_points == 0
        && !signals.trending;

    if no_evidence {
        return if source_contains(tool, &["techcrunch", "venturebeat", "news"]) {
            baselines.buzz_news
        } else if source_contains(tool, &["official", "blog"]) {
            baselines.buzz_official
        } else {
            baselines.buzz_default
        };
    }

    let mut score = 0.0;

    if signals.github_stars > 0 {
        score += (10.0 * (signals.github_stars as f64).powf(0.3)).min(caps.stars);
    }
    if signals.upvotes > 0 {
        score += (5.0 * (signals.upvotes as f64).powf(0.4)).min(caps.upvotes);
    }
    let forum_points = (signals.reddit_score + signals.hn_points) as f64;
    score += (forum_points / 10.0).min(caps.forum_points);
    if signals.trending {
        score += caps.trending_bonus;
    }

    clamp_score(score)
}

/// Vision: product clarity from description, features, and documentation.
pub fn vision_score(tool: &ToolRecord, caps: &SignalCaps, baselines: &FallbackBaselines) -> f64 {
    let description_len = tool.description.as_deref().map_or(0, str::len);
    let no_evidence = description_len == 0
        && tool.key_features.is_empty()
        && tool.use_cases.is_empty()
        && !tool.signals.has_documentation
        && !tool.signals.has_demo;

    if no_evidence {
        return baselines.vision;
    }

    let mut score = 0.0;

    score += match description_len {
        len if len > 100 => caps.description,
        len if len > 50 => caps.description * 2.0 / 3.0,
        len if len > 20 => caps.description / 3.0,
        _ => 0.0,
    };
    score += (tool.key_features.len() as f64 * 5.0).min(caps.features);
    if tool.signals.has_documentation {
        score += caps.documentation;
    }
    if tool.signals.has_demo {
        score += caps.demo;
    }
    if !tool.use_cases.is_empty() {
        score += caps.use_cases;
    }

    clamp_score(score)
}

/// Ability: technical maturity from activity, integrations, and status.
pub fn ability_score(tool: &ToolRecord, caps: &SignalCaps, baselines: &FallbackBaselines) -> f64 {
    let signals = &tool.signals;
    let no_evidence = tool.repo_url.is_none()
        && signals.days_since_last_commit.is_none()
        && signals.num_integrations == 0
        && !signals.has_sdk
        && !signals.has_documentation
        && tool.status.is_none()
        && tool.last_known_version.is_none();

    if no_evidence {
        return baselines.ability;
    }

    let mut score = 0.0;

    if tool.repo_url.is_some() {
        score += match signals.days_since_last_commit {
            Some(days) if days < 7 => caps.activity,
            Some(days) if days < 30 => caps.activity * 2.0 / 3.0,
            Some(days) if days < 90 => caps.activity / 3.0,
            _ => 0.0,
        };
    }
    score += (signals.num_integrations as f64 * 2.5).min(caps.integrations);
    if signals.has_sdk || signals.has_documentation {
        score += caps.sdk;
    }
    score += match tool.status.as_deref() {
        Some("active") | Some("production") => caps.status,
        Some("beta") => caps.status * 2.0 / 3.0,
        Some("alpha") => caps.status / 3.0,
        _ => 0.0,
    };
    if tool.last_known_version.is_some() {
        score += caps.versioned;
    }

    clamp_score(score)
}

/// Credibility: team and company trust signals.
pub fn credibility_score(
    tool: &ToolRecord,
    caps: &SignalCaps,
    baselines: &FallbackBaselines,
    now: DateTime<Utc>,
) -> f64 {
    let signals = &tool.signals;
    let no_evidence = tool.funding_stage.is_none()
        && tool.founding_year.is_none()
        && !signals.has_social_proof
        && signals.customer_count == 0
        && signals.media_mentions == 0;

    if no_evidence {
        let mut baseline = baselines.credibility;
        if tool.is_curated() {
            baseline += CURATED_CREDIBILITY_BONUS;
        }
        return clamp_score(baseline);
    }

    let mut score = 0.0;

    if let Some(funding) = tool.funding_stage.as_deref() {
        let funding = funding.to_lowercase();
        score += if funding.contains("series") {
            if funding.contains('c') || funding.contains('d') {
                caps.funding
            } else if funding.contains('b') {
                caps.funding * 5.0 / 6.0
            } else {
                caps.funding * 2.0 / 3.0
            }
        } else if funding.contains("seed") {
            caps.funding / 2.0
        } else {
            0.0
        };
    }

    if let Some(year) = tool.founding_year {
        let age = (now.year() - year).max(0);
        score += match age {
            age if age >= 5 => caps.company_age,
            age if age >= 3 => caps.company_age * 3.0 / 4.0,
            age if age >= 1 => caps.company_age / 2.0,
            _ => caps.company_age / 4.0,
        };
    }

    if signals.has_social_proof {
        score += caps.social_proof;
    }

    score += match signals.customer_count {
        count if count > 100 => caps.customers,
        count if count > 10 => caps.customers * 3.0 / 4.0,
        count if count > 0 => caps.customers / 2.0,
        _ => 0.0,
    };

    if signals.media_mentions > 0 {
        score += caps.media;
    } else if source_contains(tool, &["techcrunch", "venturebeat", "news"]) {
        score += caps.media * 2.0 / 3.0;
    }

    // Hand-selection itself is a trust signal.
    if tool.is_curated() {
        score += CURATED_CREDIBILITY_BONUS;
    }

    clamp_score(score)
}

/// Adoption: organic usage from dependents, downloads, and community size.
pub fn adoption_score(tool: &ToolRecord, caps: &SignalCaps, baselines: &FallbackBaselines) -> f64 {
    let signals = &tool.signals;
    let downloads = signals.npm_downloads + signals.pip_downloads;
    let community = signals.community_size + signals.discord_members;
    let no_evidence = signals.github_dependents == 0
        && downloads == 0
        && signals.app_store_reviews == 0
        && community == 0;

    if no_evidence {
        return baselines.adoption;
    }

    let mut score = 0.0;

    if signals.github_dependents > 0 {
        score += (5.0 * (signals.github_dependents as f64).sqrt()).min(caps.dependents);
    }
    score += match downloads {
        d if d > 100_000 => caps.downloads,
        d if d > 10_000 => caps.downloads * 2.0 / 3.0,
        d if d > 1_000 => caps.downloads / 3.0,
        _ => 0.0,
    };
    score += match signals.app_store_reviews {
        r if r > 1_000 => caps.reviews,
        r if r > 100 => caps.reviews * 3.0 / 4.0,
        r if r > 10 => caps.reviews / 2.0,
        _ => 0.0,
    };
    score += match community {
        c if c > 10_000 => caps.community,
        c if c > 1_000 => caps.community * 3.0 / 4.0,
        c if c > 100 => caps.community / 2.0,
        _ => 0.0,
    };

    clamp_score(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn caps() -> SignalCaps {
        SignalCaps::default()
    }

    fn baselines() -> FallbackBaselines {
        FallbackBaselines::default()
    }

    #[test]
    fn buzz_star_contribution_is_capped() {
        let mut tool = ToolRecord::new("Linux");
        tool.signals.github_stars = 10_000_000;

        let score = buzz_score(&tool, &caps(), &baselines());
        assert!((score - caps().stars).abs() < f64::EPSILON);
    }

    #[test]
    fn buzz_is_monotone_in_stars() {
        let mut small = ToolRecord::new("Small");
        small.signals.github_stars = 100;
        let mut large = ToolRecord::new("Large");
        large.signals.github_stars = 5_000;

        assert!(
            buzz_score(&large, &caps(), &baselines())
                > buzz_score(&small, &caps(), &baselines())
        );
    }

    #[rstest]
    #[case(None, 50.0)]
    #[case(Some("techcrunch"), 75.0)]
    #[case(Some("official_blog"), 80.0)]
    #[case(Some("reddit_ai"), 50.0)]
    fn buzz_without_evidence_uses_source_baseline(
        #[case] source: Option<&str>,
        #[case] expected: f64,
    ) {
        let mut tool = ToolRecord::new("Quiet");
        tool.source = source.map(String::from);

        assert!((buzz_score(&tool, &caps(), &baselines()) - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn vision_accumulates_capped_contributions() {
        let mut tool = ToolRecord::new("Notion AI");
        tool.description = Some("a".repeat(150));
        tool.key_features = (0..10).map(|i| format!("feature {}", i)).collect();
        tool.use_cases = vec!["writing".to_string()];
        tool.signals.has_documentation = true;
        tool.signals.has_demo = true;

        // 30 (description) + 25 (features, capped) + 20 + 15 + 10 = 100
        let score = vision_score(&tool, &caps(), &baselines());
        assert!((score - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn vision_without_evidence_falls_back() {
        let tool = ToolRecord::new("Blank");
        assert!(
            (vision_score(&tool, &caps(), &baselines()) - baselines().vision).abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn ability_rewards_recent_activity_and_versioning() {
        let mut tool = ToolRecord::new("LangGraph");
        tool.repo_url = Some("https://github.com/langchain-ai/langgraph".to_string());
        tool.signals.days_since_last_commit = Some(2);
        tool.status = Some("active".to_string());
        tool.last_known_version = Some("0.2.60".to_string());

        // 30 (activity) + 15 (status) + 10 (versioned) = 55
        let score = ability_score(&tool, &caps(), &baselines());
        assert!((score - 55.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ability_ignores_activity_without_repository() {
        let mut tool = ToolRecord::new("Closed");
        tool.signals.days_since_last_commit = Some(2);

        // Evidence exists (commit recency) but no repo: only non-repo signals count.
        let score = ability_score(&tool, &caps(), &baselines());
        assert!(score.abs() < f64::EPSILON);
    }

    #[test]
    fn credibility_curated_bonus_applies_with_and_without_evidence() {
        let now = Utc::now();

        let mut bare = ToolRecord::new("Claude");
        bare.tracking_versions = true;
        let bare_score = credibility_score(&bare, &caps(), &baselines(), now);
        assert!(
            (bare_score - (baselines().credibility + CURATED_CREDIBILITY_BONUS)).abs()
                < f64::EPSILON
        );

        let mut funded = bare.clone();
        funded.funding_stage = Some("Series C".to_string());
        let funded_score = credibility_score(&funded, &caps(), &baselines(), now);
        assert!(
            (funded_score - (caps().funding + CURATED_CREDIBILITY_BONUS)).abs() < f64::EPSILON
        );
    }

    #[test]
    fn credibility_company_age_tiers() {
        let now = Utc::now();
        let mut tool = ToolRecord::new("Hugging Face");
        tool.founding_year = Some(now.year() - 8);

        let score = credibility_score(&tool, &caps(), &baselines(), now);
        assert!((score - caps().company_age).abs() < f64::EPSILON);
    }

    #[test]
    fn adoption_mixes_downloads_and_community() {
        let mut tool = ToolRecord::new("Transformers");
        tool.signals.pip_downloads = 2_000_000;
        tool.signals.community_size = 50_000;

        // 30 (downloads top tier) + 20 (community top tier) = 50
        let score = adoption_score(&tool, &caps(), &baselines());
        assert!((score - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn adoption_without_evidence_falls_back() {
        let tool = ToolRecord::new("Blank");
        assert!(
            (adoption_score(&tool, &caps(), &baselines()) - baselines().adoption).abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn every_dimension_stays_in_bounds() {
        let mut maxed = ToolRecord::new("Everything");
        maxed.description = Some("a".repeat(500));
        maxed.key_features = (0..50).map(|i| format!("f{}", i)).collect();
        maxed.use_cases = vec!["all".to_string()];
        maxed.repo_url = Some("https://github.com/a/b".to_string());
        maxed.status = Some("production".to_string());
        maxed.last_known_version = Some("9.0".to_string());
        maxed.funding_stage = Some("Series D".to_string());
        maxed.founding_year = Some(2000);
        maxed.tracking_versions = true;
        maxed.signals = crate::catalog::record::Signals {
            github_stars: 1_000_000,
            upvotes: 100_000,
            reddit_score: 50_000,
            hn_points: 50_000,
            trending: true,
            days_since_last_commit: Some(1),
            num_integrations: 100,
            has_documentation: true,
            has_demo: true,
            has_sdk: true,
            github_dependents: 1_000_000,
            npm_downloads: 10_000_000,
            pip_downloads: 10_000_000,
            app_store_reviews: 100_000,
            community_size: 1_000_000,
            discord_members: 500_000,
            customer_count: 100_000,
            media_mentions: 1_000,
            has_social_proof: true,
        };

        let now = Utc::now();
        for score in [
            buzz_score(&maxed, &caps(), &baselines()),
            vision_score(&maxed, &caps(), &baselines()),
            ability_score(&maxed, &caps(), &baselines()),
            credibility_score(&maxed, &caps(), &baselines(), now),
            adoption_score(&maxed, &caps(), &baselines()),
        ] {
            assert!((0.0..=100.0).contains(&score));
        }
    }
}
