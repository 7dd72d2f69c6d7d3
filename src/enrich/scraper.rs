//! Free enrichment scrapers
//!
//! Before any paid call, the router tries sources that cost nothing: the
//! repository hosting API (description, stars, activity-derived status,
//! founding year) and the tool's homepage meta tags. Per-tool scrape
//! failures are non-fatal; whatever was gathered is kept.

use chrono::{DateTime, Datelike, Utc};
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::catalog::record::ToolRecord;
use crate::enrich::error::ScrapeError;
use crate::enrich::fields::Enrichment;

/// HTTP user agent sent by the scraper.
const USER_AGENT: &str = "toolradar";

/// Default base URL for the repository hosting API.
const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Minimum length for a scraped meta description to be kept.
const MIN_DESCRIPTION_LEN: usize = 20;

/// Days of push inactivity separating active / maintained / stale.
const ACTIVE_WITHIN_DAYS: i64 = 30;
const MAINTAINED_WITHIN_DAYS: i64 = 180;

/// Repository metadata returned by the hosting API.
#[derive(Debug, Deserialize)]
struct RepoInfo {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

/// Source of free (zero-cost) enrichment data.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FreeScraper: Send + Sync {
    /// Gather whatever free fields are reachable for this tool.
    async fn scrape(&self, tool: &ToolRecord) -> Result<Enrichment, ScrapeError>;
}

/// Scrapes the repository API and the tool homepage.
pub struct WebScraper {
    client: reqwest::Client,
    api_base: String,
    repo_re: Regex,
    meta_tag_re: Regex,
    content_re: Regex,
    founded_re: Regex,
    copyright_re: Regex,
}

impl WebScraper {
    /// Creates a new WebScraper with a custom repository API base URL.
    pub fn new(api_base: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to create HTTP client"),
            api_base: api_base.to_string(),
            repo_re: Regex::new(r"github\.com/([^/\s]+)/([^/\s?#]+)").unwrap(),
            meta_tag_re: Regex::new(
                r#"(?i)<meta[^>]+(?:name|property)\s*=\s*["'](?:description|og:description)["'][^>]*>"#,
            )
            .unwrap(),
            content_re: Regex::new(r#"(?i)content\s*=\s*["']([^"']*)["']"#).unwrap(),
            founded_re: Regex::new(
                r"(?i)(?:founded|established|launched|since)\s+(?:in\s+)?(\d{4})",
            )
            .unwrap(),
            copyright_re: Regex::new(r"©\s*(\d{4})").unwrap(),
        }
    }

    /// Repository slug from the tool's repo URL, or its homepage when that
    /// points at the hosting site.
    fn repo_slug(&self, tool: &ToolRecord) -> Option<(String, String, String)> {
        let url = tool
            .repo_url
            .as_deref()
            .or_else(|| tool.homepage().filter(|u| u.contains("github.com")))?;

        let captures = self.repo_re.captures(url)?;
        Some((
            captures[1].to_string(),
            captures[2].trim_end_matches(".git").to_string(),
            url.to_string(),
        ))
    }

    async fn scrape_repository(&self, tool: &ToolRecord) -> Enrichment {
        let mut enrichment = Enrichment::default();
        let Some((owner, repo, repo_url)) = self.repo_slug(tool) else {
            return enrichment;
        };

        let url = format!("{}/repos/{}/{}", self.api_base, owner, repo);
        let info: RepoInfo = match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => match response.json().await {
                Ok(info) => info,
                Err(err) => {
                    debug!("repository metadata parse failed for {}: {}", tool.name, err);
                    return enrichment;
                }
            },
            Ok(response) => {
                debug!(
                    "repository API returned {} for {}",
                    response.status(),
                    tool.name
                );
                return enrichment;
            }
            Err(err) => {
                debug!("repository scrape failed for {}: {}", tool.name, err);
                return enrichment;
            }
        };

        enrichment.description = info
            .description
            .filter(|d| d.len() >= MIN_DESCRIPTION_LEN);
        enrichment.github_stars = Some(info.stargazers_count);
        enrichment.repo_url = Some(repo_url);

        // Activity recency stands in for a declared status.
        if let Some(pushed_at) = info.pushed_at {
            let idle_days = Utc::now().signed_duration_since(pushed_at).num_days();
            enrichment.status = Some(
                if idle_days < ACTIVE_WITHIN_DAYS {
                    "active"
                } else if idle_days < MAINTAINED_WITHIN_DAYS {
                    "maintained"
                } else {
                    "stale"
                }
                .to_string(),
            );
        }

        enrichment.founding_year = info.created_at.map(|created| created.year());

        enrichment
    }

    async fn scrape_homepage(&self, tool: &ToolRecord) -> Enrichment {
        let mut enrichment = Enrichment::default();
        let Some(url) = tool.homepage() else {
            return enrichment;
        };

        let page = match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(page) => page,
                Err(err) => {
                    debug!("homepage read failed for {}: {}", tool.name, err);
                    return enrichment;
                }
            },
            Ok(response) => {
                debug!("homepage returned {} for {}", response.status(), tool.name);
                return enrichment;
            }
            Err(err) => {
                debug!("homepage scrape failed for {}: {}", tool.name, err);
                return enrichment;
            }
        };

        enrichment.description = self
            .meta_tag_re
            .find(&page)
            .and_then(|tag| self.content_re.captures(tag.as_str()))
            .map(|captures| captures[1].trim().to_string())
            .filter(|description| description.len() >= MIN_DESCRIPTION_LEN);

        enrichment.founding_year = self
            .founded_re
            .captures(&page)
            .or_else(|| self.copyright_re.captures(&page))
            .and_then(|captures| captures[1].parse::<i32>().ok())
            .filter(|year| (1990..=Utc::now().year()).contains(year));

        enrichment
    }
}

impl Default for WebScraper {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

#[async_trait::async_trait]
impl FreeScraper for WebScraper {
    async fn scrape(&self, tool: &ToolRecord) -> Result<Enrichment, ScrapeError> {
        // The two sources are independent; fetch them together.
        let (repo, homepage) = futures::join!(
            self.scrape_repository(tool),
            self.scrape_homepage(tool)
        );

        // Repository description is usually tighter than homepage marketing
        // copy, so the repository side wins conflicts.
        let mut enrichment = homepage;
        enrichment.merge(repo);

        debug!(
            "free scrape for {}: {}",
            tool.name,
            if enrichment.is_empty() {
                "nothing found"
            } else {
                "fields gathered"
            }
        );

        Ok(enrichment)
    }
}
