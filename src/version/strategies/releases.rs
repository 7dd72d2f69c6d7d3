//! Release API strategy: source-control releases with a tags fallback
//!
//! Highest-priority strategy. Hits the repository hosting API for the latest
//! published release; repositories that tag without publishing releases fall
//! back to the tag list.

use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use crate::catalog::record::ToolRecord;
use crate::version::error::StrategyError;
use crate::version::extract::{VersionExtractor, clean_version};
use crate::version::resolver::{
    StrategyKind, VersionMetadata, VersionQueryResult, VersionStrategy,
};
use crate::version::strategies::USER_AGENT;

/// Default base URL for the repository hosting API.
const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Characters of release notes kept as the audit excerpt.
const NOTES_EXCERPT_CHARS: usize = 500;

/// Response from the latest-release endpoint.
#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

/// Response item from the tags endpoint.
#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

pub struct ReleaseApiStrategy {
    client: reqwest::Client,
    base_url: String,
    repo_re: Regex,
    extractor: VersionExtractor,
}

impl ReleaseApiStrategy {
    /// Creates a new ReleaseApiStrategy with a custom base URL.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.to_string(),
            repo_re: Regex::new(r"github\.com/([^/\s]+)/([^/\s?#]+)").unwrap(),
            extractor: VersionExtractor::new(),
        }
    }

    /// Extract an `owner/repo` slug from the tool's repository or homepage URL.
    fn repo_slug(&self, tool: &ToolRecord) -> Option<(String, String)> {
        let url = tool
            .repo_url
            .as_deref()
            .or_else(|| tool.homepage().filter(|u| u.contains("github.com")))?;

        let captures = self.repo_re.captures(url)?;
        let owner = captures[1].to_string();
        let repo = captures[2].trim_end_matches(".git").to_string();
        Some((owner, repo))
    }

    async fn latest_release(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Option<VersionQueryResult>, StrategyError> {
        let url = format!("{}/repos/{}/{}/releases/latest", self.base_url, owner, repo);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            // Repositories that only tag have no published releases.
            return self.latest_tag(owner, repo).await;
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(StrategyError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            warn!("release API returned status {}: {}", status, url);
            return Err(StrategyError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let release: Release = response.json().await.map_err(|e| {
            warn!("failed to parse release response: {}", e);
            StrategyError::InvalidResponse(e.to_string())
        })?;

        let Some(version) = self.extractor.extract(&release.tag_name) else {
            return Ok(None);
        };

        Ok(Some(VersionQueryResult {
            version: clean_version(&version),
            strategy: StrategyKind::Releases,
            metadata: VersionMetadata {
                release_date: release.published_at,
                release_url: release.html_url,
                notes_excerpt: release
                    .body
                    .map(|b| b.chars().take(NOTES_EXCERPT_CHARS).collect()),
                source_url: Some(url),
                found_in: Some("release".to_string()),
            },
        }))
    }

    async fn latest_tag(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Option<VersionQueryResult>, StrategyError> {
        let url = format!("{}/repos/{}/{}/tags", self.base_url, owner, repo);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StrategyError::NotFound(format!("{}/{}", owner, repo)));
        }

        if !status.is_success() {
            return Err(StrategyError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let tags: Vec<Tag> = response
            .json()
            .await
            .map_err(|e| StrategyError::InvalidResponse(e.to_string()))?;

        // Tags are returned newest first.
        let Some(version) = tags
            .first()
            .and_then(|tag| self.extractor.extract(&tag.name))
        else {
            return Ok(None);
        };

        Ok(Some(VersionQueryResult {
            version: clean_version(&version),
            strategy: StrategyKind::Releases,
            metadata: VersionMetadata {
                source_url: Some(url),
                found_in: Some("tags".to_string()),
                ..VersionMetadata::default()
            },
        }))
    }
}

impl Default for ReleaseApiStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait::async_trait]
impl VersionStrategy for ReleaseApiStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Releases
    }

    async fn probe(
        &self,
        tool: &ToolRecord,
    ) -> Result<Option<VersionQueryResult>, StrategyError> {
        let Some((owner, repo)) = self.repo_slug(tool) else {
            return Ok(None);
        };

        self.latest_release(&owner, &repo).await
    }
}
