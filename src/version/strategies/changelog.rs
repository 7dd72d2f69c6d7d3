//! Changelog page strategy
//!
//! Scans the tool's changelog/release-notes page for a version token,
//! headings first (a changelog's newest entry heading almost always carries
//! the version), then the leading paragraphs.

use regex::Regex;
use tracing::debug;

use crate::catalog::record::ToolRecord;
use crate::version::error::StrategyError;
use crate::version::extract::VersionExtractor;
use crate::version::resolver::{
    StrategyKind, VersionMetadata, VersionQueryResult, VersionStrategy,
};
use crate::version::strategies::USER_AGENT;

/// Paragraphs scanned when no heading yields a token.
const PARAGRAPH_SCAN_LIMIT: usize = 10;

/// Characters after a matched heading searched for a release date.
const DATE_SCAN_WINDOW: usize = 300;

pub struct ChangelogStrategy {
    client: reqwest::Client,
    extractor: VersionExtractor,
    heading_re: Regex,
    paragraph_re: Regex,
    tag_strip_re: Regex,
    date_re: Regex,
}

impl ChangelogStrategy {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to create HTTP client"),
            extractor: VersionExtractor::new(),
            heading_re: Regex::new(r"(?is)<h[1-4][^>]*>(.*?)</h[1-4]>").unwrap(),
            paragraph_re: Regex::new(r"(?is)<p[^>]*>(.*?)</p>").unwrap(),
            tag_strip_re: Regex::new(r"<[^>]+>").unwrap(),
            date_re: Regex::new(r"\d{4}-\d{2}-\d{2}|[A-Z][a-z]+ \d{1,2},? \d{4}").unwrap(),
        }
    }

    fn strip_tags(&self, html: &str) -> String {
        self.tag_strip_re.replace_all(html, " ").to_string()
    }

    /// Find a release date in the text following a matched heading.
    fn date_near(&self, page: &str, after: usize) -> Option<String> {
        let window: String = page[after..].chars().take(DATE_SCAN_WINDOW).collect();
        self.date_re
            .find(&self.strip_tags(&window))
            .map(|m| m.as_str().to_string())
    }
}

impl Default for ChangelogStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl VersionStrategy for ChangelogStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Changelog
    }

    async fn probe(
        &self,
        tool: &ToolRecord,
    ) -> Result<Option<VersionQueryResult>, StrategyError> {
        let Some(url) = tool.changelog_url.as_deref() else {
            return Ok(None);
        };

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            debug!("changelog page {} returned {}", url, response.status());
            return Ok(None);
        }

        let page = response.text().await?;

        // Newest entry heading first.
        for captures in self.heading_re.captures_iter(&page) {
            let heading = self.strip_tags(&captures[1]);
            if let Some(version) = self.extractor.extract(&heading) {
                let match_end = captures.get(0).map(|m| m.end()).unwrap_or(0);
                return Ok(Some(VersionQueryResult {
                    version,
                    strategy: StrategyKind::Changelog,
                    metadata: VersionMetadata {
                        release_date: self.date_near(&page, match_end),
                        source_url: Some(url.to_string()),
                        found_in: Some("heading".to_string()),
                        ..VersionMetadata::default()
                    },
                }));
            }
        }

        // Fall back to the leading paragraphs.
        for captures in self
            .paragraph_re
            .captures_iter(&page)
            .take(PARAGRAPH_SCAN_LIMIT)
        {
            let paragraph = self.strip_tags(&captures[1]);
            if let Some(version) = self.extractor.extract(&paragraph) {
                return Ok(Some(VersionQueryResult {
                    version,
                    strategy: StrategyKind::Changelog,
                    metadata: VersionMetadata {
                        source_url: Some(url.to_string()),
                        found_in: Some("paragraph".to_string()),
                        ..VersionMetadata::default()
                    },
                }));
            }
        }

        Ok(None)
    }
}
