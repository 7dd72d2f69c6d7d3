//! Blog feed strategy
//!
//! Companies without a changelog often announce releases on their blog.
//! Probes the conventional feed locations, then scans the newest entries'
//! title and summary for a release announcement carrying a version token.

use regex::Regex;
use tracing::debug;

use crate::catalog::record::ToolRecord;
use crate::version::error::StrategyError;
use crate::version::extract::VersionExtractor;
use crate::version::resolver::{
    StrategyKind, VersionMetadata, VersionQueryResult, VersionStrategy,
};
use crate::version::strategies::USER_AGENT;

/// Newest feed entries scanned per feed.
const ENTRY_SCAN_LIMIT: usize = 5;

/// Words that mark an entry as a release announcement.
const RELEASE_KEYWORDS: [&str; 4] = ["release", "version", "launch", "announcing"];

pub struct BlogFeedStrategy {
    client: reqwest::Client,
    extractor: VersionExtractor,
    item_re: Regex,
    title_re: Regex,
    summary_re: Regex,
    link_re: Regex,
    published_re: Regex,
    tag_strip_re: Regex,
}

impl BlogFeedStrategy {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to create HTTP client"),
            extractor: VersionExtractor::new(),
            // RSS <item> and Atom <entry> blocks.
            item_re: Regex::new(r"(?is)<item[^>]*>(.*?)</item>|<entry[^>]*>(.*?)</entry>")
                .unwrap(),
            title_re: Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap(),
            summary_re: Regex::new(
                r"(?is)<summary[^>]*>(.*?)</summary>|<description[^>]*>(.*?)</description>",
            )
            .unwrap(),
            link_re: Regex::new(r"(?is)<link[^>]*>([^<]+)</link>").unwrap(),
            published_re: Regex::new(
                r"(?is)<pubDate[^>]*>(.*?)</pubDate>|<published[^>]*>(.*?)</published>",
            )
            .unwrap(),
            tag_strip_re: Regex::new(r"<[^>]+>").unwrap(),
        }
    }

    /// Conventional feed locations for a blog URL.
    fn feed_candidates(blog_url: &str) -> Vec<String> {
        vec![
            format!("{}/feed", blog_url),
            format!("{}/rss", blog_url),
            format!("{}/blog/feed", blog_url),
            format!("{}.rss", blog_url.trim_end_matches('/')),
        ]
    }

    fn strip_tags(&self, text: &str) -> String {
        self.tag_strip_re.replace_all(text, " ").to_string()
    }

    fn first_capture(captures: &regex::Captures<'_>) -> String {
        captures
            .get(1)
            .or_else(|| captures.get(2))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default()
    }

    /// Scan one feed body for a release announcement.
    fn scan_feed(&self, body: &str, feed_url: &str) -> Option<VersionQueryResult> {
        for item in self.item_re.captures_iter(body).take(ENTRY_SCAN_LIMIT) {
            let block = item
                .get(1)
                .or_else(|| item.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();

            let title = self
                .title_re
                .captures(block)
                .map(|c| self.strip_tags(&c[1]))
                .unwrap_or_default();
            let summary = self
                .summary_re
                .captures(block)
                .map(|c| self.strip_tags(&Self::first_capture(&c)))
                .unwrap_or_default();

            let text = format!("{} {}", title, summary);
            let lowered = text.to_lowercase();
            if !RELEASE_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
                continue;
            }

            if let Some(version) = self.extractor.extract(&text) {
                return Some(VersionQueryResult {
                    version,
                    strategy: StrategyKind::BlogFeed,
                    metadata: VersionMetadata {
                        release_date: self
                            .published_re
                            .captures(block)
                            .map(|c| Self::first_capture(&c)),
                        release_url: self
                            .link_re
                            .captures(block)
                            .map(|c| c[1].trim().to_string()),
                        notes_excerpt: Some(title.trim().to_string()),
                        source_url: Some(feed_url.to_string()),
                        found_in: Some("feed_entry".to_string()),
                    },
                });
            }
        }

        None
    }
}

impl Default for BlogFeedStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl VersionStrategy for BlogFeedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BlogFeed
    }

    /// Probes each candidate feed location in turn. Unreachable candidates
    /// are skipped (a blog rarely serves more than one of them), so the
    /// strategy only reports empty-handed, never a hard failure, unless the
    /// tool has no blog URL at all.
    async fn probe(
        &self,
        tool: &ToolRecord,
    ) -> Result<Option<VersionQueryResult>, StrategyError> {
        let Some(blog_url) = tool.blog_url.as_deref() else {
            return Ok(None);
        };

        for feed_url in Self::feed_candidates(blog_url) {
            let response = match self.client.get(&feed_url).send().await {
                Ok(response) if response.status().is_success() => response,
                Ok(response) => {
                    debug!("feed {} returned {}", feed_url, response.status());
                    continue;
                }
                Err(err) => {
                    debug!("feed {} unreachable: {}", feed_url, err);
                    continue;
                }
            };

            let body = match response.text().await {
                Ok(body) => body,
                Err(err) => {
                    debug!("feed {} body read failed: {}", feed_url, err);
                    continue;
                }
            };

            if let Some(result) = self.scan_feed(&body, &feed_url) {
                return Ok(Some(result));
            }
        }

        Ok(None)
    }
}
