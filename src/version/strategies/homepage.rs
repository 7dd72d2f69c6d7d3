//! Homepage strategy
//!
//! Last free resort before paid analysis: some products surface their
//! current version in homepage meta tags or a hero/banner block.

use regex::Regex;
use tracing::debug;

use crate::catalog::record::ToolRecord;
use crate::version::error::StrategyError;
use crate::version::extract::VersionExtractor;
use crate::version::resolver::{
    StrategyKind, VersionMetadata, VersionQueryResult, VersionStrategy,
};
use crate::version::strategies::USER_AGENT;

/// Characters scanned after a banner/hero opening tag.
const BANNER_SCAN_WINDOW: usize = 500;

pub struct HomepageStrategy {
    client: reqwest::Client,
    extractor: VersionExtractor,
    meta_content_re: Regex,
    banner_open_re: Regex,
    tag_strip_re: Regex,
}

impl HomepageStrategy {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to create HTTP client"),
            extractor: VersionExtractor::new(),
            meta_content_re: Regex::new(r#"(?i)<meta[^>]+content\s*=\s*["']([^"']+)["']"#)
                .unwrap(),
            banner_open_re: Regex::new(
                r#"(?i)<(?:header|div)[^>]*class\s*=\s*["'][^"']*(?:banner|hero|version)[^"']*["'][^>]*>"#,
            )
            .unwrap(),
            tag_strip_re: Regex::new(r"<[^>]+>").unwrap(),
        }
    }
}

impl Default for HomepageStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl VersionStrategy for HomepageStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Homepage
    }

    async fn probe(
        &self,
        tool: &ToolRecord,
    ) -> Result<Option<VersionQueryResult>, StrategyError> {
        let Some(url) = tool.homepage() else {
            return Ok(None);
        };

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            debug!("homepage {} returned {}", url, response.status());
            return Ok(None);
        }

        let page = response.text().await?;

        // Meta tags first.
        for captures in self.meta_content_re.captures_iter(&page) {
            if let Some(version) = self.extractor.extract(&captures[1]) {
                return Ok(Some(VersionQueryResult {
                    version,
                    strategy: StrategyKind::Homepage,
                    metadata: VersionMetadata {
                        source_url: Some(url.to_string()),
                        found_in: Some("meta".to_string()),
                        ..VersionMetadata::default()
                    },
                }));
            }
        }

        // Then visible banner/hero text.
        for m in self.banner_open_re.find_iter(&page) {
            let window: String = page[m.end()..].chars().take(BANNER_SCAN_WINDOW).collect();
            let text = self.tag_strip_re.replace_all(&window, " ");
            if let Some(version) = self.extractor.extract(&text) {
                return Ok(Some(VersionQueryResult {
                    version,
                    strategy: StrategyKind::Homepage,
                    metadata: VersionMetadata {
                        source_url: Some(url.to_string()),
                        found_in: Some("banner".to_string()),
                        ..VersionMetadata::default()
                    },
                }));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn tool_with_homepage(url: &str) -> ToolRecord {
        let mut tool = ToolRecord::new("Zed");
        tool.url = Some(url.to_string());
        tool
    }

    #[tokio::test]
    async fn probe_finds_version_in_meta_tags() {
        let mut server = Server::new_async().await;

        server
            .mock("GET", "/")
            .with_status(200)
            .with_body(
                r#"<html><head>
                    <meta name="generator" content="Zed v0.168.3">
                </head><body></body></html>"#,
            )
            .create_async()
            .await;

        let strategy = HomepageStrategy::new();
        let result = strategy
            .probe(&tool_with_homepage(&server.url()))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.version, "0.168.3");
        assert_eq!(result.metadata.found_in.as_deref(), Some("meta"));
    }

    #[tokio::test]
    async fn probe_finds_version_in_banner_text() {
        let mut server = Server::new_async().await;

        server
            .mock("GET", "/")
            .with_status(200)
            .with_body(
                r#"<html><body>
                    <div class="hero-banner">
                        <span>Now shipping version 3.1</span>
                    </div>
                </body></html>"#,
            )
            .create_async()
            .await;

        let strategy = HomepageStrategy::new();
        let result = strategy
            .probe(&tool_with_homepage(&server.url()))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.version, "3.1");
        assert_eq!(result.metadata.found_in.as_deref(), Some("banner"));
    }

    #[tokio::test]
    async fn probe_returns_none_for_version_free_homepage() {
        let mut server = Server::new_async().await;

        server
            .mock("GET", "/")
            .with_status(200)
            .with_body("<html><body><h1>The fastest editor</h1></body></html>")
            .create_async()
            .await;

        let strategy = HomepageStrategy::new();
        let result = strategy
            .probe(&tool_with_homepage(&server.url()))
            .await
            .unwrap();

        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn probe_skips_tools_without_homepage() {
        let strategy = HomepageStrategy::new();
        let result = strategy.probe(&ToolRecord::new("Nameless")).await.unwrap();
        assert_eq!(result, None);
    }
}
