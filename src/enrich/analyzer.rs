//! Paid analysis fallback
//!
//! Tools that free sources cannot fully describe go to an opaque
//! text-completion service, batched once per pass. Each call costs money:
//! one attempt per tool, no retries, and a failed call degrades to an
//! unenriched tool rather than an error.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::enrich::error::AnalysisError;
use crate::enrich::fields::{Enrichment, EnrichmentField};

/// One tool submitted for paid analysis.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub tool_name: String,
    pub missing_fields: Vec<EnrichmentField>,
    pub is_curated: bool,
}

/// Best-effort per-tool result; fields the service could not determine are
/// simply absent.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub tool_name: String,
    pub fields: Enrichment,
}

/// Paid analysis capability.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyze a batch of tools. Individual tools may be missing from the
    /// output when their analysis failed; only a whole-batch failure is an
    /// error.
    async fn analyze(&self, batch: &[AnalysisRequest]) -> Result<Vec<AnalysisResult>, AnalysisError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Analyzer backed by a chat-completions endpoint.
pub struct CompletionAnalyzer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    json_block_re: Regex,
    fallback_res: Vec<(EnrichmentField, Regex)>,
}

impl CompletionAnalyzer {
    pub fn new(config: &AnalysisConfig, api_key: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_millis(config.timeout_ms))
                .build()
                .expect("Failed to create HTTP client"),
            api_url: config.api_url.clone(),
            api_key,
            model: config.model.clone(),
            json_block_re: Regex::new(r"(?s)\{.*\}").unwrap(),
            // Reply text patterns used when the JSON layer fails.
            fallback_res: vec![
                (
                    EnrichmentField::Description,
                    Regex::new(r#"(?i)description\s*[=:]\s*"?([^"\n]{10,200})"#).unwrap(),
                ),
                (
                    EnrichmentField::Pricing,
                    Regex::new(r#"(?i)pricing\s*[=:]\s*"?([^"\n]{5,100})"#).unwrap(),
                ),
                (
                    EnrichmentField::FoundingYear,
                    Regex::new(r"(?i)(?:founded|launch|year)\s*[=:]\s*((?:19|20)\d{2})").unwrap(),
                ),
                (
                    EnrichmentField::Status,
                    Regex::new(r#"(?i)status\s*[=:]\s*"?([a-z]+)"#).unwrap(),
                ),
            ],
        }
    }

    /// Build an analyzer from config when the credential is present in the
    /// environment; None otherwise (callers degrade gracefully).
    pub fn from_env(config: &AnalysisConfig) -> Option<Self> {
        match std::env::var(&config.api_key_env) {
            Ok(key) if !key.is_empty() => Some(Self::new(config, key)),
            _ => {
                warn!(
                    "{} not set; paid analysis disabled for this pass",
                    config.api_key_env
                );
                None
            }
        }
    }

    fn prompt_for(request: &AnalysisRequest) -> String {
        let fields: Vec<&str> = request
            .missing_fields
            .iter()
            .map(|f| f.as_str())
            .collect();
        let fields = if fields.is_empty() {
            // Curated tools are escalated even when nothing is missing, to
            // refresh the quality-sensitive fields.
            EnrichmentField::PAID_REQUIRED
                .iter()
                .map(|f| f.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            fields.join(", ")
        };

        format!(
            "You are a software analyst. For the AI tool \"{}\", provide current \
             values for these fields: {}. Reply with a single JSON object whose \
             keys are exactly those field names. Use arrays of short strings for \
             list fields and `[{{\"title\", \"description\"}}]` objects for \
             changelog entries. Reply with JSON only.",
            request.tool_name, fields
        )
    }

    /// Parse a completion reply: JSON object first, per-field regex second.
    fn parse_reply(&self, reply: &str) -> Enrichment {
        if let Some(block) = self.json_block_re.find(reply)
            && let Ok(enrichment) = serde_json::from_str::<Enrichment>(block.as_str())
        {
            return enrichment;
        }

        debug!("analysis reply was not clean JSON, falling back to text extraction");
        let mut enrichment = Enrichment::default();
        for (field, pattern) in &self.fallback_res {
            let Some(captures) = pattern.captures(reply) else {
                continue;
            };
            let value = captures[1].trim().to_string();
            match field {
                EnrichmentField::Description => enrichment.description = Some(value),
                EnrichmentField::Pricing => enrichment.pricing = Some(value),
                EnrichmentField::FoundingYear => {
                    enrichment.founding_year = value.parse().ok();
                }
                EnrichmentField::Status => enrichment.status = Some(value.to_lowercase()),
                _ => {}
            }
        }
        enrichment
    }

    async fn analyze_one(&self, request: &AnalysisRequest) -> Result<Enrichment, AnalysisError> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: Self::prompt_for(request),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::InvalidResponse(e.to_string()))?;

        let Some(choice) = reply.choices.first() else {
            return Err(AnalysisError::InvalidResponse(
                "empty choices in completion reply".to_string(),
            ));
        };

        Ok(self.parse_reply(&choice.message.content))
    }
}

#[async_trait::async_trait]
impl Analyzer for CompletionAnalyzer {
    async fn analyze(&self, batch: &[AnalysisRequest]) -> Result<Vec<AnalysisResult>, AnalysisError> {
        let mut results = Vec::new();

        for request in batch {
            // One attempt per tool per pass; a failed call is a skipped tool.
            match self.analyze_one(request).await {
                Ok(fields) if !fields.is_empty() => {
                    debug!("analysis succeeded for {}", request.tool_name);
                    results.push(AnalysisResult {
                        tool_name: request.tool_name.clone(),
                        fields,
                    });
                }
                Ok(_) => {
                    debug!("analysis returned nothing for {}", request.tool_name);
                }
                Err(err) => {
                    warn!("analysis failed for {}: {}", request.tool_name, err);
                }
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn analyzer_for(server: &Server) -> CompletionAnalyzer {
        let config = AnalysisConfig {
            api_url: format!("{}/chat/completions", server.url()),
            ..AnalysisConfig::default()
        };
        CompletionAnalyzer::new(&config, "test-key".to_string())
    }

    fn request(name: &str, missing: Vec<EnrichmentField>) -> AnalysisRequest {
        AnalysisRequest {
            tool_name: name.to_string(),
            missing_fields: missing,
            is_curated: false,
        }
    }

    fn completion_body(content: &str) -> String {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
        .to_string()
    }

    #[tokio::test]
    async fn analyze_parses_json_reply() {
        let mut server = Server::new_async().await;

        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion_body(
                r#"{"pricing": "Free tier, Pro at $20/month", "key_features": ["agents", "search"]}"#,
            ))
            .create_async()
            .await;

        let analyzer = analyzer_for(&server);
        let results = analyzer
            .analyze(&[request(
                "Perplexity",
                vec![EnrichmentField::Pricing, EnrichmentField::KeyFeatures],
            )])
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tool_name, "Perplexity");
        assert_eq!(
            results[0].fields.pricing.as_deref(),
            Some("Free tier, Pro at $20/month")
        );
        assert_eq!(results[0].fields.key_features, vec!["agents", "search"]);
    }

    #[tokio::test]
    async fn analyze_falls_back_to_text_extraction() {
        let mut server = Server::new_async().await;

        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion_body(
                "Sure. pricing: starts at $10 per seat\nstatus: active",
            ))
            .create_async()
            .await;

        let analyzer = analyzer_for(&server);
        let results = analyzer
            .analyze(&[request("Tabnine", vec![EnrichmentField::Pricing])])
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].fields.pricing.as_deref(),
            Some("starts at $10 per seat")
        );
        assert_eq!(results[0].fields.status.as_deref(), Some("active"));
    }

    #[tokio::test]
    async fn analyze_skips_failed_tools_without_failing_the_batch() {
        let mut server = Server::new_async().await;

        server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::Regex("Failing".to_string()))
            .with_status(500)
            .create_async()
            .await;
        server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::Regex("Working".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion_body(r#"{"pricing": "Enterprise only"}"#))
            .create_async()
            .await;

        let analyzer = analyzer_for(&server);
        let results = analyzer
            .analyze(&[
                request("Failing", vec![EnrichmentField::Pricing]),
                request("Working", vec![EnrichmentField::Pricing]),
            ])
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tool_name, "Working");
    }

    #[test]
    fn prompt_lists_missing_fields_by_name() {
        let prompt = CompletionAnalyzer::prompt_for(&request(
            "Suno",
            vec![EnrichmentField::Pricing, EnrichmentField::UseCases],
        ));
        assert!(prompt.contains("\"Suno\""));
        assert!(prompt.contains("pricing, use_cases"));
    }

    #[test]
    fn prompt_for_curated_tool_without_gaps_covers_paid_fields() {
        let prompt = CompletionAnalyzer::prompt_for(&AnalysisRequest {
            tool_name: "Claude".to_string(),
            missing_fields: vec![],
            is_curated: true,
        });
        assert!(prompt.contains("pricing"));
        assert!(prompt.contains("changelog"));
    }
}
