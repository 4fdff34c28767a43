//! Language generation client.
//!
//! Thin transport wrapper around the Anthropic messages API. No retry
//! logic, no caching: outputs are intentionally non-deterministic and
//! callers decide retry policy.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{OutreachError, Result};
use crate::types::TokenUsage;

/// Default generation model.
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// One generation call's output: raw text plus token accounting.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

/// Unified interface for the text-generation service. Implemented by the
/// real transport client and by scripted mocks in tests.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Issue one (system prompt, user prompt, max output) request.
    async fn generate(&self, system: &str, user: &str, max_tokens: u32) -> Result<Completion>;

    /// Model name for logging.
    fn model_name(&self) -> &str;
}

/// Anthropic Claude API client.
#[derive(Clone)]
pub struct AnthropicClient {
    api_key: String,
    client: reqwest::Client,
    model: String,
}

impl AnthropicClient {
    /// Create a new client with the given API key. The model can be
    /// overridden via `ANTHROPIC_MODEL`.
    pub fn new(api_key: String) -> Self {
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self {
            api_key,
            client: reqwest::Client::new(),
            model,
        }
    }

    /// Create with a specific model.
    pub fn with_model(api_key: String, model: &str) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            model: model.to_string(),
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            OutreachError::Configuration("ANTHROPIC_API_KEY environment variable not set".into())
        })?;
        Ok(Self::new(api_key))
    }
}

#[derive(Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Deserialize, Default)]
struct ApiUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: ApiUsage,
}

#[async_trait]
impl GenerationClient for AnthropicClient {
    async fn generate(&self, system: &str, user: &str, max_tokens: u32) -> Result<Completion> {
        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&serde_json::json!({
                "model": &self.model,
                "max_tokens": max_tokens,
                "system": system,
                "messages": [{"role": "user", "content": user}]
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OutreachError::Upstream { status, body });
        }

        let api_response: ApiResponse = response.json().await?;
        // An empty content array is left to the callers' decode fallbacks
        // rather than treated as a transport failure.
        let text = api_response
            .content
            .first()
            .and_then(|c| c.text.clone())
            .unwrap_or_default();

        Ok(Completion {
            text,
            usage: TokenUsage::new(
                api_response.usage.input_tokens,
                api_response.usage.output_tokens,
            ),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
