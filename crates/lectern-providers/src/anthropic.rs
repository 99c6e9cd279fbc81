//! Anthropic messages API transport.
//!
//! The system prompt travels in a dedicated `system` field, and rate-limit
//! figures arrive in response headers (`anthropic-ratelimit-tokens-*` plus
//! `retry-after`) rather than in the rejection body.

use crate::transport::{
    numeric_header, retry_after_header, ConfirmedUsage, ProviderTransport, TransportFailure,
    TransportReply,
};
use async_trait::async_trait;
use lectern_core::{
    ChatMessage, LecternError, LecternResult, MessageRole, Provider, TransportFamily,
    OUTPUT_TOKEN_ALLOWANCE,
};
use lectern_limits::RateLimitEvent;
use reqwest::header::HeaderMap;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// API version header value.
pub const API_VERSION: &str = "2023-06-01";

const TOKENS_LIMIT_HEADER: &str = "anthropic-ratelimit-tokens-limit";
const TOKENS_REMAINING_HEADER: &str = "anthropic-ratelimit-tokens-remaining";

/// Anthropic transport configuration.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// Base URL of the API (overridable for tests and proxies).
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Cap on generated tokens per reply; matches the preflight allowance so
    /// estimated budgets line up with what the wire actually permits.
    pub max_tokens: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
            max_tokens: OUTPUT_TOKEN_ALLOWANCE,
        }
    }
}

impl AnthropicConfig {
    /// Override the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Transport for the Anthropic messages API.
pub struct AnthropicTransport {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicTransport {
    /// Build the transport and its HTTP client.
    pub fn new(config: AnthropicConfig) -> LecternResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LecternError::internal(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url)
    }
}

#[async_trait]
impl ProviderTransport for AnthropicTransport {
    fn family(&self) -> TransportFamily {
        TransportFamily::Anthropic
    }

    async fn send(
        &self,
        provider: &Provider,
        system_prompt: &str,
        messages: &[ChatMessage],
        credential: Option<&SecretString>,
    ) -> Result<TransportReply, TransportFailure> {
        let Some(credential) = credential else {
            return Err(TransportFailure::other(
                None,
                "anthropic transport called without a credential",
            ));
        };

        let body = AnthropicRequest {
            model: &provider.model,
            max_tokens: self.config.max_tokens,
            system: system_prompt,
            messages: messages
                .iter()
                .filter(|m| !m.is_empty() && m.role != MessageRole::System)
                .map(|m| WireMessage {
                    role: m.role.to_string(),
                    content: &m.content,
                })
                .collect(),
        };

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", credential.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportFailure::other(None, e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response
            .text()
            .await
            .map_err(|e| TransportFailure::other(Some(status), e.to_string()))?;

        if status == 429 {
            return Err(TransportFailure::RateLimited(parse_rate_limit(
                provider, &headers, &text,
            )));
        }
        if status >= 400 {
            return Err(TransportFailure::other(Some(status), text));
        }

        let parsed: AnthropicResponse = serde_json::from_str(&text)
            .map_err(|e| TransportFailure::other(Some(status), format!("bad response body: {e}")))?;
        let reply_text = parsed
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        debug!(provider = %provider.id, status, "anthropic reply received");
        Ok(TransportReply {
            text: reply_text,
            usage: parsed.usage.map(|u| ConfirmedUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
        })
    }
}

/// Extract rate-limit figures from a 429 response.
///
/// The token window figures live in headers; the body contributes only its
/// error message. Missing pieces stay `None` rather than being invented.
#[must_use]
pub fn parse_rate_limit(provider: &Provider, headers: &HeaderMap, body: &str) -> RateLimitEvent {
    let message = serde_json::from_str::<AnthropicErrorBody>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| "rate limit exceeded".to_string());

    let mut event = RateLimitEvent::bare(provider.id.clone(), message);
    if let Some(limit) = numeric_header(headers, TOKENS_LIMIT_HEADER) {
        event = event.with_limit(limit);
        if let Some(remaining) = numeric_header(headers, TOKENS_REMAINING_HEADER) {
            event = event.with_used(limit.saturating_sub(remaining));
        }
    }
    if let Some(wait) = retry_after_header(headers) {
        event = event.with_retry_after(wait);
    }
    event
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u64,
    system: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: String,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Option<AnthropicUsage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Deserialize)]
struct AnthropicErrorBody {
    error: AnthropicErrorDetail,
}

#[derive(Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}
