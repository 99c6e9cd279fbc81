//! OpenAI chat-completions API transport.
//!
//! Unlike Anthropic, the rate-limit figures arrive as prose inside the
//! rejection body ("Limit 30000, Used 29000, Requested 2000. Please try
//! again in 2.5s."); they are extracted by regex, with the `Retry-After`
//! header as a fallback wait hint.

use crate::transport::{
    retry_after_header, ConfirmedUsage, ProviderTransport, TransportFailure, TransportReply,
};
use async_trait::async_trait;
use lectern_core::{
    ChatMessage, LecternError, LecternResult, MessageRole, Provider, TransportFamily,
};
use lectern_limits::RateLimitEvent;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

static FIGURES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Limit (\d+), Used (\d+), Requested (\d+)").expect("static regex")
});
static WAIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"try again in (\d+(?:\.\d+)?)(ms|s)").expect("static regex")
});

/// OpenAI transport configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Base URL of the API (overridable for tests and proxies).
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl OpenAiConfig {
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

/// Transport for the OpenAI chat-completions API.
pub struct OpenAiTransport {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiTransport {
    /// Build the transport and its HTTP client.
    pub fn new(config: OpenAiConfig) -> LecternResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LecternError::internal(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.config.base_url)
    }
}

#[async_trait]
impl ProviderTransport for OpenAiTransport {
    fn family(&self) -> TransportFamily {
        TransportFamily::OpenAi
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
                "openai transport called without a credential",
            ));
        };

        // The system prompt rides as the leading message on this wire.
        let mut wire_messages = vec![WireMessage {
            role: "system".to_string(),
            content: system_prompt,
        }];
        wire_messages.extend(
            messages
                .iter()
                .filter(|m| !m.is_empty() && m.role != MessageRole::System)
                .map(|m| WireMessage {
                    role: m.role.to_string(),
                    content: &m.content,
                }),
        );

        let body = OpenAiRequest {
            model: &provider.model,
            messages: wire_messages,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(credential.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportFailure::other(None, e.to_string()))?;

        let status = response.status().as_u16();
        let header_wait = retry_after_header(response.headers());
        let text = response
            .text()
            .await
            .map_err(|e| TransportFailure::other(Some(status), e.to_string()))?;

        if status == 429 {
            return Err(TransportFailure::RateLimited(parse_rate_limit(
                provider,
                header_wait,
                &text,
            )));
        }
        if status >= 400 {
            return Err(TransportFailure::other(Some(status), text));
        }

        let parsed: OpenAiResponse = serde_json::from_str(&text)
            .map_err(|e| TransportFailure::other(Some(status), format!("bad response body: {e}")))?;
        let reply_text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        debug!(provider = %provider.id, status, "openai reply received");
        Ok(TransportReply {
            text: reply_text,
            usage: parsed.usage.map(|u| ConfirmedUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
        })
    }
}

/// Extract rate-limit figures from a 429 rejection body.
///
/// The prose message inside the error JSON carries limit/used/requested and
/// a "try again in" duration; a missing piece stays `None`, and the body's
/// own wait phrase wins over the `Retry-After` header when both exist.
#[must_use]
pub fn parse_rate_limit(
    provider: &Provider,
    header_wait: Option<Duration>,
    body: &str,
) -> RateLimitEvent {
    let message = serde_json::from_str::<OpenAiErrorBody>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| "rate limit exceeded".to_string());

    let mut event = RateLimitEvent::bare(provider.id.clone(), message.clone());
    if let Some(captures) = FIGURES.captures(&message) {
        if let Ok(limit) = captures[1].parse() {
            event = event.with_limit(limit);
        }
        if let Ok(used) = captures[2].parse() {
            event = event.with_used(used);
        }
        if let Ok(requested) = captures[3].parse() {
            event = event.with_requested(requested);
        }
    }

    let body_wait = WAIT.captures(&message).and_then(|captures| {
        let value: f64 = captures[1].parse().ok()?;
        Some(match &captures[2] {
            "ms" => Duration::from_millis(value.ceil() as u64),
            _ => Duration::from_secs_f64(value),
        })
    });
    if let Some(wait) = body_wait.or(header_wait) {
        event = event.with_retry_after(wait);
    }
    event
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: String,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Deserialize)]
struct OpenAiErrorBody {
    error: OpenAiErrorDetail,
}

#[derive(Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}
