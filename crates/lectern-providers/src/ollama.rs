//! Ollama local server transport.
//!
//! A free-tier local model server: no credential, no published rate window.
//! Generation is slow compared to the hosted APIs, so the default timeout is
//! generous.

use crate::transport::{
    retry_after_header, ConfirmedUsage, ProviderTransport, TransportFailure, TransportReply,
};
use async_trait::async_trait;
use lectern_core::{
    ChatMessage, LecternError, LecternResult, MessageRole, Provider, TransportFamily,
};
use lectern_limits::RateLimitEvent;
use reqwest::Client;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default local endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama transport configuration.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL of the local server.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl OllamaConfig {
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

/// Transport for a local Ollama server.
pub struct OllamaTransport {
    config: OllamaConfig,
    client: Client,
}

impl OllamaTransport {
    /// Build the transport and its HTTP client.
    pub fn new(config: OllamaConfig) -> LecternResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LecternError::internal(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.config.base_url)
    }
}

#[async_trait]
impl ProviderTransport for OllamaTransport {
    fn family(&self) -> TransportFamily {
        TransportFamily::Ollama
    }

    async fn send(
        &self,
        provider: &Provider,
        system_prompt: &str,
        messages: &[ChatMessage],
        _credential: Option<&SecretString>,
    ) -> Result<TransportReply, TransportFailure> {
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

        let body = OllamaRequest {
            model: &provider.model,
            messages: wire_messages,
            stream: false,
        };

        let response = self
            .client
            .post(self.chat_url())
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
            // A local server rarely throttles; when it does there are no
            // token figures to mine, only an optional wait.
            let mut event = RateLimitEvent::bare(provider.id.clone(), text);
            if let Some(wait) = header_wait {
                event = event.with_retry_after(wait);
            }
            return Err(TransportFailure::RateLimited(event));
        }
        if status >= 400 {
            return Err(TransportFailure::other(Some(status), text));
        }

        let parsed: OllamaResponse = serde_json::from_str(&text)
            .map_err(|e| TransportFailure::other(Some(status), format!("bad response body: {e}")))?;
        debug!(provider = %provider.id, status, "ollama reply received");

        let usage = match (parsed.prompt_eval_count, parsed.eval_count) {
            (None, None) => None,
            (input, output) => Some(ConfirmedUsage {
                input_tokens: input.unwrap_or(0),
                output_tokens: output.unwrap_or(0),
            }),
        };
        Ok(TransportReply {
            text: parsed.message.map(|m| m.content).unwrap_or_default(),
            usage,
        })
    }
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: String,
    content: &'a str,
}

#[derive(Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Deserialize)]
struct OllamaMessage {
    content: String,
}
