//! Mock provider servers for integration testing
//!
//! Wiremock-based doubles for the Anthropic and OpenAI APIs, emitting the
//! same success, rate-limit, and failure shapes the real transports parse.

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock Anthropic messages API server
pub struct MockAnthropic {
    pub server: MockServer,
}

impl MockAnthropic {
    /// Start a fresh mock server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL for transport configuration
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Number of requests the server has seen
    pub async fn calls(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or(0)
    }

    /// Mount a successful reply with confirmed usage
    pub async fn mock_reply(&self, text: &str, input_tokens: u64, output_tokens: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_mock",
                "type": "message",
                "role": "assistant",
                "content": [{"type": "text", "text": text}],
                "usage": {"input_tokens": input_tokens, "output_tokens": output_tokens}
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a rate-limit rejection carrying header figures
    pub async fn mock_rate_limit(&self, limit: u64, remaining: u64, retry_after_secs: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("anthropic-ratelimit-tokens-limit", limit.to_string().as_str())
                    .insert_header(
                        "anthropic-ratelimit-tokens-remaining",
                        remaining.to_string().as_str(),
                    )
                    .insert_header("retry-after", retry_after_secs.to_string().as_str())
                    .set_body_json(json!({
                        "type": "error",
                        "error": {
                            "type": "rate_limit_error",
                            "message": "Number of request tokens has exceeded your per-minute rate limit"
                        }
                    })),
            )
            .mount(&self.server)
            .await;
    }

    /// Mount an internal server error
    pub async fn mock_server_error(&self) {
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "type": "error",
                "error": {"type": "api_error", "message": "internal server error"}
            })))
            .mount(&self.server)
            .await;
    }
}

/// Mock OpenAI chat-completions API server
pub struct MockOpenAi {
    pub server: MockServer,
}

impl MockOpenAi {
    /// Start a fresh mock server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL for transport configuration
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Number of requests the server has seen
    pub async fn calls(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or(0)
    }

    /// Mount a successful reply with confirmed usage
    pub async fn mock_reply(&self, text: &str, prompt_tokens: u64, completion_tokens: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-mock",
                "object": "chat.completion",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": text},
                    "finish_reason": "stop"
                }],
                "usage": {
                    "prompt_tokens": prompt_tokens,
                    "completion_tokens": completion_tokens,
                    "total_tokens": prompt_tokens + completion_tokens
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a rate-limit rejection with the figures in the prose body
    pub async fn mock_rate_limit(&self, limit: u64, used: u64, requested: u64, wait_secs: f64) {
        let message = format!(
            "Rate limit reached for gpt-4o in organization org-test on tokens per min (TPM): \
             Limit {limit}, Used {used}, Requested {requested}. Please try again in {wait_secs}s. \
             Visit https://platform.openai.com/account/rate-limits to learn more."
        );
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {
                    "message": message,
                    "type": "tokens",
                    "param": null,
                    "code": "rate_limit_exceeded"
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount an internal server error
    pub async fn mock_server_error(&self) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": {"message": "The server had an error", "type": "server_error"}
            })))
            .mount(&self.server)
            .await;
    }
}
