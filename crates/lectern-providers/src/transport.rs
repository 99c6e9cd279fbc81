//! The pluggable transport interface.

use async_trait::async_trait;
use lectern_core::{ChatMessage, Provider, TransportFamily};
use lectern_limits::RateLimitEvent;
use secrecy::SecretString;
use std::time::Duration;

/// Token usage figures a provider confirmed in its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedUsage {
    /// Tokens consumed by the prompt.
    pub input_tokens: u64,
    /// Tokens generated in the reply.
    pub output_tokens: u64,
}

impl ConfirmedUsage {
    /// Total tokens the request cost.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// A successful transport round-trip.
#[derive(Debug, Clone)]
pub struct TransportReply {
    /// The assistant's reply text.
    pub text: String,
    /// Confirmed usage, when the provider reported it.
    pub usage: Option<ConfirmedUsage>,
}

/// A typed transport failure.
///
/// Rate-limit rejections carry the provider's own figures, already parsed
/// into the generic event shape; everything else keeps the raw status and
/// body for diagnostics.
#[derive(Debug)]
pub enum TransportFailure {
    /// The provider rejected the request for rate-limit reasons.
    RateLimited(RateLimitEvent),
    /// Any other transport or HTTP failure.
    Other {
        /// HTTP status, if the request got that far.
        status: Option<u16>,
        /// Raw response body or transport error text.
        body: String,
    },
}

impl TransportFailure {
    /// Non-rate-limit failure constructor.
    #[must_use]
    pub fn other(status: Option<u16>, body: impl Into<String>) -> Self {
        Self::Other {
            status,
            body: body.into(),
        }
    }
}

/// One vendor API family's wire protocol.
///
/// A transport owns request/response translation and rejection parsing for
/// its family; it holds no credentials and no rate-limit state. The governor
/// never branches on provider id: it looks the transport up by the
/// catalog's family and hands it the per-request inputs.
#[async_trait]
pub trait ProviderTransport: Send + Sync + 'static {
    /// The family this transport services.
    fn family(&self) -> TransportFamily;

    /// Send one chat request and return the reply or a typed failure.
    ///
    /// `credential` is `None` for providers that require none.
    async fn send(
        &self,
        provider: &Provider,
        system_prompt: &str,
        messages: &[ChatMessage],
        credential: Option<&SecretString>,
    ) -> Result<TransportReply, TransportFailure>;
}

/// Parse a `Retry-After` header value in whole seconds.
pub(crate) fn retry_after_header(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Parse a numeric header into a token count.
pub(crate) fn numeric_header(headers: &reqwest::header::HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}
