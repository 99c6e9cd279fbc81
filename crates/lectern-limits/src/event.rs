//! Rate-limit events parsed from provider rejections.

use lectern_core::ProviderId;
use std::time::Duration;

/// Authoritative figures extracted from a provider's 429-style rejection.
///
/// Ephemeral: never persisted, only used to reconcile a bucket and to build
/// the user-facing reason. Every figure is optional because providers differ
/// in what their rejection bodies and headers actually carry; reconciliation
/// overwrites only what the event knows.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitEvent {
    /// Provider that rejected the request.
    pub provider: ProviderId,
    /// Tokens-per-window limit the provider reported.
    pub limit: Option<u64>,
    /// Tokens the provider says are already consumed in the window.
    pub used: Option<u64>,
    /// Tokens the rejected request asked for.
    pub requested: Option<u64>,
    /// How long the provider asked the caller to wait.
    pub retry_after: Option<Duration>,
    /// The provider's own rejection text, for the user-facing reason.
    pub message: String,
}

impl RateLimitEvent {
    /// Event carrying only a rejection message, no figures.
    #[must_use]
    pub fn bare(provider: ProviderId, message: impl Into<String>) -> Self {
        Self {
            provider,
            limit: None,
            used: None,
            requested: None,
            retry_after: None,
            message: message.into(),
        }
    }

    /// Set the tokens-per-window limit.
    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the tokens already used.
    #[must_use]
    pub fn with_used(mut self, used: u64) -> Self {
        self.used = Some(used);
        self
    }

    /// Set the tokens the rejected request asked for.
    #[must_use]
    pub fn with_requested(mut self, requested: u64) -> Self {
        self.requested = Some(requested);
        self
    }

    /// Set the provider's retry-after hint.
    #[must_use]
    pub fn with_retry_after(mut self, wait: Duration) -> Self {
        self.retry_after = Some(wait);
        self
    }
}
