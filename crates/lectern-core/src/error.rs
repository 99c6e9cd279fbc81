//! Error types for the Lectern governor.
//!
//! One central taxonomy, surfaced unmodified to the consumer: the governor
//! performs no internal retries, so every failure carries enough structured
//! detail (reason, wait hint, raw provider payload) for the caller to decide
//! whether to retry, wait, or prompt the user to fix configuration.

use std::time::Duration;
use thiserror::Error;

/// Convenience result alias used throughout the workspace.
pub type LecternResult<T> = Result<T, LecternError>;

/// The governor's error taxonomy.
#[derive(Debug, Error)]
pub enum LecternError {
    /// The requested provider id is not in the catalog.
    #[error("unknown provider: {provider}")]
    UnknownProvider {
        /// The offending provider id.
        provider: String,
    },

    /// No usable credential could be resolved for the provider.
    ///
    /// User-correctable: the caller should prompt for key entry.
    #[error("no usable credential for provider {provider}")]
    CredentialMissing {
        /// Provider the request targeted.
        provider: String,
    },

    /// The request was refused by admission control or by the provider.
    ///
    /// Never retried automatically; `retry_after` is a hint for the caller.
    #[error("rate limited on {provider}: {reason}")]
    RateLimited {
        /// Provider the request targeted.
        provider: String,
        /// Human-readable reason (local estimate or the provider's own text).
        reason: String,
        /// How long the caller should wait before trying again.
        retry_after: Option<Duration>,
        /// True when the figures came from a real provider rejection rather
        /// than the local simulation.
        confirmed: bool,
    },

    /// The provider transport failed for a non-rate-limit reason.
    ///
    /// Raw status and body are preserved for diagnostics.
    #[error("provider {provider} request failed (status {status:?})")]
    Provider {
        /// Provider the request targeted.
        provider: String,
        /// HTTP status code, if the failure got that far.
        status: Option<u16>,
        /// Raw response body or transport error text.
        body: String,
    },

    /// Context chunking had to hard-truncate an oversized paragraph.
    ///
    /// Non-fatal in the chunking path itself (logged there); present in the
    /// taxonomy so consumers can represent the condition uniformly.
    #[error("estimation degraded: {message}")]
    EstimationDegraded {
        /// What was truncated and by how much.
        message: String,
    },

    /// Invalid input to a registry or governor operation.
    #[error("validation failed: {message}")]
    Validation {
        /// What was wrong with the input.
        message: String,
    },

    /// The durable store failed outside the fire-and-forget path.
    #[error("storage failure: {message}")]
    Storage {
        /// Description of the failure.
        message: String,
    },

    /// A store document or wire body could not be (de)serialized.
    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An invariant was violated; indicates a bug, not a caller mistake.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the violated invariant.
        message: String,
    },
}

impl LecternError {
    /// Unknown-provider constructor.
    #[must_use]
    pub fn unknown_provider(provider: impl Into<String>) -> Self {
        Self::UnknownProvider {
            provider: provider.into(),
        }
    }

    /// Missing-credential constructor.
    #[must_use]
    pub fn credential_missing(provider: impl Into<String>) -> Self {
        Self::CredentialMissing {
            provider: provider.into(),
        }
    }

    /// Rate-limited constructor for a locally simulated denial.
    #[must_use]
    pub fn rate_limited_local(
        provider: impl Into<String>,
        reason: impl Into<String>,
        retry_after: Option<Duration>,
    ) -> Self {
        Self::RateLimited {
            provider: provider.into(),
            reason: reason.into(),
            retry_after,
            confirmed: false,
        }
    }

    /// Rate-limited constructor for a provider-confirmed rejection.
    #[must_use]
    pub fn rate_limited_confirmed(
        provider: impl Into<String>,
        reason: impl Into<String>,
        retry_after: Option<Duration>,
    ) -> Self {
        Self::RateLimited {
            provider: provider.into(),
            reason: reason.into(),
            retry_after,
            confirmed: true,
        }
    }

    /// Provider-failure constructor.
    #[must_use]
    pub fn provider(
        provider: impl Into<String>,
        status: Option<u16>,
        body: impl Into<String>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            status,
            body: body.into(),
        }
    }

    /// Validation-failure constructor.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Storage-failure constructor.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Internal-error constructor.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable code for logging and UI dispatch.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownProvider { .. } => "UNKNOWN_PROVIDER",
            Self::CredentialMissing { .. } => "CREDENTIAL_MISSING",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Provider { .. } => "PROVIDER_ERROR",
            Self::EstimationDegraded { .. } => "ESTIMATION_DEGRADED",
            Self::Validation { .. } => "VALIDATION",
            Self::Storage { .. } => "STORAGE",
            Self::Serialization(_) => "SERIALIZATION",
            Self::Internal { .. } => "INTERNAL",
        }
    }

    /// Whether the user can fix this by changing configuration
    /// (as opposed to waiting or reporting a bug).
    #[must_use]
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            Self::CredentialMissing { .. } | Self::Validation { .. }
        )
    }

    /// The wait hint carried by a rate-limit failure, if any.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<std::io::Error> for LecternError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage {
            message: err.to_string(),
        }
    }
}
