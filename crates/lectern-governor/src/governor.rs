//! The request governor: admission-controlled dispatch and the consumer
//! facade the editor UI calls.

use crate::prompt::build_system_prompt;
use lectern_context::{ContextChunk, ContextWindow};
use lectern_core::{
    estimate_cost, estimate_request_tokens, estimate_tokens, ChatMessage, LecternError,
    LecternResult, Provider, ProviderCatalog, ProviderId, OUTPUT_TOKEN_ALLOWANCE,
};
use lectern_credentials::CredentialRegistry;
use lectern_limits::{Admission, TokenBucket, TokenBucketTracker};
use lectern_providers::{ConfirmedUsage, TransportFailure, TransportRegistry};
use lectern_store::KvStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A successful dispatch.
#[derive(Debug, Clone)]
pub struct AssistantReply {
    /// Provider that produced the reply.
    pub provider: ProviderId,
    /// The assistant's text.
    pub text: String,
    /// Confirmed usage, when the provider reported it.
    pub usage: Option<ConfirmedUsage>,
}

/// Preflight result for the UI's budget meter: what a request over `text`
/// would roughly cost and whether it would currently be admitted.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchPreflight {
    /// Approximate tokens, output allowance included.
    pub estimated_tokens: u64,
    /// The admission verdict at this instant.
    pub admission: Admission,
    /// Approximate cost in the provider's currency, when priced.
    pub approx_cost: Option<f64>,
}

/// Per-provider snapshot for the UI.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    /// The catalog entry.
    pub provider: Provider,
    /// Simulated bucket, drained to now; `None` until first use.
    pub bucket: Option<TokenBucket>,
    /// Whether an operational credential currently resolves.
    pub has_credential: bool,
}

/// Orchestrates every AI request of the editor.
///
/// One instance per opened store; shared state inside (registry, tracker) is
/// safe under concurrent feature calls. No consumer path reaches a transport
/// without passing admission control, no failure is retried internally, and
/// no tokens are reserved ahead of a response — cancellation mid-dispatch
/// therefore needs no rollback.
pub struct RequestGovernor {
    catalog: Arc<ProviderCatalog>,
    credentials: CredentialRegistry,
    tracker: TokenBucketTracker,
    transports: TransportRegistry,
}

impl RequestGovernor {
    /// Open a governor with the built-in catalog and default transports.
    pub async fn open(store: Arc<dyn KvStore>) -> LecternResult<Self> {
        Self::open_with(
            store,
            ProviderCatalog::built_in(),
            TransportRegistry::with_defaults()?,
        )
        .await
    }

    /// Open with an explicit catalog and transport registry (deployment
    /// overrides, tests).
    pub async fn open_with(
        store: Arc<dyn KvStore>,
        catalog: ProviderCatalog,
        transports: TransportRegistry,
    ) -> LecternResult<Self> {
        let catalog = Arc::new(catalog);
        let credentials =
            CredentialRegistry::open(Arc::clone(&store), Arc::clone(&catalog)).await?;
        let tracker = TokenBucketTracker::open(store, Arc::clone(&catalog)).await?;
        Ok(Self {
            catalog,
            credentials,
            tracker,
            transports,
        })
    }

    /// Dispatch one chat/generation request.
    ///
    /// Resolves the credential, builds the system prompt (override or the
    /// default template over `context_text`), preflights the token budget,
    /// and only then lets the transport touch the network. Success feeds
    /// confirmed usage back into the bucket; a provider rate-limit rejection
    /// reconciles the bucket with the provider's own figures; any other
    /// failure leaves bucket state untouched.
    pub async fn dispatch(
        &self,
        provider_id: &ProviderId,
        messages: &[ChatMessage],
        context_text: &str,
        system_prompt_override: Option<&str>,
    ) -> LecternResult<AssistantReply> {
        let provider = self
            .catalog
            .get(provider_id)
            .ok_or_else(|| LecternError::unknown_provider(provider_id.as_str()))?;

        let credential = if provider.requires_credential {
            match self.credentials.operational_credential(provider_id).await {
                Some(credential) => Some(credential),
                None => return Err(LecternError::credential_missing(provider_id.as_str())),
            }
        } else {
            None
        };

        let system_prompt = match system_prompt_override {
            Some(prompt) => prompt.to_string(),
            None => build_system_prompt(context_text),
        };
        let estimated_tokens = estimate_request_tokens(&system_prompt, messages);

        if let Admission::Denied {
            reason,
            wait_seconds,
            confirmed,
        } = self.tracker.can_admit(provider_id, estimated_tokens)
        {
            debug!(
                provider = %provider_id,
                estimated_tokens,
                wait_seconds,
                "dispatch denied before the network"
            );
            let wait = Some(Duration::from_secs(wait_seconds));
            return Err(if confirmed {
                LecternError::rate_limited_confirmed(provider_id.as_str(), reason, wait)
            } else {
                LecternError::rate_limited_local(provider_id.as_str(), reason, wait)
            });
        }

        let transport = self.transports.get(provider.transport).ok_or_else(|| {
            LecternError::internal(format!(
                "no transport registered for family {:?}",
                provider.transport
            ))
        })?;

        debug!(provider = %provider_id, estimated_tokens, "dispatching");
        let outcome = transport
            .send(
                provider,
                &system_prompt,
                messages,
                credential.as_ref().map(|c| &c.secret),
            )
            .await;

        match outcome {
            Ok(reply) => {
                if let Some(usage) = reply.usage {
                    self.tracker.record_confirmed(provider_id, usage.total());
                }
                self.credentials.record_usage(provider_id).await;
                self.tracker.clear_throttle(provider_id);
                info!(
                    provider = %provider_id,
                    confirmed_tokens = reply.usage.map(|usage| usage.total()),
                    "dispatch succeeded"
                );
                Ok(AssistantReply {
                    provider: provider_id.clone(),
                    text: reply.text,
                    usage: reply.usage,
                })
            }
            Err(TransportFailure::RateLimited(event)) => {
                warn!(
                    provider = %provider_id,
                    retry_after = ?event.retry_after,
                    "provider confirmed a rate limit"
                );
                self.tracker.reconcile(provider_id, &event);
                Err(LecternError::rate_limited_confirmed(
                    provider_id.as_str(),
                    event.message.clone(),
                    event.retry_after,
                ))
            }
            Err(TransportFailure::Other { status, body }) => {
                warn!(provider = %provider_id, status = ?status, "dispatch failed");
                Err(LecternError::provider(provider_id.as_str(), status, body))
            }
        }
    }

    /// Estimate a request over `text` and check whether it would currently
    /// be admitted, without touching the network or mutating anything a
    /// dispatch would not.
    pub fn can_admit_estimate(
        &self,
        provider_id: &ProviderId,
        text: &str,
    ) -> LecternResult<DispatchPreflight> {
        let provider = self
            .catalog
            .get(provider_id)
            .ok_or_else(|| LecternError::unknown_provider(provider_id.as_str()))?;
        let estimated_tokens = estimate_tokens(text) + OUTPUT_TOKEN_ALLOWANCE;
        Ok(DispatchPreflight {
            estimated_tokens,
            admission: self.tracker.can_admit(provider_id, estimated_tokens),
            approx_cost: estimate_cost(provider, estimated_tokens),
        })
    }

    /// Chunk a page window to a token budget (consumer passthrough).
    #[must_use]
    pub fn chunk(&self, pages: Vec<String>, token_budget: u64) -> Vec<ContextChunk> {
        ContextWindow::new(pages).chunks(token_budget)
    }

    /// The credential registry, for the UI's CRUD surface.
    #[must_use]
    pub fn credentials(&self) -> &CredentialRegistry {
        &self.credentials
    }

    /// All catalog entries.
    #[must_use]
    pub fn providers(&self) -> &[Provider] {
        self.catalog.providers()
    }

    /// One catalog entry.
    #[must_use]
    pub fn provider(&self, provider_id: &ProviderId) -> Option<&Provider> {
        self.catalog.get(provider_id)
    }

    /// Snapshot of a provider for the UI's budget meter.
    pub async fn provider_status(&self, provider_id: &ProviderId) -> LecternResult<ProviderStatus> {
        let provider = self
            .catalog
            .get(provider_id)
            .ok_or_else(|| LecternError::unknown_provider(provider_id.as_str()))?;
        let has_credential = !provider.requires_credential
            || self
                .credentials
                .operational_credential(provider_id)
                .await
                .is_some();
        Ok(ProviderStatus {
            provider: provider.clone(),
            bucket: self.tracker.status(provider_id),
            has_credential,
        })
    }
}
