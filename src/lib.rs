//! # Lectern
//!
//! The AI request governor of the Lectern reading-companion editor.
//!
//! Everything the editor UI is allowed to call lives behind this facade:
//! credential CRUD, token/cost preflight, context chunking, and
//! admission-controlled dispatch. No consumer reaches a provider transport
//! except through [`RequestGovernor::dispatch`], so no request skips
//! admission control.
//!
//! ## Opening a governor
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! # async fn example() -> lectern::LecternResult<()> {
//! let store = Arc::new(lectern::JsonFileStore::open("/var/lib/lectern").await?);
//! let governor = lectern::open(store).await?;
//! # Ok(())
//! # }
//! ```
//!
//! All token and cost figures are heuristic estimates (a fixed
//! characters-per-token ratio), corrected opportunistically against the
//! figures providers report; treat every budget as approximate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

pub use lectern_context::{ContextChunk, ContextWindow, PAGE_SEPARATOR};
pub use lectern_core::{
    estimate_cost, estimate_tokens, BucketSeed, ChatMessage, CredentialId, LecternError,
    LecternResult, MessageRole, Provider, ProviderCatalog, ProviderId, ProviderTier,
    TransportFamily, CHARS_PER_TOKEN, OUTPUT_TOKEN_ALLOWANCE,
};
pub use lectern_credentials::{
    CredentialPatch, CredentialRegistry, CredentialStatus, StoredCredential,
};
pub use lectern_governor::{
    build_system_prompt, AssistantReply, DispatchPreflight, ProviderStatus, RequestGovernor,
};
pub use lectern_limits::{Admission, RateLimitEvent, TokenBucket, TokenBucketTracker};
pub use lectern_providers::{
    AnthropicConfig, AnthropicTransport, ConfirmedUsage, OllamaConfig, OllamaTransport,
    OpenAiConfig, OpenAiTransport, ProviderTransport, TransportFailure, TransportRegistry,
    TransportReply,
};
pub use lectern_store::{JsonFileStore, KvStore, MemoryStore};

/// Open a governor over a store with the built-in catalog and the default
/// transports.
pub async fn open(store: Arc<dyn KvStore>) -> LecternResult<RequestGovernor> {
    RequestGovernor::open(store).await
}
