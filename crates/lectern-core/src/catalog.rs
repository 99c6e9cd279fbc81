//! The static provider catalog.
//!
//! Catalog entries are immutable and loaded at startup. Each entry names the
//! vendor model it maps to, the transport family that knows how to talk to
//! it, the credential alias group it shares keys with, and the defaults used
//! to seed the provider's simulated rate-limit bucket.

use crate::types::ProviderId;
use serde::{Deserialize, Serialize};

/// Pricing/access tier of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTier {
    /// No payment required (e.g., a local model server).
    Free,
    /// Paid vendor API.
    Premium,
}

/// Which transport implementation services a provider.
///
/// One transport per vendor API family; model variants of the same vendor
/// share a transport and differ only in the `model` slug sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportFamily {
    /// Anthropic messages API.
    Anthropic,
    /// OpenAI chat-completions API.
    OpenAi,
    /// Ollama local server API.
    Ollama,
}

/// Defaults used to seed a provider's token bucket on first use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketSeed {
    /// Hard limit of the simulated window, in tokens.
    pub limit: u64,
    /// Continuous drain rate, in tokens per second.
    pub drain_rate: f64,
}

impl BucketSeed {
    /// Seed from a tokens-per-minute figure, the unit vendors publish.
    #[must_use]
    pub fn per_minute(tokens_per_minute: u64) -> Self {
        Self {
            limit: tokens_per_minute,
            drain_rate: tokens_per_minute as f64 / 60.0,
        }
    }
}

/// A static catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    /// Stable id used by consumers and persisted state.
    pub id: ProviderId,
    /// Display name for the UI layer.
    pub name: String,
    /// Pricing/access tier.
    pub tier: ProviderTier,
    /// Whether requests need a stored credential.
    pub requires_credential: bool,
    /// Credential alias group: model variants of one vendor share this value
    /// and therefore share credentials.
    pub credential_alias: String,
    /// Vendor model slug sent on the wire.
    pub model: String,
    /// Transport family servicing this provider.
    pub transport: TransportFamily,
    /// Approximate cost per million tokens, when the vendor publishes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_per_million_tokens: Option<f64>,
    /// Bucket seeding defaults; absent for providers without a known window
    /// (admission then fails open until real figures arrive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_seed: Option<BucketSeed>,
}

impl Provider {
    /// Create a premium entry that requires a credential.
    #[must_use]
    pub fn premium(
        id: impl Into<ProviderId>,
        name: impl Into<String>,
        alias: impl Into<String>,
        model: impl Into<String>,
        transport: TransportFamily,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tier: ProviderTier::Premium,
            requires_credential: true,
            credential_alias: alias.into(),
            model: model.into(),
            transport,
            cost_per_million_tokens: None,
            bucket_seed: None,
        }
    }

    /// Create a free entry that needs no credential.
    #[must_use]
    pub fn free(
        id: impl Into<ProviderId>,
        name: impl Into<String>,
        alias: impl Into<String>,
        model: impl Into<String>,
        transport: TransportFamily,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tier: ProviderTier::Free,
            requires_credential: false,
            credential_alias: alias.into(),
            model: model.into(),
            transport,
            cost_per_million_tokens: None,
            bucket_seed: None,
        }
    }

    /// Set the approximate cost per million tokens.
    #[must_use]
    pub fn with_cost_per_million(mut self, cost: f64) -> Self {
        self.cost_per_million_tokens = Some(cost);
        self
    }

    /// Set the bucket seeding defaults.
    #[must_use]
    pub fn with_bucket_seed(mut self, seed: BucketSeed) -> Self {
        self.bucket_seed = Some(seed);
        self
    }
}

/// The immutable provider catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCatalog {
    providers: Vec<Provider>,
}

impl ProviderCatalog {
    /// Build a catalog from explicit entries (deployment override path).
    #[must_use]
    pub fn new(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    /// The built-in catalog shipped with the editor.
    #[must_use]
    pub fn built_in() -> Self {
        Self::new(vec![
            Provider::premium(
                "anthropic-sonnet",
                "Claude Sonnet",
                "anthropic",
                "claude-3-5-sonnet-latest",
                TransportFamily::Anthropic,
            )
            .with_cost_per_million(6.0)
            .with_bucket_seed(BucketSeed::per_minute(80_000)),
            Provider::premium(
                "anthropic-haiku",
                "Claude Haiku",
                "anthropic",
                "claude-3-5-haiku-latest",
                TransportFamily::Anthropic,
            )
            .with_cost_per_million(1.6)
            .with_bucket_seed(BucketSeed::per_minute(100_000)),
            Provider::premium(
                "openai-gpt4o",
                "GPT-4o",
                "openai",
                "gpt-4o",
                TransportFamily::OpenAi,
            )
            .with_cost_per_million(7.5)
            .with_bucket_seed(BucketSeed::per_minute(30_000)),
            Provider::premium(
                "openai-gpt4o-mini",
                "GPT-4o mini",
                "openai",
                "gpt-4o-mini",
                TransportFamily::OpenAi,
            )
            .with_cost_per_million(0.45)
            .with_bucket_seed(BucketSeed::per_minute(200_000)),
            Provider::free(
                "ollama-local",
                "Ollama (local)",
                "ollama",
                "llama3.1",
                TransportFamily::Ollama,
            ),
        ])
    }

    /// Look up an entry by id.
    #[must_use]
    pub fn get(&self, id: &ProviderId) -> Option<&Provider> {
        self.providers.iter().find(|p| &p.id == id)
    }

    /// All entries, in catalog order.
    #[must_use]
    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    /// Entries sharing the given provider's credential alias group,
    /// in catalog order, the given provider first.
    ///
    /// Returns an empty vector for an unknown id.
    #[must_use]
    pub fn alias_peers(&self, id: &ProviderId) -> Vec<&Provider> {
        let Some(target) = self.get(id) else {
            return Vec::new();
        };
        let mut peers = vec![target];
        peers.extend(
            self.providers
                .iter()
                .filter(|p| p.credential_alias == target.credential_alias && &p.id != id),
        );
        peers
    }
}

impl Default for ProviderCatalog {
    fn default() -> Self {
        Self::built_in()
    }
}
