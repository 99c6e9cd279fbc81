//! Shared fixtures for governor integration tests

use lectern_core::{BucketSeed, LecternResult, Provider, ProviderCatalog, ProviderId, TransportFamily};
use lectern_credentials::CredentialStatus;
use lectern_governor::RequestGovernor;
use lectern_providers::{
    AnthropicConfig, AnthropicTransport, OpenAiConfig, OpenAiTransport, ProviderTransport,
    TransportRegistry,
};
use lectern_store::KvStore;
use secrecy::SecretString;
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Install a test subscriber once so `RUST_LOG=lectern_governor=debug`
/// surfaces governor decisions while debugging a failing test.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Catalog used across the integration tests: two Anthropic variants
/// sharing one alias group, one OpenAI model with a deliberately small
/// window so admission transitions happen on a test timescale, and a free
/// local provider with no tracked window.
pub fn test_catalog() -> ProviderCatalog {
    ProviderCatalog::new(vec![
        Provider::premium(
            "anthropic-sonnet",
            "Claude Sonnet",
            "anthropic",
            "claude-3-5-sonnet-latest",
            TransportFamily::Anthropic,
        )
        .with_cost_per_million(6.0)
        .with_bucket_seed(BucketSeed {
            limit: 80_000,
            drain_rate: 1_000.0,
        }),
        Provider::premium(
            "anthropic-haiku",
            "Claude Haiku",
            "anthropic",
            "claude-3-5-haiku-latest",
            TransportFamily::Anthropic,
        )
        .with_cost_per_million(1.6)
        .with_bucket_seed(BucketSeed {
            limit: 100_000,
            drain_rate: 1_500.0,
        }),
        Provider::premium(
            "openai-gpt4o",
            "GPT-4o",
            "openai",
            "gpt-4o",
            TransportFamily::OpenAi,
        )
        .with_cost_per_million(7.5)
        .with_bucket_seed(BucketSeed {
            limit: 4_000,
            drain_rate: 500.0,
        }),
        Provider::free(
            "ollama-local",
            "Ollama (local)",
            "ollama",
            "llama3.1",
            TransportFamily::Ollama,
        ),
    ])
}

/// Open a governor over `store` with transports aimed at the given mock
/// server URLs.
pub async fn governor_over(
    store: Arc<dyn KvStore>,
    anthropic_uri: &str,
    openai_uri: &str,
) -> LecternResult<RequestGovernor> {
    init_tracing();
    let transports = TransportRegistry::new()
        .with_transport(Arc::new(AnthropicTransport::new(
            AnthropicConfig::default().with_base_url(anthropic_uri),
        )?) as Arc<dyn ProviderTransport>)
        .with_transport(Arc::new(OpenAiTransport::new(
            OpenAiConfig::default().with_base_url(openai_uri),
        )?) as Arc<dyn ProviderTransport>);
    RequestGovernor::open_with(store, test_catalog(), transports).await
}

/// Store an active credential for a provider and return nothing; panics on
/// failure, which is what a fixture should do.
pub async fn seed_credential(governor: &RequestGovernor, provider: &str, secret: &str) {
    governor
        .credentials()
        .add(
            ProviderId::new(provider),
            format!("{provider} test key"),
            SecretString::new(secret.to_string()),
            CredentialStatus::Active,
        )
        .await
        .expect("seed credential");
}

/// Give spawned fire-and-forget persistence writes a moment to land.
pub async fn settle() {
    tokio::task::yield_now().await;
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
}
