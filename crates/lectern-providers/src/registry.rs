//! Transport lookup by family.

use crate::anthropic::{AnthropicConfig, AnthropicTransport};
use crate::ollama::{OllamaConfig, OllamaTransport};
use crate::openai::{OpenAiConfig, OpenAiTransport};
use crate::transport::ProviderTransport;
use lectern_core::{LecternResult, TransportFamily};
use std::collections::HashMap;
use std::sync::Arc;

/// Holds one transport per family.
///
/// The governor resolves a provider's transport through this registry and
/// never branches on provider id; swapping a transport (for a test double or
/// an alternate endpoint) is a registry edit, not a governor change.
#[derive(Default)]
pub struct TransportRegistry {
    transports: HashMap<TransportFamily, Arc<dyn ProviderTransport>>,
}

impl TransportRegistry {
    /// Empty registry, for callers that register transports explicitly.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in transports at their default endpoints.
    pub fn with_defaults() -> LecternResult<Self> {
        Ok(Self::new()
            .with_transport(Arc::new(AnthropicTransport::new(AnthropicConfig::default())?))
            .with_transport(Arc::new(OpenAiTransport::new(OpenAiConfig::default())?))
            .with_transport(Arc::new(OllamaTransport::new(OllamaConfig::default())?)))
    }

    /// Register (or replace) the transport for its family.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn ProviderTransport>) -> Self {
        self.transports.insert(transport.family(), transport);
        self
    }

    /// Transport for a family, if registered.
    #[must_use]
    pub fn get(&self, family: TransportFamily) -> Option<Arc<dyn ProviderTransport>> {
        self.transports.get(&family).cloned()
    }
}
