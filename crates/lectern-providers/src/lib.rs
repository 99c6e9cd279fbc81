//! # Lectern Providers
//!
//! One transport per vendor API family, behind a common interface: given a
//! system prompt, conversation messages, and an optional credential, a
//! transport returns the assistant reply plus any confirmed usage counts, or
//! a typed failure. Rate-limit rejections are parsed provider-specifically
//! into the generic [`lectern_limits::RateLimitEvent`] shape so the rest of
//! the governor never touches vendor wire formats.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod anthropic;
pub mod ollama;
pub mod openai;
pub mod registry;
pub mod transport;

pub use anthropic::{AnthropicConfig, AnthropicTransport};
pub use ollama::{OllamaConfig, OllamaTransport};
pub use openai::{OpenAiConfig, OpenAiTransport};
pub use registry::TransportRegistry;
pub use transport::{ConfirmedUsage, ProviderTransport, TransportFailure, TransportReply};
