//! # Lectern Core
//!
//! Core types and error handling for the Lectern AI request governor.
//!
//! This crate provides the foundational types used throughout the governor:
//! - The static provider catalog and its entries
//! - Chat message types
//! - The central error taxonomy
//! - Token and cost estimation heuristics
//! - Validated domain types (newtypes)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod error;
pub mod estimate;
pub mod message;
pub mod types;

// Re-export commonly used types
pub use catalog::{BucketSeed, Provider, ProviderCatalog, ProviderTier, TransportFamily};
pub use error::{LecternError, LecternResult};
pub use estimate::{
    estimate_cost, estimate_request_tokens, estimate_tokens, CHARS_PER_TOKEN,
    OUTPUT_TOKEN_ALLOWANCE,
};
pub use message::{ChatMessage, MessageRole};
pub use types::{CredentialId, ProviderId};
