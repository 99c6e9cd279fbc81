//! Integration tests for the Lectern AI request governor
//!
//! Cross-crate flows that unit tests cannot cover:
//! - Admission control short-circuiting ahead of the network
//! - Dispatch against mock provider servers (success, 429, 500)
//! - Credential lifecycle, alias resolution, and legacy migration
//! - The chunking consumer surface
//! - State persistence and re-derivation across reopen

pub mod fixtures;
pub mod mock_providers;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_providers::*;

#[cfg(test)]
mod admission_tests;
#[cfg(test)]
mod chunking_tests;
#[cfg(test)]
mod dispatch_tests;
#[cfg(test)]
mod persistence_tests;
