//! # Lectern Context
//!
//! Carves a bounded reading window into chunks that each fit a
//! caller-supplied token budget, for injection into a provider request.
//!
//! Budgets run on the same characters-per-token heuristic as the rest of the
//! governor, so every figure here is approximate by design.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod window;

pub use window::{ContextChunk, ContextWindow, PAGE_SEPARATOR};
