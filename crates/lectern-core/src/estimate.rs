//! Token and cost estimation heuristics.
//!
//! Deliberately not a real tokenizer: budgeting only needs to be roughly
//! right, and per-provider tokenizer dependencies would buy little accuracy
//! at real cost. Every figure produced here is approximate and all downstream
//! budgeting treats it as such.

use crate::catalog::Provider;
use crate::message::ChatMessage;

/// Characters-per-token ratio of the heuristic.
pub const CHARS_PER_TOKEN: f64 = 4.0;

/// Fixed output allowance added to every request's preflight estimate,
/// covering the reply the provider will generate.
pub const OUTPUT_TOKEN_ALLOWANCE: u64 = 1024;

/// Approximate token count of a text.
///
/// Zero for empty text, otherwise `ceil(chars / CHARS_PER_TOKEN)` over the
/// byte length. Monotonically non-decreasing in input length.
#[must_use]
pub fn estimate_tokens(text: &str) -> u64 {
    if text.is_empty() {
        return 0;
    }
    (text.len() as f64 / CHARS_PER_TOKEN).ceil() as u64
}

/// Preflight estimate for a full request: system prompt plus every non-empty
/// conversation message plus the fixed output allowance.
#[must_use]
pub fn estimate_request_tokens(system_prompt: &str, messages: &[ChatMessage]) -> u64 {
    let conversation: u64 = messages
        .iter()
        .filter(|m| !m.is_empty())
        .map(|m| estimate_tokens(&m.content))
        .sum();
    estimate_tokens(system_prompt) + conversation + OUTPUT_TOKEN_ALLOWANCE
}

/// Approximate cost of `tokens` against a provider's published price.
///
/// `None` when the catalog carries no price (free tier).
#[must_use]
pub fn estimate_cost(provider: &Provider, tokens: u64) -> Option<f64> {
    provider
        .cost_per_million_tokens
        .map(|per_million| per_million * tokens as f64 / 1_000_000.0)
}
