//! # Lectern Limits
//!
//! Per-provider simulated token buckets, reconciled against authoritative
//! figures parsed from provider rejections.
//!
//! Providers expose no "tokens remaining" query endpoint, so admission
//! control runs on a locally simulated draining bucket and corrects itself
//! opportunistically whenever a rejection response hands back real numbers.
//! This avoids both wasted calls (never admit) and silent over-limit bursts
//! (never track). Until a reconciliation occurs, every bucket's figures are
//! advisory estimates and are flagged as such.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bucket;
pub mod event;
pub mod tracker;

pub use bucket::{Admission, TokenBucket};
pub use event::RateLimitEvent;
pub use tracker::TokenBucketTracker;
