//! The simulated token bucket and its drain math.
//!
//! All arithmetic is pure over an explicit `now` so the drain and admission
//! properties are testable without sleeping; [`crate::TokenBucketTracker`]
//! supplies wall-clock time.

use crate::event::RateLimitEvent;
use chrono::{DateTime, Utc};
use lectern_core::BucketSeed;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-provider simulated rate window.
///
/// `used` is only meaningful after [`TokenBucket::drain_to`] has run for the
/// current instant; every tracker operation drains before reading or writing,
/// so a bucket is never observed or persisted stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBucket {
    /// Tokens currently counted against the window.
    pub used: f64,
    /// Hard limit of the window, in tokens.
    pub limit: u64,
    /// Continuous drain rate, in tokens per second.
    pub drain_rate: f64,
    /// Instant `used` was last recomputed.
    pub updated_at: DateTime<Utc>,
    /// True while the figures are local estimates; flipped to false the
    /// first time a provider rejection hands back authoritative numbers.
    pub is_simulated: bool,
    /// Deadline of a provider-imposed throttle, when one is in force.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throttled_until: Option<DateTime<Utc>>,
}

/// Outcome of an admission-control check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "lowercase")]
pub enum Admission {
    /// The estimated request fits the remaining window.
    Allowed,
    /// The request does not fit; wait and retry.
    Denied {
        /// Human-readable denial reason.
        reason: String,
        /// Whole seconds until the window should have drained enough.
        wait_seconds: u64,
        /// True when the figures behind the denial came from a real
        /// provider rejection rather than the local simulation.
        confirmed: bool,
    },
}

impl Admission {
    /// Whether the request may proceed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// The wait hint carried by a denial.
    #[must_use]
    pub fn wait(&self) -> Option<Duration> {
        match self {
            Self::Allowed => None,
            Self::Denied { wait_seconds, .. } => Some(Duration::from_secs(*wait_seconds)),
        }
    }
}

impl TokenBucket {
    /// Fresh bucket from the catalog's seed figures.
    #[must_use]
    pub fn seeded(seed: BucketSeed, now: DateTime<Utc>) -> Self {
        Self {
            used: 0.0,
            limit: seed.limit,
            drain_rate: seed.drain_rate,
            updated_at: now,
            is_simulated: true,
            throttled_until: None,
        }
    }

    /// Recompute `used` for the elapsed time since the last update.
    ///
    /// `used` becomes `max(0, used - elapsed * drain_rate)`; an expired
    /// throttle deadline is dropped. A `now` earlier than `updated_at`
    /// (clock skew across restarts) drains nothing.
    pub fn drain_to(&mut self, now: DateTime<Utc>) {
        let elapsed = (now - self.updated_at).num_milliseconds();
        if elapsed > 0 {
            let drained = self.drain_rate * elapsed as f64 / 1000.0;
            self.used = (self.used - drained).max(0.0);
            self.updated_at = now;
        }
        if self.throttled_until.is_some_and(|until| now >= until) {
            self.throttled_until = None;
        }
    }

    /// Tokens still available in the window. Drain first.
    #[must_use]
    pub fn available(&self) -> f64 {
        (self.limit as f64 - self.used).max(0.0)
    }

    /// Admission check for an estimated request size. Drain first.
    ///
    /// A provider-imposed throttle denies outright until its deadline; past
    /// that, the request fits iff `available >= estimated`, and a denial's
    /// wait is `ceil((estimated - available) / drain_rate)` seconds.
    #[must_use]
    pub fn admit(&self, estimated_tokens: u64, now: DateTime<Utc>) -> Admission {
        if let Some(until) = self.throttled_until {
            if now < until {
                let wait = (until - now).num_seconds().max(0) as u64 + 1;
                return Admission::Denied {
                    reason: "provider requested a cooldown".to_string(),
                    wait_seconds: wait,
                    confirmed: !self.is_simulated,
                };
            }
        }

        let need = estimated_tokens as f64;
        if self.available() >= need {
            return Admission::Allowed;
        }

        let deficit = need - self.available();
        let wait_seconds = if self.drain_rate > 0.0 {
            (deficit / self.drain_rate).ceil() as u64
        } else {
            u64::MAX
        };
        Admission::Denied {
            reason: format!(
                "estimated {estimated_tokens} tokens exceed the ~{} remaining in the window",
                self.available().floor() as u64
            ),
            wait_seconds,
            confirmed: !self.is_simulated,
        }
    }

    /// Add confirmed usage after a successful call. Drain first.
    ///
    /// Does not flip `is_simulated`: only a reconciliation against real
    /// provider figures converts the bucket to ground truth.
    pub fn record(&mut self, tokens_used: u64) {
        self.used += tokens_used as f64;
    }

    /// Overwrite the bucket from a provider rejection's authoritative
    /// figures and mark it confirmed.
    pub fn reconcile(&mut self, event: &RateLimitEvent, now: DateTime<Utc>) {
        if let Some(limit) = event.limit {
            self.limit = limit;
        }
        if let Some(used) = event.used {
            self.used = used as f64;
        } else {
            // The provider refused without saying how full the window is;
            // the safe reading is that it is full.
            self.used = self.limit as f64;
        }
        self.throttled_until = event
            .retry_after
            .and_then(|wait| chrono::Duration::from_std(wait).ok())
            .map(|wait| now + wait);
        self.updated_at = now;
        self.is_simulated = false;
    }
}
