//! Per-provider bucket bookkeeping, shared across concurrent callers.

use crate::bucket::{Admission, TokenBucket};
use crate::event::RateLimitEvent;
use chrono::Utc;
use dashmap::DashMap;
use lectern_core::{BucketSeed, LecternResult, ProviderCatalog, ProviderId};
use lectern_store::{KvStore, BUCKETS_KEY};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Persisted form of the tracker: one document holding every provider's
/// bucket. `used` is stale the moment it is written; loading re-derives it
/// from the elapsed time since `updated_at`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct BucketsDocument {
    buckets: HashMap<ProviderId, TokenBucket>,
}

/// Tracks one simulated [`TokenBucket`] per provider.
///
/// Buckets are created lazily from the catalog's seed figures on first use.
/// Each bucket sits behind its own lock, so `status`, `can_admit`,
/// `record_confirmed`, and `reconcile` are atomic read-modify-write per
/// provider: two racing callers cannot both pass admission for the same
/// narrowly-remaining budget. No lock is ever held across an await; snapshot
/// persistence is spawned fire-and-forget and never blocks a caller.
pub struct TokenBucketTracker {
    buckets: DashMap<ProviderId, Arc<Mutex<TokenBucket>>>,
    catalog: Arc<ProviderCatalog>,
    store: Arc<dyn KvStore>,
}

impl TokenBucketTracker {
    /// Open the tracker over a store, loading any persisted snapshot.
    ///
    /// A missing snapshot document seeds fresh buckets on demand; an
    /// unreadable one is discarded with a warning, since bucket state is an
    /// opportunistic cache of estimates, not a source of truth.
    pub async fn open(
        store: Arc<dyn KvStore>,
        catalog: Arc<ProviderCatalog>,
    ) -> LecternResult<Self> {
        let buckets = DashMap::new();
        if let Some(bytes) = store.get(BUCKETS_KEY).await? {
            match serde_json::from_slice::<BucketsDocument>(&bytes) {
                Ok(doc) => {
                    for (provider, bucket) in doc.buckets {
                        buckets.insert(provider, Arc::new(Mutex::new(bucket)));
                    }
                }
                Err(error) => {
                    warn!(%error, "discarding unreadable bucket snapshot");
                }
            }
        }
        Ok(Self {
            buckets,
            catalog,
            store,
        })
    }

    /// Current bucket for a provider, drained to now.
    ///
    /// `None` means the provider has never been used (and admission for it
    /// fails open).
    pub fn status(&self, provider: &ProviderId) -> Option<TokenBucket> {
        let entry = self.buckets.get(provider)?.clone();
        let snapshot = {
            let mut bucket = entry.lock();
            bucket.drain_to(Utc::now());
            bucket.clone()
        };
        self.persist();
        Some(snapshot)
    }

    /// Admission-control check for an estimated request size.
    ///
    /// Fails open when the provider has neither a live bucket nor catalog
    /// seed figures: absence of tracking data must not block legitimate use.
    pub fn can_admit(&self, provider: &ProviderId, estimated_tokens: u64) -> Admission {
        let Some(entry) = self.entry(provider) else {
            return Admission::Allowed;
        };
        let verdict = {
            let mut bucket = entry.lock();
            let now = Utc::now();
            bucket.drain_to(now);
            bucket.admit(estimated_tokens, now)
        };
        if let Admission::Denied { wait_seconds, .. } = &verdict {
            debug!(
                provider = %provider,
                estimated_tokens,
                wait_seconds,
                "admission denied"
            );
        }
        self.persist();
        verdict
    }

    /// Add confirmed usage after a successful call.
    pub fn record_confirmed(&self, provider: &ProviderId, tokens_used: u64) {
        let Some(entry) = self.entry(provider) else {
            return;
        };
        {
            let mut bucket = entry.lock();
            bucket.drain_to(Utc::now());
            bucket.record(tokens_used);
        }
        self.persist();
    }

    /// Overwrite a bucket from the authoritative figures of a provider
    /// rejection. The only path that converts a simulated bucket into a
    /// confirmed one.
    pub fn reconcile(&self, provider: &ProviderId, event: &RateLimitEvent) {
        let entry = self
            .entry(provider)
            .unwrap_or_else(|| self.synthesize(provider, event));
        {
            let mut bucket = entry.lock();
            let now = Utc::now();
            bucket.drain_to(now);
            bucket.reconcile(event, now);
        }
        warn!(
            provider = %provider,
            limit = ?event.limit,
            used = ?event.used,
            retry_after = ?event.retry_after,
            "bucket reconciled against provider rejection"
        );
        self.persist();
    }

    /// Drop a provider-imposed throttle after a subsequent confirmed success.
    pub fn clear_throttle(&self, provider: &ProviderId) {
        let Some(entry) = self.buckets.get(provider).map(|e| e.clone()) else {
            return;
        };
        {
            let mut bucket = entry.lock();
            bucket.drain_to(Utc::now());
            bucket.throttled_until = None;
        }
        self.persist();
    }

    /// Bucket for a provider, lazily seeded from the catalog.
    fn entry(&self, provider: &ProviderId) -> Option<Arc<Mutex<TokenBucket>>> {
        if let Some(entry) = self.buckets.get(provider) {
            return Some(entry.clone());
        }
        let seed = self.catalog.get(provider).and_then(|p| p.bucket_seed)?;
        Some(
            self.buckets
                .entry(provider.clone())
                .or_insert_with(|| Arc::new(Mutex::new(TokenBucket::seeded(seed, Utc::now()))))
                .clone(),
        )
    }

    /// Bucket for a provider the catalog carries no seed for, built from a
    /// rejection's own figures so the throttle still registers.
    fn synthesize(&self, provider: &ProviderId, event: &RateLimitEvent) -> Arc<Mutex<TokenBucket>> {
        let limit = event.limit.unwrap_or(0);
        let seed = BucketSeed {
            limit,
            drain_rate: limit as f64 / 60.0,
        };
        self.buckets
            .entry(provider.clone())
            .or_insert_with(|| Arc::new(Mutex::new(TokenBucket::seeded(seed, Utc::now()))))
            .clone()
    }

    /// Spawn a fire-and-forget snapshot write. Failures are logged, never
    /// surfaced: bucket state is advisory and will be rebuilt from use.
    fn persist(&self) {
        let doc = BucketsDocument {
            buckets: self
                .buckets
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().lock().clone()))
                .collect(),
        };
        let bytes = match serde_json::to_vec(&doc) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(%error, "bucket snapshot serialization failed");
                return;
            }
        };
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(error) = store.put(BUCKETS_KEY, bytes).await {
                warn!(%error, "bucket snapshot write failed");
            }
        });
    }
}
