//! The store trait and the fixed document keys.

use async_trait::async_trait;
use lectern_core::LecternResult;

/// Key of the credentials/settings document (stored credentials plus
/// provider → credential selection).
pub const CREDENTIALS_KEY: &str = "credentials";

/// Key of the bucket-snapshot document (provider id → bucket snapshot).
pub const BUCKETS_KEY: &str = "buckets";

/// Key of the legacy single-key-per-provider document, consumed by the
/// one-time migration at open.
pub const LEGACY_KEYS_KEY: &str = "legacy_api_keys";

/// A durable key-value store over opaque byte documents.
///
/// Absence of a key is not an error: `get` returns `None` on first run and
/// callers seed defaults. Implementations must make `put` atomic per key —
/// a reader never observes a torn document.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Read a document, `None` if it has never been written.
    async fn get(&self, key: &str) -> LecternResult<Option<Vec<u8>>>;

    /// Write a document, replacing any previous value.
    async fn put(&self, key: &str, value: Vec<u8>) -> LecternResult<()>;

    /// Delete a document; deleting a missing key is a no-op.
    async fn delete(&self, key: &str) -> LecternResult<()>;
}
