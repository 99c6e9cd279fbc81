//! In-memory store for tests and ephemeral sessions.

use crate::store::KvStore;
use async_trait::async_trait;
use dashmap::DashMap;
use lectern_core::LecternResult;

/// A `KvStore` backed by a concurrent in-process map.
///
/// State dies with the process; used by tests and by callers that
/// explicitly opt out of persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<String, Vec<u8>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> LecternResult<Option<Vec<u8>>> {
        Ok(self.documents.get(key).map(|v| v.clone()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> LecternResult<()> {
        self.documents.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> LecternResult<()> {
        self.documents.remove(key);
        Ok(())
    }
}
