//! # Lectern Store
//!
//! The durable key-value store the governor persists its state through.
//!
//! The original editor kept registry and bucket state in a browser-local
//! key-value store behind an in-process singleton. Here the store is an
//! injected trait object with explicit open/teardown: the governor works
//! against [`KvStore`] and never a global. Two implementations ship:
//! [`JsonFileStore`] for real deployments and [`MemoryStore`] for tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod file;
pub mod memory;
pub mod store;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use store::{KvStore, BUCKETS_KEY, CREDENTIALS_KEY, LEGACY_KEYS_KEY};
