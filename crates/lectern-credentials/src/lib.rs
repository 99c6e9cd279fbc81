//! # Lectern Credentials
//!
//! Multi-credential storage per AI provider, with explicit per-provider
//! selection and alias-aware resolution at request time.
//!
//! Users typically hold one API key per vendor but switch between that
//! vendor's model variants; the registry resolves a usable credential across
//! the variant's whole alias group so a key is never demanded twice. A
//! legacy single-key-per-provider record is upgraded into the registry the
//! first time a store containing one is opened.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod credential;
pub mod document;
pub mod migrate;
pub mod registry;

pub use credential::{CredentialPatch, CredentialStatus, StoredCredential};
pub use document::{CredentialRecord, CredentialsDocument, LegacyKeys};
pub use migrate::{merge_legacy, MIGRATED_CREDENTIAL_NAME};
pub use registry::CredentialRegistry;
