//! Persisted form of the registry.
//!
//! [`StoredCredential`] keeps its secret behind [`secrecy::SecretString`],
//! which deliberately does not serialize; writing to the store goes through
//! these record types, making every exposure of secret material explicit.

use crate::credential::{CredentialStatus, StoredCredential};
use chrono::{DateTime, Utc};
use lectern_core::{CredentialId, ProviderId};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One credential as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Unique id.
    pub id: CredentialId,
    /// Owning provider.
    pub provider: ProviderId,
    /// Display name.
    pub name: String,
    /// Secret material, in the clear inside the store document.
    pub secret: String,
    /// Lifecycle status.
    pub status: CredentialStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last dispatch that used this credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<&StoredCredential> for CredentialRecord {
    fn from(credential: &StoredCredential) -> Self {
        Self {
            id: credential.id,
            provider: credential.provider.clone(),
            name: credential.name.clone(),
            secret: credential.secret.expose_secret().clone(),
            status: credential.status,
            created_at: credential.created_at,
            last_used_at: credential.last_used_at,
        }
    }
}

impl From<CredentialRecord> for StoredCredential {
    fn from(record: CredentialRecord) -> Self {
        Self {
            id: record.id,
            provider: record.provider,
            name: record.name,
            secret: SecretString::new(record.secret),
            status: record.status,
            created_at: record.created_at,
            last_used_at: record.last_used_at,
        }
    }
}

/// The credentials/settings document: every stored credential plus the
/// provider → credential selection map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialsDocument {
    /// Stored credentials, in insertion order.
    #[serde(default)]
    pub credentials: Vec<CredentialRecord>,
    /// Explicit per-provider selection.
    #[serde(default)]
    pub selections: HashMap<ProviderId, CredentialId>,
}

/// The legacy single-key-per-provider document consumed by the one-time
/// migration: a bare provider → secret map.
pub type LegacyKeys = HashMap<ProviderId, String>;
