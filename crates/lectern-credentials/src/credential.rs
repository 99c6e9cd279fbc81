//! Stored credential types.

use chrono::{DateTime, Utc};
use lectern_core::{CredentialId, ProviderId};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a stored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    /// Usable for requests.
    Active,
    /// Kept but excluded from operational resolution.
    Inactive,
}

/// A credential owned by the registry.
///
/// Secret material is a [`SecretString`]: redacted in `Debug` output and
/// exposed only where a transport builds its auth header. Serialization to
/// the store goes through an explicit record conversion, never through this
/// type directly.
#[derive(Debug, Clone)]
pub struct StoredCredential {
    /// Unique generated id.
    pub id: CredentialId,
    /// Provider this credential belongs to.
    pub provider: ProviderId,
    /// User-chosen display name.
    pub name: String,
    /// The secret material itself.
    pub secret: SecretString,
    /// Lifecycle status.
    pub status: CredentialStatus,
    /// When the credential was created.
    pub created_at: DateTime<Utc>,
    /// When the credential last backed a dispatched request.
    pub last_used_at: Option<DateTime<Utc>>,
}

impl StoredCredential {
    /// Create a fresh credential with a generated id.
    #[must_use]
    pub fn new(
        provider: ProviderId,
        name: impl Into<String>,
        secret: SecretString,
        status: CredentialStatus,
    ) -> Self {
        Self {
            id: CredentialId::generate(),
            provider,
            name: name.into(),
            secret,
            status,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    /// Whether the credential may back requests.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == CredentialStatus::Active
    }
}

/// Partial update applied by [`crate::CredentialRegistry::update`].
///
/// `None` fields are left untouched.
#[derive(Debug, Default)]
pub struct CredentialPatch {
    /// New display name.
    pub name: Option<String>,
    /// New secret material.
    pub secret: Option<SecretString>,
    /// New lifecycle status.
    pub status: Option<CredentialStatus>,
}

impl CredentialPatch {
    /// Patch that only renames.
    #[must_use]
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Patch that only rotates the secret.
    #[must_use]
    pub fn rotate_secret(secret: SecretString) -> Self {
        Self {
            secret: Some(secret),
            ..Self::default()
        }
    }

    /// Patch that only changes the status.
    #[must_use]
    pub fn set_status(status: CredentialStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}
