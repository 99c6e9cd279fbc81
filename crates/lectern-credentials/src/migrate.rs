//! One-time upgrade from the legacy single-key-per-provider format.

use crate::credential::CredentialStatus;
use crate::document::{CredentialRecord, CredentialsDocument, LegacyKeys};
use chrono::Utc;
use lectern_core::CredentialId;

/// Display name given to credentials synthesized from legacy records.
pub const MIGRATED_CREDENTIAL_NAME: &str = "Imported key";

/// Merge legacy single-key-per-provider records into a registry document.
///
/// Pure and idempotent: a legacy secret already stored for its provider is
/// skipped, so running the merge any number of times yields the same
/// document. Returns the merged document and whether anything changed (the
/// caller persists and deletes the legacy record only when it did).
#[must_use]
pub fn merge_legacy(legacy: &LegacyKeys, mut current: CredentialsDocument) -> (CredentialsDocument, bool) {
    let mut changed = false;

    // Sort for deterministic credential order regardless of map iteration.
    let mut entries: Vec<_> = legacy.iter().collect();
    entries.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));

    for (provider, secret) in entries {
        let already_stored = current
            .credentials
            .iter()
            .any(|c| &c.provider == provider && &c.secret == secret);
        if already_stored {
            continue;
        }

        let record = CredentialRecord {
            id: CredentialId::generate(),
            provider: provider.clone(),
            name: MIGRATED_CREDENTIAL_NAME.to_string(),
            secret: secret.clone(),
            status: CredentialStatus::Active,
            created_at: Utc::now(),
            last_used_at: None,
        };
        if !current.selections.contains_key(provider) {
            current.selections.insert(provider.clone(), record.id);
        }
        current.credentials.push(record);
        changed = true;
    }

    (current, changed)
}
