//! The credential registry and its operational-credential resolution.

use crate::credential::{CredentialPatch, CredentialStatus, StoredCredential};
use crate::document::{CredentialRecord, CredentialsDocument, LegacyKeys};
use crate::migrate::merge_legacy;
use chrono::Utc;
use lectern_core::{CredentialId, LecternError, LecternResult, ProviderCatalog, ProviderId};
use lectern_store::{KvStore, CREDENTIALS_KEY, LEGACY_KEYS_KEY};
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Default)]
struct RegistryState {
    credentials: Vec<StoredCredential>,
    selections: HashMap<ProviderId, CredentialId>,
}

impl RegistryState {
    fn from_document(doc: CredentialsDocument) -> Self {
        Self {
            credentials: doc.credentials.into_iter().map(Into::into).collect(),
            selections: doc.selections,
        }
    }

    fn to_document(&self) -> CredentialsDocument {
        CredentialsDocument {
            credentials: self.credentials.iter().map(CredentialRecord::from).collect(),
            selections: self.selections.clone(),
        }
    }

    fn find(&self, id: CredentialId) -> Option<&StoredCredential> {
        self.credentials.iter().find(|c| c.id == id)
    }
}

/// Owns every stored credential and the per-provider selection state.
///
/// All mutations are atomic read-modify-write under one async lock, and each
/// persists the full credentials document fire-and-forget: a slow disk never
/// blocks a caller's request path.
pub struct CredentialRegistry {
    state: RwLock<RegistryState>,
    catalog: Arc<ProviderCatalog>,
    store: Arc<dyn KvStore>,
}

impl CredentialRegistry {
    /// Open the registry over a store, loading persisted state and applying
    /// the one-time legacy-format migration when a legacy record is present.
    pub async fn open(
        store: Arc<dyn KvStore>,
        catalog: Arc<ProviderCatalog>,
    ) -> LecternResult<Self> {
        let mut document = match store.get(CREDENTIALS_KEY).await? {
            Some(bytes) => serde_json::from_slice::<CredentialsDocument>(&bytes)?,
            None => CredentialsDocument::default(),
        };

        if let Some(bytes) = store.get(LEGACY_KEYS_KEY).await? {
            match serde_json::from_slice::<LegacyKeys>(&bytes) {
                Ok(legacy) => {
                    let (merged, changed) = merge_legacy(&legacy, document);
                    document = merged;
                    if changed {
                        info!(
                            migrated = legacy.len(),
                            "migrated legacy per-provider keys into the registry"
                        );
                        match serde_json::to_vec(&document) {
                            Ok(merged_bytes) => {
                                if let Err(error) = store.put(CREDENTIALS_KEY, merged_bytes).await {
                                    warn!(%error, "could not persist migrated credentials");
                                }
                            }
                            Err(error) => {
                                warn!(%error, "could not serialize migrated credentials");
                            }
                        }
                    }
                    // The merge is idempotent, so deleting after the write is
                    // safe even if a crash lands between the two.
                    if let Err(error) = store.delete(LEGACY_KEYS_KEY).await {
                        warn!(%error, "could not delete legacy key record");
                    }
                }
                Err(error) => {
                    warn!(%error, "ignoring unreadable legacy key record");
                }
            }
        }

        Ok(Self {
            state: RwLock::new(RegistryState::from_document(document)),
            catalog,
            store,
        })
    }

    /// Create a credential. Becomes the provider's selection when none is set.
    pub async fn add(
        &self,
        provider: ProviderId,
        name: impl Into<String>,
        secret: SecretString,
        status: CredentialStatus,
    ) -> LecternResult<StoredCredential> {
        if self.catalog.get(&provider).is_none() {
            return Err(LecternError::unknown_provider(provider.as_str()));
        }

        let mut state = self.state.write().await;
        let credential = StoredCredential::new(provider.clone(), name, secret, status);
        if !state.selections.contains_key(&provider) {
            state.selections.insert(provider, credential.id);
        }
        state.credentials.push(credential.clone());
        self.persist(&state);
        Ok(credential)
    }

    /// Apply a partial update.
    ///
    /// Deactivating a selected credential clears its provider's selection;
    /// the next operational lookup re-resolves.
    pub async fn update(
        &self,
        id: CredentialId,
        patch: CredentialPatch,
    ) -> LecternResult<StoredCredential> {
        let mut state = self.state.write().await;
        let credential = state
            .credentials
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| LecternError::validation(format!("no credential with id {id}")))?;

        if let Some(name) = patch.name {
            credential.name = name;
        }
        if let Some(secret) = patch.secret {
            credential.secret = secret;
        }
        if let Some(status) = patch.status {
            credential.status = status;
        }

        let updated = credential.clone();
        if updated.status == CredentialStatus::Inactive
            && state.selections.get(&updated.provider) == Some(&id)
        {
            state.selections.remove(&updated.provider);
        }
        self.persist(&state);
        Ok(updated)
    }

    /// Remove a credential; clears its provider's selection if it held it.
    /// Removing an unknown id is a no-op.
    pub async fn delete(&self, id: CredentialId) {
        let mut state = self.state.write().await;
        let Some(position) = state.credentials.iter().position(|c| c.id == id) else {
            return;
        };
        let removed = state.credentials.remove(position);
        if state.selections.get(&removed.provider) == Some(&id) {
            state.selections.remove(&removed.provider);
        }
        self.persist(&state);
    }

    /// Set or clear a provider's explicit selection.
    pub async fn select(
        &self,
        provider: &ProviderId,
        credential: Option<CredentialId>,
    ) -> LecternResult<()> {
        let mut state = self.state.write().await;
        match credential {
            None => {
                state.selections.remove(provider);
            }
            Some(id) => {
                let owned_by = state
                    .find(id)
                    .map(|c| c.provider.clone())
                    .ok_or_else(|| {
                        LecternError::validation(format!("no credential with id {id}"))
                    })?;
                if &owned_by != provider {
                    return Err(LecternError::validation(format!(
                        "credential {id} belongs to {owned_by}, not {provider}"
                    )));
                }
                state.selections.insert(provider.clone(), id);
            }
        }
        self.persist(&state);
        Ok(())
    }

    /// Resolve the credential a request for `provider` should use.
    ///
    /// Two tiers: (1) the explicit selection of the provider or of any alias
    /// peer, if active; (2) failing that, when the alias group holds exactly
    /// one active credential, it is auto-selected and persisted as the
    /// convenience default. Users typically hold one key per vendor and
    /// switch model variants freely; re-entering the key per variant is
    /// never demanded.
    pub async fn operational_credential(&self, provider: &ProviderId) -> Option<StoredCredential> {
        let peer_ids = self.peer_ids(provider);
        let mut state = self.state.write().await;

        for peer in &peer_ids {
            if let Some(id) = state.selections.get(peer) {
                if let Some(credential) = state.find(*id) {
                    if credential.is_active() {
                        return Some(credential.clone());
                    }
                }
            }
        }

        let mut actives = state
            .credentials
            .iter()
            .filter(|c| c.is_active() && peer_ids.contains(&c.provider));
        let candidate = actives.next()?.clone();
        if actives.next().is_some() {
            // More than one active key and no explicit choice: refusing to
            // guess keeps the user in control of which key is spent.
            return None;
        }
        drop(actives);

        debug!(
            provider = %provider,
            credential = %candidate.id,
            "auto-selected the only active credential in the alias group"
        );
        state
            .selections
            .insert(candidate.provider.clone(), candidate.id);
        self.persist(&state);
        Some(candidate)
    }

    /// Stamp `last_used_at` on the operational credential.
    ///
    /// Side-effect only: failures are logged and never propagated into the
    /// caller's request path.
    pub async fn record_usage(&self, provider: &ProviderId) {
        let Some(credential) = self.operational_credential(provider).await else {
            debug!(provider = %provider, "no operational credential to stamp");
            return;
        };
        let mut state = self.state.write().await;
        if let Some(stored) = state.credentials.iter_mut().find(|c| c.id == credential.id) {
            stored.last_used_at = Some(Utc::now());
        }
        self.persist(&state);
    }

    /// All credentials, in insertion order.
    pub async fn list(&self) -> Vec<StoredCredential> {
        self.state.read().await.credentials.clone()
    }

    /// Credentials stored for one provider.
    pub async fn list_for_provider(&self, provider: &ProviderId) -> Vec<StoredCredential> {
        self.state
            .read()
            .await
            .credentials
            .iter()
            .filter(|c| &c.provider == provider)
            .cloned()
            .collect()
    }

    /// Look up a credential by id.
    pub async fn get(&self, id: CredentialId) -> Option<StoredCredential> {
        self.state.read().await.find(id).cloned()
    }

    /// The explicit selection for a provider, if any.
    pub async fn selected_id(&self, provider: &ProviderId) -> Option<CredentialId> {
        self.state.read().await.selections.get(provider).copied()
    }

    /// The provider's alias group, the provider itself first. A provider the
    /// catalog does not know forms a group of one.
    fn peer_ids(&self, provider: &ProviderId) -> Vec<ProviderId> {
        let peers = self.catalog.alias_peers(provider);
        if peers.is_empty() {
            vec![provider.clone()]
        } else {
            peers.into_iter().map(|p| p.id.clone()).collect()
        }
    }

    /// Spawn a fire-and-forget write of the full credentials document.
    fn persist(&self, state: &RegistryState) {
        let bytes = match serde_json::to_vec(&state.to_document()) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(%error, "credentials document serialization failed");
                return;
            }
        };
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(error) = store.put(CREDENTIALS_KEY, bytes).await {
                warn!(%error, "credentials document write failed");
            }
        });
    }
}
