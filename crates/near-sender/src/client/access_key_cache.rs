//! Per-account access key cache.
//!
//! Holds the node's view of each (account, public key) pair and hands out
//! nonces from it. The node is queried once per key; afterwards nonces are
//! advanced locally. Each entry has its own async mutex, so concurrent claims
//! for one key are serialized while different keys never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use super::connection::Connection;
use crate::error::{Error, RpcError};
use crate::types::{AccessKeyView, AccountId, PublicKey};

/// Cache key: one access key of one account.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AccessKeyId {
    pub account_id: AccountId,
    pub public_key: PublicKey,
}

impl AccessKeyId {
    pub fn new(account_id: AccountId, public_key: PublicKey) -> Self {
        Self {
            account_id,
            public_key,
        }
    }
}

type Slot = Arc<AsyncMutex<Option<AccessKeyView>>>;

/// Cache of access key records, keyed by [`AccessKeyId`].
#[derive(Debug, Default)]
pub struct AccessKeyCache {
    entries: Mutex<HashMap<AccessKeyId, Slot>>,
}

impl AccessKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The entry's slot, created empty on first use. The map lock is held only
    /// for the lookup, never across an await.
    fn slot(&self, id: &AccessKeyId) -> Slot {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.entry(id.clone()).or_default().clone()
    }

    fn existing_slot(&self, id: &AccessKeyId) -> Option<Slot> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    async fn fetch(connection: &dyn Connection, id: &AccessKeyId) -> Result<AccessKeyView, Error> {
        debug!(account_id = %id.account_id, public_key = %id.public_key, "fetching access key");
        let view = connection
            .view_access_key(&id.account_id, &id.public_key)
            .await
            .map_err(|source| {
                if source.is_not_found() || matches!(source, RpcError::InvalidAccount(_)) {
                    Error::KeyLookup {
                        account_id: id.account_id.clone(),
                        public_key: id.public_key,
                        source,
                    }
                } else {
                    Error::Build(source)
                }
            })?;
        debug!(
            account_id = %id.account_id,
            nonce = view.nonce,
            block_height = view.block_height,
            "access key fetched"
        );
        Ok(view)
    }

    /// Cached record for the key, querying the node on a miss.
    ///
    /// Fails with [`Error::KeyLookup`] if the node has no such key or account,
    /// and with [`Error::Build`] if the query itself fails.
    pub async fn get(
        &self,
        connection: &dyn Connection,
        account_id: &AccountId,
        public_key: &PublicKey,
    ) -> Result<AccessKeyView, Error> {
        let id = AccessKeyId::new(account_id.clone(), *public_key);
        let slot = self.slot(&id);
        let mut entry = slot.lock().await;

        if let Some(view) = entry.as_ref() {
            debug!(account_id = %account_id, nonce = view.nonce, "access key cache hit");
            return Ok(view.clone());
        }

        let view = Self::fetch(connection, &id).await?;
        *entry = Some(view.clone());
        Ok(view)
    }

    /// Prime the cache with a known record, replacing any existing one.
    pub async fn insert(&self, account_id: &AccountId, public_key: &PublicKey, view: AccessKeyView) {
        let id = AccessKeyId::new(account_id.clone(), *public_key);
        *self.slot(&id).lock().await = Some(view);
    }

    /// Increment the cached nonce and return it. Local only.
    ///
    /// Returns `None` if nothing is cached for the key.
    pub async fn advance_nonce(&self, account_id: &AccountId, public_key: &PublicKey) -> Option<u64> {
        let id = AccessKeyId::new(account_id.clone(), *public_key);
        let slot = self.existing_slot(&id)?;
        let mut entry = slot.lock().await;
        let view = entry.as_mut()?;
        view.nonce += 1;
        Some(view.nonce)
    }

    /// Resolve the key (querying the node if needed) and advance its nonce under
    /// one lock. The first claim for a fresh key is the node's nonce plus one.
    pub async fn claim_next_nonce(
        &self,
        connection: &dyn Connection,
        account_id: &AccountId,
        public_key: &PublicKey,
    ) -> Result<u64, Error> {
        let id = AccessKeyId::new(account_id.clone(), *public_key);
        let slot = self.slot(&id);
        let mut entry = slot.lock().await;

        let mut view = match entry.take() {
            Some(view) => view,
            None => Self::fetch(connection, &id).await?,
        };
        view.nonce += 1;
        let nonce = view.nonce;
        *entry = Some(view);
        debug!(account_id = %account_id, nonce, "claimed nonce");
        Ok(nonce)
    }

    /// Drop the entry so the next use queries the node.
    pub fn invalidate(&self, account_id: &AccountId, public_key: &PublicKey) {
        let id = AccessKeyId::new(account_id.clone(), *public_key);
        let removed = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if removed.is_some() {
            debug!(account_id = %account_id, public_key = %public_key, "access key invalidated");
        }
    }

    /// Raise the cached nonce to at least `ak_nonce`, as reported by a nonce
    /// conflict. Never lowers it. Returns the resulting cached nonce, or `None`
    /// if nothing is cached.
    pub async fn reconcile(
        &self,
        account_id: &AccountId,
        public_key: &PublicKey,
        ak_nonce: u64,
    ) -> Option<u64> {
        let id = AccessKeyId::new(account_id.clone(), *public_key);
        let slot = self.existing_slot(&id)?;
        let mut entry = slot.lock().await;
        let view = entry.as_mut()?;
        if ak_nonce > view.nonce {
            debug!(
                account_id = %account_id,
                cached = view.nonce,
                ak_nonce,
                "raising cached nonce after conflict"
            );
            view.nonce = ak_nonce;
        }
        Some(view.nonce)
    }

    /// Currently cached nonce, without querying the node.
    pub async fn cached_nonce(&self, account_id: &AccountId, public_key: &PublicKey) -> Option<u64> {
        let id = AccessKeyId::new(account_id.clone(), *public_key);
        let slot = self.existing_slot(&id)?;
        let entry = slot.lock().await;
        entry.as_ref().map(|view| view.nonce)
    }
}
