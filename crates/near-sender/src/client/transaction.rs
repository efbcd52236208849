//! Transaction assembly and signing.

use tracing::debug;

use super::access_key_cache::AccessKeyCache;
use super::connection::Connection;
use super::keystore::Credentials;
use crate::error::Error;
use crate::types::{AccountId, Action, CryptoHash, SignedTransaction, Transaction};

/// Builds signed transactions for one set of credentials.
///
/// Each call to [`build`](Self::build) claims a fresh nonce from the cache, so
/// two transactions built by the same builder never share a nonce.
pub struct TransactionBuilder<'a> {
    credentials: &'a Credentials,
    connection: &'a dyn Connection,
    cache: &'a AccessKeyCache,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(
        credentials: &'a Credentials,
        connection: &'a dyn Connection,
        cache: &'a AccessKeyCache,
    ) -> Self {
        Self {
            credentials,
            connection,
            cache,
        }
    }

    /// Assemble and sign a transaction to `receiver_id`.
    ///
    /// Resolves the access key, anchors the transaction to the latest final
    /// block, then claims the next nonce. The nonce is claimed last so a failed
    /// block fetch does not burn one.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidTransaction`] if `actions` is empty
    /// - [`Error::KeyLookup`] if the node has no record of the signing key
    /// - [`Error::Build`] if the block fetch or the key query fails
    pub async fn build(
        &self,
        receiver_id: &AccountId,
        actions: Vec<Action>,
    ) -> Result<(CryptoHash, SignedTransaction), Error> {
        if actions.is_empty() {
            return Err(Error::InvalidTransaction(
                "Transaction must have at least one action".to_string(),
            ));
        }

        let signer_id = self.credentials.account_id();
        let public_key = self.credentials.public_key();

        self.cache.get(self.connection, signer_id, public_key).await?;

        let block = self
            .connection
            .current_block()
            .await
            .map_err(Error::Build)?;

        let nonce = self
            .cache
            .claim_next_nonce(self.connection, signer_id, public_key)
            .await?;

        let tx = Transaction::new(
            signer_id.clone(),
            *public_key,
            nonce,
            receiver_id.clone(),
            block.hash,
            actions,
        );
        let signed = tx.sign(&self.credentials.key_pair().secret_key);
        let hash = signed.get_hash();

        debug!(
            signer_id = %signer_id,
            receiver_id = %receiver_id,
            nonce,
            block_height = block.height,
            tx_hash = %hash,
            "signed transaction"
        );

        Ok((hash, signed))
    }
}
