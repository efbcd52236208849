//! The account façade: send, call and delete as one signing identity.

use std::sync::Arc;

use serde::Serialize;

use super::access_key_cache::AccessKeyCache;
use super::connection::Connection;
use super::keystore::{CredentialStore, Credentials};
use super::retry::{CancelToken, RetryConfig, RetryController};
use crate::error::Error;
use crate::types::{AccountId, Action, FinalExecutionOutcome, Gas, NearToken, PublicKey};

/// A NEAR account able to sign and submit transactions.
///
/// Every operation builds a transaction with a fresh nonce, signs it with the
/// account's key and submits it under the account's [`RetryConfig`]. Clones
/// share the connection and the access key cache.
///
/// An accepted transaction whose execution fails on chain is still returned
/// as `Ok`; inspect [`FinalExecutionOutcome::is_failure`].
///
/// ```rust,no_run
/// # use near_sender::*;
/// # async fn example() -> Result<(), Error> {
/// let store = FileKeyStore::new("testnet")?;
/// let rpc = RpcClient::for_network(&TESTNET);
/// let account = Account::from_store(&store, &"alice.testnet".parse()?, rpc)?;
///
/// let outcome = account
///     .send_money(&"bob.testnet".parse()?, NearToken::near(1))
///     .await?;
/// assert!(outcome.is_success());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Account {
    credentials: Credentials,
    connection: Arc<dyn Connection>,
    cache: Arc<AccessKeyCache>,
    retry_config: RetryConfig,
}

impl Account {
    /// Account with the default retry policy and a private cache.
    pub fn new(credentials: Credentials, connection: impl Connection + 'static) -> Self {
        Self {
            credentials,
            connection: Arc::new(connection),
            cache: Arc::new(AccessKeyCache::new()),
            retry_config: RetryConfig::default(),
        }
    }

    pub fn builder(
        credentials: Credentials,
        connection: impl Connection + 'static,
    ) -> AccountBuilder {
        AccountBuilder::new(credentials, Arc::new(connection))
    }

    /// Load credentials for `account_id` from `store`.
    pub fn from_store(
        store: &dyn CredentialStore,
        account_id: &AccountId,
        connection: impl Connection + 'static,
    ) -> Result<Self, Error> {
        Ok(Self::new(store.load(account_id)?, connection))
    }

    pub fn account_id(&self) -> &AccountId {
        self.credentials.account_id()
    }

    pub fn public_key(&self) -> &PublicKey {
        self.credentials.public_key()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn cache(&self) -> &Arc<AccessKeyCache> {
        &self.cache
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry_config
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Transfer `amount` to `receiver_id`.
    pub async fn send_money(
        &self,
        receiver_id: &AccountId,
        amount: NearToken,
    ) -> Result<FinalExecutionOutcome, Error> {
        self.sign_and_send(receiver_id, vec![Action::transfer(amount)])
            .await
    }

    /// Delete this account, sending its remaining balance to `beneficiary_id`.
    pub async fn delete_account(
        &self,
        beneficiary_id: &AccountId,
    ) -> Result<FinalExecutionOutcome, Error> {
        let receiver_id = self.account_id().clone();
        self.sign_and_send(
            &receiver_id,
            vec![Action::delete_account(beneficiary_id.clone())],
        )
        .await
    }

    /// Call `method_name` on `contract_id` with raw argument bytes.
    pub async fn function_call(
        &self,
        contract_id: &AccountId,
        method_name: impl Into<String>,
        args: Vec<u8>,
        gas: Gas,
        deposit: NearToken,
    ) -> Result<FinalExecutionOutcome, Error> {
        self.sign_and_send(
            contract_id,
            vec![Action::function_call(method_name, args, gas, deposit)],
        )
        .await
    }

    /// Call `method_name` on `contract_id` with JSON-encoded arguments.
    pub async fn function_call_json<A: Serialize>(
        &self,
        contract_id: &AccountId,
        method_name: impl Into<String>,
        args: &A,
        gas: Gas,
        deposit: NearToken,
    ) -> Result<FinalExecutionOutcome, Error> {
        let action = Action::function_call_json(method_name, args, gas, deposit)?;
        self.sign_and_send(contract_id, vec![action]).await
    }

    /// Sign and submit an arbitrary list of actions.
    pub async fn sign_and_send(
        &self,
        receiver_id: &AccountId,
        actions: Vec<Action>,
    ) -> Result<FinalExecutionOutcome, Error> {
        self.controller().submit(receiver_id, actions).await
    }

    /// [`sign_and_send`](Self::sign_and_send) that stops retrying once `cancel`
    /// fires.
    pub async fn sign_and_send_with_cancel(
        &self,
        receiver_id: &AccountId,
        actions: Vec<Action>,
        cancel: &CancelToken,
    ) -> Result<FinalExecutionOutcome, Error> {
        self.controller()
            .submit_with_cancel(receiver_id, actions, cancel)
            .await
    }

    fn controller(&self) -> RetryController<'_> {
        RetryController::new(
            &self.credentials,
            self.connection.as_ref(),
            &self.cache,
            &self.retry_config,
        )
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("credentials", &self.credentials)
            .field("retry_config", &self.retry_config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// AccountBuilder
// ============================================================================

/// Fluent configuration for [`Account`].
pub struct AccountBuilder {
    credentials: Credentials,
    connection: Arc<dyn Connection>,
    cache: Option<Arc<AccessKeyCache>>,
    retry_config: RetryConfig,
}

impl AccountBuilder {
    fn new(credentials: Credentials, connection: Arc<dyn Connection>) -> Self {
        Self {
            credentials,
            connection,
            cache: None,
            retry_config: RetryConfig::default(),
        }
    }

    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Share an access key cache with other accounts.
    ///
    /// Accounts signing with the same key must share a cache, or they will
    /// hand out the same nonces.
    pub fn cache(mut self, cache: Arc<AccessKeyCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Fails with [`Error::Config`] if the retry policy is unusable.
    pub fn build(self) -> Result<Account, Error> {
        self.retry_config.validate()?;
        Ok(Account {
            credentials: self.credentials,
            connection: self.connection,
            cache: self.cache.unwrap_or_default(),
            retry_config: self.retry_config,
        })
    }
}
