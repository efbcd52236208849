//! Bounded retry of transaction submission.
//!
//! Every attempt rebuilds the transaction from scratch, so it carries a fresh
//! nonce and a fresh block hash. Waits between attempts grow geometrically and
//! can be interrupted with a [`CancelToken`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::access_key_cache::AccessKeyCache;
use super::connection::Connection;
use super::keystore::Credentials;
use super::transaction::TransactionBuilder;
use crate::error::{Error, FailureClass, RpcError};
use crate::types::{AccountId, Action, FinalExecutionOutcome};

// ============================================================================
// RetryConfig
// ============================================================================

/// Retry policy for [`RetryController`].
///
/// The defaults allow 12 attempts, waiting 500 ms after the first failure and
/// 1.5 times longer after each one that follows.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Wait after the first failed attempt.
    pub initial_delay_ms: u64,
    /// Multiplier applied to the wait after each further failure.
    pub backoff_factor: f64,
    /// Give up as soon as the node rejects the transaction for a reason a
    /// retry cannot fix.
    pub stop_on_permanent: bool,
    /// Retry when the signing key cannot be resolved.
    pub retry_key_lookup: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 12,
            initial_delay_ms: 500,
            backoff_factor: 1.5,
            stop_on_permanent: false,
            retry_key_lookup: false,
        }
    }
}

impl RetryConfig {
    /// Wait after the failed attempt with zero-based index `attempt`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let millis = self.initial_delay_ms as f64 * self.backoff_factor.powi(exponent);
        Duration::from_micros((millis * 1000.0).round() as u64)
    }

    /// Sum of all waits when every attempt fails. Saturates at [`Duration::MAX`].
    pub fn total_delay(&self) -> Duration {
        (0..self.max_attempts.saturating_sub(1))
            .map(|attempt| self.delay_for_attempt(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".to_string()));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(Error::Config(format!(
                "backoff_factor must be a finite number >= 1.0, got {}",
                self.backoff_factor
            )));
        }
        Ok(())
    }

    fn should_retry(&self, err: &Error) -> bool {
        match err.failure_class() {
            FailureClass::NonceConflict | FailureClass::Transient => true,
            FailureClass::Permanent => !self.stop_on_permanent,
            FailureClass::Fatal => {
                self.retry_key_lookup && matches!(err, Error::KeyLookup { .. })
            }
        }
    }
}

// ============================================================================
// CancelToken
// ============================================================================

/// Signals an in-flight submission to stop retrying.
///
/// Clones share state: cancelling one cancels all. Cancellation takes effect
/// at the next wait between attempts; an attempt already on the wire is not
/// interrupted.
#[derive(Clone, Debug)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // Errors only if the sender is dropped, and `self` owns it.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

// ============================================================================
// RetryController
// ============================================================================

/// Builds, signs and submits a transaction, retrying failed attempts.
pub struct RetryController<'a> {
    credentials: &'a Credentials,
    connection: &'a dyn Connection,
    cache: &'a AccessKeyCache,
    config: &'a RetryConfig,
}

impl<'a> RetryController<'a> {
    pub fn new(
        credentials: &'a Credentials,
        connection: &'a dyn Connection,
        cache: &'a AccessKeyCache,
        config: &'a RetryConfig,
    ) -> Self {
        Self {
            credentials,
            connection,
            cache,
            config,
        }
    }

    /// Submit `actions` to `receiver_id` until the node accepts them or the
    /// attempt ceiling is reached.
    pub async fn submit(
        &self,
        receiver_id: &AccountId,
        actions: Vec<Action>,
    ) -> Result<FinalExecutionOutcome, Error> {
        self.submit_with_cancel(receiver_id, actions, &CancelToken::new())
            .await
    }

    /// Like [`submit`](Self::submit), returning [`Error::Cancelled`] if `cancel`
    /// fires before an attempt starts or during a wait.
    ///
    /// # Errors
    ///
    /// - [`Error::ExhaustedRetries`] once every attempt has failed, carrying the
    ///   last failure
    /// - credential, key lookup and malformed transaction errors, unretried
    /// - a permanent rejection, unretried, when
    ///   [`RetryConfig::stop_on_permanent`] is set
    pub async fn submit_with_cancel(
        &self,
        receiver_id: &AccountId,
        actions: Vec<Action>,
        cancel: &CancelToken,
    ) -> Result<FinalExecutionOutcome, Error> {
        let max_attempts = self.config.max_attempts.max(1);
        let builder = TransactionBuilder::new(self.credentials, self.connection, self.cache);
        let signer_id = self.credentials.account_id();

        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            if attempt > 0 {
                debug!(
                    signer_id = %signer_id,
                    attempt = attempt + 1,
                    max_attempts,
                    "Retrying transaction"
                );
            }

            let err = match self.attempt(&builder, receiver_id, actions.clone()).await {
                Ok(outcome) => {
                    if attempt > 0 {
                        debug!(
                            signer_id = %signer_id,
                            attempts = attempt + 1,
                            "Transaction accepted after retry"
                        );
                    }
                    return Ok(outcome);
                }
                Err(err) => err,
            };

            let class = err.failure_class();
            if !self.config.should_retry(&err) {
                warn!(
                    signer_id = %signer_id,
                    class = ?class,
                    error = %err,
                    "Error is not retryable, giving up"
                );
                return Err(err);
            }

            if let Error::Submission(RpcError::InvalidNonce { ak_nonce, .. }) = &err {
                self.cache
                    .reconcile(signer_id, self.credentials.public_key(), *ak_nonce)
                    .await;
            }

            if attempt + 1 == max_attempts {
                warn!(
                    signer_id = %signer_id,
                    attempts = max_attempts,
                    error = %err,
                    "All retry attempts exhausted"
                );
                return Err(Error::ExhaustedRetries {
                    attempts: max_attempts,
                    last: Box::new(err),
                });
            }

            let backoff = self.config.delay_for_attempt(attempt);
            warn!(
                signer_id = %signer_id,
                attempt = attempt + 1,
                max_attempts,
                class = ?class,
                backoff_ms = backoff.as_millis() as u64,
                error = %err,
                "Attempt failed, backing off before retry"
            );

            tokio::select! {
                _ = sleep(backoff) => {}
                _ = cancel.cancelled() => {
                    debug!(signer_id = %signer_id, "Submission cancelled during backoff");
                    return Err(Error::Cancelled);
                }
            }
            attempt += 1;
        }
    }

    async fn attempt(
        &self,
        builder: &TransactionBuilder<'_>,
        receiver_id: &AccountId,
        actions: Vec<Action>,
    ) -> Result<FinalExecutionOutcome, Error> {
        let (hash, signed) = builder.build(receiver_id, actions).await?;
        let bytes = signed.to_bytes();
        debug!(
            tx_hash = %hash,
            nonce = signed.transaction.nonce,
            size = bytes.len(),
            "Submitting transaction"
        );
        self.connection
            .submit_transaction(&bytes)
            .await
            .map_err(Error::Submission)
    }
}
