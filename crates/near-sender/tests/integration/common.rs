//! A scripted in-process node.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use futures::FutureExt;
use futures::future::BoxFuture;
use near_sender::*;

static TRACING: Once = Once::new();

/// Install a fmt subscriber honouring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// How the node answers one submission.
#[derive(Clone, Debug)]
pub enum Reply {
    /// Accept and execute successfully.
    Accept,
    /// Accept, but execution fails on chain.
    ExecutionFailure,
    /// Reject as a stale nonce, reporting the submitted nonce as already used.
    StaleNonce,
    /// Reject with an internal server error.
    Internal,
    /// Reject for lack of funds.
    InsufficientBalance,
}

/// A [`Connection`] that answers from a script and records what it receives.
pub struct ScriptedNode {
    ak_nonce: Option<u64>,
    replies: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    block_failures: AtomicUsize,
    key_failures: AtomicUsize,
    height: AtomicU64,
    key_queries: AtomicUsize,
    submitted: Mutex<Vec<SignedTransaction>>,
}

impl ScriptedNode {
    /// A node whose access key has nonce `ak_nonce` and which accepts everything.
    pub fn new(ak_nonce: u64) -> Self {
        Self {
            ak_nonce: Some(ak_nonce),
            replies: Mutex::new(VecDeque::new()),
            fallback: Reply::Accept,
            block_failures: AtomicUsize::new(0),
            key_failures: AtomicUsize::new(0),
            height: AtomicU64::new(1000),
            key_queries: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// A node that knows nothing about the signing key.
    pub fn without_key() -> Self {
        Self {
            ak_nonce: None,
            ..Self::new(0)
        }
    }

    /// Answer the next submissions with `replies`, in order.
    pub fn script(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.replies.lock().unwrap().extend(replies);
        self
    }

    /// Answer once the script runs out.
    pub fn otherwise(mut self, reply: Reply) -> Self {
        self.fallback = reply;
        self
    }

    /// Fail the next `count` block fetches.
    pub fn failing_blocks(self, count: usize) -> Self {
        self.block_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Time out the first `count` access key queries.
    pub fn failing_key_queries(self, count: usize) -> Self {
        self.key_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn submitted(&self) -> Vec<SignedTransaction> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn submitted_nonces(&self) -> Vec<u64> {
        self.submitted()
            .iter()
            .map(|tx| tx.transaction.nonce)
            .collect()
    }

    pub fn key_queries(&self) -> usize {
        self.key_queries.load(Ordering::SeqCst)
    }

    fn answer(&self, tx: &SignedTransaction) -> Result<FinalExecutionOutcome, RpcError> {
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        let nonce = tx.transaction.nonce;
        match reply {
            Reply::Accept => Ok(outcome(
                tx,
                ExecutionStatus::SuccessValue(String::new()),
            )),
            Reply::ExecutionFailure => Ok(outcome(
                tx,
                ExecutionStatus::Failure(serde_json::json!({
                    "ActionError": { "index": 0, "kind": { "AccountDoesNotExist": {} } }
                })),
            )),
            Reply::StaleNonce => Err(RpcError::InvalidNonce {
                tx_nonce: nonce,
                ak_nonce: nonce,
            }),
            Reply::Internal => Err(RpcError::InternalError("scripted failure".to_string())),
            Reply::InsufficientBalance => Err(RpcError::InsufficientBalance {
                required: "1000000000000000000000000".to_string(),
                available: "0".to_string(),
            }),
        }
    }
}

fn outcome(tx: &SignedTransaction, status: ExecutionStatus) -> FinalExecutionOutcome {
    FinalExecutionOutcome {
        final_execution_status: TxExecutionStatus::ExecutedOptimistic,
        status: Some(status),
        transaction: Some(TransactionView {
            signer_id: tx.transaction.signer_id.clone(),
            public_key: tx.transaction.public_key.to_string(),
            nonce: tx.transaction.nonce,
            receiver_id: tx.transaction.receiver_id.clone(),
            hash: tx.get_hash(),
        }),
        transaction_outcome: None,
        receipts_outcome: Vec::new(),
    }
}

impl Connection for ScriptedNode {
    fn current_block(&self) -> BoxFuture<'_, Result<BlockHeaderView, RpcError>> {
        let failed = self
            .block_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let result = if failed {
            Err(RpcError::network("connection refused", None, true))
        } else {
            let height = self.height.fetch_add(1, Ordering::SeqCst);
            Ok(BlockHeaderView {
                height,
                hash: CryptoHash::hash(&height.to_le_bytes()),
                ..Default::default()
            })
        };
        async move { result }.boxed()
    }

    fn view_access_key<'a>(
        &'a self,
        account_id: &'a AccountId,
        public_key: &'a PublicKey,
    ) -> BoxFuture<'a, Result<AccessKeyView, RpcError>> {
        self.key_queries.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .key_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let result = match self.ak_nonce {
            _ if failed => Err(RpcError::network("request timed out", None, true)),
            Some(nonce) => Ok(AccessKeyView::full_access(nonce)),
            None => Err(RpcError::AccessKeyNotFound {
                account_id: account_id.clone(),
                public_key: *public_key,
            }),
        };
        async move { result }.boxed()
    }

    fn submit_transaction<'a>(
        &'a self,
        signed_transaction: &'a [u8],
    ) -> BoxFuture<'a, Result<FinalExecutionOutcome, RpcError>> {
        async move {
            let tx = SignedTransaction::from_bytes(signed_transaction)
                .map_err(|e| RpcError::ParseError(e.to_string()))?;
            assert!(tx.verify(), "node received a badly signed transaction");
            let result = self.answer(&tx);
            self.submitted.lock().unwrap().push(tx);
            result
        }
        .boxed()
    }
}

pub fn alice_credentials() -> Credentials {
    Credentials::new(
        "alice.test".parse().unwrap(),
        SecretKey::ed25519_from_bytes([42u8; 32]),
    )
}

pub fn bob() -> AccountId {
    "bob.test".parse().unwrap()
}

/// Account for alice whose cache already holds `cached_nonce`.
pub async fn alice_with_cached_nonce(
    node: Arc<ScriptedNode>,
    cached_nonce: u64,
    retry_config: RetryConfig,
) -> Account {
    let credentials = alice_credentials();
    let cache = Arc::new(AccessKeyCache::new());
    cache
        .insert(
            credentials.account_id(),
            credentials.public_key(),
            AccessKeyView::full_access(cached_nonce),
        )
        .await;

    Account::builder(credentials, node)
        .cache(cache)
        .retry_config(retry_config)
        .build()
        .unwrap()
}
