//! Typed RPC results, decoded at the connection boundary.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Deserialize;

use super::{AccountId, CryptoHash, Gas, NearToken, TxExecutionStatus};

// ============================================================================
// Access keys
// ============================================================================

/// The node's record for one (account, public key) pair, from `view_access_key`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessKeyView {
    /// Highest nonce the node has accepted for this key.
    pub nonce: u64,
    pub permission: AccessKeyPermissionView,
    /// Height at which the record was read.
    #[serde(default)]
    pub block_height: u64,
    #[serde(default)]
    pub block_hash: CryptoHash,
}

impl AccessKeyView {
    /// A full-access record with the given nonce.
    pub fn full_access(nonce: u64) -> Self {
        Self {
            nonce,
            permission: AccessKeyPermissionView::FullAccess,
            block_height: 0,
            block_hash: CryptoHash::ZERO,
        }
    }

    pub fn is_full_access(&self) -> bool {
        matches!(self.permission, AccessKeyPermissionView::FullAccess)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum AccessKeyPermissionView {
    FullAccess,
    FunctionCall {
        allowance: Option<NearToken>,
        receiver_id: AccountId,
        /// Empty means any method.
        method_names: Vec<String>,
    },
}

// ============================================================================
// Blocks
// ============================================================================

/// Response of the `block` method. Only the header is decoded.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockView {
    pub author: AccountId,
    pub header: BlockHeaderView,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BlockHeaderView {
    pub height: u64,
    pub hash: CryptoHash,
    #[serde(default)]
    pub prev_hash: CryptoHash,
    /// Nanoseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub epoch_id: CryptoHash,
}

// ============================================================================
// Transaction outcomes
// ============================================================================

/// Response of `send_tx`.
///
/// An accepted transaction whose execution failed still decodes into this
/// type; check [`is_failure`](Self::is_failure).
#[derive(Debug, Clone, Deserialize)]
pub struct FinalExecutionOutcome {
    #[serde(default)]
    pub final_execution_status: TxExecutionStatus,
    /// Overall status, present once execution has happened.
    #[serde(default)]
    pub status: Option<ExecutionStatus>,
    #[serde(default)]
    pub transaction: Option<TransactionView>,
    #[serde(default)]
    pub transaction_outcome: Option<ExecutionOutcomeWithId>,
    #[serde(default)]
    pub receipts_outcome: Vec<ExecutionOutcomeWithId>,
}

impl FinalExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            &self.status,
            Some(ExecutionStatus::SuccessValue(_) | ExecutionStatus::SuccessReceiptId(_))
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(&self.status, Some(ExecutionStatus::Failure(_)))
    }

    /// Base64-decoded return value of a successful call.
    pub fn success_value(&self) -> Option<Vec<u8>> {
        match &self.status {
            Some(ExecutionStatus::SuccessValue(s)) => STANDARD.decode(s).ok(),
            _ => None,
        }
    }

    pub fn success_value_json<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        self.success_value()
            .and_then(|v| serde_json::from_slice(&v).ok())
    }

    /// JSON text of the execution error, if execution failed.
    pub fn failure_message(&self) -> Option<String> {
        match &self.status {
            Some(ExecutionStatus::Failure(err)) => Some(err.to_string()),
            _ => None,
        }
    }

    pub fn transaction_hash(&self) -> Option<&CryptoHash> {
        self.transaction
            .as_ref()
            .map(|t| &t.hash)
            .or_else(|| self.transaction_outcome.as_ref().map(|o| &o.id))
    }

    /// Nonce of the transaction as reported by the node.
    pub fn nonce(&self) -> Option<u64> {
        self.transaction.as_ref().map(|t| t.nonce)
    }

    pub fn total_gas_used(&self) -> Gas {
        let burnt = self
            .transaction_outcome
            .iter()
            .chain(self.receipts_outcome.iter())
            .map(|o| o.outcome.gas_burnt.as_gas())
            .sum();
        Gas::from_gas(burnt)
    }

    /// All log lines from the transaction and its receipts, in order.
    pub fn logs(&self) -> Vec<&str> {
        self.transaction_outcome
            .iter()
            .chain(self.receipts_outcome.iter())
            .flat_map(|o| o.outcome.logs.iter().map(String::as_str))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub enum ExecutionStatus {
    Unknown,
    Pending,
    /// Structured `TxExecutionError` as returned by the node.
    Failure(serde_json::Value),
    /// Base64-encoded return value.
    SuccessValue(String),
    SuccessReceiptId(CryptoHash),
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionView {
    pub signer_id: AccountId,
    pub public_key: String,
    pub nonce: u64,
    pub receiver_id: AccountId,
    pub hash: CryptoHash,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionOutcomeWithId {
    pub id: CryptoHash,
    pub outcome: ExecutionOutcome,
    #[serde(default)]
    pub block_hash: CryptoHash,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionOutcome {
    pub executor_id: AccountId,
    pub gas_burnt: Gas,
    pub tokens_burnt: NearToken,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub receipt_ids: Vec<CryptoHash>,
    pub status: ExecutionStatus,
}
