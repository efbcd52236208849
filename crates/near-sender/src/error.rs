//! Error types for near-sender.
//!
//! # Error Hierarchy
//!
//! - [`Error`](enum@Error) — Main error type, returned by every account operation
//!   - [`CredentialError`] — Malformed or mismatched local credentials (fatal)
//!   - [`RpcError`] — Failures reported by the node or the transport
//!   - [`ParseAccountIdError`], [`ParseAmountError`], [`ParseGasError`],
//!     [`ParseKeyError`], [`ParseHashError`] — Invalid textual input
//!
//! Every error can be classified with [`Error::failure_class`], which is what the
//! retry loop consults to decide whether another attempt is worthwhile.
//!
//! ```rust
//! use near_sender::{Error, FailureClass, RpcError};
//!
//! let err = Error::Submission(RpcError::InvalidNonce { tx_nonce: 7, ak_nonce: 9 });
//! assert_eq!(err.failure_class(), FailureClass::NonceConflict);
//! ```

use thiserror::Error;

use crate::types::{AccountId, PublicKey};

/// Error parsing an account ID.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseAccountIdError {
    #[error("Account ID is empty")]
    Empty,

    #[error("Account ID '{0}' is too long (max 64 characters)")]
    TooLong(String),

    #[error("Account ID '{0}' is too short (min 2 characters for named accounts)")]
    TooShort(String),

    #[error("Account ID '{0}' contains invalid character '{1}'")]
    InvalidChar(String, char),

    #[error("Account ID '{0}' has invalid format")]
    InvalidFormat(String),
}

/// Error parsing a NEAR token amount.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseAmountError {
    #[error("Ambiguous amount '{0}'. Use explicit units like '5 NEAR' or '1000 yocto'")]
    AmbiguousAmount(String),

    #[error("Invalid amount format: '{0}'")]
    InvalidFormat(String),

    #[error("Invalid number in amount: '{0}'")]
    InvalidNumber(String),

    #[error("Amount overflow: value too large")]
    Overflow,
}

/// Error parsing a gas value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseGasError {
    #[error("Invalid gas format: '{0}'. Use '30 Tgas', '5 Ggas', or '1000000 gas'")]
    InvalidFormat(String),

    #[error("Invalid number in gas: '{0}'")]
    InvalidNumber(String),

    #[error("Gas overflow: value too large")]
    Overflow,
}

/// Error parsing a public or secret key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseKeyError {
    #[error("Invalid key format: expected 'ed25519:...'")]
    InvalidFormat,

    #[error("Unknown key type: '{0}'")]
    UnknownKeyType(String),

    #[error("Invalid base58 encoding: {0}")]
    InvalidBase58(String),

    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid curve point: key bytes do not represent a valid point on the curve")]
    InvalidCurvePoint,
}

/// Error parsing a crypto hash.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseHashError {
    #[error("Invalid base58 encoding: {0}")]
    InvalidBase58(String),

    #[error("Invalid hash length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// Error loading or validating local account credentials.
///
/// Credential errors are never retried.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("No credentials found for account: {0}")]
    NotFound(AccountId),

    #[error("Failed to read credentials file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse credentials: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Credential account_id '{found}' does not match requested account '{expected}'")]
    AccountMismatch { expected: AccountId, found: String },

    #[error("Credential {field} '{value}' is not an Ed25519 key")]
    UnsupportedKeyType { field: &'static str, value: String },

    #[error("Public key {public_key} does not match the private key for {account_id}")]
    KeyMismatch {
        account_id: AccountId,
        public_key: PublicKey,
    },

    #[error("Invalid key: {0}")]
    InvalidKey(#[from] ParseKeyError),

    #[error("Invalid account ID: {0}")]
    InvalidAccountId(#[from] ParseAccountIdError),

    #[error("Path error: {0}")]
    PathError(String),
}

// ============================================================================
// RPC Errors
// ============================================================================

/// Errors reported by the node or the transport in front of it.
#[derive(Debug, Error)]
pub enum RpcError {
    // ─── Network/Transport ───
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Network error: {message}")]
    Network {
        message: String,
        status_code: Option<u16>,
        retryable: bool,
    },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    // ─── Generic RPC Error ───
    #[error("RPC error: {message} (code: {code})")]
    Rpc {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    // ─── Account Errors ───
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Invalid account ID: {0}")]
    InvalidAccount(String),

    #[error("Access key not found: {account_id} / {public_key}")]
    AccessKeyNotFound {
        account_id: AccountId,
        public_key: PublicKey,
    },

    // ─── Block Errors ───
    #[error("Block not found: {0}")]
    UnknownBlock(String),

    // ─── Transaction Errors ───
    #[error("Invalid transaction: {message}")]
    InvalidTransaction {
        message: String,
        details: Option<serde_json::Value>,
        shard_congested: bool,
        shard_stuck: bool,
    },

    #[error("Invalid nonce: transaction nonce {tx_nonce} must be greater than access key nonce {ak_nonce}")]
    InvalidNonce { tx_nonce: u64, ak_nonce: u64 },

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: String, available: String },

    #[error("Invalid receiver: {0}")]
    InvalidReceiver(String),

    #[error("Transaction expired: block hash is too old")]
    Expired,

    // ─── Node Errors ───
    #[error("Shard unavailable: {0}")]
    ShardUnavailable(String),

    #[error("Node not synced: {0}")]
    NodeNotSynced(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    // ─── Request Errors ───
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Request timeout: {message}")]
    RequestTimeout {
        message: String,
        transaction_hash: Option<String>,
    },
}

impl RpcError {
    /// Check if this error is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::Http(e) => e.is_timeout() || e.is_connect(),
            RpcError::Network { retryable, .. } => *retryable,
            RpcError::ShardUnavailable(_) => true,
            RpcError::NodeNotSynced(_) => true,
            RpcError::InternalError(_) => true,
            RpcError::RequestTimeout { .. } => true,
            RpcError::InvalidNonce { .. } => true,
            RpcError::Expired => true,
            RpcError::InvalidTransaction {
                shard_congested,
                shard_stuck,
                ..
            } => *shard_congested || *shard_stuck,
            RpcError::Rpc { code, .. } => {
                // Retry on server errors
                *code == -32000 || *code == -32603
            }
            _ => false,
        }
    }

    /// Returns true if the node rejected the transaction because of a stale nonce.
    pub fn is_nonce_conflict(&self) -> bool {
        matches!(self, RpcError::InvalidNonce { .. })
    }

    /// Returns true if the node has no record of the requested account or key.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RpcError::AccountNotFound(_) | RpcError::AccessKeyNotFound { .. }
        )
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>, status_code: Option<u16>, retryable: bool) -> Self {
        RpcError::Network {
            message: message.into(),
            status_code,
            retryable,
        }
    }

    /// Create an invalid transaction error.
    pub fn invalid_transaction(
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        let details_obj = details.as_ref();
        let shard_congested = details_obj
            .and_then(|d| d.get("ShardCongested"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let shard_stuck = details_obj
            .and_then(|d| d.get("ShardStuck"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        RpcError::InvalidTransaction {
            message: message.into(),
            details,
            shard_congested,
            shard_stuck,
        }
    }
}

// ============================================================================
// Failure classification
// ============================================================================

/// How a failure should be treated by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// The node rejected a stale nonce. A rebuild with a fresh nonce resolves it.
    NonceConflict,
    /// A transport or node hiccup that may go away on its own.
    Transient,
    /// The node rejected the transaction for a reason a retry will not change
    /// (insufficient balance, invalid receiver, malformed action).
    Permanent,
    /// A local or configuration problem. Never retried.
    Fatal,
}

impl FailureClass {
    /// Returns true for classes that a fresh rebuild can plausibly fix.
    pub fn is_transient(&self) -> bool {
        matches!(self, FailureClass::NonceConflict | FailureClass::Transient)
    }
}

// ============================================================================
// Main Error Type
// ============================================================================

/// Main error type for near-sender operations.
#[derive(Debug, Error)]
pub enum Error {
    // ─── Credentials ───
    #[error(transparent)]
    Credential(#[from] CredentialError),

    // ─── Access key resolution ───
    #[error("Access key lookup failed for {account_id} / {public_key}: {source}")]
    KeyLookup {
        account_id: AccountId,
        public_key: PublicKey,
        #[source]
        source: RpcError,
    },

    // ─── Transaction assembly ───
    #[error("Failed to build transaction: {0}")]
    Build(#[source] RpcError),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    // ─── Submission ───
    #[error("Transaction rejected: {0}")]
    Submission(#[source] RpcError),

    #[error("Gave up after {attempts} attempts: {last}")]
    ExhaustedRetries { attempts: u32, last: Box<Error> },

    #[error("Operation cancelled")]
    Cancelled,

    // ─── Configuration ───
    #[error("Invalid configuration: {0}")]
    Config(String),

    // ─── Parsing ───
    #[error(transparent)]
    ParseAccountId(#[from] ParseAccountIdError),

    #[error(transparent)]
    ParseAmount(#[from] ParseAmountError),

    #[error(transparent)]
    ParseGas(#[from] ParseGasError),

    #[error(transparent)]
    ParseKey(#[from] ParseKeyError),

    #[error(transparent)]
    ParseHash(#[from] ParseHashError),

    // ─── Serialization ───
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Borsh error: {0}")]
    Borsh(String),
}

impl Error {
    /// Classify this error for retry decisions.
    pub fn failure_class(&self) -> FailureClass {
        match self {
            Error::Build(_) => FailureClass::Transient,
            Error::Submission(e) if e.is_nonce_conflict() => FailureClass::NonceConflict,
            Error::Submission(e) if e.is_retryable() => FailureClass::Transient,
            Error::Submission(_) => FailureClass::Permanent,
            Error::ExhaustedRetries { last, .. } => last.failure_class(),
            _ => FailureClass::Fatal,
        }
    }

    /// Returns true if the node rejected the transaction because of a stale nonce.
    pub fn is_nonce_conflict(&self) -> bool {
        self.failure_class() == FailureClass::NonceConflict
    }

    /// Returns true if retrying cannot change the outcome.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self.failure_class(),
            FailureClass::Permanent | FailureClass::Fatal
        )
    }

    /// The underlying RPC error, if this failure came from the node.
    pub fn rpc_error(&self) -> Option<&RpcError> {
        match self {
            Error::KeyLookup { source, .. } => Some(source),
            Error::Build(e) | Error::Submission(e) => Some(e),
            Error::ExhaustedRetries { last, .. } => last.rpc_error(),
            _ => None,
        }
    }
}
