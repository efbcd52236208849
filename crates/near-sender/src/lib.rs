//! Account-centric transaction signing for NEAR Protocol.
//!
//! **near-sender** turns "send this from that account" into a signed, submitted
//! and confirmed transaction. It tracks access key nonces per key, anchors every
//! transaction to a recent final block, and retries failed submissions with
//! geometric backoff.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use near_sender::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), near_sender::Error> {
//!     let account = Account::new(
//!         Credentials::from_env()?,
//!         RpcClient::for_network(&TESTNET),
//!     );
//!
//!     let outcome = account
//!         .send_money(&"bob.testnet".parse()?, "1.5 NEAR".parse()?)
//!         .await?;
//!     println!("{:?}", outcome.transaction_hash());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Core Types
//!
//! - [`AccountId`] - Validated NEAR account identifier
//! - [`NearToken`] - NEAR token amount with yoctoNEAR precision
//! - [`Gas`] - Gas units for function calls
//! - [`PublicKey`], [`SecretKey`] - Ed25519 keys in `ed25519:` base58 form
//! - [`Action`] - One of the eight transaction actions
//! - [`Transaction`], [`SignedTransaction`] - Borsh wire types
//!
//! # Failures
//!
//! Every failure is an [`Error`]. [`Error::failure_class`] sorts node
//! rejections into nonce conflicts, transient faults, and permanent rejections;
//! [`RetryConfig`] decides which of them are retried.
//!
//! ```
//! use near_sender::{Error, FailureClass, RpcError};
//!
//! let err = Error::Submission(RpcError::InsufficientBalance {
//!     required: "10".to_string(),
//!     available: "1".to_string(),
//! });
//! assert_eq!(err.failure_class(), FailureClass::Permanent);
//! ```

pub mod client;
pub mod error;
pub mod types;

pub use error::{CredentialError, Error, FailureClass, RpcError};
pub use types::*;

pub use client::{
    AccessKeyCache, AccessKeyId, Account, AccountBuilder, CancelToken, Connection,
    CredentialStore, Credentials, FileKeyStore, InMemoryKeyStore, MAINNET, NetworkConfig,
    RetryConfig, RetryController, RpcClient, TESTNET, TransactionBuilder,
};
