//! Signing and submission.
//!
//! - [`Account`] — the entry point: one account, one key, retried submission
//! - [`AccessKeyCache`] — access key records and nonce allocation per key
//! - [`TransactionBuilder`] — assembles and signs a single transaction
//! - [`RetryController`] — bounded, cancellable retry around the builder
//! - [`RpcClient`] — JSON-RPC implementation of [`Connection`]
//!
//! # Credentials
//!
//! | Store | Use Case |
//! |-------|----------|
//! | [`FileKeyStore`] | Load from `~/.near-credentials` (near-cli compatible) |
//! | [`InMemoryKeyStore`] | Keys generated or injected at runtime |
//! | [`Credentials::from_env`] | CI/CD via `NEAR_ACCOUNT_ID` / `NEAR_PRIVATE_KEY` env vars |

mod access_key_cache;
mod account;
mod connection;
mod keystore;
mod retry;
mod rpc;
mod transaction;

pub use access_key_cache::{AccessKeyCache, AccessKeyId};
pub use account::{Account, AccountBuilder};
pub use connection::Connection;
pub use keystore::{CredentialStore, Credentials, FileKeyStore, InMemoryKeyStore};
pub use retry::{CancelToken, RetryConfig, RetryController};
pub use rpc::{MAINNET, NetworkConfig, RpcClient, TESTNET};
pub use transaction::TransactionBuilder;
