//! Core types: identifiers, keys, amounts, actions, transactions and RPC views.

mod account;
mod action;
mod finality;
mod hash;
mod key;
mod network;
mod rpc;
mod transaction;
mod units;

pub use account::AccountId;
pub use action::{
    AccessKey, AccessKeyPermission, Action, AddKeyAction, CreateAccountAction,
    DeleteAccountAction, DeleteKeyAction, DeployContractAction, FunctionCallAction,
    FunctionCallPermission, StakeAction, TransferAction,
};
pub use finality::{Finality, TxExecutionStatus};
pub use hash::CryptoHash;
pub use key::{ED25519_PREFIX, KeyPair, KeyType, PublicKey, SecretKey, Signature};
pub use network::Network;
pub use rpc::{
    AccessKeyPermissionView, AccessKeyView, BlockHeaderView, BlockView, ExecutionOutcome,
    ExecutionOutcomeWithId, ExecutionStatus, FinalExecutionOutcome, TransactionView,
};
pub use transaction::{SignedTransaction, Transaction};
pub use units::{Gas, NearToken};
