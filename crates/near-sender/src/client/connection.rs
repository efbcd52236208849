//! The narrow view of a NEAR node that signing and submission need.
//!
//! [`RpcClient`](crate::RpcClient) implements this over JSON-RPC. Tests implement
//! it with scripted stubs.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::RpcError;
use crate::types::{AccessKeyView, AccountId, BlockHeaderView, FinalExecutionOutcome, PublicKey};

/// A connection to a NEAR node.
///
/// Implementations must be shareable across tasks; an [`Account`](crate::Account)
/// holds one as `Arc<dyn Connection>`.
pub trait Connection: Send + Sync {
    /// Header of the latest final block. Its hash anchors new transactions.
    fn current_block(&self) -> BoxFuture<'_, Result<BlockHeaderView, RpcError>>;

    /// The node's record for an access key.
    ///
    /// Returns [`RpcError::AccessKeyNotFound`] or [`RpcError::AccountNotFound`]
    /// when the node has no such key.
    fn view_access_key<'a>(
        &'a self,
        account_id: &'a AccountId,
        public_key: &'a PublicKey,
    ) -> BoxFuture<'a, Result<AccessKeyView, RpcError>>;

    /// Submit a borsh-encoded signed transaction and wait for its outcome.
    ///
    /// A stale nonce is reported as [`RpcError::InvalidNonce`].
    fn submit_transaction<'a>(
        &'a self,
        signed_transaction: &'a [u8],
    ) -> BoxFuture<'a, Result<FinalExecutionOutcome, RpcError>>;
}

impl<C: Connection + ?Sized> Connection for Arc<C> {
    fn current_block(&self) -> BoxFuture<'_, Result<BlockHeaderView, RpcError>> {
        (**self).current_block()
    }

    fn view_access_key<'a>(
        &'a self,
        account_id: &'a AccountId,
        public_key: &'a PublicKey,
    ) -> BoxFuture<'a, Result<AccessKeyView, RpcError>> {
        (**self).view_access_key(account_id, public_key)
    }

    fn submit_transaction<'a>(
        &'a self,
        signed_transaction: &'a [u8],
    ) -> BoxFuture<'a, Result<FinalExecutionOutcome, RpcError>> {
        (**self).submit_transaction(signed_transaction)
    }
}
