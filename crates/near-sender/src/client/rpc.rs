//! JSON-RPC client for NEAR nodes.
//!
//! Each call is a single HTTP attempt. Retrying belongs to the
//! [`RetryController`](crate::RetryController), which rebuilds the transaction
//! between attempts instead of replaying the same request.

use std::sync::atomic::{AtomicU64, Ordering};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::connection::Connection;
use crate::error::RpcError;
use crate::types::{
    AccessKeyView, AccountId, BlockHeaderView, BlockView, Finality, FinalExecutionOutcome,
    Network, PublicKey, TxExecutionStatus,
};

/// Network configuration presets.
#[derive(Clone, Debug)]
pub struct NetworkConfig {
    pub rpc_url: &'static str,
    pub network_id: &'static str,
}

impl NetworkConfig {
    pub fn network(&self) -> Network {
        Network::from(self.network_id)
    }
}

/// Mainnet configuration.
pub const MAINNET: NetworkConfig = NetworkConfig {
    rpc_url: "https://free.rpc.fastnear.com",
    network_id: "mainnet",
};

/// Testnet configuration.
pub const TESTNET: NetworkConfig = NetworkConfig {
    rpc_url: "https://test.rpc.fastnear.com",
    network_id: "testnet",
};

#[derive(Serialize)]
struct JsonRpcRequest<'a, P: Serialize> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

/// NEAR returns structured errors with a name/cause/info pattern.
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    cause: Option<ErrorCause>,
}

#[derive(Debug, Deserialize)]
struct ErrorCause {
    name: String,
    #[serde(default)]
    info: Option<serde_json::Value>,
}

/// Older nodes report a missing key inside a successful `query` result.
#[derive(Deserialize)]
#[serde(untagged)]
enum QueryResult<T> {
    Error { error: String },
    Ok(T),
}

/// Low-level JSON-RPC client.
pub struct RpcClient {
    url: String,
    client: reqwest::Client,
    wait_until: TxExecutionStatus,
    request_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            wait_until: TxExecutionStatus::default(),
            request_id: AtomicU64::new(0),
        }
    }

    /// Client for one of the preset networks.
    pub fn for_network(config: &NetworkConfig) -> Self {
        Self::new(config.rpc_url)
    }

    /// How far `send_tx` waits before returning. Defaults to `EXECUTED_OPTIMISTIC`.
    pub fn wait_until(mut self, status: TxExecutionStatus) -> Self {
        self.wait_until = status;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Make a raw RPC call.
    pub async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!(method, id = request.id, url = %self.url, "rpc request");

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(RpcError::network(
                format!("HTTP {}: {}", status, body),
                Some(status.as_u16()),
                is_retryable_status(status.as_u16()),
            ));
        }

        let rpc_response: JsonRpcResponse<R> = serde_json::from_str(&body)?;
        if let Some(error) = rpc_response.error {
            let err = parse_rpc_error(&error);
            debug!(method, error = %err, "rpc error");
            return Err(err);
        }

        rpc_response
            .result
            .ok_or_else(|| RpcError::InvalidResponse("Missing result in response".to_string()))
    }

    /// Latest block at the given finality.
    pub async fn block(&self, finality: Finality) -> Result<BlockView, RpcError> {
        self.call("block", finality.to_rpc_params()).await
    }

    /// `query` with `request_type: view_access_key` at final finality.
    pub async fn view_access_key(
        &self,
        account_id: &AccountId,
        public_key: &PublicKey,
    ) -> Result<AccessKeyView, RpcError> {
        let params = serde_json::json!({
            "request_type": "view_access_key",
            "finality": Finality::Final.as_str(),
            "account_id": account_id.as_str(),
            "public_key": public_key.to_string(),
        });

        match self.call::<_, QueryResult<AccessKeyView>>("query", params).await? {
            QueryResult::Ok(view) => Ok(view),
            QueryResult::Error { error } if error.contains("does not exist") => {
                Err(RpcError::AccessKeyNotFound {
                    account_id: account_id.clone(),
                    public_key: *public_key,
                })
            }
            QueryResult::Error { error } => Err(RpcError::InvalidResponse(error)),
        }
    }

    /// `send_tx` with the base64 borsh payload.
    pub async fn send_tx(&self, signed_tx: &[u8]) -> Result<FinalExecutionOutcome, RpcError> {
        let params = serde_json::json!({
            "signed_tx_base64": STANDARD.encode(signed_tx),
            "wait_until": self.wait_until.as_str(),
        });
        self.call("send_tx", params).await
    }
}

impl Connection for RpcClient {
    fn current_block(&self) -> BoxFuture<'_, Result<BlockHeaderView, RpcError>> {
        async move { self.block(Finality::Final).await.map(|block| block.header) }.boxed()
    }

    fn view_access_key<'a>(
        &'a self,
        account_id: &'a AccountId,
        public_key: &'a PublicKey,
    ) -> BoxFuture<'a, Result<AccessKeyView, RpcError>> {
        RpcClient::view_access_key(self, account_id, public_key).boxed()
    }

    fn submit_transaction<'a>(
        &'a self,
        signed_transaction: &'a [u8],
    ) -> BoxFuture<'a, Result<FinalExecutionOutcome, RpcError>> {
        self.send_tx(signed_transaction).boxed()
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("url", &self.url)
            .field("wait_until", &self.wait_until)
            .finish()
    }
}

// ============================================================================
// Error mapping
// ============================================================================

fn info_str<'a>(info: Option<&'a serde_json::Value>, key: &str) -> Option<&'a str> {
    info.and_then(|i| i.get(key)).and_then(|v| v.as_str())
}

/// Map a structured JSON-RPC error onto a typed [`RpcError`].
fn parse_rpc_error(error: &JsonRpcError) -> RpcError {
    if let Some(cause) = &error.cause {
        let info = cause.info.as_ref();
        let data = &error.data;

        match cause.name.as_str() {
            "UNKNOWN_ACCOUNT" => {
                if let Some(Ok(account_id)) =
                    info_str(info, "requested_account_id").map(str::parse::<AccountId>)
                {
                    return RpcError::AccountNotFound(account_id);
                }
            }
            "INVALID_ACCOUNT" => {
                let account_id = info_str(info, "requested_account_id").unwrap_or("unknown");
                return RpcError::InvalidAccount(account_id.to_string());
            }
            "UNKNOWN_ACCESS_KEY" => {
                if let (Some(Ok(account_id)), Some(Ok(public_key))) = (
                    info_str(info, "requested_account_id").map(str::parse::<AccountId>),
                    info_str(info, "public_key").map(str::parse::<PublicKey>),
                ) {
                    return RpcError::AccessKeyNotFound {
                        account_id,
                        public_key,
                    };
                }
            }
            "UNKNOWN_BLOCK" => {
                let block_ref = data
                    .as_ref()
                    .and_then(|d| d.as_str())
                    .unwrap_or(&error.message);
                return RpcError::UnknownBlock(block_ref.to_string());
            }
            "UNAVAILABLE_SHARD" => return RpcError::ShardUnavailable(error.message.clone()),
            "NO_SYNCED_BLOCKS" | "NOT_SYNCED_YET" => {
                return RpcError::NodeNotSynced(error.message.clone());
            }
            "INVALID_TRANSACTION" => {
                if let Some(err) = data.as_ref().and_then(parse_invalid_tx_error) {
                    return err;
                }
                return RpcError::invalid_transaction(&error.message, data.clone());
            }
            "TIMEOUT_ERROR" => {
                return RpcError::RequestTimeout {
                    message: error.message.clone(),
                    transaction_hash: info_str(info, "transaction_hash").map(String::from),
                };
            }
            "PARSE_ERROR" => return RpcError::ParseError(error.message.clone()),
            "INTERNAL_ERROR" => return RpcError::InternalError(error.message.clone()),
            _ => {}
        }
    }

    RpcError::Rpc {
        code: error.code,
        message: error.message.clone(),
        data: error.data.clone(),
    }
}

/// Check if an HTTP status code is retryable.
fn is_retryable_status(status: u16) -> bool {
    // 408 Request Timeout, 429 Too Many Requests, 5xx
    status == 408 || status == 429 || (500..600).contains(&status)
}

/// Decode `TxExecutionError.InvalidTxError.*` into the variants the retry loop cares about.
fn parse_invalid_tx_error(data: &serde_json::Value) -> Option<RpcError> {
    let invalid_tx = data
        .get("TxExecutionError")
        .and_then(|e| e.get("InvalidTxError"))
        .or_else(|| data.get("InvalidTxError"))?;

    if invalid_tx.as_str() == Some("Expired") {
        return Some(RpcError::Expired);
    }

    if let Some(nonce) = invalid_tx.get("InvalidNonce") {
        let ak_nonce = nonce.get("ak_nonce")?.as_u64()?;
        let tx_nonce = nonce.get("tx_nonce")?.as_u64()?;
        return Some(RpcError::InvalidNonce { tx_nonce, ak_nonce });
    }

    if let Some(balance) = invalid_tx.get("NotEnoughBalance") {
        let field = |key: &str| {
            balance
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string()
        };
        return Some(RpcError::InsufficientBalance {
            required: field("cost"),
            available: field("balance"),
        });
    }

    if let Some(receiver) = invalid_tx.get("InvalidReceiverId") {
        let receiver_id = receiver
            .get("receiver_id")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        return Some(RpcError::InvalidReceiver(receiver_id.to_string()));
    }

    None
}
