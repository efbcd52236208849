//! Finality and execution wait levels used in RPC requests.

use serde::{Deserialize, Serialize};

/// Block finality requested when reading chain state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finality {
    Optimistic,
    #[serde(rename = "near-final")]
    NearFinal,
    #[default]
    Final,
}

impl Finality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Finality::Optimistic => "optimistic",
            Finality::NearFinal => "near-final",
            Finality::Final => "final",
        }
    }

    pub(crate) fn to_rpc_params(self) -> serde_json::Value {
        serde_json::json!({ "finality": self.as_str() })
    }
}

/// How far a transaction must progress before `send_tx` returns.
///
/// `ExecutedOptimistic` (the default) waits for the transaction and all its
/// receipts to execute, which is what callers expect from a blocking send.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxExecutionStatus {
    /// Return as soon as the transaction is validated.
    None,
    Included,
    #[default]
    ExecutedOptimistic,
    IncludedFinal,
    Executed,
    Final,
}

impl TxExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Included => "INCLUDED",
            Self::ExecutedOptimistic => "EXECUTED_OPTIMISTIC",
            Self::IncludedFinal => "INCLUDED_FINAL",
            Self::Executed => "EXECUTED",
            Self::Final => "FINAL",
        }
    }

    /// Returns true if the node will include execution outcomes in its reply.
    pub fn waits_for_execution(&self) -> bool {
        matches!(
            self,
            Self::ExecutedOptimistic | Self::Executed | Self::Final
        )
    }
}
