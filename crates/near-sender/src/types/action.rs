//! Transaction actions.
//!
//! The variant order of [`Action`] is the wire discriminant and must never change:
//!
//! | tag | variant          |
//! |-----|------------------|
//! | 0   | `CreateAccount`  |
//! | 1   | `DeployContract` |
//! | 2   | `FunctionCall`   |
//! | 3   | `Transfer`       |
//! | 4   | `Stake`          |
//! | 5   | `AddKey`         |
//! | 6   | `DeleteKey`      |
//! | 7   | `DeleteAccount`  |

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use super::{AccountId, Gas, NearToken, PublicKey};

/// Scope granted to an access key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum AccessKeyPermission {
    /// May only call the listed methods (all methods if empty) on one contract.
    FunctionCall(FunctionCallPermission),
    FullAccess,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct FunctionCallPermission {
    /// Remaining gas budget in yoctoNEAR, `None` for unlimited.
    pub allowance: Option<NearToken>,
    pub receiver_id: AccountId,
    pub method_names: Vec<String>,
}

/// Access key as attached by an `AddKey` action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct AccessKey {
    pub nonce: u64,
    pub permission: AccessKeyPermission,
}

impl AccessKey {
    pub fn full_access() -> Self {
        Self {
            nonce: 0,
            permission: AccessKeyPermission::FullAccess,
        }
    }

    pub fn function_call(
        receiver_id: AccountId,
        method_names: Vec<String>,
        allowance: Option<NearToken>,
    ) -> Self {
        Self {
            nonce: 0,
            permission: AccessKeyPermission::FunctionCall(FunctionCallPermission {
                allowance,
                receiver_id,
                method_names,
            }),
        }
    }
}

/// A single operation carried by a transaction.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum Action {
    CreateAccount(CreateAccountAction),
    DeployContract(DeployContractAction),
    FunctionCall(FunctionCallAction),
    Transfer(TransferAction),
    Stake(StakeAction),
    AddKey(AddKeyAction),
    DeleteKey(DeleteKeyAction),
    DeleteAccount(DeleteAccountAction),
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CreateAccountAction;

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DeployContractAction {
    pub code: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct FunctionCallAction {
    pub method_name: String,
    pub args: Vec<u8>,
    pub gas: Gas,
    pub deposit: NearToken,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TransferAction {
    pub deposit: NearToken,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct StakeAction {
    pub stake: NearToken,
    pub public_key: PublicKey,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AddKeyAction {
    pub public_key: PublicKey,
    pub access_key: AccessKey,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DeleteKeyAction {
    pub public_key: PublicKey,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DeleteAccountAction {
    pub beneficiary_id: AccountId,
}

impl Action {
    pub fn create_account() -> Self {
        Self::CreateAccount(CreateAccountAction)
    }

    pub fn deploy_contract(code: Vec<u8>) -> Self {
        Self::DeployContract(DeployContractAction { code })
    }

    pub fn function_call(
        method_name: impl Into<String>,
        args: Vec<u8>,
        gas: Gas,
        deposit: NearToken,
    ) -> Self {
        Self::FunctionCall(FunctionCallAction {
            method_name: method_name.into(),
            args,
            gas,
            deposit,
        })
    }

    /// Function call whose arguments are the JSON encoding of `args`.
    pub fn function_call_json<A: Serialize>(
        method_name: impl Into<String>,
        args: &A,
        gas: Gas,
        deposit: NearToken,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::function_call(
            method_name,
            serde_json::to_vec(args)?,
            gas,
            deposit,
        ))
    }

    pub fn transfer(deposit: NearToken) -> Self {
        Self::Transfer(TransferAction { deposit })
    }

    pub fn stake(stake: NearToken, public_key: PublicKey) -> Self {
        Self::Stake(StakeAction { stake, public_key })
    }

    pub fn add_full_access_key(public_key: PublicKey) -> Self {
        Self::AddKey(AddKeyAction {
            public_key,
            access_key: AccessKey::full_access(),
        })
    }

    pub fn add_function_call_key(
        public_key: PublicKey,
        receiver_id: AccountId,
        method_names: Vec<String>,
        allowance: Option<NearToken>,
    ) -> Self {
        Self::AddKey(AddKeyAction {
            public_key,
            access_key: AccessKey::function_call(receiver_id, method_names, allowance),
        })
    }

    pub fn delete_key(public_key: PublicKey) -> Self {
        Self::DeleteKey(DeleteKeyAction { public_key })
    }

    pub fn delete_account(beneficiary_id: AccountId) -> Self {
        Self::DeleteAccount(DeleteAccountAction { beneficiary_id })
    }

    /// Wire discriminant of this action.
    pub fn discriminant(&self) -> u8 {
        match self {
            Action::CreateAccount(_) => 0,
            Action::DeployContract(_) => 1,
            Action::FunctionCall(_) => 2,
            Action::Transfer(_) => 3,
            Action::Stake(_) => 4,
            Action::AddKey(_) => 5,
            Action::DeleteKey(_) => 6,
            Action::DeleteAccount(_) => 7,
        }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::CreateAccount(_) => "CreateAccount",
            Action::DeployContract(_) => "DeployContract",
            Action::FunctionCall(_) => "FunctionCall",
            Action::Transfer(_) => "Transfer",
            Action::Stake(_) => "Stake",
            Action::AddKey(_) => "AddKey",
            Action::DeleteKey(_) => "DeleteKey",
            Action::DeleteAccount(_) => "DeleteAccount",
        }
    }

    /// Attached deposit, if the action carries one.
    pub fn deposit(&self) -> Option<NearToken> {
        match self {
            Action::FunctionCall(a) => Some(a.deposit),
            Action::Transfer(a) => Some(a.deposit),
            _ => None,
        }
    }
}
