//! Unsigned and signed transactions.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use borsh::{BorshDeserialize, BorshSerialize};

use super::{AccountId, Action, CryptoHash, PublicKey, SecretKey, Signature};
use crate::error::Error;

/// An unsigned transaction. Field order is the wire layout.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Transaction {
    /// The account that signs and pays for the transaction.
    pub signer_id: AccountId,
    pub public_key: PublicKey,
    /// Must exceed the access key's on-chain nonce.
    pub nonce: u64,
    pub receiver_id: AccountId,
    /// A recent block hash; the transaction expires roughly a day after this block.
    pub block_hash: CryptoHash,
    pub actions: Vec<Action>,
}

impl Transaction {
    pub fn new(
        signer_id: AccountId,
        public_key: PublicKey,
        nonce: u64,
        receiver_id: AccountId,
        block_hash: CryptoHash,
        actions: Vec<Action>,
    ) -> Self {
        Self {
            signer_id,
            public_key,
            nonce,
            receiver_id,
            block_hash,
            actions,
        }
    }

    /// SHA-256 of the borsh encoding. This is what gets signed and what the
    /// network reports as the transaction hash.
    pub fn get_hash(&self) -> CryptoHash {
        let bytes = borsh::to_vec(self).expect("transaction serialization should never fail");
        CryptoHash::hash(&bytes)
    }

    /// Consume the transaction and sign its hash.
    pub fn sign(self, secret_key: &SecretKey) -> SignedTransaction {
        let signature = secret_key.sign(self.get_hash().as_bytes());
        SignedTransaction {
            transaction: self,
            signature,
        }
    }
}

/// A signed transaction ready to be submitted.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signature: Signature,
}

impl SignedTransaction {
    pub fn get_hash(&self) -> CryptoHash {
        self.transaction.get_hash()
    }

    /// Check the signature against the transaction's own public key.
    pub fn verify(&self) -> bool {
        self.signature.verify(
            self.get_hash().as_bytes(),
            &self.transaction.public_key,
        )
    }

    /// Borsh bytes as submitted to the node.
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("signed transaction serialization should never fail")
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        borsh::from_slice(bytes).map_err(|e| {
            Error::InvalidTransaction(format!("Failed to deserialize signed transaction: {}", e))
        })
    }

    pub fn from_base64(s: &str) -> Result<Self, Error> {
        let bytes = STANDARD
            .decode(s)
            .map_err(|e| Error::InvalidTransaction(format!("Invalid base64: {}", e)))?;
        Self::from_bytes(&bytes)
    }
}
