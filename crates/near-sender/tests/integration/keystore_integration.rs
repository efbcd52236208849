//! Loading accounts from near-cli credential directories.

use std::path::Path;
use std::sync::Arc;

use near_sender::*;

use crate::common::{ScriptedNode, bob};

fn write_credentials(root: &Path, network: &str, file_name: &str, contents: serde_json::Value) {
    let dir = root.join(network);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(file_name), contents.to_string()).unwrap();
}

fn carol() -> AccountId {
    "carol.testnet".parse().unwrap()
}

#[tokio::test]
async fn test_load_account_and_send() {
    let dir = tempfile::tempdir().unwrap();
    let secret = SecretKey::ed25519_from_bytes([21u8; 32]);
    write_credentials(
        dir.path(),
        "testnet",
        "carol.testnet.json",
        serde_json::json!({
            "account_id": "carol.testnet",
            "public_key": secret.public_key().to_string(),
            "private_key": secret.to_string(),
        }),
    );

    let store = FileKeyStore::with_root(dir.path(), Network::Testnet);
    let node = Arc::new(ScriptedNode::new(5));
    let account = Account::from_store(&store, &carol(), node.clone()).unwrap();

    assert_eq!(account.public_key(), &secret.public_key());

    let signature = account.credentials().key_pair().sign(b"hello");
    assert!(signature.verify(b"hello", account.public_key()));

    account.send_money(&bob(), NearToken::near(1)).await.unwrap();
    let submitted = node.submitted();
    assert!(submitted[0].verify());
    assert_eq!(submitted[0].transaction.signer_id, carol());
}

#[test]
fn test_expanded_private_key_and_secret_key_alias() {
    let dir = tempfile::tempdir().unwrap();
    let secret = SecretKey::ed25519_from_bytes([22u8; 32]);
    let public = secret.public_key();

    let mut expanded = [22u8; 32].to_vec();
    expanded.extend_from_slice(public.as_bytes());
    let expanded = format!("ed25519:{}", bs58::encode(expanded).into_string());

    write_credentials(
        dir.path(),
        "mainnet",
        "carol.testnet.json",
        serde_json::json!({
            "account_id": "carol.testnet",
            "public_key": public.to_string(),
            "secret_key": expanded,
        }),
    );

    let store = FileKeyStore::with_root(dir.path(), "mainnet");
    let credentials = store.load(&carol()).unwrap();
    assert_eq!(credentials.public_key(), &public);
}

#[test]
fn test_mismatched_key_pair_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let secret = SecretKey::ed25519_from_bytes([23u8; 32]);
    let other = SecretKey::ed25519_from_bytes([24u8; 32]);
    write_credentials(
        dir.path(),
        "testnet",
        "carol.testnet.json",
        serde_json::json!({
            "account_id": "carol.testnet",
            "public_key": other.public_key().to_string(),
            "private_key": secret.to_string(),
        }),
    );

    let store = FileKeyStore::with_root(dir.path(), "testnet");
    let err = Account::from_store(&store, &carol(), ScriptedNode::new(0)).unwrap_err();

    assert!(matches!(
        err,
        Error::Credential(CredentialError::KeyMismatch { .. })
    ));
    assert_eq!(err.failure_class(), FailureClass::Fatal);
}

#[test]
fn test_embedded_account_id_must_match() {
    let dir = tempfile::tempdir().unwrap();
    let secret = SecretKey::ed25519_from_bytes([25u8; 32]);
    write_credentials(
        dir.path(),
        "testnet",
        "carol.testnet.json",
        serde_json::json!({
            "account_id": "mallory.testnet",
            "public_key": secret.public_key().to_string(),
            "private_key": secret.to_string(),
        }),
    );

    let store = FileKeyStore::with_root(dir.path(), "testnet");
    let err = store.load(&carol()).unwrap_err();

    match err {
        CredentialError::AccountMismatch { expected, found } => {
            assert_eq!(expected, carol());
            assert_eq!(found, "mallory.testnet");
        }
        other => panic!("expected AccountMismatch, got {other:?}"),
    }
}

#[test]
fn test_non_ed25519_key_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_credentials(
        dir.path(),
        "testnet",
        "carol.testnet.json",
        serde_json::json!({
            "account_id": "carol.testnet",
            "public_key": "secp256k1:qMoRgcoXai4mBPsdbHi1wfyxF9TdbPCF4qSDQTRP3TfescSRoUdSx6nmeQoN3aiwGzwMyGXAb1gUjBTv5AY8DXj",
            "private_key": "secp256k1:3gGN4zJmbcb8kbHW9vPaXYQTPX6Qt1pBmWEGKqiGnXPZ",
        }),
    );

    let store = FileKeyStore::with_root(dir.path(), "testnet");
    let err = store.load(&carol()).unwrap_err();

    assert!(matches!(
        err,
        CredentialError::UnsupportedKeyType {
            field: "public_key",
            ..
        }
    ));
}

#[test]
fn test_network_selects_directory() {
    let dir = tempfile::tempdir().unwrap();
    let secret = SecretKey::ed25519_from_bytes([26u8; 32]);
    write_credentials(
        dir.path(),
        "testnet",
        "carol.testnet.json",
        serde_json::json!({
            "account_id": "carol.testnet",
            "public_key": secret.public_key().to_string(),
            "private_key": secret.to_string(),
        }),
    );

    let mainnet = FileKeyStore::with_root(dir.path(), "mainnet");
    assert!(matches!(
        mainnet.load(&carol()),
        Err(CredentialError::NotFound(_))
    ));

    let testnet = FileKeyStore::with_root(dir.path(), "testnet");
    assert!(testnet.load(&carol()).is_ok());
}

#[test]
fn test_malformed_file_is_json_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("testnet")).unwrap();
    std::fs::write(dir.path().join("testnet/carol.testnet.json"), "{ not json").unwrap();

    let store = FileKeyStore::with_root(dir.path(), "testnet");
    assert!(matches!(
        store.load(&carol()),
        Err(CredentialError::Json(_))
    ));
}
