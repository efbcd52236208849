//! Credential loading.
//!
//! A [`CredentialStore`] turns an account id into validated [`Credentials`].
//!
//! | Store | Source |
//! |-------|--------|
//! | [`FileKeyStore`] | `~/.near-credentials/{network}/{account}.json` (near-cli format) |
//! | [`InMemoryKeyStore`] | Keys added at runtime |
//! | [`Credentials::from_env`] | `NEAR_ACCOUNT_ID` / `NEAR_PRIVATE_KEY` |

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::Deserialize;
use tracing::debug;

use crate::error::CredentialError;
use crate::types::{AccountId, ED25519_PREFIX, KeyPair, Network, PublicKey, SecretKey};

// ============================================================================
// Credentials
// ============================================================================

/// An account id bound to an Ed25519 key pair whose halves are known to match.
#[derive(Clone)]
pub struct Credentials {
    account_id: AccountId,
    key_pair: KeyPair,
}

impl Credentials {
    /// Bind a secret key to an account. The public key is derived.
    pub fn new(account_id: AccountId, secret_key: SecretKey) -> Self {
        Self {
            account_id,
            key_pair: KeyPair::from_secret_key(secret_key),
        }
    }

    /// Validate textual credentials as stored by near-cli.
    ///
    /// Both keys must carry the `ed25519:` prefix and the public key must be the
    /// counterpart of the private key.
    pub fn from_parts(
        account_id: AccountId,
        public_key: &str,
        private_key: &str,
    ) -> Result<Self, CredentialError> {
        if !public_key.starts_with(ED25519_PREFIX) {
            return Err(CredentialError::UnsupportedKeyType {
                field: "public_key",
                value: public_key.to_string(),
            });
        }
        if !private_key.starts_with(ED25519_PREFIX) {
            return Err(CredentialError::UnsupportedKeyType {
                field: "private_key",
                value: format!("{}...", private_key.chars().take(8).collect::<String>()),
            });
        }

        let public_key: PublicKey = public_key.parse()?;
        let secret_key: SecretKey = private_key.parse()?;
        if secret_key.public_key() != public_key {
            return Err(CredentialError::KeyMismatch {
                account_id,
                public_key,
            });
        }

        Ok(Self::new(account_id, secret_key))
    }

    /// Load from `NEAR_ACCOUNT_ID` and `NEAR_PRIVATE_KEY`.
    pub fn from_env() -> Result<Self, CredentialError> {
        Self::from_env_vars("NEAR_ACCOUNT_ID", "NEAR_PRIVATE_KEY")
    }

    /// Load from custom environment variable names.
    pub fn from_env_vars(account_var: &str, key_var: &str) -> Result<Self, CredentialError> {
        let read = |name: &str| {
            std::env::var(name).map_err(|_| {
                CredentialError::PathError(format!("Environment variable {} not set", name))
            })
        };
        let account_id: AccountId = read(account_var)?.parse()?;
        let private_key = read(key_var)?;
        if !private_key.starts_with(ED25519_PREFIX) {
            return Err(CredentialError::UnsupportedKeyType {
                field: "private_key",
                value: key_var.to_string(),
            });
        }
        Ok(Self::new(account_id, private_key.parse()?))
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.key_pair.public_key
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("public_key", &self.key_pair.public_key)
            .finish()
    }
}

// ============================================================================
// CredentialStore
// ============================================================================

/// Source of account credentials.
pub trait CredentialStore: Send + Sync {
    /// Load and validate the credentials for `account_id`.
    fn load(&self, account_id: &AccountId) -> Result<Credentials, CredentialError>;
}

// ============================================================================
// FileKeyStore
// ============================================================================

/// near-cli credential file.
#[derive(Deserialize)]
struct CredentialFile {
    account_id: String,
    public_key: String,
    #[serde(alias = "secret_key")]
    private_key: String,
}

/// Reads near-cli credential files from `{root}/{network}/{account}.json`.
#[derive(Clone, Debug)]
pub struct FileKeyStore {
    root: PathBuf,
    network: Network,
}

impl FileKeyStore {
    /// Store rooted at `~/.near-credentials`.
    #[cfg(feature = "file-keystore")]
    pub fn new(network: impl Into<Network>) -> Result<Self, CredentialError> {
        let home = dirs::home_dir().ok_or_else(|| {
            CredentialError::PathError("Could not determine home directory".to_string())
        })?;
        Ok(Self::with_root(home.join(".near-credentials"), network))
    }

    /// Store rooted at an explicit credentials directory.
    pub fn with_root(root: impl Into<PathBuf>, network: impl Into<Network>) -> Self {
        Self {
            root: root.into(),
            network: network.into(),
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Path of the credential file for `account_id`.
    pub fn path_for(&self, account_id: &AccountId) -> PathBuf {
        self.root
            .join(self.network.as_str())
            .join(format!("{}.json", account_id))
    }

    /// Parse and validate one credential file.
    pub fn load_file(
        path: impl AsRef<Path>,
        account_id: &AccountId,
    ) -> Result<Credentials, CredentialError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                CredentialError::NotFound(account_id.clone())
            } else {
                CredentialError::Io {
                    path: path.display().to_string(),
                    source,
                }
            }
        })?;

        let file: CredentialFile = serde_json::from_str(&content)?;
        if file.account_id != account_id.as_str() {
            return Err(CredentialError::AccountMismatch {
                expected: account_id.clone(),
                found: file.account_id,
            });
        }

        Credentials::from_parts(account_id.clone(), &file.public_key, &file.private_key)
    }
}

impl CredentialStore for FileKeyStore {
    fn load(&self, account_id: &AccountId) -> Result<Credentials, CredentialError> {
        let path = self.path_for(account_id);
        debug!(account_id = %account_id, path = %path.display(), "loading credentials");
        Self::load_file(&path, account_id)
    }
}

// ============================================================================
// InMemoryKeyStore
// ============================================================================

/// Keys held in memory and lost when the process exits.
///
/// ```rust
/// use near_sender::{CredentialStore, InMemoryKeyStore, SecretKey};
///
/// let store = InMemoryKeyStore::new();
/// let account_id = "alice.testnet".parse().unwrap();
/// store.add(&account_id, SecretKey::generate_ed25519());
/// assert!(store.load(&account_id).is_ok());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryKeyStore {
    keys: RwLock<HashMap<AccountId, SecretKey>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, account_id: &AccountId, secret_key: SecretKey) {
        self.keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(account_id.clone(), secret_key);
    }

    pub fn remove(&self, account_id: &AccountId) -> bool {
        self.keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(account_id)
            .is_some()
    }

    pub fn accounts(&self) -> Vec<AccountId> {
        let mut ids: Vec<_> = self
            .keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

impl CredentialStore for InMemoryKeyStore {
    fn load(&self, account_id: &AccountId) -> Result<Credentials, CredentialError> {
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        let secret_key = keys
            .get(account_id)
            .cloned()
            .ok_or_else(|| CredentialError::NotFound(account_id.clone()))?;
        Ok(Credentials::new(account_id.clone(), secret_key))
    }
}
