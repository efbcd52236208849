//! Ed25519 key and signature types.
//!
//! Keys and signatures are written as `ed25519:<base58>` in text form and as a
//! one-byte key type tag followed by the raw bytes on the wire.

use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseKeyError;

/// Text prefix carried by every Ed25519 key and signature.
pub const ED25519_PREFIX: &str = "ed25519:";

/// Key type identifier. Only Ed25519 is supported for signing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyType {
    Ed25519 = 0,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Ed25519 => "ed25519",
        }
    }
}

impl TryFrom<u8> for KeyType {
    type Error = ParseKeyError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(KeyType::Ed25519),
            _ => Err(ParseKeyError::UnknownKeyType(value.to_string())),
        }
    }
}

/// Split `ed25519:<base58>` into decoded bytes.
fn decode_prefixed(s: &str) -> Result<Vec<u8>, ParseKeyError> {
    let (key_type, data) = s.split_once(':').ok_or(ParseKeyError::InvalidFormat)?;
    if key_type != KeyType::Ed25519.as_str() {
        return Err(ParseKeyError::UnknownKeyType(key_type.to_string()));
    }
    bs58::decode(data)
        .into_vec()
        .map_err(|e| ParseKeyError::InvalidBase58(e.to_string()))
}

fn invalid_data(msg: impl Into<String>) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg.into())
}

fn read_key_type<R: std::io::Read>(reader: &mut R) -> std::io::Result<KeyType> {
    let tag = u8::deserialize_reader(reader)?;
    KeyType::try_from(tag).map_err(|e| invalid_data(e.to_string()))
}

// ============================================================================
// PublicKey
// ============================================================================

/// Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// Create from raw 32 bytes, checking that they encode a curve point.
    pub fn ed25519_from_bytes(bytes: [u8; 32]) -> Result<Self, ParseKeyError> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| ParseKeyError::InvalidCurvePoint)?;
        Ok(Self(bytes))
    }

    pub fn key_type(&self) -> KeyType {
        KeyType::Ed25519
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn verifying_key(&self) -> Option<VerifyingKey> {
        VerifyingKey::from_bytes(&self.0).ok()
    }
}

impl From<VerifyingKey> for PublicKey {
    fn from(key: VerifyingKey) -> Self {
        Self(key.to_bytes())
    }
}

impl FromStr for PublicKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let data = decode_prefixed(s)?;
        let bytes: [u8; 32] =
            data.as_slice()
                .try_into()
                .map_err(|_| ParseKeyError::InvalidLength {
                    expected: 32,
                    actual: data.len(),
                })?;
        Self::ed25519_from_bytes(bytes)
    }
}

impl TryFrom<&str> for PublicKey {
    type Error = ParseKeyError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", ED25519_PREFIX, bs58::encode(&self.0).into_string())
    }
}

impl Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s: String = serde::Deserialize::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl BorshSerialize for PublicKey {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        BorshSerialize::serialize(&(KeyType::Ed25519 as u8), writer)?;
        writer.write_all(&self.0)
    }
}

impl BorshDeserialize for PublicKey {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        read_key_type(reader)?;
        let mut bytes = [0u8; 32];
        reader.read_exact(&mut bytes)?;
        Self::ed25519_from_bytes(bytes).map_err(|e| invalid_data(e.to_string()))
    }
}

// ============================================================================
// SecretKey
// ============================================================================

/// Ed25519 secret key (the 32-byte seed).
#[derive(Clone)]
pub struct SecretKey(SigningKey);

impl SecretKey {
    /// Generate a new random key.
    pub fn generate_ed25519() -> Self {
        Self(SigningKey::generate(&mut OsRng))
    }

    pub fn ed25519_from_bytes(bytes: [u8; 32]) -> Self {
        Self(SigningKey::from_bytes(&bytes))
    }

    pub fn key_type(&self) -> KeyType {
        KeyType::Ed25519
    }

    /// Derive the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(self.0.verifying_key())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.0.sign(message).to_bytes())
    }
}

impl FromStr for SecretKey {
    type Err = ParseKeyError;

    /// Accepts both the 32-byte seed and the 64-byte `seed || public key` form
    /// written by near-cli.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let data = decode_prefixed(s)?;
        if data.len() != 32 && data.len() != 64 {
            return Err(ParseKeyError::InvalidLength {
                expected: 32,
                actual: data.len(),
            });
        }

        let mut seed = [0u8; 32];
        seed.copy_from_slice(&data[..32]);
        let key = Self::ed25519_from_bytes(seed);

        if data.len() == 64 && key.public_key().as_bytes()[..] != data[32..] {
            return Err(ParseKeyError::InvalidCurvePoint);
        }
        Ok(key)
    }
}

impl TryFrom<&str> for SecretKey {
    type Error = ParseKeyError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            ED25519_PREFIX,
            bs58::encode(self.0.to_bytes()).into_string()
        )
    }
}

impl Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(ed25519:***)")
    }
}

// ============================================================================
// Signature
// ============================================================================

/// Ed25519 signature (64 bytes).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; 64]);

impl Signature {
    pub fn ed25519_from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn key_type(&self) -> KeyType {
        KeyType::Ed25519
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Verify this signature over `message` with `public_key`.
    pub fn verify(&self, message: &[u8], public_key: &PublicKey) -> bool {
        let Some(verifying_key) = public_key.verifying_key() else {
            return false;
        };
        let signature = ed25519_dalek::Signature::from_bytes(&self.0);
        verifying_key.verify_strict(message, &signature).is_ok()
    }
}

impl FromStr for Signature {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let data = decode_prefixed(s)?;
        let bytes: [u8; 64] =
            data.as_slice()
                .try_into()
                .map_err(|_| ParseKeyError::InvalidLength {
                    expected: 64,
                    actual: data.len(),
                })?;
        Ok(Self(bytes))
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", ED25519_PREFIX, bs58::encode(&self.0).into_string())
    }
}

impl Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s: String = serde::Deserialize::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl BorshSerialize for Signature {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        BorshSerialize::serialize(&(KeyType::Ed25519 as u8), writer)?;
        writer.write_all(&self.0)
    }
}

impl BorshDeserialize for Signature {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        read_key_type(reader)?;
        let mut bytes = [0u8; 64];
        reader.read_exact(&mut bytes)?;
        Ok(Self(bytes))
    }
}

// ============================================================================
// KeyPair
// ============================================================================

/// A secret key together with its public counterpart.
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a random Ed25519 key pair.
    pub fn random() -> Self {
        Self::from_secret_key(SecretKey::generate_ed25519())
    }

    /// Derive the public half from a secret key.
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = secret_key.public_key();
        Self {
            secret_key,
            public_key,
        }
    }

    /// Sign a message with the secret half.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.secret_key.sign(message)
    }
}

impl Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("secret_key", &"***")
            .finish()
    }
}
