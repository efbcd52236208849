//! Account identifier.

use std::fmt::{self, Display};
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::error::ParseAccountIdError;

const MIN_LEN: usize = 2;
const MAX_LEN: usize = 64;

/// A validated NEAR account identifier such as `alice.near` or a 64-char implicit id.
///
/// ```
/// use near_sender::AccountId;
///
/// let id: AccountId = "alice.testnet".parse().unwrap();
/// assert_eq!(id.as_str(), "alice.testnet");
/// assert!("Alice.testnet".parse::<AccountId>().is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Parse and validate an account ID.
    pub fn new(s: impl Into<String>) -> Result<Self, ParseAccountIdError> {
        let s = s.into();
        validate(&s)?;
        Ok(Self(s))
    }

    /// Check if this is an implicit account (64 hex chars).
    pub fn is_implicit(&self) -> bool {
        is_implicit(&self.0)
    }

    /// Get as string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_implicit(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn validate(s: &str) -> Result<(), ParseAccountIdError> {
    if s.is_empty() {
        return Err(ParseAccountIdError::Empty);
    }
    if s.len() > MAX_LEN {
        return Err(ParseAccountIdError::TooLong(s.to_string()));
    }
    if is_implicit(s) {
        return Ok(());
    }
    if s.len() < MIN_LEN {
        return Err(ParseAccountIdError::TooShort(s.to_string()));
    }

    if let Some(c) = s
        .chars()
        .find(|c| !matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.'))
    {
        return Err(ParseAccountIdError::InvalidChar(s.to_string(), c));
    }

    // Each dot-separated part must be non-empty and must not start or end with a separator.
    let malformed = s.split('.').any(|part| {
        part.is_empty()
            || part.starts_with(['-', '_'])
            || part.ends_with(['-', '_'])
            || part.contains("--")
            || part.contains("__")
    });
    if malformed {
        return Err(ParseAccountIdError::InvalidFormat(s.to_string()));
    }

    Ok(())
}

impl FromStr for AccountId {
    type Err = ParseAccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for AccountId {
    type Error = ParseAccountIdError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<String> for AccountId {
    type Error = ParseAccountIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl BorshSerialize for AccountId {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        BorshSerialize::serialize(&self.0, writer)
    }
}

impl BorshDeserialize for AccountId {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        let s = String::deserialize_reader(reader)?;
        validate(&s).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(Self(s))
    }
}
