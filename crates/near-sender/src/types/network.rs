//! Network identification.

use std::fmt;
use std::str::FromStr;

/// The NEAR network an account lives on.
///
/// The identifier names the near-cli credentials subdirectory
/// (`~/.near-credentials/<network>/`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
    /// Local node or sandbox.
    Localnet,
    /// Any other network id, such as a private shardnet.
    Custom(String),
}

impl Network {
    pub fn as_str(&self) -> &str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Localnet => "localnet",
            Network::Custom(id) => id,
        }
    }
}

impl FromStr for Network {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "mainnet" => Network::Mainnet,
            "testnet" => Network::Testnet,
            "localnet" | "sandbox" => Network::Localnet,
            other => Network::Custom(other.to_string()),
        })
    }
}

impl From<&str> for Network {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(network) => network,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
