use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A ledger network partition and the endpoint used to reach it.
///
/// The same transaction identifier may exist on one network and not on
/// another, so every lookup result is scoped to the `Network` it ran against.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Network {
    /// Human-readable label, e.g. `"devnet"`.
    pub name: String,
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,
}

impl Network {
    pub fn new(name: impl Into<String>, rpc_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rpc_url: rpc_url.into(),
        }
    }

    pub fn devnet() -> Self {
        Self::new("devnet", "https://api.devnet.solana.com")
    }

    pub fn testnet() -> Self {
        Self::new("testnet", "https://api.testnet.solana.com")
    }

    pub fn mainnet_beta() -> Self {
        Self::new("mainnet-beta", "https://api.mainnet-beta.solana.com")
    }

    pub fn localnet() -> Self {
        Self::new("localnet", "http://127.0.0.1:8899")
    }

    /// Resolve one of the well-known network names.
    pub fn named(name: &str) -> Result<Self, TypeError> {
        match name {
            "devnet" => Ok(Self::devnet()),
            "testnet" => Ok(Self::testnet()),
            "mainnet-beta" | "mainnet" => Ok(Self::mainnet_beta()),
            "localnet" | "localhost" => Ok(Self::localnet()),
            other => Err(TypeError::UnknownNetwork(other.to_string())),
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::devnet()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.rpc_url)
    }
}
