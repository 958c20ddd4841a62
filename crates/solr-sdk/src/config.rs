use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use solr_ledger::RECEIPT_PROGRAM_ID;
use solr_types::{Address, Network};

use crate::error::{ReceiptError, ReceiptResult};

pub const ENV_RPC_URL: &str = "SOLR_RPC_URL";
pub const ENV_NETWORK: &str = "SOLR_NETWORK";
pub const ENV_KEYPAIR: &str = "SOLR_KEYPAIR";
pub const ENV_PROGRAM_ID: &str = "SOLR_PROGRAM_ID";

/// Client configuration, usually read from a TOML file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub network: NetworkConfig,
    /// Receipt program id (base58).
    pub program_id: String,
    /// JSON keypair file used as the signer.
    pub keypair_path: Option<PathBuf>,
    /// Number of recent signatures inspected by the activity feed.
    pub activity_limit: usize,
    pub confirmation: ConfirmationConfig,
    /// Transport timeout. `None` keeps the transport default.
    pub request_timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub name: String,
    /// Explicit endpoint. When absent, `name` must be a well-known network.
    pub rpc_url: Option<String>,
}

/// Signature-status polling after a submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    pub attempts: u32,
    pub interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            program_id: RECEIPT_PROGRAM_ID.to_string(),
            keypair_path: None,
            activity_limit: 15,
            confirmation: ConfirmationConfig::default(),
            request_timeout_secs: None,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "devnet".into(),
            rpc_url: None,
        }
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            attempts: 30,
            interval_ms: 500,
        }
    }
}

impl ConfirmationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl ClientConfig {
    pub fn from_toml_str(s: &str) -> ReceiptResult<Self> {
        toml::from_str(s).map_err(|e| ReceiptError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> ReceiptResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ReceiptError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> ReceiptResult<String> {
        toml::to_string_pretty(self).map_err(|e| ReceiptError::Config(e.to_string()))
    }

    /// Apply `SOLR_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. A network name override
    /// clears any configured endpoint unless the endpoint is overridden too.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(name) = lookup(ENV_NETWORK) {
            self.network.name = name;
            self.network.rpc_url = None;
        }
        if let Some(url) = lookup(ENV_RPC_URL) {
            self.network.rpc_url = Some(url);
        }
        if let Some(path) = lookup(ENV_KEYPAIR) {
            self.keypair_path = Some(PathBuf::from(path));
        }
        if let Some(program) = lookup(ENV_PROGRAM_ID) {
            self.program_id = program;
        }
    }

    /// The network this configuration targets.
    pub fn network(&self) -> ReceiptResult<Network> {
        match &self.network.rpc_url {
            Some(url) => Ok(Network::new(self.network.name.clone(), url.clone())),
            None => Network::named(&self.network.name).map_err(|e| {
                ReceiptError::Config(format!("{e}; set network.rpc_url for custom networks"))
            }),
        }
    }

    pub fn program_id(&self) -> ReceiptResult<Address> {
        Address::from_base58(&self.program_id)
            .map_err(|e| ReceiptError::Config(format!("program_id: {e}")))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
