use serde_json::{json, Value};
use solr_types::Address;

use crate::program::{account_discriminator, CREATOR_OFFSET};

/// Server-side account filter for program-wide queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountFilter {
    /// Account data must contain `bytes` starting at `offset`.
    Memcmp { offset: usize, bytes: Vec<u8> },
    /// Account data must be exactly this long.
    DataSize(usize),
}

impl AccountFilter {
    /// Matches accounts whose data starts with the receipt discriminator.
    pub fn receipt_accounts() -> Self {
        Self::Memcmp {
            offset: 0,
            bytes: account_discriminator().to_vec(),
        }
    }

    /// Matches receipts whose creator field equals `creator`.
    pub fn creator(creator: &Address) -> Self {
        Self::Memcmp {
            offset: CREATOR_OFFSET,
            bytes: creator.as_bytes().to_vec(),
        }
    }

    /// Evaluate locally against raw account data.
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            Self::Memcmp { offset, bytes } => data
                .get(*offset..offset + bytes.len())
                .is_some_and(|window| window == bytes.as_slice()),
            Self::DataSize(size) => data.len() == *size,
        }
    }

    /// JSON-RPC representation; memcmp bytes travel as base58.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Memcmp { offset, bytes } => json!({
                "memcmp": {
                    "offset": offset,
                    "bytes": bs58::encode(bytes).into_string(),
                }
            }),
            Self::DataSize(size) => json!({ "dataSize": size }),
        }
    }
}
