use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::proof::FileProof;
use crate::temporal::Timestamp;
use crate::txid::TxId;

/// Reference to the originating transaction as stored in a receipt.
///
/// The stored bytes are kept exactly as read from the account. The field may
/// carry incidental padding (trailing NULs or whitespace), so comparisons go
/// through [`TxReference::normalized`].
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxReference(String);

impl TxReference {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The stored value, padding included.
    pub fn raw(&self) -> &str {
        &self.0
    }

    /// The stored value with surrounding whitespace and NUL padding removed.
    pub fn normalized(&self) -> &str {
        self.0
            .trim_matches(|c: char| c.is_whitespace() || c == '\0')
    }

    /// Exact equality against a transaction id after normalization.
    /// Never matches on a prefix or substring.
    pub fn matches(&self, tx_id: &TxId) -> bool {
        self.normalized() == tx_id.as_str()
    }
}

impl fmt::Debug for TxReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxReference({:?})", self.0)
    }
}

impl fmt::Display for TxReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.normalized())
    }
}

impl From<&TxId> for TxReference {
    fn from(id: &TxId) -> Self {
        Self(id.as_str().to_string())
    }
}

/// A receipt account as stored on the ledger.
///
/// Owned by the ledger once submitted; clients only ever read it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptRecord {
    /// Account address, assigned at creation.
    pub address: Address,
    /// Signer who submitted the record.
    pub creator: Address,
    /// Payer taken from the referenced payment.
    pub payer: Address,
    pub tx_hash: TxReference,
    pub title: String,
    pub description: String,
    /// Insertion order is preserved for display.
    pub files: Vec<FileProof>,
    /// Ledger clock at creation.
    pub timestamp: Timestamp,
}

impl ReceiptRecord {
    /// Returns `true` if this receipt references the given transaction.
    pub fn references(&self, tx_id: &TxId) -> bool {
        self.tx_hash.matches(tx_id)
    }

    /// Look up an attached file by name.
    pub fn file(&self, name: &str) -> Option<&FileProof> {
        self.files.iter().find(|f| f.name == name)
    }
}
