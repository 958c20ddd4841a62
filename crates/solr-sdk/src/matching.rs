//! Association of transaction ids with existing receipts.
//!
//! Pure: no I/O and no logging. The receipt list is a read-only snapshot
//! for the lifetime of the engine.

use serde::Serialize;
use solr_types::{Address, ReceiptRecord, TxId};

/// Result of matching one transaction id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Match<'a> {
    pub tx_id: TxId,
    pub receipt: Option<&'a ReceiptRecord>,
}

/// A transaction reference claimed by more than one receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Duplicate {
    pub tx_reference: String,
    /// Receipt addresses in list order.
    pub receipts: Vec<Address>,
}

/// Matches transaction ids against a list of receipts.
///
/// A receipt matches an id when its stored reference, with padding
/// trimmed, equals the id exactly. Prefixes and substrings never match.
///
/// Nothing prevents two receipts from referencing the same transaction.
/// When that happens the first receipt in list order wins, so the result
/// depends on the order the receipts were supplied in, and ledger listings
/// have no guaranteed order. Use [`MatchingEngine::duplicates`] to detect
/// the situation.
#[derive(Clone, Copy, Debug)]
pub struct MatchingEngine<'a> {
    receipts: &'a [ReceiptRecord],
}

impl<'a> MatchingEngine<'a> {
    pub fn new(receipts: &'a [ReceiptRecord]) -> Self {
        Self { receipts }
    }

    /// The first receipt referencing `tx_id`, if any.
    pub fn find(&self, tx_id: &TxId) -> Option<&'a ReceiptRecord> {
        self.receipts.iter().find(|r| r.references(tx_id))
    }

    /// One [`Match`] per id, in input order.
    pub fn match_all<'i>(&self, ids: impl IntoIterator<Item = &'i TxId>) -> Vec<Match<'a>> {
        ids.into_iter()
            .map(|id| Match {
                tx_id: id.clone(),
                receipt: self.find(id),
            })
            .collect()
    }

    /// References shared by two or more receipts, in order of first
    /// appearance.
    pub fn duplicates(&self) -> Vec<Duplicate> {
        let mut groups: Vec<Duplicate> = Vec::new();
        for receipt in self.receipts {
            let reference = receipt.tx_hash.normalized();
            match groups.iter_mut().find(|g| g.tx_reference == reference) {
                Some(group) => group.receipts.push(receipt.address),
                None => groups.push(Duplicate {
                    tx_reference: reference.to_string(),
                    receipts: vec![receipt.address],
                }),
            }
        }
        groups.retain(|g| g.receipts.len() > 1);
        groups
    }
}
