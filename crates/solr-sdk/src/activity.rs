use serde::Serialize;
use solr_types::{Address, BatchFailure, ReceiptRecord};

use crate::error::ReceiptResult;
use crate::matching::MatchingEngine;
use crate::repository::ReceiptRepository;
use crate::resolver::{ResolvedTransaction, TransactionResolver};

/// Receipt state of one wallet transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ActivityStatus {
    /// A receipt referencing this transaction exists at the given address.
    Receipted(Address),
    /// The transaction itself created a receipt.
    ReceiptCreation,
    /// No receipt references this transaction yet.
    Receiptable,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    pub transaction: ResolvedTransaction,
    pub status: ActivityStatus,
}

/// Recent wallet activity cross-referenced with the wallet's receipts.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ActivityFeed {
    /// Newest first.
    pub entries: Vec<ActivityEntry>,
    /// Signatures that could not be resolved.
    pub unresolved: Vec<BatchFailure>,
    /// Receipt accounts that matched the creator filter but did not decode.
    pub undecodable_receipts: Vec<BatchFailure>,
    /// Duplicate references among the wallet's receipts.
    pub duplicate_references: Vec<String>,
}

impl ActivityFeed {
    /// Build the feed for `wallet` from its `limit` most recent signatures.
    ///
    /// Transactions are resolved concurrently and listed alongside the
    /// wallet's receipts; individual failures are reported in `unresolved`
    /// and `undecodable_receipts` rather than failing the feed.
    pub async fn collect(
        resolver: &TransactionResolver,
        repository: &ReceiptRepository,
        wallet: &Address,
        limit: usize,
    ) -> ReceiptResult<Self> {
        let ids = resolver.recent_signatures(wallet, limit).await?;
        let (resolved, receipts) = tokio::join!(
            resolver.resolve_batch(ids),
            repository.list_by_creator(wallet)
        );
        let receipts = receipts?;
        Ok(Self::assemble(
            resolved.succeeded,
            resolved.failed,
            &receipts.succeeded,
            receipts.failed,
        ))
    }

    fn assemble(
        transactions: Vec<ResolvedTransaction>,
        unresolved: Vec<BatchFailure>,
        receipts: &[ReceiptRecord],
        undecodable_receipts: Vec<BatchFailure>,
    ) -> Self {
        let engine = MatchingEngine::new(receipts);
        let entries = transactions
            .into_iter()
            .map(|transaction| {
                let status = if transaction.kind.is_receipt_creation() {
                    ActivityStatus::ReceiptCreation
                } else if let Some(receipt) = engine.find(&transaction.id) {
                    ActivityStatus::Receipted(receipt.address)
                } else {
                    ActivityStatus::Receiptable
                };
                ActivityEntry {
                    transaction,
                    status,
                }
            })
            .collect();
        Self {
            entries,
            unresolved,
            undecodable_receipts,
            duplicate_references: engine
                .duplicates()
                .into_iter()
                .map(|d| d.tx_reference)
                .collect(),
        }
    }

    pub fn receiptable(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.entries
            .iter()
            .filter(|e| e.status == ActivityStatus::Receiptable)
    }
}
