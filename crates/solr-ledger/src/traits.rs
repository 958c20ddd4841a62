use async_trait::async_trait;
use solr_types::{Address, Network, TxId};

use crate::error::LedgerError;
use crate::filter::AccountFilter;
use crate::message::{Blockhash, Transaction};
use crate::parsed::{AccountData, KeyedAccount, ParsedTransaction, SignatureInfo, SignatureStatus};

/// Read boundary for ledger queries.
///
/// Every handle is bound to exactly one network; `Ok(None)` means the item
/// does not exist on that network.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    fn network(&self) -> &Network;

    async fn get_transaction(&self, id: &TxId) -> Result<Option<ParsedTransaction>, LedgerError>;

    /// Recent signatures touching `address`, newest first.
    async fn signatures_for_address(
        &self,
        address: &Address,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, LedgerError>;

    async fn get_account(&self, address: &Address) -> Result<Option<AccountData>, LedgerError>;

    /// Accounts owned by `program` matching every filter.
    async fn program_accounts(
        &self,
        program: &Address,
        filters: &[AccountFilter],
    ) -> Result<Vec<KeyedAccount>, LedgerError>;

    async fn signature_status(&self, id: &TxId) -> Result<Option<SignatureStatus>, LedgerError>;
}

/// Write boundary for transaction submission.
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    async fn latest_blockhash(&self) -> Result<Blockhash, LedgerError>;

    /// Submit a signed transaction; returns its id once accepted.
    async fn send_transaction(&self, tx: &Transaction) -> Result<TxId, LedgerError>;
}

/// A full ledger handle.
pub trait Ledger: LedgerReader + LedgerWriter {}

impl<T: LedgerReader + LedgerWriter> Ledger for T {}
