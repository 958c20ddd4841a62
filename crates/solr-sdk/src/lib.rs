//! Client SDK for SolReceipts.
//!
//! Resolves payment transactions, submits receipts that reference them,
//! reads receipts back and matches them against wallet activity. All ledger
//! access goes through a [`solr_ledger::Ledger`] bound to a single network.

pub mod activity;
pub mod config;
pub mod error;
pub mod matching;
pub mod repository;
pub mod resolver;
pub mod session;
pub mod submitter;
pub mod verify;

pub use activity::{ActivityEntry, ActivityFeed, ActivityStatus};
pub use config::{ClientConfig, ConfirmationConfig, NetworkConfig};
pub use error::{ErrorKind, ReceiptError, ReceiptResult};
pub use matching::{Duplicate, Match, MatchingEngine};
pub use repository::ReceiptRepository;
pub use resolver::{derive, ResolvedTransaction, TransactionResolver};
pub use session::{ClientSession, ReceiptClient};
pub use submitter::{ReceiptDraft, ReceiptSubmitter};
pub use verify::{verify_bytes, verify_upload, Verification};

// Re-export key types
pub use solr_crypto::{ContentHasher, HashAlgorithm, Keypair, UploadSource};
pub use solr_types::{
    Address, BatchFailure, BatchOutcome, ContentHash, Determined, FileProof, Lamports, Network,
    PaymentFact, ReceiptRecord, Timestamp, TxId, TxKind, TxStatus,
};
