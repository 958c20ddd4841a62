//! Foundation types for SolReceipts.
//!
//! This crate provides the identity, temporal, and record types shared by
//! every other SolReceipts crate. It performs no I/O.
//!
//! # Key Types
//!
//! - [`Address`] - 32-byte ledger account address, base58 on the wire
//! - [`TxId`] - Opaque transaction identifier (base58 signature string)
//! - [`Timestamp`] - Ledger-assigned unix time in seconds
//! - [`Determined`] - A value that is either known or explicitly unknown
//! - [`PaymentFact`] - Canonical payment facts derived from a transaction
//! - [`FileProof`] - Content hash of an uploaded supporting document
//! - [`ReceiptRecord`] - The receipt account as stored on the ledger
//! - [`BatchOutcome`] - Per-item results of a concurrent fan-out

pub mod address;
pub mod amount;
pub mod batch;
pub mod error;
pub mod network;
pub mod payment;
pub mod proof;
pub mod record;
pub mod temporal;
pub mod txid;

pub use address::Address;
pub use amount::{Determined, Lamports, LAMPORTS_PER_SOL};
pub use batch::{BatchFailure, BatchOutcome};
pub use error::TypeError;
pub use network::Network;
pub use payment::{PaymentFact, TxKind, TxStatus};
pub use proof::{ContentHash, FileProof};
pub use record::{ReceiptRecord, TxReference};
pub use temporal::Timestamp;
pub use txid::TxId;
