//! Ledger access for SolReceipts.
//!
//! Provides the read and write boundaries used by the receipt client, a
//! JSON-RPC implementation over HTTP, an in-memory implementation for tests
//! and demos, and the byte layouts shared with the receipt program.

pub mod codec;
pub mod error;
pub mod filter;
pub mod memory;
pub mod message;
pub mod parsed;
pub mod program;
pub mod rpc;
pub mod traits;

pub use error::{CodecError, CodecResult, LedgerError, LedgerResult};
pub use filter::AccountFilter;
pub use memory::InMemoryLedger;
pub use message::{AccountMeta, Blockhash, Instruction, Message, Transaction, PACKET_DATA_SIZE};
pub use parsed::{
    AccountData, KeyedAccount, ParsedInstruction, ParsedTransaction, SignatureInfo,
    SignatureStatus, TransferInfo,
};
pub use program::{
    create_receipt_instruction, decode_receipt_account, encode_receipt_account, CreateReceiptArgs,
    RECEIPT_PROGRAM_ID,
};
pub use rpc::HttpLedger;
pub use traits::{Ledger, LedgerReader, LedgerWriter};
