//! Receipt program interface: identifiers, discriminators, field limits, the
//! `Receipt` account layout and the `create_receipt` instruction.

use sha2::{Digest, Sha256};
use solr_types::{Address, ContentHash, FileProof, ReceiptRecord, Timestamp, TxReference};

use crate::codec::{Reader, Writer};
use crate::error::{CodecError, CodecResult};
use crate::message::{AccountMeta, Instruction};

/// Default receipt program id.
pub const RECEIPT_PROGRAM_ID: &str = "xoDRdJoAhZ4Vzqzh9vRFr5U5yMH2H4emUVqwfvLSKMb";

/// The system program (all-zero key).
pub const SYSTEM_PROGRAM: Address = Address::new([0; 32]);

pub const DISCRIMINATOR_LEN: usize = 8;

/// Byte offset of the creator key inside a receipt account.
pub const CREATOR_OFFSET: usize = DISCRIMINATOR_LEN;

/// Per-field limits enforced by the program, in bytes (or entries for files).
pub mod limits {
    pub const TX_HASH: usize = 128;
    pub const TITLE: usize = 64;
    pub const DESCRIPTION: usize = 256;
    pub const FILES: usize = 5;
    pub const FILE_NAME: usize = 64;
    pub const FILE_HASH: usize = 64;
}

/// Space allocated for one receipt account.
pub const RECEIPT_ACCOUNT_LEN: usize = DISCRIMINATOR_LEN
    + 32
    + 32
    + (4 + limits::TX_HASH)
    + (4 + limits::TITLE)
    + (4 + limits::DESCRIPTION)
    + 4
    + limits::FILES * ((4 + limits::FILE_NAME) + (4 + limits::FILE_HASH))
    + 8;

/// Smallest encoded file entry: two empty strings.
const MIN_FILE_ENTRY: usize = 8;

fn discriminator(preimage: &str) -> [u8; DISCRIMINATOR_LEN] {
    let digest = Sha256::digest(preimage.as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

/// First 8 bytes of every receipt account.
pub fn account_discriminator() -> [u8; DISCRIMINATOR_LEN] {
    discriminator("account:Receipt")
}

/// First 8 bytes of `create_receipt` instruction data.
pub fn create_receipt_discriminator() -> [u8; DISCRIMINATOR_LEN] {
    discriminator("global:create_receipt")
}

fn check_discriminator(reader: &mut Reader<'_>, expected: [u8; 8]) -> CodecResult<()> {
    let found: [u8; 8] = reader.array()?;
    if found != expected {
        return Err(CodecError::DiscriminatorMismatch {
            expected: hex::encode(expected),
            found: hex::encode(found),
        });
    }
    Ok(())
}

fn check_len(field: &'static str, len: usize, max: usize) -> CodecResult<()> {
    if len > max {
        return Err(CodecError::LengthExceeded { field, len, max });
    }
    Ok(())
}

fn write_files(w: &mut Writer, files: &[FileProof]) {
    w.seq_len(files.len());
    for file in files {
        w.string(&file.name);
        w.string(&file.content_hash.to_hex());
    }
}

fn read_files(r: &mut Reader<'_>) -> CodecResult<Vec<FileProof>> {
    let count = r.seq_len("files", MIN_FILE_ENTRY)?;
    let mut files = Vec::with_capacity(count);
    for _ in 0..count {
        let name = r.string("files.name")?;
        let hash = r.string("files.hash")?;
        let content_hash =
            ContentHash::from_hex(&hash).map_err(|e| CodecError::InvalidValue {
                field: "files.hash",
                reason: e.to_string(),
            })?;
        files.push(FileProof::new(name, content_hash));
    }
    Ok(files)
}

/// Arguments of the `create_receipt` instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateReceiptArgs {
    pub payer: Address,
    pub tx_hash: String,
    pub title: String,
    pub description: String,
    pub files: Vec<FileProof>,
}

impl CreateReceiptArgs {
    /// Check every field against the program's limits.
    pub fn validate(&self) -> CodecResult<()> {
        check_len("tx_hash", self.tx_hash.len(), limits::TX_HASH)?;
        check_len("title", self.title.len(), limits::TITLE)?;
        check_len("description", self.description.len(), limits::DESCRIPTION)?;
        check_len("files", self.files.len(), limits::FILES)?;
        for file in &self.files {
            check_len("files.name", file.name.len(), limits::FILE_NAME)?;
            check_len("files.hash", file.content_hash.to_hex().len(), limits::FILE_HASH)?;
        }
        Ok(())
    }

    /// Instruction data: discriminator followed by the arguments.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.raw(&create_receipt_discriminator())
            .address(&self.payer)
            .string(&self.tx_hash)
            .string(&self.title)
            .string(&self.description);
        write_files(&mut w, &self.files);
        w.finish()
    }

    pub fn decode(data: &[u8]) -> CodecResult<Self> {
        let mut r = Reader::new(data);
        check_discriminator(&mut r, create_receipt_discriminator())?;
        let args = Self {
            payer: r.address()?,
            tx_hash: r.string("tx_hash")?,
            title: r.string("title")?,
            description: r.string("description")?,
            files: read_files(&mut r)?,
        };
        r.finish()?;
        Ok(args)
    }
}

/// Build a `create_receipt` instruction. `receipt` is the fresh account to be
/// initialized and `user` signs and pays for it.
pub fn create_receipt_instruction(
    program_id: Address,
    receipt: Address,
    user: Address,
    args: &CreateReceiptArgs,
) -> Instruction {
    Instruction {
        program_id,
        accounts: vec![
            AccountMeta::writable(receipt, true),
            AccountMeta::writable(user, true),
            AccountMeta::readonly(SYSTEM_PROGRAM, false),
        ],
        data: args.encode(),
    }
}

/// Encode a receipt account, zero-padded to [`RECEIPT_ACCOUNT_LEN`].
pub fn encode_receipt_account(record: &ReceiptRecord) -> Vec<u8> {
    let mut w = Writer::with_capacity(RECEIPT_ACCOUNT_LEN);
    w.raw(&account_discriminator())
        .address(&record.creator)
        .address(&record.payer)
        .string(record.tx_hash.raw())
        .string(&record.title)
        .string(&record.description);
    write_files(&mut w, &record.files);
    w.i64(record.timestamp.unix_seconds());
    let mut data = w.finish();
    if data.len() < RECEIPT_ACCOUNT_LEN {
        data.resize(RECEIPT_ACCOUNT_LEN, 0);
    }
    data
}

/// Decode a receipt account stored at `address`.
///
/// The discriminator is checked before anything else. Unused space after the
/// timestamp is ignored.
pub fn decode_receipt_account(address: Address, data: &[u8]) -> CodecResult<ReceiptRecord> {
    let mut r = Reader::new(data);
    check_discriminator(&mut r, account_discriminator())?;
    Ok(ReceiptRecord {
        address,
        creator: r.address()?,
        payer: r.address()?,
        tx_hash: TxReference::new(r.string("tx_hash")?),
        title: r.string("title")?,
        description: r.string("description")?,
        files: read_files(&mut r)?,
        timestamp: Timestamp::from_unix(r.i64()?),
    })
}
