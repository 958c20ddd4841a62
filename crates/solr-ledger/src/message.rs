//! Legacy transaction wire format: instruction compilation, message
//! serialization and signing.

use std::fmt;

use solr_crypto::{Keypair, Signature};
use solr_types::{Address, TxId};

use crate::codec::{Reader, Writer};
use crate::error::{CodecError, CodecResult, LedgerError, LedgerResult};

/// Largest serialized transaction the ledger accepts.
pub const PACKET_DATA_SIZE: usize = 1232;

/// An account referenced by an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountMeta {
    pub address: Address,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn writable(address: Address, is_signer: bool) -> Self {
        Self {
            address,
            is_signer,
            is_writable: true,
        }
    }

    pub fn readonly(address: Address, is_signer: bool) -> Self {
        Self {
            address,
            is_signer,
            is_writable: false,
        }
    }
}

/// A program invocation before compilation into a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Address,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

/// Recent ledger block hash, binding a transaction to a validity window.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Blockhash(pub [u8; 32]);

impl Blockhash {
    pub fn from_base58(s: &str) -> CodecResult<Self> {
        let address = Address::from_base58(s).map_err(|e| CodecError::InvalidValue {
            field: "blockhash",
            reason: e.to_string(),
        })?;
        Ok(Self(*address.as_bytes()))
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl fmt::Debug for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blockhash({})", self.to_base58())
    }
}

impl fmt::Display for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,
}

/// Instruction with accounts replaced by indices into the message key table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub account_keys: Vec<Address>,
    pub recent_blockhash: Blockhash,
    pub instructions: Vec<CompiledInstruction>,
}

#[derive(Clone, Copy)]
struct KeyFlags {
    address: Address,
    is_signer: bool,
    is_writable: bool,
}

impl KeyFlags {
    /// Key table ordering: writable signers, readonly signers, writable
    /// non-signers, readonly non-signers.
    fn rank(&self) -> u8 {
        match (self.is_signer, self.is_writable) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        }
    }
}

fn index_of(keys: &[Address], address: &Address) -> LedgerResult<u8> {
    let pos = keys
        .iter()
        .position(|k| k == address)
        .ok_or_else(|| LedgerError::Internal(format!("account {address} missing from key table")))?;
    u8::try_from(pos).map_err(|_| LedgerError::Internal("more than 256 account keys".into()))
}

impl Message {
    /// Compile instructions into a message paid for by `fee_payer`.
    ///
    /// The fee payer always occupies index 0. Keys referenced more than once
    /// are merged with the union of their flags.
    pub fn compile(
        instructions: &[Instruction],
        fee_payer: &Address,
        recent_blockhash: Blockhash,
    ) -> LedgerResult<Self> {
        let mut flags: Vec<KeyFlags> = vec![KeyFlags {
            address: *fee_payer,
            is_signer: true,
            is_writable: true,
        }];
        let mut merge = |address: Address, is_signer: bool, is_writable: bool| {
            match flags.iter_mut().find(|f| f.address == address) {
                Some(existing) => {
                    existing.is_signer |= is_signer;
                    existing.is_writable |= is_writable;
                }
                None => flags.push(KeyFlags {
                    address,
                    is_signer,
                    is_writable,
                }),
            }
        };
        for ix in instructions {
            for meta in &ix.accounts {
                merge(meta.address, meta.is_signer, meta.is_writable);
            }
            merge(ix.program_id, false, false);
        }
        flags.sort_by_key(KeyFlags::rank);

        let count = |rank: u8| flags.iter().filter(|f| f.rank() == rank).count() as u8;
        let header = MessageHeader {
            num_required_signatures: count(0) + count(1),
            num_readonly_signed: count(1),
            num_readonly_unsigned: count(3),
        };
        let account_keys: Vec<Address> = flags.iter().map(|f| f.address).collect();

        let mut compiled = Vec::with_capacity(instructions.len());
        for ix in instructions {
            let accounts = ix
                .accounts
                .iter()
                .map(|meta| index_of(&account_keys, &meta.address))
                .collect::<LedgerResult<Vec<_>>>()?;
            compiled.push(CompiledInstruction {
                program_id_index: index_of(&account_keys, &ix.program_id)?,
                accounts,
                data: ix.data.clone(),
            });
        }

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions: compiled,
        })
    }

    /// Keys that must sign, in signature order.
    pub fn signer_keys(&self) -> &[Address] {
        let n = (self.header.num_required_signatures as usize).min(self.account_keys.len());
        &self.account_keys[..n]
    }

    pub fn is_signer(&self, index: usize) -> bool {
        index < self.header.num_required_signatures as usize
    }

    pub fn is_writable(&self, index: usize) -> bool {
        let signed = self.header.num_required_signatures as usize;
        let total = self.account_keys.len();
        if index < signed {
            index < signed - self.header.num_readonly_signed as usize
        } else {
            index < total.saturating_sub(self.header.num_readonly_unsigned as usize)
        }
    }

    /// Resolve a compiled account index to its key.
    pub fn key(&self, index: u8) -> CodecResult<&Address> {
        self.account_keys
            .get(index as usize)
            .ok_or_else(|| CodecError::InvalidValue {
                field: "account index",
                reason: format!("{index} out of range"),
            })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u8(self.header.num_required_signatures)
            .u8(self.header.num_readonly_signed)
            .u8(self.header.num_readonly_unsigned)
            .compact_u16(self.account_keys.len() as u16);
        for key in &self.account_keys {
            w.address(key);
        }
        w.raw(&self.recent_blockhash.0)
            .compact_u16(self.instructions.len() as u16);
        for ix in &self.instructions {
            w.u8(ix.program_id_index)
                .compact_u16(ix.accounts.len() as u16)
                .raw(&ix.accounts)
                .compact_u16(ix.data.len() as u16)
                .raw(&ix.data);
        }
        w.finish()
    }

    fn read(r: &mut Reader<'_>) -> CodecResult<Self> {
        let header = MessageHeader {
            num_required_signatures: r.u8()?,
            num_readonly_signed: r.u8()?,
            num_readonly_unsigned: r.u8()?,
        };
        let key_count = r.compact_u16()? as usize;
        let mut account_keys = Vec::with_capacity(key_count.min(r.remaining() / 32));
        for _ in 0..key_count {
            account_keys.push(r.address()?);
        }
        let recent_blockhash = Blockhash(r.array()?);
        let ix_count = r.compact_u16()? as usize;
        let mut instructions = Vec::with_capacity(ix_count.min(r.remaining()));
        for _ in 0..ix_count {
            let program_id_index = r.u8()?;
            let n = r.compact_u16()? as usize;
            let accounts = r.take(n)?.to_vec();
            let n = r.compact_u16()? as usize;
            let data = r.take(n)?.to_vec();
            instructions.push(CompiledInstruction {
                program_id_index,
                accounts,
                data,
            });
        }
        let message = Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        };
        if message.header.num_required_signatures as usize > message.account_keys.len() {
            return Err(CodecError::InvalidValue {
                field: "header",
                reason: "more required signatures than account keys".into(),
            });
        }
        Ok(message)
    }

    pub fn deserialize(data: &[u8]) -> CodecResult<Self> {
        let mut r = Reader::new(data);
        let message = Self::read(&mut r)?;
        r.finish()?;
        Ok(message)
    }
}

/// A message with one signature per required signer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub signatures: Vec<Signature>,
    pub message: Message,
}

impl Transaction {
    /// Sign `message` with the given keypairs. Every required signer must be
    /// present among `signers`; extra keypairs are ignored.
    pub fn sign(message: Message, signers: &[&Keypair]) -> LedgerResult<Self> {
        let bytes = message.serialize();
        let signatures = message
            .signer_keys()
            .iter()
            .map(|key| {
                signers
                    .iter()
                    .find(|kp| kp.address() == *key)
                    .map(|kp| kp.sign(&bytes))
                    .ok_or(LedgerError::MissingSigner(*key))
            })
            .collect::<LedgerResult<Vec<_>>>()?;
        Ok(Self {
            signatures,
            message,
        })
    }

    /// The transaction id: the fee payer's signature in base58.
    pub fn id(&self) -> Option<TxId> {
        self.signatures
            .first()
            .map(|sig| TxId::from_signature_bytes(sig.as_bytes()))
    }

    /// Check that every required signer signed the serialized message.
    pub fn verify(&self) -> bool {
        let bytes = self.message.serialize();
        let signers = self.message.signer_keys();
        signers.len() == self.signatures.len()
            && signers
                .iter()
                .zip(&self.signatures)
                .all(|(key, sig)| sig.verify(key, &bytes).is_ok())
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.compact_u16(self.signatures.len() as u16);
        for sig in &self.signatures {
            w.raw(sig.as_bytes());
        }
        w.raw(&self.message.serialize());
        w.finish()
    }

    pub fn deserialize(data: &[u8]) -> CodecResult<Self> {
        let mut r = Reader::new(data);
        let count = r.compact_u16()? as usize;
        let mut signatures = Vec::with_capacity(count.min(r.remaining() / Signature::LEN));
        for _ in 0..count {
            signatures.push(Signature::from_bytes(r.array()?));
        }
        let message = Message::read(&mut r)?;
        r.finish()?;
        if signatures.len() != message.header.num_required_signatures as usize {
            return Err(CodecError::InvalidValue {
                field: "signatures",
                reason: format!(
                    "{} signatures for {} required signers",
                    signatures.len(),
                    message.header.num_required_signatures
                ),
            });
        }
        Ok(Self {
            signatures,
            message,
        })
    }
}
