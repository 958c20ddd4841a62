//! Ledger response models: `jsonParsed` transactions, signature history,
//! signature statuses and raw accounts.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use solr_types::Address;

/// A transaction as returned by `getTransaction` with `jsonParsed` encoding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTransaction {
    #[serde(default)]
    pub slot: u64,
    #[serde(default)]
    pub block_time: Option<i64>,
    /// Execution metadata; absent while the ledger has not recorded a result.
    #[serde(default)]
    pub meta: Option<TransactionMeta>,
    pub transaction: ParsedTransactionBody,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    /// Execution error, `None` on success.
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub fee: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTransactionBody {
    pub signatures: Vec<String>,
    pub message: ParsedMessage,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedMessage {
    pub account_keys: Vec<ParsedAccountKey>,
    #[serde(default)]
    pub instructions: Vec<ParsedInstruction>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedAccountKey {
    pub pubkey: String,
    #[serde(default)]
    pub signer: bool,
    #[serde(default)]
    pub writable: bool,
}

/// One instruction, either decoded by the ledger or left in compiled form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParsedInstruction {
    Parsed(DecodedInstruction),
    Compiled(CompiledInstructionView),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedInstruction {
    #[serde(default)]
    pub program: String,
    pub program_id: String,
    /// `{"type": ..., "info": {...}}` for known programs.
    pub parsed: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledInstructionView {
    pub program_id: String,
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default)]
    pub data: String,
}

/// Destination and amount of a parsed value transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferInfo {
    pub destination: String,
    pub lamports: u64,
}

impl ParsedInstruction {
    pub fn program_id(&self) -> &str {
        match self {
            Self::Parsed(ix) => &ix.program_id,
            Self::Compiled(ix) => &ix.program_id,
        }
    }

    /// The parsed instruction type, e.g. `"transfer"`.
    pub fn instruction_type(&self) -> Option<&str> {
        match self {
            Self::Parsed(ix) => ix.parsed.get("type").and_then(Value::as_str),
            Self::Compiled(_) => None,
        }
    }

    /// Destination and lamports, when both are present in the parsed info.
    pub fn transfer(&self) -> Option<TransferInfo> {
        let Self::Parsed(ix) = self else {
            return None;
        };
        let info = ix.parsed.get("info")?;
        Some(TransferInfo {
            destination: info.get("destination")?.as_str()?.to_string(),
            lamports: info.get("lamports")?.as_u64()?,
        })
    }
}

impl ParsedTransaction {
    /// The fee payer: the first account key.
    pub fn fee_payer(&self) -> Option<&str> {
        self.transaction
            .message
            .account_keys
            .first()
            .map(|k| k.pubkey.as_str())
    }

    pub fn first_instruction(&self) -> Option<&ParsedInstruction> {
        self.transaction.message.instructions.first()
    }
}

/// One entry of `getSignaturesForAddress`, newest first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    #[serde(default)]
    pub slot: u64,
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub confirmation_status: Option<String>,
}

/// One entry of `getSignatureStatuses`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    #[serde(default)]
    pub slot: u64,
    #[serde(default)]
    pub confirmations: Option<u64>,
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub confirmation_status: Option<String>,
}

impl SignatureStatus {
    /// Returns `true` once the ledger reports `confirmed` or `finalized`.
    pub fn is_confirmed(&self) -> bool {
        matches!(
            self.confirmation_status.as_deref(),
            Some("confirmed") | Some("finalized")
        )
    }
}

/// Raw account contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountData {
    pub owner: Address,
    pub lamports: u64,
    pub data: Vec<u8>,
}

/// An account paired with its address, as returned by program-wide queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyedAccount {
    pub address: Address,
    pub account: AccountData,
}
