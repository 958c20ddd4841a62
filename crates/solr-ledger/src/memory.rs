use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::json;
use sha2::{Digest, Sha256};
use solr_types::{Address, Network, ReceiptRecord, Timestamp, TxId, TxReference};

use crate::error::LedgerError;
use crate::filter::AccountFilter;
use crate::message::{Blockhash, Message, Transaction, PACKET_DATA_SIZE};
use crate::parsed::{
    AccountData, CompiledInstructionView, DecodedInstruction, KeyedAccount, ParsedAccountKey,
    ParsedInstruction, ParsedMessage, ParsedTransaction, ParsedTransactionBody, SignatureInfo,
    SignatureStatus, TransactionMeta,
};
use crate::program::{
    decode_receipt_account, encode_receipt_account, CreateReceiptArgs, RECEIPT_ACCOUNT_LEN,
    SYSTEM_PROGRAM,
};
use crate::traits::{LedgerReader, LedgerWriter};

/// Fee charged per signature.
const SIGNATURE_FEE: u64 = 5_000;

/// Rent-exempt balance deposited into each receipt account.
const RECEIPT_ACCOUNT_LAMPORTS: u64 = 9_410_880;

/// In-memory ledger for tests, local demos and embedding.
///
/// Executes `create_receipt` the way the deployed program does: both
/// signatures are checked, the receipt account must be fresh, and the
/// creator and timestamp come from the ledger, not from the caller.
pub struct InMemoryLedger {
    network: Network,
    program_id: Address,
    inner: RwLock<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    slot: u64,
    clock: Option<Timestamp>,
    recent_blockhashes: Vec<Blockhash>,
    transactions: HashMap<String, ParsedTransaction>,
    /// Oldest first; reversed when read.
    history: HashMap<Address, Vec<SignatureInfo>>,
    /// Creation order.
    accounts: Vec<KeyedAccount>,
    unavailable: bool,
    reject_next_send: Option<String>,
}

impl LedgerState {
    fn now(&self) -> Timestamp {
        self.clock.unwrap_or_else(Timestamp::now)
    }

    fn account(&self, address: &Address) -> Option<&AccountData> {
        self.accounts
            .iter()
            .find(|k| k.address == *address)
            .map(|k| &k.account)
    }

    fn next_slot(&mut self) -> u64 {
        self.slot += 1;
        self.slot
    }

    fn record(&mut self, tx: ParsedTransaction) -> Result<TxId, LedgerError> {
        let signature = tx
            .transaction
            .signatures
            .first()
            .cloned()
            .ok_or_else(|| LedgerError::Rejected("transaction has no signatures".into()))?;
        let id = TxId::new(signature.clone())
            .map_err(|e| LedgerError::Rejected(format!("invalid signature: {e}")))?;
        let info = SignatureInfo {
            signature: signature.clone(),
            slot: tx.slot,
            err: tx.meta.as_ref().and_then(|m| m.err.clone()),
            block_time: tx.block_time,
            confirmation_status: Some("finalized".into()),
        };
        for key in &tx.transaction.message.account_keys {
            if let Ok(address) = Address::from_base58(&key.pubkey) {
                self.history.entry(address).or_default().push(info.clone());
            }
        }
        self.transactions.insert(signature, tx);
        Ok(id)
    }
}

/// Deterministic per network, so the same slot on two ledgers yields
/// different ids.
fn synthetic_signature(network: &str, slot: u64) -> [u8; 64] {
    let mut out = [0u8; 64];
    for (half, chunk) in out.chunks_mut(32).enumerate() {
        let digest = Sha256::new()
            .chain_update(b"transfer")
            .chain_update(network.as_bytes())
            .chain_update(slot.to_le_bytes())
            .chain_update([half as u8])
            .finalize();
        chunk.copy_from_slice(&digest);
    }
    out
}

impl InMemoryLedger {
    pub fn new(network: Network, program_id: Address) -> Self {
        Self {
            network,
            program_id,
            inner: RwLock::new(LedgerState::default()),
        }
    }

    pub fn program_id(&self) -> Address {
        self.program_id
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerState>, LedgerError> {
        self.inner
            .read()
            .map_err(|_| LedgerError::Internal("ledger read lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerState>, LedgerError> {
        self.inner
            .write()
            .map_err(|_| LedgerError::Internal("ledger write lock poisoned".into()))
    }

    /// Read access that fails like a dead endpoint while the ledger is
    /// marked unavailable.
    fn available(&self) -> Result<RwLockReadGuard<'_, LedgerState>, LedgerError> {
        let state = self.read()?;
        if state.unavailable {
            return Err(LedgerError::Transport {
                network: self.network.name.clone(),
                reason: "endpoint unavailable".into(),
            });
        }
        Ok(state)
    }

    /// Fix the ledger clock. Until set, the wall clock is used.
    pub fn set_clock(&self, at: Timestamp) -> Result<(), LedgerError> {
        self.write()?.clock = Some(at);
        Ok(())
    }

    /// Make every call fail with a transport error until cleared.
    pub fn set_unavailable(&self, unavailable: bool) -> Result<(), LedgerError> {
        self.write()?.unavailable = unavailable;
        Ok(())
    }

    /// Reject the next submitted transaction with `reason`.
    pub fn reject_next_send(&self, reason: impl Into<String>) -> Result<(), LedgerError> {
        self.write()?.reject_next_send = Some(reason.into());
        Ok(())
    }

    /// Record an already-executed transaction as-is.
    pub fn insert_transaction(&self, tx: ParsedTransaction) -> Result<TxId, LedgerError> {
        self.write()?.record(tx)
    }

    /// Place raw bytes at `address`, bypassing the program.
    pub fn insert_account(&self, address: Address, account: AccountData) -> Result<(), LedgerError> {
        let mut state = self.write()?;
        state.accounts.retain(|k| k.address != address);
        state.accounts.push(KeyedAccount { address, account });
        Ok(())
    }

    /// Execute a successful system transfer and return its id.
    pub fn record_transfer(
        &self,
        from: &Address,
        to: &Address,
        lamports: u64,
    ) -> Result<TxId, LedgerError> {
        let mut state = self.write()?;
        let slot = state.next_slot();
        let signature = bs58::encode(synthetic_signature(&self.network.name, slot)).into_string();
        let tx = ParsedTransaction {
            slot,
            block_time: Some(state.now().unix_seconds()),
            meta: Some(TransactionMeta {
                err: None,
                fee: SIGNATURE_FEE,
            }),
            transaction: ParsedTransactionBody {
                signatures: vec![signature],
                message: ParsedMessage {
                    account_keys: vec![
                        ParsedAccountKey {
                            pubkey: from.to_base58(),
                            signer: true,
                            writable: true,
                        },
                        ParsedAccountKey {
                            pubkey: to.to_base58(),
                            signer: false,
                            writable: true,
                        },
                        ParsedAccountKey {
                            pubkey: SYSTEM_PROGRAM.to_base58(),
                            signer: false,
                            writable: false,
                        },
                    ],
                    instructions: vec![ParsedInstruction::Parsed(DecodedInstruction {
                        program: "system".into(),
                        program_id: SYSTEM_PROGRAM.to_base58(),
                        parsed: json!({
                            "type": "transfer",
                            "info": {
                                "source": from.to_base58(),
                                "destination": to.to_base58(),
                                "lamports": lamports,
                            }
                        }),
                    })],
                },
            },
        };
        state.record(tx)
    }

    /// Number of accounts currently stored.
    pub fn account_count(&self) -> Result<usize, LedgerError> {
        Ok(self.read()?.accounts.len())
    }

    /// Decode every receipt account owned by the program.
    pub fn receipts(&self) -> Result<Vec<ReceiptRecord>, LedgerError> {
        let state = self.read()?;
        state
            .accounts
            .iter()
            .filter(|k| {
                k.account.owner == self.program_id && k.account.data.len() == RECEIPT_ACCOUNT_LEN
            })
            .map(|k| decode_receipt_account(k.address, &k.account.data).map_err(LedgerError::from))
            .collect()
    }

    /// Validate one `create_receipt` instruction and build the account it
    /// initializes.
    fn execute_create_receipt(
        &self,
        state: &LedgerState,
        message: &Message,
        index: usize,
        staged: &[KeyedAccount],
    ) -> Result<KeyedAccount, LedgerError> {
        let ix = &message.instructions[index];
        let reject = |reason: String| LedgerError::Rejected(format!("instruction {index}: {reason}"));

        let program = *message.key(ix.program_id_index)?;
        if program != self.program_id {
            return Err(reject(format!("unsupported program {program}")));
        }
        let [receipt_ix, user_ix, system_ix] = ix.accounts[..] else {
            return Err(reject(format!("expected 3 accounts, got {}", ix.accounts.len())));
        };
        let receipt = *message.key(receipt_ix)?;
        let user = *message.key(user_ix)?;
        if *message.key(system_ix)? != SYSTEM_PROGRAM {
            return Err(reject("third account must be the system program".into()));
        }
        let receipt_pos = receipt_ix as usize;
        if !message.is_signer(receipt_pos) || !message.is_writable(receipt_pos) {
            return Err(reject("receipt account must sign and be writable".into()));
        }
        if !message.is_signer(user_ix as usize) {
            return Err(reject("user must sign".into()));
        }

        let args = CreateReceiptArgs::decode(&ix.data)
            .map_err(|e| reject(format!("invalid instruction data: {e}")))?;
        args.validate().map_err(|e| reject(e.to_string()))?;

        if state.account(&receipt).is_some() || staged.iter().any(|k| k.address == receipt) {
            return Err(reject(format!("account {receipt} already in use")));
        }

        let record = ReceiptRecord {
            address: receipt,
            creator: user,
            payer: args.payer,
            tx_hash: TxReference::new(args.tx_hash),
            title: args.title,
            description: args.description,
            files: args.files,
            timestamp: state.now(),
        };
        Ok(KeyedAccount {
            address: receipt,
            account: AccountData {
                owner: self.program_id,
                lamports: RECEIPT_ACCOUNT_LAMPORTS,
                data: encode_receipt_account(&record),
            },
        })
    }
}

fn parsed_view(tx: &Transaction, slot: u64, at: Timestamp) -> ParsedTransaction {
    let message = &tx.message;
    let account_keys = message
        .account_keys
        .iter()
        .enumerate()
        .map(|(i, key)| ParsedAccountKey {
            pubkey: key.to_base58(),
            signer: message.is_signer(i),
            writable: message.is_writable(i),
        })
        .collect();
    let key = |i: u8| {
        message
            .account_keys
            .get(i as usize)
            .map(Address::to_base58)
            .unwrap_or_default()
    };
    let instructions = message
        .instructions
        .iter()
        .map(|ix| {
            ParsedInstruction::Compiled(CompiledInstructionView {
                program_id: key(ix.program_id_index),
                accounts: ix.accounts.iter().map(|i| key(*i)).collect(),
                data: bs58::encode(&ix.data).into_string(),
            })
        })
        .collect();
    ParsedTransaction {
        slot,
        block_time: Some(at.unix_seconds()),
        meta: Some(TransactionMeta {
            err: None,
            fee: SIGNATURE_FEE * tx.signatures.len() as u64,
        }),
        transaction: ParsedTransactionBody {
            signatures: tx
                .signatures
                .iter()
                .map(|s| bs58::encode(s.as_bytes()).into_string())
                .collect(),
            message: ParsedMessage {
                account_keys,
                instructions,
            },
        },
    }
}

#[async_trait]
impl LedgerReader for InMemoryLedger {
    fn network(&self) -> &Network {
        &self.network
    }

    async fn get_transaction(&self, id: &TxId) -> Result<Option<ParsedTransaction>, LedgerError> {
        Ok(self.available()?.transactions.get(id.as_str()).cloned())
    }

    async fn signatures_for_address(
        &self,
        address: &Address,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, LedgerError> {
        let state = self.available()?;
        Ok(state
            .history
            .get(address)
            .map(|entries| entries.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn get_account(&self, address: &Address) -> Result<Option<AccountData>, LedgerError> {
        Ok(self.available()?.account(address).cloned())
    }

    async fn program_accounts(
        &self,
        program: &Address,
        filters: &[AccountFilter],
    ) -> Result<Vec<KeyedAccount>, LedgerError> {
        let state = self.available()?;
        Ok(state
            .accounts
            .iter()
            .filter(|k| k.account.owner == *program)
            .filter(|k| filters.iter().all(|f| f.matches(&k.account.data)))
            .cloned()
            .collect())
    }

    async fn signature_status(&self, id: &TxId) -> Result<Option<SignatureStatus>, LedgerError> {
        let state = self.available()?;
        Ok(state.transactions.get(id.as_str()).map(|tx| SignatureStatus {
            slot: tx.slot,
            confirmations: None,
            err: tx.meta.as_ref().and_then(|m| m.err.clone()),
            confirmation_status: Some("finalized".into()),
        }))
    }
}

#[async_trait]
impl LedgerWriter for InMemoryLedger {
    async fn latest_blockhash(&self) -> Result<Blockhash, LedgerError> {
        drop(self.available()?);
        let mut state = self.write()?;
        let slot = state.next_slot();
        let digest = Sha256::new()
            .chain_update(b"blockhash")
            .chain_update(self.network.name.as_bytes())
            .chain_update(slot.to_le_bytes())
            .finalize();
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&digest);
        let blockhash = Blockhash(hash);
        state.recent_blockhashes.push(blockhash);
        Ok(blockhash)
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<TxId, LedgerError> {
        drop(self.available()?);
        let mut state = self.write()?;
        if let Some(reason) = state.reject_next_send.take() {
            return Err(LedgerError::Rejected(reason));
        }
        let size = tx.serialize().len();
        if size > PACKET_DATA_SIZE {
            return Err(LedgerError::Rejected(format!(
                "transaction too large: {size} bytes > {PACKET_DATA_SIZE}"
            )));
        }
        if !state.recent_blockhashes.contains(&tx.message.recent_blockhash) {
            return Err(LedgerError::Rejected("blockhash not found".into()));
        }
        if !tx.verify() {
            return Err(LedgerError::Rejected("signature verification failed".into()));
        }
        if tx.message.instructions.is_empty() {
            return Err(LedgerError::Rejected("transaction has no instructions".into()));
        }

        let mut staged = Vec::with_capacity(tx.message.instructions.len());
        for index in 0..tx.message.instructions.len() {
            let account = self.execute_create_receipt(&state, &tx.message, index, &staged)?;
            staged.push(account);
        }

        let slot = state.next_slot();
        let at = state.now();
        state.accounts.extend(staged);
        state.record(parsed_view(tx, slot, at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::create_receipt_instruction;
    use solr_crypto::Keypair;
    use solr_types::{ContentHash, FileProof};

    fn ledger() -> InMemoryLedger {
        let ledger = InMemoryLedger::new(Network::localnet(), Address::new([9; 32]));
        ledger.set_clock(Timestamp::from_unix(1_700_000_000)).unwrap();
        ledger
    }

    fn args(payer: Address, tx_hash: &str) -> CreateReceiptArgs {
        CreateReceiptArgs {
            payer,
            tx_hash: tx_hash.into(),
            title: "Dinner".into(),
            description: "Team dinner".into(),
            files: vec![FileProof::new("bill.pdf", ContentHash::from_bytes([3; 32]))],
        }
    }

    async fn signed_create(
        ledger: &InMemoryLedger,
        user: &Keypair,
        receipt: &Keypair,
        args: &CreateReceiptArgs,
    ) -> Transaction {
        let ix = create_receipt_instruction(ledger.program_id(), receipt.address(), user.address(), args);
        let blockhash = ledger.latest_blockhash().await.unwrap();
        let msg = Message::compile(&[ix], &user.address(), blockhash).unwrap();
        Transaction::sign(msg, &[user, receipt]).unwrap()
    }

    #[tokio::test]
    async fn transfer_is_recorded_and_indexed() {
        let ledger = ledger();
        let from = Address::new([1; 32]);
        let to = Address::new([2; 32]);
        let id = ledger.record_transfer(&from, &to, 1_500_000_000).unwrap();

        let tx = ledger.get_transaction(&id).await.unwrap().unwrap();
        assert_eq!(tx.fee_payer(), Some(from.to_base58().as_str()));
        let transfer = tx.first_instruction().unwrap().transfer().unwrap();
        assert_eq!(transfer.lamports, 1_500_000_000);
        assert_eq!(transfer.destination, to.to_base58());
        assert_eq!(tx.block_time, Some(1_700_000_000));

        let history = ledger.signatures_for_address(&to, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].signature, id.as_str());
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let ledger = ledger();
        let from = Address::new([1; 32]);
        let ids: Vec<_> = (0..5)
            .map(|i| ledger.record_transfer(&from, &Address::new([2; 32]), i).unwrap())
            .collect();
        let history = ledger.signatures_for_address(&from, 3).await.unwrap();
        let got: Vec<_> = history.iter().map(|s| s.signature.clone()).collect();
        assert_eq!(got, vec![ids[4].to_string(), ids[3].to_string(), ids[2].to_string()]);
    }

    #[tokio::test]
    async fn create_receipt_initializes_account() {
        let ledger = ledger();
        let user = Keypair::generate();
        let receipt = Keypair::generate();
        let payer = Address::new([5; 32]);
        let tx = signed_create(&ledger, &user, &receipt, &args(payer, "SIGPAY")).await;

        let id = ledger.send_transaction(&tx).await.unwrap();
        assert_eq!(Some(id.clone()), tx.id());

        let account = ledger.get_account(&receipt.address()).await.unwrap().unwrap();
        assert_eq!(account.owner, ledger.program_id());
        assert_eq!(account.data.len(), RECEIPT_ACCOUNT_LEN);
        let record = decode_receipt_account(receipt.address(), &account.data).unwrap();
        assert_eq!(record.creator, user.address());
        assert_eq!(record.payer, payer);
        assert_eq!(record.tx_hash.raw(), "SIGPAY");
        assert_eq!(record.timestamp, Timestamp::from_unix(1_700_000_000));

        let status = ledger.signature_status(&id).await.unwrap().unwrap();
        assert!(status.is_confirmed());
        let created = ledger.get_transaction(&id).await.unwrap().unwrap();
        assert_eq!(
            created.first_instruction().unwrap().program_id(),
            ledger.program_id().to_base58()
        );
    }

    #[tokio::test]
    async fn reused_receipt_account_is_rejected() {
        let ledger = ledger();
        let user = Keypair::generate();
        let receipt = Keypair::generate();
        let tx = signed_create(&ledger, &user, &receipt, &args(Address::new([5; 32]), "A")).await;
        ledger.send_transaction(&tx).await.unwrap();

        let again = signed_create(&ledger, &user, &receipt, &args(Address::new([5; 32]), "B")).await;
        let err = ledger.send_transaction(&again).await.unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(ref r) if r.contains("already in use")));
        assert_eq!(ledger.account_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn tampered_transaction_is_rejected() {
        let ledger = ledger();
        let user = Keypair::generate();
        let receipt = Keypair::generate();
        let mut tx = signed_create(&ledger, &user, &receipt, &args(Address::new([5; 32]), "A")).await;
        tx.signatures.swap(0, 1);
        let err = ledger.send_transaction(&tx).await.unwrap_err();
        assert_eq!(err, LedgerError::Rejected("signature verification failed".into()));
        assert_eq!(ledger.account_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_blockhash_is_rejected() {
        let ledger = ledger();
        let user = Keypair::generate();
        let receipt = Keypair::generate();
        let ix = create_receipt_instruction(
            ledger.program_id(),
            receipt.address(),
            user.address(),
            &args(Address::new([5; 32]), "A"),
        );
        let msg = Message::compile(&[ix], &user.address(), Blockhash([0xee; 32])).unwrap();
        let tx = Transaction::sign(msg, &[&user, &receipt]).unwrap();
        let err = ledger.send_transaction(&tx).await.unwrap_err();
        assert_eq!(err, LedgerError::Rejected("blockhash not found".into()));
    }

    #[tokio::test]
    async fn oversized_fields_are_rejected_by_the_program() {
        let ledger = ledger();
        let user = Keypair::generate();
        let receipt = Keypair::generate();
        let mut oversized = args(Address::new([5; 32]), "A");
        oversized.description = "d".repeat(300);
        let tx = signed_create(&ledger, &user, &receipt, &oversized).await;
        assert!(matches!(
            ledger.send_transaction(&tx).await,
            Err(LedgerError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn oversized_transaction_is_rejected() {
        let ledger = ledger();
        let user = Keypair::generate();
        let receipt = Keypair::generate();
        // Every field is within the program's limits, the packet is not.
        let big = CreateReceiptArgs {
            payer: Address::new([5; 32]),
            tx_hash: "S".repeat(88),
            title: "t".repeat(64),
            description: "d".repeat(256),
            files: (0..5)
                .map(|i| FileProof::new(format!("{i}").repeat(64), ContentHash::from_bytes([i; 32])))
                .collect(),
        };
        big.validate().unwrap();
        let tx = signed_create(&ledger, &user, &receipt, &big).await;
        assert!(tx.serialize().len() > PACKET_DATA_SIZE);

        let err = ledger.send_transaction(&tx).await.unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(ref r) if r.contains("too large")));
        assert_eq!(ledger.account_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn injected_rejection_applies_once() {
        let ledger = ledger();
        let user = Keypair::generate();
        let receipt = Keypair::generate();
        ledger.reject_next_send("insufficient funds").unwrap();
        let tx = signed_create(&ledger, &user, &receipt, &args(Address::new([5; 32]), "A")).await;
        assert_eq!(
            ledger.send_transaction(&tx).await.unwrap_err(),
            LedgerError::Rejected("insufficient funds".into())
        );
        assert!(ledger.send_transaction(&tx).await.is_ok());
    }

    #[tokio::test]
    async fn unavailable_ledger_fails_with_transport_error() {
        let ledger = ledger();
        ledger.set_unavailable(true).unwrap();
        let err = ledger
            .get_transaction(&TxId::new("SIG").unwrap())
            .await
            .unwrap_err();
        assert!(err.is_transport());
        ledger.set_unavailable(false).unwrap();
        assert!(ledger
            .get_transaction(&TxId::new("SIG").unwrap())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn program_accounts_filter_by_creator() {
        let ledger = ledger();
        let alice = Keypair::generate();
        let bob = Keypair::generate();
        for (user, tx_hash) in [(&alice, "A1"), (&bob, "B1"), (&alice, "A2")] {
            let receipt = Keypair::generate();
            let tx = signed_create(&ledger, user, &receipt, &args(Address::new([5; 32]), tx_hash)).await;
            ledger.send_transaction(&tx).await.unwrap();
        }
        ledger
            .insert_account(
                Address::new([8; 32]),
                AccountData {
                    owner: Address::new([0x42; 32]),
                    lamports: 1,
                    data: vec![0; 64],
                },
            )
            .unwrap();

        let filters = [AccountFilter::receipt_accounts(), AccountFilter::creator(&alice.address())];
        let found = ledger
            .program_accounts(&ledger.program_id(), &filters)
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        let refs: Vec<_> = found
            .iter()
            .map(|k| decode_receipt_account(k.address, &k.account.data).unwrap().tx_hash)
            .map(|t| t.raw().to_string())
            .collect();
        assert_eq!(refs, vec!["A1", "A2"]);
        assert_eq!(ledger.receipts().unwrap().len(), 3);
    }
}
