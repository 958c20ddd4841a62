use std::sync::Arc;

use serde::{Deserialize, Serialize};
use solr_crypto::Keypair;
use solr_ledger::{
    create_receipt_instruction, CreateReceiptArgs, Ledger, Message, Transaction, PACKET_DATA_SIZE,
};
use solr_types::{Address, FileProof, TxId};
use tracing::{debug, info, warn};

use crate::config::ConfirmationConfig;
use crate::error::{ReceiptError, ReceiptResult};
use crate::resolver::ResolvedTransaction;

/// User-supplied receipt metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptDraft {
    pub title: String,
    pub description: String,
    pub files: Vec<FileProof>,
}

impl ReceiptDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn files(mut self, files: Vec<FileProof>) -> Self {
        self.files = files;
        self
    }
}

/// Builds, signs and submits `create_receipt` transactions.
#[derive(Clone)]
pub struct ReceiptSubmitter {
    ledger: Arc<dyn Ledger>,
    program_id: Address,
    signer: Option<Arc<Keypair>>,
    confirmation: ConfirmationConfig,
}

impl ReceiptSubmitter {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        program_id: Address,
        signer: Option<Arc<Keypair>>,
        confirmation: ConfirmationConfig,
    ) -> Self {
        Self {
            ledger,
            program_id,
            signer,
            confirmation,
        }
    }

    pub fn signer(&self) -> Option<Address> {
        self.signer.as_ref().map(|kp| kp.address())
    }

    /// Create a receipt for a resolved payment and return its new address.
    ///
    /// Fails with a precondition error when no signer is bound, when
    /// `payment` is `None` (not yet resolved), or when a field exceeds the
    /// program's limits or the signed transaction exceeds the ledger's
    /// packet size. Every call generates a fresh receipt account, so a
    /// repeated call creates a second receipt. The transaction is sent once
    /// and never resent. On any error other than
    /// [`ReceiptError::Unconfirmed`] the ledger holds no receipt from this
    /// call; `Unconfirmed` means the outcome could not be observed.
    pub async fn submit(
        &self,
        payment: Option<&ResolvedTransaction>,
        draft: &ReceiptDraft,
    ) -> ReceiptResult<Address> {
        let signer = self
            .signer
            .as_deref()
            .ok_or_else(|| ReceiptError::precondition("no signer is bound"))?;
        let payment = payment
            .ok_or_else(|| ReceiptError::precondition("payment facts have not been resolved"))?;

        let args = CreateReceiptArgs {
            payer: payment.fact.payer,
            tx_hash: payment.id.to_string(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            files: draft.files.clone(),
        };
        args.validate()
            .map_err(|e| ReceiptError::precondition(e.to_string()))?;

        let receipt = Keypair::generate();
        let address = receipt.address();
        let ix = create_receipt_instruction(self.program_id, address, signer.address(), &args);

        let result = async {
            let blockhash = self.ledger.latest_blockhash().await?;
            let message = Message::compile(&[ix], &signer.address(), blockhash)?;
            let tx = Transaction::sign(message, &[signer, &receipt])?;
            let size = tx.serialize().len();
            if size > PACKET_DATA_SIZE {
                return Err(ReceiptError::precondition(format!(
                    "signed transaction is {size} bytes, over the {PACKET_DATA_SIZE}-byte limit; \
                     shorten the title, description or file names"
                )));
            }
            let id = self.ledger.send_transaction(&tx).await?;
            self.confirm(&id, &address).await?;
            Ok::<_, ReceiptError>(id)
        }
        .await;

        match result {
            Ok(id) => {
                info!(
                    receipt = %address,
                    tx = %id.short(),
                    references = %payment.id.short(),
                    network = %self.ledger.network().name,
                    "receipt created"
                );
                Ok(address)
            }
            Err(e) => {
                warn!(references = %payment.id.short(), error = %e, "receipt submission failed");
                Err(e)
            }
        }
    }

    /// Poll the signature status until confirmed or failed. When polling
    /// runs out, an existing receipt account still counts as success.
    async fn confirm(&self, id: &TxId, receipt: &Address) -> ReceiptResult<()> {
        let attempts = self.confirmation.attempts;
        if attempts == 0 {
            return Ok(());
        }
        for attempt in 1..=attempts {
            if let Some(status) = self.ledger.signature_status(id).await? {
                if let Some(err) = &status.err {
                    return Err(ReceiptError::Submission(format!(
                        "transaction {id} failed: {err}"
                    )));
                }
                if status.is_confirmed() {
                    return Ok(());
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.confirmation.interval()).await;
            }
        }
        match self.ledger.get_account(receipt).await {
            Ok(Some(account)) if account.owner == self.program_id => {
                debug!(tx = %id.short(), receipt = %receipt, "status unconfirmed but receipt account exists");
                Ok(())
            }
            _ => Err(ReceiptError::Unconfirmed {
                id: id.clone(),
                receipt: *receipt,
                attempts,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::TransactionResolver;
    use async_trait::async_trait;
    use serde_json::json;
    use solr_ledger::{
        decode_receipt_account, AccountData, AccountFilter, Blockhash, InMemoryLedger, KeyedAccount,
        LedgerError, LedgerReader, LedgerWriter, ParsedTransaction, SignatureInfo, SignatureStatus,
        Transaction,
    };
    use solr_types::{ContentHash, Network};

    const PROGRAM: Address = Address::new([9; 32]);

    struct Fixture {
        ledger: Arc<InMemoryLedger>,
        user: Arc<Keypair>,
        payment: ResolvedTransaction,
    }

    async fn fixture() -> Fixture {
        let ledger = Arc::new(InMemoryLedger::new(Network::localnet(), PROGRAM));
        let payer = Address::new([5; 32]);
        let id = ledger.record_transfer(&payer, &Address::new([6; 32]), 42).unwrap();
        let payment = TransactionResolver::new(ledger.clone(), PROGRAM)
            .resolve(&id)
            .await
            .unwrap();
        Fixture {
            ledger,
            user: Arc::new(Keypair::generate()),
            payment,
        }
    }

    fn submitter(f: &Fixture, signer: Option<Arc<Keypair>>) -> ReceiptSubmitter {
        ReceiptSubmitter::new(f.ledger.clone(), PROGRAM, signer, ConfirmationConfig::default())
    }

    #[tokio::test]
    async fn submit_creates_account_with_payment_facts() {
        let f = fixture().await;
        let draft = ReceiptDraft::new("Groceries")
            .files(vec![FileProof::new("a.pdf", ContentHash::from_bytes([1; 32]))]);
        let address = submitter(&f, Some(f.user.clone()))
            .submit(Some(&f.payment), &draft)
            .await
            .unwrap();

        let receipts = f.ledger.receipts().unwrap();
        assert_eq!(receipts.len(), 1);
        let record = &receipts[0];
        assert_eq!(record.address, address);
        assert_eq!(record.creator, f.user.address());
        assert_eq!(record.payer, Address::new([5; 32]));
        assert!(record.references(&f.payment.id));
        assert_eq!(record.description, "");
    }

    #[tokio::test]
    async fn missing_signer_is_precondition_failure() {
        let f = fixture().await;
        let err = submitter(&f, None)
            .submit(Some(&f.payment), &ReceiptDraft::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::PreconditionFailure);
        assert_eq!(f.ledger.account_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn unresolved_payment_is_precondition_failure() {
        let f = fixture().await;
        let err = submitter(&f, Some(f.user.clone()))
            .submit(None, &ReceiptDraft::new("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::PreconditionFailure);
        assert_eq!(f.ledger.account_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn over_limit_fields_fail_before_submission() {
        let f = fixture().await;
        let draft = ReceiptDraft::new("t".repeat(65));
        let err = submitter(&f, Some(f.user.clone()))
            .submit(Some(&f.payment), &draft)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::PreconditionFailure);

        let files = (0..6)
            .map(|i| FileProof::new(format!("f{i}"), ContentHash::from_bytes([i; 32])))
            .collect();
        let err = submitter(&f, Some(f.user.clone()))
            .submit(Some(&f.payment), &ReceiptDraft::new("t").files(files))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::PreconditionFailure);
        assert_eq!(f.ledger.account_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn rejection_leaves_no_account() {
        let f = fixture().await;
        f.ledger.reject_next_send("insufficient funds for fee").unwrap();
        let err = submitter(&f, Some(f.user.clone()))
            .submit(Some(&f.payment), &ReceiptDraft::new("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::SubmissionFailure);
        assert_eq!(f.ledger.account_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn each_submission_gets_a_fresh_address() {
        let f = fixture().await;
        let s = submitter(&f, Some(f.user.clone()));
        let draft = ReceiptDraft::new("x");
        let first = s.submit(Some(&f.payment), &draft).await.unwrap();
        let second = s.submit(Some(&f.payment), &draft).await.unwrap();
        assert_ne!(first, second);

        let account = f.ledger.get_account(&second).await.unwrap().unwrap();
        let record = decode_receipt_account(second, &account.data).unwrap();
        assert!(record.references(&f.payment.id));
    }

    #[tokio::test]
    async fn unavailable_ledger_is_transport_failure() {
        let f = fixture().await;
        f.ledger.set_unavailable(true).unwrap();
        let err = submitter(&f, Some(f.user.clone()))
            .submit(Some(&f.payment), &ReceiptDraft::new("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::TransportFailure);
    }

    /// Delegates to an in-memory ledger but reports a fixed signature status.
    struct FixedStatus {
        inner: Arc<InMemoryLedger>,
        status: Option<SignatureStatus>,
        /// Accept sends without executing them, like a dropped transaction.
        drop_sends: bool,
    }

    #[async_trait]
    impl LedgerReader for FixedStatus {
        fn network(&self) -> &Network {
            self.inner.network()
        }
        async fn get_transaction(&self, id: &TxId) -> Result<Option<ParsedTransaction>, LedgerError> {
            self.inner.get_transaction(id).await
        }
        async fn signatures_for_address(
            &self,
            address: &Address,
            limit: usize,
        ) -> Result<Vec<SignatureInfo>, LedgerError> {
            self.inner.signatures_for_address(address, limit).await
        }
        async fn get_account(&self, address: &Address) -> Result<Option<AccountData>, LedgerError> {
            self.inner.get_account(address).await
        }
        async fn program_accounts(
            &self,
            program: &Address,
            filters: &[AccountFilter],
        ) -> Result<Vec<KeyedAccount>, LedgerError> {
            self.inner.program_accounts(program, filters).await
        }
        async fn signature_status(&self, _id: &TxId) -> Result<Option<SignatureStatus>, LedgerError> {
            Ok(self.status.clone())
        }
    }

    #[async_trait]
    impl LedgerWriter for FixedStatus {
        async fn latest_blockhash(&self) -> Result<Blockhash, LedgerError> {
            self.inner.latest_blockhash().await
        }
        async fn send_transaction(&self, tx: &Transaction) -> Result<TxId, LedgerError> {
            if self.drop_sends {
                return tx
                    .id()
                    .ok_or_else(|| LedgerError::Internal("unsigned transaction".into()));
            }
            self.inner.send_transaction(tx).await
        }
    }

    fn with_status(f: &Fixture, status: Option<SignatureStatus>, attempts: u32) -> ReceiptSubmitter {
        fixed_status(f, status, attempts, false)
    }

    fn fixed_status(
        f: &Fixture,
        status: Option<SignatureStatus>,
        attempts: u32,
        drop_sends: bool,
    ) -> ReceiptSubmitter {
        let ledger = Arc::new(FixedStatus {
            inner: f.ledger.clone(),
            status,
            drop_sends,
        });
        ReceiptSubmitter::new(
            ledger,
            PROGRAM,
            Some(f.user.clone()),
            ConfirmationConfig {
                attempts,
                interval_ms: 1,
            },
        )
    }

    #[tokio::test]
    async fn execution_error_is_submission_failure() {
        let f = fixture().await;
        let failed = SignatureStatus {
            slot: 1,
            confirmations: None,
            err: Some(json!({ "InstructionError": [0, { "Custom": 6000 }] })),
            confirmation_status: Some("confirmed".into()),
        };
        let err = with_status(&f, Some(failed), 3)
            .submit(Some(&f.payment), &ReceiptDraft::new("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::SubmissionFailure);
    }

    #[tokio::test]
    async fn exhausted_polling_with_landed_receipt_succeeds() {
        let f = fixture().await;
        let address = with_status(&f, None, 2)
            .submit(Some(&f.payment), &ReceiptDraft::new("x"))
            .await
            .unwrap();
        let receipts = f.ledger.receipts().unwrap();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].address, address);
    }

    #[tokio::test]
    async fn exhausted_polling_without_receipt_is_unconfirmed() {
        let f = fixture().await;
        let err = fixed_status(&f, None, 3, true)
            .submit(Some(&f.payment), &ReceiptDraft::new("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::TransportFailure);
        let ReceiptError::Unconfirmed { receipt, attempts, .. } = &err else {
            panic!("expected Unconfirmed, got {err:?}");
        };
        assert_eq!(*attempts, 3);
        assert!(f.ledger.get_account(receipt).await.unwrap().is_none());
        assert!(f.ledger.receipts().unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_transaction_fails_before_sending() {
        let f = fixture().await;
        // Within every field limit, but the signed packet exceeds 1232 bytes.
        let files = (0..5)
            .map(|i| FileProof::new(format!("{i}").repeat(64), ContentHash::from_bytes([i; 32])))
            .collect();
        let draft = ReceiptDraft::new("t".repeat(64))
            .description("d".repeat(256))
            .files(files);
        let err = submitter(&f, Some(f.user.clone()))
            .submit(Some(&f.payment), &draft)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::PreconditionFailure);
        assert!(err.to_string().contains("1232"));
        assert_eq!(f.ledger.account_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn zero_attempts_skips_polling() {
        let f = fixture().await;
        let address = with_status(&f, None, 0)
            .submit(Some(&f.payment), &ReceiptDraft::new("x"))
            .await
            .unwrap();
        assert_eq!(f.ledger.receipts().unwrap()[0].address, address);
    }
}
