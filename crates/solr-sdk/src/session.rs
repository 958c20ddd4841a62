//! Client handle and process-wide session.

use std::sync::{Arc, PoisonError, RwLock};

use solr_crypto::{ContentHasher, Keypair, UploadSource};
use solr_ledger::{HttpLedger, Ledger};
use solr_types::{Address, BatchOutcome, FileProof, Network, ReceiptRecord, TxId};
use tracing::info;

use crate::activity::ActivityFeed;
use crate::config::{ClientConfig, ConfirmationConfig};
use crate::error::{ReceiptError, ReceiptResult};
use crate::repository::ReceiptRepository;
use crate::resolver::{ResolvedTransaction, TransactionResolver};
use crate::submitter::{ReceiptDraft, ReceiptSubmitter};
use crate::verify::{verify_upload, Verification};

const DEFAULT_ACTIVITY_LIMIT: usize = 15;

/// Everything needed to talk to one network as one (optional) signer.
#[derive(Clone)]
pub struct ReceiptClient {
    ledger: Arc<dyn Ledger>,
    program_id: Address,
    signer: Option<Arc<Keypair>>,
    hasher: ContentHasher,
    activity_limit: usize,
    resolver: TransactionResolver,
    submitter: ReceiptSubmitter,
    repository: ReceiptRepository,
}

impl ReceiptClient {
    pub fn new(ledger: Arc<dyn Ledger>, program_id: Address, signer: Option<Keypair>) -> Self {
        let signer = signer.map(Arc::new);
        Self {
            resolver: TransactionResolver::new(ledger.clone(), program_id),
            submitter: ReceiptSubmitter::new(
                ledger.clone(),
                program_id,
                signer.clone(),
                ConfirmationConfig::default(),
            ),
            repository: ReceiptRepository::new(ledger.clone(), program_id),
            ledger,
            program_id,
            signer,
            hasher: ContentHasher::default(),
            activity_limit: DEFAULT_ACTIVITY_LIMIT,
        }
    }

    /// Build a client over JSON-RPC from configuration.
    pub fn from_config(config: &ClientConfig) -> ReceiptResult<Self> {
        let network = config.network()?;
        let program_id = config.program_id()?;
        let signer = config
            .keypair_path
            .as_ref()
            .map(Keypair::read_file)
            .transpose()?;
        let ledger = HttpLedger::new(network, config.request_timeout())?;
        Ok(Self::new(Arc::new(ledger), program_id, signer)
            .with_confirmation(config.confirmation.clone())
            .with_activity_limit(config.activity_limit))
    }

    pub fn with_confirmation(mut self, confirmation: ConfirmationConfig) -> Self {
        self.submitter = ReceiptSubmitter::new(
            self.ledger.clone(),
            self.program_id,
            self.signer.clone(),
            confirmation,
        );
        self
    }

    pub fn with_hasher(mut self, hasher: ContentHasher) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_activity_limit(mut self, limit: usize) -> Self {
        self.activity_limit = limit;
        self
    }

    pub fn network(&self) -> &Network {
        self.ledger.network()
    }

    pub fn program_id(&self) -> &Address {
        &self.program_id
    }

    pub fn signer_address(&self) -> Option<Address> {
        self.submitter.signer()
    }

    pub fn hasher(&self) -> &ContentHasher {
        &self.hasher
    }

    pub async fn resolve(&self, id: &TxId) -> ReceiptResult<ResolvedTransaction> {
        self.resolver.resolve(id).await
    }

    pub async fn resolve_batch(&self, ids: Vec<TxId>) -> BatchOutcome<ResolvedTransaction> {
        self.resolver.resolve_batch(ids).await
    }

    pub async fn hash_all(&self, sources: Vec<UploadSource>) -> BatchOutcome<FileProof> {
        self.hasher.hash_all(sources).await
    }

    pub async fn submit(
        &self,
        payment: Option<&ResolvedTransaction>,
        draft: &ReceiptDraft,
    ) -> ReceiptResult<Address> {
        self.submitter.submit(payment, draft).await
    }

    pub async fn fetch(&self, address: &Address) -> ReceiptResult<ReceiptRecord> {
        self.repository.fetch(address).await
    }

    pub async fn list_by_creator(
        &self,
        creator: &Address,
    ) -> ReceiptResult<BatchOutcome<ReceiptRecord>> {
        self.repository.list_by_creator(creator).await
    }

    /// Receipts created by the bound signer.
    pub async fn list_mine(&self) -> ReceiptResult<BatchOutcome<ReceiptRecord>> {
        let me = self.require_signer()?;
        self.list_by_creator(&me).await
    }

    /// Activity feed for `wallet`, or for the bound signer when `None`.
    pub async fn activity(&self, wallet: Option<&Address>) -> ReceiptResult<ActivityFeed> {
        let wallet = match wallet {
            Some(w) => *w,
            None => self.require_signer()?,
        };
        ActivityFeed::collect(
            &self.resolver,
            &self.repository,
            &wallet,
            self.activity_limit,
        )
        .await
    }

    /// Fetch the receipt at `receipt` and check `upload` against it.
    pub async fn verify(
        &self,
        receipt: &Address,
        upload: UploadSource,
    ) -> ReceiptResult<Verification> {
        let record = self.fetch(receipt).await?;
        verify_upload(&self.hasher, &record, upload).await
    }

    fn require_signer(&self) -> ReceiptResult<Address> {
        self.signer_address()
            .ok_or_else(|| ReceiptError::precondition("no signer is bound"))
    }
}

static GLOBAL: ClientSession = ClientSession::new();

/// Holds the currently bound client, if any.
///
/// Callers take an `Arc` snapshot through [`ClientSession::client`], so
/// replacing or clearing the binding never disturbs an operation already in
/// flight.
#[derive(Default)]
pub struct ClientSession {
    current: RwLock<Option<Arc<ReceiptClient>>>,
}

impl ClientSession {
    pub const fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// The process-wide session.
    pub fn global() -> &'static ClientSession {
        &GLOBAL
    }

    /// Bind `client`, replacing any previous binding.
    pub fn connect(&self, client: ReceiptClient) -> Arc<ReceiptClient> {
        let client = Arc::new(client);
        info!(
            network = %client.network().name,
            signer = ?client.signer_address().map(|a| a.short()),
            "client connected"
        );
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(client.clone());
        client
    }

    /// Clear the binding. Returns whether a client was bound.
    pub fn disconnect(&self) -> bool {
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            info!("client disconnected");
        }
        previous.is_some()
    }

    pub fn client(&self) -> ReceiptResult<Arc<ReceiptClient>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| ReceiptError::precondition("no client is connected"))
    }

    pub fn is_connected(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
