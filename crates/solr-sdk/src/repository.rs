use std::sync::Arc;

use solr_ledger::{decode_receipt_account, AccountFilter, KeyedAccount, Ledger};
use solr_types::{Address, BatchOutcome, Network, ReceiptRecord};
use tracing::{debug, warn};

use crate::error::{ReceiptError, ReceiptResult};

/// Read access to receipt accounts on one network.
#[derive(Clone)]
pub struct ReceiptRepository {
    ledger: Arc<dyn Ledger>,
    program_id: Address,
}

impl ReceiptRepository {
    pub fn new(ledger: Arc<dyn Ledger>, program_id: Address) -> Self {
        Self { ledger, program_id }
    }

    pub fn network(&self) -> &Network {
        self.ledger.network()
    }

    pub fn program_id(&self) -> &Address {
        &self.program_id
    }

    /// Fetch the receipt stored at `address`.
    ///
    /// The account must exist, be owned by the receipt program and decode
    /// completely; anything else is an error and no partial record is
    /// returned.
    pub async fn fetch(&self, address: &Address) -> ReceiptResult<ReceiptRecord> {
        let network = self.ledger.network();
        let account = match self.ledger.get_account(address).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                debug!(account = %address.short(), network = %network.name, "account not found");
                return Err(ReceiptError::AccountNotFound {
                    address: *address,
                    network: network.clone(),
                });
            }
            Err(e) => {
                warn!(account = %address.short(), network = %network.name, error = %e, "account fetch failed");
                return Err(e.into());
            }
        };
        self.decode(&KeyedAccount {
            address: *address,
            account,
        })
    }

    /// All receipts whose creator is `creator`.
    ///
    /// Selection happens on the ledger with a byte filter on the creator
    /// field. Ordering is whatever the ledger returns. Accounts that match
    /// the filter but fail to decode are excluded from `succeeded` and
    /// listed in `failed`, labelled with their address.
    pub async fn list_by_creator(&self, creator: &Address) -> ReceiptResult<BatchOutcome<ReceiptRecord>> {
        let filters = [AccountFilter::receipt_accounts(), AccountFilter::creator(creator)];
        let accounts = self
            .ledger
            .program_accounts(&self.program_id, &filters)
            .await
            .map_err(|e| {
                warn!(creator = %creator.short(), error = %e, "receipt listing failed");
                ReceiptError::from(e)
            })?;

        let results = accounts.iter().enumerate().map(|(index, keyed)| {
            let result = self.decode(keyed).and_then(|record| {
                if record.creator == *creator {
                    Ok(record)
                } else {
                    Err(ReceiptError::MalformedAccount {
                        address: keyed.address,
                        reason: format!("creator {} does not match filter", record.creator),
                    })
                }
            });
            if let Err(e) = &result {
                debug!(account = %keyed.address.short(), error = %e, "excluding account from listing");
            }
            (index, keyed.address.to_string(), result)
        });
        Ok(BatchOutcome::from_results(results))
    }

    fn decode(&self, keyed: &KeyedAccount) -> ReceiptResult<ReceiptRecord> {
        if keyed.account.owner != self.program_id {
            return Err(ReceiptError::ForeignAccount {
                address: keyed.address,
                owner: keyed.account.owner,
            });
        }
        decode_receipt_account(keyed.address, &keyed.account.data).map_err(|source| {
            ReceiptError::Decode {
                address: keyed.address,
                source,
            }
        })
    }
}
