use std::sync::Arc;

use serde::{Deserialize, Serialize};
use solr_ledger::{Ledger, ParsedTransaction};
use solr_types::{
    Address, BatchOutcome, Determined, Lamports, Network, PaymentFact, Timestamp, TxId, TxKind,
    TxStatus,
};
use tracing::{debug, warn};

use crate::error::{ReceiptError, ReceiptResult};

/// A found transaction and everything derived from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTransaction {
    pub id: TxId,
    pub fact: PaymentFact,
    pub status: TxStatus,
    pub kind: TxKind,
    pub slot: u64,
}

/// Fetches transactions from one network and derives payment facts.
///
/// Holds no cache: every call goes to the bound ledger, so results for
/// different networks never mix.
#[derive(Clone)]
pub struct TransactionResolver {
    ledger: Arc<dyn Ledger>,
    program_id: Address,
}

impl TransactionResolver {
    pub fn new(ledger: Arc<dyn Ledger>, program_id: Address) -> Self {
        Self { ledger, program_id }
    }

    pub fn network(&self) -> &Network {
        self.ledger.network()
    }

    /// Resolve one transaction id.
    ///
    /// Absence on this network is reported as
    /// [`ReceiptError::TransactionNotFound`]; an unparseable first
    /// instruction is not an error and yields unknown transfer fields.
    pub async fn resolve(&self, id: &TxId) -> ReceiptResult<ResolvedTransaction> {
        let network = self.ledger.network();
        match self.ledger.get_transaction(id).await {
            Ok(Some(tx)) => derive(id, &tx, &self.program_id),
            Ok(None) => {
                debug!(tx = %id.short(), network = %network.name, "transaction not found");
                Err(ReceiptError::TransactionNotFound {
                    id: id.clone(),
                    network: network.clone(),
                })
            }
            Err(e) => {
                warn!(tx = %id.short(), network = %network.name, error = %e, "transaction fetch failed");
                Err(e.into())
            }
        }
    }

    /// Resolve many ids concurrently, one task per id.
    ///
    /// A failing fetch never aborts its siblings. Failures are excluded from
    /// `succeeded` and listed in `failed` with the id as label.
    pub async fn resolve_batch(&self, ids: Vec<TxId>) -> BatchOutcome<ResolvedTransaction> {
        let handles: Vec<_> = ids
            .into_iter()
            .enumerate()
            .map(|(index, id)| {
                let resolver = self.clone();
                let label = id.to_string();
                let handle = tokio::spawn(async move { resolver.resolve(&id).await });
                (index, label, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (index, label, handle) in handles {
            let result = match handle.await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(e) => Err(format!("resolve task failed: {e}")),
            };
            if let Err(reason) = &result {
                debug!(tx = %label, %reason, "excluding transaction from batch");
            }
            results.push((index, label, result));
        }
        BatchOutcome::from_results(results)
    }

    /// Most recent transaction ids touching `address`, newest first.
    pub async fn recent_signatures(&self, address: &Address, limit: usize) -> ReceiptResult<Vec<TxId>> {
        let entries = self
            .ledger
            .signatures_for_address(address, limit)
            .await
            .map_err(|e| {
                warn!(address = %address.short(), error = %e, "signature history fetch failed");
                ReceiptError::from(e)
            })?;
        let mut ids = Vec::with_capacity(entries.len());
        for entry in entries {
            match TxId::new(entry.signature.as_str()) {
                Ok(id) => ids.push(id),
                Err(e) => debug!(
                    address = %address.short(),
                    signature = %entry.signature,
                    error = %e,
                    "skipping unparseable signature entry"
                ),
            }
        }
        Ok(ids)
    }
}

/// Derive payment facts, status and kind from a fetched transaction.
pub fn derive(
    id: &TxId,
    tx: &ParsedTransaction,
    program_id: &Address,
) -> ReceiptResult<ResolvedTransaction> {
    let malformed = |reason: String| ReceiptError::MalformedTransaction {
        id: id.clone(),
        reason,
    };

    let payer_key = tx
        .fee_payer()
        .ok_or_else(|| malformed("transaction has no account keys".into()))?;
    let payer = Address::from_base58(payer_key).map_err(|e| malformed(format!("payer: {e}")))?;
    let occurred_at: Determined<Timestamp> = tx.block_time.map(Timestamp::from_unix).into();

    let first = tx.first_instruction();
    let transfer = first
        .and_then(|ix| ix.transfer())
        .and_then(|t| Some((Address::from_base58(&t.destination).ok()?, t.lamports)));
    let fact = match transfer {
        Some((destination, lamports)) => PaymentFact {
            payer,
            destination: Determined::Known(destination),
            amount: Determined::Known(Lamports(lamports)),
            occurred_at,
        },
        None => PaymentFact::unparsed(payer, occurred_at),
    };

    let status = match &tx.meta {
        None => TxStatus::Pending,
        Some(meta) if meta.err.is_some() => TxStatus::Failed,
        Some(_) => TxStatus::Success,
    };

    let program = program_id.to_base58();
    let kind = match first {
        None => TxKind::Unrecognized,
        Some(ix) if ix.program_id() == program => TxKind::ReceiptCreation,
        Some(ix) => match ix.instruction_type() {
            Some("transfer") => TxKind::Transfer,
            Some(other) => TxKind::Other(other.to_string()),
            None => TxKind::Unrecognized,
        },
    };

    Ok(ResolvedTransaction {
        id: id.clone(),
        fact,
        status,
        kind,
        slot: tx.slot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use solr_ledger::InMemoryLedger;

    const PROGRAM: Address = Address::new([9; 32]);

    fn parsed(value: serde_json::Value) -> ParsedTransaction {
        serde_json::from_value(value).unwrap()
    }

    fn with_instruction(instruction: serde_json::Value, block_time: serde_json::Value) -> ParsedTransaction {
        parsed(json!({
            "slot": 7,
            "blockTime": block_time,
            "meta": { "err": null, "fee": 5000 },
            "transaction": {
                "signatures": ["SIG"],
                "message": {
                    "accountKeys": [{ "pubkey": Address::new([1; 32]).to_base58(), "signer": true }],
                    "instructions": [instruction]
                }
            }
        }))
    }

    fn id() -> TxId {
        TxId::new("SIG").unwrap()
    }

    #[test]
    fn transfer_populates_destination_and_amount() {
        let tx = with_instruction(
            json!({
                "program": "system",
                "programId": "11111111111111111111111111111111",
                "parsed": { "type": "transfer", "info": {
                    "destination": Address::new([2; 32]).to_base58(),
                    "lamports": 2_000_000_000u64
                }}
            }),
            json!(1_700_000_000),
        );
        let resolved = derive(&id(), &tx, &PROGRAM).unwrap();
        assert_eq!(resolved.fact.payer, Address::new([1; 32]));
        assert_eq!(resolved.fact.destination, Determined::Known(Address::new([2; 32])));
        assert_eq!(resolved.fact.amount, Determined::Known(Lamports(2_000_000_000)));
        assert_eq!(resolved.fact.occurred_at, Determined::Known(Timestamp::from_unix(1_700_000_000)));
        assert_eq!(resolved.status, TxStatus::Success);
        assert_eq!(resolved.kind, TxKind::Transfer);
    }

    #[test]
    fn unparseable_instruction_yields_unknown_amount_not_zero() {
        let tx = with_instruction(
            json!({ "programId": PROGRAM.to_base58(), "accounts": [], "data": "3Bxs" }),
            json!(null),
        );
        let resolved = derive(&id(), &tx, &PROGRAM).unwrap();
        assert_eq!(resolved.fact.amount, Determined::Unknown);
        assert_ne!(resolved.fact.amount, Determined::Known(Lamports(0)));
        assert_eq!(resolved.fact.destination, Determined::Unknown);
        assert_eq!(resolved.fact.payer, Address::new([1; 32]));
        assert_eq!(resolved.fact.occurred_at, Determined::Unknown);
        assert_eq!(resolved.kind, TxKind::ReceiptCreation);
    }

    #[test]
    fn zero_lamport_transfer_is_known_zero() {
        let tx = with_instruction(
            json!({
                "programId": "11111111111111111111111111111111",
                "parsed": { "type": "transfer", "info": {
                    "destination": Address::new([2; 32]).to_base58(),
                    "lamports": 0
                }}
            }),
            json!(5),
        );
        let resolved = derive(&id(), &tx, &PROGRAM).unwrap();
        assert_eq!(resolved.fact.amount, Determined::Known(Lamports(0)));
    }

    #[test]
    fn other_parsed_type_is_classified() {
        let tx = with_instruction(
            json!({
                "programId": "11111111111111111111111111111111",
                "parsed": { "type": "createAccount", "info": { "newAccount": "X" } }
            }),
            json!(5),
        );
        let resolved = derive(&id(), &tx, &PROGRAM).unwrap();
        assert_eq!(resolved.kind, TxKind::Other("createAccount".into()));
        assert!(resolved.fact.amount.is_unknown());
    }

    #[test]
    fn status_follows_metadata() {
        let mut tx = with_instruction(json!({ "programId": "X" }), json!(5));
        tx.meta = None;
        assert_eq!(derive(&id(), &tx, &PROGRAM).unwrap().status, TxStatus::Pending);

        let mut tx = with_instruction(json!({ "programId": "X" }), json!(5));
        tx.meta.as_mut().unwrap().err = Some(json!({ "InstructionError": [0, { "Custom": 1 }] }));
        assert_eq!(derive(&id(), &tx, &PROGRAM).unwrap().status, TxStatus::Failed);
    }

    #[test]
    fn missing_account_keys_is_malformed() {
        let tx = parsed(json!({
            "transaction": { "signatures": ["SIG"], "message": { "accountKeys": [], "instructions": [] } }
        }));
        let err = derive(&id(), &tx, &PROGRAM).unwrap_err();
        assert!(matches!(err, ReceiptError::MalformedTransaction { .. }));
    }

    #[tokio::test]
    async fn absent_transaction_is_network_scoped_not_found() {
        let ledger = Arc::new(InMemoryLedger::new(Network::testnet(), PROGRAM));
        let resolver = TransactionResolver::new(ledger, PROGRAM);
        let err = resolver.resolve(&id()).await.unwrap_err();
        assert_eq!(err.network(), Some(&Network::testnet()));
        assert!(matches!(err, ReceiptError::TransactionNotFound { .. }));
    }

    #[tokio::test]
    async fn transport_failure_is_not_not_found() {
        let ledger = Arc::new(InMemoryLedger::new(Network::testnet(), PROGRAM));
        ledger.set_unavailable(true).unwrap();
        let resolver = TransactionResolver::new(ledger, PROGRAM);
        let err = resolver.resolve(&id()).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::TransportFailure);
        assert!(err.network().is_none());
    }

    #[tokio::test]
    async fn batch_excludes_failures_and_keeps_order() {
        let ledger = Arc::new(InMemoryLedger::new(Network::localnet(), PROGRAM));
        let from = Address::new([1; 32]);
        let a = ledger.record_transfer(&from, &Address::new([2; 32]), 10).unwrap();
        let b = ledger.record_transfer(&from, &Address::new([3; 32]), 20).unwrap();
        let missing = TxId::new("MISSING").unwrap();
        let resolver = TransactionResolver::new(ledger, PROGRAM);

        let outcome = resolver
            .resolve_batch(vec![a.clone(), missing.clone(), b.clone()])
            .await;
        let ids: Vec<_> = outcome.succeeded.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(outcome.requested(), 3);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].index, 1);
        assert_eq!(outcome.failed[0].label, missing.to_string());
    }

    #[tokio::test]
    async fn recent_signatures_are_newest_first() {
        let ledger = Arc::new(InMemoryLedger::new(Network::localnet(), PROGRAM));
        let wallet = Address::new([1; 32]);
        let first = ledger.record_transfer(&wallet, &Address::new([2; 32]), 1).unwrap();
        let second = ledger.record_transfer(&wallet, &Address::new([2; 32]), 2).unwrap();
        let resolver = TransactionResolver::new(ledger, PROGRAM);
        let ids = resolver.recent_signatures(&wallet, 15).await.unwrap();
        assert_eq!(ids, vec![second, first]);
    }
}
