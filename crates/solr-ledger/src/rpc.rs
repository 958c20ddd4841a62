//! JSON-RPC ledger client over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use solr_types::{Address, Network, TxId};
use tracing::debug;

use crate::error::LedgerError;
use crate::filter::AccountFilter;
use crate::message::{Blockhash, Transaction};
use crate::parsed::{AccountData, KeyedAccount, ParsedTransaction, SignatureInfo, SignatureStatus};
use crate::traits::{LedgerReader, LedgerWriter};

/// Commitment level used for reads and preflight.
pub const DEFAULT_COMMITMENT: &str = "confirmed";

#[derive(Deserialize)]
struct RpcAccount {
    data: (String, String),
    owner: String,
    lamports: u64,
}

#[derive(Deserialize)]
struct RpcKeyedAccount {
    pubkey: String,
    account: RpcAccount,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcBlockhash {
    blockhash: String,
}

/// Wrapper for results that carry a `context` next to the `value`.
#[derive(Deserialize)]
struct WithContext<T> {
    value: T,
}

/// Ledger handle backed by a JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct HttpLedger {
    client: reqwest::Client,
    network: Network,
    commitment: String,
}

impl HttpLedger {
    /// Bind a client to `network`. `timeout` of `None` keeps the transport
    /// default.
    pub fn new(network: Network, timeout: Option<Duration>) -> Result<Self, LedgerError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| LedgerError::Transport {
            network: network.name.clone(),
            reason: format!("failed to build HTTP client: {e}"),
        })?;
        Ok(Self {
            client,
            network,
            commitment: DEFAULT_COMMITMENT.to_string(),
        })
    }

    pub fn with_commitment(mut self, commitment: impl Into<String>) -> Self {
        self.commitment = commitment.into();
        self
    }

    fn transport(&self, reason: impl Into<String>) -> LedgerError {
        LedgerError::Transport {
            network: self.network.name.clone(),
            reason: reason.into(),
        }
    }

    fn malformed(&self, reason: impl Into<String>) -> LedgerError {
        LedgerError::MalformedResponse {
            network: self.network.name.clone(),
            reason: reason.into(),
        }
    }

    /// Send a JSON-RPC request and return the `result` field.
    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });
        debug!(method, network = %self.network.name, "rpc request");

        let resp = self
            .client
            .post(&self.network.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    self.transport(format!("{method}: request timed out"))
                } else {
                    self.transport(format!("{method}: {e}"))
                }
            })?;

        if !resp.status().is_success() {
            return Err(self.transport(format!("{method}: HTTP {}", resp.status())));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| self.malformed(format!("{method}: invalid JSON response: {e}")))?;

        if let Some(error) = json.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown RPC error");
            return Err(LedgerError::Rpc {
                network: self.network.name.clone(),
                code,
                message: message.to_string(),
            });
        }

        json.get("result")
            .cloned()
            .ok_or_else(|| self.malformed(format!("{method}: response missing 'result' field")))
    }

    fn decode<T: DeserializeOwned>(&self, method: &str, value: Value) -> Result<T, LedgerError> {
        serde_json::from_value(value).map_err(|e| self.malformed(format!("{method}: {e}")))
    }

    fn account_data(&self, raw: RpcAccount) -> Result<AccountData, LedgerError> {
        let (encoded, encoding) = raw.data;
        if encoding != "base64" {
            return Err(self.malformed(format!("unexpected account encoding {encoding}")));
        }
        let data = BASE64
            .decode(encoded)
            .map_err(|e| self.malformed(format!("account data: {e}")))?;
        let owner = Address::from_base58(&raw.owner)
            .map_err(|e| self.malformed(format!("account owner: {e}")))?;
        Ok(AccountData {
            owner,
            lamports: raw.lamports,
            data,
        })
    }
}

#[async_trait]
impl LedgerReader for HttpLedger {
    fn network(&self) -> &Network {
        &self.network
    }

    async fn get_transaction(&self, id: &TxId) -> Result<Option<ParsedTransaction>, LedgerError> {
        let result = self
            .rpc_call(
                "getTransaction",
                json!([id.as_str(), {
                    "encoding": "jsonParsed",
                    "maxSupportedTransactionVersion": 0,
                    "commitment": self.commitment,
                }]),
            )
            .await?;
        self.decode("getTransaction", result)
    }

    async fn signatures_for_address(
        &self,
        address: &Address,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, LedgerError> {
        let result = self
            .rpc_call(
                "getSignaturesForAddress",
                json!([address.to_base58(), { "limit": limit, "commitment": self.commitment }]),
            )
            .await?;
        self.decode("getSignaturesForAddress", result)
    }

    async fn get_account(&self, address: &Address) -> Result<Option<AccountData>, LedgerError> {
        let result = self
            .rpc_call(
                "getAccountInfo",
                json!([address.to_base58(), { "encoding": "base64", "commitment": self.commitment }]),
            )
            .await?;
        let wrapped: WithContext<Option<RpcAccount>> = self.decode("getAccountInfo", result)?;
        wrapped.value.map(|raw| self.account_data(raw)).transpose()
    }

    async fn program_accounts(
        &self,
        program: &Address,
        filters: &[AccountFilter],
    ) -> Result<Vec<KeyedAccount>, LedgerError> {
        let filters: Vec<Value> = filters.iter().map(AccountFilter::to_json).collect();
        let result = self
            .rpc_call(
                "getProgramAccounts",
                json!([program.to_base58(), {
                    "encoding": "base64",
                    "commitment": self.commitment,
                    "filters": filters,
                }]),
            )
            .await?;
        let raw: Vec<RpcKeyedAccount> = self.decode("getProgramAccounts", result)?;
        raw.into_iter()
            .map(|keyed| {
                let address = Address::from_base58(&keyed.pubkey)
                    .map_err(|e| self.malformed(format!("account pubkey: {e}")))?;
                Ok(KeyedAccount {
                    address,
                    account: self.account_data(keyed.account)?,
                })
            })
            .collect()
    }

    async fn signature_status(&self, id: &TxId) -> Result<Option<SignatureStatus>, LedgerError> {
        let result = self
            .rpc_call(
                "getSignatureStatuses",
                json!([[id.as_str()], { "searchTransactionHistory": false }]),
            )
            .await?;
        let wrapped: WithContext<Vec<Option<SignatureStatus>>> =
            self.decode("getSignatureStatuses", result)?;
        Ok(wrapped.value.into_iter().next().flatten())
    }
}

#[async_trait]
impl LedgerWriter for HttpLedger {
    async fn latest_blockhash(&self) -> Result<Blockhash, LedgerError> {
        let result = self
            .rpc_call("getLatestBlockhash", json!([{ "commitment": self.commitment }]))
            .await?;
        let wrapped: WithContext<RpcBlockhash> = self.decode("getLatestBlockhash", result)?;
        Ok(Blockhash::from_base58(&wrapped.value.blockhash)?)
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<TxId, LedgerError> {
        let encoded = BASE64.encode(tx.serialize());
        let result = self
            .rpc_call(
                "sendTransaction",
                json!([encoded, {
                    "encoding": "base64",
                    "preflightCommitment": self.commitment,
                }]),
            )
            .await
            .map_err(|e| match e {
                LedgerError::Rpc { message, .. } => LedgerError::Rejected(message),
                other => other,
            })?;
        let signature: String = self.decode("sendTransaction", result)?;
        TxId::new(signature).map_err(|e| self.malformed(format!("sendTransaction: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::program::{
        create_receipt_instruction, encode_receipt_account, CreateReceiptArgs,
    };
    use solr_crypto::Keypair;
    use solr_types::{ReceiptRecord, Timestamp, TxReference};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn ledger_for(server: &MockServer) -> HttpLedger {
        HttpLedger::new(
            Network::new("mocknet", server.uri()),
            Some(Duration::from_secs(5)),
        )
        .unwrap()
    }

    fn rpc_result(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": result,
            "id": 1
        }))
    }

    #[tokio::test]
    async fn get_transaction_null_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(json!({ "method": "getTransaction" })))
            .respond_with(rpc_result(Value::Null))
            .expect(1)
            .mount(&server)
            .await;

        let ledger = ledger_for(&server).await;
        let found = ledger
            .get_transaction(&TxId::new("SIGNOTFOUND").unwrap())
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn get_transaction_requests_json_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "getTransaction",
                "params": ["SIG1", { "encoding": "jsonParsed", "maxSupportedTransactionVersion": 0 }]
            })))
            .respond_with(rpc_result(json!({
                "slot": 10,
                "blockTime": 1_700_000_000,
                "meta": { "err": null, "fee": 5000 },
                "transaction": {
                    "signatures": ["SIG1"],
                    "message": {
                        "accountKeys": [{ "pubkey": "Payer", "signer": true, "writable": true }],
                        "instructions": []
                    }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ledger = ledger_for(&server).await;
        let tx = ledger
            .get_transaction(&TxId::new("SIG1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.block_time, Some(1_700_000_000));
        assert_eq!(tx.fee_payer(), Some("Payer"));
    }

    #[tokio::test]
    async fn rpc_error_is_reported_with_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "error": { "code": -32602, "message": "Invalid param: WrongSize" },
                "id": 1
            })))
            .mount(&server)
            .await;

        let ledger = ledger_for(&server).await;
        let err = ledger
            .get_transaction(&TxId::new("bad").unwrap())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::Rpc {
                network: "mocknet".into(),
                code: -32602,
                message: "Invalid param: WrongSize".into(),
            }
        );
    }

    #[tokio::test]
    async fn http_error_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let ledger = ledger_for(&server).await;
        let err = ledger
            .get_account(&Address::new([1; 32]))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Transport { .. }));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn invalid_json_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let ledger = ledger_for(&server).await;
        let err = ledger.latest_blockhash().await.unwrap_err();
        assert!(matches!(err, LedgerError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn missing_result_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1 })))
            .mount(&server)
            .await;

        let ledger = ledger_for(&server).await;
        let err = ledger.latest_blockhash().await.unwrap_err();
        assert!(matches!(err, LedgerError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_failure() {
        let ledger = HttpLedger::new(
            Network::new("nowhere", "http://127.0.0.1:1"),
            Some(Duration::from_secs(2)),
        )
        .unwrap();
        let err = ledger.latest_blockhash().await.unwrap_err();
        assert!(matches!(err, LedgerError::Transport { ref network, .. } if network == "nowhere"));
    }

    #[tokio::test]
    async fn get_account_decodes_base64() {
        let server = MockServer::start().await;
        let owner = Address::new([9; 32]);
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "getAccountInfo" })))
            .respond_with(rpc_result(json!({
                "context": { "slot": 1 },
                "value": {
                    "data": [BASE64.encode([1u8, 2, 3]), "base64"],
                    "owner": owner.to_base58(),
                    "lamports": 42,
                    "executable": false,
                    "rentEpoch": 0
                }
            })))
            .mount(&server)
            .await;

        let ledger = ledger_for(&server).await;
        let account = ledger.get_account(&Address::new([1; 32])).await.unwrap().unwrap();
        assert_eq!(account.data, vec![1, 2, 3]);
        assert_eq!(account.owner, owner);
        assert_eq!(account.lamports, 42);
    }

    #[tokio::test]
    async fn get_account_null_value_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rpc_result(json!({ "context": { "slot": 1 }, "value": null })))
            .mount(&server)
            .await;

        let ledger = ledger_for(&server).await;
        assert!(ledger.get_account(&Address::new([1; 32])).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn program_accounts_sends_memcmp_filters() {
        let server = MockServer::start().await;
        let program = Address::new([9; 32]);
        let creator = Address::new([4; 32]);
        let record = ReceiptRecord {
            address: Address::new([7; 32]),
            creator,
            payer: Address::new([2; 32]),
            tx_hash: TxReference::new("SIG"),
            title: "t".into(),
            description: "d".into(),
            files: Vec::new(),
            timestamp: Timestamp::from_unix(5),
        };
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "getProgramAccounts",
                "params": [program.to_base58(), {
                    "filters": [
                        AccountFilter::receipt_accounts().to_json(),
                        AccountFilter::creator(&creator).to_json()
                    ]
                }]
            })))
            .respond_with(rpc_result(json!([{
                "pubkey": record.address.to_base58(),
                "account": {
                    "data": [BASE64.encode(encode_receipt_account(&record)), "base64"],
                    "owner": program.to_base58(),
                    "lamports": 1
                }
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let ledger = ledger_for(&server).await;
        let accounts = ledger
            .program_accounts(
                &program,
                &[AccountFilter::receipt_accounts(), AccountFilter::creator(&creator)],
            )
            .await
            .unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].address, record.address);
        assert_eq!(accounts[0].account.owner, program);
    }

    #[tokio::test]
    async fn signature_status_unknown_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "getSignatureStatuses" })))
            .respond_with(rpc_result(json!({ "context": { "slot": 1 }, "value": [null] })))
            .mount(&server)
            .await;

        let ledger = ledger_for(&server).await;
        let status = ledger
            .signature_status(&TxId::new("SIG").unwrap())
            .await
            .unwrap();
        assert!(status.is_none());
    }

    #[tokio::test]
    async fn send_transaction_maps_preflight_failure_to_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "sendTransaction" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "error": { "code": -32002, "message": "Transaction simulation failed" },
                "id": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let user = Keypair::generate();
        let receipt = Keypair::generate();
        let args = CreateReceiptArgs {
            payer: user.address(),
            tx_hash: "SIG".into(),
            title: "t".into(),
            description: String::new(),
            files: Vec::new(),
        };
        let ix = create_receipt_instruction(
            Address::new([9; 32]),
            receipt.address(),
            user.address(),
            &args,
        );
        let msg = Message::compile(&[ix], &user.address(), Blockhash([1; 32])).unwrap();
        let tx = Transaction::sign(msg, &[&user, &receipt]).unwrap();

        let ledger = ledger_for(&server).await;
        let err = ledger.send_transaction(&tx).await.unwrap_err();
        assert_eq!(err, LedgerError::Rejected("Transaction simulation failed".into()));
    }

    #[tokio::test]
    async fn latest_blockhash_parses_value() {
        let server = MockServer::start().await;
        let hash = Blockhash([6; 32]);
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "getLatestBlockhash" })))
            .respond_with(rpc_result(json!({
                "context": { "slot": 1 },
                "value": { "blockhash": hash.to_base58(), "lastValidBlockHeight": 100 }
            })))
            .mount(&server)
            .await;

        let ledger = ledger_for(&server).await;
        assert_eq!(ledger.latest_blockhash().await.unwrap(), hash);
    }
}
