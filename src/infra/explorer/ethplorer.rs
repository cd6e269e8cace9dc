//! Ethplorer explorer for ERC-20 tokens.
//!
//! Registered by network type rather than symbol: the configured symbol selects which token's
//! `transfer` operations count as outputs.

use std::collections::HashMap;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::app::{AmountMatch, DEFAULT_HISTORY_LIMIT, verify_by_address, verify_transaction};
use crate::domain::{
    AddressHistory, AddressVerifyRequest, Amount, AppError, Explorer, ExplorerConfig, Transaction,
    TxInput, TxOutput, TxVerifyRequest, Verification, VerifyResult,
};
use crate::infra::http::de::number_from_any;
use crate::infra::http::{HttpTransport, decode};

use super::explorer_transport;

pub const ETHPLORER_API_BASE: &str = "https://api.ethplorer.io/";

/// Public key accepted by Ethplorer for low-volume use
pub const FREE_API_KEY: &str = "freekey";

const VENDOR: &str = "ethplorer";
const TRANSFER: &str = "transfer";

pub struct EthplorerExplorer {
    transport: HttpTransport,
    symbol: String,
    api_key: String,
}

impl EthplorerExplorer {
    pub fn new(config: &ExplorerConfig) -> Result<Self, AppError> {
        Ok(Self {
            transport: explorer_transport(VENDOR, ETHPLORER_API_BASE, config)?,
            symbol: config.symbol.to_uppercase(),
            api_key: config
                .api_key
                .as_ref()
                .map(|key| key.expose_secret().to_string())
                .filter(|key| !key.is_empty())
                .unwrap_or_else(|| FREE_API_KEY.to_string()),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        mut query: Vec<(&str, String)>,
    ) -> Result<T, AppError> {
        query.push(("apiKey", self.api_key.clone()));
        let bytes = self
            .transport
            .execute(reqwest::Method::GET, path, &query, None, false)
            .await?;
        parse(&bytes)
    }

    fn is_token_transfer(&self, operation: &RawOperation) -> bool {
        operation.kind == TRANSFER && operation.token_info.symbol.eq_ignore_ascii_case(&self.symbol)
    }

    fn to_transaction(&self, raw: RawTx) -> Result<Transaction, AppError> {
        let transfers: Vec<&RawOperation> = raw
            .operations
            .iter()
            .filter(|op| self.is_token_transfer(op))
            .collect();
        if transfers.is_empty() {
            return Err(AppError::NotFound(format!(
                "transaction {} has no {} transfer",
                raw.hash, self.symbol
            )));
        }

        let mut inputs = Vec::with_capacity(transfers.len());
        let mut outputs = Vec::with_capacity(transfers.len());
        for (index, op) in transfers.into_iter().enumerate() {
            let value = op.amount()?;
            inputs.push(TxInput {
                script: op.from.clone(),
                prev_tx_id: raw.hash.clone(),
                amount_in: value,
                ..Default::default()
            });
            outputs.push(TxOutput {
                addresses: vec![op.to.clone()],
                index: index as u32,
                value,
                spent: false,
                script_type: TRANSFER.to_string(),
            });
        }

        Ok(Transaction {
            hash: raw.hash,
            block_height: raw.block_number,
            time: raw.timestamp,
            inputs,
            outputs,
            confirmations: raw.confirmations,
            ..Default::default()
        })
    }

    /// Block depth of `hash`, as reported by `getTxInfo`
    async fn confirmations(&self, hash: &str) -> Result<u64, AppError> {
        let raw: RawTx = self.fetch(&format!("getTxInfo/{}", hash), vec![]).await?;
        Ok(raw.confirmations)
    }

    /// Address history carries no depth, so each listed transaction is looked up once.
    async fn fill_confirmations(&self, history: &mut AddressHistory) -> Result<(), AppError> {
        let mut depths: HashMap<String, u64> = HashMap::new();
        for tx in &mut history.txs {
            let depth = match depths.get(&tx.hash) {
                Some(depth) => *depth,
                None => {
                    let depth = self.confirmations(&tx.hash).await?;
                    depths.insert(tx.hash.clone(), depth);
                    depth
                }
            };
            tx.confirmations = depth;
        }
        debug!(lookups = depths.len(), "Filled history confirmations");
        Ok(())
    }

    fn to_history(&self, address: &str, raw: RawHistory, limit: usize) -> Result<AddressHistory, AppError> {
        let txs = raw
            .operations
            .iter()
            .filter(|op| self.is_token_transfer(op))
            .take(limit)
            .map(|op| {
                Ok(Transaction {
                    hash: op.transaction_hash.clone(),
                    time: op.timestamp,
                    outputs: vec![TxOutput {
                        addresses: vec![op.to.clone()],
                        value: op.amount()?,
                        script_type: TRANSFER.to_string(),
                        ..Default::default()
                    }],
                    ..Default::default()
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;
        Ok(AddressHistory {
            address: address.to_string(),
            txs,
        })
    }
}

#[async_trait]
impl Explorer for EthplorerExplorer {
    fn name(&self) -> &'static str {
        VENDOR
    }

    #[instrument(skip(self), fields(symbol = %self.symbol))]
    async fn get_transaction(&self, tx_id: &str) -> Result<Transaction, AppError> {
        let raw: RawTx = self.fetch(&format!("getTxInfo/{}", tx_id), vec![]).await?;
        self.to_transaction(raw)
    }

    #[instrument(skip(self, _view_key), fields(symbol = %self.symbol))]
    async fn get_txs_for_address(
        &self,
        address: &str,
        limit: usize,
        _view_key: Option<&str>,
    ) -> Result<AddressHistory, AppError> {
        let raw: RawHistory = self
            .fetch(
                &format!("getAddressHistory/{}", address),
                vec![("type", TRANSFER.to_string())],
            )
            .await?;
        let mut history = self.to_history(address, raw, limit)?;
        self.fill_confirmations(&mut history).await?;
        Ok(history)
    }

    async fn verify_transaction(
        &self,
        request: &TxVerifyRequest,
    ) -> Result<Verification, AppError> {
        verify_transaction(self, request, DEFAULT_HISTORY_LIMIT).await
    }

    async fn verify_by_address(
        &self,
        request: &AddressVerifyRequest,
    ) -> Result<VerifyResult, AppError> {
        verify_by_address(self, request, AmountMatch::approximate(), DEFAULT_HISTORY_LIMIT).await
    }
}

// ============================================================================
// WIRE FORMAT
// ============================================================================

#[derive(Debug, Deserialize)]
struct EmbeddedError {
    error: Option<EmbeddedErrorBody>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Decodes `bytes`, surfacing a `{"error": {"code", "message"}}` payload as a vendor error
fn parse<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AppError> {
    if let Ok(EmbeddedError { error: Some(body) }) = serde_json::from_slice(bytes) {
        if body.code > 0 && !body.message.is_empty() {
            return Err(AppError::Vendor {
                vendor: VENDOR.to_string(),
                message: format!("{} (code {})", body.message, body.code),
            });
        }
    }
    decode(VENDOR, bytes)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTx {
    hash: String,
    #[serde(default)]
    timestamp: i64,
    #[serde(default)]
    block_number: u64,
    #[serde(default)]
    confirmations: u64,
    #[serde(default)]
    operations: Vec<RawOperation>,
}

#[derive(Debug, Deserialize)]
struct RawHistory {
    #[serde(default)]
    operations: Vec<RawOperation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOperation {
    #[serde(default)]
    timestamp: i64,
    #[serde(default)]
    transaction_hash: String,
    #[serde(default, deserialize_with = "number_from_any")]
    value: f64,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    token_info: RawTokenInfo,
}

impl RawOperation {
    fn amount(&self) -> Result<Amount, AppError> {
        Amount::from_base_units(self.value, self.token_info.decimals as u32)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawTokenInfo {
    #[serde(default)]
    symbol: String,
    #[serde(default, deserialize_with = "number_from_any")]
    decimals: f64,
}
