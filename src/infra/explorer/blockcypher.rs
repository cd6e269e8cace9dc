//! Blockcypher explorer for Litecoin and Ethereum.
//!
//! Values arrive as integer base units (litoshi, wei) and are scaled by the chain's decimals.
//! Ethereum hashes and addresses come back without their `0x` prefix, which is restored here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::app::{AmountMatch, verify_by_address, verify_transaction};
use crate::domain::{
    AddressHistory, AddressVerifyRequest, Amount, AppError, Explorer, ExplorerConfig, Transaction,
    TxInput, TxOutput, TxVerifyRequest, Verification, VerifyResult,
};
use crate::infra::http::de::null_as_empty;
use crate::infra::http::{HttpTransport, decode};

use super::explorer_transport;

pub const BLOCKCYPHER_API_BASE: &str = "https://api.blockcypher.com/v1/";

const VENDOR: &str = "blockcypher";
const HISTORY_LIMIT: usize = 10;

/// Chains served through Blockcypher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockcypherCoin {
    Litecoin,
    Ethereum,
}

impl BlockcypherCoin {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Litecoin => "ltc",
            Self::Ethereum => "eth",
        }
    }

    pub fn decimals(&self) -> u32 {
        match self {
            Self::Litecoin => 8,
            Self::Ethereum => 18,
        }
    }

    fn uses_hex_ids(&self) -> bool {
        matches!(self, Self::Ethereum)
    }
}

pub struct BlockcypherExplorer {
    transport: HttpTransport,
    coin: BlockcypherCoin,
    token: Option<SecretString>,
}

impl BlockcypherExplorer {
    pub fn new(coin: BlockcypherCoin, config: &ExplorerConfig) -> Result<Self, AppError> {
        let default_base = format!("{}{}/main/", BLOCKCYPHER_API_BASE, coin.path());
        Ok(Self {
            transport: explorer_transport(VENDOR, &default_base, config)?,
            coin,
            token: config
                .api_key
                .as_ref()
                .map(|key| SecretString::from(key.expose_secret().to_owned())),
        })
    }

    pub fn coin(&self) -> BlockcypherCoin {
        self.coin
    }

    fn hex_id(&self, id: &str) -> String {
        if self.coin.uses_hex_ids() && !id.starts_with("0x") {
            format!("0x{}", id)
        } else {
            id.to_string()
        }
    }

    fn amount(&self, units: f64) -> Result<Amount, AppError> {
        Amount::from_base_units(units, self.coin.decimals())
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        mut query: Vec<(&str, String)>,
    ) -> Result<T, AppError> {
        if let Some(token) = &self.token {
            query.push(("token", token.expose_secret().to_string()));
        }
        let bytes = self
            .transport
            .execute(Method::GET, path, &query, None, false)
            .await?;
        parse(&bytes)
    }

    fn to_transaction(&self, raw: RawTx) -> Result<Transaction, AppError> {
        if raw.hash.is_empty() {
            return Err(AppError::NotFound("blockcypher: tx not found".to_string()));
        }
        let inputs = raw
            .inputs
            .iter()
            .map(|input| {
                Ok(TxInput {
                    script: input.script_type.clone(),
                    sequence: input.sequence,
                    prev_tx_id: self.hex_id(&input.prev_hash),
                    prev_vout: input.output_index.max(0) as u32,
                    amount_in: self.amount(input.output_value)?,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;
        let outputs = raw
            .outputs
            .iter()
            .enumerate()
            .map(|(index, output)| {
                Ok(TxOutput {
                    addresses: output.addresses.iter().map(|a| self.hex_id(a)).collect(),
                    index: index as u32,
                    value: self.amount(output.value)?,
                    spent: output.spent_by.is_some(),
                    script_type: output.script_type.clone(),
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(Transaction {
            hash: self.hex_id(&raw.hash),
            block_height: raw.block_height.max(0) as u64,
            lock_time: raw.lock_time,
            time: raw.received.map(|t| t.timestamp()).unwrap_or_default(),
            inputs,
            outputs,
            confirmations: raw.confirmations,
            ..Default::default()
        })
    }

    /// Each received txref becomes a one-output transaction paying `address`.
    fn to_history(&self, raw: RawAddress) -> Result<AddressHistory, AppError> {
        let address = if raw.address.is_empty() {
            String::new()
        } else {
            self.hex_id(&raw.address)
        };
        let txs = raw
            .unconfirmed_txrefs
            .iter()
            .chain(raw.txrefs.iter())
            .filter(|txref| txref.tx_output_n >= 0)
            .map(|txref| {
                Ok(Transaction {
                    hash: self.hex_id(&txref.tx_hash),
                    block_height: txref.block_height.max(0) as u64,
                    time: txref
                        .confirmed
                        .or(txref.received)
                        .map(|t| t.timestamp())
                        .unwrap_or_default(),
                    outputs: vec![TxOutput {
                        addresses: vec![address.clone()],
                        index: txref.tx_output_n as u32,
                        value: self.amount(txref.value)?,
                        spent: txref.spent.unwrap_or(false),
                        script_type: String::new(),
                    }],
                    confirmations: txref.confirmations,
                    ..Default::default()
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;
        Ok(AddressHistory { address, txs })
    }
}

#[async_trait]
impl Explorer for BlockcypherExplorer {
    fn name(&self) -> &'static str {
        VENDOR
    }

    #[instrument(skip(self), fields(coin = self.coin.path()))]
    async fn get_transaction(&self, tx_id: &str) -> Result<Transaction, AppError> {
        let id = tx_id.trim_start_matches("0x");
        let raw: RawTx = self.fetch(&format!("txs/{}", id), vec![]).await?;
        self.to_transaction(raw)
    }

    #[instrument(skip(self, _view_key), fields(coin = self.coin.path()))]
    async fn get_txs_for_address(
        &self,
        address: &str,
        limit: usize,
        _view_key: Option<&str>,
    ) -> Result<AddressHistory, AppError> {
        let raw: RawAddress = self
            .fetch(
                &format!("addrs/{}", address.trim_start_matches("0x")),
                vec![("limit", limit.to_string())],
            )
            .await?;
        let mut history = self.to_history(raw)?;
        if history.address.is_empty() {
            history.address = address.to_string();
        }
        Ok(history)
    }

    async fn verify_transaction(
        &self,
        request: &TxVerifyRequest,
    ) -> Result<Verification, AppError> {
        verify_transaction(self, request, HISTORY_LIMIT).await
    }

    async fn verify_by_address(
        &self,
        request: &AddressVerifyRequest,
    ) -> Result<VerifyResult, AppError> {
        verify_by_address(self, request, AmountMatch::Exact, HISTORY_LIMIT).await
    }
}

// ============================================================================
// WIRE FORMAT
// ============================================================================

#[derive(Debug, Deserialize)]
struct EmbeddedError {
    error: Option<String>,
}

/// Decodes `bytes`, surfacing a `{"error": ..}` payload as a vendor error
fn parse<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AppError> {
    if let Ok(EmbeddedError { error: Some(message) }) = serde_json::from_slice(bytes) {
        if !message.is_empty() {
            return Err(AppError::Vendor {
                vendor: VENDOR.to_string(),
                message,
            });
        }
    }
    decode(VENDOR, bytes)
}

#[derive(Debug, Deserialize)]
struct RawTx {
    #[serde(default)]
    hash: String,
    #[serde(default)]
    block_height: i64,
    #[serde(default)]
    lock_time: u64,
    received: Option<DateTime<Utc>>,
    #[serde(default)]
    confirmations: u64,
    #[serde(default)]
    inputs: Vec<RawInput>,
    #[serde(default)]
    outputs: Vec<RawOutput>,
}

#[derive(Debug, Deserialize)]
struct RawInput {
    #[serde(default)]
    prev_hash: String,
    #[serde(default)]
    output_index: i64,
    #[serde(default)]
    output_value: f64,
    #[serde(default)]
    sequence: u64,
    #[serde(default)]
    script_type: String,
}

#[derive(Debug, Deserialize)]
struct RawOutput {
    #[serde(default)]
    value: f64,
    spent_by: Option<String>,
    /// `null` on OP_RETURN outputs
    #[serde(default, deserialize_with = "null_as_empty")]
    addresses: Vec<String>,
    #[serde(default)]
    script_type: String,
}

#[derive(Debug, Deserialize)]
struct RawAddress {
    #[serde(default)]
    address: String,
    #[serde(default)]
    txrefs: Vec<TxRef>,
    #[serde(default)]
    unconfirmed_txrefs: Vec<TxRef>,
}

#[derive(Debug, Deserialize)]
struct TxRef {
    tx_hash: String,
    #[serde(default)]
    block_height: i64,
    #[serde(default = "negative")]
    tx_output_n: i64,
    #[serde(default)]
    value: f64,
    #[serde(default)]
    confirmations: u64,
    confirmed: Option<DateTime<Utc>>,
    received: Option<DateTime<Utc>>,
    spent: Option<bool>,
}

fn negative() -> i64 {
    -1
}
