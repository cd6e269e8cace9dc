//! dcrdata explorer for Decred.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::app::{AmountMatch, verify_by_address, verify_transaction};
use crate::domain::{
    AddressHistory, AddressVerifyRequest, Amount, AppError, Explorer, ExplorerConfig, Transaction,
    TxInput, TxOutput, TxVerifyRequest, Verification, VerifyResult,
};
use crate::infra::http::HttpTransport;

use super::explorer_transport;

pub const DCRDATA_API_BASE: &str = "https://explorer.dcrdata.org/api/";

const VENDOR: &str = "dcrdata";
const HISTORY_LIMIT: usize = 25;

pub struct DcrdataExplorer {
    transport: HttpTransport,
}

impl DcrdataExplorer {
    pub fn new(config: &ExplorerConfig) -> Result<Self, AppError> {
        Ok(Self {
            transport: explorer_transport(VENDOR, DCRDATA_API_BASE, config)?,
        })
    }

    /// Insight API root, a sibling of the main API root
    fn insight_url(&self, path: &str) -> String {
        let base = self.transport.api_base();
        let root = base.strip_suffix("api/").unwrap_or(base);
        format!("{}insight/api/{}", root, path)
    }
}

#[async_trait]
impl Explorer for DcrdataExplorer {
    fn name(&self) -> &'static str {
        VENDOR
    }

    #[instrument(skip(self))]
    async fn get_transaction(&self, tx_id: &str) -> Result<Transaction, AppError> {
        let raw: RawTx = self
            .transport
            .get_json(&format!("tx/{}", tx_id), &[], false)
            .await?;
        raw.into_transaction()
    }

    #[instrument(skip(self, _view_key))]
    async fn get_txs_for_address(
        &self,
        address: &str,
        limit: usize,
        _view_key: Option<&str>,
    ) -> Result<AddressHistory, AppError> {
        let raw: Vec<RawAddrTx> = self
            .transport
            .get_json(&format!("address/{}/count/{}/raw", address, limit), &[], false)
            .await?;
        let txs = raw
            .into_iter()
            .map(RawAddrTx::into_transaction)
            .collect::<Result<Vec<_>, AppError>>()?;
        Ok(AddressHistory {
            address: address.to_string(),
            txs,
        })
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

    #[instrument(skip(self, raw_tx))]
    async fn push_tx(&self, raw_tx: &str) -> Result<String, AppError> {
        let response: PushTxResponse = self
            .transport
            .post_json(
                &self.insight_url("tx/send"),
                &PushTxRequest { rawtx: raw_tx },
                false,
            )
            .await?;
        info!(txid = %response.txid, "Broadcast raw transaction");
        Ok(response.txid)
    }
}

// ============================================================================
// WIRE FORMAT
// ============================================================================

#[derive(Debug, Serialize)]
struct PushTxRequest<'a> {
    rawtx: &'a str,
}

#[derive(Debug, Deserialize)]
struct PushTxResponse {
    txid: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawBlock {
    #[serde(default)]
    blockheight: u64,
    #[serde(default)]
    time: i64,
}

#[derive(Debug, Deserialize)]
struct RawTx {
    txid: String,
    #[serde(default)]
    locktime: u64,
    #[serde(default)]
    confirmations: u64,
    #[serde(default)]
    block: RawBlock,
    #[serde(default)]
    vin: Vec<RawVin>,
    #[serde(default)]
    vout: Vec<RawVout>,
}

#[derive(Debug, Deserialize)]
struct RawAddrTx {
    txid: String,
    #[serde(default)]
    locktime: u64,
    #[serde(default)]
    confirmations: u64,
    #[serde(default)]
    time: i64,
    #[serde(default)]
    vin: Vec<RawVin>,
    #[serde(default)]
    vout: Vec<RawVout>,
}

#[derive(Debug, Deserialize)]
struct RawVin {
    #[serde(default)]
    amountin: f64,
    #[serde(default)]
    sequence: u64,
    #[serde(default)]
    txid: String,
    #[serde(default)]
    vout: u32,
    #[serde(default, rename = "scriptSig")]
    script_sig: Option<RawScriptSig>,
}

#[derive(Debug, Deserialize)]
struct RawScriptSig {
    #[serde(default)]
    hex: String,
}

#[derive(Debug, Deserialize)]
struct RawVout {
    #[serde(default)]
    n: u32,
    #[serde(default)]
    value: f64,
    #[serde(default, rename = "scriptPubKey")]
    script_pub_key: RawScriptPubKey,
}

#[derive(Debug, Default, Deserialize)]
struct RawScriptPubKey {
    #[serde(default)]
    addresses: Vec<String>,
    #[serde(default, rename = "type")]
    kind: String,
}

fn convert_inputs(vin: Vec<RawVin>) -> Result<Vec<TxInput>, AppError> {
    vin.into_iter()
        .map(|input| {
            Ok(TxInput {
                script: input.script_sig.map(|s| s.hex).unwrap_or_default(),
                sequence: input.sequence,
                prev_tx_id: input.txid,
                prev_vout: input.vout,
                amount_in: Amount::from_coins(input.amountin)?,
            })
        })
        .collect()
}

fn convert_outputs(vout: Vec<RawVout>) -> Result<Vec<TxOutput>, AppError> {
    vout.into_iter()
        .map(|output| {
            Ok(TxOutput {
                addresses: output.script_pub_key.addresses,
                index: output.n,
                value: Amount::from_coins(output.value)?,
                spent: false,
                script_type: output.script_pub_key.kind,
            })
        })
        .collect()
}

impl RawTx {
    fn into_transaction(self) -> Result<Transaction, AppError> {
        Ok(Transaction {
            hash: self.txid,
            block_height: self.block.blockheight,
            lock_time: self.locktime,
            time: self.block.time,
            inputs: convert_inputs(self.vin)?,
            outputs: convert_outputs(self.vout)?,
            confirmations: self.confirmations,
            ..Default::default()
        })
    }
}

impl RawAddrTx {
    fn into_transaction(self) -> Result<Transaction, AppError> {
        Ok(Transaction {
            hash: self.txid,
            lock_time: self.locktime,
            time: self.time,
            inputs: convert_inputs(self.vin)?,
            outputs: convert_outputs(self.vout)?,
            confirmations: self.confirmations,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insight_url_is_sibling_of_api_root() {
        let explorer = DcrdataExplorer::new(&ExplorerConfig::new("dcr")).unwrap();
        assert_eq!(
            explorer.insight_url("tx/send"),
            "https://explorer.dcrdata.org/insight/api/tx/send"
        );
    }

    #[test]
    fn test_raw_tx_conversion() {
        let raw: RawTx = serde_json::from_value(json!({
            "txid": "f00d",
            "locktime": 0,
            "confirmations": 12,
            "block": {"blockheight": 800000, "time": 1700000000},
            "vin": [{"amountin": 1.5, "sequence": 4294967295u64, "txid": "prev", "vout": 1, "scriptSig": {"hex": "aa"}}],
            "vout": [
                {"n": 0, "value": 1.2, "scriptPubKey": {"addresses": ["DsAbc"], "type": "pubkeyhash"}},
                {"n": 1, "value": 0.29, "scriptPubKey": {"type": "nulldata"}}
            ]
        }))
        .unwrap();

        let tx = raw.into_transaction().unwrap();
        assert_eq!(tx.block_height, 800_000);
        assert_eq!(tx.time, 1_700_000_000);
        assert_eq!(tx.inputs[0].amount_in, Amount::from_coins(1.5).unwrap());
        assert_eq!(tx.inputs[0].script, "aa");
        assert_eq!(tx.outputs[0].value, Amount::from_coins(1.2).unwrap());
        assert!(tx.outputs[1].addresses.is_empty());
        assert_eq!(tx.outputs[1].script_type, "nulldata");
    }

    #[test]
    fn test_negative_value_is_invalid_amount() {
        let raw: RawAddrTx = serde_json::from_value(json!({
            "txid": "bad",
            "vout": [{"n": 0, "value": -1.0, "scriptPubKey": {"addresses": ["DsAbc"]}}]
        }))
        .unwrap();
        assert!(matches!(
            raw.into_transaction(),
            Err(AppError::InvalidAmount(_))
        ));
    }
}
