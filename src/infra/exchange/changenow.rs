//! ChangeNow exchange (v1 API).
//!
//! The API key travels in the URL path or query string, never in a header.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::{
    AppError, CreateOrder, CreateResultInfo, Currency, Exchange, ExchangeConfig, ExchangeRateInfo,
    ExchangeRateRequest, OrderInfoResult, OrderStatus, QueryLimits, TX_HASH_INTERNAL_TRANSFER,
    status,
};
use crate::infra::http::HttpTransport;
use crate::infra::http::de::{null_as_empty_string, number_from_any};

use super::{exchange_transport, require_api_key};

pub const CHANGENOW_API_BASE: &str = "https://api.changenow.io/v1/";

const VENDOR: &str = "changenow";

/// Payout hash ChangeNow reports for swaps settled inside its own wallets
const INTERNAL_TRANSFER_MARKER: &str = "Internal transfer ";

pub struct ChangeNowExchange {
    transport: HttpTransport,
    api_key: SecretString,
}

impl ChangeNowExchange {
    pub fn new(config: &ExchangeConfig) -> Result<Self, AppError> {
        Ok(Self {
            api_key: require_api_key(VENDOR, config)?,
            transport: exchange_transport(VENDOR, CHANGENOW_API_BASE, config)?,
        })
    }

    /// Estimated payout for swapping `request.amount`
    async fn estimate_amount(&self, request: &ExchangeRateRequest) -> Result<RawEstimate, AppError> {
        let path = format!(
            "exchange-amount/{:.8}/{}_{}",
            request.amount,
            request.from.to_lowercase(),
            request.to.to_lowercase()
        );
        self.transport
            .get_json(&path, &[("api_key", self.api_key.expose_secret().to_string())], false)
            .await
    }
}

#[async_trait]
impl Exchange for ChangeNowExchange {
    fn name(&self) -> &'static str {
        VENDOR
    }

    #[instrument(skip(self))]
    async fn get_currencies(&self) -> Result<Vec<Currency>, AppError> {
        let raw: Vec<RawCurrency> = self
            .transport
            .get_json("currencies", &[("active", "true".to_string())], false)
            .await?;
        Ok(raw.into_iter().map(Currency::from).collect())
    }

    #[instrument(skip(self))]
    async fn get_currencies_to_pair(&self, from: &str) -> Result<Vec<Currency>, AppError> {
        let raw: Vec<RawCurrency> = self
            .transport
            .get_json(&format!("currencies-to/{}", from.to_lowercase()), &[], false)
            .await?;
        Ok(raw.into_iter().map(Currency::from).collect())
    }

    #[instrument(skip(self, request), fields(from = %request.from, to = %request.to))]
    async fn get_exchange_rate_info(
        &self,
        request: &ExchangeRateRequest,
    ) -> Result<ExchangeRateInfo, AppError> {
        if request.amount.is_nan() || request.amount <= 0.0 {
            return Err(AppError::InvalidAmount(format!(
                "{}: quote amount must be positive, got {}",
                VENDOR, request.amount
            )));
        }
        let limits = self.query_limits(&request.from, &request.to).await?;
        let estimate = self.estimate_amount(request).await?;
        debug!(
            estimated = estimate.estimated_amount,
            network_fee = estimate.network_fee,
            "ChangeNow estimate"
        );

        Ok(ExchangeRateInfo {
            min: limits.min,
            max: limits.max,
            exchange_rate: estimate.estimated_amount / request.amount,
            receive_amount: estimate.estimated_amount,
            network_fee: Some(estimate.network_fee),
        })
    }

    #[instrument(skip(self, order), fields(from = %order.from_currency, to = %order.to_currency))]
    async fn create_order(&self, order: &CreateOrder) -> Result<CreateResultInfo, AppError> {
        let payload = RawCreateOrder {
            from: &order.from_currency,
            to: &order.to_currency,
            address: &order.destination,
            amount: order.invoiced_amount,
            extra_id: order.extra_id.as_deref().filter(|id| !id.is_empty()),
            refund_address: order.refund_address.as_deref().filter(|a| !a.is_empty()),
        };
        let path = format!("transactions/{}", self.api_key.expose_secret());
        let created: RawCreateResult = self.transport.post_json(&path, &payload, false).await?;

        let ordered_amount = if created.amount > 0.0 {
            created.amount
        } else {
            order.ordered_amount
        };
        Ok(CreateResultInfo {
            uuid: created.id,
            deposit_address: created.payin_address,
            deposit_extra_id: Some(created.payin_extra_id).filter(|id| !id.is_empty()),
            destination: created.payout_address,
            from_currency: created.from_currency,
            to_currency: created.to_currency,
            invoiced_amount: order.invoiced_amount,
            ordered_amount,
            exchange_rate: if order.invoiced_amount > 0.0 {
                ordered_amount / order.invoiced_amount
            } else {
                0.0
            },
        })
    }

    #[instrument(skip(self, _extra_ids))]
    async fn order_info(
        &self,
        order_id: &str,
        _extra_ids: &[String],
    ) -> Result<OrderInfoResult, AppError> {
        let path = format!("transactions/{}/{}", order_id, self.api_key.expose_secret());
        let raw: RawOrderInfo = self.transport.get_json(&path, &[], false).await?;
        Ok(raw.into_order_info())
    }

    #[instrument(skip(self))]
    async fn query_limits(&self, from: &str, to: &str) -> Result<QueryLimits, AppError> {
        let path = format!("exchange-range/{}_{}", from.to_lowercase(), to.to_lowercase());
        let raw: RawRange = self.transport.get_json(&path, &[], false).await?;
        Ok(QueryLimits {
            min: raw.min_amount,
            max: raw.max_amount.unwrap_or_default(),
        })
    }
}

// ============================================================================
// WIRE FORMAT
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCurrency {
    ticker: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    is_fiat: bool,
    #[serde(default)]
    is_stable: bool,
}

impl From<RawCurrency> for Currency {
    fn from(raw: RawCurrency) -> Self {
        Self {
            name: raw.name,
            symbol: raw.ticker,
            network: None,
            is_fiat: raw.is_fiat,
            is_stable: raw.is_stable,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRange {
    #[serde(default)]
    min_amount: f64,
    /// `null` when the pair has no upper bound
    #[serde(rename = "maxAmount", alias = "max")]
    max_amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEstimate {
    estimated_amount: f64,
    #[serde(default, deserialize_with = "number_from_any")]
    network_fee: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RawCreateOrder<'a> {
    from: &'a str,
    to: &'a str,
    address: &'a str,
    amount: f64,
    #[serde(rename = "extraID", skip_serializing_if = "Option::is_none")]
    extra_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refund_address: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCreateResult {
    id: String,
    #[serde(default)]
    payin_address: String,
    #[serde(default)]
    payout_address: String,
    #[serde(default, deserialize_with = "null_as_empty_string")]
    payin_extra_id: String,
    #[serde(default)]
    from_currency: String,
    #[serde(default)]
    to_currency: String,
    /// Expected payout, when the vendor includes it
    #[serde(default, deserialize_with = "number_from_any")]
    amount: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrderInfo {
    #[serde(default)]
    status: String,
    #[serde(default, deserialize_with = "number_from_any")]
    amount_receive: f64,
    #[serde(default, deserialize_with = "number_from_any")]
    expected_receive_amount: f64,
    #[serde(default, deserialize_with = "null_as_empty_string")]
    payout_hash: String,
    #[serde(default, deserialize_with = "null_as_empty_string")]
    payin_address: String,
    #[serde(default, deserialize_with = "null_as_empty_string")]
    updated_at: String,
}

impl RawOrderInfo {
    fn into_order_info(self) -> OrderInfoResult {
        let internal_status = status::CHANGENOW.map_status(&self.status);
        let receive_amount = if internal_status == OrderStatus::Completed {
            self.amount_receive
        } else {
            self.expected_receive_amount
        };
        let tx_id = match self.payout_hash.as_str() {
            "" => None,
            INTERNAL_TRANSFER_MARKER => Some(TX_HASH_INTERNAL_TRANSFER.to_string()),
            hash => Some(hash.to_string()),
        };
        OrderInfoResult {
            internal_status,
            status: self.status,
            receive_amount,
            tx_id,
            deposit_address: Some(self.payin_address).filter(|a| !a.is_empty()),
            last_update: Some(self.updated_at).filter(|u| !u.is_empty()),
            confirmations: None,
        }
    }
}
