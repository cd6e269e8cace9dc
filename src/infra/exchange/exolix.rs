//! Exolix exchange (v2 API).
//!
//! Authenticates with the raw API key in the `Authorization` header. The currency list is paged and
//! large, so it is cached per adapter instance.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    AppError, CreateOrder, CreateResultInfo, Currency, Exchange, ExchangeConfig, ExchangeRateInfo,
    ExchangeRateRequest, OrderInfoResult, status,
};
use crate::infra::http::HttpTransport;
use crate::infra::http::de::{null_as_empty, null_as_empty_string, number_from_any};

use super::{exchange_transport, require_api_key};

pub const EXOLIX_API_BASE: &str = "https://exolix.com/api/v2/";

/// How long a fetched currency list stays valid (30 days)
pub const CURRENCY_CACHE_TTL: Duration = Duration::from_secs(720 * 60 * 60);

/// Largest page the currencies endpoint accepts
const PAGE_SIZE: usize = 100;

/// Stop paging after this many pages even if the vendor keeps returning data
const MAX_PAGES: usize = 50;

const VENDOR: &str = "exolix";

struct CachedCurrencies {
    currencies: Vec<Currency>,
    fetched_at: Instant,
}

pub struct ExolixExchange {
    transport: HttpTransport,
    cache: RwLock<Option<CachedCurrencies>>,
    cache_ttl: Duration,
}

impl ExolixExchange {
    pub fn new(config: &ExchangeConfig) -> Result<Self, AppError> {
        let api_key = require_api_key(VENDOR, config)?;
        Ok(Self {
            transport: exchange_transport(VENDOR, EXOLIX_API_BASE, config)?
                .with_auth_header("Authorization", api_key)?,
            cache: RwLock::new(None),
            cache_ttl: CURRENCY_CACHE_TTL,
        })
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Walks every currencies page until the vendor returns an empty one.
    async fn fetch_currencies(&self) -> Result<Vec<Currency>, AppError> {
        let mut raw = Vec::new();
        for page in 1..=MAX_PAGES {
            let query = [
                ("page", page.to_string()),
                ("size", PAGE_SIZE.to_string()),
                ("withNetworks", "true".to_string()),
            ];
            let response: RawCurrencyPage = self.transport.get_json("currencies", &query, true).await?;
            if response.data.is_empty() {
                debug!(pages = page - 1, count = raw.len(), "Exolix currency list complete");
                return Ok(expand_networks(raw));
            }
            raw.extend(response.data);
        }
        warn!(max_pages = MAX_PAGES, count = raw.len(), "Exolix currency paging truncated");
        Ok(expand_networks(raw))
    }
}

/// One [`Currency`] per network; currencies without networks yield a single entry.
fn expand_networks(raw: Vec<RawCurrency>) -> Vec<Currency> {
    let mut currencies = Vec::with_capacity(raw.len());
    for currency in raw {
        let symbol = currency.code.to_lowercase();
        if currency.networks.is_empty() {
            currencies.push(Currency {
                name: currency.name,
                symbol,
                ..Default::default()
            });
            continue;
        }
        for network in currency.networks {
            currencies.push(Currency {
                name: currency.name.clone(),
                symbol: symbol.clone(),
                network: Some(network.network),
                ..Default::default()
            });
        }
    }
    currencies
}

#[async_trait]
impl Exchange for ExolixExchange {
    fn name(&self) -> &'static str {
        VENDOR
    }

    #[instrument(skip(self))]
    async fn get_currencies(&self) -> Result<Vec<Currency>, AppError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < self.cache_ttl && !cached.currencies.is_empty() {
                    return Ok(cached.currencies.clone());
                }
            }
        }

        let currencies = self.fetch_currencies().await?;
        info!(count = currencies.len(), "Refreshed Exolix currency cache");
        *self.cache.write().await = Some(CachedCurrencies {
            currencies: currencies.clone(),
            fetched_at: Instant::now(),
        });
        Ok(currencies)
    }

    async fn get_currencies_to_pair(&self, from: &str) -> Result<Vec<Currency>, AppError> {
        Ok(self
            .get_currencies()
            .await?
            .into_iter()
            .filter(|currency| !currency.symbol.eq_ignore_ascii_case(from))
            .collect())
    }

    #[instrument(skip(self, request), fields(from = %request.from, to = %request.to))]
    async fn get_exchange_rate_info(
        &self,
        request: &ExchangeRateRequest,
    ) -> Result<ExchangeRateInfo, AppError> {
        let mut query = vec![
            ("coinFrom", request.from.clone()),
            ("coinTo", request.to.clone()),
            ("amount", format!("{:.6}", request.amount)),
            ("rateType", "fixed".to_string()),
        ];
        if let Some(network) = request.from_network.as_ref().filter(|n| !n.is_empty()) {
            query.push(("networkFrom", network.clone()));
        }
        if let Some(network) = request.to_network.as_ref().filter(|n| !n.is_empty()) {
            query.push(("networkTo", network.clone()));
        }
        let rate: RawRate = self.transport.get_json("rate", &query, true).await?;
        Ok(ExchangeRateInfo {
            min: rate.min_amount,
            max: rate.max_amount,
            exchange_rate: rate.rate,
            receive_amount: rate.to_amount,
            network_fee: None,
        })
    }

    #[instrument(skip(self, order), fields(from = %order.from_currency, to = %order.to_currency))]
    async fn create_order(&self, order: &CreateOrder) -> Result<CreateResultInfo, AppError> {
        let payload = RawOrderRequest {
            coin_from: &order.from_currency,
            coin_to: &order.to_currency,
            network_from: order.from_network.as_deref().unwrap_or_default(),
            network_to: order.to_network.as_deref().unwrap_or_default(),
            amount: order.invoiced_amount,
            withdrawal_amount: Some(order.ordered_amount).filter(|a| *a > 0.0),
            withdrawal_address: &order.destination,
            withdrawal_extra_id: non_blank(&order.extra_id),
            refund_address: non_blank(&order.refund_address),
            refund_extra_id: non_blank(&order.refund_extra_id),
        };
        let created: RawOrder = self.transport.post_json("transactions", &payload, true).await?;
        Ok(CreateResultInfo {
            uuid: created.id,
            deposit_address: created.deposit_address,
            deposit_extra_id: Some(created.deposit_extra_id).filter(|id| !id.is_empty()),
            destination: created.withdrawal_address,
            from_currency: created.coin_from.coin_code,
            to_currency: created.coin_to.coin_code,
            invoiced_amount: created.amount,
            ordered_amount: created.amount_to,
            exchange_rate: created.rate,
        })
    }

    #[instrument(skip(self, _extra_ids))]
    async fn order_info(
        &self,
        order_id: &str,
        _extra_ids: &[String],
    ) -> Result<OrderInfoResult, AppError> {
        let order: RawOrder = self
            .transport
            .get_json(&format!("transactions/{}", order_id), &[], true)
            .await?;
        Ok(OrderInfoResult {
            internal_status: status::EXOLIX.map_status(&order.status),
            status: order.status,
            receive_amount: order.amount_to,
            tx_id: order.hash_out.hash.filter(|h| !h.is_empty()),
            deposit_address: Some(order.deposit_address).filter(|a| !a.is_empty()),
            last_update: None,
            confirmations: None,
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// ============================================================================
// WIRE FORMAT
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawCurrencyPage {
    #[serde(default, deserialize_with = "null_as_empty")]
    data: Vec<RawCurrency>,
}

#[derive(Debug, Deserialize)]
struct RawCurrency {
    code: String,
    #[serde(default)]
    name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    networks: Vec<RawNetwork>,
}

#[derive(Debug, Deserialize)]
struct RawNetwork {
    network: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRate {
    #[serde(default, deserialize_with = "number_from_any")]
    to_amount: f64,
    #[serde(default, deserialize_with = "number_from_any")]
    rate: f64,
    #[serde(default, deserialize_with = "number_from_any")]
    min_amount: f64,
    #[serde(default, deserialize_with = "number_from_any")]
    max_amount: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RawOrderRequest<'a> {
    coin_from: &'a str,
    coin_to: &'a str,
    network_from: &'a str,
    network_to: &'a str,
    amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    withdrawal_amount: Option<f64>,
    withdrawal_address: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    withdrawal_extra_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refund_address: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refund_extra_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrder {
    id: String,
    #[serde(default, deserialize_with = "number_from_any")]
    amount: f64,
    #[serde(default, deserialize_with = "number_from_any")]
    amount_to: f64,
    #[serde(default)]
    coin_from: RawCoin,
    #[serde(default)]
    coin_to: RawCoin,
    #[serde(default)]
    deposit_address: String,
    #[serde(default, deserialize_with = "null_as_empty_string")]
    deposit_extra_id: String,
    #[serde(default)]
    withdrawal_address: String,
    #[serde(default)]
    hash_out: RawHashLink,
    #[serde(default, deserialize_with = "number_from_any")]
    rate: f64,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCoin {
    #[serde(default)]
    coin_code: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawHashLink {
    hash: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderStatus;
    use serde_json::json;

    #[test]
    fn test_requires_api_key() {
        assert!(ExolixExchange::new(&ExchangeConfig::default()).is_err());
        assert!(ExolixExchange::new(&ExchangeConfig::new("key")).is_ok());
    }

    #[test]
    fn test_expand_networks() {
        let page: RawCurrencyPage = serde_json::from_value(json!({
            "data": [
                {"code": "USDT", "name": "TetherUS", "networks": [
                    {"network": "ETH"}, {"network": "TRX"}
                ]},
                {"code": "XMR", "name": "Monero", "networks": null}
            ],
            "count": 2
        }))
        .unwrap();

        let currencies = expand_networks(page.data);
        assert_eq!(currencies.len(), 3);
        assert_eq!(currencies[0].symbol, "usdt");
        assert_eq!(currencies[0].network.as_deref(), Some("ETH"));
        assert_eq!(currencies[1].network.as_deref(), Some("TRX"));
        assert_eq!(currencies[2].symbol, "xmr");
        assert!(currencies[2].network.is_none());
    }

    #[test]
    fn test_order_with_null_hash_out() {
        let order: RawOrder = serde_json::from_value(json!({
            "id": "ex-1",
            "amount": 1,
            "amountTo": "0.5",
            "coinFrom": {"coinCode": "BTC"},
            "coinTo": {"coinCode": "ETH"},
            "depositAddress": "bc1q",
            "depositExtraId": null,
            "withdrawalAddress": "0xabc",
            "hashOut": {"hash": null, "link": null},
            "rate": 0.5,
            "status": "wait"
        }))
        .unwrap();
        assert!(order.hash_out.hash.is_none());
        assert_eq!(order.amount_to, 0.5);
        assert_eq!(status::EXOLIX.map_status(&order.status), OrderStatus::WaitingForDeposit);
    }

    #[test]
    fn test_order_payload_skips_blank_optionals() {
        let order = CreateOrder {
            from_currency: "btc".to_string(),
            to_currency: "eth".to_string(),
            invoiced_amount: 0.1,
            destination: "0xabc".to_string(),
            extra_id: Some(String::new()),
            ..Default::default()
        };
        let payload = RawOrderRequest {
            coin_from: &order.from_currency,
            coin_to: &order.to_currency,
            network_from: "",
            network_to: "",
            amount: order.invoiced_amount,
            withdrawal_amount: None,
            withdrawal_address: &order.destination,
            withdrawal_extra_id: non_blank(&order.extra_id),
            refund_address: non_blank(&order.refund_address),
            refund_extra_id: non_blank(&order.refund_extra_id),
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "coinFrom": "btc",
                "coinTo": "eth",
                "networkFrom": "",
                "networkTo": "",
                "amount": 0.1,
                "withdrawalAddress": "0xabc"
            })
        );
    }
}
