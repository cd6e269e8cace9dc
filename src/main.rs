//! Operator CLI: verify a deposit and optionally check an exchange order.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use instantswap::domain::{
    DEFAULT_TIMEOUT, ExchangeConfig, ExplorerConfig, NetworkType, TxVerifyRequest, Verification,
};
use instantswap::infra::{default_exchange_registry, default_explorer_registry};

/// Deposit to verify
struct VerifyConfig {
    tx_id: Option<String>,
    address: String,
    amount: f64,
    confirmations: u64,
    created_at: Option<i64>,
}

/// Exchange order to look up
struct OrderConfig {
    exchange: String,
    api_key: String,
    order_id: String,
}

/// CLI configuration
struct Config {
    explorer_symbol: String,
    explorer_network_type: Option<NetworkType>,
    explorer_api_key: Option<String>,
    explorer_api_base: Option<String>,
    verify: Option<VerifyConfig>,
    order: Option<OrderConfig>,
    timeout: Duration,
    debug_http: bool,
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Config {
    fn from_env() -> Result<Self> {
        let explorer_network_type = optional_var("EXPLORER_NETWORK_TYPE")
            .map(|v| v.parse::<NetworkType>().map_err(anyhow::Error::msg))
            .transpose()
            .context("EXPLORER_NETWORK_TYPE is invalid")?;
        let timeout = optional_var("HTTP_TIMEOUT_SECS")
            .map(|v| v.parse::<u64>().map(Duration::from_secs))
            .transpose()
            .context("HTTP_TIMEOUT_SECS must be a whole number of seconds")?
            .unwrap_or(DEFAULT_TIMEOUT);
        let debug_http = env::var("DEBUG_HTTP")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            explorer_symbol: optional_var("EXPLORER_SYMBOL").unwrap_or_default(),
            explorer_network_type,
            explorer_api_key: optional_var("EXPLORER_API_KEY"),
            explorer_api_base: optional_var("EXPLORER_API_BASE"),
            verify: Self::load_verify()?,
            order: Self::load_order()?,
            timeout,
            debug_http,
        })
    }

    fn load_verify() -> Result<Option<VerifyConfig>> {
        let Some(address) = optional_var("VERIFY_ADDRESS") else {
            return Ok(None);
        };
        let amount = optional_var("VERIFY_AMOUNT")
            .context("VERIFY_AMOUNT not set")?
            .parse::<f64>()
            .context("VERIFY_AMOUNT must be a number")?;
        let confirmations = optional_var("VERIFY_CONFIRMATIONS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("VERIFY_CONFIRMATIONS must be a whole number")?
            .unwrap_or(1);
        let created_at = optional_var("VERIFY_CREATED_AT")
            .map(|v| v.parse::<i64>())
            .transpose()
            .context("VERIFY_CREATED_AT must be a unix timestamp")?;
        Ok(Some(VerifyConfig {
            tx_id: optional_var("VERIFY_TX_ID"),
            address,
            amount,
            confirmations,
            created_at,
        }))
    }

    fn load_order() -> Result<Option<OrderConfig>> {
        let Some(exchange) = optional_var("EXCHANGE_NAME") else {
            return Ok(None);
        };
        Ok(Some(OrderConfig {
            exchange,
            api_key: optional_var("EXCHANGE_API_KEY").context("EXCHANGE_API_KEY not set")?,
            order_id: optional_var("EXCHANGE_ORDER_ID").context("EXCHANGE_ORDER_ID not set")?,
        }))
    }

    fn explorer_config(&self) -> ExplorerConfig {
        let mut config = ExplorerConfig::new(self.explorer_symbol.clone())
            .with_timeout(self.timeout)
            .with_output(self.debug_http);
        if let Some(network_type) = self.explorer_network_type {
            config = config.with_network_type(network_type);
        }
        if let Some(api_key) = &self.explorer_api_key {
            config = config.with_api_key(api_key.clone());
        }
        if let Some(api_base) = &self.explorer_api_base {
            config = config.with_api_base(api_base.clone());
        }
        config
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,instantswap=debug"));

    let json = env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run_verification(config: &Config, verify: &VerifyConfig) -> Result<()> {
    let explorer = default_explorer_registry()
        .resolve(config.explorer_config())
        .context("Failed to build explorer")?;
    info!(
        explorer = explorer.name(),
        address = %verify.address,
        amount = verify.amount,
        "Verifying deposit"
    );

    let mut request = TxVerifyRequest::new(verify.address.clone(), verify.amount, verify.confirmations);
    if let Some(tx_id) = &verify.tx_id {
        request = request.with_tx_id(tx_id.clone());
    }
    if let Some(created_at) = verify.created_at {
        request = request.with_created_at(created_at);
    }

    let verification = explorer
        .verify_transaction(&request)
        .await
        .context("Verification failed")?;
    match &verification {
        Verification::Verified(tx) => info!(
            hash = %tx.hash,
            missing = %tx.missing_amount,
            missing_percent = tx.missing_percent,
            "Deposit verified"
        ),
        Verification::AwaitingConfirmations { .. } => warn!("{}", verification),
    }
    println!("{}", serde_json::to_string_pretty(&verification)?);
    Ok(())
}

async fn run_order_info(config: &Config, order: &OrderConfig) -> Result<()> {
    let exchange_config = ExchangeConfig::new(order.api_key.clone())
        .with_timeout(config.timeout)
        .with_debug(config.debug_http);
    let exchange = default_exchange_registry()
        .resolve(&order.exchange, exchange_config)
        .context("Failed to build exchange")?;

    let info = exchange
        .order_info(&order.order_id, &[])
        .await
        .with_context(|| format!("Failed to fetch order {}", order.order_id))?;
    info!(
        exchange = exchange.name(),
        order_id = %order.order_id,
        status = %info.status,
        internal_status = %info.internal_status,
        "Order status"
    );
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;
    if config.verify.is_none() && config.order.is_none() {
        anyhow::bail!("Nothing to do: set VERIFY_ADDRESS and/or EXCHANGE_NAME");
    }

    if let Some(verify) = &config.verify {
        run_verification(&config, verify).await?;
    }
    if let Some(order) = &config.order {
        run_order_info(&config, order).await?;
    }
    Ok(())
}
