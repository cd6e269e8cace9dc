//! Canonical exchange types and adapter configuration.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Default wall-clock budget for one vendor request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Payout hash reported by some exchanges when the payout never touched the chain
pub const TX_HASH_INTERNAL_TRANSFER: &str = "Internal transfer";

// ============================================================================
// ORDER STATUS
// ============================================================================

/// Canonical order status every vendor status string is mapped into
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Unknown,
    Completed,
    WaitingForDeposit,
    DepositReceived,
    DepositConfirmed,
    Refunded,
    Canceled,
    Expired,
    New,
    Exchanging,
    Sending,
    Failed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 12] = [
        Self::Unknown,
        Self::Completed,
        Self::WaitingForDeposit,
        Self::DepositReceived,
        Self::DepositConfirmed,
        Self::Refunded,
        Self::Canceled,
        Self::Expired,
        Self::New,
        Self::Exchanging,
        Self::Sending,
        Self::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Completed => "completed",
            Self::WaitingForDeposit => "waiting_for_deposit",
            Self::DepositReceived => "deposit_received",
            Self::DepositConfirmed => "deposit_confirmed",
            Self::Refunded => "refunded",
            Self::Canceled => "canceled",
            Self::Expired => "expired",
            Self::New => "new",
            Self::Exchanging => "exchanging",
            Self::Sending => "sending",
            Self::Failed => "failed",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Completed => "Completed",
            Self::WaitingForDeposit => "Waiting for deposit",
            Self::DepositReceived => "Deposit received",
            Self::DepositConfirmed => "Deposit confirmed",
            Self::Refunded => "Refunded",
            Self::Canceled => "Canceled",
            Self::Expired => "Expired",
            Self::New => "New",
            Self::Exchanging => "Exchanging",
            Self::Sending => "Sending",
            Self::Failed => "Failed",
        }
    }

    /// True once the order can no longer change
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Refunded | Self::Canceled | Self::Expired | Self::Failed
        )
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Invalid order status: {}", s))
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// NETWORK TYPE
// ============================================================================

/// Token standard served by an explorer as a whole rather than per coin
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Erc20,
    Bep20,
    Trc20,
}

impl NetworkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Erc20 => "erc20",
            Self::Bep20 => "bep20",
            Self::Trc20 => "trc20",
        }
    }
}

impl std::str::FromStr for NetworkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "erc20" => Ok(Self::Erc20),
            "bep20" => Ok(Self::Bep20),
            "trc20" => Ok(Self::Trc20),
            _ => Err(format!("Invalid network type: {}", s)),
        }
    }
}

impl std::fmt::Display for NetworkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Settings handed to an exchange adapter constructor
#[derive(Debug)]
pub struct ExchangeConfig {
    /// Dump requests and responses at debug level
    pub debug: bool,
    pub api_key: SecretString,
    pub api_secret: SecretString,
    pub affiliate_id: String,
    pub user_id: String,
    /// Overrides the vendor's production base URL
    pub api_base: Option<String>,
    pub timeout: Duration,
}

impl ExchangeConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            debug: false,
            api_key: SecretString::from(String::new()),
            api_secret: SecretString::from(String::new()),
            affiliate_id: String::new(),
            user_id: String::new(),
            api_base: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Clone for ExchangeConfig {
    fn clone(&self) -> Self {
        Self {
            debug: self.debug,
            api_key: SecretString::from(self.api_key.expose_secret().to_owned()),
            api_secret: SecretString::from(self.api_secret.expose_secret().to_owned()),
            affiliate_id: self.affiliate_id.clone(),
            user_id: self.user_id.clone(),
            api_base: self.api_base.clone(),
            timeout: self.timeout,
        }
    }
}

/// Settings handed to an explorer adapter constructor
#[derive(Debug)]
pub struct ExplorerConfig {
    /// Dump requests and responses at debug level
    pub enable_output: bool,
    pub symbol: String,
    pub api_key: Option<SecretString>,
    /// When set, resolution uses the network-type keyspace instead of the symbol
    pub network_type: Option<NetworkType>,
    /// Overrides the vendor's production base URL
    pub api_base: Option<String>,
    pub timeout: Duration,
}

impl ExplorerConfig {
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            enable_output: false,
            symbol: symbol.into(),
            api_key: None,
            network_type: None,
            api_base: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_network_type(mut self, network_type: NetworkType) -> Self {
        self.network_type = Some(network_type);
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_output(mut self, enable_output: bool) -> Self {
        self.enable_output = enable_output;
        self
    }
}

impl Clone for ExplorerConfig {
    fn clone(&self) -> Self {
        Self {
            enable_output: self.enable_output,
            symbol: self.symbol.clone(),
            api_key: self
                .api_key
                .as_ref()
                .map(|key| SecretString::from(key.expose_secret().to_owned())),
            network_type: self.network_type,
            api_base: self.api_base.clone(),
            timeout: self.timeout,
        }
    }
}

// ============================================================================
// EXCHANGE REQUESTS AND RESULTS
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Currency {
    pub name: String,
    pub symbol: String,
    pub network: Option<String>,
    pub is_fiat: bool,
    pub is_stable: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExchangeRateRequest {
    pub from: String,
    pub from_network: Option<String>,
    pub to: String,
    pub to_network: Option<String>,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExchangeRateInfo {
    pub min: f64,
    /// Zero when the vendor reports no upper bound
    pub max: f64,
    pub exchange_rate: f64,
    pub receive_amount: f64,
    pub network_fee: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryLimits {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CreateOrder {
    pub from_currency: String,
    pub from_network: Option<String>,
    pub to_currency: String,
    pub to_network: Option<String>,
    /// Amount the customer sends
    pub invoiced_amount: f64,
    /// Amount the customer expects to receive
    pub ordered_amount: f64,
    pub destination: String,
    pub extra_id: Option<String>,
    pub refund_address: Option<String>,
    pub refund_extra_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CreateResultInfo {
    pub uuid: String,
    pub deposit_address: String,
    pub deposit_extra_id: Option<String>,
    pub destination: String,
    pub from_currency: String,
    pub to_currency: String,
    pub invoiced_amount: f64,
    pub ordered_amount: f64,
    pub exchange_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateOrder {
    pub uuid: String,
    pub destination: Option<String>,
    pub refund_address: Option<String>,
    pub ordered_amount: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateOrderResult {
    pub uuid: String,
    pub deposit_address: String,
    pub destination: String,
    pub invoiced_amount: f64,
    pub ordered_amount: f64,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderInfoResult {
    /// Vendor's own status string
    pub status: String,
    pub internal_status: OrderStatus,
    pub receive_amount: f64,
    /// Payout transaction hash, if the vendor has sent funds
    pub tx_id: Option<String>,
    pub deposit_address: Option<String>,
    pub last_update: Option<String>,
    pub confirmations: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_order_status_round_trips_through_as_str() {
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::from_str(status.as_str()), Ok(status));
        }
        assert!(OrderStatus::from_str("bogus").is_err());
    }

    #[test]
    fn test_order_status_labels() {
        assert_eq!(OrderStatus::WaitingForDeposit.label(), "Waiting for deposit");
        assert_eq!(OrderStatus::default(), OrderStatus::Unknown);
        assert!(OrderStatus::Refunded.is_final());
        assert!(!OrderStatus::Sending.is_final());
    }

    #[test]
    fn test_network_type_parse_is_case_insensitive() {
        assert_eq!(NetworkType::from_str("ERC20"), Ok(NetworkType::Erc20));
        assert!(NetworkType::from_str("omni").is_err());
    }

    #[test]
    fn test_exchange_config_debug_redacts_secrets() {
        let config = ExchangeConfig::new("super-secret-key");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret-key"));
        assert_eq!(config.clone().api_key.expose_secret(), "super-secret-key");
    }

    #[test]
    fn test_explorer_config_builder() {
        let config = ExplorerConfig::new("USDT")
            .with_network_type(NetworkType::Erc20)
            .with_api_base("http://localhost:9999/")
            .with_timeout(Duration::from_secs(2));
        assert_eq!(config.network_type, Some(NetworkType::Erc20));
        assert_eq!(config.api_base.as_deref(), Some("http://localhost:9999/"));
        assert_eq!(config.timeout, Duration::from_secs(2));
    }
}
