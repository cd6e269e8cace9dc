//! Infrastructure layer: HTTP transport and vendor adapters.
//!
//! Default wiring lives here as two explicit tables. Callers build a registry once at startup and
//! may register further adapters on top of it.

pub mod exchange;
pub mod explorer;
pub mod http;

pub use exchange::{ChangeNowExchange, ExolixExchange};
pub use explorer::{BlockcypherExplorer, DcrdataExplorer, EthplorerExplorer};
pub use http::HttpTransport;

use crate::app::{ExchangeRegistry, ExplorerRegistry};
use crate::domain::{AppError, Exchange, ExchangeConfig, Explorer, ExplorerConfig, NetworkType};
use explorer::blockcypher::BlockcypherCoin;

type ExchangeFactory = fn(ExchangeConfig) -> Result<Box<dyn Exchange>, AppError>;
type ExplorerFactory = fn(ExplorerConfig) -> Result<Box<dyn Explorer>, AppError>;

const EXCHANGES: &[(&str, ExchangeFactory)] = &[
    ("changenow", |config| Ok(Box::new(ChangeNowExchange::new(&config)?))),
    ("exolix", |config| Ok(Box::new(ExolixExchange::new(&config)?))),
];

const EXPLORERS: &[(Option<&str>, Option<NetworkType>, ExplorerFactory)] = &[
    (Some("ltc"), None, |config| {
        Ok(Box::new(BlockcypherExplorer::new(BlockcypherCoin::Litecoin, &config)?))
    }),
    (Some("eth"), None, |config| {
        Ok(Box::new(BlockcypherExplorer::new(BlockcypherCoin::Ethereum, &config)?))
    }),
    (Some("dcr"), None, |config| Ok(Box::new(DcrdataExplorer::new(&config)?))),
    (None, Some(NetworkType::Erc20), |config| {
        Ok(Box::new(EthplorerExplorer::new(&config)?))
    }),
];

/// Registry holding every bundled exchange adapter
pub fn default_exchange_registry() -> ExchangeRegistry {
    let registry = ExchangeRegistry::new();
    for (name, factory) in EXCHANGES {
        registry.register(name, *factory);
    }
    registry
}

/// Registry holding every bundled explorer adapter
pub fn default_explorer_registry() -> ExplorerRegistry {
    let registry = ExplorerRegistry::new();
    for (symbol, network_type, factory) in EXPLORERS {
        registry.register(*symbol, *network_type, *factory);
    }
    registry
}
