//! Domain layer containing canonical types, traits, and error definitions.

pub mod amount;
pub mod error;
pub mod status;
pub mod traits;
pub mod transaction;
pub mod types;

pub use amount::{ATOMS_PER_COIN, Amount};
pub use error::{AppError, ConfigError, RegistryKind, TransportError, ValidationError};
pub use status::{StatusTable, status_table};
pub use traits::{Exchange, Explorer};
pub use transaction::{
    AddressHistory, AddressVerifyRequest, Transaction, TxInput, TxOutput, TxVerifyRequest,
    Verification, VerifyResult, addresses_match,
};
pub use types::{
    CreateOrder, CreateResultInfo, Currency, DEFAULT_TIMEOUT, ExchangeConfig, ExchangeRateInfo,
    ExchangeRateRequest, ExplorerConfig, NetworkType, OrderInfoResult, OrderStatus, QueryLimits,
    TX_HASH_INTERNAL_TRANSFER, UpdateOrder, UpdateOrderResult,
};
