//! Application layer: adapter registries and the verification engine.

pub mod registry;
pub mod verification;

pub use registry::{ExchangeConstructor, ExchangeRegistry, ExplorerConstructor, ExplorerRegistry};
pub use verification::{
    AmountMatch, DEFAULT_HISTORY_LIMIT, DEFAULT_TOLERANCE, Discrepancy, verify_by_address,
    verify_by_address_history, verify_by_tx_id, verify_transaction,
};
