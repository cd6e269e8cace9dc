//! Block explorer adapters.

pub mod blockcypher;
pub mod dcrdata;
pub mod ethplorer;

pub use blockcypher::BlockcypherExplorer;
pub use dcrdata::DcrdataExplorer;
pub use ethplorer::EthplorerExplorer;

use crate::domain::{AppError, ExplorerConfig};
use crate::infra::http::HttpTransport;

/// Transport for an explorer, honouring the config's base URL override, timeout and output flag
pub(crate) fn explorer_transport(
    vendor: &'static str,
    default_api_base: &str,
    config: &ExplorerConfig,
) -> Result<HttpTransport, AppError> {
    let api_base = config.api_base.as_deref().unwrap_or(default_api_base);
    Ok(HttpTransport::new(vendor, api_base)?
        .with_timeout(config.timeout)
        .with_debug(config.enable_output))
}
