//! Instant-swap exchange adapters.

pub mod changenow;
pub mod exolix;

pub use changenow::ChangeNowExchange;
pub use exolix::ExolixExchange;

use secrecy::{ExposeSecret, SecretString};

use crate::domain::{AppError, ConfigError, ExchangeConfig};
use crate::infra::http::HttpTransport;

/// Transport for an exchange, honouring the config's base URL override, timeout and debug flag
pub(crate) fn exchange_transport(
    vendor: &'static str,
    default_api_base: &str,
    config: &ExchangeConfig,
) -> Result<HttpTransport, AppError> {
    let api_base = config.api_base.as_deref().unwrap_or(default_api_base);
    Ok(HttpTransport::new(vendor, api_base)?
        .with_timeout(config.timeout)
        .with_debug(config.debug))
}

/// The configured API key, or a configuration error naming the vendor when it is blank
pub(crate) fn require_api_key(
    vendor: &str,
    config: &ExchangeConfig,
) -> Result<SecretString, AppError> {
    let key = config.api_key.expose_secret().trim();
    if key.is_empty() {
        return Err(ConfigError::Missing(format!("{}: api key", vendor)).into());
    }
    Ok(SecretString::from(key.to_owned()))
}
