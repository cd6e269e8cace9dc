//! Error taxonomy shared by the registry, the transport, every adapter and the verification engine.

use thiserror::Error;

/// Which registry keyspace a lookup was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryKind {
    Exchange,
    ExplorerSymbol,
    ExplorerNetworkType,
}

impl std::fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Exchange => "exchange",
            Self::ExplorerSymbol => "explorer",
            Self::ExplorerNetworkType => "explorer network type",
        };
        write!(f, "{}", label)
    }
}

/// Top-level application error
#[derive(Debug, Error)]
pub enum AppError {
    #[error("[{key}] {kind} is not registered")]
    NotRegistered { kind: RegistryKind, key: String },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Error payload returned inside an otherwise successful response
    #[error("{vendor} error: {message}")]
    Vendor { vendor: String, message: String },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AppError {
    /// True for both non-2xx responses and error payloads embedded in a 2xx body.
    #[must_use]
    pub fn is_vendor_error(&self) -> bool {
        matches!(
            self,
            Self::Vendor { .. } | Self::Transport(TransportError::Status { .. })
        )
    }

    #[must_use]
    pub fn is_too_many_requests(&self) -> bool {
        matches!(self, Self::Transport(TransportError::TooManyRequests { .. }))
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Timeout(_)))
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Deserialization(err.to_string())
    }
}

/// HTTP transport failures
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("{vendor} returned HTTP {status}: {message}")]
    Status {
        vendor: String,
        status: u16,
        message: String,
    },

    #[error("{vendor}: too many requests")]
    TooManyRequests { vendor: String },
}

/// Request validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{0}")]
    Multiple(String),
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    format!("{}: {}", field, message)
                })
            })
            .collect();
        messages.sort();
        Self::Multiple(messages.join("; "))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.into())
    }
}

/// Adapter construction errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration value: {0}")]
    Missing(String),

    #[error("Invalid configuration value: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_registered_message_carries_key() {
        let err = AppError::NotRegistered {
            kind: RegistryKind::ExplorerSymbol,
            key: "xmr".to_string(),
        };
        assert_eq!(err.to_string(), "[xmr] explorer is not registered");
    }

    #[test]
    fn test_validation_errors_collapse_into_one_message() {
        use validator::Validate;

        let request = crate::domain::TxVerifyRequest::new("", 0.0, 1);
        let err = AppError::from(request.validate().unwrap_err());
        match err {
            AppError::Validation(ValidationError::Multiple(message)) => {
                assert_eq!(
                    message,
                    "address: Address is required; amount: Amount must be at least one atom"
                );
            }
            other => panic!("Expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_vendor_error_classification() {
        let embedded = AppError::Vendor {
            vendor: "blockcypher".to_string(),
            message: "Transaction not found".to_string(),
        };
        let status = AppError::Transport(TransportError::Status {
            vendor: "exolix".to_string(),
            status: 500,
            message: "boom".to_string(),
        });
        let throttled = AppError::Transport(TransportError::TooManyRequests {
            vendor: "exolix".to_string(),
        });

        assert!(embedded.is_vendor_error());
        assert!(status.is_vendor_error());
        assert!(!throttled.is_vendor_error());
        assert!(throttled.is_too_many_requests());
    }

    #[test]
    fn test_timeout_classification() {
        let err: AppError = TransportError::Timeout(std::time::Duration::from_secs(30)).into();
        assert!(err.is_timeout());
        assert!(!err.is_not_found());
    }
}
