//! Bounded-time HTTP transport shared by every vendor adapter.
//!
//! One call is one request raced against a timer. If the timer wins, the request keeps running
//! in a detached task and its result is dropped on arrival, so side effects at the vendor (an
//! order being created, for instance) can still happen after the caller saw a timeout.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::domain::{AppError, ConfigError, DEFAULT_TIMEOUT, TransportError};

const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

/// Longest vendor error body echoed back in an error message
pub const MAX_ERROR_BODY_CHARS: usize = 256;

/// Per-adapter HTTP client bound to one vendor base URL
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    vendor: &'static str,
    api_base: String,
    timeout: Duration,
    debug: bool,
    auth_header: Option<(HeaderName, SecretString)>,
}

impl HttpTransport {
    pub fn new(vendor: &'static str, api_base: impl Into<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ConfigError::Invalid(format!("HTTP client: {}", e)))?;
        let mut api_base = api_base.into();
        if !api_base.ends_with('/') {
            api_base.push('/');
        }
        Ok(Self {
            client,
            vendor,
            api_base,
            timeout: DEFAULT_TIMEOUT,
            debug: false,
            auth_header: None,
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Dump requests and responses at debug level
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Header attached to requests made with `auth_needed`
    pub fn with_auth_header(mut self, name: &str, value: SecretString) -> Result<Self, AppError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ConfigError::Invalid(format!("auth header name: {}", e)))?;
        self.auth_header = Some((name, value));
        Ok(self)
    }

    pub fn vendor(&self) -> &'static str {
        self.vendor
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `path` relative to the base URL, or an absolute `http(s)://` URL used as is
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.api_base, path.trim_start_matches('/'))
        }
    }

    /// Perform one request and return the raw response body.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Vec<u8>>,
        auth_needed: bool,
    ) -> Result<Vec<u8>, AppError> {
        let url = self.url(path);
        let mut request = self.client.request(method.clone(), &url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if method == Method::POST || method == Method::PUT {
            request = request
                .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
                .header(ACCEPT, "application/json");
        }
        if auth_needed {
            if let Some((name, value)) = &self.auth_header {
                let value = HeaderValue::from_str(value.expose_secret())
                    .map_err(|e| ConfigError::Invalid(format!("auth header value: {}", e)))?;
                request = request.header(name.clone(), value);
            }
        }
        if self.debug {
            debug!(
                vendor = self.vendor,
                method = %method,
                url = %url,
                query = ?query,
                body = %body.as_deref().map(String::from_utf8_lossy).unwrap_or_default(),
                "Vendor request"
            );
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let vendor = self.vendor;
        let round_trip = tokio::spawn(async move {
            let response = request.send().await?;
            let status = response.status();
            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, bytes.to_vec()))
        });

        let (status, bytes) = match tokio::time::timeout(self.timeout, round_trip).await {
            Err(_) => {
                warn!(vendor, url = %url, timeout = ?self.timeout, "Vendor request timed out");
                return Err(TransportError::Timeout(self.timeout).into());
            }
            Ok(Err(join_error)) => {
                return Err(TransportError::Connection(join_error.to_string()).into());
            }
            Ok(Ok(Err(e))) => {
                warn!(vendor, url = %url, error = %e, "Vendor request failed");
                return Err(classify_reqwest_error(e, self.timeout).into());
            }
            Ok(Ok(Ok(response))) => response,
        };

        if self.debug {
            debug!(
                vendor,
                status = status.as_u16(),
                body = %String::from_utf8_lossy(&bytes),
                "Vendor response"
            );
        }

        check_status(vendor, status, &bytes)?;
        Ok(bytes)
    }

    /// GET `path` and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        auth_needed: bool,
    ) -> Result<T, AppError> {
        let bytes = self
            .execute(Method::GET, path, query, None, auth_needed)
            .await?;
        decode(self.vendor, &bytes)
    }

    /// POST `payload` as JSON to `path` and decode the JSON body
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &B,
        auth_needed: bool,
    ) -> Result<T, AppError> {
        let body = serde_json::to_vec(payload)?;
        let bytes = self
            .execute(Method::POST, path, &[], Some(body), auth_needed)
            .await?;
        decode(self.vendor, &bytes)
    }
}

/// Decode a vendor JSON body, naming the vendor on failure
pub fn decode<T: DeserializeOwned>(vendor: &str, bytes: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(bytes).map_err(|e| {
        AppError::Deserialization(format!(
            "{}: {} in {}",
            vendor,
            e,
            truncate_body(&String::from_utf8_lossy(bytes))
        ))
    })
}

fn classify_reqwest_error(error: reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(timeout)
    } else {
        TransportError::Connection(error.to_string())
    }
}

fn check_status(vendor: &str, status: StatusCode, bytes: &[u8]) -> Result<(), TransportError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(TransportError::TooManyRequests {
            vendor: vendor.to_string(),
        });
    }
    if !status.is_success() {
        let message = truncate_body(&String::from_utf8_lossy(bytes));
        warn!(vendor, status = status.as_u16(), message = %message, "Vendor returned error status");
        return Err(TransportError::Status {
            vendor: vendor.to_string(),
            status: status.as_u16(),
            message,
        });
    }
    Ok(())
}

/// Keeps the text before an HTML `<body>` tag, capped at [`MAX_ERROR_BODY_CHARS`].
pub fn truncate_body(body: &str) -> String {
    let head = match body.to_ascii_lowercase().find("<body") {
        Some(index) => &body[..index],
        None => body,
    };
    let head = head.trim();
    match head.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((cut, _)) => format!("{}...", &head[..cut]),
        None => head.to_string(),
    }
}
