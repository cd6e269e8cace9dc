//! HTTP plumbing for vendor adapters.

pub mod de;
pub mod transport;

pub use transport::{HttpTransport, MAX_ERROR_BODY_CHARS, decode, truncate_body};
