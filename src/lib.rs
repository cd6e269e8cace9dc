//! Uniform adapters for instant-swap exchanges and block explorers.
//!
//! - [`domain`]: canonical types, the [`domain::Exchange`] and [`domain::Explorer`] traits, errors
//! - [`app`]: adapter registries and the deposit verification engine
//! - [`infra`]: HTTP transport, bundled vendor adapters and default wiring

pub mod app;
pub mod domain;
pub mod infra;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
