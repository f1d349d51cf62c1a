#![forbid(unsafe_code)]
//! evmatch-core: schema, scalar kinds, composite keys, configuration, and
//! run summaries for the event matcher.
//!
//! Pure data and string logic only; the typed buffers live in `evmatch-mem`
//! and all IO in `evmatch-io`.

pub mod config;
pub mod error;
pub mod key;
pub mod schema;
pub mod summary;

/// Crate version string for provenance in run summaries.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
