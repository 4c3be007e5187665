//! Common utilities shared across database drivers.
//!
//! - [`tls`]: SSL mode parsing and rustls connectors

pub mod tls;

pub use tls::{SslMode, TlsBuilder};
