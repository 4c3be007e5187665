//! MySQL/MariaDB database driver.
//!
//! Reads table, column and key metadata from `INFORMATION_SCHEMA` through a
//! single-connection SQLx pool. Column types are translated with
//! [`MysqlTypes`](crate::typemap::MysqlTypes).
//!
//! # Feature Flag
//!
//! This module is only available when the `mysql` feature is enabled (the default).
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

mod driver;

pub use driver::MysqlDriver;
