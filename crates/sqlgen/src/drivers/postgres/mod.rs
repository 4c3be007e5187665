//! PostgreSQL database driver.
//!
//! Metadata comes from `information_schema` joined with `pg_catalog` for
//! parameterized types and constraint column order.

mod driver;

pub use driver::PostgresDriver;
