//! Core abstractions for dialect-independent schema introspection.
//!
//! - [`schema`]: Table, column, and key constraint metadata types
//! - [`traits`]: The driver contract and table selection
//!
//! Driver modules (`drivers/mysql`, `drivers/postgres`, etc.) implement
//! [`Driver`]; the assembler and orchestrator only ever see the trait.

pub mod schema;
pub mod traits;

pub use schema::{detect_join_table, Column, ForeignKey, PrimaryKey, SchemaGraph, Table};
pub use traits::{Driver, TableFilter};
