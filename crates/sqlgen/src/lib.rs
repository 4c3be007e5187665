//! # sqlgen
//!
//! Database schema introspection and normalization engine for code generators.
//!
//! This library reads table, column, and key metadata from a live database
//! and produces a dialect-independent model for a pluggable renderer:
//!
//! - **Drivers** for MySQL/MariaDB, PostgreSQL, SQL Server, and an in-memory mock
//! - **Type translation** from dialect column types to semantic types with nullable wrappers
//! - **Schema assembly** with join-table detection and primary key validation
//! - **Write-once output layout** of one directory per table
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::io::Write;
//! use sqlgen::render::{RenderError, TableRenderer, TemplateData};
//! use sqlgen::{Config, Orchestrator};
//!
//! struct Names;
//!
//! impl TableRenderer for Names {
//!     fn render(&self, data: &TemplateData<'_>, out: &mut dyn Write) -> Result<(), RenderError> {
//!         writeln!(out, "// {}", data.table.name)?;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> sqlgen::Result<()> {
//!     let config = Config::load("sqlgen.yaml")?;
//!     let mut orchestrator = Orchestrator::new(config, Box::new(Names))?;
//!     let result = orchestrator.run().await?;
//!     println!("Rendered {} tables", result.tables_rendered);
//!     Ok(())
//! }
//! ```

pub mod assembler;
pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod orchestrator;
pub mod render;
pub mod typemap;

// Re-exports for convenient access
pub use assembler::SchemaAssembler;
pub use config::{Config, DriverConfig, DriverKind, GenerationConfig};
pub use self::core::{Column, Driver, ForeignKey, PrimaryKey, SchemaGraph, Table, TableFilter};
pub use drivers::{DriverImpl, MockDriver, MockTable};
pub use error::{GenError, Result};
pub use orchestrator::{GenerationResult, HealthCheckResult, Orchestrator};
pub use render::{DialectOptions, OutputLayout, TableRenderer, TableTestRenderer, TemplateData};
pub use typemap::{NullWrapper, RawColumn, SemanticType, TypeMapOptions};
