//! Database driver implementations.
//!
//! Each dialect implements [`Driver`](crate::core::traits::Driver):
//!
//! - [`mysql`]: MySQL/MariaDB (feature `mysql`)
//! - [`postgres`]: PostgreSQL
//! - [`mssql`]: Microsoft SQL Server
//! - [`mock`]: In-memory catalog for tests
//! - [`common`]: Shared utilities (SSL modes, TLS)
//!
//! [`DriverImpl`] selects the driver from configuration and dispatches with a
//! `match` instead of a trait object.

pub mod common;
pub mod mock;
pub mod mssql;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod postgres;

use async_trait::async_trait;

pub use common::{SslMode, TlsBuilder};
pub use mock::{MockDriver, MockTable};
pub use mssql::MssqlDriver;
#[cfg(feature = "mysql")]
pub use mysql::MysqlDriver;
pub use postgres::PostgresDriver;

use crate::config::{Config, DriverKind};
use crate::core::schema::{Column, ForeignKey, PrimaryKey};
use crate::core::traits::{Driver, TableFilter};
use crate::error::Result;
use crate::typemap::TypeMapOptions;

/// Enum-based static dispatch over the supported drivers.
pub enum DriverImpl {
    #[cfg(feature = "mysql")]
    Mysql(MysqlDriver),
    Postgres(PostgresDriver),
    Mssql(MssqlDriver),
    Mock(MockDriver),
}

impl DriverImpl {
    /// Create the driver named by `driver.type`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the type is not recognized or its
    /// support was not compiled in.
    pub fn from_config(config: &Config) -> Result<Self> {
        let type_opts = TypeMapOptions {
            tinyint_as_bool: config.generation.tinyint_as_bool,
        };
        let driver = config.driver.clone();

        match config.driver_kind()? {
            #[cfg(feature = "mysql")]
            DriverKind::Mysql => Ok(DriverImpl::Mysql(MysqlDriver::new(driver, type_opts))),
            #[cfg(not(feature = "mysql"))]
            DriverKind::Mysql => Err(crate::error::GenError::Config(
                "MySQL support requires the 'mysql' feature".into(),
            )),
            DriverKind::Postgres => Ok(DriverImpl::Postgres(PostgresDriver::new(driver, type_opts))),
            DriverKind::Mssql => Ok(DriverImpl::Mssql(MssqlDriver::new(driver, type_opts))),
            DriverKind::Mock => Ok(DriverImpl::Mock(MockDriver::with_fixture(type_opts))),
        }
    }
}

macro_rules! dispatch {
    ($self:expr, $d:ident => $call:expr) => {
        match $self {
            #[cfg(feature = "mysql")]
            DriverImpl::Mysql($d) => $call,
            DriverImpl::Postgres($d) => $call,
            DriverImpl::Mssql($d) => $call,
            DriverImpl::Mock($d) => $call,
        }
    };
}

#[async_trait]
impl Driver for DriverImpl {
    async fn open(&mut self) -> Result<()> {
        dispatch!(self, d => d.open().await)
    }

    async fn close(&mut self) {
        dispatch!(self, d => d.close().await)
    }

    async fn table_names(&mut self, schema: &str, filter: &TableFilter) -> Result<Vec<String>> {
        dispatch!(self, d => d.table_names(schema, filter).await)
    }

    async fn columns(&mut self, schema: &str, table: &str) -> Result<Vec<Column>> {
        dispatch!(self, d => d.columns(schema, table).await)
    }

    async fn primary_key_info(&mut self, schema: &str, table: &str) -> Result<Option<PrimaryKey>> {
        dispatch!(self, d => d.primary_key_info(schema, table).await)
    }

    async fn foreign_key_info(&mut self, schema: &str, table: &str) -> Result<Vec<ForeignKey>> {
        dispatch!(self, d => d.foreign_key_info(schema, table).await)
    }

    fn name(&self) -> &str {
        dispatch!(self, d => d.name())
    }

    fn use_last_insert_id(&self) -> bool {
        dispatch!(self, d => d.use_last_insert_id())
    }

    fn use_top_clause(&self) -> bool {
        dispatch!(self, d => d.use_top_clause())
    }

    fn left_quote(&self) -> char {
        dispatch!(self, d => d.left_quote())
    }

    fn right_quote(&self) -> char {
        dispatch!(self, d => d.right_quote())
    }

    fn index_placeholders(&self) -> bool {
        dispatch!(self, d => d.index_placeholders())
    }

    fn placeholder_prefix(&self) -> &str {
        dispatch!(self, d => d.placeholder_prefix())
    }
}
