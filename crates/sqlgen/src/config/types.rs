//! Configuration type definitions.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{GenError, Result};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection settings.
    pub driver: DriverConfig,

    /// Introspection and output behavior.
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl Config {
    /// The dialect named by `driver.type`.
    pub fn driver_kind(&self) -> Result<DriverKind> {
        DriverKind::parse(&self.driver.r#type)
    }

    /// Schema to introspect: the configured one or the dialect default.
    pub fn effective_schema(&self) -> Result<String> {
        if let Some(schema) = self.generation.schema.as_deref().filter(|s| !s.is_empty()) {
            return Ok(schema.to_string());
        }
        Ok(match self.driver_kind()? {
            DriverKind::Mysql => self.driver.database.clone(),
            DriverKind::Postgres => "public".to_string(),
            DriverKind::Mssql => "dbo".to_string(),
            DriverKind::Mock => "main".to_string(),
        })
    }
}

/// Supported dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    Mysql,
    Postgres,
    Mssql,
    Mock,
}

impl DriverKind {
    /// Parse a dialect identifier, accepting common aliases.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DriverKind::Mysql),
            "postgres" | "postgresql" | "pg" => Ok(DriverKind::Postgres),
            "mssql" | "sqlserver" | "sql_server" => Ok(DriverKind::Mssql),
            "mock" => Ok(DriverKind::Mock),
            other => Err(GenError::Config(format!(
                "Unknown driver type: '{}'. Supported types: mysql, postgres, mssql, mock",
                other
            ))),
        }
    }

    /// Canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            DriverKind::Mysql => "mysql",
            DriverKind::Postgres => "postgres",
            DriverKind::Mssql => "mssql",
            DriverKind::Mock => "mock",
        }
    }

    /// Port used when the configuration leaves it unset.
    pub fn default_port(&self) -> u16 {
        match self {
            DriverKind::Mysql => 3306,
            DriverKind::Postgres => 5432,
            DriverKind::Mssql => 1433,
            DriverKind::Mock => 0,
        }
    }

    /// Whether host, database and user must be configured.
    pub fn needs_connection(&self) -> bool {
        !matches!(self, DriverKind::Mock)
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Database connection configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Dialect: mysql, postgres, mssql, or mock.
    pub r#type: String,

    /// Database host.
    #[serde(default)]
    pub host: String,

    /// Database port (0 uses the dialect default).
    #[serde(default)]
    pub port: u16,

    /// Database name.
    #[serde(default)]
    pub database: String,

    /// Username.
    #[serde(default)]
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// SSL mode (default: "require").
    #[serde(default = "default_require")]
    pub ssl_mode: String,
}

impl DriverConfig {
    /// Configured port, or the dialect default when unset.
    pub fn effective_port(&self, kind: DriverKind) -> u16 {
        if self.port == 0 {
            kind.default_port()
        } else {
            self.port
        }
    }
}

impl fmt::Debug for DriverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverConfig")
            .field("type", &self.r#type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Introspection and output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Schema to introspect (default depends on the dialect).
    #[serde(default)]
    pub schema: Option<String>,

    /// Package/module name handed to the renderer (default: "models").
    #[serde(default = "default_models")]
    pub pkg_name: String,

    /// Output root directory (default: "models").
    #[serde(default = "default_out_folder")]
    pub out_folder: PathBuf,

    /// Only introspect these tables.
    #[serde(default)]
    pub include_tables: Vec<String>,

    /// Skip these tables. Ignored when `include_tables` is set.
    #[serde(default)]
    pub exclude_tables: Vec<String>,

    /// Treat MySQL `tinyint(1)` columns as booleans.
    #[serde(default)]
    pub tinyint_as_bool: bool,

    /// Skip test file generation.
    #[serde(default)]
    pub no_tests: bool,

    /// Remove the output root before writing.
    #[serde(default)]
    pub wipe: bool,

    /// Print the assembled schema as JSON before rendering.
    #[serde(default)]
    pub debug: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            schema: None,
            pkg_name: default_models(),
            out_folder: default_out_folder(),
            include_tables: Vec::new(),
            exclude_tables: Vec::new(),
            tinyint_as_bool: false,
            no_tests: false,
            wipe: false,
            debug: false,
        }
    }
}

fn default_require() -> String {
    "require".to_string()
}

fn default_models() -> String {
    "models".to_string()
}

fn default_out_folder() -> PathBuf {
    PathBuf::from("models")
}
