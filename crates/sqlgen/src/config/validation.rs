//! Configuration validation.

use tracing::warn;

use super::{Config, DriverKind};
use crate::drivers::common::SslMode;
use crate::error::{GenError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    let kind = DriverKind::parse(&config.driver.r#type)?;

    if kind.needs_connection() {
        if config.driver.host.is_empty() {
            return Err(GenError::Config("driver.host is required".into()));
        }
        if config.driver.database.is_empty() {
            return Err(GenError::Config("driver.database is required".into()));
        }
        if config.driver.user.is_empty() {
            return Err(GenError::Config("driver.user is required".into()));
        }
    }

    SslMode::parse(&config.driver.ssl_mode)?;

    if config.generation.pkg_name.trim().is_empty() {
        return Err(GenError::Config("generation.pkg_name must not be empty".into()));
    }
    if config.generation.out_folder.as_os_str().is_empty() {
        return Err(GenError::Config(
            "generation.out_folder must not be empty".into(),
        ));
    }

    if !config.generation.include_tables.is_empty() && !config.generation.exclude_tables.is_empty()
    {
        warn!("both include_tables and exclude_tables are set; exclude_tables is ignored");
    }

    Ok(())
}
