//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenError;

    #[test]
    fn test_from_yaml_applies_defaults() {
        let yaml = r#"
driver:
  type: mysql
  host: localhost
  database: shop
  user: root
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.driver_kind().unwrap(), DriverKind::Mysql);
        assert_eq!(config.driver.effective_port(DriverKind::Mysql), 3306);
        assert_eq!(config.driver.ssl_mode, "require");
        assert_eq!(config.generation.pkg_name, "models");
        assert_eq!(config.generation.out_folder, Path::new("models"));
        assert!(!config.generation.tinyint_as_bool);
        assert_eq!(config.effective_schema().unwrap(), "shop");
    }

    #[test]
    fn test_effective_schema_defaults_per_dialect() {
        let yaml = |ty: &str| {
            format!(
                "driver:\n  type: {}\n  host: h\n  database: d\n  user: u\n",
                ty
            )
        };
        let schema = |ty: &str| Config::from_yaml(&yaml(ty)).unwrap().effective_schema().unwrap();
        assert_eq!(schema("postgres"), "public");
        assert_eq!(schema("mssql"), "dbo");
        assert_eq!(schema("mock"), "main");
    }

    #[test]
    fn test_explicit_schema_and_port() {
        let yaml = r#"
driver:
  type: pg
  host: db
  port: 6543
  database: app
  user: app
generation:
  schema: billing
  include_tables: [invoices]
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.driver.effective_port(DriverKind::Postgres), 6543);
        assert_eq!(config.effective_schema().unwrap(), "billing");
        assert_eq!(config.generation.include_tables, vec!["invoices"]);
    }

    #[test]
    fn test_malformed_yaml_is_yaml_error() {
        let err = Config::from_yaml("driver: [").unwrap_err();
        assert!(matches!(err, GenError::Yaml(_)));
    }
}
