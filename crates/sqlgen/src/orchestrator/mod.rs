//! Generation orchestrator - main workflow coordinator.
//!
//! Owns the driver for the whole run: open, assemble, optional debug dump,
//! output preparation, render loop, close. The schema is resolved before the
//! driver is touched; once `open` has been attempted, `close` runs exactly once
//! per call to [`Orchestrator::run`], [`Orchestrator::introspect`], or
//! [`Orchestrator::health_check`], whatever the outcome.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::assembler::SchemaAssembler;
use crate::config::Config;
use crate::core::schema::SchemaGraph;
use crate::core::traits::{Driver, TableFilter};
use crate::drivers::DriverImpl;
use crate::error::Result;
use crate::render::{DialectOptions, OutputLayout, TableRenderer, TableTestRenderer, TemplateData};

/// Generation orchestrator.
pub struct Orchestrator<D: Driver = DriverImpl> {
    config: Config,
    driver: D,
    renderer: Box<dyn TableRenderer>,
    test_renderer: Option<Box<dyn TableTestRenderer>>,
}

/// Result of a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Driver that was introspected.
    pub driver: String,

    /// Schema that was introspected.
    pub schema: String,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Tables in the assembled schema.
    pub tables_total: usize,

    /// Tables handed to the renderer.
    pub tables_rendered: usize,

    /// Join tables skipped by the render loop.
    pub join_tables_skipped: Vec<String>,

    /// Every file written, in write order.
    pub files_written: Vec<PathBuf>,
}

impl GenerationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Result of a connectivity check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub driver: String,
    pub healthy: bool,
    pub latency_ms: u64,
    pub error: Option<String>,
}

/// Counters gathered by the render loop.
#[derive(Debug, Default)]
struct RenderStats {
    tables_total: usize,
    tables_rendered: usize,
    join_tables_skipped: Vec<String>,
    files_written: Vec<PathBuf>,
}

impl Orchestrator<DriverImpl> {
    /// Create an orchestrator for the driver named in the configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown driver type.
    pub fn new(config: Config, renderer: Box<dyn TableRenderer>) -> Result<Self> {
        let driver = DriverImpl::from_config(&config)?;
        Ok(Self::with_driver(config, driver, renderer))
    }
}

impl<D: Driver> Orchestrator<D> {
    /// Create an orchestrator around an already-constructed driver.
    pub fn with_driver(config: Config, driver: D, renderer: Box<dyn TableRenderer>) -> Self {
        Self {
            config,
            driver,
            renderer,
            test_renderer: None,
        }
    }

    /// Also render a test file per table unless `generation.no_tests` is set.
    pub fn with_test_renderer(mut self, renderer: Box<dyn TableTestRenderer>) -> Self {
        self.test_renderer = Some(renderer);
        self
    }

    /// The configuration this orchestrator runs with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Introspect, validate, and render every entity table.
    pub async fn run(&mut self) -> Result<GenerationResult> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();

        info!("Starting generation run: {}", run_id);

        let schema = self.config.effective_schema()?;
        let outcome = self.generate(&schema).await;
        self.driver.close().await;
        let stats = outcome?;

        let completed_at = Utc::now();
        let duration = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        let result = GenerationResult {
            run_id,
            driver: self.driver.name().to_string(),
            schema,
            started_at,
            completed_at,
            duration_seconds: duration,
            tables_total: stats.tables_total,
            tables_rendered: stats.tables_rendered,
            join_tables_skipped: stats.join_tables_skipped,
            files_written: stats.files_written,
        };

        info!(
            "Generation completed: {} of {} tables rendered, {} files in {:.2}s",
            result.tables_rendered,
            result.tables_total,
            result.files_written.len(),
            result.duration_seconds
        );

        Ok(result)
    }

    /// Introspect and validate without rendering.
    pub async fn introspect(&mut self) -> Result<SchemaGraph> {
        let schema = self.config.effective_schema()?;
        let outcome = match self.driver.open().await {
            Ok(()) => self.assembler(&schema).assemble(&mut self.driver).await,
            Err(e) => Err(e),
        };
        self.driver.close().await;
        outcome
    }

    /// Open and close the driver, measuring how long the connection took.
    pub async fn health_check(&mut self) -> Result<HealthCheckResult> {
        let start = Instant::now();
        let opened = self.driver.open().await;
        let latency_ms = start.elapsed().as_millis() as u64;
        self.driver.close().await;

        let error = match opened {
            Ok(()) => None,
            Err(e) => {
                warn!("Health check failed for {}: {}", self.driver.name(), e);
                Some(e.to_string())
            }
        };

        Ok(HealthCheckResult {
            driver: self.driver.name().to_string(),
            healthy: error.is_none(),
            latency_ms,
            error,
        })
    }

    fn assembler(&self, schema: &str) -> SchemaAssembler {
        let generation = &self.config.generation;
        SchemaAssembler::new(
            schema,
            TableFilter::new(&generation.include_tables, &generation.exclude_tables),
        )
    }

    /// Everything between open and close.
    async fn generate(&mut self, schema: &str) -> Result<RenderStats> {
        info!("Phase 1: Connecting to {}", self.driver.name());
        self.driver.open().await?;

        info!("Phase 2: Introspecting schema '{}'", schema);
        let graph = self.assembler(schema).assemble(&mut self.driver).await?;

        let generation = &self.config.generation;
        if generation.debug {
            println!("{}", serde_json::to_string_pretty(graph.tables())?);
        }

        info!("Phase 3: Rendering into {}", generation.out_folder.display());
        let layout = OutputLayout::new(&generation.out_folder);
        layout.prepare(generation.wipe)?;

        let dialect = DialectOptions::from_driver(&self.driver);
        let test_renderer = if generation.no_tests {
            None
        } else {
            self.test_renderer.as_deref()
        };

        let mut stats = RenderStats {
            tables_total: graph.len(),
            ..Default::default()
        };

        for table in graph.tables() {
            if table.is_join_table {
                debug!("Skipping join table {}", table.name);
                stats.join_tables_skipped.push(table.name.clone());
                continue;
            }

            let data = TemplateData {
                table,
                tables: graph.tables(),
                pkg_name: &generation.pkg_name,
                schema,
                dialect: &dialect,
            };

            layout.create_table_dir(&table.name)?;

            let path = layout.source_path(&table.name, self.renderer.extension());
            layout.write_new(&path, &table.name, |out| self.renderer.render(&data, out))?;
            stats.files_written.push(path);

            if let Some(test_renderer) = test_renderer {
                let path = layout.test_path(&table.name, test_renderer.extension());
                layout.write_new(&path, &table.name, |out| test_renderer.render(&data, out))?;
                stats.files_written.push(path);
            }

            stats.tables_rendered += 1;
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DriverConfig, GenerationConfig};
    use crate::drivers::mock::{MockCalls, MockDriver};
    use crate::error::GenError;
    use crate::render::RenderError;
    use crate::typemap::TypeMapOptions;
    use std::io::Write;

    struct NameRenderer;

    impl TableRenderer for NameRenderer {
        fn render(&self, data: &TemplateData<'_>, out: &mut dyn Write) -> std::result::Result<(), RenderError> {
            writeln!(out, "{}", data.table.name)?;
            Ok(())
        }

        fn extension(&self) -> &str {
            "txt"
        }
    }

    fn mock_config(out: &std::path::Path) -> Config {
        Config {
            driver: DriverConfig {
                r#type: "mock".to_string(),
                host: String::new(),
                port: 0,
                database: String::new(),
                user: String::new(),
                password: String::new(),
                ssl_mode: "disable".to_string(),
            },
            generation: GenerationConfig {
                out_folder: out.to_path_buf(),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_run_skips_join_tables_and_closes_once() {
        let dir = tempfile::tempdir().unwrap();
        let driver = MockDriver::with_fixture(TypeMapOptions::default());
        let calls = driver.calls();
        let mut orchestrator =
            Orchestrator::with_driver(mock_config(dir.path()), driver, Box::new(NameRenderer));

        let result = orchestrator.run().await.unwrap();
        assert_eq!(result.driver, "mock");
        assert_eq!(result.schema, "main");
        assert_eq!(result.tables_total, 4);
        assert_eq!(result.tables_rendered, 3);
        assert_eq!(result.join_tables_skipped, vec!["user_roles"]);
        assert!(dir.path().join("users/users_gen.txt").exists());
        assert!(!dir.path().join("user_roles").exists());
        assert_eq!(MockCalls::get(&calls.close), 1);
    }

    #[tokio::test]
    async fn test_introspect_returns_graph() {
        let dir = tempfile::tempdir().unwrap();
        let driver = MockDriver::with_fixture(TypeMapOptions::default());
        let calls = driver.calls();
        let mut orchestrator =
            Orchestrator::with_driver(mock_config(dir.path()), driver, Box::new(NameRenderer));

        let graph = orchestrator.introspect().await.unwrap();
        assert_eq!(graph.len(), 4);
        assert_eq!(MockCalls::get(&calls.close), 1);
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_unresolvable_schema_never_touches_driver() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = mock_config(dir.path());
        config.driver.r#type = "db2".to_string();

        let driver = MockDriver::with_fixture(TypeMapOptions::default());
        let calls = driver.calls();
        let mut orchestrator = Orchestrator::with_driver(config, driver, Box::new(NameRenderer));

        assert!(matches!(orchestrator.run().await, Err(GenError::Config(_))));
        assert!(matches!(orchestrator.introspect().await, Err(GenError::Config(_))));
        assert_eq!(MockCalls::get(&calls.open), 0);
        assert_eq!(MockCalls::get(&calls.close), 0);
    }

    #[tokio::test]
    async fn test_health_check_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let driver = MockDriver::with_fixture(TypeMapOptions::default()).fail_open("refused");
        let mut orchestrator =
            Orchestrator::with_driver(mock_config(dir.path()), driver, Box::new(NameRenderer));

        let result = orchestrator.health_check().await.unwrap();
        assert!(!result.healthy);
        assert!(result.error.unwrap().contains("refused"));
    }

    #[tokio::test]
    async fn test_new_rejects_unknown_driver() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = mock_config(dir.path());
        config.driver.r#type = "db2".to_string();
        let err = Orchestrator::new(config, Box::new(NameRenderer)).err().unwrap();
        assert!(matches!(err, GenError::Config(_)));
    }

    #[test]
    fn test_generation_result_to_json() {
        let now = Utc::now();
        let result = GenerationResult {
            run_id: "abc".to_string(),
            driver: "mock".to_string(),
            schema: "main".to_string(),
            started_at: now,
            completed_at: now,
            duration_seconds: 0.0,
            tables_total: 1,
            tables_rendered: 1,
            join_tables_skipped: vec![],
            files_written: vec![PathBuf::from("models/users/users_gen.rs")],
        };
        let json = result.to_json().unwrap();
        assert!(json.contains("\"run_id\": \"abc\""));
        assert!(json.contains("users_gen.rs"));
    }
}
