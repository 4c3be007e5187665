//! sqlgen CLI - database schema introspection for code generation.

mod renderer;

use clap::{Parser, Subcommand};
use renderer::{RustStructRenderer, RustTestRenderer};
use sqlgen::{Config, GenError, Orchestrator};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "sqlgen")]
#[command(about = "Introspect a database schema and generate typed models")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "sqlgen.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Introspect the schema and render one model per entity table
    Generate {
        /// Override the schema to introspect
        #[arg(long)]
        schema: Option<String>,

        /// Override the output folder
        #[arg(long)]
        out_folder: Option<PathBuf>,

        /// Override the package name handed to the renderer
        #[arg(long)]
        pkg_name: Option<String>,

        /// Only generate these tables (repeatable)
        #[arg(long = "include")]
        include: Vec<String>,

        /// Skip these tables (repeatable)
        #[arg(long = "exclude")]
        exclude: Vec<String>,

        /// Map MySQL tinyint(1) columns to bool
        #[arg(long)]
        tinyint_as_bool: bool,

        /// Do not write test files
        #[arg(long)]
        no_tests: bool,

        /// Remove the output folder before generating
        #[arg(long)]
        wipe: bool,

        /// Print the introspected tables as JSON before rendering
        #[arg(long)]
        debug: bool,
    },

    /// List introspected tables without rendering
    Tables {
        /// Override the schema to introspect
        #[arg(long)]
        schema: Option<String>,
    },

    /// Test the database connection
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), GenError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Generate {
            schema,
            out_folder,
            pkg_name,
            include,
            exclude,
            tinyint_as_bool,
            no_tests,
            wipe,
            debug,
        } => {
            let generation = &mut config.generation;
            if schema.is_some() {
                generation.schema = schema;
            }
            if let Some(folder) = out_folder {
                generation.out_folder = folder;
            }
            if let Some(name) = pkg_name {
                generation.pkg_name = name;
            }
            if !include.is_empty() {
                generation.include_tables = include;
            }
            if !exclude.is_empty() {
                generation.exclude_tables = exclude;
            }
            generation.tinyint_as_bool |= tinyint_as_bool;
            generation.no_tests |= no_tests;
            generation.wipe |= wipe;
            generation.debug |= debug;
            config.validate()?;

            let mut orchestrator = Orchestrator::new(config, Box::new(RustStructRenderer))?
                .with_test_renderer(Box::new(RustTestRenderer));
            let result = orchestrator.run().await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                println!("\nGeneration completed!");
                println!("  Run ID: {}", result.run_id);
                println!("  Driver: {} (schema {})", result.driver, result.schema);
                println!("  Duration: {:.2}s", result.duration_seconds);
                println!(
                    "  Tables: {}/{}",
                    result.tables_rendered, result.tables_total
                );
                if !result.join_tables_skipped.is_empty() {
                    println!("  Join tables skipped: {:?}", result.join_tables_skipped);
                }
                println!("  Files written: {}", result.files_written.len());
            }
        }

        Commands::Tables { schema } => {
            if schema.is_some() {
                config.generation.schema = schema;
            }

            let mut orchestrator = Orchestrator::new(config, Box::new(RustStructRenderer))?;
            let graph = orchestrator.introspect().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(graph.tables())?);
            } else {
                for table in graph.tables() {
                    println!("{}", renderer::describe(table));
                }
            }
        }

        Commands::HealthCheck => {
            let mut orchestrator = Orchestrator::new(config, Box::new(RustStructRenderer))?;
            let result = orchestrator.health_check().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  {}: {} ({}ms)",
                    result.driver,
                    if result.healthy { "OK" } else { "FAILED" },
                    result.latency_ms
                );
                if let Some(ref err) = result.error {
                    println!("    Error: {}", err);
                }
            }

            if !result.healthy {
                return Err(GenError::connection(
                    result.driver,
                    result.error.unwrap_or_else(|| "health check failed".to_string()),
                ));
            }
        }
    }

    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so --output-json and --debug keep stdout parseable.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
