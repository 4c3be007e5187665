//! Error types for the introspection engine.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for introspection and generation runs.
#[derive(Error, Debug)]
pub enum GenError {
    /// Configuration error (invalid YAML, unknown dialect, missing renderer, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The driver could not reach or authenticate to the database
    #[error("Connection error ({dialect}): {message}")]
    Connection { dialect: String, message: String },

    /// A metadata query failed at the database layer
    #[error("Query failed while {operation}: {message}")]
    Query { operation: String, message: String },

    /// The schema could not be assembled (e.g. no tables found)
    #[error("Schema error: {0}")]
    Schema(String),

    /// One or more tables lack a primary key
    #[error("primary key missing in tables ({})", .0.join(", "))]
    MissingPrimaryKeys(Vec<String>),

    /// The rendering collaborator failed for a table
    #[error("Render failed for table {table}: {message}")]
    Render { table: String, message: String },

    /// Output directory or file could not be created
    #[error("Output error at {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenError {
    /// Create a Connection error for a dialect.
    pub fn connection(dialect: impl Into<String>, message: impl ToString) -> Self {
        GenError::Connection {
            dialect: dialect.into(),
            message: message.to_string(),
        }
    }

    /// Create a Query error describing the operation that failed.
    pub fn query(message: impl ToString, operation: impl Into<String>) -> Self {
        GenError::Query {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Create a Render error for a table.
    pub fn render(table: impl Into<String>, message: impl ToString) -> Self {
        GenError::Render {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create an Output error for a path.
    pub fn output(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GenError::Output {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this error kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            GenError::Config(_) | GenError::Yaml(_) => 2,
            GenError::Connection { .. } => 3,
            GenError::Query { .. } => 4,
            GenError::Schema(_) | GenError::MissingPrimaryKeys(_) => 5,
            GenError::Render { .. } => 6,
            GenError::Output { .. } | GenError::Io(_) | GenError::Json(_) => 7,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for introspection operations.
pub type Result<T> = std::result::Result<T, GenError>;
