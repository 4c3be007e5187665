//! Renderer contract and output layout.
//!
//! The engine does not own templates. A [`TableRenderer`] receives one
//! [`TemplateData`] per entity table and writes source text; [`OutputLayout`]
//! decides where that text lands on disk.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::core::schema::Table;
use crate::core::traits::Driver;
use crate::error::{GenError, Result};

/// Error type renderers return; wrapped into [`GenError::Render`] by the caller.
pub type RenderError = Box<dyn std::error::Error + Send + Sync>;

/// Dialect facts a renderer needs to emit SQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialectOptions {
    pub driver_name: String,
    pub use_last_insert_id: bool,
    pub use_top_clause: bool,
    pub left_quote: char,
    pub right_quote: char,
    pub index_placeholders: bool,
    pub placeholder_prefix: String,
}

impl DialectOptions {
    /// Capture the capability flags of a driver.
    pub fn from_driver<D: Driver + ?Sized>(driver: &D) -> Self {
        Self {
            driver_name: driver.name().to_string(),
            use_last_insert_id: driver.use_last_insert_id(),
            use_top_clause: driver.use_top_clause(),
            left_quote: driver.left_quote(),
            right_quote: driver.right_quote(),
            index_placeholders: driver.index_placeholders(),
            placeholder_prefix: driver.placeholder_prefix().to_string(),
        }
    }

    /// Quote an identifier for this dialect, doubling any embedded closing quote.
    pub fn quote(&self, ident: &str) -> String {
        let right = self.right_quote;
        let escaped = ident.replace(right, &format!("{}{}", right, right));
        format!("{}{}{}", self.left_quote, escaped, right)
    }

    /// Bind placeholder for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        if self.index_placeholders {
            format!("{}{}", self.placeholder_prefix, index)
        } else {
            "?".to_string()
        }
    }
}

/// Everything a renderer sees for one table.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateData<'a> {
    pub table: &'a Table,
    pub tables: &'a [Table],
    pub pkg_name: &'a str,
    pub schema: &'a str,
    pub dialect: &'a DialectOptions,
}

/// Renders the main source file for a table.
pub trait TableRenderer {
    fn render(&self, data: &TemplateData<'_>, out: &mut dyn Write) -> std::result::Result<(), RenderError>;

    /// File extension without the dot.
    fn extension(&self) -> &str {
        "rs"
    }
}

/// Renders the companion test file for a table.
pub trait TableTestRenderer {
    fn render(&self, data: &TemplateData<'_>, out: &mut dyn Write) -> std::result::Result<(), RenderError>;

    /// File extension without the dot.
    fn extension(&self) -> &str {
        "rs"
    }
}

/// Output directory layout: `<root>/<table>/<table>_gen.<ext>`.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory, removing it first when `wipe` is set.
    pub fn prepare(&self, wipe: bool) -> Result<()> {
        if wipe && self.root.exists() {
            info!("Wiping output folder {}", self.root.display());
            fs::remove_dir_all(&self.root).map_err(|e| GenError::output(&self.root, e))?;
        }
        fs::create_dir_all(&self.root).map_err(|e| GenError::output(&self.root, e))
    }

    /// Directory holding a table's files.
    pub fn table_dir(&self, table: &str) -> PathBuf {
        self.root.join(table)
    }

    /// Path of a table's main file.
    pub fn source_path(&self, table: &str, ext: &str) -> PathBuf {
        self.table_dir(table).join(format!("{}_gen.{}", table, ext))
    }

    /// Path of a table's test file.
    pub fn test_path(&self, table: &str, ext: &str) -> PathBuf {
        self.table_dir(table).join(format!("{}_test_gen.{}", table, ext))
    }

    /// Create a table's directory.
    pub fn create_table_dir(&self, table: &str) -> Result<PathBuf> {
        let dir = self.table_dir(table);
        fs::create_dir_all(&dir).map_err(|e| GenError::output(&dir, e))?;
        Ok(dir)
    }

    /// Write a new file by running `render` against it. Fails if the file already exists.
    pub fn write_new<F>(&self, path: &Path, table: &str, render: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Write) -> std::result::Result<(), RenderError>,
    {
        let file: File = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| GenError::output(path, e))?;

        let mut writer = BufWriter::new(file);
        render(&mut writer).map_err(|e| GenError::render(table, e))?;
        writer.flush().map_err(|e| GenError::output(path, e))?;

        debug!("Wrote {}", path.display());
        Ok(())
    }
}
