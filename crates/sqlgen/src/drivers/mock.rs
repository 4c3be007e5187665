//! In-memory driver for tests and dry runs.
//!
//! Serves a fixed catalog of raw tables through the [`Driver`] contract,
//! translating columns with the MySQL rules. Open failures and per-table
//! query failures can be injected, and every call is counted.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::core::schema::{Column, ForeignKey, PrimaryKey};
use crate::core::traits::{Driver, TableFilter};
use crate::error::{GenError, Result};
use crate::typemap::{ColumnTranslator, MysqlTypes, RawColumn, TypeMapOptions};

/// Schema name the mock catalog lives in.
pub const MOCK_SCHEMA: &str = "main";

/// One table of the mock catalog.
#[derive(Debug, Clone)]
pub struct MockTable {
    pub name: String,
    pub columns: Vec<RawColumn>,
    pub primary_key: Option<PrimaryKey>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl MockTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
            foreign_keys: Vec::new(),
        }
    }

    pub fn column(mut self, column: RawColumn) -> Self {
        self.columns.push(column);
        self
    }

    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = Some(PrimaryKey {
            name: format!("{}_pkey", self.name),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    pub fn foreign_key(mut self, column: &str, foreign_table: &str, foreign_column: &str) -> Self {
        self.foreign_keys.push(ForeignKey {
            name: format!("{}_{}_fkey", self.name, column),
            table: self.name.clone(),
            column: column.to_string(),
            foreign_table: foreign_table.to_string(),
            foreign_column: foreign_column.to_string(),
        });
        self
    }
}

/// Counts of driver calls, shared with the test that built the driver.
#[derive(Debug, Default)]
pub struct MockCalls {
    pub open: AtomicUsize,
    pub close: AtomicUsize,
    pub table_names: AtomicUsize,
    pub columns: AtomicUsize,
    pub primary_key_info: AtomicUsize,
    pub foreign_key_info: AtomicUsize,
}

impl MockCalls {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// In-memory [`Driver`].
pub struct MockDriver {
    tables: Vec<MockTable>,
    type_opts: TypeMapOptions,
    fail_open: Option<String>,
    failing_tables: HashSet<String>,
    calls: Arc<MockCalls>,
    open: bool,
}

impl MockDriver {
    /// Driver over an explicit catalog. Tables are served sorted by name.
    pub fn new(mut tables: Vec<MockTable>, type_opts: TypeMapOptions) -> Self {
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            tables,
            type_opts,
            fail_open: None,
            failing_tables: HashSet::new(),
            calls: Arc::new(MockCalls::default()),
            open: false,
        }
    }

    /// Driver over the built-in users/roles/user_roles/posts catalog.
    pub fn with_fixture(type_opts: TypeMapOptions) -> Self {
        Self::new(fixture_tables(), type_opts)
    }

    /// Make `open` fail with a connection error.
    pub fn fail_open(mut self, message: impl Into<String>) -> Self {
        self.fail_open = Some(message.into());
        self
    }

    /// Make every metadata query for `table` fail with a query error.
    pub fn fail_queries_for(mut self, table: impl Into<String>) -> Self {
        self.failing_tables.insert(table.into());
        self
    }

    /// Shared call counters.
    pub fn calls(&self) -> Arc<MockCalls> {
        Arc::clone(&self.calls)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(GenError::connection("mock", "driver is not open"))
        }
    }

    fn table(&self, schema: &str, table: &str, operation: &str) -> Result<Option<&MockTable>> {
        self.ensure_open()?;
        if self.failing_tables.contains(table) {
            return Err(GenError::query(
                format!("injected failure for table {}", table),
                format!("{} for {}.{}", operation, schema, table),
            ));
        }
        if schema != MOCK_SCHEMA {
            return Ok(None);
        }
        Ok(self.tables.iter().find(|t| t.name == table))
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn open(&mut self) -> Result<()> {
        MockCalls::bump(&self.calls.open);
        if let Some(message) = &self.fail_open {
            return Err(GenError::connection("mock", message));
        }
        self.open = true;
        debug!("Opened mock driver with {} tables", self.tables.len());
        Ok(())
    }

    async fn close(&mut self) {
        MockCalls::bump(&self.calls.close);
        self.open = false;
    }

    async fn table_names(&mut self, schema: &str, filter: &TableFilter) -> Result<Vec<String>> {
        MockCalls::bump(&self.calls.table_names);
        self.ensure_open()?;
        if schema != MOCK_SCHEMA {
            return Ok(Vec::new());
        }
        let names = self.tables.iter().map(|t| t.name.clone()).collect();
        Ok(filter.apply(names))
    }

    async fn columns(&mut self, schema: &str, table: &str) -> Result<Vec<Column>> {
        MockCalls::bump(&self.calls.columns);
        let opts = self.type_opts;
        Ok(self
            .table(schema, table, "loading mock columns")?
            .map(|t| {
                t.columns
                    .iter()
                    .cloned()
                    .map(|raw| MysqlTypes.translate(raw, &opts))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn primary_key_info(&mut self, schema: &str, table: &str) -> Result<Option<PrimaryKey>> {
        MockCalls::bump(&self.calls.primary_key_info);
        Ok(self
            .table(schema, table, "loading mock primary key")?
            .and_then(|t| t.primary_key.clone()))
    }

    async fn foreign_key_info(&mut self, schema: &str, table: &str) -> Result<Vec<ForeignKey>> {
        MockCalls::bump(&self.calls.foreign_key_info);
        Ok(self
            .table(schema, table, "loading mock foreign keys")?
            .map(|t| t.foreign_keys.clone())
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn use_last_insert_id(&self) -> bool {
        true
    }

    fn use_top_clause(&self) -> bool {
        false
    }

    fn left_quote(&self) -> char {
        '`'
    }

    fn right_quote(&self) -> char {
        '`'
    }

    fn index_placeholders(&self) -> bool {
        false
    }
}

/// Built-in catalog: two entity tables linked many-to-many, plus posts.
pub fn fixture_tables() -> Vec<MockTable> {
    vec![
        MockTable::new("users")
            .column(
                RawColumn::new("id", "int")
                    .full_type("int(10) unsigned")
                    .unsigned()
                    .unique()
                    .default_value("auto_increment"),
            )
            .column(RawColumn::new("email", "varchar").full_type("varchar(255)").unique())
            .column(
                RawColumn::new("name", "varchar")
                    .full_type("varchar(100)")
                    .nullable(),
            )
            .column(
                RawColumn::new("active", "tinyint")
                    .full_type("tinyint(1)")
                    .default_value("1"),
            )
            .column(RawColumn::new("created_at", "datetime").default_value("CURRENT_TIMESTAMP"))
            .primary_key(&["id"]),
        MockTable::new("roles")
            .column(
                RawColumn::new("id", "int")
                    .full_type("int(11)")
                    .unique()
                    .default_value("auto_increment"),
            )
            .column(RawColumn::new("name", "varchar").full_type("varchar(50)").unique())
            .primary_key(&["id"]),
        MockTable::new("user_roles")
            .column(
                RawColumn::new("user_id", "int")
                    .full_type("int(10) unsigned")
                    .unsigned(),
            )
            .column(RawColumn::new("role_id", "int").full_type("int(11)"))
            .primary_key(&["user_id", "role_id"])
            .foreign_key("user_id", "users", "id")
            .foreign_key("role_id", "roles", "id"),
        MockTable::new("posts")
            .column(
                RawColumn::new("id", "bigint")
                    .full_type("bigint(20)")
                    .unique()
                    .default_value("auto_increment"),
            )
            .column(
                RawColumn::new("author_id", "int")
                    .full_type("int(10) unsigned")
                    .unsigned(),
            )
            .column(RawColumn::new("title", "varchar").full_type("varchar(200)"))
            .column(RawColumn::new("body", "text").nullable())
            .column(RawColumn::new("metadata", "json").nullable())
            .column(RawColumn::new("score", "double").nullable().default_value("NULL"))
            .primary_key(&["id"])
            .foreign_key("author_id", "users", "id"),
    ]
}
