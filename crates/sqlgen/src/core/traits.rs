//! Core traits for database-agnostic schema introspection.
//!
//! This module defines the contract every dialect driver implements:
//!
//! - [`Driver`]: Metadata queries plus the dialect's capability flags
//! - [`TableFilter`]: Include/exclude selection applied by `table_names`
//!
//! # Design Patterns
//!
//! - **Strategy**: Each driver supplies its own catalog queries and quoting rules
//! - **Template Method**: [`TableFilter::apply`] gives every driver the same filtering semantics

use async_trait::async_trait;

use crate::error::Result;

use super::schema::{Column, ForeignKey, PrimaryKey};

/// Table selection derived from include and exclude lists.
///
/// A non-empty include list wins over the exclude list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TableFilter {
    /// Every base table.
    #[default]
    All,
    /// Only these names, when they exist.
    Include(Vec<String>),
    /// Every base table except these names.
    Exclude(Vec<String>),
}

impl TableFilter {
    /// Build a filter from the raw lists.
    pub fn new(include: &[String], exclude: &[String]) -> Self {
        if !include.is_empty() {
            TableFilter::Include(include.to_vec())
        } else if !exclude.is_empty() {
            TableFilter::Exclude(exclude.to_vec())
        } else {
            TableFilter::All
        }
    }

    /// Check whether a table name passes the filter.
    ///
    /// Names compare exactly as the catalog reports them, for every dialect,
    /// regardless of the server's collation.
    pub fn matches(&self, table: &str) -> bool {
        match self {
            TableFilter::All => true,
            TableFilter::Include(names) => names.iter().any(|n| n == table),
            TableFilter::Exclude(names) => !names.iter().any(|n| n == table),
        }
    }

    /// Filter a name-ordered list of actual tables.
    ///
    /// Drivers list every base table, then call this so all dialects share
    /// one interpretation of the lists.
    pub fn apply(&self, tables: Vec<String>) -> Vec<String> {
        tables.into_iter().filter(|t| self.matches(t)).collect()
    }
}

/// Introspect one database through a single owned connection.
///
/// Calls are issued strictly one after another. `open` must succeed before
/// any metadata method; `close` is always safe.
#[async_trait]
pub trait Driver: Send {
    /// Acquire the connection.
    async fn open(&mut self) -> Result<()>;

    /// Release the connection. Safe to call when `open` failed or never ran.
    async fn close(&mut self);

    /// Base table names in `schema`, ordered by name, after `filter`.
    async fn table_names(&mut self, schema: &str, filter: &TableFilter) -> Result<Vec<String>>;

    /// Translated columns of a table in dialect order.
    async fn columns(&mut self, schema: &str, table: &str) -> Result<Vec<Column>>;

    /// Primary key of a table, `None` when it has none.
    async fn primary_key_info(&mut self, schema: &str, table: &str) -> Result<Option<PrimaryKey>>;

    /// Foreign keys owned by a table that reference tables in the same schema.
    async fn foreign_key_info(&mut self, schema: &str, table: &str) -> Result<Vec<ForeignKey>>;

    /// Driver name (e.g., "mysql", "postgres").
    fn name(&self) -> &str;

    /// Whether generated inserts read back the id with LAST_INSERT_ID-style calls.
    fn use_last_insert_id(&self) -> bool;

    /// Whether row limits are written as `TOP n` instead of `LIMIT n`.
    fn use_top_clause(&self) -> bool;

    /// Identifier opening quote.
    fn left_quote(&self) -> char;

    /// Identifier closing quote.
    fn right_quote(&self) -> char;

    /// Whether bind placeholders are numbered (`$1`, `@p1`) instead of `?`.
    fn index_placeholders(&self) -> bool;

    /// Prefix of numbered placeholders; ignored unless `index_placeholders`.
    fn placeholder_prefix(&self) -> &str {
        "$"
    }

    /// Quote an identifier with this dialect's quote characters.
    fn quote_ident(&self, name: &str) -> String {
        let right = self.right_quote();
        let escaped = name.replace(right, &format!("{}{}", right, right));
        format!("{}{}{}", self.left_quote(), escaped, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filter_include_wins() {
        let filter = TableFilter::new(&names(&["users"]), &names(&["users", "roles"]));
        assert_eq!(filter, TableFilter::Include(names(&["users"])));
    }

    #[test]
    fn test_filter_include_keeps_existing_only() {
        let filter = TableFilter::new(&names(&["users", "ghosts"]), &[]);
        let result = filter.apply(names(&["posts", "roles", "users"]));
        assert_eq!(result, names(&["users"]));
    }

    #[test]
    fn test_filter_exclude_removes_names() {
        let filter = TableFilter::new(&[], &names(&["roles"]));
        let result = filter.apply(names(&["posts", "roles", "users"]));
        assert_eq!(result, names(&["posts", "users"]));
    }

    #[test]
    fn test_filter_is_case_sensitive() {
        let filter = TableFilter::new(&names(&["Users"]), &[]);
        assert_eq!(filter.apply(names(&["roles", "users"])), Vec::<String>::new());
        assert_eq!(filter.apply(names(&["Users"])), names(&["Users"]));
    }

    #[test]
    fn test_filter_all_by_default() {
        let filter = TableFilter::new(&[], &[]);
        assert_eq!(filter, TableFilter::All);
        assert_eq!(filter.apply(names(&["a", "b"])), names(&["a", "b"]));
    }
}
