//! Schema assembly: drive a [`Driver`] to build a validated [`SchemaGraph`].

use tracing::{debug, info};

use crate::core::schema::{SchemaGraph, Table};
use crate::core::traits::{Driver, TableFilter};
use crate::error::{GenError, Result};

/// Builds the schema graph for one schema through an opened driver.
///
/// Holds no state between calls; every `assemble` issues a fresh set of
/// queries.
#[derive(Debug, Clone)]
pub struct SchemaAssembler {
    schema: String,
    filter: TableFilter,
}

impl SchemaAssembler {
    pub fn new(schema: impl Into<String>, filter: TableFilter) -> Self {
        Self {
            schema: schema.into(),
            filter,
        }
    }

    /// Introspect every selected table and validate the result.
    ///
    /// # Errors
    ///
    /// - [`GenError::Schema`] when no tables are found
    /// - [`GenError::MissingPrimaryKeys`] naming every table without a key
    /// - any error the driver reports, unchanged
    pub async fn assemble<D: Driver + ?Sized>(&self, driver: &mut D) -> Result<SchemaGraph> {
        let names = driver.table_names(&self.schema, &self.filter).await?;
        if names.is_empty() {
            return Err(GenError::Schema("no tables found in database".into()));
        }

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let columns = driver.columns(&self.schema, &name).await?;
            let primary_key = driver.primary_key_info(&self.schema, &name).await?;
            let foreign_keys = driver.foreign_key_info(&self.schema, &name).await?;

            let table = Table::new(name, columns, primary_key, foreign_keys);
            debug!(
                "Introspected {}.{}: {} columns, pk={}, {} foreign keys{}",
                self.schema,
                table.name,
                table.columns.len(),
                table.has_pk(),
                table.foreign_keys.len(),
                if table.is_join_table { ", join table" } else { "" }
            );
            tables.push(table);
        }

        check_primary_keys(&tables)?;

        let graph = SchemaGraph::new(tables)?;
        info!(
            "Assembled {} tables from schema '{}' ({} join tables)",
            graph.len(),
            self.schema,
            graph.tables().iter().filter(|t| t.is_join_table).count()
        );
        Ok(graph)
    }
}

/// Fail with every table that lacks a primary key, in input order.
pub fn check_primary_keys(tables: &[Table]) -> Result<()> {
    let missing: Vec<String> = tables
        .iter()
        .filter(|t| !t.has_pk())
        .map(|t| t.name.clone())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(GenError::MissingPrimaryKeys(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::mock::{fixture_tables, MockCalls, MockDriver, MockTable, MOCK_SCHEMA};
    use crate::typemap::{RawColumn, TypeMapOptions};

    async fn opened(driver: MockDriver) -> MockDriver {
        let mut driver = driver;
        driver.open().await.unwrap();
        driver
    }

    #[tokio::test]
    async fn test_assemble_fixture() {
        let mut driver = opened(MockDriver::with_fixture(TypeMapOptions::default())).await;
        let graph = SchemaAssembler::new(MOCK_SCHEMA, TableFilter::All)
            .assemble(&mut driver)
            .await
            .unwrap();

        let names: Vec<_> = graph.tables().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["posts", "roles", "user_roles", "users"]);
        assert!(graph.get("user_roles").unwrap().is_join_table);
        assert!(!graph.get("posts").unwrap().is_join_table);
        assert!(graph.tables().iter().all(|t| t.has_pk()));
    }

    #[tokio::test]
    async fn test_zero_tables_is_schema_error() {
        let mut driver = opened(MockDriver::new(vec![], TypeMapOptions::default())).await;
        let calls = driver.calls();
        let err = SchemaAssembler::new(MOCK_SCHEMA, TableFilter::All)
            .assemble(&mut driver)
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::Schema(_)));
        assert_eq!(MockCalls::get(&calls.columns), 0);
    }

    #[tokio::test]
    async fn test_missing_primary_key_names_exactly_offenders() {
        let mut tables = fixture_tables();
        tables.retain(|t| t.name != "user_roles");
        tables.push(MockTable::new("audit_log").column(RawColumn::new("message", "text")));
        let mut driver = opened(MockDriver::new(tables, TypeMapOptions::default())).await;

        let err = SchemaAssembler::new(MOCK_SCHEMA, TableFilter::All)
            .assemble(&mut driver)
            .await
            .unwrap_err();
        match err {
            GenError::MissingPrimaryKeys(names) => assert_eq!(names, vec!["audit_log"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_all_offenders_reported_in_order() {
        let tables = vec![
            MockTable::new("b_sessions").column(RawColumn::new("token", "varchar")),
            MockTable::new("a_events").column(RawColumn::new("payload", "json")),
            MockTable::new("c_users")
                .column(RawColumn::new("id", "int"))
                .primary_key(&["id"]),
        ];
        let mut driver = opened(MockDriver::new(tables, TypeMapOptions::default())).await;
        let err = SchemaAssembler::new(MOCK_SCHEMA, TableFilter::All)
            .assemble(&mut driver)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "primary key missing in tables (a_events, b_sessions)"
        );
    }

    #[tokio::test]
    async fn test_include_filter_limits_queries() {
        let mut driver = opened(MockDriver::with_fixture(TypeMapOptions::default())).await;
        let calls = driver.calls();
        let filter = TableFilter::new(&["users".to_string(), "nope".to_string()], &[]);
        let graph = SchemaAssembler::new(MOCK_SCHEMA, filter)
            .assemble(&mut driver)
            .await
            .unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(MockCalls::get(&calls.columns), 1);
        assert_eq!(MockCalls::get(&calls.foreign_key_info), 1);
    }

    #[tokio::test]
    async fn test_exclude_filter() {
        let mut driver = opened(MockDriver::with_fixture(TypeMapOptions::default())).await;
        let filter = TableFilter::new(&[], &["posts".to_string()]);
        let graph = SchemaAssembler::new(MOCK_SCHEMA, filter)
            .assemble(&mut driver)
            .await
            .unwrap();
        let names: Vec<_> = graph.tables().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["roles", "user_roles", "users"]);
    }

    #[tokio::test]
    async fn test_query_error_propagates() {
        let mut driver = opened(
            MockDriver::with_fixture(TypeMapOptions::default()).fail_queries_for("roles"),
        )
        .await;
        let err = SchemaAssembler::new(MOCK_SCHEMA, TableFilter::All)
            .assemble(&mut driver)
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::Query { .. }));
    }

    #[test]
    fn test_check_primary_keys_empty_ok() {
        assert!(check_primary_keys(&[]).is_ok());
    }
}
