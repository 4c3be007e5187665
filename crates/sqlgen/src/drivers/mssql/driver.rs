//! SQL Server catalog queries over the `sys` views.

use async_trait::async_trait;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, Query, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info, warn};

use crate::config::{DriverConfig, DriverKind};
use crate::core::schema::{Column, ForeignKey, PrimaryKey};
use crate::core::traits::{Driver, TableFilter};
use crate::drivers::common::SslMode;
use crate::error::{GenError, Result};
use crate::typemap::{ColumnTranslator, MssqlTypes, RawColumn, TypeMapOptions};

const TABLES_QUERY: &str = r#"
    SELECT t.TABLE_NAME AS table_name
    FROM INFORMATION_SCHEMA.TABLES t
    WHERE t.TABLE_TYPE = 'BASE TABLE'
      AND t.TABLE_SCHEMA = @P1
    ORDER BY t.TABLE_NAME
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT
        c.name AS column_name,
        ty.name AS data_type,
        CASE
            WHEN ty.name IN ('varchar', 'char', 'varbinary', 'binary') THEN
                ty.name + '(' + CASE WHEN c.max_length = -1 THEN 'max'
                    ELSE CAST(c.max_length AS varchar(10)) END + ')'
            WHEN ty.name IN ('nvarchar', 'nchar') THEN
                ty.name + '(' + CASE WHEN c.max_length = -1 THEN 'max'
                    ELSE CAST(c.max_length / 2 AS varchar(10)) END + ')'
            WHEN ty.name IN ('decimal', 'numeric') THEN
                ty.name + '(' + CAST(c.precision AS varchar(10)) + ','
                    + CAST(c.scale AS varchar(10)) + ')'
            WHEN ty.name = 'float' THEN 'float(' + CAST(c.precision AS varchar(10)) + ')'
            ELSE ty.name
        END AS full_type,
        OBJECT_DEFINITION(c.default_object_id) AS column_default,
        c.is_nullable,
        c.is_identity,
        CAST(CASE WHEN EXISTS (
            SELECT 1
            FROM sys.indexes i
            JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id
            WHERE i.object_id = c.object_id
              AND ic.column_id = c.column_id
              AND (i.is_primary_key = 1 OR i.is_unique_constraint = 1)
              AND (
                  SELECT COUNT(*)
                  FROM sys.index_columns ic2
                  WHERE ic2.object_id = i.object_id
                    AND ic2.index_id = i.index_id
                    AND ic2.is_included_column = 0
              ) = 1
        ) THEN 1 ELSE 0 END AS bit) AS is_unique
    FROM sys.columns c
    JOIN sys.types ty ON ty.user_type_id = c.user_type_id
    JOIN sys.tables tb ON tb.object_id = c.object_id
    JOIN sys.schemas s ON s.schema_id = tb.schema_id
    WHERE s.name = @P1 AND tb.name = @P2
    ORDER BY c.column_id
"#;

const PRIMARY_KEY_QUERY: &str = r#"
    SELECT kc.name AS constraint_name, c.name AS column_name
    FROM sys.key_constraints kc
    JOIN sys.tables tb ON tb.object_id = kc.parent_object_id
    JOIN sys.schemas s ON s.schema_id = tb.schema_id
    JOIN sys.index_columns ic
        ON ic.object_id = kc.parent_object_id AND ic.index_id = kc.unique_index_id
    JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id
    WHERE kc.type = 'PK' AND s.name = @P1 AND tb.name = @P2
    ORDER BY ic.key_ordinal
"#;

const FOREIGN_KEYS_QUERY: &str = r#"
    SELECT
        fk.name AS constraint_name,
        pc.name AS column_name,
        rt.name AS foreign_table,
        rc.name AS foreign_column
    FROM sys.foreign_keys fk
    JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id
    JOIN sys.tables pt ON pt.object_id = fk.parent_object_id
    JOIN sys.schemas ps ON ps.schema_id = pt.schema_id
    JOIN sys.columns pc
        ON pc.object_id = fkc.parent_object_id AND pc.column_id = fkc.parent_column_id
    JOIN sys.tables rt ON rt.object_id = fk.referenced_object_id
    JOIN sys.columns rc
        ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id
    WHERE ps.name = @P1 AND pt.name = @P2 AND rt.schema_id = pt.schema_id
    ORDER BY fk.name, fkc.constraint_column_id
"#;

/// SQL Server driver holding one Tiberius client.
pub struct MssqlDriver {
    config: DriverConfig,
    type_opts: TypeMapOptions,
    client: Option<Client<Compat<TcpStream>>>,
}

impl MssqlDriver {
    pub fn new(config: DriverConfig, type_opts: TypeMapOptions) -> Self {
        Self {
            config,
            type_opts,
            client: None,
        }
    }

    fn build_config(&self, ssl_mode: SslMode) -> Config {
        let mut config = Config::new();
        config.host(&self.config.host);
        config.port(self.config.effective_port(DriverKind::Mssql));
        config.database(&self.config.database);
        config.authentication(AuthMethod::sql_server(
            &self.config.user,
            &self.config.password,
        ));

        let (level, trust) = encryption_for(ssl_mode);
        if trust {
            warn!(
                "ssl_mode={:?} trusts any SQL Server certificate; use verify-full \
                 for untrusted networks",
                ssl_mode
            );
            config.trust_cert();
        }
        config.encryption(level);
        config
    }

    async fn fetch(
        &mut self,
        sql: &'static str,
        schema: &str,
        table: Option<&str>,
        operation: &str,
    ) -> Result<Vec<Row>> {
        let client = self
            .client
            .as_mut()
            .ok_or_else(|| GenError::connection("mssql", "driver is not open"))?;

        let mut query = Query::new(sql);
        query.bind(schema.to_string());
        if let Some(table) = table {
            query.bind(table.to_string());
        }

        let stream = query
            .query(client)
            .await
            .map_err(|e| GenError::query(e, operation))?;
        stream
            .into_first_result()
            .await
            .map_err(|e| GenError::query(e, operation))
    }
}

/// Tiberius encryption level and whether to skip certificate checks.
fn encryption_for(mode: SslMode) -> (EncryptionLevel, bool) {
    match mode {
        SslMode::Disable => (EncryptionLevel::NotSupported, false),
        SslMode::Prefer => (EncryptionLevel::Off, true),
        SslMode::Require => (EncryptionLevel::Required, true),
        SslMode::VerifyCa | SslMode::VerifyFull => (EncryptionLevel::Required, false),
    }
}

/// Strip the parentheses SQL Server wraps around default definitions: "((0))" -> "0".
fn strip_default_parens(definition: &str) -> &str {
    let mut s = definition.trim();
    while s.len() >= 2 && s.starts_with('(') && s.ends_with(')') && wraps_whole(s) {
        s = s[1..s.len() - 1].trim();
    }
    s
}

/// Whether the opening parenthesis at index 0 closes at the last character.
fn wraps_whole(s: &str) -> bool {
    let mut depth = 0usize;
    for (i, ch) in s.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i == s.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

fn text(row: &Row, col: &str) -> std::result::Result<String, tiberius::error::Error> {
    Ok(row.try_get::<&str, _>(col)?.unwrap_or_default().to_string())
}

fn flag(row: &Row, col: &str) -> std::result::Result<bool, tiberius::error::Error> {
    Ok(row.try_get::<bool, _>(col)?.unwrap_or(false))
}

/// SQL Server has no signed tinyint.
fn is_unsigned_type(db_type: &str) -> bool {
    db_type.eq_ignore_ascii_case("tinyint")
}

fn raw_column(row: &Row) -> std::result::Result<RawColumn, tiberius::error::Error> {
    let default = row
        .try_get::<&str, _>("column_default")?
        .map(|d| strip_default_parens(d).to_string());
    let db_type = text(row, "data_type")?;

    Ok(RawColumn {
        name: text(row, "column_name")?,
        unsigned: is_unsigned_type(&db_type),
        db_type,
        full_db_type: text(row, "full_type")?,
        nullable: flag(row, "is_nullable")?,
        unique: flag(row, "is_unique")?,
        // Identity columns are generated values, never a default.
        default: if flag(row, "is_identity")? { None } else { default },
    })
}

#[async_trait]
impl Driver for MssqlDriver {
    async fn open(&mut self) -> Result<()> {
        let ssl_mode = SslMode::parse(&self.config.ssl_mode)?;
        let config = self.build_config(ssl_mode);

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| GenError::connection("mssql", e))?;
        tcp.set_nodelay(true).ok();

        let mut client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| GenError::connection("mssql", e))?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| GenError::connection("mssql", e))?
            .into_row()
            .await
            .map_err(|e| GenError::connection("mssql", e))?;

        info!(
            "Connected to SQL Server: {}:{}/{}",
            self.config.host,
            self.config.effective_port(DriverKind::Mssql),
            self.config.database
        );
        self.client = Some(client);
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(client) = self.client.take() {
            if let Err(e) = client.close().await {
                debug!("Error closing SQL Server connection: {}", e);
            }
        }
    }

    async fn table_names(&mut self, schema: &str, filter: &TableFilter) -> Result<Vec<String>> {
        let operation = format!("listing SQL Server tables in schema {}", schema);
        let rows = self.fetch(TABLES_QUERY, schema, None, &operation).await?;

        let names = rows
            .iter()
            .map(|row| text(row, "table_name"))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| GenError::query(e, &operation))?;

        Ok(filter.apply(names))
    }

    async fn columns(&mut self, schema: &str, table: &str) -> Result<Vec<Column>> {
        let operation = format!("loading SQL Server columns for {}.{}", schema, table);
        let rows = self
            .fetch(COLUMNS_QUERY, schema, Some(table), &operation)
            .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw = raw_column(row).map_err(|e| GenError::query(e, &operation))?;
            columns.push(MssqlTypes.translate(raw, &self.type_opts));
        }

        debug!("Loaded {} columns for {}.{}", columns.len(), schema, table);
        Ok(columns)
    }

    async fn primary_key_info(&mut self, schema: &str, table: &str) -> Result<Option<PrimaryKey>> {
        let operation = format!("loading SQL Server primary key for {}.{}", schema, table);
        let rows = self
            .fetch(PRIMARY_KEY_QUERY, schema, Some(table), &operation)
            .await?;

        let mut pk: Option<PrimaryKey> = None;
        for row in &rows {
            let name = text(row, "constraint_name").map_err(|e| GenError::query(e, &operation))?;
            let column = text(row, "column_name").map_err(|e| GenError::query(e, &operation))?;
            pk.get_or_insert_with(|| PrimaryKey {
                name,
                columns: Vec::new(),
            })
            .columns
            .push(column);
        }

        Ok(pk)
    }

    async fn foreign_key_info(&mut self, schema: &str, table: &str) -> Result<Vec<ForeignKey>> {
        let operation = format!("loading SQL Server foreign keys for {}.{}", schema, table);
        let rows = self
            .fetch(FOREIGN_KEYS_QUERY, schema, Some(table), &operation)
            .await?;

        let fks = rows
            .iter()
            .map(|row| -> std::result::Result<ForeignKey, tiberius::error::Error> {
                Ok(ForeignKey {
                    name: text(row, "constraint_name")?,
                    table: table.to_string(),
                    column: text(row, "column_name")?,
                    foreign_table: text(row, "foreign_table")?,
                    foreign_column: text(row, "foreign_column")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| GenError::query(e, &operation))?;

        debug!("Loaded {} foreign keys for {}.{}", fks.len(), schema, table);
        Ok(fks)
    }

    fn name(&self) -> &str {
        "mssql"
    }

    fn use_last_insert_id(&self) -> bool {
        false
    }

    fn use_top_clause(&self) -> bool {
        true
    }

    fn left_quote(&self) -> char {
        '['
    }

    fn right_quote(&self) -> char {
        ']'
    }

    fn index_placeholders(&self) -> bool {
        true
    }

    fn placeholder_prefix(&self) -> &str {
        "@p"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> DriverConfig {
        DriverConfig {
            r#type: "mssql".to_string(),
            host: "localhost".to_string(),
            port: 0,
            database: "app".to_string(),
            user: "sa".to_string(),
            password: "secret".to_string(),
            ssl_mode: "require".to_string(),
        }
    }

    #[test]
    fn test_capabilities() {
        let driver = MssqlDriver::new(test_config(), TypeMapOptions::default());
        assert_eq!(driver.name(), "mssql");
        assert!(driver.use_top_clause());
        assert!(!driver.use_last_insert_id());
        assert!(driver.index_placeholders());
        assert_eq!(driver.quote_ident("order"), "[order]");
        assert_eq!(driver.quote_ident("a]b"), "[a]]b]");
        assert_eq!(driver.placeholder_prefix(), "@p");
    }

    #[test]
    fn test_tinyint_reported_unsigned() {
        assert!(is_unsigned_type("tinyint"));
        assert!(is_unsigned_type("TINYINT"));
        assert!(!is_unsigned_type("smallint"));
        assert!(!is_unsigned_type("int"));
    }

    #[test]
    fn test_default_port_used_when_unset() {
        let driver = MssqlDriver::new(test_config(), TypeMapOptions::default());
        let config = driver.build_config(SslMode::Disable);
        assert_eq!(config.get_addr(), "localhost:1433");
    }

    #[test]
    fn test_encryption_mapping() {
        assert!(matches!(
            encryption_for(SslMode::Disable),
            (EncryptionLevel::NotSupported, false)
        ));
        assert!(matches!(
            encryption_for(SslMode::Require),
            (EncryptionLevel::Required, true)
        ));
        assert!(matches!(
            encryption_for(SslMode::VerifyFull),
            (EncryptionLevel::Required, false)
        ));
    }

    #[test]
    fn test_strip_default_parens() {
        assert_eq!(strip_default_parens("((0))"), "0");
        assert_eq!(strip_default_parens("(getdate())"), "getdate()");
        assert_eq!(strip_default_parens("('active')"), "'active'");
        assert_eq!(strip_default_parens("(NULL)"), "NULL");
        assert_eq!(strip_default_parens("((1)+(2))"), "(1)+(2)");
    }

    #[tokio::test]
    async fn test_metadata_before_open_is_connection_error() {
        let mut driver = MssqlDriver::new(test_config(), TypeMapOptions::default());
        let err = driver
            .foreign_key_info("dbo", "orders")
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::Connection { .. }));
        driver.close().await;
    }
}
