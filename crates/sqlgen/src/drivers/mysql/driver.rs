//! MySQL/MariaDB catalog queries over `information_schema`.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::Row;
use tracing::{debug, info};

use crate::config::{DriverConfig, DriverKind};
use crate::core::schema::{Column, ForeignKey, PrimaryKey};
use crate::core::traits::{Driver, TableFilter};
use crate::drivers::common::SslMode;
use crate::error::{GenError, Result};
use crate::typemap::{ColumnTranslator, MysqlTypes, RawColumn, TypeMapOptions};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// MySQL/MariaDB driver owning a single pooled connection.
pub struct MysqlDriver {
    config: DriverConfig,
    type_opts: TypeMapOptions,
    pool: Option<MySqlPool>,
}

impl MysqlDriver {
    pub fn new(config: DriverConfig, type_opts: TypeMapOptions) -> Self {
        Self {
            config,
            type_opts,
            pool: None,
        }
    }

    fn pool(&self) -> Result<&MySqlPool> {
        self.pool
            .as_ref()
            .ok_or_else(|| GenError::connection("mysql", "driver is not open"))
    }
}

fn mysql_ssl_mode(mode: SslMode) -> MySqlSslMode {
    match mode {
        SslMode::Disable => MySqlSslMode::Disabled,
        SslMode::Prefer => MySqlSslMode::Preferred,
        SslMode::Require => MySqlSslMode::Required,
        SslMode::VerifyCa => MySqlSslMode::VerifyCa,
        SslMode::VerifyFull => MySqlSslMode::VerifyIdentity,
    }
}

#[async_trait]
impl Driver for MysqlDriver {
    async fn open(&mut self) -> Result<()> {
        let ssl_mode = SslMode::parse(&self.config.ssl_mode)?;
        let port = self.config.effective_port(DriverKind::Mysql);

        let options = MySqlConnectOptions::new()
            .host(&self.config.host)
            .port(port)
            .database(&self.config.database)
            .username(&self.config.user)
            .password(&self.config.password)
            .ssl_mode(mysql_ssl_mode(ssl_mode));

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| GenError::connection("mysql", e))?;

        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| GenError::connection("mysql", e))?;

        info!(
            "Connected to MySQL: {}:{}/{}",
            self.config.host, port, self.config.database
        );
        self.pool = Some(pool);
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            debug!("Closed MySQL connection");
        }
    }

    async fn table_names(&mut self, schema: &str, filter: &TableFilter) -> Result<Vec<String>> {
        // CAST to CHAR since information_schema may return VARBINARY under some collations
        let query = r#"
            SELECT CAST(TABLE_NAME AS CHAR(255)) AS TABLE_NAME
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(schema)
            .fetch_all(self.pool()?)
            .await
            .map_err(|e| {
                GenError::query(e, format!("listing MySQL tables in schema {}", schema))
            })?;

        let names = rows
            .iter()
            .map(|row| row.try_get::<String, _>("TABLE_NAME"))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| GenError::query(e, "decoding MySQL table names"))?;

        Ok(filter.apply(names))
    }

    async fn columns(&mut self, schema: &str, table: &str) -> Result<Vec<Column>> {
        let query = r#"
            SELECT
                CAST(c.COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(c.DATA_TYPE AS CHAR(255)) AS DATA_TYPE,
                CAST(c.COLUMN_TYPE AS CHAR(255)) AS COLUMN_TYPE,
                CAST(c.COLUMN_DEFAULT AS CHAR(4096)) AS COLUMN_DEFAULT,
                CAST(IF(c.IS_NULLABLE = 'YES', 1, 0) AS SIGNED) AS is_nullable,
                CAST(IF(c.COLUMN_TYPE LIKE '%unsigned%', 1, 0) AS SIGNED) AS is_unsigned,
                CAST(IF(c.EXTRA LIKE '%auto_increment%', 1, 0) AS SIGNED) AS is_identity,
                CAST(EXISTS (
                    SELECT 1
                    FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
                    JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
                        ON kcu.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
                        AND kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
                        AND kcu.TABLE_NAME = tc.TABLE_NAME
                    WHERE tc.TABLE_SCHEMA = c.TABLE_SCHEMA
                        AND tc.TABLE_NAME = c.TABLE_NAME
                        AND tc.CONSTRAINT_TYPE IN ('PRIMARY KEY', 'UNIQUE')
                        AND kcu.COLUMN_NAME = c.COLUMN_NAME
                        AND (
                            SELECT COUNT(*)
                            FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE k2
                            WHERE k2.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
                                AND k2.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
                                AND k2.TABLE_NAME = tc.TABLE_NAME
                        ) = 1
                ) AS SIGNED) AS is_unique
            FROM INFORMATION_SCHEMA.COLUMNS c
            WHERE c.TABLE_SCHEMA = ? AND c.TABLE_NAME = ?
            ORDER BY c.ORDINAL_POSITION
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(schema)
            .bind(table)
            .fetch_all(self.pool()?)
            .await
            .map_err(|e| {
                GenError::query(e, format!("loading MySQL columns for {}.{}", schema, table))
            })?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw = raw_column(row)
                .map_err(|e| GenError::query(e, format!("decoding MySQL column of {}", table)))?;
            columns.push(MysqlTypes.translate(raw, &self.type_opts));
        }

        debug!("Loaded {} columns for {}.{}", columns.len(), schema, table);
        Ok(columns)
    }

    async fn primary_key_info(&mut self, schema: &str, table: &str) -> Result<Option<PrimaryKey>> {
        let query = r#"
            SELECT
                CAST(tc.CONSTRAINT_NAME AS CHAR(255)) AS CONSTRAINT_NAME,
                CAST(kcu.COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME
            FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
            JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
                ON kcu.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
                AND kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
                AND kcu.TABLE_NAME = tc.TABLE_NAME
            WHERE tc.TABLE_SCHEMA = ? AND tc.TABLE_NAME = ?
                AND tc.CONSTRAINT_TYPE = 'PRIMARY KEY'
            ORDER BY kcu.ORDINAL_POSITION
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(schema)
            .bind(table)
            .fetch_all(self.pool()?)
            .await
            .map_err(|e| {
                GenError::query(
                    e,
                    format!("loading MySQL primary key for {}.{}", schema, table),
                )
            })?;

        let mut pk: Option<PrimaryKey> = None;
        for row in &rows {
            let name: String = row
                .try_get("CONSTRAINT_NAME")
                .map_err(|e| GenError::query(e, "decoding MySQL primary key"))?;
            let column: String = row
                .try_get("COLUMN_NAME")
                .map_err(|e| GenError::query(e, "decoding MySQL primary key"))?;
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
        let query = r#"
            SELECT
                CAST(kcu.CONSTRAINT_NAME AS CHAR(255)) AS CONSTRAINT_NAME,
                CAST(kcu.COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(kcu.REFERENCED_TABLE_NAME AS CHAR(255)) AS REFERENCED_TABLE_NAME,
                CAST(kcu.REFERENCED_COLUMN_NAME AS CHAR(255)) AS REFERENCED_COLUMN_NAME
            FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
            WHERE kcu.TABLE_SCHEMA = ? AND kcu.TABLE_NAME = ?
                AND kcu.REFERENCED_TABLE_SCHEMA = kcu.TABLE_SCHEMA
                AND kcu.REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY kcu.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(schema)
            .bind(table)
            .fetch_all(self.pool()?)
            .await
            .map_err(|e| {
                GenError::query(
                    e,
                    format!("loading MySQL foreign keys for {}.{}", schema, table),
                )
            })?;

        let fks = rows
            .iter()
            .map(|row| -> std::result::Result<ForeignKey, sqlx::Error> {
                Ok(ForeignKey {
                    name: row.try_get("CONSTRAINT_NAME")?,
                    table: table.to_string(),
                    column: row.try_get("COLUMN_NAME")?,
                    foreign_table: row.try_get("REFERENCED_TABLE_NAME")?,
                    foreign_column: row.try_get("REFERENCED_COLUMN_NAME")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| GenError::query(e, "decoding MySQL foreign keys"))?;

        debug!("Loaded {} foreign keys for {}.{}", fks.len(), schema, table);
        Ok(fks)
    }

    fn name(&self) -> &str {
        "mysql"
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

fn raw_column(row: &MySqlRow) -> std::result::Result<RawColumn, sqlx::Error> {
    let is_identity = row.try_get::<i64, _>("is_identity")? == 1;
    let default: Option<String> = row.try_get("COLUMN_DEFAULT")?;

    Ok(RawColumn {
        name: row.try_get("COLUMN_NAME")?,
        db_type: row.try_get("DATA_TYPE")?,
        full_db_type: row.try_get("COLUMN_TYPE")?,
        nullable: row.try_get::<i64, _>("is_nullable")? == 1,
        unsigned: row.try_get::<i64, _>("is_unsigned")? == 1,
        unique: row.try_get::<i64, _>("is_unique")? == 1,
        default: if is_identity {
            Some("auto_increment".to_string())
        } else {
            default
        },
    })
}
