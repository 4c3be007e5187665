//! PostgreSQL catalog queries over `information_schema` and `pg_catalog`.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod, Runtime};
use tokio_postgres::config::SslMode as PgSslMode;
use tokio_postgres::{Config as PgConfig, Row};
use tracing::{debug, info, warn};

use crate::config::{DriverConfig, DriverKind};
use crate::core::schema::{Column, ForeignKey, PrimaryKey};
use crate::core::traits::{Driver, TableFilter};
use crate::drivers::common::{SslMode, TlsBuilder};
use crate::error::{GenError, Result};
use crate::typemap::{ColumnTranslator, PostgresTypes, RawColumn, TypeMapOptions};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

const TABLES_QUERY: &str = r#"
    SELECT table_name::text AS table_name
    FROM information_schema.tables
    WHERE table_schema = $1 AND table_type = 'BASE TABLE'
    ORDER BY table_name
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT
        c.column_name::text AS column_name,
        c.data_type::text AS data_type,
        format_type(a.atttypid, a.atttypmod) AS full_type,
        c.column_default::text AS column_default,
        (c.is_nullable = 'YES') AS is_nullable,
        (c.is_identity = 'YES') AS is_identity,
        EXISTS (
            SELECT 1
            FROM pg_catalog.pg_constraint pc
            WHERE pc.conrelid = a.attrelid
                AND pc.contype IN ('p', 'u')
                AND pc.conkey = ARRAY[a.attnum]
        ) AS is_unique
    FROM information_schema.columns c
    JOIN pg_catalog.pg_namespace n ON n.nspname = c.table_schema
    JOIN pg_catalog.pg_class cl ON cl.relname = c.table_name AND cl.relnamespace = n.oid
    JOIN pg_catalog.pg_attribute a ON a.attrelid = cl.oid AND a.attname = c.column_name
    WHERE c.table_schema = $1 AND c.table_name = $2
    ORDER BY c.ordinal_position
"#;

const PRIMARY_KEY_QUERY: &str = r#"
    SELECT
        con.conname::text AS constraint_name,
        a.attname::text AS column_name
    FROM pg_catalog.pg_constraint con
    JOIN pg_catalog.pg_class cl ON cl.oid = con.conrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = cl.relnamespace
    JOIN pg_catalog.pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = ANY(con.conkey)
    WHERE con.contype = 'p' AND n.nspname = $1 AND cl.relname = $2
    ORDER BY array_position(con.conkey, a.attnum)
"#;

const FOREIGN_KEYS_QUERY: &str = r#"
    SELECT
        con.conname::text AS constraint_name,
        a.attname::text AS column_name,
        fcl.relname::text AS foreign_table,
        fa.attname::text AS foreign_column
    FROM pg_catalog.pg_constraint con
    JOIN pg_catalog.pg_class cl ON cl.oid = con.conrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = cl.relnamespace
    JOIN pg_catalog.pg_class fcl ON fcl.oid = con.confrelid
    CROSS JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(attnum, fattnum, pos)
    JOIN pg_catalog.pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
    JOIN pg_catalog.pg_attribute fa ON fa.attrelid = con.confrelid AND fa.attnum = k.fattnum
    WHERE con.contype = 'f'
        AND n.nspname = $1
        AND cl.relname = $2
        AND fcl.relnamespace = n.oid
    ORDER BY con.conname, k.pos
"#;

/// PostgreSQL driver owning a single pooled connection.
pub struct PostgresDriver {
    config: DriverConfig,
    type_opts: TypeMapOptions,
    pool: Option<Pool>,
}

impl PostgresDriver {
    pub fn new(config: DriverConfig, type_opts: TypeMapOptions) -> Self {
        Self {
            config,
            type_opts,
            pool: None,
        }
    }

    async fn client(&self, operation: &str) -> Result<Object> {
        let pool = self
            .pool
            .as_ref()
            .ok_or_else(|| GenError::connection("postgres", "driver is not open"))?;
        pool.get()
            .await
            .map_err(|e| GenError::query(e, format!("acquiring connection for {}", operation)))
    }

    fn build_pool(&self, ssl_mode: SslMode) -> Result<Pool> {
        let port = self.config.effective_port(DriverKind::Postgres);

        let mut pg_config = PgConfig::new();
        pg_config.host(&self.config.host);
        pg_config.port(port);
        pg_config.dbname(&self.config.database);
        pg_config.user(&self.config.user);
        pg_config.password(&self.config.password);
        pg_config.ssl_mode(match ssl_mode {
            SslMode::Disable => PgSslMode::Disable,
            SslMode::Prefer => PgSslMode::Prefer,
            _ => PgSslMode::Require,
        });

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let mgr = match TlsBuilder::new(ssl_mode).build()? {
            Some(tls) => Manager::from_config(pg_config, tls, mgr_config),
            None => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config)
            }
        };

        Pool::builder(mgr)
            .max_size(1)
            .runtime(Runtime::Tokio1)
            .wait_timeout(Some(POOL_CONNECTION_TIMEOUT))
            .create_timeout(Some(POOL_CONNECTION_TIMEOUT))
            .build()
            .map_err(|e| GenError::connection("postgres", e))
    }
}

#[async_trait]
impl Driver for PostgresDriver {
    async fn open(&mut self) -> Result<()> {
        let ssl_mode = SslMode::parse(&self.config.ssl_mode)?;
        let pool = self.build_pool(ssl_mode)?;

        let client = pool
            .get()
            .await
            .map_err(|e| GenError::connection("postgres", e))?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| GenError::connection("postgres", e))?;
        drop(client);

        info!(
            "Connected to PostgreSQL: {}:{}/{}",
            self.config.host,
            self.config.effective_port(DriverKind::Postgres),
            self.config.database
        );
        self.pool = Some(pool);
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close();
            debug!("Closed PostgreSQL connection");
        }
    }

    async fn table_names(&mut self, schema: &str, filter: &TableFilter) -> Result<Vec<String>> {
        let operation = format!("listing PostgreSQL tables in schema {}", schema);
        let client = self.client(&operation).await?;
        let rows = client
            .query(TABLES_QUERY, &[&schema])
            .await
            .map_err(|e| GenError::query(e, &operation))?;

        let names = rows
            .iter()
            .map(|row| row.try_get::<_, String>("table_name"))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| GenError::query(e, &operation))?;

        Ok(filter.apply(names))
    }

    async fn columns(&mut self, schema: &str, table: &str) -> Result<Vec<Column>> {
        let operation = format!("loading PostgreSQL columns for {}.{}", schema, table);
        let client = self.client(&operation).await?;
        let rows = client
            .query(COLUMNS_QUERY, &[&schema, &table])
            .await
            .map_err(|e| GenError::query(e, &operation))?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw = raw_column(row).map_err(|e| GenError::query(e, &operation))?;
            columns.push(PostgresTypes.translate(raw, &self.type_opts));
        }

        debug!("Loaded {} columns for {}.{}", columns.len(), schema, table);
        Ok(columns)
    }

    async fn primary_key_info(&mut self, schema: &str, table: &str) -> Result<Option<PrimaryKey>> {
        let operation = format!("loading PostgreSQL primary key for {}.{}", schema, table);
        let client = self.client(&operation).await?;
        let rows = client
            .query(PRIMARY_KEY_QUERY, &[&schema, &table])
            .await
            .map_err(|e| GenError::query(e, &operation))?;

        let mut pk: Option<PrimaryKey> = None;
        for row in &rows {
            let name: String = row
                .try_get("constraint_name")
                .map_err(|e| GenError::query(e, &operation))?;
            let column: String = row
                .try_get("column_name")
                .map_err(|e| GenError::query(e, &operation))?;
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
        let operation = format!("loading PostgreSQL foreign keys for {}.{}", schema, table);
        let client = self.client(&operation).await?;
        let rows = client
            .query(FOREIGN_KEYS_QUERY, &[&schema, &table])
            .await
            .map_err(|e| GenError::query(e, &operation))?;

        let fks = rows
            .iter()
            .map(|row| -> std::result::Result<ForeignKey, tokio_postgres::Error> {
                Ok(ForeignKey {
                    name: row.try_get("constraint_name")?,
                    table: table.to_string(),
                    column: row.try_get("column_name")?,
                    foreign_table: row.try_get("foreign_table")?,
                    foreign_column: row.try_get("foreign_column")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| GenError::query(e, &operation))?;

        debug!("Loaded {} foreign keys for {}.{}", fks.len(), schema, table);
        Ok(fks)
    }

    fn name(&self) -> &str {
        "postgres"
    }

    fn use_last_insert_id(&self) -> bool {
        false
    }

    fn use_top_clause(&self) -> bool {
        false
    }

    fn left_quote(&self) -> char {
        '"'
    }

    fn right_quote(&self) -> char {
        '"'
    }

    fn index_placeholders(&self) -> bool {
        true
    }
}

fn raw_column(row: &Row) -> std::result::Result<RawColumn, tokio_postgres::Error> {
    let is_identity: bool = row.try_get("is_identity")?;
    let default: Option<String> = row.try_get("column_default")?;

    Ok(RawColumn {
        name: row.try_get("column_name")?,
        db_type: row.try_get("data_type")?,
        full_db_type: row.try_get("full_type")?,
        nullable: row.try_get("is_nullable")?,
        unsigned: false,
        unique: row.try_get("is_unique")?,
        // Identity columns have no column_default; treat them like serials.
        default: if is_identity {
            Some("nextval(identity)".to_string())
        } else {
            default
        },
    })
}
