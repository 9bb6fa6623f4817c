//! PostgreSQL implementation of [`DatabaseClient`] over a deadpool pool.
//!
//! Statements arrive with `:name` placeholders and string values. They are
//! rewritten to `$N`, prepared, and each value is encoded for the parameter
//! type the server inferred. Types without a client-side encoding are sent as
//! text and cast on the server.

mod introspect;
mod params;
mod pool;
mod rows;

use deadpool_postgres::Pool;
use tokio_postgres::types::ToSql;

use crate::client::{DatabaseClient, ExecOutcome};
use crate::dialect::Dialect;
use crate::error::{AdminError, AdminResult};
use crate::schema::ColumnDescriptor;
use crate::statement::{Params, Row};

pub use pool::{
    DEFAULT_POOL_SIZE, create_pool, create_pool_with_config, create_pool_with_tls, redact_url,
};

use introspect::{DESCRIBE_TABLE_SQL, LIST_TABLES_SQL, create_table_ddl, display_type};
use params::{TextParam, bind_named, cast_type_name};
use rows::row_to_json;

/// A PostgreSQL database reached through a connection pool.
#[derive(Clone)]
pub struct PgDatabase {
    pool: Pool,
}

impl std::fmt::Debug for PgDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgDatabase")
            .field("pool", &self.pool.status())
            .finish()
    }
}

impl PgDatabase {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Build a pool for `database_url` and check that a connection can be made.
    pub async fn connect(database_url: &str) -> AdminResult<Self> {
        let db = Self::new(create_pool(database_url)?);
        let _client = db.pool.get().await?;
        tracing::info!(
            target: crate::trace::SQL_TARGET,
            url = %redact_url(database_url),
            "connected"
        );
        Ok(db)
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Prepare `sql` with its named parameters bound.
    ///
    /// A first prepare tells which parameter types the server inferred; if any
    /// of them has no client-side encoding, the SQL is re-rendered with a cast
    /// for those parameters and prepared again.
    async fn prepare<'p>(
        client: &tokio_postgres::Client,
        sql: &str,
        params: &'p Params,
    ) -> AdminResult<(tokio_postgres::Statement, Vec<TextParam<'p>>)> {
        let bound = bind_named(sql, params, &[]);
        let stmt = client
            .prepare(&bound.sql)
            .await
            .map_err(|e| AdminError::from_db_error(sql, e))?;

        let casts: Vec<Option<String>> = stmt
            .params()
            .iter()
            .map(|ty| (!TextParam::accepts(ty)).then(|| cast_type_name(ty)))
            .collect();
        if casts.iter().all(Option::is_none) {
            return Ok((stmt, bound.values.into_iter().map(TextParam).collect()));
        }

        let bound = bind_named(sql, params, &casts);
        tracing::debug!(
            target: crate::trace::SQL_TARGET,
            sql = %bound.sql,
            "re-preparing with server-side casts"
        );
        let stmt = client
            .prepare(&bound.sql)
            .await
            .map_err(|e| AdminError::from_db_error(sql, e))?;
        Ok((stmt, bound.values.into_iter().map(TextParam).collect()))
    }
}

fn as_sql_params<'a>(values: &'a [TextParam<'_>]) -> Vec<&'a (dyn ToSql + Sync)> {
    values.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

impl DatabaseClient for PgDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn query(&self, sql: &str, params: &Params) -> AdminResult<Vec<Row>> {
        let client = self.pool.get().await?;
        let (stmt, values) = Self::prepare(&client, sql, params).await?;
        let rows = client
            .query(&stmt, &as_sql_params(&values))
            .await
            .map_err(|e| AdminError::from_db_error(sql, e))?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn execute(&self, sql: &str, params: &Params) -> AdminResult<ExecOutcome> {
        let client = self.pool.get().await?;
        let (stmt, values) = Self::prepare(&client, sql, params).await?;
        let affected_row_count = client
            .execute(&stmt, &as_sql_params(&values))
            .await
            .map_err(|e| AdminError::from_db_error(sql, e))?;
        // Generated keys come back through RETURNING, not a session value.
        Ok(ExecOutcome {
            affected_row_count,
            last_insert_id: None,
        })
    }

    async fn list_tables(&self) -> AdminResult<Vec<String>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(LIST_TABLES_SQL, &[])
            .await
            .map_err(|e| AdminError::from_db_error(LIST_TABLES_SQL, e))?;
        rows.iter()
            .map(|row| {
                row.try_get::<_, String>(0)
                    .map_err(|e| AdminError::from_db_error(LIST_TABLES_SQL, e))
            })
            .collect()
    }

    async fn describe_table(&self, table: &str) -> AdminResult<Vec<ColumnDescriptor>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(DESCRIBE_TABLE_SQL, &[&table])
            .await
            .map_err(|e| AdminError::from_db_error(DESCRIBE_TABLE_SQL, e))?;

        rows.iter()
            .map(|row| -> Result<ColumnDescriptor, tokio_postgres::Error> {
                let data_type: String = row.try_get(1)?;
                let max_length: Option<i32> = row.try_get(2)?;
                Ok(ColumnDescriptor {
                    name: row.try_get(0)?,
                    sql_type: display_type(&data_type, max_length),
                    nullable: row.try_get(3)?,
                    is_primary_key: row.try_get(4)?,
                    is_auto_increment: row.try_get(5)?,
                    default_value: row.try_get(6)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AdminError::from_db_error(DESCRIBE_TABLE_SQL, e))
    }

    async fn show_create_table(&self, table: &str) -> AdminResult<String> {
        let columns = self.describe_table(table).await?;
        if columns.is_empty() {
            return Err(AdminError::UnknownTable(table.to_string()));
        }
        create_table_ddl(table, &columns)
    }

    async fn replay(&self, statements: &[String]) -> AdminResult<usize> {
        let mut client = self.pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| AdminError::from_db_error("BEGIN", e))?;

        for (idx, sql) in statements.iter().enumerate() {
            if let Err(e) = tx.batch_execute(sql).await {
                tracing::warn!(
                    target: crate::trace::SQL_TARGET,
                    statement = idx + 1,
                    "replay failed, rolling back"
                );
                let _ = tx.rollback().await;
                return Err(AdminError::from_db_error(sql.as_str(), e));
            }
        }

        tx.commit()
            .await
            .map_err(|e| AdminError::from_db_error("COMMIT", e))?;
        Ok(statements.len())
    }
}
