//! Database client boundary.
//!
//! Everything above this trait (synthesis, gating, previews, browsing,
//! backups) talks to the database only through [`DatabaseClient`]. Identifier
//! arguments must already be checked against [`DatabaseClient::list_tables`]
//! and [`DatabaseClient::describe_table`]; implementations do no identifier
//! sanitization of their own.

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::AdminResult;
use crate::schema::{ColumnDescriptor, TableCatalog, TableSchema};
use crate::statement::{Params, Row};

/// Result of a write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecOutcome {
    pub affected_row_count: u64,
    /// Generated key of the last inserted row, where the driver reports one.
    pub last_insert_id: Option<String>,
}

/// Result of running a statement: rows for reads, counts for writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QueryOutcome {
    Rows { rows: Vec<Row> },
    Affected(ExecOutcome),
}

impl QueryOutcome {
    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            QueryOutcome::Rows { rows } => Some(rows),
            QueryOutcome::Affected(_) => None,
        }
    }

    pub fn affected_row_count(&self) -> Option<u64> {
        match self {
            QueryOutcome::Rows { .. } => None,
            QueryOutcome::Affected(outcome) => Some(outcome.affected_row_count),
        }
    }
}

/// A connected database.
///
/// SQL passed to `query` and `execute` uses named `:name` placeholders bound
/// from `params`; adapters translate them to whatever their driver expects.
pub trait DatabaseClient: Send + Sync {
    /// Dialect used to render statements for this database.
    fn dialect(&self) -> Dialect;

    /// Run a statement and return its rows.
    fn query(
        &self,
        sql: &str,
        params: &Params,
    ) -> impl std::future::Future<Output = AdminResult<Vec<Row>>> + Send;

    /// Run a statement and return the affected row count.
    fn execute(
        &self,
        sql: &str,
        params: &Params,
    ) -> impl std::future::Future<Output = AdminResult<ExecOutcome>> + Send;

    /// Base tables visible to the connected user.
    fn list_tables(&self) -> impl std::future::Future<Output = AdminResult<Vec<String>>> + Send;

    /// Column snapshot of `table`, in declaration order.
    fn describe_table(
        &self,
        table: &str,
    ) -> impl std::future::Future<Output = AdminResult<Vec<ColumnDescriptor>>> + Send;

    /// DDL that recreates `table` (used by backups).
    fn show_create_table(
        &self,
        table: &str,
    ) -> impl std::future::Future<Output = AdminResult<String>> + Send;

    /// Run `statements` in one transaction, rolling everything back on the
    /// first failure. Returns the number of statements run.
    fn replay(
        &self,
        statements: &[String],
    ) -> impl std::future::Future<Output = AdminResult<usize>> + Send;

    /// The live table list as a [`TableCatalog`].
    fn catalog(&self) -> impl std::future::Future<Output = AdminResult<TableCatalog>> + Send {
        async move { Ok(TableCatalog::new(self.list_tables().await?)) }
    }

    /// Column snapshot of `table` as a [`TableSchema`].
    fn schema(
        &self,
        table: &str,
    ) -> impl std::future::Future<Output = AdminResult<TableSchema>> + Send {
        async move {
            let columns = self.describe_table(table).await?;
            Ok(TableSchema::new(table, columns))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_serializes_with_type_tag() {
        let outcome = QueryOutcome::Affected(ExecOutcome {
            affected_row_count: 3,
            last_insert_id: None,
        });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["type"], "affected");
        assert_eq!(json["affectedRowCount"], 3);
        assert_eq!(outcome.affected_row_count(), Some(3));
        assert!(outcome.rows().is_none());
    }
}
