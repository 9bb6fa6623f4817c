//! In-memory `DatabaseClient` that records every call.
//!
//! Reads return the stored rows of the table named in the SQL, ignoring any
//! WHERE clause; `COUNT(*)` returns their number and `LIMIT n [OFFSET m]`
//! slices them. Writes report every stored row of the table as affected.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use dbdesk::{
    AdminError, AdminResult, ColumnDescriptor, ConnectionContext, DatabaseClient, Dialect,
    ExecOutcome, Params, Row,
};
use serde_json::json;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Query(String, Params),
    Execute(String, Params),
    ListTables,
    Describe(String),
    ShowCreate(String),
    Replay(Vec<String>),
}

#[derive(Debug, Default)]
pub struct MemoryClient {
    dialect: Dialect,
    schemas: BTreeMap<String, Vec<ColumnDescriptor>>,
    rows: Mutex<BTreeMap<String, Vec<Row>>>,
    calls: Mutex<Vec<Call>>,
    /// Replay fails on this statement (0-based) when set.
    fail_replay_at: Option<usize>,
    committed: Mutex<Vec<String>>,
    /// Reads and the table list stall this long before answering.
    delay: Option<Duration>,
}

impl MemoryClient {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    pub fn with_table(mut self, table: &str, columns: Vec<ColumnDescriptor>) -> Self {
        self.schemas.insert(table.to_string(), columns);
        self
    }

    pub fn with_rows(self, table: &str, rows: Vec<Row>) -> Self {
        self.set_rows(table, rows);
        self
    }

    pub fn failing_replay_at(mut self, idx: usize) -> Self {
        self.fail_replay_at = Some(idx);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_rows(&self, table: &str, rows: Vec<Row>) {
        self.rows
            .lock()
            .unwrap()
            .insert(table.to_string(), rows);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn committed(&self) -> Vec<String> {
        self.committed.lock().unwrap().clone()
    }

    async fn stall(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn table_in(&self, sql: &str) -> Option<String> {
        self.schemas
            .keys()
            .find(|t| {
                let mut quoted = String::new();
                self.dialect.write_quoted_ident(t, &mut quoted);
                sql.contains(&quoted)
            })
            .cloned()
    }

    fn rows_of(&self, table: &str) -> Vec<Row> {
        self.rows
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

fn number_after(sql: &str, keyword: &str) -> Option<usize> {
    let at = sql.find(keyword)? + keyword.len();
    sql[at..]
        .split_whitespace()
        .next()
        .and_then(|n| n.parse().ok())
}

impl DatabaseClient for MemoryClient {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn query(&self, sql: &str, params: &Params) -> AdminResult<Vec<Row>> {
        self.record(Call::Query(sql.to_string(), params.clone()));
        self.stall().await;
        let Some(table) = self.table_in(sql) else {
            return Ok(Vec::new());
        };
        let rows = self.rows_of(&table);

        if sql.contains("COUNT(*)") {
            let mut row = Row::new();
            row.insert("total".into(), json!(rows.len()));
            return Ok(vec![row]);
        }

        let offset = number_after(sql, " OFFSET ").unwrap_or(0);
        let limit = number_after(sql, " LIMIT ").unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn execute(&self, sql: &str, params: &Params) -> AdminResult<ExecOutcome> {
        self.record(Call::Execute(sql.to_string(), params.clone()));
        let affected = self
            .table_in(sql)
            .map(|t| self.rows_of(&t).len())
            .unwrap_or(0);
        Ok(ExecOutcome {
            affected_row_count: affected as u64,
            last_insert_id: None,
        })
    }

    async fn list_tables(&self) -> AdminResult<Vec<String>> {
        self.record(Call::ListTables);
        self.stall().await;
        Ok(self.schemas.keys().cloned().collect())
    }

    async fn describe_table(&self, table: &str) -> AdminResult<Vec<ColumnDescriptor>> {
        self.record(Call::Describe(table.to_string()));
        Ok(self.schemas.get(table).cloned().unwrap_or_default())
    }

    async fn show_create_table(&self, table: &str) -> AdminResult<String> {
        self.record(Call::ShowCreate(table.to_string()));
        let mut quoted = String::new();
        self.dialect.write_quoted_ident(table, &mut quoted);
        Ok(format!("CREATE TABLE {quoted} (id int)"))
    }

    async fn replay(&self, statements: &[String]) -> AdminResult<usize> {
        self.record(Call::Replay(statements.to_vec()));
        if let Some(idx) = self.fail_replay_at {
            if let Some(sql) = statements.get(idx) {
                return Err(AdminError::database(sql.as_str(), "syntax error"));
            }
        }
        self.committed.lock().unwrap().extend_from_slice(statements);
        Ok(statements.len())
    }
}

pub fn users_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("id", "int").primary_key().auto_increment(),
        ColumnDescriptor::new("name", "varchar(255)").not_null(),
        ColumnDescriptor::new("status", "varchar(20)").not_null(),
    ]
}

pub fn user_rows(n: usize) -> Vec<Row> {
    (1..=n)
        .map(|i| {
            let mut row = Row::new();
            row.insert("id".into(), json!(i));
            row.insert("name".into(), json!(format!("user{i}")));
            row.insert("status".into(), json!("cancelled"));
            row
        })
        .collect()
}

/// MySQL-flavoured context with a `users` table holding `n` rows.
pub fn users_ctx(n: usize) -> ConnectionContext<MemoryClient> {
    let client = MemoryClient::new(Dialect::MySql)
        .with_table("users", users_columns())
        .with_rows("users", user_rows(n));
    ConnectionContext::new(client, "shop")
}
