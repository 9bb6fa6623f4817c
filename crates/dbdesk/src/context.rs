//! Explicit per-connection state.
//!
//! Every operation takes a [`ConnectionContext`] instead of reaching for a
//! global or session-held connection, so the synthesizer and gate stay free of
//! I/O and the service functions can run against any [`DatabaseClient`].
//!
//! The context is itself a [`DatabaseClient`]: it forwards to the wrapped
//! client, logging every statement and applying the configured timeout.

use std::future::Future;
use std::time::Instant;

use crate::client::{DatabaseClient, ExecOutcome};
use crate::config::AdminConfig;
use crate::dialect::Dialect;
use crate::error::{AdminError, AdminResult};
use crate::gate::{BuilderSurface, GatePolicy, SafetyGate, scan_dangerous_sql};
use crate::preview::PreviewTranslator;
use crate::schema::ColumnDescriptor;
use crate::sql_text::detect_kind;
use crate::statement::{Params, Row};
use crate::synth::Synthesizer;
use crate::trace::SqlTracer;

/// A database client plus the settings and label it is used with.
#[derive(Debug, Clone)]
pub struct ConnectionContext<C> {
    pub client: C,
    pub config: AdminConfig,
    /// Human-readable name for logs and backup headers (database name, DSN
    /// without password, ...).
    pub label: String,
}

impl<C: DatabaseClient> ConnectionContext<C> {
    pub fn new(client: C, label: impl Into<String>) -> Self {
        Self {
            client,
            config: AdminConfig::default(),
            label: label.into(),
        }
    }

    pub fn with_config(mut self, config: AdminConfig) -> Self {
        self.config = config;
        self
    }

    pub fn synthesizer(&self) -> Synthesizer {
        Synthesizer::new(self.client.dialect()).with_in_list_mode(self.config.in_list_mode)
    }

    pub fn gate(&self, surface: BuilderSurface) -> SafetyGate {
        let policy = GatePolicy::for_surface(surface).with_free_text(self.config.free_text_policy);
        SafetyGate::new(policy, self.client.dialect())
    }

    pub fn preview_translator(&self) -> PreviewTranslator {
        PreviewTranslator::new(self.client.dialect())
            .with_sample_size(self.config.preview_sample_size)
    }

    pub fn tracer(&self) -> SqlTracer {
        if self.config.log_sql {
            SqlTracer::new()
        } else {
            SqlTracer::disabled()
        }
    }

    async fn with_timeout<T>(
        &self,
        sql: &str,
        fut: impl Future<Output = AdminResult<T>>,
    ) -> AdminResult<T> {
        match self.config.query_timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                AdminError::database(sql, format!("statement timed out after {limit:?}"))
            })?,
            None => fut.await,
        }
    }
}

fn is_destructive_sql(sql: &str) -> bool {
    detect_kind(sql).is_some_and(|k| k.is_destructive()) || scan_dangerous_sql(sql).is_some()
}

impl<C: DatabaseClient> DatabaseClient for ConnectionContext<C> {
    fn dialect(&self) -> Dialect {
        self.client.dialect()
    }

    async fn query(&self, sql: &str, params: &Params) -> AdminResult<Vec<Row>> {
        let tracer = self.tracer();
        let kind = detect_kind(sql);
        tracer.before(kind, sql, params.len(), false);

        let start = Instant::now();
        let result = self.with_timeout(sql, self.client.query(sql, params)).await;
        tracer.after(
            kind,
            start.elapsed(),
            result.as_ref().ok().map(|rows| rows.len() as u64),
            result.is_ok(),
        );
        result
    }

    async fn execute(&self, sql: &str, params: &Params) -> AdminResult<ExecOutcome> {
        let tracer = self.tracer();
        let kind = detect_kind(sql);
        tracer.before(kind, sql, params.len(), is_destructive_sql(sql));

        let start = Instant::now();
        let result = self.with_timeout(sql, self.client.execute(sql, params)).await;
        tracer.after(
            kind,
            start.elapsed(),
            result.as_ref().ok().map(|o| o.affected_row_count),
            result.is_ok(),
        );
        result
    }

    async fn list_tables(&self) -> AdminResult<Vec<String>> {
        self.with_timeout("list tables", self.client.list_tables())
            .await
    }

    async fn describe_table(&self, table: &str) -> AdminResult<Vec<ColumnDescriptor>> {
        self.with_timeout(&format!("describe {table}"), self.client.describe_table(table))
            .await
    }

    async fn show_create_table(&self, table: &str) -> AdminResult<String> {
        self.with_timeout(
            &format!("show create table {table}"),
            self.client.show_create_table(table),
        )
        .await
    }

    async fn replay(&self, statements: &[String]) -> AdminResult<usize> {
        tracing::warn!(
            target: crate::trace::SQL_TARGET,
            statements = statements.len(),
            label = %self.label,
            "replaying statements in one transaction"
        );
        self.client.replay(statements).await
    }
}
