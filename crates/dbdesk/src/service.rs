//! Request/response endpoints consumed by a UI layer.
//!
//! Each function is one independent request. Nothing is remembered between
//! calls: a statement returned by [`build_and_preview`] is gated again from its
//! own text when it comes back through [`execute`], so flags a client might
//! tamper with are never trusted.
//!
//! Rejections (unknown table, missing predicate, missing confirmation, ...)
//! are raised before the database runs anything. Only
//! [`AdminError::DatabaseExecution`] can happen mid-execution.

use serde::{Deserialize, Serialize};

use crate::client::{DatabaseClient, QueryOutcome};
use crate::context::ConnectionContext;
use crate::error::{AdminError, AdminResult, ErrorKind};
use crate::gate::{BuilderSurface, DangerousAction, GateReport};
use crate::preview::PreviewReport;
use crate::query_spec::QuerySpec;
use crate::schema::{ColumnDescriptor, TableSchema};
use crate::sql_text::returns_rows;
use crate::statement::{Params, Statement, StatementKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub spec: QuerySpec,
    #[serde(default)]
    pub surface: BuilderSurface,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildResponse {
    pub statement: Statement,
    pub gate: GateReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<PreviewReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub statement: Statement,
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub result: QueryOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRequest {
    pub statement: Statement,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSqlRequest {
    pub sql: String,
    /// The typed confirmation phrase, when the user was asked for one.
    #[serde(default)]
    pub confirmation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSqlResponse {
    pub result: QueryOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dangerous: Option<DangerousAction>,
}

/// Error payload: `{ "error": "MissingPredicate", "message": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorKind,
    pub message: String,
}

impl From<&AdminError> for ErrorResponse {
    fn from(err: &AdminError) -> Self {
        Self {
            error: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Turn a spec into a gated statement, with a preview for destructive kinds.
///
/// Order of checks: spec shape and surface policy (no I/O), live table list,
/// schema snapshot, synthesis, statement gate, then the optional preview.
pub async fn build_and_preview<C: DatabaseClient>(
    ctx: &ConnectionContext<C>,
    req: BuildRequest,
) -> AdminResult<BuildResponse> {
    let gate = ctx.gate(req.surface);
    gate.evaluate_spec(&req.spec)?;

    let table = req.spec.table();
    ctx.catalog().await?.require(table)?;
    let schema = ctx.schema(table).await?;

    let statement = ctx.synthesizer().synthesize(&req.spec, &schema)?;
    let report = gate.evaluate_statement(&statement)?;

    let preview = if report.preview {
        Some(ctx.preview_translator().preview(ctx, &statement, table).await?)
    } else {
        None
    };

    Ok(BuildResponse {
        statement,
        gate: report,
        preview,
    })
}

/// Run a previously built statement.
///
/// Fails with [`AdminError::ConfirmationRequired`] for an unconfirmed
/// destructive statement without contacting the client.
pub async fn execute<C: DatabaseClient>(
    ctx: &ConnectionContext<C>,
    req: ExecuteRequest,
) -> AdminResult<ExecuteResponse> {
    let gate = ctx.gate(BuilderSurface::default());
    let report = gate.evaluate_statement(&req.statement)?;
    gate.check_confirmed(&report, req.confirmed)?;

    let stmt = &req.statement;
    let result = match stmt.kind {
        StatementKind::Select => QueryOutcome::Rows {
            rows: ctx.query(&stmt.text, &stmt.parameters).await?,
        },
        _ => QueryOutcome::Affected(ctx.execute(&stmt.text, &stmt.parameters).await?),
    };
    Ok(ExecuteResponse { result })
}

/// Standalone preview of an UPDATE or DELETE that claims to target `table`.
pub async fn preview<C: DatabaseClient>(
    ctx: &ConnectionContext<C>,
    req: PreviewRequest,
) -> AdminResult<PreviewReport> {
    let translator = ctx.preview_translator();
    // Refuse tampered statements before touching the catalog.
    let plan = translator.plan(&req.statement, &req.table)?;
    ctx.catalog().await?.require(&req.table)?;
    translator.run(ctx, &plan).await
}

/// Free-text SQL from the query box.
///
/// Dangerous statements are gated here, on the server side, according to the
/// configured [`DangerousSqlPolicy`](crate::DangerousSqlPolicy).
pub async fn execute_sql<C: DatabaseClient>(
    ctx: &ConnectionContext<C>,
    req: RawSqlRequest,
) -> AdminResult<RawSqlResponse> {
    let sql = req.sql.trim();
    if sql.is_empty() {
        return Err(AdminError::validation("SQL query cannot be empty"));
    }

    let dangerous = ctx.gate(BuilderSurface::default()).check_free_text(
        sql,
        req.confirmation.as_deref(),
        &ctx.config.confirmation_phrase,
    )?;

    let params = Params::new();
    let result = if returns_rows(sql) {
        QueryOutcome::Rows {
            rows: ctx.query(sql, &params).await?,
        }
    } else {
        QueryOutcome::Affected(ctx.execute(sql, &params).await?)
    };
    Ok(RawSqlResponse { result, dangerous })
}

pub async fn list_tables<C: DatabaseClient>(ctx: &ConnectionContext<C>) -> AdminResult<Vec<String>> {
    ctx.list_tables().await
}

/// Columns of a table, which must be in the live table list.
pub async fn describe_table<C: DatabaseClient>(
    ctx: &ConnectionContext<C>,
    table: &str,
) -> AdminResult<Vec<ColumnDescriptor>> {
    Ok(checked_schema(ctx, table).await?.columns)
}

async fn checked_schema<C: DatabaseClient>(
    ctx: &ConnectionContext<C>,
    table: &str,
) -> AdminResult<TableSchema> {
    ctx.catalog().await?.require(table)?;
    ctx.schema(table).await
}
