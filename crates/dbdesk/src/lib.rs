//! # dbdesk
//!
//! The core of a relational database admin client: turn form input into SQL,
//! decide whether it may run, and show what a destructive statement would
//! touch before it does.
//!
//! ## Features
//!
//! - **Structured builders**: SELECT / INSERT / UPDATE / DELETE from a [`QuerySpec`]
//!   validated against a live [`TableSchema`]
//! - **Bound values**: every user value becomes a named placeholder (`:p0`, `:p1`, ...)
//! - **Safe defaults**: UPDATE and DELETE need a WHERE clause, and a confirmation
//! - **Previews**: COUNT and a sample of the rows an UPDATE or DELETE would affect
//! - **Free-text SQL**: `DROP` / `DELETE FROM` / `TRUNCATE TABLE` are gated server side
//! - **Browsing and backups**: paged table views, flat SQL dumps, transactional restore
//! - **Any backend**: everything runs against the [`DatabaseClient`] trait;
//!   a PostgreSQL implementation ships behind the `postgres` feature
//!
//! ## Build, preview, execute
//!
//! ```ignore
//! use dbdesk::{service, BuildRequest, ConnectionContext, ExecuteRequest, Predicate, UpdateSpec};
//!
//! let ctx = ConnectionContext::new(db, "shop");
//!
//! let built = service::build_and_preview(&ctx, BuildRequest {
//!     spec: UpdateSpec::new("orders")
//!         .set("status", "archived")
//!         .filter(Predicate::eq("status", "cancelled"))
//!         .into(),
//!     surface: Default::default(),
//! })
//! .await?;
//!
//! // built.statement.text == "UPDATE `orders` SET `status` = :p0 WHERE `status` = :p1"
//! // built.preview holds the affected count and up to 10 sample rows
//!
//! service::execute(&ctx, ExecuteRequest { statement: built.statement, confirmed: true }).await?;
//! ```

pub mod backup;
pub mod browse;
pub mod client;
pub mod config;
pub mod context;
pub mod dialect;
pub mod error;
pub mod gate;
pub mod ident;
pub mod preview;
pub mod query_spec;
pub mod schema;
pub mod service;
pub mod statement;
pub mod synth;
pub mod trace;

mod sql_text;

#[cfg(feature = "postgres")]
pub mod pg;

pub use backup::{BackupOptions, RestoreReport};
pub use browse::TablePage;
pub use client::{DatabaseClient, ExecOutcome, QueryOutcome};
pub use config::AdminConfig;
pub use context::ConnectionContext;
pub use dialect::Dialect;
pub use error::{AdminError, AdminResult, ErrorKind};
pub use gate::{
    BuilderSurface, DangerousAction, DangerousSqlPolicy, GatePolicy, GateReport, SafetyGate,
    scan_dangerous_sql,
};
pub use ident::Ident;
pub use preview::{PreviewPlan, PreviewReport, PreviewTranslator};
pub use query_spec::{
    Assignment, DeleteSpec, Direction, InsertSpec, Operator, OrderBy, Predicate, QuerySpec,
    SelectSpec, UpdateSpec,
};
pub use schema::{ColumnDescriptor, TableCatalog, TableSchema};
pub use service::{
    BuildRequest, BuildResponse, ErrorResponse, ExecuteRequest, ExecuteResponse, PreviewRequest,
    RawSqlRequest, RawSqlResponse,
};
pub use statement::{Params, Row, Statement, StatementKind};
pub use synth::{InListMode, Synthesizer};
pub use trace::SqlTracer;

#[cfg(feature = "postgres")]
pub use pg::PgDatabase;
