//! Statement synthesis: [`QuerySpec`] + [`TableSchema`] to [`Statement`].
//!
//! Synthesis is pure. It never contacts the database; the caller supplies a
//! schema snapshot taken for the current request.
//!
//! # Rules
//!
//! - Identifiers are quoted for the target [`Dialect`] and must exist in the
//!   schema. The one exception is the SELECT column list, where unknown names
//!   are dropped (falling back to `*` when nothing is left).
//! - Values are bound as named placeholders `:p0`, `:p1`, ... in order of
//!   appearance. Assignments and predicates share one counter.
//! - UPDATE and DELETE without a filter fail with
//!   [`AdminError::MissingPredicate`](crate::AdminError::MissingPredicate)
//!   before any text is produced.
//!
//! # Usage
//!
//! ```ignore
//! use dbdesk::{Predicate, Synthesizer, UpdateSpec};
//!
//! let stmt = Synthesizer::default().synthesize(
//!     &UpdateSpec::new("users").set("name", "Alice").filter(Predicate::eq("id", "7")).into(),
//!     &schema,
//! )?;
//! assert_eq!(stmt.text, "UPDATE `users` SET `name` = :p0 WHERE `id` = :p1");
//! ```

mod delete;
mod insert;
mod param;
mod predicate;
mod select;
mod update;


pub use predicate::split_in_list;

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::{AdminError, AdminResult};
use crate::query_spec::QuerySpec;
use crate::schema::TableSchema;
use crate::statement::Statement;

/// How `IN` / `NOT IN` values reach the statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InListMode {
    /// One placeholder per list element.
    #[default]
    Bound,
    /// The value is pasted between the parentheses as typed.
    ///
    /// Unsafe passthrough: the list is not escaped.
    Literal,
}

/// Renders query specs into statements for one dialect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Synthesizer {
    pub dialect: Dialect,
    pub in_list_mode: InListMode,
}

impl Synthesizer {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            in_list_mode: InListMode::default(),
        }
    }

    pub fn with_in_list_mode(mut self, mode: InListMode) -> Self {
        self.in_list_mode = mode;
        self
    }

    /// Render `spec` against the schema snapshot of its table.
    pub fn synthesize(&self, spec: &QuerySpec, schema: &TableSchema) -> AdminResult<Statement> {
        spec.check_shape()?;

        if schema.table != spec.table() {
            return Err(AdminError::TableMismatch {
                expected: spec.table().to_string(),
                found: schema.table.clone(),
            });
        }

        match spec {
            QuerySpec::Select(s) => select::build(self, s, schema),
            QuerySpec::Insert(s) => insert::build(self, s, schema),
            QuerySpec::Update(s) => update::build(self, s, schema),
            QuerySpec::Delete(s) => delete::build(self, s, schema),
        }
    }
}
