//! Structured query input: what the builder surfaces hand to the synthesizer.
//!
//! A [`QuerySpec`] is plain data. It names a table, columns, predicates and
//! assignments as strings; nothing here has been checked against the database
//! yet. [`QuerySpec::check_shape`] covers the preconditions that need no
//! catalog or schema.
//!
//! # Example
//! ```ignore
//! use dbdesk::{Predicate, QuerySpec, UpdateSpec};
//!
//! let spec: QuerySpec = UpdateSpec::new("users")
//!     .set("name", "Alice")
//!     .filter(Predicate::eq("id", "7"))
//!     .into();
//! spec.check_shape()?;
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AdminError, AdminResult};
use crate::ident::Ident;
use crate::statement::StatementKind;

/// Comparison operator of a [`Predicate`].
///
/// Serialized with its SQL spelling (`"="`, `"NOT LIKE"`, `"IS NULL"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "NOT LIKE")]
    NotLike,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NOT IN")]
    NotIn,
    #[serde(rename = "IS NULL")]
    IsNull,
    #[serde(rename = "IS NOT NULL")]
    IsNotNull,
}

impl Operator {
    pub const ALL: [Operator; 12] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Lt,
        Operator::Gt,
        Operator::Lte,
        Operator::Gte,
        Operator::Like,
        Operator::NotLike,
        Operator::In,
        Operator::NotIn,
        Operator::IsNull,
        Operator::IsNotNull,
    ];

    pub fn as_sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Lte => "<=",
            Operator::Gte => ">=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }

    /// Every operator except the null checks needs a value.
    pub fn takes_value(self) -> bool {
        !matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    /// `IN` / `NOT IN`: the value is a comma-separated list.
    pub fn is_list(self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Operator {
    type Err = AdminError;

    /// Case-insensitive, tolerant of repeated inner whitespace (`"not   like"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();
        let normalized = if normalized == "<>" { "!=" } else { &normalized };

        Operator::ALL
            .into_iter()
            .find(|op| op.as_sql() == normalized)
            .ok_or_else(|| AdminError::validation(format!("Unknown operator: {s}")))
    }
}

/// One WHERE condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    pub column: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Option<String>,
}

impl Predicate {
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: Some(value.into()),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(column, Operator::Eq, value)
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator: Operator::IsNull,
            value: None,
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator: Operator::IsNotNull,
            value: None,
        }
    }

    /// Value-bearing operators need a value; list operators need a non-blank one.
    pub fn check(&self) -> AdminResult<()> {
        if !self.operator.takes_value() {
            return Ok(());
        }
        match self.value.as_deref() {
            None => Err(AdminError::invalid_predicate(
                &self.column,
                format!("operator {} requires a value", self.operator),
            )),
            Some(v) if self.operator.is_list() && v.trim().is_empty() => Err(
                AdminError::invalid_predicate(&self.column, "IN list cannot be empty"),
            ),
            Some(_) => Ok(()),
        }
    }
}

/// `column = value` for INSERT and UPDATE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub column: String,
    pub value: String,
}

impl Assignment {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    #[serde(default)]
    pub direction: Direction,
}

// ─── Per-kind specs ──────────────────────────────────────────────────────────

/// `SELECT` input. An empty column list (or one containing `*`) selects all.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectSpec {
    pub table: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub predicates: Vec<Predicate>,
    #[serde(default)]
    pub order_by: Option<OrderBy>,
    #[serde(default)]
    pub limit: Option<i64>,
    /// Free-text WHERE snippet, passed through unparsed.
    #[serde(default)]
    pub raw_filter: Option<String>,
}

impl SelectSpec {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, n: i64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn raw_filter(mut self, sql: impl Into<String>) -> Self {
        self.raw_filter = Some(sql.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InsertSpec {
    pub table: String,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

impl InsertSpec {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            assignments: Vec::new(),
        }
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.assignments.push(Assignment::new(column, value));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSpec {
    pub table: String,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub predicates: Vec<Predicate>,
    #[serde(default)]
    pub raw_filter: Option<String>,
}

impl UpdateSpec {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.assignments.push(Assignment::new(column, value));
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn raw_filter(mut self, sql: impl Into<String>) -> Self {
        self.raw_filter = Some(sql.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSpec {
    pub table: String,
    #[serde(default)]
    pub predicates: Vec<Predicate>,
    #[serde(default)]
    pub raw_filter: Option<String>,
}

impl DeleteSpec {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn raw_filter(mut self, sql: impl Into<String>) -> Self {
        self.raw_filter = Some(sql.into());
        self
    }
}

// ─── QuerySpec ───────────────────────────────────────────────────────────────

/// Tagged union over the four statement kinds.
///
/// JSON form: `{"kind": "Update", "table": "users", "assignments": [...], ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum QuerySpec {
    Select(SelectSpec),
    Insert(InsertSpec),
    Update(UpdateSpec),
    Delete(DeleteSpec),
}

impl QuerySpec {
    pub fn table(&self) -> &str {
        match self {
            QuerySpec::Select(s) => &s.table,
            QuerySpec::Insert(s) => &s.table,
            QuerySpec::Update(s) => &s.table,
            QuerySpec::Delete(s) => &s.table,
        }
    }

    pub fn kind(&self) -> StatementKind {
        match self {
            QuerySpec::Select(_) => StatementKind::Select,
            QuerySpec::Insert(_) => StatementKind::Insert,
            QuerySpec::Update(_) => StatementKind::Update,
            QuerySpec::Delete(_) => StatementKind::Delete,
        }
    }

    /// WHERE predicates (always empty for INSERT).
    pub fn predicates(&self) -> &[Predicate] {
        match self {
            QuerySpec::Select(s) => &s.predicates,
            QuerySpec::Insert(_) => &[],
            QuerySpec::Update(s) => &s.predicates,
            QuerySpec::Delete(s) => &s.predicates,
        }
    }

    /// The free-text WHERE snippet, if one was given and is not blank.
    pub fn raw_filter(&self) -> Option<&str> {
        let raw = match self {
            QuerySpec::Select(s) => s.raw_filter.as_deref(),
            QuerySpec::Insert(_) => None,
            QuerySpec::Update(s) => s.raw_filter.as_deref(),
            QuerySpec::Delete(s) => s.raw_filter.as_deref(),
        };
        raw.filter(|r| !r.trim().is_empty())
    }

    /// Whether the statement will carry a WHERE clause.
    pub fn has_filter(&self) -> bool {
        !self.predicates().is_empty() || self.raw_filter().is_some()
    }

    /// Preconditions that need no catalog or schema.
    ///
    /// Runs before any database round trip, so a predicate-free UPDATE or
    /// DELETE never reaches the client.
    pub fn check_shape(&self) -> AdminResult<()> {
        Ident::new(self.table())?;

        match self {
            QuerySpec::Update(_) | QuerySpec::Delete(_) if !self.has_filter() => {
                return Err(AdminError::MissingPredicate(self.table().to_string()));
            }
            QuerySpec::Update(s) if s.assignments.is_empty() => {
                return Err(AdminError::EmptyAssignment(s.table.clone()));
            }
            QuerySpec::Insert(s) if s.assignments.is_empty() => {
                return Err(AdminError::EmptyAssignment(s.table.clone()));
            }
            _ => {}
        }

        self.predicates().iter().try_for_each(Predicate::check)
    }
}

impl From<SelectSpec> for QuerySpec {
    fn from(spec: SelectSpec) -> Self {
        QuerySpec::Select(spec)
    }
}

impl From<InsertSpec> for QuerySpec {
    fn from(spec: InsertSpec) -> Self {
        QuerySpec::Insert(spec)
    }
}

impl From<UpdateSpec> for QuerySpec {
    fn from(spec: UpdateSpec) -> Self {
        QuerySpec::Update(spec)
    }
}

impl From<DeleteSpec> for QuerySpec {
    fn from(spec: DeleteSpec) -> Self {
        QuerySpec::Delete(spec)
    }
}
