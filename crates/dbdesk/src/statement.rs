//! Rendered statements.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Named parameter values, keyed without the leading `:`.
pub type Params = BTreeMap<String, String>;

/// One result row, column name to JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Kind of a rendered statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    /// UPDATE and DELETE can change existing rows.
    pub fn is_destructive(self) -> bool {
        matches!(self, StatementKind::Update | StatementKind::Delete)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SQL text with named placeholders (`:p0`, `:p1`, ...) and their values.
///
/// Built per request and dropped once the client returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub text: String,
    #[serde(default)]
    pub parameters: Params,
    pub kind: StatementKind,
}

impl Statement {
    pub fn new(kind: StatementKind, text: impl Into<String>, parameters: Params) -> Self {
        Self {
            text: text.into(),
            parameters,
            kind,
        }
    }

    /// A statement without parameters.
    pub fn raw(kind: StatementKind, text: impl Into<String>) -> Self {
        Self::new(kind, text, Params::new())
    }

    pub fn is_destructive(&self) -> bool {
        self.kind.is_destructive()
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
