//! Schema snapshots read from the database client.
//!
//! Snapshots are taken per request and never cached: a table can be altered or
//! dropped between two calls.

use serde::{Deserialize, Serialize};

use crate::error::{AdminError, AdminResult};

/// One column as reported by schema introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub name: String,
    pub sql_type: String,
    pub nullable: bool,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_auto_increment: bool,
    #[serde(default)]
    pub default_value: Option<String>,
}

impl ColumnDescriptor {
    /// A nullable, non-key column of the given type.
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            nullable: true,
            is_primary_key: false,
            is_auto_increment: false,
            default_value: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.nullable = false;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.is_auto_increment = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// An INSERT must supply a value for this column.
    ///
    /// Nullable and auto-increment columns can be left out.
    pub fn is_required(&self) -> bool {
        !self.nullable && !self.is_auto_increment
    }
}

/// Column snapshot of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableSchema {
    pub fn new(table: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            table: table.into(),
            columns,
        }
    }

    /// Look up a column by exact name.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Look up a column, failing with [`AdminError::UnknownColumn`].
    pub fn require_column(&self, name: &str) -> AdminResult<&ColumnDescriptor> {
        self.column(name)
            .ok_or_else(|| AdminError::unknown_column(&self.table, name))
    }

    /// Primary key columns in declaration order.
    pub fn primary_key(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.is_primary_key)
    }
}

/// Live table list of the connected database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCatalog {
    pub tables: Vec<String>,
}

impl TableCatalog {
    pub fn new(tables: Vec<String>) -> Self {
        Self { tables }
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.iter().any(|t| t == table)
    }

    /// Fail with [`AdminError::UnknownTable`] unless `table` is listed.
    pub fn require(&self, table: &str) -> AdminResult<()> {
        if self.contains(table) {
            Ok(())
        } else {
            Err(AdminError::UnknownTable(table.to_string()))
        }
    }
}
