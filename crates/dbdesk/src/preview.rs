//! Dry runs for UPDATE and DELETE.
//!
//! The WHERE clause of the destructive statement is reused, unchanged, in a
//! `SELECT COUNT(*)` and a sampled `SELECT *` against the same table.
//!
//! The count and the sample are two separate round trips, and nothing ties
//! them to the later execution: rows may change in between. Callers should
//! present the report as an estimate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::DatabaseClient;
use crate::dialect::Dialect;
use crate::error::{AdminError, AdminResult};
use crate::ident::Ident;
use crate::sql_text::{
    detect_kind, find_placeholders, find_top_level_keyword, has_multiple_statements, keyword_at,
    strip_sql_prefix,
};
use crate::statement::{Params, Row, Statement, StatementKind};

/// WHERE text a form sends before any predicate has been filled in.
pub const INCOMPLETE_FILTER: &str = "...";

pub const DEFAULT_SAMPLE_SIZE: usize = 10;

/// Table and filter pulled out of an UPDATE or DELETE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationParts {
    pub kind: StatementKind,
    pub table: Ident,
    /// Text after the top-level `WHERE`, without trailing `ORDER BY`, `LIMIT`,
    /// `RETURNING` or `;`.
    pub where_clause: Option<String>,
}

impl MutationParts {
    /// A real filter is present (not empty, not the incomplete-form sentinel).
    pub fn has_filter(&self) -> bool {
        self.where_clause
            .as_deref()
            .is_some_and(|w| !w.is_empty() && w != INCOMPLETE_FILTER)
    }
}

/// Extract the target table and top-level WHERE text of an UPDATE or DELETE.
pub fn parse_mutation(stmt: &Statement, dialect: Dialect) -> AdminResult<MutationParts> {
    let lead = match stmt.kind {
        StatementKind::Update => "UPDATE",
        StatementKind::Delete => "DELETE FROM",
        other => {
            return Err(AdminError::validation(format!(
                "Preview is only available for UPDATE and DELETE, not {other}"
            )));
        }
    };

    let text = strip_sql_prefix(&stmt.text);
    let unparsable = || {
        AdminError::validation(format!(
            "Could not find the target table of the {} statement",
            stmt.kind
        ))
    };

    let after_lead = keyword_at(text, 0, lead).ok_or_else(unparsable)?;
    let rest = &text[after_lead..];
    let table_start = after_lead + (rest.len() - rest.trim_start().len());
    let (table, after_table) = Ident::parse_prefix(&text[table_start..], dialect).ok_or_else(unparsable)?;

    // Qualified names (`db.t`) and missing separators are not supported.
    if after_table
        .chars()
        .next()
        .is_some_and(|c| !c.is_whitespace() && c != ';')
    {
        return Err(unparsable());
    }
    let table_end = text.len() - after_table.len();

    let where_clause = find_top_level_keyword(text, dialect, "WHERE", table_end).map(|(_, start)| {
        let end = ["ORDER BY", "LIMIT", "RETURNING"]
            .iter()
            .filter_map(|kw| find_top_level_keyword(text, dialect, kw, start))
            .map(|(s, _)| s)
            .min()
            .unwrap_or(text.len());
        text[start..end]
            .trim()
            .trim_end_matches(|c: char| c == ';' || c.is_whitespace())
            .to_string()
    });

    Ok(MutationParts {
        kind: stmt.kind,
        table,
        where_clause,
    })
}

/// Read-only statements derived from an UPDATE or DELETE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewPlan {
    /// No usable filter yet; nothing to run.
    Empty,
    Query {
        table: Ident,
        count: Statement,
        sample: Statement,
    },
}

/// Affected-row estimate for a destructive statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewReport {
    pub affected_count: u64,
    pub sample: Vec<Row>,
    /// More rows match than the sample shows.
    pub truncated: bool,
}

impl PreviewReport {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewTranslator {
    pub dialect: Dialect,
    pub sample_size: usize,
}

impl PreviewTranslator {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Derive the COUNT and sample statements for `stmt`, which must target `table`.
    ///
    /// Stacked statements and text that does not match `stmt.kind` are
    /// refused with [`AdminError::PolicyViolation`]; the derived statements
    /// copy the WHERE text verbatim.
    pub fn plan(&self, stmt: &Statement, table: &str) -> AdminResult<PreviewPlan> {
        if has_multiple_statements(&stmt.text, self.dialect) {
            return Err(AdminError::PolicyViolation(
                "only a single statement can be previewed".to_string(),
            ));
        }
        if let Some(found) = detect_kind(&stmt.text).filter(|k| *k != stmt.kind) {
            return Err(AdminError::PolicyViolation(format!(
                "statement is labelled {} but its text is {}",
                stmt.kind, found
            )));
        }

        let parts = parse_mutation(stmt, self.dialect)?;
        if parts.table.as_str() != table {
            return Err(AdminError::TableMismatch {
                expected: table.to_string(),
                found: parts.table.as_str().to_string(),
            });
        }

        if !parts.has_filter() {
            return Ok(PreviewPlan::Empty);
        }
        let filter = parts.where_clause.unwrap_or_default();

        // Only the values the WHERE text refers to; SET values stay behind.
        let params: Params = find_placeholders(&filter, self.dialect)
            .into_iter()
            .filter_map(|p| {
                stmt.parameters
                    .get(p.name)
                    .map(|v| (p.name.to_string(), v.clone()))
            })
            .collect();

        let quoted = parts.table.to_sql(self.dialect);
        let count = Statement::new(
            StatementKind::Select,
            format!("SELECT COUNT(*) AS total FROM {quoted} WHERE {filter}"),
            params.clone(),
        );
        let sample = Statement::new(
            StatementKind::Select,
            format!(
                "SELECT * FROM {quoted} WHERE {filter} LIMIT {}",
                self.sample_size
            ),
            params,
        );

        Ok(PreviewPlan::Query {
            table: parts.table,
            count,
            sample,
        })
    }

    /// Run a plan: COUNT first, then the sample.
    pub async fn run<C: DatabaseClient>(
        &self,
        client: &C,
        plan: &PreviewPlan,
    ) -> AdminResult<PreviewReport> {
        let PreviewPlan::Query { count, sample, .. } = plan else {
            return Ok(PreviewReport::empty());
        };

        let rows = client.query(&count.text, &count.parameters).await?;
        let affected_count = rows
            .first()
            .and_then(|row| row.values().next())
            .and_then(count_value)
            .ok_or_else(|| AdminError::database(&count.text, "COUNT(*) returned no usable value"))?;

        let sample = client.query(&sample.text, &sample.parameters).await?;
        let truncated = affected_count > sample.len() as u64;

        Ok(PreviewReport {
            affected_count,
            sample,
            truncated,
        })
    }

    /// [`plan`](Self::plan) and [`run`](Self::run) in one go.
    pub async fn preview<C: DatabaseClient>(
        &self,
        client: &C,
        stmt: &Statement,
        table: &str,
    ) -> AdminResult<PreviewReport> {
        let plan = self.plan(stmt, table)?;
        self.run(client, &plan).await
    }
}

/// Drivers report COUNT(*) as a number or, for some MySQL setups, a string.
pub(crate) fn count_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(kind: StatementKind, text: &str) -> Statement {
        let mut params = Params::new();
        params.insert("p0".into(), "archived".into());
        params.insert("p1".into(), "cancelled".into());
        Statement::new(kind, text, params)
    }

    #[test]
    fn parses_delete_table_and_where() {
        let parts = parse_mutation(
            &stmt(StatementKind::Delete, "DELETE FROM `orders` WHERE `status` = :p1;"),
            Dialect::MySql,
        )
        .unwrap();
        assert_eq!(parts.table.as_str(), "orders");
        assert_eq!(parts.where_clause.as_deref(), Some("`status` = :p1"));
    }

    #[test]
    fn parses_update_and_cuts_trailing_clauses() {
        let parts = parse_mutation(
            &stmt(
                StatementKind::Update,
                "update orders set status = :p0 where id > 3 order by id limit 5",
            ),
            Dialect::MySql,
        )
        .unwrap();
        assert_eq!(parts.table.as_str(), "orders");
        assert_eq!(parts.where_clause.as_deref(), Some("id > 3"));
    }

    #[test]
    fn select_cannot_be_previewed() {
        let err = parse_mutation(&stmt(StatementKind::Select, "SELECT 1"), Dialect::MySql)
            .unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));
    }

    #[test]
    fn qualified_table_is_rejected() {
        assert!(parse_mutation(
            &stmt(StatementKind::Delete, "DELETE FROM shop.orders WHERE id = 1"),
            Dialect::MySql,
        )
        .is_err());
    }

    #[test]
    fn plan_reuses_filter_and_only_its_params() {
        let translator = PreviewTranslator::new(Dialect::MySql);
        let plan = translator
            .plan(
                &stmt(
                    StatementKind::Update,
                    "UPDATE `orders` SET `status` = :p0 WHERE `status` = :p1",
                ),
                "orders",
            )
            .unwrap();

        let PreviewPlan::Query { count, sample, .. } = plan else {
            panic!("expected a query plan");
        };
        assert_eq!(
            count.text,
            "SELECT COUNT(*) AS total FROM `orders` WHERE `status` = :p1"
        );
        assert_eq!(
            sample.text,
            "SELECT * FROM `orders` WHERE `status` = :p1 LIMIT 10"
        );
        assert_eq!(count.parameters.len(), 1);
        assert_eq!(count.parameters["p1"], "cancelled");
        assert_eq!(sample.kind, StatementKind::Select);
    }

    #[test]
    fn plan_rejects_other_table() {
        let err = PreviewTranslator::new(Dialect::MySql)
            .plan(
                &stmt(StatementKind::Delete, "DELETE FROM `orders` WHERE `id` = :p0"),
                "users",
            )
            .unwrap_err();
        assert!(matches!(
            err,
            AdminError::TableMismatch { ref expected, ref found } if expected == "users" && found == "orders"
        ));
    }

    #[test]
    fn plan_refuses_stacked_statements() {
        let err = PreviewTranslator::new(Dialect::MySql)
            .plan(
                &stmt(
                    StatementKind::Delete,
                    "DELETE FROM `orders` WHERE `id` = :p0; DROP TABLE `orders`",
                ),
                "orders",
            )
            .unwrap_err();
        assert!(matches!(err, AdminError::PolicyViolation(_)));

        // A lone trailing terminator is still one statement.
        assert!(PreviewTranslator::new(Dialect::MySql)
            .plan(
                &stmt(StatementKind::Delete, "DELETE FROM `orders` WHERE `id` = :p0;"),
                "orders",
            )
            .is_ok());
    }

    #[test]
    fn plan_refuses_mislabelled_text() {
        let err = PreviewTranslator::new(Dialect::MySql)
            .plan(
                &stmt(StatementKind::Update, "DELETE FROM `orders` WHERE `id` = :p0"),
                "orders",
            )
            .unwrap_err();
        assert!(matches!(err, AdminError::PolicyViolation(_)));
    }

    #[test]
    fn sentinel_filter_plans_nothing() {
        let translator = PreviewTranslator::new(Dialect::MySql);
        let plan = translator
            .plan(&stmt(StatementKind::Delete, "DELETE FROM `orders` WHERE ..."), "orders")
            .unwrap();
        assert_eq!(plan, PreviewPlan::Empty);

        let plan = translator
            .plan(&stmt(StatementKind::Delete, "DELETE FROM `orders`"), "orders")
            .unwrap();
        assert_eq!(plan, PreviewPlan::Empty);
    }

    #[test]
    fn sample_size_is_configurable() {
        let plan = PreviewTranslator::new(Dialect::Postgres)
            .with_sample_size(3)
            .plan(
                &stmt(StatementKind::Delete, r#"DELETE FROM "orders" WHERE "id" = :p0"#),
                "orders",
            )
            .unwrap();
        match plan {
            PreviewPlan::Query { sample, .. } => assert!(sample.text.ends_with("LIMIT 3")),
            PreviewPlan::Empty => panic!("expected a query plan"),
        }
    }

    #[test]
    fn count_value_accepts_numbers_and_strings() {
        assert_eq!(count_value(&serde_json::json!(12)), Some(12));
        assert_eq!(count_value(&serde_json::json!("12")), Some(12));
        assert_eq!(count_value(&serde_json::json!(null)), None);
    }
}
