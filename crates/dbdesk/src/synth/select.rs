//! SELECT rendering.

use crate::error::AdminResult;
use crate::ident::Ident;
use crate::query_spec::SelectSpec;
use crate::schema::TableSchema;
use crate::statement::{Statement, StatementKind};

use super::Synthesizer;
use super::param::Binder;
use super::predicate::write_where;

pub(super) fn build(
    synth: &Synthesizer,
    spec: &SelectSpec,
    schema: &TableSchema,
) -> AdminResult<Statement> {
    let dialect = synth.dialect;
    let mut binder = Binder::new();
    let mut sql = String::from("SELECT ");

    // Unknown names are dropped, never rendered.
    let selected: Vec<&str> = if spec.columns.iter().any(|c| c.trim() == "*") {
        Vec::new()
    } else {
        spec.columns
            .iter()
            .map(String::as_str)
            .filter(|c| schema.has_column(c))
            .collect()
    };

    if selected.is_empty() {
        sql.push('*');
    } else {
        for (i, col) in selected.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            Ident::new(col)?.write_sql(dialect, &mut sql);
        }
    }

    sql.push_str(" FROM ");
    Ident::new(&spec.table)?.write_sql(dialect, &mut sql);

    write_where(
        synth,
        &mut sql,
        schema,
        &spec.predicates,
        spec.raw_filter.as_deref(),
        &mut binder,
    )?;

    if let Some(order) = spec.order_by.as_ref().filter(|o| !o.column.is_empty()) {
        schema.require_column(&order.column)?;
        sql.push_str(" ORDER BY ");
        Ident::new(&order.column)?.write_sql(dialect, &mut sql);
        sql.push(' ');
        sql.push_str(order.direction.as_sql());
    }

    if let Some(n) = spec.limit.filter(|n| *n > 0) {
        sql.push_str(&format!(" LIMIT {n}"));
    }

    Ok(Statement::new(
        StatementKind::Select,
        sql,
        binder.into_params(),
    ))
}
