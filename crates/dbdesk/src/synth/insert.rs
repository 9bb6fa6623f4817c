//! INSERT rendering.

use std::collections::HashSet;

use crate::error::{AdminError, AdminResult};
use crate::ident::Ident;
use crate::query_spec::InsertSpec;
use crate::schema::TableSchema;
use crate::statement::{Statement, StatementKind};

use super::Synthesizer;
use super::param::Binder;

pub(super) fn build(
    synth: &Synthesizer,
    spec: &InsertSpec,
    schema: &TableSchema,
) -> AdminResult<Statement> {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(spec.assignments.len());

    for assignment in &spec.assignments {
        let column = schema.require_column(&assignment.column)?;
        if !seen.insert(assignment.column.as_str()) {
            return Err(AdminError::validation(format!(
                "Column '{}' is assigned more than once",
                assignment.column
            )));
        }
        // Left out so the column falls back to NULL, its default or its sequence.
        if assignment.value.is_empty() && !column.is_required() {
            continue;
        }
        kept.push(assignment);
    }

    if kept.is_empty() {
        return Err(AdminError::EmptyAssignment(spec.table.clone()));
    }

    let dialect = synth.dialect;
    let mut binder = Binder::new();
    let mut sql = String::from("INSERT INTO ");
    Ident::new(&spec.table)?.write_sql(dialect, &mut sql);

    sql.push_str(" (");
    for (i, a) in kept.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        Ident::new(&a.column)?.write_sql(dialect, &mut sql);
    }
    sql.push_str(") VALUES (");
    for (i, a) in kept.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        binder.push_bound(&mut sql, a.value.as_str());
    }
    sql.push(')');

    Ok(Statement::new(
        StatementKind::Insert,
        sql,
        binder.into_params(),
    ))
}
