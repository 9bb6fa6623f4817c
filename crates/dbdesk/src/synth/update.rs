//! UPDATE rendering.

use std::collections::HashSet;

use crate::error::{AdminError, AdminResult};
use crate::ident::Ident;
use crate::query_spec::UpdateSpec;
use crate::schema::TableSchema;
use crate::statement::{Statement, StatementKind};

use super::Synthesizer;
use super::param::Binder;
use super::predicate::write_where;

pub(super) fn build(
    synth: &Synthesizer,
    spec: &UpdateSpec,
    schema: &TableSchema,
) -> AdminResult<Statement> {
    if spec.assignments.is_empty() {
        return Err(AdminError::EmptyAssignment(spec.table.clone()));
    }

    let dialect = synth.dialect;
    let mut binder = Binder::new();
    let mut seen = HashSet::new();
    let mut sql = String::from("UPDATE ");
    Ident::new(&spec.table)?.write_sql(dialect, &mut sql);
    sql.push_str(" SET ");

    for (i, assignment) in spec.assignments.iter().enumerate() {
        schema.require_column(&assignment.column)?;
        if !seen.insert(assignment.column.as_str()) {
            return Err(AdminError::validation(format!(
                "Column '{}' is assigned more than once",
                assignment.column
            )));
        }
        if i > 0 {
            sql.push_str(", ");
        }
        Ident::new(&assignment.column)?.write_sql(dialect, &mut sql);
        sql.push_str(" = ");
        binder.push_bound(&mut sql, assignment.value.as_str());
    }

    write_where(
        synth,
        &mut sql,
        schema,
        &spec.predicates,
        spec.raw_filter.as_deref(),
        &mut binder,
    )?;

    Ok(Statement::new(
        StatementKind::Update,
        sql,
        binder.into_params(),
    ))
}
