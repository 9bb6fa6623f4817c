//! DELETE rendering.

use crate::error::AdminResult;
use crate::ident::Ident;
use crate::query_spec::DeleteSpec;
use crate::schema::TableSchema;
use crate::statement::{Statement, StatementKind};

use super::Synthesizer;
use super::param::Binder;
use super::predicate::write_where;

pub(super) fn build(
    synth: &Synthesizer,
    spec: &DeleteSpec,
    schema: &TableSchema,
) -> AdminResult<Statement> {
    let mut binder = Binder::new();
    let mut sql = String::from("DELETE FROM ");
    Ident::new(&spec.table)?.write_sql(synth.dialect, &mut sql);

    write_where(
        synth,
        &mut sql,
        schema,
        &spec.predicates,
        spec.raw_filter.as_deref(),
        &mut binder,
    )?;

    Ok(Statement::new(
        StatementKind::Delete,
        sql,
        binder.into_params(),
    ))
}
