use std::path::PathBuf;

use dbdesk::backup::{self, BackupOptions};
use dbdesk::browse::browse;
use dbdesk::service::{self, BuildRequest, ExecuteRequest, RawSqlRequest};
use dbdesk::{
    AdminResult, BuilderSurface, ConnectionContext, ErrorResponse, PgDatabase, QueryOutcome,
    QuerySpec, Statement,
};
use serde_json::Value;

use crate::cli::Input;
use crate::output::{columns_table, names_table, print_json, rows_table};

pub type Ctx = ConnectionContext<PgDatabase>;

/// Unwrap an endpoint result; in JSON mode the error payload goes to stdout
/// first so scripts can read the error kind.
fn report<T>(json: bool, result: AdminResult<T>) -> anyhow::Result<T> {
    match result {
        Ok(v) => Ok(v),
        Err(e) => {
            if json {
                print_json(&ErrorResponse::from(&e))?;
            }
            Err(e.into())
        }
    }
}

pub async fn tables(ctx: &Ctx, json: bool) -> anyhow::Result<()> {
    let tables = report(json, service::list_tables(ctx).await)?;
    if json {
        return print_json(&tables);
    }
    println!("{}", names_table("Table", &tables));
    Ok(())
}

pub async fn describe(ctx: &Ctx, json: bool, table: &str) -> anyhow::Result<()> {
    let columns = report(json, service::describe_table(ctx, table).await)?;
    if json {
        return print_json(&columns);
    }
    println!("{}", columns_table(&columns));
    Ok(())
}

pub async fn browse_table(
    ctx: &Ctx,
    json: bool,
    table: &str,
    page: u64,
    per_page: Option<u64>,
) -> anyhow::Result<()> {
    let page = report(json, browse(ctx, table, page, per_page).await)?;
    if json {
        return print_json(&page);
    }
    println!("{}", rows_table(&page.rows));
    println!(
        "page {} of {} ({} rows, {} per page)",
        page.page, page.total_pages, page.total, page.per_page
    );
    Ok(())
}

pub async fn build(
    ctx: &Ctx,
    json: bool,
    spec: &Input,
    surface: BuilderSurface,
) -> anyhow::Result<()> {
    let spec: QuerySpec = serde_json::from_str(&spec.read()?)
        .map_err(|e| anyhow::anyhow!("invalid query spec: {e}"))?;
    let built = report(
        json,
        service::build_and_preview(ctx, BuildRequest { spec, surface }).await,
    )?;
    if json {
        return print_json(&built);
    }

    println!("{}", built.statement.text);
    for (name, value) in &built.statement.parameters {
        println!("  :{name} = {value:?}");
    }
    if let Some(preview) = &built.preview {
        println!();
        println!(
            "{} row(s) would be affected{}",
            preview.affected_count,
            if preview.truncated { ", first shown below" } else { "" }
        );
        if !preview.sample.is_empty() {
            println!("{}", rows_table(&preview.sample));
        }
    }
    if built.gate.requires_confirmation {
        println!();
        println!("Destructive statement: run it with `dbdesk exec <file> --yes`.");
    }
    Ok(())
}

/// The statement in `build --json` output, or a bare statement object.
fn statement_from_json(raw: &str) -> anyhow::Result<Statement> {
    let mut value: Value =
        serde_json::from_str(raw).map_err(|e| anyhow::anyhow!("invalid statement JSON: {e}"))?;
    if let Some(inner) = value.get_mut("statement") {
        value = inner.take();
    }
    serde_json::from_value(value).map_err(|e| anyhow::anyhow!("invalid statement JSON: {e}"))
}

pub async fn exec(ctx: &Ctx, json: bool, statement: &Input, yes: bool) -> anyhow::Result<()> {
    let statement = statement_from_json(&statement.read()?)?;
    let resp = report(
        json,
        service::execute(
            ctx,
            ExecuteRequest {
                statement,
                confirmed: yes,
            },
        )
        .await,
    )?;
    if json {
        return print_json(&resp);
    }
    print_outcome(&resp.result);
    Ok(())
}

pub async fn sql(ctx: &Ctx, json: bool, sql: String, confirm: Option<String>) -> anyhow::Result<()> {
    let resp = report(
        json,
        service::execute_sql(
            ctx,
            RawSqlRequest {
                sql,
                confirmation: confirm,
            },
        )
        .await,
    )?;
    if json {
        return print_json(&resp);
    }
    print_outcome(&resp.result);
    Ok(())
}

fn print_outcome(outcome: &QueryOutcome) {
    match outcome {
        QueryOutcome::Rows { rows } => {
            println!("{}", rows_table(rows));
            println!("{} row(s)", rows.len());
        }
        QueryOutcome::Affected(exec) => {
            println!("{} row(s) affected", exec.affected_row_count);
            if let Some(id) = &exec.last_insert_id {
                println!("last insert id: {id}");
            }
        }
    }
}

pub async fn backup(
    ctx: &Ctx,
    tables: &[String],
    options: BackupOptions,
    output: Option<&PathBuf>,
) -> anyhow::Result<()> {
    let dump = backup::dump(ctx, tables, options).await?;
    match output {
        Some(path) => {
            std::fs::write(path, &dump)
                .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", path.display()))?;
            eprintln!("wrote {} bytes to {}", dump.len(), path.display());
        }
        None => print!("{dump}"),
    }
    Ok(())
}

pub async fn restore(ctx: &Ctx, json: bool, input: &Input) -> anyhow::Result<()> {
    let sql = input.read()?;
    let restored = report(json, backup::restore(ctx, &sql).await)?;
    if json {
        return print_json(&restored);
    }
    println!("restored {} statement(s)", restored.statements);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbdesk::StatementKind;

    #[test]
    fn accepts_build_output_or_bare_statement() {
        let bare = r#"{"text": "DELETE FROM \"t\" WHERE \"id\" = :p0", "parameters": {"p0": "1"}, "kind": "Delete"}"#;
        let stmt = statement_from_json(bare).unwrap();
        assert_eq!(stmt.kind, StatementKind::Delete);
        assert_eq!(stmt.parameters["p0"], "1");

        let wrapped = format!(r#"{{"statement": {bare}, "gate": {{}}}}"#);
        assert_eq!(statement_from_json(&wrapped).unwrap(), stmt);

        assert!(statement_from_json("[1, 2]").is_err());
    }
}
