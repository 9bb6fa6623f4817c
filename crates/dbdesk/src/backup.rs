//! Flat SQL dumps and their replay.
//!
//! A dump is plain SQL text: optional `DROP TABLE IF EXISTS` + `CREATE TABLE`
//! per table followed by one multi-row `INSERT` of literal values. Restoring
//! splits the text back into statements and replays them in a single
//! transaction.

use serde::{Deserialize, Serialize};

use crate::client::DatabaseClient;
use crate::context::ConnectionContext;
use crate::dialect::Dialect;
use crate::error::{AdminError, AdminResult};
use crate::ident::Ident;
use crate::sql_text::statement_terminators;
use crate::statement::Params;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackupOptions {
    pub include_structure: bool,
    pub include_data: bool,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            include_structure: true,
            include_data: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreReport {
    /// Statements replayed.
    pub statements: usize,
}

/// Dump `tables` (every table when empty) as SQL text.
///
/// Each named table must be in the live table list.
pub async fn dump<C: DatabaseClient>(
    ctx: &ConnectionContext<C>,
    tables: &[String],
    options: BackupOptions,
) -> AdminResult<String> {
    let catalog = ctx.catalog().await?;
    let tables: Vec<String> = if tables.is_empty() {
        catalog.tables.clone()
    } else {
        for table in tables {
            catalog.require(table)?;
        }
        tables.to_vec()
    };

    let dialect = ctx.dialect();
    let mut out = String::new();
    out.push_str("-- dbdesk SQL dump\n");
    out.push_str(&format!("-- Database: {}\n", ctx.label));
    out.push_str(&format!(
        "-- Generated: {}\n\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    if dialect == Dialect::MySql {
        out.push_str("SET FOREIGN_KEY_CHECKS = 0;\n\n");
    }

    for table in &tables {
        let quoted = Ident::new(table)?.to_sql(dialect);
        out.push_str(&format!("-- Table: {table}\n"));

        if options.include_structure {
            let create = ctx.show_create_table(table).await?;
            out.push_str(&format!("DROP TABLE IF EXISTS {quoted};\n"));
            out.push_str(create.trim().trim_end_matches(';'));
            out.push_str(";\n\n");
        }

        if options.include_data {
            let schema = ctx.schema(table).await?;
            let rows = ctx
                .query(&format!("SELECT * FROM {quoted}"), &Params::new())
                .await?;
            if !rows.is_empty() {
                let columns = schema
                    .columns
                    .iter()
                    .map(|c| Ident::new(&c.name).map(|id| id.to_sql(dialect)))
                    .collect::<AdminResult<Vec<_>>>()?
                    .join(", ");

                out.push_str(&format!("INSERT INTO {quoted} ({columns}) VALUES\n"));
                let values: Vec<String> = rows
                    .iter()
                    .map(|row| {
                        let literals: Vec<String> = schema
                            .columns
                            .iter()
                            .map(|c| {
                                row.get(&c.name)
                                    .map(|v| dialect.quote_literal(v))
                                    .unwrap_or_else(|| "NULL".to_string())
                            })
                            .collect();
                        format!("({})", literals.join(", "))
                    })
                    .collect();
                out.push_str(&values.join(",\n"));
                out.push_str(";\n\n");
            }
        }
    }

    if dialect == Dialect::MySql {
        out.push_str("SET FOREIGN_KEY_CHECKS = 1;\n");
    }

    tracing::info!(
        target: crate::trace::SQL_TARGET,
        tables = tables.len(),
        bytes = out.len(),
        "dump finished"
    );
    Ok(out)
}

/// Split dump text into statements.
///
/// A statement ends at a `;` (outside quotes and comments) followed by
/// optional spaces and a line break or the end of input. Leading `--` comment
/// lines are stripped; chunks with nothing left are dropped.
pub fn split_statements(sql: &str, dialect: Dialect) -> Vec<String> {
    let mut out = Vec::new();
    let mut start = 0;

    for term in statement_terminators(sql, dialect) {
        if term < start || !ends_line(&sql[term + 1..]) {
            continue;
        }
        push_chunk(&mut out, &sql[start..term]);
        start = term + 1;
    }
    push_chunk(&mut out, &sql[start..]);
    out
}

fn ends_line(rest: &str) -> bool {
    let rest = rest.trim_start_matches([' ', '\t', '\r']);
    rest.is_empty() || rest.starts_with('\n')
}

fn push_chunk(out: &mut Vec<String>, chunk: &str) {
    let mut body = chunk.trim_start();
    while body.starts_with("--") {
        body = match body.find('\n') {
            Some(pos) => body[pos + 1..].trim_start(),
            None => "",
        };
    }
    let body = body.trim();
    if !body.is_empty() {
        out.push(body.to_string());
    }
}

/// Replay dump text in one transaction; nothing is kept if any statement fails.
pub async fn restore<C: DatabaseClient>(
    ctx: &ConnectionContext<C>,
    sql: &str,
) -> AdminResult<RestoreReport> {
    let statements = split_statements(sql, ctx.dialect());
    if statements.is_empty() {
        return Err(AdminError::validation("Backup contains no SQL statements"));
    }
    let statements = ctx.replay(&statements).await?;
    Ok(RestoreReport { statements })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_on_line_terminated_semicolons() {
        let sql = "-- header\n-- Table: t\nDROP TABLE IF EXISTS `t`;\nCREATE TABLE `t` (id int);\n\nINSERT INTO `t` (`id`) VALUES\n(1),\n(2);\n";
        assert_eq!(
            split_statements(sql, Dialect::MySql),
            vec![
                "DROP TABLE IF EXISTS `t`",
                "CREATE TABLE `t` (id int)",
                "INSERT INTO `t` (`id`) VALUES\n(1),\n(2)",
            ]
        );
    }

    #[test]
    fn split_keeps_semicolons_inside_literals() {
        let sql = "INSERT INTO t VALUES ('a;\nb');\nSELECT 1;";
        assert_eq!(
            split_statements(sql, Dialect::MySql),
            vec!["INSERT INTO t VALUES ('a;\nb')", "SELECT 1"]
        );
    }

    #[test]
    fn split_ignores_mid_line_semicolons() {
        let sql = "SELECT 1; SELECT 2;\n";
        assert_eq!(split_statements(sql, Dialect::Postgres), vec!["SELECT 1; SELECT 2"]);
    }

    #[test]
    fn split_drops_comment_only_chunks() {
        let sql = "-- only a comment\n;\n  \n";
        assert!(split_statements(sql, Dialect::MySql).is_empty());
    }

    #[test]
    fn backup_options_default_to_everything() {
        let opts: BackupOptions = serde_json::from_str(r#"{"includeData": false}"#).unwrap();
        assert!(opts.include_structure);
        assert!(!opts.include_data);
    }
}
