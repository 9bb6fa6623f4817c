//! Catalog queries for the current schema, and DDL rebuilt from a column
//! snapshot (PostgreSQL has no `SHOW CREATE TABLE`).

use crate::dialect::Dialect;
use crate::error::AdminResult;
use crate::ident::Ident;
use crate::schema::ColumnDescriptor;

pub(crate) const LIST_TABLES_SQL: &str = "SELECT table_name::text
     FROM information_schema.tables
     WHERE table_schema = current_schema()
       AND table_type = 'BASE TABLE'
     ORDER BY table_name";

/// `$1` is the table name.
pub(crate) const DESCRIBE_TABLE_SQL: &str = "SELECT
        c.column_name::text,
        CASE WHEN c.data_type = 'USER-DEFINED' THEN c.udt_name::text
             ELSE c.data_type::text END AS data_type,
        c.character_maximum_length::int4,
        c.is_nullable = 'YES' AS is_nullable,
        COALESCE(pk.is_pk, false) AS is_primary_key,
        (c.is_identity = 'YES' OR COALESCE(c.column_default::text, '') LIKE 'nextval(%') AS is_auto_increment,
        c.column_default::text
     FROM information_schema.columns c
     LEFT JOIN (
        SELECT kcu.column_name, true AS is_pk
        FROM information_schema.table_constraints tc
        JOIN information_schema.key_column_usage kcu
            ON tc.constraint_name = kcu.constraint_name
            AND tc.table_schema = kcu.table_schema
        WHERE tc.constraint_type = 'PRIMARY KEY'
            AND tc.table_schema = current_schema()
            AND tc.table_name = $1
     ) pk ON pk.column_name = c.column_name
     WHERE c.table_schema = current_schema() AND c.table_name = $1
     ORDER BY c.ordinal_position";

/// Display type of a column: `character varying(255)`, `integer`, `my_enum`.
pub(crate) fn display_type(data_type: &str, max_length: Option<i32>) -> String {
    match max_length {
        Some(len) => format!("{data_type}({len})"),
        None => data_type.to_string(),
    }
}

/// `CREATE TABLE` for `table` from its column snapshot.
///
/// Auto-increment columns become identity columns and lose their sequence
/// default. Indexes, foreign keys and check constraints are not reproduced.
pub(crate) fn create_table_ddl(table: &str, columns: &[ColumnDescriptor]) -> AdminResult<String> {
    let dialect = Dialect::Postgres;
    let mut lines = Vec::with_capacity(columns.len() + 1);
    let mut primary_key = Vec::new();

    for col in columns {
        let name = Ident::new(&col.name)?.to_sql(dialect);
        let mut line = format!("    {name} {}", col.sql_type);
        if col.is_auto_increment {
            line.push_str(" GENERATED BY DEFAULT AS IDENTITY");
        } else if let Some(default) = &col.default_value {
            line.push_str(" DEFAULT ");
            line.push_str(default);
        }
        if !col.nullable {
            line.push_str(" NOT NULL");
        }
        if col.is_primary_key {
            primary_key.push(name);
        }
        lines.push(line);
    }
    if !primary_key.is_empty() {
        lines.push(format!("    PRIMARY KEY ({})", primary_key.join(", ")));
    }

    Ok(format!(
        "CREATE TABLE {} (\n{}\n)",
        Ident::new(table)?.to_sql(dialect),
        lines.join(",\n")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_type_appends_length() {
        assert_eq!(display_type("character varying", Some(40)), "character varying(40)");
        assert_eq!(display_type("integer", None), "integer");
    }

    #[test]
    fn ddl_from_columns() {
        let columns = vec![
            ColumnDescriptor::new("id", "integer")
                .primary_key()
                .auto_increment()
                .with_default("nextval('users_id_seq'::regclass)"),
            ColumnDescriptor::new("name", "character varying(40)").not_null(),
            ColumnDescriptor::new("active", "boolean").with_default("true"),
        ];
        let ddl = create_table_ddl("users", &columns).unwrap();
        assert_eq!(
            ddl,
            "CREATE TABLE \"users\" (\n    \"id\" integer GENERATED BY DEFAULT AS IDENTITY NOT NULL,\n    \"name\" character varying(40) NOT NULL,\n    \"active\" boolean DEFAULT true,\n    PRIMARY KEY (\"id\")\n)"
        );
    }

    #[test]
    fn composite_primary_key() {
        let columns = vec![
            ColumnDescriptor::new("order_id", "integer").primary_key(),
            ColumnDescriptor::new("line", "integer").primary_key(),
        ];
        let ddl = create_table_ddl("order_lines", &columns).unwrap();
        assert!(ddl.contains("PRIMARY KEY (\"order_id\", \"line\")"));
    }
}
