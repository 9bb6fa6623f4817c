use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use dbdesk::{ColumnDescriptor, Row};
use serde::Serialize;
use serde_json::Value;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn header(names: impl IntoIterator<Item = impl Into<String>>) -> Vec<Cell> {
    names
        .into_iter()
        .map(|n| {
            let n: String = n.into();
            Cell::new(n)
                .add_attribute(Attribute::Bold)
                .fg(Color::Cyan)
        })
        .collect()
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => "(null)".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Result rows; columns in the order of the first row.
pub fn rows_table(rows: &[Row]) -> Table {
    let mut table = new_table();
    let Some(first) = rows.first() else {
        return table;
    };
    let columns: Vec<&String> = first.keys().collect();
    table.set_header(header(columns.iter().map(|c| c.as_str())));

    for row in rows {
        table.add_row(columns.iter().map(|c| {
            let value = row.get(c.as_str()).unwrap_or(&Value::Null);
            let cell = Cell::new(value_text(value));
            if value.is_null() {
                cell.fg(Color::DarkGrey)
            } else {
                cell
            }
        }));
    }
    table
}

pub fn columns_table(columns: &[ColumnDescriptor]) -> Table {
    let mut table = new_table();
    table.set_header(header(["Column", "Type", "Nullable", "Key", "Default"]));

    for c in columns {
        let key = match (c.is_primary_key, c.is_auto_increment) {
            (true, true) => "PRI, auto",
            (true, false) => "PRI",
            (false, true) => "auto",
            (false, false) => "",
        };
        table.add_row(vec![
            Cell::new(&c.name).fg(Color::Yellow),
            Cell::new(&c.sql_type),
            Cell::new(if c.nullable { "YES" } else { "NO" }),
            Cell::new(key),
            Cell::new(c.default_value.as_deref().unwrap_or("")).fg(Color::DarkGrey),
        ]);
    }
    table
}

pub fn names_table(title: &str, names: &[String]) -> Table {
    let mut table = new_table();
    table.set_header(header([title]));
    for name in names {
        table.add_row(vec![Cell::new(name)]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn value_text_forms() {
        assert_eq!(value_text(&json!(null)), "(null)");
        assert_eq!(value_text(&json!("a b")), "a b");
        assert_eq!(value_text(&json!(12)), "12");
        assert_eq!(value_text(&json!(true)), "true");
    }

    #[test]
    fn rows_table_lists_every_row() {
        let mut row = Row::new();
        row.insert("id".into(), json!(1));
        row.insert("name".into(), json!("alice"));
        let mut second = row.clone();
        second.insert("name".into(), json!(null));

        let rendered = rows_table(&[row, second]).to_string();
        assert!(rendered.contains("id"));
        assert!(rendered.contains("alice"));
        assert!(rendered.contains("(null)"));
    }
}
