//! SQL dialect differences that matter for rendering: identifier quoting and
//! literal escaping.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Target database dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Backtick-quoted identifiers, backslash-escaped string literals.
    #[default]
    MySql,
    /// Double-quoted identifiers, standard-conforming string literals.
    Postgres,
}

impl Dialect {
    /// The identifier quote character.
    pub fn quote_char(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Postgres => '"',
        }
    }

    /// Append `name` as a quoted identifier, doubling any embedded quote character.
    pub fn write_quoted_ident(self, name: &str, out: &mut String) {
        let q = self.quote_char();
        out.push(q);
        for ch in name.chars() {
            if ch == q {
                out.push(q);
            }
            out.push(ch);
        }
        out.push(q);
    }

    /// Render a string as a SQL string literal.
    pub fn quote_str(self, s: &str) -> String {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('\'');
        match self {
            Dialect::MySql => {
                for ch in s.chars() {
                    match ch {
                        '\\' => out.push_str("\\\\"),
                        '\'' => out.push_str("\\'"),
                        '"' => out.push_str("\\\""),
                        '\0' => out.push_str("\\0"),
                        c => out.push(c),
                    }
                }
            }
            Dialect::Postgres => {
                for ch in s.chars() {
                    if ch == '\'' {
                        out.push('\'');
                    }
                    out.push(ch);
                }
            }
        }
        out.push('\'');
        out
    }

    /// Render a JSON value (as read back from the database) as a SQL literal.
    pub fn quote_literal(self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => match self {
                Dialect::MySql => if *b { "1" } else { "0" }.to_string(),
                Dialect::Postgres => if *b { "TRUE" } else { "FALSE" }.to_string(),
            },
            Value::Number(n) => n.to_string(),
            Value::String(s) => self.quote_str(s),
            other => self.quote_str(&other.to_string()),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::MySql => f.write_str("mysql"),
            Dialect::Postgres => f.write_str("postgres"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quotes_identifiers_per_dialect() {
        let mut out = String::new();
        Dialect::MySql.write_quoted_ident("we`ird", &mut out);
        assert_eq!(out, "`we``ird`");

        let mut out = String::new();
        Dialect::Postgres.write_quoted_ident(r#"Camel"Case"#, &mut out);
        assert_eq!(out, r#""Camel""Case""#);
    }

    #[test]
    fn mysql_literals_use_backslash_escapes() {
        assert_eq!(Dialect::MySql.quote_str("O'Brien"), r"'O\'Brien'");
        assert_eq!(Dialect::MySql.quote_str(r"C:\tmp"), r"'C:\\tmp'");
    }

    #[test]
    fn postgres_literals_double_quotes() {
        assert_eq!(Dialect::Postgres.quote_str("O'Brien"), "'O''Brien'");
    }

    #[test]
    fn literal_for_json_values() {
        assert_eq!(Dialect::MySql.quote_literal(&Value::Null), "NULL");
        assert_eq!(Dialect::MySql.quote_literal(&json!(true)), "1");
        assert_eq!(Dialect::Postgres.quote_literal(&json!(false)), "FALSE");
        assert_eq!(Dialect::Postgres.quote_literal(&json!(42)), "42");
        assert_eq!(
            Dialect::Postgres.quote_literal(&json!({"a": 1})),
            r#"'{"a":1}'"#
        );
    }
}
