//! Safe SQL identifier handling.
//!
//! Table and column names are structural: the wire protocol only binds values,
//! so identifiers are always interpolated into the statement text. [`Ident`]
//! guarantees they are rendered quoted for the target [`Dialect`]; callers are
//! still expected to check the name against the live catalog or schema first.
//!
//! - Quoted form allows any characters except NUL and doubles the quote character.
//! - Unquoted names read back from SQL text must match `[A-Za-z_][A-Za-z0-9_$]*`.
//!
//! # Example
//! ```ignore
//! use dbdesk::{Dialect, Ident};
//!
//! let t = Ident::new("order items")?;
//! assert_eq!(t.to_sql(Dialect::MySql), "`order items`");
//! # Ok::<(), dbdesk::AdminError>(())
//! ```

use crate::dialect::Dialect;
use crate::error::{AdminError, AdminResult};

/// A validated SQL identifier (table or column name).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    /// Create an identifier from a raw name.
    pub fn new(name: &str) -> AdminResult<Self> {
        if name.is_empty() {
            return Err(AdminError::validation("Identifier cannot be empty"));
        }
        if name.contains('\0') {
            return Err(AdminError::validation(
                "Identifier cannot contain NUL character",
            ));
        }
        Ok(Self(name.to_string()))
    }

    /// The unquoted name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut out = String::with_capacity(self.0.len() + 2);
        self.write_sql(dialect, &mut out);
        out
    }

    pub(crate) fn write_sql(&self, dialect: Dialect, out: &mut String) {
        dialect.write_quoted_ident(&self.0, out);
    }

    /// Read one identifier from the start of `s`, quoted or bare.
    ///
    /// Returns the identifier and the remaining input, or `None` if `s` does not
    /// start with a well-formed identifier.
    pub fn parse_prefix(s: &str, dialect: Dialect) -> Option<(Self, &str)> {
        let q = dialect.quote_char();
        let mut chars = s.char_indices().peekable();

        match chars.peek() {
            Some(&(_, c)) if c == q => {
                chars.next(); // opening quote
                let mut name = String::new();
                while let Some((i, c)) = chars.next() {
                    if c == q {
                        // Escaped quote: doubled
                        if matches!(chars.peek(), Some(&(_, next)) if next == q) {
                            chars.next();
                            name.push(q);
                        } else {
                            let rest = &s[i + c.len_utf8()..];
                            return Ident::new(&name).ok().map(|id| (id, rest));
                        }
                    } else {
                        name.push(c);
                    }
                }
                None
            }
            Some(&(_, c)) if c == '_' || c.is_ascii_alphabetic() => {
                let end = s
                    .char_indices()
                    .find(|&(_, c)| !(c == '_' || c == '$' || c.is_ascii_alphanumeric()))
                    .map(|(i, _)| i)
                    .unwrap_or(s.len());
                Ident::new(&s[..end]).ok().map(|id| (id, &s[end..]))
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
