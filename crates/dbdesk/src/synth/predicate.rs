//! WHERE clause rendering shared by SELECT, UPDATE and DELETE.

use crate::error::{AdminError, AdminResult};
use crate::ident::Ident;
use crate::query_spec::Predicate;
use crate::schema::TableSchema;

use super::param::Binder;
use super::{InListMode, Synthesizer};

/// Append ` WHERE ...` if there is anything to filter on.
///
/// Structured predicates come first, in the order given, joined by `AND`. The
/// raw filter follows verbatim; it is parenthesized only when it has to be
/// AND-joined with structured predicates.
pub(super) fn write_where(
    synth: &Synthesizer,
    out: &mut String,
    schema: &TableSchema,
    predicates: &[Predicate],
    raw_filter: Option<&str>,
    binder: &mut Binder,
) -> AdminResult<()> {
    let raw_filter = raw_filter.filter(|r| !r.trim().is_empty());
    if predicates.is_empty() && raw_filter.is_none() {
        return Ok(());
    }

    out.push_str(" WHERE ");
    for (i, pred) in predicates.iter().enumerate() {
        if i > 0 {
            out.push_str(" AND ");
        }
        write_predicate(synth, out, schema, pred, binder)?;
    }

    if let Some(raw) = raw_filter {
        if predicates.is_empty() {
            out.push_str(raw.trim());
        } else {
            out.push_str(" AND (");
            out.push_str(raw.trim());
            out.push(')');
        }
    }
    Ok(())
}

fn write_predicate(
    synth: &Synthesizer,
    out: &mut String,
    schema: &TableSchema,
    pred: &Predicate,
    binder: &mut Binder,
) -> AdminResult<()> {
    schema.require_column(&pred.column)?;
    pred.check()?;

    Ident::new(&pred.column)?.write_sql(synth.dialect, out);
    out.push(' ');
    out.push_str(pred.operator.as_sql());

    if !pred.operator.takes_value() {
        return Ok(());
    }
    let value = pred.value.as_deref().unwrap_or_default();

    if pred.operator.is_list() {
        out.push_str(" (");
        match synth.in_list_mode {
            InListMode::Literal => out.push_str(value),
            InListMode::Bound => {
                let items = split_in_list(value)
                    .map_err(|msg| AdminError::invalid_predicate(&pred.column, msg))?;
                for (i, item) in items.into_iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    binder.push_bound(out, item);
                }
            }
        }
        out.push(')');
    } else {
        out.push(' ');
        binder.push_bound(out, value);
    }
    Ok(())
}

/// Split a comma-separated IN list into its elements.
///
/// Commas inside quotes do not split. Each element is trimmed and loses one
/// pair of matching surrounding quotes (`'a'` or `"a"`), with doubled or
/// backslash-escaped quotes inside unescaped.
pub fn split_in_list(value: &str) -> Result<Vec<String>, String> {
    let mut raw_items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(_), '\\') => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            (Some(q), c) if c == q => {
                current.push(c);
                quote = None;
            }
            (None, '\'' | '"') => {
                current.push(c);
                quote = Some(c);
            }
            (None, ',') => raw_items.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if quote.is_some() {
        return Err("unterminated quote in IN list".to_string());
    }
    raw_items.push(current);

    raw_items
        .iter()
        .map(|item| {
            let item = item.trim();
            if item.is_empty() {
                return Err("IN list contains an empty element".to_string());
            }
            Ok(unquote(item))
        })
        .collect()
}

fn unquote(item: &str) -> String {
    let bytes = item.as_bytes();
    let q = bytes[0];
    if item.len() >= 2 && (q == b'\'' || q == b'"') && bytes[item.len() - 1] == q {
        let q = q as char;
        let inner = &item[1..item.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else if c == q && chars.peek() == Some(&q) {
                chars.next();
                out.push(q);
            } else {
                out.push(c);
            }
        }
        out
    } else {
        item.to_string()
    }
}
