//! Lexical helpers for SQL text.
//!
//! These never parse SQL. They only split text into code and non-code
//! segments (string literals, quoted identifiers, comments) so callers can look
//! for keywords and placeholders without being fooled by quoted content.

use crate::dialect::Dialect;
use crate::statement::StatementKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SegmentKind {
    Code,
    Literal,
    QuotedIdent,
    Comment,
}

/// A byte range of the input. Boundaries always fall on ASCII delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Segment {
    pub kind: SegmentKind,
    pub start: usize,
    pub end: usize,
}

/// Split `sql` into code and non-code segments.
///
/// Unterminated literals and comments run to the end of the input.
pub(crate) fn segments(sql: &str, dialect: Dialect) -> Vec<Segment> {
    let bytes = sql.as_bytes();
    let ident_quote = dialect.quote_char() as u8;
    let mysql = dialect == Dialect::MySql;

    let mut out = Vec::new();
    let mut i = 0;
    let mut code_start = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let (kind, end) = match b {
            b'\'' => (SegmentKind::Literal, scan_quoted(bytes, i, b'\'', mysql)),
            b'"' if mysql => (SegmentKind::Literal, scan_quoted(bytes, i, b'"', true)),
            q if q == ident_quote => (SegmentKind::QuotedIdent, scan_quoted(bytes, i, q, false)),
            b'-' if bytes.get(i + 1) == Some(&b'-') => (SegmentKind::Comment, line_end(bytes, i)),
            b'#' if mysql => (SegmentKind::Comment, line_end(bytes, i)),
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = sql[i + 2..]
                    .find("*/")
                    .map(|p| i + 2 + p + 2)
                    .unwrap_or(bytes.len());
                (SegmentKind::Comment, end)
            }
            b'$' if !mysql => match scan_dollar_quoted(sql, i) {
                Some(end) => (SegmentKind::Literal, end),
                None => {
                    i += 1;
                    continue;
                }
            },
            _ => {
                i += 1;
                continue;
            }
        };

        if code_start < i {
            out.push(Segment {
                kind: SegmentKind::Code,
                start: code_start,
                end: i,
            });
        }
        out.push(Segment { kind, start: i, end });
        i = end;
        code_start = end;
    }

    if code_start < bytes.len() {
        out.push(Segment {
            kind: SegmentKind::Code,
            start: code_start,
            end: bytes.len(),
        });
    }
    out
}

fn scan_quoted(bytes: &[u8], start: usize, quote: u8, backslash_escapes: bool) -> usize {
    let mut j = start + 1;
    while j < bytes.len() {
        let b = bytes[j];
        if backslash_escapes && b == b'\\' {
            j += 2;
            continue;
        }
        if b == quote {
            if bytes.get(j + 1) == Some(&quote) {
                j += 2;
                continue;
            }
            return j + 1;
        }
        j += 1;
    }
    bytes.len()
}

fn line_end(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|p| start + p + 1)
        .unwrap_or(bytes.len())
}

/// `$tag$ ... $tag$`. Returns `None` for `$1` style positional parameters.
fn scan_dollar_quoted(sql: &str, start: usize) -> Option<usize> {
    let rest = &sql[start + 1..];
    let tag_len = rest
        .bytes()
        .position(|b| !(b == b'_' || b.is_ascii_alphanumeric()))?;
    if rest.as_bytes()[tag_len] != b'$' {
        return None;
    }
    if rest.as_bytes().first().is_some_and(|b| b.is_ascii_digit()) {
        return None;
    }
    let delimiter = &sql[start..start + 1 + tag_len + 1];
    let body_start = start + delimiter.len();
    let end = sql[body_start..]
        .find(delimiter)
        .map(|p| body_start + p + delimiter.len())
        .unwrap_or(sql.len());
    Some(end)
}

pub(crate) fn is_ident_byte(b: u8) -> bool {
    b == b'_' || b == b'$' || b.is_ascii_alphanumeric() || b >= 0x80
}

/// If `sql[at..]` starts with `keyword` as whole words, return the end offset.
///
/// Words of a multi-word keyword (`"ORDER BY"`) may be separated by any
/// whitespace.
pub(crate) fn keyword_at(sql: &str, at: usize, keyword: &str) -> Option<usize> {
    let bytes = sql.as_bytes();
    if at > 0 && is_ident_byte(bytes[at - 1]) {
        return None;
    }

    let mut pos = at;
    for (n, word) in keyword.split(' ').enumerate() {
        if n > 0 {
            let ws = bytes[pos..]
                .iter()
                .take_while(|b| b.is_ascii_whitespace())
                .count();
            if ws == 0 {
                return None;
            }
            pos += ws;
        }
        let candidate = bytes.get(pos..pos + word.len())?;
        if !candidate.eq_ignore_ascii_case(word.as_bytes()) {
            return None;
        }
        pos += word.len();
    }

    match bytes.get(pos) {
        Some(&b) if is_ident_byte(b) => None,
        _ => Some(pos),
    }
}

/// Find `keyword` outside quotes, comments and parentheses, at or after `from`.
///
/// Returns the start and end offsets of the match.
pub(crate) fn find_top_level_keyword(
    sql: &str,
    dialect: Dialect,
    keyword: &str,
    from: usize,
) -> Option<(usize, usize)> {
    let bytes = sql.as_bytes();
    let mut depth = 0usize;

    for seg in segments(sql, dialect) {
        if seg.kind != SegmentKind::Code {
            continue;
        }
        for pos in seg.start..seg.end {
            match bytes[pos] {
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                b if depth == 0 && pos >= from && b.is_ascii_alphabetic() => {
                    if let Some(end) = keyword_at(sql, pos, keyword) {
                        return Some((pos, end));
                    }
                }
                _ => {}
            }
        }
    }
    None
}

/// A `:name` placeholder occurrence. `start` points at the colon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Placeholder<'a> {
    pub start: usize,
    pub end: usize,
    pub name: &'a str,
}

/// Named placeholders in code segments. `::type` casts are skipped.
pub(crate) fn find_placeholders(sql: &str, dialect: Dialect) -> Vec<Placeholder<'_>> {
    let bytes = sql.as_bytes();
    let mut out = Vec::new();

    for seg in segments(sql, dialect) {
        if seg.kind != SegmentKind::Code {
            continue;
        }
        let mut pos = seg.start;
        while pos < seg.end {
            if bytes[pos] != b':' {
                pos += 1;
                continue;
            }
            if bytes.get(pos + 1) == Some(&b':') {
                pos += 2;
                continue;
            }
            let name_start = pos + 1;
            let starts_ident = bytes
                .get(name_start)
                .is_some_and(|b| *b == b'_' || b.is_ascii_alphabetic());
            if !starts_ident || name_start >= seg.end {
                pos += 1;
                continue;
            }
            let name_len = bytes[name_start..seg.end]
                .iter()
                .take_while(|b| **b == b'_' || b.is_ascii_alphanumeric())
                .count();
            let end = name_start + name_len;
            out.push(Placeholder {
                start: pos,
                end,
                name: &sql[name_start..end],
            });
            pos = end;
        }
    }
    out
}

/// Byte offsets of `;` terminators outside quotes and comments.
pub(crate) fn statement_terminators(sql: &str, dialect: Dialect) -> Vec<usize> {
    let bytes = sql.as_bytes();
    segments(sql, dialect)
        .into_iter()
        .filter(|seg| seg.kind == SegmentKind::Code)
        .flat_map(|seg| (seg.start..seg.end).filter(|&p| bytes[p] == b';'))
        .collect()
}

/// More than one statement: something other than whitespace or comments
/// follows a top-level `;`.
pub(crate) fn has_multiple_statements(sql: &str, dialect: Dialect) -> bool {
    statement_terminators(sql, dialect)
        .into_iter()
        .any(|p| !strip_sql_prefix(&sql[p + 1..]).trim_start_matches(';').trim().is_empty())
}

/// Skip leading whitespace, comments and opening parentheses.
pub(crate) fn strip_sql_prefix(sql: &str) -> &str {
    let mut s = sql;
    loop {
        let before = s;
        s = s.trim_start();
        if s.starts_with("--") || s.starts_with('#') {
            if let Some(pos) = s.find('\n') {
                s = &s[pos + 1..];
                continue;
            }
            return "";
        }
        if s.starts_with("/*") {
            if let Some(pos) = s.find("*/") {
                s = &s[pos + 2..];
                continue;
            }
            return "";
        }
        if s.starts_with('(') {
            s = &s[1..];
            continue;
        }
        if s == before {
            break;
        }
    }
    s
}

pub(crate) fn starts_with_keyword(s: &str, keyword: &str) -> bool {
    keyword_at(s, 0, keyword).is_some()
}

/// Statement kind from the leading keyword, for the four kinds the
/// synthesizer emits.
pub(crate) fn detect_kind(sql: &str) -> Option<StatementKind> {
    let s = strip_sql_prefix(sql);
    [
        ("SELECT", StatementKind::Select),
        ("INSERT", StatementKind::Insert),
        ("UPDATE", StatementKind::Update),
        ("DELETE", StatementKind::Delete),
    ]
    .into_iter()
    .find(|(kw, _)| starts_with_keyword(s, kw))
    .map(|(_, kind)| kind)
}

/// Free-text statements that produce a result set rather than a row count.
pub(crate) fn returns_rows(sql: &str) -> bool {
    let s = strip_sql_prefix(sql);
    ["SELECT", "SHOW", "DESCRIBE", "DESC", "EXPLAIN", "WITH", "VALUES", "TABLE"]
        .iter()
        .any(|kw| starts_with_keyword(s, kw))
        || keyword_search(s, "RETURNING")
}

fn keyword_search(sql: &str, keyword: &str) -> bool {
    sql.char_indices()
        .any(|(i, c)| c.is_ascii_alphabetic() && keyword_at(sql, i, keyword).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(sql: &str, dialect: Dialect) -> Vec<(SegmentKind, &str)> {
        segments(sql, dialect)
            .into_iter()
            .map(|s| (s.kind, &sql[s.start..s.end]))
            .collect()
    }

    #[test]
    fn segments_mysql_literals_and_idents() {
        let sql = r"SELECT `a``b` FROM t WHERE x = 'it\'s' -- tail";
        let segs = kinds(sql, Dialect::MySql);
        assert_eq!(
            segs,
            vec![
                (SegmentKind::Code, "SELECT "),
                (SegmentKind::QuotedIdent, "`a``b`"),
                (SegmentKind::Code, " FROM t WHERE x = "),
                (SegmentKind::Literal, r"'it\'s'"),
                (SegmentKind::Code, " "),
                (SegmentKind::Comment, "-- tail"),
            ]
        );
    }

    #[test]
    fn segments_postgres_dollar_quotes_and_positional_params() {
        let sql = "SELECT $$a;b$$, $1";
        let segs = kinds(sql, Dialect::Postgres);
        assert_eq!(
            segs,
            vec![
                (SegmentKind::Code, "SELECT "),
                (SegmentKind::Literal, "$$a;b$$"),
                (SegmentKind::Code, ", $1"),
            ]
        );
    }

    #[test]
    fn unterminated_literal_runs_to_end() {
        let segs = kinds("SELECT 'abc", Dialect::Postgres);
        assert_eq!(segs.last(), Some(&(SegmentKind::Literal, "'abc")));
    }

    #[test]
    fn top_level_keyword_skips_literals_and_subqueries() {
        let sql = "DELETE FROM t WHERE a IN (SELECT b FROM u WHERE c = 1) AND d = 'WHERE'";
        let (start, _) = find_top_level_keyword(sql, Dialect::MySql, "WHERE", 0).unwrap();
        assert_eq!(&sql[start..start + 5], "WHERE");
        assert_eq!(start, 14);
        assert!(find_top_level_keyword(sql, Dialect::MySql, "WHERE", start + 1).is_none());
    }

    #[test]
    fn keyword_requires_word_boundaries() {
        assert!(keyword_at("nowhere", 2, "WHERE").is_none());
        assert!(keyword_at("where_clause", 0, "WHERE").is_none());
        assert_eq!(keyword_at("order\n  by x", 0, "ORDER BY"), Some(10));
    }

    #[test]
    fn placeholders_skip_casts_and_literals() {
        let sql = "SELECT a::text FROM t WHERE b = :p0 AND c = ':p1' AND d IN (:p2,:p3)";
        let names: Vec<&str> = find_placeholders(sql, Dialect::Postgres)
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["p0", "p2", "p3"]);
    }

    #[test]
    fn placeholder_offsets_cover_colon_and_name() {
        let sql = "x = :p10";
        let ph = &find_placeholders(sql, Dialect::MySql)[0];
        assert_eq!(&sql[ph.start..ph.end], ":p10");
    }

    #[test]
    fn multiple_statements_detected_outside_literals() {
        assert!(has_multiple_statements("SELECT 1; DROP TABLE t", Dialect::MySql));
        assert!(!has_multiple_statements("SELECT ';DROP'", Dialect::MySql));
        assert!(!has_multiple_statements("DELETE FROM t WHERE id = 1;  -- done", Dialect::MySql));
    }

    #[test]
    fn detect_kind_after_comments() {
        assert_eq!(
            detect_kind("/* hi */ -- x\n update t set a = 1"),
            Some(StatementKind::Update)
        );
        assert_eq!(detect_kind("TRUNCATE TABLE t"), None);
        assert_eq!(detect_kind("selector"), None);
    }

    #[test]
    fn returns_rows_for_reads_and_returning() {
        assert!(returns_rows("show tables"));
        assert!(returns_rows("INSERT INTO t (a) VALUES (1) RETURNING id"));
        assert!(!returns_rows("UPDATE t SET a = 1"));
    }
}
