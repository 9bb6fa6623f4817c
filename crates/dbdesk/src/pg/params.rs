//! Named placeholders to positional `$N` parameters, and string values encoded
//! per the parameter type the server inferred.

use std::collections::HashMap;
use std::error::Error;

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tokio_postgres::types::{IsNull, ToSql, Type};

use crate::dialect::Dialect;
use crate::sql_text::find_placeholders;
use crate::statement::Params;

/// SQL rewritten for the driver plus the values in positional order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BoundSql<'a> {
    pub sql: String,
    pub values: Vec<&'a str>,
}

/// Rewrite `:name` placeholders that have a value in `params` to `$N`.
///
/// Positions follow first appearance; a name used twice keeps one position.
/// When `casts[N - 1]` holds a type name, that parameter is sent as text and
/// cast on the server: `CAST($N::text AS <type>)`.
pub(crate) fn bind_named<'a>(sql: &str, params: &'a Params, casts: &[Option<String>]) -> BoundSql<'a> {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut values = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut last = 0;

    for ph in find_placeholders(sql, Dialect::Postgres) {
        let Some((name, value)) = params.get_key_value(ph.name) else {
            continue;
        };
        let pos = *positions.entry(name.as_str()).or_insert_with(|| {
            values.push(value.as_str());
            values.len()
        });

        out.push_str(&sql[last..ph.start]);
        match casts.get(pos - 1).and_then(Option::as_deref) {
            Some(type_name) => out.push_str(&format!("CAST(${pos}::text AS {type_name})")),
            None => out.push_str(&format!("${pos}")),
        }
        last = ph.end;
    }
    out.push_str(&sql[last..]);

    BoundSql { sql: out, values }
}

/// Schema-qualified, quoted name of a server type, for use in a cast.
pub(crate) fn cast_type_name(ty: &Type) -> String {
    let mut out = String::new();
    Dialect::Postgres.write_quoted_ident(ty.schema(), &mut out);
    out.push('.');
    Dialect::Postgres.write_quoted_ident(ty.name(), &mut out);
    out
}

/// A user-typed string bound to a parameter of whatever type the server
/// expects.
///
/// Scalars with a natural text form (booleans, integers, floats, uuid, json,
/// dates and timestamps) are parsed and sent in binary; text-like types are
/// sent as is. Everything else is refused here and routed through a server
/// side cast by [`bind_named`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct TextParam<'a>(pub &'a str);

type BoxError = Box<dyn Error + Sync + Send>;

fn parse_bool(s: &str) -> Result<bool, BoxError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "1" | "yes" | "y" | "on" => Ok(true),
        "f" | "false" | "0" | "no" | "n" | "off" => Ok(false),
        other => Err(format!("invalid boolean: {other:?}").into()),
    }
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, BoxError> {
    let s = s.trim();
    const FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];
    for fmt in FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ts);
        }
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")?;
    date.and_hms_opt(0, 0, 0)
        .ok_or_else(|| format!("invalid timestamp: {s:?}").into())
}

fn parse_timestamptz(s: &str) -> Result<DateTime<Utc>, BoxError> {
    let trimmed = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Ok(ts.with_timezone(&Utc));
    }
    Ok(parse_timestamp(trimmed)?.and_utc())
}

impl ToSql for TextParam<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        let s = self.0;
        match *ty {
            Type::BOOL => parse_bool(s)?.to_sql(ty, out),
            Type::INT2 => s.trim().parse::<i16>()?.to_sql(ty, out),
            Type::INT4 => s.trim().parse::<i32>()?.to_sql(ty, out),
            Type::INT8 => s.trim().parse::<i64>()?.to_sql(ty, out),
            Type::FLOAT4 => s.trim().parse::<f32>()?.to_sql(ty, out),
            Type::FLOAT8 => s.trim().parse::<f64>()?.to_sql(ty, out),
            Type::UUID => uuid::Uuid::parse_str(s.trim())?.to_sql(ty, out),
            Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out),
            Type::DATE => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?.to_sql(ty, out),
            Type::TIMESTAMP => parse_timestamp(s)?.to_sql(ty, out),
            Type::TIMESTAMPTZ => parse_timestamptz(s)?.to_sql(ty, out),
            _ => s.to_sql(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::BOOL
                | Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::UUID
                | Type::JSON
                | Type::JSONB
                | Type::DATE
                | Type::TIMESTAMP
                | Type::TIMESTAMPTZ
        ) || <&str as ToSql>::accepts(ty)
    }

    tokio_postgres::types::to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn rewrites_in_order_of_appearance() {
        let p = params(&[("p0", "Alice"), ("p1", "7")]);
        let bound = bind_named(r#"UPDATE "users" SET "name" = :p0 WHERE "id" = :p1"#, &p, &[]);
        assert_eq!(bound.sql, r#"UPDATE "users" SET "name" = $1 WHERE "id" = $2"#);
        assert_eq!(bound.values, vec!["Alice", "7"]);
    }

    #[test]
    fn skips_literals_casts_and_unknown_names() {
        let p = params(&[("p0", "x")]);
        let bound = bind_named(
            "SELECT ':p0', a::text, :other FROM t WHERE b = :p0 AND c = :p0",
            &p,
            &[],
        );
        assert_eq!(
            bound.sql,
            "SELECT ':p0', a::text, :other FROM t WHERE b = $1 AND c = $1"
        );
        assert_eq!(bound.values, vec!["x"]);
    }

    #[test]
    fn high_placeholder_numbers_are_not_prefix_matched() {
        let p = params(&[("p1", "one"), ("p10", "ten")]);
        let bound = bind_named("a = :p10 AND b = :p1", &p, &[]);
        assert_eq!(bound.sql, "a = $1 AND b = $2");
        assert_eq!(bound.values, vec!["ten", "one"]);
    }

    #[test]
    fn casts_unsupported_types_on_the_server() {
        let p = params(&[("p0", "12.50"), ("p1", "3")]);
        let casts = vec![Some(cast_type_name(&Type::NUMERIC)), None];
        let bound = bind_named("a = :p0 AND b = :p1", &p, &casts);
        assert_eq!(
            bound.sql,
            r#"a = CAST($1::text AS "pg_catalog"."numeric") AND b = $2"#
        );
    }

    #[test]
    fn text_param_type_support() {
        assert!(TextParam::accepts(&Type::INT4));
        assert!(TextParam::accepts(&Type::VARCHAR));
        assert!(TextParam::accepts(&Type::TIMESTAMPTZ));
        assert!(!TextParam::accepts(&Type::NUMERIC));
        assert!(!TextParam::accepts(&Type::INET));
    }

    #[test]
    fn encodes_per_server_type() {
        let mut buf = BytesMut::new();
        TextParam(" 42 ").to_sql(&Type::INT4, &mut buf).unwrap();
        assert_eq!(&buf[..], &42i32.to_be_bytes());

        let mut buf = BytesMut::new();
        assert!(TextParam("abc").to_sql(&Type::INT8, &mut buf).is_err());

        let mut buf = BytesMut::new();
        TextParam("yes").to_sql(&Type::BOOL, &mut buf).unwrap();
        assert_eq!(&buf[..], &[1u8]);
    }

    #[test]
    fn timestamps_accept_common_forms() {
        assert!(parse_timestamp("2024-05-01 10:20:30").is_ok());
        assert!(parse_timestamp("2024-05-01T10:20:30.5").is_ok());
        assert!(parse_timestamp("2024-05-01").is_ok());
        assert!(parse_timestamptz("2024-05-01T10:20:30+02:00").is_ok());
        assert!(parse_timestamptz("2024-05-01 10:20:30").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }
}
