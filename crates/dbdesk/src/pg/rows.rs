//! Decode `tokio_postgres` rows into JSON rows.

use std::error::Error;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use tokio_postgres::types::{FromSql, Type};

use crate::statement::Row;

pub(crate) fn row_to_json(row: &tokio_postgres::Row) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| (col.name().to_string(), pg_value_to_json(row, idx, col.type_())))
        .collect()
}

fn get<'a, T: FromSql<'a>>(row: &'a tokio_postgres::Row, idx: usize) -> Option<T> {
    row.try_get::<_, Option<T>>(idx).ok().flatten()
}

fn pg_value_to_json(row: &tokio_postgres::Row, idx: usize, pg_type: &Type) -> Value {
    let value = match *pg_type {
        Type::BOOL => get::<bool>(row, idx).map(Value::Bool),
        Type::INT2 => get::<i16>(row, idx).map(|v| Value::Number(v.into())),
        Type::INT4 => get::<i32>(row, idx).map(|v| Value::Number(v.into())),
        Type::INT8 => get::<i64>(row, idx).map(|v| Value::Number(v.into())),
        Type::OID => get::<u32>(row, idx).map(|v| Value::Number(v.into())),
        Type::FLOAT4 => get::<f32>(row, idx)
            .and_then(|v| serde_json::Number::from_f64(v as f64))
            .map(Value::Number),
        Type::FLOAT8 => get::<f64>(row, idx)
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        Type::JSON | Type::JSONB => get::<Value>(row, idx),
        Type::UUID => get::<uuid::Uuid>(row, idx).map(|v| Value::String(v.to_string())),
        Type::DATE => get::<NaiveDate>(row, idx).map(|v| Value::String(v.to_string())),
        Type::TIME => get::<NaiveTime>(row, idx).map(|v| Value::String(v.to_string())),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, idx)
            .map(|v| Value::String(v.format("%Y-%m-%d %H:%M:%S%.f").to_string())),
        Type::TIMESTAMPTZ => get::<DateTime<Utc>>(row, idx).map(|v| Value::String(v.to_rfc3339())),
        Type::NUMERIC => get::<NumericText>(row, idx).map(|v| Value::String(v.0)),
        _ => get::<String>(row, idx)
            .map(Value::String)
            .or_else(|| get::<RawText>(row, idx).map(|v| Value::String(v.0))),
    };
    value.unwrap_or(Value::Null)
}

type BoxError = Box<dyn Error + Sync + Send>;

/// `NUMERIC` in its exact decimal text form.
struct NumericText(String);

impl<'a> FromSql<'a> for NumericText {
    fn from_sql(_: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        decode_numeric(raw).map(NumericText)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

/// Binary `NUMERIC`: ndigits, weight, sign, dscale, then base-10000 digits.
fn decode_numeric(raw: &[u8]) -> Result<String, BoxError> {
    let word = |i: usize| -> Result<u16, BoxError> {
        raw.get(i * 2..i * 2 + 2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
            .ok_or_else(|| "truncated numeric".into())
    };

    let ndigits = word(0)? as usize;
    let weight = word(1)? as i16 as i32;
    let sign = word(2)?;
    let dscale = word(3)? as usize;
    let digits = (0..ndigits)
        .map(|i| word(4 + i))
        .collect::<Result<Vec<_>, _>>()?;

    match sign {
        0xC000 => return Ok("NaN".to_string()),
        0xD000 => return Ok("Infinity".to_string()),
        0xF000 => return Ok("-Infinity".to_string()),
        _ => {}
    }

    let digit_at = |pos: i32| -> u16 {
        usize::try_from(pos)
            .ok()
            .and_then(|p| digits.get(p).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == 0x4000 {
        out.push('-');
    }

    // Integer part: groups 0..=weight.
    if weight < 0 {
        out.push('0');
    } else {
        for group in 0..=weight {
            let d = digit_at(group);
            if group == 0 {
                out.push_str(&d.to_string());
            } else {
                out.push_str(&format!("{d:04}"));
            }
        }
    }

    if dscale > 0 {
        out.push('.');
        let mut frac = String::new();
        let mut group = weight + 1;
        while frac.len() < dscale {
            frac.push_str(&format!("{:04}", digit_at(group)));
            group += 1;
        }
        frac.truncate(dscale);
        out.push_str(&frac);
    }
    Ok(out)
}

/// Any other type: its wire bytes as UTF-8 when they are, hex otherwise.
struct RawText(String);

impl<'a> FromSql<'a> for RawText {
    fn from_sql(_: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Ok(RawText(match std::str::from_utf8(raw) {
            Ok(s) => s.to_string(),
            Err(_) => {
                let hex: String = raw.iter().map(|b| format!("{b:02x}")).collect();
                format!("\\x{hex}")
            }
        }))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}
