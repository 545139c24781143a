use std::error::Error;

use chrono::NaiveDateTime;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes::{BufMut, BytesMut};

use crate::types::RowValues;

type BoxError = Box<dyn Error + Sync + Send>;

pub(crate) fn as_refs(params: &[RowValues]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

fn variant_name(value: &RowValues) -> &'static str {
    match value {
        RowValues::Int(_) => "Int",
        RowValues::Float(_) => "Float",
        RowValues::Text(_) => "Text",
        RowValues::Bool(_) => "Bool",
        RowValues::Timestamp(_) => "Timestamp",
        RowValues::Null => "Null",
        RowValues::JSON(_) => "JSON",
        RowValues::Blob(_) => "Blob",
    }
}

fn mismatch(kind: &str, ty: &Type) -> BoxError {
    format!("cannot bind a {kind} value to a {ty} parameter").into()
}

#[allow(clippy::cast_precision_loss)]
fn int_to_sql(i: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(i)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(i)?.to_sql(ty, out),
        Type::INT8 => i.to_sql(ty, out),
        Type::FLOAT4 => (i as f32).to_sql(ty, out),
        Type::FLOAT8 => (i as f64).to_sql(ty, out),
        Type::NUMERIC => {
            write_integer_numeric(i, out);
            Ok(IsNull::No)
        }
        _ => Err(mismatch("Int", ty)),
    }
}

/// Binary `numeric` for a whole number: base-10000 digits, most significant first.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn write_integer_numeric(i: i64, out: &mut BytesMut) {
    let mut rest = i.unsigned_abs();
    let mut digits = Vec::new();
    while rest > 0 {
        // always < 10000
        digits.push((rest % 10_000) as i16);
        rest /= 10_000;
    }
    digits.reverse();
    let weight = digits.len().saturating_sub(1);
    while digits.last() == Some(&0) {
        digits.pop();
    }

    out.put_i16(digits.len() as i16);
    out.put_i16(weight as i16);
    out.put_u16(if i < 0 { 0x4000 } else { 0x0000 });
    out.put_u16(0);
    for d in digits {
        out.put_i16(d);
    }
}

#[allow(clippy::cast_possible_truncation)]
fn float_to_sql(f: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT8 => f.to_sql(ty, out),
        Type::FLOAT4 => {
            if f.is_finite() && f.abs() > f64::from(f32::MAX) {
                return Err(format!("{f} does not fit in a float4 parameter").into());
            }
            (f as f32).to_sql(ty, out)
        }
        _ => Err(mismatch("Float", ty)),
    }
}

fn text_to_sql(s: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::TEXT | Type::VARCHAR | Type::NAME | Type::BPCHAR => s.to_sql(ty, out),
        Type::CHAR => match s.as_bytes() {
            [b] => i8::from_ne_bytes([*b]).to_sql(ty, out),
            _ => Err(format!("a \"char\" parameter takes exactly one byte, got {s:?}").into()),
        },
        _ => Err(mismatch("Text", ty)),
    }
}

fn timestamp_to_sql(dt: &NaiveDateTime, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::TIMESTAMP => dt.to_sql(ty, out),
        Type::TIMESTAMPTZ => dt.and_utc().to_sql(ty, out),
        Type::DATE => dt.date().to_sql(ty, out),
        _ => Err(mismatch("Timestamp", ty)),
    }
}

impl ToSql for RowValues {
    /// Encodes the value for the parameter type the server inferred.
    ///
    /// Integers widen to floats and `numeric`, and narrow to `int2`/`int4` when they fit.
    /// Any other pairing is an error rather than a reinterpretation of the bytes.
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            RowValues::Null => Ok(IsNull::Yes),
            RowValues::Int(i) => int_to_sql(*i, ty, out),
            RowValues::Float(f) => float_to_sql(*f, ty, out),
            RowValues::Text(s) => text_to_sql(s, ty, out),
            RowValues::Bool(b) if *ty == Type::BOOL => b.to_sql(ty, out),
            RowValues::Timestamp(dt) => timestamp_to_sql(dt, ty, out),
            RowValues::JSON(v) if matches!(*ty, Type::JSON | Type::JSONB) => v.to_sql(ty, out),
            RowValues::Blob(bytes) if *ty == Type::BYTEA => bytes.to_sql(ty, out),
            other => Err(mismatch(variant_name(other), ty)),
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::NUMERIC
                | Type::TEXT
                | Type::VARCHAR
                | Type::NAME
                | Type::BPCHAR
                | Type::CHAR
                | Type::BOOL
                | Type::TIMESTAMP
                | Type::TIMESTAMPTZ
                | Type::DATE
                | Type::JSON
                | Type::JSONB
                | Type::BYTEA
        )
    }

    to_sql_checked!();
}
