use std::error::Error;

use bytes::BytesMut;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::databases::table::Value;

type BoxError = Box<dyn Error + Sync + Send>;

fn is_text(ty: &Type) -> bool {
    return matches!(*ty, Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME);
}

fn parse_bool(text: &str) -> Result<bool, BoxError> {
    return match text.trim().to_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" => Ok(true),
        "f" | "false" | "n" | "no" | "off" => Ok(false),
        other => Ok(other.parse::<i64>()? != 0),
    };
}

fn write_integer(num: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    return match *ty {
        Type::INT8 => num.to_sql(ty, out),
        Type::INT4 => i32::try_from(num)?.to_sql(ty, out),
        Type::INT2 => i16::try_from(num)?.to_sql(ty, out),
        Type::BOOL => (num != 0).to_sql(ty, out),
        Type::FLOAT8 => (num as f64).to_sql(ty, out),
        Type::FLOAT4 => (num as f32).to_sql(ty, out),
        Type::NUMERIC => Decimal::from(num).to_sql(ty, out),
        _ if is_text(ty) => num.to_string().to_sql(ty, out),
        _ => Err(format!("Unsupported conversion of integer into {ty}").into()),
    };
}

fn write_text(text: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    return match *ty {
        _ if is_text(ty) => text.to_sql(ty, out),
        Type::INT2 | Type::INT4 | Type::INT8 => write_integer(text.trim().parse()?, ty, out),
        Type::FLOAT8 => text.trim().parse::<f64>()?.to_sql(ty, out),
        Type::FLOAT4 => text.trim().parse::<f32>()?.to_sql(ty, out),
        Type::NUMERIC => text.trim().parse::<Decimal>()?.to_sql(ty, out),
        Type::BOOL => parse_bool(text)?.to_sql(ty, out),
        Type::BYTEA => text.as_bytes().to_sql(ty, out),
        Type::TIMESTAMP => {
            NaiveDateTime::parse_from_str(text.trim(), "%Y-%m-%d %H:%M:%S%.f")?.to_sql(ty, out)
        }
        Type::DATE => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")?.to_sql(ty, out),
        Type::TIME => NaiveTime::parse_from_str(text.trim(), "%H:%M:%S%.f")?.to_sql(ty, out),
        _ => Err(format!("Unsupported conversion of text into {ty}").into()),
    };
}

/// Values are adapted to the destination parameter type, so a MySQL `int`
/// lands in `SMALLINT`, `BOOLEAN` or `TEXT` columns alike.
impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        return match (self, ty) {
            (Value::Null, _) => Ok(IsNull::Yes),
            (Value::I64(num), _) => write_integer(*num, ty, out),
            (Value::Bool(val), &Type::BOOL) => val.to_sql(ty, out),
            (Value::Bool(val), _) => write_integer(i64::from(*val), ty, out),
            (Value::F64(num), &Type::FLOAT8) => num.to_sql(ty, out),
            (Value::F64(num), &Type::FLOAT4) => (*num as f32).to_sql(ty, out),
            (Value::F64(num), &Type::NUMERIC) => Decimal::try_from(*num)?.to_sql(ty, out),
            (Value::F64(num), _) if is_text(ty) => num.to_string().to_sql(ty, out),
            (Value::Decimal(num), &Type::NUMERIC) => num.to_sql(ty, out),
            (Value::Decimal(num), &Type::FLOAT8) => num
                .to_f64()
                .ok_or("Decimal out of double precision range")?
                .to_sql(ty, out),
            (Value::Decimal(num), &Type::FLOAT4) => num
                .to_f32()
                .ok_or("Decimal out of real range")?
                .to_sql(ty, out),
            (Value::Decimal(num), &Type::INT2 | &Type::INT4 | &Type::INT8) => {
                write_integer(i64::try_from(*num)?, ty, out)
            }
            (Value::Decimal(num), _) if is_text(ty) => num.to_string().to_sql(ty, out),
            (Value::String(text), _) => write_text(text, ty, out),
            (Value::Bytes(bytes), &Type::BYTEA) => bytes.to_sql(ty, out),
            (Value::Bytes(bytes), _) => write_text(std::str::from_utf8(bytes)?, ty, out),
            (Value::Timestamp(ts), &Type::TIMESTAMP) => ts.to_sql(ty, out),
            (Value::Timestamp(ts), &Type::TIMESTAMPTZ) => ts.and_utc().to_sql(ty, out),
            (Value::Timestamp(ts), &Type::DATE) => ts.date().to_sql(ty, out),
            (Value::Timestamp(ts), _) if is_text(ty) => ts.to_string().to_sql(ty, out),
            (Value::Date(date), &Type::DATE) => date.to_sql(ty, out),
            (Value::Date(date), &Type::TIMESTAMP) => date
                .and_hms_opt(0, 0, 0)
                .ok_or("Invalid midnight")?
                .to_sql(ty, out),
            (Value::Date(date), _) if is_text(ty) => date.to_string().to_sql(ty, out),
            (Value::Time(time), &Type::TIME) => time.to_sql(ty, out),
            (Value::Time(time), _) if is_text(ty) => time.to_string().to_sql(ty, out),
            (value, ty) => Err(format!("Unsupported conversion of {value:?} into {ty}").into()),
        };
    }

    fn accepts(_ty: &Type) -> bool {
        return true;
    }

    to_sql_checked!();
}
