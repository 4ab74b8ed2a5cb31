use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::databases::table::{ColumnDescriptor, ColumnType, Value};
use crate::sanitize::ZERO_DATETIME;

fn raw_text(val: &mysql::Value) -> String {
    return match val {
        mysql::Value::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        other => other.as_sql(true),
    };
}

impl From<(&ColumnDescriptor, mysql::Value)> for Value {
    /// Values that do not fit the declared column type are kept as text,
    /// the sanitizer and the destination decide what happens to them.
    fn from(value: (&ColumnDescriptor, mysql::Value)) -> Self {
        let (column, val) = value;
        if val == mysql::Value::NULL {
            return Value::Null;
        }
        if let mysql::Value::Date(0, 0, 0, _, _, _, _) = val {
            return Value::String(ZERO_DATETIME.to_string());
        }
        let parsed = match column.value_type() {
            ColumnType::Bool => match &val {
                // bit(1) arrives as a raw byte, not as a digit
                mysql::Value::Bytes(bytes) if column.data_type == "bit" => {
                    Ok(Value::Bool(bytes.iter().any(|byte| *byte != 0)))
                }
                _ => mysql::from_value_opt::<bool>(val.clone()).map(Value::Bool),
            },
            ColumnType::Integer => mysql::from_value_opt::<i64>(val.clone()).map(Value::I64),
            ColumnType::Float => mysql::from_value_opt::<f64>(val.clone()).map(Value::F64),
            ColumnType::Decimal => {
                mysql::from_value_opt::<Decimal>(val.clone()).map(Value::Decimal)
            }
            ColumnType::String => mysql::from_value_opt::<String>(val.clone()).map(Value::String),
            ColumnType::Bytes => mysql::from_value_opt::<Vec<u8>>(val.clone()).map(Value::Bytes),
            ColumnType::Timestamp => {
                mysql::from_value_opt::<NaiveDateTime>(val.clone()).map(Value::Timestamp)
            }
            ColumnType::Date => mysql::from_value_opt::<NaiveDate>(val.clone()).map(Value::Date),
            ColumnType::Time => mysql::from_value_opt::<NaiveTime>(val.clone()).map(Value::Time),
        };
        return parsed.unwrap_or_else(|_| Value::String(raw_text(&val)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn column(data_type: &str, length: Option<u64>) -> ColumnDescriptor {
        let mut column = ColumnDescriptor::new("field", data_type);
        column.max_length = length;
        return column;
    }

    fn text(value: &str) -> mysql::Value {
        return mysql::Value::Bytes(value.as_bytes().to_vec());
    }

    #[test]
    fn test_null() {
        let value = Value::from((&column("int", None), mysql::Value::NULL));
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_integer_from_text_protocol() {
        let value = Value::from((&column("int", None), text("2147483647")));
        assert_eq!(value, Value::I64(2147483647));
    }

    #[test]
    fn test_tinyint_1_is_bool() {
        let value = Value::from((&column("tinyint", Some(1)), text("1")));
        assert_eq!(value, Value::Bool(true));
    }

    #[test]
    fn test_bit_1_is_bool() {
        let bit = column("bit", Some(1));
        assert_eq!(
            Value::from((&bit, mysql::Value::Bytes(vec![1]))),
            Value::Bool(true)
        );
        assert_eq!(
            Value::from((&bit, mysql::Value::Bytes(vec![0]))),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_timestamp() {
        let value = Value::from((&column("datetime", None), text("2004-10-19 10:23:54")));
        let expected = NaiveDate::from_ymd_opt(2004, 10, 19)
            .unwrap()
            .and_hms_opt(10, 23, 54)
            .unwrap();
        assert_eq!(value, Value::Timestamp(expected));
    }

    #[test]
    fn test_zero_datetime_kept_as_text() {
        let value = Value::from((&column("datetime", None), text("0000-00-00 00:00:00")));
        assert_eq!(value, Value::String("0000-00-00 00:00:00".to_string()));
    }

    #[test]
    fn test_binary_zero_date() {
        let value = Value::from((
            &column("datetime", None),
            mysql::Value::Date(0, 0, 0, 0, 0, 0, 0),
        ));
        assert_eq!(value, Value::String(ZERO_DATETIME.to_string()));
    }

    #[test]
    fn test_unsigned_overflow_falls_back_to_text() {
        let value = Value::from((&column("bigint", None), text("18446744073709551615")));
        assert_eq!(value, Value::String("18446744073709551615".to_string()));
    }

    #[test]
    fn test_decimal() {
        let value = Value::from((&column("decimal", None), text("123.45")));
        assert_eq!(value, Value::Decimal(Decimal::new(12345, 2)));
    }
}
