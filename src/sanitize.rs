//! Value clean-up applied to every source value before it is written.
//!
//! MySQL accepts "zero" dates and invalid calendar dates that PostgreSQL has
//! no representation for, those become NULL.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::databases::table::{ColumnDescriptor, ColumnType, Row, Value};

pub const ZERO_DATETIME: &str = "0000-00-00 00:00:00";
pub const ZERO_DATE: &str = "0000-00-00";

pub fn is_zero_datetime(value: &str) -> bool {
    let value = value.trim();
    if value == ZERO_DATE || value == ZERO_DATETIME {
        return true;
    }
    // Fractional seconds, e.g. `0000-00-00 00:00:00.000000`
    return value
        .strip_prefix(ZERO_DATETIME)
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|fraction| fraction.chars().all(|c| c == '0'));
}

fn parses_as(column_type: ColumnType, value: &str) -> bool {
    let value = value.trim();
    return match column_type {
        ColumnType::Timestamp => {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f").is_ok()
                || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        }
        ColumnType::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
        ColumnType::Time => NaiveTime::parse_from_str(value, "%H:%M:%S%.f").is_ok(),
        _ => true,
    };
}

fn is_invalid_text(text: &str, column: &ColumnDescriptor) -> bool {
    if is_zero_datetime(text) {
        return true;
    }
    let column_type = column.value_type();
    if column_type.is_temporal() && !parses_as(column_type, text) {
        return true;
    }
    return column.name.to_lowercase().contains("date")
        && (text.trim().is_empty() || text.contains("NaN"));
}

pub fn sanitize_value(value: Value, column: &ColumnDescriptor) -> Value {
    if let Value::String(text) = &value {
        if is_invalid_text(text, column) {
            return Value::Null;
        }
    }
    return value;
}

pub fn sanitize_row(row: Row, columns: &[ColumnDescriptor]) -> Row {
    return std::iter::zip(row, columns)
        .map(|(value, column)| sanitize_value(value, column))
        .collect();
}
