use crate::databases::table::ColumnDescriptor;
use crate::sanitize::is_zero_datetime;

const DEFAULT_ENUM_LENGTH: u64 = 50;

fn serial_type(data_type: &str) -> Option<&'static str> {
    return match data_type {
        "tinyint" | "smallint" => Some("SMALLSERIAL"),
        "mediumint" | "int" | "integer" => Some("SERIAL"),
        "bigint" => Some("BIGSERIAL"),
        _ => None,
    };
}

/// Longest member of `enum('a','bb')` / `set(...)`.
fn longest_member(column_type: &str) -> Option<u64> {
    let start = column_type.find('(')?;
    let end = column_type.rfind(')')?;
    if end <= start {
        return None;
    }
    return column_type[start + 1..end]
        .split(',')
        .map(|member| {
            let member = member.trim().trim_matches('\'').replace("''", "'");
            member.chars().count() as u64
        })
        .max();
}

/// PostgreSQL type of a MySQL column. Unknown types become `TEXT`.
pub fn map_type(column: &ColumnDescriptor) -> String {
    let data_type = column.data_type.trim().to_lowercase();
    if column.auto_increment {
        if let Some(serial) = serial_type(&data_type) {
            return serial.to_string();
        }
    }
    let length = column.max_length;
    let pg_type = match data_type.as_str() {
        "tinyint" if length == Some(1) => "BOOLEAN",
        "bit" if length.is_none() || length == Some(1) => "BOOLEAN",
        "bool" | "boolean" => "BOOLEAN",
        "tinyint" | "smallint" | "year" => "SMALLINT",
        "mediumint" | "int" | "integer" => "INTEGER",
        "bigint" => "BIGINT",
        "varchar" => return format!("VARCHAR({})", length.unwrap_or(255)),
        "char" => return format!("CHAR({})", length.unwrap_or(1)),
        "tinytext" | "text" | "mediumtext" | "longtext" => "TEXT",
        "datetime" | "timestamp" => "TIMESTAMP",
        "date" => "DATE",
        "time" => "TIME",
        "decimal" | "numeric" => {
            return match column.precision {
                Some(precision) => format!("DECIMAL({precision},{})", column.scale.unwrap_or(0)),
                None => "DECIMAL".to_string(),
            };
        }
        "float" => "REAL",
        "double" | "double precision" | "real" => "DOUBLE PRECISION",
        "binary" | "varbinary" | "tinyblob" | "blob" | "mediumblob" | "longblob" | "bit" => {
            "BYTEA"
        }
        "enum" | "set" => {
            let length = length
                .or_else(|| longest_member(&column.column_type))
                .unwrap_or(DEFAULT_ENUM_LENGTH);
            return format!("VARCHAR({length})");
        }
        _ => "TEXT",
    };
    return pg_type.to_string();
}

fn is_current_timestamp(value: &str) -> bool {
    let upper = value.trim().to_uppercase();
    let Some(rest) = upper.strip_prefix("CURRENT_TIMESTAMP") else {
        return false;
    };
    if rest.is_empty() {
        return true;
    }
    return rest
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .is_some_and(|precision| precision.chars().all(|c| c.is_ascii_digit()));
}

fn unquote(value: &str) -> Option<String> {
    let inner = value.strip_prefix('\'')?.strip_suffix('\'')?;
    return Some(inner.replace("''", "'"));
}

/// `DEFAULT` expression for a column already mapped to `pg_type`, or `None`
/// when the column should not carry one.
pub fn translate_default(column: &ColumnDescriptor, pg_type: &str) -> Option<String> {
    let raw = column.default.as_deref()?.trim();
    if column.auto_increment || raw.eq_ignore_ascii_case("NULL") {
        return None;
    }
    if is_current_timestamp(raw) {
        return Some("CURRENT_TIMESTAMP".to_string());
    }
    let value = unquote(raw).unwrap_or_else(|| raw.to_string());
    if is_zero_datetime(&value) {
        return None;
    }
    if pg_type == "BOOLEAN" {
        match value.as_str() {
            "0" | "b'0'" => return Some("FALSE".to_string()),
            "1" | "b'1'" => return Some("TRUE".to_string()),
            _ => {}
        }
    }
    if column.value_type().is_numeric() && value.parse::<f64>().is_ok() {
        return Some(value);
    }
    return Some(format!("'{}'", value.replace('\'', "''")));
}
