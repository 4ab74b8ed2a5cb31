use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Decimal(Decimal),
    String(String),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
}

pub type Row = Vec<Value>;

/// In-memory kind of the values a source column yields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Bool,
    Integer,
    Float,
    Decimal,
    String,
    Bytes,
    Timestamp,
    Date,
    Time,
}

impl ColumnType {
    pub fn from_mysql(data_type: &str, length: Option<u64>) -> ColumnType {
        return match data_type.trim().to_lowercase().as_str() {
            "tinyint" if length == Some(1) => ColumnType::Bool,
            "bit" if length == Some(1) || length.is_none() => ColumnType::Bool,
            "bool" | "boolean" => ColumnType::Bool,
            "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "year" => {
                ColumnType::Integer
            }
            "float" | "double" | "double precision" | "real" => ColumnType::Float,
            "decimal" | "numeric" | "dec" | "fixed" => ColumnType::Decimal,
            "binary" | "varbinary" | "tinyblob" | "blob" | "mediumblob" | "longblob" | "bit" => {
                ColumnType::Bytes
            }
            "datetime" | "timestamp" => ColumnType::Timestamp,
            "date" => ColumnType::Date,
            "time" => ColumnType::Time,
            _ => ColumnType::String,
        };
    }

    pub fn is_temporal(&self) -> bool {
        return matches!(
            self,
            ColumnType::Timestamp | ColumnType::Date | ColumnType::Time
        );
    }

    pub fn is_numeric(&self) -> bool {
        return matches!(
            self,
            ColumnType::Integer | ColumnType::Float | ColumnType::Decimal
        );
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Base source type, e.g. `varchar`
    pub data_type: String,
    /// Full source type, e.g. `varchar(255)` or `int(10) unsigned`
    pub column_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub max_length: Option<u64>,
    pub precision: Option<u64>,
    pub scale: Option<u64>,
    pub auto_increment: bool,
}

impl ColumnDescriptor {
    pub fn new(name: &str, data_type: &str) -> Self {
        return Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            column_type: data_type.to_string(),
            nullable: true,
            default: None,
            max_length: None,
            precision: None,
            scale: None,
            auto_increment: false,
        };
    }

    pub fn value_type(&self) -> ColumnType {
        return ColumnType::from_mysql(&self.data_type, self.max_length);
    }
}

/// Display width of integer types, e.g. 1 for `tinyint(1)`.
pub fn parse_display_width(column_type: &str) -> Option<u64> {
    let start = column_type.find('(')?;
    let end = column_type[start..].find(')')? + start;
    return column_type[start + 1..end].trim().parse().ok();
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

impl ForeignKeyRef {
    pub fn new(table: &str, column: &str, referenced_table: &str, referenced_column: &str) -> Self {
        return Self {
            table: table.to_string(),
            column: column.to_string(),
            referenced_table: referenced_table.to_string(),
            referenced_column: referenced_column.to_string(),
        };
    }

    pub fn constraint_name(&self) -> String {
        return format!("fk_{}_{}", self.table, self.column);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    /// Source index type, e.g. `BTREE` or `FULLTEXT`
    pub kind: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyRef>,
}

impl TableDescriptor {
    pub fn new(name: &str, columns: Vec<ColumnDescriptor>) -> Self {
        return Self {
            name: name.to_string(),
            columns,
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
        };
    }

    pub fn column_names(&self) -> Vec<&str> {
        return self.columns.iter().map(|c| c.name.as_str()).collect();
    }

    pub fn has_column(&self, name: &str) -> bool {
        return self.columns.iter().any(|c| c.name == name);
    }

    /// Adds a foreign key unless the same column already references something.
    pub fn add_foreign_key(&mut self, fk: ForeignKeyRef) {
        if !self.foreign_keys.iter().any(|known| known.column == fk.column) {
            self.foreign_keys.push(fk);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    pub name: String,
    pub estimated_rows: u64,
    pub data_kb: u64,
    pub index_kb: u64,
}
