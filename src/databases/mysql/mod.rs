use anyhow::Context;
use itertools::Itertools;
use mysql::prelude::Queryable;
use mysql::{Conn, Opts, OptsBuilder};
use tracing::debug;

use crate::databases::quote_mysql;
use crate::databases::table::{
    ColumnDescriptor, ForeignKeyRef, IndexDescriptor, Row, TableDescriptor, TableStats, Value,
    parse_display_width,
};
use crate::databases::traits::SourceReader;

mod value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MysqlConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl From<&MysqlConfig> for Opts {
    fn from(config: &MysqlConfig) -> Self {
        let password = (!config.password.is_empty()).then(|| config.password.clone());
        return OptsBuilder::new()
            .ip_or_hostname(Some(config.host.clone()))
            .tcp_port(config.port)
            .user(Some(config.user.clone()))
            .pass(password)
            .db_name(Some(config.database.clone()))
            .into();
    }
}

pub struct MysqlDB {
    database: String,
    connection: Conn,
}

impl MysqlDB {
    pub fn new(config: &MysqlConfig) -> anyhow::Result<Self> {
        let connection = Conn::new(Opts::from(config))?;
        debug!(
            "Connected to mysql {}@{}:{}/{}",
            config.user, config.host, config.port, config.database
        );
        return Ok(Self {
            database: config.database.clone(),
            connection,
        });
    }

    pub fn from_url(uri: &str) -> anyhow::Result<Self> {
        let opts = Opts::from_url(uri)?;
        let database = opts.get_db_name().unwrap_or_default().to_string();
        let connection = Conn::new(opts)?;
        return Ok(Self {
            database,
            connection,
        });
    }

    fn get_columns(&mut self, table: &str) -> anyhow::Result<Vec<(ColumnDescriptor, bool)>> {
        let rows: Vec<mysql::Row> = self
            .connection
            .exec(
                r"SELECT COLUMN_NAME, DATA_TYPE, COLUMN_TYPE, IS_NULLABLE, COLUMN_DEFAULT,
                         CHARACTER_MAXIMUM_LENGTH, NUMERIC_PRECISION, NUMERIC_SCALE,
                         COLUMN_KEY, EXTRA
                  FROM INFORMATION_SCHEMA.COLUMNS
                  WHERE TABLE_SCHEMA = database() AND TABLE_NAME = ?
                  ORDER BY ORDINAL_POSITION",
                (table,),
            )
            .context("Failed to query information about table columns")?;
        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            columns.push(column_from_row(row)?);
        }
        return Ok(columns);
    }

    fn get_foreign_keys(&mut self, table: &str) -> anyhow::Result<Vec<ForeignKeyRef>> {
        let rows: Vec<(String, String, String)> = self
            .connection
            .exec(
                r"SELECT COLUMN_NAME, REFERENCED_TABLE_NAME, REFERENCED_COLUMN_NAME
                  FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE
                  WHERE TABLE_SCHEMA = database() AND TABLE_NAME = ?
                    AND REFERENCED_TABLE_NAME IS NOT NULL
                  ORDER BY ORDINAL_POSITION",
                (table,),
            )
            .context("Failed to query foreign keys of table")?;
        return Ok(rows
            .into_iter()
            .map(|(column, ref_table, ref_column)| {
                ForeignKeyRef::new(table, &column, &ref_table, &ref_column)
            })
            .collect());
    }
}

fn get_value<T: mysql::prelude::FromValue>(row: &mysql::Row, idx: usize) -> anyhow::Result<T> {
    return row
        .get_opt(idx)
        .context("Value expected")?
        .with_context(|| format!("Couldn't parse column {idx} of information schema"));
}

/// Returns the column and whether it belongs to the primary key.
fn column_from_row(row: mysql::Row) -> anyhow::Result<(ColumnDescriptor, bool)> {
    let name: String = get_value(&row, 0)?;
    let data_type: String = get_value(&row, 1)?;
    let column_type: String = get_value(&row, 2)?;
    let nullable: String = get_value(&row, 3)?;
    let default: Option<String> = get_value(&row, 4)?;
    let char_length: Option<u64> = get_value(&row, 5)?;
    let precision: Option<u64> = get_value(&row, 6)?;
    let scale: Option<u64> = get_value(&row, 7)?;
    let key: String = get_value(&row, 8)?;
    let extra: String = get_value(&row, 9)?;
    let column = ColumnDescriptor {
        name,
        data_type: data_type.to_lowercase(),
        max_length: char_length.or_else(|| parse_display_width(&column_type)),
        column_type,
        nullable: nullable == "YES",
        default,
        precision,
        scale,
        auto_increment: extra.to_lowercase().contains("auto_increment"),
    };
    return Ok((column, key == "PRI"));
}

impl SourceReader for MysqlDB {
    fn database_name(&self) -> String {
        return self.database.clone();
    }

    fn get_tables(&mut self) -> anyhow::Result<Vec<String>> {
        return self
            .connection
            .query(
                r"SELECT TABLE_NAME
                  FROM INFORMATION_SCHEMA.TABLES
                  WHERE TABLE_SCHEMA = database() AND TABLE_TYPE = 'BASE TABLE'
                  ORDER BY TABLE_NAME",
            )
            .context("Failed to list mysql tables");
    }

    fn get_table_stats(&mut self) -> anyhow::Result<Vec<TableStats>> {
        let rows: Vec<(String, Option<u64>, Option<u64>, Option<u64>)> = self
            .connection
            .query(
                r"SELECT TABLE_NAME, TABLE_ROWS, DATA_LENGTH, INDEX_LENGTH
                  FROM INFORMATION_SCHEMA.TABLES
                  WHERE TABLE_SCHEMA = database() AND TABLE_TYPE = 'BASE TABLE'
                  ORDER BY TABLE_ROWS DESC",
            )
            .context("Failed to get mysql table statistics")?;
        return Ok(rows
            .into_iter()
            .map(|(name, rows, data, index)| TableStats {
                name,
                estimated_rows: rows.unwrap_or(0),
                data_kb: data.unwrap_or(0) / 1024,
                index_kb: index.unwrap_or(0) / 1024,
            })
            .collect());
    }

    fn describe_table(&mut self, table: &str) -> anyhow::Result<TableDescriptor> {
        let columns = self.get_columns(table)?;
        if columns.is_empty() {
            return Err(anyhow::anyhow!("Table {table} not found in the source"));
        }
        let primary_key = columns
            .iter()
            .filter(|(_, primary)| *primary)
            .map(|(column, _)| column.name.clone())
            .collect();
        let mut descriptor =
            TableDescriptor::new(table, columns.into_iter().map(|(c, _)| c).collect());
        descriptor.primary_key = primary_key;
        for fk in self.get_foreign_keys(table)? {
            descriptor.add_foreign_key(fk);
        }
        return Ok(descriptor);
    }

    fn get_indexes(&mut self, table: &str) -> anyhow::Result<Vec<IndexDescriptor>> {
        let rows: Vec<(String, Option<String>, i64, String)> = self
            .connection
            .exec(
                r"SELECT INDEX_NAME, COLUMN_NAME, NON_UNIQUE, INDEX_TYPE
                  FROM INFORMATION_SCHEMA.STATISTICS
                  WHERE TABLE_SCHEMA = database() AND TABLE_NAME = ?
                    AND INDEX_NAME <> 'PRIMARY'
                  ORDER BY INDEX_NAME, SEQ_IN_INDEX",
                (table,),
            )
            .context("Failed to query indexes of table")?;
        // Functional indexes have no column name and are not carried over
        let indexes = rows
            .into_iter()
            .filter_map(|(name, column, non_unique, kind)| {
                column.map(|column| (name, column, non_unique, kind))
            })
            .chunk_by(|(name, _, _, _)| name.clone())
            .into_iter()
            .map(|(name, group)| {
                let group: Vec<_> = group.collect();
                IndexDescriptor {
                    name,
                    unique: group[0].2 == 0,
                    kind: group[0].3.clone(),
                    columns: group.into_iter().map(|(_, column, _, _)| column).collect(),
                }
            })
            .collect();
        return Ok(indexes);
    }

    fn count_rows(&mut self, table: &str) -> anyhow::Result<u64> {
        let count_query = format!("SELECT count(1) FROM {}", quote_mysql(table));
        return self
            .connection
            .query_first(count_query)?
            .context("Unable to get count of rows for table");
    }

    fn read_batch(
        &mut self,
        table: &TableDescriptor,
        limit: u64,
        offset: u64,
    ) -> anyhow::Result<Vec<Row>> {
        let query = select_batch_query(table, limit, offset);
        let rows: Vec<mysql::Row> = self
            .connection
            .query(query)
            .context("Failed to get data from mysql source")?;
        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let values = row.unwrap();
            if values.len() != table.columns.len() {
                return Err(anyhow::anyhow!(
                    "Broken invariant. Expected to get {} values, got {}",
                    table.columns.len(),
                    values.len()
                ));
            }
            result.push(
                std::iter::zip(&table.columns, values)
                    .map(Value::from)
                    .collect(),
            );
        }
        return Ok(result);
    }
}

fn select_batch_query(table: &TableDescriptor, limit: u64, offset: u64) -> String {
    let columns = table.columns.iter().map(|c| quote_mysql(&c.name)).join(", ");
    let mut query = format!("SELECT {columns} FROM {}", quote_mysql(&table.name));
    if !table.primary_key.is_empty() {
        let order = table.primary_key.iter().map(|c| quote_mysql(c)).join(", ");
        query.push_str(&format!(" ORDER BY {order}"));
    }
    query.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
    return query;
}
