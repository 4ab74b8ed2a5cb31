use std::collections::HashMap;

use anyhow::Context;
use itertools::Itertools;
use postgres::types::ToSql;
use postgres::{Client, NoTls, SimpleQueryMessage, Statement};
use tracing::debug;

use crate::databases::quote_pg;
use crate::databases::table::{ForeignKeyRef, TableDescriptor, Value};
use crate::databases::traits::DestinationWriter;
use crate::importer::{ConstraintPhase, DanglingPolicy};

mod value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl From<&PostgresConfig> for postgres::Config {
    fn from(config: &PostgresConfig) -> Self {
        let mut pg_config = postgres::Config::new();
        pg_config
            .host(&config.host)
            .port(config.port)
            .user(&config.user)
            .dbname(&config.database);
        if !config.password.is_empty() {
            pg_config.password(&config.password);
        }
        return pg_config;
    }
}

pub struct PostgresDB {
    client: Client,
    insert_statements: HashMap<String, Statement>,
}

impl PostgresDB {
    pub fn new(config: &PostgresConfig) -> anyhow::Result<Self> {
        let client = postgres::Config::from(config).connect(NoTls)?;
        debug!(
            "Connected to postgres {}@{}:{}/{}",
            config.user, config.host, config.port, config.database
        );
        return Ok(Self::from_client(client));
    }

    pub fn from_url(uri: &str) -> anyhow::Result<Self> {
        let client = Client::connect(uri, NoTls)?;
        return Ok(Self::from_client(client));
    }

    fn from_client(client: Client) -> Self {
        return Self {
            client,
            insert_statements: HashMap::new(),
        };
    }

    /// Statements are cached per query text, a table imported with a
    /// different column set gets its own statement.
    fn insert_statement(&mut self, table: &TableDescriptor) -> anyhow::Result<Statement> {
        let query = insert_query(table);
        if let Some(stmt) = self.insert_statements.get(&query) {
            return Ok(stmt.clone());
        }
        let stmt = self
            .client
            .prepare(&query)
            .with_context(|| format!("Failed to prepare insert into {}", table.name))?;
        self.insert_statements.insert(query, stmt.clone());
        return Ok(stmt);
    }
}

pub fn insert_query(table: &TableDescriptor) -> String {
    let columns = table.columns.iter().map(|c| quote_pg(&c.name)).join(", ");
    let placeholders = (1..=table.columns.len()).map(|i| format!("${i}")).join(", ");
    return format!(
        "INSERT INTO {} ({columns}) VALUES ({placeholders})",
        quote_pg(&table.name)
    );
}

/// `$1` is the quoted table name, `$2` the column. An empty table resets the
/// sequence so that the next value is 1.
pub fn reset_sequence_query(table: &str, column: &str) -> String {
    return format!(
        "SELECT setval(pg_get_serial_sequence($1, $2), COALESCE(m.max_id, 1), m.max_id IS NOT NULL) \
         FROM (SELECT MAX({}) AS max_id FROM {}) m",
        quote_pg(column),
        quote_pg(table)
    );
}

fn dangling_condition(fk: &ForeignKeyRef, alias: &str) -> String {
    let column = format!("{alias}.{}", quote_pg(&fk.column));
    return format!(
        "{column} IS NOT NULL AND NOT EXISTS (SELECT 1 FROM {} p WHERE p.{} = {column})",
        quote_pg(&fk.referenced_table),
        quote_pg(&fk.referenced_column),
    );
}

pub fn count_dangling_query(fk: &ForeignKeyRef) -> String {
    return format!(
        "SELECT count(*) FROM {} c WHERE {}",
        quote_pg(&fk.table),
        dangling_condition(fk, "c")
    );
}

pub fn resolve_dangling_query(fk: &ForeignKeyRef, policy: DanglingPolicy) -> Option<String> {
    let table = quote_pg(&fk.table);
    let condition = dangling_condition(fk, "c");
    return match policy {
        DanglingPolicy::Report => None,
        DanglingPolicy::Nullify => Some(format!(
            "UPDATE {table} c SET {} = NULL WHERE {condition}",
            quote_pg(&fk.column)
        )),
        DanglingPolicy::Delete => Some(format!("DELETE FROM {table} c WHERE {condition}")),
    };
}

impl DestinationWriter for PostgresDB {
    fn execute(&mut self, statement: &str) -> anyhow::Result<()> {
        self.client.batch_execute(statement)?;
        return Ok(());
    }

    fn execute_script(&mut self, script: &str) -> anyhow::Result<()> {
        let mut transaction = self
            .client
            .transaction()
            .context("Failed to start transaction")?;
        transaction.batch_execute(script)?;
        transaction
            .commit()
            .context("Failed to commit transaction")?;
        return Ok(());
    }

    fn get_tables(&mut self) -> anyhow::Result<Vec<(String, u64)>> {
        let rows = self
            .client
            .query(
                "SELECT t.table_name::text, count(c.column_name)
                FROM information_schema.tables t
                LEFT JOIN information_schema.columns c
                    ON c.table_schema = t.table_schema AND c.table_name = t.table_name
                WHERE t.table_schema = 'public' AND t.table_type = 'BASE TABLE'
                GROUP BY t.table_name
                ORDER BY t.table_name",
                &[],
            )
            .context("Failed to list postgres tables")?;
        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            let columns: i64 = row.get(1);
            tables.push((row.get(0), u64::try_from(columns)?));
        }
        return Ok(tables);
    }

    fn get_sequences(&mut self) -> anyhow::Result<Vec<String>> {
        let rows = self
            .client
            .query(
                "SELECT sequence_name::text
                FROM information_schema.sequences
                WHERE sequence_schema = 'public'
                ORDER BY sequence_name",
                &[],
            )
            .context("Failed to list postgres sequences")?;
        return Ok(rows.iter().map(|row| row.get(0)).collect());
    }

    fn get_columns(&mut self, table: &str) -> anyhow::Result<Vec<String>> {
        let rows = self
            .client
            .query(
                "SELECT column_name::text
                FROM information_schema.columns
                WHERE table_schema = 'public' AND table_name::text = $1
                ORDER BY ordinal_position",
                &[&table],
            )
            .with_context(|| format!("Failed to list columns of {table}"))?;
        return Ok(rows.iter().map(|row| row.get(0)).collect());
    }

    fn reset_sequence(&mut self, table: &str, column: &str) -> anyhow::Result<()> {
        self.client
            .execute(&reset_sequence_query(table, column), &[&quote_pg(table), &column])
            .with_context(|| format!("Failed to reset sequence of {table}.{column}"))?;
        return Ok(());
    }

    fn clear_table(&mut self, table: &str) -> anyhow::Result<()> {
        let query = format!("DELETE FROM {}", quote_pg(table));
        self.client
            .execute(&query, &[])
            .with_context(|| format!("Failed to clear table {table}"))?;
        return Ok(());
    }

    fn insert_row(&mut self, table: &TableDescriptor, row: &[Value]) -> anyhow::Result<()> {
        let stmt = self.insert_statement(table)?;
        let params: Vec<&(dyn ToSql + Sync)> =
            row.iter().map(|value| value as &(dyn ToSql + Sync)).collect();
        self.client.execute(&stmt, &params)?;
        return Ok(());
    }

    fn count_rows(&mut self, table: &str) -> anyhow::Result<u64> {
        let count_query = format!("SELECT count(1) FROM {}", quote_pg(table));
        return self
            .client
            .query_one(&count_query, &[])?
            .get::<_, i64>(0)
            .try_into()
            .context("Failed to convert i64 to u64");
    }

    fn set_constraint_phase(&mut self, phase: ConstraintPhase) -> anyhow::Result<()> {
        let role = match phase {
            ConstraintPhase::Suspended => "replica",
            ConstraintPhase::Enforced => "DEFAULT",
        };
        self.client
            .batch_execute(&format!("SET session_replication_role = {role}"))
            .context("Failed to switch session replication role")?;
        return Ok(());
    }

    fn count_dangling(&mut self, fk: &ForeignKeyRef) -> anyhow::Result<u64> {
        return self
            .client
            .query_one(&count_dangling_query(fk), &[])?
            .get::<_, i64>(0)
            .try_into()
            .context("Failed to convert i64 to u64");
    }

    fn resolve_dangling(
        &mut self,
        fk: &ForeignKeyRef,
        policy: DanglingPolicy,
    ) -> anyhow::Result<u64> {
        let Some(query) = resolve_dangling_query(fk, policy) else {
            return Ok(0);
        };
        return self
            .client
            .execute(&query, &[])
            .with_context(|| format!("Failed to resolve dangling references of {}", fk.table));
    }

    fn query_text(&mut self, query: &str) -> anyhow::Result<Vec<Vec<Option<String>>>> {
        let messages = self.client.simple_query(query)?;
        let mut rows = Vec::new();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                rows.push(
                    (0..row.len())
                        .map(|idx| row.get(idx).map(str::to_string))
                        .collect(),
                );
            }
        }
        return Ok(rows);
    }
}
