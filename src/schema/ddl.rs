use chrono::{DateTime, Utc};
use itertools::Itertools;

use crate::databases::quote_pg;
use crate::databases::table::{IndexDescriptor, TableDescriptor};

use super::typemap::{map_type, translate_default};

/// Index kinds PostgreSQL has no B-tree equivalent for.
const SKIPPED_INDEX_KINDS: [&str; 2] = ["FULLTEXT", "SPATIAL"];

#[derive(Clone, Debug, PartialEq)]
pub struct TableSchema {
    pub table: TableDescriptor,
    pub indexes: Vec<IndexDescriptor>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SchemaScript {
    pub drop_existing: bool,
    pub tables: Vec<TableSchema>,
}

pub fn create_table(table: &TableDescriptor) -> String {
    let mut lines: Vec<String> = table
        .columns
        .iter()
        .map(|column| {
            let pg_type = map_type(column);
            let mut line = format!("    {} {pg_type}", quote_pg(&column.name));
            if !column.nullable {
                line.push_str(" NOT NULL");
            }
            if let Some(default) = translate_default(column, &pg_type) {
                line.push_str(&format!(" DEFAULT {default}"));
            }
            line
        })
        .collect();
    if !table.primary_key.is_empty() {
        lines.push(format!(
            "    CONSTRAINT {} PRIMARY KEY ({})",
            quote_pg(&format!("{}_pkey", table.name)),
            table.primary_key.iter().map(|c| quote_pg(c)).join(", ")
        ));
    }
    return format!(
        "CREATE TABLE {} (\n{}\n);",
        quote_pg(&table.name),
        lines.join(",\n")
    );
}

pub fn create_index(table: &str, index: &IndexDescriptor) -> Option<String> {
    let kind = index.kind.to_uppercase();
    if SKIPPED_INDEX_KINDS.contains(&kind.as_str()) || index.columns.is_empty() {
        return None;
    }
    let unique = if index.unique { "UNIQUE " } else { "" };
    return Some(format!(
        "CREATE {unique}INDEX {} ON {} ({});",
        quote_pg(&format!("{table}_{}", index.name)),
        quote_pg(table),
        index.columns.iter().map(|c| quote_pg(c)).join(", ")
    ));
}

impl SchemaScript {
    pub fn new(tables: Vec<TableSchema>, drop_existing: bool) -> Self {
        return Self {
            drop_existing,
            tables,
        };
    }

    fn contains(&self, table: &str) -> bool {
        return self.tables.iter().any(|schema| schema.table.name == table);
    }

    /// Statements in execution order: tables, then indexes, then foreign keys.
    pub fn statements(&self) -> Vec<String> {
        let mut statements = Vec::new();
        if self.drop_existing {
            statements.push("DROP SCHEMA public CASCADE;".to_string());
            statements.push("CREATE SCHEMA public;".to_string());
        }
        for schema in &self.tables {
            statements.push(create_table(&schema.table));
        }
        for schema in &self.tables {
            statements.extend(
                schema
                    .indexes
                    .iter()
                    .filter_map(|index| create_index(&schema.table.name, index)),
            );
        }
        for fk in self.tables.iter().flat_map(|s| &s.table.foreign_keys) {
            if !self.contains(&fk.referenced_table) {
                continue;
            }
            statements.push(format!(
                "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({});",
                quote_pg(&fk.table),
                quote_pg(&fk.constraint_name()),
                quote_pg(&fk.column),
                quote_pg(&fk.referenced_table),
                quote_pg(&fk.referenced_column),
            ));
        }
        return statements;
    }

    pub fn render(&self, source_database: &str, generated_at: DateTime<Utc>) -> String {
        let mut script = format!(
            "-- PostgreSQL schema generated from MySQL database {source_database}\n-- Generated at {}\n-- Tables: {}\n\n",
            generated_at.to_rfc3339(),
            self.tables.len()
        );
        script.push_str(&self.statements().join("\n\n"));
        script.push('\n');
        return script;
    }
}
