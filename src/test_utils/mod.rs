//! In-memory stand-ins for both stores.

use std::collections::BTreeMap;

use crate::databases::table::{
    ForeignKeyRef, IndexDescriptor, Row, TableDescriptor, TableStats, Value,
};
use crate::databases::traits::{DestinationWriter, SourceReader};
use crate::importer::{ConstraintPhase, DanglingPolicy};

#[derive(Default)]
pub struct MemorySource {
    tables: Vec<(TableDescriptor, Vec<Row>)>,
    indexes: BTreeMap<String, Vec<IndexDescriptor>>,
}

impl MemorySource {
    pub fn add_table(&mut self, table: TableDescriptor, rows: Vec<Row>) {
        self.tables.push((table, rows));
    }

    pub fn add_index(&mut self, table: &str, index: IndexDescriptor) {
        self.indexes.entry(table.to_string()).or_default().push(index);
    }

    fn find(&self, table: &str) -> anyhow::Result<&(TableDescriptor, Vec<Row>)> {
        return self
            .tables
            .iter()
            .find(|(descriptor, _)| descriptor.name == table)
            .ok_or_else(|| anyhow::anyhow!("Table '{table}' doesn't exist"));
    }
}

impl SourceReader for MemorySource {
    fn database_name(&self) -> String {
        return "animekunnet".to_string();
    }

    fn get_tables(&mut self) -> anyhow::Result<Vec<String>> {
        return Ok(self.tables.iter().map(|(t, _)| t.name.clone()).collect());
    }

    fn get_table_stats(&mut self) -> anyhow::Result<Vec<TableStats>> {
        let mut stats: Vec<TableStats> = self
            .tables
            .iter()
            .map(|(table, rows)| TableStats {
                name: table.name.clone(),
                estimated_rows: rows.len() as u64,
                data_kb: 16,
                index_kb: 0,
            })
            .collect();
        stats.sort_by(|a, b| b.estimated_rows.cmp(&a.estimated_rows));
        return Ok(stats);
    }

    fn describe_table(&mut self, table: &str) -> anyhow::Result<TableDescriptor> {
        return Ok(self.find(table)?.0.clone());
    }

    fn get_indexes(&mut self, table: &str) -> anyhow::Result<Vec<IndexDescriptor>> {
        return Ok(self.indexes.get(table).cloned().unwrap_or_default());
    }

    fn count_rows(&mut self, table: &str) -> anyhow::Result<u64> {
        return Ok(self.find(table)?.1.len() as u64);
    }

    fn read_batch(
        &mut self,
        table: &TableDescriptor,
        limit: u64,
        offset: u64,
    ) -> anyhow::Result<Vec<Row>> {
        let (_, rows) = self.find(&table.name)?;
        return Ok(rows
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect());
    }
}

struct MemoryTable {
    columns: Vec<String>,
    not_null: Vec<String>,
    foreign_keys: Vec<ForeignKeyRef>,
    rows: Vec<Row>,
}

impl MemoryTable {
    fn position(&self, column: &str) -> anyhow::Result<usize> {
        return self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| anyhow::anyhow!("column \"{column}\" does not exist"));
    }
}

/// Destination that enforces NOT NULL columns, refuses to clear referenced
/// tables while constraints are enforced and remembers every statement.
pub struct MemoryDestination {
    tables: BTreeMap<String, MemoryTable>,
    phase: ConstraintPhase,
    pub refuse_suspend: bool,
    pub executed: Vec<String>,
    pub sample: Option<Vec<Vec<Option<String>>>>,
    /// Next value of every sequence, by sequence name
    pub sequences: BTreeMap<String, i64>,
}

fn sequence_name(table: &str, column: &str) -> String {
    return format!("{table}_{column}_seq");
}

/// Name targeted by `DROP <kind> IF EXISTS "name" CASCADE`.
fn dropped_name<'s>(statement: &'s str, kind: &str) -> Option<&'s str> {
    return statement
        .strip_prefix(&format!("DROP {kind} IF EXISTS \""))?
        .strip_suffix("\" CASCADE");
}

impl Default for MemoryDestination {
    fn default() -> Self {
        return Self {
            tables: BTreeMap::new(),
            phase: ConstraintPhase::Enforced,
            refuse_suspend: false,
            executed: Vec::new(),
            sample: None,
            sequences: BTreeMap::new(),
        };
    }
}

impl MemoryDestination {
    pub fn create_table(&mut self, table: &TableDescriptor) {
        self.tables.insert(
            table.name.clone(),
            MemoryTable {
                columns: table.columns.iter().map(|c| c.name.clone()).collect(),
                not_null: table
                    .columns
                    .iter()
                    .filter(|c| !c.nullable)
                    .map(|c| c.name.clone())
                    .collect(),
                foreign_keys: table.foreign_keys.clone(),
                rows: Vec::new(),
            },
        );
        for column in table.columns.iter().filter(|c| c.auto_increment) {
            self.sequences
                .insert(sequence_name(&table.name, &column.name), 1);
        }
    }

    pub fn insert_raw(&mut self, table: &str, row: Row) {
        if let Some(table) = self.tables.get_mut(table) {
            table.rows.push(row);
        }
    }

    pub fn rows(&self, table: &str) -> &[Row] {
        return self
            .tables
            .get(table)
            .map(|t| t.rows.as_slice())
            .unwrap_or_default();
    }

    pub fn phase(&self) -> ConstraintPhase {
        return self.phase;
    }

    fn table(&mut self, table: &str) -> anyhow::Result<&mut MemoryTable> {
        return self
            .tables
            .get_mut(table)
            .ok_or_else(|| anyhow::anyhow!("relation \"{table}\" does not exist"));
    }

    fn referenced_values(&mut self, fk: &ForeignKeyRef) -> anyhow::Result<Vec<Value>> {
        let parent = self.table(&fk.referenced_table)?;
        let idx = parent.position(&fk.referenced_column)?;
        return Ok(parent.rows.iter().map(|row| row[idx].clone()).collect());
    }
}

impl DestinationWriter for MemoryDestination {
    fn execute(&mut self, statement: &str) -> anyhow::Result<()> {
        if let Some(table) = dropped_name(statement, "TABLE") {
            self.tables.remove(table);
        }
        if let Some(sequence) = dropped_name(statement, "SEQUENCE") {
            self.sequences.remove(sequence);
        }
        self.executed.push(statement.to_string());
        return Ok(());
    }

    fn execute_script(&mut self, script: &str) -> anyhow::Result<()> {
        self.executed.push(script.to_string());
        return Ok(());
    }

    fn get_tables(&mut self) -> anyhow::Result<Vec<(String, u64)>> {
        return Ok(self
            .tables
            .iter()
            .map(|(name, table)| (name.clone(), table.columns.len() as u64))
            .collect());
    }

    fn get_columns(&mut self, table: &str) -> anyhow::Result<Vec<String>> {
        return Ok(self
            .tables
            .get(table)
            .map(|t| t.columns.clone())
            .unwrap_or_default());
    }

    fn get_sequences(&mut self) -> anyhow::Result<Vec<String>> {
        return Ok(self.sequences.keys().cloned().collect());
    }

    fn reset_sequence(&mut self, table: &str, column: &str) -> anyhow::Result<()> {
        let target = self.table(table)?;
        let idx = target.position(column)?;
        let max = target
            .rows
            .iter()
            .filter_map(|row| match row[idx] {
                Value::I64(id) => Some(id),
                _ => None,
            })
            .max();
        if let Some(next) = self.sequences.get_mut(&sequence_name(table, column)) {
            *next = max.map_or(1, |max| max + 1);
        }
        return Ok(());
    }

    fn clear_table(&mut self, table: &str) -> anyhow::Result<()> {
        if self.phase == ConstraintPhase::Enforced {
            for (name, child) in &self.tables {
                for fk in child.foreign_keys.iter().filter(|fk| fk.referenced_table == table) {
                    let idx = child.position(&fk.column)?;
                    if child.rows.iter().any(|row| row[idx] != Value::Null) {
                        return Err(anyhow::anyhow!(
                            "update or delete on table \"{table}\" violates foreign key constraint \"{}\" on table \"{name}\"",
                            fk.constraint_name()
                        ));
                    }
                }
            }
        }
        self.table(table)?.rows.clear();
        return Ok(());
    }

    /// Values are matched to destination columns by name, missing ones are NULL.
    fn insert_row(&mut self, table: &TableDescriptor, row: &[Value]) -> anyhow::Result<()> {
        let target = self.table(&table.name)?;
        for column in &table.columns {
            target.position(&column.name)?;
        }
        let mut stored = Vec::with_capacity(target.columns.len());
        for name in &target.columns {
            let value = match table.columns.iter().position(|c| &c.name == name) {
                Some(idx) => row.get(idx).cloned().unwrap_or(Value::Null),
                None => Value::Null,
            };
            if value == Value::Null && target.not_null.contains(name) {
                return Err(anyhow::anyhow!(
                    "null value in column \"{name}\" violates not-null constraint"
                ));
            }
            stored.push(value);
        }
        target.rows.push(stored);
        return Ok(());
    }

    fn count_rows(&mut self, table: &str) -> anyhow::Result<u64> {
        return Ok(self.table(table)?.rows.len() as u64);
    }

    fn set_constraint_phase(&mut self, phase: ConstraintPhase) -> anyhow::Result<()> {
        if self.refuse_suspend && phase == ConstraintPhase::Suspended {
            return Err(anyhow::anyhow!(
                "permission denied to set parameter \"session_replication_role\""
            ));
        }
        self.phase = phase;
        return Ok(());
    }

    fn count_dangling(&mut self, fk: &ForeignKeyRef) -> anyhow::Result<u64> {
        let parents = self.referenced_values(fk)?;
        let child = self.table(&fk.table)?;
        let idx = child.position(&fk.column)?;
        return Ok(child
            .rows
            .iter()
            .filter(|row| row[idx] != Value::Null && !parents.contains(&row[idx]))
            .count() as u64);
    }

    fn resolve_dangling(
        &mut self,
        fk: &ForeignKeyRef,
        policy: DanglingPolicy,
    ) -> anyhow::Result<u64> {
        let parents = self.referenced_values(fk)?;
        let child = self.table(&fk.table)?;
        let idx = child.position(&fk.column)?;
        let is_dangling = |row: &Row| row[idx] != Value::Null && !parents.contains(&row[idx]);
        let mut touched = 0;
        match policy {
            DanglingPolicy::Report => {}
            DanglingPolicy::Nullify => {
                for row in child.rows.iter_mut().filter(|row| is_dangling(row)) {
                    row[idx] = Value::Null;
                    touched += 1;
                }
            }
            DanglingPolicy::Delete => {
                let before = child.rows.len();
                child.rows.retain(|row| !is_dangling(row));
                touched = (before - child.rows.len()) as u64;
            }
        }
        return Ok(touched);
    }

    fn query_text(&mut self, query: &str) -> anyhow::Result<Vec<Vec<Option<String>>>> {
        self.executed.push(query.to_string());
        return self
            .sample
            .clone()
            .ok_or_else(|| anyhow::anyhow!("relation in sample query does not exist"));
    }
}
