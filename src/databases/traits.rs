use crate::importer::{ConstraintPhase, DanglingPolicy};

use super::table::{ForeignKeyRef, IndexDescriptor, Row, TableDescriptor, TableStats, Value};

/// Read side of a migration: metadata introspection and paged reads.
#[cfg_attr(test, mockall::automock)]
pub trait SourceReader {
    fn database_name(&self) -> String;

    fn get_tables(&mut self) -> anyhow::Result<Vec<String>>;

    fn get_table_stats(&mut self) -> anyhow::Result<Vec<TableStats>>;

    fn describe_table(&mut self, table: &str) -> anyhow::Result<TableDescriptor>;

    fn get_indexes(&mut self, table: &str) -> anyhow::Result<Vec<IndexDescriptor>>;

    fn count_rows(&mut self, table: &str) -> anyhow::Result<u64>;

    fn read_batch(
        &mut self,
        table: &TableDescriptor,
        limit: u64,
        offset: u64,
    ) -> anyhow::Result<Vec<Row>>;
}

/// Write side of a migration.
#[cfg_attr(test, mockall::automock)]
pub trait DestinationWriter {
    fn execute(&mut self, statement: &str) -> anyhow::Result<()>;

    /// Runs a whole script as a single transaction.
    fn execute_script(&mut self, script: &str) -> anyhow::Result<()>;

    fn get_tables(&mut self) -> anyhow::Result<Vec<(String, u64)>>;

    /// Column names of `table` in ordinal order, empty when the table is missing.
    fn get_columns(&mut self, table: &str) -> anyhow::Result<Vec<String>>;

    fn get_sequences(&mut self) -> anyhow::Result<Vec<String>>;

    /// Moves the sequence owned by `table.column` past the highest stored value.
    fn reset_sequence(&mut self, table: &str, column: &str) -> anyhow::Result<()>;

    fn clear_table(&mut self, table: &str) -> anyhow::Result<()>;

    fn insert_row(&mut self, table: &TableDescriptor, row: &[Value]) -> anyhow::Result<()>;

    fn count_rows(&mut self, table: &str) -> anyhow::Result<u64>;

    fn set_constraint_phase(&mut self, phase: ConstraintPhase) -> anyhow::Result<()>;

    fn count_dangling(&mut self, fk: &ForeignKeyRef) -> anyhow::Result<u64>;

    /// Applies `policy` to dangling references, returns number of touched rows.
    fn resolve_dangling(&mut self, fk: &ForeignKeyRef, policy: DanglingPolicy)
    -> anyhow::Result<u64>;

    /// Runs a query and returns every value in its text form.
    fn query_text(&mut self, query: &str) -> anyhow::Result<Vec<Vec<Option<String>>>>;
}
