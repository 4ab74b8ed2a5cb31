use anyhow::Context;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::databases::table::{ForeignKeyRef, Row, TableDescriptor};
use crate::databases::traits::{DestinationWriter, SourceReader};
use crate::progress::ImportProgress;
use crate::sanitize::sanitize_row;

pub const DEFAULT_BATCH_SIZE: u64 = 1000;

/// Only the first failures of a table are logged verbatim.
const LOGGED_ROW_ERRORS: u64 = 3;

/// Whether the destination checks referential integrity on insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintPhase {
    Enforced,
    Suspended,
}

/// What happens to rows whose foreign key points nowhere once constraints
/// are back on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DanglingPolicy {
    /// Count them, keep the rows
    #[default]
    Report,
    /// Set the dangling value to NULL
    Nullify,
    /// Delete the referencing rows
    Delete,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImportResult {
    pub table: String,
    pub imported: u64,
    pub errors: u64,
    pub skipped: u64,
    pub total: u64,
    pub failure: Option<String>,
}

impl ImportResult {
    pub fn new(table: &str) -> Self {
        return Self {
            table: table.to_string(),
            imported: 0,
            errors: 0,
            skipped: 0,
            total: 0,
            failure: None,
        };
    }

    pub fn attempted(&self) -> u64 {
        return self.imported + self.errors;
    }

    /// Percentage of attempted rows that made it into the destination.
    /// A table with nothing attempted has nothing failed, so it counts as 100.
    pub fn success_rate(&self) -> f64 {
        if self.attempted() == 0 {
            return 100.0;
        }
        return self.imported as f64 * 100.0 / self.attempted() as f64;
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DanglingCheck {
    #[serde(flatten)]
    pub foreign_key: ForeignKeyRef,
    pub dangling: u64,
    pub resolved: u64,
    pub policy: DanglingPolicy,
}

pub struct TableImporter {
    batch_size: u64,
    phase: ConstraintPhase,
}

impl Default for TableImporter {
    fn default() -> Self {
        return Self::new(DEFAULT_BATCH_SIZE);
    }
}

impl TableImporter {
    pub fn new(batch_size: u64) -> Self {
        return Self {
            batch_size: batch_size.max(1),
            phase: ConstraintPhase::Enforced,
        };
    }

    pub fn phase(&self) -> ConstraintPhase {
        return self.phase;
    }

    /// Turns off referential checks for the bulk load. A refusal is not
    /// fatal, the import then runs with constraints enforced.
    pub fn suspend_constraints(&mut self, destination: &mut dyn DestinationWriter) {
        if self.phase == ConstraintPhase::Suspended {
            return;
        }
        match destination.set_constraint_phase(ConstraintPhase::Suspended) {
            Ok(()) => {
                debug!("Referential checks suspended");
                self.phase = ConstraintPhase::Suspended;
            }
            Err(err) => {
                warn!("Unable to suspend referential checks, importing with constraints enforced: {err:#}");
            }
        }
    }

    pub fn restore_constraints(
        &mut self,
        destination: &mut dyn DestinationWriter,
    ) -> anyhow::Result<()> {
        if self.phase == ConstraintPhase::Enforced {
            return Ok(());
        }
        destination
            .set_constraint_phase(ConstraintPhase::Enforced)
            .context("Failed to restore referential checks")?;
        debug!("Referential checks restored");
        self.phase = ConstraintPhase::Enforced;
        return Ok(());
    }

    /// Empties `tables` children first. With constraints enforced a parent
    /// can only be cleared once nothing references it anymore. Failures are
    /// left to the per-table clear of [`Self::import_table`].
    pub fn clear_tables(
        &self,
        destination: &mut dyn DestinationWriter,
        tables: &[&TableDescriptor],
    ) {
        for table in tables.iter().rev() {
            if let Err(err) = destination.clear_table(&table.name) {
                warn!("Unable to clear table {}: {err:#}", table.name);
            }
        }
    }

    /// Imports one table. Table-level failures end up in
    /// [`ImportResult::failure`] instead of aborting the run.
    pub fn import_table(
        &self,
        source: &mut dyn SourceReader,
        destination: &mut dyn DestinationWriter,
        table: &TableDescriptor,
        limit: Option<u64>,
    ) -> ImportResult {
        let mut result = ImportResult::new(&table.name);
        if let Err(err) = self.copy_rows(source, destination, table, limit, &mut result) {
            error!("Import of table {} failed: {err:#}", table.name);
            result.failure = Some(format!("{err:#}"));
            return result;
        }
        reset_sequences(destination, table);
        return result;
    }

    fn copy_rows(
        &self,
        source: &mut dyn SourceReader,
        destination: &mut dyn DestinationWriter,
        table: &TableDescriptor,
        limit: Option<u64>,
        result: &mut ImportResult,
    ) -> anyhow::Result<()> {
        result.total = source
            .count_rows(&table.name)
            .context("Unable to count rows of source table")?;
        destination
            .clear_table(&table.name)
            .context("Unable to clear destination table")?;
        if result.total == 0 {
            info!("Table {} is empty in the source", table.name);
            return Ok(());
        }
        let columns = destination
            .get_columns(&table.name)
            .context("Unable to list destination columns")?;
        let (target_table, kept) = project_columns(table, &columns)?;

        let target = limit.map_or(result.total, |limit| limit.min(result.total));
        result.skipped = result.total - target;
        let mut progress = ImportProgress::new(&table.name, target);
        let mut offset = 0;
        while offset < target {
            let size = self.batch_size.min(target - offset);
            let batch = source
                .read_batch(table, size, offset)
                .with_context(|| format!("Unable to read batch at offset {offset}"))?;
            if batch.is_empty() {
                break;
            }
            offset += u64::try_from(batch.len())?;
            for row in batch {
                let row = keep_values(sanitize_row(row, &table.columns), &kept);
                match destination.insert_row(&target_table, &row) {
                    Ok(()) => result.imported += 1,
                    Err(err) => {
                        result.errors += 1;
                        if result.errors <= LOGGED_ROW_ERRORS {
                            warn!("Failed to insert row into {}: {err:#}", table.name);
                        } else {
                            debug!("Failed to insert row into {}: {err:#}", table.name);
                        }
                    }
                }
            }
            progress.update(result.imported, result.errors);
            progress.log();
        }
        return Ok(());
    }
}

/// Restricts `table` to the columns that exist in the destination. Returns
/// the restricted descriptor and the source positions that are kept.
fn project_columns(
    table: &TableDescriptor,
    destination_columns: &[String],
) -> anyhow::Result<(TableDescriptor, Vec<usize>)> {
    if destination_columns.is_empty() {
        return Err(anyhow::anyhow!(
            "Table {} not found in the destination",
            table.name
        ));
    }
    let kept: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, column)| destination_columns.contains(&column.name))
        .map(|(idx, _)| idx)
        .collect();
    if kept.is_empty() {
        return Err(anyhow::anyhow!(
            "No column of {} exists in the destination",
            table.name
        ));
    }
    let mut target = table.clone();
    if kept.len() < table.columns.len() {
        let dropped: Vec<&str> = table
            .columns
            .iter()
            .filter(|column| !destination_columns.contains(&column.name))
            .map(|column| column.name.as_str())
            .collect();
        warn!(
            "Columns of {} missing in the destination are not imported: {}",
            table.name,
            dropped.join(", ")
        );
        target
            .columns
            .retain(|column| destination_columns.contains(&column.name));
    }
    return Ok((target, kept));
}

fn keep_values(row: Row, kept: &[usize]) -> Row {
    if kept.len() == row.len() {
        return row;
    }
    return row
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| kept.contains(idx))
        .map(|(_, value)| value)
        .collect();
}

/// Explicit ids were inserted into SERIAL columns, their sequences have to
/// continue after the highest one.
fn reset_sequences(destination: &mut dyn DestinationWriter, table: &TableDescriptor) {
    for column in table.columns.iter().filter(|c| c.auto_increment) {
        match destination.reset_sequence(&table.name, &column.name) {
            Ok(()) => debug!("Sequence of {}.{} reset", table.name, column.name),
            Err(err) => warn!(
                "Unable to reset sequence of {}.{}: {err:#}",
                table.name, column.name
            ),
        }
    }
}

/// Looks for dangling references once constraints are restored and applies
/// `policy` to them. Failing checks are logged and skipped.
pub fn reconcile(
    destination: &mut dyn DestinationWriter,
    foreign_keys: &[ForeignKeyRef],
    policy: DanglingPolicy,
) -> Vec<DanglingCheck> {
    let mut checks = Vec::with_capacity(foreign_keys.len());
    for fk in foreign_keys {
        let dangling = match destination.count_dangling(fk) {
            Ok(dangling) => dangling,
            Err(err) => {
                warn!(
                    "Unable to check {}.{} -> {}.{}: {err:#}",
                    fk.table, fk.column, fk.referenced_table, fk.referenced_column
                );
                continue;
            }
        };
        let mut resolved = 0;
        if dangling > 0 {
            warn!(
                "{dangling} rows of {}.{} reference missing {}.{}",
                fk.table, fk.column, fk.referenced_table, fk.referenced_column
            );
            match destination.resolve_dangling(fk, policy) {
                Ok(count) => resolved = count,
                Err(err) => warn!("Unable to resolve dangling references of {}: {err:#}", fk.table),
            }
        }
        checks.push(DanglingCheck {
            foreign_key: fk.clone(),
            dangling,
            resolved,
            policy,
        });
    }
    return checks;
}
