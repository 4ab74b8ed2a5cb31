use std::time::Instant;

use anyhow::Context;
use chrono::Utc;
use itertools::Itertools;
use tracing::{info, warn};

use crate::args::ImportArgs;
use crate::databases::table::{ForeignKeyRef, TableDescriptor};
use crate::databases::traits::{DestinationWriter, SourceReader};
use crate::importer::{ConstraintPhase, DanglingPolicy, ImportResult, TableImporter, reconcile};
use crate::order::DependencyOrderer;
use crate::plan::ImportPlan;
use crate::report::RunReport;
use crate::verify::{print_sample, verify_counts};

/// One import run over a set of tables: order, load, reconcile, verify.
pub struct ImportRun<'a> {
    source: &'a mut dyn SourceReader,
    destination: &'a mut dyn DestinationWriter,
    plan: ImportPlan,
    limit: Option<u64>,
    batch_size: u64,
    dangling: DanglingPolicy,
}

impl<'a> ImportRun<'a> {
    pub fn new(
        source: &'a mut dyn SourceReader,
        destination: &'a mut dyn DestinationWriter,
        plan: ImportPlan,
        args: &ImportArgs,
    ) -> Self {
        return Self {
            source,
            destination,
            plan,
            limit: args.limit,
            batch_size: args.batch_size,
            dangling: args.dangling,
        };
    }

    /// Describes `tables` (every source table when empty). Tables that
    /// cannot be described are returned as failed results.
    fn describe(
        &mut self,
        tables: &[String],
    ) -> anyhow::Result<(Vec<TableDescriptor>, Vec<ImportResult>)> {
        let names = if tables.is_empty() {
            self.source
                .get_tables()
                .context("Unable to list source tables")?
        } else {
            tables.to_vec()
        };
        let mut descriptors = Vec::with_capacity(names.len());
        let mut failed = Vec::new();
        for name in names {
            match self.source.describe_table(&name) {
                Ok(table) => descriptors.push(table),
                Err(err) => {
                    warn!("Unable to describe table {name}: {err:#}");
                    let mut result = ImportResult::new(&name);
                    result.failure = Some(format!("{err:#}"));
                    failed.push(result);
                }
            }
        }
        return Ok((descriptors, failed));
    }

    pub fn run(&mut self, tables: &[String]) -> anyhow::Result<RunReport> {
        let started = Instant::now();
        let timestamp = Utc::now();
        let (mut descriptors, mut results) = self.describe(tables)?;
        self.plan.apply_declared_keys(&mut descriptors);
        let ordered = DependencyOrderer::new(&self.plan).order(&descriptors);
        info!(
            "Import order: {}",
            ordered.iter().map(|t| t.name.as_str()).join(", ")
        );

        let mut importer = TableImporter::new(self.batch_size);
        if ordered.iter().any(|t| !t.foreign_keys.is_empty()) {
            importer.suspend_constraints(self.destination);
        }
        if importer.phase() == ConstraintPhase::Enforced {
            importer.clear_tables(self.destination, &ordered);
        }
        for (i, table) in ordered.iter().enumerate() {
            info!("Importing table {} ({}/{})", table.name, i + 1, ordered.len());
            let limit = self.plan.limit_for(&table.name, self.limit);
            results.push(importer.import_table(self.source, self.destination, table, limit));
        }
        importer.restore_constraints(self.destination)?;

        let foreign_keys: Vec<ForeignKeyRef> = ordered
            .iter()
            .flat_map(|t| t.foreign_keys.iter())
            .filter(|fk| descriptors.iter().any(|t| t.name == fk.referenced_table))
            .cloned()
            .collect();
        let dangling = reconcile(self.destination, &foreign_keys, self.dangling);

        let imported: Vec<ImportResult> = results
            .iter()
            .filter(|r| r.failure.is_none())
            .cloned()
            .collect();
        let verification = verify_counts(self.destination, &imported, &dangling);
        if let Some(query) = &self.plan.sample_query {
            info!("Sample data:");
            print_sample(self.destination, query);
        }

        let report = RunReport::new(
            timestamp,
            started.elapsed(),
            results,
            verification,
            dangling,
        );
        for line in report.summary_lines() {
            info!("{line}");
        }
        return Ok(report);
    }
}
