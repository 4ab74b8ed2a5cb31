use anyhow::Context;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::databases::quote_pg;
use crate::databases::traits::DestinationWriter;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DropOutcome {
    pub tables_dropped: u64,
    pub sequences_dropped: u64,
    pub failed: u64,
    /// Tables still present afterwards
    pub remaining: Vec<String>,
}

/// Drops every table and sequence of the destination `public` schema.
pub fn drop_all(destination: &mut dyn DestinationWriter) -> anyhow::Result<DropOutcome> {
    let mut outcome = DropOutcome::default();
    let tables = destination
        .get_tables()
        .context("Unable to list destination tables")?;
    info!("Dropping {} tables", tables.len());
    for (table, _) in &tables {
        match destination.execute(&format!("DROP TABLE IF EXISTS {} CASCADE", quote_pg(table))) {
            Ok(()) => outcome.tables_dropped += 1,
            Err(err) => {
                error!("Failed to drop table {table}: {err:#}");
                outcome.failed += 1;
            }
        }
    }

    let sequences = destination
        .get_sequences()
        .context("Unable to list destination sequences")?;
    for sequence in &sequences {
        let statement = format!("DROP SEQUENCE IF EXISTS {} CASCADE", quote_pg(sequence));
        match destination.execute(&statement) {
            Ok(()) => outcome.sequences_dropped += 1,
            Err(err) => {
                error!("Failed to drop sequence {sequence}: {err:#}");
                outcome.failed += 1;
            }
        }
    }

    outcome.remaining = destination
        .get_tables()
        .context("Unable to list destination tables")?
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    if outcome.remaining.is_empty() {
        info!(
            "Dropped {} tables and {} sequences",
            outcome.tables_dropped, outcome.sequences_dropped
        );
    } else {
        warn!("Tables left after drop: {}", outcome.remaining.join(", "));
    }
    return Ok(outcome);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::databases::table::{ColumnDescriptor, TableDescriptor};
    use crate::databases::traits::MockDestinationWriter;
    use crate::test_utils::MemoryDestination;
    use mockall::Sequence;
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_drop_all() {
        let mut seq = Sequence::new();
        let mut destination = MockDestinationWriter::new();
        destination
            .expect_get_tables()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![("ak_animes".to_string(), 12), ("ak_tags".to_string(), 3)]));
        destination
            .expect_execute()
            .with(eq(r#"DROP TABLE IF EXISTS "ak_animes" CASCADE"#))
            .times(1)
            .returning(|_| Ok(()));
        destination
            .expect_execute()
            .with(eq(r#"DROP TABLE IF EXISTS "ak_tags" CASCADE"#))
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("permission denied")));
        destination
            .expect_get_sequences()
            .returning(|| Ok(vec!["ak_animes_id_anime_seq".to_string()]));
        destination
            .expect_execute()
            .with(eq(r#"DROP SEQUENCE IF EXISTS "ak_animes_id_anime_seq" CASCADE"#))
            .times(1)
            .returning(|_| Ok(()));
        destination
            .expect_get_tables()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![("ak_tags".to_string(), 3)]));

        let outcome = drop_all(&mut destination).unwrap();

        assert_eq!(
            outcome,
            DropOutcome {
                tables_dropped: 1,
                sequences_dropped: 1,
                failed: 1,
                remaining: vec!["ak_tags".to_string()],
            }
        );
    }

    #[test]
    fn test_drop_all_removes_tables_and_sequences() {
        let mut id = ColumnDescriptor::new("id_anime", "int");
        id.auto_increment = true;
        let mut destination = MemoryDestination::default();
        destination.create_table(&TableDescriptor::new("ak_animes", vec![id]));
        destination.create_table(&TableDescriptor::new(
            "ak_tag2fiche",
            vec![ColumnDescriptor::new("id_tag", "int")],
        ));

        let outcome = drop_all(&mut destination).unwrap();

        assert_eq!(
            outcome,
            DropOutcome {
                tables_dropped: 2,
                sequences_dropped: 1,
                failed: 0,
                remaining: vec![],
            }
        );
        assert!(destination.sequences.is_empty());
    }
}
