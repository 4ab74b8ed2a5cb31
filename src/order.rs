use std::collections::{BTreeSet, HashMap, HashSet};

use itertools::Itertools;
use tracing::warn;

use crate::databases::table::TableDescriptor;
use crate::plan::ImportPlan;

/// Orders imports so that referenced tables are loaded before the tables
/// pointing at them. Ties follow the plan's priority list, tables missing
/// from it come last in their original order.
pub struct DependencyOrderer<'a> {
    plan: &'a ImportPlan,
}

impl<'a> DependencyOrderer<'a> {
    pub fn new(plan: &'a ImportPlan) -> Self {
        return Self { plan };
    }

    fn rank(&self, table: &str, position: usize) -> (usize, usize) {
        return (self.plan.priority(table).unwrap_or(usize::MAX), position);
    }

    pub fn order<'t>(&self, tables: &'t [TableDescriptor]) -> Vec<&'t TableDescriptor> {
        let index: HashMap<&str, usize> = tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.as_str(), i))
            .collect();

        // parents[i]: tables that must be imported before tables[i]
        let mut parents: Vec<HashSet<usize>> = vec![HashSet::new(); tables.len()];
        let declared = self.plan.foreign_keys.iter();
        let introspected = tables.iter().flat_map(|t| t.foreign_keys.iter());
        for fk in introspected.chain(declared) {
            let (Some(&child), Some(&parent)) = (
                index.get(fk.table.as_str()),
                index.get(fk.referenced_table.as_str()),
            ) else {
                continue;
            };
            if child != parent {
                parents[child].insert(parent);
            }
        }
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); tables.len()];
        for (child, set) in parents.iter().enumerate() {
            for &parent in set {
                children[parent].push(child);
            }
        }

        let mut pending: Vec<usize> = parents.iter().map(HashSet::len).collect();
        let mut ready: BTreeSet<((usize, usize), usize)> = (0..tables.len())
            .filter(|&i| pending[i] == 0)
            .map(|i| (self.rank(&tables[i].name, i), i))
            .collect();
        let mut ordered = Vec::with_capacity(tables.len());
        let mut done = vec![false; tables.len()];
        while let Some(entry) = ready.pop_first() {
            let (_, i) = entry;
            ordered.push(&tables[i]);
            done[i] = true;
            for &child in &children[i] {
                pending[child] -= 1;
                if pending[child] == 0 {
                    ready.insert((self.rank(&tables[child].name, child), child));
                }
            }
        }

        if ordered.len() < tables.len() {
            let cycle: Vec<usize> = (0..tables.len())
                .filter(|&i| !done[i])
                .sorted_by_key(|&i| self.rank(&tables[i].name, i))
                .collect();
            warn!(
                "Foreign key cycle between {}, importing them in priority order",
                cycle.iter().map(|&i| tables[i].name.as_str()).join(", ")
            );
            ordered.extend(cycle.into_iter().map(|i| &tables[i]));
        }
        return ordered;
    }
}
