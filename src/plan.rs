use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::databases::table::{ForeignKeyRef, TableDescriptor};

const LEGACY_PRIORITIES: [&str; 14] = [
    "ak_users",
    "ak_animes",
    "ak_mangas",
    "ak_business",
    "ak_tags",
    "ak_critique",
    "ak_business_to_animes",
    "ak_business_to_mangas",
    "ak_tag2fiche",
    "ak_user_anime_list",
    "ak_user_manga_list",
    "ak_top_lists",
    "ak_top_list_items",
    "ak_anime_screenshots",
];

const LEGACY_FOREIGN_KEYS: [(&str, &str, &str, &str); 7] = [
    ("ak_critique", "id_membre", "ak_users", "id"),
    ("ak_critique", "id_anime", "ak_animes", "id_anime"),
    ("ak_critique", "id_manga", "ak_mangas", "id_manga"),
    ("ak_business_to_animes", "id_anime", "ak_animes", "id_anime"),
    ("ak_business_to_animes", "id_business", "ak_business", "id_business"),
    ("ak_business_to_mangas", "id_manga", "ak_mangas", "id_manga"),
    ("ak_business_to_mangas", "id_business", "ak_business", "id_business"),
];

const LEGACY_SAMPLE_QUERY: &str = "SELECT c.titre, u.username, a.titre, c.notation \
    FROM ak_critique c \
    JOIN ak_users u ON c.id_membre = u.id \
    LEFT JOIN ak_animes a ON c.id_anime = a.id_anime \
    LIMIT 3";

/// Which tables to import first, the relations MySQL does not declare,
/// per-table row limits and the query used to eyeball the result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportPlan {
    /// Table names, highest priority first
    pub priorities: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyRef>,
    pub limits: BTreeMap<String, u64>,
    pub sample_query: Option<String>,
}

impl Default for ImportPlan {
    fn default() -> Self {
        return Self::legacy();
    }
}

impl ImportPlan {
    pub fn legacy() -> Self {
        return Self {
            priorities: LEGACY_PRIORITIES.iter().map(|t| t.to_string()).collect(),
            foreign_keys: LEGACY_FOREIGN_KEYS
                .iter()
                .map(|(table, column, ref_table, ref_column)| {
                    ForeignKeyRef::new(table, column, ref_table, ref_column)
                })
                .collect(),
            limits: BTreeMap::new(),
            sample_query: Some(LEGACY_SAMPLE_QUERY.to_string()),
        };
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read import plan {}", path.display()))?;
        return serde_json::from_str(&content)
            .with_context(|| format!("Invalid import plan {}", path.display()));
    }

    pub fn priority(&self, table: &str) -> Option<usize> {
        return self.priorities.iter().position(|t| t == table);
    }

    /// A limit given on the command line wins over the plan's.
    pub fn limit_for(&self, table: &str, overridden: Option<u64>) -> Option<u64> {
        return overridden.or_else(|| self.limits.get(table).copied());
    }

    /// Declared keys whose columns exist on both sides, merged into `tables`.
    pub fn apply_declared_keys(&self, tables: &mut [TableDescriptor]) {
        for fk in &self.foreign_keys {
            let referenced_exists = tables
                .iter()
                .any(|t| t.name == fk.referenced_table && t.has_column(&fk.referenced_column));
            if !referenced_exists {
                continue;
            }
            if let Some(table) = tables
                .iter_mut()
                .find(|t| t.name == fk.table && t.has_column(&fk.column))
            {
                table.add_foreign_key(fk.clone());
            }
        }
    }
}
