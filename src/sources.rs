//! Curated list records
//!
//! Only the parts of `list_sources.yaml` that feed the name cache are
//! modelled: each record's name and the MyAnimeList ids under `database`.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::id::CatalogId;

/// Default location of the curated list
pub const DEFAULT_SOURCES_FILE: &str = "list_sources.yaml";

/// Database key holding MyAnimeList ids
const MAL_DATABASE: &str = "mal";

#[derive(Debug, thiserror::Error)]
pub enum SourcesError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Record {record:?} has an invalid MAL id: {source}")]
    InvalidId {
        record: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// One entry of the curated list
#[derive(Debug, Deserialize)]
pub struct SourceRecord {
    pub name: String,
    /// Links to external databases, e.g. `{mal: 32281}` or `{mal: [1, 2]}`
    #[serde(default)]
    pub database: Option<Vec<BTreeMap<String, serde_yaml::Value>>>,
}

/// A database link holds a single id or one id per episode
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdField {
    One(CatalogId),
    Many(Vec<CatalogId>),
}

impl SourceRecord {
    /// Every MyAnimeList id this record references, in file order
    pub fn mal_ids(&self) -> Result<Vec<CatalogId>, SourcesError> {
        let mut ids = Vec::new();
        for link in self.database.iter().flatten() {
            let Some(value) = link.get(MAL_DATABASE) else {
                continue;
            };
            let field: IdField =
                serde_yaml::from_value(value.clone()).map_err(|source| SourcesError::InvalidId {
                    record: self.name.clone(),
                    source,
                })?;
            match field {
                IdField::One(id) => ids.push(id),
                IdField::Many(many) => ids.extend(many),
            }
        }
        Ok(ids)
    }
}

/// Parse the curated list at `path`
pub fn load_sources(path: &Path) -> Result<Vec<SourceRecord>, SourcesError> {
    let text = fs::read_to_string(path).map_err(|source| SourcesError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| SourcesError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Distinct MyAnimeList ids across all records, first occurrence first
pub fn collect_mal_ids(records: &[SourceRecord]) -> Result<Vec<CatalogId>, SourcesError> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for record in records {
        for id in record.mal_ids()? {
            if seen.insert(id) {
                ids.push(id);
            }
        }
    }
    Ok(ids)
}
