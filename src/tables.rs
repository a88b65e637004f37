//! Lookup tables driving name resolution and category standardization.
//!
//! The tables are data, not logic: they ship as a versioned YAML document
//! (`data/lookup_tables.yml`) embedded in the binary, and can be replaced at
//! runtime with `--tables`. Loading compiles every table into a map keyed by the
//! trimmed, lower-cased source key so lookups are case-insensitive throughout.

use std::{
    collections::{BTreeMap, HashMap, hash_map::Entry},
    fs::{self, File},
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    error::TableError,
    record::{GrowthStage, is_blank},
};

pub const EMBEDDED_TABLES: &str = include_str!("../data/lookup_tables.yml");

const DEFAULT_UNSPECIFIED_GENUS: &str = "Non spécifié";
const DEFAULT_REMARKABLE_TOKEN: &str = "OUI";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonNames {
    pub french_name: String,
    pub en_name: String,
}

/// On-disk shape of the lookup tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default = "TableDocument::default_unspecified_genus")]
    pub unspecified_genus: String,
    #[serde(default = "TableDocument::default_remarkable_token")]
    pub remarkable_token: String,
    #[serde(default)]
    pub translations: BTreeMap<String, String>,
    #[serde(default)]
    pub species_overrides: BTreeMap<String, CommonNames>,
    #[serde(default)]
    pub genus_fallbacks: BTreeMap<String, CommonNames>,
    #[serde(default)]
    pub ownership: BTreeMap<String, String>,
    #[serde(default)]
    pub growth_stages: BTreeMap<String, GrowthStage>,
}

impl TableDocument {
    fn default_unspecified_genus() -> String {
        DEFAULT_UNSPECIFIED_GENUS.to_string()
    }

    fn default_remarkable_token() -> String {
        DEFAULT_REMARKABLE_TOKEN.to_string()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("Creating tables file {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing lookup tables YAML")
    }
}

#[derive(Debug, Clone)]
pub struct LookupTables {
    document: TableDocument,
    digest: String,
    unspecified_genus: String,
    remarkable_token: String,
    translations: HashMap<String, String>,
    species_overrides: HashMap<String, CommonNames>,
    genus_fallbacks: HashMap<String, CommonNames>,
    ownership: HashMap<String, String>,
    growth_stages: HashMap<String, GrowthStage>,
}

/// Normalized form used for every table key and every looked-up value.
pub fn lookup_key(value: &str) -> String {
    value.trim().to_lowercase()
}

impl LookupTables {
    /// Tables compiled into the binary.
    pub fn embedded() -> Result<Self, TableError> {
        Self::from_yaml_str(EMBEDDED_TABLES)
    }

    pub fn load(path: &Path) -> Result<Self, TableError> {
        let text = fs::read_to_string(path).map_err(|source| TableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, TableError> {
        let document: TableDocument =
            serde_yaml::from_str(text).map_err(|source| TableError::Parse { source })?;
        let digest = format!("{:x}", Sha256::digest(text.as_bytes()));
        Self::compile(document, digest)
    }

    fn compile(document: TableDocument, digest: String) -> Result<Self, TableError> {
        if let Some((key, _)) = document
            .genus_fallbacks
            .iter()
            .find(|(_, names)| is_blank(&names.french_name) || is_blank(&names.en_name))
        {
            return Err(TableError::IncompleteFallback { key: key.clone() });
        }
        Ok(Self {
            unspecified_genus: lookup_key(&document.unspecified_genus),
            remarkable_token: document.remarkable_token.trim().to_uppercase(),
            translations: index_table("translations", &document.translations)?,
            species_overrides: index_table("species_overrides", &document.species_overrides)?,
            genus_fallbacks: index_table("genus_fallbacks", &document.genus_fallbacks)?,
            ownership: index_table("ownership", &document.ownership)?,
            growth_stages: index_table("growth_stages", &document.growth_stages)?,
            document,
            digest,
        })
    }

    pub fn document(&self) -> &TableDocument {
        &self.document
    }

    pub fn version(&self) -> Option<&str> {
        self.document.version.as_deref()
    }

    /// SHA-256 of the source document, hex encoded.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn translate(&self, french_name: &str) -> Option<&str> {
        self.translations
            .get(&lookup_key(french_name))
            .map(String::as_str)
    }

    pub fn species_override(&self, genus_species: &str) -> Option<&CommonNames> {
        self.species_overrides.get(&lookup_key(genus_species))
    }

    pub fn genus_fallback(&self, genus: &str) -> Option<&CommonNames> {
        self.genus_fallbacks.get(&lookup_key(genus))
    }

    pub fn ownership(&self, code: &str) -> Option<&str> {
        self.ownership.get(&lookup_key(code)).map(String::as_str)
    }

    /// Finds a canonical ownership label (a table value), ignoring case.
    pub fn ownership_label(&self, label: &str) -> Option<&str> {
        let key = lookup_key(label);
        self.ownership
            .values()
            .find(|value| lookup_key(value) == key)
            .map(String::as_str)
    }

    pub fn growth_stage(&self, label: &str) -> Option<&GrowthStage> {
        self.growth_stages.get(&lookup_key(label))
    }

    pub fn is_unspecified_genus(&self, genus: &str) -> bool {
        lookup_key(genus) == self.unspecified_genus
    }

    pub fn is_affirmative(&self, flag: &str) -> bool {
        flag.trim().to_uppercase() == self.remarkable_token
    }

    pub fn entry_counts(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("translations", self.translations.len()),
            ("species_overrides", self.species_overrides.len()),
            ("genus_fallbacks", self.genus_fallbacks.len()),
            ("ownership", self.ownership.len()),
            ("growth_stages", self.growth_stages.len()),
        ]
    }
}

fn index_table<V>(
    table: &'static str,
    entries: &BTreeMap<String, V>,
) -> Result<HashMap<String, V>, TableError>
where
    V: Clone + PartialEq,
{
    let mut index: HashMap<String, (&str, V)> = HashMap::with_capacity(entries.len());
    for (raw, value) in entries {
        let key = lookup_key(raw);
        if key.is_empty() {
            return Err(TableError::EmptyKey { table });
        }
        match index.entry(key) {
            Entry::Occupied(entry) => {
                let (first, existing) = entry.get();
                if existing != value {
                    return Err(TableError::ConflictingKey {
                        table,
                        first: first.to_string(),
                        second: raw.clone(),
                    });
                }
            }
            Entry::Vacant(entry) => {
                entry.insert((raw.as_str(), value.clone()));
            }
        }
    }
    Ok(index
        .into_iter()
        .map(|(key, (_, value))| (key, value))
        .collect())
}
