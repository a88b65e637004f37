//! Taxonomy resolver: builds the `genus_species` key and fills the French and
//! English common names from three ordered sources.
//!
//! 1. direct translation of the French name,
//! 2. manual override keyed by `genus_species`,
//! 3. genus-level fallback, only when both names and the species are blank.
//!
//! Each step writes a name only while it is still blank, so an earlier source
//! always wins over a later one.

use std::collections::BTreeMap;

use itertools::Itertools;
use log::debug;
use serde::Serialize;

use crate::{
    record::{CanonicalBatch, CanonicalRecord, is_blank},
    tables::{LookupTables, lookup_key},
};

/// What each cascade step contributed for a single record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub translated: bool,
    pub french_from_override: bool,
    pub en_from_override: bool,
    pub genus_fallback: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaxonomyStats {
    pub translated: usize,
    pub french_from_override: usize,
    pub en_from_override: usize,
    /// Records filled by the genus fallback, keyed by normalized genus.
    pub genus_fallbacks: BTreeMap<String, usize>,
    /// Records still carrying no name in either language.
    pub unresolved: usize,
}

/// `"<genus> <species>"` with whitespace collapsed. Stringified nulls
/// (`nan`, `none`) collapse to the empty key.
pub fn genus_species_key(genus: &str, species: &str) -> String {
    let key = genus.split_whitespace().chain(species.split_whitespace()).join(" ");
    if matches!(key.as_str(), "nan" | "none") {
        String::new()
    } else {
        key
    }
}

fn fill_if_blank(target: &mut String, value: &str) -> bool {
    if is_blank(target) && !is_blank(value) {
        *target = value.to_string();
        true
    } else {
        false
    }
}

pub fn resolve_record(
    mut record: CanonicalRecord,
    tables: &LookupTables,
) -> (CanonicalRecord, Resolution) {
    let mut resolution = Resolution::default();
    record.genus_species = genus_species_key(&record.genus, &record.species);

    if !is_blank(&record.french_name)
        && let Some(english) = tables.translate(&record.french_name)
    {
        resolution.translated = fill_if_blank(&mut record.en_name, english);
    }

    if !record.genus_species.is_empty()
        && let Some(names) = tables.species_override(&record.genus_species)
    {
        resolution.french_from_override = fill_if_blank(&mut record.french_name, &names.french_name);
        resolution.en_from_override = fill_if_blank(&mut record.en_name, &names.en_name);
    }

    if !record.has_name()
        && is_blank(&record.species)
        && let Some(names) = tables.genus_fallback(&record.genus)
    {
        record.french_name = names.french_name.clone();
        record.en_name = names.en_name.clone();
        resolution.genus_fallback = Some(lookup_key(&record.genus));
    }

    (record, resolution)
}

pub fn resolve_batch(batch: CanonicalBatch, tables: &LookupTables) -> (CanonicalBatch, TaxonomyStats) {
    let mut stats = TaxonomyStats::default();
    let batch = batch.map_records(|record| {
        let (record, resolution) = resolve_record(record, tables);
        stats.translated += usize::from(resolution.translated);
        stats.french_from_override += usize::from(resolution.french_from_override);
        stats.en_from_override += usize::from(resolution.en_from_override);
        if let Some(genus) = resolution.genus_fallback {
            *stats.genus_fallbacks.entry(genus).or_insert(0) += 1;
        }
        if !record.has_name() {
            stats.unresolved += 1;
        }
        record
    });
    for (genus, hits) in &stats.genus_fallbacks {
        debug!("Genus fallback '{genus}': {hits} row(s)");
    }
    (batch, stats)
}
