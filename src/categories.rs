//! Category standardizer for ownership codes and growth-stage labels.
//!
//! Unknown values are never coerced: they pass through (trimmed) and are
//! tallied so new source codes show up in the report.

use std::collections::BTreeMap;

use log::warn;
use serde::Serialize;

use crate::{
    record::{CanonicalBatch, GrowthStage, is_blank},
    tables::LookupTables,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub unmapped_ownership: BTreeMap<String, usize>,
    pub unmapped_growth_stages: BTreeMap<String, usize>,
}

/// Maps a source code to its canonical label. A value that already is a
/// canonical label resolves to itself, so cleaned output can be fed back in.
fn resolve_ownership<'t>(code: &str, tables: &'t LookupTables) -> Option<&'t str> {
    tables
        .ownership(code)
        .or_else(|| tables.ownership_label(code))
}

/// Returns the canonical ownership label, or the trimmed input when the code is unknown.
pub fn standardize_ownership(code: &str, tables: &LookupTables) -> String {
    match resolve_ownership(code, tables) {
        Some(label) => label.to_string(),
        None => code.trim().to_string(),
    }
}

/// Maps a raw stage label through the tables. Labels that already read as a
/// canonical stage are recognized so cleaned output can be fed back in.
pub fn standardize_growth_stage(
    stage: Option<GrowthStage>,
    tables: &LookupTables,
) -> Option<GrowthStage> {
    let raw = match stage? {
        GrowthStage::Unmapped(raw) => raw,
        canonical => return Some(canonical),
    };
    if let Some(mapped) = tables.growth_stage(&raw) {
        return Some(mapped.clone());
    }
    let trimmed = raw.trim();
    let canonical = GrowthStage::CANONICAL
        .into_iter()
        .find(|candidate| candidate.label().eq_ignore_ascii_case(trimmed));
    Some(canonical.unwrap_or_else(|| GrowthStage::Unmapped(trimmed.to_string())))
}

pub fn standardize_batch(
    batch: CanonicalBatch,
    tables: &LookupTables,
) -> (CanonicalBatch, CategoryStats) {
    let mut stats = CategoryStats::default();
    let batch = batch.map_records(|mut record| {
        if !is_blank(&record.ownership) {
            if resolve_ownership(&record.ownership, tables).is_none() {
                *stats
                    .unmapped_ownership
                    .entry(record.ownership.trim().to_string())
                    .or_insert(0) += 1;
            }
            record.ownership = standardize_ownership(&record.ownership, tables);
        }
        record.growth_stage = standardize_growth_stage(record.growth_stage.take(), tables);
        if let Some(GrowthStage::Unmapped(label)) = &record.growth_stage {
            *stats.unmapped_growth_stages.entry(label.clone()).or_insert(0) += 1;
        }
        record
    });
    if !stats.unmapped_growth_stages.is_empty() {
        warn!(
            "Growth stage label(s) without a mapping passed through: {:?}",
            stats.unmapped_growth_stages.keys().collect::<Vec<_>>()
        );
    }
    (batch, stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> LookupTables {
        LookupTables::embedded().unwrap()
    }

    fn raw(label: &str) -> Option<GrowthStage> {
        Some(GrowthStage::Unmapped(label.to_string()))
    }

    #[test]
    fn young_adult_label_folds_into_adult() {
        assert_eq!(
            standardize_growth_stage(raw("Jeune (arbre)Adulte"), &tables()),
            Some(GrowthStage::Adult)
        );
        assert_eq!(
            standardize_growth_stage(raw("Jeune (arbre)"), &tables()),
            Some(GrowthStage::YoungTree)
        );
        assert_eq!(
            standardize_growth_stage(raw("Mature"), &tables()),
            Some(GrowthStage::Mature)
        );
    }

    #[test]
    fn unknown_stage_passes_through() {
        assert_eq!(
            standardize_growth_stage(raw(" Sénescent "), &tables()),
            raw("Sénescent")
        );
        assert_eq!(standardize_growth_stage(None, &tables()), None);
    }

    #[test]
    fn canonical_stage_labels_are_stable() {
        for stage in GrowthStage::CANONICAL {
            let relabeled = raw(stage.label());
            assert_eq!(standardize_growth_stage(relabeled, &tables()), Some(stage));
        }
    }

    #[test]
    fn ownership_codes_map_or_pass_through() {
        assert_eq!(standardize_ownership("Alignement", &tables()), "Street alignment");
        assert_eq!(standardize_ownership(" DVD ", &tables()), "Roads & Mobility");
        assert_eq!(standardize_ownership(" DPJEP ", &tables()), "DPJEP");
    }

    #[test]
    fn canonical_ownership_labels_count_as_mapped() {
        let batch = CanonicalBatch {
            records: ["Street alignment", "schools", "DPJEP"]
                .into_iter()
                .map(|ownership| crate::record::CanonicalRecord {
                    ownership: ownership.to_string(),
                    ..Default::default()
                })
                .collect(),
            ..CanonicalBatch::default()
        };
        let (batch, stats) = standardize_batch(batch, &tables());
        let labels = batch
            .records
            .iter()
            .map(|r| r.ownership.as_str())
            .collect::<Vec<_>>();
        assert_eq!(labels, ["Street alignment", "Schools", "DPJEP"]);
        assert_eq!(stats.unmapped_ownership.keys().collect::<Vec<_>>(), ["DPJEP"]);
    }
}
