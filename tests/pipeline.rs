mod common;

use common::{find, raw_batch, sample_batch, tables};
use proptest::prelude::*;
use tree_inventory::{
    error::PipelineError,
    pipeline::clean,
    record::{CanonicalRecord, GrowthStage, RawBatch, is_blank},
    taxonomy::resolve_record,
};

const TAXONOMY_HEADERS: [&str; 5] = [
    "IDBASE",
    "GENRE",
    "ESPECE",
    "LIBELLE FRANCAIS",
    "geo_point_2d",
];

fn taxonomy_batch(rows: &[&[&str]]) -> RawBatch {
    raw_batch(&TAXONOMY_HEADERS, rows)
}

#[test]
fn genus_without_fallback_is_retained_unnamed() {
    let raw = taxonomy_batch(&[&["1", "Platane", "", "", ""]]);
    let cleaned = clean(&raw, &tables()).expect("clean");
    assert_eq!(cleaned.batch.len(), 1);
    let record = &cleaned.batch.records[0];
    assert_eq!(record.genus_species, "Platane");
    assert_eq!(record.french_name, "");
    assert_eq!(record.en_name, "");
    assert_eq!(cleaned.report.dropped_rows, 0);
    assert_eq!(cleaned.report.retained_unnamed, 1);
}

#[test]
fn french_name_is_translated() {
    let raw = taxonomy_batch(&[&["1", "", "", "Platane", ""]]);
    let cleaned = clean(&raw, &tables()).expect("clean");
    let record = &cleaned.batch.records[0];
    assert_eq!(record.french_name, "Platane");
    assert_eq!(record.en_name, "Plane tree");
}

#[test]
fn unspecified_genus_without_names_is_dropped() {
    let raw = taxonomy_batch(&[
        &["1", "Non spécifié", "", "", ""],
        &["2", "Tilia", "", "", ""],
    ]);
    let cleaned = clean(&raw, &tables()).expect("clean");
    assert_eq!(cleaned.report.input_rows, 2);
    assert_eq!(cleaned.report.dropped_rows, 1);
    assert_eq!(cleaned.report.drop_percent, 50.0);
    assert_eq!(cleaned.batch.records[0].tree_id, "2");
}

#[test]
fn young_adult_stage_is_reported_as_adult() {
    let raw = raw_batch(
        &["LIBELLE FRANCAIS", "STADE DE DEVELOPPEMENT"],
        &[&["Tilleul", "Jeune (arbre)Adulte"]],
    );
    let cleaned = clean(&raw, &tables()).expect("clean");
    let stage = cleaned.batch.records[0].growth_stage.as_ref();
    assert_eq!(stage, Some(&GrowthStage::Adult));
    assert_eq!(stage.map(GrowthStage::label), Some("Adult"));
}

#[test]
fn combined_coordinates_parse_or_degrade() {
    let raw = taxonomy_batch(&[
        &["1", "Tilia", "", "", "48.8566, 2.3522"],
        &["2", "Tilia", "", "", "48.8566"],
    ]);
    let cleaned = clean(&raw, &tables()).expect("clean");
    let records = &cleaned.batch.records;
    assert_eq!(records[0].lat, Some(48.8566));
    assert_eq!(records[0].lon, Some(2.3522));
    assert_eq!(records[1].lat, None);
    assert_eq!(records[1].lon, None);
    assert_eq!(cleaned.batch.len(), 2);
    assert_eq!(cleaned.report.normalize.unparsable_coordinates, 1);
}

#[test]
fn batch_without_taxonomy_columns_fails() {
    let raw = raw_batch(&["IDBASE", "ARRONDISSEMENT"], &[&["1", "PARIS 7E ARRDT"]]);
    let err = clean(&raw, &tables()).unwrap_err();
    assert!(matches!(err, PipelineError::MissingTaxonomyColumns { .. }));
}

#[test]
fn ambiguous_headers_fail() {
    let raw = raw_batch(&["GENRE", "genus"], &[&["Tilia", "Acer"]]);
    let err = clean(&raw, &tables()).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::DuplicateColumn { field: "genus", .. }
    ));
}

#[test]
fn missing_coordinate_column_is_not_fatal() {
    let raw = raw_batch(&["GENRE"], &[&["Tilia"]]);
    let cleaned = clean(&raw, &tables()).expect("clean");
    assert!(!cleaned.report.normalize.coordinates_available);
    assert_eq!(cleaned.batch.records[0].lat, None);
    assert_eq!(cleaned.batch.records[0].arr_num, None);
}

#[test]
fn sample_export_is_cleaned_end_to_end() {
    let cleaned = clean(&sample_batch(), &tables()).expect("clean");
    let report = &cleaned.report;
    assert_eq!(report.input_rows, 10);
    assert_eq!(report.dropped_rows, 2);
    assert_eq!(report.output_rows, 8);
    assert_eq!(report.retained_unnamed, 1);
    assert_eq!(report.taxonomy.translated, 5);
    assert_eq!(report.taxonomy.french_from_override, 1);
    assert_eq!(report.taxonomy.genus_fallbacks.get("tilia"), Some(&1));
    assert_eq!(report.categories.unmapped_ownership.get("DPJEP"), Some(&1));
    assert_eq!(
        report.categories.unmapped_growth_stages.get("Sénescent"),
        Some(&1)
    );
    assert_eq!(report.normalize.unparsable_coordinates, 1);
    assert_eq!(report.normalize.missing_coordinates, 1);
    assert_eq!(report.normalize.unparsable_measures, 1);
    assert_eq!(report.derived.remarkable, 2);
    assert_eq!(report.tables_digest.len(), 64);

    let records = &cleaned.batch.records;
    let maple = find(records, "103");
    assert_eq!(maple.genus_species, "Acer platanoides");
    assert_eq!(maple.french_name, "Érable plane");
    assert_eq!(maple.en_name, "Norway maple");
    assert_eq!(maple.ownership, "Schools");
    assert_eq!(maple.arr_num, Some(12));
    assert_eq!(maple.growth_stage, Some(GrowthStage::YoungTree));

    let linden = find(records, "104");
    assert_eq!((linden.french_name.as_str(), linden.en_name.as_str()), ("Tilleul", "Linden"));
    assert_eq!(linden.ownership, "Street alignment");

    let plane = find(records, "101");
    assert_eq!(plane.en_name, "Plane tree");
    assert_eq!(plane.lat, Some(48.853));
    assert_eq!(plane.arr_num, Some(7));

    let chestnut = find(records, "108");
    assert_eq!(chestnut.arr_num, None);
    assert_eq!(chestnut.lat, None);
    assert_eq!(
        chestnut.growth_stage,
        Some(GrowthStage::Unmapped("Sénescent".to_string()))
    );

    assert!(find(records, "109").is_remarkable);
    assert!(find(records, "102").is_remarkable);
    assert!(!find(records, "101").is_remarkable);
    assert_eq!(cleaned.batch.passthrough_headers, vec!["NUMERO".to_string()]);
    assert_eq!(find(records, "101").passthrough, vec!["12".to_string()]);
}

#[test]
fn cleaning_twice_yields_identical_batches() {
    let raw = sample_batch();
    let first = clean(&raw, &tables()).expect("first run");
    let second = clean(&raw, &tables()).expect("second run");
    assert_eq!(first.batch, second.batch);
    assert_eq!(first.report, second.report);
}

#[test]
fn cleaned_output_can_be_cleaned_again() {
    let first = clean(&sample_batch(), &tables()).expect("first run");
    let reread = RawBatch::new(first.batch.headers(), first.batch.rows());
    let second = clean(&reread, &tables()).expect("second run");
    assert_eq!(second.report.dropped_rows, 0);
    assert_eq!(second.batch.records, first.batch.records);
    assert_eq!(
        second.report.categories.unmapped_ownership.keys().collect::<Vec<_>>(),
        ["DPJEP"]
    );
    assert_eq!(second.report.categories, first.report.categories);
}

const GENERA: [&str; 7] = ["", " ", "Tilia", "Acer", "Platane", "Non spécifié", "NON SPÉCIFIÉ"];
const SPECIES: [&str; 4] = ["", "platanoides", "tomentosa", "x hispanica"];
const FRENCH: [&str; 5] = ["", "Tilleul", "Platane", "Erable plane rouge", "  "];
const ENGLISH: [&str; 3] = ["", "London plane", "Lime"];

fn raw_rows() -> impl Strategy<Value = Vec<(String, String, String, String)>> {
    prop::collection::vec(
        (
            prop::sample::select(GENERA.to_vec()),
            prop::sample::select(SPECIES.to_vec()),
            prop::sample::select(FRENCH.to_vec()),
            prop::sample::select(ENGLISH.to_vec()),
        )
            .prop_map(|(g, s, f, e)| (g.to_string(), s.to_string(), f.to_string(), e.to_string())),
        0..40,
    )
}

fn property_batch(rows: &[(String, String, String, String)]) -> RawBatch {
    RawBatch::new(
        ["IDBASE", "GENRE", "ESPECE", "LIBELLE FRANCAIS", "en_name"]
            .iter()
            .map(|h| h.to_string())
            .collect(),
        rows.iter()
            .enumerate()
            .map(|(idx, (g, s, f, e))| vec![idx.to_string(), g.clone(), s.clone(), f.clone(), e.clone()])
            .collect(),
    )
}

proptest! {
    #[test]
    fn survivors_satisfy_identity_rule(rows in raw_rows()) {
        let tables = tables();
        let cleaned = clean(&property_batch(&rows), &tables).unwrap();
        for record in &cleaned.batch.records {
            prop_assert!(
                record.has_name()
                    || (!is_blank(&record.genus) && !tables.is_unspecified_genus(&record.genus))
            );
        }
    }

    #[test]
    fn dropped_rows_are_conserved(rows in raw_rows()) {
        let cleaned = clean(&property_batch(&rows), &tables()).unwrap();
        let report = &cleaned.report;
        prop_assert_eq!(report.input_rows, rows.len());
        prop_assert_eq!(cleaned.batch.len() + report.dropped_rows, rows.len());
        prop_assert_eq!(report.output_rows, cleaned.batch.len());
    }

    #[test]
    fn provided_names_are_never_overwritten(rows in raw_rows()) {
        let cleaned = clean(&property_batch(&rows), &tables()).unwrap();
        for record in &cleaned.batch.records {
            let idx: usize = record.tree_id.parse().unwrap();
            let (_, _, french, english) = &rows[idx];
            if !is_blank(french) {
                prop_assert_eq!(&record.french_name, french.trim());
            }
            if !is_blank(english) {
                prop_assert_eq!(&record.en_name, english.trim());
            }
        }
    }

    #[test]
    fn genus_fallback_fills_both_names(rows in raw_rows()) {
        let tables = tables();
        for (genus, species, french, english) in &rows {
            let record = CanonicalRecord {
                genus: genus.trim().to_string(),
                species: species.trim().to_string(),
                french_name: french.trim().to_string(),
                en_name: english.trim().to_string(),
                ..CanonicalRecord::default()
            };
            let (resolved, resolution) = resolve_record(record, &tables);
            if resolution.genus_fallback.is_some() {
                prop_assert!(!is_blank(&resolved.french_name));
                prop_assert!(!is_blank(&resolved.en_name));
            }
        }
    }

    #[test]
    fn repeated_runs_agree(rows in raw_rows()) {
        let raw = property_batch(&rows);
        let first = clean(&raw, &tables()).unwrap();
        let second = clean(&raw, &tables()).unwrap();
        prop_assert_eq!(first.batch, second.batch);
    }
}
