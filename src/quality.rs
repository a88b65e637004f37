//! Data-quality audit over a cleaned batch: missingness of key fields,
//! duplicate candidates and plausibility checks.

use std::cmp::Ordering;

use anyhow::Result;
use itertools::Itertools;
use log::info;
use serde::Serialize;

use crate::{
    cli::QualityArgs,
    record::{CanonicalBatch, CanonicalRecord, Field, is_blank},
    table,
};

/// Fields whose missingness is reported, in canonical order.
pub const KEY_FIELDS: [&str; 10] = [
    "lat",
    "lon",
    "arr_num",
    "en_name",
    "french_name",
    "genus_species",
    "height_m",
    "circumference_cm",
    "ownership",
    "growth_stage",
];

const LAT_RANGE: (f64, f64) = (48.80, 48.92);
const LON_RANGE: (f64, f64) = (2.23, 2.48);
const DISTRICT_RANGE: (f64, f64) = (1.0, 20.0);
const HEIGHT_RANGE: (f64, f64) = (0.0, 60.0);
const CIRCUMFERENCE_RANGE: (f64, f64) = (0.0, 2000.0);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Missingness {
    pub field: &'static str,
    pub missing: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateBasis {
    TreeId,
    /// `(lat, lon, genus_species, french_name, en_name, arr_num)`
    LocationAndTaxon,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateSummary {
    pub basis: DuplicateBasis,
    /// Records sharing their key with at least one other record.
    pub records: usize,
    /// Distinct keys occurring more than once.
    pub groups: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationCheck {
    pub rule: String,
    pub failures: usize,
    pub share: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityReport {
    pub rows: usize,
    pub missingness: Vec<Missingness>,
    pub duplicates: Option<DuplicateSummary>,
    pub checks: Vec<ValidationCheck>,
}

pub fn audit(batch: &CanonicalBatch) -> QualityReport {
    if batch.is_empty() {
        return QualityReport::default();
    }
    QualityReport {
        rows: batch.len(),
        missingness: missingness(batch),
        duplicates: Some(duplicates(batch)),
        checks: validation_checks(batch),
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn percent_of(count: usize, total: usize) -> f64 {
    count as f64 / total.max(1) as f64 * 100.0
}

fn is_missing(record: &CanonicalRecord, field: &str) -> bool {
    match field {
        "lat" => record.lat.is_none(),
        "lon" => record.lon.is_none(),
        "arr_num" => record.arr_num.is_none(),
        "en_name" => is_blank(&record.en_name),
        "french_name" => is_blank(&record.french_name),
        "genus_species" => is_blank(&record.genus_species),
        "height_m" => record.height_m.is_none(),
        "circumference_cm" => record.circumference_cm.is_none(),
        "ownership" => is_blank(&record.ownership),
        "growth_stage" => record.growth_stage.is_none(),
        _ => false,
    }
}

fn missingness(batch: &CanonicalBatch) -> Vec<Missingness> {
    let mut entries = KEY_FIELDS
        .into_iter()
        .map(|field| {
            let missing = batch
                .records
                .iter()
                .filter(|record| is_missing(record, field))
                .count();
            Missingness {
                field,
                missing,
                percent: round_to(percent_of(missing, batch.len()), 1),
            }
        })
        .collect::<Vec<_>>();
    // Stable sort keeps canonical order among equal shares.
    entries.sort_by(|a, b| b.missing.cmp(&a.missing));
    entries
}

fn duplicates(batch: &CanonicalBatch) -> DuplicateSummary {
    let (basis, counts) = if batch.has_source_field(Field::TreeId) {
        let counts = batch
            .records
            .iter()
            .map(|record| record.tree_id.trim())
            .filter(|id| !id.is_empty())
            .counts()
            .into_values()
            .collect::<Vec<_>>();
        (DuplicateBasis::TreeId, counts)
    } else {
        let counts = batch
            .records
            .iter()
            .map(|record| {
                (
                    record.lat.map(f64::to_bits),
                    record.lon.map(f64::to_bits),
                    record.genus_species.as_str(),
                    record.french_name.as_str(),
                    record.en_name.as_str(),
                    record.arr_num,
                )
            })
            .counts()
            .into_values()
            .collect::<Vec<_>>();
        (DuplicateBasis::LocationAndTaxon, counts)
    };
    let repeated = counts.into_iter().filter(|count| *count > 1).collect::<Vec<_>>();
    DuplicateSummary {
        basis,
        records: repeated.iter().sum(),
        groups: repeated.len(),
    }
}

fn outside(value: Option<f64>, (low, high): (f64, f64)) -> bool {
    value.is_some_and(|v| !(low..=high).contains(&v))
}

fn validation_checks(batch: &CanonicalBatch) -> Vec<ValidationCheck> {
    type Rule = (String, fn(&CanonicalRecord) -> bool);
    let rules: [Rule; 7] = [
        (
            format!("Latitude in Paris [{:.2}-{:.2}]", LAT_RANGE.0, LAT_RANGE.1),
            |r| outside(r.lat, LAT_RANGE),
        ),
        (
            format!("Longitude in Paris [{:.2}-{:.2}]", LON_RANGE.0, LON_RANGE.1),
            |r| outside(r.lon, LON_RANGE),
        ),
        ("District number in [1-20]".to_string(), |r| {
            outside(r.arr_num.map(f64::from), DISTRICT_RANGE)
        }),
        ("Height (m) in [0-60]".to_string(), |r| {
            outside(r.height_m, HEIGHT_RANGE)
        }),
        ("Circumference (cm) in [0-2000]".to_string(), |r| {
            outside(r.circumference_cm, CIRCUMFERENCE_RANGE)
        }),
        ("Growth stage is Young tree, Adult or Mature".to_string(), |r| {
            r.growth_stage.as_ref().is_some_and(|stage| !stage.is_canonical())
        }),
        ("Ownership not empty".to_string(), |r| is_blank(&r.ownership)),
    ];

    let mut checks = rules
        .into_iter()
        .map(|(rule, fails)| {
            let failures = batch.records.iter().filter(|record| fails(record)).count();
            ValidationCheck {
                rule,
                failures,
                share: round_to(percent_of(failures, batch.len()), 2),
            }
        })
        .collect::<Vec<_>>();
    checks.sort_by(|a, b| {
        b.share
            .partial_cmp(&a.share)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.rule.cmp(&b.rule))
    });
    checks
}

pub fn execute(args: &QualityArgs) -> Result<()> {
    let cleaned = crate::clean_source(&args.source)?;
    let report = audit(&cleaned.batch);
    info!(
        "Audited {} cleaned row(s) ({} dropped before audit)",
        report.rows, cleaned.report.dropped_rows
    );
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    print_report(&report);
    Ok(())
}

fn print_report(report: &QualityReport) {
    if report.rows == 0 {
        println!("No rows to audit.");
        return;
    }
    println!("Missing values ({} rows)", report.rows);
    table::print_table(
        &["field".to_string(), "missing".to_string(), "percent".to_string()],
        &report
            .missingness
            .iter()
            .map(|m| vec![m.field.to_string(), m.missing.to_string(), format!("{:.1}%", m.percent)])
            .collect::<Vec<_>>(),
    );
    if let Some(duplicates) = &report.duplicates {
        println!();
        let basis = match duplicates.basis {
            DuplicateBasis::TreeId => "tree_id",
            DuplicateBasis::LocationAndTaxon => "location and taxon",
        };
        println!(
            "Duplicate candidates by {basis}: {} record(s) in {} group(s)",
            duplicates.records, duplicates.groups
        );
    }
    println!();
    println!("Validation checks");
    table::print_table(
        &["rule".to_string(), "failures".to_string(), "share".to_string()],
        &report
            .checks
            .iter()
            .map(|c| vec![c.rule.clone(), c.failures.to_string(), format!("{:.2}%", c.share)])
            .collect::<Vec<_>>(),
    );
}
