//! Derived columns consumed by district filters and remarkable-tree views.

use std::sync::OnceLock;

use log::warn;
use regex::Regex;
use serde::Serialize;

use crate::{record::CanonicalBatch, tables::LookupTables};

const DISTRICT_MIN: u8 = 1;
const DISTRICT_MAX: u8 = 20;

static DISTRICT_DIGITS: OnceLock<Regex> = OnceLock::new();

fn district_digits() -> &'static Regex {
    DISTRICT_DIGITS.get_or_init(|| Regex::new("[0-9]{1,2}").expect("valid district pattern"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DerivedStats {
    pub missing_district_number: usize,
    /// District numbers outside 1..=20. Kept, not dropped.
    pub out_of_range_districts: usize,
    pub remarkable: usize,
}

/// First run of one or two digits in the district label.
pub fn district_number(district: &str) -> Option<u8> {
    district_digits()
        .find(district)
        .and_then(|m| m.as_str().parse().ok())
}

pub fn is_district_in_range(number: u8) -> bool {
    (DISTRICT_MIN..=DISTRICT_MAX).contains(&number)
}

pub fn is_remarkable(flag: &str, tables: &LookupTables) -> bool {
    tables.is_affirmative(flag)
}

pub fn derive_batch(batch: CanonicalBatch, tables: &LookupTables) -> (CanonicalBatch, DerivedStats) {
    let mut stats = DerivedStats::default();
    let batch = batch.map_records(|mut record| {
        record.arr_num = district_number(&record.district);
        match record.arr_num {
            None => stats.missing_district_number += 1,
            Some(number) if !is_district_in_range(number) => stats.out_of_range_districts += 1,
            Some(_) => {}
        }
        record.is_remarkable = is_remarkable(&record.remarkable, tables);
        stats.remarkable += usize::from(record.is_remarkable);
        record
    });
    if stats.out_of_range_districts > 0 {
        warn!(
            "{} record(s) carry a district number outside {DISTRICT_MIN}..={DISTRICT_MAX}",
            stats.out_of_range_districts
        );
    }
    (batch, stats)
}
