//! Data-loss gate: the only place records leave the pipeline.

use log::info;

use crate::{
    record::{CanonicalBatch, CanonicalRecord, is_blank},
    tables::LookupTables,
};

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub kept: CanonicalBatch,
    pub input_rows: usize,
    pub dropped_rows: usize,
}

impl FilterOutcome {
    /// Dropped records as a percentage of the pre-filter batch.
    pub fn drop_percent(&self) -> f64 {
        self.dropped_rows as f64 / self.input_rows.max(1) as f64 * 100.0
    }
}

/// No name in either language and no usable genus (blank or the
/// "unspecified" sentinel).
pub fn is_unidentified(record: &CanonicalRecord, tables: &LookupTables) -> bool {
    !record.has_name() && (is_blank(&record.genus) || tables.is_unspecified_genus(&record.genus))
}

pub fn apply(batch: CanonicalBatch, tables: &LookupTables) -> FilterOutcome {
    let input_rows = batch.len();
    let (kept, dropped) = batch.partition(|record| is_unidentified(record, tables));
    let outcome = FilterOutcome {
        kept,
        input_rows,
        dropped_rows: dropped.len(),
    };
    if outcome.dropped_rows > 0 {
        info!(
            "Dropped {} row(s) ({:.2}% of batch) with no French/English name and no usable genus",
            outcome.dropped_rows,
            outcome.drop_percent()
        );
    } else {
        info!("No rows dropped: every row has a French/English name or a usable genus");
    }
    outcome
}
