//! Runs the five cleaning stages in order over one batch.
//!
//! Every stage takes the batch by value and hands it to the next; nothing is
//! shared between runs, so independent batches can be cleaned concurrently.
//! Diagnostics come back in a [`PipelineReport`] instead of living only in the
//! log.

use log::{debug, info};
use serde::Serialize;

use crate::{
    categories::{self, CategoryStats},
    derived::{self, DerivedStats},
    error::PipelineError,
    normalizer::{self, NormalizeStats},
    record::{CanonicalBatch, RawBatch},
    record_filter,
    tables::LookupTables,
    taxonomy::{self, TaxonomyStats},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub tables_version: Option<String>,
    pub tables_digest: String,
    pub input_rows: usize,
    pub output_rows: usize,
    pub dropped_rows: usize,
    pub drop_percent: f64,
    /// Kept because the genus is usable, although neither name resolved.
    pub retained_unnamed: usize,
    pub normalize: NormalizeStats,
    pub taxonomy: TaxonomyStats,
    pub categories: CategoryStats,
    pub derived: DerivedStats,
}

#[derive(Debug, Clone)]
pub struct CleanedBatch {
    pub batch: CanonicalBatch,
    pub report: PipelineReport,
}

pub fn clean(raw: &RawBatch, tables: &LookupTables) -> Result<CleanedBatch, PipelineError> {
    debug!(
        "Cleaning {} row(s) with lookup tables {} ({})",
        raw.len(),
        tables.version().unwrap_or("unversioned"),
        tables.digest()
    );
    let (batch, normalize) = normalizer::normalize(raw)?;
    let (batch, taxonomy) = taxonomy::resolve_batch(batch, tables);
    let (batch, categories) = categories::standardize_batch(batch, tables);
    let filtered = record_filter::apply(batch, tables);
    let drop_percent = filtered.drop_percent();
    let (batch, derived) = derived::derive_batch(filtered.kept, tables);

    let retained_unnamed = batch.records.iter().filter(|r| !r.has_name()).count();
    if retained_unnamed > 0 {
        info!("{retained_unnamed} row(s) kept on genus alone with no resolved common name");
    }

    let report = PipelineReport {
        tables_version: tables.version().map(str::to_string),
        tables_digest: tables.digest().to_string(),
        input_rows: filtered.input_rows,
        output_rows: batch.len(),
        dropped_rows: filtered.dropped_rows,
        drop_percent,
        retained_unnamed,
        normalize,
        taxonomy,
        categories,
        derived,
    };
    Ok(CleanedBatch { batch, report })
}
