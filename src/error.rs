use thiserror::Error;

/// Batch-level defects that stop the pipeline before any record is transformed.
///
/// Field-level problems (bad coordinates, unknown category codes, missing names)
/// never surface here; they degrade locally and are counted in the report.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(
        "batch has no taxonomy columns (expected a French name or genus column); found headers: {headers:?}"
    )]
    MissingTaxonomyColumns { headers: Vec<String> },

    #[error("headers '{first}' and '{second}' both map to canonical field '{field}'")]
    DuplicateColumn {
        field: &'static str,
        first: String,
        second: String,
    },
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read lookup tables from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse lookup tables: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{table} contains a blank key")]
    EmptyKey { table: &'static str },

    #[error("genus fallback '{key}' must define both a French and an English name")]
    IncompleteFallback { key: String },

    #[error("{table} keys '{first}' and '{second}' collide after normalization with different values")]
    ConflictingKey {
        table: &'static str,
        first: String,
        second: String,
    },
}
