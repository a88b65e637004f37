#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use encoding_rs::UTF_8;
use tempfile::{TempDir, tempdir};
use tree_inventory::{
    io_utils,
    record::{CanonicalRecord, RawBatch},
    tables::LookupTables,
};

pub const SAMPLE_FILE: &str = "paris_trees_sample.csv";

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

pub fn tables() -> LookupTables {
    LookupTables::embedded().expect("embedded tables")
}

/// Reads the `;`-separated sample export.
pub fn sample_batch() -> RawBatch {
    io_utils::read_raw_batch(&fixture_path(SAMPLE_FILE), b';', UTF_8, None)
        .expect("read sample batch")
}

/// Builds a raw batch from string literals.
pub fn raw_batch(headers: &[&str], rows: &[&[&str]]) -> RawBatch {
    RawBatch::new(
        headers.iter().map(|h| h.to_string()).collect(),
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect(),
    )
}

pub fn find<'a>(records: &'a [CanonicalRecord], tree_id: &str) -> &'a CanonicalRecord {
    records
        .iter()
        .find(|record| record.tree_id == tree_id)
        .unwrap_or_else(|| panic!("record {tree_id} missing"))
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}
