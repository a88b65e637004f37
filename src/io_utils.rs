//! Loader and writer glue around the cleaning pipeline.
//!
//! - **Delimiter resolution**: `.tsv` inputs read as tab separated, everything
//!   else as `;` (the municipal open-data export format), with manual override.
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//! - **stdin/stdout**: the `-` path convention routes through standard streams.
//! - **Quoting**: cleaned output uses `QuoteStyle::Always`.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use serde::Serialize;

use crate::record::{CanonicalBatch, RawBatch};

pub const DEFAULT_INPUT_DELIMITER: u8 = b';';
pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_INPUT_DELIMITER,
    })
}

pub fn resolve_output_delimiter(path: Option<&Path>, provided: Option<u8>, fallback: u8) -> u8 {
    if let Some(delim) = provided {
        return delim;
    }
    if let Some(path) = path {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => return DEFAULT_TSV_DELIMITER,
            Some(ext) if ext.eq_ignore_ascii_case("csv") => return DEFAULT_CSV_DELIMITER,
            _ => {}
        }
    }
    fallback
}

fn open_reader(path: &Path) -> Result<Box<dyn Read>> {
    Ok(if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    })
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decodes one field. Byte-order marks are not sniffed here; only the header
/// line may carry one, see [`decode_headers`].
pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Decodes the header record, dropping a leading UTF-8 byte-order mark.
pub fn decode_headers(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
) -> Result<Vec<String>> {
    record
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let field = match field.strip_prefix(UTF8_BOM) {
                Some(rest) if idx == 0 => rest,
                _ => field,
            };
            decode_bytes(field, encoding)
        })
        .collect()
}

/// Reads a whole raw batch. Rows may be ragged; the normalizer treats missing
/// trailing cells as blank.
pub fn read_raw_batch(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
    limit: Option<usize>,
) -> Result<RawBatch> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(open_reader(path)?);
    let headers = decode_headers(
        reader
            .byte_headers()
            .with_context(|| format!("Reading headers from {path:?}"))?,
        encoding,
    )?;
    let mut rows = Vec::new();
    let mut record = csv::ByteRecord::new();
    while limit.is_none_or(|max| rows.len() < max) {
        let row_number = rows.len() + 1;
        let more = reader
            .read_byte_record(&mut record)
            .with_context(|| format!("Reading row {row_number} of {path:?}"))?;
        if !more {
            break;
        }
        let row = decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {row_number} of {path:?}"))?;
        rows.push(row);
    }
    Ok(RawBatch::new(headers, rows))
}

pub fn write_canonical_batch(
    batch: &CanonicalBatch,
    path: Option<&Path>,
    delimiter: u8,
) -> Result<()> {
    let sink: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Always)
        .double_quote(true)
        .from_writer(sink);
    writer
        .write_record(batch.headers())
        .context("Writing output headers")?;
    for row in batch.rows() {
        writer.write_record(&row).context("Writing output row")?;
    }
    writer.flush().context("Flushing output")?;
    Ok(())
}

pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating JSON file {path:?}"))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("Writing JSON to {path:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiters_follow_extension() {
        assert_eq!(resolve_input_delimiter(Path::new("trees.csv"), None), b';');
        assert_eq!(resolve_input_delimiter(Path::new("trees.TSV"), None), b'\t');
        assert_eq!(resolve_input_delimiter(Path::new("trees.csv"), Some(b',')), b',');
        assert_eq!(resolve_output_delimiter(Some(Path::new("out.tsv")), None, b';'), b'\t');
        assert_eq!(resolve_output_delimiter(Some(Path::new("out.csv")), None, b';'), b',');
        assert_eq!(resolve_output_delimiter(None, None, b';'), b';');
    }

    #[test]
    fn encoding_labels_resolve() {
        assert_eq!(resolve_encoding(None).unwrap(), UTF_8);
        assert_eq!(
            resolve_encoding(Some("latin1")).unwrap().name(),
            "windows-1252"
        );
        assert!(resolve_encoding(Some("klingon")).is_err());
    }

    #[test]
    fn fields_are_not_sniffed_for_byte_order_marks() {
        let latin1 = resolve_encoding(Some("latin1")).unwrap();
        assert_eq!(decode_bytes(b"\xFF\xFEA", latin1).unwrap(), "\u{ff}\u{fe}A");
        assert_eq!(decode_bytes(b"\xFE\xFFA", latin1).unwrap(), "\u{fe}\u{ff}A");
    }

    #[test]
    fn header_bom_is_dropped_and_row_bytes_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trees.csv");
        std::fs::write(&path, b"\xEF\xBB\xBFGENRE;ESPECE\n\xFF\xFEx;Tilia\n").unwrap();
        let latin1 = resolve_encoding(Some("latin1")).unwrap();
        let batch = read_raw_batch(&path, b';', latin1, None).unwrap();
        assert_eq!(batch.headers(), ["GENRE", "ESPECE"]);
        assert_eq!(batch.rows()[0], ["\u{ff}\u{fe}x", "Tilia"]);
    }
}
