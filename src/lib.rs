pub mod categories;
pub mod cli;
pub mod derived;
pub mod error;
pub mod io_utils;
pub mod normalizer;
pub mod pipeline;
pub mod quality;
pub mod record;
pub mod record_filter;
pub mod summary;
pub mod table;
pub mod tables;
pub mod taxonomy;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands},
    pipeline::CleanedBatch,
    tables::LookupTables,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("tree_inventory", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Clean(args) => handle_clean(&args),
        Commands::Quality(args) => quality::execute(&args),
        Commands::Summary(args) => summary::execute(&args),
        Commands::Tables(args) => handle_tables(&args),
    }
}

fn load_tables(path: Option<&std::path::Path>) -> Result<LookupTables> {
    match path {
        Some(path) => LookupTables::load(path)
            .with_context(|| format!("Loading lookup tables from {path:?}")),
        None => LookupTables::embedded().context("Compiling built-in lookup tables"),
    }
}

/// Reads the raw batch named by `source` and runs the cleaning pipeline on it.
pub(crate) fn clean_source(source: &cli::SourceArgs) -> Result<CleanedBatch> {
    let delimiter = io_utils::resolve_input_delimiter(&source.input, source.delimiter);
    let encoding = io_utils::resolve_encoding(source.input_encoding.as_deref())?;
    info!(
        "Reading '{}' with delimiter '{}'",
        source.input.display(),
        printable_delimiter(delimiter)
    );
    let tables = load_tables(source.tables.as_deref())?;
    let raw = io_utils::read_raw_batch(&source.input, delimiter, encoding, source.limit)
        .with_context(|| format!("Reading raw inventory {:?}", source.input))?;
    debug!("Raw headers: {:?}", raw.headers());
    pipeline::clean(&raw, &tables)
        .with_context(|| format!("Cleaning {:?}", source.input))
}

fn handle_clean(args: &cli::CleanArgs) -> Result<()> {
    let cleaned = clean_source(&args.source)?;
    let input_delimiter =
        io_utils::resolve_input_delimiter(&args.source.input, args.source.delimiter);
    let output_delimiter = io_utils::resolve_output_delimiter(
        args.output.as_deref(),
        args.output_delimiter,
        input_delimiter,
    );
    io_utils::write_canonical_batch(&cleaned.batch, args.output.as_deref(), output_delimiter)?;
    if let Some(path) = &args.report {
        io_utils::write_json(&cleaned.report, path)
            .with_context(|| format!("Writing pipeline report to {path:?}"))?;
        info!("Pipeline report written to {path:?}");
    }
    info!(
        "Cleaned {} of {} row(s) using delimiter '{}'",
        cleaned.report.output_rows,
        cleaned.report.input_rows,
        printable_delimiter(output_delimiter)
    );
    Ok(())
}

fn handle_tables(args: &cli::TablesArgs) -> Result<()> {
    let tables = load_tables(args.tables.as_deref())?;
    let headers = vec!["table".to_string(), "entries".to_string()];
    let rows = tables
        .entry_counts()
        .into_iter()
        .map(|(name, count)| vec![name.to_string(), count.to_string()])
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    println!("version: {}", tables.version().unwrap_or("unversioned"));
    println!("sha256: {}", tables.digest());
    if let Some(path) = &args.export {
        tables
            .document()
            .save(path)
            .with_context(|| format!("Exporting lookup tables to {path:?}"))?;
        info!("Lookup tables exported to {path:?}");
    }
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
