use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Clean and audit municipal street-tree inventories",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Normalize, resolve names, standardize categories and drop unidentifiable trees
    Clean(CleanArgs),
    /// Run the cleaning pipeline and audit missingness, duplicates and value ranges
    Quality(QualityArgs),
    /// Run the cleaning pipeline and print key inventory figures
    Summary(SummaryArgs),
    /// Validate a lookup-tables document or export the built-in one
    Tables(TablesArgs),
}

/// Input options shared by every command that reads a raw inventory.
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Raw inventory export (use '-' for stdin)
    #[arg(short, long)]
    pub input: PathBuf,
    /// Input delimiter (supports ',', 'tab', ';', '|'); defaults to ';', or tab for .tsv
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Lookup-tables YAML replacing the built-in tables
    #[arg(long)]
    pub tables: Option<PathBuf>,
    /// Only read the first N data rows
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Destination for the cleaned batch (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Output delimiter; defaults from the output extension, else the input delimiter
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Write the pipeline report as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct QualityArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Print the audit as JSON instead of tables
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Number of species to list
    #[arg(long, default_value_t = 10)]
    pub top: usize,
    /// Print the summary as JSON instead of tables
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct TablesArgs {
    /// Lookup-tables YAML to validate (defaults to the built-in tables)
    #[arg(long)]
    pub tables: Option<PathBuf>,
    /// Write the loaded tables document to this path
    #[arg(long)]
    pub export: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
