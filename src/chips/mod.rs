//! Chip table deduplication: CSV rows in, one JSON record per distinct chip out.
pub mod dedup;
pub mod json;
pub mod record;

pub use dedup::deduplicate;
pub use dedup::ChipDeduplicator;
pub use json::to_json;
pub use record::ChipKey;
pub use record::ChipRecord;
pub use record::ChipRow;

use crate::error::ChipToolsError;
use crate::error::ResultMessage;
use csv::ReaderBuilder;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;
use tracing::error;
use tracing::info;

/// Tables converted when no explicit table is requested.
pub const DEFAULT_TABLES: [&str; 3] = ["Giga", "Mega", "Standard"];

#[derive(Error, Debug)]
pub enum ChipError {
    #[error("Missing field '{field}' at line {line} of '{file}'")]
    MissingField { file: String, line: u64, field: &'static str },
    #[error("File '{0}' is not valid UTF-8")]
    InvalidEncoding(String),
}

/// One table conversion: a CSV input and the JSON document it produces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl ConversionJob {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    /// `{input_dir}/{table}.csv` → `{output_dir}/{table}.json`
    pub fn for_table(table: &str, input_dir: &Path, output_dir: &Path) -> Self {
        Self::new(input_dir.join(format!("{table}.csv")), output_dir.join(format!("{table}.json")))
    }
}

/// Builds the jobs for the Giga, Mega and Standard tables.
pub fn default_jobs(input_dir: &Path, output_dir: &Path) -> Vec<ConversionJob> {
    DEFAULT_TABLES
        .iter()
        .map(|table| ConversionJob::for_table(table, input_dir, output_dir))
        .collect()
}

/// Counts reported after a table was converted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    /// Data rows read from the table
    pub rows: usize,
    /// Records written to the document
    pub records: usize,
}

impl ConversionSummary {
    /// Rows folded into a previously seen record.
    pub fn merged(&self) -> usize {
        self.rows - self.records
    }
}

impl Display for ConversionSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} rows, {} records, {} merged", self.rows, self.records, self.merged())
    }
}

/// Reads every data row of a chip table.
///
/// The whole file is decoded up front; a leading byte-order mark is dropped.
/// The first record is the header row. Records may differ in length from the header:
/// surplus trailing fields are ignored, and a record too short to reach a mandatory
/// column fails with [`ChipError::MissingField`].
pub fn read_rows(path: &Path) -> Result<Vec<ChipRow>, ChipToolsError> {
    let file_name = path.display().to_string();
    let bytes = fs::read(path)?;
    let (text, malformed) = encoding_rs::UTF_8.decode_with_bom_removal(&bytes);
    if malformed {
        Err(ChipError::InvalidEncoding(file_name.clone()))?;
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let columns = record::Columns::new(reader.headers()?);
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|position| position.line()).unwrap_or_default();
        rows.push(columns.read(&file_name, line, &record)?);
    }
    debug!(file = %file_name, rows = rows.len(), "Read chip table");
    Ok(rows)
}

/// Converts one chip table into its deduplicated JSON document.
///
/// # Arguments
/// * `input` - CSV table with a header row
/// * `output` - JSON document to create or overwrite
///
/// # Returns
/// Row and record counts of the conversion
///
/// Nothing is written when the input cannot be read or a row lacks a mandatory column.
pub fn convert_csv_to_json(
    input: &Path,
    output: &Path,
) -> Result<ConversionSummary, ChipToolsError> {
    let mut deduplicator = ChipDeduplicator::new();
    deduplicator.extend(read_rows(input)?);
    let summary = ConversionSummary {
        rows: deduplicator.rows(),
        records: deduplicator.records().len(),
    };

    let json = to_json(deduplicator.records())?;
    fs::write(output, json)
        .map_err(ChipToolsError::from)
        .with_prefix(&format!("Write '{}' failed", output.display()))?;
    info!(
        input = %input.display(),
        output = %output.display(),
        rows = summary.rows,
        records = summary.records,
        merged = summary.merged(),
        "Conversion completed"
    );
    Ok(summary)
}

/// Runs every job in order. A failed job is logged and the remaining jobs still run.
pub fn convert_all(
    jobs: &[ConversionJob],
) -> Vec<(ConversionJob, Result<ConversionSummary, ChipToolsError>)> {
    jobs.iter()
        .map(|job| {
            let result = convert_csv_to_json(&job.input, &job.output);
            if let Err(error) = &result {
                error!(input = %job.input.display(), "Conversion failed: {error}");
            }
            (job.clone(), result)
        })
        .collect()
}
