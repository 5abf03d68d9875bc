//! Error type for the luminosity tools.

use std::path::PathBuf;

use thiserror::Error;

use crate::LumiType;

/// Errors from CSV conversion and brilcalc runs.
#[derive(Error, Debug)]
pub enum LumiError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV record
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Config loading or subprocess failure
    #[error(transparent)]
    Core(#[from] ct_core::Error),

    /// The input ended before the header line.
    #[error("missing header line")]
    MissingHeader,

    /// No header field mentions the requested luminosity type.
    #[error("no '{lumi_type}' column in header {header:?}")]
    MissingColumn {
        /// Requested type.
        lumi_type: LumiType,
        /// Header fields as parsed.
        header: Vec<String>,
    },

    /// The first field does not start with a run number.
    #[error("line {line}: cannot read a run number from '{value}'")]
    BadRun {
        /// 1-based line number in the input.
        line: u64,
        /// The offending field.
        value: String,
    },

    /// A record has fewer fields than the luminosity column index needs.
    #[error("line {line}: {fields} fields, luminosity is column {column}")]
    ShortRecord {
        /// 1-based line number in the input.
        line: u64,
        /// Fields in the record.
        fields: usize,
        /// 0-based index of the luminosity column.
        column: usize,
    },

    /// The output file exists and overwriting was not requested.
    #[error("{} already exists (use --force to overwrite)", .0.display())]
    OutputExists(PathBuf),
}

/// Result alias for luminosity operations.
pub type Result<T> = std::result::Result<T, LumiError>;
