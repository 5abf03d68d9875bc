//! brilcalc CSV to `run luminosity` text conversion.
//!
//! brilcalc writes a free-form first line, a `#`-prefixed header, then one
//! record per run (`run:fill,time,...,delivered(/pb),recorded(/pb)`) and a
//! few `#` summary lines at the end.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::LumiType;
use crate::error::{LumiError, Result};

/// Lines consumed before the CSV reader takes over.
const PREAMBLE_LINES: u64 = 2;

/// Convert one brilcalc table; returns the number of rows written.
pub fn convert<R: BufRead, W: Write>(mut input: R, mut out: W, lumi_type: LumiType) -> Result<usize> {
    let mut first = String::new();
    input.read_line(&mut first)?;
    tracing::debug!("1st line: {}", first.trim_end_matches(['\r', '\n']));

    let mut header_line = String::new();
    if input.read_line(&mut header_line)? == 0 {
        return Err(LumiError::MissingHeader);
    }
    let header: Vec<String> = header_line
        .trim_end_matches(['\r', '\n'])
        .trim_start_matches(['#', ' '])
        .split(',')
        .map(str::to_string)
        .collect();
    tracing::debug!(?header, "header");

    let column = header
        .iter()
        .rposition(|h| h.contains(lumi_type.as_str()))
        .ok_or_else(|| LumiError::MissingColumn { lumi_type, header: header.clone() })?;
    tracing::info!("Using \"{}\" luminosity, column {column}", header[column]);

    let mut reader = csv::ReaderBuilder::new().has_headers(false).flexible(true).from_reader(input);
    let mut written = 0;
    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line() + PREAMBLE_LINES);
        let Some(first_field) = record.get(0) else { continue };
        if first_field.starts_with('#') {
            tracing::debug!("{}", record.iter().collect::<Vec<_>>().join(","));
            continue;
        }
        if record.len() == 1 && first_field.trim().is_empty() {
            continue;
        }

        let run_text = first_field.split(':').next().unwrap_or(first_field);
        let run: i64 = run_text
            .trim()
            .parse()
            .map_err(|_| LumiError::BadRun { line, value: first_field.to_string() })?;
        let lumi = record
            .get(column)
            .ok_or(LumiError::ShortRecord { line, fields: record.len(), column })?;
        writeln!(out, "{run} {lumi}")?;
        written += 1;
    }
    out.flush()?;
    Ok(written)
}

/// Output path for an input table: one trailing `.csv` removed, `.txt` added.
pub fn output_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    if let Some(stem) = input.to_str().and_then(|s| s.strip_suffix(".csv")) {
        name = stem.into();
    }
    name.push(".txt");
    PathBuf::from(name)
}

/// Convert `input` next to itself (see [`output_path`]).
///
/// Without `force` the output is created exclusively and an existing file is
/// an error. Returns the output path and the number of rows written.
pub fn convert_file(input: &Path, force: bool, lumi_type: LumiType) -> Result<(PathBuf, usize)> {
    let out_path = output_path(input);
    let fin = File::open(input)?;

    let mut opts = OpenOptions::new();
    opts.write(true);
    if force {
        opts.create(true).truncate(true);
    } else {
        opts.create_new(true);
    }
    let fout = opts.open(&out_path).map_err(|e| match e.kind() {
        io::ErrorKind::AlreadyExists => LumiError::OutputExists(out_path.clone()),
        _ => LumiError::Io(e),
    })?;

    let rows = convert(BufReader::new(fin), BufWriter::new(fout), lumi_type)?;
    tracing::info!("{} -> {}", input.display(), out_path.display());
    Ok((out_path, rows))
}
