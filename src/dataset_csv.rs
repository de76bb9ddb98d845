use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::normalize::Normalizer;
use crate::play::{CANONICAL_COLUMNS, PlayRecord};
use crate::sheet::RawSheet;

#[derive(Debug, Clone, Default)]
pub struct CsvImport {
    pub plays: Vec<PlayRecord>,
    /// Lines that could not be parsed (wrong field count, bad quoting).
    pub skipped_lines: usize,
    pub log: Vec<String>,
}

/// Write plays with the canonical header, in canonical column order.
pub fn write_csv(path: &Path, plays: &[PlayRecord]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    write_csv_to(file, plays)
}

pub fn write_csv_to<W: Write>(out: W, plays: &[PlayRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(CANONICAL_COLUMNS)
        .context("write csv header")?;
    for play in plays {
        writer.write_record(play.to_row()).context("write csv row")?;
    }
    writer.flush().context("flush csv")?;
    Ok(())
}

pub fn read_csv(path: &Path) -> Result<CsvImport> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    read_csv_from(file)
}

/// Read a dataset file. Malformed lines are skipped, numeric columns are
/// re-coerced and rows without a play type are dropped.
pub fn read_csv_from<R: Read>(input: R) -> Result<CsvImport> {
    let mut reader = csv::ReaderBuilder::new().flexible(false).from_reader(input);
    let headers = reader
        .headers()
        .context("read csv header")?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    let mut skipped_lines = 0usize;
    for record in reader.records() {
        match record {
            Ok(record) => rows.push(record.iter().map(|c| c.to_string()).collect()),
            Err(err) => {
                warn!("skipping csv line: {err}");
                skipped_lines += 1;
            }
        }
    }

    let sheet = RawSheet::new("dataset", headers, rows);
    let mut log = Vec::new();
    let outcome = Normalizer::new().normalize_sheet(&sheet, &mut log)?;
    if skipped_lines > 0 {
        log.push(format!("  -> Skipped {skipped_lines} malformed lines"));
    }
    Ok(CsvImport {
        plays: outcome.plays,
        skipped_lines,
        log,
    })
}
