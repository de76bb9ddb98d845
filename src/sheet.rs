use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use calamine::{Data, ExcelDateTime, Reader, open_workbook_auto};
use chrono::NaiveTime;
use tracing::debug;

/// One sheet of raw tabular input: a header row plus string cells.
///
/// Rows may be shorter than the header (missing trailing cells read as empty);
/// rows longer than the header make the sheet malformed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawSheet {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Convenience constructor used by tests and importers.
    pub fn from_strs(name: &str, headers: &[&str], rows: &[&[&str]]) -> Self {
        Self::new(
            name,
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.as_str())
            .unwrap_or("")
    }
}

/// A sheet slot inside a workbook. Reading an individual sheet can fail without
/// invalidating the rest of the workbook.
#[derive(Debug)]
pub struct WorkbookEntry {
    pub name: String,
    pub sheet: Result<RawSheet>,
}

#[derive(Debug, Default)]
pub struct Workbook {
    pub entries: Vec<WorkbookEntry>,
}

impl Workbook {
    pub fn from_sheets(sheets: impl IntoIterator<Item = RawSheet>) -> Self {
        Self {
            entries: sheets
                .into_iter()
                .map(|sheet| WorkbookEntry {
                    name: sheet.name.clone(),
                    sheet: Ok(sheet),
                })
                .collect(),
        }
    }

    pub fn push(&mut self, entry: WorkbookEntry) {
        self.entries.push(entry);
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }
}

/// Load a workbook from disk. `.csv` files become a single sheet named after the
/// file stem; a directory becomes one sheet per `.csv` file (sorted by name);
/// spreadsheet formats yield every sheet in workbook order.
pub fn load_workbook(path: &Path) -> Result<Workbook> {
    if path.is_dir() {
        return load_csv_dir(path);
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => {
            let name = sheet_name_from_path(path);
            let sheet = read_csv_sheet(path, &name);
            Ok(Workbook {
                entries: vec![WorkbookEntry { name, sheet }],
            })
        }
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_spreadsheet(path),
        other => Err(anyhow!(
            "unsupported workbook format '{other}' ({})",
            path.display()
        )),
    }
}

pub fn read_csv_sheet(path: &Path, name: &str) -> Result<RawSheet> {
    let raw = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    parse_csv_sheet(&raw, name)
}

pub fn parse_csv_sheet(raw: &[u8], name: &str) -> Result<RawSheet> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(raw);
    let headers = reader
        .headers()
        .context("read csv header")?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("csv record {}", idx + 1))?;
        let row = record.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        rows.push(row);
    }
    Ok(RawSheet::new(name, headers, rows))
}

fn load_csv_dir(dir: &Path) -> Result<Workbook> {
    let mut paths = fs::read_dir(dir)
        .with_context(|| format!("list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
        })
        .collect::<Vec<_>>();
    paths.sort();

    let mut workbook = Workbook::default();
    for path in paths {
        let name = sheet_name_from_path(&path);
        let sheet = read_csv_sheet(&path, &name);
        workbook.push(WorkbookEntry { name, sheet });
    }
    Ok(workbook)
}

fn load_spreadsheet(path: &Path) -> Result<Workbook> {
    let mut book =
        open_workbook_auto(path).with_context(|| format!("open workbook {}", path.display()))?;
    let mut workbook = Workbook::default();
    for name in book.sheet_names() {
        let sheet = book
            .worksheet_range(&name)
            .map_err(|err| anyhow!("read sheet '{name}': {err}"))
            .map(|range| {
                let mut rows = range.rows();
                let headers = rows
                    .next()
                    .map(|r| r.iter().map(cell_to_string).collect::<Vec<_>>())
                    .unwrap_or_default();
                let body = rows
                    .map(|r| r.iter().map(cell_to_string).collect::<Vec<_>>())
                    .filter(|r| r.iter().any(|c| !c.trim().is_empty()))
                    .collect::<Vec<_>>();
                RawSheet::new(name.clone(), headers, body)
            });
        debug!(sheet = %name, ok = sheet.is_ok(), "loaded spreadsheet sheet");
        workbook.push(WorkbookEntry { name, sheet });
    }
    Ok(workbook)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_datetime_to_string(dt),
        Data::DateTimeIso(s) => s.clone(),
        Data::Error(_) => String::new(),
        other => other.to_string(),
    }
}

/// Calendar dates render as `YYYY-MM-DD`, time-of-day cells as `HH:MM:SS`,
/// anything else as a full timestamp.
fn excel_datetime_to_string(dt: &ExcelDateTime) -> String {
    let Some(value) = dt.as_datetime() else {
        return dt.as_f64().to_string();
    };
    if dt.is_datetime() && dt.as_f64() < 1.0 {
        return value.format("%H:%M:%S").to_string();
    }
    if value.time() == NaiveTime::default() {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

fn sheet_name_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "Sheet1".to_string())
}
