use std::fmt;

use anyhow::{Result, anyhow};
use chrono::Local;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::play::{
    CANONICAL_COLUMNS, DEFAULT_DISTANCE, DEFAULT_DOWN, PlayRecord, TaggedPlay, coerce_distance,
    coerce_down, coerce_yards, parse_success_flag, parse_success_token,
};
use crate::sheet::{RawSheet, Workbook};

/// Canonical fields a column rule can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonField {
    Date,
    Quarter,
    Time,
    Down,
    Distance,
    FieldPosition,
    PlayType,
    RunCourse,
    PassCourse,
    Detail,
    YardsGained,
    Success,
}

impl CanonField {
    pub const ALL: [CanonField; 12] = [
        CanonField::Date,
        CanonField::Quarter,
        CanonField::Time,
        CanonField::Down,
        CanonField::Distance,
        CanonField::FieldPosition,
        CanonField::PlayType,
        CanonField::RunCourse,
        CanonField::PassCourse,
        CanonField::Detail,
        CanonField::YardsGained,
        CanonField::Success,
    ];

    pub fn column_name(self) -> &'static str {
        CANONICAL_COLUMNS[self as usize]
    }
}

impl fmt::Display for CanonField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Locates one canonical field in a legacy sheet: the first column whose name
/// contains any keyword. Headers containing any of the `excludes` are never
/// picked for this field.
#[derive(Debug, Clone, Copy)]
pub struct ColumnRule {
    pub field: CanonField,
    pub keywords: &'static [&'static str],
    pub excludes: &'static [&'static str],
}

pub const LEGACY_COLUMN_RULES: &[ColumnRule] = &[
    ColumnRule {
        field: CanonField::PlayType,
        keywords: &["play type", "playtype"],
        excludes: &[],
    },
    ColumnRule {
        field: CanonField::FieldPosition,
        keywords: &["start yard", "yardline", "fieldposition"],
        excludes: &[],
    },
    ColumnRule {
        field: CanonField::Distance,
        keywords: &["first down", "to edown", "yards to e", "distance"],
        excludes: &[],
    },
    ColumnRule {
        field: CanonField::YardsGained,
        keywords: &["gained yards", "gained", "yardsgained"],
        excludes: &[],
    },
    ColumnRule {
        field: CanonField::Success,
        keywords: &["success/fail", "success", "fail"],
        excludes: &[],
    },
    // "Yards to EDown" is a distance column.
    ColumnRule {
        field: CanonField::Down,
        keywords: &["down"],
        excludes: &["first", "yards"],
    },
    ColumnRule {
        field: CanonField::Date,
        keywords: &["date"],
        excludes: &[],
    },
    ColumnRule {
        field: CanonField::Quarter,
        keywords: &["quarter", "qtr"],
        excludes: &[],
    },
    ColumnRule {
        field: CanonField::Time,
        keywords: &["time", "remaining"],
        excludes: &[],
    },
    ColumnRule {
        field: CanonField::RunCourse,
        keywords: &["run course", "runcourse", "run dir"],
        excludes: &[],
    },
    ColumnRule {
        field: CanonField::PassCourse,
        keywords: &["pass course", "passcourse", "pass route"],
        excludes: &[],
    },
    ColumnRule {
        field: CanonField::Detail,
        keywords: &["memo", "note", "detail", "result"],
        excludes: &[],
    },
];

const LEGACY_MARKERS: &[&str] = &["play type", "playtype", "play #", "play#"];
const UNKNOWN_PLAY_TYPE: &str = "Unknown";
/// Data-entry sheets keep free text under these headers instead of `Detail`.
const DETAIL_FALLBACK_COLUMNS: &[&str] = &["Result", "Memo"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetLayout {
    /// Already has `PlayType` and `YardsGained` columns.
    Canonical,
    /// Hand-kept scouting sheet with "Play Type" / "Play #" style headers.
    Legacy,
    /// Anything else: first column is taken as the play type.
    Unknown,
}

impl fmt::Display for SheetLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SheetLayout::Canonical => "canonical",
            SheetLayout::Legacy => "legacy",
            SheetLayout::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

pub fn detect_layout(headers: &[String]) -> SheetLayout {
    let has = |name: &str| headers.iter().any(|h| h.trim() == name);
    if has("PlayType") && has("YardsGained") {
        return SheetLayout::Canonical;
    }
    if find_column(headers, LEGACY_MARKERS, &[]).is_some() {
        return SheetLayout::Legacy;
    }
    SheetLayout::Unknown
}

/// Case-insensitive substring lookup over header names. The leftmost header
/// containing any keyword (and none of the excludes) wins.
pub fn find_column(headers: &[String], keywords: &[&str], excludes: &[&str]) -> Option<usize> {
    let keywords = keywords.iter().map(|k| k.to_lowercase()).collect::<Vec<_>>();
    let excludes = excludes.iter().map(|e| e.to_lowercase()).collect::<Vec<_>>();
    headers.iter().position(|header| {
        let header = header.to_lowercase();
        !excludes.iter().any(|e| header.contains(e)) && keywords.iter().any(|k| header.contains(k))
    })
}

/// Result of normalizing one sheet.
#[derive(Debug, Clone, Default)]
pub struct SheetOutcome {
    pub layout: Option<SheetLayout>,
    pub plays: Vec<PlayRecord>,
    /// Rows discarded because they had no play type.
    pub dropped: usize,
}

/// Result of normalizing a whole workbook. `plays` is `None` when no sheet
/// produced a valid row; `log` is always populated.
#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    pub plays: Option<Vec<TaggedPlay>>,
    pub log: Vec<String>,
}

impl IngestOutcome {
    pub fn row_count(&self) -> usize {
        self.plays.as_ref().map_or(0, |p| p.len())
    }
}

/// Maps arbitrary sheets onto the canonical play schema.
#[derive(Debug, Clone)]
pub struct Normalizer {
    rules: Vec<ColumnRule>,
    today: String,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            rules: LEGACY_COLUMN_RULES.to_vec(),
            today: Local::now().format("%Y-%m-%d").to_string(),
        }
    }

    /// Fixes the date stamped on rows whose sheet has no date column.
    pub fn with_today(mut self, today: impl Into<String>) -> Self {
        self.today = today.into();
        self
    }

    pub fn with_rules(mut self, rules: Vec<ColumnRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &[ColumnRule] {
        &self.rules
    }

    /// Normalize a single sheet. Diagnostics are appended to `log`; the only
    /// error is a structurally malformed sheet.
    pub fn normalize_sheet(&self, sheet: &RawSheet, log: &mut Vec<String>) -> Result<SheetOutcome> {
        if let Some((idx, row)) = sheet
            .rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() > sheet.headers.len())
        {
            return Err(anyhow!(
                "row {} has {} cells but the header has {}",
                idx + 1,
                row.len(),
                sheet.headers.len()
            ));
        }

        let layout = detect_layout(&sheet.headers);
        log.push(format!("  -> Detected layout: {layout}"));
        let plays = match layout {
            SheetLayout::Canonical => self.convert_canonical(sheet, log),
            SheetLayout::Legacy => self.convert_legacy(sheet, log),
            SheetLayout::Unknown => self.convert_unknown(sheet, log),
        };

        let before = plays.len();
        let plays = plays
            .into_iter()
            .filter(|p| !p.play_type.trim().is_empty())
            .collect::<Vec<_>>();
        let dropped = before - plays.len();
        if dropped > 0 {
            log.push(format!("  -> Filtered out {dropped} rows with missing PlayType"));
        }

        Ok(SheetOutcome {
            layout: Some(layout),
            plays,
            dropped,
        })
    }

    /// Normalize every sheet of a workbook and concatenate the results in sheet order.
    /// Never fails: unreadable or empty sheets are logged and skipped.
    pub fn normalize_workbook(&self, workbook: &Workbook) -> IngestOutcome {
        let mut log = vec![format!(
            "Found {} sheets: {:?}",
            workbook.entries.len(),
            workbook.sheet_names()
        )];

        let per_sheet = workbook
            .entries
            .par_iter()
            .map(|entry| {
                let mut sheet_log = Vec::new();
                let plays = match &entry.sheet {
                    Ok(sheet) => self.ingest_one(sheet, &entry.name, &mut sheet_log),
                    Err(err) => {
                        warn!(sheet = %entry.name, "sheet unreadable: {err:#}");
                        sheet_log.push(format!(
                            "Sheet '{}' could not be read: {err:#}",
                            entry.name
                        ));
                        Vec::new()
                    }
                };
                (sheet_log, plays)
            })
            .collect::<Vec<_>>();

        let mut combined = Vec::new();
        for (sheet_log, plays) in per_sheet {
            log.extend(sheet_log);
            combined.extend(plays);
        }

        if combined.is_empty() {
            log.push("No valid data found in any sheet".to_string());
            return IngestOutcome { plays: None, log };
        }
        log.push(format!("Total combined rows: {}", combined.len()));
        IngestOutcome {
            plays: Some(combined),
            log,
        }
    }

    fn ingest_one(&self, sheet: &RawSheet, name: &str, log: &mut Vec<String>) -> Vec<TaggedPlay> {
        if sheet.is_empty() {
            log.push(format!("Sheet '{name}' is empty, skipping"));
            return Vec::new();
        }
        log.push(format!("Processing sheet '{name}' with {} rows", sheet.len()));
        log.push(format!("Columns: {:?}", sheet.headers));

        let outcome = match self.normalize_sheet(sheet, log) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(sheet = %name, "sheet skipped: {err:#}");
                log.push(format!("  -> Error processing sheet '{name}': {err:#}"));
                return Vec::new();
            }
        };
        debug!(
            sheet = %name,
            rows = outcome.plays.len(),
            dropped = outcome.dropped,
            "normalized sheet"
        );

        if outcome.plays.is_empty() {
            log.push("  -> Sheet result is empty after filtering".to_string());
            return Vec::new();
        }
        log.push(format!(
            "  -> Added {} rows from sheet '{name}'",
            outcome.plays.len()
        ));
        outcome
            .plays
            .into_iter()
            .map(|play| TaggedPlay {
                team: name.to_string(),
                play,
            })
            .collect()
    }

    fn convert_canonical(&self, sheet: &RawSheet, log: &mut Vec<String>) -> Vec<PlayRecord> {
        let col = |field: CanonField| {
            sheet
                .headers
                .iter()
                .position(|h| h.trim() == field.column_name())
        };
        let cols = CanonField::ALL.map(col);
        let detail_fallback = if cols[CanonField::Detail as usize].is_none() {
            DETAIL_FALLBACK_COLUMNS
                .iter()
                .filter_map(|name| {
                    sheet
                        .headers
                        .iter()
                        .position(|h| h.trim().eq_ignore_ascii_case(name))
                })
                .collect::<Vec<_>>()
        } else {
            Vec::new()
        };
        if !detail_fallback.is_empty() {
            let names = detail_fallback
                .iter()
                .map(|c| sheet.headers[*c].trim())
                .collect::<Vec<_>>();
            log.push(format!("  -> Detail <- {names:?}"));
        }
        let missing = CanonField::ALL
            .iter()
            .zip(cols.iter())
            .filter(|(f, c)| {
                c.is_none() && !(**f == CanonField::Detail && !detail_fallback.is_empty())
            })
            .map(|(f, _)| f.column_name())
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            log.push(format!("  -> Filled missing columns with defaults: {missing:?}"));
        }

        (0..sheet.len())
            .map(|row| {
                let get = |field: CanonField| cols[field as usize].map(|c| sheet.cell(row, c).trim());
                PlayRecord {
                    date: get(CanonField::Date)
                        .map(str::to_string)
                        .unwrap_or_else(|| self.today.clone()),
                    quarter: text(get(CanonField::Quarter)),
                    time: text(get(CanonField::Time)),
                    down: get(CanonField::Down).map_or(0, coerce_down),
                    distance: get(CanonField::Distance).map_or(0, coerce_distance),
                    field_position: text(get(CanonField::FieldPosition)),
                    play_type: text(get(CanonField::PlayType)),
                    run_course: text(get(CanonField::RunCourse)),
                    pass_course: text(get(CanonField::PassCourse)),
                    detail: if detail_fallback.is_empty() {
                        text(get(CanonField::Detail))
                    } else {
                        joined_text(sheet, row, &detail_fallback)
                    },
                    yards_gained: get(CanonField::YardsGained).map_or(0.0, coerce_yards),
                    success: get(CanonField::Success).map_or(0, parse_success_flag),
                }
            })
            .collect()
    }

    fn convert_legacy(&self, sheet: &RawSheet, log: &mut Vec<String>) -> Vec<PlayRecord> {
        let mut cols: [Option<usize>; 12] = [None; 12];
        for rule in &self.rules {
            if cols[rule.field as usize].is_some() {
                continue;
            }
            cols[rule.field as usize] = find_column(&sheet.headers, rule.keywords, rule.excludes);
        }
        for field in CanonField::ALL {
            match cols[field as usize] {
                Some(c) => log.push(format!("  -> {field} <- '{}'", sheet.headers[c])),
                None => log.push(format!("  -> {field} <- default")),
            }
        }

        (0..sheet.len())
            .map(|row| {
                let get = |field: CanonField| cols[field as usize].map(|c| sheet.cell(row, c).trim());
                let play_type = match cols[CanonField::PlayType as usize] {
                    Some(c) => sheet.cell(row, c).trim().to_string(),
                    None => UNKNOWN_PLAY_TYPE.to_string(),
                };
                PlayRecord {
                    date: get(CanonField::Date)
                        .filter(|d| !d.is_empty())
                        .map(str::to_string)
                        .unwrap_or_else(|| self.today.clone()),
                    quarter: text(get(CanonField::Quarter)),
                    time: text(get(CanonField::Time)),
                    down: get(CanonField::Down).map_or(DEFAULT_DOWN, coerce_down),
                    distance: get(CanonField::Distance).map_or(DEFAULT_DISTANCE, coerce_distance),
                    field_position: text(get(CanonField::FieldPosition)),
                    play_type,
                    run_course: text(get(CanonField::RunCourse)),
                    pass_course: text(get(CanonField::PassCourse)),
                    detail: text(get(CanonField::Detail)),
                    yards_gained: get(CanonField::YardsGained).map_or(0.0, coerce_yards),
                    success: get(CanonField::Success).map_or(0, parse_success_token),
                }
            })
            .collect()
    }

    fn convert_unknown(&self, sheet: &RawSheet, log: &mut Vec<String>) -> Vec<PlayRecord> {
        let Some(first) = sheet.headers.first() else {
            log.push("  -> No columns found".to_string());
            return Vec::new();
        };
        log.push(format!("  -> PlayType <- '{first}' (first column), all other fields default"));
        (0..sheet.len())
            .map(|row| PlayRecord::new(self.today.clone(), sheet.cell(row, 0).trim()))
            .collect()
    }
}

/// Non-empty cells of `cols` joined with "; ".
fn joined_text(sheet: &RawSheet, row: usize, cols: &[usize]) -> String {
    cols.iter()
        .map(|c| text(Some(sheet.cell(row, *c).trim())))
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

fn text(cell: Option<&str>) -> String {
    match cell {
        Some(v) if !v.eq_ignore_ascii_case("nan") => v.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn detects_three_layouts() {
        assert_eq!(
            detect_layout(&headers(&["Date", "PlayType", "YardsGained"])),
            SheetLayout::Canonical
        );
        assert_eq!(
            detect_layout(&headers(&["Play #", "Start Yard"])),
            SheetLayout::Legacy
        );
        assert_eq!(
            detect_layout(&headers(&["play type", "gain"])),
            SheetLayout::Legacy
        );
        assert_eq!(detect_layout(&headers(&["Call", "Gain"])), SheetLayout::Unknown);
    }

    #[test]
    fn down_rule_skips_distance_like_headers() {
        let h = headers(&["Yards to EDown", "First Down Yards", "Down"]);
        let down = rule(CanonField::Down);
        assert_eq!(find_column(&h, down.keywords, down.excludes), Some(2));

        let only_distance = headers(&["Yards to EDown"]);
        assert_eq!(find_column(&only_distance, down.keywords, down.excludes), None);
    }

    fn rule(field: CanonField) -> &'static ColumnRule {
        LEGACY_COLUMN_RULES
            .iter()
            .find(|r| r.field == field)
            .unwrap()
    }

    #[test]
    fn leftmost_matching_column_wins() {
        let distance = rule(CanonField::Distance);
        let h = headers(&["Distance", "Yards to EDown"]);
        assert_eq!(find_column(&h, distance.keywords, distance.excludes), Some(0));

        let detail = rule(CanonField::Detail);
        let h = headers(&["Result", "Memo"]);
        assert_eq!(find_column(&h, detail.keywords, detail.excludes), Some(0));

        let h = headers(&["Yards Gained Total", "Gained Yards"]);
        assert_eq!(find_column(&h, &["gained yards", "gained"], &[]), Some(0));
    }

    #[test]
    fn canonical_detail_falls_back_to_result_and_memo() {
        let sheet = RawSheet::from_strs(
            "Entry",
            &["PlayType", "YardsGained", "Result", "Memo"],
            &[
                &["Pass", "-6", "", "Sacked on the blitz"],
                &["Pass", "8", "First Down", "Quick slant"],
                &["Run", "2", "", ""],
            ],
        );
        let mut log = Vec::new();
        let out = Normalizer::new()
            .normalize_sheet(&sheet, &mut log)
            .unwrap();
        assert_eq!(out.plays[0].detail, "Sacked on the blitz");
        assert_eq!(out.plays[1].detail, "First Down; Quick slant");
        assert_eq!(out.plays[2].detail, "");
        assert!(log.iter().any(|l| l == "  -> Detail <- [\"Result\", \"Memo\"]"));
        assert!(!log.iter().any(|l| l.contains("\"Detail\"")));
    }

    #[test]
    fn explicit_detail_column_wins_over_memo() {
        let sheet = RawSheet::from_strs(
            "Entry",
            &["PlayType", "YardsGained", "Detail", "Memo"],
            &[&["Run", "3", "Inside zone", "ignored"]],
        );
        let out = Normalizer::new()
            .normalize_sheet(&sheet, &mut Vec::new())
            .unwrap();
        assert_eq!(out.plays[0].detail, "Inside zone");
    }

    #[test]
    fn legacy_rows_use_defaults_for_missing_fields() {
        let sheet = RawSheet::from_strs(
            "A",
            &["Play #", "Play Type", "Gained Yards"],
            &[&["1", "Run", "4"], &["2", "", "3"]],
        );
        let mut log = Vec::new();
        let out = Normalizer::new()
            .with_today("2025-02-01")
            .normalize_sheet(&sheet, &mut log)
            .unwrap();
        assert_eq!(out.layout, Some(SheetLayout::Legacy));
        assert_eq!(out.plays.len(), 1);
        assert_eq!(out.dropped, 1);
        let play = &out.plays[0];
        assert_eq!(play.date, "2025-02-01");
        assert_eq!(play.down, 1);
        assert_eq!(play.distance, 10);
        assert_eq!(play.yards_gained, 4.0);
        assert_eq!(play.success, 0);
        assert!(log.iter().any(|l| l.contains("Distance <- default")));
    }

    #[test]
    fn legacy_without_play_type_column_marks_unknown() {
        let sheet = RawSheet::from_strs("A", &["Play #", "Gained"], &[&["1", "5"]]);
        let out = Normalizer::new()
            .normalize_sheet(&sheet, &mut Vec::new())
            .unwrap();
        assert_eq!(out.plays[0].play_type, "Unknown");
        assert_eq!(out.plays[0].yards_gained, 5.0);
    }

    #[test]
    fn ragged_row_is_an_error() {
        let sheet = RawSheet::from_strs("A", &["PlayType"], &[&["Run", "extra"]]);
        assert!(Normalizer::new().normalize_sheet(&sheet, &mut Vec::new()).is_err());
    }
}
