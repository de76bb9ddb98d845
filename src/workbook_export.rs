use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::play::{CANONICAL_COLUMNS, Situation, TaggedPlay, field_position_label};
use crate::recommend::Suggestion;

const TEMPLATE_COLUMNS: [(&str, &str); 16] = [
    ("Date", "Game date (YYYY-MM-DD)"),
    ("Quarter", "Quarter (1Q, 2Q, 3Q, 4Q, OT)"),
    ("Time", "Time remaining (MM:SS)"),
    ("PlayNumber", "Play number"),
    ("Team", "Offense team name"),
    ("Down", "Down (1-4)"),
    ("Distance", "Yards to first down"),
    ("FieldPosition", "Line of scrimmage, 0 = own goal line, 100 = opponent goal line"),
    ("Hash", "Hash mark (L, M, R)"),
    ("Formation", "Formation name"),
    ("PlayType", "Play type (Run, Pass, Screen, Draw, Punt, FG)"),
    ("RunCourse", "Run course (Middle, Outside, Sweep, ...)"),
    ("PassCourse", "Pass course (Short, Deep, Screen, Slant, ...)"),
    ("YardsGained", "Yards gained (negative for a loss)"),
    ("Result", "Result detail (First Down, TD, INT, ...)"),
    ("Memo", "Free-form notes"),
];

const TEMPLATE_EXAMPLES: [[&str; 16]; 3] = [
    [
        "2024-09-01", "1Q", "10:00", "1", "OffenseTeam", "1", "10", "25", "L", "I-Form", "Run",
        "Middle", "", "4", "", "Power run",
    ],
    [
        "2024-09-01", "2Q", "02:30", "15", "OffenseTeam", "2", "6", "45", "M", "Shotgun", "Pass",
        "", "Slant", "8", "First Down", "Quick slant",
    ],
    [
        "2024-09-01", "3Q", "08:15", "28", "OffenseTeam", "3", "4", "80", "R", "Empty", "Screen",
        "", "Screen Left", "12", "Touchdown", "Good blocking",
    ],
];

/// Blank data-entry workbook: a `MatchData` sheet with example rows and an
/// `Explanation` sheet describing every column.
pub fn write_template(path: &Path) -> Result<()> {
    let mut data_rows = vec![
        TEMPLATE_COLUMNS
            .iter()
            .map(|(c, _)| c.to_string())
            .collect::<Vec<_>>(),
    ];
    data_rows.extend(
        TEMPLATE_EXAMPLES
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect::<Vec<_>>()),
    );
    let mut help_rows = vec![vec!["Column".to_string(), "Description".to_string()]];
    help_rows.extend(
        TEMPLATE_COLUMNS
            .iter()
            .map(|(c, d)| vec![c.to_string(), d.to_string()]),
    );

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("MatchData")?;
        write_rows(sheet, &data_rows, &[3, 5, 6, 7, 13])?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Explanation")?;
        write_rows(sheet, &help_rows, &[])?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing template to {}", path.display()))?;
    Ok(())
}

/// Dataset export: canonical columns plus the team tag.
pub fn export_dataset(path: &Path, plays: &[TaggedPlay]) -> Result<usize> {
    let mut header = CANONICAL_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>();
    header.push("Team".to_string());
    let mut rows = vec![header];
    for tagged in plays {
        let mut row = tagged.play.to_row();
        row.push(tagged.team.clone());
        rows.push(row);
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Plays")?;
        write_rows(sheet, &rows, &[3, 4, 10, 11])?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(plays.len())
}

/// Ranked suggestions plus the situation they answer.
pub fn export_suggestions(path: &Path, situation: &Situation, suggestions: &[Suggestion]) -> Result<()> {
    let mut rows = vec![vec![
        "Rank".to_string(),
        "Strategy".to_string(),
        "Avg Gain (yd)".to_string(),
        "Success Rate".to_string(),
        "Samples".to_string(),
        "Rationale".to_string(),
    ]];
    for (idx, s) in suggestions.iter().enumerate() {
        rows.push(vec![
            (idx + 1).to_string(),
            s.label.clone(),
            format!("{:.1}", s.avg_gain),
            s.success_rate.clone(),
            s.sample_size.to_string(),
            s.rationale.clone(),
        ]);
    }

    let situation_rows = vec![
        vec!["Field".to_string(), "Value".to_string()],
        vec!["Down".to_string(), opt_to_string(situation.down)],
        vec!["Distance".to_string(), opt_to_string(situation.distance)],
        vec![
            "Field Position".to_string(),
            situation
                .field_position
                .map(field_position_label)
                .unwrap_or_default(),
        ],
        vec![
            "Quarter".to_string(),
            situation.quarter.clone().unwrap_or_default(),
        ],
        vec!["Score Diff".to_string(), opt_to_string(situation.score_diff)],
        vec![
            "Time Remaining".to_string(),
            situation.time_remaining.clone().unwrap_or_default(),
        ],
    ];

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Suggestions")?;
        write_rows(sheet, &rows, &[0, 2, 4])?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Situation")?;
        write_rows(sheet, &situation_rows, &[])?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(())
}

/// First row is the header and always text; cells in `numeric_cols` are written
/// as numbers when they parse.
fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>], numeric_cols: &[usize]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            let number = (row_idx > 0 && numeric_cols.contains(&col_idx))
                .then(|| value.trim().parse::<f64>().ok())
                .flatten();
            match number {
                Some(n) => worksheet.write_number(row_idx as u32, col_idx as u16, n),
                None => worksheet.write_string(row_idx as u32, col_idx as u16, value),
            }
            .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

fn opt_to_string<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
