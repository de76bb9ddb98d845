use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::play::PlayRecord;

/// Short and numeric play codes found in older scouting sheets.
pub const LEGACY_PLAY_CODES: &[(&str, &str)] = &[
    ("1", "Pass"),
    ("1.0", "Pass"),
    ("2", "Run"),
    ("2.0", "Run"),
    ("3", "Screen"),
    ("3.0", "Screen"),
    ("4", "Draw"),
    ("4.0", "Draw"),
    ("P", "Punt"),
    ("FG", "FieldGoal"),
];

static DEFAULT_CODES: Lazy<PlayCodeTable> = Lazy::new(|| PlayCodeTable::from_pairs(LEGACY_PLAY_CODES));

/// Maps source play codes to canonical play labels. Unknown codes pass through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayCodeTable {
    codes: HashMap<String, String>,
}

impl PlayCodeTable {
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            codes: pairs
                .iter()
                .map(|(code, label)| (code.to_string(), label.to_string()))
                .collect(),
        }
    }

    /// The built-in legacy table.
    pub fn legacy() -> Self {
        DEFAULT_CODES.clone()
    }

    /// Adds or replaces a mapping; later formats can extend the table this way.
    pub fn insert(&mut self, code: impl Into<String>, label: impl Into<String>) {
        self.codes.insert(code.into(), label.into());
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn resolve(&self, raw: &str) -> String {
        let raw = raw.trim();
        if let Some(label) = self.codes.get(raw) {
            return label.clone();
        }
        // "2.0" style floats written by spreadsheet tools.
        if let Some(label) = raw.strip_suffix(".0").and_then(|code| self.codes.get(code)) {
            return label.clone();
        }
        raw.to_string()
    }
}

/// Grouping key for a play: canonical play label plus course detail when the play
/// is a pass (pass course) or a run (run course).
pub fn strategy_label(play: &PlayRecord, codes: &PlayCodeTable) -> String {
    let raw = play.play_type.trim();
    let label = codes.resolve(raw);

    let course = if label.contains("Pass") || raw.contains("Pass") {
        Some(play.pass_course.as_str())
    } else if label.contains("Run") || raw.contains("Run") {
        Some(play.run_course.as_str())
    } else {
        None
    };

    match course.map(str::trim).filter(|c| !c.is_empty() && *c != "nan") {
        Some(course) => format!("{label} - {course}"),
        None => label,
    }
}
