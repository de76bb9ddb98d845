use serde::{Deserialize, Serialize};

/// Canonical column order shared by the normalizer, the store and the CSV writer.
pub const CANONICAL_COLUMNS: [&str; 12] = [
    "Date",
    "Quarter",
    "Time",
    "Down",
    "Distance",
    "FieldPosition",
    "PlayType",
    "RunCourse",
    "PassCourse",
    "Detail",
    "YardsGained",
    "Success",
];

pub const DEFAULT_DOWN: u8 = 1;
pub const DEFAULT_DISTANCE: u32 = 10;

const SUCCESS_TOKENS: [&str; 5] = ["success", "yes", "1", "true", "成功"];

/// One historical play in the canonical schema.
///
/// `field_position` stays textual because legacy sheets carry values like "Own 25";
/// use [`PlayRecord::field_position_num`] when a numeric position is needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayRecord {
    pub date: String,
    pub quarter: String,
    pub time: String,
    pub down: u8,
    pub distance: u32,
    pub field_position: String,
    pub play_type: String,
    pub run_course: String,
    pub pass_course: String,
    pub detail: String,
    pub yards_gained: f64,
    pub success: u8,
}

impl PlayRecord {
    /// A record with every optional field empty and numeric fields at their defaults.
    pub fn new(date: impl Into<String>, play_type: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            quarter: String::new(),
            time: String::new(),
            down: DEFAULT_DOWN,
            distance: DEFAULT_DISTANCE,
            field_position: String::new(),
            play_type: play_type.into(),
            run_course: String::new(),
            pass_course: String::new(),
            detail: String::new(),
            yards_gained: 0.0,
            success: 0,
        }
    }

    pub fn field_position_num(&self) -> Option<f64> {
        parse_number(&self.field_position)
    }

    /// Values in [`CANONICAL_COLUMNS`] order, rendered as text.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.date.clone(),
            self.quarter.clone(),
            self.time.clone(),
            self.down.to_string(),
            self.distance.to_string(),
            self.field_position.clone(),
            self.play_type.clone(),
            self.run_course.clone(),
            self.pass_course.clone(),
            self.detail.clone(),
            format_yards(self.yards_gained),
            self.success.to_string(),
        ]
    }
}

/// A normalized play together with the sheet (team/source) it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedPlay {
    pub team: String,
    pub play: PlayRecord,
}

/// Query situation. `None` on any field means "ignore this dimension".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Situation {
    pub down: Option<u8>,
    pub distance: Option<u32>,
    pub field_position: Option<u32>,
    pub quarter: Option<String>,
    pub score_diff: Option<i32>,
    pub time_remaining: Option<String>,
}

/// Lenient numeric parse: trims, accepts "12", "12.0", "-3.5", "1,200".
/// Anything else (including "Own 25", "nan", "") is `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let cleaned = s.replace(',', "");
    let v = cleaned.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

pub fn coerce_down(raw: &str) -> u8 {
    parse_number(raw)
        .filter(|v| *v >= 0.0 && *v <= f64::from(u8::MAX))
        .map(|v| v.round() as u8)
        .unwrap_or(DEFAULT_DOWN)
}

pub fn coerce_distance(raw: &str) -> u32 {
    parse_number(raw)
        .filter(|v| *v >= 0.0)
        .map(|v| v.round().min(f64::from(u32::MAX)) as u32)
        .unwrap_or(DEFAULT_DISTANCE)
}

pub fn coerce_yards(raw: &str) -> f64 {
    parse_number(raw).unwrap_or(0.0)
}

/// Success flag from a free-text cell. Numeric cells count as success when non-zero;
/// text cells when they spell one of the affirmative tokens.
pub fn parse_success_flag(raw: &str) -> u8 {
    let s = raw.trim().to_lowercase();
    if SUCCESS_TOKENS.contains(&s.as_str()) {
        return 1;
    }
    match parse_number(&s) {
        Some(v) if v != 0.0 => 1,
        _ => 0,
    }
}

/// Strict variant used for legacy sheets: only the affirmative tokens count.
pub fn parse_success_token(raw: &str) -> u8 {
    let s = raw.trim().to_lowercase();
    u8::from(SUCCESS_TOKENS.contains(&s.as_str()))
}

/// "Own 25" for the first half of the field, "Opp 20" past midfield.
pub fn field_position_label(pos: u32) -> String {
    let pos = pos.min(100);
    let mut out = if pos <= 50 {
        format!("Own {pos}")
    } else {
        format!("Opp {}", 100 - pos)
    };
    if pos >= 80 {
        out.push_str(" (red zone)");
    }
    out
}

fn format_yards(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}
