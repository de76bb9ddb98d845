use std::collections::HashMap;
use std::io::Read;

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

use crate::http_client::http_client;
use crate::play::{
    PlayRecord, TaggedPlay, coerce_distance, coerce_down, coerce_yards, parse_number,
};

const NFLVERSE_PBP_URL: &str = "https://github.com/nflverse/nflverse-data/releases/download/pbp";
const DETAIL_MAX_CHARS: usize = 200;
const DEFAULT_FIELD_POSITION: i64 = 25;

#[derive(Debug, Clone, Default)]
pub struct NflImport {
    pub plays: Vec<TaggedPlay>,
    /// Rows read from the source, before play-type filtering.
    pub rows_read: usize,
    /// Rows that were not a pass, run, punt or field goal.
    pub rows_ignored: usize,
}

pub fn play_by_play_url(year: u16) -> String {
    format!("{NFLVERSE_PBP_URL}/play_by_play_{year}.csv")
}

/// Download one season of nflverse play-by-play and convert the first `limit` rows.
pub fn fetch_season(year: u16, limit: usize) -> Result<NflImport> {
    let url = play_by_play_url(year);
    info!(%url, limit, "downloading nflverse play-by-play");
    let client = http_client()?;
    let resp = client
        .get(&url)
        .send()
        .with_context(|| format!("request {url}"))?;
    let status = resp.status();
    if !status.is_success() {
        warn!(%url, %status, "nflverse download failed");
        return Err(anyhow!("http {status} for {url}"));
    }
    convert_play_by_play(resp, limit)
}

/// Convert nflverse CSV rows into canonical plays tagged with the offense team.
pub fn convert_play_by_play<R: Read>(input: R, limit: usize) -> Result<NflImport> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let index = reader
        .headers()
        .context("read play-by-play header")?
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim().to_string(), idx))
        .collect::<HashMap<_, _>>();
    if !index.contains_key("play_type") {
        return Err(anyhow!("play-by-play csv has no play_type column"));
    }

    let mut out = NflImport::default();
    for record in reader.records().take(limit) {
        let record = record.with_context(|| format!("play-by-play row {}", out.rows_read + 1))?;
        out.rows_read += 1;
        let row = PbpRow {
            index: &index,
            record: &record,
        };

        let play_type = row.get("play_type");
        let Some(label) = play_label(play_type) else {
            out.rows_ignored += 1;
            continue;
        };

        let mut play = PlayRecord::new(row.get("game_date"), label);
        play.quarter = parse_number(row.get("qtr"))
            .map(|q| format!("{}Q", q as i64))
            .unwrap_or_default();
        play.time = row.get("time").to_string();
        play.down = coerce_down(row.get("down"));
        play.distance = coerce_distance(row.get("ydstogo"));
        play.field_position = parse_number(row.get("yardline_100"))
            .map(|y| 100 - y.round() as i64)
            .unwrap_or(DEFAULT_FIELD_POSITION)
            .to_string();
        match play_type {
            "pass" => play.pass_course = join_course(row.get("pass_length"), row.get("pass_location")),
            "run" => play.run_course = join_course(row.get("run_location"), row.get("run_gap")),
            _ => {}
        }

        let team = row.get("posteam").to_string();
        let mut detail = row.get("desc").chars().take(DETAIL_MAX_CHARS).collect::<String>();
        if !team.is_empty() {
            detail.push_str(&format!(" ({team})"));
        }
        play.detail = detail;
        play.yards_gained = coerce_yards(row.get("yards_gained"));
        play.success = u8::from(parse_number(row.get("success")).is_some_and(|v| v != 0.0));

        out.plays.push(TaggedPlay { team, play });
    }

    info!(
        rows = out.rows_read,
        kept = out.plays.len(),
        ignored = out.rows_ignored,
        "converted nflverse rows"
    );
    Ok(out)
}

struct PbpRow<'a> {
    index: &'a HashMap<String, usize>,
    record: &'a csv::StringRecord,
}

impl<'a> PbpRow<'a> {
    /// Trimmed cell value; nflverse writes missing values as "NA".
    fn get(&self, name: &str) -> &'a str {
        self.index
            .get(name)
            .and_then(|idx| self.record.get(*idx))
            .map(|v| v.trim())
            .filter(|v| !v.eq_ignore_ascii_case("na"))
            .unwrap_or("")
    }
}

fn play_label(play_type: &str) -> Option<&'static str> {
    match play_type {
        "pass" => Some("Pass"),
        "run" => Some("Run"),
        "punt" => Some("Punt"),
        "field_goal" => Some("FieldGoal"),
        _ => None,
    }
}

fn join_course(a: &str, b: &str) -> String {
    format!("{a} {b}").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_uses_release_layout() {
        assert_eq!(
            play_by_play_url(2023),
            "https://github.com/nflverse/nflverse-data/releases/download/pbp/play_by_play_2023.csv"
        );
    }

    #[test]
    fn courses_are_joined_and_trimmed() {
        assert_eq!(join_course("short", "left"), "short left");
        assert_eq!(join_course("", "middle"), "middle");
        assert_eq!(join_course("", ""), "");
    }

    #[test]
    fn missing_play_type_column_is_an_error() {
        let raw = "game_date,down\n2023-09-07,1\n";
        assert!(convert_play_by_play(raw.as_bytes(), 10).is_err());
    }
}
