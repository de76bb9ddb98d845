use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::play::{PlayRecord, TaggedPlay};

const TEAMS: [&str; 4] = ["Falcons", "Hawks", "Owls", "Ravens"];
const RUN_COURSES: [&str; 5] = ["Inside", "Outside", "Sweep", "Middle", "Off Tackle"];
const PASS_COURSES: [&str; 7] = ["Slant", "Out", "Go", "Curl", "Screen", "Fade", "Deep"];
const PLAYS_PER_GAME: usize = 60;

/// Deterministic synthetic plays: the same `seed` always yields the same rows.
///
/// Games are one week apart starting 2025-01-01, and the team tag rotates per game.
pub fn sample_plays(count: usize, seed: u64) -> Vec<TaggedPlay> {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default();
    (0..count)
        .map(|idx| {
            let game = idx / PLAYS_PER_GAME;
            let date = start + Duration::weeks(game as i64);
            let team = TEAMS[game % TEAMS.len()].to_string();
            let play = sample_play(&mut rng, &date.format("%Y-%m-%d").to_string(), idx % PLAYS_PER_GAME);
            TaggedPlay { team, play }
        })
        .collect()
}

fn sample_play(rng: &mut StdRng, date: &str, play_in_game: usize) -> PlayRecord {
    let down: u8 = rng.gen_range(1..=4);
    let distance: u32 = match down {
        1 => 10,
        _ => rng.gen_range(1..=12),
    };
    let field: u32 = rng.gen_range(5..=95);
    let quarter = (play_in_game * 4 / PLAYS_PER_GAME).min(3) + 1;

    let roll: f64 = rng.gen_range(0.0..1.0);
    let play_type = match (down, roll) {
        (4, r) if r < 0.45 && field >= 60 => "FG",
        (4, r) if r < 0.6 => "Punt",
        (_, r) if r < 0.40 => "Run",
        (_, r) if r < 0.85 => "Pass",
        (_, r) if r < 0.93 => "Screen",
        _ => "Draw",
    };

    let mut play = PlayRecord::new(date, play_type);
    play.quarter = format!("{quarter}Q");
    play.time = format!("{:02}:{:02}", rng.gen_range(0..15), rng.gen_range(0..60));
    play.down = down;
    play.distance = distance;
    play.field_position = field.to_string();

    match play_type {
        "Run" | "Draw" => {
            play.run_course = pick(rng, &RUN_COURSES);
            let yards = rng.gen_range(-3..=8) + rng.gen_range(0..=4);
            play.yards_gained = f64::from(yards);
            if rng.gen_bool(0.04) {
                play.yards_gained = f64::from(rng.gen_range(21..=60));
            }
        }
        "Pass" | "Screen" => {
            play.pass_course = if play_type == "Screen" {
                "Screen".to_string()
            } else {
                pick(rng, &PASS_COURSES)
            };
            let outcome: f64 = rng.gen_range(0.0..1.0);
            if outcome < 0.07 {
                play.yards_gained = -f64::from(rng.gen_range(3..=10));
                play.detail = "Sack".to_string();
            } else if outcome < 0.40 {
                play.detail = "Incomplete".to_string();
            } else if outcome < 0.48 {
                play.yards_gained = f64::from(rng.gen_range(21..=70));
            } else {
                play.yards_gained = f64::from(rng.gen_range(1..=18));
            }
        }
        _ => {
            play.detail = if play_type == "FG" {
                format!("{} yd attempt", 117 - field)
            } else {
                "Punt".to_string()
            };
        }
    }

    play.success = u8::from(is_successful(down, distance, play.yards_gained));
    play
}

/// Standard success-rate definition: 40% of the distance on first down,
/// 60% on second, all of it on third and fourth.
fn is_successful(down: u8, distance: u32, yards: f64) -> bool {
    let needed = f64::from(distance)
        * match down {
            1 => 0.4,
            2 => 0.6,
            _ => 1.0,
        };
    yards > 0.0 && yards >= needed
}

fn pick(rng: &mut StdRng, options: &[&str]) -> String {
    options.choose(rng).copied().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_plays() {
        assert_eq!(sample_plays(200, 7), sample_plays(200, 7));
        assert_ne!(sample_plays(200, 7), sample_plays(200, 8));
    }

    #[test]
    fn plays_are_well_formed() {
        let plays = sample_plays(500, 1);
        assert_eq!(plays.len(), 500);
        for tagged in &plays {
            let p = &tagged.play;
            assert!(!p.play_type.trim().is_empty());
            assert!((1..=4).contains(&p.down));
            assert!(p.field_position_num().is_some());
            assert!(p.success <= 1);
        }
        assert_eq!(plays[0].team, "Falcons");
        assert_eq!(plays[PLAYS_PER_GAME].play.date, "2025-01-08");
    }

    #[test]
    fn success_thresholds_by_down() {
        assert!(is_successful(1, 10, 4.0));
        assert!(!is_successful(1, 10, 3.0));
        assert!(is_successful(2, 5, 3.0));
        assert!(!is_successful(3, 5, 4.0));
        assert!(!is_successful(3, 0, 0.0));
    }
}
