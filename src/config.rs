use std::path::PathBuf;

use crate::recommend::MatchWindow;

const CACHE_DIR: &str = "playbook";
const DB_FILE: &str = "plays.sqlite";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: Option<PathBuf>,
    pub window: MatchWindow,
    pub big_gain_yards: f64,
    pub nflverse_year: u16,
    pub nflverse_limit: usize,
    /// `PLAYBOOK_LOG` as a tracing level name.
    pub log_level: tracing::Level,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            window: MatchWindow::default(),
            big_gain_yards: 20.0,
            nflverse_year: 2023,
            nflverse_limit: 5000,
            log_level: tracing::Level::INFO,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment (after `.env`, if present).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let db_path = parsed("PLAYBOOK_DB")
            .map(PathBuf::from)
            .or_else(|| app_cache_dir_from(&lookup).map(|dir| dir.join(DB_FILE)));

        let window = MatchWindow {
            distance_yards: parsed("PLAYBOOK_DISTANCE_WINDOW")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(defaults.window.distance_yards),
            field_yards: parsed("PLAYBOOK_FIELD_WINDOW")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(defaults.window.field_yards),
        };

        Self {
            db_path,
            window,
            big_gain_yards: parsed("PLAYBOOK_BIG_GAIN_YARDS")
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(defaults.big_gain_yards),
            nflverse_year: parsed("PLAYBOOK_NFLVERSE_YEAR")
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(defaults.nflverse_year),
            nflverse_limit: parsed("PLAYBOOK_NFLVERSE_LIMIT")
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.nflverse_limit),
            log_level: parsed("PLAYBOOK_LOG")
                .and_then(|v| v.parse::<tracing::Level>().ok())
                .unwrap_or(defaults.log_level),
        }
    }
}

fn app_cache_dir_from(lookup: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    // Prefer XDG cache.
    if let Some(base) = lookup("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = lookup("HOME")?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg.db_path, None);
        assert_eq!(cfg.window, MatchWindow::default());
        assert_eq!(cfg.big_gain_yards, 20.0);
        assert_eq!(cfg.nflverse_limit, 5000);
        assert_eq!(cfg.log_level, tracing::Level::INFO);
    }

    #[test]
    fn log_level_comes_from_the_same_lookup() {
        let cfg = AppConfig::from_lookup(lookup(&[("PLAYBOOK_LOG", " debug ")]));
        assert_eq!(cfg.log_level, tracing::Level::DEBUG);
        let cfg = AppConfig::from_lookup(lookup(&[("PLAYBOOK_LOG", "chatty")]));
        assert_eq!(cfg.log_level, tracing::Level::INFO);
    }

    #[test]
    fn db_path_prefers_explicit_then_xdg_then_home() {
        let cfg = AppConfig::from_lookup(lookup(&[("HOME", "/home/coach")]));
        assert_eq!(
            cfg.db_path,
            Some(PathBuf::from("/home/coach/.cache/playbook/plays.sqlite"))
        );
        let cfg = AppConfig::from_lookup(lookup(&[("HOME", "/home/coach"), ("XDG_CACHE_HOME", "/xdg")]));
        assert_eq!(cfg.db_path, Some(PathBuf::from("/xdg/playbook/plays.sqlite")));
        let cfg = AppConfig::from_lookup(lookup(&[
            ("XDG_CACHE_HOME", "/xdg"),
            ("PLAYBOOK_DB", "/data/plays.sqlite"),
        ]));
        assert_eq!(cfg.db_path, Some(PathBuf::from("/data/plays.sqlite")));
    }

    #[test]
    fn bad_numbers_fall_back() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("PLAYBOOK_DISTANCE_WINDOW", "3"),
            ("PLAYBOOK_FIELD_WINDOW", "wide"),
            ("PLAYBOOK_BIG_GAIN_YARDS", "NaN"),
        ]));
        assert_eq!(cfg.window.distance_yards, 3);
        assert_eq!(cfg.window.field_yards, 10);
        assert_eq!(cfg.big_gain_yards, 20.0);
    }
}
