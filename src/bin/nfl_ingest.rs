use std::path::PathBuf;

use anyhow::{Context, Result};

use playbook::config::AppConfig;
use playbook::nflverse;
use playbook::store::PlayStore;

fn main() -> Result<()> {
    // Loads `.env` too, so PLAYBOOK_LOG there reaches the subscriber.
    let config = AppConfig::from_env();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(config.log_level)
        .init();

    let year = parse_number_arg::<u16>("--year").unwrap_or(config.nflverse_year);
    let limit = parse_number_arg::<usize>("--limit")
        .filter(|v| *v > 0)
        .unwrap_or(config.nflverse_limit);

    let db_path = parse_db_path_arg()
        .or(config.db_path)
        .context("unable to resolve sqlite path")?;

    let import = nflverse::fetch_season(year, limit)?;
    let mut store = PlayStore::open(&db_path)?;
    let log = vec![format!(
        "nflverse {year}: read {} rows, kept {}, ignored {}",
        import.rows_read,
        import.plays.len(),
        import.rows_ignored
    )];
    let added = store.append(&nflverse::play_by_play_url(year), &import.plays, &log)?;

    println!("nflverse import complete");
    println!("DB: {}", db_path.display());
    println!("Season: {year}");
    println!("Rows read: {}", import.rows_read);
    println!("Plays appended: {added}");
    println!("Rows ignored: {}", import.rows_ignored);

    let stats = store.statistics()?;
    println!("Dataset: {} plays over {} games", stats.total_plays, stats.total_games);
    Ok(())
}

fn parse_db_path_arg() -> Option<PathBuf> {
    arg_value("--db").map(PathBuf::from)
}

fn parse_number_arg<T: std::str::FromStr>(flag: &str) -> Option<T> {
    arg_value(flag).and_then(|raw| raw.parse::<T>().ok())
}

fn arg_value(flag: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}
