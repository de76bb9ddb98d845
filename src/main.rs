use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::info;

use playbook::config::AppConfig;
use playbook::play::{Situation, field_position_label};
use playbook::rationale::{BigGains, NegativePlays, RationaleRule};
use playbook::recommend::{Recommender, Suggestion};
use playbook::sheet::load_workbook;
use playbook::store::PlayStore;
use playbook::strategy::PlayCodeTable;
use playbook::{Normalizer, dataset_csv, sample_data, workbook_export};

const USAGE: &str = "\
usage: playbook [--db PATH] <command> [options]

commands:
  ingest <file|dir>... [--dry-run]   normalize sheets and append them to the dataset
  recommend [--down N] [--distance N] [--field N] [--quarter Q]
            [--score-diff N] [--time MM:SS] [--json] [--xlsx PATH]
  stats                              dataset statistics
  reset                              delete every stored play
  export (--csv PATH | --xlsx PATH)  write the dataset
  import-csv <PATH>                  append a canonical CSV dataset
  template [PATH]                    write a blank data-entry workbook
  seed-sample [--count N] [--seed N] append generated plays";

const VALUE_FLAGS: &[&str] = &[
    "--db",
    "--down",
    "--distance",
    "--field",
    "--quarter",
    "--score-diff",
    "--time",
    "--xlsx",
    "--csv",
    "--count",
    "--seed",
];

fn main() -> Result<()> {
    // Loads `.env` too, so PLAYBOOK_LOG there reaches the subscriber.
    let config = AppConfig::from_env();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(config.log_level)
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let positional = positional_args(&args);
    let Some(command) = positional.first() else {
        println!("{USAGE}");
        return Ok(());
    };

    let db_path = flag_value(&args, "--db")
        .map(PathBuf::from)
        .or_else(|| config.db_path.clone())
        .context("unable to resolve sqlite path (set PLAYBOOK_DB or HOME)")?;

    match command.as_str() {
        "ingest" => cmd_ingest(&db_path, &positional[1..], has_flag(&args, "--dry-run")),
        "recommend" => cmd_recommend(&db_path, &config, &args),
        "stats" => cmd_stats(&db_path),
        "reset" => cmd_reset(&db_path),
        "export" => cmd_export(&db_path, &args),
        "import-csv" => {
            let path = positional
                .get(1)
                .ok_or_else(|| anyhow!("import-csv needs a file path"))?;
            cmd_import_csv(&db_path, Path::new(path))
        }
        "template" => {
            let path = positional
                .get(1)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("playbook_template.xlsx"));
            workbook_export::write_template(&path)?;
            println!("Template written to {}", path.display());
            Ok(())
        }
        "seed-sample" => cmd_seed_sample(&db_path, &args),
        "help" => {
            println!("{USAGE}");
            Ok(())
        }
        other => Err(anyhow!("unknown command '{other}'\n\n{USAGE}")),
    }
}

fn cmd_ingest(db_path: &Path, paths: &[String], dry_run: bool) -> Result<()> {
    if paths.is_empty() {
        return Err(anyhow!("ingest needs at least one file or directory"));
    }
    let normalizer = Normalizer::new();
    let mut store = if dry_run {
        None
    } else {
        Some(PlayStore::open(db_path)?)
    };

    let mut total = 0usize;
    for raw in paths {
        let path = Path::new(raw);
        let workbook = load_workbook(path)?;
        let outcome = normalizer.normalize_workbook(&workbook);
        println!("== {}", path.display());
        for line in &outcome.log {
            println!("{line}");
        }
        let Some(plays) = outcome.plays else {
            continue;
        };
        match store.as_mut() {
            Some(store) => {
                let added = store.append(raw, &plays, &outcome.log)?;
                println!("Appended {added} plays");
                total += added;
            }
            None => {
                println!("Dry run: {} plays not stored", plays.len());
                total += plays.len();
            }
        }
    }
    info!(total, dry_run, "ingest finished");
    Ok(())
}

fn cmd_recommend(db_path: &Path, config: &AppConfig, args: &[String]) -> Result<()> {
    let situation = situation_from_args(args)?;
    let store = PlayStore::open(db_path)?;
    let dataset = store.snapshot()?;

    let rules: Vec<Box<dyn RationaleRule>> = vec![
        Box::new(NegativePlays::default()),
        Box::new(BigGains {
            threshold_yards: config.big_gain_yards,
        }),
    ];
    let recommender = Recommender::new(PlayCodeTable::legacy(), rules, config.window);
    let suggestions = recommender.recommend(&dataset, &situation);

    if let Some(path) = flag_value(args, "--xlsx") {
        workbook_export::export_suggestions(Path::new(&path), &situation, &suggestions)?;
        println!("Suggestions written to {path}");
    }
    if has_flag(args, "--json") {
        let json = serde_json::to_string_pretty(&suggestions).context("serialize suggestions")?;
        println!("{json}");
        return Ok(());
    }

    println!("Situation: {}", describe_situation(&situation));
    if dataset.is_empty() {
        println!("No data yet. Ingest a workbook first.");
        return Ok(());
    }
    let Some((top, rest)) = suggestions.split_first() else {
        println!("No similar plays found in {} stored plays.", dataset.len());
        return Ok(());
    };
    println!();
    println!("Top recommendation: {}", summary_line(top));
    println!("  {}", top.rationale);
    if !rest.is_empty() {
        println!();
        println!("Alternatives:");
        for (idx, s) in rest.iter().enumerate() {
            println!("{:>3}. {}", idx + 2, summary_line(s));
            println!("     {}", s.rationale);
        }
    }
    Ok(())
}

fn cmd_stats(db_path: &Path) -> Result<()> {
    let store = PlayStore::open(db_path)?;
    let stats = store.statistics()?;
    println!("DB: {}", db_path.display());
    println!("Games: {}", stats.total_games);
    println!("Plays: {}", stats.total_plays);
    println!(
        "Last update: {}",
        stats.last_update.as_deref().unwrap_or("n/a")
    );
    let runs = store.ingest_runs()?;
    if !runs.is_empty() {
        println!("Ingest runs: {}", runs.len());
        for run in runs.iter().rev().take(5) {
            println!(
                "  #{} {} rows={} at {}",
                run.run_id, run.source, run.rows_added, run.started_at
            );
        }
    }
    Ok(())
}

fn cmd_reset(db_path: &Path) -> Result<()> {
    let mut store = PlayStore::open(db_path)?;
    let removed = store.reset()?;
    println!("Removed {removed} plays from {}", db_path.display());
    Ok(())
}

fn cmd_export(db_path: &Path, args: &[String]) -> Result<()> {
    let csv_path = flag_value(args, "--csv");
    let xlsx_path = flag_value(args, "--xlsx");
    if csv_path.is_none() && xlsx_path.is_none() {
        return Err(anyhow!("export needs --csv PATH and/or --xlsx PATH"));
    }
    let store = PlayStore::open(db_path)?;
    let plays = store.snapshot_tagged()?;
    if let Some(path) = csv_path {
        let records = plays.iter().map(|t| t.play.clone()).collect::<Vec<_>>();
        dataset_csv::write_csv(Path::new(&path), &records)?;
        println!("Wrote {} plays to {path}", records.len());
    }
    if let Some(path) = xlsx_path {
        let written = workbook_export::export_dataset(Path::new(&path), &plays)?;
        println!("Wrote {written} plays to {path}");
    }
    Ok(())
}

fn cmd_import_csv(db_path: &Path, path: &Path) -> Result<()> {
    let import = dataset_csv::read_csv(path)?;
    for line in &import.log {
        println!("{line}");
    }
    if import.plays.is_empty() {
        println!("No valid rows in {}", path.display());
        return Ok(());
    }
    let team = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let plays = import
        .plays
        .into_iter()
        .map(|play| playbook::TaggedPlay {
            team: team.clone(),
            play,
        })
        .collect::<Vec<_>>();
    let mut store = PlayStore::open(db_path)?;
    let added = store.append(&path.display().to_string(), &plays, &import.log)?;
    println!("Appended {added} plays");
    Ok(())
}

fn cmd_seed_sample(db_path: &Path, args: &[String]) -> Result<()> {
    let count = parse_flag::<usize>(args, "--count")?.unwrap_or(500);
    let seed = parse_flag::<u64>(args, "--seed")?.unwrap_or(42);
    let plays = sample_data::sample_plays(count, seed);
    let mut store = PlayStore::open(db_path)?;
    let added = store.append(&format!("sample:seed={seed}"), &plays, &[])?;
    println!("Appended {added} sample plays");
    Ok(())
}

fn situation_from_args(args: &[String]) -> Result<Situation> {
    Ok(Situation {
        down: parse_flag(args, "--down")?,
        distance: parse_flag(args, "--distance")?,
        field_position: parse_flag(args, "--field")?,
        quarter: flag_value(args, "--quarter"),
        score_diff: parse_flag(args, "--score-diff")?,
        time_remaining: flag_value(args, "--time"),
    })
}

fn describe_situation(situation: &Situation) -> String {
    let mut parts = Vec::new();
    match (situation.down, situation.distance) {
        (Some(down), Some(distance)) => parts.push(format!("{} & {distance}", ordinal(down))),
        (Some(down), None) => parts.push(format!("{} down", ordinal(down))),
        (None, Some(distance)) => parts.push(format!("{distance} to go")),
        (None, None) => {}
    }
    if let Some(field) = situation.field_position {
        parts.push(field_position_label(field));
    }
    if let Some(quarter) = &situation.quarter {
        parts.push(quarter.clone());
    }
    if let Some(diff) = situation.score_diff {
        parts.push(format!("score {diff:+}"));
    }
    if let Some(time) = &situation.time_remaining {
        parts.push(format!("{time} left"));
    }
    if parts.is_empty() {
        "any".to_string()
    } else {
        parts.join(", ")
    }
}

fn ordinal(n: u8) -> String {
    let suffix = match n {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

fn summary_line(s: &Suggestion) -> String {
    format!(
        "{} | avg {:.1} yd | success {} | n={}",
        s.label, s.avg_gain, s.success_rate, s.sample_size
    )
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Result<Option<T>> {
    match flag_value(args, flag) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| anyhow!("invalid value for {flag}: '{raw}'")),
        None => Ok(None),
    }
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

/// Arguments that are neither flags nor the value of a value-taking flag.
fn positional_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg.starts_with("--") {
            skip_next = VALUE_FLAGS.contains(&arg.as_str());
            continue;
        }
        out.push(arg.clone());
    }
    out
}
