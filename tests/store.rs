use std::path::PathBuf;

use playbook::dataset_csv;
use playbook::play::{PlayRecord, Situation, TaggedPlay};
use playbook::recommend;
use playbook::sheet::load_workbook;
use playbook::store::PlayStore;
use playbook::Normalizer;

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

#[test]
fn store_persists_across_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("nested").join("plays.sqlite");

    let workbook = load_workbook(&fixture_path("team_sheets")).expect("fixture loads");
    let outcome = Normalizer::new()
        .with_today("2025-03-01")
        .normalize_workbook(&workbook);
    let plays = outcome.plays.clone().expect("plays");
    {
        let mut store = PlayStore::open(&db_path).expect("open store");
        assert_eq!(store.path(), Some(db_path.as_path()));
        let added = store
            .append("team_sheets", &plays, &outcome.log)
            .expect("append");
        assert_eq!(added, 4);
    }

    let store = PlayStore::open(&db_path).expect("reopen store");
    let snapshot = store.snapshot_tagged().expect("snapshot");
    assert_eq!(snapshot, plays);

    let stats = store.statistics().expect("stats");
    assert_eq!(stats.total_plays, 4);
    // 2025-01-01 from Falcons, today's date stamped on Hawks.
    assert_eq!(stats.total_games, 2);
    assert!(stats.last_update.is_some());

    let runs = store.ingest_runs().expect("runs");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].source, "team_sheets");
    assert_eq!(runs[0].log, outcome.log);
    assert!(runs[0].finished_at.is_some());
    assert_eq!(store.last_run().expect("last run"), Some(runs[0].run_id));
}

#[test]
fn appends_accumulate_in_order() {
    let mut store = PlayStore::open_in_memory().expect("open store");
    let batch = |play_type: &str| {
        vec![TaggedPlay {
            team: "A".to_string(),
            play: PlayRecord::new("2025-01-01", play_type),
        }]
    };
    store.append("one", &batch("Run"), &[]).expect("append one");
    store.append("two", &batch("Pass"), &[]).expect("append two");
    store.append("empty", &[], &[]).expect("append empty");

    let types = store
        .snapshot()
        .expect("snapshot")
        .into_iter()
        .map(|p| p.play_type)
        .collect::<Vec<_>>();
    assert_eq!(types, vec!["Run", "Pass"]);
    assert_eq!(store.ingest_runs().expect("runs").len(), 3);

    assert_eq!(store.reset().expect("reset"), 2);
    assert_eq!(store.statistics().expect("stats").total_plays, 0);
    assert!(store.ingest_runs().expect("runs").is_empty());
}

#[test]
fn recommendation_reads_a_snapshot() {
    let mut store = PlayStore::open_in_memory().expect("open store");
    let mut run = PlayRecord::new("2025-01-01", "Run");
    run.run_course = "Inside".to_string();
    run.field_position = "25".to_string();
    run.yards_gained = 4.0;
    let mut pass = PlayRecord::new("2025-01-01", "Pass");
    pass.pass_course = "Slant".to_string();
    pass.field_position = "25".to_string();
    pass.yards_gained = 8.0;
    let rows = [run, pass]
        .into_iter()
        .map(|play| TaggedPlay {
            team: "A".to_string(),
            play,
        })
        .collect::<Vec<_>>();
    store.append("manual", &rows, &[]).expect("append");

    let dataset = store.snapshot().expect("snapshot");
    let situation = Situation {
        down: Some(1),
        distance: Some(10),
        field_position: Some(25),
        ..Situation::default()
    };
    let out = recommend(&dataset, &situation);
    assert_eq!(out[0].label, "Pass - Slant");
    assert_eq!(out[1].label, "Run - Inside");
}

#[test]
fn csv_export_reimports_to_the_same_plays() {
    let dir = tempfile::tempdir().expect("tempdir");
    let csv_path = dir.path().join("match_data.csv");

    let workbook = load_workbook(&fixture_path("legacy_scouting.csv")).expect("fixture loads");
    let plays = Normalizer::new()
        .with_today("2025-03-01")
        .normalize_workbook(&workbook)
        .plays
        .expect("plays")
        .into_iter()
        .map(|t| t.play)
        .collect::<Vec<_>>();

    dataset_csv::write_csv(&csv_path, &plays).expect("write csv");
    let import = dataset_csv::read_csv(&csv_path).expect("read csv");
    assert_eq!(import.skipped_lines, 0);
    assert_eq!(import.plays, plays);
}

#[test]
fn unwritable_db_directory_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").expect("write blocker file");

    let err = PlayStore::open(&blocker.join("plays.sqlite"))
        .err()
        .expect("a file in the parent path fails the open");
    let message = format!("{err:#}");
    assert!(message.contains("create db directory"), "{message}");
    assert!(message.contains("blocker"), "{message}");
}
