use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::info;

use crate::play::{PlayRecord, TaggedPlay};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetStats {
    /// Distinct game dates.
    pub total_games: usize,
    pub total_plays: usize,
    pub last_update: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IngestRun {
    pub run_id: i64,
    pub source: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub rows_added: usize,
    pub log: Vec<String>,
}

/// Append-only play dataset backed by sqlite.
///
/// Readers take a [`PlayStore::snapshot`]; every mutation needs `&mut self`, so one
/// store value is the single writer for its database file.
pub struct PlayStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl PlayStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create db directory {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Every stored play in insertion order. Empty when nothing is stored.
    pub fn snapshot(&self) -> Result<Vec<PlayRecord>> {
        Ok(self
            .snapshot_tagged()?
            .into_iter()
            .map(|tagged| tagged.play)
            .collect())
    }

    /// Plays together with the sheet/team tag they were ingested under.
    pub fn snapshot_tagged(&self) -> Result<Vec<TaggedPlay>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT
                    date, quarter, time, down, distance, field_position,
                    play_type, run_course, pass_course, detail, yards_gained, success,
                    team
                FROM plays
                ORDER BY play_id ASC
                "#,
            )
            .context("prepare snapshot query")?;

        let rows = stmt
            .query_map([], |row| {
                let play = PlayRecord {
                    date: row.get(0)?,
                    quarter: row.get(1)?,
                    time: row.get(2)?,
                    down: row.get::<_, i64>(3)?.clamp(0, i64::from(u8::MAX)) as u8,
                    distance: row.get::<_, i64>(4)?.clamp(0, i64::from(u32::MAX)) as u32,
                    field_position: row.get(5)?,
                    play_type: row.get(6)?,
                    run_course: row.get(7)?,
                    pass_course: row.get(8)?,
                    detail: row.get(9)?,
                    yards_gained: row.get(10)?,
                    success: u8::from(row.get::<_, i64>(11)? != 0),
                };
                Ok(TaggedPlay {
                    team: row.get(12)?,
                    play,
                })
            })
            .context("query snapshot")?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode play row")?);
        }
        Ok(out)
    }

    /// Append normalized plays in one transaction and record the ingest run.
    /// Returns the number of rows written.
    pub fn append(&mut self, source: &str, plays: &[TaggedPlay], log: &[String]) -> Result<usize> {
        let started_at = Utc::now().to_rfc3339();
        let tx = self.conn.transaction().context("begin append transaction")?;
        tx.execute(
            "INSERT INTO ingest_runs(source, started_at, finished_at, rows_added, log_json)
             VALUES (?1, ?2, NULL, 0, '[]')",
            params![source, started_at],
        )
        .context("insert ingest run")?;
        let run_id = tx.last_insert_rowid();

        {
            let mut stmt = tx
                .prepare(
                    r#"
                    INSERT INTO plays (
                        date, quarter, time, down, distance, field_position,
                        play_type, run_course, pass_course, detail, yards_gained, success,
                        team, run_id, inserted_at
                    ) VALUES (
                        ?1, ?2, ?3, ?4, ?5, ?6,
                        ?7, ?8, ?9, ?10, ?11, ?12,
                        ?13, ?14, ?15
                    )
                    "#,
                )
                .context("prepare play insert")?;
            for tagged in plays {
                let p = &tagged.play;
                stmt.execute(params![
                    p.date,
                    p.quarter,
                    p.time,
                    i64::from(p.down),
                    i64::from(p.distance),
                    p.field_position,
                    p.play_type,
                    p.run_course,
                    p.pass_course,
                    p.detail,
                    p.yards_gained,
                    i64::from(p.success),
                    tagged.team,
                    run_id,
                    started_at,
                ])
                .context("insert play")?;
            }
        }

        let finished_at = Utc::now().to_rfc3339();
        let log_json = serde_json::to_string(log).unwrap_or_else(|_| "[]".to_string());
        tx.execute(
            "UPDATE ingest_runs
             SET finished_at = ?1, rows_added = ?2, log_json = ?3
             WHERE run_id = ?4",
            params![finished_at, plays.len() as i64, log_json, run_id],
        )
        .context("update ingest run")?;
        tx.commit().context("commit append transaction")?;

        info!(source, rows = plays.len(), run_id, "appended plays");
        Ok(plays.len())
    }

    /// Remove every play and ingest run.
    pub fn reset(&mut self) -> Result<usize> {
        let tx = self.conn.transaction().context("begin reset transaction")?;
        let removed = tx
            .execute("DELETE FROM plays", [])
            .context("delete plays")?;
        tx.execute("DELETE FROM ingest_runs", [])
            .context("delete ingest runs")?;
        tx.commit().context("commit reset transaction")?;
        info!(removed, "dataset reset");
        Ok(removed)
    }

    pub fn statistics(&self) -> Result<DatasetStats> {
        let (total_plays, total_games, last_update) = self
            .conn
            .query_row(
                "SELECT COUNT(*), COUNT(DISTINCT date), MAX(inserted_at) FROM plays",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .context("query dataset statistics")?;
        Ok(DatasetStats {
            total_games: total_games.max(0) as usize,
            total_plays: total_plays.max(0) as usize,
            last_update,
        })
    }

    pub fn ingest_runs(&self) -> Result<Vec<IngestRun>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT run_id, source, started_at, finished_at, rows_added, log_json
                 FROM ingest_runs ORDER BY run_id ASC",
            )
            .context("prepare ingest runs query")?;
        let rows = stmt
            .query_map([], |row| {
                let log_json: String = row.get(5)?;
                Ok(IngestRun {
                    run_id: row.get(0)?,
                    source: row.get(1)?,
                    started_at: row.get(2)?,
                    finished_at: row.get(3)?,
                    rows_added: row.get::<_, i64>(4)?.max(0) as usize,
                    log: serde_json::from_str(&log_json).unwrap_or_default(),
                })
            })
            .context("query ingest runs")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode ingest run")?);
        }
        Ok(out)
    }

    pub fn last_run(&self) -> Result<Option<i64>> {
        self.conn
            .query_row("SELECT MAX(run_id) FROM ingest_runs", [], |row| {
                row.get::<_, Option<i64>>(0)
            })
            .optional()
            .map(Option::flatten)
            .context("query last ingest run")
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS plays (
            play_id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            quarter TEXT NOT NULL,
            time TEXT NOT NULL,
            down INTEGER NOT NULL,
            distance INTEGER NOT NULL,
            field_position TEXT NOT NULL,
            play_type TEXT NOT NULL CHECK (length(trim(play_type)) > 0),
            run_course TEXT NOT NULL,
            pass_course TEXT NOT NULL,
            detail TEXT NOT NULL,
            yards_gained REAL NOT NULL,
            success INTEGER NOT NULL,
            team TEXT NOT NULL,
            run_id INTEGER NOT NULL,
            inserted_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_plays_down ON plays(down);
        CREATE INDEX IF NOT EXISTS idx_plays_date ON plays(date);

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            source TEXT NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            rows_added INTEGER NOT NULL,
            log_json TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}
