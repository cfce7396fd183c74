use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_dirs::AppDirs;
use crate::averages::SolveResult;
use crate::event::PuzzleEvent;
use crate::session::Session;

/// A persisted solve record. `time` is None for a DNF.
#[derive(Debug, Clone, PartialEq)]
pub struct Solve {
    pub id: String,
    pub time: Option<Duration>,
    pub scramble: String,
    pub event: PuzzleEvent,
    pub session_id: String,
    pub date: DateTime<Local>,
}

impl Solve {
    /// The statistics-relevant projection of this record.
    pub fn result(&self) -> SolveResult {
        match self.time {
            Some(t) => SolveResult::Time(t),
            None => SolveResult::Dnf,
        }
    }
}

/// Database manager for solves and sessions
#[derive(Debug)]
pub struct SolveDb {
    conn: Connection,
}

impl SolveDb {
    /// Open the database at the default state-dir path, creating tables
    /// as needed.
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("kubik_solves.db"));

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }

        Self::init(Connection::open(&db_path)?)
    }

    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS solves (
                id TEXT PRIMARY KEY,
                time_ms INTEGER,
                scramble TEXT NOT NULL,
                event TEXT NOT NULL,
                session_id TEXT NOT NULL,
                date TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_solves_session ON solves(session_id)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_solves_date ON solves(date)",
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL
            )
            "#,
            [],
        )?;

        Ok(SolveDb { conn })
    }

    pub fn insert_solve(&self, solve: &Solve) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO solves (id, time_ms, scramble, event, session_id, date)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                solve.id,
                solve.time.map(|t| t.as_millis() as i64),
                solve.scramble,
                solve.event.to_string(),
                solve.session_id,
                solve.date.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Patch a solve's outcome: Some re-times it, None marks it DNF.
    pub fn update_solve_time(&self, id: &str, time: Option<Duration>) -> Result<()> {
        self.conn.execute(
            "UPDATE solves SET time_ms = ?1 WHERE id = ?2",
            params![time.map(|t| t.as_millis() as i64), id],
        )?;
        Ok(())
    }

    pub fn delete_solve(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM solves WHERE id = ?1", [id])?;
        Ok(())
    }

    /// Delete several solves in one transaction.
    pub fn delete_solves(&mut self, ids: &[String]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for id in ids {
            tx.execute("DELETE FROM solves WHERE id = ?1", [id])?;
        }
        tx.commit()?;
        Ok(())
    }

    /// A session's solves, newest first. Equal dates keep insertion order
    /// with the later insert ranked newer, so statistics see a stable
    /// sequence.
    pub fn solves_for_session(&self, session_id: &str) -> Result<Vec<Solve>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, time_ms, scramble, event, session_id, date
            FROM solves
            WHERE session_id = ?1
            ORDER BY date DESC, rowid DESC
            "#,
        )?;

        let solve_iter = stmt.query_map([session_id], |row| {
            let date_str: String = row.get(5)?;
            let date = DateTime::parse_from_rfc3339(&date_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        5,
                        "date".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            let event_id: String = row.get(3)?;
            let event = PuzzleEvent::from_id(&event_id).ok_or_else(|| {
                rusqlite::Error::InvalidColumnType(
                    3,
                    "event".to_string(),
                    rusqlite::types::Type::Text,
                )
            })?;

            Ok(Solve {
                id: row.get(0)?,
                time: row
                    .get::<_, Option<i64>>(1)?
                    .map(|ms| Duration::from_millis(ms as u64)),
                scramble: row.get(2)?,
                event,
                session_id: row.get(4)?,
                date,
            })
        })?;

        let mut solves = Vec::new();
        for solve in solve_iter {
            solves.push(solve?);
        }
        Ok(solves)
    }

    /// The statistics projection of a session, newest first.
    pub fn results_for_session(&self, session_id: &str) -> Result<Vec<SolveResult>> {
        Ok(self
            .solves_for_session(session_id)?
            .iter()
            .map(Solve::result)
            .collect())
    }

    pub fn solve_count(&self, session_id: &str) -> Result<i64> {
        self.conn.query_row(
            "SELECT COUNT(*) FROM solves WHERE session_id = ?1",
            [session_id],
            |row| row.get(0),
        )
    }

    pub fn insert_session(&self, session: &Session) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (id, name) VALUES (?1, ?2)",
            params![session.id, session.name],
        )?;
        Ok(())
    }

    pub fn find_session(&self, id: &str) -> Result<Option<Session>> {
        self.conn
            .query_row(
                "SELECT id, name FROM sessions WHERE id = ?1",
                [id],
                |row| {
                    Ok(Session {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()
    }

    pub fn find_session_by_name(&self, name: &str) -> Result<Option<Session>> {
        self.conn
            .query_row(
                "SELECT id, name FROM sessions WHERE name = ?1 ORDER BY rowid LIMIT 1",
                [name],
                |row| {
                    Ok(Session {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()
    }

    /// All sessions with their solve counts, oldest session first.
    pub fn list_sessions(&self) -> Result<Vec<(Session, i64)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.id, s.name, COUNT(v.id)
            FROM sessions s
            LEFT JOIN solves v ON v.session_id = s.id
            GROUP BY s.id
            ORDER BY s.rowid
            "#,
        )?;

        let session_iter = stmt.query_map([], |row| {
            Ok((
                Session {
                    id: row.get(0)?,
                    name: row.get(1)?,
                },
                row.get(2)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for session in session_iter {
            sessions.push(session?);
        }
        Ok(sessions)
    }

    pub fn rename_session(&self, id: &str, name: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE sessions SET name = ?1 WHERE id = ?2",
            params![name, id],
        )?;
        Ok(())
    }

    /// Remove a session and every solve recorded under it.
    pub fn delete_session(&mut self, id: &str) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM solves WHERE session_id = ?1", [id])?;
        tx.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
        tx.commit()?;
        Ok(())
    }

    /// Write a session's solves, newest first, as csv rows. Returns the
    /// number of solves written.
    pub fn export_session_csv<W: std::io::Write>(
        &self,
        session_id: &str,
        out: W,
    ) -> std::result::Result<usize, Box<dyn std::error::Error>> {
        let solves = self.solves_for_session(session_id)?;
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(["index", "date", "time", "time_ms", "scramble", "event", "id"])?;

        let total = solves.len();
        for (i, solve) in solves.iter().enumerate() {
            writer.write_record([
                (total - i).to_string(),
                solve.date.to_rfc3339(),
                solve
                    .time
                    .map_or_else(|| "DNF".to_string(), crate::util::format_time),
                solve
                    .time
                    .map_or_else(String::new, |t| t.as_millis().to_string()),
                solve.scramble.clone(),
                solve.event.to_string(),
                solve.id.clone(),
            ])?;
        }
        writer.flush()?;
        Ok(total)
    }
}
