//! DuckDB progress store implementation

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::{params, Connection};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{AssessmentRecord, JourneyProgress, Skill};
use crate::ports::ProgressStore;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// DuckDB-backed journey progress store
pub struct DuckDbProgressStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbProgressStore {
    /// Open (or create) the progress database
    ///
    /// Retries with exponential backoff on file locking errors, which show
    /// up when two `mentor` processes start at the same time.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut attempt = 0;

        loop {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[mentor] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        attempt += 1;
                        continue;
                    }
                    return Err(Error::database(err_msg));
                }
            }
        }
    }

    /// In-memory store, used by tests and throwaway contexts
    pub fn in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> std::result::Result<Connection, duckdb::Error> {
        // Extension autoloading stays off; nothing here needs extensions
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    /// Path of the database file, if file-backed
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run pending schema migrations
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        Ok(MigrationService::new(&conn).run_pending()?)
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Number of assessments submitted by a user
    pub fn count_assessments(&self, user_id: &str) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM sys_assessments WHERE user_id = ?",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl ProgressStore for DuckDbProgressStore {
    fn get_progress(&self, user_id: &str) -> Result<Option<JourneyProgress>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, is_premium, current_phase, completed_phases, updated_at
             FROM sys_journey_progress WHERE user_id = ?",
        )?;

        let mut rows = stmt.query([user_id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let completed_json: String = row.get(3)?;
        let updated_str: String = row.get(4)?;
        let current_phase: i32 = row.get(2)?;

        Ok(Some(JourneyProgress {
            user_id: row.get(0)?,
            is_premium: row.get(1)?,
            current_phase: u32::try_from(current_phase).unwrap_or(1).max(1),
            completed_phases: parse_phase_set(&completed_json),
            updated_at: parse_timestamp(&updated_str),
        }))
    }

    fn save_progress(&self, progress: &JourneyProgress) -> Result<()> {
        let conn = self.lock()?;
        let completed_json = serde_json::to_string(&progress.completed_phases)?;
        let current_phase = i32::try_from(progress.current_phase)
            .map_err(|_| Error::validation(format!("Phase {} out of range", progress.current_phase)))?;

        conn.execute(
            "INSERT INTO sys_journey_progress (user_id, is_premium, current_phase, completed_phases, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (user_id) DO UPDATE SET
                is_premium = EXCLUDED.is_premium,
                current_phase = EXCLUDED.current_phase,
                completed_phases = EXCLUDED.completed_phases,
                updated_at = EXCLUDED.updated_at",
            params![
                progress.user_id,
                progress.is_premium,
                current_phase,
                completed_json,
                format_timestamp(&progress.updated_at),
            ],
        )?;

        Ok(())
    }

    fn save_assessment(&self, record: &AssessmentRecord) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sys_assessments (assessment_id, user_id, skill, response, submitted_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                record.id.to_string(),
                record.user_id,
                record.skill.key(),
                record.response,
                format_timestamp(&record.submitted_at),
            ],
        )?;
        Ok(())
    }

    fn get_latest_assessment(&self, user_id: &str) -> Result<Option<AssessmentRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT assessment_id, user_id, skill, response, submitted_at
             FROM sys_assessments WHERE user_id = ?
             ORDER BY submitted_at DESC LIMIT 1",
        )?;

        let mut rows = stmt.query([user_id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let id_str: String = row.get(0)?;
        let skill_key: String = row.get(2)?;
        let submitted_str: String = row.get(4)?;

        Ok(Some(AssessmentRecord {
            id: Uuid::parse_str(&id_str).map_err(|e| Error::database(e.to_string()))?,
            user_id: row.get(1)?,
            skill: skill_key.parse::<Skill>()?,
            response: row.get(3)?,
            submitted_at: parse_timestamp(&submitted_str),
        }))
    }
}

// Helper functions

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Parse a stored JSON phase list, dropping anything that is not a
/// positive phase number
fn parse_phase_set(s: &str) -> BTreeSet<u32> {
    serde_json::from_str::<Vec<i64>>(s)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| u32::try_from(p).ok())
        .filter(|p| *p > 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> DuckDbProgressStore {
        let store = DuckDbProgressStore::in_memory().unwrap();
        store.ensure_schema().unwrap();
        store
    }

    #[test]
    fn test_missing_progress_is_none() {
        let store = store();
        assert!(store.get_progress("nobody").unwrap().is_none());
    }

    #[test]
    fn test_progress_upsert() {
        let store = store();
        let first = JourneyProgress::new("u1", false, 2, [1].into_iter().collect());
        store.save_progress(&first).unwrap();

        let second = JourneyProgress::new("u1", true, 3, [1, 2].into_iter().collect());
        store.save_progress(&second).unwrap();

        let loaded = store.get_progress("u1").unwrap().unwrap();
        assert!(loaded.is_premium);
        assert_eq!(loaded.current_phase, 3);
        assert_eq!(loaded.completed_phases, [1, 2].into_iter().collect());
    }

    #[test]
    fn test_latest_assessment_wins() {
        let store = store();
        let mut older = AssessmentRecord::new("u1", Skill::Teamwork, "first");
        older.submitted_at = Utc::now() - chrono::Duration::hours(1);
        let newer = AssessmentRecord::new("u1", Skill::Leadership, "second");
        store.save_assessment(&older).unwrap();
        store.save_assessment(&newer).unwrap();

        let latest = store.get_latest_assessment("u1").unwrap().unwrap();
        assert_eq!(latest.skill, Skill::Leadership);
        assert_eq!(latest.response, "second");
        assert_eq!(store.count_assessments("u1").unwrap(), 2);
        assert!(store.get_latest_assessment("u2").unwrap().is_none());
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mentor.duckdb");
        {
            let store = DuckDbProgressStore::new(&path).unwrap();
            store.ensure_schema().unwrap();
            store
                .save_progress(&JourneyProgress::new("u1", false, 2, [1].into_iter().collect()))
                .unwrap();
        }

        let reopened = DuckDbProgressStore::new(&path).unwrap();
        reopened.ensure_schema().unwrap();
        assert_eq!(reopened.db_path(), Some(path.as_path()));
        assert_eq!(reopened.get_progress("u1").unwrap().unwrap().current_phase, 2);
    }

    #[test]
    fn test_parse_phase_set_filters_garbage() {
        assert_eq!(parse_phase_set("[0, -1, 2, 2, 1]"), [1, 2].into_iter().collect());
        assert!(parse_phase_set("not json").is_empty());
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable_error("IO Error: database is locked"));
        assert!(!is_retryable_error("Catalog Error: table does not exist"));
    }
}
