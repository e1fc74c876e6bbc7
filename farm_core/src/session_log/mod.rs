//! Session logger - append-only, capped history of completed farming sessions.
//!
//! Sessions are kept as a pretty-printed JSON array in `<log_dir>/farming_sessions.json`,
//! oldest first, capped at the most recent 100. The file outlives the process; nothing is
//! cached in memory, so every query re-reads it.
//!
//! Entries that do not parse as a [`SessionRecord`] are kept in the file untouched but
//! ignored by queries.

mod analytics;
mod record;

pub use analytics::*;
pub use record::*;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// File name of the session log inside the log directory.
pub const SESSION_LOG_FILE: &str = "farming_sessions.json";

/// File name of the CSV export inside the log directory.
pub const SESSION_EXPORT_FILE: &str = "farming_sessions_export.csv";

/// Sessions retained in the log.
pub const MAX_SESSIONS: usize = 100;

/// Failures writing the session log or its export.
#[derive(Debug, Error)]
pub enum SessionLogError {
    #[error("session log I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session log JSON failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("session export CSV failed: {0}")]
    Csv(#[from] csv::Error),
}

/// One CSV row, fields in export column order.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    session_id: &'a str,
    duration_minutes: f64,
    total_gold: u64,
    gold_per_hour: f64,
    kills: u32,
    deaths: u32,
    flee_events: u32,
    bandages_used: u32,
    vet_kits_used: u32,
    potions_used: u32,
    notes: &'a str,
}

impl<'a> From<&'a SessionRecord> for CsvRow<'a> {
    fn from(record: &'a SessionRecord) -> Self {
        Self {
            session_id: &record.session_id,
            duration_minutes: record.duration_minutes,
            total_gold: record.total_gold,
            gold_per_hour: record.gold_per_hour,
            kills: record.kills,
            deaths: record.deaths,
            flee_events: record.flee_events,
            bandages_used: record.supplies_used.bandages,
            vet_kits_used: record.supplies_used.vet_kits,
            potions_used: record.supplies_used.potions,
            notes: &record.notes,
        }
    }
}

/// File-backed session history.
#[derive(Debug, Clone)]
pub struct SessionLogger {
    log_dir: PathBuf,
    max_sessions: usize,
}

impl SessionLogger {
    /// Create a logger writing into `log_dir`. The directory is created on first save.
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            max_sessions: MAX_SESSIONS,
        }
    }

    /// Directory holding the log and its export.
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Path of the JSON log.
    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join(SESSION_LOG_FILE)
    }

    /// Path of the CSV export.
    pub fn export_path(&self) -> PathBuf {
        self.log_dir.join(SESSION_EXPORT_FILE)
    }

    /// Record a session that ends now.
    pub fn save_session(&self, stats: &SessionStats) -> Result<SessionRecord, SessionLogError> {
        self.save_session_at(stats, Utc::now())
    }

    /// Record a session that ended at `end_time`.
    pub fn save_session_at(
        &self,
        stats: &SessionStats,
        end_time: DateTime<Utc>,
    ) -> Result<SessionRecord, SessionLogError> {
        let record = SessionRecord::from_stats(stats, end_time);

        let mut entries = self.read_entries();
        entries.push(serde_json::to_value(&record)?);
        if entries.len() > self.max_sessions {
            let excess = entries.len() - self.max_sessions;
            entries.drain(..excess);
        }

        fs::create_dir_all(&self.log_dir)?;
        fs::write(self.log_path(), serde_json::to_string_pretty(&entries)?)?;
        info!(
            session_id = %record.session_id,
            gold = record.total_gold,
            gold_per_hour = record.gold_per_hour,
            stored = entries.len(),
            "session saved"
        );
        Ok(record)
    }

    /// Raw log entries, oldest first. A missing or unreadable file reads as empty.
    fn read_entries(&self) -> Vec<Value> {
        let path = self.log_path();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(path = %path.display(), %err, "cannot read session log");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(entries)) => entries,
            Ok(_) => {
                warn!(path = %path.display(), "session log is not a list, starting fresh");
                Vec::new()
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "corrupt session log, starting fresh");
                Vec::new()
            }
        }
    }

    /// Every parseable session, oldest first.
    pub fn all_sessions(&self) -> Vec<SessionRecord> {
        self.read_entries()
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(record) => Some(record),
                Err(err) => {
                    debug!(%err, "skipping unreadable session entry");
                    None
                }
            })
            .collect()
    }

    /// The last `count` sessions, oldest first.
    fn recent(&self, count: usize) -> Vec<SessionRecord> {
        let sessions = self.all_sessions();
        let skip = sessions.len().saturating_sub(count);
        sessions.into_iter().skip(skip).collect()
    }

    /// The last `count` sessions, newest first.
    pub fn load_sessions(&self, count: usize) -> Vec<SessionRecord> {
        let mut sessions = self.recent(count);
        sessions.reverse();
        sessions
    }

    /// `metric` for each of the last `count` sessions, oldest first.
    pub fn get_trend_data(&self, metric: &TrendMetric, count: usize) -> Vec<f64> {
        self.recent(count)
            .iter()
            .map(|session| metric.value(session))
            .collect()
    }

    /// Areas across the last `count` sessions, best gold per hour first.
    pub fn get_best_areas(&self, count: usize) -> Vec<AreaPerformance> {
        best_areas(&self.recent(count))
    }

    /// Areas across the last `count` sessions, most flees per hour first.
    pub fn get_most_dangerous_areas(&self, count: usize) -> Vec<AreaDanger> {
        most_dangerous_areas(&self.recent(count))
    }

    /// Totals across the last `count` sessions.
    pub fn get_summary(&self, count: usize) -> SessionSummary {
        summarize(&self.recent(count))
    }

    /// Write the last `count` sessions, newest first, to the CSV export.
    ///
    /// Returns `Ok(false)` without touching the disk when there is nothing to export.
    pub fn export_sessions_csv(&self, count: usize) -> Result<bool, SessionLogError> {
        let sessions = self.load_sessions(count);
        if sessions.is_empty() {
            return Ok(false);
        }

        fs::create_dir_all(&self.log_dir)?;
        let mut writer = csv::Writer::from_path(self.export_path())?;
        for session in &sessions {
            writer.serialize(CsvRow::from(session))?;
        }
        writer.flush()?;
        info!(rows = sessions.len(), path = %self.export_path().display(), "sessions exported");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn stats(minutes: f64, gold: u64) -> SessionStats {
        SessionStats {
            session_duration: minutes * 60.0,
            gold_collected: gold,
            kills: 5,
            notes: format!("{minutes} minute run"),
            ..Default::default()
        }
    }

    fn end_time(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap() + Duration::hours(i)
    }

    #[test]
    fn test_save_appends_to_file() {
        let dir = tempdir().unwrap();
        let logger = SessionLogger::new(dir.path().join("logs"));

        let record = logger.save_session_at(&stats(60.0, 5000), end_time(0)).unwrap();

        let text = fs::read_to_string(logger.log_path()).unwrap();
        assert!(text.starts_with("[\n  {"));
        let on_disk: Vec<SessionRecord> = serde_json::from_str(&text).unwrap();
        assert_eq!(on_disk.last(), Some(&record));
    }

    #[test]
    fn test_corrupt_log_starts_fresh() {
        let dir = tempdir().unwrap();
        let logger = SessionLogger::new(dir.path());
        fs::write(logger.log_path(), "{\"not\": \"a list\"}").unwrap();

        logger.save_session_at(&stats(10.0, 100), end_time(0)).unwrap();
        assert_eq!(logger.all_sessions().len(), 1);

        fs::write(logger.log_path(), "[{ broken").unwrap();
        assert!(logger.all_sessions().is_empty());
    }

    #[test]
    fn test_unknown_entries_are_kept_but_ignored() {
        let dir = tempdir().unwrap();
        let logger = SessionLogger::new(dir.path());
        fs::write(logger.log_path(), "[{\"legacy\": true}]").unwrap();

        logger.save_session_at(&stats(10.0, 100), end_time(0)).unwrap();
        assert_eq!(logger.all_sessions().len(), 1);
        let raw: Vec<Value> =
            serde_json::from_str(&fs::read_to_string(logger.log_path()).unwrap()).unwrap();
        assert_eq!(raw.len(), 2);
    }

    #[test]
    fn test_log_is_capped() {
        let dir = tempdir().unwrap();
        let logger = SessionLogger::new(dir.path());
        for i in 0..105 {
            logger
                .save_session_at(&stats(i as f64 + 1.0, 10), end_time(i))
                .unwrap();
        }

        let sessions = logger.all_sessions();
        assert_eq!(sessions.len(), MAX_SESSIONS);
        assert_eq!(sessions[0].duration_minutes, 6.0);
    }

    #[test]
    fn test_load_sessions_newest_first() {
        let dir = tempdir().unwrap();
        let logger = SessionLogger::new(dir.path());
        for i in 0..3 {
            logger
                .save_session_at(&stats(10.0 * (i + 1) as f64, 0), end_time(i))
                .unwrap();
        }

        let loaded = logger.load_sessions(2);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].duration_minutes, 30.0);
        assert_eq!(loaded[1].duration_minutes, 20.0);
        assert_eq!(logger.load_sessions(10).len(), 3);
        assert!(logger.load_sessions(0).is_empty());
    }

    #[test]
    fn test_trend_is_oldest_first() {
        let dir = tempdir().unwrap();
        let logger = SessionLogger::new(dir.path());
        logger.save_session_at(&stats(60.0, 1000), end_time(0)).unwrap();
        logger.save_session_at(&stats(60.0, 3000), end_time(1)).unwrap();

        assert_eq!(
            logger.get_trend_data(&TrendMetric::GoldPerHour, 5),
            vec![1000.0, 3000.0]
        );
    }

    #[test]
    fn test_export_without_sessions() {
        let dir = tempdir().unwrap();
        let logger = SessionLogger::new(dir.path().join("empty"));

        assert!(!logger.export_sessions_csv(10).unwrap());
        assert!(!logger.log_dir().exists());
    }

    #[test]
    fn test_export_csv_rows_newest_first() {
        let dir = tempdir().unwrap();
        let logger = SessionLogger::new(dir.path());
        logger.save_session_at(&stats(30.0, 600), end_time(0)).unwrap();
        let mut with_supplies = stats(60.0, 1200);
        with_supplies.supplies_used.bandages = 42;
        logger.save_session_at(&with_supplies, end_time(1)).unwrap();

        assert!(logger.export_sessions_csv(10).unwrap());

        let text = fs::read_to_string(logger.export_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "session_id,duration_minutes,total_gold,gold_per_hour,kills,deaths,flee_events,\
             bandages_used,vet_kits_used,potions_used,notes"
        );
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains(",1200,"));
        assert!(lines[1].contains(",42,0,0,"));
        assert!(lines[2].contains(",600,"));
    }
}
