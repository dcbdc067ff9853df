//! Attendance ledger - a two-column `Name,Time` file.
//!
//! The whole file is loaded and rewritten on every mutation. A missing
//! file or malformed header means "start fresh", not an error. Callers
//! are expected to serialize writers; the load-then-rewrite cycle itself
//! is not atomic.

use chrono::{DateTime, Local, NaiveDateTime};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Timestamp format of the `Time` column.
pub const TIME_FORMAT: &str = "%Y-%m-%d %I:%M:%S %p";

const HEADER: &str = "Name,Time";

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("ledger io: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a mark attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkOutcome {
    /// A record was appended; carries the stored timestamp string.
    Marked { time: String },
    /// The identity already has a record for this calendar day.
    AlreadyMarked,
}

/// One row of the ledger.
#[derive(Debug, Clone)]
pub struct AttendanceRecord {
    pub name: String,
    pub time: String,
}

/// The attendance record store.
pub struct AttendanceLedger {
    path: PathBuf,
}

impl AttendanceLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the backing file with its header if it does not exist yet.
    /// Returns true when a new file was created.
    pub fn init_if_absent(&self) -> Result<bool, LedgerError> {
        if self.path.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, format!("{HEADER}\n"))?;
        tracing::info!(path = %self.path.display(), "attendance ledger created");
        Ok(true)
    }

    /// Load all records.
    ///
    /// A missing file or a file whose first line is not the expected
    /// header yields an empty ledger; the schema is reinitialized on the
    /// next rewrite.
    pub fn records(&self) -> Result<Vec<AttendanceRecord>, LedgerError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut lines = contents.lines();
        if lines.next() != Some(HEADER) {
            tracing::warn!(
                path = %self.path.display(),
                "ledger header missing or malformed, starting fresh"
            );
            return Ok(Vec::new());
        }

        let records = lines
            .filter(|line| !line.is_empty())
            .filter_map(|line| {
                let (name, time) = line.split_once(',')?;
                Some(AttendanceRecord {
                    name: name.to_string(),
                    time: time.to_string(),
                })
            })
            .collect();

        Ok(records)
    }

    /// Append a record for `identity` unless one already exists for the
    /// calendar day of `now`.
    ///
    /// The day check parses each stored timestamp; rows whose `Time`
    /// fails to parse never match and are preserved verbatim on rewrite.
    pub fn mark_if_absent(
        &self,
        identity: &str,
        now: DateTime<Local>,
    ) -> Result<MarkOutcome, LedgerError> {
        let mut records = self.records()?;
        let today = now.date_naive();

        let already = records.iter().any(|r| {
            r.name == identity
                && NaiveDateTime::parse_from_str(&r.time, TIME_FORMAT)
                    .map(|t| t.date() == today)
                    .unwrap_or(false)
        });

        if already {
            tracing::info!(identity, "attendance already marked today");
            return Ok(MarkOutcome::AlreadyMarked);
        }

        let time = now.format(TIME_FORMAT).to_string();
        records.push(AttendanceRecord {
            name: identity.to_string(),
            time: time.clone(),
        });
        self.rewrite(&records)?;

        tracing::info!(identity, %time, "attendance marked");
        Ok(MarkOutcome::Marked { time })
    }

    fn rewrite(&self, records: &[AttendanceRecord]) -> Result<(), LedgerError> {
        let mut out = String::with_capacity(64 * (records.len() + 1));
        out.push_str(HEADER);
        out.push('\n');
        for r in records {
            out.push_str(&r.name);
            out.push(',');
            out.push_str(&r.time);
            out.push('\n');
        }
        std::fs::write(&self.path, out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ledger_in(dir: &tempfile::TempDir) -> AttendanceLedger {
        AttendanceLedger::new(dir.path().join("attendance.csv"))
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_init_creates_file_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        assert!(ledger.init_if_absent().unwrap());
        assert!(!ledger.init_if_absent().unwrap());
        let contents = std::fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(contents, "Name,Time\n");
    }

    #[test]
    fn test_first_mark_appends_record() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        let outcome = ledger.mark_if_absent("21CS001", at(2024, 1, 15, 9, 30)).unwrap();
        assert!(matches!(outcome, MarkOutcome::Marked { .. }));

        let records = ledger.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "21CS001");
        assert!(records[0].time.starts_with("2024-01-15 09:30:00"));
    }

    #[test]
    fn test_second_mark_same_day_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        ledger.mark_if_absent("21CS001", at(2024, 1, 15, 9, 30)).unwrap();
        let outcome = ledger.mark_if_absent("21CS001", at(2024, 1, 15, 16, 45)).unwrap();
        assert_eq!(outcome, MarkOutcome::AlreadyMarked);
        assert_eq!(ledger.records().unwrap().len(), 1);
    }

    #[test]
    fn test_next_day_marks_again() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        ledger.mark_if_absent("21CS001", at(2024, 1, 15, 9, 0)).unwrap();
        let outcome = ledger.mark_if_absent("21CS001", at(2024, 1, 16, 9, 0)).unwrap();
        assert!(matches!(outcome, MarkOutcome::Marked { .. }));
        assert_eq!(ledger.records().unwrap().len(), 2);
    }

    #[test]
    fn test_different_identities_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        ledger.mark_if_absent("21CS001", at(2024, 1, 15, 9, 0)).unwrap();
        let outcome = ledger.mark_if_absent("21CS002", at(2024, 1, 15, 9, 1)).unwrap();
        assert!(matches!(outcome, MarkOutcome::Marked { .. }));
        assert_eq!(ledger.records().unwrap().len(), 2);
    }

    #[test]
    fn test_day_match_is_exact_not_prefix() {
        // A January 10 record must not block January 1: a raw substring
        // check on "2024-01-1" would.
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        ledger.mark_if_absent("21CS001", at(2024, 1, 10, 9, 0)).unwrap();
        let outcome = ledger.mark_if_absent("21CS001", at(2024, 1, 1, 9, 0)).unwrap();
        assert!(matches!(outcome, MarkOutcome::Marked { .. }));
        assert_eq!(ledger.records().unwrap().len(), 2);
    }

    #[test]
    fn test_malformed_header_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        std::fs::write(ledger.path(), "garbage\n21CS001,2024-01-15 09:00:00 AM\n").unwrap();
        assert!(ledger.records().unwrap().is_empty());

        let outcome = ledger.mark_if_absent("21CS001", at(2024, 1, 15, 9, 30)).unwrap();
        assert!(matches!(outcome, MarkOutcome::Marked { .. }));
        // The rewrite reinitialized the schema.
        let contents = std::fs::read_to_string(ledger.path()).unwrap();
        assert!(contents.starts_with("Name,Time\n"));
        assert_eq!(ledger.records().unwrap().len(), 1);
    }

    #[test]
    fn test_unparseable_time_never_matches() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        std::fs::write(ledger.path(), "Name,Time\n21CS001,not-a-time\n").unwrap();
        let outcome = ledger.mark_if_absent("21CS001", at(2024, 1, 15, 9, 0)).unwrap();
        assert!(matches!(outcome, MarkOutcome::Marked { .. }));
        // The unparseable row is preserved alongside the new one.
        assert_eq!(ledger.records().unwrap().len(), 2);
    }

    #[test]
    fn test_timestamp_round_trips_through_format() {
        let now = at(2024, 3, 5, 14, 20);
        let formatted = now.format(TIME_FORMAT).to_string();
        assert_eq!(formatted, "2024-03-05 02:20:00 PM");
        let parsed = NaiveDateTime::parse_from_str(&formatted, TIME_FORMAT).unwrap();
        assert_eq!(parsed.date(), now.date_naive());
    }
}
