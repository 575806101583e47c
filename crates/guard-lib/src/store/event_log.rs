//! Date-partitioned, append-only event log
//!
//! One file per local calendar day (`YYYY-MM-DD.log`), one line per event:
//!
//! ```text
//! [HH:MM:SS] <Kind>: <Message>
//! ```
//!
//! Decoding is lossy by policy: malformed lines are dropped and counted.

use crate::error::LogStoreError;
use crate::models::{Event, EventKind};
use chrono::{Local, NaiveDate, NaiveTime, TimeZone};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

const TIME_FORMAT: &str = "%H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Result of decoding one partition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeReport {
    /// Events in file order
    pub events: Vec<Event>,
    /// Non-blank lines that could not be decoded
    pub skipped: usize,
}

/// Append-only event log rooted at a directory
pub struct EventLogStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl EventLogStore {
    /// Open a log directory, creating it if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, LogStoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| LogStoreError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the partition holding events for `date`
    pub fn partition_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.log", date.format(DATE_FORMAT)))
    }

    /// Append one event to its day's partition
    pub fn append(&self, event: &Event) -> Result<(), LogStoreError> {
        let path = self.partition_path(event.timestamp.date_naive());
        let line = encode_line(event);

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LogStoreError::Append {
                path: path.clone(),
                source,
            })?;

        file.write_all(line.as_bytes())
            .map_err(|source| LogStoreError::Append { path, source })
    }

    /// Decode every event recorded for `date`.
    /// A missing partition decodes to an empty report.
    pub fn read_day(&self, date: NaiveDate) -> Result<DecodeReport, LogStoreError> {
        let path = self.partition_path(date);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(DecodeReport::default()),
            Err(source) => return Err(LogStoreError::Read { path, source }),
        };

        let report = decode_partition(&content, date);
        debug!(
            path = %path.display(),
            events = report.events.len(),
            skipped = report.skipped,
            "Decoded log partition"
        );
        Ok(report)
    }

    /// Decode the events for `date`, discarding the skip count
    pub fn read_events(&self, date: NaiveDate) -> Result<Vec<Event>, LogStoreError> {
        Ok(self.read_day(date)?.events)
    }
}

/// Encode an event as one log line, including the trailing newline.
/// Line breaks inside the message are flattened to spaces.
pub fn encode_line(event: &Event) -> String {
    let message: String = event
        .message
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();

    format!(
        "[{}] {}: {}\n",
        event.timestamp.format(TIME_FORMAT),
        event.kind,
        message
    )
}

/// Decode a whole partition for `date`
pub fn decode_partition(content: &str, date: NaiveDate) -> DecodeReport {
    let mut report = DecodeReport::default();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match decode_line(line, date) {
            Some(event) => report.events.push(event),
            None => report.skipped += 1,
        }
    }

    report
}

/// Decode a single line, or `None` if it is malformed.
///
/// A kind outside [`EventKind`] makes the line malformed. A time that occurs
/// twice on `date` (the repeated hour of a DST fall-back) resolves to its
/// first occurrence; a time skipped by a spring-forward gap is malformed.
pub fn decode_line(line: &str, date: NaiveDate) -> Option<Event> {
    let (time_field, rest) = line.split_once("] ")?;
    let time_str = time_field.strip_prefix('[').unwrap_or(time_field);
    let time = NaiveTime::parse_from_str(time_str, TIME_FORMAT).ok()?;

    let timestamp = Local.from_local_datetime(&date.and_time(time)).earliest()?;

    let (kind_str, message) = rest.split_once(": ")?;
    let kind = kind_str.parse::<EventKind>().ok()?;

    Some(Event::at(timestamp, kind, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Timelike};
    use tempfile::TempDir;

    fn ts(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 12, h, m, s).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 12).unwrap()
    }

    #[test]
    fn test_encode_line_format() {
        let event = Event::at(ts(9, 5, 7), EventKind::Disable, "awdl0 detected UP. Disabling...");
        assert_eq!(
            encode_line(&event),
            "[09:05:07] Disable: awdl0 detected UP. Disabling...\n"
        );
    }

    #[test]
    fn test_round_trip_with_separators_in_message() {
        let temp_dir = TempDir::new().unwrap();
        let store = EventLogStore::new(temp_dir.path()).unwrap();

        let original = Event::at(
            ts(23, 59, 58).with_nanosecond(750_000_000).unwrap(),
            EventKind::Enable,
            "note: [x] done] twice: ok",
        );
        store.append(&original).unwrap();

        let events = store.read_events(day()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, original.kind);
        assert_eq!(events[0].message, original.message);
        assert_eq!(events[0].timestamp, ts(23, 59, 58));
    }

    #[test]
    fn test_appends_preserve_order_and_partition_by_day() {
        let temp_dir = TempDir::new().unwrap();
        let store = EventLogStore::new(temp_dir.path()).unwrap();

        store.append(&Event::at(ts(1, 0, 0), EventKind::Disable, "first")).unwrap();
        store.append(&Event::at(ts(2, 0, 0), EventKind::Enable, "second")).unwrap();
        let next_day = Local.with_ymd_and_hms(2024, 6, 13, 0, 0, 1).unwrap();
        store.append(&Event::at(next_day, EventKind::Disable, "tomorrow")).unwrap();

        assert!(temp_dir.path().join("2024-06-12.log").exists());
        assert!(temp_dir.path().join("2024-06-13.log").exists());

        let events = store.read_events(day()).unwrap();
        let messages: Vec<_> = events.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn test_missing_partition_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = EventLogStore::new(temp_dir.path().join("nested/logs")).unwrap();

        let report = store.read_day(day()).unwrap();
        assert!(report.events.is_empty());
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn test_repeated_local_time_resolves_to_first_occurrence() {
        use chrono::LocalResult;

        // Fall-back days in the US and EU; in other zones every time is unique
        for date in [
            NaiveDate::from_ymd_opt(2024, 11, 3).unwrap(),
            NaiveDate::from_ymd_opt(2024, 10, 27).unwrap(),
        ] {
            for hour in 0..24 {
                let time = NaiveTime::from_hms_opt(hour, 30, 0).unwrap();
                let line = format!("[{}] Disable: fold", time.format(TIME_FORMAT));
                let decoded = decode_line(&line, date);

                match Local.from_local_datetime(&date.and_time(time)) {
                    LocalResult::Single(t) => assert_eq!(decoded.unwrap().timestamp, t),
                    LocalResult::Ambiguous(first, _) => {
                        assert_eq!(decoded.unwrap().timestamp, first)
                    }
                    LocalResult::None => assert!(decoded.is_none()),
                }
            }
        }
    }

    #[test]
    fn test_decoder_skips_line_without_bracket_separator() {
        let content = "[10:00:00] Disable: awdl0 detected UP. Disabling...\n10:01:00 Disable: no bracket\n";
        let report = decode_partition(content, day());
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_decoder_skip_policy() {
        let content = "\n\
            [10:00:00] Disable: ok\n\
            \x20\x20\t\n\
            [25:00:00] Disable: bad hour\n\
            [10:00:01] Disable without colon separator\n\
            [10:00:02] Reboot: unknown kind\n\
            [not a time] Enable: nope\n\
            [10:00:03] Check: also ok\n";
        let report = decode_partition(content, day());

        assert_eq!(report.events.len(), 2);
        assert_eq!(report.events[0].kind, EventKind::Disable);
        assert_eq!(report.events[1].kind, EventKind::Check);
        assert_eq!(report.events[1].timestamp, ts(10, 0, 3));
        assert_eq!(report.skipped, 4);
    }

    #[test]
    fn test_truncated_partition_yields_parsed_prefix() {
        let content = "[10:00:00] Disable: one\n[10:00:05] Disable: two\n[10:0";
        let report = decode_partition(content, day());
        assert_eq!(report.events.len(), 2);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_message_newlines_are_flattened() {
        let event = Event::at(ts(12, 0, 0), EventKind::Check, "line one\nline two");
        assert_eq!(encode_line(&event), "[12:00:00] Check: line one line two\n");
    }
}
