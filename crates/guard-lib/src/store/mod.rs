//! Event storage
//!
//! This module provides:
//! - The durable, date-partitioned event log
//! - The in-memory recent-event index
//! - Startup recovery that replays a log partition into the index

mod event_log;
mod recent;

pub use event_log::{decode_line, decode_partition, encode_line, DecodeReport, EventLogStore};
pub use recent::RecentEventIndex;

pub(crate) use recent::window_start;

use crate::error::LogStoreError;
use chrono::NaiveDate;
use tracing::debug;

/// Outcome of replaying a partition into the index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub recovered: usize,
    pub skipped: usize,
}

/// Replay every event logged on `date` into `index`
pub fn recover_into(
    store: &EventLogStore,
    index: &RecentEventIndex,
    date: NaiveDate,
) -> Result<RecoveryReport, LogStoreError> {
    let report = store.read_day(date)?;
    let recovered = report.events.len();

    for event in report.events {
        index.add(event);
    }

    debug!(
        date = %date,
        recovered = recovered,
        skipped = report.skipped,
        "Recovered events from log"
    );

    Ok(RecoveryReport {
        recovered,
        skipped: report.skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, EventKind};
    use chrono::{Local, TimeZone};
    use tempfile::TempDir;

    #[test]
    fn test_recover_into_replays_partition() {
        let temp_dir = TempDir::new().unwrap();
        let store = EventLogStore::new(temp_dir.path()).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();

        let first = Local.with_ymd_and_hms(2024, 6, 12, 7, 0, 0).unwrap();
        let second = Local.with_ymd_and_hms(2024, 6, 12, 7, 30, 0).unwrap();
        store.append(&Event::at(first, EventKind::Disable, "one")).unwrap();
        store.append(&Event::at(second, EventKind::Enable, "two")).unwrap();
        std::fs::OpenOptions::new()
            .append(true)
            .open(store.partition_path(date))
            .and_then(|mut f| std::io::Write::write_all(&mut f, b"garbage line\n"))
            .unwrap();

        let index = RecentEventIndex::new();
        let report = recover_into(&store, &index, date).unwrap();

        assert_eq!(report, RecoveryReport { recovered: 2, skipped: 1 });
        let events = index.events_between(first, second);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "one");
        assert_eq!(events[1].kind, EventKind::Enable);
    }

    #[test]
    fn test_recover_missing_partition() {
        let temp_dir = TempDir::new().unwrap();
        let store = EventLogStore::new(temp_dir.path()).unwrap();
        let index = RecentEventIndex::new();

        let report = recover_into(&store, &index, Local::now().date_naive()).unwrap();
        assert_eq!(report, RecoveryReport::default());
        assert!(index.is_empty());
    }
}
