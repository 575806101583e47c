//! In-memory index of recent events
//!
//! Shared between the monitor (writer) and the stats/API readers. Reads take
//! the shared lock, appends take the exclusive lock. The index is unbounded
//! unless a retention window is configured with
//! [`RecentEventIndex::with_retention`].

use crate::models::Event;
use chrono::{DateTime, Local};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Thread-safe, insertion-ordered event cache
#[derive(Debug, Default)]
pub struct RecentEventIndex {
    events: RwLock<Vec<Event>>,
    retention: Option<chrono::Duration>,
}

impl RecentEventIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop events older than `max_age` (relative to the event being added) on every add.
    /// Assumes events arrive in roughly chronological order.
    pub fn with_retention(max_age: Duration) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            retention: chrono::Duration::from_std(max_age).ok(),
        }
    }

    /// Append an event
    pub fn add(&self, event: Event) {
        let mut events = self.write();
        if let Some(cutoff) = self
            .retention
            .and_then(|max_age| event.timestamp.checked_sub_signed(max_age))
        {
            let expired = events.iter().take_while(|e| e.timestamp < cutoff).count();
            if expired > 0 {
                events.drain(..expired);
            }
        }
        events.push(event);
    }

    /// Events strictly newer than `now - window`, in insertion order
    pub fn get_recent(&self, window: Duration) -> Vec<Event> {
        self.get_recent_at(Local::now(), window)
    }

    /// Same as [`get_recent`](Self::get_recent), relative to an explicit instant
    pub fn get_recent_at(&self, now: DateTime<Local>, window: Duration) -> Vec<Event> {
        let cutoff = window_start(now, window);
        self.read()
            .iter()
            .filter(|e| cutoff.map_or(true, |cutoff| e.timestamp > cutoff))
            .cloned()
            .collect()
    }

    /// Events with `start <= timestamp <= end`, in insertion order
    pub fn events_between(&self, start: DateTime<Local>, end: DateTime<Local>) -> Vec<Event> {
        self.read()
            .iter()
            .filter(|e| e.timestamp >= start && e.timestamp <= end)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panicking holder cannot leave the Vec half-written, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Vec<Event>> {
        self.events.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Event>> {
        self.events.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// `now - window`, or `None` when the window reaches past the representable range
pub(crate) fn window_start(now: DateTime<Local>, window: Duration) -> Option<DateTime<Local>> {
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|w| now.checked_sub_signed(w))
}
