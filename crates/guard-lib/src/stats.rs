//! Histogram aggregation over the recent-event index

use crate::models::{Bucket, Event};
use crate::store::{window_start, RecentEventIndex};
use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;

/// Read-side view of the recent-event index
#[derive(Clone)]
pub struct StatsService {
    index: Arc<RecentEventIndex>,
}

impl StatsService {
    pub fn new(index: Arc<RecentEventIndex>) -> Self {
        Self { index }
    }

    /// Histogram of the trailing `window`, ending now
    pub fn histogram(&self, window: Duration, bucket_count: usize) -> Vec<Bucket> {
        self.histogram_at(Local::now(), window, bucket_count)
    }

    /// Split `[now - window, now)` into `bucket_count` equal slots and count events per slot.
    ///
    /// Events whose slot falls outside the range (an event exactly at `now`
    /// when the window divides evenly) are dropped.
    pub fn histogram_at(
        &self,
        now: DateTime<Local>,
        window: Duration,
        bucket_count: usize,
    ) -> Vec<Bucket> {
        let mut buckets = vec![Bucket::default(); bucket_count];
        if bucket_count == 0 {
            return buckets;
        }

        let Some(start) = window_start(now, window) else {
            return buckets;
        };
        let slot_nanos = window.as_nanos() / bucket_count as u128;
        if slot_nanos == 0 {
            return buckets;
        }

        for event in self.index.events_between(start, now) {
            let Some(offset) = (event.timestamp - start).num_nanoseconds() else {
                continue;
            };
            if offset < 0 {
                continue;
            }
            let slot = offset as u128 / slot_nanos;
            if slot < bucket_count as u128 {
                buckets[slot as usize].count += 1;
            }
        }

        buckets
    }

    /// Events newer than `now - window`, in insertion order
    pub fn recent_events(&self, window: Duration) -> Vec<Event> {
        self.index.get_recent(window)
    }
}
