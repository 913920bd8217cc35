//! Tagged, cancellable timers owned by the session.
//!
//! The registry is also the scheduler: timers fire in deadline order (FIFO on
//! ties) when the owner polls [`TimerRegistry::pop_due`] with the current
//! logical time. Cancelling removes entries outright, so a cancelled timer can
//! never be observed again.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use super::events::Timestamp;
use crate::logging::log_timer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerTag {
    AffirmationClear,
    SurveyFade,
    SurveyAdvance,
    RelaxationTick,
}

impl TimerTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerTag::AffirmationClear => "affirmation_clear",
            TimerTag::SurveyFade => "survey_fade",
            TimerTag::SurveyAdvance => "survey_advance",
            TimerTag::RelaxationTick => "relaxation_tick",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(pub u64);

/// A timer that came due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTimer {
    pub handle: TimerHandle,
    pub tag: TimerTag,
    pub due: Timestamp,
}

/// Heap entry; ordering is reversed so the earliest deadline pops first
#[derive(Debug)]
struct Scheduled {
    due: Timestamp,
    seq: u64,
    handle: TimerHandle,
    tag: TimerTag,
    period: Option<u64>,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        match other.due.cmp(&self.due) {
            Ordering::Equal => other.seq.cmp(&self.seq),
            ord => ord,
        }
    }
}

#[derive(Debug, Default)]
pub struct TimerRegistry {
    queue: BinaryHeap<Scheduled>,
    seq_counter: u64,
    next_handle: u64,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, handle: TimerHandle, tag: TimerTag, due: Timestamp, period: Option<u64>) {
        self.seq_counter += 1;
        self.queue.push(Scheduled {
            due,
            seq: self.seq_counter,
            handle,
            tag,
            period,
        });
    }

    fn allocate(&mut self) -> TimerHandle {
        self.next_handle += 1;
        TimerHandle(self.next_handle)
    }

    /// Track a one-shot timer firing at `due`.
    pub fn track(&mut self, tag: TimerTag, due: Timestamp) -> TimerHandle {
        let handle = self.allocate();
        self.push(handle, tag, due, None);
        log_timer("track", tag.as_str(), Some(due), self.queue.len());
        handle
    }

    /// Track a recurring timer; the first firing is one period after `now`.
    pub fn track_every(&mut self, tag: TimerTag, now: Timestamp, period_ms: u64) -> TimerHandle {
        let period = period_ms.max(1);
        let handle = self.allocate();
        self.push(handle, tag, now + period, Some(period));
        log_timer("track_every", tag.as_str(), Some(now + period), self.queue.len());
        handle
    }

    /// Cancel and forget every handle, or only those carrying `tag`.
    pub fn cancel_all(&mut self, tag: Option<TimerTag>) -> usize {
        let before = self.queue.len();
        match tag {
            None => self.queue.clear(),
            Some(t) => self.queue.retain(|s| s.tag != t),
        }
        let cancelled = before - self.queue.len();
        if cancelled > 0 {
            log_timer(
                "cancel",
                tag.map(|t| t.as_str()).unwrap_or("all"),
                None,
                cancelled,
            );
        }
        cancelled
    }

    /// Pop the earliest timer due at or before `now`.
    ///
    /// Recurring timers are re-armed under the same handle. Missed periods
    /// are coalesced into one firing rather than replayed.
    pub fn pop_due(&mut self, now: Timestamp) -> Option<FiredTimer> {
        if self.queue.peek()?.due > now {
            return None;
        }
        let entry = self.queue.pop()?;
        if let Some(period) = entry.period {
            let mut next = entry.due + period;
            if next <= now {
                next = now + period;
            }
            self.push(entry.handle, entry.tag, next, Some(period));
        }
        log_timer("fire", entry.tag.as_str(), Some(entry.due), self.queue.len());
        Some(FiredTimer {
            handle: entry.handle,
            tag: entry.tag,
            due: entry.due,
        })
    }

    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.queue.peek().map(|s| s.due)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn pending_with(&self, tag: TimerTag) -> usize {
        self.queue.iter().filter(|s| s.tag == tag).count()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
