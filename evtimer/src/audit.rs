//! Timer audit log
//!
//! Test-visible record of what the scheduler did to the queue and to the
//! compare channel. The log is bounded: once full, the oldest entries are
//! dropped. It never influences scheduling decisions.

use crate::event::EventHandle;
use crate::tick::Tick;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Scheduler event for the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerAuditEvent {
    /// Event accepted into the queue
    Registered {
        handle: EventHandle,
        deadline: Tick,
        period: Option<u64>,
    },
    /// Compare channel armed at the earliest deadline
    Armed { deadline: Tick },
    /// Compare channel disarmed because the queue is empty
    Disarmed,
    /// Earliest deadline already passed outside the callback; callback pended
    Pended { deadline: Tick },
    /// Armed deadline was already in the past once the compare was written
    ArmSlipped { deadline: Tick },
    /// Occurrence taken out of the queue for delivery
    Fired {
        handle: EventHandle,
        deadline: Tick,
        occurrence: u64,
    },
    /// Periodic event re-inserted with its next deadline
    Rescheduled { handle: EventHandle, deadline: Tick },
    /// Pending event removed by its owner
    Cancelled { handle: EventHandle },
}

/// Audit entry with the counter value it was recorded at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerAuditEntry {
    pub now: Tick,
    pub event: TimerAuditEvent,
}

/// Bounded audit log
#[derive(Debug, Clone)]
pub struct AuditLog {
    capacity: usize,
    entries: VecDeque<TimerAuditEntry>,
    dropped: u64,
}

impl AuditLog {
    /// Creates a log that keeps at most `capacity` entries (0 disables it)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::new(),
            dropped: 0,
        }
    }

    /// Records an event
    pub fn record(&mut self, now: Tick, event: TimerAuditEvent) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.dropped += 1;
        }
        self.entries.push_back(TimerAuditEntry { now, event });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries evicted because the log was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn entries(&self) -> impl Iterator<Item = &TimerAuditEntry> {
        self.entries.iter()
    }

    /// Events only, oldest first
    pub fn events(&self) -> Vec<TimerAuditEvent> {
        self.entries.iter().map(|entry| entry.event).collect()
    }

    /// Number of entries matching a predicate
    pub fn count(&self, predicate: impl Fn(&TimerAuditEvent) -> bool) -> usize {
        self.entries.iter().filter(|entry| predicate(&entry.event)).count()
    }
}
