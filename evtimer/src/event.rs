//! Timer events and the records handed to consumers

use crate::tick::Tick;
use core_types::ConsumerId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a registered event
///
/// The only thing a consumer keeps after registering. It can be used to
/// cancel the event; it grants no other access. Handles are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventHandle(u64);

impl EventHandle {
    pub(crate) const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the numeric id
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "evt#{}", self.0)
    }
}

/// Small fixed payload carried by an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Payload(pub u32);

impl Payload {
    /// Returns the carried value
    pub const fn value(self) -> u32 {
        self.0
    }
}

/// Lifecycle state of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventState {
    /// Waiting in the queue for its deadline
    Pending,
    /// Taken out of the queue for delivery
    Fired,
    /// Cancelled, or a one-shot event that has fired
    Destroyed,
}

/// A pending timer event, owned by the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub(crate) handle: EventHandle,
    pub(crate) deadline: Tick,
    pub(crate) period: Option<u64>,
    pub(crate) consumer: ConsumerId,
    pub(crate) payload: Payload,
    /// Insertion order, assigned by the queue
    pub(crate) seq: u64,
    pub(crate) occurrences: u64,
}

impl Event {
    pub(crate) fn new(
        handle: EventHandle,
        deadline: Tick,
        period: Option<u64>,
        consumer: ConsumerId,
        payload: Payload,
    ) -> Self {
        Self {
            handle,
            deadline,
            period,
            consumer,
            payload,
            seq: 0,
            occurrences: 0,
        }
    }

    pub fn handle(&self) -> EventHandle {
        self.handle
    }

    pub fn deadline(&self) -> Tick {
        self.deadline
    }

    pub fn period(&self) -> Option<u64> {
        self.period
    }

    pub fn consumer(&self) -> ConsumerId {
        self.consumer
    }

    pub fn payload(&self) -> Payload {
        self.payload
    }

    /// Insertion order within the queue; breaks deadline ties
    pub fn sequence(&self) -> u64 {
        self.seq
    }

    /// How many times this event has fired so far
    pub fn occurrences(&self) -> u64 {
        self.occurrences
    }

    pub fn is_periodic(&self) -> bool {
        self.period.is_some()
    }

    /// Builds the delivery record for the occurrence that is firing now
    pub(crate) fn fire(&mut self) -> Fired {
        self.occurrences += 1;
        Fired {
            handle: self.handle,
            consumer: self.consumer,
            payload: self.payload,
            deadline: self.deadline,
            occurrence: self.occurrences,
            periodic: self.period.is_some(),
        }
    }
}

/// One due occurrence of an event, as delivered to its consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fired {
    pub handle: EventHandle,
    pub consumer: ConsumerId,
    pub payload: Payload,
    /// Deadline this occurrence was scheduled for
    pub deadline: Tick,
    /// 1-based occurrence number; strictly increasing per event
    pub occurrence: u64,
    pub periodic: bool,
}
