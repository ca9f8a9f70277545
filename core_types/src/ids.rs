//! Unique identifiers for system entities

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an event consumer
///
/// A consumer is whoever waits for timer events: a worker thread, a
/// mailbox, a test probe. The scheduler only stores the id and hands it
/// back with every fired event; routing is the platform's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConsumerId(Uuid);

impl ConsumerId {
    /// Creates a new random consumer ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a consumer ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Creates a stable consumer ID from a raw 128-bit value
    ///
    /// Deterministic scenarios use this so that runs are reproducible.
    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Returns the inner UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConsumerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Consumer({})", self.0)
    }
}
