//! Bounded message queue for consumer mailboxes.
//!
//! Provides deterministic FIFO ordering with explicit capacity limits.

use core_types::ConsumerId;
use evtimer::{Fired, Tick};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Queue error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    Full,
}

/// Message a consumer receives for one timer occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerMessage {
    pub consumer: ConsumerId,
    pub payload: u32,
    /// Per-event sequence number, starting at 1.
    pub occurrence: u64,
    pub deadline: Tick,
}

impl From<&Fired> for TimerMessage {
    fn from(fired: &Fired) -> Self {
        Self {
            consumer: fired.consumer,
            payload: fired.payload.value(),
            occurrence: fired.occurrence,
            deadline: fired.deadline,
        }
    }
}

impl fmt::Display for TimerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "received msg: \"{}\"", self.occurrence)
    }
}

/// Bounded FIFO queue for timer messages.
#[derive(Debug, Clone)]
pub struct MessageQueue {
    capacity: usize,
    messages: VecDeque<TimerMessage>,
}

impl MessageQueue {
    /// Creates a queue with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            messages: VecDeque::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns remaining capacity.
    pub fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.messages.len())
    }

    /// Pushes a message onto the queue.
    pub fn push(&mut self, message: TimerMessage) -> Result<(), QueueError> {
        if self.messages.len() >= self.capacity {
            return Err(QueueError::Full);
        }
        self.messages.push_back(message);
        Ok(())
    }

    /// Pops the next message.
    pub fn pop(&mut self) -> Option<TimerMessage> {
        self.messages.pop_front()
    }
}
