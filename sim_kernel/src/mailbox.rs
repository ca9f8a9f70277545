//! Mailbox delivery for fired timer events
//!
//! Each consumer owns a bounded FIFO mailbox. The dispatcher pushes one
//! [`TimerMessage`] per occurrence and never blocks: a full mailbox drops the
//! message and counts it.

use crate::message_queue::{MessageQueue, QueueError, TimerMessage};
use crate::timer::SimTickSource;
use core_types::ConsumerId;
use evtimer::{Dispatch, Fired};
use tracing::warn;

/// Routes fired events into per-consumer mailboxes
#[derive(Debug)]
pub struct MailboxDispatcher {
    capacity: usize,
    /// Mailboxes in the order consumers were added
    mailboxes: Vec<(ConsumerId, MessageQueue)>,
    delivered: u64,
    dropped: u64,
    /// Clock charged for every delivery
    cost: Option<(SimTickSource, u32)>,
}

impl MailboxDispatcher {
    /// Creates a dispatcher whose mailboxes hold `capacity` messages each
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            mailboxes: Vec::new(),
            delivered: 0,
            dropped: 0,
            cost: None,
        }
    }

    /// Charges `ticks` on `source` for each delivery
    pub fn with_dispatch_cost(mut self, source: SimTickSource, ticks: u32) -> Self {
        self.cost = Some((source, ticks));
        self
    }

    /// Creates a mailbox for a consumer (no-op if it already has one)
    pub fn add_consumer(&mut self, consumer: ConsumerId) {
        if self.mailbox(consumer).is_none() {
            self.mailboxes
                .push((consumer, MessageQueue::with_capacity(self.capacity)));
        }
    }

    /// Takes the oldest message addressed to `consumer`
    pub fn receive(&mut self, consumer: ConsumerId) -> Option<TimerMessage> {
        self.mailbox_mut(consumer)?.pop()
    }

    /// Messages waiting for `consumer`
    pub fn pending(&self, consumer: ConsumerId) -> usize {
        self.mailbox(consumer).map_or(0, MessageQueue::len)
    }

    /// Empties every mailbox, one message per consumer per round
    ///
    /// Mirrors consumers that each wake, print one message, and wait again.
    pub fn drain_round_robin(&mut self) -> Vec<TimerMessage> {
        let mut drained = Vec::new();
        loop {
            let before = drained.len();
            for (_, mailbox) in &mut self.mailboxes {
                if let Some(message) = mailbox.pop() {
                    drained.push(message);
                }
            }
            if drained.len() == before {
                return drained;
            }
        }
    }

    pub fn consumers(&self) -> impl Iterator<Item = ConsumerId> + '_ {
        self.mailboxes.iter().map(|(consumer, _)| *consumer)
    }

    /// Messages accepted into a mailbox
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Messages lost to full or missing mailboxes
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn mailbox(&self, consumer: ConsumerId) -> Option<&MessageQueue> {
        self.mailboxes
            .iter()
            .find(|(owner, _)| *owner == consumer)
            .map(|(_, mailbox)| mailbox)
    }

    fn mailbox_mut(&mut self, consumer: ConsumerId) -> Option<&mut MessageQueue> {
        self.mailboxes
            .iter_mut()
            .find(|(owner, _)| *owner == consumer)
            .map(|(_, mailbox)| mailbox)
    }
}

impl Dispatch for MailboxDispatcher {
    fn deliver(&mut self, fired: &Fired) {
        if let Some((source, ticks)) = &self.cost {
            source.consume(*ticks as u64);
        }

        let message = TimerMessage::from(fired);
        let Some(mailbox) = self.mailbox_mut(fired.consumer) else {
            self.dropped += 1;
            warn!(consumer = %fired.consumer, handle = %fired.handle, "no mailbox for consumer, message dropped");
            return;
        };
        match mailbox.push(message) {
            Ok(()) => self.delivered += 1,
            Err(QueueError::Full) => {
                self.dropped += 1;
                warn!(
                    consumer = %fired.consumer,
                    occurrence = fired.occurrence,
                    "mailbox full, message dropped"
                );
            }
        }
    }
}
