//! Delivery of fired events to consumers
//!
//! The scheduler only requires that delivery is non-blocking and does not
//! re-enter the same scheduler through `&mut` access. Whatever messaging
//! layer the platform has (a mailbox, a channel, a print) sits behind this
//! trait.

use crate::event::Fired;

/// Receives due occurrences, in deadline order
pub trait Dispatch {
    /// Delivers one occurrence
    fn deliver(&mut self, fired: &Fired);
}

impl<F> Dispatch for F
where
    F: FnMut(&Fired),
{
    fn deliver(&mut self, fired: &Fired) {
        self(fired)
    }
}

/// Dispatcher that collects everything it receives
#[derive(Debug, Clone, Default)]
pub struct Collect {
    pub fired: Vec<Fired>,
}

impl Collect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes everything collected so far
    pub fn drain(&mut self) -> Vec<Fired> {
        std::mem::take(&mut self.fired)
    }
}

impl Dispatch for Collect {
    fn deliver(&mut self, fired: &Fired) {
        self.fired.push(*fired);
    }
}
