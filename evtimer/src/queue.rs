//! Deadline-ordered event queue
//!
//! Events are kept sorted by signed distance from a reference tick (the last
//! `now` the scheduler observed). Ties keep insertion order.
//!
//! Sorting by distance from a moving reference stays valid as long as every
//! pending deadline lies within half the counter range of the reference,
//! which registration enforces and prompt dispatch maintains.

use crate::event::{Event, EventHandle};
use crate::tick::{Tick, TickWidth};
use std::collections::VecDeque;
use std::fmt;

/// Ordered collection of pending events
#[derive(Debug, Clone)]
pub struct EventQueue {
    width: TickWidth,
    reference: Tick,
    events: VecDeque<Event>,
    next_seq: u64,
}

impl EventQueue {
    /// Creates an empty queue for a counter of the given width
    pub fn new(width: TickWidth, reference: Tick) -> Self {
        Self {
            width,
            reference,
            events: VecDeque::new(),
            next_seq: 0,
        }
    }

    /// Moves the reference tick forward to `now`
    pub fn observe(&mut self, now: Tick) {
        self.reference = now;
    }

    /// Current reference tick
    pub fn reference(&self) -> Tick {
        self.reference
    }

    /// Inserts an event, keeping deadline order
    ///
    /// An event whose deadline equals one already queued goes after it.
    pub fn insert(&mut self, mut event: Event) {
        event.seq = self.next_seq;
        self.next_seq += 1;

        let width = self.width;
        let reference = self.reference;
        let key = width.distance(reference, event.deadline);
        let index = self
            .events
            .partition_point(|queued| width.distance(reference, queued.deadline) <= key);
        self.events.insert(index, event);
    }

    /// Returns the event with the soonest deadline
    pub fn peek_earliest(&self) -> Option<&Event> {
        self.events.front()
    }

    /// Removes every event whose deadline has been reached at `now`
    ///
    /// Returned in deadline order, ties in insertion order.
    pub fn pop_due(&mut self, now: Tick) -> Vec<Event> {
        self.observe(now);
        let mut due = Vec::new();
        while let Some(front) = self.events.front() {
            if !self.width.is_due(front.deadline, now) {
                break;
            }
            if let Some(event) = self.events.pop_front() {
                due.push(event);
            }
        }
        due
    }

    /// Removes a pending event
    ///
    /// Returns `None` if the handle is not queued (already fired, already
    /// cancelled, or never issued).
    pub fn remove(&mut self, handle: EventHandle) -> Option<Event> {
        let index = self.events.iter().position(|e| e.handle == handle)?;
        self.events.remove(index)
    }

    pub fn contains(&self, handle: EventHandle) -> bool {
        self.events.iter().any(|e| e.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterates pending events in dispatch order
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }
}

impl fmt::Display for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "evtimer queue @ {} ({} pending)", self.reference, self.events.len())?;
        for event in &self.events {
            write!(
                f,
                "  {} deadline={} (in {})",
                event.handle,
                event.deadline,
                self.width.distance(self.reference, event.deadline)
            )?;
            if let Some(period) = event.period {
                write!(f, " period={}", period)?;
            }
            writeln!(f, " consumer={} payload={}", event.consumer, event.payload.value())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Payload;
    use core_types::ConsumerId;
    use proptest::prelude::*;

    fn event(id: u64, deadline: u32) -> Event {
        Event::new(
            EventHandle::new(id),
            Tick::from_raw(deadline),
            None,
            ConsumerId::from_u128(id as u128),
            Payload(id as u32),
        )
    }

    fn handles(events: &[Event]) -> Vec<u64> {
        events.iter().map(|e| e.handle.id()).collect()
    }

    fn width8() -> TickWidth {
        TickWidth::new(8).unwrap()
    }

    #[test]
    fn test_insert_orders_by_deadline() {
        let mut queue = EventQueue::new(width8(), Tick::from_raw(0));
        queue.insert(event(1, 30));
        queue.insert(event(2, 10));
        queue.insert(event(3, 20));

        let order: Vec<u64> = queue.iter().map(|e| e.handle.id()).collect();
        assert_eq!(order, vec![2, 3, 1]);
        assert_eq!(queue.peek_earliest().unwrap().handle.id(), 2);
    }

    #[test]
    fn test_insert_orders_across_wrap() {
        // reference near the top of an 8-bit counter
        let mut queue = EventQueue::new(width8(), Tick::from_raw(250));
        queue.insert(event(1, 5)); // 11 ahead, after the wrap
        queue.insert(event(2, 253)); // 3 ahead
        queue.insert(event(3, 0)); // 6 ahead

        let order: Vec<u64> = queue.iter().map(|e| e.handle.id()).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn test_ties_are_fifo() {
        let mut queue = EventQueue::new(width8(), Tick::from_raw(0));
        queue.insert(event(1, 40));
        queue.insert(event(2, 40));
        queue.insert(event(3, 20));
        queue.insert(event(4, 40));

        let due = queue.pop_due(Tick::from_raw(40));
        assert_eq!(handles(&due), vec![3, 1, 2, 4]);
    }

    #[test]
    fn test_peek_empty() {
        let queue = EventQueue::new(width8(), Tick::from_raw(0));
        assert!(queue.peek_earliest().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pop_due_only_takes_reached_deadlines() {
        let mut queue = EventQueue::new(width8(), Tick::from_raw(0));
        queue.insert(event(1, 10));
        queue.insert(event(2, 20));

        assert!(queue.pop_due(Tick::from_raw(9)).is_empty());
        assert_eq!(handles(&queue.pop_due(Tick::from_raw(15))), vec![1]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.reference(), Tick::from_raw(15));
    }

    #[test]
    fn test_pop_due_after_now_wrapped_past_deadline() {
        let mut queue = EventQueue::new(width8(), Tick::from_raw(240));
        queue.insert(event(1, 250));
        queue.insert(event(2, 2));
        queue.insert(event(3, 30));

        // now = 4: the counter wrapped past both 250 and 2
        let due = queue.pop_due(Tick::from_raw(4));
        assert_eq!(handles(&due), vec![1, 2]);
        assert_eq!(queue.peek_earliest().unwrap().handle.id(), 3);
    }

    #[test]
    fn test_remove_is_noop_when_absent() {
        let mut queue = EventQueue::new(width8(), Tick::from_raw(0));
        queue.insert(event(1, 10));

        assert!(queue.remove(EventHandle::new(9)).is_none());
        assert!(queue.contains(EventHandle::new(1)));
        assert_eq!(queue.remove(EventHandle::new(1)).unwrap().handle.id(), 1);
        assert!(queue.remove(EventHandle::new(1)).is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_display_lists_pending() {
        let mut queue = EventQueue::new(width8(), Tick::from_raw(0));
        queue.insert(event(1, 10));
        let dump = queue.to_string();
        assert!(dump.contains("1 pending"));
        assert!(dump.contains("evt#1 deadline=t10 (in 10)"));
    }

    proptest! {
        #[test]
        fn prop_pop_due_matches_sorted_model(
            start in any::<u8>(),
            delays in proptest::collection::vec(0u64..=127, 1..40),
            advance in 0u64..=127,
        ) {
            let width = width8();
            let reference = Tick::from_raw(start as u32);
            let mut queue = EventQueue::new(width, reference);
            for (id, delay) in delays.iter().enumerate() {
                let deadline = width.add(reference, *delay);
                queue.insert(event(id as u64, deadline.raw()));
            }

            // model: stable sort by delay keeps insertion order on ties
            let mut model: Vec<(u64, u64)> = delays
                .iter()
                .enumerate()
                .map(|(id, delay)| (*delay, id as u64))
                .collect();
            model.sort_by_key(|(delay, _)| *delay);
            let expected: Vec<u64> = model
                .iter()
                .filter(|(delay, _)| *delay <= advance)
                .map(|(_, id)| *id)
                .collect();

            let due = queue.pop_due(width.add(reference, advance));
            prop_assert_eq!(handles(&due), expected);
            for remaining in queue.iter() {
                prop_assert!(width.distance(reference, remaining.deadline) as u64 > advance);
            }
        }
    }
}
