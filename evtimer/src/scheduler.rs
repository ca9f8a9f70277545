//! Scheduler core
//!
//! Owns the event queue, arms the tick source for the earliest deadline and
//! dispatches due events from the compare-match callback.
//!
//! ## The re-check loop
//!
//! Dispatch takes time, and so does writing the compare register. A deadline
//! that was in the future when it was computed can be in the past by the
//! time the compare is armed; the hardware then stays silent for a full
//! counter wrap. The compare-match path therefore never trusts an earlier
//! reading of the counter:
//!
//! 1. read `now`, pop everything due, re-insert periodic events
//! 2. deliver the popped occurrences
//! 3. repeat until nothing is due
//! 4. arm the earliest deadline, read `now` again, and go back to 1 if that
//!    deadline has already been reached
//!
//! Outside the callback (register, cancel) the scheduler never dispatches.
//! If the earliest deadline is already due there, it pends the callback.

use crate::audit::{AuditLog, TimerAuditEvent};
use crate::config::EvtimerConfig;
use crate::dispatch::Dispatch;
use crate::error::EvtimerError;
use crate::event::{Event, EventHandle, EventState, Fired, Payload};
use crate::queue::EventQueue;
use crate::tick::{Tick, TickWidth};
use core_types::ConsumerId;
use hal::TickSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

/// Scheduler counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvtimerStats {
    pub registered: u64,
    pub cancelled: u64,
    /// Occurrences taken out of the queue for delivery
    pub fired: u64,
    /// Periodic re-insertions
    pub rescheduled: u64,
    /// Compare-match callbacks handled
    pub compare_matches: u64,
    /// Rounds that found at least one due event
    pub dispatch_rounds: u64,
    /// Compare register writes
    pub arms: u64,
    /// Arms whose deadline had already passed once written
    pub slipped_arms: u64,
    /// Callbacks requested from task context
    pub pends: u64,
}

/// Event timer scheduler
pub struct Evtimer<S: TickSource> {
    source: S,
    width: TickWidth,
    config: EvtimerConfig,
    queue: EventQueue,
    /// Deadline currently written to the compare channel
    armed: Option<Tick>,
    /// Handles delivered during the latest compare-match callback
    in_flight: Vec<EventHandle>,
    next_handle: u64,
    stats: EvtimerStats,
    audit: AuditLog,
}

impl<S: TickSource> Evtimer<S> {
    /// Creates a scheduler on top of a tick source
    ///
    /// The compare channel is disarmed until the first event is registered.
    pub fn new(mut source: S, config: EvtimerConfig) -> Result<Self, EvtimerError> {
        config.validate()?;
        let width = TickWidth::new(source.counter_bits())?;
        if let Some(cap) = config.max_delay_ticks {
            if cap > width.max_delay() {
                return Err(EvtimerError::InvalidConfig(format!(
                    "max_delay_ticks {} exceeds {} for a {}-bit counter",
                    cap,
                    width.max_delay(),
                    width.bits()
                )));
            }
        }

        let now = width.tick(source.now());
        source.disarm();
        debug!(bits = width.bits(), now = now.raw(), "evtimer initialized");

        Ok(Self {
            source,
            width,
            queue: EventQueue::new(width, now),
            armed: None,
            in_flight: Vec::new(),
            next_handle: 0,
            stats: EvtimerStats::default(),
            audit: AuditLog::with_capacity(config.audit_capacity),
            config,
        })
    }

    /// Registers an event `delay` ticks from now
    ///
    /// With `period`, the event fires again every `period` ticks after its
    /// first deadline until cancelled.
    pub fn register(
        &mut self,
        delay: u64,
        period: Option<u64>,
        consumer: ConsumerId,
        payload: Payload,
    ) -> Result<EventHandle, EvtimerError> {
        self.check_delay(delay)?;
        self.check_period(period)?;
        let now = self.now();
        let deadline = self.width.add(now, delay);
        Ok(self.enqueue(now, deadline, period, consumer, payload))
    }

    /// Registers an event at an absolute deadline
    ///
    /// The deadline must lie between now and `max_delay()` ticks ahead.
    pub fn register_at(
        &mut self,
        deadline: Tick,
        period: Option<u64>,
        consumer: ConsumerId,
        payload: Payload,
    ) -> Result<EventHandle, EvtimerError> {
        self.check_period(period)?;
        let now = self.now();
        let deadline = self.width.tick(deadline.raw());
        let ahead = self.width.distance(now, deadline);
        if ahead < 0 || ahead as u64 > self.max_delay() {
            return Err(EvtimerError::InvalidDelay {
                requested: self.width.forward(now, deadline),
                max: self.max_delay(),
            });
        }
        Ok(self.enqueue(now, deadline, period, consumer, payload))
    }

    /// Cancels a pending event
    ///
    /// Returns `false` when the handle is not pending (already fired,
    /// already cancelled, unknown). That is not an error.
    pub fn cancel(&mut self, handle: EventHandle) -> bool {
        let was_earliest = self.queue.peek_earliest().map(Event::handle) == Some(handle);
        if self.queue.remove(handle).is_none() {
            trace!(%handle, "cancel: not pending");
            return false;
        }

        self.stats.cancelled += 1;
        self.in_flight.retain(|h| *h != handle);
        let now = self.now();
        self.audit.record(now, TimerAuditEvent::Cancelled { handle });
        debug!(%handle, "event cancelled");

        if was_earliest {
            self.rearm_from_task();
        }
        true
    }

    /// Compare-match callback
    ///
    /// Delivers every due occurrence in deadline order and returns how many
    /// were delivered. Returns only once the compare channel is armed for a
    /// deadline that is still in the future, or disarmed.
    pub fn on_compare_match<D: Dispatch>(&mut self, dispatcher: &mut D) -> usize {
        self.begin_compare_match();
        let mut delivered = 0;
        loop {
            let batch = self.collect_due();
            if batch.is_empty() {
                if self.settle() {
                    continue;
                }
                break;
            }
            for fired in &batch {
                dispatcher.deliver(fired);
            }
            delivered += batch.len();
        }
        delivered
    }

    /// Starts a compare-match callback
    pub(crate) fn begin_compare_match(&mut self) {
        self.stats.compare_matches += 1;
        self.in_flight.clear();
    }

    /// Pops everything due at a fresh `now`, re-inserting periodic events
    pub(crate) fn collect_due(&mut self) -> Vec<Fired> {
        let now = self.now();
        let due = self.queue.pop_due(now);
        if due.is_empty() {
            return Vec::new();
        }

        self.stats.dispatch_rounds += 1;
        let mut batch = Vec::with_capacity(due.len());
        for mut event in due {
            let fired = event.fire();
            self.stats.fired += 1;
            self.audit.record(
                now,
                TimerAuditEvent::Fired {
                    handle: fired.handle,
                    deadline: fired.deadline,
                    occurrence: fired.occurrence,
                },
            );
            trace!(
                handle = %fired.handle,
                deadline = fired.deadline.raw(),
                now = now.raw(),
                occurrence = fired.occurrence,
                "event fired"
            );

            if let Some(period) = event.period {
                event.deadline = self.width.add(event.deadline, period);
                self.stats.rescheduled += 1;
                self.audit.record(
                    now,
                    TimerAuditEvent::Rescheduled {
                        handle: event.handle,
                        deadline: event.deadline,
                    },
                );
                self.queue.insert(event);
            }

            self.in_flight.push(fired.handle);
            batch.push(fired);
        }
        batch
    }

    /// Arms for the earliest deadline after a dispatch round
    ///
    /// Returns `true` when that deadline has already been reached, in which
    /// case the caller must run another round instead of waiting.
    pub(crate) fn settle(&mut self) -> bool {
        let slipped = self.arm_earliest();
        if let (true, Some(deadline)) = (slipped, self.armed) {
            self.stats.slipped_arms += 1;
            let now = self.now();
            self.audit.record(now, TimerAuditEvent::ArmSlipped { deadline });
            debug!(
                deadline = deadline.raw(),
                now = now.raw(),
                "armed deadline already passed, dispatching again"
            );
        }
        slipped
    }

    fn enqueue(
        &mut self,
        now: Tick,
        deadline: Tick,
        period: Option<u64>,
        consumer: ConsumerId,
        payload: Payload,
    ) -> EventHandle {
        let handle = EventHandle::new(self.next_handle);
        self.next_handle += 1;

        self.queue.observe(now);
        self.queue
            .insert(Event::new(handle, deadline, period, consumer, payload));
        self.stats.registered += 1;
        self.audit.record(
            now,
            TimerAuditEvent::Registered {
                handle,
                deadline,
                period,
            },
        );
        debug!(
            %handle,
            deadline = deadline.raw(),
            now = now.raw(),
            period,
            "event registered"
        );

        if self.queue.peek_earliest().map(Event::handle) == Some(handle) {
            self.rearm_from_task();
        }
        handle
    }

    /// Re-arms outside the callback, pending it if the deadline already passed
    fn rearm_from_task(&mut self) {
        if !self.arm_earliest() {
            return;
        }
        if let Some(deadline) = self.armed {
            self.source.pend();
            self.stats.pends += 1;
            let now = self.now();
            self.audit.record(now, TimerAuditEvent::Pended { deadline });
            debug!(deadline = deadline.raw(), "earliest deadline already due, callback pended");
        }
    }

    /// Writes the earliest deadline to the compare channel, or disarms
    ///
    /// Returns whether the armed deadline is already due, judged by a
    /// counter value read after the write.
    fn arm_earliest(&mut self) -> bool {
        let Some(deadline) = self.queue.peek_earliest().map(Event::deadline) else {
            if self.armed.take().is_some() {
                self.source.disarm();
                let now = self.now();
                self.audit.record(now, TimerAuditEvent::Disarmed);
                debug!("queue empty, compare disarmed");
            }
            return false;
        };

        self.source.arm(deadline.raw());
        self.armed = Some(deadline);
        self.stats.arms += 1;

        let now = self.now();
        self.audit.record(now, TimerAuditEvent::Armed { deadline });
        trace!(deadline = deadline.raw(), now = now.raw(), "compare armed");
        self.width.is_due(deadline, now)
    }

    fn check_delay(&self, delay: u64) -> Result<(), EvtimerError> {
        if delay > self.max_delay() {
            return Err(EvtimerError::InvalidDelay {
                requested: delay,
                max: self.max_delay(),
            });
        }
        Ok(())
    }

    fn check_period(&self, period: Option<u64>) -> Result<(), EvtimerError> {
        match period {
            Some(0) => Err(EvtimerError::InvalidDelay {
                requested: 0,
                max: self.max_delay(),
            }),
            Some(period) => self.check_delay(period),
            None => Ok(()),
        }
    }

    /// Reads the tick source
    pub fn now(&mut self) -> Tick {
        self.width.tick(self.source.now())
    }

    /// Largest accepted delay or period
    pub fn max_delay(&self) -> u64 {
        let limit = self.width.max_delay();
        self.config
            .max_delay_ticks
            .map_or(limit, |cap| cap.min(limit))
    }

    pub fn width(&self) -> TickWidth {
        self.width
    }

    pub fn config(&self) -> &EvtimerConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Deadline the compare channel is armed for
    pub fn armed(&self) -> Option<Tick> {
        self.armed
    }

    pub fn next_deadline(&self) -> Option<Tick> {
        self.queue.peek_earliest().map(Event::deadline)
    }

    /// Signed ticks until the earliest deadline (negative when overdue)
    pub fn time_until_next(&mut self) -> Option<i64> {
        let deadline = self.next_deadline()?;
        let now = self.now();
        Some(self.width.distance(now, deadline))
    }

    /// Pending events in dispatch order
    pub fn pending(&self) -> impl Iterator<Item = &Event> {
        self.queue.iter()
    }

    /// Lifecycle state of an event, `None` for handles never issued
    pub fn event_state(&self, handle: EventHandle) -> Option<EventState> {
        if self.queue.contains(handle) {
            Some(EventState::Pending)
        } else if self.in_flight.contains(&handle) {
            Some(EventState::Fired)
        } else if handle.id() < self.next_handle {
            Some(EventState::Destroyed)
        } else {
            None
        }
    }

    pub fn stats(&self) -> EvtimerStats {
        self.stats
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<S: TickSource> fmt::Display for Evtimer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.armed {
            Some(deadline) => writeln!(f, "armed: {}", deadline)?,
            None => writeln!(f, "armed: -")?,
        }
        write!(f, "{}", self.queue)
    }
}
