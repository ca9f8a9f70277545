//! Scheduler shared between tasks and the compare-match context
//!
//! Every queue mutation and every compare write happens under one lock.
//! Delivery does not: the callback collects a batch under the lock, releases
//! it, then hands the batch to the dispatcher. A dispatcher may therefore
//! register or cancel on the same scheduler without deadlocking.

use crate::config::EvtimerConfig;
use crate::dispatch::Dispatch;
use crate::error::EvtimerError;
use crate::event::{EventHandle, EventState, Payload};
use crate::scheduler::{Evtimer, EvtimerStats};
use crate::tick::Tick;
use core_types::ConsumerId;
use hal::TickSource;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable handle to a scheduler behind a lock
pub struct SharedEvtimer<S: TickSource> {
    inner: Arc<Mutex<Evtimer<S>>>,
}

impl<S: TickSource> Clone for SharedEvtimer<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: TickSource> SharedEvtimer<S> {
    pub fn new(source: S, config: EvtimerConfig) -> Result<Self, EvtimerError> {
        Ok(Self::from_timer(Evtimer::new(source, config)?))
    }

    pub fn from_timer(timer: Evtimer<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(timer)),
        }
    }

    /// Locks the scheduler
    ///
    /// A panic while the lock was held leaves the queue consistent (every
    /// mutation completes before anything can panic), so poisoning is
    /// ignored.
    pub fn lock(&self) -> MutexGuard<'_, Evtimer<S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs a closure with the scheduler locked
    pub fn with<R>(&self, f: impl FnOnce(&mut Evtimer<S>) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn register(
        &self,
        delay: u64,
        period: Option<u64>,
        consumer: ConsumerId,
        payload: Payload,
    ) -> Result<EventHandle, EvtimerError> {
        self.lock().register(delay, period, consumer, payload)
    }

    pub fn register_at(
        &self,
        deadline: Tick,
        period: Option<u64>,
        consumer: ConsumerId,
        payload: Payload,
    ) -> Result<EventHandle, EvtimerError> {
        self.lock().register_at(deadline, period, consumer, payload)
    }

    pub fn cancel(&self, handle: EventHandle) -> bool {
        self.lock().cancel(handle)
    }

    /// Compare-match callback, delivering outside the lock
    pub fn on_compare_match<D: Dispatch>(&self, dispatcher: &mut D) -> usize {
        self.lock().begin_compare_match();
        let mut delivered = 0;
        loop {
            let batch = {
                let mut timer = self.lock();
                let batch = timer.collect_due();
                if batch.is_empty() {
                    if timer.settle() {
                        continue;
                    }
                    break;
                }
                batch
            };
            for fired in &batch {
                dispatcher.deliver(fired);
            }
            delivered += batch.len();
        }
        delivered
    }

    pub fn now(&self) -> Tick {
        self.lock().now()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn armed(&self) -> Option<Tick> {
        self.lock().armed()
    }

    pub fn event_state(&self, handle: EventHandle) -> Option<EventState> {
        self.lock().event_state(handle)
    }

    pub fn stats(&self) -> EvtimerStats {
        self.lock().stats()
    }

    /// Human-readable dump of the queue
    pub fn dump(&self) -> String {
        self.lock().to_string()
    }
}
