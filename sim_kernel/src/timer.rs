//! # Simulated Tick Source
//!
//! Deterministic wrapping counter with one compare channel.
//!
//! ## Philosophy
//!
//! **Determinism enables thorough testing.**
//!
//! The counter only advances when told to. It does, however, behave like a
//! real compare peripheral in the ways that matter for wraparound bugs:
//!
//! - the compare fires when the counter *reaches* the armed value while
//!   moving forward
//! - a compare armed at or behind the current count only fires after the
//!   counter wraps all the way around
//! - a compare reached while the callback is running is latched and fires
//!   once the callback returns
//! - `pend()` fires the callback at the next opportunity
//!
//! ## Use Cases
//!
//! - Unit tests that need predictable timing
//! - Narrow counters (8 or 16 bits) that wrap every few hundred ticks
//! - Fault injection: time lost while arming, reading or dispatching

use crate::fault_injection::FaultPlan;
use evtimer::{EvtimerError, Tick, TickWidth};
use hal::TickSource;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Callback run on every compare match
pub type CompareHandler = Box<dyn FnMut() + Send>;

#[derive(Debug)]
struct CounterState {
    width: TickWidth,
    ticks: Tick,
    wraps: u64,
    compare: Option<Tick>,
    /// Compare match waiting for the callback
    latched: bool,
    in_handler: bool,
    compare_matches: u64,
    arm_latency: u32,
    read_cost: u32,
    dispatch_cost: u32,
}

impl CounterState {
    /// Moves the counter forward, latching a match if the compare is reached
    fn step(&mut self, delta: u64) {
        if delta == 0 {
            return;
        }
        if let Some(compare) = self.compare {
            let until = match self.width.forward(self.ticks, compare) {
                0 => self.width.modulus(),
                ahead => ahead,
            };
            if delta >= until {
                self.latched = true;
            }
        }
        let total = (self.ticks.raw() as u64).saturating_add(delta);
        self.wraps += total / self.width.modulus();
        self.ticks = self.width.add(self.ticks, delta);
    }

    fn until_compare(&self) -> Option<u64> {
        let compare = self.compare?;
        Some(match self.width.forward(self.ticks, compare) {
            0 => self.width.modulus(),
            ahead => ahead,
        })
    }
}

/// Simulated tick source
///
/// Cloning yields another handle to the same counter, so the scheduler can
/// own one handle while a test or scenario drives time through another.
///
/// # Examples
///
/// ```
/// use sim_kernel::timer::SimTickSource;
/// use hal::TickSource;
///
/// let mut source = SimTickSource::new(8).unwrap();
/// source.advance(250);
/// source.advance(10);
/// assert_eq!(source.now(), 4);
/// assert_eq!(source.wraps(), 1);
/// ```
#[derive(Clone)]
pub struct SimTickSource {
    state: Arc<Mutex<CounterState>>,
    handler: Arc<Mutex<Option<CompareHandler>>>,
}

impl SimTickSource {
    /// Creates a counter of `bits` bits starting at 0
    pub fn new(bits: u32) -> Result<Self, EvtimerError> {
        Self::with_start(bits, 0)
    }

    /// Creates a counter of `bits` bits starting at `start`
    pub fn with_start(bits: u32, start: u32) -> Result<Self, EvtimerError> {
        let width = TickWidth::new(bits)?;
        let state = CounterState {
            width,
            ticks: width.tick(start),
            wraps: 0,
            compare: None,
            latched: false,
            in_handler: false,
            compare_matches: 0,
            arm_latency: 0,
            read_cost: 0,
            dispatch_cost: 0,
        };
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            handler: Arc::new(Mutex::new(None)),
        })
    }

    /// Applies the timing costs of a fault plan
    pub fn with_faults(self, plan: &FaultPlan) -> Self {
        {
            let mut state = self.state();
            state.arm_latency = plan.arm_latency();
            state.read_cost = plan.read_cost();
            state.dispatch_cost = plan.dispatch_cost();
        }
        self
    }

    /// Installs the compare-match callback, replacing any previous one
    pub fn set_compare_handler(&self, handler: impl FnMut() + Send + 'static) {
        *self.handler_slot() = Some(Box::new(handler));
    }

    pub fn clear_compare_handler(&self) {
        *self.handler_slot() = None;
    }

    /// Advances the counter, running the callback for any match on the way
    ///
    /// Called from inside the callback it behaves like [`consume`](Self::consume):
    /// the match is latched and handled after the callback returns.
    pub fn advance(&self, delta: u64) {
        self.state().step(delta);
        self.run_pending();
    }

    /// Advances the counter without running the callback
    ///
    /// Used to charge time spent inside the callback itself.
    pub fn consume(&self, ticks: u64) {
        self.state().step(ticks);
    }

    /// Advances exactly to the armed compare (or runs a pended callback)
    ///
    /// Returns `false` when nothing is armed or pending.
    pub fn advance_to_compare(&self) -> bool {
        let delta = {
            let state = self.state();
            if state.latched {
                Some(0)
            } else {
                state.until_compare()
            }
        };
        match delta {
            Some(delta) => {
                self.advance(delta);
                true
            }
            None => false,
        }
    }

    pub fn current(&self) -> Tick {
        self.state().ticks
    }

    pub fn compare(&self) -> Option<Tick> {
        self.state().compare
    }

    pub fn width(&self) -> TickWidth {
        self.state().width
    }

    /// Times the counter has wrapped past its maximum
    pub fn wraps(&self) -> u64 {
        self.state().wraps
    }

    /// Compare matches delivered to the callback so far
    pub fn compare_matches(&self) -> u64 {
        self.state().compare_matches
    }

    pub fn is_latched(&self) -> bool {
        self.state().latched
    }

    /// Ticks each delivery should charge via [`consume`](Self::consume)
    pub fn dispatch_cost(&self) -> u32 {
        self.state().dispatch_cost
    }

    fn run_pending(&self) {
        loop {
            {
                let mut state = self.state();
                if state.in_handler || !state.latched {
                    return;
                }
                state.latched = false;
                state.in_handler = true;
                state.compare_matches += 1;
            }

            let handler = self.handler_slot().take();
            if let Some(mut handler) = handler {
                handler();
                let mut slot = self.handler_slot();
                if slot.is_none() {
                    *slot = Some(handler);
                }
            }

            self.state().in_handler = false;
        }
    }

    fn state(&self) -> MutexGuard<'_, CounterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handler_slot(&self) -> MutexGuard<'_, Option<CompareHandler>> {
        self.handler.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SimTickSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("SimTickSource")
            .field("bits", &state.width.bits())
            .field("ticks", &state.ticks)
            .field("compare", &state.compare)
            .field("latched", &state.latched)
            .field("wraps", &state.wraps)
            .finish()
    }
}

impl TickSource for SimTickSource {
    fn counter_bits(&self) -> u32 {
        self.state().width.bits()
    }

    fn now(&mut self) -> u32 {
        let mut state = self.state();
        let ticks = state.ticks;
        let cost = state.read_cost as u64;
        state.step(cost);
        ticks.raw()
    }

    fn arm(&mut self, deadline: u32) {
        let mut state = self.state();
        let latency = state.arm_latency as u64;
        state.step(latency);
        state.compare = Some(state.width.tick(deadline));
    }

    fn disarm(&mut self) {
        self.state().compare = None;
    }

    fn pend(&mut self) {
        self.state().latched = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault_injection::TimingFault;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_handler(source: &SimTickSource) -> Arc<AtomicUsize> {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        source.set_compare_handler(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        runs
    }

    #[test]
    fn test_rejects_bad_width() {
        assert!(SimTickSource::new(1).is_err());
        assert!(SimTickSource::new(33).is_err());
    }

    #[test]
    fn test_advance_wraps() {
        let mut source = SimTickSource::with_start(8, 200).unwrap();
        source.advance(100);
        assert_eq!(source.now(), 44);
        assert_eq!(source.wraps(), 1);
        source.advance(512);
        assert_eq!(source.current(), Tick::from_raw(44));
        assert_eq!(source.wraps(), 3);
    }

    #[test]
    fn test_compare_fires_when_reached() {
        let mut source = SimTickSource::new(8).unwrap();
        let runs = counting_handler(&source);

        source.arm(10);
        source.advance(9);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        source.advance(1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(source.compare_matches(), 1);
    }

    #[test]
    fn test_compare_at_current_count_waits_full_wrap() {
        let mut source = SimTickSource::with_start(8, 50).unwrap();
        let runs = counting_handler(&source);

        source.arm(50);
        source.advance(255);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        source.advance(1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_compare_behind_count_waits_for_wrap() {
        let mut source = SimTickSource::with_start(8, 20).unwrap();
        let runs = counting_handler(&source);

        source.arm(10);
        source.advance(245);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        source.advance(1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_match_during_handler_is_latched() {
        let source = SimTickSource::new(8).unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        let inner = source.clone();
        let counter = Arc::clone(&runs);
        source.set_compare_handler(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                let mut handle = inner.clone();
                handle.arm(12);
                // handler runs long enough to reach the new compare
                inner.advance(5);
            }
        });

        let mut arm = source.clone();
        arm.arm(10);
        source.advance(10);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(source.current(), Tick::from_raw(15));
        assert!(!source.is_latched());
    }

    #[test]
    fn test_pend_fires_at_next_opportunity() {
        let mut source = SimTickSource::new(16).unwrap();
        let runs = counting_handler(&source);

        source.pend();
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(source.advance_to_compare());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(source.current(), Tick::from_raw(0));
    }

    #[test]
    fn test_advance_to_compare() {
        let mut source = SimTickSource::with_start(8, 250).unwrap();
        let runs = counting_handler(&source);
        assert!(!source.advance_to_compare());

        source.arm(4);
        assert!(source.advance_to_compare());
        assert_eq!(source.current(), Tick::from_raw(4));
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        source.disarm();
        assert!(!source.advance_to_compare());
    }

    #[test]
    fn test_timing_faults() {
        let plan = FaultPlan::new()
            .with_timing_fault(TimingFault::ArmLatency { ticks: 3 })
            .with_timing_fault(TimingFault::ReadCost { ticks: 1 })
            .with_timing_fault(TimingFault::DispatchCost { ticks: 2 });
        let mut source = SimTickSource::new(16).unwrap().with_faults(&plan);

        assert_eq!(source.now(), 0);
        assert_eq!(source.now(), 1);
        source.arm(100);
        assert_eq!(source.current(), Tick::from_raw(5));
        assert_eq!(source.compare(), Some(Tick::from_raw(100)));
        assert_eq!(source.dispatch_cost(), 2);
    }

    #[test]
    fn test_consume_does_not_run_handler() {
        let mut source = SimTickSource::new(8).unwrap();
        let runs = counting_handler(&source);

        source.arm(3);
        source.consume(5);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(source.is_latched());

        source.advance(0);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
