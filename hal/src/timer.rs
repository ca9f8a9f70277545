//! # Tick Source
//!
//! Hardware abstraction for a wrapping tick counter with one compare
//! channel.
//!
//! ## Philosophy
//!
//! **The counter wraps. Callers must not pretend otherwise.**
//!
//! Real timer peripherals are 16 or 32 bits wide and roll over to zero
//! regularly. This trait exposes the raw counter value together with its
//! width so that the layer above can do modular arithmetic. It does NOT:
//! - Extend the counter to 64 bits
//! - Decide what "earlier" means across a wrap
//! - Dispatch events (that is the scheduler's job)
//!
//! ## Compare-match contract
//!
//! - `arm(t)` replaces any previously armed compare value.
//! - The platform invokes the registered compare-match callback when the
//!   counter *reaches* `t` while counting forward. A compare armed at a value
//!   the counter has already passed fires only after a full wrap.
//! - Callback invocations are serialized; the callback is never re-entered.
//! - `pend()` requests the callback as soon as possible, but never from
//!   inside `pend()` itself.

/// Wrapping hardware tick counter with a single compare channel
///
/// # Implementation Notes
///
/// - `now()` must return a value already reduced to `counter_bits()` bits
/// - The counter must not go backwards (other than by wrapping)
/// - None of the methods may block
///
/// # Examples
///
/// ```
/// use hal::TickSource;
///
/// struct Counter16 {
///     ticks: u32,
///     compare: Option<u32>,
/// }
///
/// impl TickSource for Counter16 {
///     fn counter_bits(&self) -> u32 {
///         16
///     }
///     fn now(&mut self) -> u32 {
///         self.ticks & 0xffff
///     }
///     fn arm(&mut self, deadline: u32) {
///         self.compare = Some(deadline);
///     }
///     fn disarm(&mut self) {
///         self.compare = None;
///     }
///     fn pend(&mut self) {}
/// }
///
/// let mut counter = Counter16 { ticks: 0x1_0005, compare: None };
/// assert_eq!(counter.now(), 5);
/// counter.arm(10);
/// assert_eq!(counter.compare, Some(10));
/// ```
pub trait TickSource {
    /// Width of the hardware counter in bits (2..=32)
    fn counter_bits(&self) -> u32 {
        32
    }

    /// Returns the current counter value
    ///
    /// The value is reduced modulo `2^counter_bits()`.
    fn now(&mut self) -> u32;

    /// Arms the compare channel at an absolute counter value
    fn arm(&mut self, deadline: u32);

    /// Disarms the compare channel
    ///
    /// No compare-match callback fires until the next `arm` or `pend`.
    fn disarm(&mut self);

    /// Requests a compare-match callback at the next opportunity
    ///
    /// Used when the scheduler notices, outside of the callback, that the
    /// earliest deadline has already passed.
    fn pend(&mut self);
}

impl<T: TickSource + ?Sized> TickSource for &mut T {
    fn counter_bits(&self) -> u32 {
        (**self).counter_bits()
    }

    fn now(&mut self) -> u32 {
        (**self).now()
    }

    fn arm(&mut self, deadline: u32) {
        (**self).arm(deadline)
    }

    fn disarm(&mut self) {
        (**self).disarm()
    }

    fn pend(&mut self) {
        (**self).pend()
    }
}
