//! # Tick Arithmetic
//!
//! Modular arithmetic on a wrapping hardware counter.
//!
//! A counter of `b` bits counts `0, 1, ..., 2^b - 1, 0, 1, ...`. Two raw
//! values cannot be ordered by `<` once the counter may have wrapped between
//! them. Every comparison in this crate therefore goes through
//! [`TickWidth::distance`], the signed modular distance from one tick to
//! another, which is unambiguous as long as the two ticks are less than half
//! the counter range apart.
//!
//! ```text
//!            now
//!   ──────────┼──────────────────────────────┬──── wrap ──▶
//!   ◀ past: distance < 0 │ future: 0 ..= max_delay
//!   (down to -2^(b-1))   │
//! ```

use crate::error::EvtimerError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A raw counter value, already reduced to the counter width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tick(u32);

impl Tick {
    /// Wraps a raw value without masking
    ///
    /// Prefer [`TickWidth::tick`], which reduces the value to the width.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw counter value
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Width of a wrapping counter, and the arithmetic that goes with it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickWidth {
    bits: u32,
}

impl TickWidth {
    /// Narrowest supported counter
    pub const MIN_BITS: u32 = 2;
    /// Widest supported counter
    pub const MAX_BITS: u32 = 32;

    /// Creates a width of `bits` bits
    pub fn new(bits: u32) -> Result<Self, EvtimerError> {
        if !(Self::MIN_BITS..=Self::MAX_BITS).contains(&bits) {
            return Err(EvtimerError::InvalidCounterWidth(bits));
        }
        Ok(Self { bits })
    }

    /// Full 32-bit counter
    pub const fn full() -> Self {
        Self { bits: 32 }
    }

    /// Counter width in bits
    pub const fn bits(self) -> u32 {
        self.bits
    }

    /// Mask of valid counter bits
    pub const fn mask(self) -> u32 {
        if self.bits == 32 {
            u32::MAX
        } else {
            (1u32 << self.bits) - 1
        }
    }

    /// Number of distinct counter values (`2^bits`)
    pub const fn modulus(self) -> u64 {
        1u64 << self.bits
    }

    /// Largest forward distance that still compares as "future"
    pub const fn max_delay(self) -> u64 {
        (1u64 << (self.bits - 1)) - 1
    }

    /// Reduces a raw value to this width
    pub const fn tick(self, raw: u32) -> Tick {
        Tick(raw & self.mask())
    }

    /// `tick + delta`, modulo the counter range
    pub const fn add(self, tick: Tick, delta: u64) -> Tick {
        let sum = (tick.0 as u64).wrapping_add(delta) & (self.modulus() - 1);
        Tick(sum as u32)
    }

    /// Forward (unsigned) distance from `from` to `to`, in `0..modulus`
    pub const fn forward(self, from: Tick, to: Tick) -> u64 {
        (to.0.wrapping_sub(from.0) & self.mask()) as u64
    }

    /// Signed modular distance from `from` to `to`
    ///
    /// Positive when `to` lies ahead of `from`, negative when it lies behind.
    /// Exactly half the range away counts as behind.
    pub const fn distance(self, from: Tick, to: Tick) -> i64 {
        let forward = self.forward(from, to);
        if forward > self.max_delay() {
            forward as i64 - self.modulus() as i64
        } else {
            forward as i64
        }
    }

    /// Whether `deadline` has been reached at `now`
    pub const fn is_due(self, deadline: Tick, now: Tick) -> bool {
        self.distance(now, deadline) <= 0
    }

    /// Orders two deadlines as seen from `reference`
    pub fn cmp_from(self, reference: Tick, a: Tick, b: Tick) -> Ordering {
        self.distance(reference, a).cmp(&self.distance(reference, b))
    }
}

impl Default for TickWidth {
    fn default() -> Self {
        Self::full()
    }
}
