//! Event timer error types

use thiserror::Error;

/// Errors returned synchronously by registration and construction
///
/// The compare-match path has no error channel: an empty queue or a wrapped
/// counter is normal control flow there.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvtimerError {
    /// Delay or period cannot be represented unambiguously on the counter
    #[error("Invalid delay: {requested} ticks (allowed: 0..={max}, periods 1..={max})")]
    InvalidDelay { requested: u64, max: u64 },

    /// The tick source reported a counter width we cannot do arithmetic on
    #[error("Invalid counter width: {0} bits (supported: 2..=32)")]
    InvalidCounterWidth(u32),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
