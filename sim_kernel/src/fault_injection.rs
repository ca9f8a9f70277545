//! Deterministic timing fault injection
//!
//! Real timer code loses time in places a simulation normally makes free:
//! the gap between sampling the counter and writing the compare register,
//! the time a consumer spends handling its delivery, the read of the counter
//! itself. A [`FaultPlan`] makes those costs explicit so tests can push
//! deadlines into the past on purpose.
//!
//! ## Design Philosophy
//!
//! - **Deterministic**: fixed tick costs, no randomness
//! - **Composable**: faults of the same kind add up
//! - **Test-focused**: the scheduler never sees the plan, only its effect
//!
//! ## Example
//!
//! ```
//! use sim_kernel::fault_injection::{FaultPlan, TimingFault};
//!
//! let plan = FaultPlan::new()
//!     .with_timing_fault(TimingFault::ArmLatency { ticks: 3 })
//!     .with_timing_fault(TimingFault::DispatchCost { ticks: 1 });
//! assert_eq!(plan.arm_latency(), 3);
//! ```

use serde::{Deserialize, Serialize};

/// A source of lost time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimingFault {
    /// Ticks that pass between sampling `now` and the compare write
    ArmLatency { ticks: u32 },

    /// Ticks each delivery to a consumer takes
    DispatchCost { ticks: u32 },

    /// Ticks each counter read takes
    ReadCost { ticks: u32 },
}

/// A plan describing all faults to inject
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultPlan {
    timing_faults: Vec<TimingFault>,
}

impl FaultPlan {
    /// Creates an empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a timing fault to the plan
    pub fn with_timing_fault(mut self, fault: TimingFault) -> Self {
        self.timing_faults.push(fault);
        self
    }

    pub fn timing_faults(&self) -> &[TimingFault] {
        &self.timing_faults
    }

    pub fn is_empty(&self) -> bool {
        self.timing_faults.is_empty()
    }

    /// Total arm latency in ticks
    pub fn arm_latency(&self) -> u32 {
        self.total(|fault| match fault {
            TimingFault::ArmLatency { ticks } => *ticks,
            _ => 0,
        })
    }

    /// Total per-delivery cost in ticks
    pub fn dispatch_cost(&self) -> u32 {
        self.total(|fault| match fault {
            TimingFault::DispatchCost { ticks } => *ticks,
            _ => 0,
        })
    }

    /// Total per-read cost in ticks
    pub fn read_cost(&self) -> u32 {
        self.total(|fault| match fault {
            TimingFault::ReadCost { ticks } => *ticks,
            _ => 0,
        })
    }

    fn total(&self, ticks_of: impl Fn(&TimingFault) -> u32) -> u32 {
        self.timing_faults
            .iter()
            .map(ticks_of)
            .fold(0u32, u32::saturating_add)
    }
}
