//! Resilience Test Utilities
//!
//! This crate provides shared utilities for resilience and integration tests.
//!
//! ## Test Philosophy
//!
//! - **Liveness under wraparound**: a periodic consumer is never skipped or
//!   stalled, however many times the counter wraps
//! - **Deterministic failures**: all lost time is reproducible via FaultPlan
//! - **No double delivery**: a cancelled or fired one-shot is never seen again
//! - **Consistency**: the compare channel always matches the earliest deadline

use core_types::ConsumerId;
use evtimer::{EvtimerConfig, Tick, TickWidth};
use sim_kernel::{ScenarioConfig, TimerMessage, UnderflowScenario};
use std::collections::BTreeMap;

/// Bootstrap helper for tests
///
/// Builds a scenario with the default scheduler configuration.
pub fn test_bootstrap(config: ScenarioConfig) -> UnderflowScenario {
    match UnderflowScenario::new(config, EvtimerConfig::default()) {
        Ok(scenario) => scenario,
        Err(err) => panic!("scenario setup failed: {}", err),
    }
}

/// Groups the deadlines each consumer was delivered, in delivery order
pub fn deadlines_by_consumer(messages: &[TimerMessage]) -> BTreeMap<ConsumerId, Vec<Tick>> {
    let mut deadlines: BTreeMap<ConsumerId, Vec<Tick>> = BTreeMap::new();
    for message in messages {
        deadlines
            .entry(message.consumer)
            .or_default()
            .push(message.deadline);
    }
    deadlines
}

/// Checks that consecutive deadlines are exactly `period` ticks apart
pub fn assert_periodic(width: TickWidth, deadlines: &[Tick], period: u64) {
    for pair in deadlines.windows(2) {
        assert_eq!(
            width.distance(pair[0], pair[1]),
            period as i64,
            "deadline {} followed by {}",
            pair[0],
            pair[1]
        );
    }
}
