//! Test utilities for resilience testing
//!
//! Helpers shared by scenario tests: building a scenario under a fault plan,
//! running it across counter wraps, and checking the consumers' sequences.

use crate::fault_injection::FaultPlan;
use crate::message_queue::TimerMessage;
use crate::scenario::{ScenarioConfig, ScenarioError, UnderflowScenario};
use core_types::ConsumerId;
use evtimer::EvtimerConfig;
use std::collections::BTreeMap;

/// Runs a test against the default scenario with a fault plan applied
///
/// # Example
///
/// ```
/// use sim_kernel::test_utils::with_fault_plan;
/// use sim_kernel::fault_injection::{FaultPlan, TimingFault};
///
/// with_fault_plan(
///     FaultPlan::new().with_timing_fault(TimingFault::ArmLatency { ticks: 2 }),
///     |scenario| {
///         assert_eq!(scenario.step().unwrap().len(), 8);
///     },
/// );
/// ```
pub fn with_fault_plan<F>(plan: FaultPlan, f: F)
where
    F: FnOnce(&mut UnderflowScenario),
{
    let config = ScenarioConfig {
        faults: plan,
        ..ScenarioConfig::default()
    };
    match UnderflowScenario::new(config, EvtimerConfig::default()) {
        Ok(mut scenario) => f(&mut scenario),
        Err(err) => panic!("scenario setup failed: {}", err),
    }
}

/// Steps the scenario until the counter has wrapped `wraps` more times
///
/// Gives up after `max_steps` steps and returns what was received so far.
pub fn run_until_wraps(
    scenario: &mut UnderflowScenario,
    wraps: u64,
    max_steps: usize,
) -> Result<Vec<TimerMessage>, ScenarioError> {
    let target = scenario.source().wraps() + wraps;
    let mut received = Vec::new();
    for _ in 0..max_steps {
        if scenario.source().wraps() >= target {
            break;
        }
        received.extend(scenario.step_messages()?);
    }
    Ok(received)
}

/// Checks that every consumer's messages are numbered 1, 2, 3, ... without gaps
///
/// Returns the number of messages seen per consumer.
pub fn verify_sequences(messages: &[TimerMessage]) -> Result<BTreeMap<ConsumerId, u64>, String> {
    let mut last: BTreeMap<ConsumerId, u64> = BTreeMap::new();
    for message in messages {
        let seen = last.entry(message.consumer).or_insert(0);
        if message.occurrence != *seen + 1 {
            return Err(format!(
                "{}: expected message {}, got {}",
                message.consumer,
                *seen + 1,
                message.occurrence
            ));
        }
        *seen = message.occurrence;
    }
    Ok(last)
}

/// The output of `groups` periods of `consumers` consumers
pub fn expected_transcript(groups: u64, consumers: usize) -> Vec<String> {
    (1..=groups)
        .flat_map(|n| std::iter::repeat(format!("received msg: \"{}\"", n)).take(consumers))
        .collect()
}
