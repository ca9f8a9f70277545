//! Concurrent Access Tests
//!
//! Validates that registering and cancelling from other threads while
//! compares fire never corrupts the queue or the periodic consumers.

use core_types::ConsumerId;
use evtimer::{EventState, Payload};
use sim_kernel::test_utils::verify_sequences;
use sim_kernel::ScenarioConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tests_resilience::test_bootstrap;

/// Test: one-shots registered and cancelled from worker threads
///
/// Every one-shot is either cancelled in time or delivered exactly once.
/// Workers' consumers have no mailbox, so their deliveries show up as
/// drops.
#[test]
fn test_register_and_cancel_while_dispatching() {
    let mut scenario = test_bootstrap(ScenarioConfig::default());
    let cancelled = Arc::new(AtomicU64::new(0));

    let workers: Vec<_> = (0..4u128)
        .map(|worker| {
            let timer = scenario.timer().clone();
            let cancelled = Arc::clone(&cancelled);
            thread::spawn(move || {
                let consumer = ConsumerId::from_u128(0xf000 + worker);
                for i in 0..200u64 {
                    let handle = timer
                        .register(1 + i % 60, None, consumer, Payload(0))
                        .expect("register failed");
                    if timer.cancel(handle) {
                        cancelled.fetch_add(1, Ordering::SeqCst);
                    }
                    assert_ne!(timer.event_state(handle), Some(EventState::Pending));
                }
            })
        })
        .collect();

    let mut messages = Vec::new();
    while !workers.iter().all(|worker| worker.is_finished()) {
        messages.extend(scenario.step_messages().expect("step failed"));
    }
    for worker in workers {
        worker.join().expect("worker panicked");
    }
    for _ in 0..3 {
        messages.extend(scenario.step_messages().expect("step failed"));
    }

    verify_sequences(&messages).expect("sequence gap");
    assert_eq!(
        cancelled.load(Ordering::SeqCst) + scenario.dropped(),
        800
    );
    // only the periodic consumers remain
    assert_eq!(scenario.timer().len(), 8);
}

/// Test: a consumer cancelled mid-run stops, the others continue
#[test]
fn test_cancel_one_consumer_mid_run() {
    let mut scenario = test_bootstrap(ScenarioConfig {
        consumers: 3,
        ..ScenarioConfig::default()
    });

    let before = scenario.run_messages(6).expect("run failed");
    assert_eq!(before.len(), 6);

    assert!(scenario.cancel_consumer(1));
    assert!(!scenario.cancel_consumer(1));
    let handle = scenario.consumers()[1].handle;
    assert_eq!(
        scenario.timer().event_state(handle),
        Some(EventState::Destroyed)
    );

    let after = scenario.run_messages(10).expect("run failed");
    let silenced = scenario.consumers()[1].id;
    assert!(after.iter().all(|m| m.consumer != silenced));

    let mut all = before;
    all.extend(after);
    verify_sequences(&all).expect("sequence gap");
}

/// Test: cancelling everything disarms the compare channel
#[test]
fn test_cancel_all_disarms() {
    let mut scenario = test_bootstrap(ScenarioConfig::default());
    scenario.step().expect("step failed");

    for slot in 0..8 {
        assert!(scenario.cancel_consumer(slot));
    }
    assert!(scenario.timer().is_empty());
    assert_eq!(scenario.timer().armed(), None);
    assert_eq!(scenario.source().compare(), None);
    assert!(scenario.step().is_err());
}
