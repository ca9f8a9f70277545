//! # Simulated Platform
//!
//! A deterministic stand-in for the hardware and messaging layer an event
//! timer runs on: a wrapping counter with one compare channel, per-consumer
//! mailboxes, and a scenario that drives periodic consumers across wraps.
//!
//! ## Purpose
//!
//! - Runs under `cargo test`
//! - Deterministic (time only moves when told to)
//! - Narrow counters wrap every few hundred ticks
//! - Inspectable (counter, compare, wraps, mailboxes)
//!
//! ## Philosophy
//!
//! **Testability is a first-class design constraint.**
//!
//! Wraparound bugs hide for hours on a 32-bit counter. On an 8-bit counter
//! they show up in the first second, so the scheduler is exercised here
//! against the same interface a real peripheral driver implements.

pub mod fault_injection;
pub mod mailbox;
pub mod message_queue;
pub mod scenario;
pub mod test_utils;
pub mod timer;

pub use fault_injection::{FaultPlan, TimingFault};
pub use mailbox::MailboxDispatcher;
pub use message_queue::{MessageQueue, QueueError, TimerMessage};
pub use scenario::{ConsumerSlot, ScenarioConfig, ScenarioError, UnderflowScenario};
pub use timer::SimTickSource;
