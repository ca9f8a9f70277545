//! # Event Timer
//!
//! Multiplexes any number of one-shot and periodic timer events onto a single
//! wrapping hardware counter with one compare channel.
//!
//! ## Philosophy
//!
//! **A deadline that has passed is never waited for.**
//!
//! The counter wraps, dispatch takes time, and writing the compare register
//! takes time. Any of those can push the earliest deadline behind the counter
//! before the compare is armed, and a compare that is behind the counter only
//! matches after a full wrap. The scheduler re-reads the counter after every
//! arm and keeps dispatching until the armed deadline is genuinely ahead.
//!
//! ## Design Principles
//!
//! 1. **Modular time everywhere**: ticks are only compared through
//!    [`TickWidth::distance`], never with `<` on raw values
//! 2. **Single owner**: the queue and the compare channel are mutated by one
//!    [`Evtimer`]; concurrent access goes through [`SharedEvtimer`]
//! 3. **Delivery is pluggable**: due events are handed to a [`Dispatch`]
//!    implementation, the scheduler knows nothing about mailboxes
//! 4. **Observable**: counters in [`EvtimerStats`], a bounded
//!    [`AuditLog`], `tracing` spans for everything else
//!
//! ## Example
//!
//! ```ignore
//! let mut timer = Evtimer::new(source, EvtimerConfig::default())?;
//! let handle = timer.register(100, Some(100), consumer, Payload(7))?;
//! // from the compare-match interrupt:
//! timer.on_compare_match(&mut mailbox);
//! ```

pub mod audit;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod queue;
pub mod scheduler;
pub mod shared;
pub mod tick;

pub use audit::{AuditLog, TimerAuditEntry, TimerAuditEvent};
pub use config::EvtimerConfig;
pub use dispatch::{Collect, Dispatch};
pub use error::EvtimerError;
pub use event::{Event, EventHandle, EventState, Fired, Payload};
pub use queue::EventQueue;
pub use scheduler::{Evtimer, EvtimerStats};
pub use shared::SharedEvtimer;
pub use tick::{Tick, TickWidth};
