//! # Event Timer Host Runtime
//!
//! Runs the underflow scenario on the host and prints what the consumers
//! receive, one line per message, the way a device under test would print
//! them on its console.
//!
//! ## Philosophy
//!
//! - **Stdout is the message stream**: nothing else is printed there
//! - **Diagnostics go to stderr**: through `tracing`, filtered by `RUST_LOG`
//! - **Deterministic**: the same configuration prints the same transcript
//!
//! ## Responsibilities
//!
//! The host runtime:
//! - Loads a JSON configuration and applies command-line overrides
//! - Builds the simulated counter, scheduler and consumers
//! - Runs forever, or for a fixed number of message groups

pub mod cli;
pub mod runtime;

pub use cli::{CliArgs, CliCommand};
pub use runtime::{HostRuntime, HostRuntimeConfig, HostRuntimeError};
