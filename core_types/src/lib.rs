//! # Core Types
//!
//! Identifiers shared by the timer core, the simulated platform and the
//! host runner.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: a consumer is named by a typed id, never by
//!   a raw integer that could be confused with a tick or a payload.
//! - **No ambient authority**: holding a [`ConsumerId`] lets a platform route
//!   deliveries; it grants no access to the scheduler itself.
//!
//! ## Key Types
//!
//! - [`ConsumerId`]: Unique identifier for an event consumer

pub mod ids;

pub use ids::ConsumerId;
