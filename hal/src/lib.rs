//! # Hardware Abstraction Layer (HAL)
//!
//! This crate defines the hardware boundary the event timer is written
//! against.
//!
//! ## Philosophy
//!
//! **The timer peripheral is a collaborator, not a dependency.**
//!
//! The scheduler never touches registers. It reads a counter, writes a
//! compare value and asks for a callback. Anything that can do those three
//! things (a real peripheral, a simulation, a scripted fake) can drive it.
//!
//! ## Design Principles
//!
//! 1. **No architecture-specific assumptions**: counter width is reported,
//!    not assumed
//! 2. **Trait-based**: all timer operations go through [`TickSource`]
//! 3. **Testable**: the trait is small enough to fake in a few lines

pub mod timer;

pub use timer::TickSource;
