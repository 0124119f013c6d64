//! # Gantry Common Library
//!
//! Shared building blocks for tick-driven gantry controllers: the device
//! surfaces the controller talks to (linear actuators, cutting tool,
//! proximity sensor, storage bays), the [`group::ActuatorGroup`]
//! abstraction that commands a named set of actuators as one logical
//! axis, the [`rig::Rig`] device bundle, and a simulated hardware
//! backend under [`sim`] for the binary and for tests.
//!
//! ## Write ownership
//!
//! Interrupt latches override the step sequencer by *claiming* a group
//! (or the tool). While a claim is held, sequencer-issued commands to
//! that device are suppressed; latch-issued writes always apply. The
//! claim set is an explicit [`group::LatchSet`] so the override
//! relationship is testable rather than an accident of call order.

pub mod device;
pub mod error;
pub mod group;
pub mod rig;
pub mod sim;
pub mod tick;

pub use error::DeviceError;
