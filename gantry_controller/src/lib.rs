//! # Gantry Sweep Controller
//!
//! A tick-driven automation controller that rasters a cutting tool
//! through the full interior volume of a target structure using three
//! actuator groups, under a hard budget of one tiny time slice per
//! simulation tick.
//!
//! ## Architecture
//!
//! 1. **Scheduler / StepSequencer** — minimal cooperative scheduler
//!    advancing exactly one unit of resumable work per tick.
//! 2. **Sweep steps** — park, cell-advance, and scan-pass steps that
//!    decompose the raster traversal into per-tick units.
//! 3. **Interrupt latches** — edge-triggered storage-full pause and
//!    sensor-triggered full stop, each taking exclusive write control
//!    of the devices it overrides.
//! 4. **Controller** — the host-facing tick handler wiring commands,
//!    latch polling, and sequencer advancement in a fixed order.
//!
//! Execution is single-threaded and cooperative: every suspension
//! point is an explicit yield inside a step, and tick N's effects are
//! fully visible before tick N+1.

pub mod config;
pub mod controller;
pub mod error;
pub mod latch;
pub mod sequencer;
pub mod sweep;
