//! Host tick invocation types.
//!
//! The host invokes the controller at most once per simulation tick
//! with an opaque argument string and a reason bitmask. The controller
//! answers with whether it wants a self-requested continuation tick.

use bitflags::bitflags;

bitflags! {
    /// Why the host invoked the controller this tick.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TickReasons: u8 {
        /// Periodic timer tick.
        const PERIODIC = 0b0001;
        /// Explicit free-text user command.
        const COMMAND = 0b0010;
        /// Inter-controller signal (e.g. sensor edge wiring).
        const SIGNAL = 0b0100;
        /// Self-requested continuation from a previous tick.
        const CONTINUATION = 0b1000;
    }
}

/// Controller's answer to one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// True iff the host should schedule a continuation tick.
    pub resume: bool,
}

impl TickOutcome {
    /// Outcome requesting no continuation.
    pub const IDLE: Self = Self { resume: false };
}
