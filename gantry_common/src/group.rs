//! Actuator groups: a named set of linear actuators commanded as one
//! logical axis.
//!
//! All members of a group receive identical commands during any sweep
//! phase, so the group behaves as a single degree of freedom. Write
//! ownership is tracked per group: while any latch holds a claim,
//! sequencer-issued commands are suppressed (not errors), and latch
//! writes apply unconditionally.

use bitflags::bitflags;

use crate::device::LinearActuator;
use crate::error::DeviceError;

/// Position convergence tolerance. Bounds the tick-by-tick wait for an
/// actuator to reach a commanded limit, trading positional precision
/// for forward progress under the per-tick budget.
pub const POSITION_TOLERANCE: f64 = 1e-4;

/// The three logical sweep axes. Y is the scan axis (innermost), Z the
/// row axis, X the column axis (outermost).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Index into per-axis arrays.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Axis label for logging.
    pub const fn label(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }
}

bitflags! {
    /// Latches currently holding exclusive write control of a device.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LatchSet: u8 {
        /// Storage-full pause latch.
        const STORAGE = 0b01;
        /// Proximity-sensor halt latch.
        const SENSOR = 0b10;
    }
}

/// A named set of actuators driven as one logical axis.
pub struct ActuatorGroup {
    name: String,
    members: Vec<Box<dyn LinearActuator>>,
    latched_by: LatchSet,
}

impl ActuatorGroup {
    /// Build a group from its members.
    ///
    /// An empty member list is a fail-fast configuration error, never a
    /// partial-hardware proceed.
    pub fn new(
        name: impl Into<String>,
        members: Vec<Box<dyn LinearActuator>>,
    ) -> Result<Self, DeviceError> {
        let name = name.into();
        if members.is_empty() {
            return Err(DeviceError::EmptyGroup(name));
        }
        Ok(Self {
            name,
            members,
            latched_by: LatchSet::empty(),
        })
    }

    /// Group name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of member actuators.
    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the group has no members. Always false for a
    /// constructed group; present for completeness.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Latches currently holding this group.
    #[inline]
    pub fn latched_by(&self) -> LatchSet {
        self.latched_by
    }

    /// Take exclusive write control for a latch.
    pub fn claim(&mut self, latch: LatchSet) {
        self.latched_by |= latch;
    }

    /// Return write control to the sequencer for a latch.
    pub fn release(&mut self, latch: LatchSet) {
        self.latched_by.remove(latch);
    }

    // ── Sequencer-issued commands (suppressed while latched) ──

    /// Command a velocity from the sequencer. Returns `false` if the
    /// write was suppressed by an active latch.
    pub fn command_velocity(&mut self, velocity: f64) -> bool {
        if !self.latched_by.is_empty() {
            return false;
        }
        for m in &mut self.members {
            m.set_velocity(velocity);
        }
        true
    }

    /// Command a working maximum limit from the sequencer. Returns
    /// `false` if suppressed by an active latch.
    pub fn command_max_limit(&mut self, limit: f64) -> bool {
        if !self.latched_by.is_empty() {
            return false;
        }
        for m in &mut self.members {
            m.set_max_limit(limit);
        }
        true
    }

    /// Command a working minimum limit from the sequencer. Returns
    /// `false` if suppressed by an active latch.
    pub fn command_min_limit(&mut self, limit: f64) -> bool {
        if !self.latched_by.is_empty() {
            return false;
        }
        for m in &mut self.members {
            m.set_min_limit(limit);
        }
        true
    }

    // ── Latch-issued writes (always applied) ──

    /// Set velocity from a latch, bypassing ownership suppression.
    pub fn latch_velocity(&mut self, velocity: f64) {
        for m in &mut self.members {
            m.set_velocity(velocity);
        }
    }

    /// Enable or disable every member drive.
    pub fn set_enabled(&mut self, enabled: bool) {
        for m in &mut self.members {
            m.set_enabled(enabled);
        }
    }

    // ── Readback ──

    /// Commanded velocity (members are commanded identically, so the
    /// first member is representative).
    #[inline]
    pub fn velocity(&self) -> f64 {
        self.members[0].velocity()
    }

    /// Working maximum limit.
    #[inline]
    pub fn max_limit(&self) -> f64 {
        self.members[0].max_limit()
    }

    /// Working minimum limit.
    #[inline]
    pub fn min_limit(&self) -> f64 {
        self.members[0].min_limit()
    }

    /// Physical travel minimum.
    #[inline]
    pub fn lowest(&self) -> f64 {
        self.members[0].lowest()
    }

    /// Physical travel maximum.
    #[inline]
    pub fn highest(&self) -> f64 {
        self.members[0].highest()
    }

    /// Whether every member drive is enabled.
    pub fn is_enabled(&self) -> bool {
        self.members.iter().all(|m| m.is_enabled())
    }

    /// Whether every member has converged on `target` within
    /// [`POSITION_TOLERANCE`].
    pub fn all_within(&self, target: f64) -> bool {
        self.members
            .iter()
            .all(|m| (m.position() - target).abs() <= POSITION_TOLERANCE)
    }

    /// Whether every member is at its physical travel maximum.
    pub fn all_at_max(&self) -> bool {
        self.members
            .iter()
            .all(|m| (m.position() - m.highest()).abs() <= POSITION_TOLERANCE)
    }

    /// Whether every member is at its physical travel minimum.
    pub fn all_at_min(&self) -> bool {
        self.members
            .iter()
            .all(|m| (m.position() - m.lowest()).abs() <= POSITION_TOLERANCE)
    }

    /// Verify every member reports a position inside its physical
    /// travel range. A position outside the range is a state the sweep
    /// never commands, so it is fatal for the in-flight step.
    pub fn check_travel(&self) -> Result<(), DeviceError> {
        for m in &self.members {
            let pos = m.position();
            if pos < m.lowest() - POSITION_TOLERANCE || pos > m.highest() + POSITION_TOLERANCE {
                return Err(DeviceError::UnexpectedState(format!(
                    "group '{}': position {pos:.4} outside travel [{:.4}, {:.4}]",
                    self.name,
                    m.lowest(),
                    m.highest(),
                )));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ActuatorGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActuatorGroup")
            .field("name", &self.name)
            .field("members", &self.members.len())
            .field("latched_by", &self.latched_by)
            .finish()
    }
}
