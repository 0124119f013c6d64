//! Simulated hardware backend.
//!
//! Provides physics-lite device simulations for the CLI binary and for
//! tests: actuators integrate velocity over a fixed per-tick `dt` and
//! clamp against their working limits and travel extremes; tool,
//! sensor, and bay are plain settable state.
//!
//! Devices are held behind shared handles (`Rc<RefCell<_>>`) so the
//! test harness keeps a view of state the controller owns through the
//! trait objects. Execution is single-threaded and cooperative, so the
//! shared handles never contend.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::device::{CuttingTool, LinearActuator, ProximitySensor, SensorSettings, StorageBay};

// ─── Actuator ───────────────────────────────────────────────────────

/// Simulated linear actuator.
#[derive(Debug, Clone)]
pub struct SimActuator {
    position: f64,
    velocity: f64,
    min_limit: f64,
    max_limit: f64,
    lowest: f64,
    highest: f64,
    enabled: bool,
}

/// Read-only view of an actuator's state, for assertions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorSnapshot {
    pub position: f64,
    pub velocity: f64,
    pub min_limit: f64,
    pub max_limit: f64,
    pub enabled: bool,
}

impl SimActuator {
    /// New actuator parked at `lowest`, working window spanning the
    /// full travel, drive enabled, velocity zero.
    pub fn new(lowest: f64, highest: f64) -> Self {
        Self {
            position: lowest,
            velocity: 0.0,
            min_limit: lowest,
            max_limit: highest,
            lowest,
            highest,
            enabled: true,
        }
    }

    /// Integrate one tick of motion. Travel is clamped against the
    /// working window intersected with the physical range; an actuator
    /// already past a limit holds position rather than snapping back.
    pub fn tick(&mut self, dt: f64) {
        if !self.enabled || self.velocity == 0.0 {
            return;
        }
        let next = self.position + self.velocity * dt;
        if self.velocity > 0.0 {
            let hi = self.max_limit.min(self.highest);
            self.position = next.min(hi).max(self.position);
        } else {
            let lo = self.min_limit.max(self.lowest);
            self.position = next.max(lo).min(self.position);
        }
        trace!(
            pos = self.position,
            vel = self.velocity,
            "sim actuator tick"
        );
    }

    fn snapshot(&self) -> ActuatorSnapshot {
        ActuatorSnapshot {
            position: self.position,
            velocity: self.velocity,
            min_limit: self.min_limit,
            max_limit: self.max_limit,
            enabled: self.enabled,
        }
    }
}

/// Cloneable shared handle to a [`SimActuator`].
#[derive(Debug, Clone)]
pub struct SharedActuator(Rc<RefCell<SimActuator>>);

impl SharedActuator {
    pub fn new(actuator: SimActuator) -> Self {
        Self(Rc::new(RefCell::new(actuator)))
    }

    /// Advance the simulation by one tick of `dt` seconds.
    pub fn tick(&self, dt: f64) {
        self.0.borrow_mut().tick(dt);
    }

    /// Current state, for assertions.
    pub fn snapshot(&self) -> ActuatorSnapshot {
        self.0.borrow().snapshot()
    }

    /// Force the reported position (fault injection in tests).
    pub fn set_position(&self, position: f64) {
        self.0.borrow_mut().position = position;
    }
}

impl LinearActuator for SharedActuator {
    fn position(&self) -> f64 {
        self.0.borrow().position
    }
    fn lowest(&self) -> f64 {
        self.0.borrow().lowest
    }
    fn highest(&self) -> f64 {
        self.0.borrow().highest
    }
    fn velocity(&self) -> f64 {
        self.0.borrow().velocity
    }
    fn set_velocity(&mut self, velocity: f64) {
        self.0.borrow_mut().velocity = velocity;
    }
    fn min_limit(&self) -> f64 {
        self.0.borrow().min_limit
    }
    fn max_limit(&self) -> f64 {
        self.0.borrow().max_limit
    }
    fn set_min_limit(&mut self, limit: f64) {
        self.0.borrow_mut().min_limit = limit;
    }
    fn set_max_limit(&mut self, limit: f64) {
        self.0.borrow_mut().max_limit = limit;
    }
    fn is_enabled(&self) -> bool {
        self.0.borrow().enabled
    }
    fn set_enabled(&mut self, enabled: bool) {
        self.0.borrow_mut().enabled = enabled;
    }
}

// ─── Tool ───────────────────────────────────────────────────────────

/// Simulated cutting tool: an on/off flag.
#[derive(Debug, Clone, Default)]
pub struct SimTool {
    enabled: bool,
}

/// Cloneable shared handle to a [`SimTool`].
#[derive(Debug, Clone, Default)]
pub struct SharedTool(Rc<RefCell<SimTool>>);

impl SharedTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.0.borrow().enabled
    }
}

impl CuttingTool for SharedTool {
    fn is_enabled(&self) -> bool {
        self.0.borrow().enabled
    }
    fn set_enabled(&mut self, enabled: bool) {
        self.0.borrow_mut().enabled = enabled;
    }
}

// ─── Sensor ─────────────────────────────────────────────────────────

/// Simulated proximity sensor with settable detection state.
#[derive(Debug, Clone, Default)]
pub struct SimSensor {
    enabled: bool,
    detected: bool,
    settings: Option<SensorSettings>,
}

/// Cloneable shared handle to a [`SimSensor`].
#[derive(Debug, Clone, Default)]
pub struct SharedSensor(Rc<RefCell<SimSensor>>);

impl SharedSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive the detection state from the harness.
    pub fn set_detected(&self, detected: bool) {
        self.0.borrow_mut().detected = detected;
    }

    pub fn is_enabled(&self) -> bool {
        self.0.borrow().enabled
    }

    /// Settings applied during setup, if any.
    pub fn settings(&self) -> Option<SensorSettings> {
        self.0.borrow().settings
    }
}

impl ProximitySensor for SharedSensor {
    fn is_enabled(&self) -> bool {
        self.0.borrow().enabled
    }
    fn set_enabled(&mut self, enabled: bool) {
        self.0.borrow_mut().enabled = enabled;
    }
    fn configure(&mut self, settings: &SensorSettings) {
        self.0.borrow_mut().settings = Some(*settings);
    }
    fn detected(&self) -> bool {
        let s = self.0.borrow();
        s.enabled && s.detected
    }
}

// ─── Storage bay ────────────────────────────────────────────────────

/// Simulated storage bay with settable fill level.
#[derive(Debug, Clone, Default)]
pub struct SimBay {
    capacity: f64,
    stored: f64,
}

/// Cloneable shared handle to a [`SimBay`].
#[derive(Debug, Clone, Default)]
pub struct SharedBay(Rc<RefCell<SimBay>>);

impl SharedBay {
    pub fn new(capacity: f64) -> Self {
        Self(Rc::new(RefCell::new(SimBay {
            capacity,
            stored: 0.0,
        })))
    }

    /// Drive the fill level from the harness.
    pub fn set_stored(&self, stored: f64) {
        self.0.borrow_mut().stored = stored;
    }
}

impl StorageBay for SharedBay {
    fn capacity(&self) -> f64 {
        self.0.borrow().capacity
    }
    fn stored(&self) -> f64 {
        self.0.borrow().stored
    }
}

// ─── Harness ────────────────────────────────────────────────────────

/// Handle bundle for a simulated rig. The controller owns the [`Rig`]
/// built over the same devices; the harness keeps shared handles so
/// tests and the binary can advance physics and inject state.
///
/// [`Rig`]: crate::rig::Rig
#[derive(Debug, Clone)]
pub struct SimHarness {
    actuators: Vec<SharedActuator>,
    pub tool: SharedTool,
    pub sensor: SharedSensor,
    pub bay: SharedBay,
    dt: f64,
}

impl SimHarness {
    pub fn new(
        actuators: Vec<SharedActuator>,
        tool: SharedTool,
        sensor: SharedSensor,
        bay: SharedBay,
        dt: f64,
    ) -> Self {
        Self {
            actuators,
            tool,
            sensor,
            bay,
            dt,
        }
    }

    /// Advance every actuator by one tick.
    pub fn tick(&self) {
        for a in &self.actuators {
            a.tick(self.dt);
        }
    }

    /// Shared actuator handles, in construction order.
    pub fn actuators(&self) -> &[SharedActuator] {
        &self.actuators
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actuator_moves_and_clamps_at_max_limit() {
        let mut a = SimActuator::new(0.0, 10.0);
        a.max_limit = 2.5;
        a.velocity = 1.0;
        for _ in 0..5 {
            a.tick(1.0);
        }
        assert_eq!(a.position, 2.5);
    }

    #[test]
    fn actuator_does_not_move_while_disabled() {
        let mut a = SimActuator::new(0.0, 10.0);
        a.velocity = 1.0;
        a.enabled = false;
        a.tick(1.0);
        assert_eq!(a.position, 0.0);
    }

    #[test]
    fn actuator_past_limit_holds_position() {
        let mut a = SimActuator::new(0.0, 10.0);
        a.position = 5.0;
        a.max_limit = 2.5;
        a.velocity = 1.0;
        a.tick(1.0);
        assert_eq!(a.position, 5.0);
    }

    #[test]
    fn sensor_reports_detection_only_while_enabled() {
        let mut sensor = SharedSensor::new();
        sensor.set_detected(true);
        assert!(!sensor.detected());
        sensor.set_enabled(true);
        assert!(sensor.detected());
    }
}
