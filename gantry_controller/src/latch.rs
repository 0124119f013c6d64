//! Interrupt latches.
//!
//! Two edge-triggered latches sit above the sequencer and override it
//! through the write-ownership claims on [`Rig`] devices:
//!
//! * [`StorageLatch`] pauses the scan when total stored volume crosses
//!   the capacity threshold, and resumes it when the level drops back
//!   below. Only the Y group and the tool are claimed; the traversal
//!   position (the working limits) is untouched, so the scan resumes
//!   exactly where it paused.
//! * [`SensorLatch`] is a full stop: on detection every axis group is
//!   disabled and the tool is forced on; on clearance motion is
//!   re-enabled and the tool is forced off.
//!
//! Both act only on the state crossing. Holding a level does nothing.

use gantry_common::group::{Axis, LatchSet};
use gantry_common::rig::Rig;
use tracing::{info, warn};

// ─── Storage Latch ──────────────────────────────────────────────────

/// Edge-triggered storage-full pause.
#[derive(Debug)]
pub struct StorageLatch {
    threshold: f64,
    nominal_velocity: f64,
    paused: bool,
    tool_was_enabled: bool,
    pauses: u64,
    resumes: u64,
}

impl StorageLatch {
    /// `threshold` is an absolute stored volume; `nominal_velocity` is
    /// the scan velocity restored on resume.
    pub fn new(threshold: f64, nominal_velocity: f64) -> Self {
        Self {
            threshold,
            nominal_velocity,
            paused: false,
            tool_was_enabled: false,
            pauses: 0,
            resumes: 0,
        }
    }

    #[inline]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Replace the threshold. The paused flag is untouched; the next
    /// poll acts on the new level comparison.
    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Upward crossings observed.
    #[inline]
    pub fn pauses(&self) -> u64 {
        self.pauses
    }

    /// Downward crossings observed.
    #[inline]
    pub fn resumes(&self) -> u64 {
        self.resumes
    }

    /// Compare total stored volume against the threshold and act on a
    /// crossing. Strict comparisons: holding exactly at the threshold
    /// changes nothing.
    pub fn poll(&mut self, rig: &mut Rig) {
        let (_, stored) = rig.storage_totals();
        if !self.paused && stored > self.threshold {
            self.pause(rig, stored);
        } else if self.paused && stored < self.threshold {
            self.resume(rig, stored);
        }
    }

    fn pause(&mut self, rig: &mut Rig, stored: f64) {
        self.tool_was_enabled = rig.tool_enabled();
        rig.claim_tool(LatchSet::STORAGE);
        rig.latch_tool(false);
        let y = rig.group_mut(Axis::Y);
        y.claim(LatchSet::STORAGE);
        // Velocity only; the working limits carry the scan position.
        y.latch_velocity(0.0);
        self.paused = true;
        self.pauses += 1;
        warn!(stored, threshold = self.threshold, "storage full, scan paused");
    }

    fn resume(&mut self, rig: &mut Rig, stored: f64) {
        let y = rig.group_mut(Axis::Y);
        y.latch_velocity(self.nominal_velocity);
        y.release(LatchSet::STORAGE);
        rig.latch_tool(self.tool_was_enabled);
        rig.release_tool(LatchSet::STORAGE);
        self.paused = false;
        self.resumes += 1;
        info!(stored, threshold = self.threshold, "storage drained, scan resumed");
    }
}

// ─── Sensor Latch ───────────────────────────────────────────────────

/// Edge-triggered proximity full stop.
#[derive(Debug, Default)]
pub struct SensorLatch {
    active: bool,
    trips: u64,
}

impl SensorLatch {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Detection edges observed.
    #[inline]
    pub fn trips(&self) -> u64 {
        self.trips
    }

    /// Compare the polled detection state against the latch state and
    /// act on a crossing.
    pub fn poll(&mut self, rig: &mut Rig) {
        let detected = rig.sensor_detected();
        self.force(rig, detected);
    }

    /// Drive the latch to `detected` directly (signal-path commands
    /// take this route). A no-op when already in the requested state.
    pub fn force(&mut self, rig: &mut Rig, detected: bool) {
        if detected == self.active {
            return;
        }
        if detected {
            self.trip(rig);
        } else {
            self.clear(rig);
        }
    }

    fn trip(&mut self, rig: &mut Rig) {
        rig.claim_tool(LatchSet::SENSOR);
        rig.latch_tool(true);
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let group = rig.group_mut(axis);
            group.claim(LatchSet::SENSOR);
            group.set_enabled(false);
        }
        self.active = true;
        self.trips += 1;
        warn!("proximity detection, full stop");
    }

    fn clear(&mut self, rig: &mut Rig) {
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let group = rig.group_mut(axis);
            group.set_enabled(true);
            group.release(LatchSet::SENSOR);
        }
        rig.latch_tool(false);
        rig.release_tool(LatchSet::SENSOR);
        self.active = false;
        info!("proximity cleared, motion re-enabled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_common::device::LinearActuator;
    use gantry_common::group::ActuatorGroup;
    use gantry_common::sim::{
        SharedActuator, SharedBay, SharedSensor, SharedTool, SimActuator,
    };

    struct Fixture {
        rig: Rig,
        actuators: Vec<SharedActuator>,
        tool: SharedTool,
        sensor: SharedSensor,
        bay: SharedBay,
    }

    fn fixture() -> Fixture {
        let actuators: Vec<SharedActuator> = (0..3)
            .map(|_| SharedActuator::new(SimActuator::new(0.0, 10.0)))
            .collect();
        let groups = [0usize, 1, 2].map(|i| {
            let member: Box<dyn LinearActuator> = Box::new(actuators[i].clone());
            ActuatorGroup::new(["[X]", "[Y]", "[Z]"][i], vec![member]).unwrap()
        });
        let tool = SharedTool::new();
        let sensor = SharedSensor::new();
        let bay = SharedBay::new(1.0);
        let rig = Rig::new(
            groups,
            Box::new(tool.clone()),
            Box::new(sensor.clone()),
            vec![Box::new(bay.clone())],
        );
        Fixture {
            rig,
            actuators,
            tool,
            sensor,
            bay,
        }
    }

    #[test]
    fn storage_latch_fires_once_per_crossing() {
        let mut fx = fixture();
        let mut latch = StorageLatch::new(0.9, 0.5);

        for fill in [0.5, 0.95, 0.95, 0.4] {
            fx.bay.set_stored(fill);
            latch.poll(&mut fx.rig);
        }
        assert_eq!(latch.pauses(), 1);
        assert_eq!(latch.resumes(), 1);
        assert!(!latch.is_paused());
    }

    #[test]
    fn storage_pause_zeroes_y_and_keeps_limits() {
        let mut fx = fixture();
        let mut latch = StorageLatch::new(0.9, 0.5);

        // Mid-scan: Y moving upward with a working window set.
        let y = fx.rig.group_mut(Axis::Y);
        y.command_velocity(0.5);
        y.command_max_limit(7.5);
        fx.rig.command_tool(true);

        fx.bay.set_stored(0.95);
        latch.poll(&mut fx.rig);

        let snap = fx.actuators[Axis::Y.index()].snapshot();
        assert!(latch.is_paused());
        assert_eq!(snap.velocity, 0.0);
        assert_eq!(snap.max_limit, 7.5);
        assert!(!fx.tool.is_enabled());
        // Sequencer writes to Y are suppressed while paused.
        assert!(!fx.rig.group_mut(Axis::Y).command_velocity(1.0));
        assert!(!fx.rig.command_tool(true));

        fx.bay.set_stored(0.4);
        latch.poll(&mut fx.rig);

        let snap = fx.actuators[Axis::Y.index()].snapshot();
        assert_eq!(snap.velocity, 0.5);
        assert!(fx.tool.is_enabled());
        assert!(fx.rig.group_mut(Axis::Y).command_velocity(1.0));
    }

    #[test]
    fn storage_resume_restores_remembered_tool_state() {
        let mut fx = fixture();
        let mut latch = StorageLatch::new(0.9, 0.5);

        // Tool off at pause time stays off after resume.
        fx.rig.command_tool(false);
        fx.bay.set_stored(0.95);
        latch.poll(&mut fx.rig);
        fx.bay.set_stored(0.1);
        latch.poll(&mut fx.rig);
        assert!(!fx.tool.is_enabled());
    }

    #[test]
    fn holding_exactly_at_threshold_is_not_a_crossing() {
        let mut fx = fixture();
        let mut latch = StorageLatch::new(0.9, 0.5);
        fx.bay.set_stored(0.9);
        latch.poll(&mut fx.rig);
        assert!(!latch.is_paused());
        assert_eq!(latch.pauses(), 0);
    }

    #[test]
    fn sensor_trip_stops_motion_and_enables_tool() {
        let mut fx = fixture();
        let mut latch = SensorLatch::new();
        fx.rig.set_sensor_enabled(true);

        fx.sensor.set_detected(true);
        latch.poll(&mut fx.rig);
        // Repeated detection polls are level, not edges.
        latch.poll(&mut fx.rig);

        assert!(latch.is_active());
        assert_eq!(latch.trips(), 1);
        assert!(fx.tool.is_enabled());
        for a in &fx.actuators {
            assert!(!a.snapshot().enabled);
        }
        assert!(!fx.rig.group_mut(Axis::X).command_velocity(1.0));

        fx.sensor.set_detected(false);
        latch.poll(&mut fx.rig);

        assert!(!latch.is_active());
        assert!(!fx.tool.is_enabled());
        for a in &fx.actuators {
            assert!(a.snapshot().enabled);
        }
        assert!(fx.rig.group_mut(Axis::X).command_velocity(1.0));
    }

    #[test]
    fn sensor_force_bypasses_the_polled_state() {
        let mut fx = fixture();
        let mut latch = SensorLatch::new();

        // Signal-path trip with the hardware sensor reporting nothing.
        latch.force(&mut fx.rig, true);
        assert!(latch.is_active());
        assert!(fx.tool.is_enabled());

        latch.force(&mut fx.rig, false);
        assert!(!latch.is_active());
        assert!(!fx.tool.is_enabled());
    }

    #[test]
    fn both_latches_must_release_before_ownership_returns() {
        let mut fx = fixture();
        let mut storage = StorageLatch::new(0.9, 0.5);
        let mut sensor = SensorLatch::new();

        fx.bay.set_stored(0.95);
        storage.poll(&mut fx.rig);
        sensor.force(&mut fx.rig, true);

        sensor.force(&mut fx.rig, false);
        // Storage still holds Y and the tool.
        assert!(!fx.rig.group_mut(Axis::Y).command_velocity(1.0));
        assert!(!fx.rig.command_tool(true));

        fx.bay.set_stored(0.1);
        storage.poll(&mut fx.rig);
        assert!(fx.rig.group_mut(Axis::Y).command_velocity(1.0));
        assert!(fx.rig.command_tool(true));
    }
}
