//! The rig: one controller's device bundle.
//!
//! Three actuator groups (one per sweep axis), one cutting tool, one
//! proximity sensor, and the storage bays on the controller's own
//! structure. Tool write ownership mirrors group ownership: latch
//! claims suppress sequencer-issued tool commands.

use crate::device::{CuttingTool, ProximitySensor, SensorSettings, StorageBay};
use crate::group::{ActuatorGroup, Axis, LatchSet};

/// Device bundle owned by one controller.
pub struct Rig {
    groups: [ActuatorGroup; 3],
    tool: Box<dyn CuttingTool>,
    sensor: Box<dyn ProximitySensor>,
    bays: Vec<Box<dyn StorageBay>>,
    tool_latched_by: LatchSet,
}

impl Rig {
    /// Assemble a rig. Groups are indexed by [`Axis::index`]; the
    /// array order is X, Y, Z.
    pub fn new(
        groups: [ActuatorGroup; 3],
        tool: Box<dyn CuttingTool>,
        sensor: Box<dyn ProximitySensor>,
        bays: Vec<Box<dyn StorageBay>>,
    ) -> Self {
        Self {
            groups,
            tool,
            sensor,
            bays,
            tool_latched_by: LatchSet::empty(),
        }
    }

    /// The group driving `axis`.
    #[inline]
    pub fn group(&self, axis: Axis) -> &ActuatorGroup {
        &self.groups[axis.index()]
    }

    /// Mutable access to the group driving `axis`.
    #[inline]
    pub fn group_mut(&mut self, axis: Axis) -> &mut ActuatorGroup {
        &mut self.groups[axis.index()]
    }

    // ── Tool ──

    /// Latches currently holding the tool.
    #[inline]
    pub fn tool_latched_by(&self) -> LatchSet {
        self.tool_latched_by
    }

    /// Take exclusive tool write control for a latch.
    pub fn claim_tool(&mut self, latch: LatchSet) {
        self.tool_latched_by |= latch;
    }

    /// Return tool write control to the sequencer for a latch.
    pub fn release_tool(&mut self, latch: LatchSet) {
        self.tool_latched_by.remove(latch);
    }

    /// Sequencer-issued tool command. Suppressed (returns `false`)
    /// while a latch holds the tool.
    pub fn command_tool(&mut self, enabled: bool) -> bool {
        if !self.tool_latched_by.is_empty() {
            return false;
        }
        self.tool.set_enabled(enabled);
        true
    }

    /// Latch-issued tool write; always applied.
    pub fn latch_tool(&mut self, enabled: bool) {
        self.tool.set_enabled(enabled);
    }

    /// Whether the tool is running.
    #[inline]
    pub fn tool_enabled(&self) -> bool {
        self.tool.is_enabled()
    }

    // ── Sensor ──

    /// Apply detection settings to the sensor.
    pub fn configure_sensor(&mut self, settings: &SensorSettings) {
        self.sensor.configure(settings);
    }

    /// Power the sensor on or off.
    pub fn set_sensor_enabled(&mut self, enabled: bool) {
        self.sensor.set_enabled(enabled);
    }

    /// Whether the sensor is powered.
    #[inline]
    pub fn sensor_enabled(&self) -> bool {
        self.sensor.is_enabled()
    }

    /// Current detection state.
    #[inline]
    pub fn sensor_detected(&self) -> bool {
        self.sensor.detected()
    }

    // ── Storage ──

    /// Total (capacity, stored) volume summed across all bays.
    pub fn storage_totals(&self) -> (f64, f64) {
        let mut capacity = 0.0;
        let mut stored = 0.0;
        for bay in &self.bays {
            capacity += bay.capacity();
            stored += bay.stored();
        }
        (capacity, stored)
    }

    /// Number of storage bays.
    #[inline]
    pub fn bay_count(&self) -> usize {
        self.bays.len()
    }
}

impl std::fmt::Debug for Rig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rig")
            .field("groups", &self.groups)
            .field("bays", &self.bays.len())
            .field("tool_latched_by", &self.tool_latched_by)
            .finish()
    }
}
