//! Device trait surfaces.
//!
//! These traits are the seam between the controller and the hardware
//! (or its simulation). The controller never talks to a concrete device
//! type; everything it needs is expressed here.

use serde::{Deserialize, Serialize};

/// One linear actuator: a piston-style device with a physical travel
/// range `[lowest, highest]`, a commandable working window
/// `[min_limit, max_limit]`, and a signed velocity.
///
/// Positions and limits are in user units; velocity is user units per
/// second. A disabled actuator does not move regardless of velocity.
pub trait LinearActuator {
    /// Current reported position.
    fn position(&self) -> f64;
    /// Physical travel minimum.
    fn lowest(&self) -> f64;
    /// Physical travel maximum.
    fn highest(&self) -> f64;

    /// Commanded signed velocity.
    fn velocity(&self) -> f64;
    /// Command a signed velocity.
    fn set_velocity(&mut self, velocity: f64);

    /// Current working minimum limit.
    fn min_limit(&self) -> f64;
    /// Current working maximum limit.
    fn max_limit(&self) -> f64;
    /// Set the working minimum limit.
    fn set_min_limit(&mut self, limit: f64);
    /// Set the working maximum limit.
    fn set_max_limit(&mut self, limit: f64);

    /// Whether the actuator drive is enabled.
    fn is_enabled(&self) -> bool;
    /// Enable or disable the actuator drive.
    fn set_enabled(&mut self, enabled: bool);
}

/// The mobile tool driven through the target volume.
pub trait CuttingTool {
    /// Whether the tool is running.
    fn is_enabled(&self) -> bool;
    /// Start or stop the tool.
    fn set_enabled(&mut self, enabled: bool);
}

/// Proximity sensor watching the working area around the tool.
pub trait ProximitySensor {
    /// Whether the sensor is powered.
    fn is_enabled(&self) -> bool;
    /// Power the sensor on or off.
    fn set_enabled(&mut self, enabled: bool);
    /// Apply detection flags and field extents.
    fn configure(&mut self, settings: &SensorSettings);
    /// Current detection state.
    fn detected(&self) -> bool;
}

/// One storage container on the controller's own structure.
pub trait StorageBay {
    /// Maximum volume across the bay's compartments.
    fn capacity(&self) -> f64;
    /// Currently stored volume.
    fn stored(&self) -> f64;
}

/// Object classes a proximity sensor reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionFlags {
    pub small_craft: bool,
    pub large_craft: bool,
    pub stations: bool,
    pub characters: bool,
    pub floating_debris: bool,
    pub neutral: bool,
}

impl Default for DetectionFlags {
    fn default() -> Self {
        Self {
            small_craft: true,
            large_craft: true,
            stations: true,
            characters: false,
            floating_debris: true,
            neutral: true,
        }
    }
}

/// Detection field extents, per face, in user units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorExtents {
    pub front: f64,
    pub back: f64,
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Default for SensorExtents {
    fn default() -> Self {
        // Hug the tool sideways, reach ahead along the scan direction.
        Self {
            front: 0.0,
            back: 5.1,
            left: 0.8,
            right: 0.8,
            top: 0.8,
            bottom: 0.8,
        }
    }
}

/// Full sensor configuration applied during setup.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    pub flags: DetectionFlags,
    pub extents: SensorExtents,
}
