//! TOML configuration loader with validation.
//!
//! Loads [`SweepConfig`] from a single TOML file. Validates parameter
//! bounds (positive velocity and cell width, fill ratio in (0, 1],
//! non-inverted travel ranges, at least one member per group) before
//! any hardware is touched.

use std::path::Path;

use gantry_common::device::{LinearActuator, SensorSettings};
use gantry_common::group::ActuatorGroup;
use gantry_common::rig::Rig;
use gantry_common::sim::{
    SharedActuator, SharedBay, SharedSensor, SharedTool, SimActuator, SimHarness,
};
use serde::Deserialize;

use crate::error::ConfigError;

// ─── Config Schema ──────────────────────────────────────────────────

/// Complete controller configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    /// Simulated seconds per host tick.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_s: f64,
    pub sweep: SweepSection,
    pub groups: GroupsSection,
    pub storage: StorageSection,
    /// Sensor detection settings applied during setup.
    #[serde(default)]
    pub sensor: SensorSettings,
}

/// Sweep motion parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepSection {
    /// Cell edge length along the stepped axes.
    pub cell_width: f64,
    /// Actuator velocity magnitude used for every move.
    pub velocity: f64,
    /// Storage pause threshold as a fraction of total capacity.
    pub fill_ratio: f64,
}

/// Per-axis group definitions, in fixed X/Y/Z order.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupsSection {
    pub x: GroupSpec,
    pub y: GroupSpec,
    pub z: GroupSpec,
}

/// One actuator group definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupSpec {
    /// Group name used in logs and errors.
    pub name: String,
    /// Number of member actuators.
    pub members: usize,
    /// Physical travel minimum.
    pub lowest: f64,
    /// Physical travel maximum.
    pub highest: f64,
}

/// Storage bay definitions.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSection {
    /// Number of bays.
    #[serde(default = "default_bays")]
    pub bays: usize,
    /// Capacity per bay.
    pub capacity: f64,
}

fn default_tick_interval() -> f64 {
    1.0
}

fn default_bays() -> usize {
    1
}

impl Default for SweepConfig {
    /// Three single-actuator groups over a [0, 10] travel, one 100.0
    /// capacity bay. Matches `demos/sweep.toml`.
    fn default() -> Self {
        let group = |name: &str| GroupSpec {
            name: name.to_string(),
            members: 1,
            lowest: 0.0,
            highest: 10.0,
        };
        Self {
            tick_interval_s: 1.0,
            sweep: SweepSection {
                cell_width: 2.5,
                velocity: 0.5,
                fill_ratio: 0.9,
            },
            groups: GroupsSection {
                x: group("[X]"),
                y: group("[Y]"),
                z: group("[Z]"),
            },
            storage: StorageSection {
                bays: 1,
                capacity: 100.0,
            },
            sensor: SensorSettings::default(),
        }
    }
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate the controller configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<SweepConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("failed to read {}: {e}", path.display())))?;
    from_toml(&text)
}

/// Load config from a TOML string (for testing).
pub fn from_toml(text: &str) -> Result<SweepConfig, ConfigError> {
    let cfg: SweepConfig =
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate(&cfg)?;
    Ok(cfg)
}

// ─── Validation ─────────────────────────────────────────────────────

fn validate(cfg: &SweepConfig) -> Result<(), ConfigError> {
    if cfg.tick_interval_s <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "tick_interval_s must be positive, got {}",
            cfg.tick_interval_s
        )));
    }
    if cfg.sweep.velocity <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "sweep.velocity must be positive, got {}",
            cfg.sweep.velocity
        )));
    }
    if cfg.sweep.cell_width <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "sweep.cell_width must be positive, got {}",
            cfg.sweep.cell_width
        )));
    }
    if cfg.sweep.fill_ratio <= 0.0 || cfg.sweep.fill_ratio > 1.0 {
        return Err(ConfigError::Validation(format!(
            "sweep.fill_ratio must be in (0, 1], got {}",
            cfg.sweep.fill_ratio
        )));
    }
    for spec in [&cfg.groups.x, &cfg.groups.y, &cfg.groups.z] {
        validate_group(spec)?;
    }
    if cfg.storage.bays == 0 {
        return Err(ConfigError::Validation(
            "storage.bays must be at least 1".to_string(),
        ));
    }
    if cfg.storage.capacity < 0.0 {
        return Err(ConfigError::Validation(format!(
            "storage.capacity must be non-negative, got {}",
            cfg.storage.capacity
        )));
    }
    Ok(())
}

fn validate_group(spec: &GroupSpec) -> Result<(), ConfigError> {
    if spec.members == 0 {
        return Err(ConfigError::Validation(format!(
            "group '{}' has no members",
            spec.name
        )));
    }
    if spec.highest <= spec.lowest {
        return Err(ConfigError::Validation(format!(
            "group '{}' travel is inverted: [{}, {}]",
            spec.name, spec.lowest, spec.highest
        )));
    }
    Ok(())
}

// ─── Simulated Rig Assembly ─────────────────────────────────────────

/// Build a simulated rig from the config. Returns the [`Rig`] the
/// controller owns plus the [`SimHarness`] holding shared handles to
/// the same devices, so the caller can advance physics and inject
/// state.
pub fn build_sim_rig(cfg: &SweepConfig) -> (Rig, SimHarness) {
    let mut actuators = Vec::new();
    let groups = [&cfg.groups.x, &cfg.groups.y, &cfg.groups.z].map(|spec| {
        let members: Vec<Box<dyn LinearActuator>> = (0..spec.members)
            .map(|_| {
                let handle = SharedActuator::new(SimActuator::new(spec.lowest, spec.highest));
                actuators.push(handle.clone());
                Box::new(handle) as Box<dyn LinearActuator>
            })
            .collect();
        // Members validated non-empty before assembly.
        ActuatorGroup::new(spec.name.clone(), members)
            .unwrap_or_else(|e| unreachable!("validated group: {e}"))
    });

    let tool = SharedTool::new();
    let sensor = SharedSensor::new();
    let bay = SharedBay::new(cfg.storage.capacity);
    let mut bays: Vec<Box<dyn gantry_common::device::StorageBay>> =
        vec![Box::new(bay.clone())];
    for _ in 1..cfg.storage.bays {
        bays.push(Box::new(SharedBay::new(cfg.storage.capacity)));
    }

    let rig = Rig::new(
        groups,
        Box::new(tool.clone()),
        Box::new(sensor.clone()),
        bays,
    );
    let harness = SimHarness::new(actuators, tool, sensor, bay, cfg.tick_interval_s);
    (rig, harness)
}
