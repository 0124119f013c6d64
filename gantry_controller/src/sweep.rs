//! Raster sweep decomposition.
//!
//! The sweep drives the tool through the target volume one cell at a
//! time: Y is the scan axis (innermost), Z steps by one cell per scan
//! row, X steps by one cell per completed Z column (outermost). The
//! traversal position is implicit in the three groups' working limits;
//! no explicit coordinate is kept, exactly one axis advances at a time
//! and the others stay parked at an extreme.
//!
//! Axis order is fixed and never reordered.

use std::cell::RefCell;
use std::rc::Rc;

use gantry_common::device::SensorSettings;
use gantry_common::group::Axis;
use gantry_common::rig::Rig;
use tracing::{debug, info};

use crate::error::SweepError;
use crate::sequencer::{Step, StepOutcome, StepSequence};

// ─── Phase Machine ──────────────────────────────────────────────────

/// Controller-level sweep phase.
///
/// `Idle → Scanning → SteppingZ → Scanning → SteppingX → … → Finished`.
/// The terminal state disables tool and sensor permanently; resuming a
/// finished sweep requires reconstructing the controller. `Faulted` is
/// entered when a step fails; subsequent ticks are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPhase {
    /// Setup sequence still running.
    Idle,
    /// Y scan pass in progress.
    Scanning,
    /// Advancing Z by one cell between scan rows.
    SteppingZ,
    /// Advancing X by one cell between Z columns.
    SteppingX,
    /// Traversal complete; tool and sensor disabled.
    Finished,
    /// A step failed; controller halted in its last safe state.
    Faulted,
}

// ─── Sweep Statistics ───────────────────────────────────────────────

/// O(1) traversal counters, updated as steps complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Scan passes started (one per visited (X, Z) cell).
    pub scan_passes: u64,
    /// Completed one-cell X advances.
    pub x_steps: u64,
    /// Completed one-cell Z advances.
    pub z_steps: u64,
}

/// Shared handle to [`SweepStats`], cloned into the steps that record
/// progress. Single-threaded, so a plain `Rc<RefCell<_>>` suffices.
#[derive(Debug, Clone, Default)]
pub struct StatsHandle(Rc<RefCell<SweepStats>>);

impl StatsHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counter values.
    pub fn get(&self) -> SweepStats {
        *self.0.borrow()
    }

    fn record_scan_pass(&self) {
        self.0.borrow_mut().scan_passes += 1;
    }

    fn record_cell_step(&self, axis: Axis) {
        let mut stats = self.0.borrow_mut();
        match axis {
            Axis::X => stats.x_steps += 1,
            Axis::Z => stats.z_steps += 1,
            Axis::Y => {}
        }
    }
}

// ─── Steps ──────────────────────────────────────────────────────────

/// Which extreme a [`ParkStep`] drives its group to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParkTarget {
    /// Park at the travel minimum, then prepare to extend.
    Retracted,
    /// Park at the travel maximum, then prepare to retract.
    Extended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParkPhase {
    Command,
    Wait,
    Tail,
}

/// Drive a group fully to one extreme, pinning both working limits
/// there, then flip the velocity so the next cell advance moves the
/// group off the extreme without further setup.
pub struct ParkStep {
    axis: Axis,
    target: ParkTarget,
    velocity: f64,
    phase: ParkPhase,
}

impl ParkStep {
    pub fn new(axis: Axis, target: ParkTarget, velocity: f64) -> Self {
        Self {
            axis,
            target,
            velocity,
            phase: ParkPhase::Command,
        }
    }
}

impl Step for ParkStep {
    fn name(&self) -> &'static str {
        "park"
    }

    fn tick(&mut self, rig: &mut Rig) -> Result<StepOutcome, SweepError> {
        let group = rig.group_mut(self.axis);
        match self.phase {
            ParkPhase::Command => {
                let (extreme, vel) = match self.target {
                    ParkTarget::Retracted => (group.lowest(), -self.velocity),
                    ParkTarget::Extended => (group.highest(), self.velocity),
                };
                group.command_velocity(vel);
                group.command_min_limit(extreme);
                group.command_max_limit(extreme);
                debug!(axis = self.axis.label(), target = ?self.target, "parking");
                self.phase = ParkPhase::Wait;
                Ok(StepOutcome::Continue)
            }
            ParkPhase::Wait => {
                group.check_travel()?;
                let parked = match self.target {
                    ParkTarget::Retracted => group.all_at_min(),
                    ParkTarget::Extended => group.all_at_max(),
                };
                if parked {
                    // Prepare the opposite direction; the pinned
                    // limits keep the group at the extreme until a
                    // later step widens them.
                    let vel = match self.target {
                        ParkTarget::Retracted => self.velocity,
                        ParkTarget::Extended => -self.velocity,
                    };
                    group.command_velocity(vel);
                    self.phase = ParkPhase::Tail;
                }
                Ok(StepOutcome::Continue)
            }
            ParkPhase::Tail => Ok(StepOutcome::Done),
        }
    }
}

/// Direction of a one-cell advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellDirection {
    /// Raise the working maximum limit by one cell.
    Extend,
    /// Lower the working minimum limit by one cell.
    Retract,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CellPhase {
    Command,
    Wait { target: f64 },
    Tail,
}

/// Advance a group by one cell: set a new working limit, clamped to
/// the physical travel extreme, and yield until the group's reported
/// position converges within tolerance.
pub struct AdvanceCellStep {
    axis: Axis,
    direction: CellDirection,
    width: f64,
    stats: StatsHandle,
    phase: CellPhase,
}

impl AdvanceCellStep {
    pub fn new(axis: Axis, direction: CellDirection, width: f64, stats: StatsHandle) -> Self {
        Self {
            axis,
            direction,
            width,
            stats,
            phase: CellPhase::Command,
        }
    }
}

impl Step for AdvanceCellStep {
    fn name(&self) -> &'static str {
        "advance-cell"
    }

    fn tick(&mut self, rig: &mut Rig) -> Result<StepOutcome, SweepError> {
        let group = rig.group_mut(self.axis);
        match self.phase {
            CellPhase::Command => {
                let target = match self.direction {
                    CellDirection::Extend => {
                        let t = (group.max_limit() + self.width).min(group.highest());
                        group.command_max_limit(t);
                        t
                    }
                    CellDirection::Retract => {
                        let t = (group.min_limit() - self.width).max(group.lowest());
                        group.command_min_limit(t);
                        t
                    }
                };
                debug!(axis = self.axis.label(), target, "advancing one cell");
                self.phase = CellPhase::Wait { target };
                Ok(StepOutcome::Continue)
            }
            CellPhase::Wait { target } => {
                group.check_travel()?;
                if group.all_within(target) {
                    self.stats.record_cell_step(self.axis);
                    self.phase = CellPhase::Tail;
                }
                Ok(StepOutcome::Continue)
            }
            CellPhase::Tail => Ok(StepOutcome::Done),
        }
    }
}

/// Open the Y working window to full travel and start the scan pass
/// with the tool active.
pub struct BeginScanStep {
    velocity: f64,
    stats: StatsHandle,
    issued: bool,
}

impl BeginScanStep {
    pub fn new(velocity: f64, stats: StatsHandle) -> Self {
        Self {
            velocity,
            stats,
            issued: false,
        }
    }
}

impl Step for BeginScanStep {
    fn name(&self) -> &'static str {
        "begin-scan"
    }

    fn tick(&mut self, rig: &mut Rig) -> Result<StepOutcome, SweepError> {
        if self.issued {
            return Ok(StepOutcome::Done);
        }
        let group = rig.group_mut(Axis::Y);
        let top = group.highest();
        group.command_max_limit(top);
        group.command_velocity(self.velocity);
        rig.command_tool(true);
        self.stats.record_scan_pass();
        debug!("scan pass started");
        self.issued = true;
        Ok(StepOutcome::Continue)
    }
}

/// Apply sensor detection settings and put tool and sensor in their
/// pre-scan states.
pub struct ConfigureSensorStep {
    settings: SensorSettings,
    issued: bool,
}

impl ConfigureSensorStep {
    pub fn new(settings: SensorSettings) -> Self {
        Self {
            settings,
            issued: false,
        }
    }
}

impl Step for ConfigureSensorStep {
    fn name(&self) -> &'static str {
        "configure-sensor"
    }

    fn tick(&mut self, rig: &mut Rig) -> Result<StepOutcome, SweepError> {
        if self.issued {
            return Ok(StepOutcome::Done);
        }
        rig.configure_sensor(&self.settings);
        rig.set_sensor_enabled(true);
        rig.command_tool(false);
        info!("sensor configured, rig ready");
        self.issued = true;
        Ok(StepOutcome::Continue)
    }
}

/// Terminal step: disable the tool and the sensor permanently.
pub struct FinishStep;

impl Step for FinishStep {
    fn name(&self) -> &'static str {
        "finish"
    }

    fn tick(&mut self, rig: &mut Rig) -> Result<StepOutcome, SweepError> {
        // Terminal state is unconditional; an active latch must not
        // leave the tool running after the sweep ends.
        rig.latch_tool(false);
        rig.set_sensor_enabled(false);
        info!("sweep complete");
        Ok(StepOutcome::Done)
    }
}

// ─── Planner ────────────────────────────────────────────────────────

/// Builds the step sequences that make up the sweep.
#[derive(Debug, Clone)]
pub struct SweepPlanner {
    velocity: f64,
    cell_width: f64,
    stats: StatsHandle,
}

impl SweepPlanner {
    pub fn new(velocity: f64, cell_width: f64, stats: StatsHandle) -> Self {
        Self {
            velocity,
            cell_width,
            stats,
        }
    }

    fn park(&self, axis: Axis, target: ParkTarget) -> StepSequence {
        StepSequence::of(ParkStep::new(axis, target, self.velocity))
    }

    fn advance_cell(&self, axis: Axis, direction: CellDirection) -> StepSequence {
        StepSequence::of(AdvanceCellStep::new(
            axis,
            direction,
            self.cell_width,
            self.stats.clone(),
        ))
    }

    fn begin_scan(&self) -> StepSequence {
        StepSequence::of(BeginScanStep::new(self.velocity, self.stats.clone()))
    }

    /// Initial sequence: configure the sensor, park all three axes at
    /// their start faces (Y retracted, Z extended, X retracted), then
    /// start the first scan pass.
    pub fn setup_sequence(&self, sensor: SensorSettings) -> StepSequence {
        StepSequence::of(ConfigureSensorStep::new(sensor))
            .concat(self.park(Axis::Y, ParkTarget::Retracted))
            .concat(self.park(Axis::Z, ParkTarget::Extended))
            .concat(self.park(Axis::X, ParkTarget::Retracted))
            .concat(self.begin_scan())
    }

    /// Decide what happens after a completed scan pass.
    ///
    /// Only meaningful when Y is fully extended; otherwise the scan is
    /// still running and there is nothing to plan. Returns the next
    /// phase together with the sequence realizing it.
    pub fn plan_next(&self, rig: &Rig) -> Option<(SweepPhase, StepSequence)> {
        if !rig.group(Axis::Y).all_at_max() {
            return None;
        }

        if !rig.group(Axis::Z).all_at_min() {
            // Next scan row: retract Y, step Z one cell inward.
            let seq = self
                .park(Axis::Y, ParkTarget::Retracted)
                .concat(self.advance_cell(Axis::Z, CellDirection::Retract))
                .concat(self.begin_scan());
            return Some((SweepPhase::SteppingZ, seq));
        }

        if !rig.group(Axis::X).all_at_max() {
            // Next column: reset Z to its start face, retract Y, step
            // X one cell outward.
            let seq = self
                .park(Axis::Z, ParkTarget::Extended)
                .concat(self.park(Axis::Y, ParkTarget::Retracted))
                .concat(self.advance_cell(Axis::X, CellDirection::Extend))
                .concat(self.begin_scan());
            return Some((SweepPhase::SteppingX, seq));
        }

        // Entire volume traversed.
        let seq = self
            .park(Axis::Y, ParkTarget::Retracted)
            .concat(StepSequence::of(FinishStep));
        Some((SweepPhase::Finished, seq))
    }
}
