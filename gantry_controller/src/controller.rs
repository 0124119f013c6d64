//! Host-facing tick handler.
//!
//! [`Controller::handle_tick`] is the single entry point the host
//! invokes each tick. Processing order is fixed: command dispatch,
//! signal dispatch, latch polling, then at most one unit of sweep
//! work. A tick that dispatched a command or signal does no sweep
//! work; the next periodic tick picks the sweep back up.

use gantry_common::rig::Rig;
use gantry_common::tick::{TickOutcome, TickReasons};
use tracing::{debug, error, info, warn};

use crate::config::SweepConfig;
use crate::error::{ConfigError, SweepError};
use crate::latch::{SensorLatch, StorageLatch};
use crate::sequencer::Scheduler;
use crate::sweep::{StatsHandle, SweepPhase, SweepPlanner, SweepStats};

/// Free-text commands accepted on the command path.
const CMD_RECALCULATE: &str = "recalculate";
/// Signal-path sensor edges.
const SIG_DETECTED: &str = "detected";
const SIG_CLEARED: &str = "cleared";

/// Tick-driven sweep controller. Owns the rig, the scheduler, and the
/// two interrupt latches.
pub struct Controller {
    rig: Rig,
    scheduler: Scheduler,
    planner: SweepPlanner,
    storage: StorageLatch,
    sensor: SensorLatch,
    stats: StatsHandle,
    phase: SweepPhase,
    fill_ratio: f64,
}

impl Controller {
    /// Build a controller over `rig` and queue the setup sequence.
    ///
    /// Fails fast when the rig has no storage capacity; the capacity
    /// threshold would be meaningless and the pause latch could never
    /// fire.
    pub fn new(rig: Rig, cfg: &SweepConfig) -> Result<Self, ConfigError> {
        let (capacity, _) = rig.storage_totals();
        if capacity <= 0.0 {
            return Err(ConfigError::NoStorage);
        }
        let threshold = capacity * cfg.sweep.fill_ratio;
        info!(
            capacity,
            threshold,
            bays = rig.bay_count(),
            "storage threshold computed"
        );

        let stats = StatsHandle::new();
        let planner = SweepPlanner::new(cfg.sweep.velocity, cfg.sweep.cell_width, stats.clone());
        let mut scheduler = Scheduler::new();
        scheduler.append(planner.setup_sequence(cfg.sensor));

        Ok(Self {
            rig,
            scheduler,
            planner,
            storage: StorageLatch::new(threshold, cfg.sweep.velocity),
            sensor: SensorLatch::new(),
            stats,
            phase: SweepPhase::Idle,
            fill_ratio: cfg.sweep.fill_ratio,
        })
    }

    /// Current sweep phase.
    #[inline]
    pub fn phase(&self) -> SweepPhase {
        self.phase
    }

    /// Traversal counters.
    #[inline]
    pub fn stats(&self) -> SweepStats {
        self.stats.get()
    }

    /// Current storage pause threshold.
    #[inline]
    pub fn storage_threshold(&self) -> f64 {
        self.storage.threshold()
    }

    /// One host tick. `argument` carries the command or signal text
    /// when the matching reason bit is set, and is ignored otherwise.
    ///
    /// On a step failure the tool is forced off, all queued work is
    /// dropped, and the controller parks in `Faulted`; every later
    /// tick is then a no-op.
    pub fn handle_tick(
        &mut self,
        argument: &str,
        reasons: TickReasons,
    ) -> Result<TickOutcome, SweepError> {
        if self.phase == SweepPhase::Faulted {
            return Ok(TickOutcome::IDLE);
        }

        if reasons.contains(TickReasons::COMMAND) {
            self.dispatch_command(argument);
            return Ok(TickOutcome {
                resume: self.scheduler.resume_requested(),
            });
        }

        if reasons.contains(TickReasons::SIGNAL) {
            self.dispatch_signal(argument);
            return Ok(TickOutcome {
                resume: self.scheduler.resume_requested(),
            });
        }

        self.storage.poll(&mut self.rig);
        self.sensor.poll(&mut self.rig);
        if self.sensor.is_active() {
            // Full stop: no sweep work until the detection clears.
            return Ok(TickOutcome::IDLE);
        }

        match self.advance_sweep() {
            Ok(performed) => Ok(TickOutcome { resume: performed }),
            Err(e) => {
                error!(error = %e, "sweep fault, halting in last safe state");
                self.rig.latch_tool(false);
                self.scheduler.clear();
                self.phase = SweepPhase::Faulted;
                Err(e)
            }
        }
    }

    /// Plan the next phase when idle, then perform one unit of work.
    fn advance_sweep(&mut self) -> Result<bool, SweepError> {
        if self.scheduler.is_idle() && self.phase != SweepPhase::Finished {
            if let Some((phase, sequence)) = self.planner.plan_next(&self.rig) {
                debug!(from = ?self.phase, to = ?phase, "sweep phase transition");
                self.phase = phase;
                self.scheduler.append(sequence);
            } else if self.phase != SweepPhase::Scanning {
                // Setup or a cell step just finished; Y is mid-travel.
                self.phase = SweepPhase::Scanning;
            }
        }
        self.scheduler.advance(&mut self.rig)
    }

    fn dispatch_command(&mut self, argument: &str) {
        match argument.trim() {
            CMD_RECALCULATE => {
                let (capacity, _) = self.rig.storage_totals();
                let threshold = capacity * self.fill_ratio;
                self.storage.set_threshold(threshold);
                info!(capacity, threshold, "storage threshold recomputed");
            }
            other => warn!(command = other, "unknown command ignored"),
        }
    }

    fn dispatch_signal(&mut self, argument: &str) {
        match argument.trim() {
            SIG_DETECTED => self.sensor.force(&mut self.rig, true),
            SIG_CLEARED => self.sensor.force(&mut self.rig, false),
            other => warn!(signal = other, "unknown signal ignored"),
        }
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("phase", &self.phase)
            .field("stats", &self.stats.get())
            .field("storage", &self.storage)
            .field("sensor", &self.sensor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_common::group::Axis;
    use gantry_common::sim::SimHarness;

    use crate::config::{build_sim_rig, SweepConfig};

    fn controller() -> (Controller, SimHarness) {
        let cfg = SweepConfig::default();
        let (rig, harness) = build_sim_rig(&cfg);
        (Controller::new(rig, &cfg).unwrap(), harness)
    }

    /// One periodic host tick: controller work, then physics.
    fn tick(ctl: &mut Controller, harness: &SimHarness) -> TickOutcome {
        let out = ctl.handle_tick("", TickReasons::PERIODIC).unwrap();
        harness.tick();
        out
    }

    #[test]
    fn construction_requires_storage_capacity() {
        let cfg = SweepConfig::default();
        let (rig, harness) = build_sim_rig(&cfg);
        harness.bay.set_stored(0.0);
        // Shrink the bay to zero capacity via a fresh config.
        let mut zero = SweepConfig::default();
        zero.storage.capacity = 0.0;
        let (rig_zero, _h) = build_sim_rig(&zero);
        assert!(matches!(
            Controller::new(rig_zero, &zero),
            Err(ConfigError::NoStorage)
        ));
        // Sanity: the non-zero rig constructs.
        assert!(Controller::new(rig, &cfg).is_ok());
    }

    #[test]
    fn setup_runs_to_scanning() {
        let (mut ctl, harness) = controller();
        assert_eq!(ctl.phase(), SweepPhase::Idle);

        for _ in 0..200 {
            tick(&mut ctl, &harness);
            if ctl.phase() == SweepPhase::Scanning {
                break;
            }
        }
        assert_eq!(ctl.phase(), SweepPhase::Scanning);
        assert_eq!(ctl.stats().scan_passes, 1);
        assert!(harness.tool.is_enabled());
        // Z parked extended, X parked retracted.
        assert_eq!(harness.actuators()[Axis::Z.index()].snapshot().position, 10.0);
        assert_eq!(harness.actuators()[Axis::X.index()].snapshot().position, 0.0);
    }

    #[test]
    fn recalculate_command_recomputes_threshold() {
        let (mut ctl, _harness) = controller();
        let before = ctl.storage_threshold();
        let out = ctl
            .handle_tick("recalculate", TickReasons::COMMAND)
            .unwrap();
        // Same capacity, same ratio: value unchanged but recomputed.
        assert_eq!(ctl.storage_threshold(), before);
        // No sweep work happened on the command tick.
        assert!(!out.resume);
    }

    #[test]
    fn unknown_command_changes_nothing() {
        let (mut ctl, harness) = controller();
        let before_phase = ctl.phase();
        let before = harness.actuators()[Axis::Y.index()].snapshot();
        ctl.handle_tick("selfdestruct", TickReasons::COMMAND).unwrap();
        assert_eq!(ctl.phase(), before_phase);
        assert_eq!(harness.actuators()[Axis::Y.index()].snapshot(), before);
    }

    #[test]
    fn signal_forces_sensor_latch_transitions() {
        let (mut ctl, harness) = controller();
        // Run setup into the scan so motion is underway.
        for _ in 0..200 {
            tick(&mut ctl, &harness);
            if ctl.phase() == SweepPhase::Scanning {
                break;
            }
        }

        ctl.handle_tick("detected", TickReasons::SIGNAL).unwrap();
        let y_before = harness.actuators()[Axis::Y.index()].snapshot().position;
        for _ in 0..10 {
            tick(&mut ctl, &harness);
        }
        // No motion while latched; tool forced on.
        let y_after = harness.actuators()[Axis::Y.index()].snapshot().position;
        assert_eq!(y_before, y_after);
        assert!(harness.tool.is_enabled());

        ctl.handle_tick("cleared", TickReasons::SIGNAL).unwrap();
        tick(&mut ctl, &harness);
        tick(&mut ctl, &harness);
        assert!(harness.actuators()[Axis::Y.index()].snapshot().position > y_after);
    }

    #[test]
    fn device_fault_parks_the_controller() {
        let (mut ctl, harness) = controller();
        tick(&mut ctl, &harness);
        // Force an impossible position; the next wait step trips on it.
        harness.actuators()[Axis::Y.index()].set_position(99.0);

        let mut faulted = false;
        for _ in 0..10 {
            if ctl.handle_tick("", TickReasons::PERIODIC).is_err() {
                faulted = true;
                break;
            }
            harness.tick();
        }
        assert!(faulted);
        assert_eq!(ctl.phase(), SweepPhase::Faulted);
        assert!(!harness.tool.is_enabled());
        // Later ticks are no-ops.
        let out = ctl.handle_tick("", TickReasons::PERIODIC).unwrap();
        assert!(!out.resume);
    }
}
