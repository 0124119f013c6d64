//! End-to-end sweep runs against the simulated rig.
//!
//! Each test drives the real host loop: one `handle_tick` then one
//! physics tick, repeated, exactly as the binary does.

use gantry_common::group::Axis;
use gantry_common::sim::SimHarness;
use gantry_common::tick::TickReasons;
use gantry_controller::config::{build_sim_rig, SweepConfig};
use gantry_controller::controller::Controller;
use gantry_controller::sweep::SweepPhase;

fn fixture(travel: f64, cell_width: f64) -> (Controller, SimHarness) {
    let mut cfg = SweepConfig::default();
    cfg.sweep.cell_width = cell_width;
    cfg.groups.x.highest = travel;
    cfg.groups.y.highest = travel;
    cfg.groups.z.highest = travel;
    let (rig, harness) = build_sim_rig(&cfg);
    (Controller::new(rig, &cfg).unwrap(), harness)
}

/// Drive the host loop for up to `max_ticks`. Returns true once the
/// sweep reports `Finished` with no continuation pending.
fn drive(ctl: &mut Controller, harness: &SimHarness, max_ticks: u64) -> bool {
    let mut resume = false;
    for _ in 0..max_ticks {
        let reasons = if resume {
            TickReasons::PERIODIC | TickReasons::CONTINUATION
        } else {
            TickReasons::PERIODIC
        };
        let out = ctl.handle_tick("", reasons).unwrap();
        harness.tick();
        resume = out.resume;
        if ctl.phase() == SweepPhase::Finished && !resume {
            return true;
        }
    }
    false
}

fn position(harness: &SimHarness, axis: Axis) -> f64 {
    harness.actuators()[axis.index()].snapshot().position
}

fn run_until_scanning(ctl: &mut Controller, harness: &SimHarness) {
    for _ in 0..500 {
        ctl.handle_tick("", TickReasons::PERIODIC).unwrap();
        harness.tick();
        if ctl.phase() == SweepPhase::Scanning {
            return;
        }
    }
    panic!("setup never reached the scanning phase");
}

#[test]
fn full_sweep_finishes_with_tool_and_sensor_off() {
    // Travel [0, 10], cell 2.5: five columns, five rows per column.
    let (mut ctl, harness) = fixture(10.0, 2.5);
    assert!(drive(&mut ctl, &harness, 20_000), "sweep did not finish");

    let stats = ctl.stats();
    assert_eq!(stats.x_steps, 4);
    assert_eq!(stats.z_steps, 20);
    assert_eq!(stats.scan_passes, 25);
    assert!(!harness.tool.is_enabled());
    assert!(!harness.sensor.is_enabled());
    // Y parked retracted by the final sequence.
    assert_eq!(position(&harness, Axis::Y), 0.0);
}

#[test]
fn raster_visits_every_cell_once_in_row_major_order() {
    // Travel [0, 5], cell 2.5: a 3 x 3 grid of scan columns.
    let (mut ctl, harness) = fixture(5.0, 2.5);

    let mut visited: Vec<(f64, f64)> = Vec::new();
    let mut passes = 0;
    let mut resume = false;
    for _ in 0..10_000 {
        let reasons = if resume {
            TickReasons::PERIODIC | TickReasons::CONTINUATION
        } else {
            TickReasons::PERIODIC
        };
        let out = ctl.handle_tick("", reasons).unwrap();
        let stats = ctl.stats();
        if stats.scan_passes > passes {
            passes = stats.scan_passes;
            // The working limits at scan start name the (X, Z) cell.
            let x = harness.actuators()[Axis::X.index()].snapshot().max_limit;
            let z = harness.actuators()[Axis::Z.index()].snapshot().min_limit;
            visited.push((x, z));
        }
        harness.tick();
        resume = out.resume;
        if ctl.phase() == SweepPhase::Finished && !resume {
            break;
        }
    }

    let expected = vec![
        (0.0, 5.0),
        (0.0, 2.5),
        (0.0, 0.0),
        (2.5, 5.0),
        (2.5, 2.5),
        (2.5, 0.0),
        (5.0, 5.0),
        (5.0, 2.5),
        (5.0, 0.0),
    ];
    assert_eq!(visited, expected);
}

#[test]
fn at_most_one_axis_moves_per_tick() {
    let (mut ctl, harness) = fixture(5.0, 2.5);

    let mut prev = [0.0f64; 3];
    let mut resume = false;
    for _ in 0..10_000 {
        let reasons = if resume {
            TickReasons::PERIODIC | TickReasons::CONTINUATION
        } else {
            TickReasons::PERIODIC
        };
        let out = ctl.handle_tick("", reasons).unwrap();
        harness.tick();
        resume = out.resume;

        let current = [
            position(&harness, Axis::X),
            position(&harness, Axis::Y),
            position(&harness, Axis::Z),
        ];
        let moved = current
            .iter()
            .zip(prev.iter())
            .filter(|(a, b)| (**a - **b).abs() > 1e-9)
            .count();
        assert!(moved <= 1, "multiple axes moved in one tick: {current:?}");
        prev = current;

        if ctl.phase() == SweepPhase::Finished && !resume {
            return;
        }
    }
    panic!("sweep did not finish");
}

#[test]
fn storage_pause_suspends_and_resumes_the_scan() {
    let (mut ctl, harness) = fixture(10.0, 2.5);
    run_until_scanning(&mut ctl, &harness);

    // Fill past the 90% threshold mid-scan.
    harness.bay.set_stored(95.0);
    ctl.handle_tick("", TickReasons::PERIODIC).unwrap();
    harness.tick();

    let frozen = position(&harness, Axis::Y);
    for _ in 0..20 {
        ctl.handle_tick("", TickReasons::PERIODIC).unwrap();
        harness.tick();
    }
    assert_eq!(position(&harness, Axis::Y), frozen);
    assert!(!harness.tool.is_enabled());

    // Drain the bay: scan resumes where it paused and the whole sweep
    // still completes.
    harness.bay.set_stored(10.0);
    assert!(drive(&mut ctl, &harness, 20_000));
    assert_eq!(ctl.stats().scan_passes, 25);
}

#[test]
fn sensor_detection_stops_all_motion_until_cleared() {
    let (mut ctl, harness) = fixture(10.0, 2.5);
    run_until_scanning(&mut ctl, &harness);

    harness.sensor.set_detected(true);
    ctl.handle_tick("", TickReasons::PERIODIC).unwrap();
    harness.tick();

    let frozen = [
        position(&harness, Axis::X),
        position(&harness, Axis::Y),
        position(&harness, Axis::Z),
    ];
    for _ in 0..20 {
        ctl.handle_tick("", TickReasons::PERIODIC).unwrap();
        harness.tick();
    }
    assert_eq!(position(&harness, Axis::X), frozen[0]);
    assert_eq!(position(&harness, Axis::Y), frozen[1]);
    assert_eq!(position(&harness, Axis::Z), frozen[2]);
    // The tool is forced on while the latch holds.
    assert!(harness.tool.is_enabled());

    harness.sensor.set_detected(false);
    assert!(drive(&mut ctl, &harness, 20_000));
    assert!(!harness.tool.is_enabled());
}

#[test]
fn signal_path_drives_the_sensor_latch_without_hardware_detection() {
    let (mut ctl, harness) = fixture(10.0, 2.5);
    run_until_scanning(&mut ctl, &harness);

    ctl.handle_tick("detected", TickReasons::SIGNAL).unwrap();
    let frozen = position(&harness, Axis::Y);
    for _ in 0..10 {
        ctl.handle_tick("", TickReasons::PERIODIC).unwrap();
        harness.tick();
    }
    assert_eq!(position(&harness, Axis::Y), frozen);

    ctl.handle_tick("cleared", TickReasons::SIGNAL).unwrap();
    assert!(drive(&mut ctl, &harness, 20_000));
}
