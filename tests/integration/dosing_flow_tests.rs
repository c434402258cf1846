//! End-to-end dosing flows: scheduled runs fired through the job table
//! and fire-and-forget calibration doses.

use std::time::{Duration, Instant};

use reefdose::pump::{CalibrationDetails, CalibrationResult};

use super::service_tests::{rig, steps_pump, time_pump};

#[test]
fn scheduled_run_doses_and_records_usage() {
    let r = rig();
    let pump = r.service.create(time_pump(true)).unwrap();

    r.scheduler.fire_all();

    // 10 volume units at 5 units/sec: pin 2 energized at 5.0, held for
    // 2 seconds, then zeroed.
    let calls = r.jack.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], ("J1".to_string(), vec![(2, 5.0)]));
    assert_eq!(calls[1], ("J1".to_string(), vec![(2, 0.0)]));
    assert_eq!(r.clock.slept(), vec![Duration::from_secs(2)]);

    let updates = r.telemetry.updates.lock();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, pump.id);
    assert!((updates[0].1.volume - 10.0).abs() < 1e-9);
}

#[test]
fn calibrated_pump_doses_adjusted_volume_but_logs_configured() {
    let r = rig();
    let mut pump = time_pump(true);
    pump.calibration = Some(CalibrationResult {
        details: CalibrationDetails { volume: 8.0 },
        measured_volume: 4.0,
    });
    r.service.create(pump).unwrap();

    r.scheduler.fire_all();

    // Corrected volume 20 at 5 units/sec = 4 seconds energized.
    assert_eq!(r.clock.slept(), vec![Duration::from_secs(4)]);
    // Usage still records the configured target.
    let updates = r.telemetry.updates.lock();
    assert!((updates[0].1.volume - 10.0).abs() < 1e-9);
}

#[test]
fn scheduled_steps_run_commands_the_stepper() {
    use super::mock_hw::StepperCall;

    let r = rig();
    r.service.create(steps_pump(true)).unwrap();

    r.scheduler.fire_all();

    let calls = r.bank.stepper.calls.lock();
    assert_eq!(
        calls.as_slice(),
        &[
            StepperCall::SetAcceleration {
                device_id: 0,
                value: 50.0
            },
            StepperCall::SetSpeed {
                device_id: 0,
                value: 200.0
            },
            StepperCall::Step {
                device_id: 0,
                steps: 6
            },
        ]
    );
}

#[test]
fn deleted_pump_no_longer_fires() {
    let r = rig();
    let pump = r.service.create(time_pump(true)).unwrap();
    r.service.delete(&pump.id).unwrap();

    r.scheduler.fire_all();

    assert!(r.jack.calls().is_empty());
    assert!(r.telemetry.updates.lock().is_empty());
}

#[test]
fn calibrate_doses_requested_volume_asynchronously() {
    let r = rig();
    let pump = r.service.create(time_pump(false)).unwrap();

    r.service
        .calibrate(&pump.id, CalibrationDetails { volume: 15.0 })
        .unwrap();

    // The dose runs on a detached thread; wait for it to land.
    let deadline = Instant::now() + Duration::from_secs(5);
    while r.jack.calls().len() < 2 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }

    // 15 volume units at 5 units/sec = 3 seconds energized.
    let calls = r.jack.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], ("J1".to_string(), vec![(2, 5.0)]));
    assert_eq!(r.clock.slept(), vec![Duration::from_secs(3)]);

    // A calibration run is not a scheduled dose: no usage record.
    assert!(r.telemetry.updates.lock().is_empty());
}

#[test]
fn calibrate_unknown_pump_fails_synchronously() {
    use reefdose::DoserError;

    let r = rig();
    let err = r
        .service
        .calibrate("42", CalibrationDetails { volume: 5.0 })
        .unwrap_err();
    assert!(matches!(err, DoserError::NotFound(_)));
    assert!(r.jack.calls().is_empty());
}
