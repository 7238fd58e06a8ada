//! System start/shutdown behavior with simulated devices.
//!
//! Verifies that:
//! - Both periodic tasks start and publish metrics
//! - Shutdown joins the tasks, zeroes actuators and releases every device
//! - Shutdown is idempotent and the system cannot be restarted afterwards
//! - A camera stuck in its retry delay does not hold the pump on during shutdown

use std::time::{Duration, Instant};

use froth_core::{CaptureCfg, Cycle, InterlockCfg, LoopCfg, PiUpdate, System};
use froth_hardware::{CameraProbe, PwmProbe, SimulatedCamera, SimulatedEstop, SimulatedPwm};
use froth_traits::Channel;

fn system(hz: f64) -> (System, CameraProbe, PwmProbe) {
    let cam = SimulatedCamera::new(160, 120).with_bubbles(6);
    let cam_probe = cam.probe();
    let pwm = SimulatedPwm::new();
    let pwm_probe = pwm.probe();
    let sys = System::builder()
        .with_camera(cam)
        .with_pwm(pwm)
        .with_estop(SimulatedEstop::new())
        .with_interlock(InterlockCfg::default())
        .with_capture(CaptureCfg {
            retries: 1,
            retry_delay: Duration::ZERO,
        })
        .with_loops(LoopCfg {
            metrics_hz: hz,
            control_hz: hz,
        })
        .build()
        .expect("build");
    (sys, cam_probe, pwm_probe)
}

#[test]
fn metrics_unavailable_before_first_frame() {
    let (sys, _, _) = system(1.0);
    let m = sys.metrics();
    assert!(!m.available);
    assert_eq!(m.bubble_count, 0);
    assert!(!sys.status().running);
}

#[test]
fn manual_cycle_publishes_metrics() {
    let (sys, _, _) = system(1.0);
    let Cycle::Published(m) = sys.run_metrics_once() else {
        panic!("frame dropped");
    };
    assert!((5..=7).contains(&m.bubble_count), "{m:?}");
    assert_eq!(sys.metrics(), m);
}

#[test]
fn tasks_publish_and_shutdown_releases_devices() {
    let (sys, cam, pwm) = system(50.0);
    sys.start().expect("start");
    sys.start().expect("second start is a no-op");
    assert!(sys.status().running);

    let deadline = Instant::now() + Duration::from_secs(10);
    while !sys.metrics().available {
        assert!(Instant::now() < deadline, "no metrics published");
        std::thread::sleep(Duration::from_millis(10));
    }
    sys.set_motor("air", 40.0).expect("motor");
    assert_eq!(pwm.duty(Channel::Air), 40.0);

    sys.shutdown();
    sys.shutdown();
    let st = sys.status();
    assert!(!st.running);
    assert!(!st.initialized);
    assert!(pwm.released());
    assert_eq!(pwm.duty(Channel::Air), 0.0);
    assert!(!cam.is_open());
    assert!(sys.start().is_err());
}

#[test]
fn api_validates_before_hardware() {
    let (sys, _, pwm) = system(1.0);
    let writes = pwm.writes();
    assert!(sys.set_mode("turbo").is_err());
    assert!(sys.set_motor("pump", 10.0).is_err());
    assert!(
        sys.set_parameters(PiUpdate {
            kp: Some(-1.0),
            ..PiUpdate::default()
        })
        .is_err()
    );
    assert_eq!(pwm.writes(), writes);
    sys.set_mode("auto").expect("auto");
    assert_eq!(sys.status().pump_mode.as_str(), "auto");
}

#[test]
fn emergency_stop_all_zeroes_without_mode_change() {
    let (sys, _, pwm) = system(1.0);
    sys.set_speed(50.0).expect("manual duty");
    sys.set_motor("feed", 25.0).expect("motor");
    sys.emergency_stop_all();
    let st = sys.status();
    assert_eq!(st.pump_duty, 0.0);
    assert_eq!(st.motors.feed, 0.0);
    assert_eq!(st.pump_mode.as_str(), "manual");
    assert_eq!(pwm.duty(Channel::Pump), 0.0);
}

#[test]
fn shutdown_during_camera_retries_zeroes_pump_at_once() {
    let cam = SimulatedCamera::new(160, 120);
    let cam_probe = cam.probe();
    cam_probe.fail_opens(1000);
    let pwm = SimulatedPwm::new();
    let pwm_probe = pwm.probe();
    let sys = System::builder()
        .with_camera(cam)
        .with_pwm(pwm)
        .with_estop(SimulatedEstop::new())
        .with_capture(CaptureCfg {
            retries: 5,
            retry_delay: Duration::from_millis(2000),
        })
        .build()
        .expect("build");

    sys.set_speed(50.0).expect("manual duty");
    sys.start().expect("start");
    let deadline = Instant::now() + Duration::from_secs(10);
    while cam_probe.opens() == 0 {
        assert!(Instant::now() < deadline, "camera never attempted");
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(pwm_probe.duty(Channel::Pump), 50.0);

    let t0 = Instant::now();
    sys.shutdown();
    let took = t0.elapsed();
    assert!(took < Duration::from_millis(1000), "shutdown took {took:?}");
    assert_eq!(pwm_probe.duty(Channel::Pump), 0.0);
    assert!(pwm_probe.released());
    assert!(cam_probe.opens() < 5, "retries continued after shutdown");
    assert!(!sys.status().running);
}
