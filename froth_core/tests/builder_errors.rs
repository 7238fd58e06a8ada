use froth_core::error::BuildError;
use froth_core::{InterlockCfg, PumpCfg, System};
use froth_hardware::{SimulatedCamera, SimulatedEstop, SimulatedPwm};
use rstest::rstest;

fn estop_off() -> InterlockCfg {
    InterlockCfg {
        enabled: false,
        active_low: true,
    }
}

#[rstest]
fn missing_camera_yields_typed_build_error() {
    let err = System::builder()
        .with_pwm(SimulatedPwm::new())
        .with_estop(SimulatedEstop::new())
        .build()
        .err();
    assert!(matches!(err, Some(BuildError::MissingCamera)), "got {err:?}");
}

#[rstest]
fn missing_pwm_yields_typed_build_error() {
    let err = System::builder()
        .with_camera(SimulatedCamera::new(32, 32))
        .with_estop(SimulatedEstop::new())
        .build()
        .err();
    assert!(matches!(err, Some(BuildError::MissingPwm)), "got {err:?}");
}

#[rstest]
fn enabled_estop_requires_an_input() {
    let err = System::builder()
        .with_camera(SimulatedCamera::new(32, 32))
        .with_pwm(SimulatedPwm::new())
        .build()
        .err();
    assert!(matches!(err, Some(BuildError::MissingEstop)), "got {err:?}");
}

#[rstest]
fn disabled_estop_builds_without_input() {
    let sys = System::builder()
        .with_camera(SimulatedCamera::new(32, 32))
        .with_pwm(SimulatedPwm::new())
        .with_interlock(estop_off())
        .build()
        .expect("build");
    assert!(!sys.status().estop_enabled);
}

#[rstest]
#[case(-1.0)]
#[case(120.0)]
fn rejects_out_of_range_pump_ceiling(#[case] max: f64) {
    let err = System::builder()
        .with_camera(SimulatedCamera::new(32, 32))
        .with_pwm(SimulatedPwm::new())
        .with_interlock(estop_off())
        .with_pump(PumpCfg {
            max_pump_duty: max,
            ..PumpCfg::default()
        })
        .build()
        .err();
    assert!(matches!(err, Some(BuildError::InvalidConfig(_))), "got {err:?}");
}
