use froth_config::load_toml;
use rstest::rstest;

const FULL: &str = r#"
[camera]
device = 0
width = 640
height = 480
fps = 10
retries = 5
retry_delay_ms = 2000

[vision]
blur_kernel = 1
morph_radius = 0
opening_iterations = 2
closing_iterations = 4
min_bubble_area = 80.0
distance_threshold = 0.125
circularity_threshold = 0.45
background_radius = 0
background_dilations = 3

[analysis]
history_size = 10

[control]
kp = 0.5
ki = 0.05
setpoint = 120
max_pump_duty = 80.0

[pins]
pump = 12
agitator = 13
air = 14
feed = 15
estop = 22

[pwm]
frequency_hz = 1000

[estop]
enabled = true
active_low = true

[timing]
metrics_hz = 2.0
control_hz = 1.0
"#;

#[test]
fn full_config_parses_and_validates() {
    let cfg = load_toml(FULL).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.control.setpoint, 120.0);
    assert_eq!(cfg.pins.estop, 22);
}

#[test]
fn empty_config_takes_plant_defaults() {
    let cfg = load_toml("").expect("parse empty TOML");
    cfg.validate().expect("defaults must validate");
    assert_eq!(cfg.camera.retries, 5);
    assert_eq!(cfg.vision.min_bubble_area, 80.0);
    assert_eq!(cfg.analysis.history_size, 10);
    assert_eq!(cfg.control.max_pump_duty, 80.0);
    assert_eq!(cfg.pwm.frequency_hz, 1000);
    assert!(cfg.estop.active_low);
}

#[rstest]
#[case("[control]\nkp = -0.1", "control.kp must be >= 0")]
#[case("[control]\nmax_pump_duty = 120.0", "control.max_pump_duty")]
#[case("[vision]\nblur_kernel = 4", "blur_kernel must be a positive odd number")]
#[case("[vision]\ndistance_threshold = 0.0", "distance_threshold")]
#[case("[vision]\ncircularity_threshold = 1.5", "circularity_threshold")]
#[case("[analysis]\nhistory_size = 2", "history_size must be >= 3")]
#[case("[camera]\nretries = 0", "camera.retries must be >= 1")]
#[case("[pins]\nair = 12", "assigned twice")]
#[case("[pins]\nfeed = 40", "out of range")]
#[case("[timing]\ncontrol_hz = 0.0", "timing.control_hz must be > 0")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation")]
fn rejects_out_of_range(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        err.to_string().contains(needle),
        "expected '{needle}' in '{err}'"
    );
}

#[test]
fn unknown_types_fail_to_parse() {
    assert!(load_toml("[control]\nkp = \"fast\"").is_err());
}
