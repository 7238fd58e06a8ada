//! Device backends for the froth controller.
//!
//! Simulators are always available; the Raspberry Pi backends are compiled
//! with the `hardware` feature on Linux.
pub mod error;
pub mod sim;
pub mod util;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod rpi;

pub use sim::{
    CameraProbe, EstopSwitch, PwmProbe, SimulatedCamera, SimulatedEstop, SimulatedPwm,
    render_froth,
};

#[cfg(test)]
mod tests {
    use super::*;
    use froth_traits::{Camera, Channel, DigitalInput, PwmOutput};

    #[test]
    fn simulated_camera_needs_open_before_read() {
        let mut cam = SimulatedCamera::new(64, 48).with_bubbles(2);
        assert!(cam.read().is_err());
        cam.open().unwrap();
        let frame = cam.read().unwrap();
        assert_eq!(frame.dimensions(), (64, 48));
        cam.release();
        cam.release();
        assert!(!cam.is_open());
    }

    #[test]
    fn simulated_pwm_records_last_duty() {
        let mut pwm = SimulatedPwm::new();
        let probe = pwm.probe();
        pwm.set_duty(Channel::Air, 40.0).unwrap();
        pwm.set_duty(Channel::Air, 75.0).unwrap();
        assert_eq!(probe.duty(Channel::Air), 75.0);
        assert_eq!(probe.duty(Channel::Feed), 0.0);
        assert_eq!(probe.writes(), 2);
    }

    #[test]
    fn simulated_estop_is_active_low() {
        let mut estop = SimulatedEstop::new();
        let switch = estop.switch();
        assert_eq!(estop.read_bit().unwrap(), 1);
        switch.press();
        assert_eq!(estop.read_bit().unwrap(), 0);
    }
}
