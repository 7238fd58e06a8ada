//! Device assembly: Raspberry Pi backends with the `hardware` feature on
//! Linux, simulators otherwise.

use eyre::Result;
use froth_config::Config;
use froth_traits::{Camera, DigitalInput, PwmOutput};

pub struct Devices {
    pub camera: Box<dyn Camera + Send>,
    pub pwm: Box<dyn PwmOutput + Send>,
    /// Present only when the E-stop is enabled.
    pub estop: Option<Box<dyn DigitalInput + Send>>,
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn open(cfg: &Config) -> Result<Devices> {
    use eyre::WrapErr;
    use froth_hardware::rpi::{PwmPins, RpiEstop, RpiPwm, RpicamCamera};

    let p = &cfg.pins;
    let pwm = RpiPwm::new(
        PwmPins {
            pump: p.pump,
            agitator: p.agitator,
            air: p.air,
            feed: p.feed,
        },
        f64::from(cfg.pwm.frequency_hz),
    )
    .wrap_err("open pwm pins")?;
    let estop = if cfg.estop.enabled {
        let input = RpiEstop::new(p.estop).wrap_err("open estop pin")?;
        Some(Box::new(input) as Box<dyn DigitalInput + Send>)
    } else {
        None
    };
    let camera = RpicamCamera::new(
        cfg.camera.device,
        cfg.camera.width,
        cfg.camera.height,
        cfg.camera.fps,
    );
    tracing::info!("hardware backends selected");
    Ok(Devices {
        camera: Box::new(camera),
        pwm: Box::new(pwm),
        estop,
    })
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub fn open(cfg: &Config) -> Result<Devices> {
    use froth_hardware::{SimulatedCamera, SimulatedEstop, SimulatedPwm};

    let mut camera = SimulatedCamera::new(cfg.camera.width, cfg.camera.height);
    // Test hook: steer the synthetic bubble count.
    if let Some(n) = std::env::var("FROTH_SIM_BUBBLES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
    {
        camera = camera.with_bubbles(n);
    }
    let estop = cfg
        .estop
        .enabled
        .then(|| Box::new(SimulatedEstop::new()) as Box<dyn DigitalInput + Send>);
    tracing::warn!("SIMULATION MODE: no hardware feature, using simulated devices");
    Ok(Devices {
        camera: Box::new(camera),
        pwm: Box::new(SimulatedPwm::new()),
        estop,
    })
}
