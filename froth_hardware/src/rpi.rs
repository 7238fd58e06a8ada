//! Raspberry Pi backends: software PWM and E-stop input through `rppal`,
//! frames from an `rpicam-vid` subprocess streaming raw YUV420.

use std::collections::HashMap;
use std::io::{BufReader, Read};
use std::process::{Child, ChildStdout, Command, Stdio};

use froth_traits::{BoxError, Camera, Channel, DigitalInput, Frame, PwmOutput};
use rppal::gpio::{Gpio, InputPin, Level, OutputPin};
use tracing::{debug, info, warn};

use crate::error::{HwError, Result};
use crate::util::{rpicam_args, yuv420_frame_len, yuv420_to_rgb};

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

/// BCM pin assignment for the four PWM channels.
#[derive(Debug, Clone, Copy)]
pub struct PwmPins {
    pub pump: u8,
    pub agitator: u8,
    pub air: u8,
    pub feed: u8,
}

/// Software PWM on four GPIO lines at one fixed frequency.
pub struct RpiPwm {
    pins: HashMap<Channel, OutputPin>,
    frequency_hz: f64,
}

impl RpiPwm {
    /// Claim all four pins and start them at 0 % duty.
    pub fn new(pins: PwmPins, frequency_hz: f64) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let mut map = HashMap::new();
        for (channel, bcm) in [
            (Channel::Pump, pins.pump),
            (Channel::Agitator, pins.agitator),
            (Channel::Air, pins.air),
            (Channel::Feed, pins.feed),
        ] {
            let mut pin = gpio.get(bcm).map_err(gpio_err)?.into_output_low();
            pin.set_pwm_frequency(frequency_hz, 0.0).map_err(gpio_err)?;
            map.insert(channel, pin);
        }
        info!(frequency_hz, "pwm outputs claimed");
        Ok(Self {
            pins: map,
            frequency_hz,
        })
    }
}

impl PwmOutput for RpiPwm {
    fn set_duty(&mut self, channel: Channel, percent: f32) -> std::result::Result<(), BoxError> {
        let pin = self.pins.get_mut(&channel).ok_or(HwError::Released)?;
        let fraction = f64::from(percent.clamp(0.0, 100.0)) / 100.0;
        pin.set_pwm_frequency(self.frequency_hz, fraction)
            .map_err(|e| HwError::Pwm {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;
        debug!(%channel, percent, "pwm write");
        Ok(())
    }

    fn release(&mut self) {
        for (channel, mut pin) in self.pins.drain() {
            if let Err(e) = pin.clear_pwm() {
                warn!(%channel, error = %e, "clear_pwm failed during release");
            }
            pin.set_low();
        }
    }
}

/// E-stop input with the internal pull-up enabled.
pub struct RpiEstop {
    pin: InputPin,
}

impl RpiEstop {
    pub fn new(bcm: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let pin = gpio.get(bcm).map_err(gpio_err)?.into_input_pullup();
        info!(pin = bcm, "E-stop input claimed");
        Ok(Self { pin })
    }
}

impl DigitalInput for RpiEstop {
    fn read_bit(&mut self) -> std::result::Result<u8, BoxError> {
        Ok(match self.pin.read() {
            Level::Low => 0,
            Level::High => 1,
        })
    }
}

/// Camera backed by `rpicam-vid --codec yuv420 -o -`.
pub struct RpicamCamera {
    index: u32,
    width: u32,
    height: u32,
    fps: u32,
    child: Option<Child>,
    reader: Option<BufReader<ChildStdout>>,
    buf: Vec<u8>,
}

impl RpicamCamera {
    /// `index` selects the sensor (`rpicam-vid --camera`).
    pub fn new(index: u32, width: u32, height: u32, fps: u32) -> Self {
        Self {
            index,
            width,
            height,
            fps,
            child: None,
            reader: None,
            buf: vec![0; yuv420_frame_len(width, height)],
        }
    }
}

impl Camera for RpicamCamera {
    fn open(&mut self) -> std::result::Result<(), BoxError> {
        self.release();
        let mut child = Command::new("rpicam-vid")
            .args(rpicam_args(self.index, self.width, self.height, self.fps))
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| HwError::CameraUnavailable(format!("spawn rpicam-vid: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HwError::CameraUnavailable("rpicam-vid stdout not captured".into()))?;
        self.reader = Some(BufReader::new(stdout));
        self.child = Some(child);
        info!(
            camera = self.index,
            width = self.width,
            height = self.height,
            fps = self.fps,
            "rpicam-vid started"
        );
        Ok(())
    }

    fn read(&mut self) -> std::result::Result<Frame, BoxError> {
        let reader = self.reader.as_mut().ok_or(HwError::Released)?;
        reader
            .read_exact(&mut self.buf)
            .map_err(|e| HwError::CameraRead(e.to_string()))?;
        Ok(yuv420_to_rgb(&self.buf, self.width, self.height)?)
    }

    fn release(&mut self) {
        self.reader = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                debug!(error = %e, "rpicam-vid already exited");
            }
            let _ = child.wait();
            info!("rpicam-vid stopped");
        }
    }

    fn is_open(&self) -> bool {
        self.child.is_some()
    }
}

impl Drop for RpicamCamera {
    fn drop(&mut self) {
        self.release();
    }
}
