#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the froth controller.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Every section is optional; omitted sections take the plant defaults.
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CameraCfg {
    /// Sensor index passed to `rpicam-vid --camera` (ignored by the simulator)
    pub device: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Open attempts per acquisition before the cycle is dropped
    pub retries: u32,
    /// Delay between open attempts (ms)
    pub retry_delay_ms: u64,
}

impl Default for CameraCfg {
    fn default() -> Self {
        Self {
            device: 0,
            width: 640,
            height: 480,
            fps: 10,
            retries: 5,
            retry_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct VisionCfg {
    /// Gaussian kernel size in px (odd; 1 disables blur)
    pub blur_kernel: u32,
    /// Radius of the opening/closing structuring element (0 = single pixel)
    pub morph_radius: u8,
    pub opening_iterations: u8,
    pub closing_iterations: u8,
    /// Minimum accepted contour area (px²)
    pub min_bubble_area: f64,
    /// Sure-foreground cut as a fraction of the distance-transform maximum
    pub distance_threshold: f64,
    /// Minimum accepted 4π·area/perimeter²
    pub circularity_threshold: f64,
    /// Radius of the sure-background dilation element
    pub background_radius: u8,
    pub background_dilations: u8,
}

impl Default for VisionCfg {
    fn default() -> Self {
        Self {
            blur_kernel: 1,
            morph_radius: 0,
            opening_iterations: 2,
            closing_iterations: 4,
            min_bubble_area: 80.0,
            distance_threshold: 0.125,
            circularity_threshold: 0.45,
            background_radius: 0,
            background_dilations: 3,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AnalysisCfg {
    /// Stability history depth (frames)
    pub history_size: usize,
}

impl Default for AnalysisCfg {
    fn default() -> Self {
        Self { history_size: 10 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlCfg {
    pub kp: f64,
    pub ki: f64,
    /// Target bubble count for AUTO mode
    pub setpoint: f64,
    /// Ceiling for pump duty in both modes (%)
    pub max_pump_duty: f64,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            kp: 0.5,
            ki: 0.05,
            setpoint: 120.0,
            max_pump_duty: 80.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pins {
    pub pump: u8,
    pub agitator: u8,
    pub air: u8,
    pub feed: u8,
    pub estop: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            pump: 12,
            agitator: 13,
            air: 14,
            feed: 15,
            estop: 22,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PwmCfg {
    pub frequency_hz: u32,
}

impl Default for PwmCfg {
    fn default() -> Self {
        Self { frequency_hz: 1000 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EstopCfg {
    /// Poll the E-stop input at all
    pub enabled: bool,
    /// Treat low level as pressed when true
    pub active_low: bool,
}

impl Default for EstopCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            active_low: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TimingCfg {
    /// Metrics production rate (frames analyzed per second)
    pub metrics_hz: f64,
    /// Control loop rate (interlock polls per second)
    pub control_hz: f64,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            metrics_hz: 2.0,
            control_hz: 1.0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub camera: CameraCfg,
    pub vision: VisionCfg,
    pub analysis: AnalysisCfg,
    pub control: ControlCfg,
    pub pins: Pins,
    pub pwm: PwmCfg,
    pub estop: EstopCfg,
    pub timing: TimingCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

fn in_unit(v: f64) -> bool {
    v.is_finite() && (0.0..=1.0).contains(&v)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Camera
        if self.camera.width == 0 || self.camera.height == 0 {
            eyre::bail!("camera.width and camera.height must be > 0");
        }
        if self.camera.fps == 0 {
            eyre::bail!("camera.fps must be > 0");
        }
        if self.camera.retries == 0 {
            eyre::bail!("camera.retries must be >= 1");
        }
        if self.camera.retry_delay_ms > 60_000 {
            eyre::bail!("camera.retry_delay_ms is unreasonably large (>60s)");
        }

        // Vision
        if self.vision.blur_kernel == 0 || self.vision.blur_kernel.is_multiple_of(2) {
            eyre::bail!("vision.blur_kernel must be a positive odd number");
        }
        if !(self.vision.min_bubble_area.is_finite() && self.vision.min_bubble_area >= 0.0) {
            eyre::bail!("vision.min_bubble_area must be >= 0");
        }
        if !in_unit(self.vision.distance_threshold) || self.vision.distance_threshold == 0.0 {
            eyre::bail!("vision.distance_threshold must be in (0.0, 1.0]");
        }
        if !in_unit(self.vision.circularity_threshold) {
            eyre::bail!("vision.circularity_threshold must be in [0.0, 1.0]");
        }

        // Analysis
        if self.analysis.history_size < 3 {
            eyre::bail!("analysis.history_size must be >= 3");
        }

        // Control
        if !(self.control.kp.is_finite() && self.control.kp >= 0.0) {
            eyre::bail!("control.kp must be >= 0");
        }
        if !(self.control.ki.is_finite() && self.control.ki >= 0.0) {
            eyre::bail!("control.ki must be >= 0");
        }
        if !(self.control.setpoint.is_finite() && self.control.setpoint >= 0.0) {
            eyre::bail!("control.setpoint must be >= 0");
        }
        if !(self.control.max_pump_duty.is_finite()
            && (0.0..=100.0).contains(&self.control.max_pump_duty))
        {
            eyre::bail!("control.max_pump_duty must be in [0.0, 100.0]");
        }

        // Pins
        let p = &self.pins;
        let all = [p.pump, p.agitator, p.air, p.feed, p.estop];
        for (i, a) in all.iter().enumerate() {
            if *a > 27 {
                eyre::bail!("pins: BCM pin {a} is out of range (0..=27)");
            }
            if all[i + 1..].contains(a) {
                eyre::bail!("pins: BCM pin {a} is assigned twice");
            }
        }

        // PWM
        if self.pwm.frequency_hz == 0 {
            eyre::bail!("pwm.frequency_hz must be > 0");
        }

        // Timing
        if !(self.timing.metrics_hz.is_finite() && self.timing.metrics_hz > 0.0) {
            eyre::bail!("timing.metrics_hz must be > 0");
        }
        if !(self.timing.control_hz.is_finite() && self.timing.control_hz > 0.0) {
            eyre::bail!("timing.control_hz must be > 0");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
