//! Runtime configuration for the froth core.
//!
//! These are the structs the detector, analyzer and controllers consume.
//! They are separate from the TOML-deserialized config in `froth_config`.

use std::time::Duration;

/// Bubble detector tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorCfg {
    /// Gaussian kernel size in px (odd; 1 disables blur).
    pub blur_kernel: u32,
    /// Radius of the opening/closing structuring element (0 = single pixel).
    pub morph_radius: u8,
    pub opening_iterations: u8,
    pub closing_iterations: u8,
    /// Contours smaller than this (px²) are rejected.
    pub min_bubble_area: f64,
    /// Sure-foreground cut as a fraction of the distance-transform maximum.
    pub distance_threshold: f64,
    /// Contours with `4π·area/perimeter²` below this are rejected.
    pub circularity_threshold: f64,
    pub background_radius: u8,
    pub background_dilations: u8,
}

impl Default for DetectorCfg {
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

/// Stability analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerCfg {
    pub history_size: usize,
}

impl Default for AnalyzerCfg {
    fn default() -> Self {
        Self { history_size: 10 }
    }
}

/// PI gains and pump limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PumpCfg {
    pub kp: f64,
    pub ki: f64,
    /// Target bubble count in AUTO.
    pub setpoint: f64,
    /// Duty ceiling (%) applied in both modes.
    pub max_pump_duty: f64,
}

impl Default for PumpCfg {
    fn default() -> Self {
        Self {
            kp: 0.5,
            ki: 0.05,
            setpoint: 120.0,
            max_pump_duty: 80.0,
        }
    }
}

/// Camera acquisition policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureCfg {
    /// Open attempts per acquisition (>= 1).
    pub retries: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
}

impl Default for CaptureCfg {
    fn default() -> Self {
        Self {
            retries: 5,
            retry_delay: Duration::from_millis(2000),
        }
    }
}

/// E-stop input interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterlockCfg {
    pub enabled: bool,
    /// Pressed reads as logic low when true.
    pub active_low: bool,
}

impl Default for InterlockCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            active_low: true,
        }
    }
}

/// Cadences of the two periodic tasks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopCfg {
    pub metrics_hz: f64,
    pub control_hz: f64,
}

impl Default for LoopCfg {
    fn default() -> Self {
        Self {
            metrics_hz: 2.0,
            control_hz: 1.0,
        }
    }
}
