//! `From` implementations bridging `froth_config` types to `froth_core` types.

use std::time::Duration;

use crate::config::{AnalyzerCfg, CaptureCfg, DetectorCfg, InterlockCfg, LoopCfg, PumpCfg};

// ── DetectorCfg ──────────────────────────────────────────────────────────────

impl From<&froth_config::VisionCfg> for DetectorCfg {
    fn from(c: &froth_config::VisionCfg) -> Self {
        Self {
            blur_kernel: c.blur_kernel,
            morph_radius: c.morph_radius,
            opening_iterations: c.opening_iterations,
            closing_iterations: c.closing_iterations,
            min_bubble_area: c.min_bubble_area,
            distance_threshold: c.distance_threshold,
            circularity_threshold: c.circularity_threshold,
            background_radius: c.background_radius,
            background_dilations: c.background_dilations,
        }
    }
}

// ── AnalyzerCfg ──────────────────────────────────────────────────────────────

impl From<&froth_config::AnalysisCfg> for AnalyzerCfg {
    fn from(c: &froth_config::AnalysisCfg) -> Self {
        Self {
            history_size: c.history_size,
        }
    }
}

// ── PumpCfg ──────────────────────────────────────────────────────────────────

impl From<&froth_config::ControlCfg> for PumpCfg {
    fn from(c: &froth_config::ControlCfg) -> Self {
        Self {
            kp: c.kp,
            ki: c.ki,
            setpoint: c.setpoint,
            max_pump_duty: c.max_pump_duty,
        }
    }
}

// ── CaptureCfg ───────────────────────────────────────────────────────────────

impl From<&froth_config::CameraCfg> for CaptureCfg {
    fn from(c: &froth_config::CameraCfg) -> Self {
        Self {
            retries: c.retries.max(1),
            retry_delay: Duration::from_millis(c.retry_delay_ms),
        }
    }
}

// ── InterlockCfg ─────────────────────────────────────────────────────────────

impl From<&froth_config::EstopCfg> for InterlockCfg {
    fn from(c: &froth_config::EstopCfg) -> Self {
        Self {
            enabled: c.enabled,
            active_low: c.active_low,
        }
    }
}

// ── LoopCfg ──────────────────────────────────────────────────────────────────

impl From<&froth_config::TimingCfg> for LoopCfg {
    fn from(c: &froth_config::TimingCfg) -> Self {
        Self {
            metrics_hz: c.metrics_hz,
            control_hz: c.control_hz,
        }
    }
}
