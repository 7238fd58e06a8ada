//! Dual-mode pump controller: direct duty in MANUAL, PI on bubble count in AUTO.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::info;

use crate::config::PumpCfg;
use crate::error::FrothError;

/// Bound on the accumulated integral term (anti-windup).
pub const INTEGRAL_LIMIT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PumpMode {
    #[default]
    Manual,
    Auto,
}

impl PumpMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for PumpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PumpMode {
    type Err = FrothError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "auto" => Ok(Self::Auto),
            other => Err(FrothError::invalid(format!("invalid pump mode: {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PiState {
    pub kp: f64,
    pub ki: f64,
    pub setpoint: f64,
    pub integral: f64,
    pub last_error: f64,
}

impl PiState {
    /// One PI step on `measured`; returns the unclamped output.
    fn step(&mut self, measured: f64) -> f64 {
        let error = self.setpoint - measured;
        self.integral = (self.integral + error).clamp(-INTEGRAL_LIMIT, INTEGRAL_LIMIT);
        self.last_error = error;
        self.kp * error + self.ki * self.integral
    }

    fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
    }
}

/// Optional PI parameter update; `None` leaves the value alone.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PiUpdate {
    pub kp: Option<f64>,
    pub ki: Option<f64>,
    pub setpoint: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct PumpController {
    mode: PumpMode,
    pi: PiState,
    max_duty: f64,
    duty: f64,
}

impl PumpController {
    pub fn new(cfg: PumpCfg) -> Self {
        Self {
            mode: PumpMode::Manual,
            pi: PiState {
                kp: cfg.kp,
                ki: cfg.ki,
                setpoint: cfg.setpoint,
                integral: 0.0,
                last_error: 0.0,
            },
            max_duty: if cfg.max_pump_duty.is_finite() {
                cfg.max_pump_duty.clamp(0.0, 100.0)
            } else {
                0.0
            },
            duty: 0.0,
        }
    }

    pub fn mode(&self) -> PumpMode {
        self.mode
    }

    pub fn pi(&self) -> PiState {
        self.pi
    }

    /// Last commanded duty (%).
    pub fn duty(&self) -> f64 {
        self.duty
    }

    pub fn max_duty(&self) -> f64 {
        self.max_duty
    }

    /// Switch mode. Entering AUTO from MANUAL resets the PI state.
    pub fn set_mode(&mut self, mode: PumpMode) {
        let old = self.mode;
        self.mode = mode;
        if mode == PumpMode::Auto && old != PumpMode::Auto {
            self.pi.reset();
            info!("AUTO mode, PI reset");
        } else {
            info!(%mode, "pump mode set");
        }
    }

    /// Compute and record the duty for `value`.
    ///
    /// MANUAL: `value` is a duty in [0, 100], capped at the pump maximum.
    /// AUTO: `value` is the measured bubble count fed to one PI step.
    pub fn set_speed(&mut self, value: f64) -> Result<f64, FrothError> {
        let duty = match self.mode {
            PumpMode::Manual => {
                if !(0.0..=100.0).contains(&value) {
                    return Err(FrothError::invalid(format!(
                        "manual duty cycle must be 0-100%, got {value}"
                    )));
                }
                value.min(self.max_duty)
            }
            PumpMode::Auto => {
                if !value.is_finite() {
                    return Err(FrothError::invalid(format!(
                        "measured bubble count must be finite, got {value}"
                    )));
                }
                self.pi.step(value).clamp(0.0, self.max_duty)
            }
        };
        self.duty = duty;
        Ok(duty)
    }

    /// Apply a parameter update atomically; any negative value rejects all.
    pub fn set_parameters(&mut self, update: PiUpdate) -> Result<(), FrothError> {
        for (name, v) in [
            ("kp", update.kp),
            ("ki", update.ki),
            ("setpoint", update.setpoint),
        ] {
            if let Some(v) = v
                && !(v.is_finite() && v >= 0.0)
            {
                return Err(FrothError::invalid(format!("{name} must be non-negative, got {v}")));
            }
        }
        if let Some(kp) = update.kp {
            self.pi.kp = kp;
        }
        if let Some(ki) = update.ki {
            self.pi.ki = ki;
        }
        if let Some(sp) = update.setpoint {
            self.pi.setpoint = sp;
            self.pi.integral = 0.0;
        }
        info!(
            kp = self.pi.kp,
            ki = self.pi.ki,
            setpoint = self.pi.setpoint,
            "PI updated"
        );
        Ok(())
    }

    /// Zero the commanded duty and the integral (interlock trip).
    pub fn trip(&mut self) {
        self.duty = 0.0;
        self.pi.integral = 0.0;
    }

    /// Zero the commanded duty only.
    pub fn stop(&mut self) {
        self.duty = 0.0;
    }
}
