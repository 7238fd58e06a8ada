//! Actuator-side state: pump, motors, interlock and the PWM backend behind
//! one lock.
//!
//! Every actuation checks the safety state first, then validates, then
//! records the commanded duty and writes the hardware. A failed write is
//! logged and reported through [`Actuation::WriteFailed`]; the recorded
//! duty is not rolled back.

use froth_traits::{Channel, PwmOutput};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::PumpCfg;
use crate::error::FrothError;
use crate::hw_error::map_hw_error;
use crate::metrics::MetricsSlot;
use crate::motors::MotorBank;
use crate::pump::{PiUpdate, PumpController, PumpMode};
use crate::safety::{Poll, SafetyInterlock};
use crate::status::{MotorDuties, SystemStatus};

/// Outcome of an actuation request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Actuation {
    Applied { duty: f64 },
    /// Duty recorded but the hardware write failed.
    WriteFailed { duty: f64 },
    /// E-stop active; nothing changed.
    Vetoed,
}

impl Actuation {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// What one control tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub poll: Poll,
    /// Present when a PI step ran.
    pub pump: Option<Actuation>,
}

struct Inner {
    pump: PumpController,
    motors: MotorBank,
    interlock: SafetyInterlock,
    pwm: Box<dyn PwmOutput + Send>,
    initialized: bool,
}

impl Inner {
    fn write(&mut self, channel: Channel, duty: f64) -> bool {
        match self.pwm.set_duty(channel, duty as f32) {
            Ok(()) => {
                debug!(%channel, duty, "pwm set");
                true
            }
            Err(e) => {
                error!(%channel, duty, error = %map_hw_error(e.as_ref()), "PWM write failed");
                false
            }
        }
    }

    fn actuate(&mut self, channel: Channel, duty: f64) -> Actuation {
        if self.write(channel, duty) {
            Actuation::Applied { duty }
        } else {
            Actuation::WriteFailed { duty }
        }
    }

    fn zero_outputs(&mut self) {
        for channel in Channel::ALL {
            self.write(channel, 0.0);
        }
        self.pump.stop();
        self.motors.zero_all();
    }

    fn ensure_initialized(&self) -> Result<(), FrothError> {
        if self.initialized {
            Ok(())
        } else {
            Err(FrothError::State("actuators are released".into()))
        }
    }

    fn set_speed(&mut self, value: f64) -> Result<Actuation, FrothError> {
        self.ensure_initialized()?;
        if self.interlock.state().triggered {
            warn!("cannot control pump, E-stop active");
            return Ok(Actuation::Vetoed);
        }
        let duty = self.pump.set_speed(value)?;
        Ok(self.actuate(Channel::Pump, duty))
    }

    fn status(&self) -> SystemStatus {
        SystemStatus {
            pump_mode: self.pump.mode(),
            pump_duty: self.pump.duty(),
            motors: MotorDuties::from(&self.motors),
            pi_controller: self.pump.pi(),
            estop_triggered: self.interlock.state().triggered,
            estop_enabled: self.interlock.is_enabled(),
            initialized: self.initialized,
            running: false,
        }
    }
}

pub struct Plant {
    inner: Mutex<Inner>,
}

impl Plant {
    /// Take ownership of the actuators and drive every channel to 0 %.
    pub fn new(pwm: Box<dyn PwmOutput + Send>, interlock: SafetyInterlock, cfg: PumpCfg) -> Self {
        let mut inner = Inner {
            pump: PumpController::new(cfg),
            motors: MotorBank::new(),
            interlock,
            pwm,
            initialized: true,
        };
        inner.zero_outputs();
        info!(max_pump_duty = cfg.max_pump_duty, "plant initialized");
        Self {
            inner: Mutex::new(inner),
        }
    }

    pub fn set_mode(&self, mode: PumpMode) {
        self.inner.lock().pump.set_mode(mode);
    }

    /// MANUAL: duty in [0, 100]. AUTO: measured bubble count.
    pub fn set_speed(&self, value: f64) -> Result<Actuation, FrothError> {
        self.inner.lock().set_speed(value)
    }

    pub fn set_motor(&self, id: &str, duty: f64) -> Result<Actuation, FrothError> {
        let mut g = self.inner.lock();
        g.ensure_initialized()?;
        if g.interlock.state().triggered {
            warn!(motor = id, "cannot control motors, E-stop active");
            return Ok(Actuation::Vetoed);
        }
        let id = g.motors.set(id, duty)?;
        let outcome = g.actuate(id.channel(), duty);
        match outcome {
            Actuation::Applied { .. } => info!(motor = %id, duty, "motor set"),
            _ => error!(motor = %id, duty, "failed to set motor"),
        }
        Ok(outcome)
    }

    pub fn set_parameters(&self, update: PiUpdate) -> Result<(), FrothError> {
        self.inner.lock().pump.set_parameters(update)
    }

    /// Poll the interlock, then run one PI step in AUTO.
    ///
    /// A trip zeroes every actuator and the integral but keeps the mode.
    /// The PI step is skipped while no metrics have been published.
    pub fn control_tick(&self, metrics: &MetricsSlot) -> Tick {
        let mut g = self.inner.lock();
        if !g.initialized {
            return Tick {
                poll: Poll::Disabled,
                pump: None,
            };
        }
        let poll = g.interlock.poll();
        if poll == Poll::Triggered {
            error!("executing emergency shutdown");
            g.zero_outputs();
            g.pump.trip();
        }
        if g.interlock.state().triggered || g.pump.mode() != PumpMode::Auto {
            return Tick { poll, pump: None };
        }

        let latest = metrics.latest();
        if !latest.available {
            debug!("no metrics yet, PI step skipped");
            return Tick { poll, pump: None };
        }
        let pump = match g.set_speed(latest.bubble_count as f64) {
            Ok(a) => Some(a),
            Err(e) => {
                warn!(error = %e, "PI step rejected");
                None
            }
        };
        Tick { poll, pump }
    }

    /// Drive every actuator to 0 % without touching PI state or mode.
    pub fn stop_all(&self) {
        let mut g = self.inner.lock();
        if g.initialized {
            info!("stopping all devices");
            g.zero_outputs();
        }
    }

    pub fn status(&self) -> SystemStatus {
        self.inner.lock().status()
    }

    /// Zero every actuator and release the PWM backend. Safe to call repeatedly.
    pub fn shutdown(&self) {
        let mut g = self.inner.lock();
        if !g.initialized {
            return;
        }
        g.zero_outputs();
        g.pwm.release();
        g.initialized = false;
        info!("actuators released");
    }
}

impl Drop for Plant {
    fn drop(&mut self) {
        self.shutdown();
    }
}
