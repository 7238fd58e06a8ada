//! Status snapshot returned to transport collaborators.

use serde::Serialize;

use crate::motors::{MotorBank, MotorId};
use crate::pump::{PiState, PumpMode};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MotorDuties {
    pub agitator: f64,
    pub air: f64,
    pub feed: f64,
}

impl From<&MotorBank> for MotorDuties {
    fn from(bank: &MotorBank) -> Self {
        Self {
            agitator: bank.duty(MotorId::Agitator),
            air: bank.duty(MotorId::Air),
            feed: bank.duty(MotorId::Feed),
        }
    }
}

impl MotorDuties {
    pub fn get(&self, id: MotorId) -> f64 {
        match id {
            MotorId::Agitator => self.agitator,
            MotorId::Air => self.air,
            MotorId::Feed => self.feed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SystemStatus {
    pub pump_mode: PumpMode,
    pub pump_duty: f64,
    pub motors: MotorDuties,
    pub pi_controller: PiState,
    pub estop_triggered: bool,
    pub estop_enabled: bool,
    /// Actuators are claimed and accept commands.
    pub initialized: bool,
    /// Periodic tasks are running.
    pub running: bool,
}
