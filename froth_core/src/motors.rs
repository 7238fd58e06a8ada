//! Auxiliary PWM actuators.

use std::fmt;
use std::str::FromStr;

use froth_traits::Channel;

use crate::error::FrothError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotorId {
    Agitator,
    Air,
    Feed,
}

impl MotorId {
    pub const ALL: [MotorId; 3] = [MotorId::Agitator, MotorId::Air, MotorId::Feed];

    pub fn channel(self) -> Channel {
        match self {
            Self::Agitator => Channel::Agitator,
            Self::Air => Channel::Air,
            Self::Feed => Channel::Feed,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.channel().as_str()
    }

    fn index(self) -> usize {
        match self {
            Self::Agitator => 0,
            Self::Air => 1,
            Self::Feed => 2,
        }
    }
}

impl fmt::Display for MotorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MotorId {
    type Err = FrothError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agitator" => Ok(Self::Agitator),
            "air" => Ok(Self::Air),
            "feed" => Ok(Self::Feed),
            other => Err(FrothError::invalid(format!("invalid motor_id: {other:?}"))),
        }
    }
}

/// Commanded duty (%) per auxiliary motor.
#[derive(Debug, Clone, Default)]
pub struct MotorBank {
    duties: [f64; 3],
}

impl MotorBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duty(&self, id: MotorId) -> f64 {
        self.duties[id.index()]
    }

    /// Validate and record a duty. Nothing changes on error.
    pub fn set(&mut self, id: &str, duty: f64) -> Result<MotorId, FrothError> {
        let id: MotorId = id.parse()?;
        if !(0.0..=100.0).contains(&duty) {
            return Err(FrothError::invalid(format!(
                "PWM value must be 0-100%, got {duty}"
            )));
        }
        self.duties[id.index()] = duty;
        Ok(id)
    }

    pub fn zero_all(&mut self) {
        self.duties = [0.0; 3];
    }

    pub fn iter(&self) -> impl Iterator<Item = (MotorId, f64)> + '_ {
        MotorId::ALL.into_iter().map(|id| (id, self.duty(id)))
    }
}
