//! E-stop interlock over one digital input.

use froth_traits::DigitalInput;
use serde::Serialize;
use tracing::{error, warn};

use crate::config::InterlockCfg;
use crate::hw_error::map_hw_error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SafetyState {
    pub triggered: bool,
}

/// Result of one interlock poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    Clear,
    Triggered,
    /// Read failed; the previous state is kept.
    ReadFailed,
    /// Interlock disabled or no input wired.
    Disabled,
}

pub struct SafetyInterlock {
    input: Option<Box<dyn DigitalInput + Send>>,
    cfg: InterlockCfg,
    state: SafetyState,
}

impl SafetyInterlock {
    pub fn new(input: Option<Box<dyn DigitalInput + Send>>, cfg: InterlockCfg) -> Self {
        Self {
            input,
            cfg,
            state: SafetyState::default(),
        }
    }

    /// Interlock that never trips.
    pub fn disabled() -> Self {
        Self::new(
            None,
            InterlockCfg {
                enabled: false,
                ..InterlockCfg::default()
            },
        )
    }

    pub fn state(&self) -> SafetyState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.cfg.enabled && self.input.is_some()
    }

    /// Sample the input once and update the safety state.
    pub fn poll(&mut self) -> Poll {
        if !self.cfg.enabled {
            return Poll::Disabled;
        }
        let Some(input) = self.input.as_mut() else {
            return Poll::Disabled;
        };
        match input.read_bit() {
            Ok(bit) => {
                let active_level = u8::from(!self.cfg.active_low);
                self.state.triggered = bit == active_level;
                if self.state.triggered {
                    error!("EMERGENCY STOP TRIGGERED");
                    Poll::Triggered
                } else {
                    Poll::Clear
                }
            }
            Err(e) => {
                warn!(error = %map_hw_error(e.as_ref()), "E-stop read failed");
                Poll::ReadFailed
            }
        }
    }
}
