use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrothError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("camera error: {0}")]
    Camera(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
}

impl FrothError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing camera")]
    MissingCamera,
    #[error("missing pwm output")]
    MissingPwm,
    #[error("missing estop input")]
    MissingEstop,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
