use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("pwm write failed on {channel}: {reason}")]
    Pwm { channel: String, reason: String },
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),
    #[error("camera read failed: {0}")]
    CameraRead(String),
    #[error("frame size mismatch: expected {expected} bytes, got {got}")]
    FrameSize { expected: usize, got: usize },
    #[error("device already released")]
    Released,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
