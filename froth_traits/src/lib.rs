//! Hardware boundary for the froth control stack.
//!
//! The core never talks to devices directly; it goes through these traits so
//! the same control logic runs against Raspberry Pi peripherals or simulators.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::fmt;

/// One RGB camera frame (width × height × 3).
pub type Frame = image::RgbImage;

/// Boxed error crossing a trait boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// PWM output channels driven by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Pump,
    Agitator,
    Air,
    Feed,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Pump,
        Channel::Agitator,
        Channel::Air,
        Channel::Feed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Pump => "pump",
            Channel::Agitator => "agitator",
            Channel::Air => "air",
            Channel::Feed => "feed",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pull-based frame acquisition device.
pub trait Camera {
    /// Acquire the device. Calling `open` on an open device re-acquires it.
    fn open(&mut self) -> Result<(), BoxError>;
    /// Read one frame from an open device.
    fn read(&mut self) -> Result<Frame, BoxError>;
    /// Release the device. Must be safe to call repeatedly.
    fn release(&mut self);
    fn is_open(&self) -> bool;
}

/// Fixed-frequency PWM sink. `percent` is already validated to [0, 100].
pub trait PwmOutput {
    fn set_duty(&mut self, channel: Channel, percent: f32) -> Result<(), BoxError>;

    /// Release the underlying pins. Must be safe to call repeatedly.
    fn release(&mut self) {}
}

/// Single digital input line (E-stop).
pub trait DigitalInput {
    /// Current logic level: 0 (low) or 1 (high).
    fn read_bit(&mut self) -> Result<u8, BoxError>;
}

impl<T: Camera + ?Sized> Camera for Box<T> {
    fn open(&mut self) -> Result<(), BoxError> {
        (**self).open()
    }
    fn read(&mut self) -> Result<Frame, BoxError> {
        (**self).read()
    }
    fn release(&mut self) {
        (**self).release()
    }
    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

impl<T: PwmOutput + ?Sized> PwmOutput for Box<T> {
    fn set_duty(&mut self, channel: Channel, percent: f32) -> Result<(), BoxError> {
        (**self).set_duty(channel, percent)
    }
    fn release(&mut self) {
        (**self).release()
    }
}

impl<T: DigitalInput + ?Sized> DigitalInput for Box<T> {
    fn read_bit(&mut self) -> Result<u8, BoxError> {
        (**self).read_bit()
    }
}
