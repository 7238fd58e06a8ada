//! Maps `Box<dyn Error>` from trait boundaries to typed `FrothError`.
//!
//! The traits in `froth_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `froth_hardware::HwError` downcasting.

use crate::error::FrothError;

/// Map a trait-boundary error to a typed `FrothError`.
///
/// Known hardware errors are downcast first, then string heuristics apply.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> FrothError {
    #[cfg(feature = "hardware-errors")]
    {
        use froth_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::CameraUnavailable(_) | HwError::CameraRead(_) | HwError::FrameSize { .. } => {
                    FrothError::Camera(hw.to_string())
                }
                HwError::Pwm { .. } => FrothError::HardwareFault(hw.to_string()),
                other => FrothError::Hardware(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("camera") {
        FrothError::Camera(s)
    } else {
        FrothError::Hardware(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_on_message_text() {
        let e = std::io::Error::other("camera unplugged");
        assert!(matches!(map_hw_error(&e), FrothError::Camera(_)));
        let e = std::io::Error::other("bus fault");
        assert!(matches!(map_hw_error(&e), FrothError::Hardware(_)));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn downcasts_pwm_failures_to_hardware_fault() {
        let e = froth_hardware::error::HwError::Pwm {
            channel: "air".into(),
            reason: "bus".into(),
        };
        assert!(matches!(map_hw_error(&e), FrothError::HardwareFault(_)));
    }
}
