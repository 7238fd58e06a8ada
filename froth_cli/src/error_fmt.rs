//! Human-readable error descriptions and structured JSON error formatting.

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use froth_core::error::{BuildError, FrothError};

    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingCamera => {
                "What happened: No camera was provided to the system.\nLikely causes: The camera backend failed to initialize or was not wired into the builder.\nHow to fix: Check that rpicam-vid is installed and the camera ribbon is seated, then rerun `froth self-check`.".to_string()
            }
            BuildError::MissingPwm => {
                "What happened: No PWM outputs were provided to the system.\nLikely causes: GPIO pins could not be claimed.\nHow to fix: Check the [pins] section and that the process may access /dev/gpiomem.".to_string()
            }
            BuildError::MissingEstop => {
                "What happened: The E-stop is enabled but no input was wired.\nLikely causes: The E-stop pin could not be claimed.\nHow to fix: Fix pins.estop, or set estop.enabled = false for bench testing.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/froth_config.toml for a sample."
            ),
        };
    }

    if let Some(fe) = err.downcast_ref::<FrothError>() {
        return match fe {
            FrothError::Camera(msg) => format!(
                "What happened: The camera could not deliver a frame ({msg}).\nLikely causes: Camera disconnected, busy in another process, or too few retries.\nHow to fix: Free the camera, check the cable, or raise camera.retries / camera.retry_delay_ms."
            ),
            FrothError::Hardware(msg) | FrothError::HardwareFault(msg) => format!(
                "What happened: A hardware operation failed ({msg}).\nLikely causes: Wrong BCM pin numbers, wiring or power issues, or missing GPIO permissions.\nHow to fix: Verify the [pins] section and wiring, then rerun `froth self-check`."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") || lower.contains("no such file") {
        return format!(
            "What happened: The config file could not be read.\nLikely causes: Wrong --config path.\nHow to fix: Pass --config <FILE> pointing at a TOML file. Original: {msg}"
        );
    }

    if lower.contains("invalid configuration") || lower.contains("parse config") {
        let detail = err.root_cause().to_string();
        return format!(
            "What happened: Configuration is invalid.\nLikely causes: {detail}\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("open image") || lower.contains("decode image") {
        return format!(
            "What happened: The image could not be loaded.\nLikely causes: Missing file or unsupported format (PNG and JPEG are supported).\nHow to fix: Check the path. Original: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error family; everything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use froth_core::error::{BuildError, FrothError};
    if err.downcast_ref::<BuildError>().is_some() {
        return 3;
    }
    match err.downcast_ref::<FrothError>() {
        Some(FrothError::Camera(_)) => 4,
        Some(FrothError::Hardware(_) | FrothError::HardwareFault(_)) => 5,
        Some(FrothError::Config(_)) => 3,
        _ => 1,
    }
}

/// Short machine-readable name of the error family.
fn reason_name(err: &eyre::Report) -> &'static str {
    use froth_core::error::{BuildError, FrothError};
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    match err.downcast_ref::<FrothError>() {
        Some(FrothError::InvalidArgument(_)) => "InvalidArgument",
        Some(FrothError::Hardware(_)) => "Hardware",
        Some(FrothError::HardwareFault(_)) => "HardwareFault",
        Some(FrothError::Camera(_)) => "Camera",
        Some(FrothError::Config(_)) => "Config",
        Some(FrothError::State(_)) => "State",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use froth_core::error::{BuildError, FrothError};

    #[test]
    fn typed_errors_get_stable_codes() {
        let camera = eyre::Report::new(FrothError::Camera("gone".into()));
        assert_eq!(exit_code_for_error(&camera), 4);
        assert!(humanize(&camera).contains("camera"));

        let build = eyre::Report::new(BuildError::MissingPwm);
        assert_eq!(exit_code_for_error(&build), 3);

        let other = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&other), 1);
        assert!(humanize(&other).contains("boom"));
    }

    #[test]
    fn json_error_names_the_family() {
        let e = eyre::Report::new(FrothError::HardwareFault("air".into()));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&e)).unwrap();
        assert_eq!(v["reason"], "HardwareFault");
    }
}
