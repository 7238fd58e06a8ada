#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation must never panic; both may reject.
    let Ok(cfg) = froth_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_ok() {
        // Anything that validates must be usable by the control loops.
        assert!(cfg.timing.metrics_hz > 0.0 && cfg.timing.control_hz > 0.0);
        assert!((0.0..=100.0).contains(&cfg.control.max_pump_duty));
        assert!(cfg.analysis.history_size >= 3);
    }
});
