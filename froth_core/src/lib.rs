#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Froth vision-to-control core (hardware-agnostic).
//!
//! All device access goes through the `froth_traits` boundary: frames from a
//! `Camera`, duty cycles to a `PwmOutput`, the E-stop level from a
//! `DigitalInput`.
//!
//! ## Architecture
//!
//! - **Vision**: `FrameSource` → `BubbleDetector` → `FrothAnalyzer`, publishing
//!   `FrothMetrics` into a `MetricsSlot` (`metrics` module)
//! - **Control**: `PumpController` (manual duty / PI on bubble count),
//!   `MotorBank`, `SafetyInterlock`, all owned by a `Plant`
//! - **Scheduling**: two `PeriodicTask`s, metrics and control, assembled by
//!   `System`
//!
//! The tick bodies (`MetricsPipeline::run_once`, `Plant::control_tick`) are
//! plain methods, so tests drive them directly without threads.

pub mod analyzer;
pub mod config;
pub mod conversions;
pub mod detector;
pub mod error;
pub mod frame_source;
pub mod hw_error;
pub mod metrics;
pub mod motors;
pub mod periodic;
pub mod plant;
pub mod pump;
pub mod safety;
pub mod segment;
pub mod status;
pub mod system;
pub mod util;

pub use analyzer::{FrothAnalyzer, StabilityHistory, density_score};
pub use config::{AnalyzerCfg, CaptureCfg, DetectorCfg, InterlockCfg, LoopCfg, PumpCfg};
pub use detector::{BubbleDetector, BubbleObservation, Segmentation};
pub use error::{BuildError, FrothError, Result};
pub use frame_source::{CaptureOutcome, CapturedFrame, DropReason, FrameSource};
pub use metrics::{Cycle, FrothMetrics, MetricsPipeline, MetricsSlot};
pub use motors::{MotorBank, MotorId};
pub use periodic::PeriodicTask;
pub use plant::{Actuation, Plant, Tick};
pub use pump::{PiState, PiUpdate, PumpController, PumpMode};
pub use safety::{Poll, SafetyInterlock, SafetyState};
pub use status::{MotorDuties, SystemStatus};
pub use system::{System, SystemBuilder};
