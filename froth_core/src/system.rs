//! Process-level assembly: the metrics task, the control task and the API
//! transport layers call into.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel as xch;
use eyre::WrapErr;
use froth_traits::clock::MonotonicClock;
use froth_traits::{Camera, DigitalInput, PwmOutput};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::analyzer::FrothAnalyzer;
use crate::config::{AnalyzerCfg, CaptureCfg, DetectorCfg, InterlockCfg, LoopCfg, PumpCfg};
use crate::detector::BubbleDetector;
use crate::error::{BuildError, FrothError, Result};
use crate::frame_source::FrameSource;
use crate::metrics::{Cycle, FrothMetrics, MetricsPipeline, MetricsSlot};
use crate::periodic::PeriodicTask;
use crate::plant::{Actuation, Plant, Tick};
use crate::pump::{PiUpdate, PumpMode};
use crate::safety::SafetyInterlock;
use crate::status::SystemStatus;
use crate::util::period_from_hz;

type BoxCamera = Box<dyn Camera + Send>;
type Pipeline = MetricsPipeline<BoxCamera, MonotonicClock>;

struct Tasks {
    metrics: PeriodicTask,
    control: PeriodicTask,
}

pub struct System {
    plant: Arc<Plant>,
    slot: Arc<MetricsSlot>,
    pipeline: Arc<Mutex<Pipeline>>,
    loops: LoopCfg,
    tasks: Mutex<Option<Tasks>>,
    /// Dropped on shutdown; the frame source watches the paired receiver.
    camera_shutdown: Mutex<Option<xch::Sender<()>>>,
    shut_down: AtomicBool,
}

impl System {
    pub fn builder() -> SystemBuilder {
        SystemBuilder::default()
    }

    /// Spawn the metrics and control tasks. No-op when already running.
    pub fn start(&self) -> Result<()> {
        if self.shut_down.load(Ordering::Acquire) {
            eyre::bail!(FrothError::State("system has been shut down".into()));
        }
        let mut tasks = self.tasks.lock();
        if tasks.is_some() {
            return Ok(());
        }

        let pipeline = Arc::clone(&self.pipeline);
        let metrics =
            PeriodicTask::spawn("froth-metrics", period_from_hz(self.loops.metrics_hz), move || {
                pipeline.lock().run_once();
            })
            .wrap_err("spawn metrics task")?;

        let plant = Arc::clone(&self.plant);
        let slot = Arc::clone(&self.slot);
        let control =
            PeriodicTask::spawn("froth-control", period_from_hz(self.loops.control_hz), move || {
                plant.control_tick(&slot);
            })
            .wrap_err("spawn control task")?;

        *tasks = Some(Tasks { metrics, control });

        info!(
            metrics_hz = self.loops.metrics_hz,
            control_hz = self.loops.control_hz,
            "system started"
        );
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.tasks.lock().is_some()
    }

    /// Run one metrics cycle on the caller's thread.
    pub fn run_metrics_once(&self) -> Cycle {
        self.pipeline.lock().run_once()
    }

    /// Run one control tick on the caller's thread.
    pub fn run_control_once(&self) -> Tick {
        self.plant.control_tick(&self.slot)
    }

    /// Latest metrics; zeroed with `available == false` before the first frame.
    pub fn metrics(&self) -> FrothMetrics {
        self.slot.latest()
    }

    pub fn status(&self) -> SystemStatus {
        SystemStatus {
            running: self.is_running(),
            ..self.plant.status()
        }
    }

    pub fn set_mode(&self, mode: &str) -> std::result::Result<(), FrothError> {
        self.plant.set_mode(mode.parse::<PumpMode>()?);
        Ok(())
    }

    pub fn set_speed(&self, value: f64) -> std::result::Result<Actuation, FrothError> {
        self.plant.set_speed(value)
    }

    pub fn set_motor(&self, id: &str, duty: f64) -> std::result::Result<Actuation, FrothError> {
        self.plant.set_motor(id, duty)
    }

    pub fn set_parameters(&self, update: PiUpdate) -> std::result::Result<(), FrothError> {
        self.plant.set_parameters(update)
    }

    /// Operator stop: every actuator to 0 %, PI state and mode untouched.
    pub fn emergency_stop_all(&self) {
        warn!("emergency stop requested");
        self.plant.stop_all();
    }

    /// Zero the actuators, stop both tasks and release every device.
    /// Safe to call repeatedly.
    ///
    /// Actuators reach 0 % before the metrics task is joined, whatever the
    /// camera is doing.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let tasks = self.tasks.lock().take();
        let metrics_task = tasks.map(|Tasks { metrics, control }| {
            drop(control);
            metrics
        });
        self.plant.shutdown();
        drop(self.camera_shutdown.lock().take());
        drop(metrics_task);
        self.pipeline.lock().release();
        info!("system shut down");
    }
}

impl Drop for System {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[derive(Default)]
pub struct SystemBuilder {
    camera: Option<BoxCamera>,
    pwm: Option<Box<dyn PwmOutput + Send>>,
    estop: Option<Box<dyn DigitalInput + Send>>,
    detector: DetectorCfg,
    analyzer: AnalyzerCfg,
    pump: PumpCfg,
    capture: CaptureCfg,
    interlock: InterlockCfg,
    loops: LoopCfg,
}

impl SystemBuilder {
    pub fn with_camera(mut self, camera: impl Camera + Send + 'static) -> Self {
        self.camera = Some(Box::new(camera));
        self
    }

    pub fn with_pwm(mut self, pwm: impl PwmOutput + Send + 'static) -> Self {
        self.pwm = Some(Box::new(pwm));
        self
    }

    pub fn with_estop(mut self, input: impl DigitalInput + Send + 'static) -> Self {
        self.estop = Some(Box::new(input));
        self
    }

    /// Take every tuning section from a loaded config file.
    pub fn with_config(mut self, cfg: &froth_config::Config) -> Self {
        self.detector = DetectorCfg::from(&cfg.vision);
        self.analyzer = AnalyzerCfg::from(&cfg.analysis);
        self.pump = PumpCfg::from(&cfg.control);
        self.capture = CaptureCfg::from(&cfg.camera);
        self.interlock = InterlockCfg::from(&cfg.estop);
        self.loops = LoopCfg::from(&cfg.timing);
        self
    }

    pub fn with_detector(mut self, cfg: DetectorCfg) -> Self {
        self.detector = cfg;
        self
    }

    pub fn with_pump(mut self, cfg: PumpCfg) -> Self {
        self.pump = cfg;
        self
    }

    pub fn with_capture(mut self, cfg: CaptureCfg) -> Self {
        self.capture = cfg;
        self
    }

    pub fn with_interlock(mut self, cfg: InterlockCfg) -> Self {
        self.interlock = cfg;
        self
    }

    pub fn with_loops(mut self, cfg: LoopCfg) -> Self {
        self.loops = cfg;
        self
    }

    pub fn build(self) -> std::result::Result<System, BuildError> {
        let camera = self.camera.ok_or(BuildError::MissingCamera)?;
        let pwm = self.pwm.ok_or(BuildError::MissingPwm)?;
        if self.interlock.enabled && self.estop.is_none() {
            return Err(BuildError::MissingEstop);
        }
        if self.analyzer.history_size < 3 {
            return Err(BuildError::InvalidConfig("history_size must be >= 3"));
        }
        if !(self.pump.max_pump_duty.is_finite() && (0.0..=100.0).contains(&self.pump.max_pump_duty)) {
            return Err(BuildError::InvalidConfig("max_pump_duty must be in [0, 100]"));
        }

        let interlock = SafetyInterlock::new(self.estop, self.interlock);
        let plant = Arc::new(Plant::new(pwm, interlock, self.pump));
        let slot = Arc::new(MetricsSlot::new());
        let (camera_shutdown, shutdown_rx) = xch::bounded::<()>(0);
        let pipeline = MetricsPipeline::new(
            FrameSource::new(camera, self.capture).with_shutdown(shutdown_rx),
            BubbleDetector::new(self.detector),
            FrothAnalyzer::new(self.analyzer),
            Arc::clone(&slot),
        );

        Ok(System {
            plant,
            slot,
            pipeline: Arc::new(Mutex::new(pipeline)),
            loops: self.loops,
            tasks: Mutex::new(None),
            camera_shutdown: Mutex::new(Some(camera_shutdown)),
            shut_down: AtomicBool::new(false),
        })
    }
}
