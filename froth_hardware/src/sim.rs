//! Simulation backends used when the `hardware` feature is off.
//!
//! Every simulator hands out a cloneable probe so tests (and the CLI in sim
//! mode) can observe or steer the device after it has been moved into the core.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use froth_traits::{BoxError, Camera, Channel, DigitalInput, Frame, PwmOutput};
use image::Rgb;
use tracing::{debug, trace};

use crate::error::HwError;

const BACKGROUND: Rgb<u8> = Rgb([214, 208, 196]);
const BUBBLE: Rgb<u8> = Rgb([38, 42, 50]);

/// Render a synthetic froth frame: `count` dark discs of `radius` px on a
/// bright background, laid out on a jittered grid so discs never touch.
/// The layout is a pure function of `seed`.
pub fn render_froth(width: u32, height: u32, count: u32, radius: u32, seed: u64) -> Frame {
    let mut frame = Frame::from_pixel(width, height, BACKGROUND);
    if count == 0 || radius == 0 {
        return frame;
    }
    let cell = 2 * radius + 6;
    let cols = (width / cell).max(1);
    let rows = (height / cell).max(1);
    let slack = cell - 2 * radius - 2;
    let mut rng = Lcg(seed ^ 0x9E37_79B9_7F4A_7C15);

    let mut placed = 0;
    'grid: for row in 0..rows {
        for col in 0..cols {
            if placed >= count {
                break 'grid;
            }
            let jx = rng.next_below(slack.max(1));
            let jy = rng.next_below(slack.max(1));
            let cx = col * cell + 1 + radius + jx;
            let cy = row * cell + 1 + radius + jy;
            if cx + radius >= width || cy + radius >= height {
                continue;
            }
            fill_disc(&mut frame, cx, cy, radius);
            placed += 1;
        }
    }
    frame
}

fn fill_disc(frame: &mut Frame, cx: u32, cy: u32, radius: u32) {
    let r2 = i64::from(radius) * i64::from(radius);
    for y in cy.saturating_sub(radius)..=cy + radius {
        for x in cx.saturating_sub(radius)..=cx + radius {
            let dx = i64::from(x) - i64::from(cx);
            let dy = i64::from(y) - i64::from(cy);
            if dx * dx + dy * dy <= r2 {
                frame.put_pixel(x, y, BUBBLE);
            }
        }
    }
}

/// Small deterministic generator; no need for a full RNG here.
struct Lcg(u64);

impl Lcg {
    fn next_below(&mut self, bound: u32) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((self.0 >> 33) % u64::from(bound.max(1))) as u32
    }
}

/// Shared knobs of a [`SimulatedCamera`].
#[derive(Debug, Clone, Default)]
pub struct CameraProbe {
    failing_opens: Arc<AtomicU32>,
    failing_reads: Arc<AtomicU32>,
    opens: Arc<AtomicU32>,
    open: Arc<AtomicBool>,
    bubbles: Arc<AtomicU32>,
}

impl CameraProbe {
    /// Make the next `n` open attempts fail.
    pub fn fail_opens(&self, n: u32) {
        self.failing_opens.store(n, Ordering::Relaxed);
    }
    /// Make the next `n` reads fail.
    pub fn fail_reads(&self, n: u32) {
        self.failing_reads.store(n, Ordering::Relaxed);
    }
    pub fn set_bubbles(&self, n: u32) {
        self.bubbles.store(n, Ordering::Relaxed);
    }
    /// Number of open attempts seen so far.
    pub fn opens(&self) -> u32 {
        self.opens.load(Ordering::Relaxed)
    }
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }
}

/// Camera producing synthetic froth frames.
pub struct SimulatedCamera {
    width: u32,
    height: u32,
    radius: u32,
    frame_no: u64,
    probe: CameraProbe,
}

impl SimulatedCamera {
    pub fn new(width: u32, height: u32) -> Self {
        let probe = CameraProbe::default();
        probe.set_bubbles(60);
        Self {
            width,
            height,
            radius: 9,
            frame_no: 0,
            probe,
        }
    }

    pub fn with_bubbles(self, count: u32) -> Self {
        self.probe.set_bubbles(count);
        self
    }

    pub fn with_radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    pub fn probe(&self) -> CameraProbe {
        self.probe.clone()
    }
}

/// Decrement a failure budget; true when this call should fail.
fn take_failure(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
        .is_ok()
}

impl Camera for SimulatedCamera {
    fn open(&mut self) -> Result<(), BoxError> {
        self.probe.opens.fetch_add(1, Ordering::Relaxed);
        if take_failure(&self.probe.failing_opens) {
            self.probe.open.store(false, Ordering::Relaxed);
            return Err(Box::new(HwError::CameraUnavailable(
                "simulated open failure".into(),
            )));
        }
        self.probe.open.store(true, Ordering::Relaxed);
        debug!(width = self.width, height = self.height, "simulated camera opened");
        Ok(())
    }

    fn read(&mut self) -> Result<Frame, BoxError> {
        if !self.probe.is_open() {
            return Err(Box::new(HwError::Released));
        }
        if take_failure(&self.probe.failing_reads) {
            return Err(Box::new(HwError::CameraRead("simulated read failure".into())));
        }
        self.frame_no = self.frame_no.wrapping_add(1);
        let base = self.probe.bubbles.load(Ordering::Relaxed);
        // Wobble the count a little so the stability history sees variation.
        let count = match self.frame_no % 3 {
            0 => base.saturating_sub(1),
            1 => base,
            _ => base.saturating_add(1),
        };
        trace!(frame = self.frame_no, count, "simulated frame");
        Ok(render_froth(
            self.width,
            self.height,
            count,
            self.radius,
            self.frame_no,
        ))
    }

    fn release(&mut self) {
        if self.probe.open.swap(false, Ordering::Relaxed) {
            debug!("simulated camera released");
        }
    }

    fn is_open(&self) -> bool {
        self.probe.is_open()
    }
}

/// Observer for a [`SimulatedPwm`].
#[derive(Debug, Clone, Default)]
pub struct PwmProbe {
    duties: Arc<Mutex<HashMap<Channel, f32>>>,
    failing: Arc<Mutex<HashSet<Channel>>>,
    writes: Arc<AtomicU32>,
    released: Arc<AtomicBool>,
}

impl PwmProbe {
    /// Last duty written to `channel` (0 if never written).
    pub fn duty(&self, channel: Channel) -> f32 {
        self.duties
            .lock()
            .map(|d| d.get(&channel).copied().unwrap_or(0.0))
            .unwrap_or(0.0)
    }

    /// Make writes to `channel` fail (or succeed again).
    pub fn set_failing(&self, channel: Channel, failing: bool) {
        if let Ok(mut set) = self.failing.lock() {
            if failing {
                set.insert(channel);
            } else {
                set.remove(&channel);
            }
        }
    }

    pub fn writes(&self) -> u32 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::Relaxed)
    }
}

/// PWM sink that records the commanded duty per channel.
#[derive(Default)]
pub struct SimulatedPwm {
    probe: PwmProbe,
}

impl SimulatedPwm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self) -> PwmProbe {
        self.probe.clone()
    }
}

impl PwmOutput for SimulatedPwm {
    fn set_duty(&mut self, channel: Channel, percent: f32) -> Result<(), BoxError> {
        self.probe.writes.fetch_add(1, Ordering::Relaxed);
        let failing = self
            .probe
            .failing
            .lock()
            .map(|s| s.contains(&channel))
            .unwrap_or(false);
        if failing {
            return Err(Box::new(HwError::Pwm {
                channel: channel.to_string(),
                reason: "simulated write failure".into(),
            }));
        }
        if let Ok(mut d) = self.probe.duties.lock() {
            d.insert(channel, percent);
        }
        debug!(%channel, percent, "simulated pwm write");
        Ok(())
    }

    fn release(&mut self) {
        self.probe.released.store(true, Ordering::Relaxed);
    }
}

/// Switch handle for a [`SimulatedEstop`].
#[derive(Debug, Clone, Default)]
pub struct EstopSwitch {
    pressed: Arc<AtomicBool>,
    broken: Arc<AtomicBool>,
}

impl EstopSwitch {
    pub fn press(&self) {
        self.pressed.store(true, Ordering::Relaxed);
    }
    pub fn release(&self) {
        self.pressed.store(false, Ordering::Relaxed);
    }
    /// Make reads fail, as a disconnected input would.
    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::Relaxed);
    }
}

/// E-stop input wired active-low with a pull-up: pressed reads 0.
#[derive(Default)]
pub struct SimulatedEstop {
    switch: EstopSwitch,
}

impl SimulatedEstop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn switch(&self) -> EstopSwitch {
        self.switch.clone()
    }
}

impl DigitalInput for SimulatedEstop {
    fn read_bit(&mut self) -> Result<u8, BoxError> {
        if self.switch.broken.load(Ordering::Relaxed) {
            return Err(Box::new(HwError::Gpio("simulated input fault".into())));
        }
        Ok(if self.switch.pressed.load(Ordering::Relaxed) {
            0
        } else {
            1
        })
    }
}
