//! Latest-metrics snapshot and the pipeline that produces it.

use std::sync::Arc;

use froth_traits::Camera;
use froth_traits::clock::Clock;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use crate::analyzer::FrothAnalyzer;
use crate::detector::BubbleDetector;
use crate::frame_source::{CaptureOutcome, DropReason, FrameSource};

/// Froth measurements for one analyzed frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FrothMetrics {
    pub bubble_count: usize,
    /// Mean contour area (px²).
    pub avg_bubble_size: f64,
    /// Population std-dev of bubble diameters (px).
    pub size_std_dev: f64,
    pub froth_coverage: f64,
    pub froth_stability: f64,
    /// Capture time (unix ms).
    pub timestamp_ms: u64,
    /// False until the first frame has been analyzed.
    pub available: bool,
}

/// Single overwritten slot holding the latest metrics.
///
/// Readers copy out and release the lock immediately.
#[derive(Debug, Default)]
pub struct MetricsSlot {
    inner: RwLock<FrothMetrics>,
}

impl MetricsSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> FrothMetrics {
        *self.inner.read()
    }

    pub fn publish(&self, metrics: FrothMetrics) {
        *self.inner.write() = metrics;
    }
}

/// Result of one metrics cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Cycle {
    Published(FrothMetrics),
    /// No frame this cycle; the previous snapshot is left in place.
    Held(DropReason),
}

/// Frame source, detector and analyzer wired to a [`MetricsSlot`].
pub struct MetricsPipeline<Cam: Camera, C: Clock> {
    source: FrameSource<Cam, C>,
    detector: BubbleDetector,
    analyzer: FrothAnalyzer,
    slot: Arc<MetricsSlot>,
}

impl<Cam: Camera, C: Clock> MetricsPipeline<Cam, C> {
    pub fn new(
        source: FrameSource<Cam, C>,
        detector: BubbleDetector,
        analyzer: FrothAnalyzer,
        slot: Arc<MetricsSlot>,
    ) -> Self {
        Self {
            source,
            detector,
            analyzer,
            slot,
        }
    }

    pub fn slot(&self) -> &Arc<MetricsSlot> {
        &self.slot
    }

    /// Capture, segment, score and publish one frame.
    pub fn run_once(&mut self) -> Cycle {
        let captured = match self.source.capture() {
            CaptureOutcome::Frame(f) => f,
            CaptureOutcome::Dropped(why) => {
                debug!(?why, "metrics held");
                return Cycle::Held(why);
            }
        };
        let seg = self.detector.segment(&captured.image);
        let metrics = self.analyzer.analyze(
            &captured.image,
            seg.observations(),
            seg.mask(),
            captured.captured_at_ms,
        );
        self.slot.publish(metrics);
        debug!(
            count = metrics.bubble_count,
            coverage = metrics.froth_coverage,
            stability = metrics.froth_stability,
            "metrics published"
        );
        Cycle::Published(metrics)
    }

    /// Release the camera. Safe to call repeatedly.
    pub fn release(&mut self) {
        self.source.release();
        info!("metrics pipeline stopped");
    }
}
