//! Coverage and stability scoring over a bounded history.

use std::collections::VecDeque;

use froth_traits::Frame;
use image::GrayImage;

use crate::config::AnalyzerCfg;
use crate::detector::BubbleObservation;
use crate::metrics::FrothMetrics;
use crate::util::mean_std;

/// Count band where density scores 1.0.
const DENSITY_LOW: f64 = 50.0;
const DENSITY_HIGH: f64 = 200.0;
const DENSITY_FLOOR: f64 = 0.5;

const W_SIZE: f64 = 0.4;
const W_COUNT: f64 = 0.4;
const W_DENSITY: f64 = 0.2;

/// Score reported while fewer than three frames have been seen.
pub const WARMUP_CONSISTENCY: f64 = 0.5;

/// Piecewise density score of a bubble count.
pub fn density_score(count: usize) -> f64 {
    let c = count as f64;
    if c < DENSITY_LOW {
        c / DENSITY_LOW
    } else if c <= DENSITY_HIGH {
        1.0
    } else {
        (1.0 - (c - DENSITY_HIGH) / DENSITY_HIGH).max(DENSITY_FLOOR)
    }
}

/// `1 / (1 + σ/μ)` of the observation diameters; 0 without bubbles.
pub fn size_uniformity(observations: &[BubbleObservation]) -> f64 {
    let (mean, std) = mean_std(observations.iter().map(|o| o.diameter));
    if mean > 0.0 { 1.0 / (1.0 + std / mean) } else { 0.0 }
}

/// FIFO windows of recent bubble counts and average sizes.
#[derive(Debug, Clone)]
pub struct StabilityHistory {
    capacity: usize,
    counts: VecDeque<f64>,
    sizes: VecDeque<f64>,
}

impl StabilityHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            counts: VecDeque::with_capacity(capacity + 1),
            sizes: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn push(&mut self, count: usize, avg_size: f64) {
        self.counts.push_back(count as f64);
        self.sizes.push_back(avg_size);
        while self.counts.len() > self.capacity {
            self.counts.pop_front();
        }
        while self.sizes.len() > self.capacity {
            self.sizes.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn counts(&self) -> impl Iterator<Item = f64> + '_ {
        self.counts.iter().copied()
    }

    pub fn sizes(&self) -> impl Iterator<Item = f64> + '_ {
        self.sizes.iter().copied()
    }

    /// `1 / (1 + σ/μ)` of the count window once it holds three frames.
    pub fn count_consistency(&self) -> f64 {
        if self.counts.len() < 3 {
            return WARMUP_CONSISTENCY;
        }
        let (mean, std) = mean_std(self.counts.iter().copied());
        if mean > 0.0 { 1.0 / (1.0 + std / mean) } else { 0.0 }
    }
}

/// Weighted stability score, clamped to [0, 1].
pub fn froth_stability(size_uniformity: f64, count_consistency: f64, density: f64) -> f64 {
    let s = W_SIZE * size_uniformity + W_COUNT * count_consistency + W_DENSITY * density;
    if s.is_nan() { 0.0 } else { s.clamp(0.0, 1.0) }
}

#[derive(Debug, Clone)]
pub struct FrothAnalyzer {
    history: StabilityHistory,
}

impl Default for FrothAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerCfg::default())
    }
}

impl FrothAnalyzer {
    pub fn new(cfg: AnalyzerCfg) -> Self {
        Self {
            history: StabilityHistory::new(cfg.history_size),
        }
    }

    pub fn history(&self) -> &StabilityHistory {
        &self.history
    }

    /// Score one frame and fold it into the history.
    ///
    /// `captured_at_ms` becomes the metrics timestamp.
    pub fn analyze(
        &mut self,
        frame: &Frame,
        observations: &[BubbleObservation],
        mask: Option<&GrayImage>,
        captured_at_ms: u64,
    ) -> FrothMetrics {
        let total = u64::from(frame.width()) * u64::from(frame.height());
        let coverage = match mask {
            Some(m) if total > 0 => {
                let fg = m.pixels().filter(|p| p.0[0] != 0).count();
                (fg as f64 / total as f64).clamp(0.0, 1.0)
            }
            _ => 0.0,
        };

        let count = observations.len();
        let (avg_size, _) = mean_std(observations.iter().map(|o| o.area));
        let (_, size_std) = mean_std(observations.iter().map(|o| o.diameter));

        self.history.push(count, avg_size);
        let stability = froth_stability(
            size_uniformity(observations),
            self.history.count_consistency(),
            density_score(count),
        );

        FrothMetrics {
            bubble_count: count,
            avg_bubble_size: avg_size,
            size_std_dev: size_std,
            froth_coverage: coverage,
            froth_stability: stability,
            timestamp_ms: captured_at_ms,
            available: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0.0)]
    #[case(25, 0.5)]
    #[case(50, 1.0)]
    #[case(125, 1.0)]
    #[case(200, 1.0)]
    #[case(300, 0.5)]
    #[case(1000, 0.5)]
    fn density_table(#[case] count: usize, #[case] want: f64) {
        assert!((density_score(count) - want).abs() < 1e-12);
    }

    #[test]
    fn consistency_is_half_until_three_frames() {
        let mut h = StabilityHistory::new(10);
        assert_eq!(h.count_consistency(), 0.5);
        h.push(10, 1.0);
        h.push(0, 1.0);
        assert_eq!(h.count_consistency(), 0.5);
        h.push(10, 1.0);
        assert!(h.count_consistency() < 1.0);
    }

    #[test]
    fn identical_counts_are_fully_consistent() {
        let mut h = StabilityHistory::new(4);
        for _ in 0..6 {
            h.push(40, 2.0);
        }
        assert_eq!(h.len(), 4);
        assert_eq!(h.count_consistency(), 1.0);
    }

    #[test]
    fn zero_counts_are_inconsistent() {
        let mut h = StabilityHistory::new(10);
        for _ in 0..3 {
            h.push(0, 0.0);
        }
        assert_eq!(h.count_consistency(), 0.0);
    }

    #[test]
    fn history_evicts_oldest() {
        let mut h = StabilityHistory::new(3);
        for c in 1..=5 {
            h.push(c, c as f64);
        }
        assert_eq!(h.counts().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0]);
        assert_eq!(h.sizes().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn empty_frame_scores_only_warmup() {
        let mut a = FrothAnalyzer::default();
        let m = a.analyze(&Frame::new(0, 0), &[], None, 42);
        assert_eq!(m.bubble_count, 0);
        assert_eq!(m.froth_coverage, 0.0);
        assert_eq!(m.avg_bubble_size, 0.0);
        assert_eq!(m.size_std_dev, 0.0);
        // 0.4·0 + 0.4·0.5 + 0.2·0
        assert!((m.froth_stability - 0.2).abs() < 1e-12);
        assert_eq!(m.timestamp_ms, 42);
        assert!(m.available);
    }

    #[test]
    fn coverage_counts_mask_pixels() {
        let frame = Frame::new(4, 4);
        let mut mask = GrayImage::new(4, 4);
        for x in 0..4 {
            mask.put_pixel(x, 0, image::Luma([255]));
        }
        let obs = [BubbleObservation::from_area(100.0)];
        let m = FrothAnalyzer::default().analyze(&frame, &obs, Some(&mask), 0);
        assert_eq!(m.froth_coverage, 0.25);
        assert_eq!(m.avg_bubble_size, 100.0);
        assert_eq!(m.size_std_dev, 0.0);
    }
}
