//! Per-frame bubble segmentation.
//!
//! Pipeline: grayscale, optional Gaussian blur, inverted Otsu threshold,
//! opening then closing, distance transform, sure-foreground/background
//! split, watershed from the foreground seeds, external contours. Each
//! contour is accepted on area and circularity.
//!
//! Frames that cannot be segmented (empty, flat, all one class) yield
//! [`Segmentation::Degenerate`] instead of an error.

use std::f64::consts::PI;

use froth_traits::Frame;
use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::point::Point;
use imageproc::region_labelling::{Connectivity, connected_components};
use serde::Serialize;
use tracing::trace;

use crate::config::DetectorCfg;
use crate::segment::{self, Markers};

/// One accepted bubble.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BubbleObservation {
    /// Equivalent-circle diameter (px).
    pub diameter: f64,
    /// Contour area (px²).
    pub area: f64,
}

impl BubbleObservation {
    pub fn from_area(area: f64) -> Self {
        Self {
            diameter: 2.0 * (area / PI).sqrt(),
            area,
        }
    }
}

/// Why a frame produced no segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degenerate {
    EmptyFrame,
    NoContrast,
    NoForeground,
    NoBackground,
    NoSeeds,
}

/// Outcome of segmenting one frame.
#[derive(Debug, Clone)]
pub enum Segmentation {
    Segmented {
        observations: Vec<BubbleObservation>,
        /// 255 on every pixel assigned to a bubble.
        mask: GrayImage,
    },
    Degenerate(Degenerate),
}

impl Segmentation {
    pub fn observations(&self) -> &[BubbleObservation] {
        match self {
            Self::Segmented { observations, .. } => observations,
            Self::Degenerate(_) => &[],
        }
    }

    pub fn mask(&self) -> Option<&GrayImage> {
        match self {
            Self::Segmented { mask, .. } => Some(mask),
            Self::Degenerate(_) => None,
        }
    }

    pub fn into_observations(self) -> Vec<BubbleObservation> {
        match self {
            Self::Segmented { observations, .. } => observations,
            Self::Degenerate(_) => Vec::new(),
        }
    }
}

/// Area (shoelace) and closed-polyline perimeter of a contour.
pub fn contour_measure(points: &[Point<i32>]) -> (f64, f64) {
    if points.len() < 2 {
        return (0.0, 0.0);
    }
    let mut twice_area = 0.0;
    let mut perimeter = 0.0;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        let (ax, ay) = (f64::from(a.x), f64::from(a.y));
        let (bx, by) = (f64::from(b.x), f64::from(b.y));
        twice_area += ax * by - bx * ay;
        perimeter += (bx - ax).hypot(by - ay);
    }
    (twice_area.abs() / 2.0, perimeter)
}

/// `4π·area/perimeter²`; `None` for a zero perimeter.
pub fn circularity(area: f64, perimeter: f64) -> Option<f64> {
    (perimeter > 0.0).then(|| 4.0 * PI * area / (perimeter * perimeter))
}

#[derive(Debug, Clone, Default)]
pub struct BubbleDetector {
    cfg: DetectorCfg,
}

impl BubbleDetector {
    pub fn new(cfg: DetectorCfg) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &DetectorCfg {
        &self.cfg
    }

    /// Accepted bubbles in `frame`; empty when nothing can be segmented.
    pub fn detect(&self, frame: &Frame) -> Vec<BubbleObservation> {
        self.segment(frame).into_observations()
    }

    pub fn segment(&self, frame: &Frame) -> Segmentation {
        let cfg = &self.cfg;
        let (w, h) = frame.dimensions();
        if w < 3 || h < 3 {
            return Segmentation::Degenerate(Degenerate::EmptyFrame);
        }

        let mut gray: GrayImage = image::imageops::grayscale(frame);
        if let Some(sigma) = segment::sigma_for_kernel(cfg.blur_kernel) {
            gray = imageproc::filter::gaussian_blur_f32(&gray, sigma);
        }
        let (lo, hi) = gray
            .pixels()
            .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
        if lo == hi {
            return Segmentation::Degenerate(Degenerate::NoContrast);
        }

        let level = imageproc::contrast::otsu_level(&gray);
        let binary = segment::threshold_inv(&gray, level);
        let cleaned = segment::open_close(
            &binary,
            cfg.morph_radius,
            cfg.opening_iterations,
            cfg.closing_iterations,
        );
        if segment::foreground_count(&cleaned) == 0 {
            return Segmentation::Degenerate(Degenerate::NoForeground);
        }
        let Some(dist) = segment::distance_to_background(&cleaned) else {
            return Segmentation::Degenerate(Degenerate::NoBackground);
        };

        let max = dist.iter().copied().fold(0.0_f64, f64::max);
        let cut = cfg.distance_threshold * max;
        let sure_fg = GrayImage::from_fn(w, h, |x, y| {
            let d = dist[(y * w + x) as usize];
            image::Luma([if d > cut { 255 } else { 0 }])
        });
        if segment::foreground_count(&sure_fg) == 0 {
            return Segmentation::Degenerate(Degenerate::NoSeeds);
        }
        let sure_bg = segment::dilate(&cleaned, cfg.background_radius, cfg.background_dilations);
        let unknown = GrayImage::from_fn(w, h, |x, y| {
            let bg = sure_bg.get_pixel(x, y).0[0] != 0;
            let fg = sure_fg.get_pixel(x, y).0[0] != 0;
            image::Luma([if bg && !fg { 255 } else { 0 }])
        });

        let seeds = connected_components(&sure_fg, Connectivity::Eight, image::Luma([0u8]));
        let mut markers = Markers::from_seeds(&seeds, &unknown);
        markers.watershed(frame);
        let mask = markers.bubble_mask();

        let mut observations = Vec::new();
        for contour in find_contours::<i32>(&mask) {
            if !matches!(contour.border_type, BorderType::Outer) || contour.parent.is_some() {
                continue;
            }
            let (area, perimeter) = contour_measure(&contour.points);
            let Some(circ) = circularity(area, perimeter) else {
                continue;
            };
            if area >= cfg.min_bubble_area && circ >= cfg.circularity_threshold {
                observations.push(BubbleObservation::from_area(area));
            }
        }
        trace!(level, accepted = observations.len(), "frame segmented");

        Segmentation::Segmented { observations, mask }
    }
}
