//! Image steps behind the bubble detector.
//!
//! Everything here works on 8-bit masks where 255 is foreground and 0 is
//! background. The watershed follows the classic priority-flood formulation:
//! 256 FIFO buckets keyed by the max-channel colour difference, 4-connectivity,
//! and boundary pixels where two labels meet.

use std::collections::VecDeque;

use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::{Norm, euclidean_squared_distance_transform};
use imageproc::morphology;

/// Marker value for pixels on a boundary between two regions.
pub const BOUNDARY: i32 = -1;
const IN_QUEUE: i32 = -2;
const UNKNOWN: i32 = 0;
/// Label given to the sure-background region.
pub const BACKGROUND: i32 = 1;

const FG: u8 = 255;

/// Gaussian sigma for a square kernel of `ksize` px (OpenCV's rule when no
/// sigma is given). `None` when blurring is a no-op.
pub fn sigma_for_kernel(ksize: u32) -> Option<f32> {
    if ksize <= 1 {
        return None;
    }
    let k = ksize as f32;
    Some(0.3 * ((k - 1.0) * 0.5 - 1.0) + 0.8)
}

/// Inverted binary threshold: pixels at or below `level` become foreground.
pub fn threshold_inv(gray: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y).0[0] > level {
            Luma([0])
        } else {
            Luma([FG])
        }
    })
}

fn radius_times(radius: u8, iterations: u8) -> u8 {
    // Repeated L1 morphology with radius r equals one pass with r·n.
    radius.saturating_mul(iterations)
}

/// Opening followed by closing.
pub fn open_close(mask: &GrayImage, radius: u8, open_iter: u8, close_iter: u8) -> GrayImage {
    let mut out = mask.clone();
    let k = radius_times(radius, open_iter);
    if k > 0 {
        out = morphology::open(&out, Norm::L1, k);
    }
    let k = radius_times(radius, close_iter);
    if k > 0 {
        out = morphology::close(&out, Norm::L1, k);
    }
    out
}

pub fn dilate(mask: &GrayImage, radius: u8, iterations: u8) -> GrayImage {
    match radius_times(radius, iterations) {
        0 => mask.clone(),
        k => morphology::dilate(mask, Norm::L1, k),
    }
}

/// Euclidean distance from each foreground pixel to the nearest background
/// pixel (0 on background), row-major. `None` when the mask has no
/// background pixel to measure against.
pub fn distance_to_background(mask: &GrayImage) -> Option<Vec<f64>> {
    if !mask.pixels().any(|p| p.0[0] == 0) {
        return None;
    }
    let mut inverted = mask.clone();
    for p in inverted.pixels_mut() {
        p.0[0] = if p.0[0] == 0 { FG } else { 0 };
    }
    let sq = euclidean_squared_distance_transform(&inverted);
    Some(sq.pixels().map(|p| p.0[0].sqrt()).collect())
}

pub fn foreground_count(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p.0[0] != 0).count()
}

/// Label grid for marker-guided region growth.
#[derive(Debug, Clone)]
pub struct Markers {
    width: u32,
    height: u32,
    data: Vec<i32>,
}

impl Markers {
    /// Build markers from seed labels (`0` = not a seed) and the unknown mask:
    /// seeds keep `label + 1`, unknown pixels start unlabeled, everything else
    /// becomes [`BACKGROUND`].
    pub fn from_seeds(seeds: &image::ImageBuffer<Luma<u32>, Vec<u32>>, unknown: &GrayImage) -> Self {
        let data = seeds
            .pixels()
            .zip(unknown.pixels())
            .map(|(s, u)| {
                if u.0[0] != 0 {
                    UNKNOWN
                } else {
                    s.0[0] as i32 + 1
                }
            })
            .collect();
        Self {
            width: seeds.width(),
            height: seeds.height(),
            data,
        }
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> i32 {
        self.data[(y * self.width + x) as usize]
    }

    /// Mask of every pixel carrying a bubble label (not boundary, not background).
    pub fn bubble_mask(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.get(x, y) > BACKGROUND {
                Luma([FG])
            } else {
                Luma([0])
            }
        })
    }

    /// Grow labels into the unlabeled pixels, guided by colour similarity.
    ///
    /// The outermost ring is forced to [`BOUNDARY`], so interior neighbours
    /// never leave the grid.
    pub fn watershed(&mut self, image: &RgbImage) {
        let (w, h) = (self.width as usize, self.height as usize);
        if w < 3 || h < 3 {
            self.data.fill(BOUNDARY);
            return;
        }
        for x in 0..w {
            self.data[x] = BOUNDARY;
            self.data[(h - 1) * w + x] = BOUNDARY;
        }
        for y in 0..h {
            self.data[y * w] = BOUNDARY;
            self.data[y * w + w - 1] = BOUNDARY;
        }

        let px = image.as_raw();
        let diff = |a: usize, b: usize| -> usize {
            let (a, b) = (a * 3, b * 3);
            (0..3)
                .map(|c| px[a + c].abs_diff(px[b + c]))
                .max()
                .unwrap_or(0) as usize
        };
        let neighbours = |i: usize| [i - 1, i + 1, i - w, i + w];

        let mut queues: Vec<VecDeque<usize>> = vec![VecDeque::new(); 256];
        let mut active = 256;

        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let i = y * w + x;
                if self.data[i] != UNKNOWN {
                    continue;
                }
                let best = neighbours(i)
                    .into_iter()
                    .filter(|&n| self.data[n] > 0)
                    .map(|n| diff(i, n))
                    .min();
                if let Some(t) = best {
                    queues[t].push_back(i);
                    active = active.min(t);
                    self.data[i] = IN_QUEUE;
                }
            }
        }

        while active < 256 {
            let Some(i) = queues[active].pop_front() else {
                active += 1;
                continue;
            };

            let mut label = UNKNOWN;
            for n in neighbours(i) {
                let l = self.data[n];
                if l > 0 {
                    if label == UNKNOWN {
                        label = l;
                    } else if label != l {
                        label = BOUNDARY;
                    }
                }
            }
            if label == UNKNOWN {
                // Only reachable through a labeled neighbour; keep it inert.
                label = BOUNDARY;
            }
            self.data[i] = label;
            if label == BOUNDARY {
                continue;
            }

            for n in neighbours(i) {
                if self.data[n] == UNKNOWN {
                    let t = diff(i, n);
                    queues[t].push_back(n);
                    active = active.min(t);
                    self.data[n] = IN_QUEUE;
                }
            }
        }
    }
}
