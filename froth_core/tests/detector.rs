use froth_core::detector::Degenerate;
use froth_core::{BubbleDetector, DetectorCfg, FrothAnalyzer, Segmentation};
use froth_hardware::render_froth;
use froth_traits::Frame;
use image::Rgb;

#[test]
fn all_background_frame_yields_nothing() {
    let frame = render_froth(320, 240, 0, 9, 1);
    let det = BubbleDetector::default();
    assert!(det.detect(&frame).is_empty());
    assert!(matches!(
        det.segment(&frame),
        Segmentation::Degenerate(Degenerate::NoContrast)
    ));
}

#[test]
fn tiny_frames_do_not_panic() {
    let det = BubbleDetector::default();
    for (w, h) in [(0, 0), (1, 1), (2, 5), (3, 3)] {
        let mut frame = Frame::from_pixel(w, h, Rgb([200, 200, 200]));
        if w > 0 && h > 0 {
            frame.put_pixel(0, 0, Rgb([0, 0, 0]));
        }
        let _ = det.detect(&frame);
    }
}

#[test]
fn counts_synthetic_discs() {
    let frame = render_froth(320, 240, 20, 9, 3);
    let seg = BubbleDetector::default().segment(&frame);
    assert_eq!(seg.observations().len(), 20);
    let mask = seg.mask().expect("segmented");
    assert_eq!(mask.dimensions(), (320, 240));
}

#[test]
fn detection_is_deterministic() {
    let frame = render_froth(200, 150, 12, 8, 11);
    let det = BubbleDetector::default();
    assert_eq!(det.detect(&frame), det.detect(&frame));
}

#[test]
fn area_floor_filters_small_discs() {
    let frame = render_froth(200, 150, 10, 4, 5);
    let det = BubbleDetector::new(DetectorCfg {
        min_bubble_area: 80.0,
        ..DetectorCfg::default()
    });
    assert!(det.detect(&frame).is_empty());
}

#[test]
fn coverage_reflects_bubble_pixels() {
    let frame = render_froth(320, 240, 20, 9, 3);
    let seg = BubbleDetector::default().segment(&frame);
    let m = FrothAnalyzer::default().analyze(&frame, seg.observations(), seg.mask(), 7);
    assert_eq!(m.bubble_count, 20);
    // 20 discs of r≈9 over 76 800 px is a few percent.
    assert!(m.froth_coverage > 0.02 && m.froth_coverage < 0.2, "{m:?}");
    assert!(m.avg_bubble_size > 80.0);
    assert!((0.0..=1.0).contains(&m.froth_stability));
}

fn two_touching_discs(radius: i64, overlap: i64) -> Frame {
    let mut frame = Frame::from_pixel(100, 70, Rgb([214, 208, 196]));
    let cy = 35;
    let left = 50 - radius + overlap / 2;
    let right = left + 2 * radius - overlap;
    for (x, y, px) in frame.enumerate_pixels_mut() {
        let (x, y) = (i64::from(x), i64::from(y));
        let inside = |cx: i64| (x - cx).pow(2) + (y - cy).pow(2) <= radius * radius;
        if inside(left) || inside(right) {
            *px = Rgb([38, 42, 50]);
        }
    }
    frame
}

#[test]
fn watershed_splits_touching_bubbles() {
    let frame = two_touching_discs(12, 2);
    let det = BubbleDetector::new(DetectorCfg {
        distance_threshold: 0.6,
        ..DetectorCfg::default()
    });
    let bubbles = det.detect(&frame);
    assert_eq!(bubbles.len(), 2, "{bubbles:?}");
    for b in &bubbles {
        assert!(b.area > 250.0 && b.area < 460.0, "{b:?}");
    }
    let (a, b) = (bubbles[0].area, bubbles[1].area);
    assert!((a - b).abs() / a.max(b) < 0.15, "uneven split {a} vs {b}");
}

#[test]
fn low_distance_threshold_keeps_touching_bubbles_merged() {
    let frame = two_touching_discs(12, 2);
    let bubbles = BubbleDetector::default().detect(&frame);
    assert_eq!(bubbles.len(), 1, "{bubbles:?}");
    assert!(bubbles[0].area > 600.0, "{:?}", bubbles[0]);
}
