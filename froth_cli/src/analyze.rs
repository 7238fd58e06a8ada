//! Offline analysis of a single image file.

use std::path::Path;

use eyre::{Result, WrapErr};
use froth_config::Config;
use froth_core::detector::{BubbleObservation, Degenerate};
use froth_core::{AnalyzerCfg, BubbleDetector, DetectorCfg, FrothAnalyzer, FrothMetrics, Segmentation};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Report {
    pub width: u32,
    pub height: u32,
    pub metrics: FrothMetrics,
    pub bubbles: Vec<BubbleObservation>,
    /// Set when the frame could not be segmented.
    pub degenerate: Option<String>,
}

fn degenerate_name(d: Degenerate) -> &'static str {
    match d {
        Degenerate::EmptyFrame => "empty_frame",
        Degenerate::NoContrast => "no_contrast",
        Degenerate::NoForeground => "no_foreground",
        Degenerate::NoBackground => "no_background",
        Degenerate::NoSeeds => "no_seeds",
    }
}

pub fn analyze_file(path: &Path, cfg: &Config) -> Result<Report> {
    let img = image::open(path)
        .wrap_err_with(|| format!("open image {}", path.display()))?
        .to_rgb8();
    let detector = BubbleDetector::new(DetectorCfg::from(&cfg.vision));
    let mut analyzer = FrothAnalyzer::new(AnalyzerCfg::from(&cfg.analysis));

    let seg = detector.segment(&img);
    let metrics = analyzer.analyze(&img, seg.observations(), seg.mask(), 0);
    let degenerate = match &seg {
        Segmentation::Degenerate(d) => Some(degenerate_name(*d).to_string()),
        Segmentation::Segmented { .. } => None,
    };
    tracing::info!(
        path = %path.display(),
        count = metrics.bubble_count,
        coverage = metrics.froth_coverage,
        "image analyzed"
    );
    Ok(Report {
        width: img.width(),
        height: img.height(),
        metrics,
        bubbles: seg.into_observations(),
        degenerate,
    })
}

pub fn print_report(report: &Report, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
        return Ok(());
    }
    let m = &report.metrics;
    println!("image: {}x{}", report.width, report.height);
    if let Some(d) = &report.degenerate {
        println!("segmentation: none ({d})");
    }
    println!("bubbles: {}", m.bubble_count);
    println!("avg_bubble_size: {:.1} px^2", m.avg_bubble_size);
    println!("size_std_dev: {:.2} px", m.size_std_dev);
    println!("froth_coverage: {:.3}", m.froth_coverage);
    println!("froth_stability: {:.3}", m.froth_stability);
    Ok(())
}
