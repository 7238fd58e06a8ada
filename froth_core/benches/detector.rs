use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use froth_core::{BubbleDetector, FrothAnalyzer};
use froth_hardware::render_froth;

fn bench_detector(c: &mut Criterion) {
    let frame = render_froth(640, 480, 120, 9, 1);
    let det = BubbleDetector::default();
    c.bench_function("detect_640x480_120", |b| {
        b.iter(|| black_box(det.detect(black_box(&frame))))
    });

    c.bench_function("segment_and_analyze", |b| {
        b.iter_batched(
            FrothAnalyzer::default,
            |mut analyzer| {
                let seg = det.segment(&frame);
                black_box(analyzer.analyze(&frame, seg.observations(), seg.mask(), 0))
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_detector);
criterion_main!(benches);
