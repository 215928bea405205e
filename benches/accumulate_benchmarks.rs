//! Accumulate / finalize benchmarks using Criterion.
//!
//! Run with: cargo bench

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use detection_confusion::{
    BBox, ClassMap, ConfusionMatrixConfig, DetectionRecord, Prediction, SimpleConfusionMatrix,
    UnmatchedTargetPolicy,
};

/// Create one image with `n` ground-truth boxes and `n` slightly shifted predictions.
fn create_test_image(n: usize, class_map: &Arc<ClassMap>) -> Prediction {
    let num_classes = class_map.num_classes();
    let mut gt_boxes = Vec::with_capacity(n);
    let mut pred_boxes = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    let mut scores = Vec::with_capacity(n);

    for i in 0..n {
        let x = (i * 100) as f64;
        let y = (i * 50) as f64;
        gt_boxes.push(BBox::from_xyxy(x, y, x + 50.0, y + 50.0).expect("valid box"));
        pred_boxes.push(BBox::from_xyxy(x + 2.0, y + 2.0, x + 52.0, y + 52.0).expect("valid box"));
        labels.push(1 + i % (num_classes - 1));
        scores.push(0.5 + (i % 5) as f64 * 0.1);
    }

    let gt = DetectionRecord::ground_truth(gt_boxes, labels.clone(), class_map.clone())
        .expect("valid record");
    let pred = DetectionRecord::predicted(pred_boxes, labels, scores, class_map.clone())
        .expect("valid record");
    Prediction::new(gt, pred)
}

fn create_batch(images: usize, boxes: usize) -> Vec<Prediction> {
    let class_map = Arc::new(ClassMap::with_background(["Infra", "Vessel", "Buoy"]).expect("valid map"));
    (0..images).map(|_| create_test_image(boxes, &class_map)).collect()
}

fn benchmark_accumulate_10_boxes(c: &mut Criterion) {
    let batch = create_batch(32, 10);
    let mut metric = SimpleConfusionMatrix::default();

    c.bench_function("accumulate_32_images_10_boxes", |b| {
        b.iter(|| {
            metric.accumulate(black_box(&batch)).expect("accumulate");
            metric.reset();
        })
    });
}

fn benchmark_accumulate_100_boxes(c: &mut Criterion) {
    let batch = create_batch(32, 100);
    let mut metric = SimpleConfusionMatrix::default();

    c.bench_function("accumulate_32_images_100_boxes", |b| {
        b.iter(|| {
            metric.accumulate(black_box(&batch)).expect("accumulate");
            metric.reset();
        })
    });
}

fn benchmark_accumulate_100_boxes_background_misses(c: &mut Criterion) {
    let batch = create_batch(32, 100);
    let mut config = ConfusionMatrixConfig::default();
    config.unmatched_targets = UnmatchedTargetPolicy::Background;
    let mut metric = SimpleConfusionMatrix::new(config).expect("valid config");

    c.bench_function("accumulate_32_images_100_boxes_background_misses", |b| {
        b.iter(|| {
            metric.accumulate(black_box(&batch)).expect("accumulate");
            metric.reset();
        })
    });
}

fn benchmark_finalize(c: &mut Criterion) {
    let batch = create_batch(32, 100);
    let mut metric = SimpleConfusionMatrix::default();

    c.bench_function("accumulate_and_finalize_32_images_100_boxes", |b| {
        b.iter(|| {
            metric.accumulate(black_box(&batch)).expect("accumulate");
            black_box(metric.finalize().expect("finalize"));
        })
    });
}

criterion_group!(
    benches,
    benchmark_accumulate_10_boxes,
    benchmark_accumulate_100_boxes,
    benchmark_accumulate_100_boxes_background_misses,
    benchmark_finalize,
);
criterion_main!(benches);
