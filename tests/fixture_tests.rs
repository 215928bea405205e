//! End-to-end fixture tests for detection_confusion.
//!
//! Each fixture describes a class map, a metric configuration, a list of
//! images, and the label pairs, matrix and scores an evaluation run must
//! produce.
//!
//! Run with: cargo test fixture

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use approx::assert_relative_eq;
use detection_confusion::{
    BBox, ClassMap, ConfusionMatrixConfig, DetectionRecord, Prediction, SimpleConfusionMatrix,
};

// ============================================================================
// Fixture JSON Schema
// ============================================================================

#[derive(Debug, Deserialize)]
struct Fixture {
    class_map: ClassMap,
    config: ConfusionMatrixConfig,
    images: Vec<ImageJson>,
    expected: Expected,
}

#[derive(Debug, Deserialize)]
struct ImageJson {
    ground_truth: RecordJson,
    prediction: RecordJson,
}

#[derive(Debug, Deserialize)]
struct RecordJson {
    bboxes: Vec<[f64; 4]>,
    labels: Vec<usize>,
    #[serde(default)]
    scores: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct Expected {
    target_labels: Vec<usize>,
    predicted_labels: Vec<usize>,
    matrix: Vec<Vec<usize>>,
    metrics: HashMap<String, f64>,
}

// ============================================================================
// Test Helpers
// ============================================================================

fn find_testdata_dir() -> PathBuf {
    let candidates = [
        PathBuf::from("testdata/fixtures"),
        PathBuf::from("../testdata/fixtures"),
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata/fixtures"),
    ];

    for candidate in &candidates {
        if candidate.exists() {
            return candidate.clone();
        }
    }
    panic!("Could not find testdata/fixtures directory");
}

fn load_fixture(scenario: &str) -> Fixture {
    let path = find_testdata_dir().join(format!("fixture_{}.json", scenario));

    let content = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture file {:?}: {}", path, e));

    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture file {:?}: {}", path, e))
}

fn to_record(json: &RecordJson, class_map: &Arc<ClassMap>) -> DetectionRecord {
    let bboxes = json
        .bboxes
        .iter()
        .map(|b| BBox::from_xyxy(b[0], b[1], b[2], b[3]).expect("valid box"))
        .collect();

    DetectionRecord::with_config(bboxes, json.labels.clone(), json.scores.clone(), class_map.clone())
        .expect("valid record")
}

fn run_fixture(scenario: &str) {
    let fixture = load_fixture(scenario);
    let class_map = Arc::new(fixture.class_map);

    let predictions: Vec<Prediction> = fixture
        .images
        .iter()
        .map(|image| {
            Prediction::new(
                to_record(&image.ground_truth, &class_map),
                to_record(&image.prediction, &class_map),
            )
        })
        .collect();

    let mut metric = SimpleConfusionMatrix::new(fixture.config).expect("valid config");
    metric.accumulate(&predictions).expect("accumulate");

    assert_eq!(
        metric.target_labels(),
        fixture.expected.target_labels.as_slice(),
        "{}: target labels",
        scenario
    );
    assert_eq!(
        metric.predicted_labels(),
        fixture.expected.predicted_labels.as_slice(),
        "{}: predicted labels",
        scenario
    );

    let report = metric.finalize().expect("finalize");

    let n = fixture.expected.matrix.len();
    assert_eq!(report.matrix.shape(), (n, n), "{}: matrix shape", scenario);
    for (i, row) in fixture.expected.matrix.iter().enumerate() {
        for (j, &count) in row.iter().enumerate() {
            assert_eq!(report.matrix[(i, j)], count, "{}: matrix[{}][{}]", scenario, i, j);
        }
    }

    let values = report.to_named_values();
    assert_eq!(values.len(), fixture.expected.metrics.len(), "{}: metric count", scenario);
    for (key, value) in values {
        let expected = fixture
            .expected
            .metrics
            .get(&key)
            .unwrap_or_else(|| panic!("{}: unexpected metric {}", scenario, key));
        assert_relative_eq!(value, *expected, epsilon = 1e-9);
    }

    assert!(metric.target_labels().is_empty(), "{}: state not reset", scenario);
}

// ============================================================================
// Fixtures
// ============================================================================

#[test]
fn test_fixture_mixed_scene() {
    run_fixture("mixed_scene");
}

#[test]
fn test_fixture_background_misses() {
    run_fixture("background_misses");
}
