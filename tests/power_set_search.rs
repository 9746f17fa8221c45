use ndarray::Array2;

use terraclass::config::{ClassifierKind, ClassifierParams, TrainingSource};
use terraclass::io::load_descriptor;
use terraclass::raster::{Band, Product};
use terraclass::supervised::SupervisedClassifier;

/// 6x6 product with three feature bands; only `separating` tracks the mask.
fn test_product() -> Product {
    let mask = Array2::from_shape_fn((6, 6), |(_, c)| if c < 3 { 0.0 } else { 1.0 });
    let separating = Array2::from_shape_fn((6, 6), |(_, c)| if c < 3 { 10.0 } else { 90.0 });
    let noise_a = Array2::from_shape_fn((6, 6), |(r, _)| 40.0 + r as f64);
    let noise_b = Array2::from_shape_fn((6, 6), |(r, c)| ((r * 6 + c) % 5) as f64);
    Product::new(
        "scene",
        vec![
            Band::new("mask", mask),
            Band::new("separating", separating),
            Band::new("noise_a", noise_a),
            Band::new("noise_b", noise_b),
        ],
    )
}

#[test]
fn power_set_search_retains_a_winning_subset() {
    let storage = tempfile::tempdir().unwrap();
    let params = ClassifierParams {
        kind: ClassifierKind::MinimumDistance,
        saved_classifier_name: "power_set".to_string(),
        num_train_samples: 18,
        training: TrainingSource::MaskBand {
            band: Some("mask".to_string()),
        },
        feature_bands: Some(vec![
            "separating".to_string(),
            "noise_a".to_string(),
            "noise_b".to_string(),
        ]),
        evaluate_classifier: true,
        evaluate_feature_power_set: true,
        min_power_set_size: 1,
        max_power_set_size: 3,
        ..ClassifierParams::default()
    };
    let classifier = SupervisedClassifier::new(
        params,
        vec![test_product()],
        Vec::new(),
        storage.path().to_path_buf(),
        false,
    )
    .unwrap();
    classifier.train().unwrap();

    // 2^3 - 1 subsets evaluated, each recorded in the report
    let report = std::fs::read_to_string(
        storage
            .path()
            .join("classifiers")
            .join("MinimumDistance")
            .join("power_set.report.txt"),
    )
    .unwrap();
    let subset_lines = report.lines().filter(|l| l.contains(": cv ")).count();
    assert_eq!(subset_lines, 7);
    assert!(report.contains("TOP Classifier"));

    // the retained model's feature list is the winning subset, and any
    // winning subset must include the separating band
    let descriptor = load_descriptor(storage.path(), "MinimumDistance", "power_set").unwrap();
    assert!(descriptor
        .feature_names
        .iter()
        .any(|name| name == "separating"));
    assert_eq!(
        descriptor.feature_names.len(),
        descriptor.feature_min_values.len()
    );
}
