use ndarray::Array2;

use terraclass::config::{ClassifierKind, ClassifierParams, Quantizer, TrainingSource};
use terraclass::extraction::extract_from_mask;
use terraclass::features::FeatureInfo;
use terraclass::raster::{Band, Product, Rect};
use terraclass::supervised::{SupervisedClassifier, CONFIDENCE_BAND_NAME, LABEL_BAND_NAME};

/// 4x4 product: mask splits the image into two classes, two feature bands
/// with value ranges [0, 10] and [0, 100] that track the class.
fn test_product() -> Product {
    let mask = Array2::from_shape_fn((4, 4), |(_, c)| if c < 2 { 0.0 } else { 1.0 });
    let feat_a = Array2::from_shape_fn((4, 4), |(r, c)| {
        if c < 2 {
            1.0 + 0.5 * r as f64
        } else {
            8.0 + 0.5 * r as f64
        }
    });
    let feat_b = Array2::from_shape_fn((4, 4), |(r, c)| {
        if c < 2 {
            10.0 + 2.0 * r as f64
        } else {
            80.0 + 2.0 * r as f64
        }
    });
    Product::new(
        "scene",
        vec![
            Band::new("training", mask),
            Band::new("feat_a", feat_a),
            Band::new("feat_b", feat_b),
        ],
    )
}

fn params(kind: ClassifierKind) -> ClassifierParams {
    ClassifierParams {
        kind,
        saved_classifier_name: "mask_test".to_string(),
        num_train_samples: 8,
        training: TrainingSource::MaskBand {
            band: Some("training".to_string()),
        },
        feature_bands: Some(vec!["feat_a".to_string(), "feat_b".to_string()]),
        evaluate_classifier: true,
        ..ClassifierParams::default()
    }
}

#[test]
fn extraction_yields_all_sixteen_normalized_instances() {
    let product = test_product();
    let products = vec![product];
    let infos = vec![
        FeatureInfo::from_band(0, 1, 0, &products[0].bands[1]).unwrap(),
        FeatureInfo::from_band(0, 2, 1, &products[0].bands[2]).unwrap(),
    ];
    let quantizer = Quantizer {
        enabled: false,
        min_value: 0.0,
        max_value: 0.0,
        step_size: 0.0,
    };
    let instances = extract_from_mask(
        &products,
        &products[0].bands[0],
        f64::NAN,
        &infos,
        100,
        quantizer,
    )
    .unwrap();

    assert_eq!(instances.len(), 16);
    for instance in &instances {
        assert_eq!(instance.features.len(), 2);
        for &f in &instance.features {
            assert!((0.0..=1.0).contains(&f), "feature {} outside [0,1]", f);
        }
        assert!(instance.class_value == 0.0 || instance.class_value == 1.0);
    }
}

#[test]
fn training_produces_valid_label_and_confidence_bands() {
    let storage = tempfile::tempdir().unwrap();
    let classifier = SupervisedClassifier::new(
        params(ClassifierKind::MaximumLikelihood),
        vec![test_product()],
        Vec::new(),
        storage.path().to_path_buf(),
        false,
    )
    .unwrap();

    let target = classifier.classify_to_product().unwrap();
    assert_eq!(target.name, "scene_classified");
    let (_, label_band) = target.band(LABEL_BAND_NAME).unwrap();
    let (_, confidence_band) = target.band(CONFIDENCE_BAND_NAME).unwrap();

    for &label in label_band.data.iter() {
        assert!(label == 0.0 || label == 1.0);
    }
    for &conf in confidence_band.data.iter() {
        assert!(conf > 0.0 && conf <= 1.0, "confidence {} outside (0,1]", conf);
    }
    // the two halves of the image get the two mask classes back
    assert_eq!(label_band.data[(0, 0)], 0.0);
    assert_eq!(label_band.data[(3, 3)], 1.0);

    // the model and its report were persisted
    let dir = storage.path().join("classifiers").join("MaximumLikelihood");
    assert!(dir.join("mask_test.classifier").exists());
    assert!(dir.join("mask_test.txt").exists());
    let report = std::fs::read_to_string(dir.join("mask_test.report.txt")).unwrap();
    assert!(report.contains("cross validation"));

    // evaluation percentage in the report is a number within [0, 100]
    let pct: f64 = report
        .lines()
        .find(|l| l.contains("cross validation"))
        .and_then(|l| l.split_whitespace().last())
        .map(|s| s.trim_end_matches('%').parse().unwrap())
        .unwrap();
    assert!((0.0..=100.0).contains(&pct));
}

#[test]
fn tile_requests_train_lazily_exactly_once() {
    let storage = tempfile::tempdir().unwrap();
    let classifier = SupervisedClassifier::new(
        params(ClassifierKind::KNearestNeighbour { k: 3 }),
        vec![test_product()],
        Vec::new(),
        storage.path().to_path_buf(),
        false,
    )
    .unwrap();

    assert!(!classifier.is_ready());
    let tile = classifier.classify_tile(&Rect::new(0, 0, 2, 2)).unwrap();
    assert!(classifier.is_ready());
    assert_eq!(tile.labels.dim(), (2, 2));
    assert_eq!(tile.labels[(0, 0)], 0.0);

    // second request reuses the trained model
    let tile2 = classifier.classify_tile(&Rect::new(0, 2, 2, 2)).unwrap();
    assert_eq!(tile2.labels[(0, 0)], 1.0);
}

#[test]
fn mask_band_must_not_be_a_feature_band() {
    let storage = tempfile::tempdir().unwrap();
    let mut bad = params(ClassifierKind::MaximumLikelihood);
    bad.feature_bands = Some(vec!["training".to_string(), "feat_a".to_string()]);
    let classifier = SupervisedClassifier::new(
        bad,
        vec![test_product()],
        Vec::new(),
        storage.path().to_path_buf(),
        false,
    )
    .unwrap();
    let err = classifier.train().unwrap_err();
    assert!(err.to_string().contains("training band"));
}

#[test]
fn mismatched_product_dimensions_fail_fast() {
    let storage = tempfile::tempdir().unwrap();
    let small = Product::new("other", vec![Band::new("extra", Array2::zeros((2, 2)))]);
    let result = SupervisedClassifier::new(
        params(ClassifierKind::MaximumLikelihood),
        vec![test_product(), small],
        Vec::new(),
        storage.path().to_path_buf(),
        false,
    );
    assert!(result.is_err());
}
