use ndarray::Array2;

use terraclass::config::{ClassifierKind, ClassifierParams, TrainingSource};
use terraclass::raster::{Band, Product};
use terraclass::supervised::{SupervisedClassifier, LABEL_BAND_NAME};
use terraclass::vector::PolygonVector;

/// 8x8 product whose single feature band is dark on the left half and
/// bright on the right half.
fn test_product() -> Product {
    let feature = Array2::from_shape_fn((8, 8), |(r, c)| {
        if c < 4 {
            5.0 + 0.1 * r as f64
        } else {
            50.0 + 0.1 * r as f64
        }
    });
    Product::new("scene", vec![Band::new("feat", feature)])
}

fn square(name: &str, x0: f64, y0: f64, w: f64, h: f64) -> PolygonVector {
    PolygonVector::new(
        name,
        vec![(x0, y0), (x0 + w, y0), (x0 + w, y0 + h), (x0, y0 + h)],
    )
}

fn params() -> ClassifierParams {
    ClassifierParams {
        kind: ClassifierKind::MinimumDistance,
        saved_classifier_name: "polygon_test".to_string(),
        num_train_samples: 16,
        training: TrainingSource::Polygons {
            vectors: vec!["water".to_string(), "forest".to_string()],
            label_attribute: None,
        },
        feature_bands: Some(vec!["feat".to_string()]),
        evaluate_classifier: true,
        ..ClassifierParams::default()
    }
}

#[test]
fn polygon_training_classifies_both_halves() {
    let storage = tempfile::tempdir().unwrap();
    let polygons = vec![
        square("water", 0.0, 0.0, 4.0, 8.0),
        square("forest", 4.0, 0.0, 4.0, 8.0),
    ];
    let classifier = SupervisedClassifier::new(
        params(),
        vec![test_product()],
        polygons,
        storage.path().to_path_buf(),
        false,
    )
    .unwrap();

    assert_eq!(classifier.class_labels().get(&0).unwrap(), "water");
    assert_eq!(classifier.class_labels().get(&1).unwrap(), "forest");

    let target = classifier.classify_to_product().unwrap();
    let (_, label_band) = target.band(LABEL_BAND_NAME).unwrap();
    assert_eq!(label_band.data[(4, 0)], 0.0); // water side
    assert_eq!(label_band.data[(4, 7)], 1.0); // forest side
    assert_eq!(label_band.no_data, Some(-1.0));
    assert_eq!(label_band.unit.as_deref(), Some("discrete classes"));
}

#[test]
fn attribute_values_define_the_classes() {
    let storage = tempfile::tempdir().unwrap();
    // two polygons share one attribute value, so only two classes emerge
    let polygons = vec![
        square("west_lake", 0.0, 0.0, 4.0, 4.0).with_attribute("cover", "water"),
        square("south_lake", 0.0, 4.0, 4.0, 4.0).with_attribute("cover", "water"),
        square("pines", 4.0, 0.0, 4.0, 8.0).with_attribute("cover", "forest"),
    ];
    let mut p = params();
    p.training = TrainingSource::Polygons {
        vectors: vec![
            "west_lake".to_string(),
            "south_lake".to_string(),
            "pines".to_string(),
        ],
        label_attribute: Some("cover".to_string()),
    };
    let classifier = SupervisedClassifier::new(
        p,
        vec![test_product()],
        polygons,
        storage.path().to_path_buf(),
        false,
    )
    .unwrap();

    assert_eq!(classifier.class_labels().len(), 2);
    assert_eq!(classifier.class_labels().get(&0).unwrap(), "water");
    assert_eq!(classifier.class_labels().get(&1).unwrap(), "forest");

    let target = classifier.classify_to_product().unwrap();
    let (_, label_band) = target.band(LABEL_BAND_NAME).unwrap();
    assert_eq!(label_band.data[(6, 1)], 0.0);
    assert_eq!(label_band.data[(1, 6)], 1.0);
}

#[test]
fn one_training_vector_is_rejected() {
    let storage = tempfile::tempdir().unwrap();
    let mut p = params();
    p.training = TrainingSource::Polygons {
        vectors: vec!["water".to_string()],
        label_attribute: None,
    };
    let result = SupervisedClassifier::new(
        p,
        vec![test_product()],
        vec![square("water", 0.0, 0.0, 4.0, 8.0)],
        storage.path().to_path_buf(),
        false,
    );
    assert!(result.is_err());
}

#[test]
fn missing_vector_is_rejected() {
    let storage = tempfile::tempdir().unwrap();
    let result = SupervisedClassifier::new(
        params(),
        vec![test_product()],
        vec![square("water", 0.0, 0.0, 4.0, 8.0)],
        storage.path().to_path_buf(),
        false,
    );
    assert!(result.unwrap_err().to_string().contains("forest"));
}

#[test]
fn missing_label_attribute_is_rejected() {
    let storage = tempfile::tempdir().unwrap();
    let polygons = vec![
        square("water", 0.0, 0.0, 4.0, 8.0).with_attribute("cover", "water"),
        square("forest", 4.0, 0.0, 4.0, 8.0), // no attribute
    ];
    let mut p = params();
    p.training = TrainingSource::Polygons {
        vectors: vec!["water".to_string(), "forest".to_string()],
        label_attribute: Some("cover".to_string()),
    };
    let result = SupervisedClassifier::new(
        p,
        vec![test_product()],
        polygons,
        storage.path().to_path_buf(),
        false,
    );
    assert!(result.is_err());
}
