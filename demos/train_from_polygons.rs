use anyhow::Result;
use ndarray::Array2;

use terraclass::config::{ClassifierKind, ClassifierParams, TrainingSource};
use terraclass::raster::{Band, Product};
use terraclass::supervised::{SupervisedClassifier, LABEL_BAND_NAME};
use terraclass::vector::PolygonVector;

fn rectangle(name: &str, x0: f64, y0: f64, w: f64, h: f64) -> PolygonVector {
    PolygonVector::new(
        name,
        vec![(x0, y0), (x0 + w, y0), (x0 + w, y0 + h), (x0, y0 + h)],
    )
}

fn main() -> Result<()> {
    env_logger::init();

    // 32x32 scene, brightness increases left to right
    let feature = Array2::from_shape_fn((32, 32), |(r, c)| c as f64 * 3.0 + (r % 5) as f64);
    let product = Product::new("demo_scene", vec![Band::new("brightness", feature)]);

    // three labeled regions drawn by an operator
    let polygons = vec![
        rectangle("water", 0.0, 0.0, 10.0, 32.0),
        rectangle("fields", 11.0, 0.0, 10.0, 32.0),
        rectangle("urban", 22.0, 0.0, 10.0, 32.0),
    ];

    let params = ClassifierParams {
        kind: ClassifierKind::KNearestNeighbour { k: 5 },
        saved_classifier_name: "demo_polygons".to_string(),
        num_train_samples: 300,
        training: TrainingSource::Polygons {
            vectors: vec![
                "water".to_string(),
                "fields".to_string(),
                "urban".to_string(),
            ],
            label_attribute: None,
        },
        evaluate_classifier: true,
        ..ClassifierParams::default()
    };

    let storage = std::env::temp_dir().join("terraclass_demo");
    let classifier =
        SupervisedClassifier::new(params, vec![product], polygons, storage, false)?;

    let target = classifier.classify_to_product()?;
    let (_, labels) = target.band(LABEL_BAND_NAME).expect("label band");

    for (class, label) in classifier.class_labels() {
        let count = labels.data.iter().filter(|&&v| v == *class as f64).count();
        println!("{:<8} (class {}): {} pixels", label, class, count);
    }

    Ok(())
}
