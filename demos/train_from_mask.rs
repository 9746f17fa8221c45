use anyhow::Result;
use ndarray::Array2;

use terraclass::config::{ClassifierKind, ClassifierParams, TrainingSource};
use terraclass::raster::{Band, Product};
use terraclass::supervised::{SupervisedClassifier, CONFIDENCE_BAND_NAME, LABEL_BAND_NAME};

/// Build a synthetic 64x64 scene: a training mask with three landcover
/// classes and two feature bands that roughly track them.
fn synthetic_product() -> Product {
    let size = 64;
    let mask = Array2::from_shape_fn((size, size), |(_, c)| (c * 3 / size) as f64);
    let feat_a = Array2::from_shape_fn((size, size), |(r, c)| {
        (c * 3 / size) as f64 * 10.0 + (r % 4) as f64
    });
    let feat_b = Array2::from_shape_fn((size, size), |(r, c)| {
        100.0 - (c * 3 / size) as f64 * 30.0 + (r % 7) as f64
    });
    Product::new(
        "synthetic_scene",
        vec![
            Band::new("landcover_mask", mask),
            Band::new("feat_a", feat_a),
            Band::new("feat_b", feat_b),
        ],
    )
}

fn main() -> Result<()> {
    env_logger::init();

    let params = ClassifierParams {
        kind: ClassifierKind::MaximumLikelihood,
        saved_classifier_name: "demo_mask".to_string(),
        num_train_samples: 500,
        training: TrainingSource::MaskBand {
            band: Some("landcover_mask".to_string()),
        },
        evaluate_classifier: true,
        ..ClassifierParams::default()
    };

    let storage = std::env::temp_dir().join("terraclass_demo");
    let classifier = SupervisedClassifier::new(
        params,
        vec![synthetic_product()],
        Vec::new(),
        storage.clone(),
        false,
    )?;

    let target = classifier.classify_to_product()?;
    let (_, labels) = target.band(LABEL_BAND_NAME).expect("label band");
    let (_, confidence) = target.band(CONFIDENCE_BAND_NAME).expect("confidence band");

    let mean_confidence: f64 =
        confidence.data.iter().sum::<f64>() / confidence.data.len() as f64;
    println!("classified product: {}", target.name);
    println!(
        "label range: {:?}",
        labels.min_max().expect("labels present")
    );
    println!("mean confidence: {:.3}", mean_confidence);
    println!("model saved under {}", storage.display());

    Ok(())
}
