use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ClassifierError, Result};

/// Supported classifier kinds and their hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum ClassifierKind {
    KNearestNeighbour {
        k: usize,
    },
    MinimumDistance,
    MaximumLikelihood,
    GradientBoostedTrees {
        max_depth: u32,
        num_boost_round: u32,
        learning_rate: f32,
        training_optimization_level: u8,
    },
}

impl ClassifierKind {
    /// Canonical kind name, used for descriptor validation and for the
    /// on-disk folder the trained model is stored under.
    pub fn name(&self) -> &'static str {
        match self {
            ClassifierKind::KNearestNeighbour { .. } => "KNearestNeighbour",
            ClassifierKind::MinimumDistance => "MinimumDistance",
            ClassifierKind::MaximumLikelihood => "MaximumLikelihood",
            ClassifierKind::GradientBoostedTrees { .. } => "GradientBoostedTrees",
        }
    }
}

impl Default for ClassifierKind {
    fn default() -> Self {
        ClassifierKind::MaximumLikelihood
    }
}

impl FromStr for ClassifierKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "knn" | "knearestneighbour" => Ok(ClassifierKind::KNearestNeighbour { k: 5 }),
            "minimumdistance" | "min-distance" => Ok(ClassifierKind::MinimumDistance),
            "maximumlikelihood" | "max-likelihood" => Ok(ClassifierKind::MaximumLikelihood),
            "gbt" | "gradientboostedtrees" => Ok(ClassifierKind::GradientBoostedTrees {
                max_depth: 6,
                num_boost_round: 50,
                learning_rate: 0.1,
                training_optimization_level: 2,
            }),
            _ => Err(format!("Unknown classifier kind: {}", s)),
        }
    }
}

/// Where the training labels come from.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum TrainingSource {
    /// Train on a raster mask band of the first source product. When `band`
    /// is `None` the first band of the first product is used.
    MaskBand { band: Option<String> },
    /// Train on named polygon overlays; each polygon (or each distinct value
    /// of `label_attribute` across the polygons) becomes one class. An empty
    /// `vectors` list selects every non-empty polygon of the first product.
    Polygons {
        vectors: Vec<String>,
        label_attribute: Option<String>,
    },
}

impl TrainingSource {
    pub fn is_raster(&self) -> bool {
        matches!(self, TrainingSource::MaskBand { .. })
    }
}

/// Immutable per-run configuration for a supervised classifier.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ClassifierParams {
    pub kind: ClassifierKind,
    /// Suffix appended to the source product name for the output product.
    pub product_suffix: String,
    /// Name the trained model is saved under (also the load key).
    pub saved_classifier_name: String,
    /// Target number of training samples; extraction fetches twice this so
    /// the train/test split halves both reach the target.
    pub num_train_samples: usize,
    pub min_class_value: f64,
    pub class_val_step_size: f64,
    pub class_levels: usize,
    pub do_class_val_quantization: bool,
    pub training: TrainingSource,
    /// Feature bands as `band` or `band::product` references. `None` selects
    /// every band of every source product except the mask band and the
    /// excluded prefixes.
    pub feature_bands: Option<Vec<String>>,
    pub evaluate_classifier: bool,
    pub evaluate_feature_power_set: bool,
    pub min_power_set_size: usize,
    pub max_power_set_size: usize,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            kind: ClassifierKind::default(),
            product_suffix: "_classified".to_string(),
            saved_classifier_name: "new_classifier".to_string(),
            num_train_samples: 5000,
            min_class_value: 0.0,
            class_val_step_size: 10.0,
            class_levels: 101,
            do_class_val_quantization: false,
            training: TrainingSource::MaskBand { band: None },
            feature_bands: None,
            evaluate_classifier: false,
            evaluate_feature_power_set: false,
            min_power_set_size: 2,
            max_power_set_size: 7,
        }
    }
}

impl ClassifierParams {
    /// Validate the quantization parameters; checked even when quantization
    /// is disabled or the classifier is loaded from disk.
    pub fn validate(&self) -> Result<()> {
        if self.class_val_step_size < 0.0 {
            return Err(ClassifierError::Config(format!(
                "class value step size = {}",
                self.class_val_step_size
            )));
        }
        if self.class_levels < 2 {
            return Err(ClassifierError::Config(format!(
                "class levels = {}; it must be at least 2",
                self.class_levels
            )));
        }
        Ok(())
    }

    pub fn quantizer(&self) -> Quantizer {
        Quantizer {
            enabled: self.do_class_val_quantization,
            min_value: self.min_class_value,
            max_value: max_class_value(
                self.min_class_value,
                self.class_val_step_size,
                self.class_levels,
            ),
            step_size: self.class_val_step_size,
        }
    }
}

/// Highest representable class value for the given quantization grid.
pub fn max_class_value(min_value: f64, step_size: f64, levels: usize) -> f64 {
    min_value + step_size * (levels - 1) as f64
}

/// Snaps continuous class values to the nearest of `class_levels` evenly
/// spaced buckets. Copyable so extraction workers can share it freely.
#[derive(Debug, Clone, Copy)]
pub struct Quantizer {
    pub enabled: bool,
    pub min_value: f64,
    pub max_value: f64,
    pub step_size: f64,
}

impl Quantizer {
    /// Identity when disabled; otherwise clamp to [min, max] and snap to the
    /// nearest bucket. Quantizing an already-quantized value is a no-op.
    pub fn apply(&self, val: f64) -> f64 {
        if !self.enabled || self.step_size == 0.0 {
            return val;
        }
        if val <= self.min_value {
            return self.min_value;
        }
        if val >= self.max_value {
            return self.max_value;
        }
        self.min_value + ((val - self.min_value) / self.step_size).round() * self.step_size
    }
}
