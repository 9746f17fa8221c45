//! Gradient-boosted-trees classifier.
//!
//! Multi-class classification by one-vs-rest reduction: one binary GBDT per
//! class, each trained to separate its class from the rest. The per-class
//! probabilities are normalized into the class distribution.
use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use serde::{Deserialize, Serialize};

use crate::data_handling::LabeledInstances;
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::ClassifierModel;

#[derive(Serialize, Deserialize)]
pub struct GbtClassifier {
    max_depth: u32,
    num_boost_round: u32,
    learning_rate: f32,
    training_optimization_level: u8,
    classes: Vec<f64>,
    models: Vec<GBDT>,
}

// `gbdt::GBDT` implements neither `Clone` nor `Debug`, so the derives that the
// rest of the crate relies on (`Model` is cloned and lives in a `Debug`
// descriptor) are written by hand here.
impl Clone for GbtClassifier {
    fn clone(&self) -> Self {
        // Reproduce each trained model through the same serde round-trip used
        // to persist classifiers to disk; `GBDT` is serde-serializable.
        let models = self
            .models
            .iter()
            .map(|m| {
                let json = serde_json::to_string(m).expect("serialize GBDT model");
                serde_json::from_str(&json).expect("deserialize GBDT model")
            })
            .collect();
        GbtClassifier {
            max_depth: self.max_depth,
            num_boost_round: self.num_boost_round,
            learning_rate: self.learning_rate,
            training_optimization_level: self.training_optimization_level,
            classes: self.classes.clone(),
            models,
        }
    }
}

impl std::fmt::Debug for GbtClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GbtClassifier")
            .field("max_depth", &self.max_depth)
            .field("num_boost_round", &self.num_boost_round)
            .field("learning_rate", &self.learning_rate)
            .field("training_optimization_level", &self.training_optimization_level)
            .field("classes", &self.classes)
            .field("models", &format_args!("<{} trained models>", self.models.len()))
            .finish()
    }
}

impl GbtClassifier {
    pub fn new(
        max_depth: u32,
        num_boost_round: u32,
        learning_rate: f32,
        training_optimization_level: u8,
    ) -> Self {
        GbtClassifier {
            max_depth,
            num_boost_round,
            learning_rate,
            training_optimization_level,
            classes: Vec::new(),
            models: Vec::new(),
        }
    }

    fn base_config(&self, feature_size: usize) -> Config {
        let mut config = Config::new();
        config.set_feature_size(feature_size);
        config.set_shrinkage(self.learning_rate);
        config.set_max_depth(self.max_depth);
        config.set_iterations(self.num_boost_round as usize);
        config.set_debug(false);
        config.set_training_optimization_level(self.training_optimization_level);
        config.set_loss("LogLikelyhood");
        config
    }

    /// Per-class positive scores for one feature vector.
    fn class_scores(&self, features: &[f64]) -> Vec<(f64, f64)> {
        let row: Vec<f32> = features.iter().map(|&v| v as f32).collect();
        let mut test_x = DataVec::new();
        test_x.push(Data::new_training_data(row, 1.0, 0.0, None));

        self.classes
            .iter()
            .zip(&self.models)
            .map(|(&class, model)| {
                let prediction = model.predict(&test_x);
                let score = prediction.first().copied().unwrap_or(0.0) as f64;
                (class, score.clamp(0.0, 1.0))
            })
            .collect()
    }
}

impl ClassifierModel for GbtClassifier {
    fn train(&mut self, data: &LabeledInstances) -> Result<()> {
        if data.is_empty() {
            return Err(ClassifierError::Training(
                "no training instances for gradient boosted trees".to_string(),
            ));
        }
        let feature_size = data.num_features();
        self.classes = data.sorted_class_values();
        self.models = Vec::with_capacity(self.classes.len());

        for &class in &self.classes {
            let mut train_x = DataVec::new();
            for instance in &data.instances {
                let row: Vec<f32> = instance.features.iter().map(|&v| v as f32).collect();
                let label = if instance.class_value == class { 1.0 } else { -1.0 };
                train_x.push(Data::new_training_data(row, 1.0, label, None));
            }

            let mut gbdt = GBDT::new(&self.base_config(feature_size));
            gbdt.fit(&mut train_x);
            self.models.push(gbdt);
        }
        Ok(())
    }

    fn classify(&self, features: &[f64]) -> Option<f64> {
        self.class_scores(features)
            .into_iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(class, _)| class)
    }

    fn class_distribution(&self, features: &[f64]) -> Vec<(f64, f64)> {
        let scores = self.class_scores(features);
        let total: f64 = scores.iter().map(|(_, s)| s).sum();
        if total <= 0.0 {
            let uniform = 1.0 / scores.len().max(1) as f64;
            return scores.into_iter().map(|(c, _)| (c, uniform)).collect();
        }
        scores.into_iter().map(|(c, s)| (c, s / total)).collect()
    }

    fn name(&self) -> &'static str {
        "GradientBoostedTrees"
    }
}
