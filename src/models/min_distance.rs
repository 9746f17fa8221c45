//! Minimum-distance (nearest-centroid) classifier.
//!
//! Each class is represented by the mean of its training feature vectors;
//! a pixel is assigned to the class with the nearest centroid.
use serde::{Deserialize, Serialize};

use crate::data_handling::LabeledInstances;
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::ClassifierModel;

const DISTANCE_EPS: f64 = 1e-12;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinDistanceClassifier {
    /// `(class value, centroid)` in ascending class order.
    centroids: Vec<(f64, Vec<f64>)>,
}

impl MinDistanceClassifier {
    pub fn new() -> Self {
        MinDistanceClassifier {
            centroids: Vec::new(),
        }
    }

    fn distances(&self, features: &[f64]) -> Vec<(f64, f64)> {
        self.centroids
            .iter()
            .map(|(class, centroid)| {
                let d2: f64 = centroid
                    .iter()
                    .zip(features)
                    .map(|(c, f)| (c - f) * (c - f))
                    .sum();
                (*class, d2.sqrt())
            })
            .collect()
    }
}

impl Default for MinDistanceClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierModel for MinDistanceClassifier {
    fn train(&mut self, data: &LabeledInstances) -> Result<()> {
        if data.is_empty() {
            return Err(ClassifierError::Training(
                "no training instances for minimum distance".to_string(),
            ));
        }
        let num_features = data.num_features();
        self.centroids = data
            .sorted_class_values()
            .into_iter()
            .map(|class| {
                let mut sum = vec![0.0; num_features];
                let mut count = 0usize;
                for instance in data.instances.iter().filter(|i| i.class_value == class) {
                    for (acc, &v) in sum.iter_mut().zip(&instance.features) {
                        *acc += v;
                    }
                    count += 1;
                }
                for acc in sum.iter_mut() {
                    *acc /= count as f64;
                }
                (class, sum)
            })
            .collect();
        Ok(())
    }

    fn classify(&self, features: &[f64]) -> Option<f64> {
        self.distances(features)
            .into_iter()
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(class, _)| class)
    }

    fn class_distribution(&self, features: &[f64]) -> Vec<(f64, f64)> {
        // inverse-distance weights, normalized to sum to 1
        let distances = self.distances(features);
        let weights: Vec<f64> = distances
            .iter()
            .map(|(_, d)| 1.0 / (d + DISTANCE_EPS))
            .collect();
        let total: f64 = weights.iter().sum();
        distances
            .into_iter()
            .zip(weights)
            .map(|((class, _), w)| (class, w / total))
            .collect()
    }

    fn name(&self) -> &'static str {
        "MinimumDistance"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::LabeledInstance;

    fn data() -> LabeledInstances {
        LabeledInstances::new(
            vec![(1.0, "dark".into()), (2.0, "bright".into())],
            vec![
                LabeledInstance::new(vec![0.1, 0.2], 1.0),
                LabeledInstance::new(vec![0.2, 0.2], 1.0),
                LabeledInstance::new(vec![0.8, 0.9], 2.0),
                LabeledInstance::new(vec![0.9, 0.8], 2.0),
            ],
        )
    }

    #[test]
    fn assigns_nearest_centroid() {
        let mut model = MinDistanceClassifier::new();
        model.train(&data()).unwrap();
        assert_eq!(model.classify(&[0.15, 0.2]), Some(1.0));
        assert_eq!(model.classify(&[0.85, 0.85]), Some(2.0));
    }

    #[test]
    fn exact_centroid_hit_dominates_distribution() {
        let mut model = MinDistanceClassifier::new();
        model.train(&data()).unwrap();
        let dist = model.class_distribution(&[0.15, 0.2]);
        let total: f64 = dist.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-9);
        let p1 = crate::models::classifier_trait::confidence_of(&dist, 1.0);
        assert!(p1 > 0.99);
    }
}
