//! K-nearest-neighbour classifier over stored reference samples.
use serde::{Deserialize, Serialize};

use crate::data_handling::LabeledInstances;
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::ClassifierModel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnClassifier {
    k: usize,
    samples: Vec<Vec<f64>>,
    labels: Vec<f64>,
}

impl KnnClassifier {
    pub fn new(k: usize) -> Self {
        KnnClassifier {
            k: k.max(1),
            samples: Vec::new(),
            labels: Vec::new(),
        }
    }

    /// `(distance, label)` of the k nearest stored samples, nearest first.
    fn nearest(&self, features: &[f64]) -> Vec<(f64, f64)> {
        let mut distances: Vec<(f64, f64)> = self
            .samples
            .iter()
            .zip(&self.labels)
            .map(|(s, &label)| (squared_distance(s, features), label))
            .collect();
        distances.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        distances.truncate(self.k.min(distances.len()));
        distances
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl ClassifierModel for KnnClassifier {
    fn train(&mut self, data: &LabeledInstances) -> Result<()> {
        if data.is_empty() {
            return Err(ClassifierError::Training(
                "no training instances for KNN".to_string(),
            ));
        }
        self.samples = data.instances.iter().map(|i| i.features.clone()).collect();
        self.labels = data.instances.iter().map(|i| i.class_value).collect();
        Ok(())
    }

    fn classify(&self, features: &[f64]) -> Option<f64> {
        let distribution = self.class_distribution(features);
        distribution
            .into_iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(class, _)| class)
    }

    fn class_distribution(&self, features: &[f64]) -> Vec<(f64, f64)> {
        let neighbours = self.nearest(features);
        if neighbours.is_empty() {
            return Vec::new();
        }
        let total = neighbours.len() as f64;
        let mut votes: Vec<(f64, f64)> = Vec::new();
        for (_, label) in neighbours {
            match votes.iter_mut().find(|(c, _)| *c == label) {
                Some((_, count)) => *count += 1.0,
                None => votes.push((label, 1.0)),
            }
        }
        for (_, count) in votes.iter_mut() {
            *count /= total;
        }
        votes
    }

    fn name(&self) -> &'static str {
        "KNearestNeighbour"
    }
}
