//! Data structures for labeled training instances.
//!
//! Extraction produces a [`LabeledInstances`] bundle: a class-value to
//! human-readable-label mapping plus the ordered instance collection. The
//! helpers here cover the two train/test split policies, feature-subset
//! re-slicing for the power-set search, and dense-matrix export for the
//! statistics code.
use ndarray::{Array1, Array2};

use crate::error::{ClassifierError, Result};

/// A normalized feature vector paired with its class value.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledInstance {
    pub features: Vec<f64>,
    pub class_value: f64,
}

impl LabeledInstance {
    pub fn new(features: Vec<f64>, class_value: f64) -> Self {
        LabeledInstance {
            features,
            class_value,
        }
    }
}

/// How to partition instances into train and test halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPolicy {
    /// First half trains, second half tests (raster-mask mode).
    LinearHalves,
    /// Within each class, alternate instances between train and test
    /// (polygon mode; avoids class imbalance from positional clustering).
    InterleavedByClass,
}

/// Class label mapping plus the ordered collection of labeled instances.
#[derive(Debug, Clone)]
pub struct LabeledInstances {
    /// Class value to human-readable label. Every class value occurring in
    /// `instances` must have an entry here.
    pub label_map: Vec<(f64, String)>,
    pub instances: Vec<LabeledInstance>,
}

impl LabeledInstances {
    pub fn new(label_map: Vec<(f64, String)>, instances: Vec<LabeledInstance>) -> Self {
        LabeledInstances {
            label_map,
            instances,
        }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn num_features(&self) -> usize {
        self.instances.first().map(|i| i.features.len()).unwrap_or(0)
    }

    pub fn label_for(&self, class_value: f64) -> Option<&str> {
        self.label_map
            .iter()
            .find(|(v, _)| *v == class_value)
            .map(|(_, l)| l.as_str())
    }

    /// Check the bundle invariant: every referenced class value is labeled.
    pub fn validate(&self) -> Result<()> {
        for instance in &self.instances {
            if self.label_for(instance.class_value).is_none() {
                return Err(ClassifierError::Training(format!(
                    "class value {} has no label entry",
                    instance.class_value
                )));
            }
        }
        Ok(())
    }

    /// Distinct class values occurring in the instances, ascending.
    pub fn sorted_class_values(&self) -> Vec<f64> {
        let mut values: Vec<f64> = Vec::new();
        for instance in &self.instances {
            if !values.contains(&instance.class_value) {
                values.push(instance.class_value);
            }
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values
    }

    /// Split into (train, test) according to `policy`.
    pub fn split(&self, policy: SplitPolicy) -> (LabeledInstances, LabeledInstances) {
        match policy {
            SplitPolicy::LinearHalves => self.split_linear_halves(),
            SplitPolicy::InterleavedByClass => self.split_interleaved_by_class(),
        }
    }

    fn split_linear_halves(&self) -> (LabeledInstances, LabeledInstances) {
        let half = self.instances.len() / 2;
        let train = self.instances[..half].to_vec();
        let test = self.instances[half..].to_vec();
        (
            LabeledInstances::new(self.label_map.clone(), train),
            LabeledInstances::new(self.label_map.clone(), test),
        )
    }

    fn split_interleaved_by_class(&self) -> (LabeledInstances, LabeledInstances) {
        let mut train = Vec::new();
        let mut test = Vec::new();
        for class_value in self.sorted_class_values() {
            let mut to_train = true;
            for instance in self
                .instances
                .iter()
                .filter(|i| i.class_value == class_value)
            {
                if to_train {
                    train.push(instance.clone());
                } else {
                    test.push(instance.clone());
                }
                to_train = !to_train;
            }
        }
        (
            LabeledInstances::new(self.label_map.clone(), train),
            LabeledInstances::new(self.label_map.clone(), test),
        )
    }

    /// Re-slice every instance to the given feature columns, in the order
    /// the subset declares them. Used by the feature power-set search.
    pub fn subset(&self, feature_columns: &[usize]) -> LabeledInstances {
        let instances = self
            .instances
            .iter()
            .map(|instance| {
                let features = feature_columns
                    .iter()
                    .map(|&c| instance.features[c])
                    .collect();
                LabeledInstance::new(features, instance.class_value)
            })
            .collect();
        LabeledInstances::new(self.label_map.clone(), instances)
    }

    /// Export as a dense `(n_samples, n_features)` matrix plus class vector.
    pub fn to_matrix(&self) -> (Array2<f64>, Array1<f64>) {
        let n = self.instances.len();
        let m = self.num_features();
        let mut x = Array2::zeros((n, m));
        let mut y = Array1::zeros(n);
        for (row, instance) in self.instances.iter().enumerate() {
            for (col, &v) in instance.features.iter().enumerate() {
                x[(row, col)] = v;
            }
            y[row] = instance.class_value;
        }
        (x, y)
    }
}
