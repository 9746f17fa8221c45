//! Maximum-likelihood classifier.
//!
//! Each class is modeled as an independent per-feature Gaussian (diagonal
//! covariance). A pixel is assigned to the class maximizing the posterior
//! log-likelihood; the class distribution is the softmax over those
//! log-likelihoods.
use serde::{Deserialize, Serialize};

use crate::data_handling::LabeledInstances;
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::ClassifierModel;

/// Floor on per-feature variance, guards constant features.
const VARIANCE_FLOOR: f64 = 1e-9;

const LN_TWO_PI: f64 = 1.8378770664093453;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClassDensity {
    class_value: f64,
    prior_ln: f64,
    means: Vec<f64>,
    variances: Vec<f64>,
}

impl ClassDensity {
    fn log_likelihood(&self, features: &[f64]) -> f64 {
        let mut ll = self.prior_ln;
        for ((&x, &mean), &var) in features.iter().zip(&self.means).zip(&self.variances) {
            let d = x - mean;
            ll += -0.5 * (LN_TWO_PI + var.ln()) - d * d / (2.0 * var);
        }
        ll
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaxLikelihoodClassifier {
    classes: Vec<ClassDensity>,
}

impl MaxLikelihoodClassifier {
    pub fn new() -> Self {
        MaxLikelihoodClassifier {
            classes: Vec::new(),
        }
    }

    fn log_likelihoods(&self, features: &[f64]) -> Vec<(f64, f64)> {
        self.classes
            .iter()
            .map(|c| (c.class_value, c.log_likelihood(features)))
            .collect()
    }
}

impl Default for MaxLikelihoodClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierModel for MaxLikelihoodClassifier {
    fn train(&mut self, data: &LabeledInstances) -> Result<()> {
        if data.is_empty() {
            return Err(ClassifierError::Training(
                "no training instances for maximum likelihood".to_string(),
            ));
        }
        let num_features = data.num_features();
        let total = data.len() as f64;
        self.classes = data
            .sorted_class_values()
            .into_iter()
            .map(|class| {
                let members: Vec<&Vec<f64>> = data
                    .instances
                    .iter()
                    .filter(|i| i.class_value == class)
                    .map(|i| &i.features)
                    .collect();
                let n = members.len() as f64;

                let mut means = vec![0.0; num_features];
                for features in &members {
                    for (m, &v) in means.iter_mut().zip(features.iter()) {
                        *m += v;
                    }
                }
                for m in means.iter_mut() {
                    *m /= n;
                }

                let mut variances = vec![0.0; num_features];
                for features in &members {
                    for ((var, &v), &mean) in variances.iter_mut().zip(features.iter()).zip(&means)
                    {
                        let d = v - mean;
                        *var += d * d;
                    }
                }
                for var in variances.iter_mut() {
                    *var = (*var / n).max(VARIANCE_FLOOR);
                }

                ClassDensity {
                    class_value: class,
                    prior_ln: (n / total).ln(),
                    means,
                    variances,
                }
            })
            .collect();
        Ok(())
    }

    fn classify(&self, features: &[f64]) -> Option<f64> {
        self.log_likelihoods(features)
            .into_iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(class, _)| class)
    }

    fn class_distribution(&self, features: &[f64]) -> Vec<(f64, f64)> {
        let lls = self.log_likelihoods(features);
        let max_ll = lls
            .iter()
            .map(|(_, ll)| *ll)
            .fold(f64::NEG_INFINITY, f64::max);
        if !max_ll.is_finite() {
            return Vec::new();
        }
        let exps: Vec<f64> = lls.iter().map(|(_, ll)| (ll - max_ll).exp()).collect();
        let total: f64 = exps.iter().sum();
        lls.into_iter()
            .zip(exps)
            .map(|((class, _), e)| (class, e / total))
            .collect()
    }

    fn name(&self) -> &'static str {
        "MaximumLikelihood"
    }
}
