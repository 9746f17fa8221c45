use serde::{Deserialize, Serialize};

use crate::config::ClassifierKind;
use crate::data_handling::LabeledInstances;
use crate::error::Result;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::gbt::GbtClassifier;
use crate::models::knn::KnnClassifier;
use crate::models::max_likelihood::MaxLikelihoodClassifier;
use crate::models::min_distance::MinDistanceClassifier;

/// Tagged union over the concrete classifier algorithms.
///
/// A plain enum rather than `Box<dyn ClassifierModel>` so the trained model
/// can be embedded in the persisted descriptor via serde.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Model {
    KNearestNeighbour(KnnClassifier),
    MinimumDistance(MinDistanceClassifier),
    MaximumLikelihood(MaxLikelihoodClassifier),
    GradientBoostedTrees(GbtClassifier),
}

impl Model {
    /// Build an untrained model for the configured kind.
    pub fn for_kind(kind: &ClassifierKind) -> Model {
        match kind {
            ClassifierKind::KNearestNeighbour { k } => {
                Model::KNearestNeighbour(KnnClassifier::new(*k))
            }
            ClassifierKind::MinimumDistance => {
                Model::MinimumDistance(MinDistanceClassifier::new())
            }
            ClassifierKind::MaximumLikelihood => {
                Model::MaximumLikelihood(MaxLikelihoodClassifier::new())
            }
            ClassifierKind::GradientBoostedTrees {
                max_depth,
                num_boost_round,
                learning_rate,
                training_optimization_level,
            } => Model::GradientBoostedTrees(GbtClassifier::new(
                *max_depth,
                *num_boost_round,
                *learning_rate,
                *training_optimization_level,
            )),
        }
    }

    fn inner(&self) -> &dyn ClassifierModel {
        match self {
            Model::KNearestNeighbour(m) => m,
            Model::MinimumDistance(m) => m,
            Model::MaximumLikelihood(m) => m,
            Model::GradientBoostedTrees(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ClassifierModel {
        match self {
            Model::KNearestNeighbour(m) => m,
            Model::MinimumDistance(m) => m,
            Model::MaximumLikelihood(m) => m,
            Model::GradientBoostedTrees(m) => m,
        }
    }
}

impl ClassifierModel for Model {
    fn train(&mut self, data: &LabeledInstances) -> Result<()> {
        self.inner_mut().train(data)
    }

    fn classify(&self, features: &[f64]) -> Option<f64> {
        self.inner().classify(features)
    }

    fn class_distribution(&self, features: &[f64]) -> Vec<(f64, f64)> {
        self.inner().class_distribution(features)
    }

    fn name(&self) -> &'static str {
        self.inner().name()
    }
}
