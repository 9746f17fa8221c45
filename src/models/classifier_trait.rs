use crate::data_handling::LabeledInstances;
use crate::error::Result;

/// Capability set every classifier algorithm provides to the pipeline:
/// build a model from labeled instances, predict a class value for one
/// feature vector, and expose the full class-probability distribution.
pub trait ClassifierModel {
    /// Build the model from the training instances.
    fn train(&mut self, data: &LabeledInstances) -> Result<()>;

    /// Predicted class value for one normalized feature vector, or `None`
    /// when the model cannot produce a prediction.
    fn classify(&self, features: &[f64]) -> Option<f64>;

    /// `(class value, probability)` pairs for one feature vector. The
    /// probabilities sum to 1 over the trained classes.
    fn class_distribution(&self, features: &[f64]) -> Vec<(f64, f64)>;

    /// Human readable algorithm name.
    fn name(&self) -> &'static str;
}

/// Probability of `class_value` in a distribution, defaulting to 0.0 when
/// the class is absent so a missing entry never aborts a tile.
pub fn confidence_of(distribution: &[(f64, f64)], class_value: f64) -> f64 {
    distribution
        .iter()
        .find(|(c, _)| *c == class_value)
        .map(|(_, p)| *p)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_class_has_zero_confidence() {
        let dist = vec![(0.0, 0.75), (1.0, 0.25)];
        assert_eq!(confidence_of(&dist, 0.0), 0.75);
        assert_eq!(confidence_of(&dist, 2.0), 0.0);
    }
}
