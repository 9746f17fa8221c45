//! Model evaluation: held-out accuracy and per-feature discriminative power.
use ndarray::{Array1, Array2};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

use crate::data_handling::LabeledInstances;
use crate::models::ClassifierModel;

/// Evaluation result for one trained model.
#[derive(Debug, Clone)]
pub struct Score {
    /// Percent of held-out instances classified correctly, in [0, 100].
    pub cross_validation_percent: f64,
    /// `(feature name, discriminative power)` per feature, power in [0, 1].
    pub feature_scores: Vec<(String, f64)>,
}

/// Percent of `test` instances the model classifies correctly.
pub fn percent_correct(model: &dyn ClassifierModel, test: &LabeledInstances) -> f64 {
    if test.is_empty() {
        return 0.0;
    }
    let correct = test
        .instances
        .iter()
        .filter(|instance| model.classify(&instance.features) == Some(instance.class_value))
        .count();
    100.0 * correct as f64 / test.len() as f64
}

/// Per-feature discriminative power against the class values.
///
/// Each feature column is scored with a univariate F-test of its linear
/// relationship to the class value; the reported power is the F
/// distribution's CDF at the statistic, so 1.0 means strongly
/// discriminating and 0.0 means uninformative.
pub fn feature_discrimination(
    instances: &LabeledInstances,
    feature_names: &[String],
) -> Vec<(String, f64)> {
    let (x, y) = instances.to_matrix();
    feature_names
        .iter()
        .enumerate()
        .map(|(col, name)| {
            let power = if col < x.ncols() {
                f_test_power(&x, &y, col)
            } else {
                0.0
            };
            (name.clone(), power)
        })
        .collect()
}

fn f_test_power(x: &Array2<f64>, y: &Array1<f64>, col: usize) -> f64 {
    let n = x.nrows();
    if n < 3 {
        return 0.0;
    }
    let r = pearson_r(&x.column(col).to_owned(), y);
    if !r.is_finite() {
        return 0.0;
    }
    let deg_of_freedom = (n - 2) as f64;
    let r2 = (r * r).min(1.0 - 1e-12);
    let f_statistic = r2 / (1.0 - r2) * deg_of_freedom;

    match FisherSnedecor::new(1.0, deg_of_freedom) {
        Ok(dist) => dist.cdf(f_statistic),
        Err(_) => 0.0,
    }
}

fn pearson_r(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.sum() / n;
    let mean_b = b.sum() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

/// Full evaluation: held-out accuracy plus per-feature scores.
pub fn evaluate(
    model: &dyn ClassifierModel,
    test: &LabeledInstances,
    feature_names: &[String],
) -> Score {
    Score {
        cross_validation_percent: percent_correct(model, test),
        feature_scores: feature_discrimination(test, feature_names),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassifierKind;
    use crate::data_handling::LabeledInstance;
    use crate::models::Model;

    fn separable() -> LabeledInstances {
        let mut instances = Vec::new();
        for i in 0..8 {
            let jitter = 0.01 * i as f64;
            // first feature tracks the class, second is constant noise
            instances.push(LabeledInstance::new(vec![0.1 + jitter, 0.5], 0.0));
            instances.push(LabeledInstance::new(vec![0.9 - jitter, 0.5], 1.0));
        }
        LabeledInstances::new(vec![(0.0, "a".into()), (1.0, "b".into())], instances)
    }

    #[test]
    fn perfect_model_scores_hundred_percent() {
        let data = separable();
        let mut model = Model::for_kind(&ClassifierKind::MinimumDistance);
        model.train(&data).unwrap();
        let pct = percent_correct(&model, &data);
        assert_eq!(pct, 100.0);
    }

    #[test]
    fn informative_feature_outranks_constant_one() {
        let data = separable();
        let names = vec!["informative".to_string(), "constant".to_string()];
        let scores = feature_discrimination(&data, &names);
        assert!(scores[0].1 > 0.95);
        assert!(scores[1].1 < scores[0].1);
    }

    #[test]
    fn score_percent_is_bounded() {
        let data = separable();
        let mut model = Model::for_kind(&ClassifierKind::KNearestNeighbour { k: 3 });
        model.train(&data).unwrap();
        let score = evaluate(
            &model,
            &data,
            &["informative".to_string(), "constant".to_string()],
        );
        assert!(score.cross_validation_percent >= 0.0);
        assert!(score.cross_validation_percent <= 100.0);
    }
}
