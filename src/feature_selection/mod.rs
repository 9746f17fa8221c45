//! Feature power-set search.
//!
//! Trains one independent model per feature subset within the configured
//! size range and tracks the best cross-validation score. Training here is
//! a lightweight re-slice of the already-extracted instances; only the
//! winning subset is retrained on freshly extracted data by the caller.
pub mod power_set;

use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::ClassifierKind;
use crate::data_handling::{LabeledInstances, SplitPolicy};
use crate::error::Result;
use crate::evaluation::percent_correct;
use crate::models::{ClassifierModel, Model};
use crate::report::ClassifierReport;

use power_set::PowerSet;

/// Best-scoring feature subset seen so far during a power-set search.
#[derive(Debug, Clone)]
pub struct TopResult {
    pub name: String,
    pub cross_validation_percent: f64,
    /// Columns of the winning subset, in the subset's declared order.
    pub feature_columns: Vec<usize>,
}

/// Evaluate every feature subset in `[min_size, max_size]` and return the
/// best one, or `None` when no subset could be trained.
///
/// Cancellation is cooperative: the flag is checked between subsets, and on
/// cancellation the best subset found so far is returned. A subset whose
/// training fails is logged and treated as no improvement.
#[allow(clippy::too_many_arguments)]
pub fn run_power_set_search(
    kind: &ClassifierKind,
    base_name: &str,
    all_instances: &LabeledInstances,
    feature_names: &[String],
    split: SplitPolicy,
    min_size: usize,
    max_size: usize,
    cancel: &AtomicBool,
    report: &mut ClassifierReport,
) -> Option<TopResult> {
    let num_features = feature_names.len();
    let mut best: Option<TopResult> = None;

    for (cnt, columns) in PowerSet::new(num_features, min_size, max_size).enumerate() {
        if cancel.load(Ordering::Relaxed) {
            log::info!("Feature power set search cancelled after {} subsets", cnt);
            break;
        }

        let name = format!("{}.{}", base_name, cnt + 1);
        match evaluate_subset(kind, all_instances, &columns, split) {
            Ok(percent) => {
                let subset_names: Vec<&str> = columns
                    .iter()
                    .map(|&c| feature_names[c].as_str())
                    .collect();
                report.add_power_set_evaluation(format!(
                    "{}: cv {:<6.2}% {}",
                    name,
                    percent,
                    subset_names.join(", ")
                ));

                let improved = best
                    .as_ref()
                    .map(|top| percent > top.cross_validation_percent)
                    .unwrap_or(true);
                if improved {
                    best = Some(TopResult {
                        name,
                        cross_validation_percent: percent,
                        feature_columns: columns,
                    });
                }
            }
            Err(err) => {
                log::warn!("Feature subset {} failed: {}", name, err);
            }
        }
    }

    if let Some(top) = &best {
        report.set_top_classifier(format!(
            "TOP Classifier = {} at {:<6.2}%",
            top.name, top.cross_validation_percent
        ));
    }
    best
}

fn evaluate_subset(
    kind: &ClassifierKind,
    all_instances: &LabeledInstances,
    columns: &[usize],
    split: SplitPolicy,
) -> Result<f64> {
    let subset = all_instances.subset(columns);
    let (train, test) = subset.split(split);
    let mut model = Model::for_kind(kind);
    model.train(&train)?;
    Ok(percent_correct(&model, &test))
}
