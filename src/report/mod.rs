//! Human-readable training report.
//!
//! Accumulates evaluation results, power-set lines and the top-classifier
//! summary during a run, and renders them as the plain-text document written
//! next to the persisted model.
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::{ClassifierError, Result};

#[derive(Debug, Clone)]
pub struct ClassifierReport {
    classifier_kind: String,
    classifier_name: String,
    created: DateTime<Utc>,
    evaluations: Vec<String>,
    power_set_evaluations: Vec<String>,
    top_classifier: Option<String>,
}

impl ClassifierReport {
    pub fn new(classifier_kind: impl Into<String>, classifier_name: impl Into<String>) -> Self {
        ClassifierReport {
            classifier_kind: classifier_kind.into(),
            classifier_name: classifier_name.into(),
            created: Utc::now(),
            evaluations: Vec::new(),
            power_set_evaluations: Vec::new(),
            top_classifier: None,
        }
    }

    pub fn add_evaluation(&mut self, text: impl Into<String>) {
        self.evaluations.push(text.into());
    }

    pub fn add_power_set_evaluation(&mut self, text: impl Into<String>) {
        self.power_set_evaluations.push(text.into());
    }

    pub fn set_top_classifier(&mut self, text: impl Into<String>) {
        self.top_classifier = Some(text.into());
    }

    pub fn power_set_evaluations(&self) -> &[String] {
        &self.power_set_evaluations
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Classifier: {} ({})\n",
            self.classifier_name, self.classifier_kind
        ));
        out.push_str(&format!(
            "Created: {}\n\n",
            self.created.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        if !self.evaluations.is_empty() {
            out.push_str("Evaluation\n----------\n");
            for line in &self.evaluations {
                out.push_str(line);
                out.push('\n');
            }
            out.push('\n');
        }

        if !self.power_set_evaluations.is_empty() {
            out.push_str("Feature power set\n-----------------\n");
            for line in &self.power_set_evaluations {
                out.push_str(line);
                out.push('\n');
            }
            out.push('\n');
        }

        if let Some(top) = &self.top_classifier {
            out.push_str(top);
            out.push('\n');
        }
        out
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render()).map_err(|e| {
            ClassifierError::persistence(format!("write report {}", path.display()), e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_contains_all_sections() {
        let mut report = ClassifierReport::new("MaximumLikelihood", "biomes");
        report.add_evaluation("Testing: 92.50% correct");
        report.add_power_set_evaluation("biomes.1: cv 88.00% B2");
        report.set_top_classifier("TOP Classifier = biomes.1 at 88.00%");

        let text = report.render();
        assert!(text.contains("biomes (MaximumLikelihood)"));
        assert!(text.contains("92.50% correct"));
        assert!(text.contains("Feature power set"));
        assert!(text.contains("TOP Classifier"));
    }
}
