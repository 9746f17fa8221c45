//! Persisted classifier descriptor.
//!
//! Two artifacts are written side by side: the descriptor itself (a
//! versioned, self-describing JSON document holding the trained model and
//! everything needed to reconstruct feature normalization) and a
//! human-readable info text for operators preparing future input products.
//! Either write failing fails the whole save.
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ClassifierError, Result};
use crate::models::Model;

pub const FORMAT_VERSION: u32 = 1;
pub const CLASSIFIER_ROOT_FOLDER: &str = "classifiers";
pub const CLASSIFIER_FILE_EXTENSION: &str = ".classifier";
pub const CLASSIFIER_INFO_FILE_EXTENSION: &str = ".txt";

/// Everything needed to reload and apply a trained classifier.
///
/// The feature lists are order-significant: `feature_names`,
/// `feature_min_values` and `feature_max_values` are parallel arrays, and
/// load-time reconstruction matches bands to `feature_names` by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierDescriptor {
    pub format_version: u32,
    pub classifier_kind: String,
    pub classifier_name: String,
    pub model: Model,
    pub sorted_class_values: Vec<f64>,
    /// Name of the predicted quantity (mask band name, or `???` for
    /// polygon-trained models).
    pub class_name: String,
    pub class_unit: String,
    pub feature_names: Vec<String>,
    pub feature_min_values: Vec<f64>,
    pub feature_max_values: Vec<f64>,
    pub do_class_val_quantization: bool,
    pub min_class_value: f64,
    pub class_val_step_size: f64,
    pub class_levels: usize,
    /// Names of the training polygons, for polygon-trained models only.
    pub training_vectors: Option<Vec<String>>,
}

/// What an operator needs to know to prepare source products for a saved
/// classifier; rendered into the sidecar text document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierUserInfo {
    pub classifier_filename: String,
    pub classifier_kind: String,
    pub class_name: String,
    pub num_samples: usize,
    pub sorted_classes: Vec<f64>,
    pub num_features: usize,
    pub training_bands: Option<Vec<String>>,
    pub training_vectors: Option<Vec<String>>,
    pub feature_names: Vec<String>,
    // quantization parameters; class_levels is -1 when quantization is off
    pub min_class_value: f64,
    pub class_val_step_size: f64,
    pub class_levels: i64,
    pub max_class_value: f64,
}

impl ClassifierUserInfo {
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("classifier file: {}\n", self.classifier_filename));
        out.push_str(&format!("classifier kind: {}\n", self.classifier_kind));
        out.push_str(&format!("predicts: {}\n", self.class_name));
        out.push_str(&format!("training samples: {}\n", self.num_samples));
        out.push_str(&format!("classes: {:?}\n", self.sorted_classes));
        if let Some(bands) = &self.training_bands {
            out.push_str(&format!("training bands: {}\n", bands.join(", ")));
        }
        if let Some(vectors) = &self.training_vectors {
            out.push_str(&format!("training vectors: {}\n", vectors.join(", ")));
        }
        out.push_str(&format!("features ({}):\n", self.num_features));
        for name in &self.feature_names {
            out.push_str(&format!("  {}\n", name));
        }
        out.push_str(&format!(
            "quantization: min {} step {} levels {} max {}\n",
            self.min_class_value, self.class_val_step_size, self.class_levels, self.max_class_value
        ));
        out
    }
}

/// Directory a classifier of this kind is stored under.
pub fn classifier_dir(root: &Path, kind: &str) -> PathBuf {
    root.join(CLASSIFIER_ROOT_FOLDER).join(kind)
}

/// Path of the descriptor file for `kind`/`name`.
pub fn classifier_file_path(root: &Path, kind: &str, name: &str) -> PathBuf {
    classifier_dir(root, kind).join(format!("{}{}", name, CLASSIFIER_FILE_EXTENSION))
}

/// Write the descriptor and its sidecar info document. Fails without
/// partial cleanup if either write fails.
pub fn save_descriptor(
    root: &Path,
    descriptor: &ClassifierDescriptor,
    user_info: &ClassifierUserInfo,
) -> Result<PathBuf> {
    let dir = classifier_dir(root, &descriptor.classifier_kind);
    fs::create_dir_all(&dir).map_err(|e| {
        ClassifierError::persistence(format!("create classifier folder {}", dir.display()), e)
    })?;

    let file_path = classifier_file_path(root, &descriptor.classifier_kind, &descriptor.classifier_name);
    let encoded = serde_json::to_vec(descriptor).map_err(|e| {
        ClassifierError::persistence(format!("serialize classifier {}", descriptor.classifier_name), e)
    })?;
    fs::write(&file_path, encoded).map_err(|e| {
        ClassifierError::persistence(format!("save classifier {}", file_path.display()), e)
    })?;

    let info_path = dir.join(format!(
        "{}{}",
        descriptor.classifier_name, CLASSIFIER_INFO_FILE_EXTENSION
    ));
    fs::write(&info_path, user_info.render()).map_err(|e| {
        ClassifierError::persistence(format!("save classifier info {}", info_path.display()), e)
    })?;

    log::info!(
        "Saved {} classifier to {}",
        descriptor.classifier_kind,
        file_path.display()
    );
    Ok(file_path)
}

/// Read a descriptor back and verify it matches the requested kind.
pub fn load_descriptor(root: &Path, kind: &str, name: &str) -> Result<ClassifierDescriptor> {
    let file_path = classifier_file_path(root, kind, name);
    let bytes = fs::read(&file_path).map_err(|e| {
        ClassifierError::persistence(format!("load classifier {}", file_path.display()), e)
    })?;
    let descriptor: ClassifierDescriptor = serde_json::from_slice(&bytes).map_err(|e| {
        ClassifierError::persistence(format!("parse classifier {}", file_path.display()), e)
    })?;

    if descriptor.format_version > FORMAT_VERSION {
        return Err(ClassifierError::Persistence {
            operation: format!("load classifier {}", file_path.display()),
            message: format!(
                "unsupported format version {} (newest known is {})",
                descriptor.format_version, FORMAT_VERSION
            ),
        });
    }
    if descriptor.classifier_kind != kind {
        return Err(ClassifierError::KindMismatch {
            loaded: descriptor.classifier_kind,
            requested: kind.to_string(),
        });
    }
    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassifierKind;
    use crate::data_handling::{LabeledInstance, LabeledInstances};
    use crate::models::ClassifierModel;

    fn trained_descriptor() -> ClassifierDescriptor {
        let data = LabeledInstances::new(
            vec![(0.0, "a".into()), (1.0, "b".into())],
            vec![
                LabeledInstance::new(vec![0.1, 0.2], 0.0),
                LabeledInstance::new(vec![0.9, 0.8], 1.0),
            ],
        );
        let mut model = Model::for_kind(&ClassifierKind::MinimumDistance);
        model.train(&data).unwrap();
        ClassifierDescriptor {
            format_version: FORMAT_VERSION,
            classifier_kind: "MinimumDistance".to_string(),
            classifier_name: "unit_test".to_string(),
            model,
            sorted_class_values: vec![0.0, 1.0],
            class_name: "landcover".to_string(),
            class_unit: "discrete classes".to_string(),
            feature_names: vec!["B2".to_string(), "B3".to_string()],
            feature_min_values: vec![0.0, 10.0],
            feature_max_values: vec![1.0, 90.0],
            do_class_val_quantization: false,
            min_class_value: 0.0,
            class_val_step_size: 0.0,
            class_levels: 2,
            training_vectors: None,
        }
    }

    fn user_info() -> ClassifierUserInfo {
        ClassifierUserInfo {
            classifier_filename: "unit_test".to_string(),
            classifier_kind: "MinimumDistance".to_string(),
            class_name: "landcover".to_string(),
            num_samples: 2,
            sorted_classes: vec![0.0, 1.0],
            num_features: 2,
            training_bands: None,
            training_vectors: None,
            feature_names: vec!["B2".to_string(), "B3".to_string()],
            min_class_value: 0.0,
            class_val_step_size: 0.0,
            class_levels: -1,
            max_class_value: 0.0,
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = trained_descriptor();
        save_descriptor(dir.path(), &descriptor, &user_info()).unwrap();

        let loaded = load_descriptor(dir.path(), "MinimumDistance", "unit_test").unwrap();
        assert_eq!(loaded.feature_names, descriptor.feature_names);
        assert_eq!(loaded.feature_min_values, descriptor.feature_min_values);
        assert_eq!(loaded.feature_max_values, descriptor.feature_max_values);
        assert_eq!(loaded.sorted_class_values, vec![0.0, 1.0]);
        assert_eq!(loaded.model.classify(&[0.1, 0.2]), Some(0.0));

        // sidecar info document exists next to the descriptor
        let info = classifier_dir(dir.path(), "MinimumDistance").join("unit_test.txt");
        assert!(info.exists());
    }

    #[test]
    fn load_rejects_wrong_kind() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = trained_descriptor();
        save_descriptor(dir.path(), &descriptor, &user_info()).unwrap();

        // the same name does not exist under another kind's folder
        assert!(load_descriptor(dir.path(), "MaximumLikelihood", "unit_test").is_err());

        // a descriptor whose recorded kind disagrees with the folder fails
        let mut wrong = trained_descriptor();
        wrong.classifier_kind = "KNearestNeighbour".to_string();
        let path = classifier_file_path(dir.path(), "MinimumDistance", "unit_test");
        fs::write(&path, serde_json::to_vec(&wrong).unwrap()).unwrap();
        let err = load_descriptor(dir.path(), "MinimumDistance", "unit_test").unwrap_err();
        assert!(err.to_string().contains("NOT"));
    }

    #[test]
    fn load_rejects_future_format_version() {
        let dir = tempfile::tempdir().unwrap();
        let mut descriptor = trained_descriptor();
        descriptor.format_version = FORMAT_VERSION + 1;
        save_descriptor(dir.path(), &descriptor, &user_info()).unwrap();
        let err = load_descriptor(dir.path(), "MinimumDistance", "unit_test").unwrap_err();
        assert!(err.to_string().contains("format version"));
    }
}
