//! Persistence of trained classifiers.
pub mod descriptor;

pub use descriptor::{
    load_descriptor, save_descriptor, ClassifierDescriptor, ClassifierUserInfo,
    CLASSIFIER_FILE_EXTENSION, CLASSIFIER_INFO_FILE_EXTENSION, CLASSIFIER_ROOT_FOLDER,
};
