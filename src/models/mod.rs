//! Classifier algorithms behind a common capability trait.
pub mod classifier_trait;
pub mod factory;
pub mod gbt;
pub mod knn;
pub mod max_likelihood;
pub mod min_distance;

pub use classifier_trait::{confidence_of, ClassifierModel};
pub use factory::Model;
