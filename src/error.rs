use std::error::Error;
use std::fmt;

/// Crate-wide error type covering configuration, extraction, training and
/// persistence failures.
#[derive(Debug)]
pub enum ClassifierError {
    /// Invalid or inconsistent configuration (quantization parameters,
    /// training-source selection, band references).
    Config(String),
    /// Source products do not share the same raster dimensions.
    DimensionMismatch { product: String },
    /// A named band could not be located in any configured source product.
    MissingBand { name: String },
    /// Two persisted feature names resolved to the same physical band.
    AmbiguousFeature { feature: String, band: String },
    /// A persisted descriptor was trained with a different classifier kind.
    KindMismatch { loaded: String, requested: String },
    /// Labeled-instance extraction failed.
    Extraction(String),
    /// Model training failed.
    Training(String),
    /// A persistence read or write failed; `operation` names what was being
    /// attempted when the failure occurred.
    Persistence { operation: String, message: String },
}

impl ClassifierError {
    pub fn persistence(operation: impl Into<String>, err: impl fmt::Display) -> Self {
        ClassifierError::Persistence {
            operation: operation.into(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ClassifierError::Config(msg) => write!(f, "{}", msg),
            ClassifierError::DimensionMismatch { product } => {
                write!(f, "Source product {} is of different dimensions", product)
            }
            ClassifierError::MissingBand { name } => {
                write!(f, "Failed to find band {} in source products", name)
            }
            ClassifierError::AmbiguousFeature { feature, band } => write!(
                f,
                "Band {} for feature {} has already been matched by an earlier feature",
                band, feature
            ),
            ClassifierError::KindMismatch { loaded, requested } => {
                write!(f, "Loaded classifier is {} NOT {}", loaded, requested)
            }
            ClassifierError::Extraction(msg) => write!(f, "Extraction failed: {}", msg),
            ClassifierError::Training(msg) => write!(f, "Training failed: {}", msg),
            ClassifierError::Persistence { operation, message } => {
                write!(f, "Failed to {}: {}", operation, message)
            }
        }
    }
}

impl Error for ClassifierError {}

pub type Result<T> = std::result::Result<T, ClassifierError>;
