//! Feature bands and their normalization parameters.
//!
//! A [`FeatureInfo`] ties one input band to the linear rescale that maps its
//! observed value range into [0, 1], plus the band's no-data sentinel. The
//! same normalization is applied during extraction and inference, and the
//! observed min/max are persisted so a reloaded model reconstructs it
//! exactly.
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{ClassifierError, Result};
use crate::raster::{Band, Product};

/// One input feature: a band reference plus normalization parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureInfo {
    /// Band name, the persisted identity of this feature.
    pub name: String,
    /// Index of the owning product in the configured source-product list.
    pub product_idx: usize,
    /// Index of the band within its product.
    pub band_idx: usize,
    /// Position of this feature in the feature vector.
    pub id: usize,
    /// No-data sentinel; NaN when the band has none.
    pub no_data: f64,
    /// Observed band minimum, also the normalization offset.
    pub min: f64,
    /// Observed band maximum.
    pub max: f64,
}

impl FeatureInfo {
    /// Build from a band's observed statistics.
    pub fn from_band(product_idx: usize, band_idx: usize, id: usize, band: &Band) -> Result<Self> {
        let (min, max) = band.min_max().ok_or_else(|| {
            ClassifierError::Config(format!("Feature band {} has no valid samples", band.name))
        })?;
        Ok(FeatureInfo {
            name: band.name.clone(),
            product_idx,
            band_idx,
            id,
            no_data: band.no_data_value(),
            min,
            max,
        })
    }

    /// Reconstruct from persisted min/max; the band reference comes from
    /// matching the persisted feature name against the current products.
    pub fn from_saved(
        name: impl Into<String>,
        product_idx: usize,
        band_idx: usize,
        id: usize,
        no_data: f64,
        min: f64,
        max: f64,
    ) -> Self {
        FeatureInfo {
            name: name.into(),
            product_idx,
            band_idx,
            id,
            no_data,
            min,
            max,
        }
    }

    fn is_no_data(&self, val: f64) -> bool {
        val == self.no_data || (self.no_data.is_nan() && val.is_nan())
    }

    /// Linear rescale of `val` into [0, 1], clamped at the observed range.
    /// `None` when the value equals the band's no-data sentinel, which
    /// rejects the whole pixel.
    pub fn normalize(&self, val: f64) -> Option<f64> {
        if self.is_no_data(val) {
            return None;
        }
        let span = self.max - self.min;
        let scaled = if span == 0.0 {
            0.0
        } else {
            (val - self.min) / span
        };
        Some(scaled.clamp(0.0, 1.0))
    }

    pub fn band<'a>(&self, products: &'a [Product]) -> &'a Band {
        &products[self.product_idx].bands[self.band_idx]
    }
}

/// Normalized feature vector for the pixel at `(row, col)` of the given
/// per-feature windows, or `None` when any feature is no-data there.
pub fn features_at(
    windows: &[Array2<f64>],
    infos: &[FeatureInfo],
    row: usize,
    col: usize,
) -> Option<Vec<f64>> {
    let mut features = Vec::with_capacity(infos.len());
    for (window, info) in windows.iter().zip(infos) {
        features.push(info.normalize(window[(row, col)])?);
    }
    Some(features)
}
