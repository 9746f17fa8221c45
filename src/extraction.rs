//! Parallel extraction of labeled training instances from tiled rasters.
//!
//! The image is partitioned into tile rectangles processed by a rayon
//! worker pool: launch all, wait for all. Workers push per-tile batches
//! into one lock-protected collector that enforces the total sample target
//! and, in polygon mode, the per-class cap. The cap is a soft bound: a
//! worker may finish its tile after another worker filled the collector,
//! so extraction can slightly overshoot before the stop flag is observed.
//! Which instances survive depends on worker scheduling; callers must not
//! assume an ordering.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use ndarray::Array2;
use rayon::prelude::*;

use crate::config::Quantizer;
use crate::data_handling::LabeledInstance;
use crate::error::{ClassifierError, Result};
use crate::features::{features_at, FeatureInfo};
use crate::raster::{tile_rectangles, Band, Product, Rect};
use crate::vector::{
    class_indicator_window, polygons_intersecting, PolygonVector, NOT_IN_POLYGON,
};

/// Tile size for raster-mask extraction.
pub const MASK_TILE_WIDTH: usize = 20;
pub const MASK_TILE_HEIGHT: usize = 10;

/// Tile size for polygon extraction.
pub const POLYGON_TILE_SIZE: usize = 512;

/// Shared, capped instance collector.
struct SampleCollector {
    instances: Vec<LabeledInstance>,
    target: usize,
    /// Per-class-index counts and cap, polygon mode only.
    per_class: Option<(Vec<usize>, usize)>,
}

impl SampleCollector {
    fn new(target: usize, per_class: Option<(usize, usize)>) -> Self {
        SampleCollector {
            instances: Vec::with_capacity(target),
            target,
            per_class: per_class.map(|(num_classes, cap)| (vec![0; num_classes], cap)),
        }
    }

    /// Merge a worker's batch; returns true once the target is reached.
    fn merge(&mut self, batch: Vec<LabeledInstance>) -> bool {
        for instance in batch {
            if self.instances.len() >= self.target {
                return true;
            }
            if let Some((counts, cap)) = &mut self.per_class {
                let class_idx = instance.class_value as usize;
                match counts.get_mut(class_idx) {
                    Some(count) if *count < *cap => *count += 1,
                    _ => continue,
                }
            }
            self.instances.push(instance);
        }
        self.instances.len() >= self.target
    }
}

/// Extract up to `num_instances` labeled instances from a raster mask band.
///
/// Pixels whose mask value is NaN or equals `mask_no_data` are skipped, as
/// are pixels where any feature is no-data. The mask value, optionally
/// quantized, becomes the class value. A failing worker fails the whole
/// extraction.
pub fn extract_from_mask(
    products: &[Product],
    mask_band: &Band,
    mask_no_data: f64,
    feature_infos: &[FeatureInfo],
    num_instances: usize,
    quantizer: Quantizer,
) -> Result<Vec<LabeledInstance>> {
    let rects = tile_rectangles(
        mask_band.width(),
        mask_band.height(),
        MASK_TILE_WIDTH,
        MASK_TILE_HEIGHT,
    );
    log::debug!(
        "Getting training data from mask band {} over {} tiles",
        mask_band.name,
        rects.len()
    );

    let collector = Mutex::new(SampleCollector::new(num_instances, None));
    let full = AtomicBool::new(false);

    rects.par_iter().try_for_each(|rect| -> Result<()> {
        if full.load(Ordering::Relaxed) {
            return Ok(());
        }
        let mask_window = mask_band.read_window(rect);
        let windows = read_feature_windows(products, feature_infos, rect);

        let mut batch = Vec::new();
        for row in 0..rect.height {
            for col in 0..rect.width {
                let mask_value = mask_window[(row, col)];
                if mask_value.is_nan() || mask_value == mask_no_data {
                    continue;
                }
                let Some(features) = features_at(&windows, feature_infos, row, col) else {
                    continue;
                };
                batch.push(LabeledInstance::new(features, quantizer.apply(mask_value)));
            }
        }

        let mut collector = lock_collector(&collector)?;
        if collector.merge(batch) {
            full.store(true, Ordering::Relaxed);
        }
        Ok(())
    })?;

    let collector = collector
        .into_inner()
        .map_err(|_| ClassifierError::Extraction("sample collector lock poisoned".to_string()))?;
    log::info!("Extracted {} labeled instances from mask", collector.instances.len());
    Ok(collector.instances)
}

/// Extract up to `num_instances` labeled instances from polygon overlays.
///
/// `training_polygons` are the configured polygons in order;
/// `vector_classes[i]` is the class index assigned to polygon `i`. Samples
/// are capped at `ceil(num_instances / num_classes)` per class so the
/// combined collection stays class-balanced. A failing worker is logged and
/// its tile abandoned; the extraction itself continues.
pub fn extract_from_polygons(
    products: &[Product],
    width: usize,
    height: usize,
    training_polygons: &[&PolygonVector],
    vector_classes: &[i64],
    num_classes: usize,
    feature_infos: &[FeatureInfo],
    num_instances: usize,
) -> Result<Vec<LabeledInstance>> {
    let rects = tile_rectangles(width, height, POLYGON_TILE_SIZE, POLYGON_TILE_SIZE);
    let max_per_class = (num_instances as f64 / num_classes as f64).ceil() as usize;
    log::debug!(
        "Extracting polygon training data over {} tiles, at most {} samples per class",
        rects.len(),
        max_per_class
    );

    let collector = Mutex::new(SampleCollector::new(
        num_instances,
        Some((num_classes, max_per_class)),
    ));
    let full = AtomicBool::new(false);

    rects.par_iter().for_each(|rect| {
        if full.load(Ordering::Relaxed) {
            return;
        }
        match extract_polygon_tile(
            products,
            rect,
            training_polygons,
            vector_classes,
            feature_infos,
        ) {
            Ok(Some(batch)) => match lock_collector(&collector) {
                Ok(mut collector) => {
                    if collector.merge(batch) {
                        full.store(true, Ordering::Relaxed);
                    }
                }
                Err(err) => log::error!("Error collecting polygon samples: {}", err),
            },
            Ok(None) => {}
            Err(err) => log::error!("Error retrieving features from polygons: {}", err),
        }
    });

    let collector = collector
        .into_inner()
        .map_err(|_| ClassifierError::Extraction("sample collector lock poisoned".to_string()))?;
    log::info!(
        "Extracted {} labeled instances from {} polygons",
        collector.instances.len(),
        training_polygons.len()
    );
    Ok(collector.instances)
}

/// One polygon-mode tile: `None` when no training polygon intersects it.
fn extract_polygon_tile(
    products: &[Product],
    rect: &Rect,
    training_polygons: &[&PolygonVector],
    vector_classes: &[i64],
    feature_infos: &[FeatureInfo],
) -> Result<Option<Vec<LabeledInstance>>> {
    let intersecting = polygons_intersecting(rect, training_polygons);
    if intersecting.is_empty() {
        return Ok(None);
    }
    let indexed: Vec<(usize, &PolygonVector)> = intersecting
        .iter()
        .map(|&i| (i, training_polygons[i]))
        .collect();
    let indicator = class_indicator_window(rect, &indexed);
    let windows = read_feature_windows(products, feature_infos, rect);

    let mut batch = Vec::new();
    for row in 0..rect.height {
        for col in 0..rect.width {
            let vector_idx = indicator[(row, col)];
            if vector_idx == NOT_IN_POLYGON {
                continue;
            }
            let Some(features) = features_at(&windows, feature_infos, row, col) else {
                continue;
            };
            let class_idx = vector_classes.get(vector_idx as usize).ok_or_else(|| {
                ClassifierError::Extraction(format!(
                    "polygon index {} has no class assignment",
                    vector_idx
                ))
            })?;
            batch.push(LabeledInstance::new(features, *class_idx as f64));
        }
    }
    Ok(Some(batch))
}

fn read_feature_windows(
    products: &[Product],
    feature_infos: &[FeatureInfo],
    rect: &Rect,
) -> Vec<Array2<f64>> {
    feature_infos
        .iter()
        .map(|fi| fi.band(products).read_window(rect))
        .collect()
}

fn lock_collector<'a>(
    collector: &'a Mutex<SampleCollector>,
) -> Result<std::sync::MutexGuard<'a, SampleCollector>> {
    collector
        .lock()
        .map_err(|_| ClassifierError::Extraction("sample collector lock poisoned".to_string()))
}
