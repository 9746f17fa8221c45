//! Supervised classification pipeline.
//!
//! [`SupervisedClassifier`] ties the pieces together: it validates the
//! configuration against the source products, extracts labeled instances,
//! trains (or loads) the model exactly once, optionally searches the
//! feature power set, persists the result, and applies the model tile by
//! tile to produce a class-label window and a confidence window.
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, RwLock};

use ndarray::Array2;
use rayon::prelude::*;

use crate::config::{max_class_value, ClassifierParams, Quantizer, TrainingSource};
use crate::data_handling::{LabeledInstances, SplitPolicy};
use crate::error::{ClassifierError, Result};
use crate::evaluation;
use crate::extraction;
use crate::feature_selection::run_power_set_search;
use crate::features::{features_at, FeatureInfo};
use crate::io::descriptor::{
    classifier_dir, load_descriptor, save_descriptor, ClassifierDescriptor, ClassifierUserInfo,
    FORMAT_VERSION,
};
use crate::models::{confidence_of, ClassifierModel, Model};
use crate::raster::{find_band_in_products, tile_rectangles, total_num_bands, Band, Product, Rect};
use crate::report::ClassifierReport;
use crate::vector::PolygonVector;

pub const LABEL_BAND_NAME: &str = "LabeledClasses";
pub const CONFIDENCE_BAND_NAME: &str = "Confidence";

/// Label value for pixels outside every class in polygon mode.
const INT_NO_DATA_VALUE: f64 = -1.0;

/// Bands never auto-selected as features.
const EXCLUDED_BAND_PREFIXES: &[&str] = &["lat_band", "long_band", "flags"];

/// Tile size used by the whole-image classification helper.
pub const INFERENCE_TILE_SIZE: usize = 512;

/// Classified label and confidence windows for one tile rectangle.
#[derive(Debug, Clone)]
pub struct ClassifiedTile {
    pub rect: Rect,
    pub labels: Array2<f64>,
    pub confidence: Array2<f64>,
}

/// State available once the model is trained or loaded.
#[derive(Debug)]
struct ReadyState {
    model: Model,
    feature_infos: Vec<FeatureInfo>,
    sorted_class_values: Vec<f64>,
}

#[derive(Debug)]
pub struct SupervisedClassifier {
    params: ClassifierParams,
    products: Vec<Product>,
    polygons: Vec<PolygonVector>,
    storage_root: PathBuf,
    load_pretrained: bool,
    width: usize,
    height: usize,
    /// `(product index, band index)` of the training mask band.
    mask_band: Option<(usize, usize)>,
    mask_no_data: f64,
    /// Resolved training polygon names, in configured order.
    training_vectors: Vec<String>,
    /// Indices into `polygons`, parallel to `training_vectors`.
    training_polygon_idx: Vec<usize>,
    /// Class index to human-readable label.
    class_labels: BTreeMap<i64, String>,
    /// Class index assigned to each training polygon.
    vector_classes: Vec<i64>,
    report: Mutex<ClassifierReport>,
    cancel: Arc<AtomicBool>,
    state: RwLock<Option<ReadyState>>,
}

impl SupervisedClassifier {
    /// Validate the configuration against the source products and build the
    /// classifier. `load_pretrained` selects load-from-disk instead of
    /// training on first use.
    pub fn new(
        params: ClassifierParams,
        products: Vec<Product>,
        polygons: Vec<PolygonVector>,
        storage_root: PathBuf,
        load_pretrained: bool,
    ) -> Result<Self> {
        params.validate()?;
        if products.is_empty() {
            return Err(ClassifierError::Config(
                "at least one source product is required".to_string(),
            ));
        }

        // all source products must share the same raster dimensions
        let width = products[0].width();
        let height = products[0].height();
        for product in &products[1..] {
            if product.width() != width || product.height() != height {
                return Err(ClassifierError::DimensionMismatch {
                    product: product.name.clone(),
                });
            }
        }

        let report = ClassifierReport::new(params.kind.name(), &params.saved_classifier_name);
        let mut classifier = SupervisedClassifier {
            params,
            products,
            polygons,
            storage_root,
            load_pretrained,
            width,
            height,
            mask_band: None,
            mask_no_data: f64::NAN,
            training_vectors: Vec::new(),
            training_polygon_idx: Vec::new(),
            class_labels: BTreeMap::new(),
            vector_classes: Vec::new(),
            report: Mutex::new(report),
            cancel: Arc::new(AtomicBool::new(false)),
            state: RwLock::new(None),
        };
        classifier.resolve_training_source()?;
        Ok(classifier)
    }

    fn resolve_training_source(&mut self) -> Result<()> {
        match self.params.training.clone() {
            TrainingSource::MaskBand { band } => self.resolve_mask_band(band),
            TrainingSource::Polygons {
                vectors,
                label_attribute,
            } => self.resolve_polygons(vectors, label_attribute),
        }
    }

    fn resolve_mask_band(&mut self, band: Option<String>) -> Result<()> {
        match band {
            Some(reference) => {
                let band_name = strip_product_suffix(&reference);
                let (band_idx, _) = self.products[0].band(band_name).ok_or_else(|| {
                    ClassifierError::Config(format!(
                        "Fail to find training band in 1st source product: {}",
                        band_name
                    ))
                })?;
                self.mask_band = Some((0, band_idx));
            }
            None if !self.load_pretrained => {
                if self.products[0].bands.is_empty() {
                    return Err(ClassifierError::Config(
                        "1st source product has no bands".to_string(),
                    ));
                }
                self.mask_band = Some((0, 0));
            }
            None => {}
        }
        if let Some((pi, bi)) = self.mask_band {
            if let Some(nd) = self.products[pi].bands[bi].no_data {
                self.mask_no_data = nd;
            }
        }
        Ok(())
    }

    fn resolve_polygons(
        &mut self,
        vectors: Vec<String>,
        label_attribute: Option<String>,
    ) -> Result<()> {
        let mut vectors = vectors;
        if vectors.is_empty() {
            // use every non-empty polygon of the first product
            vectors = self
                .polygons
                .iter()
                .filter(|p| !p.is_empty())
                .map(|p| format!("{}::{}", p.name, self.products[0].name))
                .collect();
            if vectors.len() < 2 {
                if self.load_pretrained {
                    // inference-only run without training polygons
                    return Ok(());
                }
                return Err(ClassifierError::Config(
                    "Cannot train on vectors because source product has less than 2 vectors"
                        .to_string(),
                ));
            }
        }
        if vectors.len() == 1 {
            return Err(ClassifierError::Config(
                "Please select two or more vectors as classes".to_string(),
            ));
        }

        for reference in &vectors {
            let name = strip_product_suffix(reference);
            let idx = self
                .polygons
                .iter()
                .position(|p| p.name == name)
                .ok_or_else(|| {
                    ClassifierError::Config(format!("Cannot find vector {}", reference))
                })?;
            self.training_polygon_idx.push(idx);
        }

        // the polygon index is the class value, unless labels come from a
        // polygon attribute, in which case distinct attribute values get
        // increasing class indices
        match label_attribute {
            None => {
                for (i, &poly_idx) in self.training_polygon_idx.iter().enumerate() {
                    self.class_labels
                        .insert(i as i64, self.polygons[poly_idx].name.clone());
                    self.vector_classes.push(i as i64);
                }
            }
            Some(attribute) => {
                let mut next_class: i64 = 0;
                let mut label_classes: std::collections::HashMap<String, i64> =
                    std::collections::HashMap::new();
                for &poly_idx in &self.training_polygon_idx {
                    let polygon = &self.polygons[poly_idx];
                    let value = polygon.attribute_value(&attribute).ok_or_else(|| {
                        ClassifierError::Config(format!(
                            "Vector {} has no attribute {}",
                            polygon.name, attribute
                        ))
                    })?;
                    let class = *label_classes.entry(value.to_string()).or_insert_with(|| {
                        let class = next_class;
                        self.class_labels.insert(class, value.to_string());
                        next_class += 1;
                        class
                    });
                    self.vector_classes.push(class);
                }
            }
        }
        self.training_vectors = vectors;
        Ok(())
    }

    pub fn params(&self) -> &ClassifierParams {
        &self.params
    }

    pub fn class_labels(&self) -> &BTreeMap<i64, String> {
        &self.class_labels
    }

    /// Flag checked between power-set subsets; set it to cancel the search
    /// cooperatively.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn is_ready(&self) -> bool {
        self.state.read().map(|s| s.is_some()).unwrap_or(false)
    }

    fn split_policy(&self) -> SplitPolicy {
        if self.params.training.is_raster() {
            SplitPolicy::LinearHalves
        } else {
            SplitPolicy::InterleavedByClass
        }
    }

    fn mask_band_ref(&self) -> Option<&Band> {
        self.mask_band
            .map(|(pi, bi)| &self.products[pi].bands[bi])
    }

    /// Train or load at most once; concurrent callers serialize on the
    /// state lock and later callers see the first result.
    fn ensure_ready(&self) -> Result<()> {
        {
            let state = self.state.read().map_err(lock_poisoned)?;
            if state.is_some() {
                return Ok(());
            }
        }
        let mut state = self.state.write().map_err(lock_poisoned)?;
        if state.is_none() {
            let ready = if self.load_pretrained {
                self.build_loaded()?
            } else {
                self.build_trained()?
            };
            *state = Some(ready);
        }
        Ok(())
    }

    /// Force training now, replacing any previously built model. Concurrent
    /// callers serialize on the state lock.
    pub fn train(&self) -> Result<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        *state = Some(self.build_trained()?);
        Ok(())
    }

    /// Distinct class values of the trained model, ascending; `None` until
    /// the model is trained or loaded.
    pub fn sorted_class_values(&self) -> Option<Vec<f64>> {
        self.state
            .read()
            .ok()?
            .as_ref()
            .map(|s| s.sorted_class_values.clone())
    }

    // ---- training ----------------------------------------------------

    fn build_trained(&self) -> Result<ReadyState> {
        let feature_infos = self.configured_feature_infos()?;
        let quantizer = self.params.quantizer();
        let doubled = self.params.num_train_samples * 2;

        let all_instances = self.extract_instances(doubled, &feature_infos, quantizer)?;
        all_instances.validate()?;

        if self.params.evaluate_classifier && self.params.evaluate_feature_power_set {
            if let Some(ready) =
                self.train_on_best_subset(&all_instances, &feature_infos, quantizer)?
            {
                return Ok(ready);
            }
        }

        let (model, score_line) =
            self.train_and_evaluate(&all_instances, &feature_infos)?;
        let sorted_class_values = all_instances.sorted_class_values();
        self.save_trained(&model, &feature_infos, &sorted_class_values)?;
        if let Some(line) = score_line {
            log::info!("{}", line);
        }
        Ok(ReadyState {
            model,
            feature_infos,
            sorted_class_values,
        })
    }

    /// Power-set search over the extracted instances; on success the model
    /// is retrained on freshly extracted data restricted to the winning
    /// subset. Returns `None` when no subset could be trained.
    fn train_on_best_subset(
        &self,
        all_instances: &LabeledInstances,
        feature_infos: &[FeatureInfo],
        quantizer: Quantizer,
    ) -> Result<Option<ReadyState>> {
        let feature_names: Vec<String> =
            feature_infos.iter().map(|fi| fi.name.clone()).collect();
        let top = {
            let mut report = self.report.lock().map_err(lock_poisoned)?;
            run_power_set_search(
                &self.params.kind,
                &self.params.saved_classifier_name,
                all_instances,
                &feature_names,
                self.split_policy(),
                self.params.min_power_set_size,
                self.params.max_power_set_size,
                &self.cancel,
                &mut report,
            )
        };
        let Some(top) = top else {
            return Ok(None);
        };
        log::info!(
            "Best feature subset {} at {:.2}%",
            top.name,
            top.cross_validation_percent
        );

        let winning_infos: Vec<FeatureInfo> = top
            .feature_columns
            .iter()
            .enumerate()
            .map(|(new_id, &col)| {
                let mut info = feature_infos[col].clone();
                info.id = new_id;
                info
            })
            .collect();

        let doubled = self.params.num_train_samples * 2;
        let winning_instances = self.extract_instances(doubled, &winning_infos, quantizer)?;
        let (model, _) = self.train_and_evaluate(&winning_instances, &winning_infos)?;
        let sorted_class_values = winning_instances.sorted_class_values();
        self.save_trained(&model, &winning_infos, &sorted_class_values)?;
        Ok(Some(ReadyState {
            model,
            feature_infos: winning_infos,
            sorted_class_values,
        }))
    }

    /// Split, train and (optionally) evaluate one model over the given
    /// instances. Returns the trained model and the evaluation line, if any.
    fn train_and_evaluate(
        &self,
        instances: &LabeledInstances,
        feature_infos: &[FeatureInfo],
    ) -> Result<(Model, Option<String>)> {
        let (train_set, test_set) = instances.split(self.split_policy());
        log::info!(
            "Training {} on {} instances ({} held out)",
            self.params.kind.name(),
            train_set.len(),
            test_set.len()
        );

        let mut model = Model::for_kind(&self.params.kind);
        model.train(&train_set)?;

        let mut score_line = None;
        if self.params.evaluate_classifier {
            let feature_names: Vec<String> =
                feature_infos.iter().map(|fi| fi.name.clone()).collect();
            let score = evaluation::evaluate(&model, &test_set, &feature_names);
            let line = format!(
                "Testing: cross validation {:.2}%",
                score.cross_validation_percent
            );
            let mut report = self.report.lock().map_err(lock_poisoned)?;
            report.add_evaluation(line.clone());
            for (name, power) in &score.feature_scores {
                report.add_evaluation(format!("feature {:<24} power {:.4}", name, power));
            }
            score_line = Some(line);
        }
        Ok((model, score_line))
    }

    /// Resolve the configured feature bands, or every band of every product
    /// minus the mask band and the excluded prefixes.
    fn configured_feature_infos(&self) -> Result<Vec<FeatureInfo>> {
        let references: Vec<String> = match &self.params.feature_bands {
            Some(bands) => bands.clone(),
            None => {
                let mut all = Vec::new();
                for product in &self.products {
                    for band in &product.bands {
                        if self.is_mask_band(&band.name, &product.name) {
                            continue;
                        }
                        if EXCLUDED_BAND_PREFIXES
                            .iter()
                            .any(|p| band.name.starts_with(p))
                        {
                            continue;
                        }
                        all.push(format!("{}::{}", band.name, product.name));
                    }
                }
                all
            }
        };
        if references.is_empty() {
            return Err(ClassifierError::Config(
                "no feature bands available".to_string(),
            ));
        }

        let mut feature_infos = Vec::with_capacity(references.len());
        for (id, reference) in references.iter().enumerate() {
            let (band_name, product_name) = split_band_reference(reference);
            let product_idx = match product_name {
                Some(name) => self
                    .products
                    .iter()
                    .position(|p| p.name == name)
                    .ok_or_else(|| {
                        ClassifierError::Config(format!(
                            "Failed to find feature product {}",
                            reference
                        ))
                    })?,
                None => 0,
            };
            let (band_idx, band) =
                self.products[product_idx].band(band_name).ok_or_else(|| {
                    ClassifierError::Config(format!("Failed to find feature band {}", reference))
                })?;
            if self.mask_band == Some((product_idx, band_idx)) {
                return Err(ClassifierError::Config(
                    "The training band has also been selected as a feature band".to_string(),
                ));
            }
            feature_infos.push(FeatureInfo::from_band(product_idx, band_idx, id, band)?);
        }
        Ok(feature_infos)
    }

    fn is_mask_band(&self, band_name: &str, product_name: &str) -> bool {
        match self.mask_band {
            Some((pi, bi)) => {
                self.products[pi].name == product_name
                    && self.products[pi].bands[bi].name == band_name
            }
            None => false,
        }
    }

    fn extract_instances(
        &self,
        num_instances: usize,
        feature_infos: &[FeatureInfo],
        quantizer: Quantizer,
    ) -> Result<LabeledInstances> {
        if self.params.training.is_raster() {
            let mask_band = self.mask_band_ref().ok_or_else(|| {
                ClassifierError::Config("no training mask band available".to_string())
            })?;
            let instances = extraction::extract_from_mask(
                &self.products,
                mask_band,
                self.mask_no_data,
                feature_infos,
                num_instances,
                quantizer,
            )?;
            // every distinct class value maps to the mask band's name
            let mut label_map = Vec::new();
            for instance in &instances {
                if !label_map.iter().any(|(v, _)| *v == instance.class_value) {
                    label_map.push((instance.class_value, mask_band.name.clone()));
                }
            }
            Ok(LabeledInstances::new(label_map, instances))
        } else {
            let training_polygons: Vec<&PolygonVector> = self
                .training_polygon_idx
                .iter()
                .map(|&i| &self.polygons[i])
                .collect();
            if training_polygons.is_empty() {
                return Err(ClassifierError::Config(
                    "no training polygons available".to_string(),
                ));
            }
            let instances = extraction::extract_from_polygons(
                &self.products,
                self.width,
                self.height,
                &training_polygons,
                &self.vector_classes,
                self.class_labels.len(),
                feature_infos,
                num_instances,
            )?;
            let label_map = self
                .class_labels
                .iter()
                .map(|(&class, label)| (class as f64, label.clone()))
                .collect();
            Ok(LabeledInstances::new(label_map, instances))
        }
    }

    // ---- persistence -------------------------------------------------

    fn class_name(&self) -> String {
        self.mask_band_ref()
            .map(|b| b.name.clone())
            .unwrap_or_else(|| "???".to_string())
    }

    fn class_unit(&self) -> String {
        if self.params.training.is_raster() {
            self.mask_band_ref()
                .and_then(|b| b.unit.clone())
                .unwrap_or_default()
        } else {
            "discrete classes".to_string()
        }
    }

    fn save_trained(
        &self,
        model: &Model,
        feature_infos: &[FeatureInfo],
        sorted_class_values: &[f64],
    ) -> Result<()> {
        // order is the contract: load matches features to these names
        let feature_names: Vec<String> =
            feature_infos.iter().map(|fi| fi.name.clone()).collect();
        let feature_min_values: Vec<f64> = feature_infos.iter().map(|fi| fi.min).collect();
        let feature_max_values: Vec<f64> = feature_infos.iter().map(|fi| fi.max).collect();
        let training_vectors = if self.params.training.is_raster() {
            None
        } else {
            Some(self.training_vectors.clone())
        };

        let descriptor = ClassifierDescriptor {
            format_version: FORMAT_VERSION,
            classifier_kind: self.params.kind.name().to_string(),
            classifier_name: self.params.saved_classifier_name.clone(),
            model: model.clone(),
            sorted_class_values: sorted_class_values.to_vec(),
            class_name: self.class_name(),
            class_unit: self.class_unit(),
            feature_names: feature_names.clone(),
            feature_min_values,
            feature_max_values,
            do_class_val_quantization: self.params.do_class_val_quantization,
            min_class_value: self.params.min_class_value,
            class_val_step_size: self.params.class_val_step_size,
            class_levels: self.params.class_levels,
            training_vectors: training_vectors.clone(),
        };

        let quantization_on = self.params.do_class_val_quantization;
        let user_info = ClassifierUserInfo {
            classifier_filename: self.params.saved_classifier_name.clone(),
            classifier_kind: self.params.kind.name().to_string(),
            class_name: descriptor.class_name.clone(),
            num_samples: self.params.num_train_samples,
            sorted_classes: sorted_class_values.to_vec(),
            num_features: feature_names.len(),
            training_bands: match &self.params.training {
                TrainingSource::MaskBand { band } => band.clone().map(|b| vec![b]),
                TrainingSource::Polygons { .. } => None,
            },
            training_vectors,
            feature_names,
            min_class_value: if quantization_on {
                self.params.min_class_value
            } else {
                0.0
            },
            class_val_step_size: if quantization_on {
                self.params.class_val_step_size
            } else {
                0.0
            },
            class_levels: if quantization_on {
                self.params.class_levels as i64
            } else {
                -1
            },
            max_class_value: if quantization_on {
                self.params.quantizer().max_value
            } else {
                0.0
            },
        };

        save_descriptor(&self.storage_root, &descriptor, &user_info)?;
        self.write_report()
    }

    fn write_report(&self) -> Result<()> {
        let report = self.report.lock().map_err(lock_poisoned)?;
        let path = classifier_dir(&self.storage_root, self.params.kind.name()).join(format!(
            "{}.report.txt",
            self.params.saved_classifier_name
        ));
        report.write_to(&path)
    }

    // ---- loading -----------------------------------------------------

    fn build_loaded(&self) -> Result<ReadyState> {
        let descriptor = load_descriptor(
            &self.storage_root,
            self.params.kind.name(),
            &self.params.saved_classifier_name,
        )?;

        let num_features = descriptor.feature_names.len();
        if descriptor.feature_min_values.len() != num_features
            || descriptor.feature_max_values.len() != num_features
        {
            return Err(ClassifierError::persistence(
                format!("load classifier {}", descriptor.classifier_name),
                "feature name and min/max lists differ in length",
            ));
        }

        let total_available = total_num_bands(&self.products);
        if num_features > total_available {
            return Err(ClassifierError::Config(format!(
                "classifier expects {} features; source product(s) only have {}",
                num_features, total_available
            )));
        }

        log::info!(
            "Loaded {} classifier {} to predict {}",
            descriptor.classifier_kind,
            descriptor.classifier_name,
            descriptor.class_name
        );

        let mut matched: Vec<(usize, usize)> = Vec::new();
        let mut feature_infos = Vec::with_capacity(descriptor.feature_names.len());
        for (i, name) in descriptor.feature_names.iter().enumerate() {
            let (pi, bi) = find_band_in_products(&self.products, name)
                .ok_or_else(|| ClassifierError::MissingBand { name: name.clone() })?;
            if matched.contains(&(pi, bi)) {
                return Err(ClassifierError::AmbiguousFeature {
                    feature: name.clone(),
                    band: self.products[pi].bands[bi].name.clone(),
                });
            }
            matched.push((pi, bi));
            let band = &self.products[pi].bands[bi];
            feature_infos.push(FeatureInfo::from_saved(
                name.clone(),
                pi,
                bi,
                i,
                band.no_data_value(),
                descriptor.feature_min_values[i],
                descriptor.feature_max_values[i],
            ));
        }

        let ready = ReadyState {
            model: descriptor.model.clone(),
            feature_infos,
            sorted_class_values: descriptor.sorted_class_values.clone(),
        };

        // post-load evaluation against the current mask band, when possible
        if self.params.evaluate_classifier && self.mask_band.is_some() {
            let quantizer = Quantizer {
                enabled: descriptor.do_class_val_quantization,
                min_value: descriptor.min_class_value,
                max_value: max_class_value(
                    descriptor.min_class_value,
                    descriptor.class_val_step_size,
                    descriptor.class_levels,
                ),
                step_size: descriptor.class_val_step_size,
            };
            let instances = self.extract_instances(
                self.params.num_train_samples,
                &ready.feature_infos,
                quantizer,
            )?;
            let score = evaluation::evaluate(
                &ready.model,
                &instances,
                &descriptor.feature_names,
            );
            let mut report = self.report.lock().map_err(lock_poisoned)?;
            report.add_evaluation(format!(
                "Testing: cross validation {:.2}%",
                score.cross_validation_percent
            ));
            for (name, power) in &score.feature_scores {
                report.add_evaluation(format!("feature {:<24} power {:.4}", name, power));
            }
            drop(report);
            self.write_report()?;
        }

        Ok(ready)
    }

    // ---- inference ---------------------------------------------------

    /// Label value written for pixels without a valid feature vector.
    fn label_no_data(&self) -> f64 {
        if self.params.training.is_raster() {
            f64::NAN
        } else {
            INT_NO_DATA_VALUE
        }
    }

    /// Classify every pixel of one tile rectangle. Triggers training or
    /// loading on the first call. Classification failures for single
    /// pixels produce no-data output, never an error.
    pub fn classify_tile(&self, rect: &Rect) -> Result<ClassifiedTile> {
        self.ensure_ready()?;
        let state = self.state.read().map_err(lock_poisoned)?;
        let state = state
            .as_ref()
            .ok_or_else(|| ClassifierError::Training("classifier state missing".to_string()))?;

        let windows: Vec<Array2<f64>> = state
            .feature_infos
            .iter()
            .map(|fi| fi.band(&self.products).read_window(rect))
            .collect();

        let label_no_data = self.label_no_data();
        let mut labels = Array2::from_elem((rect.height, rect.width), label_no_data);
        let mut confidence = Array2::from_elem((rect.height, rect.width), f64::NAN);

        for row in 0..rect.height {
            for col in 0..rect.width {
                let Some(features) = features_at(&windows, &state.feature_infos, row, col)
                else {
                    continue;
                };
                match state.model.classify(&features) {
                    Some(class_value) => {
                        let distribution = state.model.class_distribution(&features);
                        labels[(row, col)] = class_value;
                        confidence[(row, col)] = confidence_of(&distribution, class_value);
                    }
                    None => {
                        labels[(row, col)] = label_no_data;
                    }
                }
            }
        }

        Ok(ClassifiedTile {
            rect: *rect,
            labels,
            confidence,
        })
    }

    /// Classify the whole image into a target product holding the label
    /// band and the confidence band.
    pub fn classify_to_product(&self) -> Result<Product> {
        self.ensure_ready()?;
        let rects = tile_rectangles(
            self.width,
            self.height,
            INFERENCE_TILE_SIZE,
            INFERENCE_TILE_SIZE,
        );
        let tiles: Vec<ClassifiedTile> = rects
            .par_iter()
            .map(|rect| self.classify_tile(rect))
            .collect::<Result<Vec<_>>>()?;

        let mut labels = Array2::from_elem((self.height, self.width), self.label_no_data());
        let mut confidence = Array2::from_elem((self.height, self.width), f64::NAN);
        for tile in tiles {
            for row in 0..tile.rect.height {
                for col in 0..tile.rect.width {
                    labels[(tile.rect.y + row, tile.rect.x + col)] = tile.labels[(row, col)];
                    confidence[(tile.rect.y + row, tile.rect.x + col)] =
                        tile.confidence[(row, col)];
                }
            }
        }

        let label_no_data = if self.params.training.is_raster() {
            self.mask_no_data
        } else {
            INT_NO_DATA_VALUE
        };
        let label_band = Band {
            name: LABEL_BAND_NAME.to_string(),
            unit: Some(self.class_unit()),
            no_data: Some(label_no_data),
            data: labels,
        };
        let confidence_band = Band {
            name: CONFIDENCE_BAND_NAME.to_string(),
            unit: Some("(0, 1]".to_string()),
            no_data: Some(f64::NAN),
            data: confidence,
        };

        Ok(Product::new(
            format!("{}{}", self.products[0].name, self.params.product_suffix),
            vec![label_band, confidence_band],
        ))
    }
}

fn lock_poisoned<T>(_: T) -> ClassifierError {
    ClassifierError::Training("classifier lock poisoned".to_string())
}

/// `band::product` references carry the product name after the separator.
fn split_band_reference(reference: &str) -> (&str, Option<&str>) {
    match reference.find("::") {
        Some(pos) => (&reference[..pos], Some(&reference[pos + 2..])),
        None => (reference, None),
    }
}

fn strip_product_suffix(reference: &str) -> &str {
    split_band_reference(reference).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_reference_splitting() {
        assert_eq!(split_band_reference("Sigma0_VV"), ("Sigma0_VV", None));
        assert_eq!(
            split_band_reference("Sigma0_VV::S1A_IW"),
            ("Sigma0_VV", Some("S1A_IW"))
        );
        assert_eq!(strip_product_suffix("B4::optical"), "B4");
    }
}
