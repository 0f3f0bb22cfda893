//! Monthly ice-probability forecasts from a trained RBF kernel model.
//!
//! The model file is JSON:
//!
//! ```json
//! {"years": [2015, ...], "months": [1, ...], "gamma": 4.0,
//!  "cells": [[lon, lat], ...], "weights": [[w_0, w_1, ...], ...]}
//! ```
//!
//! `years`/`months` describe the training samples, `weights` holds one row
//! per grid cell with one column per sample.

use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{Datelike, NaiveDate};
use dashmap::DashMap;
use icewatch_shared::{Feature, FeatureCollection, format_iso_date};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;

use icewatch_shared::projection::polar_distance_km;

#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("Model file not found at {0}")]
    ModelMissing(String),
    #[error("Failed to load model from '{path}': {reason}")]
    ModelLoad { path: String, reason: String },
    #[error("Invalid model: {0}")]
    InvalidModel(String),
    #[error("Invalid prediction date: {0}")]
    InvalidDate(String),
    #[error("Prediction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Deserialize)]
struct ModelFile {
    years: Vec<i32>,
    months: Vec<u32>,
    #[serde(default = "default_gamma")]
    gamma: f64,
    cells: Vec<[f64; 2]>,
    weights: Vec<Vec<f64>>,
}

fn default_gamma() -> f64 {
    1.0
}

#[derive(Debug)]
pub struct RbfModel {
    year_min: i32,
    year_span: f64,
    gamma: f64,
    samples: Vec<[f64; 3]>,
    cells: Vec<[f64; 2]>,
    weights: Vec<Vec<f64>>,
}

impl RbfModel {
    fn from_file(file: ModelFile) -> Result<Self, PredictionError> {
        if file.years.is_empty() || file.years.len() != file.months.len() {
            return Err(PredictionError::InvalidModel(format!(
                "{} years for {} months",
                file.years.len(),
                file.months.len()
            )));
        }
        if file.cells.len() != file.weights.len() {
            return Err(PredictionError::InvalidModel(format!(
                "{} cells for {} weight rows",
                file.cells.len(),
                file.weights.len()
            )));
        }
        if let Some(row) = file.weights.iter().find(|row| row.len() != file.years.len()) {
            return Err(PredictionError::InvalidModel(format!(
                "weight row has {} columns, expected {}",
                row.len(),
                file.years.len()
            )));
        }
        if !file.gamma.is_finite() || file.gamma < 0.0 {
            return Err(PredictionError::InvalidModel(format!(
                "gamma must be a non-negative number, got {}",
                file.gamma
            )));
        }

        let year_min = file.years.iter().copied().min().unwrap_or_default();
        let year_max = file.years.iter().copied().max().unwrap_or_default();
        let year_span = f64::from((year_max - year_min).max(1));
        let samples = file
            .years
            .iter()
            .zip(&file.months)
            .map(|(&year, &month)| temporal_features(year, month, year_min, year_span))
            .collect();

        Ok(Self {
            year_min,
            year_span,
            gamma: file.gamma,
            samples,
            cells: file.cells,
            weights: file.weights,
        })
    }

    pub fn parse(raw: &[u8], path: &Path) -> Result<Self, PredictionError> {
        let file: ModelFile =
            serde_json::from_slice(raw).map_err(|e| PredictionError::ModelLoad {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Self::from_file(file)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Ice probability for every cell in the month containing `date`,
    /// clamped to `[0, 1]`.
    pub fn probabilities(&self, date: NaiveDate) -> Vec<f64> {
        let target = temporal_features(date.year(), date.month(), self.year_min, self.year_span);
        let kernel: Vec<f64> = self
            .samples
            .iter()
            .map(|sample| {
                let dist2: f64 = sample
                    .iter()
                    .zip(&target)
                    .map(|(a, b)| (a - b).powi(2))
                    .sum();
                (-self.gamma * dist2).exp()
            })
            .collect();

        self.weights
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&kernel)
                    .map(|(w, k)| w * k)
                    .sum::<f64>()
                    .clamp(0.0, 1.0)
            })
            .collect()
    }

    /// Cells with `p >= threshold` lying strictly farther than `radius_km`
    /// from the pole, as point features dated the first of the month.
    pub fn predict(&self, date: NaiveDate, threshold: f64, radius_km: f64) -> FeatureCollection {
        let month_start = date.with_day(1).unwrap_or(date);
        let label = format_iso_date(month_start);
        let features = self
            .cells
            .iter()
            .zip(self.probabilities(month_start))
            .filter(|(_, p)| *p >= threshold)
            .filter(|([_, lat], _)| polar_distance_km(*lat) > radius_km)
            .map(|(&[lon, lat], p)| {
                let mut properties = Map::new();
                properties.insert("date".to_string(), Value::String(label.clone()));
                properties.insert("pred_prob".to_string(), Value::from(p));
                Feature::point(lon, lat, properties)
            })
            .collect();
        FeatureCollection::new(features)
    }
}

fn temporal_features(year: i32, month: u32, year_min: i32, year_span: f64) -> [f64; 3] {
    let angle = 2.0 * PI * f64::from(month) / 12.0;
    [
        f64::from(year - year_min) / year_span,
        angle.sin(),
        angle.cos(),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PredictionKey {
    year: i32,
    month: u32,
    threshold_bits: u64,
    radius_bits: u64,
}

#[derive(Debug, Clone)]
struct CachedPrediction {
    collection: Arc<FeatureCollection>,
    cached_at: Instant,
}

/// Outcome of [`PredictionService::predict`].
#[derive(Debug, Clone)]
pub struct Prediction {
    pub collection: Arc<FeatureCollection>,
    pub cache_hit: bool,
}

/// Lazily-loaded model plus a bounded per-(month, threshold, radius) cache.
#[derive(Clone)]
pub struct PredictionService {
    model_path: PathBuf,
    model: Arc<OnceCell<Arc<RbfModel>>>,
    cache: Arc<DashMap<PredictionKey, CachedPrediction>>,
    max_entries: usize,
}

impl PredictionService {
    pub fn new(model_path: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            model_path: model_path.into(),
            model: Arc::new(OnceCell::new()),
            cache: Arc::new(DashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.model.initialized()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    async fn model(&self) -> Result<Arc<RbfModel>, PredictionError> {
        self.model
            .get_or_try_init(|| async {
                let path = self.model_path.clone();
                let model = tokio::task::spawn_blocking(move || load_model(&path)).await??;
                tracing::info!(
                    path = %self.model_path.display(),
                    cells = model.cell_count(),
                    "prediction model loaded"
                );
                Ok::<_, PredictionError>(Arc::new(model))
            })
            .await
            .cloned()
    }

    pub async fn predict(
        &self,
        date: NaiveDate,
        threshold: f64,
        radius_km: f64,
    ) -> Result<Prediction, PredictionError> {
        let key = PredictionKey {
            year: date.year(),
            month: date.month(),
            threshold_bits: threshold.to_bits(),
            radius_bits: radius_km.to_bits(),
        };
        if let Some(cached) = self.cache.get(&key) {
            return Ok(Prediction {
                collection: Arc::clone(&cached.collection),
                cache_hit: true,
            });
        }

        let model = self.model().await?;
        let month_start = NaiveDate::from_ymd_opt(key.year, key.month, 1)
            .ok_or_else(|| PredictionError::InvalidDate(format_iso_date(date)))?;
        let collection = tokio::task::spawn_blocking(move || {
            model.predict(month_start, threshold, radius_km)
        })
        .await?;
        let collection = Arc::new(collection);
        self.store(key, Arc::clone(&collection));

        Ok(Prediction {
            collection,
            cache_hit: false,
        })
    }

    fn store(&self, key: PredictionKey, collection: Arc<FeatureCollection>) {
        if !self.cache.contains_key(&key) {
            while self.cache.len() >= self.max_entries {
                if !self.evict_oldest() {
                    break;
                }
            }
        }
        self.cache.insert(
            key,
            CachedPrediction {
                collection,
                cached_at: Instant::now(),
            },
        );
    }

    fn evict_oldest(&self) -> bool {
        let Some(oldest) = self
            .cache
            .iter()
            .min_by_key(|entry| entry.value().cached_at)
            .map(|entry| *entry.key())
        else {
            return false;
        };
        self.cache.remove(&oldest).is_some()
    }
}

fn load_model(path: &Path) -> Result<RbfModel, PredictionError> {
    if !path.is_file() {
        return Err(PredictionError::ModelMissing(path.display().to_string()));
    }
    let raw = std::fs::read(path).map_err(|e| PredictionError::ModelLoad {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    RbfModel::parse(&raw, path)
}

#[cfg(test)]
pub(crate) mod test_support {
    /// Two training samples (Jan 2020, Jan 2021), gamma 1.
    ///
    /// For January 2021 the kernel is `[e^-1, 1]`, so:
    /// - cell 0 (80°N): `1 + e^-1`, clamped to 1
    /// - cell 1 (75°N): exactly 0.5
    /// - cell 2 (70°N): negative, clamped to 0
    /// - cell 3 (89.5°N): 1, but inside any radius over ~56 km
    pub(crate) const TINY_MODEL: &str = r#"{
        "years": [2020, 2021],
        "months": [1, 1],
        "gamma": 1.0,
        "cells": [[0.0, 80.0], [10.0, 75.0], [20.0, 70.0], [30.0, 89.5]],
        "weights": [[1.0, 1.0], [0.0, 0.5], [0.0, -2.0], [0.0, 1.0]]
    }"#;
}

#[cfg(test)]
mod tests {
    use super::test_support::TINY_MODEL;
    use super::*;
    use crate::services::datasets::test_support::ScratchDir;

    fn model() -> RbfModel {
        RbfModel::parse(TINY_MODEL.as_bytes(), Path::new("tiny.json")).expect("valid model")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn probabilities_are_clamped() {
        let probs = model().probabilities(date(2021, 1, 1));
        assert_eq!(probs[0], 1.0);
        assert_eq!(probs[1], 0.5);
        assert_eq!(probs[2], 0.0);
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn threshold_is_inclusive_and_radius_strict() {
        let fc = model().predict(date(2021, 1, 17), 0.5, 0.0);
        let positions: Vec<[f64; 2]> = fc.positions().collect();
        assert_eq!(positions, vec![[0.0, 80.0], [10.0, 75.0], [30.0, 89.5]]);

        let far = model().predict(date(2021, 1, 17), 0.5, 500.0);
        let positions: Vec<[f64; 2]> = far.positions().collect();
        assert_eq!(positions, vec![[0.0, 80.0], [10.0, 75.0]]);

        let everything = model().predict(date(2021, 1, 1), 0.0, 0.0);
        assert_eq!(everything.len(), 4);
    }

    #[test]
    fn features_are_dated_first_of_month() {
        let fc = model().predict(date(2021, 1, 17), 0.9, 0.0);
        let feature = &fc.features[0];
        assert_eq!(
            feature.properties.get("date").and_then(Value::as_str),
            Some("2021-01-01")
        );
        assert_eq!(feature.number_property("pred_prob"), Some(1.0));
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let bad_rows = r#"{"years":[2020],"months":[1],"gamma":1.0,"cells":[[0,80],[1,80]],"weights":[[1.0]]}"#;
        assert!(matches!(
            RbfModel::parse(bad_rows.as_bytes(), Path::new("bad.json")),
            Err(PredictionError::InvalidModel(_))
        ));
        let bad_cols = r#"{"years":[2020,2021],"months":[1,2],"cells":[[0,80]],"weights":[[1.0]]}"#;
        assert!(matches!(
            RbfModel::parse(bad_cols.as_bytes(), Path::new("bad.json")),
            Err(PredictionError::InvalidModel(_))
        ));
        assert!(matches!(
            RbfModel::parse(b"[]", Path::new("bad.json")),
            Err(PredictionError::ModelLoad { .. })
        ));
    }

    #[tokio::test]
    async fn missing_model_is_reported_and_not_cached() {
        let dir = ScratchDir::new("model-missing");
        let service = PredictionService::new(dir.path().join("rbf_model.json"), 4);
        let result = service.predict(date(2021, 1, 1), 0.5, 0.0).await;
        assert!(matches!(result, Err(PredictionError::ModelMissing(_))));
        assert!(!service.model_loaded());
        assert_eq!(service.cache_len(), 0);
    }

    #[tokio::test]
    async fn repeated_requests_hit_the_cache() {
        let dir = ScratchDir::new("model-cache");
        let path = dir.write("rbf_model.json", TINY_MODEL);
        let service = PredictionService::new(path, 4);

        let first = service
            .predict(date(2021, 1, 5), 0.5, 0.0)
            .await
            .expect("prediction");
        assert!(!first.cache_hit);
        assert!(service.model_loaded());

        // Any day of the same month shares the cached result.
        let second = service
            .predict(date(2021, 1, 20), 0.5, 0.0)
            .await
            .expect("prediction");
        assert!(second.cache_hit);
        assert!(Arc::ptr_eq(&first.collection, &second.collection));
    }

    #[tokio::test]
    async fn cache_is_bounded() {
        let dir = ScratchDir::new("model-bound");
        let path = dir.write("rbf_model.json", TINY_MODEL);
        let service = PredictionService::new(path, 2);

        for threshold in [0.1, 0.2, 0.3, 0.4] {
            service
                .predict(date(2021, 1, 1), threshold, 0.0)
                .await
                .expect("prediction");
        }
        assert_eq!(service.cache_len(), 2);
    }
}
