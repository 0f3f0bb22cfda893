//! Historical ice-extent snapshots stored on disk as GeoJSON point files.
//!
//! A snapshot's date comes from the first run of eight digits (`YYYYMMDD`) in
//! its file stem, so `ice_20240115_v2.geojson` is the 2024-01-15 snapshot.
//! Files may live anywhere below the dataset root; per-year bundles read the
//! `<root>/<year>/` subtree.

use std::path::{Path, PathBuf};

use icewatch_shared::dates::date_token_to_iso;
use icewatch_shared::projection::polar_distance_km;
use icewatch_shared::{AvailableDates, FeatureCollection, parse_iso_date};

const DATASET_EXTENSIONS: [&str; 2] = ["geojson", "json"];

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Date must be provided as YYYY-MM-DD.")]
    InvalidDate,
    #[error("No dataset found for {date} under {root}")]
    NotFound { date: String, root: String },
    #[error("Failed to scan datasets: {0}")]
    Scan(#[source] std::io::Error),
    #[error("Failed to read dataset '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse dataset '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Dataset task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetEntry {
    pub date: String,
    pub path: PathBuf,
}

/// A converted snapshot, ready to serialize.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub date: String,
    pub source: String,
    pub feature_collection: FeatureCollection,
}

#[derive(Debug, Clone)]
pub struct DatasetStore {
    root: PathBuf,
}

impl DatasetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn available_dates(&self) -> Result<AvailableDates, DatasetError> {
        let root = self.root.clone();
        let entries = tokio::task::spawn_blocking(move || scan_entries(&root)).await??;
        Ok(AvailableDates::new(entries.into_iter().map(|entry| entry.date)))
    }

    /// Resolve the file for an ISO date. When several files carry the date
    /// token, one whose stem starts with it wins.
    pub async fn find(&self, date: &str) -> Result<DatasetEntry, DatasetError> {
        if parse_iso_date(date).is_none() {
            return Err(DatasetError::InvalidDate);
        }
        let root = self.root.clone();
        let wanted = date.to_string();
        let entries = tokio::task::spawn_blocking(move || scan_entries(&root)).await??;
        pick_entry(entries, &wanted).ok_or_else(|| DatasetError::NotFound {
            date: date.to_string(),
            root: self.root.display().to_string(),
        })
    }

    pub async fn load(&self, date: &str, radius_km: f64) -> Result<LoadedDataset, DatasetError> {
        let entry = self.find(date).await?;
        tokio::task::spawn_blocking(move || load_entry(&entry, radius_km)).await?
    }

    /// Files under `<root>/<year>/`, sorted by path. A missing year directory
    /// yields an empty list.
    pub async fn year_entries(&self, year: i32) -> Result<Vec<DatasetEntry>, DatasetError> {
        let year_dir = self.root.join(year.to_string());
        tokio::task::spawn_blocking(move || scan_entries(&year_dir)).await?
    }

    pub async fn load_entry(
        &self,
        entry: DatasetEntry,
        radius_km: f64,
    ) -> Result<LoadedDataset, DatasetError> {
        tokio::task::spawn_blocking(move || load_entry(&entry, radius_km)).await?
    }
}

fn is_dataset_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            DATASET_EXTENSIONS
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        })
}

/// Recursively collect dated dataset files below `root`, sorted by path.
/// A missing root is treated as empty.
pub fn scan_entries(root: &Path) -> Result<Vec<DatasetEntry>, DatasetError> {
    let mut entries = Vec::new();
    if !root.is_dir() {
        return Ok(entries);
    }

    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for item in std::fs::read_dir(&dir).map_err(DatasetError::Scan)? {
            let path = item.map_err(DatasetError::Scan)?.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            if !is_dataset_file(&path) {
                continue;
            }
            let Some(date) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(date_token_to_iso)
            else {
                continue;
            };
            entries.push(DatasetEntry { date, path });
        }
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

fn pick_entry(entries: Vec<DatasetEntry>, date: &str) -> Option<DatasetEntry> {
    let token = date.replace('-', "");
    let candidates: Vec<DatasetEntry> = entries
        .into_iter()
        .filter(|entry| entry.date == date)
        .collect();
    let exact = candidates.iter().position(|entry| {
        entry
            .path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| stem.starts_with(&token))
    });
    match exact {
        Some(index) if candidates.len() > 1 => candidates.into_iter().nth(index),
        _ => candidates.into_iter().next(),
    }
}

fn load_entry(entry: &DatasetEntry, radius_km: f64) -> Result<LoadedDataset, DatasetError> {
    let path = entry.path.display().to_string();
    let raw = std::fs::read(&entry.path).map_err(|source| DatasetError::Read {
        path: path.clone(),
        source,
    })?;
    let mut feature_collection: FeatureCollection =
        serde_json::from_slice(&raw).map_err(|source| DatasetError::Parse {
            path: path.clone(),
            source,
        })?;
    filter_by_radius(&mut feature_collection, radius_km);

    let source = std::fs::canonicalize(&entry.path)
        .map(|resolved| resolved.display().to_string())
        .unwrap_or(path);
    Ok(LoadedDataset {
        date: entry.date.clone(),
        source,
        feature_collection,
    })
}

/// Keep only positions strictly farther than `radius_km` from the North Pole.
pub fn filter_by_radius(collection: &mut FeatureCollection, radius_km: f64) {
    collection.retain_positions(|[_, lat]| polar_distance_km(lat) > radius_km);
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::{Path, PathBuf};

    use tempfile::TempDir;

    /// Scratch dataset root, deleted when dropped.
    pub(crate) struct ScratchDir(TempDir);

    impl ScratchDir {
        pub(crate) fn new(label: &str) -> Self {
            let dir = tempfile::Builder::new()
                .prefix(&format!("icewatch-{label}-"))
                .tempdir()
                .expect("create scratch dir");
            Self(dir)
        }

        pub(crate) fn path(&self) -> &Path {
            self.0.path()
        }

        pub(crate) fn write(&self, relative: &str, contents: &str) -> PathBuf {
            let path = self.0.path().join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("create parent dir");
            }
            std::fs::write(&path, contents).expect("write scratch file");
            path
        }
    }

    /// Points at 89°N (~111 km from the pole) and 80°N (~1112 km).
    pub(crate) const TWO_POINT_SNAPSHOT: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [10.0, 89.0]}, "properties": {}},
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [-60.0, 80.0]}, "properties": {}}
        ]
    }"#;
}
