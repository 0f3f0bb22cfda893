use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// GeoJSON geometry. Only points are drawn by the map; other geometry
/// kinds are carried through untouched so payloads round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: [f64; 2],
    },
    MultiPoint {
        coordinates: Vec<[f64; 2]>,
    },
    #[serde(untagged)]
    Other(Value),
}

impl Geometry {
    pub fn point(lon: f64, lat: f64) -> Self {
        Self::Point {
            coordinates: [lon, lat],
        }
    }

    /// All drawable `[lon, lat]` positions of this geometry.
    pub fn positions(&self) -> Vec<[f64; 2]> {
        match self {
            Self::Point { coordinates } => vec![*coordinates],
            Self::MultiPoint { coordinates } => coordinates.clone(),
            Self::Other(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_tag")]
    pub kind: String,
    pub geometry: Option<Geometry>,
    #[serde(default, deserialize_with = "nullable_properties")]
    pub properties: Map<String, Value>,
}

fn nullable_properties<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

fn feature_tag() -> String {
    "Feature".to_string()
}

impl Feature {
    pub fn point(lon: f64, lat: f64, properties: Map<String, Value>) -> Self {
        Self {
            kind: feature_tag(),
            geometry: Some(Geometry::point(lon, lat)),
            properties,
        }
    }

    pub fn number_property(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(Value::as_f64)
    }
}

/// A GeoJSON `FeatureCollection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "collection_tag")]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

fn collection_tag() -> String {
    "FeatureCollection".to_string()
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: collection_tag(),
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Iterate every drawable `[lon, lat]` position in the collection.
    pub fn positions(&self) -> impl Iterator<Item = [f64; 2]> + '_ {
        self.features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .flat_map(Geometry::positions)
    }

    /// Mean of a numeric property across features that carry it.
    pub fn mean_property(&self, key: &str) -> Option<f64> {
        let (sum, count) = self
            .features
            .iter()
            .filter_map(|f| f.number_property(key))
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        (count > 0).then(|| sum / count as f64)
    }

    /// Keep only positions for which `keep` returns true. Multi-point
    /// features are trimmed to their kept positions; features left with no
    /// position, or with geometry that has none, are dropped.
    pub fn retain_positions(&mut self, mut keep: impl FnMut([f64; 2]) -> bool) {
        self.features.retain_mut(|feature| match feature.geometry.as_mut() {
            Some(Geometry::Point { coordinates }) => keep(*coordinates),
            Some(Geometry::MultiPoint { coordinates }) => {
                coordinates.retain(|&position| keep(position));
                !coordinates.is_empty()
            }
            Some(Geometry::Other(_)) | None => false,
        });
    }
}
