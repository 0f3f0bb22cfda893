use crate::geojson::FeatureCollection;

/// Paint rule for a circle layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleStyle {
    pub radius: f64,
    pub color: &'static str,
    pub opacity: f64,
}

/// The two ice overlays the map knows how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IceLayer {
    Historical,
    Predicted,
}

impl IceLayer {
    pub fn source_id(self) -> &'static str {
        match self {
            Self::Historical => "iceLoss",
            Self::Predicted => "predictedIce",
        }
    }

    pub fn layer_id(self) -> &'static str {
        match self {
            Self::Historical => "iceLoss-fill",
            Self::Predicted => "predictedIce-fill",
        }
    }

    pub fn style(self) -> CircleStyle {
        match self {
            Self::Historical => CircleStyle {
                radius: 3.0,
                color: "#ff4b4b",
                opacity: 0.7,
            },
            Self::Predicted => CircleStyle {
                radius: 3.0,
                color: "#4bd7ff",
                opacity: 0.9,
            },
        }
    }
}

/// The imperative layer/source API of a map engine.
pub trait MapSurface {
    fn has_layer(&self, layer_id: &str) -> bool;
    fn has_source(&self, source_id: &str) -> bool;
    fn remove_layer(&mut self, layer_id: &str);
    fn remove_source(&mut self, source_id: &str);
    fn add_source(&mut self, source_id: &str, data: &FeatureCollection);
    fn add_layer(&mut self, layer_id: &str, source_id: &str, style: CircleStyle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayerSlot {
    #[default]
    Absent,
    Present {
        revision: u64,
    },
}

/// One declarative overlay driven onto a [`MapSurface`].
///
/// Every sync removes what is there and re-adds from the incoming data, so
/// repeated or reordered syncs converge to the same engine state.
#[derive(Debug, Clone)]
pub struct Overlay {
    layer: IceLayer,
    slot: LayerSlot,
    revisions: u64,
}

impl Overlay {
    pub fn new(layer: IceLayer) -> Self {
        Self {
            layer,
            slot: LayerSlot::Absent,
            revisions: 0,
        }
    }

    pub fn slot(&self) -> LayerSlot {
        self.slot
    }

    pub fn clear(&mut self, surface: &mut impl MapSurface) {
        let layer_id = self.layer.layer_id();
        let source_id = self.layer.source_id();
        if surface.has_layer(layer_id) {
            surface.remove_layer(layer_id);
        }
        if surface.has_source(source_id) {
            surface.remove_source(source_id);
        }
        self.slot = LayerSlot::Absent;
    }

    pub fn sync(&mut self, surface: &mut impl MapSurface, data: Option<&FeatureCollection>) {
        self.clear(surface);
        let Some(data) = data else {
            return;
        };
        surface.add_source(self.layer.source_id(), data);
        surface.add_layer(
            self.layer.layer_id(),
            self.layer.source_id(),
            self.layer.style(),
        );
        self.revisions = self.revisions.wrapping_add(1);
        self.slot = LayerSlot::Present {
            revision: self.revisions,
        };
    }
}

/// Historical and predicted overlays with the prediction taking precedence:
/// while a prediction is shown the historical layer is removed, not hidden.
#[derive(Debug, Clone)]
pub struct IceOverlays {
    historical: Overlay,
    predicted: Overlay,
}

impl Default for IceOverlays {
    fn default() -> Self {
        Self {
            historical: Overlay::new(IceLayer::Historical),
            predicted: Overlay::new(IceLayer::Predicted),
        }
    }
}

impl IceOverlays {
    pub fn historical(&self) -> LayerSlot {
        self.historical.slot()
    }

    pub fn predicted(&self) -> LayerSlot {
        self.predicted.slot()
    }

    pub fn sync_historical(
        &mut self,
        surface: &mut impl MapSurface,
        ice: Option<&FeatureCollection>,
        prediction_active: bool,
    ) {
        let ice = if prediction_active { None } else { ice };
        self.historical.sync(surface, ice);
    }

    pub fn sync_predicted(
        &mut self,
        surface: &mut impl MapSurface,
        predicted: Option<&FeatureCollection>,
    ) {
        if predicted.is_some() {
            self.historical.clear(surface);
        }
        self.predicted.sync(surface, predicted);
    }
}

/// Engine-agnostic registry of sources and drawn layers in paint order.
#[derive(Debug, Clone, Default)]
pub struct LayerStack {
    sources: Vec<(String, Vec<[f64; 2]>)>,
    layers: Vec<StackedLayer>,
}

#[derive(Debug, Clone)]
pub struct StackedLayer {
    pub id: String,
    pub source: String,
    pub style: CircleStyle,
}

impl LayerStack {
    pub fn layers(&self) -> &[StackedLayer] {
        &self.layers
    }

    pub fn source_positions(&self, source_id: &str) -> &[[f64; 2]] {
        self.sources
            .iter()
            .find(|(id, _)| id == source_id)
            .map(|(_, positions)| positions.as_slice())
            .unwrap_or(&[])
    }

    /// Layers paired with the positions of their sources, bottom first.
    pub fn drawable(&self) -> impl Iterator<Item = (&StackedLayer, &[[f64; 2]])> {
        self.layers
            .iter()
            .map(|layer| (layer, self.source_positions(&layer.source)))
    }
}

impl MapSurface for LayerStack {
    fn has_layer(&self, layer_id: &str) -> bool {
        self.layers.iter().any(|l| l.id == layer_id)
    }

    fn has_source(&self, source_id: &str) -> bool {
        self.sources.iter().any(|(id, _)| id == source_id)
    }

    fn remove_layer(&mut self, layer_id: &str) {
        self.layers.retain(|l| l.id != layer_id);
    }

    fn remove_source(&mut self, source_id: &str) {
        self.sources.retain(|(id, _)| id != source_id);
    }

    fn add_source(&mut self, source_id: &str, data: &FeatureCollection) {
        self.remove_source(source_id);
        self.sources
            .push((source_id.to_string(), data.positions().collect()));
    }

    fn add_layer(&mut self, layer_id: &str, source_id: &str, style: CircleStyle) {
        self.remove_layer(layer_id);
        self.layers.push(StackedLayer {
            id: layer_id.to_string(),
            source: source_id.to_string(),
            style,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geojson::Feature;
    use serde_json::Map;

    fn collection(points: &[[f64; 2]]) -> FeatureCollection {
        FeatureCollection::new(
            points
                .iter()
                .map(|[lon, lat]| Feature::point(*lon, *lat, Map::new()))
                .collect(),
        )
    }

    fn assert_exclusive(stack: &LayerStack) {
        let historical = stack.has_layer(IceLayer::Historical.layer_id());
        let predicted = stack.has_layer(IceLayer::Predicted.layer_id());
        assert!(!(historical && predicted), "both ice layers present");
    }

    #[test]
    fn sync_adds_source_and_layer_with_style() {
        let mut stack = LayerStack::default();
        let mut overlays = IceOverlays::default();
        overlays.sync_historical(&mut stack, Some(&collection(&[[1.0, 80.0]])), false);

        assert!(stack.has_source("iceLoss"));
        assert_eq!(stack.layers().len(), 1);
        assert_eq!(stack.layers()[0].style.color, "#ff4b4b");
        assert_eq!(stack.source_positions("iceLoss"), [[1.0, 80.0]]);
        assert!(matches!(overlays.historical(), LayerSlot::Present { .. }));
    }

    #[test]
    fn resync_replaces_rather_than_duplicates() {
        let mut stack = LayerStack::default();
        let mut overlays = IceOverlays::default();
        overlays.sync_historical(&mut stack, Some(&collection(&[[1.0, 80.0]])), false);
        overlays.sync_historical(&mut stack, Some(&collection(&[[2.0, 81.0]])), false);

        assert_eq!(stack.layers().len(), 1);
        assert_eq!(stack.source_positions("iceLoss"), [[2.0, 81.0]]);
        assert_eq!(overlays.historical(), LayerSlot::Present { revision: 2 });
    }

    #[test]
    fn sync_with_none_removes_layer() {
        let mut stack = LayerStack::default();
        let mut overlays = IceOverlays::default();
        overlays.sync_predicted(&mut stack, Some(&collection(&[[0.0, 85.0]])));
        overlays.sync_predicted(&mut stack, None);

        assert!(stack.layers().is_empty());
        assert!(!stack.has_source("predictedIce"));
        assert_eq!(overlays.predicted(), LayerSlot::Absent);
    }

    #[test]
    fn prediction_suppresses_historical_in_either_order() {
        let ice = collection(&[[1.0, 80.0]]);
        let predicted = collection(&[[3.0, 82.0]]);

        // Predicted effect first, then historical effect.
        let mut stack = LayerStack::default();
        let mut overlays = IceOverlays::default();
        overlays.sync_historical(&mut stack, Some(&ice), false);
        overlays.sync_predicted(&mut stack, Some(&predicted));
        assert_exclusive(&stack);
        overlays.sync_historical(&mut stack, Some(&ice), true);
        assert_exclusive(&stack);
        assert!(stack.has_layer("predictedIce-fill"));
        assert!(!stack.has_layer("iceLoss-fill"));

        // Historical effect first, then predicted effect.
        let mut stack = LayerStack::default();
        let mut overlays = IceOverlays::default();
        overlays.sync_historical(&mut stack, Some(&ice), false);
        overlays.sync_historical(&mut stack, Some(&ice), true);
        assert_exclusive(&stack);
        overlays.sync_predicted(&mut stack, Some(&predicted));
        assert_exclusive(&stack);
        assert!(stack.has_layer("predictedIce-fill"));
    }

    #[test]
    fn clearing_prediction_restores_historical() {
        let ice = collection(&[[1.0, 80.0]]);
        let mut stack = LayerStack::default();
        let mut overlays = IceOverlays::default();
        overlays.sync_predicted(&mut stack, Some(&collection(&[[3.0, 82.0]])));

        overlays.sync_predicted(&mut stack, None);
        overlays.sync_historical(&mut stack, Some(&ice), false);

        assert_exclusive(&stack);
        assert!(stack.has_layer("iceLoss-fill"));
        assert!(!stack.has_layer("predictedIce-fill"));
    }

    #[test]
    fn drawable_pairs_layers_with_sources() {
        let mut stack = LayerStack::default();
        let mut overlays = IceOverlays::default();
        overlays.sync_predicted(&mut stack, Some(&collection(&[[3.0, 82.0], [4.0, 83.0]])));
        let drawn: Vec<_> = stack
            .drawable()
            .map(|(layer, positions)| (layer.id.clone(), positions.len()))
            .collect();
        assert_eq!(drawn, vec![("predictedIce-fill".to_string(), 2)]);
    }
}
