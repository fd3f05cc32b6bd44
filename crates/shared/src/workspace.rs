use std::collections::BTreeSet;

use geo::{Geometry, LineString, Point, Polygon, Rect};

use crate::measure::{self, circle_polygon};
use crate::models::{
    Circle, DrawnShape, CIRCLE_MARKER_KEY, Feature, FeatureId, ImportedFeature, LayerColor, MarkerIcon, Origin,
    Popup, RemoteLayer, ShapeKind,
};
use crate::overlap::{self, OverlapReport};

/// The whole session state as one value.
///
/// Every mutation is a transition that consumes the current value and
/// returns the next one, so a UI holds exactly one `Workspace` and swaps it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workspace {
    next_id: u64,
    drawn: Vec<Feature>,
    uploaded: Vec<Feature>,
    wfs_features: Vec<Feature>,
    wfs_layers: Vec<RemoteLayer>,
    wms_layers: Vec<RemoteLayer>,
    overlap: OverlapReport,
    highlight_overlaps: bool,
    selection: BTreeSet<FeatureId>,
    selection_enabled: bool,
    show_info: bool,
    popup: Option<Popup>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    // --- accessors ---

    pub fn drawn(&self) -> &[Feature] {
        &self.drawn
    }

    pub fn uploaded(&self) -> &[Feature] {
        &self.uploaded
    }

    pub fn wfs_features(&self) -> &[Feature] {
        &self.wfs_features
    }

    pub fn wfs_layers(&self) -> &[RemoteLayer] {
        &self.wfs_layers
    }

    pub fn wms_layers(&self) -> &[RemoteLayer] {
        &self.wms_layers
    }

    pub fn overlap(&self) -> &OverlapReport {
        &self.overlap
    }

    pub fn selection(&self) -> &BTreeSet<FeatureId> {
        &self.selection
    }

    pub fn selection_enabled(&self) -> bool {
        self.selection_enabled
    }

    pub fn show_info(&self) -> bool {
        self.show_info
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    /// Drawn features followed by uploaded ones: the set overlap and export work on.
    pub fn combined(&self) -> Vec<Feature> {
        self.drawn.iter().chain(self.uploaded.iter()).cloned().collect()
    }

    /// Features on the editable layer group (drawn and uploaded).
    pub fn layer_features(&self) -> impl Iterator<Item = &Feature> {
        self.drawn.iter().chain(self.uploaded.iter())
    }

    pub fn feature(&self, id: FeatureId) -> Option<&Feature> {
        self.layer_features()
            .chain(self.wfs_features.iter())
            .find(|f| f.id == id)
    }

    /// Overlapping features from the last check, in combined order.
    pub fn overlapping_features(&self) -> Vec<Feature> {
        self.overlap
            .overlapping
            .iter()
            .filter_map(|id| self.feature(*id).cloned())
            .collect()
    }

    /// Topmost drawn or uploaded feature under a click.
    pub fn feature_at(&self, point: Point<f64>, tolerance: f64) -> Option<FeatureId> {
        self.layer_features()
            .filter(|f| measure::hit(f, point, tolerance))
            .last()
            .map(|f| f.id)
    }

    // --- derived styling ---

    pub fn layer_color(&self, id: FeatureId) -> LayerColor {
        if self.selection.contains(&id) {
            LayerColor::Selected
        } else if self.highlight_overlaps && self.overlap.contains(id) {
            LayerColor::Overlapping
        } else {
            LayerColor::Default
        }
    }

    pub fn marker_icon(&self, id: FeatureId) -> MarkerIcon {
        if self.highlight_overlaps && self.overlap.flagged_markers.contains(&id) {
            MarkerIcon::Overlapping
        } else {
            MarkerIcon::Default
        }
    }

    /// Open popups: every measurable layer while info is on, plus the transient popup.
    pub fn info_popups(&self) -> Vec<Popup> {
        let mut popups = Vec::new();
        if self.show_info {
            for f in self.layer_features() {
                if let (Some(text), Some(anchor)) = (measure::describe(f), measure::popup_anchor(f)) {
                    popups.push(Popup { feature_id: Some(f.id), anchor, text });
                }
            }
        }
        if let Some(p) = &self.popup {
            if !popups.iter().any(|o| o.feature_id.is_some() && o.feature_id == p.feature_id) {
                popups.push(p.clone());
            }
        }
        popups
    }

    // --- transitions ---

    fn allocate_id(&mut self) -> FeatureId {
        self.next_id += 1;
        FeatureId(self.next_id)
    }

    /// Append a freshly drawn shape. Circles also open a radius popup.
    #[must_use]
    pub fn with_drawn_shape(mut self, shape: DrawnShape) -> (Self, FeatureId) {
        let id = self.allocate_id();
        let mut circle = None;
        let mut properties = serde_json::Map::new();
        let geometry: Geometry<f64> = match shape {
            DrawnShape::Marker(p) => p.into(),
            DrawnShape::CircleMarker(p) => {
                properties.insert(CIRCLE_MARKER_KEY.into(), serde_json::json!("circle"));
                p.into()
            }
            DrawnShape::Polyline(coords) => LineString::from(coords).into(),
            DrawnShape::Polygon(coords) => Polygon::new(LineString::from(coords), vec![]).into(),
            DrawnShape::Rectangle(a, b) => Rect::new(a, b).to_polygon().into(),
            DrawnShape::Circle { center, radius_m } => {
                circle = Some(Circle { center, radius_m });
                circle_polygon(center, radius_m).into()
            }
        };

        self.popup = circle.map(|c| Popup {
            feature_id: Some(id),
            anchor: c.center.into(),
            text: measure::radius_text(c.radius_m),
        });
        self.drawn.push(Feature {
            id,
            origin: Origin::Drawn,
            geometry: Some(geometry),
            circle,
            properties,
        });
        (self, id)
    }

    /// Append one feature decoded from an uploaded shapefile.
    #[must_use]
    pub fn with_uploaded_feature(mut self, imported: ImportedFeature) -> (Self, FeatureId) {
        let id = self.allocate_id();
        self.uploaded.push(Feature {
            id,
            origin: Origin::Uploaded,
            geometry: imported.geometry,
            circle: None,
            properties: imported.properties,
        });
        (self, id)
    }

    /// Reset styling, run the full pairwise check, and highlight the result.
    #[must_use]
    pub fn with_overlap_check(mut self) -> Self {
        self.highlight_overlaps = false;
        self.overlap = overlap::check_overlaps(&self.combined());
        self.highlight_overlaps = true;
        self
    }

    /// Flip the global info flag. Turning it off closes every popup and resets styling.
    #[must_use]
    pub fn with_info_toggled(mut self) -> Self {
        self.show_info = !self.show_info;
        if !self.show_info {
            self.popup = None;
            self.highlight_overlaps = false;
        }
        self
    }

    #[must_use]
    pub fn with_selection_enabled(mut self) -> Self {
        self.selection_enabled = true;
        self
    }

    /// Toggle every path layer whose bounding box contains `point`.
    ///
    /// Containment is tested against the bounding box, not the geometry, so a
    /// click in the empty corner of a triangle's box still selects it.
    #[must_use]
    pub fn with_map_click(mut self, point: Point<f64>) -> Self {
        self.popup = None;
        if !self.selection_enabled {
            return self;
        }
        let hits: Vec<FeatureId> = self
            .layer_features()
            .filter(|f| f.kind().is_path())
            .filter(|f| measure::bounding_rect(f).is_some_and(|r| measure::rect_contains(&r, point)))
            .map(|f| f.id)
            .collect();
        for id in hits {
            if !self.selection.remove(&id) {
                self.selection.insert(id);
            }
        }
        self
    }

    /// Open the name popup of the topmost named WFS feature under a click.
    ///
    /// Points anchor at themselves, other shapes at the click.
    #[must_use]
    pub fn with_wfs_popup_at(mut self, point: Point<f64>, tolerance: f64) -> Self {
        let hit = self
            .wfs_features
            .iter()
            .rev()
            .filter(|f| measure::hit(f, point, tolerance))
            .find_map(|f| f.name().map(|name| (f, name.to_string())));
        if let Some((feature, text)) = hit {
            let anchor = match &feature.geometry {
                Some(Geometry::Point(p)) => p.0,
                _ => point.0,
            };
            self.popup = Some(Popup { feature_id: Some(feature.id), anchor, text });
        }
        self
    }

    /// Remove a drawn or uploaded feature. Its selection and popup go with it;
    /// the last overlap report is left as it was.
    #[must_use]
    pub fn with_feature_removed(mut self, id: FeatureId) -> Self {
        self.drawn.retain(|f| f.id != id);
        self.uploaded.retain(|f| f.id != id);
        self.selection.remove(&id);
        if self.popup.as_ref().is_some_and(|p| p.feature_id == Some(id)) {
            self.popup = None;
        }
        self
    }

    #[must_use]
    pub fn with_wms_layer(mut self, layer: RemoteLayer) -> Self {
        self.wms_layers.push(layer);
        self
    }

    /// Record a loaded WFS layer and append its features to the running WFS list.
    #[must_use]
    pub fn with_wfs_layer(mut self, layer: RemoteLayer, features: Vec<ImportedFeature>) -> Self {
        self.wfs_layers.push(layer);
        for imported in features {
            let id = self.allocate_id();
            self.wfs_features.push(Feature {
                id,
                origin: Origin::Wfs,
                geometry: imported.geometry,
                circle: None,
                properties: imported.properties,
            });
        }
        self
    }

    #[must_use]
    pub fn with_popup_closed(mut self) -> Self {
        self.popup = None;
        self
    }
}

/// Points drawn as markers (as opposed to circle-markers).
pub fn is_marker(feature: &Feature) -> bool {
    feature.kind() == ShapeKind::Point && !feature.is_circle_marker()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, point, polygon};

    fn square(x: f64, y: f64, size: f64) -> DrawnShape {
        DrawnShape::Polygon(vec![
            coord! { x: x, y: y },
            coord! { x: x + size, y: y },
            coord! { x: x + size, y: y + size },
            coord! { x: x, y: y + size },
        ])
    }

    fn draw(ws: Workspace, shape: DrawnShape) -> Workspace {
        ws.with_drawn_shape(shape).0
    }

    #[test]
    fn test_drawn_shapes_get_increasing_ids() {
        let (ws, a) = Workspace::new().with_drawn_shape(square(0.0, 0.0, 1.0));
        let (ws, b) = ws.with_drawn_shape(DrawnShape::Marker(point!(x: 5.0, y: 5.0)));
        assert!(b > a);
        assert_eq!(ws.drawn().len(), 2);
        assert_eq!(ws.drawn()[1].kind(), ShapeKind::Point);
    }

    #[test]
    fn test_rectangle_is_stored_as_polygon() {
        let ws = draw(
            Workspace::new(),
            DrawnShape::Rectangle(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 2.0 }),
        );
        assert!(matches!(ws.drawn()[0].geometry, Some(Geometry::Polygon(_))));
    }

    #[test]
    fn test_circle_opens_radius_popup() {
        let (ws, id) = Workspace::new().with_drawn_shape(DrawnShape::Circle {
            center: point!(x: 31.0, y: 27.0),
            radius_m: 1234.567,
        });
        let popup = ws.popup().unwrap();
        assert_eq!(popup.feature_id, Some(id));
        assert_eq!(popup.text, "Radius: 1234.57 m");
        assert_eq!(ws.drawn()[0].kind(), ShapeKind::Circle);
    }

    #[test]
    fn test_closing_popup_keeps_the_circle() {
        let (ws, _) = Workspace::new().with_drawn_shape(DrawnShape::Circle {
            center: point!(x: 31.0, y: 27.0),
            radius_m: 10.0,
        });
        let ws = ws.with_popup_closed();
        assert!(ws.popup().is_none());
        assert_eq!(ws.drawn().len(), 1);
    }

    #[test]
    fn test_overlap_check_covers_drawn_and_uploaded() {
        let (ws, drawn) = Workspace::new().with_drawn_shape(square(0.0, 0.0, 2.0));
        let (ws, uploaded) = ws.with_uploaded_feature(ImportedFeature {
            geometry: Some(
                polygon![(x: 1.0, y: 1.0), (x: 3.0, y: 1.0), (x: 3.0, y: 3.0), (x: 1.0, y: 3.0)]
                    .into(),
            ),
            properties: serde_json::Map::new(),
        });
        let ws = ws.with_overlap_check();
        assert_eq!(ws.overlap().overlapping, vec![drawn, uploaded]);
        assert_eq!(ws.layer_color(drawn), LayerColor::Overlapping);
        assert_eq!(ws.overlapping_features().len(), 2);
    }

    #[test]
    fn test_wfs_features_are_not_checked() {
        let ws = draw(Workspace::new(), square(0.0, 0.0, 2.0)).with_wfs_layer(
            RemoteLayer { url: "http://example.com/wfs".into(), layer_name: "roads".into() },
            vec![ImportedFeature {
                geometry: Some(point!(x: 1.0, y: 1.0).into()),
                properties: serde_json::Map::new(),
            }],
        );
        let ws = ws.with_overlap_check();
        assert!(ws.overlap().is_empty());
        assert_eq!(ws.wfs_features().len(), 1);
    }

    #[test]
    fn test_coordinate_identical_features_styled_independently() {
        let (ws, a) = Workspace::new().with_drawn_shape(square(0.0, 0.0, 1.0));
        let (ws, b) = ws.with_drawn_shape(square(0.0, 0.0, 1.0));
        let ws = ws.with_overlap_check().with_selection_enabled();
        let ws = ws.with_map_click(point!(x: 0.5, y: 0.5));
        // both boxes contain the click, so both toggle
        assert_eq!(ws.layer_color(a), LayerColor::Selected);
        assert_eq!(ws.layer_color(b), LayerColor::Selected);
        assert_ne!(a, b);
    }

    #[test]
    fn test_selection_requires_enable() {
        let (ws, id) = Workspace::new().with_drawn_shape(square(0.0, 0.0, 1.0));
        let ws = ws.with_map_click(point!(x: 0.5, y: 0.5));
        assert!(!ws.selection().contains(&id));
    }

    #[test]
    fn test_selection_toggles_on_second_click() {
        let (ws, id) = Workspace::new().with_drawn_shape(square(0.0, 0.0, 1.0));
        let ws = ws.with_selection_enabled().with_map_click(point!(x: 0.5, y: 0.5));
        assert!(ws.selection().contains(&id));
        let ws = ws.with_map_click(point!(x: 0.5, y: 0.5));
        assert!(!ws.selection().contains(&id));
        assert_eq!(ws.layer_color(id), LayerColor::Default);
    }

    #[test]
    fn test_selection_uses_bounding_box_not_geometry() {
        // right triangle: (0.9, 0.9) is inside the box but outside the shape
        let (ws, id) = Workspace::new().with_drawn_shape(DrawnShape::Polygon(vec![
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 1.0, y: 0.0 },
            coord! { x: 0.0, y: 1.0 },
        ]));
        let ws = ws.with_selection_enabled().with_map_click(point!(x: 0.9, y: 0.9));
        assert!(ws.selection().contains(&id));
    }

    #[test]
    fn test_markers_are_not_selectable() {
        let (ws, id) = Workspace::new().with_drawn_shape(DrawnShape::Marker(point!(x: 0.0, y: 0.0)));
        let ws = ws.with_selection_enabled().with_map_click(point!(x: 0.0, y: 0.0));
        assert!(!ws.selection().contains(&id));
    }

    #[test]
    fn test_selected_beats_overlapping_color() {
        let (ws, a) = Workspace::new().with_drawn_shape(square(0.0, 0.0, 2.0));
        let (ws, b) = ws.with_drawn_shape(square(5.0, 5.0, 2.0));
        let ws = draw(ws, square(1.0, 1.0, 2.0)).with_overlap_check();
        let ws = ws.with_selection_enabled().with_map_click(point!(x: 0.5, y: 0.5));
        assert_eq!(ws.layer_color(a), LayerColor::Selected);
        assert_eq!(ws.layer_color(b), LayerColor::Default);
    }

    #[test]
    fn test_marker_icon_follows_overlap() {
        let ws = draw(Workspace::new(), square(0.0, 0.0, 2.0));
        let ws = draw(ws, square(1.0, 1.0, 2.0));
        let (ws, inside) = ws.with_drawn_shape(DrawnShape::Marker(point!(x: 0.5, y: 0.5)));
        let (ws, outside) = ws.with_drawn_shape(DrawnShape::Marker(point!(x: 9.0, y: 9.0)));
        assert_eq!(ws.marker_icon(inside), MarkerIcon::Default);
        let ws = ws.with_overlap_check();
        assert_eq!(ws.marker_icon(inside), MarkerIcon::Overlapping);
        assert_eq!(ws.marker_icon(outside), MarkerIcon::Default);
    }

    #[test]
    fn test_info_toggle_opens_and_closes_popups() {
        let ws = draw(Workspace::new(), square(0.0, 0.0, 0.01));
        let ws = draw(ws, DrawnShape::Marker(point!(x: 1.0, y: 1.0)));
        assert!(ws.info_popups().is_empty());
        let ws = ws.with_info_toggled();
        let popups = ws.info_popups();
        assert_eq!(popups.len(), 2);
        assert!(popups[0].text.starts_with("Area: "));
        assert!(popups[1].text.starts_with("Coordinates: "));
        let ws = ws.with_info_toggled();
        assert!(ws.info_popups().is_empty());
    }

    #[test]
    fn test_info_off_resets_highlight_but_keeps_report() {
        let (ws, a) = Workspace::new().with_drawn_shape(square(0.0, 0.0, 2.0));
        let ws = draw(ws, square(1.0, 1.0, 2.0)).with_overlap_check();
        let ws = ws.with_info_toggled().with_info_toggled();
        assert_eq!(ws.layer_color(a), LayerColor::Default);
        assert_eq!(ws.overlapping_features().len(), 2);
    }

    #[test]
    fn test_circle_popup_not_duplicated_while_info_on() {
        let ws = Workspace::new().with_info_toggled();
        let (ws, _) = ws.with_drawn_shape(DrawnShape::Circle {
            center: point!(x: 0.0, y: 0.0),
            radius_m: 10.0,
        });
        assert_eq!(ws.info_popups().len(), 1);
    }

    fn wfs(ws: Workspace, geometry: Geometry<f64>, name: Option<&str>) -> Workspace {
        let mut properties = serde_json::Map::new();
        if let Some(name) = name {
            properties.insert("name".into(), serde_json::json!(name));
        }
        ws.with_wfs_layer(
            RemoteLayer { url: "http://example.com/wfs".into(), layer_name: "sites".into() },
            vec![ImportedFeature { geometry: Some(geometry), properties }],
        )
    }

    #[test]
    fn test_wfs_click_opens_name_popup() {
        let ws = wfs(Workspace::new(), point!(x: 31.2, y: 30.0).into(), Some("Cairo"));
        let ws = ws.with_map_click(point!(x: 31.201, y: 30.0)).with_wfs_popup_at(point!(x: 31.201, y: 30.0), 0.005);
        let popup = ws.popup().unwrap();
        assert_eq!(popup.text, "Cairo");
        assert_eq!(popup.anchor, coord! { x: 31.2, y: 30.0 });
        assert_eq!(popup.feature_id, Some(ws.wfs_features()[0].id));
        assert_eq!(ws.info_popups().len(), 1);
    }

    #[test]
    fn test_wfs_polygon_popup_anchors_at_click() {
        let ws = wfs(
            Workspace::new(),
            polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)].into(),
            Some("Delta"),
        );
        let ws = ws.with_wfs_popup_at(point!(x: 1.5, y: 0.5), 0.0);
        assert_eq!(ws.popup().unwrap().anchor, coord! { x: 1.5, y: 0.5 });
    }

    #[test]
    fn test_wfs_click_misses_and_unnamed_features() {
        let ws = wfs(Workspace::new(), point!(x: 0.0, y: 0.0).into(), Some("Far"));
        let ws = wfs(ws, point!(x: 5.0, y: 5.0).into(), None);
        assert!(ws.clone().with_wfs_popup_at(point!(x: 1.0, y: 1.0), 0.01).popup().is_none());
        assert!(ws.with_wfs_popup_at(point!(x: 5.0, y: 5.0), 0.01).popup().is_none());
    }

    #[test]
    fn test_map_click_closes_wfs_popup() {
        let ws = wfs(Workspace::new(), point!(x: 0.0, y: 0.0).into(), Some("Here"));
        let ws = ws.with_wfs_popup_at(point!(x: 0.0, y: 0.0), 0.01);
        assert!(ws.popup().is_some());
        assert!(ws.with_map_click(point!(x: 9.0, y: 9.0)).popup().is_none());
    }

    #[test]
    fn test_feature_at_prefers_topmost() {
        let (ws, below) = Workspace::new().with_drawn_shape(square(0.0, 0.0, 2.0));
        let (ws, above) = ws.with_drawn_shape(square(1.0, 1.0, 2.0));
        assert_eq!(ws.feature_at(point!(x: 1.5, y: 1.5), 0.0), Some(above));
        assert_eq!(ws.feature_at(point!(x: 0.5, y: 0.5), 0.0), Some(below));
        assert_eq!(ws.feature_at(point!(x: 8.0, y: 8.0), 0.0), None);
    }

    #[test]
    fn test_removing_feature_clears_selection_and_popup() {
        let (ws, uploaded) = Workspace::new().with_uploaded_feature(ImportedFeature {
            geometry: Some(polygon![(x: 5.0, y: 5.0), (x: 6.0, y: 5.0), (x: 6.0, y: 6.0)].into()),
            properties: serde_json::Map::new(),
        });
        let ws = ws.with_selection_enabled().with_map_click(point!(x: 5.5, y: 5.2));
        assert!(ws.selection().contains(&uploaded));
        let (ws, circle) = ws.with_drawn_shape(DrawnShape::Circle {
            center: point!(x: 0.0, y: 0.0),
            radius_m: 100.0,
        });

        let ws = ws.with_feature_removed(uploaded);
        assert!(ws.uploaded().is_empty());
        assert!(ws.selection().is_empty());
        assert_eq!(ws.drawn().len(), 1);

        // the radius popup belongs to the circle
        assert!(ws.popup().is_some());
        let ws = ws.with_feature_removed(circle);
        assert!(ws.drawn().is_empty());
        assert!(ws.popup().is_none());
    }

    #[test]
    fn test_removing_overlapping_feature_drops_it_from_export() {
        let (ws, a) = Workspace::new().with_drawn_shape(square(0.0, 0.0, 2.0));
        let ws = draw(ws, square(1.0, 1.0, 2.0)).with_overlap_check();
        let ws = ws.with_feature_removed(a);
        let remaining = ws.overlapping_features();
        assert_eq!(remaining.len(), 1);
        assert_ne!(remaining[0].id, a);
    }

    #[test]
    fn test_removing_unknown_id_changes_nothing() {
        let ws = draw(Workspace::new(), square(0.0, 0.0, 1.0));
        assert_eq!(ws.clone().with_feature_removed(FeatureId(999)), ws);
    }

    #[test]
    fn test_circle_marker_has_no_info_popup() {
        let ws = draw(Workspace::new(), DrawnShape::CircleMarker(point!(x: 0.0, y: 0.0)));
        assert!(ws.with_info_toggled().info_popups().is_empty());
    }

    #[test]
    fn test_circle_marker_is_point_but_not_marker() {
        let ws = draw(Workspace::new(), DrawnShape::CircleMarker(point!(x: 0.0, y: 0.0)));
        let ws = draw(ws, DrawnShape::Marker(point!(x: 1.0, y: 1.0)));
        assert!(!is_marker(&ws.drawn()[0]));
        assert!(is_marker(&ws.drawn()[1]));
    }
}
