use geo::{Coord, Geometry, Point};

/// Property set on points drawn with the circle-marker tool.
pub const CIRCLE_MARKER_KEY: &str = "marker";

/// Stable identifier assigned to every feature when it enters the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureId(pub u64);

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "f{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Drawn,
    Uploaded,
    Wfs,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Drawn => write!(f, "Drawn"),
            Origin::Uploaded => write!(f, "Uploaded"),
            Origin::Wfs => write!(f, "WFS"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Point<f64>,
    pub radius_m: f64,
}

/// Geometry-derived classification used for popups, selection and rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Point,
    Line,
    Polygon,
    Circle,
    Other,
}

impl ShapeKind {
    /// Path layers are the stroked shapes: lines, polygons and circles.
    pub fn is_path(self) -> bool {
        matches!(self, ShapeKind::Line | ShapeKind::Polygon | ShapeKind::Circle)
    }
}

/// A shape as produced by the draw tools, before it becomes a feature.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawnShape {
    Marker(Point<f64>),
    CircleMarker(Point<f64>),
    Polyline(Vec<Coord<f64>>),
    Polygon(Vec<Coord<f64>>),
    Rectangle(Coord<f64>, Coord<f64>),
    Circle { center: Point<f64>, radius_m: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    pub origin: Origin,
    /// `None` for null shapes read from a shapefile.
    pub geometry: Option<Geometry<f64>>,
    pub circle: Option<Circle>,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl Feature {
    pub fn kind(&self) -> ShapeKind {
        if self.circle.is_some() {
            return ShapeKind::Circle;
        }
        match &self.geometry {
            Some(Geometry::Point(_)) => ShapeKind::Point,
            Some(Geometry::LineString(_) | Geometry::MultiLineString(_) | Geometry::Line(_)) => {
                ShapeKind::Line
            }
            Some(
                Geometry::Polygon(_)
                | Geometry::MultiPolygon(_)
                | Geometry::Rect(_)
                | Geometry::Triangle(_),
            ) => ShapeKind::Polygon,
            _ => ShapeKind::Other,
        }
    }

    /// Points drawn with the circle-marker tool. They carry `marker = "circle"`.
    pub fn is_circle_marker(&self) -> bool {
        self.kind() == ShapeKind::Point
            && self.properties.get(CIRCLE_MARKER_KEY).and_then(|v| v.as_str()) == Some("circle")
    }

    /// Value of the `name` property when it is a string.
    pub fn name(&self) -> Option<&str> {
        self.properties.get("name").and_then(|v| v.as_str())
    }
}

/// A feature decoded from an uploaded shapefile, not yet given an id.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedFeature {
    pub geometry: Option<Geometry<f64>>,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// URL and layer name of an externally served WMS or WFS layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLayer {
    pub url: String,
    pub layer_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub feature_id: Option<FeatureId>,
    pub anchor: Coord<f64>,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerColor {
    Default,
    Overlapping,
    Selected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerIcon {
    Default,
    Overlapping,
}
