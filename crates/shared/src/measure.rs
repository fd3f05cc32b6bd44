use geo::{
    BoundingRect, Coord, Destination, Distance, GeodesicArea, Geometry, Haversine, Length,
    LineString, Point, Polygon, Rect,
};

use crate::models::{Circle, Feature, ShapeKind};

/// Vertex count used when approximating a circle as a polygon.
pub const CIRCLE_SEGMENTS: usize = 64;

/// Approximate a circle (center in lon/lat, radius in meters) as a closed polygon.
pub fn circle_polygon(center: Point<f64>, radius_m: f64) -> Polygon<f64> {
    let ring: Vec<Coord<f64>> = (0..CIRCLE_SEGMENTS)
        .map(|i| {
            let bearing = 360.0 * i as f64 / CIRCLE_SEGMENTS as f64;
            Haversine.destination(center, bearing, radius_m).into()
        })
        .collect();
    Polygon::new(LineString::from(ring), vec![])
}

/// Great-circle distance in meters, used for the circle draw tool.
pub fn distance_m(a: Point<f64>, b: Point<f64>) -> f64 {
    Haversine.distance(a, b)
}

/// Geodesic area in square meters for polygonal geometries, 0 otherwise.
pub fn area_m2(geometry: &Geometry<f64>) -> f64 {
    match geometry {
        Geometry::Polygon(_)
        | Geometry::MultiPolygon(_)
        | Geometry::Rect(_)
        | Geometry::Triangle(_) => geometry.geodesic_area_unsigned(),
        _ => 0.0,
    }
}

/// Haversine length in meters for linear geometries, 0 otherwise.
pub fn length_m(geometry: &Geometry<f64>) -> f64 {
    match geometry {
        Geometry::LineString(ls) => Haversine.length(ls),
        Geometry::MultiLineString(mls) => Haversine.length(mls),
        Geometry::Line(line) => Haversine.length(line),
        _ => 0.0,
    }
}

pub fn bounding_rect(feature: &Feature) -> Option<Rect<f64>> {
    feature.geometry.as_ref().and_then(|g| g.bounding_rect())
}

/// Inclusive bounding-box containment, edges count as inside.
pub fn rect_contains(rect: &Rect<f64>, point: Point<f64>) -> bool {
    let (min, max) = (rect.min(), rect.max());
    point.x() >= min.x && point.x() <= max.x && point.y() >= min.y && point.y() <= max.y
}

/// Whether a click at `point` lands on `feature`: inside its bounding box
/// grown by `tolerance` degrees on every side.
pub fn hit(feature: &Feature, point: Point<f64>, tolerance: f64) -> bool {
    bounding_rect(feature).is_some_and(|r| {
        let grow = Coord { x: tolerance, y: tolerance };
        rect_contains(&Rect::new(r.min() - grow, r.max() + grow), point)
    })
}

/// Where a feature's popup opens.
pub fn popup_anchor(feature: &Feature) -> Option<Coord<f64>> {
    if let Some(Circle { center, .. }) = feature.circle {
        return Some(center.into());
    }
    match &feature.geometry {
        Some(Geometry::Point(p)) => Some(p.0),
        Some(_) => bounding_rect(feature).map(|r| r.center()),
        None => None,
    }
}

pub fn radius_text(radius_m: f64) -> String {
    format!("Radius: {radius_m:.2} m")
}

/// Measurement text shown in a feature's info popup, by shape kind.
pub fn describe(feature: &Feature) -> Option<String> {
    match feature.kind() {
        ShapeKind::Circle => feature.circle.map(|c| radius_text(c.radius_m)),
        ShapeKind::Polygon => feature
            .geometry
            .as_ref()
            .map(|g| format!("Area: {:.2} m²", area_m2(g))),
        ShapeKind::Line => feature
            .geometry
            .as_ref()
            .map(|g| format!("Length: {:.2} m", length_m(g))),
        ShapeKind::Point if feature.is_circle_marker() => None,
        ShapeKind::Point => match &feature.geometry {
            Some(Geometry::Point(p)) => Some(format!("Coordinates: {:.6}, {:.6}", p.y(), p.x())),
            _ => None,
        },
        ShapeKind::Other => None,
    }
}
