use geo::{BoundingRect, Geometry, Rect};
use geojson::GeoJson;

use crate::models::ImportedFeature;

#[derive(Debug, thiserror::Error)]
pub enum WfsError {
    #[error("invalid GeoJSON: {0}")]
    Json(#[from] geojson::Error),
    #[error("response is not a FeatureCollection")]
    NotAFeatureCollection,
}

/// Parse a WFS GeoJSON response into features.
///
/// Features whose geometry is missing or cannot be represented keep `None`.
pub fn parse_feature_collection(body: &str) -> Result<Vec<ImportedFeature>, WfsError> {
    let GeoJson::FeatureCollection(collection) = body.parse::<GeoJson>()? else {
        return Err(WfsError::NotAFeatureCollection);
    };
    Ok(collection
        .features
        .into_iter()
        .map(|feature| ImportedFeature {
            geometry: feature.geometry.and_then(|g| Geometry::<f64>::try_from(g).ok()),
            properties: feature.properties.unwrap_or_default(),
        })
        .collect())
}

/// Combined bounds of every feature with geometry, used to fit the view.
pub fn bounds(features: &[ImportedFeature]) -> Option<Rect<f64>> {
    features
        .iter()
        .filter_map(|f| f.geometry.as_ref().and_then(|g| g.bounding_rect()))
        .reduce(|a, b| {
            Rect::new(
                geo::coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                geo::coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            )
        })
}
