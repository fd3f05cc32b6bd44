use std::collections::BTreeSet;

use geo::Intersects;

use crate::models::{Feature, FeatureId, ShapeKind};

/// Result of one full overlap pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlapReport {
    /// Overlapping features, in combined-collection order.
    pub overlapping: Vec<FeatureId>,
    /// Point features that touch any overlapping geometry.
    pub flagged_markers: BTreeSet<FeatureId>,
}

impl OverlapReport {
    pub fn is_empty(&self) -> bool {
        self.overlapping.is_empty()
    }

    pub fn contains(&self, id: FeatureId) -> bool {
        self.overlapping.contains(&id)
    }
}

/// Indices of every feature that intersects at least one *other* feature.
///
/// All ordered pairs are tested, so the scan is quadratic in the feature count.
/// Features without geometry never participate.
pub fn overlapping_indices(features: &[Feature]) -> BTreeSet<usize> {
    let mut hits = BTreeSet::new();
    for (a, fa) in features.iter().enumerate() {
        let Some(ga) = &fa.geometry else { continue };
        for (b, fb) in features.iter().enumerate() {
            if a == b {
                continue;
            }
            let Some(gb) = &fb.geometry else { continue };
            if ga.intersects(gb) {
                hits.insert(a);
                hits.insert(b);
            }
        }
    }
    hits
}

/// Classify the combined drawn + uploaded collection.
pub fn check_overlaps(features: &[Feature]) -> OverlapReport {
    let indices = overlapping_indices(features);
    let overlapping_geoms: Vec<_> = indices
        .iter()
        .filter_map(|&i| features[i].geometry.as_ref())
        .collect();

    let flagged_markers = features
        .iter()
        .filter(|f| f.kind() == ShapeKind::Point)
        .filter(|f| {
            f.geometry
                .as_ref()
                .is_some_and(|g| overlapping_geoms.iter().any(|o| g.intersects(*o)))
        })
        .map(|f| f.id)
        .collect();

    OverlapReport {
        overlapping: indices.into_iter().map(|i| features[i].id).collect(),
        flagged_markers,
    }
}
