use geo::Coord;

/// Initial view: 27.59063 N, 31.274659 E.
pub const INITIAL_CENTER: Coord<f64> = Coord { x: 31.274659, y: 27.59063 };
pub const INITIAL_ZOOM: u8 = 7;

/// Used until the map container has been measured.
pub const FALLBACK_MAP_SIZE: (f64, f64) = (960.0, 640.0);

pub const MAP_CONTAINER_ID: &str = "polygon-map-container";

/// Click slop around a feature, in screen pixels.
pub const HIT_TOLERANCE_PX: f64 = 8.0;

// Path colors follow selection > overlap > default.
pub const DEFAULT_COLOR: &str = "#3388ff";
pub const OVERLAP_COLOR: &str = "#e02424";
pub const SELECTED_COLOR: &str = "#1f9d3a";
pub const WFS_COLOR: &str = "#ff7800";
pub const SKETCH_COLOR: &str = "#f5c400";

pub const UPLOAD_ACCEPT: &str = ".zip,.shp,.dbf";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaseLayer {
    OpenStreetMap,
    #[default]
    Imagery,
}

impl BaseLayer {
    pub const ALL: [BaseLayer; 2] = [BaseLayer::Imagery, BaseLayer::OpenStreetMap];

    pub fn label(self) -> &'static str {
        match self {
            BaseLayer::OpenStreetMap => "OpenStreetMap",
            BaseLayer::Imagery => "Imagery",
        }
    }

    pub fn url_template(self) -> &'static str {
        match self {
            BaseLayer::OpenStreetMap => "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            BaseLayer::Imagery => {
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
            }
        }
    }

    pub fn subdomains(self) -> &'static [&'static str] {
        match self {
            BaseLayer::OpenStreetMap => &["a", "b", "c"],
            BaseLayer::Imagery => &[],
        }
    }

    pub fn attribution(self) -> &'static str {
        match self {
            BaseLayer::OpenStreetMap => "© OpenStreetMap contributors",
            BaseLayer::Imagery => "Tiles © Esri",
        }
    }

    pub fn from_label(label: &str) -> Option<BaseLayer> {
        Self::ALL.into_iter().find(|l| l.label() == label)
    }
}
