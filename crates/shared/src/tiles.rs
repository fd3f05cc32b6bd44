//! Web-Mercator slippy-map math.
//!
//! World pixel space at zoom `z` is a square of `256 * 2^z` pixels with the
//! origin at the north-west corner (180°W, ~85.05°N).
use geo::{Coord, Rect};

pub const TILE_SIZE: f64 = 256.0;
pub const MIN_ZOOM: u8 = 4;
pub const MAX_ZOOM: u8 = 18;

/// Latitude limit of the square Mercator world.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

/// Half the equatorial circumference in EPSG:3857 meters.
pub const MERCATOR_HALF_EXTENT: f64 = 20_037_508.342_789_244;

pub fn world_size(zoom: u8) -> f64 {
    TILE_SIZE * f64::from(1u32 << zoom)
}

/// Project lon/lat to world pixels at `zoom`.
pub fn project(coord: Coord<f64>, zoom: u8) -> (f64, f64) {
    let size = world_size(zoom);
    let lat = coord.y.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (coord.x + 180.0) / 360.0 * size;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) / 2.0 * size;
    (x, y)
}

/// Inverse of [`project`].
pub fn unproject(x: f64, y: f64, zoom: u8) -> Coord<f64> {
    let size = world_size(zoom);
    let lon = x / size * 360.0 - 180.0;
    let n = std::f64::consts::PI * (1.0 - 2.0 * y / size);
    let lat = n.sinh().atan().to_degrees();
    Coord { x: lon, y: lat }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    /// Tile extent in EPSG:3857 meters as `(min_x, min_y, max_x, max_y)`.
    pub fn mercator_bbox(&self) -> (f64, f64, f64, f64) {
        let span = 2.0 * MERCATOR_HALF_EXTENT / f64::from(1u32 << self.z);
        let min_x = -MERCATOR_HALF_EXTENT + f64::from(self.x) * span;
        let max_y = MERCATOR_HALF_EXTENT - f64::from(self.y) * span;
        (min_x, max_y - span, min_x + span, max_y)
    }
}

/// A tile and where its top-left corner lands on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedTile {
    pub tile: TileCoord,
    pub left: f64,
    pub top: f64,
}

/// Fill an XYZ URL template (`{s}`, `{z}`, `{x}`, `{y}`).
pub fn xyz_tile_url(template: &str, tile: TileCoord, subdomains: &[&str]) -> String {
    let mut url = template
        .replace("{z}", &tile.z.to_string())
        .replace("{x}", &tile.x.to_string())
        .replace("{y}", &tile.y.to_string());
    if !subdomains.is_empty() {
        let s = subdomains[((tile.x + tile.y) as usize) % subdomains.len()];
        url = url.replace("{s}", s);
    }
    url
}

/// WMS 1.1.1 GetMap request for one 256px tile in EPSG:3857.
pub fn wms_tile_url(base_url: &str, layer_name: &str, tile: TileCoord) -> String {
    let (min_x, min_y, max_x, max_y) = tile.mercator_bbox();
    let sep = if base_url.contains('?') {
        if base_url.ends_with('?') || base_url.ends_with('&') { "" } else { "&" }
    } else {
        "?"
    };
    format!(
        "{base_url}{sep}SERVICE=WMS&REQUEST=GetMap&VERSION=1.1.1&LAYERS={}&STYLES=&FORMAT=image%2Fpng&TRANSPARENT=true&SRS=EPSG%3A3857&WIDTH=256&HEIGHT=256&BBOX={min_x},{min_y},{max_x},{max_y}",
        urlencoding::encode(layer_name)
    )
}

/// Center, integer zoom and pixel size of the visible map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: Coord<f64>,
    pub zoom: u8,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(center: Coord<f64>, zoom: u8, width: f64, height: f64) -> Self {
        Viewport {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            width,
            height,
        }
    }

    /// World-pixel position of the screen's top-left corner.
    fn origin(&self) -> (f64, f64) {
        let (cx, cy) = project(self.center, self.zoom);
        (cx - self.width / 2.0, cy - self.height / 2.0)
    }

    pub fn to_screen(&self, coord: Coord<f64>) -> (f64, f64) {
        let (ox, oy) = self.origin();
        let (x, y) = project(coord, self.zoom);
        (x - ox, y - oy)
    }

    pub fn to_geo(&self, screen_x: f64, screen_y: f64) -> Coord<f64> {
        let (ox, oy) = self.origin();
        unproject(ox + screen_x, oy + screen_y, self.zoom)
    }

    pub fn with_size(self, width: f64, height: f64) -> Self {
        Viewport { width, height, ..self }
    }

    /// Move the content by a screen-space drag of `(dx, dy)` pixels.
    pub fn panned(self, dx: f64, dy: f64) -> Self {
        let (cx, cy) = project(self.center, self.zoom);
        let size = world_size(self.zoom);
        let y = (cy - dy).clamp(0.0, size);
        let mut center = unproject(cx - dx, y, self.zoom);
        center.x = wrap_longitude(center.x);
        Viewport { center, ..self }
    }

    /// Change zoom keeping the geographic point under `(screen_x, screen_y)` fixed.
    pub fn zoomed_at(self, screen_x: f64, screen_y: f64, zoom: u8) -> Self {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if zoom == self.zoom {
            return self;
        }
        let anchor = self.to_geo(screen_x, screen_y);
        let (ax, ay) = project(anchor, zoom);
        let cx = ax - (screen_x - self.width / 2.0);
        let cy = ay - (screen_y - self.height / 2.0);
        Viewport {
            center: unproject(cx, cy, zoom),
            zoom,
            ..self
        }
    }

    /// Highest zoom at which `bounds` fits inside the viewport, centered on it.
    pub fn fit_bounds(self, bounds: Rect<f64>) -> Self {
        let north_west = Coord { x: bounds.min().x, y: bounds.max().y };
        let south_east = Coord { x: bounds.max().x, y: bounds.min().y };
        let mut zoom = MAX_ZOOM;
        while zoom > MIN_ZOOM {
            let (x0, y0) = project(north_west, zoom);
            let (x1, y1) = project(south_east, zoom);
            if x1 - x0 <= self.width && y1 - y0 <= self.height {
                break;
            }
            zoom -= 1;
        }
        let (x0, y0) = project(north_west, zoom);
        let (x1, y1) = project(south_east, zoom);
        Viewport {
            center: unproject((x0 + x1) / 2.0, (y0 + y1) / 2.0, zoom),
            zoom,
            ..self
        }
    }

    /// Every tile overlapping the viewport, columns wrapped around the antimeridian.
    pub fn visible_tiles(&self) -> Vec<PlacedTile> {
        let (ox, oy) = self.origin();
        let n = 1i64 << self.zoom;
        let first_col = (ox / TILE_SIZE).floor() as i64;
        let last_col = ((ox + self.width) / TILE_SIZE).floor() as i64;
        let first_row = ((oy / TILE_SIZE).floor() as i64).max(0);
        let last_row = (((oy + self.height) / TILE_SIZE).floor() as i64).min(n - 1);

        let mut tiles = Vec::new();
        for row in first_row..=last_row {
            for col in first_col..=last_col {
                tiles.push(PlacedTile {
                    tile: TileCoord {
                        x: col.rem_euclid(n) as u32,
                        y: row as u32,
                        z: self.zoom,
                    },
                    left: col as f64 * TILE_SIZE - ox,
                    top: row as f64 * TILE_SIZE - oy,
                });
            }
        }
        tiles
    }
}

fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cairo() -> Coord<f64> {
        Coord { x: 31.274659, y: 27.59063 }
    }

    #[test]
    fn test_project_origin_and_center() {
        let (x, y) = project(Coord { x: 0.0, y: 0.0 }, 0);
        assert!((x - 128.0).abs() < 1e-9);
        assert!((y - 128.0).abs() < 1e-9);
        let (x, _) = project(Coord { x: -180.0, y: 0.0 }, 3);
        assert!(x.abs() < 1e-9);
    }

    #[test]
    fn test_unproject_inverts_project() {
        let (x, y) = project(cairo(), 7);
        let back = unproject(x, y, 7);
        assert!((back.x - cairo().x).abs() < 1e-9);
        assert!((back.y - cairo().y).abs() < 1e-9);
    }

    #[test]
    fn test_viewport_center_maps_to_screen_center() {
        let vp = Viewport::new(cairo(), 7, 800.0, 600.0);
        let (sx, sy) = vp.to_screen(cairo());
        assert!((sx - 400.0).abs() < 1e-6);
        assert!((sy - 300.0).abs() < 1e-6);
        let geo = vp.to_geo(400.0, 300.0);
        assert!((geo.x - cairo().x).abs() < 1e-9);
    }

    #[test]
    fn test_viewport_clamps_zoom() {
        assert_eq!(Viewport::new(cairo(), 1, 10.0, 10.0).zoom, MIN_ZOOM);
        assert_eq!(Viewport::new(cairo(), 22, 10.0, 10.0).zoom, MAX_ZOOM);
    }

    #[test]
    fn test_pan_moves_content_with_drag() {
        let vp = Viewport::new(cairo(), 7, 800.0, 600.0);
        let panned = vp.panned(100.0, 0.0);
        // dragging right reveals what was west of center
        assert!(panned.center.x < vp.center.x);
        let (sx, _) = panned.to_screen(cairo());
        assert!((sx - 500.0).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let vp = Viewport::new(cairo(), 7, 800.0, 600.0);
        let anchor = vp.to_geo(200.0, 150.0);
        let zoomed = vp.zoomed_at(200.0, 150.0, 9);
        assert_eq!(zoomed.zoom, 9);
        let (sx, sy) = zoomed.to_screen(anchor);
        assert!((sx - 200.0).abs() < 1e-6);
        assert!((sy - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_fit_bounds_contains_rect() {
        let vp = Viewport::new(cairo(), 7, 800.0, 600.0);
        let rect = Rect::new(Coord { x: 30.0, y: 29.0 }, Coord { x: 32.0, y: 31.5 });
        let fitted = vp.fit_bounds(rect);
        for corner in [rect.min(), rect.max()] {
            let (sx, sy) = fitted.to_screen(corner);
            assert!((-1e-6..=800.0 + 1e-6).contains(&sx), "x {sx}");
            assert!((-1e-6..=600.0 + 1e-6).contains(&sy), "y {sy}");
        }
        // one zoom level closer would not fit
        assert!(fitted.zoom < MAX_ZOOM);
    }

    #[test]
    fn test_fit_bounds_point_goes_to_max_zoom() {
        let vp = Viewport::new(cairo(), 7, 800.0, 600.0);
        let fitted = vp.fit_bounds(Rect::new(cairo(), cairo()));
        assert_eq!(fitted.zoom, MAX_ZOOM);
    }

    #[test]
    fn test_visible_tiles_cover_viewport() {
        let vp = Viewport::new(Coord { x: 0.0, y: 0.0 }, 4, 512.0, 512.0);
        let tiles = vp.visible_tiles();
        // centered exactly on a tile corner: 2x2 full tiles plus the edge row/col
        assert!(tiles.len() >= 4);
        assert!(tiles.iter().all(|t| t.tile.z == 4 && t.tile.x < 16 && t.tile.y < 16));
        assert!(tiles.iter().any(|t| t.left <= 0.0 && t.top <= 0.0));
    }

    #[test]
    fn test_visible_tiles_wrap_columns() {
        let vp = Viewport::new(Coord { x: 179.9, y: 0.0 }, 4, 1024.0, 256.0);
        let tiles = vp.visible_tiles();
        assert!(tiles.iter().any(|t| t.tile.x == 0));
        assert!(tiles.iter().any(|t| t.tile.x == 15));
    }

    #[test]
    fn test_xyz_tile_url_template() {
        let url = xyz_tile_url(
            "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            TileCoord { x: 3, y: 5, z: 7 },
            &["a", "b", "c"],
        );
        assert_eq!(url, "https://c.tile.openstreetmap.org/7/3/5.png");
    }

    #[test]
    fn test_mercator_bbox_of_root_tile() {
        let (min_x, min_y, max_x, max_y) = TileCoord { x: 0, y: 0, z: 0 }.mercator_bbox();
        assert!((min_x + MERCATOR_HALF_EXTENT).abs() < 1e-6);
        assert!((min_y + MERCATOR_HALF_EXTENT).abs() < 1e-6);
        assert!((max_x - MERCATOR_HALF_EXTENT).abs() < 1e-6);
        assert!((max_y - MERCATOR_HALF_EXTENT).abs() < 1e-6);
    }

    #[test]
    fn test_wms_tile_url_params() {
        let url = wms_tile_url(
            "https://example.com/geoserver/wms",
            "topp:states roads",
            TileCoord { x: 0, y: 0, z: 1 },
        );
        assert!(url.starts_with("https://example.com/geoserver/wms?SERVICE=WMS&REQUEST=GetMap"));
        assert!(url.contains("LAYERS=topp%3Astates%20roads"));
        assert!(url.contains("TRANSPARENT=true"));
        assert!(url.contains("SRS=EPSG%3A3857"));
        assert!(url.ends_with("BBOX=-20037508.342789244,0,0,20037508.342789244"));
    }

    #[test]
    fn test_wms_tile_url_appends_to_existing_query() {
        let url = wms_tile_url("https://example.com/wms?map=demo", "a", TileCoord { x: 0, y: 0, z: 0 });
        assert!(url.starts_with("https://example.com/wms?map=demo&SERVICE=WMS"));
    }
}
