use geo::Coord;
use polygon_tools_shared::tiles::Viewport;

/// Convert client (viewport) coordinates to container-relative pixel coordinates.
pub fn client_to_container(
    client_x: f64,
    client_y: f64,
    rect_left: f64,
    rect_top: f64,
) -> (f64, f64) {
    (client_x - rect_left, client_y - rect_top)
}

/// Container-relative pixels to lon/lat. `None` when the point falls outside
/// the container or the container has no size yet.
pub fn container_to_geo(
    container_x: f64,
    container_y: f64,
    viewport: &Viewport,
) -> Option<Coord<f64>> {
    if viewport.width <= 0.0 || viewport.height <= 0.0 {
        return None;
    }
    if !(0.0..=viewport.width).contains(&container_x)
        || !(0.0..=viewport.height).contains(&container_y)
    {
        return None;
    }
    Some(viewport.to_geo(container_x, container_y))
}

/// `(left, top, width, height)` of the element with `container_id`.
pub fn container_rect(container_id: &str) -> Option<(f64, f64, f64, f64)> {
    let document = web_sys::window()?.document()?;
    let element = document.get_element_by_id(container_id)?;
    let rect = element.get_bounding_client_rect();
    Some((rect.left(), rect.top(), rect.width(), rect.height()))
}

/// Client coordinates of a pointer event to container-relative pixels, via web_sys.
pub fn client_to_container_px(client_x: f64, client_y: f64, container_id: &str) -> Option<(f64, f64)> {
    let (left, top, _, _) = container_rect(container_id)?;
    Some(client_to_container(client_x, client_y, left, top))
}

/// Degrees of longitude covered by `px` screen pixels at the current zoom.
pub fn hit_tolerance(viewport: &Viewport, px: f64) -> f64 {
    let (x, y) = viewport.to_screen(viewport.center);
    (viewport.to_geo(x + px, y).x - viewport.center.x).abs()
}

/// `lat, lon` with six decimals, the order the coordinate popups use.
pub fn format_lat_lon(coord: Coord<f64>) -> String {
    format!("{:.6}, {:.6}", coord.y, coord.x)
}
