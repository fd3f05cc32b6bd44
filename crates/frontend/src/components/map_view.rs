use dioxus::html::geometry::WheelDelta;
use dioxus::html::input_data::MouseButton;
use dioxus::prelude::*;
use geo::{Coord, Geometry, Point, Polygon};
use polygon_tools_shared::models::{DrawnShape, Feature, LayerColor, MarkerIcon};
use polygon_tools_shared::tiles::{self, Viewport};
use polygon_tools_shared::workspace::{is_marker, Workspace};

use crate::components::draw_controls::{DrawTool, MapMode, Sketch, SketchStep};
use crate::components::popups::Popups;
use crate::config::{self, BaseLayer};
use crate::coords;

/// Drag threshold in pixels: movement below this is treated as a click.
const DRAG_THRESHOLD: f64 = 3.0;

// ---------------------------------------------------------------------------
// DOM helpers
// ---------------------------------------------------------------------------

/// The viewport resized to the live container, if it has been laid out.
fn measured(viewport: Viewport) -> Viewport {
    match coords::container_rect(config::MAP_CONTAINER_ID) {
        Some((_, _, w, h)) if w > 0.0 && h > 0.0 => viewport.with_size(w, h),
        _ => viewport,
    }
}

/// Convert a wheel delta (pixels / lines / pages) to a uniform pixel-like value.
fn wheel_delta_y(delta: WheelDelta) -> f64 {
    match delta {
        WheelDelta::Pixels(d) => d.y,
        WheelDelta::Lines(d) => d.y * 40.0,
        WheelDelta::Pages(d) => d.y * 400.0,
    }
}

fn initial_viewport(current: Viewport) -> Viewport {
    Viewport::new(config::INITIAL_CENTER, config::INITIAL_ZOOM, current.width, current.height)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DoubleClick {
    FinishSketch,
    ResetView,
}

/// A double-click completes an open-ended sketch, otherwise it resets the view.
fn double_click_action(sketch: Option<&Sketch>) -> DoubleClick {
    if sketch.is_some_and(|s| s.tool.is_open_ended()) {
        DoubleClick::FinishSketch
    } else {
        DoubleClick::ResetView
    }
}

// ---------------------------------------------------------------------------
// SVG builder
// ---------------------------------------------------------------------------

fn path_color(color: LayerColor) -> &'static str {
    match color {
        LayerColor::Default => config::DEFAULT_COLOR,
        LayerColor::Overlapping => config::OVERLAP_COLOR,
        LayerColor::Selected => config::SELECTED_COLOR,
    }
}

fn icon_color(icon: MarkerIcon) -> &'static str {
    match icon {
        MarkerIcon::Default => config::DEFAULT_COLOR,
        MarkerIcon::Overlapping => config::OVERLAP_COLOR,
    }
}

/// How a single feature is painted.
struct FeatureStyle<'a> {
    stroke: &'a str,
    /// Points render as pins in this color, or as dots when `None`.
    pin: Option<&'a str>,
}

fn push_ring(d: &mut String, vp: &Viewport, coords: &[Coord<f64>], close: bool) {
    for (i, c) in coords.iter().enumerate() {
        let (x, y) = vp.to_screen(*c);
        let cmd = if i == 0 { 'M' } else { 'L' };
        d.push_str(&format!("{cmd}{x:.1},{y:.1} "));
    }
    if close && !coords.is_empty() {
        d.push_str("Z ");
    }
}

fn push_polygon(d: &mut String, vp: &Viewport, polygon: &Polygon<f64>) {
    push_ring(d, vp, &polygon.exterior().0, true);
    for hole in polygon.interiors() {
        push_ring(d, vp, &hole.0, true);
    }
}

/// Path data for the stroked part of a geometry and whether it is filled.
/// `None` for point-like geometries and collections.
fn geometry_path(geometry: &Geometry<f64>, vp: &Viewport) -> Option<(String, bool)> {
    let mut d = String::new();
    let filled = match geometry {
        Geometry::Line(line) => {
            push_ring(&mut d, vp, &[line.start, line.end], false);
            false
        }
        Geometry::LineString(ls) => {
            push_ring(&mut d, vp, &ls.0, false);
            false
        }
        Geometry::MultiLineString(mls) => {
            for ls in mls {
                push_ring(&mut d, vp, &ls.0, false);
            }
            false
        }
        Geometry::Polygon(poly) => {
            push_polygon(&mut d, vp, poly);
            true
        }
        Geometry::MultiPolygon(mp) => {
            for poly in mp {
                push_polygon(&mut d, vp, poly);
            }
            true
        }
        Geometry::Rect(rect) => {
            push_polygon(&mut d, vp, &rect.to_polygon());
            true
        }
        Geometry::Triangle(tri) => {
            push_polygon(&mut d, vp, &tri.to_polygon());
            true
        }
        Geometry::Point(_) | Geometry::MultiPoint(_) | Geometry::GeometryCollection(_) => {
            return None;
        }
    };
    Some((d.trim_end().to_string(), filled))
}

fn build_pin(svg: &mut String, x: f64, y: f64, color: &str) {
    svg.push_str(&format!(
        r##"<path d="M{x:.1},{y:.1} l-7,-13 a8,8 0 1,1 14,0 z" fill="{color}" stroke="white" stroke-width="2"/>"##
    ));
    let cy = y - 17.0;
    svg.push_str(&format!(r##"<circle cx="{x:.1}" cy="{cy:.1}" r="3" fill="white"/>"##));
}

fn build_dot(svg: &mut String, x: f64, y: f64, color: &str) {
    svg.push_str(&format!(
        r##"<circle cx="{x:.1}" cy="{y:.1}" r="7" fill="{color}" fill-opacity="0.5" stroke="{color}" stroke-width="2"/>"##
    ));
}

fn build_point(svg: &mut String, point: Point<f64>, vp: &Viewport, style: &FeatureStyle) {
    let (x, y) = vp.to_screen(point.0);
    match style.pin {
        Some(color) => build_pin(svg, x, y, color),
        None => build_dot(svg, x, y, style.stroke),
    }
}

fn build_geometry(svg: &mut String, geometry: &Geometry<f64>, vp: &Viewport, style: &FeatureStyle) {
    match geometry {
        Geometry::Point(p) => build_point(svg, *p, vp, style),
        Geometry::MultiPoint(mp) => {
            for p in mp {
                build_point(svg, *p, vp, style);
            }
        }
        Geometry::GeometryCollection(gc) => {
            for g in gc {
                build_geometry(svg, g, vp, style);
            }
        }
        other => {
            let Some((d, filled)) = geometry_path(other, vp) else { return };
            let stroke = style.stroke;
            let fill = if filled { stroke } else { "none" };
            svg.push_str(&format!(
                r##"<path d="{d}" fill="{fill}" fill-opacity="0.2" fill-rule="evenodd" stroke="{stroke}" stroke-width="3" stroke-linejoin="round"/>"##
            ));
        }
    }
}

fn build_feature(svg: &mut String, feature: &Feature, vp: &Viewport, style: &FeatureStyle) {
    let Some(geometry) = &feature.geometry else { return };
    svg.push_str(&format!(r##"<g data-feature="{}">"##, feature.id));
    build_geometry(svg, geometry, vp, style);
    svg.push_str("</g>");
}

/// Style for a drawn or uploaded feature, derived from the workspace.
fn layer_style(workspace: &Workspace, feature: &Feature) -> FeatureStyle<'static> {
    FeatureStyle {
        stroke: path_color(workspace.layer_color(feature.id)),
        pin: is_marker(feature).then(|| icon_color(workspace.marker_icon(feature.id))),
    }
}

/// WFS features are read-only and never recolored; their names show in a popup on click.
const WFS_STYLE: FeatureStyle<'static> = FeatureStyle {
    stroke: config::WFS_COLOR,
    pin: Some(config::WFS_COLOR),
};

fn build_sketch(svg: &mut String, sketch: &Sketch, hover: Option<Coord<f64>>, vp: &Viewport) {
    let color = config::SKETCH_COLOR;
    let dash = r##"stroke-dasharray="6 4""##;
    match (sketch.vertices.as_slice(), hover) {
        (&[corner], Some(h)) if sketch.tool == DrawTool::Rectangle => {
            let ring = [
                corner,
                Coord { x: h.x, y: corner.y },
                h,
                Coord { x: corner.x, y: h.y },
            ];
            let mut d = String::new();
            push_ring(&mut d, vp, &ring, true);
            let d = d.trim_end();
            svg.push_str(&format!(
                r##"<path d="{d}" fill="{color}" fill-opacity="0.15" stroke="{color}" stroke-width="2" {dash}/>"##
            ));
        }
        (&[center], Some(h)) if sketch.tool == DrawTool::Circle => {
            let (cx, cy) = vp.to_screen(center);
            let (hx, hy) = vp.to_screen(h);
            let r = ((hx - cx).powi(2) + (hy - cy).powi(2)).sqrt();
            svg.push_str(&format!(
                r##"<circle cx="{cx:.1}" cy="{cy:.1}" r="{r:.1}" fill="{color}" fill-opacity="0.15" stroke="{color}" stroke-width="2" {dash}/>"##
            ));
        }
        (vertices, _) if !vertices.is_empty() => {
            let mut ring = vertices.to_vec();
            ring.extend(hover);
            let mut d = String::new();
            push_ring(&mut d, vp, &ring, false);
            let d = d.trim_end();
            svg.push_str(&format!(
                r##"<path d="{d}" fill="none" stroke="{color}" stroke-width="2" {dash}/>"##
            ));
        }
        _ => {}
    }
    for v in &sketch.vertices {
        let (x, y) = vp.to_screen(*v);
        svg.push_str(&format!(
            r##"<rect x="{:.1}" y="{:.1}" width="8" height="8" fill="white" stroke="{color}" stroke-width="2"/>"##,
            x - 4.0,
            y - 4.0
        ));
    }
}

/// Build the full SVG overlay in container pixel space.
fn build_svg_content(
    workspace: &Workspace,
    vp: &Viewport,
    sketch: Option<&Sketch>,
    hover: Option<Coord<f64>>,
) -> String {
    let mut svg = String::with_capacity(8192);
    for feature in workspace.wfs_features() {
        build_feature(&mut svg, feature, vp, &WFS_STYLE);
    }
    for feature in workspace.layer_features() {
        build_feature(&mut svg, feature, vp, &layer_style(workspace, feature));
    }
    if let Some(sketch) = sketch {
        build_sketch(&mut svg, sketch, hover, vp);
    }
    svg
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

#[component]
pub fn MapView(
    workspace: Signal<Workspace>,
    viewport: Signal<Viewport>,
    base_layer: Signal<BaseLayer>,
    mode: Signal<MapMode>,
    sketch: Signal<Option<Sketch>>,
    on_shape: EventHandler<DrawnShape>,
    on_map_click: EventHandler<Point<f64>>,
) -> Element {
    // Size the viewport once the container is laid out
    use_effect(move || {
        let current = *viewport.peek();
        let sized = measured(current);
        if sized != current {
            viewport.set(sized);
        }
    });

    // Drag state (mouse)
    let mut is_dragging = use_signal(|| false);
    let mut did_drag = use_signal(|| false);
    let mut drag_start = use_signal(|| (0.0_f64, 0.0_f64));
    let mut drag_start_viewport = use_signal(|| *viewport.peek());
    let mut hover = use_signal(|| None::<Coord<f64>>);

    // Only tracks hover while a sketch is in progress, so plain mouse moves don't rebuild
    let svg_html = use_memo(move || {
        let ws = workspace.read();
        let vp = *viewport.read();
        let current_sketch = sketch.read().clone();
        let hover_at = if current_sketch.is_some() { *hover.read() } else { None };
        let content = build_svg_content(&ws, &vp, current_sketch.as_ref(), hover_at);
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" style="position:absolute;top:0;left:0;pointer-events:none;z-index:5;">{content}</svg>"#,
            w = vp.width,
            h = vp.height,
        )
    });

    let vp = *viewport.read();
    let base = *base_layer.read();
    let placed = vp.visible_tiles();
    let base_tiles: Vec<(String, f64, f64)> = placed
        .iter()
        .map(|t| (tiles::xyz_tile_url(base.url_template(), t.tile, base.subdomains()), t.left, t.top))
        .collect();
    let overlay_tiles: Vec<(String, f64, f64)> = workspace
        .read()
        .wms_layers()
        .iter()
        .flat_map(|layer| {
            placed.iter().map(move |t| {
                (tiles::wms_tile_url(&layer.url, &layer.layer_name, t.tile), t.left, t.top)
            })
        })
        .collect();

    let container_class = match (*is_dragging.read() && *did_drag.read(), *mode.read()) {
        (true, _) => "map-container dragging",
        (false, MapMode::Draw(_)) => "map-container drawing",
        (false, MapMode::Select) => "map-container selecting",
        (false, MapMode::Delete) => "map-container deleting",
        (false, MapMode::Pan) => "map-container",
    };
    let readout = (*hover.read()).map(coords::format_lat_lon);

    let mut handle_click = move |at: Coord<f64>| {
        let current_mode = *mode.peek();
        match current_mode {
            MapMode::Draw(tool) => {
                let current = sketch.write().take().unwrap_or_else(|| Sketch::new(tool));
                match current.click(at) {
                    SketchStep::Pending(next) => sketch.set(Some(next)),
                    SketchStep::Done(shape) => {
                        on_shape.call(shape);
                        mode.set(MapMode::Pan);
                    }
                }
            }
            MapMode::Pan | MapMode::Select | MapMode::Delete => on_map_click.call(at.into()),
        }
    };

    rsx! {
        div {
            id: config::MAP_CONTAINER_ID,
            class: "{container_class}",
            tabindex: "0",

            onwheel: move |evt: Event<WheelData>| {
                evt.prevent_default();
                let delta_y = wheel_delta_y(evt.data().delta());
                if delta_y == 0.0 {
                    return;
                }
                let current = measured(*viewport.peek());
                let target = if delta_y < 0.0 {
                    current.zoom.saturating_add(1)
                } else {
                    current.zoom.saturating_sub(1)
                };
                let client = evt.data().client_coordinates();
                let Some((cx, cy)) =
                    coords::client_to_container_px(client.x, client.y, config::MAP_CONTAINER_ID)
                else {
                    return;
                };
                viewport.set(current.zoomed_at(cx, cy, target));
            },

            onmousedown: move |evt: Event<MouseData>| {
                // Only track drag/click for left mouse button
                if evt.trigger_button() != Some(MouseButton::Primary) {
                    return;
                }
                let client = evt.client_coordinates();
                let current = measured(*viewport.peek());
                viewport.set(current);
                is_dragging.set(true);
                did_drag.set(false);
                drag_start.set((client.x, client.y));
                drag_start_viewport.set(current);
            },

            onmousemove: move |evt: Event<MouseData>| {
                let client = evt.client_coordinates();
                let container = coords::client_to_container_px(client.x, client.y, config::MAP_CONTAINER_ID);
                hover.set(container.and_then(|(x, y)| coords::container_to_geo(x, y, &viewport.peek())));

                if !*is_dragging.peek() {
                    return;
                }
                let (sx, sy) = *drag_start.peek();
                let (dx, dy) = (client.x - sx, client.y - sy);
                if !*did_drag.peek() && (dx.abs() > DRAG_THRESHOLD || dy.abs() > DRAG_THRESHOLD) {
                    did_drag.set(true);
                }
                if *did_drag.peek() {
                    viewport.set(drag_start_viewport.peek().panned(dx, dy));
                }
            },

            onmouseup: move |evt: Event<MouseData>| {
                let was_dragging = *is_dragging.peek();
                let was_drag = *did_drag.peek();
                is_dragging.set(false);
                did_drag.set(false);

                // A mouseup without drag movement = a click
                if was_dragging && !was_drag {
                    let client = evt.client_coordinates();
                    let at = coords::client_to_container_px(client.x, client.y, config::MAP_CONTAINER_ID)
                        .and_then(|(x, y)| coords::container_to_geo(x, y, &viewport.peek()));
                    if let Some(at) = at {
                        handle_click(at);
                    }
                }
            },

            onmouseleave: move |_| {
                is_dragging.set(false);
                hover.set(None);
            },

            ondoubleclick: move |evt: Event<MouseData>| {
                evt.prevent_default();
                let action = double_click_action(sketch.peek().as_ref());
                match action {
                    DoubleClick::FinishSketch => {
                        let finished = sketch.write().take().and_then(Sketch::finish);
                        if let Some(shape) = finished {
                            on_shape.call(shape);
                        }
                        mode.set(MapMode::Pan);
                    }
                    DoubleClick::ResetView => {
                        let current = *viewport.peek();
                        viewport.set(initial_viewport(current));
                    }
                }
            },

            onkeydown: move |evt: Event<KeyboardData>| {
                if evt.key() == Key::Escape {
                    sketch.set(None);
                    let armed = matches!(*mode.peek(), MapMode::Draw(_) | MapMode::Delete);
                    if armed {
                        mode.set(MapMode::Pan);
                    }
                }
            },

            div { class: "tile-layer",
                for (url, left, top) in base_tiles {
                    img {
                        key: "{url}",
                        class: "tile",
                        src: "{url}",
                        draggable: "false",
                        style: "left:{left}px;top:{top}px;",
                    }
                }
            }

            div { class: "tile-layer overlay",
                for (url, left, top) in overlay_tiles {
                    img {
                        key: "{url}",
                        class: "tile",
                        src: "{url}",
                        draggable: "false",
                        style: "left:{left}px;top:{top}px;",
                    }
                }
            }

            div {
                dangerous_inner_html: "{svg_html}",
                style: "position:absolute;top:0;left:0;width:100%;height:100%;pointer-events:none;",
            }

            Popups { workspace, viewport }

            div { class: "zoom-controls",
                button {
                    onmousedown: move |evt: Event<MouseData>| evt.stop_propagation(),
                    ondoubleclick: move |evt: Event<MouseData>| evt.stop_propagation(),
                    onclick: move |_| {
                        let current = measured(*viewport.peek());
                        viewport.set(current.zoomed_at(current.width / 2.0, current.height / 2.0, current.zoom.saturating_add(1)));
                    },
                    "+"
                }
                button {
                    onmousedown: move |evt: Event<MouseData>| evt.stop_propagation(),
                    ondoubleclick: move |evt: Event<MouseData>| evt.stop_propagation(),
                    onclick: move |_| {
                        let current = measured(*viewport.peek());
                        viewport.set(current.zoomed_at(current.width / 2.0, current.height / 2.0, current.zoom.saturating_sub(1)));
                    },
                    "\u{2212}"
                }
            }

            // Coordinate readout (outside the overlay so it stays fixed)
            div { class: "coord-readout",
                if let Some(text) = readout {
                    span { class: "coord-tag", "{text}" }
                }
                span { class: "attribution", "{base.attribution()}" }
            }
        }
    }
}
