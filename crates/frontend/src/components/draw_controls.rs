use dioxus::prelude::*;
use geo::Coord;
use polygon_tools_shared::measure;
use polygon_tools_shared::models::DrawnShape;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawTool {
    Marker,
    CircleMarker,
    Polyline,
    Polygon,
    Rectangle,
    Circle,
}

impl DrawTool {
    pub const ALL: [DrawTool; 6] = [
        DrawTool::Marker,
        DrawTool::CircleMarker,
        DrawTool::Polyline,
        DrawTool::Polygon,
        DrawTool::Rectangle,
        DrawTool::Circle,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DrawTool::Marker => "Marker",
            DrawTool::CircleMarker => "Circle marker",
            DrawTool::Polyline => "Line",
            DrawTool::Polygon => "Polygon",
            DrawTool::Rectangle => "Rectangle",
            DrawTool::Circle => "Circle",
        }
    }

    /// Tools completed by "Finish" or a double-click rather than a fixed click count.
    pub fn is_open_ended(self) -> bool {
        matches!(self, DrawTool::Polyline | DrawTool::Polygon)
    }
}

/// What a primary click on the map does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    Pan,
    Draw(DrawTool),
    Select,
    /// Clicking a drawn or uploaded shape removes it.
    Delete,
}

impl MapMode {
    /// The mode after pressing the Delete button.
    pub fn toggle_delete(self) -> MapMode {
        if self == MapMode::Delete {
            MapMode::Pan
        } else {
            MapMode::Delete
        }
    }
}

/// An in-progress drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct Sketch {
    pub tool: DrawTool,
    pub vertices: Vec<Coord<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SketchStep {
    Pending(Sketch),
    Done(DrawnShape),
}

impl Sketch {
    pub fn new(tool: DrawTool) -> Self {
        Sketch {
            tool,
            vertices: Vec::new(),
        }
    }

    /// Add a vertex. Repeating the last vertex (the second half of a double-click) is ignored.
    pub fn click(mut self, at: Coord<f64>) -> SketchStep {
        if self.vertices.last() == Some(&at) {
            return SketchStep::Pending(self);
        }
        self.vertices.push(at);
        match (self.tool, self.vertices.as_slice()) {
            (DrawTool::Marker, _) => SketchStep::Done(DrawnShape::Marker(at.into())),
            (DrawTool::CircleMarker, _) => SketchStep::Done(DrawnShape::CircleMarker(at.into())),
            (DrawTool::Rectangle, &[a, b]) => SketchStep::Done(DrawnShape::Rectangle(a, b)),
            (DrawTool::Circle, &[center, edge]) => SketchStep::Done(DrawnShape::Circle {
                center: center.into(),
                radius_m: measure::distance_m(center.into(), edge.into()),
            }),
            _ => SketchStep::Pending(self),
        }
    }

    /// Complete an open-ended sketch. `None` if it has too few vertices.
    pub fn finish(self) -> Option<DrawnShape> {
        match self.tool {
            DrawTool::Polyline if self.vertices.len() >= 2 => Some(DrawnShape::Polyline(self.vertices)),
            DrawTool::Polygon if self.vertices.len() >= 3 => Some(DrawnShape::Polygon(self.vertices)),
            _ => None,
        }
    }

    pub fn hint(&self) -> &'static str {
        match (self.tool, self.vertices.len()) {
            (DrawTool::Marker | DrawTool::CircleMarker, _) => "Click to place",
            (DrawTool::Rectangle, 0) => "Click the first corner",
            (DrawTool::Rectangle, _) => "Click the opposite corner",
            (DrawTool::Circle, 0) => "Click the center",
            (DrawTool::Circle, _) => "Click to set the radius",
            (DrawTool::Polyline, n) if n < 2 => "Click to add points",
            (DrawTool::Polygon, n) if n < 3 => "Click to add points",
            _ => "Double-click or Finish to complete",
        }
    }
}

#[component]
pub fn DrawControls(
    mode: Signal<MapMode>,
    sketch: Signal<Option<Sketch>>,
    on_shape: EventHandler<DrawnShape>,
) -> Element {
    let current = *mode.read();
    let active_sketch = sketch.read().clone();

    rsx! {
        div { class: "panel",
            h3 { "Draw" }
            div { class: "tool-grid",
                for tool in DrawTool::ALL {
                    button {
                        class: if current == MapMode::Draw(tool) { "active" } else { "" },
                        onclick: move |_| {
                            mode.set(MapMode::Draw(tool));
                            sketch.set(Some(Sketch::new(tool)));
                        },
                        "{tool.label()}"
                    }
                }
                button {
                    class: if current == MapMode::Delete { "active danger" } else { "danger" },
                    onclick: move |_| {
                        sketch.set(None);
                        let next = mode.peek().toggle_delete();
                        mode.set(next);
                    },
                    "Delete"
                }
            }
            if let Some(s) = active_sketch {
                div { class: "sketch-status",
                    span { class: "hint", "{s.hint()}" }
                    if s.tool.is_open_ended() {
                        button {
                            onclick: move |_| {
                                let Some(s) = sketch.write().take() else { return };
                                if let Some(shape) = s.finish() {
                                    on_shape.call(shape);
                                }
                                mode.set(MapMode::Pan);
                            },
                            "Finish"
                        }
                    }
                    button {
                        class: "secondary",
                        onclick: move |_| {
                            sketch.set(None);
                            mode.set(MapMode::Pan);
                        },
                        "Cancel"
                    }
                }
            }
        }
    }
}
