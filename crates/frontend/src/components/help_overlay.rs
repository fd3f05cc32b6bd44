use dioxus::prelude::*;

#[component]
pub fn HelpOverlay(show: Signal<bool>) -> Element {
    if !*show.read() {
        return rsx! {};
    }

    rsx! {
        div {
            class: "help-overlay-backdrop",
            onclick: move |_| show.set(false),

            div {
                class: "help-overlay",
                onclick: move |evt: Event<MouseData>| evt.stop_propagation(),

                h2 { "Help" }

                div { class: "shortcut-section",
                    h3 { "Map" }
                    div { class: "shortcut-row",
                        span { class: "shortcut-keys", "Drag" }
                        span { "Pan" }
                    }
                    div { class: "shortcut-row",
                        span { class: "shortcut-keys", "Scroll" }
                        span { "Zoom at the cursor" }
                    }
                    div { class: "shortcut-row",
                        span { class: "shortcut-keys", "Double-click" }
                        span { "Reset the view (or finish a line/polygon)" }
                    }
                    div { class: "shortcut-row",
                        span { class: "shortcut-keys", kbd { "Esc" } }
                        span { "Cancel the current drawing" }
                    }
                    div { class: "shortcut-row",
                        span { class: "shortcut-keys", kbd { "H" } " / " kbd { "?" } }
                        span { "Toggle this help" }
                    }
                }

                div { class: "help-divider" }

                div { class: "help-info-section",
                    h3 { "Drawing" }
                    p { "Markers and circle markers need one click. Rectangles take two opposite corners. Circles take the center, then a point on the edge. Lines and polygons add a point per click; finish with a double-click or the Finish button. Delete removes the drawn or uploaded shape under the next clicks until pressed again or Escape." }
                }

                div { class: "help-info-section",
                    h3 { "Overlaps" }
                    p { "Check overlaps compares every drawn and uploaded shape with every other one. Overlapping shapes turn red and markers sitting on them switch to the red icon. Download overlapping saves just those shapes." }
                }

                div { class: "help-info-section",
                    h3 { "Info and selection" }
                    p { "Show info opens a popup per shape with its area, length, radius or coordinates. Select shapes toggles every line, polygon or circle whose bounding box contains the clicked point; selected shapes turn green." }
                }

                div { class: "help-info-section",
                    h3 { "Files and remote layers" }
                    p { "Upload accepts a zipped shapefile or a bare .shp. Downloads are zipped shapefiles in WGS84. WMS and WFS layers ask for a service URL and a layer name. Click a WFS feature to see its name." }
                }

                button {
                    class: "close-help",
                    onclick: move |_| show.set(false),
                    "Close"
                }
            }
        }
    }
}
