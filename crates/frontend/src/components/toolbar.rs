use dioxus::prelude::*;

use crate::components::draw_controls::MapMode;
use crate::config::{self, BaseLayer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarAction {
    CheckOverlaps,
    DownloadAll,
    DownloadOverlapping,
    ToggleInfo,
    SelectShapes,
    AddWms,
    AddWfs,
}

#[component]
pub fn Toolbar(
    base_layer: Signal<BaseLayer>,
    mode: Signal<MapMode>,
    show_info: bool,
    on_action: EventHandler<ToolbarAction>,
    on_upload: EventHandler<Event<FormData>>,
) -> Element {
    let selecting = *mode.read() == MapMode::Select;
    let current_base = *base_layer.read();

    rsx! {
        div { class: "panel",
            h3 { "Base layer" }
            select {
                onchange: move |evt: Event<FormData>| {
                    if let Some(layer) = BaseLayer::from_label(&evt.value()) {
                        base_layer.set(layer);
                    }
                },
                for layer in BaseLayer::ALL {
                    option {
                        value: "{layer.label()}",
                        selected: layer == current_base,
                        "{layer.label()}"
                    }
                }
            }
        }

        div { class: "panel",
            h3 { "Shapes" }
            div { class: "button-column",
                button {
                    onclick: move |_| on_action.call(ToolbarAction::CheckOverlaps),
                    "Check overlaps"
                }
                button {
                    class: if show_info { "active" } else { "" },
                    onclick: move |_| on_action.call(ToolbarAction::ToggleInfo),
                    "Show info"
                }
                button {
                    class: if selecting { "active" } else { "" },
                    onclick: move |_| on_action.call(ToolbarAction::SelectShapes),
                    "Select shapes"
                }
            }
        }

        div { class: "panel",
            h3 { "Shapefiles" }
            label { class: "upload",
                "Upload"
                input {
                    r#type: "file",
                    accept: config::UPLOAD_ACCEPT,
                    onchange: move |evt: Event<FormData>| on_upload.call(evt),
                }
            }
            div { class: "button-column",
                button {
                    onclick: move |_| on_action.call(ToolbarAction::DownloadAll),
                    "Download all"
                }
                button {
                    onclick: move |_| on_action.call(ToolbarAction::DownloadOverlapping),
                    "Download overlapping"
                }
            }
        }

        div { class: "panel",
            h3 { "Remote layers" }
            div { class: "button-column",
                button {
                    class: "secondary",
                    onclick: move |_| on_action.call(ToolbarAction::AddWms),
                    "Add WMS layer"
                }
                button {
                    class: "secondary",
                    onclick: move |_| on_action.call(ToolbarAction::AddWfs),
                    "Add WFS layer"
                }
            }
        }
    }
}
