use dioxus::prelude::*;
use polygon_tools_shared::models::Popup;
use polygon_tools_shared::tiles::Viewport;
use polygon_tools_shared::workspace::Workspace;

use crate::state::apply;

/// A popup resolved to container pixels.
#[derive(Debug, Clone, PartialEq)]
struct PlacedPopup {
    key: String,
    text: String,
    left: f64,
    top: f64,
    closable: bool,
}

fn place_popups(popups: Vec<Popup>, transient: Option<&Popup>, vp: &Viewport) -> Vec<PlacedPopup> {
    popups
        .into_iter()
        .enumerate()
        .map(|(i, popup)| {
            let (left, top) = vp.to_screen(popup.anchor);
            let key = match popup.feature_id {
                Some(id) => id.to_string(),
                None => format!("popup-{i}"),
            };
            PlacedPopup {
                key,
                closable: transient == Some(&popup),
                text: popup.text,
                left,
                top,
            }
        })
        .collect()
}

#[component]
pub fn Popups(workspace: Signal<Workspace>, viewport: Signal<Viewport>) -> Element {
    let placed = {
        let ws = workspace.read();
        place_popups(ws.info_popups(), ws.popup(), &viewport.read())
    };

    rsx! {
        for popup in placed {
            div {
                key: "{popup.key}",
                class: "map-popup",
                style: "left:{popup.left}px;top:{popup.top}px;",
                onmousedown: move |evt: Event<MouseData>| evt.stop_propagation(),
                onmouseup: move |evt: Event<MouseData>| evt.stop_propagation(),
                span { "{popup.text}" }
                if popup.closable {
                    button {
                        class: "popup-close",
                        onclick: move |_| apply(workspace, Workspace::with_popup_closed),
                        "\u{00d7}"
                    }
                }
            }
        }
    }
}
