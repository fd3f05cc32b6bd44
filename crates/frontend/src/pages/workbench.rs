use dioxus::logger::tracing::{error, info, warn};
use dioxus::prelude::*;
use gloo_timers::future::TimeoutFuture;
use polygon_tools_shared::export::{self, ExportError};
use polygon_tools_shared::import::ShapefileSource;
use polygon_tools_shared::models::{DrawnShape, Feature};
use polygon_tools_shared::tiles::Viewport;
use polygon_tools_shared::wfs;
use polygon_tools_shared::workspace::Workspace;

use crate::browser;
use crate::components::draw_controls::{DrawControls, MapMode, Sketch};
use crate::components::help_overlay::HelpOverlay;
use crate::components::map_view::MapView;
use crate::components::toolbar::{Toolbar, ToolbarAction};
use crate::config::{self, BaseLayer};
use crate::coords;
use crate::remote;
use crate::state::apply;

const NO_OVERLAPS_FOUND: &str = "No overlapping shapes found.";
const NO_SHAPES_TO_DOWNLOAD: &str = "No shapes to download.";
const NO_OVERLAPS_TO_DOWNLOAD: &str = "No overlapping shapes to download.";
const WFS_LOAD_FAILED: &str = "Failed to load WFS data";

const ZIP_MIME: &str = "application/zip";

/// What a download request turns into, decided before touching the browser.
#[derive(Debug)]
enum Download {
    Save(Vec<u8>),
    Alert(&'static str),
    Failed(ExportError),
}

fn prepare_download(features: &[Feature], empty_message: &'static str) -> Download {
    match export::encode_shapefile_zip(features) {
        Ok(bytes) => Download::Save(bytes),
        Err(ExportError::Empty) => Download::Alert(empty_message),
        Err(e) => Download::Failed(e),
    }
}

fn download(features: &[Feature], file_name: &str, empty_message: &'static str) {
    match prepare_download(features, empty_message) {
        Download::Save(bytes) => {
            if let Err(e) = browser::save_bytes(&bytes, file_name, ZIP_MIME) {
                error!("Failed to save {file_name}: {e}");
            } else {
                info!("Saved {file_name} ({} features, {} bytes)", features.len(), bytes.len());
            }
        }
        Download::Alert(message) => browser::alert(message),
        Download::Failed(e) => error!("Failed to encode {file_name}: {e}"),
    }
}

/// Stream an uploaded shapefile into the workspace one feature at a time,
/// yielding to the event loop between features.
async fn load_upload(workspace: Signal<Workspace>, name: String, bytes: Vec<u8>) {
    let source = match ShapefileSource::open(&bytes) {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to open {name}: {e}");
            return;
        }
    };

    let mut added = 0usize;
    for item in source {
        match item {
            Ok(feature) => {
                apply(workspace, |ws| ws.with_uploaded_feature(feature).0);
                added += 1;
            }
            Err(e) => {
                error!("Failed to decode {name}: {e}");
                break;
            }
        }
        TimeoutFuture::new(0).await;
    }
    info!("Loaded {added} features from {name}");
}

async fn load_wfs(workspace: Signal<Workspace>, mut viewport: Signal<Viewport>) {
    let Some(layer) = remote::prompt_layer("WFS", browser::prompt) else {
        return;
    };
    match remote::fetch_wfs(&layer.url).await {
        Ok(features) => {
            info!("Loaded {} WFS features from {}", features.len(), layer.url);
            if let Some(bounds) = wfs::bounds(&features) {
                let fitted = viewport.peek().fit_bounds(bounds);
                viewport.set(fitted);
            } else {
                warn!("WFS layer {} has no geometry to fit", layer.layer_name);
            }
            apply(workspace, |ws| ws.with_wfs_layer(layer, features));
        }
        Err(e) => {
            error!("Failed to load WFS data: {e}");
            browser::alert(WFS_LOAD_FAILED);
        }
    }
}

#[component]
pub fn Workbench() -> Element {
    let workspace = use_signal(Workspace::new);
    let viewport = use_signal(|| {
        let (w, h) = config::FALLBACK_MAP_SIZE;
        Viewport::new(config::INITIAL_CENTER, config::INITIAL_ZOOM, w, h)
    });
    let base_layer = use_signal(BaseLayer::default);
    let mut mode = use_signal(|| MapMode::Pan);
    let mut sketch = use_signal(|| None::<Sketch>);
    let mut show_help = use_signal(|| false);

    let on_shape = move |shape: DrawnShape| {
        let mut id = None;
        apply(workspace, |ws| {
            let (next, new_id) = ws.with_drawn_shape(shape);
            id = Some(new_id);
            next
        });
        if let Some(id) = id {
            info!("Drew feature {id}");
        }
    };

    let on_map_click = move |point: geo::Point<f64>| {
        let tolerance = coords::hit_tolerance(&viewport.peek(), config::HIT_TOLERANCE_PX);
        if *mode.peek() == MapMode::Delete {
            let target = workspace.read().feature_at(point, tolerance);
            if let Some(id) = target {
                apply(workspace, |ws| ws.with_feature_removed(id));
                info!("Removed feature {id}");
            }
            return;
        }
        apply(workspace, |ws| ws.with_map_click(point).with_wfs_popup_at(point, tolerance));
    };

    let on_action = move |action: ToolbarAction| match action {
        ToolbarAction::CheckOverlaps => {
            apply(workspace, Workspace::with_overlap_check);
            let report = workspace.read().overlap().clone();
            info!(
                "Overlap check: {} overlapping, {} flagged markers",
                report.overlapping.len(),
                report.flagged_markers.len()
            );
            if report.is_empty() {
                browser::alert(NO_OVERLAPS_FOUND);
            }
        }
        ToolbarAction::DownloadAll => {
            let features = workspace.read().combined();
            download(&features, export::ALL_FEATURES_FILE, NO_SHAPES_TO_DOWNLOAD);
        }
        ToolbarAction::DownloadOverlapping => {
            let features = workspace.read().overlapping_features();
            download(&features, export::OVERLAPPING_FEATURES_FILE, NO_OVERLAPS_TO_DOWNLOAD);
        }
        ToolbarAction::ToggleInfo => apply(workspace, Workspace::with_info_toggled),
        ToolbarAction::SelectShapes => {
            apply(workspace, Workspace::with_selection_enabled);
            sketch.set(None);
            mode.set(MapMode::Select);
        }
        ToolbarAction::AddWms => {
            if let Some(layer) = remote::prompt_layer("WMS", browser::prompt) {
                info!("Adding WMS layer {} from {}", layer.layer_name, layer.url);
                apply(workspace, |ws| ws.with_wms_layer(layer));
            }
        }
        ToolbarAction::AddWfs => {
            spawn(load_wfs(workspace, viewport));
        }
    };

    let on_upload = move |evt: Event<FormData>| {
        let Some(file) = evt.files().into_iter().next() else {
            return;
        };
        spawn(async move {
            let name = file.name();
            match file.read_bytes().await {
                Ok(bytes) => load_upload(workspace, name, bytes.to_vec()).await,
                Err(e) => error!("Failed to read {name}: {e}"),
            }
        });
    };

    let show_info = workspace.read().show_info();
    let counts = {
        let ws = workspace.read();
        (ws.drawn().len(), ws.uploaded().len(), ws.wfs_features().len())
    };

    rsx! {
        div {
            class: "app",
            tabindex: "0",
            onkeydown: move |evt: Event<KeyboardData>| {
                if let Key::Character(c) = evt.key() {
                    if c == "h" || c == "H" || c == "?" {
                        let open = *show_help.peek();
                        show_help.set(!open);
                    }
                }
            },

            div { class: "header",
                h1 { "Polygon Tools" }
                span { class: "feature-counts",
                    "{counts.0} drawn · {counts.1} uploaded · {counts.2} WFS"
                }
                button {
                    class: "secondary",
                    onclick: move |_| show_help.set(true),
                    "Help"
                }
            }

            div { class: "sidebar",
                DrawControls { mode, sketch, on_shape }
                Toolbar {
                    base_layer,
                    mode,
                    show_info,
                    on_action,
                    on_upload,
                }
            }

            MapView {
                workspace,
                viewport,
                base_layer,
                mode,
                sketch,
                on_shape,
                on_map_click,
            }

            HelpOverlay { show: show_help }
        }
    }
}
