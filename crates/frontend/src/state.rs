use dioxus::prelude::*;
use polygon_tools_shared::workspace::Workspace;

/// Swap the workspace for the result of one transition.
pub fn apply(mut workspace: Signal<Workspace>, transition: impl FnOnce(Workspace) -> Workspace) {
    let mut ws = workspace.write();
    let current = std::mem::take(&mut *ws);
    *ws = transition(current);
}
