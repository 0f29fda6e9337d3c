use crate::auth::Access;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::authorize;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

/// With enforcement on, only an admin session may switch or drop the open
/// workspace. Before anyone logs in there is nothing to protect yet.
fn guard_workspace(state: &AppState, req: &Request) -> Result<(), serde_json::Value> {
    if state.session.is_none() {
        return Ok(());
    }
    authorize(state, req, Access::AdminOnly)
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = guard_workspace(state, req) {
        return resp;
    }
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match state.open_workspace(&path) {
        Ok(()) => {
            info!(workspace = %path.display(), "workspace selected");
            ok(
                &req.id,
                json!({
                    "workspacePath": path.to_string_lossy(),
                    "collection": state.config.store.collection,
                }),
            )
        }
        Err(e) => {
            warn!(workspace = %path.display(), error = %e, "workspace open failed");
            err(&req.id, "db_open_failed", format!("{e:#}"), None)
        }
    }
}

fn handle_workspace_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = guard_workspace(state, req) {
        return resp;
    }
    let closed = state.close_workspace();
    ok(&req.id, json!({ "closed": closed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "workspace.close" => Some(handle_workspace_close(state, req)),
        _ => None,
    }
}
