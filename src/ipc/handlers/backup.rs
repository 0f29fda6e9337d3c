use crate::auth::Access;
use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{authorize, repo, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};

fn handle_export_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = authorize(state, req, Access::AdminOnly) {
        return resp;
    }
    let out_path = match required_str(req, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(resp) => return resp,
    };
    let repo = match repo(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match backup::export_workspace_bundle(repo, &out_path) {
        Ok(summary) => {
            info!(out = %out_path.display(), students = summary.student_count, "bundle exported");
            ok(
                &req.id,
                json!({
                    "bundleFormat": summary.bundle_format,
                    "entryCount": summary.entry_count,
                    "studentCount": summary.student_count,
                    "dbSha256": summary.db_sha256,
                }),
            )
        }
        Err(e) => err(&req.id, "backup_failed", format!("{e:#}"), None),
    }
}

fn handle_import_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = authorize(state, req, Access::AdminOnly) {
        return resp;
    }
    let in_path = match required_str(req, "inPath") {
        Ok(v) => PathBuf::from(v),
        Err(resp) => return resp,
    };
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    // The database file is swapped underneath, so release the connection
    // and reopen afterwards whatever the outcome. The session survives.
    let session = state.session.take();
    state.close_workspace();
    let imported = backup::import_workspace_bundle(&in_path, &workspace, &state.config.store);
    let reopened = state.open_workspace(&workspace);
    state.session = session;

    if let Err(e) = reopened {
        return err(&req.id, "db_open_failed", format!("{e:#}"), None);
    }
    match imported {
        Ok(summary) => {
            info!(input = %in_path.display(), format = %summary.bundle_format_detected, "bundle imported");
            ok(
                &req.id,
                json!({
                    "bundleFormatDetected": summary.bundle_format_detected,
                    "workspacePath": workspace.to_string_lossy(),
                }),
            )
        }
        Err(e) => {
            warn!(input = %in_path.display(), error = %format!("{e:#}"), "bundle import rejected");
            err(&req.id, "backup_failed", format!("{e:#}"), None)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspaceBundle" => Some(handle_export_bundle(state, req)),
        "backup.importWorkspaceBundle" => Some(handle_import_bundle(state, req)),
        _ => None,
    }
}
