use crate::auth::{self, LoginError, Role};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{repo_err, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use tracing::{info, warn};

fn handle_session_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let role_raw = match required_str(req, "role") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(role) = Role::parse(&role_raw) else {
        return err(
            &req.id,
            "bad_params",
            "Please choose a valid role.",
            Some(json!({ "role": role_raw })),
        );
    };
    let username = req
        .params
        .get("username")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let password = req
        .params
        .get("password")
        .and_then(|v| v.as_str())
        .unwrap_or("");

    match auth::login(&state.config.auth, state.repo.as_ref(), role, username, password) {
        Ok(session) => {
            info!(role = ?session.role, student_id = ?session.student_id, "login");
            let result = json!(session);
            state.session = Some(session);
            ok(&req.id, result)
        }
        Err(LoginError::Repo(e)) => repo_err(req, e),
        Err(e) => {
            warn!(role = ?role, "login rejected");
            err(&req.id, "login_failed", e.to_string(), None)
        }
    }
}

fn handle_session_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let had = state.session.take().is_some();
    ok(&req.id, json!({ "loggedOut": had }))
}

fn handle_session_current(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "session": state.session }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.login" => Some(handle_session_login(state, req)),
        "session.logout" => Some(handle_session_logout(state, req)),
        "session.current" => Some(handle_session_current(state, req)),
        _ => None,
    }
}
