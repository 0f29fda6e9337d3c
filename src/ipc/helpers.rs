use crate::auth::{self, Access};
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::repo::{RepoError, Repository};
use serde_json::json;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    let v = req
        .params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))?;
    if v.is_empty() {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{} must not be empty", key),
            None,
        ));
    }
    Ok(v)
}

pub fn repo<'a>(state: &'a AppState, req: &Request) -> Result<&'a Repository, serde_json::Value> {
    state
        .repo
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// No-op unless `auth.enforce` is on.
pub fn authorize(state: &AppState, req: &Request, access: Access<'_>) -> Result<(), serde_json::Value> {
    if !state.config.auth.enforce || auth::is_allowed(state.session.as_ref(), access) {
        return Ok(());
    }
    let message = if state.session.is_none() {
        "log in first"
    } else {
        "not permitted for this session"
    };
    Err(err(
        &req.id,
        "forbidden",
        message,
        Some(json!({ "method": req.method })),
    ))
}

pub fn repo_err(req: &Request, e: RepoError) -> serde_json::Value {
    let details = match &e {
        RepoError::DuplicateKey(id) | RepoError::NotFound(id) => Some(json!({ "studentId": id })),
        RepoError::InvalidGrade(g) if g.is_finite() => Some(json!({ "grade": g })),
        _ => None,
    };
    err(&req.id, e.code(), e.to_string(), details)
}
