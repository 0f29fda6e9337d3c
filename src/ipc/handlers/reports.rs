use crate::auth::Access;
use crate::ipc::error::ok;
use crate::ipc::helpers::{authorize, repo, repo_err, required_str};
use crate::ipc::types::{AppState, Request};
use crate::reports;
use serde_json::json;

fn handle_reports_roster(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = authorize(state, req, Access::AdminOnly) {
        return resp;
    }
    let repo = match repo(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match repo.get_all_students() {
        Ok(students) => ok(&req.id, json!({ "rows": reports::roster(&students) })),
        Err(e) => repo_err(req, e),
    }
}

fn handle_reports_student_card(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = authorize(state, req, Access::ReadStudent(&student_id)) {
        return resp;
    }
    let repo = match repo(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match repo.get_student(&student_id) {
        Ok(student) => ok(
            &req.id,
            json!({ "card": student.as_ref().map(reports::student_card) }),
        ),
        Err(e) => repo_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.roster" => Some(handle_reports_roster(state, req)),
        "reports.studentCard" => Some(handle_reports_student_card(state, req)),
        _ => None,
    }
}
