use crate::auth::Access;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{authorize, repo, repo_err, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::NewStudent;
use serde_json::json;

const PROFILE_FIELDS: [&str; 6] = ["studentId", "name", "email", "phone", "department", "year"];

fn profile_value(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = authorize(state, req, Access::AdminOnly) {
        return resp;
    }
    let repo = match repo(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    let fields = PROFILE_FIELDS.map(|k| profile_value(req, k));
    let missing: Vec<&str> = PROFILE_FIELDS
        .iter()
        .zip(&fields)
        .filter(|(_, v)| v.is_none())
        .map(|(k, _)| *k)
        .collect();
    let [Some(student_id), Some(name), Some(email), Some(phone), Some(department), Some(year)] =
        fields
    else {
        return err(
            &req.id,
            "bad_params",
            "All fields are required",
            Some(json!({ "missing": missing })),
        );
    };
    let student = NewStudent {
        student_id,
        name,
        email,
        phone,
        department,
        year,
    };

    match repo.add_student(student) {
        Ok(s) => ok(
            &req.id,
            json!({
                "studentId": s.student_id,
                "message": "Student added successfully"
            }),
        ),
        Err(e) => repo_err(req, e),
    }
}

fn handle_students_get(state: &mut AppState, req: &Request) -> serde_json::Value {
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
        Ok(student) => ok(&req.id, json!({ "student": student })),
        Err(e) => repo_err(req, e),
    }
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = authorize(state, req, Access::AdminOnly) {
        return resp;
    }
    let repo = match repo(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match repo.get_all_students() {
        Ok(students) => ok(&req.id, json!({ "students": students })),
        Err(e) => repo_err(req, e),
    }
}

/// Accepts a JSON number or a numeric string, as typed into a form field.
fn parse_grade(v: Option<&serde_json::Value>) -> Option<f64> {
    let v = v?;
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
}

fn handle_courses_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = authorize(state, req, Access::AdminOnly) {
        return resp;
    }
    let repo = match repo(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let course_name = match required_str(req, "courseName") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(grade) = parse_grade(req.params.get("grade")) else {
        return err(&req.id, "bad_params", "grade must be a number", None);
    };

    match repo.add_course(&student_id, &course_name, grade) {
        Ok(()) => ok(
            &req.id,
            json!({
                "studentId": student_id,
                "message": "Course added successfully"
            }),
        ),
        Err(e) => repo_err(req, e),
    }
}

fn handle_gpa_calculate(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    match repo.calculate_gpa(&student_id) {
        Ok(gpa) => ok(&req.id, json!({ "gpa": gpa })),
        Err(e) => repo_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.create" => Some(handle_students_create(state, req)),
        "students.get" => Some(handle_students_get(state, req)),
        "students.list" => Some(handle_students_list(state, req)),
        "courses.add" => Some(handle_courses_add(state, req)),
        "gpa.calculate" => Some(handle_gpa_calculate(state, req)),
        _ => None,
    }
}
