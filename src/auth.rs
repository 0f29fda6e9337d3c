use crate::config::AuthConfig;
use crate::repo::{RepoError, Repository};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "student" => Some(Role::Student),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("Invalid Admin credentials.")]
    BadAdminCredentials,
    #[error("Student ID not found.")]
    UnknownStudent,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Admins match the configured credentials; students log in by id alone.
pub fn login(
    config: &AuthConfig,
    repo: Option<&Repository>,
    role: Role,
    username: &str,
    password: &str,
) -> Result<Session, LoginError> {
    let username = username.trim();
    match role {
        Role::Admin => {
            if username == config.admin_username && password.trim() == config.admin_password {
                Ok(Session {
                    role,
                    student_id: None,
                })
            } else {
                Err(LoginError::BadAdminCredentials)
            }
        }
        Role::Student => {
            let Some(repo) = repo else {
                return Err(LoginError::UnknownStudent);
            };
            match repo.get_student(username)? {
                Some(s) => Ok(Session {
                    role,
                    student_id: Some(s.student_id),
                }),
                None => Err(LoginError::UnknownStudent),
            }
        }
    }
}

/// What a data method touches, for access checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access<'a> {
    /// Reads scoped to one student record.
    ReadStudent(&'a str),
    /// Roster-wide reads and every write.
    AdminOnly,
}

pub fn is_allowed(session: Option<&Session>, access: Access<'_>) -> bool {
    let Some(session) = session else {
        return false;
    };
    match (session.role, access) {
        (Role::Admin, _) => true,
        (Role::Student, Access::ReadStudent(id)) => session.student_id.as_deref() == Some(id),
        (Role::Student, Access::AdminOnly) => false,
    }
}
