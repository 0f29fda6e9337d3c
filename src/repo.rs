use crate::config::StoreConfig;
use crate::gpa::{self, GpaResult};
use crate::model::{Course, NewStudent, Student};
use crate::store::{GradeStore, StoreError};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("Student ID already exists: {0}")]
    DuplicateKey(String),
    #[error("Student not found: {0}")]
    NotFound(String),
    #[error("Grade must be between 0 and 100, got {0}")]
    InvalidGrade(f64),
    #[error("store unavailable: {0}")]
    ConnectionFailure(String),
    #[error("{0}")]
    Corrupt(String),
    #[error("{0}")]
    Query(String),
}

impl RepoError {
    /// Stable wire code for the sidecar protocol.
    pub fn code(&self) -> &'static str {
        match self {
            RepoError::DuplicateKey(_) => "duplicate_key",
            RepoError::NotFound(_) => "not_found",
            RepoError::InvalidGrade(_) => "invalid_grade",
            RepoError::ConnectionFailure(_) => "connection_failed",
            RepoError::Corrupt(_) => "db_corrupt",
            RepoError::Query(_) => "db_query_failed",
        }
    }
}

impl From<StoreError> for RepoError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateKey(id) => RepoError::DuplicateKey(id),
            StoreError::NotFound(id) => RepoError::NotFound(id),
            StoreError::ConnectionFailure(_) => RepoError::ConnectionFailure(e.to_string()),
            StoreError::Corrupt { .. } => RepoError::Corrupt(e.to_string()),
            StoreError::Encode(_) | StoreError::Query(_) => RepoError::Query(e.to_string()),
        }
    }
}

pub fn validate_grade(grade: f64) -> Result<(), RepoError> {
    // NaN falls outside the range too.
    if !(0.0..=100.0).contains(&grade) {
        return Err(RepoError::InvalidGrade(grade));
    }
    Ok(())
}

/// The five operations frontends call, over one long-lived store connection.
pub struct Repository {
    store: GradeStore,
}

impl Repository {
    pub fn new(store: GradeStore) -> Self {
        Self { store }
    }

    pub fn open(workspace: &Path, config: &StoreConfig) -> anyhow::Result<Self> {
        let store = GradeStore::open(workspace, config)?;
        info!(
            workspace = %workspace.display(),
            collection = %config.collection,
            "grade store opened"
        );
        Ok(Self::new(store))
    }

    pub fn store(&self) -> &GradeStore {
        &self.store
    }

    pub fn add_student(&self, student: NewStudent) -> Result<Student, RepoError> {
        // Fast path only; the primary key decides under concurrent adds.
        if self.store.find(&student.student_id)?.is_some() {
            warn!(student_id = %student.student_id, "duplicate student rejected");
            return Err(RepoError::DuplicateKey(student.student_id));
        }
        let created = self.store.insert(student).map_err(|e| {
            if let StoreError::DuplicateKey(id) = &e {
                warn!(student_id = %id, "duplicate student rejected at insert");
            }
            RepoError::from(e)
        })?;
        info!(student_id = %created.student_id, "student added");
        Ok(created)
    }

    pub fn add_course(
        &self,
        student_id: &str,
        course_name: &str,
        grade: f64,
    ) -> Result<(), RepoError> {
        if let Err(e) = validate_grade(grade) {
            warn!(student_id, grade, "grade out of range");
            return Err(e);
        }
        let course = Course {
            name: course_name.to_string(),
            grade,
        };
        self.store.append_course(student_id, &course)?;
        info!(student_id, course = course_name, grade, "course added");
        Ok(())
    }

    pub fn get_student(&self, student_id: &str) -> Result<Option<Student>, RepoError> {
        debug!(student_id, "get student");
        Ok(self.store.find(student_id)?)
    }

    pub fn get_all_students(&self) -> Result<Vec<Student>, RepoError> {
        let all = self.store.list_all()?;
        debug!(count = all.len(), "list students");
        Ok(all)
    }

    /// `None` when the student is missing or has no courses.
    pub fn calculate_gpa(&self, student_id: &str) -> Result<Option<GpaResult>, RepoError> {
        Ok(self
            .store
            .find(student_id)?
            .and_then(|s| gpa::calculate(s.courses.iter().map(|c| c.grade))))
    }

    pub fn close(self) -> Result<(), RepoError> {
        self.store.close()?;
        info!("grade store closed");
        Ok(())
    }
}
