use serde::{Deserialize, Serialize};

/// One graded course on a student record. Field names are the stored shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub name: String,
    pub grade: f64,
}

/// A student document as persisted in the collection.
///
/// `courses` keeps chronological add order. Documents written by other tools
/// may carry extra fields; they are ignored on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub department: String,
    pub year: String,
    #[serde(default)]
    pub courses: Vec<Course>,
}

/// Profile fields supplied when a student is first created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub department: String,
    pub year: String,
}

impl From<NewStudent> for Student {
    fn from(s: NewStudent) -> Self {
        Student {
            student_id: s.student_id,
            name: s.name,
            email: s.email,
            phone: s.phone,
            department: s.department,
            year: s.year,
            courses: Vec::new(),
        }
    }
}
