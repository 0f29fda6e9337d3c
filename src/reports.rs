use crate::gpa::{self, GpaResult};
use crate::model::Student;
use serde::Serialize;

pub const NOT_AVAILABLE: &str = "N/A";

/// One line of the all-students table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterRow {
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub department: String,
    pub year: String,
    pub courses: String,
    pub marks: String,
    pub gpa: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardCourse {
    pub name: String,
    pub grade: f64,
    pub letter: String,
}

/// Single-student view: profile, GPA label and per-course lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentCard {
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub department: String,
    pub year: String,
    pub gpa: Option<GpaResult>,
    pub gpa_label: String,
    pub courses: Vec<CardCourse>,
    pub text: String,
}

/// `85.0`, `72.5`: whole grades keep one decimal like the stored floats.
pub fn format_grade(g: f64) -> String {
    if g.fract() == 0.0 {
        format!("{:.1}", g)
    } else {
        format!("{}", g)
    }
}

fn gpa_label(gpa: Option<&GpaResult>) -> String {
    gpa.map(GpaResult::label)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn student_gpa(s: &Student) -> Option<GpaResult> {
    gpa::calculate(s.courses.iter().map(|c| c.grade))
}

pub fn roster_row(s: &Student) -> RosterRow {
    let gpa = student_gpa(s);
    RosterRow {
        student_id: s.student_id.clone(),
        name: s.name.clone(),
        email: s.email.clone(),
        phone: s.phone.clone(),
        department: s.department.clone(),
        year: s.year.clone(),
        courses: s
            .courses
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        marks: s
            .courses
            .iter()
            .map(|c| format_grade(c.grade))
            .collect::<Vec<_>>()
            .join(", "),
        gpa: gpa_label(gpa.as_ref()),
    }
}

pub fn roster(students: &[Student]) -> Vec<RosterRow> {
    students.iter().map(roster_row).collect()
}

pub fn student_card(s: &Student) -> StudentCard {
    let gpa = student_gpa(s);
    let label = gpa_label(gpa.as_ref());

    let mut text = format!(
        "Student ID: {}\nName: {}\nEmail: {}\nPhone: {}\nDepartment: {}\nYear: {}\nGPA: {}\n\nCourses & Grades:\n",
        s.student_id, s.name, s.email, s.phone, s.department, s.year, label
    );
    for c in &s.courses {
        text.push_str(&format!("  - {}: {}\n", c.name, format_grade(c.grade)));
    }

    StudentCard {
        student_id: s.student_id.clone(),
        name: s.name.clone(),
        email: s.email.clone(),
        phone: s.phone.clone(),
        department: s.department.clone(),
        year: s.year.clone(),
        gpa,
        gpa_label: label,
        courses: s
            .courses
            .iter()
            .map(|c| CardCourse {
                name: c.name.clone(),
                grade: c.grade,
                letter: gpa::grade_to_unit_and_letter(c.grade).1.to_string(),
            })
            .collect(),
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Course;

    fn student(courses: &[(&str, f64)]) -> Student {
        Student {
            student_id: "S1".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: "555".into(),
            department: "CS".into(),
            year: "2".into(),
            courses: courses
                .iter()
                .map(|(n, g)| Course {
                    name: n.to_string(),
                    grade: *g,
                })
                .collect(),
        }
    }

    #[test]
    fn roster_row_joins_courses_and_marks() {
        let row = roster_row(&student(&[("Math", 85.0), ("Science", 95.5)]));
        assert_eq!(row.courses, "Math, Science");
        assert_eq!(row.marks, "85.0, 95.5");
        // units 9 + 10 = 9.5, A and A+ tie -> A first
        assert_eq!(row.gpa, "9.5 (A)");
    }

    #[test]
    fn empty_student_shows_not_available() {
        let row = roster_row(&student(&[]));
        assert_eq!(row.gpa, "N/A");
        assert_eq!(row.courses, "");
        let card = student_card(&student(&[]));
        assert_eq!(card.gpa, None);
        assert!(card.text.contains("GPA: N/A"));
    }

    #[test]
    fn card_lists_courses_with_letters() {
        let card = student_card(&student(&[("Math", 92.0), ("Art", 39.0)]));
        assert_eq!(card.courses[0].letter, "A+");
        assert_eq!(card.courses[1].letter, "F");
        assert_eq!(card.gpa_label, "5.0 (A+)");
        assert!(card.text.ends_with("  - Math: 92.0\n  - Art: 39.0\n"));
    }
}
