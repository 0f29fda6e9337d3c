use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LetterGrade {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
    D,
    E,
    F,
}

impl LetterGrade {
    pub fn as_str(self) -> &'static str {
        match self {
            LetterGrade::APlus => "A+",
            LetterGrade::A => "A",
            LetterGrade::B => "B",
            LetterGrade::C => "C",
            LetterGrade::D => "D",
            LetterGrade::E => "E",
            LetterGrade::F => "F",
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percentage thresholds, evaluated top-down; anything below the last row is an F worth 0.
const GRADE_TABLE: [(f64, u32, LetterGrade); 6] = [
    (90.0, 10, LetterGrade::APlus),
    (80.0, 9, LetterGrade::A),
    (70.0, 8, LetterGrade::B),
    (60.0, 7, LetterGrade::C),
    (50.0, 6, LetterGrade::D),
    (40.0, 5, LetterGrade::E),
];

pub fn grade_to_unit_and_letter(grade: f64) -> (u32, LetterGrade) {
    GRADE_TABLE
        .iter()
        .find(|(min, _, _)| grade >= *min)
        .map(|&(_, unit, letter)| (unit, letter))
        .unwrap_or((0, LetterGrade::F))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpaResult {
    pub unit_gpa: f64,
    pub letter: LetterGrade,
}

impl GpaResult {
    /// `9.13 (A)` style label used by roster and card views.
    pub fn label(&self) -> String {
        format!("{} ({})", format_unit_gpa(self.unit_gpa), self.letter)
    }
}

/// Average of `units / count` rounded to 2 decimals, half up.
///
/// Works in integer hundredths so a `.xx5` average (e.g. 73/8 = 9.125) is
/// never nudged either way by binary float error.
pub fn round_half_up_hundredths(unit_sum: u64, count: u64) -> f64 {
    debug_assert!(count > 0);
    let hundredths = (unit_sum * 200 + count) / (2 * count);
    hundredths as f64 / 100.0
}

/// Renders a 2-decimal GPA keeping at least one fractional digit: `9.0`, `8.67`.
pub fn format_unit_gpa(v: f64) -> String {
    let s = format!("{:.2}", v);
    match s.strip_suffix('0') {
        Some(t) if !t.ends_with('.') => t.to_string(),
        _ => s,
    }
}

/// Returns `None` for an empty grade list; callers show "N/A".
pub fn calculate<I>(grades: I) -> Option<GpaResult>
where
    I: IntoIterator<Item = f64>,
{
    let mut unit_sum: u64 = 0;
    let mut count: u64 = 0;
    // First-seen order, so ties resolve to the earliest letter.
    let mut tally: Vec<(LetterGrade, usize)> = Vec::new();

    for g in grades {
        let (unit, letter) = grade_to_unit_and_letter(g);
        unit_sum += u64::from(unit);
        count += 1;
        match tally.iter_mut().find(|(l, _)| *l == letter) {
            Some((_, n)) => *n += 1,
            None => tally.push((letter, 1)),
        }
    }

    if count == 0 {
        return None;
    }

    let mut best = tally[0];
    for &(letter, n) in &tally[1..] {
        if n > best.1 {
            best = (letter, n);
        }
    }

    Some(GpaResult {
        unit_gpa: round_half_up_hundredths(unit_sum, count),
        letter: best.0,
    })
}
