use crate::error::{CgpaError, Result};

/// Highest grade point on the scale.
pub const MAX_GRADE_POINT: f64 = 4.0;

/// Letter grades and their grade points, best first.
///
/// | Grade  | Points |
/// |--------|--------|
/// | A+, A  | 4.0    |
/// | A-     | 3.7    |
/// | B+     | 3.3    |
/// | B      | 3.0    |
/// | B-     | 2.7    |
/// | C+     | 2.3    |
/// | C      | 2.0    |
/// | C-     | 1.7    |
/// | D+     | 1.3    |
/// | D      | 1.0    |
/// | F      | 0.0    |
static GRADE_POINTS: &[(&str, f64)] = &[
    ("A+", 4.0),
    ("A", 4.0),
    ("A-", 3.7),
    ("B+", 3.3),
    ("B", 3.0),
    ("B-", 2.7),
    ("C+", 2.3),
    ("C", 2.0),
    ("C-", 1.7),
    ("D+", 1.3),
    ("D", 1.0),
    ("F", 0.0),
];

/// Converts a grade token into a grade point on the 4.0 scale.
///
/// Numeric tokens within `[0.0, 4.0]` pass through unchanged so that
/// pre-computed grade points can be fed back in. Anything else must be a
/// letter grade from the table above.
///
/// # Errors
///
/// Returns [`CgpaError::InvalidGrade`] when the token is neither.
pub fn resolve(token: &str) -> Result<f64> {
    let normalized = token.trim().to_uppercase();

    if let Ok(n) = normalized.parse::<f64>() {
        if n.is_finite() && (0.0..=MAX_GRADE_POINT).contains(&n) {
            return Ok(n);
        }
    }

    GRADE_POINTS
        .iter()
        .find(|(letter, _)| *letter == normalized)
        .map(|&(_, points)| points)
        .ok_or(CgpaError::InvalidGrade {
            token: normalized,
            line: None,
        })
}

/// Maps a grade point (typically a CGPA) back to the letter it reaches.
pub fn letter_for(points: f64) -> &'static str {
    match points {
        p if p >= 4.0 => "A",
        p if p >= 3.7 => "A-",
        p if p >= 3.3 => "B+",
        p if p >= 3.0 => "B",
        p if p >= 2.7 => "B-",
        p if p >= 2.3 => "C+",
        p if p >= 2.0 => "C",
        p if p >= 1.7 => "C-",
        p if p >= 1.3 => "D+",
        p if p >= 1.0 => "D",
        _ => "F",
    }
}
