//! Error types shared by the parser, aggregator and session.

use thiserror::Error;

/// Failures surfaced to the user by the calculation pipeline.
///
/// Every variant renders as a user-facing message; callers are expected to
/// display `to_string()` verbatim.
#[derive(Debug, Error)]
pub enum CgpaError {
    /// Malformed header or overall structure.
    #[error("{0}")]
    Format(String),

    /// A data row with a missing or out-of-range field.
    #[error("Line {line}: {reason}{}", course_suffix(.course))]
    InvalidData {
        line: usize,
        course: Option<String>,
        reason: String,
    },

    /// A grade token that is neither a known letter nor a 0-4 number.
    #[error("{}Invalid grade: {token}", line_prefix(.line))]
    InvalidGrade { token: String, line: Option<usize> },

    #[error("No valid courses found in the CSV")]
    EmptyResult,

    /// Bulk CGPA input rejected before it reached the course list.
    #[error("{0}")]
    BulkEntry(String),

    #[error("Failed to read file: {0}")]
    Read(String),
}

impl CgpaError {
    pub(crate) fn invalid_data(line: usize, course: &str, reason: &str) -> Self {
        CgpaError::InvalidData {
            line,
            course: (!course.is_empty()).then(|| course.to_string()),
            reason: reason.to_string(),
        }
    }

    /// Attaches a source line to a grade error raised without one.
    pub(crate) fn at_line(self, line: usize) -> Self {
        match self {
            CgpaError::InvalidGrade { token, line: None } => CgpaError::InvalidGrade {
                token,
                line: Some(line),
            },
            other => other,
        }
    }
}

impl From<std::io::Error> for CgpaError {
    fn from(e: std::io::Error) -> Self {
        CgpaError::Read(e.to_string())
    }
}

impl From<calamine::Error> for CgpaError {
    fn from(e: calamine::Error) -> Self {
        CgpaError::Read(e.to_string())
    }
}

fn course_suffix(course: &Option<String>) -> String {
    match course {
        Some(name) => format!(" for {}", name),
        None => String::new(),
    }
}

fn line_prefix(line: &Option<usize>) -> String {
    match line {
        Some(n) => format!("Line {}: ", n),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, CgpaError>;
