//! Data types used by the calculation pipeline.

use serde::{Deserialize, Serialize};

/// A single validated data row from the source text, before grade resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based line number in the source text.
    pub line: usize,
    pub name: String,
    pub grade: String,
    pub credits: f64,
}

/// One resolved course record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseEntry {
    pub name: String,
    /// Grade token as entered.
    pub grade: String,
    pub credits: f64,
    pub grade_point: f64,
}

impl CourseEntry {
    /// A blank row as produced by "add course".
    pub fn blank() -> Self {
        Self {
            name: String::new(),
            grade: String::new(),
            credits: 0.0,
            grade_point: 0.0,
        }
    }
}

/// Aggregate view over a set of course entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CgpaResult {
    pub cgpa: f64,
    pub total_credits: f64,
    pub courses: Vec<CourseEntry>,
}

impl CgpaResult {
    /// The starting point for manual entry: no courses, zero totals.
    pub fn empty() -> Self {
        Self {
            cgpa: 0.0,
            total_credits: 0.0,
            courses: Vec::new(),
        }
    }
}
