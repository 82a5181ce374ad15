//! Output formatting and persistence for computed results.
//!
//! Supports pretty-printing, a JSON report, CSV export of courses, and the
//! downloadable template.

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::calculator::grade::letter_for;
use crate::calculator::session::VisibleEntry;
use crate::calculator::types::{CgpaResult, CourseEntry};

/// Example input offered to users who need a starting point.
pub const TEMPLATE_CSV: &str = "Course,Grade,Credits\nMAT130,A,3\nCSE115,B+,4\nENG103,A-,3";

pub const TEMPLATE_FILE_NAME: &str = "cgpa_template.csv";

/// Summary written by `--format json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report<'a> {
    pub generated_at: DateTime<Utc>,
    pub source: &'a str,
    pub cgpa: f64,
    pub letter_grade: &'static str,
    pub total_credits: f64,
    pub course_count: usize,
    pub courses: &'a [CourseEntry],
}

impl<'a> Report<'a> {
    pub fn new(source: &'a str, result: &'a CgpaResult) -> Self {
        Self {
            generated_at: Utc::now(),
            source,
            cgpa: result.cgpa,
            letter_grade: letter_for(result.cgpa),
            total_credits: result.total_credits,
            course_count: result.courses.len(),
            courses: &result.courses,
        }
    }
}

/// Logs a result using Rust's debug pretty-print format.
pub fn print_pretty(result: &CgpaResult) {
    debug!("{:#?}", result);
}

/// Serializes a report as pretty-printed JSON.
pub fn report_json(source: &str, result: &CgpaResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(&Report::new(source, result))?)
}

/// Appends every course of `result` as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_courses(path: &Path, result: &CgpaResult) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending course records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    for course in &result.courses {
        writer.serialize(course)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = result.courses.len(), "Courses exported");
    Ok(())
}

/// Writes [`TEMPLATE_CSV`] to `path`, replacing any existing file.
pub fn write_template(path: &Path) -> Result<()> {
    std::fs::write(path, TEMPLATE_CSV)?;
    info!(path = %path.display(), "Template written");
    Ok(())
}

/// Renders the summary header shown above a course table.
pub fn render_summary(cgpa: f64, total_credits: f64, course_count: usize) -> String {
    format!(
        "CGPA {:.2} ({})  |  {} credits  |  {} courses",
        cgpa,
        letter_for(cgpa),
        total_credits,
        course_count
    )
}

/// Renders a plain-text course table.
pub fn render_courses(courses: &[CourseEntry]) -> String {
    let mut out = format!("{:<24} {:>6} {:>8} {:>6}\n", "Course", "Grade", "Credits", "Points");
    for c in courses {
        let _ = writeln!(
            out,
            "{:<24} {:>6} {:>8} {:>6.2}",
            c.name, c.grade, c.credits, c.grade_point
        );
    }
    out
}

/// Renders the visible rows of an editing session, with ids, edit marks and
/// per-row errors.
pub fn render_session_rows<'a>(rows: impl Iterator<Item = VisibleEntry<'a>>) -> String {
    let mut out = format!(
        "{:>4}  {:<24} {:>6} {:>8} {:>6}\n",
        "Id", "Course", "Grade", "Credits", "Points"
    );
    for row in rows {
        let mark = if row.edited { "*" } else { " " };
        let _ = write!(
            out,
            "{:>4}{} {:<24} {:>6} {:>8} {:>6.2}",
            row.id, mark, row.entry.name, row.entry.grade, row.entry.credits, row.entry.grade_point
        );
        if let Some(error) = row.error {
            let _ = write!(out, "  <- {}", error);
        }
        out.push('\n');
    }
    out
}
