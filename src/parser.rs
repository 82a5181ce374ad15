//! Row parser for comma-delimited course data.
//!
//! The format is deliberately simple: a header row naming the course, grade
//! and credit columns, then one course per line. Fields are split on bare
//! commas; quoted fields are not supported.

use tracing::debug;

use crate::calculator::types::RawRow;
use crate::calculator::utility::is_valid_credits;
use crate::error::{CgpaError, Result};

/// Positions of the required columns, resolved once from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub course: usize,
    pub grade: usize,
    pub credits: usize,
}

impl ColumnLayout {
    /// Finds the first column whose trimmed, lowercased name contains
    /// "course", "grade" and "credit" respectively.
    pub fn from_header(header: &str) -> Result<Self> {
        let headers: Vec<String> = header
            .split(',')
            .map(|h| h.trim().to_lowercase())
            .collect();

        let find = |needle: &str| headers.iter().position(|h| h.contains(needle));

        match (find("course"), find("grade"), find("credit")) {
            (Some(course), Some(grade), Some(credits)) => Ok(Self {
                course,
                grade,
                credits,
            }),
            _ => Err(CgpaError::Format(
                "CSV file must have columns for course, grade, and credits (header names can vary)"
                    .into(),
            )),
        }
    }
}

/// Parses raw delimited text into validated rows.
///
/// # Errors
///
/// Returns [`CgpaError::Format`] when there is no header plus data row or the
/// header lacks a required column, and [`CgpaError::InvalidData`] for the
/// first row with an empty name, empty grade, or non-positive credits.
pub fn parse(raw: &str) -> Result<Vec<RawRow>> {
    let lines: Vec<&str> = raw.trim().split('\n').collect();
    if lines.len() < 2 {
        return Err(CgpaError::Format(
            "CSV file must have a header row and at least one data row".into(),
        ));
    }

    let layout = ColumnLayout::from_header(lines[0])?;
    debug!(?layout, line_count = lines.len(), "Resolved column layout");

    let mut rows = Vec::with_capacity(lines.len() - 1);

    for (idx, line) in lines.iter().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        rows.push(parse_row(line, idx + 1, &layout)?);
    }

    debug!(rows = rows.len(), "Parsed data rows");
    Ok(rows)
}

fn parse_row(line: &str, line_no: usize, layout: &ColumnLayout) -> Result<RawRow> {
    let values: Vec<&str> = line.split(',').map(str::trim).collect();
    let field = |i: usize| values.get(i).copied().unwrap_or("");

    let name = field(layout.course);
    let grade = field(layout.grade);

    if name.is_empty() {
        return Err(CgpaError::invalid_data(line_no, name, "Course name is required"));
    }

    if grade.is_empty() {
        return Err(CgpaError::invalid_data(line_no, name, "Grade is required"));
    }

    let credits = parse_number(field(layout.credits));
    if !is_valid_credits(credits) {
        return Err(CgpaError::invalid_data(
            line_no,
            name,
            "Credits must be a positive number",
        ));
    }

    Ok(RawRow {
        line: line_no,
        name: name.to_string(),
        grade: grade.to_string(),
        credits,
    })
}

/// Reads a number the way a lenient float parse does: the longest numeric
/// prefix counts (`"3 credits"` is 3), anything else is NaN.
pub fn parse_number(value: &str) -> f64 {
    let s = value.trim();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;

    for (i, c) in s.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '+' | '-' if seen_exp && s[..i].ends_with(['e', 'E']) => {}
            '0'..='9' => {
                seen_digit = true;
                end = i + 1;
                continue;
            }
            '.' if !seen_dot && !seen_exp => seen_dot = true,
            'e' | 'E' if seen_digit && !seen_exp => seen_exp = true,
            _ => break,
        }
    }

    if !seen_digit {
        return f64::NAN;
    }
    s[..end].parse().unwrap_or(f64::NAN)
}
