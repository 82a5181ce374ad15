use std::collections::HashMap;

use tracing::debug;

use crate::calculator::grade::resolve;
use crate::calculator::types::{CgpaResult, CourseEntry, RawRow};
use crate::calculator::utility::{locale_cmp, weighted_mean};
use crate::error::{CgpaError, Result};
use crate::parser::parse;

/// Aggregates parsed rows into a single [`CgpaResult`].
///
/// Rows sharing a course name collapse to the one with the strictly highest
/// grade point; on a tie the first row seen is kept. The surviving courses are
/// returned sorted by name.
///
/// # Errors
///
/// Propagates [`CgpaError::InvalidGrade`] tagged with the row's line, and
/// returns [`CgpaError::EmptyResult`] when nothing with credits survives.
pub fn aggregate(rows: &[RawRow]) -> Result<CgpaResult> {
    let mut best: HashMap<&str, usize> = HashMap::new();
    let mut courses: Vec<CourseEntry> = Vec::new();

    for row in rows {
        let grade_point = resolve(&row.grade).map_err(|e| e.at_line(row.line))?;
        let entry = CourseEntry {
            name: row.name.clone(),
            grade: row.grade.clone(),
            credits: row.credits,
            grade_point,
        };

        match best.get(row.name.as_str()) {
            Some(&slot) => {
                if grade_point > courses[slot].grade_point {
                    debug!(
                        course = %row.name,
                        line = row.line,
                        replaced = courses[slot].grade_point,
                        grade_point,
                        "Keeping better duplicate"
                    );
                    courses[slot] = entry;
                }
            }
            None => {
                best.insert(&row.name, courses.len());
                courses.push(entry);
            }
        }
    }

    let (cgpa, total_credits) =
        weighted_mean(courses.iter().map(|c| (c.credits, c.grade_point)));

    if courses.is_empty() || total_credits == 0.0 {
        return Err(CgpaError::EmptyResult);
    }

    courses.sort_by(|a, b| locale_cmp(&a.name, &b.name));

    debug!(
        courses = courses.len(),
        duplicates = rows.len() - courses.len(),
        total_credits,
        cgpa,
        "Aggregated courses"
    );

    Ok(CgpaResult {
        cgpa,
        total_credits,
        courses,
    })
}

/// Parses raw delimited text and aggregates it in one step.
#[tracing::instrument(skip(raw), fields(bytes = raw.len()))]
pub fn calculate(raw: &str) -> Result<CgpaResult> {
    let rows = parse(raw)?;
    aggregate(&rows)
}
