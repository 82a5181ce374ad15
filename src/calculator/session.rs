//! # Editing Session
//!
//! A mutable course list seeded from a [`CgpaResult`], edited by the user and
//! re-aggregated on demand.
//!
//! - Entries live in an append-only arena addressed by [`EntryId`]; the arena
//!   is never compacted, so ids handed to the UI stay valid for the session.
//! - Display order is kept separately; "add course" prepends to it.
//! - Exclusion is a soft delete: the entry stays in the arena.
//! - Edits never recompute derived fields. `grade_point`, `cgpa` and
//!   `total_credits` only change on [`Session::recalculate`].

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::calculator::grade::{MAX_GRADE_POINT, resolve};
use crate::calculator::types::{CgpaResult, CourseEntry};
use crate::calculator::utility::{is_valid_credits, weighted_mean};
use crate::error::{CgpaError, Result};

/// Name given to synthetic bulk-GPA entries.
pub const BULK_ENTRY_NAME: &str = "Bulk CGPA Entry";

/// Stable handle to an entry for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntryId(pub usize);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// A single field change applied by [`Session::edit`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEdit {
    Name(String),
    Grade(String),
    /// Stored as given; NaN or non-positive values are rejected at recalculate.
    Credits(f64),
}

/// Why an entry failed validation during a recalculate pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryError {
    InvalidCredits,
    InvalidGrade,
}

impl std::fmt::Display for EntryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryError::InvalidCredits => f.write_str("Invalid credits"),
            EntryError::InvalidGrade => f.write_str("Invalid grade"),
        }
    }
}

/// Outcome of a recalculate pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Recalculation {
    /// Aggregate refreshed.
    Applied { cgpa: f64, total_credits: f64 },
    /// At least one entry failed; the previous aggregate stands.
    Rejected(BTreeMap<EntryId, EntryError>),
}

/// Ticket for a deferred recalculate. Only the most recent ticket runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecalcTicket(u64);

/// A row of the visible course table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleEntry<'a> {
    pub id: EntryId,
    #[serde(flatten)]
    pub entry: &'a CourseEntry,
    pub edited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<EntryError>,
}

/// Serializable picture of a session as the user sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView<'a> {
    pub cgpa: f64,
    pub total_credits: f64,
    pub recalculating: bool,
    pub courses: Vec<VisibleEntry<'a>>,
}

#[derive(Debug)]
pub struct Session {
    entries: Vec<CourseEntry>,
    order: Vec<EntryId>,
    excluded: BTreeSet<EntryId>,
    edited: BTreeSet<EntryId>,
    errors: BTreeMap<EntryId, EntryError>,
    cgpa: f64,
    total_credits: f64,
    generation: u64,
    pending: Option<RecalcTicket>,
}

impl Session {
    /// Starts a session from a computed result, keeping its course order.
    pub fn new(result: CgpaResult) -> Self {
        let order = (0..result.courses.len()).map(EntryId).collect();
        Self {
            entries: result.courses,
            order,
            excluded: BTreeSet::new(),
            edited: BTreeSet::new(),
            errors: BTreeMap::new(),
            cgpa: result.cgpa,
            total_credits: result.total_credits,
            generation: 0,
            pending: None,
        }
    }

    /// Starts an empty session for manual entry.
    pub fn manual() -> Self {
        Self::new(CgpaResult::empty())
    }

    pub fn cgpa(&self) -> f64 {
        self.cgpa
    }

    pub fn total_credits(&self) -> f64 {
        self.total_credits
    }

    pub fn get(&self, id: EntryId) -> Option<&CourseEntry> {
        self.entries.get(id.0)
    }

    pub fn is_excluded(&self, id: EntryId) -> bool {
        self.excluded.contains(&id)
    }

    pub fn is_edited(&self, id: EntryId) -> bool {
        self.edited.contains(&id)
    }

    /// Per-entry errors from the last recalculate pass.
    pub fn errors(&self) -> &BTreeMap<EntryId, EntryError> {
        &self.errors
    }

    /// Non-excluded entries in display order.
    pub fn visible(&self) -> impl Iterator<Item = VisibleEntry<'_>> + '_ {
        self.order
            .iter()
            .filter(|id| !self.excluded.contains(*id))
            .map(|&id| VisibleEntry {
                id,
                entry: &self.entries[id.0],
                edited: self.edited.contains(&id),
                error: self.errors.get(&id).copied(),
            })
    }

    /// Snapshot of the current aggregate and visible courses.
    pub fn snapshot(&self) -> CgpaResult {
        CgpaResult {
            cgpa: self.cgpa,
            total_credits: self.total_credits,
            courses: self.visible().map(|v| v.entry.clone()).collect(),
        }
    }

    /// Applies a field edit in place. Derived values are left stale.
    ///
    /// Returns `false` when `id` does not exist.
    pub fn edit(&mut self, id: EntryId, edit: FieldEdit) -> bool {
        let Some(entry) = self.entries.get_mut(id.0) else {
            warn!(%id, "Edit for unknown entry");
            return false;
        };

        match edit {
            FieldEdit::Name(name) => entry.name = name,
            FieldEdit::Grade(grade) => entry.grade = grade,
            FieldEdit::Credits(credits) => entry.credits = credits,
        }
        self.edited.insert(id);
        debug!(%id, "Entry edited");
        true
    }

    /// Adds a blank course at the top of the table.
    pub fn add_course(&mut self) -> EntryId {
        let id = self.push(CourseEntry::blank());
        self.order.insert(0, id);
        debug!(%id, "Blank course added");
        id
    }

    /// Appends a synthetic entry representing `credits` already earned at `cgpa`.
    ///
    /// # Errors
    ///
    /// Returns [`CgpaError::BulkEntry`] when credits are not positive or the
    /// CGPA lies outside `[0, 4.0]`.
    pub fn add_bulk(&mut self, credits: f64, cgpa: f64) -> Result<EntryId> {
        if !is_valid_credits(credits) {
            return Err(CgpaError::BulkEntry(
                "Credits must be a positive number".into(),
            ));
        }
        if !cgpa.is_finite() || !(0.0..=MAX_GRADE_POINT).contains(&cgpa) {
            return Err(CgpaError::BulkEntry("CGPA must be between 0 and 4.0".into()));
        }

        let id = self.push(CourseEntry {
            name: BULK_ENTRY_NAME.to_string(),
            grade: two_decimals(cgpa),
            credits,
            grade_point: cgpa,
        });
        self.order.push(id);
        debug!(%id, credits, cgpa, "Bulk entry added");
        Ok(id)
    }

    /// Soft-deletes an entry. Returns `false` when `id` does not exist.
    pub fn exclude(&mut self, id: EntryId) -> bool {
        if id.0 >= self.entries.len() {
            warn!(%id, "Exclude for unknown entry");
            return false;
        }
        self.excluded.insert(id);
        debug!(%id, "Entry excluded");
        true
    }

    /// Validates every included entry and, if all pass, recomputes the aggregate.
    ///
    /// All entries are checked even after a failure so that every bad row is
    /// reported at once.
    pub fn recalculate(&mut self) -> Recalculation {
        let mut errors = BTreeMap::new();
        let mut resolved = Vec::new();

        for &id in &self.order {
            if self.excluded.contains(&id) {
                continue;
            }
            let entry = &self.entries[id.0];

            if !is_valid_credits(entry.credits) {
                errors.insert(id, EntryError::InvalidCredits);
                continue;
            }
            match resolve(&entry.grade) {
                Ok(grade_point) => resolved.push((id, grade_point)),
                Err(_) => {
                    errors.insert(id, EntryError::InvalidGrade);
                }
            }
        }

        if !errors.is_empty() {
            warn!(failed = errors.len(), "Recalculate rejected");
            self.errors = errors.clone();
            return Recalculation::Rejected(errors);
        }

        for &(id, grade_point) in &resolved {
            self.entries[id.0].grade_point = grade_point;
        }

        let (cgpa, total_credits) = weighted_mean(resolved.iter().map(|&(id, gp)| {
            (self.entries[id.0].credits, gp)
        }));

        self.cgpa = cgpa;
        self.total_credits = total_credits;
        self.errors.clear();
        self.edited.clear();

        info!(cgpa, total_credits, courses = resolved.len(), "Recalculated");
        Recalculation::Applied {
            cgpa,
            total_credits,
        }
    }

    /// Requests a deferred recalculate. A newer request supersedes any
    /// outstanding one.
    pub fn request_recalculate(&mut self) -> RecalcTicket {
        self.generation += 1;
        let ticket = RecalcTicket(self.generation);
        if self.pending.replace(ticket).is_some() {
            debug!(generation = self.generation, "Superseding pending recalculate");
        }
        ticket
    }

    pub fn is_recalculating(&self) -> bool {
        self.pending.is_some()
    }

    /// Runs a deferred recalculate against the state as it is now.
    ///
    /// Returns `None` for a superseded ticket.
    pub fn complete_recalculate(&mut self, ticket: RecalcTicket) -> Option<Recalculation> {
        if self.pending != Some(ticket) {
            debug!(?ticket, "Dropping superseded recalculate");
            return None;
        }
        self.pending = None;
        Some(self.recalculate())
    }

    /// Current totals and the visible rows with their ids, edit marks and
    /// errors.
    pub fn view(&self) -> SessionView<'_> {
        SessionView {
            cgpa: self.cgpa,
            total_credits: self.total_credits,
            recalculating: self.is_recalculating(),
            courses: self.visible().collect(),
        }
    }

    fn push(&mut self, entry: CourseEntry) -> EntryId {
        let id = EntryId(self.entries.len());
        self.entries.push(entry);
        self.edited.insert(id);
        id
    }
}

/// Formats to two decimals with halves rounded up, so `3.625` reads `3.63`.
fn two_decimals(value: f64) -> String {
    format!("{:.2}", (value * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::aggregate::calculate;

    fn seeded() -> Session {
        Session::new(calculate("Course,Grade,Credits\nCS1,A,3\nCS2,B,4\n").unwrap())
    }

    #[test]
    fn test_new_session_keeps_result() {
        let session = seeded();
        assert_eq!(session.total_credits(), 7.0);
        let names: Vec<_> = session.visible().map(|v| v.entry.name.clone()).collect();
        assert_eq!(names, ["CS1", "CS2"]);
        assert!(session.errors().is_empty());
    }

    #[test]
    fn test_edit_defers_recompute() {
        let mut session = seeded();
        let before = session.cgpa();

        assert!(session.edit(EntryId(1), FieldEdit::Grade("A".into())));
        assert_eq!(session.cgpa(), before);
        assert_eq!(session.get(EntryId(1)).unwrap().grade_point, 3.0);
        assert!(session.is_edited(EntryId(1)));

        let outcome = session.recalculate();
        assert_eq!(
            outcome,
            Recalculation::Applied {
                cgpa: 4.0,
                total_credits: 7.0
            }
        );
        assert_eq!(session.get(EntryId(1)).unwrap().grade_point, 4.0);
        assert!(!session.is_edited(EntryId(1)));
    }

    #[test]
    fn test_edit_unknown_entry() {
        let mut session = seeded();
        assert!(!session.edit(EntryId(9), FieldEdit::Name("X".into())));
        assert!(!session.exclude(EntryId(9)));
    }

    #[test]
    fn test_invalid_grade_rejects_whole_pass() {
        let mut session = seeded();
        let (cgpa, credits) = (session.cgpa(), session.total_credits());

        session.edit(EntryId(0), FieldEdit::Grade("Z".into()));
        session.edit(EntryId(1), FieldEdit::Credits(5.0));

        match session.recalculate() {
            Recalculation::Rejected(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors.get(&EntryId(0)), Some(&EntryError::InvalidGrade));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(session.cgpa(), cgpa);
        assert_eq!(session.total_credits(), credits);
        assert_eq!(session.errors().len(), 1);
        // Edits stay pending until a successful pass.
        assert!(session.is_edited(EntryId(1)));
    }

    #[test]
    fn test_all_failures_collected() {
        let mut session = seeded();
        session.edit(EntryId(0), FieldEdit::Credits(f64::NAN));
        session.edit(EntryId(1), FieldEdit::Grade("?".into()));

        let Recalculation::Rejected(errors) = session.recalculate() else {
            panic!("expected rejection");
        };
        assert_eq!(errors.get(&EntryId(0)), Some(&EntryError::InvalidCredits));
        assert_eq!(errors.get(&EntryId(1)), Some(&EntryError::InvalidGrade));
    }

    #[test]
    fn test_errors_cleared_after_successful_pass() {
        let mut session = seeded();
        session.edit(EntryId(0), FieldEdit::Grade("Z".into()));
        session.recalculate();
        assert!(!session.errors().is_empty());

        session.edit(EntryId(0), FieldEdit::Grade("B".into()));
        assert!(matches!(session.recalculate(), Recalculation::Applied { .. }));
        assert!(session.errors().is_empty());
    }

    #[test]
    fn test_excluded_entry_ignored_even_if_invalid() {
        let mut session = seeded();
        session.edit(EntryId(1), FieldEdit::Credits(-2.0));
        assert!(session.exclude(EntryId(1)));

        assert_eq!(
            session.recalculate(),
            Recalculation::Applied {
                cgpa: 4.0,
                total_credits: 3.0
            }
        );
        assert_eq!(session.visible().count(), 1);
        assert!(session.get(EntryId(1)).is_some());
    }

    #[test]
    fn test_add_course_prepends_blank_entry() {
        let mut session = seeded();
        let id = session.add_course();
        assert_eq!(id, EntryId(2));

        let first = session.visible().next().unwrap();
        assert_eq!(first.id, id);
        assert_eq!(first.entry, &CourseEntry::blank());
        assert!(first.edited);

        // A blank course fails validation until filled in.
        let Recalculation::Rejected(errors) = session.recalculate() else {
            panic!("expected rejection");
        };
        assert_eq!(errors.keys().copied().collect::<Vec<_>>(), [id]);

        session.edit(id, FieldEdit::Name("PHY101".into()));
        session.edit(id, FieldEdit::Grade("C".into()));
        session.edit(id, FieldEdit::Credits(3.0));
        let Recalculation::Applied { total_credits, .. } = session.recalculate() else {
            panic!("expected success");
        };
        assert_eq!(total_credits, 10.0);
    }

    #[test]
    fn test_add_course_does_not_shift_existing_ids() {
        let mut session = seeded();
        session.exclude(EntryId(0));
        session.add_course();
        assert!(session.is_excluded(EntryId(0)));
        assert_eq!(session.get(EntryId(0)).unwrap().name, "CS1");
    }

    #[test]
    fn test_bulk_entry_on_empty_session() {
        let mut session = Session::manual();
        assert_eq!(session.cgpa(), 0.0);
        assert_eq!(session.total_credits(), 0.0);

        let id = session.add_bulk(10.0, 3.5).unwrap();
        let entry = session.get(id).unwrap();
        assert_eq!(entry.name, BULK_ENTRY_NAME);
        assert_eq!(entry.grade, "3.50");
        assert_eq!(entry.grade_point, 3.5);

        assert_eq!(
            session.recalculate(),
            Recalculation::Applied {
                cgpa: 3.5,
                total_credits: 10.0
            }
        );
    }

    #[test]
    fn test_bulk_entry_half_rounds_up() {
        let mut session = Session::manual();
        let id = session.add_bulk(10.0, 3.625).unwrap();
        assert_eq!(session.get(id).unwrap().grade, "3.63");

        let Recalculation::Applied {
            cgpa,
            total_credits,
        } = session.recalculate()
        else {
            panic!("expected success");
        };
        assert!((cgpa - 3.63).abs() < 1e-12);
        assert_eq!(total_credits, 10.0);
        assert_eq!(session.get(id).unwrap().grade_point, 3.63);
    }

    #[test]
    fn test_two_decimals() {
        assert_eq!(two_decimals(3.5), "3.50");
        assert_eq!(two_decimals(0.125), "0.13");
        assert_eq!(two_decimals(4.0), "4.00");
        assert_eq!(two_decimals(0.0), "0.00");
    }

    #[test]
    fn test_view_serializes_rows() {
        let mut session = seeded();
        session.edit(EntryId(0), FieldEdit::Grade("Z".into()));
        session.recalculate();
        session.exclude(EntryId(1));

        let value = serde_json::to_value(session.view()).unwrap();
        assert_eq!(value["totalCredits"], 7.0);
        assert_eq!(value["recalculating"], false);
        let rows = value["courses"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], 0);
        assert_eq!(rows[0]["name"], "CS1");
        assert_eq!(rows[0]["gradePoint"], 4.0);
        assert_eq!(rows[0]["edited"], true);
        assert_eq!(rows[0]["error"], "InvalidGrade");
    }

    #[test]
    fn test_bulk_entry_appended_last() {
        let mut session = seeded();
        let id = session.add_bulk(20.0, 3.0).unwrap();
        assert_eq!(session.visible().last().unwrap().id, id);
    }

    #[test]
    fn test_bulk_entry_validation() {
        let mut session = Session::manual();
        let err = session.add_bulk(0.0, 3.0).unwrap_err();
        assert_eq!(err.to_string(), "Credits must be a positive number");
        let err = session.add_bulk(10.0, 4.1).unwrap_err();
        assert_eq!(err.to_string(), "CGPA must be between 0 and 4.0");
        assert!(session.add_bulk(10.0, f64::NAN).is_err());
        assert_eq!(session.visible().count(), 0);
    }

    #[test]
    fn test_recalculate_all_excluded_yields_zero() {
        let mut session = seeded();
        session.exclude(EntryId(0));
        session.exclude(EntryId(1));
        assert_eq!(
            session.recalculate(),
            Recalculation::Applied {
                cgpa: 0.0,
                total_credits: 0.0
            }
        );
    }

    #[test]
    fn test_deferred_recalculate_sees_later_edits() {
        let mut session = seeded();
        let ticket = session.request_recalculate();
        assert!(session.is_recalculating());

        session.exclude(EntryId(1));
        let outcome = session.complete_recalculate(ticket).unwrap();
        assert_eq!(
            outcome,
            Recalculation::Applied {
                cgpa: 4.0,
                total_credits: 3.0
            }
        );
        assert!(!session.is_recalculating());
    }

    #[test]
    fn test_last_request_wins() {
        let mut session = seeded();
        let first = session.request_recalculate();
        let second = session.request_recalculate();

        assert!(session.complete_recalculate(first).is_none());
        assert!(session.is_recalculating());
        assert!(session.complete_recalculate(second).is_some());
        assert!(session.complete_recalculate(second).is_none());
    }

    #[test]
    fn test_snapshot_hides_excluded() {
        let mut session = seeded();
        session.exclude(EntryId(0));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.courses.len(), 1);
        assert_eq!(snapshot.courses[0].name, "CS2");
    }
}
