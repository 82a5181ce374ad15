//! Grade resolution, CGPA aggregation and the editing session.
//!
//! Parsed rows flow through [`grade::resolve`] into [`aggregate::aggregate`],
//! whose result seeds a [`session::Session`] that the user edits and
//! recalculates.

pub mod aggregate;
pub mod grade;
pub mod session;
pub mod types;
pub mod utility;
