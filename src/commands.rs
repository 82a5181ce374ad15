//! Line-oriented commands understood by the interactive session.
//!
//! Each input line is split on whitespace and parsed with clap in multicall
//! mode, so the first word names the command and `help` comes for free.

use clap::{Parser, Subcommand, ValueEnum};

use crate::calculator::session::{EntryId, FieldEdit};
use crate::parser::parse_number;

#[derive(Debug, Parser)]
#[command(multicall = true, disable_help_flag = true)]
struct SessionLine {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// List courses and totals
    #[command(visible_alias = "ls")]
    Show,
    /// Add a blank course at the top
    Add,
    /// Add credits already earned at a known CGPA
    Bulk {
        #[arg(allow_negative_numbers = true)]
        credits: f64,
        #[arg(allow_negative_numbers = true)]
        cgpa: f64,
    },
    /// Change one field of a course
    Edit {
        id: usize,
        #[arg(value_enum)]
        field: Field,
        /// New value; words are joined with single spaces
        #[arg(num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Hide a course from the table and totals
    #[command(visible_alias = "rm")]
    Exclude { id: usize },
    /// Validate and recompute the CGPA
    #[command(visible_alias = "recalculate")]
    Recalc,
    /// Print the current session as JSON
    Json,
    /// Leave the session
    #[command(visible_alias = "exit")]
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Field {
    #[value(alias = "course")]
    Name,
    Grade,
    #[value(alias = "credit")]
    Credits,
}

impl Command {
    /// For `edit`, the target entry and the field change it carries.
    pub fn field_edit(&self) -> Option<(EntryId, FieldEdit)> {
        let Command::Edit { id, field, value } = self else {
            return None;
        };
        let value = value.join(" ");
        let edit = match field {
            Field::Name => FieldEdit::Name(value),
            Field::Grade => FieldEdit::Grade(value),
            Field::Credits => FieldEdit::Credits(credits_value(&value)),
        };
        Some((EntryId(*id), edit))
    }
}

/// Parses one input line. Returns `Ok(None)` for blank lines.
///
/// # Errors
///
/// Returns clap's error for unknown commands, bad arguments, and `help`
/// (whose rendered text is the help message).
pub fn parse_command(line: &str) -> Result<Option<Command>, clap::Error> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(None);
    }
    SessionLine::try_parse_from(words).map(|parsed| Some(parsed.command))
}

/// Empty input means zero credits, like clearing a numeric field.
fn credits_value(value: &str) -> f64 {
    if value.is_empty() {
        0.0
    } else {
        parse_number(value)
    }
}
