//! Turns an input file into delimited text for the row parser.
//!
//! Plain text files are decoded as UTF-8. Workbooks are opened with calamine
//! and their first sheet is rendered to CSV, so both paths converge on
//! [`crate::parser::parse`].

use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use csv::WriterBuilder;
use tracing::{debug, info};

use crate::error::{CgpaError, Result};

/// File extensions handled as workbooks rather than text.
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Returns true when the path looks like a spreadsheet workbook.
pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|w| e.eq_ignore_ascii_case(w))
        })
        .unwrap_or(false)
}

/// Reads `path` and returns its contents as delimited text.
///
/// This is the only suspension point in the pipeline.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub async fn load_text(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    debug!(bytes = bytes.len(), "File read");

    if is_workbook(path) {
        workbook_to_csv(bytes)
    } else {
        Ok(decode_text(&bytes))
    }
}

/// Decodes text bytes, dropping a UTF-8 byte-order mark if present.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Renders the first sheet of a workbook as CSV text.
///
/// Rows whose cells are all empty are skipped.
pub fn workbook_to_csv(bytes: Vec<u8>) -> Result<String> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| CgpaError::Read("Workbook has no sheets".into()))?;

    let range = workbook.worksheet_range(&first)?;

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(Vec::new());

    let mut written = 0usize;
    for row in range.rows() {
        if row.iter().all(|cell| matches!(cell, Data::Empty)) {
            continue;
        }
        writer
            .write_record(row.iter().map(cell_text))
            .map_err(|e| CgpaError::Read(e.to_string()))?;
        written += 1;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CgpaError::Read(e.to_string()))?;

    info!(sheet = %first, rows = written, "Converted workbook sheet to CSV");
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}
