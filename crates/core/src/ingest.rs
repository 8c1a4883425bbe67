//! File ingestor: turns an uploaded file into an [`ImportResult`].
//!
//! Spreadsheets are read with `calamine` (first sheet only), CSV with the
//! `csv` crate, and plain text with a small separator-sniffing splitter.
//! Nothing here returns an error to the caller: unsupported formats, empty
//! files and decode failures all come back as a normally-shaped result with
//! a single displayable message.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::{Deserialize, Serialize};

use crate::messages::Locale;
use crate::normalizer::{
    normalize_header, normalize_row, FIELD_PLATFORM, FIELD_RATING, FIELD_STATUS, FIELD_TITLE,
};
use crate::row::{ImportResult, ImportedRow};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// File extensions accepted by the ingestor (lower-case, without the dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xls", "csv", "txt"];

/// Canonical headers whose presence on the first line of a text file marks
/// that line as a header row.
const TEXT_HEADER_MARKERS: &[&str] = &[FIELD_TITLE, FIELD_STATUS, FIELD_RATING, FIELD_PLATFORM];

/// Separator precedence used when sniffing a header line.
const SEPARATOR_PRECEDENCE: &[char] = &['\t', ';', ','];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Source format derived from a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    Spreadsheet,
    Csv,
    Text,
}

impl FileFormat {
    /// Derive the format from an extension (case-insensitive).
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "xlsx" | "xls" => Some(Self::Spreadsheet),
            "csv" => Some(Self::Csv),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }

    /// Derive the format from the text after the last `.` of a file name.
    pub fn from_filename(filename: &str) -> Option<Self> {
        Self::from_extension(&extension_of(filename))
    }
}

/// Failures while decoding a file. Never escapes [`ingest_bytes`].
#[derive(Debug, thiserror::Error)]
enum IngestError {
    #[error("{0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("{0}")]
    Csv(#[from] csv::Error),

    #[error("invalid UTF-8 text: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("workbook has no sheets")]
    NoSheet,
}

/// Header row plus data rows, before normalization.
#[derive(Debug, Default)]
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse a file's bytes into normalized rows.
pub fn ingest_bytes(filename: &str, bytes: &[u8], locale: Locale) -> ImportResult {
    let extension = extension_of(filename);
    let Some(format) = FileFormat::from_extension(&extension) else {
        return ImportResult::failed(locale.unsupported_format(&extension));
    };

    let table = match format {
        FileFormat::Spreadsheet => read_spreadsheet(bytes),
        FileFormat::Csv => read_csv(bytes),
        FileFormat::Text => read_text(bytes, locale),
    };

    match table {
        Ok(Parsed::Table(table)) if table.rows.is_empty() => {
            ImportResult::failed(locale.empty_file())
        }
        Ok(Parsed::Table(table)) => normalize_table(table, locale),
        Ok(Parsed::Result(result)) => result,
        Err(e) => ImportResult::failed(locale.read_failure(&e.to_string())),
    }
}

/// Lower-cased text after the last `.`; empty when there is no dot.
pub fn extension_of(filename: &str) -> String {
    match filename.rfind('.') {
        Some(pos) => filename[pos + 1..].to_ascii_lowercase(),
        None => String::new(),
    }
}

/// Pick a field separator from a header line: tab, then `;`, then `,`.
pub fn sniff_separator(line: &str) -> Option<char> {
    SEPARATOR_PRECEDENCE
        .iter()
        .copied()
        .find(|sep| line.contains(*sep))
}

/// CSV delimiter for a header line. Text inside double quotes is ignored.
pub fn sniff_csv_delimiter(line: &str) -> char {
    let mut quoted = false;
    let unquoted: String = line
        .chars()
        .filter(|c| {
            if *c == '"' {
                quoted = !quoted;
                return false;
            }
            !quoted
        })
        .collect();
    sniff_separator(&unquoted).unwrap_or(',')
}

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

/// Text files may short-circuit to a finished result (header-less lists).
enum Parsed {
    Table(RawTable),
    Result(ImportResult),
}

fn read_spreadsheet(bytes: &[u8]) -> Result<Parsed, IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook.worksheet_range_at(0).ok_or(IngestError::NoSheet)??;

    let mut rows = range
        .rows()
        .map(|cells| cells.iter().map(cell_text).collect::<Vec<_>>())
        .filter(|cells| !is_blank_record(cells));

    let Some(headers) = rows.next() else {
        return Ok(Parsed::Table(RawTable::default()));
    };

    Ok(Parsed::Table(RawTable {
        headers,
        rows: rows.collect(),
    }))
}

fn read_csv(bytes: &[u8]) -> Result<Parsed, IngestError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let header_end = bytes.iter().position(|b| *b == b'\n').unwrap_or(bytes.len());
    let header_line = String::from_utf8_lossy(&bytes[..header_end]);
    let delimiter = sniff_csv_delimiter(&header_line);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_reader(bytes);

    let headers = reader.headers()?.iter().map(String::from).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let cells: Vec<String> = record?.iter().map(String::from).collect();
        if !is_blank_record(&cells) {
            rows.push(cells);
        }
    }

    Ok(Parsed::Table(RawTable { headers, rows }))
}

/// Plain text: one record per non-blank line.
///
/// Only the first line is inspected. If none of its normalized fields is a
/// header marker, every line (the first included) becomes a title-only row.
/// A first line that merely contains the word "title" or "status" is
/// therefore taken as a header.
fn read_text(bytes: &[u8], locale: Locale) -> Result<Parsed, IngestError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes)?;

    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    let Some(first) = lines.first() else {
        return Ok(Parsed::Table(RawTable::default()));
    };

    let separator = sniff_separator(first).unwrap_or('\t');
    let headers: Vec<String> = first.split(separator).map(String::from).collect();
    let has_header = headers
        .iter()
        .any(|h| TEXT_HEADER_MARKERS.contains(&normalize_header(h).as_str()));

    if !has_header {
        let rows: Vec<ImportedRow> = lines
            .iter()
            .map(|line| ImportedRow::titled(line.trim()))
            .collect();
        return Ok(Parsed::Result(ImportResult {
            rows,
            headers: vec![FIELD_TITLE.to_string()],
            errors: Vec::new(),
        }));
    }

    let rows = lines[1..]
        .iter()
        .map(|line| line.split(separator).map(|v| v.trim().to_string()).collect())
        .collect::<Vec<Vec<String>>>();

    if rows.is_empty() {
        // Header line with nothing under it.
        return Ok(Parsed::Result(ImportResult::failed(locale.empty_file())));
    }

    Ok(Parsed::Table(RawTable { headers, rows }))
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn normalize_table(table: RawTable, locale: Locale) -> ImportResult {
    let headers: Vec<String> = table.headers.iter().map(|h| normalize_header(h)).collect();

    let mut present: Vec<String> = Vec::new();
    for header in &headers {
        if !header.is_empty() && !present.contains(header) {
            present.push(header.clone());
        }
    }

    let mut rows = Vec::with_capacity(table.rows.len());
    let mut errors = Vec::new();

    for (index, cells) in table.rows.into_iter().enumerate() {
        let fields = headers
            .iter()
            .zip(cells)
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, value)| (header.clone(), value));

        match normalize_row(fields, index, locale) {
            Ok(row) => rows.push(row),
            Err(warning) => errors.push(warning),
        }
    }

    ImportResult {
        rows,
        headers: present,
        errors,
    }
}

/// Render a spreadsheet cell as text. Integral floats drop the `.0`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn is_blank_record(cells: &[String]) -> bool {
    cells.iter().all(|cell| cell.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
