//! The normalized row shape produced by the ingestor and consumed by the
//! batch importer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ItemStatus
// ---------------------------------------------------------------------------

/// Tracking status of an imported media item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    #[default]
    Pending,
    Watching,
    Completed,
    Casual,
}

impl ItemStatus {
    /// Return the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Watching => "WATCHING",
            Self::Completed => "COMPLETED",
            Self::Casual => "CASUAL",
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ImportedRow
// ---------------------------------------------------------------------------

/// A normalized, not-yet-persisted record.
///
/// `title` is the only mandatory field and is never empty once a row has
/// been through the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportedRow {
    pub title: String,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,
    /// Columns the normalizer does not recognise, keyed by lower-cased header.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl ImportedRow {
    /// Build a row holding only a title, with every other field defaulted.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// ImportResult
// ---------------------------------------------------------------------------

/// Outcome of parsing one file.
///
/// Created once per file selection and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub rows: Vec<ImportedRow>,
    /// Normalized header names present in the file, in file order.
    pub headers: Vec<String>,
    /// Human-readable warnings: one per skipped row or file-level failure.
    pub errors: Vec<String>,
}

impl ImportResult {
    /// A result carrying no rows and a single file-level error.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            rows: Vec::new(),
            headers: Vec::new(),
            errors: vec![message.into()],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_upper_case() {
        let json = serde_json::to_string(&ItemStatus::Watching).unwrap();
        assert_eq!(json, "\"WATCHING\"");
        assert_eq!(ItemStatus::default(), ItemStatus::Pending);
    }

    #[test]
    fn titled_row_defaults() {
        let row = ImportedRow::titled("Dune");
        assert_eq!(row.title, "Dune");
        assert_eq!(row.status, ItemStatus::Pending);
        assert!(row.rating.is_none());
        assert!(row.genres.is_none());
    }

    #[test]
    fn extra_fields_flatten_into_row_json() {
        let mut row = ImportedRow::titled("Matrix");
        row.extra.insert("diretor".to_string(), "Wachowski".to_string());

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["title"], "Matrix");
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["diretor"], "Wachowski");
        assert!(json.get("rating").is_none());
    }

    #[test]
    fn failed_result_has_single_error() {
        let result = ImportResult::failed("boom");
        assert!(result.is_empty());
        assert_eq!(result.errors, vec!["boom".to_string()]);
    }
}
