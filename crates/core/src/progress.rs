//! Progress arithmetic shared by the batch importer and its observers.

use serde::{Deserialize, Serialize};

/// A progress report: `current` of `total` rows committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportProgress {
    pub current: usize,
    pub total: usize,
    /// `round(current / total * 100)`, capped at 100.
    pub percent: u8,
}

impl ImportProgress {
    pub fn new(current: usize, total: usize) -> Self {
        Self {
            current,
            total,
            percent: percent_of(current, total),
        }
    }

    /// Translate a report from one run into the session-wide frame.
    ///
    /// `start_from` is the number of rows committed by earlier runs of the
    /// same session and `session_total` the size of the original selection.
    pub fn offset(self, start_from: usize, session_total: usize) -> Self {
        Self::new(start_from + self.current, session_total)
    }
}

/// Integer percentage, rounded half up. Zero totals report 0.
pub fn percent_of(current: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (current as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Final outcome of an import session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Rows that remain persisted when the session ends.
    pub imported_count: usize,
    /// Size of the original selection.
    pub total: usize,
    /// Set when the session ended before every selected row was kept.
    pub partial: bool,
    /// Message of the insert failure that halted the session, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportSummary {
    /// Rows of the selection that did not end up persisted.
    pub fn left_out(&self) -> usize {
        self.total.saturating_sub(self.imported_count)
    }
}
