//! Preview and selection over a parsed file.
//!
//! A [`Preview`] owns one [`ImportResult`] and the set of row indices the
//! operator has chosen. It starts with every row selected and is thrown
//! away whole when another file is picked.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::CoreError;
use crate::row::{ImportResult, ImportedRow};

/// Rows shown per preview page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: usize = 100;

/// One row of a preview page.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewRow<'a> {
    /// Position in `ImportResult::rows`.
    pub index: usize,
    pub selected: bool,
    pub row: &'a ImportedRow,
}

#[derive(Debug, Clone)]
pub struct Preview {
    result: ImportResult,
    selected: BTreeSet<usize>,
    page_size: usize,
}

impl Preview {
    /// Wrap a parse result with every row selected.
    pub fn new(result: ImportResult) -> Self {
        Self::with_page_size(result, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(result: ImportResult, page_size: usize) -> Self {
        let selected = (0..result.rows.len()).collect();
        Self {
            result,
            selected,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn result(&self) -> &ImportResult {
        &self.result
    }

    pub fn row_count(&self) -> usize {
        self.result.rows.len()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// `ceil(row_count / page_size)`; zero when there are no rows.
    pub fn page_count(&self) -> usize {
        self.row_count().div_ceil(self.page_size)
    }

    /// Rows of a 1-based page.
    pub fn page(&self, page: usize) -> Result<Vec<PreviewRow<'_>>, CoreError> {
        if page == 0 || page > self.page_count().max(1) {
            return Err(CoreError::Validation(format!(
                "Page {page} is out of range (1..={})",
                self.page_count().max(1)
            )));
        }
        let start = (page - 1) * self.page_size;
        Ok(self
            .result
            .rows
            .iter()
            .enumerate()
            .skip(start)
            .take(self.page_size)
            .map(|(index, row)| PreviewRow {
                index,
                selected: self.selected.contains(&index),
                row,
            })
            .collect())
    }

    /// Flip one row's selection. Returns the new state of that row.
    pub fn toggle(&mut self, index: usize) -> Result<bool, CoreError> {
        self.check_index(index)?;
        if self.selected.remove(&index) {
            Ok(false)
        } else {
            self.selected.insert(index);
            Ok(true)
        }
    }

    /// Select or deselect every row.
    pub fn set_all(&mut self, selected: bool) {
        if selected {
            self.selected = (0..self.row_count()).collect();
        } else {
            self.selected.clear();
        }
    }

    /// Replace the selection with exactly `indices`.
    pub fn select_only(&mut self, indices: &[usize]) -> Result<(), CoreError> {
        for index in indices {
            self.check_index(*index)?;
        }
        self.selected = indices.iter().copied().collect();
        Ok(())
    }

    /// Whether the "select all" checkbox shows as checked.
    pub fn all_selected(&self) -> bool {
        self.row_count() > 0 && self.selected.len() == self.row_count()
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Selected rows in file order.
    pub fn selected_rows(&self) -> Vec<ImportedRow> {
        self.selected
            .iter()
            .filter_map(|i| self.result.rows.get(*i).cloned())
            .collect()
    }

    /// Import can only be confirmed with a non-empty selection.
    pub fn can_confirm(&self) -> bool {
        !self.selected.is_empty()
    }

    fn check_index(&self, index: usize) -> Result<(), CoreError> {
        if index >= self.row_count() {
            return Err(CoreError::Validation(format!(
                "Row index {index} is out of range (0..{})",
                self.row_count()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(n: usize) -> ImportResult {
        ImportResult {
            rows: (0..n).map(|i| ImportedRow::titled(format!("Item {i}"))).collect(),
            headers: vec!["title".to_string()],
            errors: Vec::new(),
        }
    }

    #[test]
    fn new_preview_selects_every_row() {
        let preview = Preview::new(result_with(3));
        assert_eq!(preview.selected_count(), 3);
        assert!(preview.all_selected());
        assert!(preview.can_confirm());
    }

    #[test]
    fn page_count_is_ceiling() {
        assert_eq!(Preview::new(result_with(0)).page_count(), 0);
        assert_eq!(Preview::new(result_with(10)).page_count(), 1);
        assert_eq!(Preview::new(result_with(11)).page_count(), 2);
        assert_eq!(Preview::new(result_with(25)).page_count(), 3);
    }

    #[test]
    fn last_page_holds_the_remainder() {
        let preview = Preview::new(result_with(25));
        let page = preview.page(3).unwrap();
        assert_eq!(page.len(), 5);
        assert_eq!(page[0].index, 20);
        assert_eq!(page[0].row.title, "Item 20");
    }

    #[test]
    fn out_of_range_page_is_rejected() {
        let preview = Preview::new(result_with(5));
        assert!(preview.page(0).is_err());
        assert!(preview.page(2).is_err());
        // An empty preview still has a (blank) first page.
        assert!(Preview::new(result_with(0)).page(1).unwrap().is_empty());
    }

    #[test]
    fn toggle_updates_select_all_state() {
        let mut preview = Preview::new(result_with(3));
        assert!(!preview.toggle(1).unwrap());
        assert!(!preview.all_selected());
        assert_eq!(preview.selected_count(), 2);

        assert!(preview.toggle(1).unwrap());
        assert!(preview.all_selected());
    }

    #[test]
    fn toggle_out_of_range_is_rejected() {
        let mut preview = Preview::new(result_with(2));
        assert!(preview.toggle(2).is_err());
    }

    #[test]
    fn deselect_all_disables_confirm() {
        let mut preview = Preview::new(result_with(4));
        preview.set_all(false);
        assert_eq!(preview.selected_count(), 0);
        assert!(!preview.can_confirm());
        assert!(!preview.all_selected());

        preview.set_all(true);
        assert!(preview.all_selected());
    }

    #[test]
    fn selected_rows_keep_file_order() {
        let mut preview = Preview::new(result_with(5));
        preview.select_only(&[4, 0, 2]).unwrap();
        let titles: Vec<String> = preview.selected_rows().into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["Item 0", "Item 2", "Item 4"]);
    }

    #[test]
    fn select_only_validates_every_index() {
        let mut preview = Preview::new(result_with(2));
        assert!(preview.select_only(&[0, 9]).is_err());
        // Rejected input leaves the selection untouched.
        assert_eq!(preview.selected_count(), 2);
    }

    #[test]
    fn empty_result_is_never_all_selected() {
        let preview = Preview::new(result_with(0));
        assert!(!preview.all_selected());
        assert!(!preview.can_confirm());
    }
}
