//! Transaction view: tabbed, paginated, sortable table model.
//!
//! Everything here is derived from the adapter's list on demand; the only
//! state kept is what the user chose (tab, page, sort, selection, dialogs).
//! Pagination is plain slicing of the server-ordered list. Sorting reorders
//! the rows of the current page only.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Category, Transaction};

pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Id,
    Amount,
    Description,
    Date,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sort {
    pub key: SortKey,
    pub dir: SortDir,
}

/// Which modal, if any, is open.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dialog {
    #[default]
    Closed,
    /// Add/edit form. `editing` holds the record id for an edit.
    Form { editing: Option<String> },
    ConfirmDelete { id: String },
}

// =============================================================================
// DERIVATIONS
// =============================================================================

#[must_use]
pub fn filter_by_category(transactions: &[Transaction], category: Category) -> Vec<Transaction> {
    transactions.iter().filter(|t| t.category == category).cloned().collect()
}

/// Sum of amounts (magnitudes).
#[must_use]
pub fn total(transactions: &[Transaction]) -> Decimal {
    transactions.iter().map(|t| t.amount).sum()
}

/// Sum with expenses counted negative.
#[must_use]
pub fn signed_total(transactions: &[Transaction]) -> Decimal {
    transactions.iter().map(Transaction::signed_amount).sum()
}

#[must_use]
pub fn page_count(len: usize) -> usize {
    len.div_ceil(PAGE_SIZE)
}

/// Clamp `page` into `[0, page_count)`; 0 when there are no pages.
#[must_use]
pub fn clamp_page(page: usize, len: usize) -> usize {
    page.min(page_count(len).saturating_sub(1))
}

/// Records `[page * PAGE_SIZE, min((page + 1) * PAGE_SIZE, len))`.
#[must_use]
pub fn page_slice(transactions: &[Transaction], page: usize) -> &[Transaction] {
    let start = page.saturating_mul(PAGE_SIZE).min(transactions.len());
    let end = start.saturating_add(PAGE_SIZE).min(transactions.len());
    &transactions[start..end]
}

pub fn sort_rows(rows: &mut [Transaction], sort: Sort) {
    rows.sort_by(|a, b| {
        let ord = match sort.key {
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::Amount => a.amount.cmp(&b.amount),
            SortKey::Description => a.description.to_lowercase().cmp(&b.description.to_lowercase()),
            SortKey::Date => a.date.cmp(&b.date),
        };
        match sort.dir {
            SortDir::Asc => ord,
            SortDir::Desc => ord.reverse(),
        }
    });
}

// =============================================================================
// VIEW
// =============================================================================

/// What the table shows for one tab and page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewPage {
    pub tab: Category,
    pub page: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub count: usize,
    pub total: Decimal,
    pub signed_total: Decimal,
    pub sort: Option<Sort>,
    pub rows: Vec<Transaction>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionView {
    pub tab: Category,
    pub page: usize,
    pub sort: Option<Sort>,
    pub selected: Option<String>,
    pub dialog: Dialog,
}

impl TransactionView {
    /// Switch tabs. The page resets to the first one.
    pub fn set_tab(&mut self, tab: Category) {
        if self.tab != tab {
            self.tab = tab;
            self.page = 0;
        }
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    pub fn set_sort(&mut self, sort: Option<Sort>) {
        self.sort = sort;
    }

    pub fn open_create(&mut self) {
        self.selected = None;
        self.dialog = Dialog::Form { editing: None };
    }

    pub fn open_edit(&mut self, id: impl Into<String>) {
        let id = id.into();
        self.selected = Some(id.clone());
        self.dialog = Dialog::Form { editing: Some(id) };
    }

    pub fn open_delete(&mut self, id: impl Into<String>) {
        let id = id.into();
        self.selected = Some(id.clone());
        self.dialog = Dialog::ConfirmDelete { id };
    }

    /// Close whatever is open and forget the selection.
    pub fn close_dialog(&mut self) {
        self.selected = None;
        self.dialog = Dialog::Closed;
    }

    /// Derive the visible page from the full list. Also clamps the stored
    /// page index, since the list may have shrunk.
    pub fn derive(&mut self, transactions: &[Transaction]) -> ViewPage {
        let filtered = filter_by_category(transactions, self.tab);
        self.page = clamp_page(self.page, filtered.len());

        let mut rows = page_slice(&filtered, self.page).to_vec();
        if let Some(sort) = self.sort {
            sort_rows(&mut rows, sort);
        }

        ViewPage {
            tab: self.tab,
            page: self.page,
            page_count: page_count(filtered.len()),
            page_size: PAGE_SIZE,
            count: filtered.len(),
            total: total(&filtered),
            signed_total: signed_total(&filtered),
            sort: self.sort,
            rows,
        }
    }
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
