use chrono::{NaiveDate, TimeZone, Utc};

use super::*;

fn tx(n: i64, category: Category) -> Transaction {
    Transaction {
        id: format!("id{n:02}"),
        owner_id: "alice".into(),
        amount: Decimal::new(n, 0),
        description: format!("item {n}"),
        date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(n.unsigned_abs()),
        category,
        timestamp: Utc.timestamp_opt(1_700_000_000 - n, 0).unwrap(),
    }
}

/// `n` records alternating income/expense, newest first.
fn mixed(n: i64) -> Vec<Transaction> {
    (1..=n)
        .map(|i| tx(i, if i % 2 == 0 { Category::Expense } else { Category::Income }))
        .collect()
}

fn ids(rows: &[Transaction]) -> Vec<&str> {
    rows.iter().map(|t| t.id.as_str()).collect()
}

// =============================================================================
// derivations
// =============================================================================

#[test]
fn totals_count_only_the_category() {
    let all = mixed(6);
    let income = filter_by_category(&all, Category::Income);
    let expense = filter_by_category(&all, Category::Expense);

    assert_eq!(total(&income), Decimal::new(1 + 3 + 5, 0));
    assert_eq!(total(&expense), Decimal::new(2 + 4 + 6, 0));
    assert_eq!(signed_total(&expense), Decimal::new(-12, 0));
    assert_eq!(signed_total(&all), Decimal::new(9 - 12, 0));
}

#[test]
fn page_count_rounds_up() {
    assert_eq!(page_count(0), 0);
    assert_eq!(page_count(1), 1);
    assert_eq!(page_count(10), 1);
    assert_eq!(page_count(11), 2);
}

#[test]
fn page_slices_are_contiguous_and_short_at_the_end() {
    let all = mixed(23);
    assert_eq!(page_slice(&all, 0).len(), 10);
    assert_eq!(page_slice(&all, 1)[0].id, all[10].id);
    assert_eq!(ids(page_slice(&all, 2)), ids(&all[20..23]));
    assert!(page_slice(&all, 3).is_empty());
    assert!(page_slice(&all, usize::MAX).is_empty());
}

#[test]
fn clamp_page_stays_in_range() {
    assert_eq!(clamp_page(5, 0), 0);
    assert_eq!(clamp_page(5, 11), 1);
    assert_eq!(clamp_page(1, 11), 1);
}

#[test]
fn sort_orders_rows_by_key_and_direction() {
    let mut rows = vec![tx(3, Category::Income), tx(1, Category::Income), tx(2, Category::Income)];
    sort_rows(&mut rows, Sort { key: SortKey::Amount, dir: SortDir::Asc });
    assert_eq!(ids(&rows), ["id01", "id02", "id03"]);
    sort_rows(&mut rows, Sort { key: SortKey::Date, dir: SortDir::Desc });
    assert_eq!(ids(&rows), ["id03", "id02", "id01"]);
}

#[test]
fn description_sort_ignores_case() {
    let mut a = tx(1, Category::Income);
    a.description = "banana".into();
    let mut b = tx(2, Category::Income);
    b.description = "Apple".into();
    let mut rows = vec![a, b];
    sort_rows(&mut rows, Sort { key: SortKey::Description, dir: SortDir::Asc });
    assert_eq!(rows[0].description, "Apple");
}

// =============================================================================
// TransactionView
// =============================================================================

#[test]
fn defaults_to_income_first_page() {
    let mut view = TransactionView::default();
    let page = view.derive(&mixed(4));
    assert_eq!(page.tab, Category::Income);
    assert_eq!(page.page, 0);
    assert_eq!(ids(&page.rows), ["id01", "id03"]);
}

#[test]
fn page_is_clamped_when_list_shrinks() {
    let mut view = TransactionView::default();
    view.set_page(4);
    let page = view.derive(&mixed(30));
    assert_eq!(page.page_count, 2);
    assert_eq!(page.page, 1);
    assert_eq!(page.rows.len(), 5);
    assert_eq!(view.page, 1);
}

#[test]
fn switching_tab_resets_page() {
    let mut view = TransactionView::default();
    view.set_page(1);
    view.set_tab(Category::Expense);
    assert_eq!(view.page, 0);
    view.set_page(1);
    view.set_tab(Category::Expense);
    assert_eq!(view.page, 1);
}

#[test]
fn sorting_reorders_only_the_current_page() {
    let mut view = TransactionView::default();
    view.set_sort(Some(Sort { key: SortKey::Amount, dir: SortDir::Desc }));
    // 40 records: 20 income, two pages.
    let page = view.derive(&mixed(40));
    let amounts: Vec<_> = page.rows.iter().map(|t| t.amount).collect();
    assert_eq!(amounts.first(), Some(&Decimal::new(19, 0)));
    assert_eq!(amounts.last(), Some(&Decimal::new(1, 0)));
    assert_eq!(page.count, 20);
}

#[test]
fn dialogs_track_selection() {
    let mut view = TransactionView::default();
    view.open_edit("id07");
    assert_eq!(view.selected.as_deref(), Some("id07"));
    assert_eq!(view.dialog, Dialog::Form { editing: Some("id07".into()) });

    view.open_delete("id08");
    assert_eq!(view.dialog, Dialog::ConfirmDelete { id: "id08".into() });

    view.close_dialog();
    assert_eq!(view.selected, None);
    assert_eq!(view.dialog, Dialog::Closed);

    view.open_create();
    assert_eq!(view.dialog, Dialog::Form { editing: None });
}
