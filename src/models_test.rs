use super::*;
use rust_decimal::Decimal;

fn sample() -> Transaction {
    Transaction {
        id: "abc".into(),
        owner_id: "owner-1".into(),
        amount: Decimal::new(12_550, 2),
        description: "invoice".into(),
        date: NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
        category: Category::Expense,
        timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
    }
}

// =============================================================================
// Category
// =============================================================================

#[test]
fn category_parse_is_case_insensitive() {
    assert_eq!(Category::parse("income"), Some(Category::Income));
    assert_eq!(Category::parse(" Expense "), Some(Category::Expense));
    assert_eq!(Category::parse("transfer"), None);
}

#[test]
fn category_serializes_upper_case() {
    assert_eq!(serde_json::to_string(&Category::Income).unwrap(), "\"INCOME\"");
    assert_eq!(serde_json::from_str::<Category>("\"EXPENSE\"").unwrap(), Category::Expense);
}

#[test]
fn expense_amount_is_signed_negative() {
    let tx = sample();
    assert_eq!(tx.signed_amount(), Decimal::new(-12_550, 2));
}

// =============================================================================
// Dates
// =============================================================================

#[test]
fn transaction_date_uses_day_month_year() {
    let json = serde_json::to_value(sample()).unwrap();
    assert_eq!(json["date"], "07-03-2024");
    assert_eq!(json["category"], "EXPENSE");
}

#[test]
fn transaction_rejects_iso_date() {
    let mut json = serde_json::to_value(sample()).unwrap();
    json["date"] = serde_json::json!("2024-03-07");
    assert!(serde_json::from_value::<Transaction>(json).is_err());
}

#[test]
fn parse_date_trims_input() {
    assert_eq!(parse_date(" 31-12-2023 "), NaiveDate::from_ymd_opt(2023, 12, 31));
    assert_eq!(parse_date("31-02-2023"), None);
}

// =============================================================================
// TransactionPatch
// =============================================================================

#[test]
fn patch_only_touches_given_fields() {
    let mut tx = sample();
    let before = tx.clone();
    let patch = TransactionPatch { description: Some("rent".into()), ..TransactionPatch::default() };
    patch.apply(&mut tx);

    assert_eq!(tx.description, "rent");
    assert_eq!(tx.amount, before.amount);
    assert_eq!(tx.date, before.date);
    assert_eq!(tx.category, before.category);
    assert_eq!(tx.timestamp, before.timestamp);
}

#[test]
fn empty_patch_is_detected() {
    assert!(TransactionPatch::default().is_empty());
    assert!(!TransactionPatch { category: Some(Category::Income), ..TransactionPatch::default() }.is_empty());
}
