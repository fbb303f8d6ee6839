// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use fintrack::commands::analytics;
use fintrack::commands::categories::{NewCategory, add_category};
use fintrack::commands::transactions::{NewTransaction, add_transaction};
use fintrack::commands::{accounts, users};
use fintrack::db;
use fintrack::models::{AccountType, CategoryType};
use fintrack::utils::parse_date;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde_json::Map;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn setup() -> (Connection, i64) {
    let conn = db::open_in_memory().unwrap();
    let owner = users::add_user(&conn, "ana@example.com", "Ana").unwrap();
    accounts::add_account(&conn, owner, "Main", AccountType::Checking, Decimal::ZERO).unwrap();
    for (name, kind) in [
        ("Salary", CategoryType::Income),
        ("Food", CategoryType::Expense),
        ("Travel", CategoryType::Expense),
    ] {
        add_category(
            &conn,
            Some(owner),
            &NewCategory {
                name,
                r#type: kind,
                icon: "",
                color: "#445566",
            },
        )
        .unwrap();
    }
    (conn, owner)
}

fn record(conn: &Connection, owner: i64, date: &str, category: &str, amount: &str, description: &str) -> i64 {
    add_transaction(
        conn,
        owner,
        &NewTransaction {
            date: parse_date(date).unwrap(),
            account: "Main",
            category,
            amount: dec(amount),
            description,
            is_recurring: false,
            metadata: Map::new(),
        },
    )
    .unwrap()
    .id
}

#[test]
fn empty_months_are_still_listed() {
    let (conn, owner) = setup();
    let t = analytics::category_trends(&conn, owner, 3, parse_date("2025-03-15").unwrap()).unwrap();
    let keys: Vec<&str> = t.months.iter().map(|m| m.key.as_str()).collect();
    assert_eq!(keys, vec!["2025-01", "2025-02", "2025-03"]);
    assert!(t.months.iter().all(|m| m.income.is_zero() && m.expenses.is_zero()));
    assert_eq!(t.months[0].label, "Jan 2025");
    assert!(t.categories.is_empty());
    assert_eq!(t.summary.top_category, None);
    assert!(t.summary.biggest_expense.is_none());
    assert_eq!(t.summary.savings_rate, Decimal::ZERO);
}

#[test]
fn monthly_series_and_summary() {
    let (conn, owner) = setup();
    record(&conn, owner, "2025-01-31", "Salary", "3000", "Pay");
    record(&conn, owner, "2025-02-28", "Salary", "3000", "Pay");
    record(&conn, owner, "2025-01-05", "Food", "200", "Market");
    record(&conn, owner, "2025-02-10", "Food", "300", "Market");
    record(&conn, owner, "2025-02-14", "Travel", "500", "Train");
    // Outside the window.
    record(&conn, owner, "2024-12-31", "Travel", "9999", "Old trip");

    let t = analytics::category_trends(&conn, owner, 3, parse_date("2025-03-01").unwrap()).unwrap();
    let jan = &t.months[0];
    assert_eq!((jan.income, jan.expenses, jan.savings), (dec("3000"), dec("200"), dec("2800")));
    assert_eq!(t.months[1].transactions_count, 3);
    assert_eq!(t.months[2].transactions_count, 0);

    let food = t.categories.iter().find(|c| c.category == "Food").unwrap();
    assert_eq!(food.monthly, vec![dec("200"), dec("300"), Decimal::ZERO]);
    assert_eq!(food.total, dec("500"));

    let s = &t.summary;
    assert_eq!(s.total_income, dec("6000"));
    assert_eq!(s.total_expenses, dec("1000"));
    assert_eq!(s.avg_monthly_income, dec("2000"));
    assert_eq!(s.avg_monthly_expenses, dec("333.33"));
    assert_eq!(s.savings_rate, dec("83.33"));
    // Food and Travel tie at 500; ties go by name.
    assert_eq!(s.top_category.as_deref(), Some("Food"));
    assert_eq!(s.biggest_expense.as_ref().unwrap().description, "Train");
}

#[test]
fn biggest_expense_ties_go_to_the_earliest() {
    let (conn, owner) = setup();
    record(&conn, owner, "2025-03-10", "Food", "80", "Later");
    let first = record(&conn, owner, "2025-03-02", "Travel", "80", "Earlier");
    record(&conn, owner, "2025-03-02", "Food", "80", "Same day, higher id");

    let t = analytics::category_trends(&conn, owner, 1, parse_date("2025-03-20").unwrap()).unwrap();
    let big = t.summary.biggest_expense.unwrap();
    assert_eq!(big.id, first);
    assert_eq!(big.amount, dec("-80"));
}

#[test]
fn zero_months_is_rejected() {
    let (conn, owner) = setup();
    assert!(analytics::category_trends(&conn, owner, 0, parse_date("2025-03-20").unwrap()).is_err());
}

#[test]
fn huge_month_counts_are_rejected() {
    let (conn, owner) = setup();
    let today = parse_date("2025-03-20").unwrap();
    for months in [analytics::MAX_TREND_MONTHS + 1, 3_000_000_000, u32::MAX] {
        assert!(analytics::category_trends(&conn, owner, months, today).is_err(), "{}", months);
    }
    let t = analytics::category_trends(&conn, owner, analytics::MAX_TREND_MONTHS, today).unwrap();
    assert_eq!(t.months.len(), 240);
    assert_eq!(t.months[0].key, "2005-04");
}
