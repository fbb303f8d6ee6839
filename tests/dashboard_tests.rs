// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use fintrack::commands::assets::{NewAsset, add_asset};
use fintrack::commands::categories::{NewCategory, add_category};
use fintrack::commands::dashboard::{self, EvolutionMode, WealthPeriod};
use fintrack::commands::transactions::{NewTransaction, add_transaction};
use fintrack::commands::{accounts, profile, users};
use fintrack::db;
use fintrack::errors::LedgerError;
use fintrack::models::{AccountType, AssetType, CategoryType};
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
    accounts::add_account(&conn, owner, "Main", AccountType::Checking, dec("1000")).unwrap();
    for (name, kind) in [("Salary", CategoryType::Income), ("Rent", CategoryType::Expense)] {
        add_category(
            &conn,
            None,
            &NewCategory {
                name,
                r#type: kind,
                icon: "",
                color: "#123456",
            },
        )
        .unwrap();
    }
    (conn, owner)
}

fn record(conn: &Connection, owner: i64, date: &str, category: &str, amount: &str) {
    add_transaction(
        conn,
        owner,
        &NewTransaction {
            date: parse_date(date).unwrap(),
            account: "Main",
            category,
            amount: dec(amount),
            description: category,
            is_recurring: false,
            metadata: Map::new(),
        },
    )
    .unwrap();
}

fn asset(conn: &Connection, owner: i64, name: &str, kind: AssetType, value: &str) {
    add_asset(
        conn,
        owner,
        &NewAsset {
            name: name.to_string(),
            asset_type: kind,
            current_value: dec(value),
            purchase_price: None,
            purchase_date: None,
            description: String::new(),
        },
    )
    .unwrap();
}

#[test]
fn window_stats_with_empty_previous_window() {
    let (conn, owner) = setup();
    record(&conn, owner, "2025-07-05", "Salary", "2000");
    record(&conn, owner, "2025-07-10", "Rent", "-500");

    let cmp = dashboard::compare_windows(&conn, owner, parse_date("2025-07-31").unwrap(), 30).unwrap();
    assert_eq!(cmp.current.start.to_string(), "2025-07-02");
    assert_eq!(cmp.current.income, dec("2000"));
    assert_eq!(cmp.current.expenses, dec("500"));
    assert_eq!(cmp.current.savings, dec("1500"));
    assert_eq!(cmp.current.transactions_count, 2);
    assert_eq!(cmp.previous.end.to_string(), "2025-07-01");
    assert_eq!(cmp.previous.transactions_count, 0);
    assert_eq!(cmp.income_change, Decimal::ZERO);
    assert_eq!(cmp.expenses_change, Decimal::ZERO);
    assert_eq!(cmp.transactions_change, Decimal::ZERO);
}

#[test]
fn window_changes_against_previous_window() {
    let (conn, owner) = setup();
    record(&conn, owner, "2025-06-20", "Salary", "1000");
    record(&conn, owner, "2025-07-20", "Salary", "1500");
    record(&conn, owner, "2025-06-21", "Rent", "400");
    record(&conn, owner, "2025-07-21", "Rent", "300");

    let cmp = dashboard::compare_windows(&conn, owner, parse_date("2025-07-31").unwrap(), 30).unwrap();
    assert_eq!(cmp.income_change, dec("50"));
    assert_eq!(cmp.expenses_change, dec("-25"));
    assert_eq!(cmp.savings_change, dec("100"));
}

#[test]
fn oversized_windows_are_rejected() {
    let (conn, owner) = setup();
    let today = parse_date("2025-07-31").unwrap();
    for days in [0, dashboard::MAX_WINDOW_DAYS + 1, 200_000_000, u32::MAX] {
        let err = dashboard::compare_windows(&conn, owner, today, days).unwrap_err();
        assert!(
            matches!(err.downcast_ref::<LedgerError>(), Some(LedgerError::Validation(_))),
            "{}",
            days
        );
    }
    let cmp = dashboard::compare_windows(&conn, owner, today, dashboard::MAX_WINDOW_DAYS).unwrap();
    assert_eq!(cmp.previous.start.to_string(), "2005-08-06");
}

#[test]
fn windows_near_the_calendar_floor_are_rejected() {
    let (conn, owner) = setup();
    let floor = chrono::NaiveDate::MIN + chrono::Duration::days(10);
    let err = dashboard::compare_windows(&conn, owner, floor, 30).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::Validation(_))
    ));
}

#[test]
fn composition_shares_add_up() {
    let (conn, owner) = setup();
    asset(&conn, owner, "Flat", AssetType::RealEstate, "6000");
    asset(&conn, owner, "ETF", AssetType::Stocks, "2000");
    asset(&conn, owner, "Shares", AssetType::Stocks, "1000");

    let snap = dashboard::wealth_snapshot(&conn, owner).unwrap();
    assert_eq!(snap.total, dec("10000"));
    assert_eq!(snap.assets_count, 3);

    let buckets = dashboard::wealth_composition(&conn, owner).unwrap();
    let got: Vec<(&str, Decimal, usize)> = buckets
        .iter()
        .map(|b| (b.label.as_str(), b.percentage, b.count))
        .collect();
    assert_eq!(
        got,
        vec![
            ("Real Estate", dec("60"), 1),
            ("Stocks", dec("30"), 2),
            (dashboard::LIQUIDITIES, dec("10"), 1),
        ]
    );
    let sum: Decimal = buckets.iter().map(|b| b.percentage).sum();
    assert_eq!(sum, dec("100"));
}

#[test]
fn negative_liquidity_has_no_bucket() {
    let (conn, owner) = setup();
    accounts::set_balance(&conn, owner, "Main", dec("-50")).unwrap();
    asset(&conn, owner, "Gold", AssetType::PreciousMetals, "500");
    let buckets = dashboard::wealth_composition(&conn, owner).unwrap();
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].percentage, dec("100"));
    assert_eq!(dashboard::wealth_snapshot(&conn, owner).unwrap().total, dec("450"));
}

#[test]
fn inactive_holdings_are_left_out() {
    let (conn, owner) = setup();
    accounts::set_active(&conn, owner, "Main", false).unwrap();
    let snap = dashboard::wealth_snapshot(&conn, owner).unwrap();
    assert_eq!(snap.total, Decimal::ZERO);
    assert!(dashboard::wealth_composition(&conn, owner).unwrap().is_empty());
}

#[test]
fn simulated_evolution_is_flagged_and_ends_today() {
    let (conn, owner) = setup();
    let today = parse_date("2025-07-31").unwrap();
    let evo = dashboard::wealth_evolution(&conn, owner, today, WealthPeriod::OneMonth, EvolutionMode::Simulated).unwrap();
    assert!(evo.simulated);
    assert_eq!(evo.points.len(), 30);
    let last = evo.points.last().unwrap();
    assert_eq!(last.date, today);
    assert_eq!(last.value, dec("1000"));
    assert_eq!(last.label, "31/07");
}

#[test]
fn replayed_evolution_undoes_later_transactions() {
    let (conn, owner) = setup();
    record(&conn, owner, "2025-07-20", "Salary", "2000");
    record(&conn, owner, "2025-07-25", "Rent", "500");
    let today = parse_date("2025-07-31").unwrap();

    let evo = dashboard::wealth_evolution(&conn, owner, today, WealthPeriod::OneMonth, EvolutionMode::Replay).unwrap();
    assert!(!evo.simulated);
    assert_eq!(evo.points[0].date.to_string(), "2025-07-01");
    assert_eq!(evo.points[0].value, dec("-500"));
    assert_eq!(evo.points.last().unwrap().value, dec("1000"));
}

#[test]
fn replay_ignores_transactions_after_today() {
    let (conn, owner) = setup();
    record(&conn, owner, "2025-07-20", "Salary", "2000");
    record(&conn, owner, "2025-08-15", "Rent", "700");
    let today = parse_date("2025-07-31").unwrap();

    let evo = dashboard::wealth_evolution(&conn, owner, today, WealthPeriod::OneMonth, EvolutionMode::Replay).unwrap();
    let last = evo.points.last().unwrap();
    assert_eq!(last.date, today);
    assert_eq!(last.value, dashboard::wealth_snapshot(&conn, owner).unwrap().total);
    assert_eq!(evo.points[0].value, dec("-1000"));
}

#[test]
fn profile_summarises_activity() {
    let (conn, owner) = setup();
    asset(&conn, owner, "Flat", AssetType::RealEstate, "6000");
    record(&conn, owner, "2025-06-20", "Salary", "1000");
    record(&conn, owner, "2025-07-02", "Rent", "300");

    conn.execute(
        "UPDATE users SET created_at='2025-01-01 09:00:00' WHERE id=?1",
        rusqlite::params![owner],
    )
    .unwrap();

    let stats = profile::profile_stats(&conn, owner, parse_date("2025-07-31").unwrap()).unwrap();
    assert_eq!(stats.email, "ana@example.com");
    assert_eq!(stats.member_since, parse_date("2025-01-01").unwrap());
    assert_eq!(stats.member_since_days, 211);
    assert_eq!(stats.this_month_transactions, 1);
    // 2 transactions over 211/30 months.
    assert_eq!(stats.avg_transactions_per_month, dec("0.3"));
    assert_eq!(stats.accounts_count, 1);
    assert_eq!(stats.assets_value, dec("6000"));
    assert_eq!(stats.transactions_count, 2);
    assert_eq!(stats.first_transaction_date, Some(parse_date("2025-06-20").unwrap()));
    assert_eq!(stats.wealth_total, dec("7000"));
}

#[test]
fn profile_of_a_brand_new_user() {
    let (conn, owner) = setup();
    conn.execute(
        "UPDATE users SET created_at='2025-07-31 18:30:00' WHERE id=?1",
        rusqlite::params![owner],
    )
    .unwrap();
    let stats = profile::profile_stats(&conn, owner, parse_date("2025-07-31").unwrap()).unwrap();
    assert_eq!(stats.member_since_days, 0);
    assert_eq!(stats.avg_transactions_per_month, Decimal::ZERO);
    assert_eq!(stats.first_transaction_date, None);
}

#[test]
fn balances_and_asset_values_stay_in_money_range() {
    let (conn, owner) = setup();
    assert!(accounts::set_balance(&conn, owner, "Main", dec("1000000000000000000000000000")).is_err());
    assert!(accounts::add_account(&conn, owner, "Cash", AccountType::Cash, dec("0.005")).is_err());
    let err = add_asset(
        &conn,
        owner,
        &NewAsset {
            name: "Island".to_string(),
            asset_type: AssetType::RealEstate,
            current_value: dec("10000000000"),
            purchase_price: None,
            purchase_date: None,
            description: String::new(),
        },
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::Validation(_))
    ));
    assert_eq!(dashboard::wealth_snapshot(&conn, owner).unwrap().total, dec("1000"));
}
