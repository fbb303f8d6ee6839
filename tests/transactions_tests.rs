// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use fintrack::commands::categories::{NewCategory, add_category};
use fintrack::commands::transactions::{
    self, NewTransaction, TransactionFilter, TransactionPatch,
};
use fintrack::commands::{Scope, accounts, doctor, users};
use fintrack::errors::LedgerError;
use fintrack::models::{AccountType, CategoryType};
use fintrack::{cli, db};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde_json::{Map, Value, json};

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn setup() -> (Connection, i64) {
    let conn = db::open_in_memory().unwrap();
    let owner = users::add_user(&conn, "ana@example.com", "Ana").unwrap();
    accounts::add_account(&conn, owner, "Main", AccountType::Checking, dec("1000")).unwrap();
    for (name, kind) in [("Salary", CategoryType::Income), ("Food", CategoryType::Expense)] {
        add_category(
            &conn,
            None,
            &NewCategory {
                name,
                r#type: kind,
                icon: "",
                color: "#336699",
            },
        )
        .unwrap();
    }
    (conn, owner)
}

fn tx<'a>(date: &str, category: &'a str, amount: &str, description: &'a str) -> NewTransaction<'a> {
    NewTransaction {
        date: fintrack::utils::parse_date(date).unwrap(),
        account: "Main",
        category,
        amount: dec(amount),
        description,
        is_recurring: false,
        metadata: Map::new(),
    }
}

#[test]
fn amounts_follow_category_sign_on_insert() {
    let (conn, owner) = setup();
    let food = transactions::add_transaction(&conn, owner, &tx("2025-07-01", "Food", "42.50", "Lunch")).unwrap();
    assert_eq!(food.amount, dec("-42.50"));
    let pay = transactions::add_transaction(&conn, owner, &tx("2025-07-01", "Salary", "-2000", "Pay")).unwrap();
    assert_eq!(pay.amount, dec("2000"));
}

#[test]
fn amounts_follow_category_sign_on_update() {
    let (conn, owner) = setup();
    let t = transactions::add_transaction(&conn, owner, &tx("2025-07-01", "Food", "10", "Snack")).unwrap();

    let patch = TransactionPatch {
        amount: Some(dec("-25")),
        ..Default::default()
    };
    let t = transactions::update_transaction(&conn, owner, t.id, &patch).unwrap();
    assert_eq!(t.amount, dec("-25"));

    // Switching category alone flips the stored sign.
    let patch = TransactionPatch {
        category: Some("Salary"),
        ..Default::default()
    };
    let t = transactions::update_transaction(&conn, owner, t.id, &patch).unwrap();
    assert_eq!(t.amount, dec("25"));
}

#[test]
fn zero_amounts_are_rejected() {
    let (conn, owner) = setup();
    let err = transactions::add_transaction(&conn, owner, &tx("2025-07-01", "Food", "0", "Nothing")).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::Validation(_))
    ));
}

#[test]
fn other_owners_accounts_are_invisible() {
    let (conn, _) = setup();
    let other = users::add_user(&conn, "bo@example.com", "Bo").unwrap();
    let err = transactions::add_transaction(&conn, other, &tx("2025-07-01", "Food", "5", "Coffee")).unwrap_err();
    assert_eq!(
        err.downcast_ref::<LedgerError>(),
        Some(&LedgerError::not_found("Account", "Main"))
    );
}

#[test]
fn duplicate_account_names_are_rejected_per_owner() {
    let (conn, owner) = setup();
    assert!(accounts::add_account(&conn, owner, "Main", AccountType::Savings, Decimal::ZERO).is_err());
    let other = users::add_user(&conn, "bo@example.com", "Bo").unwrap();
    assert!(accounts::add_account(&conn, other, "Main", AccountType::Savings, Decimal::ZERO).is_ok());
}

#[test]
fn list_limit_and_search_respected() {
    let (conn, owner) = setup();
    for (i, desc) in ["Groceries", "Cinema", "Groceries 50%"].iter().enumerate() {
        let date = format!("2025-01-0{}", i + 1);
        transactions::add_transaction(&conn, owner, &tx(&date, "Food", "-10", desc)).unwrap();
    }

    let matches = cli::build_cli().get_matches_from(["fintrack", "tx", "list", "--limit", "2"]);
    let Some(("tx", tx_m)) = matches.subcommand() else {
        panic!("no tx subcommand");
    };
    let Some(("list", list_m)) = tx_m.subcommand() else {
        panic!("no list subcommand");
    };
    let filter = TransactionFilter::from_matches(list_m).unwrap();
    let rows = transactions::query_rows(&conn, owner, &filter).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].date.to_string(), "2025-01-03");

    let filter = TransactionFilter {
        search: Some("50%".into()),
        ..Default::default()
    };
    let rows = transactions::query_rows(&conn, owner, &filter).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].description, "Groceries 50%");
}

#[test]
fn month_filter_bounds_the_calendar_month() {
    let (conn, owner) = setup();
    for date in ["2025-01-31", "2025-02-01", "2025-02-28", "2025-03-01"] {
        transactions::add_transaction(&conn, owner, &tx(date, "Food", "1", "x")).unwrap();
    }
    let matches =
        cli::build_cli().get_matches_from(["fintrack", "tx", "list", "--month", "2025-02"]);
    let (_, tx_m) = matches.subcommand().unwrap();
    let (_, list_m) = tx_m.subcommand().unwrap();
    let filter = TransactionFilter::from_matches(list_m).unwrap();
    let rows = transactions::query_rows(&conn, owner, &filter).unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
fn doctor_flags_and_removes_double_entries() {
    let (conn, owner) = setup();
    for _ in 0..3 {
        transactions::add_transaction(&conn, owner, &tx("2025-07-01", "Food", "12", "Lunch")).unwrap();
    }
    // A row written around the API with the wrong sign.
    let food_id: i64 = conn
        .query_row("SELECT id FROM categories WHERE name='Food'", [], |r| r.get(0))
        .unwrap();
    let account_id: i64 = conn
        .query_row("SELECT id FROM accounts WHERE name='Main'", [], |r| r.get(0))
        .unwrap();
    conn.execute(
        "INSERT INTO transactions(owner_id, amount, date, description, category_id, account_id)
         VALUES (?1, '9', '2025-07-02', 'Odd', ?2, ?3)",
        params![owner, food_id, account_id],
    )
    .unwrap();

    let issues: Vec<&str> = doctor::check(&conn).unwrap().iter().map(|f| f.issue).collect();
    assert_eq!(issues, vec!["sign_mismatch", "duplicate_transaction"]);

    assert_eq!(doctor::remove_duplicates(&conn).unwrap(), 2);
    let issues: Vec<&str> = doctor::check(&conn).unwrap().iter().map(|f| f.issue).collect();
    assert_eq!(issues, vec!["sign_mismatch"]);
}

#[test]
fn out_of_range_amounts_are_rejected() {
    let (conn, owner) = setup();
    for amount in ["1000000000000000000000000000", "10000000000", "12.345"] {
        let err = transactions::add_transaction(&conn, owner, &tx("2025-07-01", "Food", amount, "Huge")).unwrap_err();
        assert!(
            matches!(err.downcast_ref::<LedgerError>(), Some(LedgerError::Validation(_))),
            "{}",
            amount
        );
    }
    let t = transactions::add_transaction(&conn, owner, &tx("2025-07-01", "Food", "9999999999.99", "Max")).unwrap();
    assert_eq!(t.amount, dec("-9999999999.99"));

    let patch = TransactionPatch {
        amount: Some(dec("0.001")),
        ..Default::default()
    };
    assert!(transactions::update_transaction(&conn, owner, t.id, &patch).is_err());
}

#[test]
fn amounts_are_stored_without_trailing_zeros() {
    let (conn, owner) = setup();
    let a = transactions::add_transaction(&conn, owner, &tx("2025-07-01", "Food", "500", "Rent")).unwrap();
    let b = transactions::add_transaction(&conn, owner, &tx("2025-07-01", "Food", "500.00", "Rent")).unwrap();
    let stored: Vec<String> = [a.id, b.id]
        .iter()
        .map(|id| {
            conn.query_row("SELECT amount FROM transactions WHERE id=?1", params![id], |r| r.get(0))
                .unwrap()
        })
        .collect();
    assert_eq!(stored, vec!["-500", "-500"]);
}

#[test]
fn doctor_matches_amounts_by_value() {
    let (conn, owner) = setup();
    transactions::add_transaction(&conn, owner, &tx("2025-07-01", "Food", "500", "Rent")).unwrap();
    transactions::add_transaction(&conn, owner, &tx("2025-07-01", "Food", "500.00", "Rent")).unwrap();
    // Older rows may still carry trailing zeros.
    let food_id: i64 = conn
        .query_row("SELECT id FROM categories WHERE name='Food'", [], |r| r.get(0))
        .unwrap();
    let account_id: i64 = conn
        .query_row("SELECT id FROM accounts WHERE name='Main'", [], |r| r.get(0))
        .unwrap();
    conn.execute(
        "INSERT INTO transactions(owner_id, amount, date, description, category_id, account_id)
         VALUES (?1, '-500.000', '2025-07-01', 'Rent', ?2, ?3)",
        params![owner, food_id, account_id],
    )
    .unwrap();

    let findings = doctor::check(&conn).unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].issue, "duplicate_transaction");
    assert!(findings[0].detail.ends_with("x3"), "{}", findings[0].detail);

    assert_eq!(doctor::remove_duplicates(&conn).unwrap(), 2);
    assert!(doctor::check(&conn).unwrap().is_empty());
}

#[test]
fn edit_merges_metadata() {
    let (conn, owner) = setup();
    let mut new = tx("2025-07-01", "Food", "12", "Lunch");
    new.metadata.insert("receipt".into(), json!(42));
    new.metadata.insert("shop".into(), json!("Aldi"));
    let t = transactions::add_transaction(&conn, owner, &new).unwrap();

    let id = t.id.to_string();
    let m = cli::build_cli().get_matches_from([
        "fintrack",
        "tx",
        "edit",
        "--id",
        id.as_str(),
        "--meta",
        "shop=Lidl",
        "--meta",
        "paid=true",
    ]);
    let (_, tx_m) = m.subcommand().unwrap();
    let scope = Scope {
        owner_id: owner,
        today: fintrack::utils::parse_date("2025-07-31").unwrap(),
    };
    transactions::handle(&conn, &scope, tx_m).unwrap();

    let t = transactions::get_transaction(&conn, owner, t.id).unwrap();
    assert_eq!(t.metadata.get("receipt"), Some(&json!(42)));
    assert_eq!(t.metadata.get("shop"), Some(&Value::String("Lidl".into())));
    assert_eq!(t.metadata.get("paid"), Some(&Value::Bool(true)));
    assert_eq!(t.amount, dec("-12"));

    // Edits without --meta leave metadata alone.
    let patch = TransactionPatch {
        description: Some("Dinner"),
        ..Default::default()
    };
    let t = transactions::update_transaction(&conn, owner, t.id, &patch).unwrap();
    assert_eq!(t.metadata.len(), 3);
}
