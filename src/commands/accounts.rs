// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

use super::Scope;
use crate::config;
use crate::errors::LedgerError;
use crate::models::{Account, AccountType};
use crate::utils::{ensure_money, id_for_account, maybe_print_json, parse_decimal, pretty_table};

pub fn handle(conn: &Connection, scope: &Scope, m: &clap::ArgMatches) -> Result<()> {
    let owner = scope.owner_id;
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let typ: AccountType = sub.get_one::<String>("type").unwrap().parse()?;
            let balance = parse_decimal(sub.get_one::<String>("balance").unwrap())?;
            add_account(conn, owner, name, typ, balance)?;
            println!("Added account '{}' ({}, {})", name, typ.label(), balance);
        }
        Some(("list", sub)) => {
            let typ = sub
                .get_one::<String>("type")
                .map(|s| s.parse::<AccountType>())
                .transpose()?;
            let data = list_accounts(conn, owner, typ, sub.get_flag("active"))?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let ccy = config::currency(conn)?;
                let rows = data
                    .into_iter()
                    .map(|a| {
                        vec![
                            a.name,
                            a.r#type.label().to_string(),
                            format!("{:.2} {}", a.balance, ccy),
                            if a.is_active { "yes" } else { "no" }.to_string(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Name", "Type", "Balance", "Active"], rows)
                );
            }
        }
        Some(("set-balance", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let balance = parse_decimal(sub.get_one::<String>("balance").unwrap())?;
            set_balance(conn, owner, name, balance)?;
            println!("Balance of '{}' set to {}", name, balance);
        }
        Some(("activate", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            set_active(conn, owner, name, true)?;
            println!("Account '{}' activated", name);
        }
        Some(("deactivate", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            set_active(conn, owner, name, false)?;
            println!("Account '{}' deactivated", name);
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let id = id_for_account(conn, owner, name)?;
            conn.execute("DELETE FROM accounts WHERE id=?1", params![id])?;
            tracing::info!(account_id = id, "account deleted");
            println!("Removed account '{}'", name);
        }
        _ => {}
    }
    Ok(())
}

pub fn add_account(
    conn: &Connection,
    owner_id: i64,
    name: &str,
    typ: AccountType,
    balance: Decimal,
) -> Result<i64> {
    ensure_money("Balance", balance)?;
    let taken: Option<i64> = conn
        .query_row(
            "SELECT id FROM accounts WHERE owner_id=?1 AND name=?2",
            params![owner_id, name],
            |r| r.get(0),
        )
        .optional()?;
    if taken.is_some() {
        return Err(LedgerError::duplicate("Account", name).into());
    }
    conn.execute(
        "INSERT INTO accounts(owner_id, name, type, balance) VALUES (?1, ?2, ?3, ?4)",
        params![owner_id, name, typ, balance.to_string()],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(account_id = id, owner_id, "account created");
    Ok(id)
}

pub fn list_accounts(
    conn: &Connection,
    owner_id: i64,
    typ: Option<AccountType>,
    active_only: bool,
) -> Result<Vec<Account>> {
    let mut sql = format!(
        "SELECT {} FROM accounts WHERE owner_id=?1 AND (?2 IS NULL OR type=?2)",
        Account::COLUMNS
    );
    if active_only {
        sql.push_str(" AND is_active=1");
    }
    sql.push_str(" ORDER BY name");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![owner_id, typ], Account::from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Balances are edited directly; transactions never post to them.
pub fn set_balance(conn: &Connection, owner_id: i64, name: &str, balance: Decimal) -> Result<()> {
    ensure_money("Balance", balance)?;
    let id = id_for_account(conn, owner_id, name)?;
    conn.execute(
        "UPDATE accounts SET balance=?1, updated_at=datetime('now') WHERE id=?2",
        params![balance.to_string(), id],
    )?;
    tracing::info!(account_id = id, %balance, "account balance edited");
    Ok(())
}

pub fn set_active(conn: &Connection, owner_id: i64, name: &str, active: bool) -> Result<()> {
    let id = id_for_account(conn, owner_id, name)?;
    conn.execute(
        "UPDATE accounts SET is_active=?1, updated_at=datetime('now') WHERE id=?2",
        params![active, id],
    )?;
    tracing::info!(account_id = id, active, "account activity toggled");
    Ok(())
}
