// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;

use super::Scope;
use super::dashboard::wealth_snapshot;
use crate::config;
use crate::utils::{fmt_money, maybe_print_json, month_start, pretty_table};

#[derive(Debug, Clone, Serialize)]
pub struct ProfileStats {
    pub email: String,
    pub name: String,
    pub member_since: NaiveDate,
    pub member_since_days: i64,
    pub accounts_count: usize,
    pub accounts_balance: Decimal,
    pub assets_count: usize,
    pub assets_value: Decimal,
    pub transactions_count: i64,
    pub this_month_transactions: i64,
    pub first_transaction_date: Option<NaiveDate>,
    pub avg_transactions_per_month: Decimal,
    pub wealth_total: Decimal,
}

pub fn handle(conn: &Connection, scope: &Scope, sub: &clap::ArgMatches) -> Result<()> {
    let stats = profile_stats(conn, scope.owner_id, scope.today)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &stats)? {
        return Ok(());
    }
    let ccy = config::currency(conn)?;
    let first = stats
        .first_transaction_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".into());
    let rows = vec![
        vec!["User".into(), format!("{} <{}>", stats.name, stats.email)],
        vec![
            "Member since".into(),
            format!("{} ({} days)", stats.member_since, stats.member_since_days),
        ],
        vec![
            "Accounts".into(),
            format!("{} ({:.2} {})", stats.accounts_count, stats.accounts_balance, ccy),
        ],
        vec![
            "Assets".into(),
            format!("{} ({:.2} {})", stats.assets_count, stats.assets_value, ccy),
        ],
        vec![
            "Transactions".into(),
            format!(
                "{} total, {} this month",
                stats.transactions_count, stats.this_month_transactions
            ),
        ],
        vec!["First transaction".into(), first],
        vec![
            "Avg per month".into(),
            format!("{:.1}", stats.avg_transactions_per_month),
        ],
        vec!["Wealth".into(), fmt_money(&stats.wealth_total, &ccy)],
    ];
    println!("{}", pretty_table(&["", "Value"], rows));
    Ok(())
}

pub fn profile_stats(conn: &Connection, owner_id: i64, today: NaiveDate) -> Result<ProfileStats> {
    let (email, name, created_at): (String, String, String) = conn
        .query_row(
            "SELECT email, name, created_at FROM users WHERE id=?1",
            params![owner_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .with_context(|| format!("Loading user {}", owner_id))?;
    // created_at is `YYYY-MM-DD HH:MM:SS`; only the day matters here.
    let day = created_at.get(..10).unwrap_or(created_at.as_str());
    let member_since = NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .with_context(|| format!("Malformed created_at '{}'", created_at))?;
    let member_since_days = (today - member_since).num_days().max(0);

    let (transactions_count, first_transaction_date): (i64, Option<NaiveDate>) = conn.query_row(
        "SELECT COUNT(*), MIN(date) FROM transactions WHERE owner_id=?1",
        params![owner_id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    let this_month_transactions: i64 = conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE owner_id=?1 AND date>=?2",
        params![owner_id, month_start(today)],
        |r| r.get(0),
    )?;

    let avg_transactions_per_month = if member_since_days > 0 {
        let months = (Decimal::from(member_since_days) / Decimal::from(30)).max(Decimal::ONE);
        (Decimal::from(transactions_count) / months).round_dp(1)
    } else {
        Decimal::ZERO
    };

    let wealth = wealth_snapshot(conn, owner_id)?;
    Ok(ProfileStats {
        email,
        name,
        member_since,
        member_since_days,
        accounts_count: wealth.accounts_count,
        accounts_balance: wealth.accounts_total,
        assets_count: wealth.assets_count,
        assets_value: wealth.assets_total,
        transactions_count,
        this_month_transactions,
        first_transaction_date,
        avg_transactions_per_month,
        wealth_total: wealth.total,
    })
}
