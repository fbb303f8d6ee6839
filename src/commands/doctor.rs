// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeMap;

use crate::utils::{decimal_at, maybe_print_json, pretty_table};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub issue: &'static str,
    pub detail: String,
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    if m.get_flag("dedupe") {
        let removed = remove_duplicates(conn)?;
        println!("Removed {} duplicate transactions", removed);
    }
    let findings = check(conn)?;
    if maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &findings)? {
        return Ok(());
    }
    if findings.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        let rows = findings
            .into_iter()
            .map(|f| vec![f.issue.to_string(), f.detail])
            .collect();
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

/// Runs every integrity check over all owners.
pub fn check(conn: &Connection) -> Result<Vec<Finding>> {
    let mut out = Vec::new();

    // 1) Stored sign disagrees with the category type
    let mut stmt = conn.prepare(
        "SELECT t.id, t.amount, c.type FROM transactions t
         JOIN categories c ON t.category_id=c.id ORDER BY t.id",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let amount = decimal_at(r, 1)?;
        let kind: crate::models::CategoryType = r.get(2)?;
        if kind.normalize_amount(amount) != amount {
            out.push(Finding {
                issue: "sign_mismatch",
                detail: format!("transaction {} stores {} under {}", id, amount, kind),
            });
        }
    }

    // 2) Budgets pointing at income categories
    let mut stmt = conn.prepare(
        "SELECT b.id, c.name FROM budgets b JOIN categories c ON b.category_id=c.id
         WHERE c.type <> 'EXPENSE' ORDER BY b.id",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let name: String = r.get(1)?;
        out.push(Finding {
            issue: "budget_on_income",
            detail: format!("budget {} on '{}'", id, name),
        });
    }

    // 3) References crossing owners
    let mut stmt = conn.prepare(
        "SELECT t.id FROM transactions t JOIN accounts a ON t.account_id=a.id
         WHERE a.owner_id <> t.owner_id ORDER BY t.id",
    )?;
    for id in stmt.query_map([], |r| r.get::<_, i64>(0))? {
        out.push(Finding {
            issue: "foreign_account",
            detail: format!("transaction {}", id?),
        });
    }
    let mut stmt = conn.prepare(
        "SELECT t.id FROM transactions t JOIN categories c ON t.category_id=c.id
         WHERE c.owner_id IS NOT NULL AND c.owner_id <> t.owner_id ORDER BY t.id",
    )?;
    for id in stmt.query_map([], |r| r.get::<_, i64>(0))? {
        out.push(Finding {
            issue: "foreign_category",
            detail: format!("transaction {}", id?),
        });
    }

    // 4) Likely double entries
    for group in duplicate_groups(conn)? {
        let (owner, date, amount, description) = &group.key;
        out.push(Finding {
            issue: "duplicate_transaction",
            detail: format!(
                "owner {} {} {} '{}' x{}",
                owner,
                date,
                amount,
                description,
                group.ids.len()
            ),
        });
    }

    for f in &out {
        tracing::warn!(issue = f.issue, detail = %f.detail, "doctor finding");
    }
    Ok(out)
}

struct DuplicateGroup {
    key: (i64, NaiveDate, Decimal, String),
    /// Ascending, so the first id is the oldest row.
    ids: Vec<i64>,
}

/// Groups transactions by owner, date, amount and description. Amounts
/// compare by value, so `500` and `500.00` fall in the same group.
fn duplicate_groups(conn: &Connection) -> Result<Vec<DuplicateGroup>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, date, amount, description FROM transactions ORDER BY id",
    )?;
    let mut groups: BTreeMap<(i64, NaiveDate, String, String), DuplicateGroup> = BTreeMap::new();
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let owner: i64 = r.get(1)?;
        let date: NaiveDate = r.get(2)?;
        let amount = decimal_at(r, 3)?.normalize();
        let description: String = r.get(4)?;
        groups
            .entry((owner, date, amount.to_string(), description.clone()))
            .or_insert_with(|| DuplicateGroup {
                key: (owner, date, amount, description),
                ids: Vec::new(),
            })
            .ids
            .push(id);
    }
    Ok(groups.into_values().filter(|g| g.ids.len() > 1).collect())
}

/// Deletes double entries (same owner, date, amount and description),
/// keeping the oldest row of each group.
pub fn remove_duplicates(conn: &Connection) -> Result<usize> {
    let mut stmt = conn.prepare("DELETE FROM transactions WHERE id=?1")?;
    let mut removed = 0;
    for group in duplicate_groups(conn)? {
        for id in &group.ids[1..] {
            removed += stmt.execute(params![id])?;
        }
    }
    tracing::info!(removed, "duplicate transactions removed");
    Ok(removed)
}
