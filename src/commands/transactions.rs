// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

use super::Scope;
use crate::errors::LedgerError;
use crate::models::{CategoryType, Transaction};
use crate::utils::{
    category_for, decimal_at, ensure_money, id_for_account, maybe_print_json, month_end,
    parse_date, parse_decimal, parse_month, pretty_table,
};

pub fn handle(conn: &Connection, scope: &Scope, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, scope, sub)?,
        Some(("list", sub)) => list(conn, scope, sub)?,
        Some(("edit", sub)) => edit(conn, scope, sub)?,
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            remove_transaction(conn, scope.owner_id, id)?;
            println!("Removed transaction {}", id);
        }
        _ => {}
    }
    Ok(())
}

pub struct NewTransaction<'a> {
    pub date: NaiveDate,
    pub account: &'a str,
    pub category: &'a str,
    pub amount: Decimal,
    pub description: &'a str,
    pub is_recurring: bool,
    pub metadata: Map<String, Value>,
}

fn parse_meta(pairs: Option<clap::parser::ValuesRef<'_, String>>) -> Result<Map<String, Value>> {
    let mut meta = Map::new();
    for pair in pairs.into_iter().flatten() {
        let (k, v) = pair.split_once('=').ok_or_else(|| {
            LedgerError::Validation(format!("Invalid metadata '{}', expected KEY=VALUE", pair))
        })?;
        // Values that parse as JSON keep their type; anything else is a string.
        let value = serde_json::from_str(v.trim()).unwrap_or_else(|_| Value::String(v.trim().into()));
        meta.insert(k.trim().to_string(), value);
    }
    Ok(meta)
}

fn add(conn: &Connection, scope: &Scope, sub: &clap::ArgMatches) -> Result<()> {
    let new = NewTransaction {
        date: parse_date(sub.get_one::<String>("date").unwrap())?,
        account: sub.get_one::<String>("account").unwrap().trim(),
        category: sub.get_one::<String>("category").unwrap().trim(),
        amount: parse_decimal(sub.get_one::<String>("amount").unwrap())?,
        description: sub.get_one::<String>("description").unwrap().trim(),
        is_recurring: sub.get_flag("recurring"),
        metadata: parse_meta(sub.get_many::<String>("meta"))?,
    };
    let tx = add_transaction(conn, scope.owner_id, &new)?;
    println!(
        "Recorded {} on {} '{}' (id {})",
        tx.amount, tx.date, tx.description, tx.id
    );
    Ok(())
}

fn ensure_amount(amount: Decimal) -> Result<()> {
    if amount.is_zero() {
        return Err(LedgerError::Validation("Transaction amount must not be zero".into()).into());
    }
    ensure_money("Transaction amount", amount)
}

/// Inserts a transaction with its amount sign forced to the category's
/// polarity. The normalized value is what the INSERT writes, without
/// trailing zeros so equal amounts store as equal text.
pub fn add_transaction(
    conn: &Connection,
    owner_id: i64,
    new: &NewTransaction<'_>,
) -> Result<Transaction> {
    ensure_amount(new.amount)?;
    let account_id = id_for_account(conn, owner_id, new.account)?;
    let (category_id, kind) = category_for(conn, owner_id, new.category)?;
    let amount = kind.normalize_amount(new.amount).normalize();
    let metadata = serde_json::to_string(&new.metadata)?;

    conn.execute(
        "INSERT INTO transactions(owner_id, amount, date, description, category_id, account_id, is_recurring, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            owner_id,
            amount.to_string(),
            new.date,
            new.description,
            category_id,
            account_id,
            new.is_recurring,
            metadata
        ],
    )?;
    let id = conn.last_insert_rowid();
    if amount != new.amount {
        tracing::debug!(transaction_id = id, input = %new.amount, stored = %amount, "amount sign normalized");
    }
    tracing::info!(transaction_id = id, owner_id, %amount, "transaction recorded");
    get_transaction(conn, owner_id, id)
}

pub fn get_transaction(conn: &Connection, owner_id: i64, id: i64) -> Result<Transaction> {
    let sql = format!(
        "SELECT {} FROM transactions WHERE id=?1 AND owner_id=?2",
        Transaction::COLUMNS
    );
    let tx = conn
        .query_row(&sql, params![id, owner_id], Transaction::from_row)
        .optional()?;
    tx.ok_or_else(|| LedgerError::not_found("Transaction", id.to_string()).into())
}

#[derive(Debug, Default)]
pub struct TransactionPatch<'a> {
    pub date: Option<NaiveDate>,
    pub account: Option<&'a str>,
    pub category: Option<&'a str>,
    pub amount: Option<Decimal>,
    pub description: Option<&'a str>,
    pub is_recurring: Option<bool>,
    /// Keys merged over the stored metadata; absent keys are kept.
    pub metadata: Option<Map<String, Value>>,
}

fn edit(conn: &Connection, scope: &Scope, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let patch = TransactionPatch {
        date: sub.get_one::<String>("date").map(|s| parse_date(s)).transpose()?,
        account: sub.get_one::<String>("account").map(|s| s.trim()),
        category: sub.get_one::<String>("category").map(|s| s.trim()),
        amount: sub
            .get_one::<String>("amount")
            .map(|s| parse_decimal(s))
            .transpose()?,
        description: sub.get_one::<String>("description").map(|s| s.trim()),
        is_recurring: sub.get_one::<bool>("recurring").copied(),
        metadata: sub
            .get_many::<String>("meta")
            .map(|pairs| parse_meta(Some(pairs)))
            .transpose()?,
    };
    let tx = update_transaction(conn, scope.owner_id, id, &patch)?;
    println!("Updated transaction {} ({} on {})", tx.id, tx.amount, tx.date);
    Ok(())
}

/// Applies a partial update. The sign is normalized again against the
/// (possibly new) category on every update, even if only the category
/// changed.
pub fn update_transaction(
    conn: &Connection,
    owner_id: i64,
    id: i64,
    patch: &TransactionPatch<'_>,
) -> Result<Transaction> {
    let current = get_transaction(conn, owner_id, id)?;

    let account_id = match patch.account {
        Some(name) => id_for_account(conn, owner_id, name)?,
        None => current.account_id,
    };
    let (category_id, kind) = match patch.category {
        Some(name) => category_for(conn, owner_id, name)?,
        None => {
            let kind: CategoryType = conn.query_row(
                "SELECT type FROM categories WHERE id=?1",
                params![current.category_id],
                |r| r.get(0),
            )?;
            (current.category_id, kind)
        }
    };
    let raw_amount = patch.amount.unwrap_or(current.amount);
    ensure_amount(raw_amount)?;
    let amount = kind.normalize_amount(raw_amount).normalize();
    let mut metadata = current.metadata;
    if let Some(extra) = &patch.metadata {
        metadata.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    conn.execute(
        "UPDATE transactions
         SET amount=?1, date=?2, description=?3, category_id=?4, account_id=?5,
             is_recurring=?6, metadata=?7, updated_at=datetime('now')
         WHERE id=?8 AND owner_id=?9",
        params![
            amount.to_string(),
            patch.date.unwrap_or(current.date),
            patch.description.unwrap_or(current.description.as_str()),
            category_id,
            account_id,
            patch.is_recurring.unwrap_or(current.is_recurring),
            serde_json::to_string(&metadata)?,
            id,
            owner_id
        ],
    )?;
    tracing::info!(transaction_id = id, %amount, "transaction updated");
    get_transaction(conn, owner_id, id)
}

pub fn remove_transaction(conn: &Connection, owner_id: i64, id: i64) -> Result<()> {
    let removed = conn.execute(
        "DELETE FROM transactions WHERE id=?1 AND owner_id=?2",
        params![id, owner_id],
    )?;
    if removed == 0 {
        return Err(LedgerError::not_found("Transaction", id.to_string()).into());
    }
    tracing::info!(transaction_id = id, "transaction deleted");
    Ok(())
}

fn list(conn: &Connection, scope: &Scope, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let filter = TransactionFilter::from_matches(sub)?;
    let data = query_rows(conn, scope.owner_id, &filter)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date.to_string(),
                    r.account.clone(),
                    r.description.clone(),
                    format!("{:.2}", r.amount),
                    r.category.clone(),
                    if r.is_recurring { "yes" } else { "" }.to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Id", "Date", "Account", "Description", "Amount", "Category", "Recurring"],
                rows,
            )
        );
    }
    Ok(())
}

#[derive(Debug, Default, Clone)]
pub struct TransactionFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub account: Option<String>,
    pub category: Option<String>,
    pub recurring_only: bool,
    pub search: Option<String>,
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
    pub limit: Option<usize>,
}

impl TransactionFilter {
    pub fn from_matches(sub: &clap::ArgMatches) -> Result<Self> {
        let mut from = sub.get_one::<String>("from").map(|s| parse_date(s)).transpose()?;
        let mut to = sub.get_one::<String>("to").map(|s| parse_date(s)).transpose()?;
        // --month narrows to the calendar month and wins over --from/--to
        if let Some(month) = sub.get_one::<String>("month") {
            let start = parse_month(month)?;
            from = Some(start);
            to = Some(month_end(start.year(), start.month())?);
        }
        Ok(Self {
            from,
            to,
            account: sub.get_one::<String>("account").map(|s| s.trim().to_string()),
            category: sub.get_one::<String>("category").map(|s| s.trim().to_string()),
            recurring_only: sub.get_flag("recurring"),
            search: sub.get_one::<String>("search").map(|s| s.trim().to_string()),
            min: sub.get_one::<String>("min").map(|s| parse_decimal(s)).transpose()?,
            max: sub.get_one::<String>("max").map(|s| parse_decimal(s)).transpose()?,
            limit: sub.get_one::<usize>("limit").copied(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub date: NaiveDate,
    pub account: String,
    pub description: String,
    pub amount: Decimal,
    pub category: String,
    pub category_type: CategoryType,
    pub is_recurring: bool,
    pub metadata: Map<String, Value>,
}

/// Newest first by date, then id. Amount bounds apply after loading
/// since amounts are stored as decimal text.
pub fn query_rows(
    conn: &Connection,
    owner_id: i64,
    filter: &TransactionFilter,
) -> Result<Vec<TransactionRow>> {
    let mut sql = String::from(
        "SELECT t.id, t.date, a.name, t.description, t.amount, c.name, c.type, t.is_recurring, t.metadata
         FROM transactions t
         JOIN accounts a ON t.account_id=a.id
         JOIN categories c ON t.category_id=c.id
         WHERE t.owner_id=?",
    );
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(owner_id)];

    if let Some(from) = filter.from {
        sql.push_str(" AND t.date>=?");
        params_vec.push(Box::new(from));
    }
    if let Some(to) = filter.to {
        sql.push_str(" AND t.date<=?");
        params_vec.push(Box::new(to));
    }
    if let Some(acct) = &filter.account {
        sql.push_str(" AND a.name=?");
        params_vec.push(Box::new(acct.clone()));
    }
    if let Some(cat) = &filter.category {
        sql.push_str(" AND c.name=?");
        params_vec.push(Box::new(cat.clone()));
    }
    if filter.recurring_only {
        sql.push_str(" AND t.is_recurring=1");
    }
    if let Some(search) = &filter.search {
        sql.push_str(" AND t.description LIKE ? ESCAPE '\\'");
        let escaped = search
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        params_vec.push(Box::new(format!("%{}%", escaped)));
    }
    sql.push_str(" ORDER BY t.date DESC, t.id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(rusqlite::params_from_iter(params_vec.iter()))?;

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let amount = decimal_at(r, 4)?;
        if filter.min.is_some_and(|min| amount < min) || filter.max.is_some_and(|max| amount > max)
        {
            continue;
        }
        let raw_meta: String = r.get(8)?;
        data.push(TransactionRow {
            id: r.get(0)?,
            date: r.get(1)?,
            account: r.get(2)?,
            description: r.get(3)?,
            amount,
            category: r.get(5)?,
            category_type: r.get(6)?,
            is_recurring: r.get(7)?,
            metadata: serde_json::from_str(&raw_meta).unwrap_or_default(),
        });
        if filter.limit.is_some_and(|limit| data.len() >= limit) {
            break;
        }
    }
    Ok(data)
}
