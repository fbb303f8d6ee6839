// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::Serialize;

use super::Scope;
use crate::config;
use crate::errors::LedgerError;
use crate::metrics::{BudgetStatus, is_alert, percent_of};
use crate::models::{Budget, BudgetPeriod, CategoryType};
use crate::utils::{
    category_for, decimal_at, ensure_money, maybe_print_json, month_start, next_month_start,
    parse_decimal, pretty_table,
};

pub fn handle(conn: &Connection, scope: &Scope, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => set(conn, scope, sub)?,
        Some(("list", sub)) => list(conn, scope, sub)?,
        Some(("rm", sub)) => {
            let (category, period) = category_and_period(sub)?;
            remove_budget(conn, scope.owner_id, category, period)?;
            println!("Removed {} budget for {}", period, category);
        }
        Some(("activate", sub)) => {
            let (category, period) = category_and_period(sub)?;
            set_budget_active(conn, scope.owner_id, category, period, true)?;
            println!("Activated {} budget for {}", period, category);
        }
        Some(("deactivate", sub)) => {
            let (category, period) = category_and_period(sub)?;
            set_budget_active(conn, scope.owner_id, category, period, false)?;
            println!("Deactivated {} budget for {}", period, category);
        }
        Some(("overview", sub)) => print_overview(conn, scope, sub)?,
        Some(("alerts", sub)) => print_alerts(conn, scope, sub)?,
        _ => {}
    }
    Ok(())
}

fn category_and_period(sub: &clap::ArgMatches) -> Result<(&str, BudgetPeriod)> {
    let category = sub.get_one::<String>("category").unwrap().trim();
    let period: BudgetPeriod = sub.get_one::<String>("period").unwrap().parse()?;
    Ok((category, period))
}

fn set(conn: &Connection, scope: &Scope, sub: &clap::ArgMatches) -> Result<()> {
    let (category, period) = category_and_period(sub)?;
    let limit = parse_decimal(sub.get_one::<String>("limit").unwrap())?;
    set_budget(conn, scope.owner_id, category, limit, period)?;
    println!("Budget set for {} = {} ({})", category, limit, period);
    Ok(())
}

/// Creates or updates the (category, period) budget. Only expense
/// categories visible to the owner may carry a budget.
pub fn set_budget(
    conn: &Connection,
    owner_id: i64,
    category: &str,
    monthly_limit: Decimal,
    period: BudgetPeriod,
) -> Result<i64> {
    if monthly_limit <= Decimal::ZERO {
        return Err(LedgerError::Validation("Budget limit must be positive".into()).into());
    }
    ensure_money("Budget limit", monthly_limit)?;
    let (category_id, kind) = category_for(conn, owner_id, category)?;
    if kind != CategoryType::Expense {
        return Err(LedgerError::Validation(
            "Budgets can only be created for expense categories.".into(),
        )
        .into());
    }
    conn.execute(
        "INSERT INTO budgets(owner_id, category_id, monthly_limit, period) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(category_id, owner_id, period)
         DO UPDATE SET monthly_limit=excluded.monthly_limit, updated_at=datetime('now')",
        params![owner_id, category_id, monthly_limit.to_string(), period],
    )?;
    let id: i64 = conn.query_row(
        "SELECT id FROM budgets WHERE owner_id=?1 AND category_id=?2 AND period=?3",
        params![owner_id, category_id, period],
        |r| r.get(0),
    )?;
    tracing::info!(budget_id = id, owner_id, %monthly_limit, %period, "budget set");
    Ok(id)
}

fn budget_id(conn: &Connection, owner_id: i64, category: &str, period: BudgetPeriod) -> Result<i64> {
    let (category_id, _) = category_for(conn, owner_id, category)?;
    let id: Option<i64> = conn
        .query_row(
            "SELECT id FROM budgets WHERE owner_id=?1 AND category_id=?2 AND period=?3",
            params![owner_id, category_id, period],
            |r| r.get(0),
        )
        .optional()?;
    id.ok_or_else(|| LedgerError::not_found("Budget", format!("{} ({})", category, period)).into())
}

pub fn remove_budget(
    conn: &Connection,
    owner_id: i64,
    category: &str,
    period: BudgetPeriod,
) -> Result<()> {
    let id = budget_id(conn, owner_id, category, period)?;
    conn.execute("DELETE FROM budgets WHERE id=?1", params![id])?;
    tracing::info!(budget_id = id, "budget deleted");
    Ok(())
}

pub fn set_budget_active(
    conn: &Connection,
    owner_id: i64,
    category: &str,
    period: BudgetPeriod,
    active: bool,
) -> Result<()> {
    let id = budget_id(conn, owner_id, category, period)?;
    conn.execute(
        "UPDATE budgets SET is_active=?1, updated_at=datetime('now') WHERE id=?2",
        params![active, id],
    )?;
    tracing::info!(budget_id = id, active, "budget activity toggled");
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct BudgetRow {
    #[serde(flatten)]
    pub budget: Budget,
    pub category: String,
    pub yearly_limit: Decimal,
}

pub fn list_budgets(conn: &Connection, owner_id: i64) -> Result<Vec<BudgetRow>> {
    let sql = format!(
        "SELECT {}, c.name FROM budgets b JOIN categories c ON b.category_id=c.id
         WHERE b.owner_id=?1 ORDER BY c.name, b.period",
        Budget::COLUMNS
            .split(", ")
            .map(|c| format!("b.{}", c))
            .collect::<Vec<_>>()
            .join(", ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![owner_id], |r| {
        Ok((Budget::from_row(r)?, r.get::<_, String>(6)?))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (budget, category) = row?;
        out.push(BudgetRow {
            yearly_limit: budget.yearly_limit(),
            budget,
            category,
        });
    }
    Ok(out)
}

fn list(conn: &Connection, scope: &Scope, sub: &clap::ArgMatches) -> Result<()> {
    let data = list_budgets(conn, scope.owner_id)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .into_iter()
            .map(|b| {
                vec![
                    b.category,
                    b.budget.period.to_string(),
                    format!("{:.2}", b.budget.monthly_limit),
                    format!("{:.2}", b.yearly_limit),
                    if b.budget.is_active { "yes" } else { "no" }.to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Category", "Period", "Limit", "Yearly", "Active"], rows)
        );
    }
    Ok(())
}

/// Absolute spend of one category for the owner in `[from, until)`.
pub fn category_spent(
    conn: &Connection,
    owner_id: i64,
    category_id: i64,
    from: NaiveDate,
    until: NaiveDate,
) -> Result<Decimal> {
    let mut stmt = conn.prepare_cached(
        "SELECT amount FROM transactions
         WHERE owner_id=?1 AND category_id=?2 AND date>=?3 AND date<?4",
    )?;
    let rows = stmt.query_map(params![owner_id, category_id, from, until], |r| {
        decimal_at(r, 0)
    })?;
    let mut total = Decimal::ZERO;
    for row in rows {
        total += row?;
    }
    Ok(total.abs())
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetStatusRow {
    pub budget_id: i64,
    pub category: String,
    pub color: String,
    pub period: BudgetPeriod,
    pub limit: Decimal,
    pub spent: Decimal,
    pub remaining: Decimal,
    /// Rounded to one decimal; `status` is decided on the exact value.
    pub percentage: Decimal,
    pub status: BudgetStatus,
    pub days_left: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetSummary {
    pub budget_count: usize,
    pub total_budget: Decimal,
    pub total_spent: Decimal,
    pub total_remaining: Decimal,
    pub percentage: Decimal,
    pub over_budget_count: usize,
    pub warning_count: usize,
    pub on_track_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpenseSlice {
    pub category: String,
    pub color: String,
    pub value: Decimal,
    pub percentage: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetOverview {
    pub month_start: NaiveDate,
    pub days_left: i64,
    pub budgets: Vec<BudgetStatusRow>,
    pub summary: BudgetSummary,
    pub expense_breakdown: Vec<ExpenseSlice>,
}

/// Month-to-date consumption of every active budget, with totals and the
/// month's expense split for charts.
pub fn overview(conn: &Connection, owner_id: i64, today: NaiveDate) -> Result<BudgetOverview> {
    let start = month_start(today);
    let next = next_month_start(today)?;
    let days_left = (next - today).num_days();

    let mut stmt = conn.prepare(
        "SELECT b.id, b.category_id, b.monthly_limit, b.period, c.name, c.color
         FROM budgets b JOIN categories c ON b.category_id=c.id
         WHERE b.owner_id=?1 AND b.is_active=1
         ORDER BY c.name, b.period",
    )?;
    let rows = stmt.query_map(params![owner_id], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, i64>(1)?,
            decimal_at(r, 2)?,
            r.get::<_, BudgetPeriod>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
        ))
    })?;

    let mut budgets = Vec::new();
    for row in rows {
        let (budget_id, category_id, limit, period, category, color) = row?;
        let spent = category_spent(conn, owner_id, category_id, start, next)?;
        let percentage = percent_of(spent, limit);
        budgets.push(BudgetStatusRow {
            budget_id,
            category,
            color,
            period,
            limit,
            spent,
            remaining: limit - spent,
            percentage: percentage.round_dp(1),
            status: BudgetStatus::from_percentage(percentage),
            days_left,
        });
    }

    let total_budget: Decimal = budgets.iter().map(|b| b.limit).sum();
    let total_spent: Decimal = budgets.iter().map(|b| b.spent).sum();
    let count = |status: BudgetStatus| budgets.iter().filter(|b| b.status == status).count();
    let summary = BudgetSummary {
        budget_count: budgets.len(),
        total_budget,
        total_spent,
        total_remaining: total_budget - total_spent,
        percentage: percent_of(total_spent, total_budget).round_dp(1),
        over_budget_count: count(BudgetStatus::Exceeded),
        warning_count: count(BudgetStatus::Warning),
        on_track_count: count(BudgetStatus::Good),
    };
    tracing::debug!(owner_id, budgets = budgets.len(), %total_spent, "budget overview computed");

    Ok(BudgetOverview {
        month_start: start,
        days_left,
        expense_breakdown: expense_breakdown(conn, owner_id, start, next)?,
        budgets,
        summary,
    })
}

/// Spend per expense category in `[from, until)`, budgeted or not,
/// largest first.
pub fn expense_breakdown(
    conn: &Connection,
    owner_id: i64,
    from: NaiveDate,
    until: NaiveDate,
) -> Result<Vec<ExpenseSlice>> {
    let mut stmt = conn.prepare(
        "SELECT c.name, c.color, t.amount FROM transactions t
         JOIN categories c ON t.category_id=c.id
         WHERE t.owner_id=?1 AND c.type='EXPENSE' AND t.date>=?2 AND t.date<?3",
    )?;
    let rows = stmt.query_map(params![owner_id, from, until], |r| {
        Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?, decimal_at(r, 2)?))
    })?;
    let mut agg: BTreeMap<String, (String, Decimal)> = BTreeMap::new();
    for row in rows {
        let (name, color, amount) = row?;
        agg.entry(name).or_insert((color, Decimal::ZERO)).1 += amount.abs();
    }
    let total: Decimal = agg.values().map(|(_, v)| *v).sum();
    let mut slices: Vec<ExpenseSlice> = agg
        .into_iter()
        .map(|(category, (color, value))| ExpenseSlice {
            percentage: percent_of(value, total).round_dp(1),
            category,
            color,
            value,
        })
        .collect();
    slices.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.category.cmp(&b.category)));
    Ok(slices)
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetAlert {
    pub budget_id: i64,
    pub category: String,
    pub spent: Decimal,
    pub limit: Decimal,
    pub percentage: Decimal,
    pub status: BudgetStatus,
}

/// Budgets at or above 80% of their limit, most consumed first.
pub fn alerts(conn: &Connection, owner_id: i64, today: NaiveDate) -> Result<Vec<BudgetAlert>> {
    let start = month_start(today);
    let next = next_month_start(today)?;
    let mut stmt = conn.prepare(
        "SELECT b.id, b.category_id, b.monthly_limit, c.name
         FROM budgets b JOIN categories c ON b.category_id=c.id
         WHERE b.owner_id=?1 AND b.is_active=1",
    )?;
    let rows = stmt.query_map(params![owner_id], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, i64>(1)?,
            decimal_at(r, 2)?,
            r.get::<_, String>(3)?,
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (budget_id, category_id, limit, category) = row?;
        let spent = category_spent(conn, owner_id, category_id, start, next)?;
        let percentage = percent_of(spent, limit);
        if !is_alert(percentage) {
            continue;
        }
        let status = if percentage > Decimal::ONE_HUNDRED {
            BudgetStatus::Exceeded
        } else {
            BudgetStatus::Warning
        };
        out.push((
            percentage,
            BudgetAlert {
                budget_id,
                category,
                spent,
                limit,
                percentage: percentage.round_dp(1),
                status,
            },
        ));
    }
    out.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.category.cmp(&b.1.category)));
    Ok(out.into_iter().map(|(_, alert)| alert).collect())
}

fn print_overview(conn: &Connection, scope: &Scope, sub: &clap::ArgMatches) -> Result<()> {
    let ov = overview(conn, scope.owner_id, scope.today)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &ov)? {
        return Ok(());
    }
    let ccy = config::currency(conn)?;
    let rows = ov
        .budgets
        .iter()
        .map(|b| {
            vec![
                b.category.clone(),
                format!("{:.2}", b.limit),
                format!("{:.2}", b.spent),
                format!("{:.2}", b.remaining),
                format!("{:.1}%", b.percentage),
                b.status.as_str().to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Category", "Limit", "Spent", "Remaining", "Used", "Status"],
            rows
        )
    );
    let s = &ov.summary;
    println!(
        "Total {:.2} / {:.2} {} ({:.1}%), {} over budget, {} days left",
        s.total_spent, s.total_budget, ccy, s.percentage, s.over_budget_count, ov.days_left
    );
    Ok(())
}

fn print_alerts(conn: &Connection, scope: &Scope, sub: &clap::ArgMatches) -> Result<()> {
    let data = alerts(conn, scope.owner_id, scope.today)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        if data.is_empty() {
            println!("No budget alerts");
            return Ok(());
        }
        let rows = data
            .into_iter()
            .map(|a| {
                vec![
                    a.category,
                    format!("{:.2}", a.spent),
                    format!("{:.2}", a.limit),
                    format!("{:.1}%", a.percentage),
                    a.status.as_str().to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Category", "Spent", "Limit", "Used", "Status"], rows)
        );
    }
    Ok(())
}
