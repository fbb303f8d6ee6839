// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;

use super::Scope;
use crate::config;
use crate::errors::LedgerError;
use crate::metrics::savings_rate;
use crate::models::CategoryType;
use crate::utils::{decimal_at, maybe_print_json, month_end, months_back, pretty_table};

pub fn handle(conn: &Connection, scope: &Scope, sub: &clap::ArgMatches) -> Result<()> {
    let months = *sub.get_one::<u32>("months").unwrap();
    let trends = category_trends(conn, scope.owner_id, months, scope.today)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &trends)? {
        return Ok(());
    }
    print_trends(conn, &trends)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBucket {
    /// `YYYY-MM`
    pub key: String,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub income: Decimal,
    pub expenses: Decimal,
    pub savings: Decimal,
    pub transactions_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTrend {
    pub category: String,
    pub color: String,
    /// Aligned with `CategoryTrends::months`.
    pub monthly: Vec<Decimal>,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BiggestExpense {
    pub id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub category: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSummary {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub avg_monthly_income: Decimal,
    pub avg_monthly_expenses: Decimal,
    pub savings_rate: Decimal,
    pub top_category: Option<String>,
    pub biggest_expense: Option<BiggestExpense>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryTrends {
    pub months: Vec<MonthBucket>,
    pub categories: Vec<CategoryTrend>,
    pub summary: TrendSummary,
}

struct Movement {
    id: i64,
    date: NaiveDate,
    amount: Decimal,
    description: String,
    category: String,
    color: String,
    kind: CategoryType,
}

/// Longest trend history accepted, twenty years.
pub const MAX_TREND_MONTHS: u32 = 240;

/// Calendar months from `months - 1` months ago up to today's month,
/// oldest first. Every month is present even without activity.
pub fn month_windows(today: NaiveDate, months: u32) -> Result<Vec<(NaiveDate, NaiveDate)>> {
    if months == 0 || months > MAX_TREND_MONTHS {
        return Err(LedgerError::Validation(format!(
            "Trends cover 1 to {} months, got {}",
            MAX_TREND_MONTHS, months
        ))
        .into());
    }
    let mut out = Vec::with_capacity(months as usize);
    for k in 0..months {
        let start = months_back(today, k)?;
        out.push((start, month_end(start.year(), start.month())?));
    }
    out.reverse();
    Ok(out)
}

pub fn category_trends(
    conn: &Connection,
    owner_id: i64,
    months: u32,
    today: NaiveDate,
) -> Result<CategoryTrends> {
    let windows = month_windows(today, months)?;
    let (first, last) = (windows[0].0, windows[windows.len() - 1].1);

    let mut stmt = conn.prepare(
        "SELECT t.id, t.date, t.amount, t.description, c.name, c.color, c.type
         FROM transactions t JOIN categories c ON t.category_id=c.id
         WHERE t.owner_id=?1 AND t.date>=?2 AND t.date<=?3
         ORDER BY t.date, t.id",
    )?;
    let rows = stmt.query_map(params![owner_id, first, last], |r| {
        Ok(Movement {
            id: r.get(0)?,
            date: r.get(1)?,
            amount: decimal_at(r, 2)?,
            description: r.get(3)?,
            category: r.get(4)?,
            color: r.get(5)?,
            kind: r.get(6)?,
        })
    })?;
    let mut movements = Vec::new();
    for row in rows {
        movements.push(row?);
    }

    let mut buckets: Vec<MonthBucket> = windows
        .iter()
        .map(|&(start, end)| MonthBucket {
            key: start.format("%Y-%m").to_string(),
            label: start.format("%b %Y").to_string(),
            start,
            end,
            income: Decimal::ZERO,
            expenses: Decimal::ZERO,
            savings: Decimal::ZERO,
            transactions_count: 0,
        })
        .collect();

    let mut raw_expenses = Decimal::ZERO;
    let mut by_category: BTreeMap<String, CategoryTrend> = BTreeMap::new();
    let mut biggest: Option<&Movement> = None;
    for mv in &movements {
        let Some(idx) = windows.iter().position(|&(s, e)| mv.date >= s && mv.date <= e) else {
            continue;
        };
        let bucket = &mut buckets[idx];
        bucket.transactions_count += 1;
        match mv.kind {
            CategoryType::Income => bucket.income += mv.amount,
            CategoryType::Expense => {
                bucket.expenses += mv.amount.abs();
                raw_expenses += mv.amount;
                let trend = by_category
                    .entry(mv.category.clone())
                    .or_insert_with(|| CategoryTrend {
                        category: mv.category.clone(),
                        color: mv.color.clone(),
                        monthly: vec![Decimal::ZERO; windows.len()],
                        total: Decimal::ZERO,
                    });
                trend.monthly[idx] += mv.amount.abs();
                trend.total += mv.amount.abs();
                // Rows arrive by date then id, so strict `<` keeps the earliest.
                if biggest.is_none_or(|b| mv.amount < b.amount) {
                    biggest = Some(mv);
                }
            }
        }
    }
    for b in &mut buckets {
        b.savings = b.income - b.expenses;
    }

    let total_income: Decimal = buckets.iter().map(|b| b.income).sum();
    let total_expenses: Decimal = buckets.iter().map(|b| b.expenses).sum();
    let n = Decimal::from(months);

    let mut categories: Vec<CategoryTrend> = by_category.into_values().collect();
    categories.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
    let top_category = categories.first().map(|c| c.category.clone());

    let summary = TrendSummary {
        total_income,
        total_expenses,
        avg_monthly_income: (total_income / n).round_dp(2),
        avg_monthly_expenses: (total_expenses / n).round_dp(2),
        savings_rate: savings_rate(total_income, raw_expenses).round_dp(2),
        top_category,
        biggest_expense: biggest.map(|m| BiggestExpense {
            id: m.id,
            date: m.date,
            description: m.description.clone(),
            category: m.category.clone(),
            amount: m.amount,
        }),
    };
    tracing::debug!(owner_id, months, rows = movements.len(), "category trends built");
    Ok(CategoryTrends {
        months: buckets,
        categories,
        summary,
    })
}

fn print_trends(conn: &Connection, t: &CategoryTrends) -> Result<()> {
    let ccy = config::currency(conn)?;
    let rows = t
        .months
        .iter()
        .map(|m| {
            vec![
                m.label.clone(),
                format!("{:.2}", m.income),
                format!("{:.2}", m.expenses),
                format!("{:.2}", m.savings),
                m.transactions_count.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Month", "Income", "Expenses", "Savings", "Txns"], rows)
    );

    if !t.categories.is_empty() {
        let mut headers = vec!["Category".to_string()];
        headers.extend(t.months.iter().map(|m| m.label.clone()));
        headers.push("Total".to_string());
        let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
        let rows = t
            .categories
            .iter()
            .map(|c| {
                let mut row = vec![c.category.clone()];
                row.extend(c.monthly.iter().map(|v| format!("{:.2}", v)));
                row.push(format!("{:.2}", c.total));
                row
            })
            .collect();
        println!("{}", pretty_table(&header_refs, rows));
    }

    let s = &t.summary;
    println!(
        "Income {:.2} {ccy} (avg {:.2}/month), expenses {:.2} {ccy} (avg {:.2}/month), savings rate {:.2}%",
        s.total_income, s.avg_monthly_income, s.total_expenses, s.avg_monthly_expenses, s.savings_rate
    );
    if let Some(top) = &s.top_category {
        println!("Top category: {}", top);
    }
    if let Some(b) = &s.biggest_expense {
        println!(
            "Biggest expense: {:.2} {} on {} ({}, {})",
            b.amount, ccy, b.date, b.category, b.description
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_date;

    #[test]
    fn windows_cover_whole_months_oldest_first() {
        let w = month_windows(parse_date("2024-03-10").unwrap(), 3).unwrap();
        let got: Vec<(String, String)> = w
            .iter()
            .map(|(s, e)| (s.to_string(), e.to_string()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("2024-01-01".to_string(), "2024-01-31".to_string()),
                ("2024-02-01".to_string(), "2024-02-29".to_string()),
                ("2024-03-01".to_string(), "2024-03-31".to_string()),
            ]
        );
    }

    #[test]
    fn windows_cross_year_boundary() {
        let w = month_windows(parse_date("2025-01-05").unwrap(), 2).unwrap();
        assert_eq!(w[0].0.to_string(), "2024-12-01");
        assert_eq!(w[1].1.to_string(), "2025-01-31");
    }

    #[test]
    fn window_count_is_bounded() {
        let today = parse_date("2025-01-05").unwrap();
        assert_eq!(month_windows(today, MAX_TREND_MONTHS).unwrap().len(), 240);
        assert!(month_windows(today, MAX_TREND_MONTHS + 1).is_err());
        assert!(month_windows(today, 3_000_000_000).is_err());
        assert!(month_windows(today, 0).is_err());
    }
}
