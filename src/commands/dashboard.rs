// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use super::Scope;
use crate::config;
use crate::errors::LedgerError;
use crate::metrics::{pct_change, percent_of};
use crate::models::{AssetType, CategoryType};
use crate::utils::{decimal_at, pretty_table};

pub const LIQUIDITIES: &str = "Liquidities";

pub fn handle(conn: &Connection, scope: &Scope, sub: &clap::ArgMatches) -> Result<()> {
    let period: WealthPeriod = sub.get_one::<String>("period").unwrap().parse()?;
    let window = *sub.get_one::<u32>("window").unwrap();
    let mode: EvolutionMode = sub.get_one::<String>("evolution").unwrap().parse()?;
    let stats = dashboard_stats(conn, scope.owner_id, scope.today, period, window, mode)?;
    if crate::utils::maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &stats)? {
        return Ok(());
    }
    print_dashboard(conn, &stats)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodStats {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub income: Decimal,
    /// Positive magnitude of the expense partition.
    pub expenses: Decimal,
    pub savings: Decimal,
    pub transactions_count: usize,
}

/// Income, expense and count totals for `[start, end]`, both inclusive.
pub fn period_stats(
    conn: &Connection,
    owner_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PeriodStats> {
    let mut stmt = conn.prepare_cached(
        "SELECT c.type, t.amount FROM transactions t
         JOIN categories c ON t.category_id=c.id
         WHERE t.owner_id=?1 AND t.date>=?2 AND t.date<=?3",
    )?;
    let rows = stmt.query_map(params![owner_id, start, end], |r| {
        Ok((r.get::<_, CategoryType>(0)?, decimal_at(r, 1)?))
    })?;

    let mut income = Decimal::ZERO;
    let mut raw_expenses = Decimal::ZERO;
    let mut count = 0;
    for row in rows {
        let (kind, amount) = row?;
        match kind {
            CategoryType::Income => income += amount,
            CategoryType::Expense => raw_expenses += amount,
        }
        count += 1;
    }
    Ok(PeriodStats {
        start,
        end,
        income,
        expenses: raw_expenses.abs(),
        savings: income + raw_expenses,
        transactions_count: count,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct WindowComparison {
    pub window_days: u32,
    pub current: PeriodStats,
    pub previous: PeriodStats,
    pub income_change: Decimal,
    pub expenses_change: Decimal,
    pub savings_change: Decimal,
    pub transactions_change: Decimal,
}

/// Compares the `window_days` ending today with the equally long window
/// right before it.
/// Longest comparison window accepted, about ten years.
pub const MAX_WINDOW_DAYS: u32 = 3650;

pub fn compare_windows(
    conn: &Connection,
    owner_id: i64,
    today: NaiveDate,
    window_days: u32,
) -> Result<WindowComparison> {
    if window_days == 0 || window_days > MAX_WINDOW_DAYS {
        return Err(LedgerError::Validation(format!(
            "Window must span 1 to {} days, got {}",
            MAX_WINDOW_DAYS, window_days
        ))
        .into());
    }
    let span = Duration::days(i64::from(window_days) - 1);
    let out_of_range = || {
        LedgerError::Validation(format!(
            "{} day windows before {} are out of range",
            window_days, today
        ))
    };
    let current_start = today.checked_sub_signed(span).ok_or_else(out_of_range)?;
    let previous_end = current_start
        .checked_sub_signed(Duration::days(1))
        .ok_or_else(out_of_range)?;
    let previous_start = previous_end.checked_sub_signed(span).ok_or_else(out_of_range)?;

    let current = period_stats(conn, owner_id, current_start, today)?;
    let previous = period_stats(conn, owner_id, previous_start, previous_end)?;
    let round = |d: Decimal| d.round_dp(2);
    Ok(WindowComparison {
        window_days,
        income_change: round(pct_change(current.income, previous.income)),
        expenses_change: round(pct_change(current.expenses, previous.expenses)),
        savings_change: round(pct_change(current.savings, previous.savings)),
        transactions_change: round(pct_change(
            Decimal::from(current.transactions_count),
            Decimal::from(previous.transactions_count),
        )),
        current,
        previous,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WealthSnapshot {
    pub accounts_total: Decimal,
    pub accounts_count: usize,
    pub assets_total: Decimal,
    pub assets_count: usize,
    pub total: Decimal,
}

/// Active account balances plus active asset values, as of now.
pub fn wealth_snapshot(conn: &Connection, owner_id: i64) -> Result<WealthSnapshot> {
    let (accounts_total, accounts_count) = sum_column(
        conn,
        "SELECT balance FROM accounts WHERE owner_id=?1 AND is_active=1",
        owner_id,
    )?;
    let (assets_total, assets_count) = sum_column(
        conn,
        "SELECT current_value FROM assets WHERE owner_id=?1 AND is_active=1",
        owner_id,
    )?;
    Ok(WealthSnapshot {
        accounts_total,
        accounts_count,
        assets_total,
        assets_count,
        total: accounts_total + assets_total,
    })
}

fn sum_column(conn: &Connection, sql: &str, owner_id: i64) -> Result<(Decimal, usize)> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params![owner_id], |r| decimal_at(r, 0))?;
    let mut total = Decimal::ZERO;
    let mut count = 0;
    for row in rows {
        total += row?;
        count += 1;
    }
    Ok((total, count))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionBucket {
    pub label: String,
    pub value: Decimal,
    pub count: usize,
    pub percentage: Decimal,
}

/// Wealth split by asset type label, plus one "Liquidities" bucket for
/// accounts when their total is positive. Shares are taken over the
/// bucket sum so they add up to 100 whenever anything is held.
pub fn wealth_composition(conn: &Connection, owner_id: i64) -> Result<Vec<CompositionBucket>> {
    let mut stmt = conn.prepare_cached(
        "SELECT asset_type, current_value FROM assets WHERE owner_id=?1 AND is_active=1",
    )?;
    let rows = stmt.query_map(params![owner_id], |r| {
        Ok((r.get::<_, AssetType>(0)?, decimal_at(r, 1)?))
    })?;
    let mut by_type: BTreeMap<AssetType, (Decimal, usize)> = BTreeMap::new();
    for row in rows {
        let (kind, value) = row?;
        let entry = by_type.entry(kind).or_insert((Decimal::ZERO, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    let mut buckets: Vec<CompositionBucket> = by_type
        .into_iter()
        .map(|(kind, (value, count))| CompositionBucket {
            label: kind.label().to_string(),
            value,
            count,
            percentage: Decimal::ZERO,
        })
        .collect();

    let (accounts_total, accounts_count) = sum_column(
        conn,
        "SELECT balance FROM accounts WHERE owner_id=?1 AND is_active=1",
        owner_id,
    )?;
    if accounts_total > Decimal::ZERO {
        buckets.push(CompositionBucket {
            label: LIQUIDITIES.to_string(),
            value: accounts_total,
            count: accounts_count,
            percentage: Decimal::ZERO,
        });
    }

    let total: Decimal = buckets.iter().map(|b| b.value).sum();
    for b in &mut buckets {
        b.percentage = percent_of(b.value, total).round_dp(2);
    }
    buckets.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.label.cmp(&b.label)));
    Ok(buckets)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WealthPeriod {
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "YTD")]
    YearToDate,
    #[serde(rename = "MAX")]
    Max,
}

impl WealthPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            WealthPeriod::OneMonth => "1M",
            WealthPeriod::SixMonths => "6M",
            WealthPeriod::OneYear => "1Y",
            WealthPeriod::YearToDate => "YTD",
            WealthPeriod::Max => "MAX",
        }
    }

    /// Span, point count and label format of the evolution chart.
    pub fn series_config(&self, today: NaiveDate) -> SeriesConfig {
        match self {
            WealthPeriod::OneMonth => SeriesConfig::new(30, 30, "%d/%m"),
            WealthPeriod::SixMonths => SeriesConfig::new(180, 26, "%d/%m"),
            WealthPeriod::OneYear => SeriesConfig::new(365, 12, "%b %Y"),
            WealthPeriod::YearToDate => {
                let days = i64::from(today.ordinal0()).max(1);
                let points = (today.month() as usize + 1).min(days as usize + 1);
                SeriesConfig::new(days, points.max(2), "%d/%m")
            }
            WealthPeriod::Max => SeriesConfig::new(1825, 20, "%b %Y"),
        }
    }
}

impl fmt::Display for WealthPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WealthPeriod {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "1M" => Ok(WealthPeriod::OneMonth),
            "6M" => Ok(WealthPeriod::SixMonths),
            "1Y" => Ok(WealthPeriod::OneYear),
            "YTD" => Ok(WealthPeriod::YearToDate),
            "MAX" => Ok(WealthPeriod::Max),
            _ => Err(LedgerError::Validation(format!(
                "Unknown period '{}', expected 1M, 6M, 1Y, YTD or MAX",
                s.trim()
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesConfig {
    pub total_days: i64,
    pub points: usize,
    pub label_format: &'static str,
}

impl SeriesConfig {
    fn new(total_days: i64, points: usize, label_format: &'static str) -> Self {
        Self {
            total_days,
            points,
            label_format,
        }
    }

    /// Days before today of point `i`, 0 being the oldest point.
    pub fn days_ago(&self, i: usize) -> i64 {
        if self.points <= 1 {
            return 0;
        }
        let last = (self.points - 1) as i64;
        self.total_days * (last - i as i64) / last
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvolutionMode {
    Simulated,
    Replay,
}

impl FromStr for EvolutionMode {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "simulated" => Ok(EvolutionMode::Simulated),
            "replay" => Ok(EvolutionMode::Replay),
            other => Err(LedgerError::Validation(format!(
                "Unknown evolution mode '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WealthPoint {
    pub date: NaiveDate,
    pub label: String,
    pub value: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct WealthEvolution {
    pub period: WealthPeriod,
    pub mode: EvolutionMode,
    /// True when the values are illustrative rather than historical.
    pub simulated: bool,
    pub points: Vec<WealthPoint>,
}

const ANNUAL_GROWTH: f64 = 1.05;

fn oscillation(i: usize) -> f64 {
    ((i * 7 % 5) as f64 - 2.0) * 0.004
}

/// Illustrative series ending at `current`: 5% yearly growth discounted
/// back from today with a small deterministic wobble. Not a measurement.
pub fn simulate_series(current: Decimal, today: NaiveDate, cfg: &SeriesConfig) -> Vec<WealthPoint> {
    let now = current.to_f64().unwrap_or(0.0);
    (0..cfg.points)
        .map(|i| {
            let days_ago = cfg.days_ago(i);
            let date = today - Duration::days(days_ago);
            let value = if i + 1 == cfg.points {
                current
            } else if current.is_zero() {
                Decimal::ZERO
            } else {
                let years = days_ago as f64 / 365.0;
                let v = now / ANNUAL_GROWTH.powf(years) * (1.0 + oscillation(i));
                Decimal::from_f64_retain(v).unwrap_or_default().round_dp(2)
            };
            WealthPoint {
                label: date.format(cfg.label_format).to_string(),
                date,
                value,
            }
        })
        .collect()
}

/// Walks back from current active balances by undoing the transactions
/// dated after each point. Assets are held at their current value.
fn replay_series(
    conn: &Connection,
    owner_id: i64,
    today: NaiveDate,
    cfg: &SeriesConfig,
    snapshot: &WealthSnapshot,
) -> Result<Vec<WealthPoint>> {
    let oldest = today - Duration::days(cfg.total_days);
    let mut stmt = conn.prepare(
        "SELECT t.date, t.amount FROM transactions t
         JOIN accounts a ON t.account_id=a.id
         WHERE t.owner_id=?1 AND a.is_active=1 AND t.date>?2 AND t.date<=?3",
    )?;
    // Rows dated after today are not part of the current balance.
    let rows = stmt.query_map(params![owner_id, oldest, today], |r| {
        Ok((r.get::<_, NaiveDate>(0)?, decimal_at(r, 1)?))
    })?;
    let mut moves = Vec::new();
    for row in rows {
        moves.push(row?);
    }

    let points = (0..cfg.points)
        .map(|i| {
            let date = today - Duration::days(cfg.days_ago(i));
            let later: Decimal = moves
                .iter()
                .filter(|(d, _)| *d > date)
                .map(|(_, amount)| *amount)
                .sum();
            WealthPoint {
                label: date.format(cfg.label_format).to_string(),
                date,
                value: snapshot.total - later,
            }
        })
        .collect();
    Ok(points)
}

pub fn wealth_evolution(
    conn: &Connection,
    owner_id: i64,
    today: NaiveDate,
    period: WealthPeriod,
    mode: EvolutionMode,
) -> Result<WealthEvolution> {
    let snapshot = wealth_snapshot(conn, owner_id)?;
    let cfg = period.series_config(today);
    let points = match mode {
        EvolutionMode::Simulated => simulate_series(snapshot.total, today, &cfg),
        EvolutionMode::Replay => replay_series(conn, owner_id, today, &cfg, &snapshot)?,
    };
    tracing::debug!(owner_id, %period, points = points.len(), ?mode, "wealth evolution built");
    Ok(WealthEvolution {
        period,
        mode,
        simulated: mode == EvolutionMode::Simulated,
        points,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub as_of: NaiveDate,
    pub comparison: WindowComparison,
    pub wealth: WealthSnapshot,
    pub evolution: WealthEvolution,
    pub composition: Vec<CompositionBucket>,
}

pub fn dashboard_stats(
    conn: &Connection,
    owner_id: i64,
    today: NaiveDate,
    period: WealthPeriod,
    window_days: u32,
    mode: EvolutionMode,
) -> Result<DashboardStats> {
    Ok(DashboardStats {
        as_of: today,
        comparison: compare_windows(conn, owner_id, today, window_days)?,
        wealth: wealth_snapshot(conn, owner_id)?,
        evolution: wealth_evolution(conn, owner_id, today, period, mode)?,
        composition: wealth_composition(conn, owner_id)?,
    })
}

fn fmt_change(d: Decimal) -> String {
    if d > Decimal::ZERO {
        format!("+{:.1}%", d)
    } else {
        format!("{:.1}%", d)
    }
}

fn print_dashboard(conn: &Connection, stats: &DashboardStats) -> Result<()> {
    let ccy = config::currency(conn)?;
    let c = &stats.comparison;
    let rows = vec![
        vec![
            "Income".to_string(),
            format!("{:.2}", c.current.income),
            format!("{:.2}", c.previous.income),
            fmt_change(c.income_change),
        ],
        vec![
            "Expenses".to_string(),
            format!("{:.2}", c.current.expenses),
            format!("{:.2}", c.previous.expenses),
            fmt_change(c.expenses_change),
        ],
        vec![
            "Savings".to_string(),
            format!("{:.2}", c.current.savings),
            format!("{:.2}", c.previous.savings),
            fmt_change(c.savings_change),
        ],
        vec![
            "Transactions".to_string(),
            c.current.transactions_count.to_string(),
            c.previous.transactions_count.to_string(),
            fmt_change(c.transactions_change),
        ],
    ];
    let current_hdr = format!("Last {} days ({})", c.window_days, ccy);
    println!(
        "{}",
        pretty_table(&["", current_hdr.as_str(), "Previous", "Change"], rows)
    );

    let w = &stats.wealth;
    println!(
        "Wealth {:.2} {} = accounts {:.2} ({}) + assets {:.2} ({})",
        w.total, ccy, w.accounts_total, w.accounts_count, w.assets_total, w.assets_count
    );

    let rows = stats
        .composition
        .iter()
        .map(|b| {
            vec![
                b.label.clone(),
                format!("{:.2}", b.value),
                format!("{:.2}%", b.percentage),
            ]
        })
        .collect();
    println!("{}", pretty_table(&["Bucket", "Value", "Share"], rows));

    let e = &stats.evolution;
    let rows = e
        .points
        .iter()
        .map(|p| vec![p.label.clone(), format!("{:.2}", p.value)])
        .collect();
    let title = if e.simulated {
        format!("{} (simulated)", e.period)
    } else {
        format!("{} (replayed)", e.period)
    };
    println!("{}", pretty_table(&[title.as_str(), "Wealth"], rows));
    Ok(())
}
