// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, NaiveDate};
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;

use crate::errors::LedgerError;
use crate::models::CategoryType;

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

/// Parses `YYYY-MM` into the first day of that month.
pub fn parse_month(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{}', expected YYYY-MM", s))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.trim()
        .parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

/// Money columns hold at most 10 integer digits and 2 decimals.
pub const MONEY_SCALE: u32 = 2;

fn money_limit() -> Decimal {
    Decimal::from(10_000_000_000i64)
}

/// Rejects amounts outside the storable money range so later sums and
/// ratios stay within `Decimal` bounds.
pub fn ensure_money(label: &str, d: Decimal) -> Result<()> {
    if d.abs() >= money_limit() {
        return Err(LedgerError::Validation(format!(
            "{} {} is out of range (at most 10 integer digits)",
            label, d
        ))
        .into());
    }
    if d.normalize().scale() > MONEY_SCALE {
        return Err(LedgerError::Validation(format!(
            "{} {} has more than {} decimal places",
            label, d, MONEY_SCALE
        ))
        .into());
    }
    Ok(())
}

pub fn fmt_money(d: &Decimal, ccy: &str) -> String {
    format!("{} {:.2}", ccy, d.round_dp(2))
}

/// Reads a TEXT-encoded decimal column.
pub fn decimal_at(r: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = r.get(idx)?;
    raw.parse::<Decimal>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub fn opt_decimal_at(r: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = r.get(idx)?;
    raw.map(|s| {
        s.parse::<Decimal>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // Arrays stream one element per line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

pub fn id_for_user(conn: &Connection, email: &str) -> Result<i64> {
    let id: Option<i64> = conn
        .query_row(
            "SELECT id FROM users WHERE email=?1",
            params![email.trim()],
            |r| r.get(0),
        )
        .optional()?;
    id.ok_or_else(|| LedgerError::not_found("User", email.trim()).into())
}

pub fn id_for_account(conn: &Connection, owner_id: i64, name: &str) -> Result<i64> {
    let id: Option<i64> = conn
        .query_row(
            "SELECT id FROM accounts WHERE owner_id=?1 AND name=?2",
            params![owner_id, name.trim()],
            |r| r.get(0),
        )
        .optional()?;
    id.ok_or_else(|| LedgerError::not_found("Account", name.trim()).into())
}

/// Resolves a category visible to `owner_id`: its own first, then the
/// shared system defaults.
pub fn category_for(conn: &Connection, owner_id: i64, name: &str) -> Result<(i64, CategoryType)> {
    let found: Option<(i64, CategoryType)> = conn
        .query_row(
            "SELECT id, type FROM categories
             WHERE name=?2 AND (owner_id=?1 OR owner_id IS NULL)
             ORDER BY owner_id IS NULL LIMIT 1",
            params![owner_id, name.trim()],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    found.ok_or_else(|| LedgerError::not_found("Category", name.trim()).into())
}

pub fn id_for_asset(conn: &Connection, owner_id: i64, name: &str) -> Result<i64> {
    let id: Option<i64> = conn
        .query_row(
            "SELECT id FROM assets WHERE owner_id=?1 AND name=?2",
            params![owner_id, name.trim()],
            |r| r.get(0),
        )
        .optional()?;
    id.ok_or_else(|| LedgerError::not_found("Asset", name.trim()).into())
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the month after `date`'s month; December rolls into
/// January of the next year.
pub fn next_month_start(date: NaiveDate) -> Result<NaiveDate> {
    let (y, m) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1).ok_or_else(|| anyhow!("Date out of range after {}", date))
}

/// Last calendar day of the given month.
pub fn month_end(year: i32, month: u32) -> Result<NaiveDate> {
    let last_day = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
                29
            } else {
                28
            }
        }
        _ => return Err(anyhow!("Invalid month number {}", month)),
    };
    NaiveDate::from_ymd_opt(year, month, last_day)
        .ok_or_else(|| anyhow!("Invalid month {}-{:02}", year, month))
}

/// First day of the month `back` months before `date`'s month.
pub fn months_back(date: NaiveDate, back: u32) -> Result<NaiveDate> {
    let back = i32::try_from(back).with_context(|| format!("{} months is too far back", back))?;
    let index = (date.year() * 12 + date.month0() as i32)
        .checked_sub(back)
        .ok_or_else(|| anyhow!("Date out of range {} months before {}", back, date))?;
    let (y, m0) = (index.div_euclid(12), index.rem_euclid(12) as u32);
    NaiveDate::from_ymd_opt(y, m0 + 1, 1)
        .ok_or_else(|| anyhow!("Date out of range {} months before {}", back, date))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn month_end_handles_leap_years() {
        assert_eq!(month_end(2024, 2).unwrap(), d("2024-02-29"));
        assert_eq!(month_end(2025, 2).unwrap(), d("2025-02-28"));
        assert_eq!(month_end(1900, 2).unwrap(), d("1900-02-28"));
        assert_eq!(month_end(2025, 4).unwrap(), d("2025-04-30"));
        assert!(month_end(2025, 13).is_err());
    }

    #[test]
    fn next_month_rolls_over_the_year() {
        assert_eq!(next_month_start(d("2025-12-15")).unwrap(), d("2026-01-01"));
        assert_eq!(next_month_start(d("2025-01-31")).unwrap(), d("2025-02-01"));
    }

    #[test]
    fn months_back_crosses_years() {
        assert_eq!(months_back(d("2025-03-18"), 0).unwrap(), d("2025-03-01"));
        assert_eq!(months_back(d("2025-03-18"), 3).unwrap(), d("2024-12-01"));
        assert_eq!(months_back(d("2025-03-18"), 15).unwrap(), d("2023-12-01"));
    }

    #[test]
    fn months_back_out_of_range_is_an_error() {
        assert!(months_back(d("2025-03-18"), u32::MAX).is_err());
        assert!(months_back(d("2025-03-18"), 3_000_000_000).is_err());
        assert!(months_back(d("2025-03-18"), i32::MAX as u32).is_err());
    }

    #[test]
    fn money_bounds() {
        let dec = |s: &str| s.parse::<Decimal>().unwrap();
        assert!(ensure_money("Amount", dec("9999999999.99")).is_ok());
        assert!(ensure_money("Amount", dec("-9999999999.99")).is_ok());
        assert!(ensure_money("Amount", dec("12.500")).is_ok());
        assert!(ensure_money("Amount", dec("10000000000")).is_err());
        assert!(ensure_money("Amount", dec("1000000000000000000000000000")).is_err());
        assert!(ensure_money("Amount", dec("0.001")).is_err());
    }

    #[test]
    fn parse_helpers_trim_inputs() {
        assert_eq!(parse_date(" 2025-07-01 ").unwrap(), d("2025-07-01"));
        assert_eq!(parse_month("2025-07").unwrap(), d("2025-07-01"));
        assert_eq!(parse_decimal(" 12.50 ").unwrap().to_string(), "12.50");
        assert!(parse_month("2025-13").is_err());
    }
}
