// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::LedgerError;
use crate::utils::{id_for_user, pretty_table};

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("com.fintrack", "Fintrack", "fintrack"));

pub const DB_ENV: &str = "FINTRACK_DB";
const DEFAULT_CURRENCY: &str = "EUR";

/// Database location: `$FINTRACK_DB` when set, else the platform data dir.
pub fn db_path() -> Result<PathBuf> {
    if let Some(p) = std::env::var_os(DB_ENV) {
        let path = PathBuf::from(p);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        return Ok(path);
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("fintrack.sqlite"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    Currency,
    DefaultUser,
}

impl Setting {
    pub fn key(&self) -> &'static str {
        match self {
            Setting::Currency => "currency",
            Setting::DefaultUser => "default_user",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "currency" => Ok(Setting::Currency),
            "default-user" | "default_user" => Ok(Setting::DefaultUser),
            other => Err(LedgerError::Validation(format!("Unknown setting '{}'", other)).into()),
        }
    }
}

pub fn get_setting(conn: &Connection, setting: Setting) -> Result<Option<String>> {
    let v: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key=?1",
            params![setting.key()],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v)
}

pub fn set_setting(conn: &Connection, setting: Setting, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![setting.key(), value],
    )?;
    Ok(())
}

/// Display currency for money columns. Amounts are never converted.
pub fn currency(conn: &Connection) -> Result<String> {
    Ok(get_setting(conn, Setting::Currency)?.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()))
}

/// Resolves the acting owner: the explicit `--user` email, else the
/// `default_user` setting.
pub fn resolve_owner(conn: &Connection, explicit: Option<&str>) -> Result<i64> {
    if let Some(email) = explicit {
        return id_for_user(conn, email);
    }
    match get_setting(conn, Setting::DefaultUser)? {
        Some(email) => id_for_user(conn, &email),
        None => Err(LedgerError::Validation(
            "No user selected: pass --user <email> or run `fintrack user use <email>`".into(),
        )
        .into()),
    }
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("get", sub)) => {
            let setting = Setting::parse(sub.get_one::<String>("key").unwrap())?;
            let value = match setting {
                Setting::Currency => Some(currency(conn)?),
                Setting::DefaultUser => get_setting(conn, setting)?,
            };
            println!("{}", value.unwrap_or_else(|| "(unset)".into()));
        }
        Some(("set", sub)) => {
            let setting = Setting::parse(sub.get_one::<String>("key").unwrap())?;
            let raw = sub.get_one::<String>("value").unwrap().trim();
            let value = match setting {
                Setting::Currency => raw.to_uppercase(),
                Setting::DefaultUser => {
                    id_for_user(conn, raw)?;
                    raw.to_string()
                }
            };
            set_setting(conn, setting, &value)?;
            tracing::info!(key = setting.key(), %value, "setting updated");
            println!("{} = {}", setting.key(), value);
        }
        Some(("list", _)) => {
            let mut stmt = conn.prepare("SELECT key, value FROM settings ORDER BY key")?;
            let rows = stmt.query_map([], |r| Ok(vec![r.get::<_, String>(0)?, r.get(1)?]))?;
            let mut data = Vec::new();
            for row in rows {
                data.push(row?);
            }
            println!("{}", pretty_table(&["Key", "Value"], data));
        }
        _ => {}
    }
    Ok(())
}
