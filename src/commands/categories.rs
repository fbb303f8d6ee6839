// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, OptionalExtension, params};

use super::Scope;
use crate::errors::LedgerError;
use crate::models::{Category, CategoryType};
use crate::utils::{maybe_print_json, pretty_table};

static COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("static color pattern"));

const DEFAULT_COLOR: &str = "#000000";

pub struct NewCategory<'a> {
    pub name: &'a str,
    pub r#type: CategoryType,
    pub icon: &'a str,
    pub color: &'a str,
}

pub fn handle(conn: &Connection, scope: &Scope, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let new = NewCategory {
                name: sub.get_one::<String>("name").unwrap().trim(),
                r#type: sub.get_one::<String>("type").unwrap().parse()?,
                icon: sub.get_one::<String>("icon").map(|s| s.trim()).unwrap_or(""),
                color: sub
                    .get_one::<String>("color")
                    .map(|s| s.trim())
                    .unwrap_or(DEFAULT_COLOR),
            };
            let owner = if sub.get_flag("system") {
                None
            } else {
                Some(scope.owner_id)
            };
            add_category(conn, owner, &new)?;
            let scope_label = if owner.is_none() { "shared" } else { "own" };
            println!(
                "Added {} category '{}' ({})",
                scope_label, new.name, new.r#type
            );
        }
        Some(("list", sub)) => {
            let typ = sub
                .get_one::<String>("type")
                .map(|s| s.parse::<CategoryType>())
                .transpose()?;
            let data = list_categories(conn, scope.owner_id, typ)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|c| {
                        vec![
                            c.name,
                            c.r#type.to_string(),
                            c.icon,
                            c.color,
                            if c.owner_id.is_none() { "default" } else { "own" }.to_string(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Category", "Type", "Icon", "Color", "Scope"], rows)
                );
            }
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            remove_category(conn, scope.owner_id, name)?;
            println!("Removed category '{}'", name);
        }
        _ => {}
    }
    Ok(())
}

/// `owner_id = None` creates a shared system default.
pub fn add_category(conn: &Connection, owner_id: Option<i64>, new: &NewCategory<'_>) -> Result<i64> {
    if new.name.is_empty() {
        return Err(LedgerError::Validation("Category name must not be empty".into()).into());
    }
    if !COLOR_RE.is_match(new.color) {
        return Err(LedgerError::Validation(format!(
            "Invalid color '{}', expected #RRGGBB",
            new.color
        ))
        .into());
    }
    // UNIQUE(name, owner_id) does not fire for NULL owners, so check here.
    let taken: Option<i64> = conn
        .query_row(
            "SELECT id FROM categories WHERE name=?1 AND owner_id IS ?2",
            params![new.name, owner_id],
            |r| r.get(0),
        )
        .optional()?;
    if taken.is_some() {
        return Err(LedgerError::duplicate("Category", new.name).into());
    }
    conn.execute(
        "INSERT INTO categories(owner_id, name, type, icon, color, is_default)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            owner_id,
            new.name,
            new.r#type,
            new.icon,
            new.color,
            owner_id.is_none()
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(category_id = id, ?owner_id, kind = %new.r#type, "category created");
    Ok(id)
}

/// Own categories plus the shared defaults.
pub fn list_categories(
    conn: &Connection,
    owner_id: i64,
    typ: Option<CategoryType>,
) -> Result<Vec<Category>> {
    let sql = format!(
        "SELECT {} FROM categories
         WHERE (owner_id=?1 OR (owner_id IS NULL AND is_default=1))
           AND (?2 IS NULL OR type=?2)
         ORDER BY type, name",
        Category::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![owner_id, typ], Category::from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Only the owner's own categories can be removed; defaults are shared.
pub fn remove_category(conn: &Connection, owner_id: i64, name: &str) -> Result<()> {
    let removed = conn.execute(
        "DELETE FROM categories WHERE owner_id=?1 AND name=?2",
        params![owner_id, name],
    )?;
    if removed == 0 {
        return Err(LedgerError::not_found("Category", name).into());
    }
    tracing::info!(owner_id, name, "category deleted");
    Ok(())
}
