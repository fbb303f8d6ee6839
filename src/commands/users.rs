// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};

use crate::config::{self, Setting};
use crate::errors::LedgerError;
use crate::models::User;
use crate::utils::{id_for_user, pretty_table};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let email = sub.get_one::<String>("email").unwrap();
            let name = sub.get_one::<String>("name").unwrap();
            let id = add_user(conn, email, name)?;
            println!("Added user '{}' (id {})", email.trim(), id);
        }
        Some(("list", _)) => {
            let default = config::get_setting(conn, Setting::DefaultUser)?;
            let data = list_users(conn)?
                .into_iter()
                .map(|u| {
                    let marker = if default.as_deref() == Some(u.email.as_str()) {
                        "*"
                    } else {
                        ""
                    };
                    vec![marker.to_string(), u.id.to_string(), u.email, u.name]
                })
                .collect();
            println!("{}", pretty_table(&["", "Id", "Email", "Name"], data));
        }
        Some(("use", sub)) => {
            let email = sub.get_one::<String>("email").unwrap().trim();
            id_for_user(conn, email)?;
            config::set_setting(conn, Setting::DefaultUser, email)?;
            println!("Default user is now '{}'", email);
        }
        Some(("rm", sub)) => {
            let email = sub.get_one::<String>("email").unwrap().trim();
            let id = id_for_user(conn, email)?;
            conn.execute("DELETE FROM users WHERE id=?1", params![id])?;
            if config::get_setting(conn, Setting::DefaultUser)?.as_deref() == Some(email) {
                conn.execute(
                    "DELETE FROM settings WHERE key=?1",
                    params![Setting::DefaultUser.key()],
                )?;
            }
            tracing::info!(user_id = id, "user deleted with all owned records");
            println!("Removed user '{}' and all their records", email);
        }
        _ => {}
    }
    Ok(())
}

pub fn add_user(conn: &Connection, email: &str, name: &str) -> Result<i64> {
    let email = email.trim();
    if !email.contains('@') {
        return Err(LedgerError::Validation(format!("Invalid email '{}'", email)).into());
    }
    let exists: Option<i64> = conn
        .query_row("SELECT id FROM users WHERE email=?1", params![email], |r| {
            r.get(0)
        })
        .optional()?;
    if exists.is_some() {
        return Err(LedgerError::duplicate("User", email).into());
    }
    conn.execute(
        "INSERT INTO users(email, name) VALUES (?1, ?2)",
        params![email, name.trim()],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(user_id = id, "user created");
    Ok(id)
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn.prepare("SELECT id, email, name FROM users ORDER BY email")?;
    let rows = stmt.query_map([], |r| {
        Ok(User {
            id: r.get(0)?,
            email: r.get(1)?,
            name: r.get(2)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
