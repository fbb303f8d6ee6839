// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::Local;

use fintrack::commands::{self, Scope};
use fintrack::{cli, config, db, logging, utils};

fn main() -> Result<()> {
    logging::init();
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let conn = db::open_or_init()?;
    let today = match matches.get_one::<String>("as-of") {
        Some(raw) => utils::parse_date(raw)?,
        None => Local::now().date_naive(),
    };
    let user = matches.get_one::<String>("user").map(String::as_str);

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", config::db_path()?.display());
        }
        Some(("user", sub)) => commands::users::handle(&conn, sub)?,
        Some(("config", sub)) => config::handle(&conn, sub)?,
        Some(("doctor", sub)) => commands::doctor::handle(&conn, sub)?,
        Some((name, sub)) => {
            let scope = Scope {
                owner_id: config::resolve_owner(&conn, user)?,
                today,
            };
            tracing::debug!(command = name, owner_id = scope.owner_id, %today, "dispatch");
            match name {
                "account" => commands::accounts::handle(&conn, &scope, sub)?,
                "category" => commands::categories::handle(&conn, &scope, sub)?,
                "tx" => commands::transactions::handle(&conn, &scope, sub)?,
                "budget" => commands::budgets::handle(&conn, &scope, sub)?,
                "asset" => commands::assets::handle(&conn, &scope, sub)?,
                "dashboard" => commands::dashboard::handle(&conn, &scope, sub)?,
                "analytics" => commands::analytics::handle(&conn, &scope, sub)?,
                "profile" => commands::profile::handle(&conn, &scope, sub)?,
                _ => {
                    cli::build_cli().print_help()?;
                    println!();
                }
            }
        }
        None => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
