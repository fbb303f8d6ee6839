// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

use crate::commands::analytics::MAX_TREND_MONTHS;
use crate::commands::dashboard::MAX_WINDOW_DAYS;
use crate::models::{AccountType, AssetType};

fn opt(name: &'static str, value: &'static str) -> Arg {
    Arg::new(name).long(name).value_name(value)
}

fn req(name: &'static str, value: &'static str) -> Arg {
    opt(name, value).required(true)
}

fn flag(name: &'static str) -> Arg {
    Arg::new(name).long(name).action(ArgAction::SetTrue)
}

fn one_of<'a>(codes: impl Iterator<Item = &'a str>) -> String {
    codes.map(str::to_lowercase).collect::<Vec<_>>().join("|")
}

fn json_flags() -> [Arg; 2] {
    [
        flag("json").help("Print JSON").conflicts_with("jsonl"),
        flag("jsonl").help("Print JSON lines"),
    ]
}

pub fn build_cli() -> Command {
    Command::new("fintrack")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Personal finance ledger with wealth, trend and budget dashboards")
        .arg(
            opt("user", "EMAIL")
                .global(true)
                .help("Acting user (defaults to the `default-user` setting)"),
        )
        .arg(
            opt("as-of", "YYYY-MM-DD")
                .global(true)
                .help("Evaluate time-relative reports as of this date"),
        )
        .subcommand(Command::new("init").about("Create the database if missing"))
        .subcommand(
            Command::new("user")
                .about("Manage ledger owners")
                .subcommand(
                    Command::new("add")
                        .arg(req("email", "EMAIL"))
                        .arg(req("name", "NAME")),
                )
                .subcommand(Command::new("list"))
                .subcommand(
                    Command::new("use")
                        .about("Set the default user")
                        .arg(req("email", "EMAIL")),
                )
                .subcommand(
                    Command::new("rm")
                        .about("Delete a user and everything they own")
                        .arg(req("email", "EMAIL")),
                ),
        )
        .subcommand(
            Command::new("account")
                .about("Manage accounts")
                .subcommand(
                    Command::new("add")
                        .arg(req("name", "NAME"))
                        .arg(
                            req("type", "TYPE")
                                .help(one_of(AccountType::ALL.iter().map(|t| t.as_str()))),
                        )
                        .arg(
                            opt("balance", "AMOUNT")
                                .default_value("0")
                                .allow_hyphen_values(true),
                        ),
                )
                .subcommand(
                    Command::new("list")
                        .arg(opt("type", "TYPE"))
                        .arg(flag("active").help("Only active accounts"))
                        .args(json_flags()),
                )
                .subcommand(
                    Command::new("set-balance")
                        .arg(req("name", "NAME"))
                        .arg(req("balance", "AMOUNT").allow_hyphen_values(true)),
                )
                .subcommand(Command::new("activate").arg(req("name", "NAME")))
                .subcommand(Command::new("deactivate").arg(req("name", "NAME")))
                .subcommand(Command::new("rm").arg(req("name", "NAME"))),
        )
        .subcommand(
            Command::new("category")
                .about("Manage categories")
                .subcommand(
                    Command::new("add")
                        .arg(req("name", "NAME"))
                        .arg(req("type", "TYPE").help("income|expense"))
                        .arg(opt("icon", "ICON"))
                        .arg(opt("color", "#RRGGBB"))
                        .arg(flag("system").help("Create a shared default category")),
                )
                .subcommand(
                    Command::new("list")
                        .arg(opt("type", "TYPE"))
                        .args(json_flags()),
                )
                .subcommand(Command::new("rm").arg(req("name", "NAME"))),
        )
        .subcommand(
            Command::new("tx")
                .about("Record and query transactions")
                .subcommand(
                    Command::new("add")
                        .arg(req("date", "YYYY-MM-DD"))
                        .arg(req("account", "ACCOUNT"))
                        .arg(req("category", "CATEGORY"))
                        .arg(req("amount", "AMOUNT").allow_hyphen_values(true))
                        .arg(req("description", "TEXT"))
                        .arg(flag("recurring"))
                        .arg(
                            opt("meta", "KEY=VALUE")
                                .action(ArgAction::Append)
                                .help("Attach metadata (repeatable)"),
                        ),
                )
                .subcommand(
                    Command::new("list")
                        .arg(opt("from", "YYYY-MM-DD"))
                        .arg(opt("to", "YYYY-MM-DD"))
                        .arg(opt("month", "YYYY-MM"))
                        .arg(opt("account", "ACCOUNT"))
                        .arg(opt("category", "CATEGORY"))
                        .arg(flag("recurring").help("Only recurring transactions"))
                        .arg(opt("search", "TEXT"))
                        .arg(opt("min", "AMOUNT").allow_hyphen_values(true))
                        .arg(opt("max", "AMOUNT").allow_hyphen_values(true))
                        .arg(opt("limit", "N").value_parser(value_parser!(usize)))
                        .args(json_flags()),
                )
                .subcommand(
                    Command::new("edit")
                        .arg(req("id", "ID").value_parser(value_parser!(i64)))
                        .arg(opt("date", "YYYY-MM-DD"))
                        .arg(opt("account", "ACCOUNT"))
                        .arg(opt("category", "CATEGORY"))
                        .arg(opt("amount", "AMOUNT").allow_hyphen_values(true))
                        .arg(opt("description", "TEXT"))
                        .arg(opt("recurring", "BOOL").value_parser(value_parser!(bool)))
                        .arg(
                            opt("meta", "KEY=VALUE")
                                .action(ArgAction::Append)
                                .help("Set metadata keys, keeping the others (repeatable)"),
                        ),
                )
                .subcommand(
                    Command::new("rm").arg(req("id", "ID").value_parser(value_parser!(i64))),
                ),
        )
        .subcommand(
            Command::new("budget")
                .about("Budgets, overview and alerts")
                .subcommand(
                    Command::new("set")
                        .arg(req("category", "CATEGORY"))
                        .arg(req("limit", "AMOUNT"))
                        .arg(opt("period", "PERIOD").default_value("monthly")),
                )
                .subcommand(Command::new("list").args(json_flags()))
                .subcommand(
                    Command::new("rm")
                        .arg(req("category", "CATEGORY"))
                        .arg(opt("period", "PERIOD").default_value("monthly")),
                )
                .subcommand(
                    Command::new("activate")
                        .arg(req("category", "CATEGORY"))
                        .arg(opt("period", "PERIOD").default_value("monthly")),
                )
                .subcommand(
                    Command::new("deactivate")
                        .arg(req("category", "CATEGORY"))
                        .arg(opt("period", "PERIOD").default_value("monthly")),
                )
                .subcommand(Command::new("overview").args(json_flags()))
                .subcommand(Command::new("alerts").args(json_flags())),
        )
        .subcommand(
            Command::new("asset")
                .about("Manage wealth assets")
                .subcommand(
                    Command::new("add")
                        .arg(req("name", "NAME"))
                        .arg(
                            req("type", "TYPE")
                                .help(one_of(AssetType::ALL.iter().map(|t| t.as_str()))),
                        )
                        .arg(req("value", "AMOUNT"))
                        .arg(opt("purchase-price", "AMOUNT"))
                        .arg(opt("purchase-date", "YYYY-MM-DD"))
                        .arg(opt("description", "TEXT")),
                )
                .subcommand(Command::new("list").args(json_flags()))
                .subcommand(
                    Command::new("update")
                        .arg(req("name", "NAME"))
                        .arg(opt("value", "AMOUNT"))
                        .arg(opt("purchase-price", "AMOUNT"))
                        .arg(opt("purchase-date", "YYYY-MM-DD"))
                        .arg(opt("description", "TEXT"))
                        .arg(opt("active", "BOOL").value_parser(value_parser!(bool))),
                )
                .subcommand(Command::new("rm").arg(req("name", "NAME"))),
        )
        .subcommand(
            Command::new("dashboard")
                .about("Period stats, wealth snapshot, evolution and composition")
                .arg(
                    opt("period", "PERIOD")
                        .default_value("1M")
                        .help("1M|6M|1Y|YTD|MAX"),
                )
                .arg(
                    opt("window", "DAYS")
                        .default_value("30")
                        .value_parser(value_parser!(u32).range(1..=i64::from(MAX_WINDOW_DAYS))),
                )
                .arg(
                    opt("evolution", "MODE")
                        .default_value("simulated")
                        .value_parser(["simulated", "replay"]),
                )
                .args(json_flags()),
        )
        .subcommand(
            Command::new("analytics")
                .about("Monthly income/expense series and category trends")
                .arg(
                    opt("months", "N")
                        .default_value("6")
                        .value_parser(value_parser!(u32).range(1..=i64::from(MAX_TREND_MONTHS))),
                )
                .args(json_flags()),
        )
        .subcommand(
            Command::new("profile")
                .about("Activity summary for the acting user")
                .args(json_flags()),
        )
        .subcommand(
            Command::new("config")
                .about("Read and write settings")
                .subcommand(Command::new("get").arg(Arg::new("key").required(true)))
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("key").required(true))
                        .arg(Arg::new("value").required(true)),
                )
                .subcommand(Command::new("list")),
        )
        .subcommand(
            Command::new("doctor")
                .about("Check ledger integrity")
                .arg(flag("dedupe").help("Delete duplicate transactions, keeping the oldest"))
                .args(json_flags()),
        )
}
