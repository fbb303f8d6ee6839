// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::Serialize;

use super::Scope;
use crate::config;
use crate::errors::LedgerError;
use crate::models::{Asset, AssetType};
use crate::utils::{
    ensure_money, id_for_asset, maybe_print_json, parse_date, parse_decimal, pretty_table,
};

pub fn handle(conn: &Connection, scope: &Scope, m: &clap::ArgMatches) -> Result<()> {
    let owner = scope.owner_id;
    match m.subcommand() {
        Some(("add", sub)) => {
            let new = NewAsset {
                name: sub.get_one::<String>("name").unwrap().trim().to_string(),
                asset_type: sub.get_one::<String>("type").unwrap().parse()?,
                current_value: parse_decimal(sub.get_one::<String>("value").unwrap())?,
                purchase_price: sub
                    .get_one::<String>("purchase-price")
                    .map(|s| parse_decimal(s))
                    .transpose()?,
                purchase_date: sub
                    .get_one::<String>("purchase-date")
                    .map(|s| parse_date(s))
                    .transpose()?,
                description: sub
                    .get_one::<String>("description")
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default(),
            };
            add_asset(conn, owner, &new)?;
            println!(
                "Added asset '{}' ({}) worth {}",
                new.name,
                new.asset_type.label(),
                new.current_value
            );
        }
        Some(("list", sub)) => list(conn, owner, sub)?,
        Some(("update", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let patch = AssetPatch {
                current_value: sub
                    .get_one::<String>("value")
                    .map(|s| parse_decimal(s))
                    .transpose()?,
                purchase_price: sub
                    .get_one::<String>("purchase-price")
                    .map(|s| parse_decimal(s))
                    .transpose()?,
                purchase_date: sub
                    .get_one::<String>("purchase-date")
                    .map(|s| parse_date(s))
                    .transpose()?,
                description: sub.get_one::<String>("description").map(|s| s.trim().to_string()),
                is_active: sub.get_one::<bool>("active").copied(),
            };
            let asset = update_asset(conn, owner, name, &patch)?;
            println!("Updated asset '{}' (value {})", asset.name, asset.current_value);
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let id = id_for_asset(conn, owner, name)?;
            conn.execute("DELETE FROM assets WHERE id=?1", params![id])?;
            tracing::info!(asset_id = id, "asset deleted");
            println!("Removed asset '{}'", name);
        }
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewAsset {
    pub name: String,
    pub asset_type: AssetType,
    pub current_value: Decimal,
    pub purchase_price: Option<Decimal>,
    pub purchase_date: Option<NaiveDate>,
    pub description: String,
}

fn ensure_value(label: &str, v: Option<Decimal>) -> Result<()> {
    if v.is_some_and(|v| v < Decimal::ZERO) {
        return Err(LedgerError::Validation(format!("{} must not be negative", label)).into());
    }
    v.map_or(Ok(()), |v| ensure_money(label, v))
}

pub fn add_asset(conn: &Connection, owner_id: i64, new: &NewAsset) -> Result<i64> {
    ensure_value("Current value", Some(new.current_value))?;
    ensure_value("Purchase price", new.purchase_price)?;
    let taken: Option<i64> = conn
        .query_row(
            "SELECT id FROM assets WHERE owner_id=?1 AND name=?2",
            params![owner_id, new.name],
            |r| r.get(0),
        )
        .optional()?;
    if taken.is_some() {
        return Err(LedgerError::duplicate("Asset", new.name.as_str()).into());
    }
    conn.execute(
        "INSERT INTO assets(owner_id, name, asset_type, current_value, purchase_price, purchase_date, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            owner_id,
            new.name,
            new.asset_type,
            new.current_value.to_string(),
            new.purchase_price.map(|p| p.to_string()),
            new.purchase_date,
            new.description
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(asset_id = id, owner_id, kind = %new.asset_type, "asset created");
    Ok(id)
}

#[derive(Debug, Default, Clone)]
pub struct AssetPatch {
    pub current_value: Option<Decimal>,
    pub purchase_price: Option<Decimal>,
    pub purchase_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

pub fn get_asset(conn: &Connection, owner_id: i64, id: i64) -> Result<Asset> {
    let sql = format!(
        "SELECT {} FROM assets WHERE id=?1 AND owner_id=?2",
        Asset::COLUMNS
    );
    let asset = conn
        .query_row(&sql, params![id, owner_id], Asset::from_row)
        .optional()?;
    asset.ok_or_else(|| LedgerError::not_found("Asset", id.to_string()).into())
}

pub fn update_asset(
    conn: &Connection,
    owner_id: i64,
    name: &str,
    patch: &AssetPatch,
) -> Result<Asset> {
    ensure_value("Current value", patch.current_value)?;
    ensure_value("Purchase price", patch.purchase_price)?;
    let id = id_for_asset(conn, owner_id, name)?;
    let current = get_asset(conn, owner_id, id)?;
    conn.execute(
        "UPDATE assets SET current_value=?1, purchase_price=?2, purchase_date=?3,
             description=?4, is_active=?5, updated_at=datetime('now')
         WHERE id=?6",
        params![
            patch.current_value.unwrap_or(current.current_value).to_string(),
            patch
                .purchase_price
                .or(current.purchase_price)
                .map(|p| p.to_string()),
            patch.purchase_date.or(current.purchase_date),
            patch.description.as_deref().unwrap_or(current.description.as_str()),
            patch.is_active.unwrap_or(current.is_active),
            id
        ],
    )?;
    tracing::info!(asset_id = id, "asset updated");
    get_asset(conn, owner_id, id)
}

#[derive(Debug, Serialize)]
pub struct AssetRow {
    #[serde(flatten)]
    pub asset: Asset,
    pub type_label: &'static str,
    pub gain_loss: Option<Decimal>,
    pub gain_loss_percentage: Option<Decimal>,
}

pub fn list_assets(conn: &Connection, owner_id: i64) -> Result<Vec<AssetRow>> {
    let sql = format!(
        "SELECT {} FROM assets WHERE owner_id=?1 ORDER BY name",
        Asset::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![owner_id], Asset::from_row)?;
    let mut out = Vec::new();
    for row in rows {
        let asset = row?;
        out.push(AssetRow {
            type_label: asset.asset_type.label(),
            gain_loss: asset.gain_loss(),
            gain_loss_percentage: asset.gain_loss_percentage().map(|p| p.round_dp(2)),
            asset,
        });
    }
    Ok(out)
}

fn list(conn: &Connection, owner_id: i64, sub: &clap::ArgMatches) -> Result<()> {
    let data = list_assets(conn, owner_id)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        return Ok(());
    }
    let ccy = config::currency(conn)?;
    let opt = |v: Option<Decimal>, suffix: &str| {
        v.map(|v| format!("{:.2}{}", v, suffix)).unwrap_or_else(|| "-".into())
    };
    let rows = data
        .into_iter()
        .map(|r| {
            vec![
                r.asset.name,
                r.type_label.to_string(),
                format!("{:.2} {}", r.asset.current_value, ccy),
                opt(r.asset.purchase_price, ""),
                opt(r.gain_loss, ""),
                opt(r.gain_loss_percentage, "%"),
                if r.asset.is_active { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Name", "Type", "Value", "Purchase", "Gain/Loss", "Gain %", "Active"],
            rows
        )
    );
    Ok(())
}
