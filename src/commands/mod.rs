// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;

pub mod accounts;
pub mod analytics;
pub mod assets;
pub mod budgets;
pub mod categories;
pub mod dashboard;
pub mod doctor;
pub mod profile;
pub mod transactions;
pub mod users;

/// Who is asking and when. Threaded explicitly through every query so
/// nothing reads an ambient current user or clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub owner_id: i64,
    pub today: NaiveDate,
}
