// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Ratio helpers shared by the dashboards. Every ratio is guarded by an
//! explicit zero check and reports 0 instead of failing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

fn warning_threshold() -> Decimal {
    Decimal::from(80)
}

/// `(current - previous) / previous * 100`, or 0 when `previous` is 0.
pub fn pct_change(current: Decimal, previous: Decimal) -> Decimal {
    if previous.is_zero() {
        return Decimal::ZERO;
    }
    (current - previous) / previous * Decimal::ONE_HUNDRED
}

/// `part / whole * 100`, or 0 when `whole` is not positive.
pub fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    part / whole * Decimal::ONE_HUNDRED
}

/// Share of income kept after expenses. `raw_expenses` is the signed
/// (non-positive) expense sum.
pub fn savings_rate(income: Decimal, raw_expenses: Decimal) -> Decimal {
    if income.is_zero() {
        return Decimal::ZERO;
    }
    (income + raw_expenses) / income * Decimal::ONE_HUNDRED
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    Good,
    Warning,
    Exceeded,
}

impl BudgetStatus {
    pub fn from_percentage(p: Decimal) -> Self {
        if p > Decimal::ONE_HUNDRED {
            BudgetStatus::Exceeded
        } else if p > warning_threshold() {
            BudgetStatus::Warning
        } else {
            BudgetStatus::Good
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetStatus::Good => "good",
            BudgetStatus::Warning => "warning",
            BudgetStatus::Exceeded => "exceeded",
        }
    }
}

/// Alerts start at 80% inclusive, one notch earlier than the warning
/// status.
pub fn is_alert(p: Decimal) -> bool {
    p >= warning_threshold()
}
