// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::Row;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;
use crate::utils::{decimal_at, opt_decimal_at};

/// Closed enums stored as their upper-case code in TEXT columns.
macro_rules! text_enum {
    ($name:ident, $kind:literal { $($variant:ident => $code:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let code = s.trim().to_uppercase().replace(['-', ' '], "_");
                match code.as_str() {
                    $($code => Ok($name::$variant),)+
                    _ => Err(LedgerError::Validation(format!(
                        "Unknown {} '{}'",
                        $kind,
                        s.trim()
                    ))),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: LedgerError| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Checking,
    Savings,
    Investment,
    Credit,
    Cash,
}

text_enum!(AccountType, "account type" {
    Checking => "CHECKING",
    Savings => "SAVINGS",
    Investment => "INVESTMENT",
    Credit => "CREDIT",
    Cash => "CASH",
});

impl AccountType {
    pub fn label(&self) -> &'static str {
        match self {
            AccountType::Checking => "Checking",
            AccountType::Savings => "Savings",
            AccountType::Investment => "Investment",
            AccountType::Credit => "Credit Card",
            AccountType::Cash => "Cash",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub r#type: AccountType,
    pub balance: Decimal,
    pub is_active: bool,
}

impl Account {
    pub const COLUMNS: &'static str = "id, owner_id, name, type, balance, is_active";

    pub fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            owner_id: r.get(1)?,
            name: r.get(2)?,
            r#type: r.get(3)?,
            balance: decimal_at(r, 4)?,
            is_active: r.get(5)?,
        })
    }
}

/// Polarity of a category. Decides the stored sign of every amount
/// booked against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryType {
    Income,
    Expense,
}

text_enum!(CategoryType, "category type" {
    Income => "INCOME",
    Expense => "EXPENSE",
});

impl CategoryType {
    /// Forces `amount` to this polarity: non-positive for expenses,
    /// non-negative for income. The caller's sign is ignored.
    pub fn normalize_amount(&self, amount: Decimal) -> Decimal {
        match self {
            CategoryType::Expense => -amount.abs(),
            CategoryType::Income => amount.abs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    /// `None` for system defaults shared by every owner.
    pub owner_id: Option<i64>,
    pub name: String,
    pub r#type: CategoryType,
    pub icon: String,
    pub color: String,
    pub is_default: bool,
}

impl Category {
    pub const COLUMNS: &'static str = "id, owner_id, name, type, icon, color, is_default";

    pub fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            owner_id: r.get(1)?,
            name: r.get(2)?,
            r#type: r.get(3)?,
            icon: r.get(4)?,
            color: r.get(5)?,
            is_default: r.get(6)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub owner_id: i64,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: String,
    pub category_id: i64,
    pub account_id: i64,
    pub is_recurring: bool,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Transaction {
    pub const COLUMNS: &'static str =
        "id, owner_id, amount, date, description, category_id, account_id, is_recurring, metadata";

    pub fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        let raw_meta: String = r.get(8)?;
        let metadata = serde_json::from_str(&raw_meta).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(Self {
            id: r.get(0)?,
            owner_id: r.get(1)?,
            amount: decimal_at(r, 2)?,
            date: r.get(3)?,
            description: r.get(4)?,
            category_id: r.get(5)?,
            account_id: r.get(6)?,
            is_recurring: r.get(7)?,
            metadata,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetPeriod {
    Monthly,
    Yearly,
}

text_enum!(BudgetPeriod, "budget period" {
    Monthly => "MONTHLY",
    Yearly => "YEARLY",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub owner_id: i64,
    pub category_id: i64,
    pub monthly_limit: Decimal,
    pub period: BudgetPeriod,
    pub is_active: bool,
}

impl Budget {
    pub const COLUMNS: &'static str = "id, owner_id, category_id, monthly_limit, period, is_active";

    pub fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            owner_id: r.get(1)?,
            category_id: r.get(2)?,
            monthly_limit: decimal_at(r, 3)?,
            period: r.get(4)?,
            is_active: r.get(5)?,
        })
    }

    pub fn yearly_limit(&self) -> Decimal {
        match self.period {
            BudgetPeriod::Monthly => self.monthly_limit * Decimal::from(12),
            BudgetPeriod::Yearly => self.monthly_limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetType {
    RealEstate,
    Stocks,
    Bonds,
    Insurance,
    SavingsAccount,
    PensionPlan,
    Crypto,
    PreciousMetals,
    Business,
    Other,
}

text_enum!(AssetType, "asset type" {
    RealEstate => "REAL_ESTATE",
    Stocks => "STOCKS",
    Bonds => "BONDS",
    Insurance => "INSURANCE",
    SavingsAccount => "SAVINGS_ACCOUNT",
    PensionPlan => "PENSION_PLAN",
    Crypto => "CRYPTO",
    PreciousMetals => "PRECIOUS_METALS",
    Business => "BUSINESS",
    Other => "OTHER",
});

impl AssetType {
    /// Display label, also the wealth composition bucket key.
    pub fn label(&self) -> &'static str {
        match self {
            AssetType::RealEstate => "Real Estate",
            AssetType::Stocks => "Stocks",
            AssetType::Bonds => "Bonds",
            AssetType::Insurance => "Life Insurance",
            AssetType::SavingsAccount => "Savings Account",
            AssetType::PensionPlan => "Pension Plan",
            AssetType::Crypto => "Cryptocurrency",
            AssetType::PreciousMetals => "Precious Metals",
            AssetType::Business => "Business",
            AssetType::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub asset_type: AssetType,
    pub current_value: Decimal,
    pub purchase_price: Option<Decimal>,
    pub purchase_date: Option<NaiveDate>,
    pub description: String,
    pub is_active: bool,
}

impl Asset {
    pub const COLUMNS: &'static str = "id, owner_id, name, asset_type, current_value, \
         purchase_price, purchase_date, description, is_active";

    pub fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            owner_id: r.get(1)?,
            name: r.get(2)?,
            asset_type: r.get(3)?,
            current_value: decimal_at(r, 4)?,
            purchase_price: opt_decimal_at(r, 5)?,
            purchase_date: r.get(6)?,
            description: r.get(7)?,
            is_active: r.get(8)?,
        })
    }

    pub fn gain_loss(&self) -> Option<Decimal> {
        self.purchase_price.map(|p| self.current_value - p)
    }

    /// `None` without a purchase price, or when it is zero.
    pub fn gain_loss_percentage(&self) -> Option<Decimal> {
        let price = self.purchase_price?;
        if price.is_zero() {
            return None;
        }
        self.gain_loss().map(|g| g / price * Decimal::ONE_HUNDRED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn expense_amounts_are_forced_negative() {
        let t = CategoryType::Expense;
        assert_eq!(t.normalize_amount(dec("42.50")), dec("-42.50"));
        assert_eq!(t.normalize_amount(dec("-42.50")), dec("-42.50"));
    }

    #[test]
    fn income_amounts_are_forced_positive() {
        let t = CategoryType::Income;
        assert_eq!(t.normalize_amount(dec("-2000")), dec("2000"));
        assert_eq!(t.normalize_amount(dec("2000")), dec("2000"));
    }

    #[test]
    fn yearly_limit_follows_period() {
        let mut b = Budget {
            id: 1,
            owner_id: 1,
            category_id: 1,
            monthly_limit: dec("250.00"),
            period: BudgetPeriod::Monthly,
            is_active: true,
        };
        assert_eq!(b.yearly_limit(), dec("3000.00"));
        b.period = BudgetPeriod::Yearly;
        assert_eq!(b.yearly_limit(), dec("250.00"));
    }

    #[test]
    fn asset_gain_loss() {
        let mut a = Asset {
            id: 1,
            owner_id: 1,
            name: "Index fund".into(),
            asset_type: AssetType::Stocks,
            current_value: dec("150"),
            purchase_price: Some(dec("100")),
            purchase_date: None,
            description: String::new(),
            is_active: true,
        };
        assert_eq!(a.gain_loss(), Some(dec("50")));
        assert_eq!(a.gain_loss_percentage(), Some(dec("50")));

        a.purchase_price = None;
        assert_eq!(a.gain_loss(), None);
        assert_eq!(a.gain_loss_percentage(), None);
    }

    #[test]
    fn enum_codes_parse_loosely() {
        assert_eq!(
            AssetType::from_str("real-estate").unwrap(),
            AssetType::RealEstate
        );
        assert_eq!(
            CategoryType::from_str(" expense ").unwrap(),
            CategoryType::Expense
        );
        assert!(BudgetPeriod::from_str("weekly").is_err());
    }
}
