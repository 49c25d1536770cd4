// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::error::CopilotError;

/// Cash rows under this entity hold the group-level balance.
pub const CONSOLIDATED: &str = "Consolidated";

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Calendar year-month key, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(d: NaiveDate) -> Self {
        Self {
            year: d.year(),
            month: d.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn succ(self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    pub fn pred(self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    /// Calendar quarter, 1..=4.
    pub fn quarter(&self) -> u32 {
        (self.month - 1) / 3 + 1
    }

    pub fn quarter_start(self) -> Self {
        Self {
            year: self.year,
            month: (self.quarter() - 1) * 3 + 1,
        }
    }

    /// "June 2025"
    pub fn label(&self) -> String {
        format!("{} {}", MONTH_NAMES[(self.month - 1) as usize], self.year)
    }

    /// Every month from `start` to `end`, both included. Empty when start > end.
    pub fn range_inclusive(start: Month, end: Month) -> Vec<Month> {
        let mut out = Vec::new();
        let mut cur = start;
        while cur <= end {
            out.push(cur);
            cur = cur.succ();
        }
        out
    }

    /// The `n` months ending at `self`, oldest first.
    pub fn trailing(self, n: u32) -> Vec<Month> {
        let mut start = self;
        for _ in 1..n.max(1) {
            start = start.pred();
        }
        Self::range_inclusive(start, self)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = CopilotError;

    /// Accepts `YYYY-MM` or a full `YYYY-MM-DD` date (the day is dropped).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d"))
            .map_err(|_| CopilotError::InvalidMonth(s.to_string()))?;
        Ok(Self::from_date(date))
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccountCategory {
    Revenue,
    Cogs,
    OpexMarketing,
    OpexSales,
    OpexRnd,
    OpexAdmin,
}

impl AccountCategory {
    pub const ALL: [AccountCategory; 6] = [
        AccountCategory::Revenue,
        AccountCategory::Cogs,
        AccountCategory::OpexMarketing,
        AccountCategory::OpexSales,
        AccountCategory::OpexRnd,
        AccountCategory::OpexAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountCategory::Revenue => "Revenue",
            AccountCategory::Cogs => "COGS",
            AccountCategory::OpexMarketing => "Opex:Marketing",
            AccountCategory::OpexSales => "Opex:Sales",
            AccountCategory::OpexRnd => "Opex:R&D",
            AccountCategory::OpexAdmin => "Opex:Admin",
        }
    }

    pub fn is_opex(&self) -> bool {
        matches!(
            self,
            AccountCategory::OpexMarketing
                | AccountCategory::OpexSales
                | AccountCategory::OpexRnd
                | AccountCategory::OpexAdmin
        )
    }
}

impl fmt::Display for AccountCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountCategory {
    type Err = CopilotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CopilotError::InvalidCategory(s.to_string()))
    }
}

impl Serialize for AccountCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One line of the actuals or budget table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerRow {
    pub month: Month,
    pub entity: String,
    pub account_category: AccountCategory,
    pub amount: Decimal,
    pub currency: String, // ISO code, upper-cased
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashRow {
    pub month: Month,
    pub entity: String,
    pub cash_usd: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FxRow {
    pub month: Month,
    pub currency: String,
    pub rate_to_usd: Decimal,
}

/// The four tables as loaded by the ingestion layer.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    pub actuals: Vec<LedgerRow>,
    pub budget: Vec<LedgerRow>,
    pub cash: Vec<CashRow>,
    pub fx: Vec<FxRow>,
}

impl Ledger {
    pub fn tables(&self) -> Tables<'_> {
        Tables::new(&self.actuals, &self.budget, &self.cash, &self.fx)
    }
}

/// Read-only view of one ledger snapshot, borrowed for the duration of a query.
#[derive(Debug, Clone, Copy)]
pub struct Tables<'a> {
    pub actuals: &'a [LedgerRow],
    pub budget: &'a [LedgerRow],
    pub cash: &'a [CashRow],
    pub fx: &'a [FxRow],
}

impl<'a> Tables<'a> {
    pub fn new(
        actuals: &'a [LedgerRow],
        budget: &'a [LedgerRow],
        cash: &'a [CashRow],
        fx: &'a [FxRow],
    ) -> Self {
        Self {
            actuals,
            budget,
            cash,
            fx,
        }
    }

    /// Months present in actuals, budget or cash.
    pub fn available_months(&self) -> BTreeSet<Month> {
        self.actuals
            .iter()
            .chain(self.budget.iter())
            .map(|r| r.month)
            .chain(self.cash.iter().map(|r| r.month))
            .collect()
    }

    /// Anchor for relative periods: the newest actuals month. Budgets often
    /// run ahead of actuals, so cash and then budget are only consulted
    /// when there are no actuals at all.
    pub fn latest_month(&self) -> Option<Month> {
        self.actuals
            .iter()
            .map(|r| r.month)
            .max()
            .or_else(|| self.cash.iter().map(|r| r.month).max())
            .or_else(|| self.budget.iter().map(|r| r.month).max())
    }

    /// Distinct entity names across all three data tables, sorted.
    pub fn entities(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .actuals
            .iter()
            .chain(self.budget.iter())
            .map(|r| r.entity.as_str())
            .chain(self.cash.iter().map(|r| r.entity.as_str()))
            .collect();
        set.into_iter().map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_parses_both_forms() {
        let m: Month = "2025-06".parse().unwrap();
        assert_eq!(m, Month::new(2025, 6).unwrap());
        let d: Month = "2025-06-01".parse().unwrap();
        assert_eq!(d, m);
        assert_eq!(m.to_string(), "2025-06");
        assert_eq!(m.label(), "June 2025");
        assert!("2025-13".parse::<Month>().is_err());
        assert!("June".parse::<Month>().is_err());
    }

    #[test]
    fn month_arithmetic_wraps_years() {
        let jan = Month::new(2025, 1).unwrap();
        assert_eq!(jan.pred(), Month::new(2024, 12).unwrap());
        assert_eq!(jan.pred().succ(), jan);
        let trailing = Month::new(2025, 2).unwrap().trailing(3);
        assert_eq!(
            trailing.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
            ["2024-12", "2025-01", "2025-02"]
        );
        assert_eq!(Month::new(2025, 8).unwrap().quarter(), 3);
        assert_eq!(
            Month::new(2025, 8).unwrap().quarter_start(),
            Month::new(2025, 7).unwrap()
        );
    }

    #[test]
    fn latest_month_follows_actuals_not_budget() {
        let row = |m: &str| LedgerRow {
            month: m.parse().unwrap(),
            entity: "ParentCo".into(),
            account_category: AccountCategory::Revenue,
            amount: Decimal::ONE,
            currency: "USD".into(),
        };
        let mut ledger = Ledger {
            actuals: vec![row("2025-06")],
            budget: vec![row("2025-06"), row("2025-12")],
            ..Ledger::default()
        };
        assert_eq!(ledger.tables().latest_month(), Month::new(2025, 6));
        assert!(ledger.tables().available_months().contains(&Month::new(2025, 12).unwrap()));

        ledger.actuals.clear();
        assert_eq!(ledger.tables().latest_month(), Month::new(2025, 12));
    }

    #[test]
    fn category_parsing_is_exact() {
        assert_eq!(
            " Opex:R&D ".parse::<AccountCategory>().unwrap(),
            AccountCategory::OpexRnd
        );
        assert!("opex:marketing".parse::<AccountCategory>().is_err());
        assert!(AccountCategory::OpexAdmin.is_opex());
        assert!(!AccountCategory::Cogs.is_opex());
    }
}
