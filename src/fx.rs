// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::error::{CopilotError, Result};
use crate::models::{FxRow, LedgerRow, Month};

pub const USD: &str = "USD";

/// Month-exact USD conversion over one FX table snapshot.
#[derive(Debug, Clone)]
pub struct CurrencyConverter {
    rates: HashMap<(Month, String), Decimal>,
}

impl CurrencyConverter {
    /// Indexes the table by (month, currency). The first row for a key wins;
    /// `doctor` reports the duplicates.
    pub fn new(fx: &[FxRow]) -> Self {
        let mut rates = HashMap::with_capacity(fx.len());
        for row in fx {
            rates
                .entry((row.month, row.currency.to_uppercase()))
                .or_insert(row.rate_to_usd);
        }
        Self { rates }
    }

    pub fn rate(&self, currency: &str, month: Month) -> Option<Decimal> {
        if currency.eq_ignore_ascii_case(USD) {
            return Some(Decimal::ONE);
        }
        self.rates
            .get(&(month, currency.to_uppercase()))
            .copied()
    }

    /// Convert `amount` of `currency` to USD at the rate for exactly `month`.
    /// USD passes through untouched whether or not the table lists it.
    pub fn to_usd(&self, amount: Decimal, currency: &str, month: Month) -> Result<Decimal> {
        if currency.eq_ignore_ascii_case(USD) {
            return Ok(amount);
        }
        match self.rates.get(&(month, currency.to_uppercase())) {
            Some(rate) => amount.checked_mul(*rate).ok_or(CopilotError::Overflow),
            None => Err(CopilotError::MissingFxRate {
                currency: currency.to_uppercase(),
                month,
            }),
        }
    }

    pub fn row_usd(&self, row: &LedgerRow) -> Result<Decimal> {
        self.to_usd(row.amount, &row.currency, row.month)
    }
}
