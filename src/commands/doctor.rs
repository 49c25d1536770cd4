// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::{BTreeMap, BTreeSet};

use crate::fx::CurrencyConverter;
use crate::models::{CONSOLIDATED, Ledger, Month, Tables};
use crate::utils::pretty_table;
use anyhow::Result;

pub fn handle(ledger: &Ledger) -> Result<()> {
    let rows = diagnose(ledger.tables());
    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        let data = rows.into_iter().map(|(i, d)| vec![i, d]).collect();
        println!("{}", pretty_table(&["Issue", "Detail"], data));
    }
    Ok(())
}

/// (issue, detail) pairs, in a stable order.
pub fn diagnose(tables: Tables<'_>) -> Vec<(String, String)> {
    let mut rows = Vec::new();

    // 1) FX coverage gaps: non-USD ledger rows without a rate for their month
    let converter = CurrencyConverter::new(tables.fx);
    let missing: BTreeSet<(Month, &str)> = tables
        .actuals
        .iter()
        .chain(tables.budget.iter())
        .filter(|r| converter.rate(&r.currency, r.month).is_none())
        .map(|r| (r.month, r.currency.as_str()))
        .collect();
    for (m, ccy) in missing {
        rows.push(("missing_fx".into(), format!("{} {}", m, ccy)));
    }

    // 2) Duplicate FX rows; only the first one is used
    let mut seen: BTreeMap<(Month, String), usize> = BTreeMap::new();
    for r in tables.fx {
        *seen.entry((r.month, r.currency.to_uppercase())).or_insert(0) += 1;
    }
    for ((m, ccy), n) in seen.into_iter().filter(|(_, n)| *n > 1) {
        rows.push(("duplicate_fx".into(), format!("{} {} x{}", m, ccy, n)));
    }

    // 3) Months with actuals but no budget make revenue variance meaningless
    let budget_months: BTreeSet<Month> = tables.budget.iter().map(|r| r.month).collect();
    let actual_months: BTreeSet<Month> = tables.actuals.iter().map(|r| r.month).collect();
    for m in actual_months.difference(&budget_months) {
        rows.push(("no_budget".into(), m.to_string()));
    }

    // 4) Runway reads Consolidated cash
    if tables.cash.is_empty() {
        rows.push(("no_cash".into(), "cash table is empty".into()));
    } else if !tables
        .cash
        .iter()
        .any(|r| r.entity.eq_ignore_ascii_case(CONSOLIDATED))
    {
        rows.push((
            "no_consolidated_cash".into(),
            format!("no '{}' rows; runway sums all entities", CONSOLIDATED),
        ));
    }

    rows
}
