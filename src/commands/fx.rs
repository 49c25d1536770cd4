// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::fx::CurrencyConverter;
use crate::models::Ledger;
use crate::utils::{parse_decimal, parse_month, pretty_table};
use anyhow::{Context, Result};

pub fn handle(ledger: &Ledger, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => list_rates(ledger, sub)?,
        Some(("convert", sub)) => convert_amount(ledger, sub)?,
        _ => {}
    }
    Ok(())
}

fn list_rates(ledger: &Ledger, sub: &clap::ArgMatches) -> Result<()> {
    let month = sub
        .get_one::<String>("month")
        .map(|s| parse_month(s))
        .transpose()?;
    let mut rates: Vec<_> = ledger
        .fx
        .iter()
        .filter(|r| month.is_none_or(|m| r.month == m))
        .collect();
    rates.sort_by(|a, b| b.month.cmp(&a.month).then_with(|| a.currency.cmp(&b.currency)));
    let data = rates
        .into_iter()
        .map(|r| {
            vec![
                r.month.to_string(),
                r.currency.clone(),
                r.rate_to_usd.to_string(),
            ]
        })
        .collect();
    println!("{}", pretty_table(&["Month", "Currency", "Rate to USD"], data));
    Ok(())
}

fn convert_amount(ledger: &Ledger, sub: &clap::ArgMatches) -> Result<()> {
    let month = parse_month(sub.get_one::<String>("month").context("month missing")?)?;
    let amount = parse_decimal(sub.get_one::<String>("amount").context("amount missing")?)?;
    let ccy = sub
        .get_one::<String>("currency")
        .context("currency missing")?
        .trim()
        .to_uppercase();
    let converter = CurrencyConverter::new(&ledger.fx);
    let res = converter.to_usd(amount, &ccy, month)?;
    println!("{} {} ({}) -> {:.2} USD", amount, ccy, month, res);
    Ok(())
}
