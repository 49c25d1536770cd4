// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::fs;
use std::path::Path;

use cfo_copilot::data::{load_ledger, read_fx_rows, read_ledger_rows, resolve_data_dir};
use cfo_copilot::models::{AccountCategory, Month};
use rust_decimal::Decimal;
use tempfile::tempdir;

fn write_tables(dir: &Path, actuals: &str) {
    fs::write(dir.join("actuals.csv"), actuals).unwrap();
    fs::write(
        dir.join("budget.csv"),
        "month,entity,account_category,amount,currency\n2025-06,ParentCo,Revenue,150000,USD\n",
    )
    .unwrap();
    fs::write(
        dir.join("cash.csv"),
        "month,entity,cash_usd\n2025-06,Consolidated,1000000\n",
    )
    .unwrap();
    fs::write(
        dir.join("fx.csv"),
        "month,currency,rate_to_usd\n2025-06,eur,1.08\n",
    )
    .unwrap();
}

#[test]
fn loads_all_four_tables() {
    let dir = tempdir().unwrap();
    write_tables(
        dir.path(),
        "month,entity,account_category,amount,currency\n\
         2025-06-01, ParentCo ,Revenue, 125000 ,usd\n\
         \n\
         2025-06,EMEA,Opex:R&D,5000,EUR\n",
    );
    let ledger = load_ledger(dir.path()).unwrap();
    assert_eq!(ledger.actuals.len(), 2);
    assert_eq!(ledger.budget.len(), 1);
    assert_eq!(ledger.cash.len(), 1);
    assert_eq!(ledger.fx.len(), 1);

    let first = &ledger.actuals[0];
    assert_eq!(first.month, Month::new(2025, 6).unwrap());
    assert_eq!(first.entity, "ParentCo");
    assert_eq!(first.amount, Decimal::from(125000));
    assert_eq!(first.currency, "USD");
    assert_eq!(ledger.actuals[1].account_category, AccountCategory::OpexRnd);
    assert_eq!(ledger.fx[0].currency, "EUR");
}

#[test]
fn rejects_wrong_header() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("actuals.csv");
    fs::write(&path, "month,entity,category,amount,currency\n").unwrap();
    let err = read_ledger_rows(&path).unwrap_err().to_string();
    assert!(err.contains("expected columns"), "{}", err);
}

#[test]
fn rejects_unknown_category_with_line_number() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("actuals.csv");
    fs::write(
        &path,
        "month,entity,account_category,amount,currency\n2025-06,ParentCo,Payroll,1,USD\n",
    )
    .unwrap();
    let err = read_ledger_rows(&path).unwrap_err();
    let chain = format!("{:#}", err);
    assert!(chain.contains(":2"), "{}", chain);
    assert!(chain.contains("Payroll"), "{}", chain);
}

#[test]
fn rejects_non_positive_fx_rates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fx.csv");
    fs::write(&path, "month,currency,rate_to_usd\n2025-06,EUR,0\n").unwrap();
    let err = read_fx_rows(&path).unwrap_err().to_string();
    assert!(err.contains("must be positive"), "{}", err);
}

#[test]
fn missing_directory_is_an_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope");
    let err = load_ledger(&missing).unwrap_err().to_string();
    assert!(err.contains("not found"), "{}", err);
}

#[test]
fn explicit_data_dir_wins() {
    let dir = resolve_data_dir(Some(" /tmp/cfo-data ")).unwrap();
    assert_eq!(dir, Path::new("/tmp/cfo-data"));
}
