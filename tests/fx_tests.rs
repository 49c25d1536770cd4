// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use cfo_copilot::CopilotError;
use cfo_copilot::fx::CurrencyConverter;
use cfo_copilot::models::{AccountCategory, FxRow, LedgerRow, Month};
use rust_decimal::Decimal;

fn month(s: &str) -> Month {
    s.parse().unwrap()
}

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn setup() -> Vec<FxRow> {
    vec![
        FxRow {
            month: month("2025-05"),
            currency: "EUR".into(),
            rate_to_usd: d("1.09"),
        },
        FxRow {
            month: month("2025-06"),
            currency: "EUR".into(),
            rate_to_usd: d("1.08"),
        },
        // duplicate key: the first row above wins
        FxRow {
            month: month("2025-06"),
            currency: "EUR".into(),
            rate_to_usd: d("9.99"),
        },
    ]
}

#[test]
fn usd_passes_through_without_any_rates() {
    let fx = CurrencyConverter::new(&[]);
    let res = fx.to_usd(d("125000"), "USD", month("2031-01")).unwrap();
    assert_eq!(res, d("125000"));
    assert_eq!(fx.rate("usd", month("2031-01")), Some(Decimal::ONE));
}

#[test]
fn converts_at_the_exact_month_rate() {
    let fx = CurrencyConverter::new(&setup());
    // 45,000 EUR at 1.08 -> 48,600 USD
    let res = fx.to_usd(d("45000"), "EUR", month("2025-06")).unwrap();
    assert_eq!(res, d("48600"));
    let may = fx.to_usd(d("100"), "EUR", month("2025-05")).unwrap();
    assert_eq!(may, d("109"));
}

#[test]
fn currency_codes_are_case_insensitive() {
    let fx = CurrencyConverter::new(&setup());
    let res = fx.to_usd(d("10"), "eur", month("2025-06")).unwrap();
    assert_eq!(format!("{:.2}", res), "10.80");
}

#[test]
fn missing_rate_is_an_error_not_a_neighbouring_month() {
    let fx = CurrencyConverter::new(&setup());
    let err = fx.to_usd(d("10"), "EUR", month("2025-07")).unwrap_err();
    assert_eq!(
        err,
        CopilotError::MissingFxRate {
            currency: "EUR".into(),
            month: month("2025-07"),
        }
    );
    assert_eq!(
        err.to_string(),
        "cannot compute: missing FX rate for EUR 2025-07"
    );

    let gbp = fx.to_usd(d("10"), "gbp", month("2025-06")).unwrap_err();
    assert!(gbp.to_string().contains("GBP 2025-06"));
}

#[test]
fn row_conversion_uses_the_row_month_and_currency() {
    let fx = CurrencyConverter::new(&setup());
    let row = LedgerRow {
        month: month("2025-05"),
        entity: "EMEA".into(),
        account_category: AccountCategory::OpexAdmin,
        amount: d("5000"),
        currency: "EUR".into(),
    };
    assert_eq!(fx.row_usd(&row).unwrap(), d("5450"));
}

#[test]
fn conversion_overflow_is_an_error() {
    let fx = CurrencyConverter::new(&setup());
    let err = fx.to_usd(Decimal::MAX, "EUR", month("2025-06")).unwrap_err();
    assert_eq!(err, CopilotError::Overflow);
    // USD is never multiplied
    assert_eq!(
        fx.to_usd(Decimal::MAX, "USD", month("2025-06")).unwrap(),
        Decimal::MAX
    );
}
