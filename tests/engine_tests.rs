// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use cfo_copilot::chart::ChartKind;
use cfo_copilot::engine::{EBITDA_PROXY_NOTE, FinancialCalculationEngine, MetricValue};
use cfo_copilot::intent::{Intent, Query};
use cfo_copilot::models::{AccountCategory, CashRow, FxRow, Ledger, LedgerRow, Month};
use cfo_copilot::period::Period;
use rust_decimal::Decimal;

fn month(s: &str) -> Month {
    s.parse().unwrap()
}

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn row(m: &str, entity: &str, cat: &str, amount: &str, ccy: &str) -> LedgerRow {
    LedgerRow {
        month: month(m),
        entity: entity.into(),
        account_category: cat.parse().unwrap(),
        amount: d(amount),
        currency: ccy.into(),
    }
}

fn cash(m: &str, entity: &str, amount: &str) -> CashRow {
    CashRow {
        month: month(m),
        entity: entity.into(),
        cash_usd: d(amount),
    }
}

fn query(intent: Intent) -> Query {
    Query {
        intent,
        entity: None,
    }
}

fn span(from: &str, to: &str) -> Period {
    Period::Range {
        label: format!("{} to {}", from, to),
        months: Month::range_inclusive(month(from), month(to)),
    }
}

/// June 2025 in two entities and two currencies, plus a USD-only April.
fn setup() -> Ledger {
    Ledger {
        actuals: vec![
            row("2025-04", "ParentCo", "Revenue", "100000", "USD"),
            row("2025-04", "ParentCo", "COGS", "40000", "USD"),
            row("2025-06", "ParentCo", "Revenue", "125000", "USD"),
            row("2025-06", "EMEA", "Revenue", "45000", "EUR"),
            row("2025-06", "ParentCo", "COGS", "50000", "USD"),
            row("2025-06", "EMEA", "COGS", "10000", "EUR"),
            row("2025-06", "ParentCo", "Opex:Marketing", "20000", "USD"),
            row("2025-06", "ParentCo", "Opex:Sales", "15000", "USD"),
            row("2025-06", "ParentCo", "Opex:R&D", "30000", "USD"),
            row("2025-06", "ParentCo", "Opex:Admin", "15000", "USD"),
            row("2025-06", "EMEA", "Opex:Admin", "5000", "EUR"),
        ],
        budget: vec![row("2025-06", "ParentCo", "Revenue", "150000", "USD")],
        cash: vec![cash("2025-06", "Consolidated", "1000000")],
        fx: vec![FxRow {
            month: month("2025-06"),
            currency: "EUR".into(),
            rate_to_usd: d("1.08"),
        }],
    }
}

/// Three months burning 30,000 each against a 300,000 balance.
fn burning() -> Ledger {
    let mut actuals = Vec::new();
    for m in ["2025-04", "2025-05", "2025-06"] {
        actuals.push(row(m, "ParentCo", "Revenue", "100000", "USD"));
        actuals.push(row(m, "ParentCo", "COGS", "30000", "USD"));
        actuals.push(row(m, "ParentCo", "Opex:R&D", "100000", "USD"));
    }
    Ledger {
        actuals,
        budget: Vec::new(),
        cash: vec![
            cash("2025-06", "Consolidated", "300000"),
            cash("2025-06", "ParentCo", "999"),
        ],
        fx: Vec::new(),
    }
}

#[test]
fn revenue_vs_budget_converts_before_summing() {
    let ledger = setup();
    let engine = FinancialCalculationEngine::new(ledger.tables());
    let res = engine
        .compute(
            &query(Intent::RevenueVsBudget),
            &Period::single(month("2025-06")),
        )
        .unwrap();

    assert_eq!(res.headline_value("Actual"), Some(&MetricValue::Usd(d("173600"))));
    assert_eq!(res.headline_value("Budget"), Some(&MetricValue::Usd(d("150000"))));
    assert_eq!(res.headline_value("Variance"), Some(&MetricValue::Usd(d("23600"))));
    let pct = res
        .headline_value("Variance %")
        .and_then(MetricValue::as_decimal)
        .unwrap();
    assert_eq!(pct.round_dp(4), d("0.1573"));
    assert_eq!(
        res.summary,
        "Revenue June 2025: actual $173,600.00 vs budget $150,000.00, variance +$23,600.00 (+15.73%)"
    );
    assert!(res.warnings.is_empty());

    assert_eq!(res.chart.kind, ChartKind::Bar);
    assert_eq!(res.chart.categories, ["2025-06"]);
    assert_eq!(
        res.chart.series("Actual").unwrap().values,
        vec![Some(d("173600"))]
    );
}

#[test]
fn revenue_without_budget_has_no_variance_percent() {
    let ledger = setup();
    let engine = FinancialCalculationEngine::new(ledger.tables());
    let res = engine
        .revenue_vs_budget(&Period::single(month("2025-06")), Some("EMEA"))
        .unwrap();
    assert_eq!(res.headline_value("Actual"), Some(&MetricValue::Usd(d("48600"))));
    assert_eq!(res.headline_value("Variance %"), Some(&MetricValue::NotApplicable));
    assert!(res.summary.contains("(EMEA)"));
}

#[test]
fn gross_margin_trend_skips_months_without_revenue() {
    let ledger = setup();
    let engine = FinancialCalculationEngine::new(ledger.tables());
    let res = engine
        .gross_margin_trend(&span("2025-04", "2025-06"), None)
        .unwrap();

    assert_eq!(res.chart.kind, ChartKind::Line);
    assert_eq!(res.chart.categories, ["2025-04", "2025-05", "2025-06"]);
    assert_eq!(
        res.chart.series("Gross Margin %").unwrap().values,
        vec![Some(d("60")), None, Some(d("64.98"))]
    );
    assert_eq!(
        res.breakdown[1].value("Gross margin"),
        Some(&MetricValue::NotApplicable)
    );
    // (60,000 + 112,800) / (100,000 + 173,600)
    let margin = res
        .headline_value("Gross margin")
        .and_then(MetricValue::as_decimal)
        .unwrap();
    assert_eq!(margin.round_dp(4), d("0.6316"));
    assert_eq!(res.headline_value("Gross profit"), Some(&MetricValue::Usd(d("172800"))));
}

#[test]
fn opex_breakdown_is_sorted_by_amount() {
    let ledger = setup();
    let engine = FinancialCalculationEngine::new(ledger.tables());
    let res = engine
        .compute(
            &query(Intent::OpexBreakdown { category: None }),
            &Period::single(month("2025-06")),
        )
        .unwrap();

    let labels: Vec<&str> = res.breakdown.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(
        labels,
        ["Opex:R&D", "Opex:Admin", "Opex:Marketing", "Opex:Sales"]
    );
    assert_eq!(
        res.breakdown[1].value("Amount"),
        Some(&MetricValue::Usd(d("20400")))
    );
    assert_eq!(res.headline_value("Total OpEx"), Some(&MetricValue::Usd(d("85400"))));
    assert_eq!(res.chart.categories, labels);
}

#[test]
fn opex_ties_order_by_category_name() {
    let ledger = Ledger {
        actuals: vec![
            row("2025-06", "ParentCo", "Opex:Sales", "15000", "USD"),
            row("2025-06", "ParentCo", "Opex:Marketing", "15000", "USD"),
        ],
        ..Ledger::default()
    };
    let engine = FinancialCalculationEngine::new(ledger.tables());
    let res = engine
        .opex_breakdown(&Period::single(month("2025-06")), None, None)
        .unwrap();
    let labels: Vec<&str> = res.breakdown.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, ["Opex:Marketing", "Opex:Sales"]);
}

#[test]
fn opex_single_category() {
    let ledger = setup();
    let engine = FinancialCalculationEngine::new(ledger.tables());
    let res = engine
        .opex_breakdown(
            &Period::single(month("2025-06")),
            Some(AccountCategory::OpexAdmin),
            None,
        )
        .unwrap();
    assert_eq!(res.breakdown.len(), 1);
    assert_eq!(
        res.headline_value("Total Opex:Admin"),
        Some(&MetricValue::Usd(d("20400")))
    );
}

#[test]
fn ebitda_proxy_carries_its_note() {
    let ledger = setup();
    let engine = FinancialCalculationEngine::new(ledger.tables());
    let res = engine
        .compute(&query(Intent::Ebitda), &Period::single(month("2025-06")))
        .unwrap();
    assert_eq!(res.title, "EBITDA (proxy)");
    assert_eq!(
        res.headline_value("EBITDA (proxy)"),
        Some(&MetricValue::Usd(d("27400")))
    );
    assert_eq!(res.notes, [EBITDA_PROXY_NOTE]);
    assert_eq!(res.chart.kind, ChartKind::Waterfall);
    assert_eq!(
        res.chart.series[0].values,
        vec![
            Some(d("173600")),
            Some(d("-60800")),
            Some(d("-85400")),
            Some(d("27400"))
        ]
    );
}

#[test]
fn runway_divides_consolidated_cash_by_average_burn() {
    let ledger = burning();
    let engine = FinancialCalculationEngine::new(ledger.tables());
    let res = engine
        .compute(&query(Intent::CashRunway), &Period::single(month("2025-06")))
        .unwrap();
    assert_eq!(res.headline_value("Cash balance"), Some(&MetricValue::Usd(d("300000"))));
    assert_eq!(
        res.headline_value("Average monthly net burn"),
        Some(&MetricValue::Usd(d("30000")))
    );
    assert_eq!(res.headline_value("Runway"), Some(&MetricValue::Months(d("10"))));
    assert_eq!(res.breakdown.len(), 3);
    assert!(res.notes.iter().any(|n| n == "burn averaged over 3 month(s)"));
}

#[test]
fn runway_is_infinite_when_not_burning() {
    let ledger = Ledger {
        actuals: vec![
            row("2025-05", "ParentCo", "Revenue", "200000", "USD"),
            row("2025-05", "ParentCo", "COGS", "50000", "USD"),
            row("2025-06", "ParentCo", "Revenue", "210000", "USD"),
            row("2025-06", "ParentCo", "Opex:Sales", "60000", "USD"),
        ],
        cash: vec![
            cash("2025-05", "Consolidated", "500000"),
            cash("2025-06", "Consolidated", "650000"),
        ],
        ..Ledger::default()
    };
    let engine = FinancialCalculationEngine::new(ledger.tables());
    let res = engine
        .cash_runway(&Period::single(month("2025-06")), None)
        .unwrap();
    assert_eq!(res.headline_value("Runway"), Some(&MetricValue::Infinite));
    assert_eq!(res.headline_value("Cash balance"), Some(&MetricValue::Usd(d("650000"))));
}

#[test]
fn runway_without_burn_history_is_not_applicable() {
    let ledger = Ledger {
        cash: vec![cash("2025-06", "Consolidated", "100")],
        ..Ledger::default()
    };
    let engine = FinancialCalculationEngine::new(ledger.tables());
    let res = engine
        .cash_runway(&Period::single(month("2025-06")), None)
        .unwrap();
    assert_eq!(res.headline_value("Runway"), Some(&MetricValue::NotApplicable));
    assert_eq!(res.warnings.len(), 1);
}

#[test]
fn empty_period_warns_instead_of_failing() {
    let ledger = setup();
    let engine = FinancialCalculationEngine::new(ledger.tables());
    let period = Period::single(month("2023-01"));
    let intents = [
        Intent::RevenueVsBudget,
        Intent::GrossMarginTrend,
        Intent::OpexBreakdown { category: None },
        Intent::Ebitda,
        Intent::CashRunway,
    ];
    for intent in intents {
        let tag = intent.tag();
        let res = engine.compute(&query(intent), &period).unwrap();
        assert_eq!(res.warnings, ["no data for January 2023"], "{}", tag);
    }
}

#[test]
fn unknown_intent_is_rejected_by_the_engine() {
    let ledger = setup();
    let engine = FinancialCalculationEngine::new(ledger.tables());
    let err = engine
        .compute(
            &query(Intent::Unknown { text: "hello".into() }),
            &Period::single(month("2025-06")),
        )
        .unwrap_err();
    assert_eq!(err.to_string(), "unsupported question: hello");
}
