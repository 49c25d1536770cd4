// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Metric calculations over one ledger snapshot.
//!
//! Every amount is converted to USD row by row before it is aggregated.
//! Empty periods produce zero / N/A results with a warning, never an error;
//! a calculation fails only on a missing FX rate or numeric overflow.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::chart::{ChartKind, ChartSpec};
use crate::error::{CopilotError, Result};
use crate::fx::CurrencyConverter;
use crate::intent::{Intent, Query};
use crate::models::{AccountCategory, CONSOLIDATED, CashRow, LedgerRow, Month, Tables};
use crate::period::Period;
use crate::utils::{fmt_months, fmt_percent, fmt_signed_percent, fmt_signed_usd, fmt_usd};

/// Trailing months used to average net burn.
pub const RUNWAY_WINDOW: u32 = 3;

pub const EBITDA_PROXY_NOTE: &str =
    "EBITDA proxy = Revenue - COGS - OpEx; no depreciation or amortization data is available.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Usd,
    Percent,
    Months,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
    Usd(Decimal),
    Ratio(Decimal),
    Months(Decimal),
    NotApplicable,
    Infinite,
}

impl MetricValue {
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            MetricValue::Usd(d) | MetricValue::Ratio(d) | MetricValue::Months(d) => Some(*d),
            MetricValue::NotApplicable | MetricValue::Infinite => None,
        }
    }

    /// N/A on a zero denominator, and on ratios too large to show as a percentage.
    fn ratio_of(numerator: Decimal, denominator: Decimal) -> Self {
        numerator
            .checked_div(denominator)
            .filter(|r| r.checked_mul(Decimal::ONE_HUNDRED).is_some())
            .map_or(MetricValue::NotApplicable, MetricValue::Ratio)
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Usd(d) => f.write_str(&fmt_usd(*d)),
            MetricValue::Ratio(d) => f.write_str(&fmt_percent(*d)),
            MetricValue::Months(d) => write!(f, "{} months", fmt_months(*d)),
            MetricValue::NotApplicable => f.write_str("N/A"),
            MetricValue::Infinite => f.write_str("infinite"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub label: String,
    pub value: MetricValue,
}

fn metric(label: &str, value: MetricValue) -> Metric {
    Metric {
        label: label.to_string(),
        value,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub label: String,
    pub values: Vec<Metric>,
}

impl BreakdownRow {
    pub fn value(&self, label: &str) -> Option<&MetricValue> {
        self.values.iter().find(|m| m.label == label).map(|m| &m.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricResult {
    pub title: String,
    pub unit: Unit,
    /// One-line narrative of the headline numbers.
    pub summary: String,
    pub headline: Vec<Metric>,
    pub breakdown: Vec<BreakdownRow>,
    pub chart: ChartSpec,
    pub notes: Vec<String>,
    /// Non-fatal conditions, e.g. a period with no rows.
    pub warnings: Vec<String>,
}

impl MetricResult {
    pub fn headline_value(&self, label: &str) -> Option<&MetricValue> {
        self.headline.iter().find(|m| m.label == label).map(|m| &m.value)
    }
}

fn checked_add(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b).ok_or(CopilotError::Overflow)
}

fn checked_sub(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_sub(b).ok_or(CopilotError::Overflow)
}

fn checked_sum<I: IntoIterator<Item = Decimal>>(values: I) -> Result<Decimal> {
    values.into_iter().try_fold(Decimal::ZERO, checked_add)
}

/// USD totals for one slice of the ledger.
#[derive(Debug, Clone, Default)]
struct Totals {
    revenue: Decimal,
    cogs: Decimal,
    opex: BTreeMap<AccountCategory, Decimal>,
}

impl Totals {
    fn add(&mut self, category: AccountCategory, usd: Decimal) -> Result<()> {
        let slot = match category {
            AccountCategory::Revenue => &mut self.revenue,
            AccountCategory::Cogs => &mut self.cogs,
            c => self.opex.entry(c).or_insert(Decimal::ZERO),
        };
        *slot = checked_add(*slot, usd)?;
        Ok(())
    }

    fn opex_total(&self) -> Result<Decimal> {
        checked_sum(self.opex.values().copied())
    }

    fn gross_profit(&self) -> Result<Decimal> {
        checked_sub(self.revenue, self.cogs)
    }

    /// Revenue - COGS - OpEx.
    fn ebitda(&self) -> Result<Decimal> {
        checked_sub(self.gross_profit()?, self.opex_total()?)
    }

    /// OpEx + COGS - Revenue; positive means cash is going out.
    fn net_burn(&self) -> Result<Decimal> {
        checked_sub(checked_add(self.opex_total()?, self.cogs)?, self.revenue)
    }

    fn merge(&mut self, other: &Totals) -> Result<()> {
        self.revenue = checked_add(self.revenue, other.revenue)?;
        self.cogs = checked_add(self.cogs, other.cogs)?;
        for (c, v) in &other.opex {
            let slot = self.opex.entry(*c).or_insert(Decimal::ZERO);
            *slot = checked_add(*slot, *v)?;
        }
        Ok(())
    }
}

fn entity_matches(row_entity: &str, entity: Option<&str>) -> bool {
    entity.is_none_or(|e| row_entity.eq_ignore_ascii_case(e))
}

fn scope(period: &Period, entity: Option<&str>) -> String {
    match entity {
        Some(e) => format!("{} ({})", period.label(), e),
        None => period.label(),
    }
}

fn no_data(scope: &str) -> String {
    format!("no data for {}", scope)
}

pub struct FinancialCalculationEngine<'a> {
    tables: Tables<'a>,
    fx: CurrencyConverter,
}

impl<'a> FinancialCalculationEngine<'a> {
    pub fn new(tables: Tables<'a>) -> Self {
        Self {
            tables,
            fx: CurrencyConverter::new(tables.fx),
        }
    }

    pub fn compute(&self, query: &Query, period: &Period) -> Result<MetricResult> {
        let entity = query.entity.as_deref();
        debug!(intent = query.intent.tag(), period = %period, entity, "computing metric");
        match &query.intent {
            Intent::RevenueVsBudget => self.revenue_vs_budget(period, entity),
            Intent::GrossMarginTrend => self.gross_margin_trend(period, entity),
            Intent::OpexBreakdown { category } => self.opex_breakdown(period, *category, entity),
            Intent::Ebitda => self.ebitda(period, entity),
            Intent::CashRunway => self.cash_runway(period, entity),
            Intent::Unknown { text } => Err(CopilotError::Unsupported(text.clone())),
        }
    }

    /// Per-month USD totals of `table` over `months`. Months without rows are absent.
    fn totals_by_month(
        &self,
        table: &[LedgerRow],
        months: &[Month],
        entity: Option<&str>,
    ) -> Result<BTreeMap<Month, Totals>> {
        let mut out: BTreeMap<Month, Totals> = BTreeMap::new();
        for row in table {
            if !months.contains(&row.month) || !entity_matches(&row.entity, entity) {
                continue;
            }
            let usd = self.fx.row_usd(row)?;
            out.entry(row.month).or_default().add(row.account_category, usd)?;
        }
        Ok(out)
    }

    fn totals(
        &self,
        table: &[LedgerRow],
        months: &[Month],
        entity: Option<&str>,
    ) -> Result<Totals> {
        let mut sum = Totals::default();
        for t in self.totals_by_month(table, months, entity)?.values() {
            sum.merge(t)?;
        }
        Ok(sum)
    }

    pub fn revenue_vs_budget(&self, period: &Period, entity: Option<&str>) -> Result<MetricResult> {
        let months = period.months();
        let actual_by_month = self.totals_by_month(self.tables.actuals, &months, entity)?;
        let budget_by_month = self.totals_by_month(self.tables.budget, &months, entity)?;
        let scope = scope(period, entity);

        let mut actual = Decimal::ZERO;
        let mut budget = Decimal::ZERO;
        let mut breakdown = Vec::with_capacity(months.len());
        let mut actual_series = Vec::with_capacity(months.len());
        let mut budget_series = Vec::with_capacity(months.len());
        for m in &months {
            let a = actual_by_month.get(m).map_or(Decimal::ZERO, |t| t.revenue);
            let b = budget_by_month.get(m).map_or(Decimal::ZERO, |t| t.revenue);
            actual = checked_add(actual, a)?;
            budget = checked_add(budget, b)?;
            let diff = checked_sub(a, b)?;
            actual_series.push(Some(a));
            budget_series.push(Some(b));
            breakdown.push(BreakdownRow {
                label: m.to_string(),
                values: vec![
                    metric("Actual", MetricValue::Usd(a)),
                    metric("Budget", MetricValue::Usd(b)),
                    metric("Variance", MetricValue::Usd(diff)),
                    metric("Variance %", MetricValue::ratio_of(diff, b)),
                ],
            });
        }
        let variance = checked_sub(actual, budget)?;
        let variance_pct = MetricValue::ratio_of(variance, budget);

        let mut warnings = Vec::new();
        let summary = if actual_by_month.is_empty() && budget_by_month.is_empty() {
            warnings.push(no_data(&scope));
            format!("No revenue or budget data for {}.", scope)
        } else {
            let pct = match &variance_pct {
                MetricValue::Ratio(r) => fmt_signed_percent(*r),
                other => other.to_string(),
            };
            format!(
                "Revenue {}: actual {} vs budget {}, variance {} ({})",
                scope,
                fmt_usd(actual),
                fmt_usd(budget),
                fmt_signed_usd(variance),
                pct
            )
        };

        let chart = ChartSpec::new(ChartKind::Bar, "Revenue vs Budget", "Month", "Amount (USD)")
            .with_categories(months.iter().map(|m| m.to_string()))
            .with_series("Actual", actual_series)
            .with_series("Budget", budget_series);

        Ok(MetricResult {
            title: "Revenue vs Budget".into(),
            unit: Unit::Usd,
            summary,
            headline: vec![
                metric("Actual", MetricValue::Usd(actual)),
                metric("Budget", MetricValue::Usd(budget)),
                metric("Variance", MetricValue::Usd(variance)),
                metric("Variance %", variance_pct),
            ],
            breakdown,
            chart,
            notes: Vec::new(),
            warnings,
        })
    }

    pub fn gross_margin_trend(&self, period: &Period, entity: Option<&str>) -> Result<MetricResult> {
        let months = period.months();
        let by_month = self.totals_by_month(self.tables.actuals, &months, entity)?;
        let scope = scope(period, entity);

        let mut revenue = Decimal::ZERO;
        let mut cogs = Decimal::ZERO;
        let mut defined = Vec::new();
        let mut breakdown = Vec::with_capacity(months.len());
        let mut points = Vec::with_capacity(months.len());
        for m in &months {
            let t = by_month.get(m).cloned().unwrap_or_default();
            let gross = t.gross_profit()?;
            let margin = MetricValue::ratio_of(gross, t.revenue);
            revenue = checked_add(revenue, t.revenue)?;
            cogs = checked_add(cogs, t.cogs)?;
            if let MetricValue::Ratio(r) = margin {
                defined.push(r);
                points.push(r.checked_mul(Decimal::ONE_HUNDRED).map(|p| p.round_dp(2)));
            } else {
                points.push(None);
            }
            breakdown.push(BreakdownRow {
                label: m.to_string(),
                values: vec![
                    metric("Revenue", MetricValue::Usd(t.revenue)),
                    metric("COGS", MetricValue::Usd(t.cogs)),
                    metric("Gross profit", MetricValue::Usd(gross)),
                    metric("Gross margin", margin),
                ],
            });
        }
        let gross = checked_sub(revenue, cogs)?;
        let period_margin = MetricValue::ratio_of(gross, revenue);
        let average = if defined.is_empty() {
            MetricValue::NotApplicable
        } else {
            let n = Decimal::from(defined.len() as u64);
            MetricValue::ratio_of(checked_sum(defined.iter().copied())?, n)
        };

        let mut warnings = Vec::new();
        let summary = if by_month.is_empty() {
            warnings.push(no_data(&scope));
            format!("No actuals for {}; gross margin is N/A.", scope)
        } else {
            format!(
                "Gross margin {}: {} (average monthly {}), gross profit {}",
                scope,
                period_margin,
                average,
                fmt_usd(gross)
            )
        };

        let chart = ChartSpec::new(ChartKind::Line, "Gross Margin Trend", "Month", "Margin (%)")
            .with_categories(months.iter().map(|m| m.to_string()))
            .with_series("Gross Margin %", points);

        Ok(MetricResult {
            title: "Gross Margin Trend".into(),
            unit: Unit::Percent,
            summary,
            headline: vec![
                metric("Gross margin", period_margin),
                metric("Average monthly gross margin", average),
                metric("Gross profit", MetricValue::Usd(gross)),
            ],
            breakdown,
            chart,
            notes: Vec::new(),
            warnings,
        })
    }

    /// OpEx per category, largest first; equal amounts order by category name.
    pub fn opex_breakdown(
        &self,
        period: &Period,
        category: Option<AccountCategory>,
        entity: Option<&str>,
    ) -> Result<MetricResult> {
        let months = period.months();
        let totals = self.totals(self.tables.actuals, &months, entity)?;
        let scope = scope(period, entity);

        let mut items: Vec<(AccountCategory, Decimal)> = match category {
            Some(c) => vec![(c, totals.opex.get(&c).copied().unwrap_or(Decimal::ZERO))],
            None => totals.opex.iter().map(|(c, v)| (*c, *v)).collect(),
        };
        items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
        let total = checked_sum(items.iter().map(|(_, v)| *v))?;

        let breakdown = items
            .iter()
            .map(|(c, v)| BreakdownRow {
                label: c.to_string(),
                values: vec![
                    metric("Amount", MetricValue::Usd(*v)),
                    metric("Share", MetricValue::ratio_of(*v, total)),
                ],
            })
            .collect();

        let total_label = match category {
            Some(c) => format!("Total {}", c),
            None => "Total OpEx".to_string(),
        };
        let mut warnings = Vec::new();
        let summary = if totals.opex.is_empty() {
            warnings.push(no_data(&scope));
            format!("No OpEx recorded for {}.", scope)
        } else if let (None, Some((top, amount))) = (category, items.first()) {
            format!(
                "{} {}: {}; largest is {} at {}",
                total_label,
                scope,
                fmt_usd(total),
                top,
                fmt_usd(*amount)
            )
        } else {
            format!("{} {}: {}", total_label, scope, fmt_usd(total))
        };

        let chart = ChartSpec::new(ChartKind::Bar, "OpEx Breakdown", "Category", "Amount (USD)")
            .with_categories(items.iter().map(|(c, _)| c.as_str()))
            .with_series("OpEx", items.iter().map(|(_, v)| Some(*v)).collect());

        Ok(MetricResult {
            title: "OpEx Breakdown".into(),
            unit: Unit::Usd,
            summary,
            headline: vec![metric(&total_label, MetricValue::Usd(total))],
            breakdown,
            chart,
            notes: Vec::new(),
            warnings,
        })
    }

    /// Revenue - COGS - OpEx. There is no D&A input, so this is labelled a proxy.
    pub fn ebitda(&self, period: &Period, entity: Option<&str>) -> Result<MetricResult> {
        let months = period.months();
        let by_month = self.totals_by_month(self.tables.actuals, &months, entity)?;
        let scope = scope(period, entity);

        let mut totals = Totals::default();
        let mut breakdown = Vec::with_capacity(by_month.len());
        for (m, t) in &by_month {
            totals.merge(t)?;
            breakdown.push(BreakdownRow {
                label: m.to_string(),
                values: vec![
                    metric("Revenue", MetricValue::Usd(t.revenue)),
                    metric("COGS", MetricValue::Usd(t.cogs)),
                    metric("OpEx", MetricValue::Usd(t.opex_total()?)),
                    metric("EBITDA (proxy)", MetricValue::Usd(t.ebitda()?)),
                ],
            });
        }
        let opex = totals.opex_total()?;
        let ebitda = totals.ebitda()?;

        let mut warnings = Vec::new();
        let summary = if by_month.is_empty() {
            warnings.push(no_data(&scope));
            format!("No actuals for {}; EBITDA (proxy) is {}.", scope, fmt_usd(ebitda))
        } else {
            format!(
                "EBITDA (proxy) {}: {} on revenue {} (margin {})",
                scope,
                fmt_usd(ebitda),
                fmt_usd(totals.revenue),
                MetricValue::ratio_of(ebitda, totals.revenue)
            )
        };

        let chart = ChartSpec::new(
            ChartKind::Waterfall,
            "EBITDA (proxy) Bridge",
            "Component",
            "Amount (USD)",
        )
        .with_categories(["Revenue", "COGS", "OpEx", "EBITDA (proxy)"])
        .with_series(
            "USD",
            vec![
                Some(totals.revenue),
                Some(-totals.cogs),
                Some(-opex),
                Some(ebitda),
            ],
        );

        Ok(MetricResult {
            title: "EBITDA (proxy)".into(),
            unit: Unit::Usd,
            summary,
            headline: vec![
                metric("EBITDA (proxy)", MetricValue::Usd(ebitda)),
                metric("EBITDA margin", MetricValue::ratio_of(ebitda, totals.revenue)),
                metric("Revenue", MetricValue::Usd(totals.revenue)),
                metric("COGS", MetricValue::Usd(totals.cogs)),
                metric("OpEx", MetricValue::Usd(opex)),
            ],
            breakdown,
            chart,
            notes: vec![EBITDA_PROXY_NOTE.to_string()],
            warnings,
        })
    }

    /// Cash rows that make up the balance: the named entity, else the
    /// Consolidated rows, else every row when no Consolidated rows exist.
    fn cash_rows(&self, entity: Option<&str>) -> Vec<&'a CashRow> {
        let cash = self.tables.cash;
        let wanted = entity.unwrap_or(CONSOLIDATED);
        let picked: Vec<&CashRow> = cash
            .iter()
            .filter(|r| r.entity.eq_ignore_ascii_case(wanted))
            .collect();
        if picked.is_empty() && entity.is_none() {
            cash.iter().collect()
        } else {
            picked
        }
    }

    /// Latest cash balance divided by average monthly net burn over the
    /// trailing window ending at the cash month. Non-positive burn means the
    /// runway is infinite.
    pub fn cash_runway(&self, period: &Period, entity: Option<&str>) -> Result<MetricResult> {
        let scope = scope(period, entity);
        let rows = self.cash_rows(entity);
        let cash_month = period
            .end()
            .and_then(|end| rows.iter().map(|r| r.month).filter(|m| *m <= end).max());

        let mut chart = ChartSpec::new(ChartKind::Bar, "Monthly Net Burn", "Month", "Amount (USD)");
        let Some(cash_month) = cash_month else {
            return Ok(MetricResult {
                title: "Cash Runway".into(),
                unit: Unit::Months,
                summary: format!("No cash balance recorded for {}.", scope),
                headline: vec![
                    metric("Cash balance", MetricValue::NotApplicable),
                    metric("Average monthly net burn", MetricValue::NotApplicable),
                    metric("Runway", MetricValue::NotApplicable),
                ],
                breakdown: Vec::new(),
                chart,
                notes: Vec::new(),
                warnings: vec![no_data(&scope)],
            });
        };

        let cash = checked_sum(
            rows.iter()
                .filter(|r| r.month == cash_month)
                .map(|r| r.cash_usd),
        )?;
        let window = cash_month.trailing(RUNWAY_WINDOW);
        let by_month = self.totals_by_month(self.tables.actuals, &window, entity)?;

        let mut breakdown = Vec::with_capacity(by_month.len());
        let mut burns = Vec::with_capacity(by_month.len());
        for (m, t) in &by_month {
            let burn = t.net_burn()?;
            burns.push(burn);
            breakdown.push(BreakdownRow {
                label: m.to_string(),
                values: vec![
                    metric("Revenue", MetricValue::Usd(t.revenue)),
                    metric("COGS", MetricValue::Usd(t.cogs)),
                    metric("OpEx", MetricValue::Usd(t.opex_total()?)),
                    metric("Net burn", MetricValue::Usd(burn)),
                ],
            });
        }
        chart = chart
            .with_categories(by_month.keys().map(|m| m.to_string()))
            .with_series("Net burn", burns.iter().map(|b| Some(*b)).collect());

        let mut warnings = Vec::new();
        let mut notes = vec![format!("cash as of {}", cash_month.label())];
        let (avg_burn, runway) = if burns.is_empty() {
            warnings.push(format!(
                "no actuals in the {} months to {} to estimate burn",
                RUNWAY_WINDOW,
                cash_month.label()
            ));
            (MetricValue::NotApplicable, MetricValue::NotApplicable)
        } else {
            notes.push(format!("burn averaged over {} month(s)", burns.len()));
            let n = Decimal::from(burns.len() as u64);
            let avg = checked_sum(burns.iter().copied())? / n;
            let runway = if avg <= Decimal::ZERO {
                MetricValue::Infinite
            } else {
                cash.checked_div(avg)
                    .map_or(MetricValue::NotApplicable, |r| {
                        MetricValue::Months(r.max(Decimal::ZERO))
                    })
            };
            (MetricValue::Usd(avg), runway)
        };

        let summary = match (&runway, &avg_burn) {
            (MetricValue::Months(r), MetricValue::Usd(b)) => format!(
                "Cash runway: {} months ({} cash as of {}, {}/month average net burn)",
                fmt_months(*r),
                fmt_usd(cash),
                cash_month.label(),
                fmt_usd(*b)
            ),
            (MetricValue::Infinite, _) => format!(
                "Cash runway: not applicable, cash is not being burned ({} cash as of {})",
                fmt_usd(cash),
                cash_month.label()
            ),
            _ => format!(
                "Cash runway: N/A, no burn history ({} cash as of {})",
                fmt_usd(cash),
                cash_month.label()
            ),
        };

        Ok(MetricResult {
            title: "Cash Runway".into(),
            unit: Unit::Months,
            summary,
            headline: vec![
                metric("Cash balance", MetricValue::Usd(cash)),
                metric("Average monthly net burn", avg_burn),
                metric("Runway", runway),
            ],
            breakdown,
            chart,
            notes,
            warnings,
        })
    }
}
