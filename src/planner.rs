// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! One question in, one structured answer out.
//!
//! The pass is strictly linear: classify, resolve the period, compute,
//! respond. Unknown questions stop after classification. Every failure
//! further down becomes an `error` answer; nothing is returned as `Err`.

use serde::Serialize;
use tracing::{debug, warn};

use crate::chart::ChartSpec;
use crate::engine::{FinancialCalculationEngine, MetricResult};
use crate::error::{CopilotError, Result};
use crate::intent::{IntentClassifier, Query, extract_entity};
use crate::models::{CashRow, FxRow, LedgerRow, Tables};
use crate::period::{Period, PeriodResolver};

pub const GUIDANCE: &str = "I'm not sure how to help with that question. Try asking about \
revenue vs budget, gross margin trend, OpEx breakdown, EBITDA, or cash runway \
(for example: \"What was June 2025 revenue vs budget in USD?\").";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Unsupported,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub status: Status,
    pub intent: String,
    pub entity: Option<String>,
    pub period: Option<Period>,
    pub metric: Option<MetricResult>,
    pub chart: Option<ChartSpec>,
    pub message: String,
}

impl Answer {
    fn unsupported(intent: &str) -> Self {
        Self {
            status: Status::Unsupported,
            intent: intent.to_string(),
            entity: None,
            period: None,
            metric: None,
            chart: None,
            message: GUIDANCE.to_string(),
        }
    }

    fn error(query: &Query, period: Option<Period>, err: &CopilotError) -> Self {
        Self {
            status: Status::Error,
            intent: query.intent.tag().to_string(),
            entity: query.entity.clone(),
            period,
            metric: None,
            chart: None,
            message: err.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

pub struct QueryPlanner<'a> {
    tables: Tables<'a>,
}

impl<'a> QueryPlanner<'a> {
    pub fn new(tables: Tables<'a>) -> Self {
        Self { tables }
    }

    pub fn answer(&self, text: &str) -> Answer {
        debug!(stage = "receive_text", text);
        let intent = IntentClassifier::classify(text);
        debug!(stage = "classify_intent", intent = intent.tag());
        if intent.is_unknown() {
            // Short-circuit before any table is touched.
            return Answer::unsupported(intent.tag());
        }
        let query = Query {
            intent,
            entity: extract_entity(text, &self.tables.entities()),
        };

        let period = match self.resolve_period(text) {
            Ok(p) => p,
            Err(e) => {
                warn!(stage = "resolve_period", error = %e, "question not answered");
                return Answer::error(&query, None, &e);
            }
        };
        debug!(stage = "resolve_period", period = %period);

        let engine = FinancialCalculationEngine::new(self.tables);
        match engine.compute(&query, &period) {
            Ok(metric) => {
                debug!(stage = "respond", warnings = metric.warnings.len());
                Answer {
                    status: Status::Ok,
                    intent: query.intent.tag().to_string(),
                    entity: query.entity.clone(),
                    message: metric.summary.clone(),
                    chart: Some(metric.chart.clone()),
                    metric: Some(metric),
                    period: Some(period),
                }
            }
            Err(e) => {
                warn!(stage = "compute", error = %e, "question not answered");
                Answer::error(&query, Some(period), &e)
            }
        }
    }

    /// The latest month is read from this snapshot on every call.
    pub fn resolve_period(&self, text: &str) -> Result<Period> {
        let latest = self.tables.latest_month().ok_or(CopilotError::NoData)?;
        let available = self.tables.available_months();
        PeriodResolver::new(latest, &available).resolve(text)
    }
}

/// Answers `text` against the four tables.
pub fn answer(
    text: &str,
    actuals: &[LedgerRow],
    budget: &[LedgerRow],
    cash: &[CashRow],
    fx: &[FxRow],
) -> Answer {
    QueryPlanner::new(Tables::new(actuals, budget, cash, fx)).answer(text)
}
