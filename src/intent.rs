// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Closed-vocabulary intent classification.
//!
//! Every intent owns a few trigger rules. A rule is a list of keyword groups
//! that must all appear (whole words, any case); its specificity is the number
//! of groups. The intent with the most specific matching rule wins, and ties
//! fall back to [`PRIORITY`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::models::{AccountCategory, CONSOLIDATED};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    RevenueVsBudget,
    GrossMarginTrend,
    OpexBreakdown,
    Ebitda,
    CashRunway,
}

/// Tie-break order when two intents match with the same specificity.
pub const PRIORITY: [IntentKind; 5] = [
    IntentKind::RevenueVsBudget,
    IntentKind::GrossMarginTrend,
    IntentKind::OpexBreakdown,
    IntentKind::Ebitda,
    IntentKind::CashRunway,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    RevenueVsBudget,
    GrossMarginTrend,
    OpexBreakdown { category: Option<AccountCategory> },
    Ebitda,
    CashRunway,
    Unknown { text: String },
}

impl Intent {
    pub fn tag(&self) -> &'static str {
        match self {
            Intent::RevenueVsBudget => "revenue_vs_budget",
            Intent::GrossMarginTrend => "gross_margin_trend",
            Intent::OpexBreakdown { .. } => "opex_breakdown",
            Intent::Ebitda => "ebitda",
            Intent::CashRunway => "cash_runway",
            Intent::Unknown { .. } => "unknown",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Intent::Unknown { .. })
    }
}

/// A classified question: what to compute and for which entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query {
    #[serde(flatten)]
    pub intent: Intent,
    /// `None` sums every entity.
    pub entity: Option<String>,
}

struct Rule(Vec<Regex>);

fn group(alternatives: &[&str]) -> Regex {
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|"))).unwrap()
}

const REVENUE: &[&str] = &["revenue", "sales", r"top[- ]?line"];
const COMPARE: &[&str] = &["budget", "plan", "target", "forecast", "vs", "versus"];
const OPEX: &[&str] = &["opex", r"operating\s+(?:expenses?|costs?)", "expenses"];
const BREAKDOWN: &[&str] = &["breakdown", r"break\s+down", r"by\s+category", "split", "categories"];

static RULES: Lazy<Vec<(IntentKind, Vec<Rule>)>> = Lazy::new(|| {
    vec![
        (
            IntentKind::RevenueVsBudget,
            vec![
                Rule(vec![group(REVENUE), group(COMPARE)]),
                Rule(vec![group(&["revenue", r"top[- ]?line"])]),
            ],
        ),
        (
            IntentKind::GrossMarginTrend,
            vec![
                Rule(vec![group(&["gross"]), group(&["margins?", "profit"])]),
                Rule(vec![group(&["margins?"])]),
            ],
        ),
        (
            IntentKind::OpexBreakdown,
            vec![
                Rule(vec![group(OPEX), group(BREAKDOWN)]),
                Rule(vec![group(&["opex", r"operating\s+expenses?"])]),
                Rule(vec![group(&["breakdown", r"break\s+down"])]),
            ],
        ),
        (
            IntentKind::Ebitda,
            vec![
                Rule(vec![group(&["ebitda"]), group(&["margins?", "proxy"])]),
                Rule(vec![group(&["ebitda"])]),
            ],
        ),
        (
            IntentKind::CashRunway,
            vec![
                Rule(vec![group(&["cash"]), group(&["runway", "burn"])]),
                Rule(vec![group(&["runway"])]),
                Rule(vec![group(&[r"burn\s+rate", "burn"])]),
                Rule(vec![group(&["cash"])]),
            ],
        ),
    ]
});

static OPEX_CATEGORIES: Lazy<Vec<(AccountCategory, Regex)>> = Lazy::new(|| {
    vec![
        (AccountCategory::OpexMarketing, group(&["marketing"])),
        (AccountCategory::OpexSales, group(&["sales"])),
        (
            AccountCategory::OpexRnd,
            group(&["r&d", r"r\s+and\s+d", "rnd", "research"]),
        ),
        (
            AccountCategory::OpexAdmin,
            group(&["admin", "administrative", "g&a"]),
        ),
    ]
});

pub struct IntentClassifier;

impl IntentClassifier {
    pub fn classify(text: &str) -> Intent {
        match Self::best_match(text) {
            Some(IntentKind::RevenueVsBudget) => Intent::RevenueVsBudget,
            Some(IntentKind::GrossMarginTrend) => Intent::GrossMarginTrend,
            Some(IntentKind::OpexBreakdown) => Intent::OpexBreakdown {
                category: opex_category(text),
            },
            Some(IntentKind::Ebitda) => Intent::Ebitda,
            Some(IntentKind::CashRunway) => Intent::CashRunway,
            None => Intent::Unknown {
                text: text.to_string(),
            },
        }
    }

    /// Specificity of the best matching rule per intent; 0 when none match.
    pub fn scores(text: &str) -> Vec<(IntentKind, usize)> {
        RULES
            .iter()
            .map(|(kind, rules)| {
                let best = rules
                    .iter()
                    .filter(|r| r.0.iter().all(|g| g.is_match(text)))
                    .map(|r| r.0.len())
                    .max()
                    .unwrap_or(0);
                (*kind, best)
            })
            .collect()
    }

    fn best_match(text: &str) -> Option<IntentKind> {
        let scores = Self::scores(text);
        let mut best: Option<(IntentKind, usize)> = None;
        for kind in PRIORITY {
            let score = scores
                .iter()
                .find(|(k, _)| *k == kind)
                .map_or(0, |(_, s)| *s);
            // Strict comparison keeps the earlier intent on ties.
            if score > 0 && best.is_none_or(|(_, b)| score > b) {
                best = Some((kind, score));
            }
        }
        best.map(|(kind, _)| kind)
    }
}

/// Only consulted once the question is known to be an OpEx breakdown, so
/// "sales" here means the sales expense line, not revenue. Naming more than
/// one category asks for the full breakdown.
fn opex_category(text: &str) -> Option<AccountCategory> {
    let mut named = OPEX_CATEGORIES
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(cat, _)| *cat);
    match (named.next(), named.next()) {
        (Some(cat), None) => Some(cat),
        _ => None,
    }
}

/// First known entity named as a whole word in `text`, longest names first.
/// "Consolidated" is the all-entities view, so it never becomes a filter.
pub fn extract_entity(text: &str, entities: &[String]) -> Option<String> {
    let mut candidates: Vec<&String> = entities
        .iter()
        .filter(|e| !e.trim().is_empty() && !e.eq_ignore_ascii_case(CONSOLIDATED))
        .collect();
    candidates.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    candidates
        .into_iter()
        .find(|e| {
            Regex::new(&format!(r"(?i)(?:^|\W){}(?:$|\W)", regex::escape(e.trim())))
                .map(|re| re.is_match(text))
                .unwrap_or(false)
        })
        .cloned()
}

pub fn classify_query(text: &str, entities: &[String]) -> Query {
    Query {
        intent: IntentClassifier::classify(text),
        entity: extract_entity(text, entities),
    }
}
