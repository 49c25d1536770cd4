// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Turns the time expression in a question into a concrete set of months.
//!
//! Relative windows are anchored on the latest month present in the data,
//! never on the wall clock, so the same snapshot always resolves the same way.

use std::collections::BTreeSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::error::{CopilotError, Result};
use crate::models::Month;

const MONTH_ALT: &str = "(january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec)";
// "may" is usually a verb; it only counts as a bare month after a preposition.
const BARE_MONTH_ALT: &str = "(january|february|march|april|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec)";

static ISO_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{4})-(\d{2})(?:-\d{2})?\s*(?:to|through|until|-|–)\s*(\d{4})-(\d{2})(?:-\d{2})?\b")
        .unwrap()
});
static ISO_MONTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})\b").unwrap());
static MONTH_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:from\s+)?{m}(?:\s+(\d{{4}}))?\s*(?:to|through|until|-|–)\s*{m}(?:\s*,?\s*(\d{{4}}))?\b",
        m = MONTH_ALT
    ))
    .unwrap()
});
static MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b{}\s*,?\s*(\d{{4}})\b", MONTH_ALT)).unwrap()
});
static QUARTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bq([1-4])(?:\s*(?:of\s+)?(\d{4}))?\b").unwrap());
static LAST_N_MONTHS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:last|past|trailing|previous)\s+(\d{1,2}|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve)\s+months?\b").unwrap()
});
static LAST_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:last|latest)\s+month\b").unwrap());
static THIS_QUARTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:this|current)\s+quarter\b|\bqtd\b|\bquarter[- ]to[- ]date\b").unwrap()
});
static LAST_QUARTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:last|previous|prior)\s+quarter\b").unwrap());
static YEAR_TO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:ytd|year[- ]to[- ]date|this\s+year)\b").unwrap());
static BARE_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)\b{}\b", BARE_MONTH_ALT)).unwrap());
static BARE_MAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:in|for|of|during|since)\s+(may)\b").unwrap());
static BARE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelativeWindow {
    LastMonths(u32),
    ThisQuarter,
    LastQuarter,
    YearToDate,
}

/// A resolved time selector. `months()` is always ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Period {
    Single { month: Month },
    Range { label: String, months: Vec<Month> },
    Relative { window: RelativeWindow, months: Vec<Month> },
}

impl Period {
    pub fn single(month: Month) -> Self {
        Period::Single { month }
    }

    pub fn months(&self) -> Vec<Month> {
        match self {
            Period::Single { month } => vec![*month],
            Period::Range { months, .. } | Period::Relative { months, .. } => months.clone(),
        }
    }

    /// Last month of the period.
    pub fn end(&self) -> Option<Month> {
        self.months().last().copied()
    }

    pub fn label(&self) -> String {
        match self {
            Period::Single { month } => month.label(),
            Period::Range { label, .. } => label.clone(),
            Period::Relative { window, months } => {
                let span = match (months.first(), months.last()) {
                    (Some(a), Some(b)) if a == b => a.label(),
                    (Some(a), Some(b)) => format!("{} to {}", a.label(), b.label()),
                    _ => String::new(),
                };
                match window {
                    RelativeWindow::LastMonths(1) => format!("latest month ({})", span),
                    RelativeWindow::LastMonths(n) => format!("last {} months ({})", n, span),
                    RelativeWindow::ThisQuarter => format!("quarter to date ({})", span),
                    RelativeWindow::LastQuarter => format!("last quarter ({})", span),
                    RelativeWindow::YearToDate => format!("year to date ({})", span),
                }
            }
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Resolves time expressions against one data snapshot.
#[derive(Debug, Clone, Copy)]
pub struct PeriodResolver<'a> {
    latest: Month,
    available: &'a BTreeSet<Month>,
}

impl<'a> PeriodResolver<'a> {
    pub fn new(latest: Month, available: &'a BTreeSet<Month>) -> Self {
        Self { latest, available }
    }

    pub fn latest(&self) -> Month {
        self.latest
    }

    /// First recognised expression wins; no expression at all means the
    /// latest month. Only a bare month name whose defaulted year is missing
    /// from the data is an error; other absent periods resolve normally and
    /// come back from the engine as empty results.
    pub fn resolve(&self, text: &str) -> Result<Period> {
        if let Some(p) = self.iso_range(text) {
            return Ok(p);
        }
        if let Some(p) = self.iso_month(text) {
            return Ok(p);
        }
        if let Some(p) = self.month_range(text) {
            return Ok(p);
        }
        if let Some(p) = self.month_year(text) {
            return Ok(p);
        }
        if let Some(p) = self.quarter(text) {
            return Ok(p);
        }
        if let Some(p) = self.relative(text) {
            return Ok(p);
        }
        if let Some(p) = self.bare_month(text)? {
            return Ok(p);
        }
        if let Some(p) = self.bare_year(text) {
            return Ok(p);
        }
        Ok(Period::single(self.latest))
    }

    fn iso_range(&self, text: &str) -> Option<Period> {
        let c = ISO_RANGE.captures(text)?;
        let mut start = Month::new(capture_year(&c, 1)?, c.get(2)?.as_str().parse().ok()?)?;
        let mut end = Month::new(capture_year(&c, 3)?, c.get(4)?.as_str().parse().ok()?)?;
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }
        Some(span(start, end))
    }

    fn iso_month(&self, text: &str) -> Option<Period> {
        ISO_MONTH.captures_iter(text).find_map(|c| {
            let year = c.get(1)?.as_str().parse().ok()?;
            let month = c.get(2)?.as_str().parse().ok()?;
            Month::new(year, month).map(Period::single)
        })
    }

    fn month_range(&self, text: &str) -> Option<Period> {
        let c = MONTH_RANGE.captures(text)?;
        let start_m = month_number(c.get(1)?.as_str())?;
        let end_m = month_number(c.get(3)?.as_str())?;
        let start_y = capture_year(&c, 2);
        let end_y = capture_year(&c, 4);

        let end_year = end_y.or(start_y).unwrap_or(self.latest.year());
        let mut end = Month::new(end_year, end_m)?;
        let mut start = Month::new(start_y.unwrap_or(end_year), start_m)?;
        if start > end {
            if start_y.is_none() {
                // "Nov to Feb 2025" spans the year boundary.
                start = Month::new(end_year - 1, start_m)?;
            } else {
                std::mem::swap(&mut start, &mut end);
            }
        }
        Some(span(start, end))
    }

    fn month_year(&self, text: &str) -> Option<Period> {
        let c = MONTH_YEAR.captures(text)?;
        let month = month_number(c.get(1)?.as_str())?;
        let year = capture_year(&c, 2)?;
        Month::new(year, month).map(Period::single)
    }

    fn quarter(&self, text: &str) -> Option<Period> {
        let c = QUARTER.captures(text)?;
        let q: u32 = c.get(1)?.as_str().parse().ok()?;
        let year = capture_year(&c, 2).unwrap_or(self.latest.year());
        let start = Month::new(year, (q - 1) * 3 + 1)?;
        let end = start.succ().succ();
        Some(Period::Range {
            label: format!("Q{} {}", q, year),
            months: Month::range_inclusive(start, end),
        })
    }

    fn relative(&self, text: &str) -> Option<Period> {
        let latest = self.latest;
        let relative = |window, months| Some(Period::Relative { window, months });

        if let Some(c) = LAST_N_MONTHS.captures(text) {
            let n = parse_count(c.get(1)?.as_str())?.max(1);
            return relative(RelativeWindow::LastMonths(n), latest.trailing(n));
        }
        if LAST_MONTH.is_match(text) {
            return relative(RelativeWindow::LastMonths(1), vec![latest]);
        }
        if THIS_QUARTER.is_match(text) {
            return relative(
                RelativeWindow::ThisQuarter,
                Month::range_inclusive(latest.quarter_start(), latest),
            );
        }
        if LAST_QUARTER.is_match(text) {
            let end = latest.quarter_start().pred();
            return relative(
                RelativeWindow::LastQuarter,
                Month::range_inclusive(end.quarter_start(), end),
            );
        }
        if YEAR_TO_DATE.is_match(text) {
            let jan = Month::new(latest.year(), 1)?;
            return relative(
                RelativeWindow::YearToDate,
                Month::range_inclusive(jan, latest),
            );
        }
        None
    }

    fn bare_month(&self, text: &str) -> Result<Option<Period>> {
        let name = BARE_MONTH
            .captures(text)
            .and_then(|c| c.get(1))
            .or_else(|| BARE_MAY.captures(text).and_then(|c| c.get(1)));
        let Some(num) = name.and_then(|m| month_number(m.as_str())) else {
            return Ok(None);
        };
        // A year written elsewhere ("January numbers for 2023") is explicit.
        if let Some(year) = capture_year_anywhere(text) {
            return Ok(Month::new(year, num).map(Period::single));
        }
        let Some(month) = Month::new(self.latest.year(), num) else {
            return Ok(None);
        };
        if !self.available.contains(&month) {
            return Err(CopilotError::PeriodNotFound(month.label()));
        }
        Ok(Some(Period::single(month)))
    }

    fn bare_year(&self, text: &str) -> Option<Period> {
        let year = capture_year_anywhere(text)?;
        let months = Month::range_inclusive(Month::new(year, 1)?, Month::new(year, 12)?);
        Some(Period::Range {
            label: year.to_string(),
            months,
        })
    }
}

/// Convenience wrapper over [`PeriodResolver`].
pub fn resolve(text: &str, latest: Month, available: &BTreeSet<Month>) -> Result<Period> {
    PeriodResolver::new(latest, available).resolve(text)
}

fn span(start: Month, end: Month) -> Period {
    Period::Range {
        label: format!("{} to {}", start.label(), end.label()),
        months: Month::range_inclusive(start, end),
    }
}

fn capture_year(c: &Captures<'_>, idx: usize) -> Option<i32> {
    c.get(idx).and_then(|m| m.as_str().parse().ok())
}

fn capture_year_anywhere(text: &str) -> Option<i32> {
    BARE_YEAR.captures(text)?.get(1)?.as_str().parse().ok()
}

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    let n = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}

fn parse_count(s: &str) -> Option<u32> {
    if let Ok(n) = s.parse::<u32>() {
        return Some(n);
    }
    let n = match s.to_lowercase().as_str() {
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        _ => return None,
    };
    Some(n)
}
