// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Locating the data directory and loading the four CSV tables.

use anyhow::{Context, Result, anyhow};
use csv::{ReaderBuilder, StringRecord};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::models::{AccountCategory, CashRow, FxRow, Ledger, LedgerRow, Month};
use crate::utils::parse_decimal;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "CFO Copilot", "cfo-copilot"));

pub const LEDGER_HEADERS: [&str; 5] = ["month", "entity", "account_category", "amount", "currency"];
pub const CASH_HEADERS: [&str; 3] = ["month", "entity", "cash_usd"];
pub const FX_HEADERS: [&str; 3] = ["month", "currency", "rate_to_usd"];

pub const ACTUALS_FILE: &str = "actuals.csv";
pub const BUDGET_FILE: &str = "budget.csv";
pub const CASH_FILE: &str = "cash.csv";
pub const FX_FILE: &str = "fx.csv";

/// Platform data dir, e.g. `~/.local/share/cfo-copilot`.
pub fn default_data_dir() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    Ok(proj.data_dir().to_path_buf())
}

/// Explicit directory first, then `./fixtures` when present, then the platform dir.
pub fn resolve_data_dir(explicit: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = explicit.map(str::trim).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let local = PathBuf::from("fixtures");
    if local.is_dir() {
        return Ok(local);
    }
    default_data_dir()
}

pub fn load_ledger(dir: &Path) -> Result<Ledger> {
    if !dir.is_dir() {
        return Err(anyhow!(
            "Data directory {} not found (expected {}, {}, {}, {})",
            dir.display(),
            ACTUALS_FILE,
            BUDGET_FILE,
            CASH_FILE,
            FX_FILE
        ));
    }
    let ledger = Ledger {
        actuals: read_ledger_rows(&dir.join(ACTUALS_FILE))?,
        budget: read_ledger_rows(&dir.join(BUDGET_FILE))?,
        cash: read_cash_rows(&dir.join(CASH_FILE))?,
        fx: read_fx_rows(&dir.join(FX_FILE))?,
    };
    info!(
        dir = %dir.display(),
        actuals = ledger.actuals.len(),
        budget = ledger.budget.len(),
        cash = ledger.cash.len(),
        fx = ledger.fx.len(),
        "ledger loaded"
    );
    Ok(ledger)
}

/// Opens `path` and yields (line, record) after checking the header row exactly.
fn records(path: &Path, expected: &[&str]) -> Result<Vec<(u64, StringRecord)>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path.display()))?;
    let headers = rdr
        .headers()
        .with_context(|| format!("Read header of {}", path.display()))?;
    let found: Vec<&str> = headers.iter().collect();
    if found != expected {
        return Err(anyhow!(
            "{}: expected columns '{}', found '{}'",
            path.display(),
            expected.join(","),
            found.join(",")
        ));
    }
    let mut out = Vec::new();
    for result in rdr.records() {
        let rec = result.with_context(|| format!("Parse {}", path.display()))?;
        let line = rec.position().map_or(0, |p| p.line());
        if rec.iter().all(|f| f.is_empty()) {
            continue;
        }
        out.push((line, rec));
    }
    Ok(out)
}

fn field<'r>(
    rec: &'r StringRecord,
    idx: usize,
    name: &str,
    path: &Path,
    line: u64,
) -> Result<&'r str> {
    rec.get(idx)
        .filter(|s| !s.is_empty())
        .with_context(|| format!("{}:{}: {} missing", path.display(), line, name))
}

fn month_field(rec: &StringRecord, path: &Path, line: u64) -> Result<Month> {
    let raw = field(rec, 0, "month", path, line)?;
    raw.parse::<Month>()
        .with_context(|| format!("{}:{}: invalid month '{}'", path.display(), line, raw))
}

pub fn read_ledger_rows(path: &Path) -> Result<Vec<LedgerRow>> {
    let mut rows = Vec::new();
    for (line, rec) in records(path, &LEDGER_HEADERS)? {
        let month = month_field(&rec, path, line)?;
        let entity = field(&rec, 1, "entity", path, line)?.to_string();
        let cat_raw = field(&rec, 2, "account_category", path, line)?;
        let account_category = cat_raw
            .parse::<AccountCategory>()
            .with_context(|| format!("{}:{}", path.display(), line))?;
        let amount = parse_decimal(field(&rec, 3, "amount", path, line)?)
            .with_context(|| format!("{}:{}: invalid amount", path.display(), line))?;
        let currency = field(&rec, 4, "currency", path, line)?.to_uppercase();
        rows.push(LedgerRow {
            month,
            entity,
            account_category,
            amount,
            currency,
        });
    }
    Ok(rows)
}

pub fn read_cash_rows(path: &Path) -> Result<Vec<CashRow>> {
    let mut rows = Vec::new();
    for (line, rec) in records(path, &CASH_HEADERS)? {
        rows.push(CashRow {
            month: month_field(&rec, path, line)?,
            entity: field(&rec, 1, "entity", path, line)?.to_string(),
            cash_usd: parse_decimal(field(&rec, 2, "cash_usd", path, line)?)
                .with_context(|| format!("{}:{}: invalid cash_usd", path.display(), line))?,
        });
    }
    Ok(rows)
}

/// FX rows must be strictly positive; zero or negative rates are rejected here.
pub fn read_fx_rows(path: &Path) -> Result<Vec<FxRow>> {
    let mut rows = Vec::new();
    for (line, rec) in records(path, &FX_HEADERS)? {
        let month = month_field(&rec, path, line)?;
        let currency = field(&rec, 1, "currency", path, line)?.to_uppercase();
        let rate_to_usd = parse_decimal(field(&rec, 2, "rate_to_usd", path, line)?)
            .with_context(|| format!("{}:{}: invalid rate_to_usd", path.display(), line))?;
        if rate_to_usd <= rust_decimal::Decimal::ZERO {
            return Err(anyhow!(
                "{}:{}: rate_to_usd for {} {} must be positive, got {}",
                path.display(),
                line,
                currency,
                month,
                rate_to_usd
            ));
        }
        rows.push(FxRow {
            month,
            currency,
            rate_to_usd,
        });
    }
    Ok(rows)
}
