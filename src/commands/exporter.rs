// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::Ledger;
use crate::planner::QueryPlanner;
use anyhow::{Context, Result, anyhow};

pub fn handle(ledger: &Ledger, m: &clap::ArgMatches) -> Result<()> {
    let question = m.get_one::<String>("question").context("question missing")?;
    let fmt = m
        .get_one::<String>("format")
        .map(|s| s.to_lowercase())
        .unwrap_or_else(|| "json".into());
    let out = m.get_one::<String>("out").context("out missing")?.trim();

    let answer = QueryPlanner::new(ledger.tables()).answer(question);
    let Some(metric) = answer.metric.as_ref() else {
        return Err(anyhow!("Cannot export: {}", answer.message));
    };

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out).with_context(|| format!("Create {}", out))?;
            let mut header = vec!["row".to_string()];
            if let Some(first) = metric.breakdown.first() {
                header.extend(first.values.iter().map(|v| v.label.clone()));
            }
            wtr.write_record(&header)?;
            for row in &metric.breakdown {
                let mut rec = vec![row.label.clone()];
                // Raw decimals so spreadsheets can re-aggregate them.
                rec.extend(row.values.iter().map(|v| match v.value.as_decimal() {
                    Some(d) => d.to_string(),
                    None => v.value.to_string(),
                }));
                wtr.write_record(&rec)?;
            }
            wtr.flush()?;
        }
        "json" => {
            std::fs::write(out, serde_json::to_string_pretty(&answer)?)
                .with_context(|| format!("Write {}", out))?;
        }
        other => return Err(anyhow!("Unknown format: {} (use csv|json)", other)),
    }
    println!("Exported {} answer to {}", answer.intent, out);
    Ok(())
}
