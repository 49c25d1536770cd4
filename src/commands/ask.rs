// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::cli::question;
use crate::engine::MetricResult;
use crate::models::Ledger;
use crate::planner::{Answer, QueryPlanner};
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::Result;

pub fn handle(ledger: &Ledger, m: &clap::ArgMatches) -> Result<()> {
    let json_flag = m.get_flag("json");
    let jsonl_flag = m.get_flag("jsonl");
    let q = question(m);
    let answer = QueryPlanner::new(ledger.tables()).answer(&q);
    if !maybe_print_json(json_flag, jsonl_flag, &answer)? {
        print_answer(&answer);
    }
    Ok(())
}

pub fn print_answer(answer: &Answer) {
    println!("{}", answer.message);
    let Some(metric) = &answer.metric else {
        return;
    };
    println!("{}", headline_table(metric));
    if !metric.breakdown.is_empty() {
        let (headers, rows) = breakdown_rows(metric);
        let headers: Vec<&str> = headers.iter().map(String::as_str).collect();
        println!("{}", pretty_table(&headers, rows));
    }
    for note in &metric.notes {
        println!("note: {}", note);
    }
    for w in &metric.warnings {
        println!("warning: {}", w);
    }
    let chart = &metric.chart;
    println!(
        "chart: {:?} '{}' ({} categories, {} series)",
        chart.kind,
        chart.title,
        chart.categories.len(),
        chart.series.len()
    );
}

fn headline_table(metric: &MetricResult) -> comfy_table::Table {
    let rows = metric
        .headline
        .iter()
        .map(|m| vec![m.label.clone(), m.value.to_string()])
        .collect();
    pretty_table(&[metric.title.as_str(), "Value"], rows)
}

/// Column headers come from the first row; every row carries the same labels.
pub fn breakdown_rows(metric: &MetricResult) -> (Vec<String>, Vec<Vec<String>>) {
    let mut headers = vec![String::new()];
    if let Some(first) = metric.breakdown.first() {
        headers.extend(first.values.iter().map(|v| v.label.clone()));
    }
    let rows = metric
        .breakdown
        .iter()
        .map(|r| {
            let mut row = vec![r.label.clone()];
            row.extend(r.values.iter().map(|v| v.value.to_string()));
            row
        })
        .collect();
    (headers, rows)
}
