// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::cli::question;
use crate::intent::{Intent, IntentClassifier, classify_query};
use crate::models::Ledger;
use crate::planner::QueryPlanner;
use crate::utils::pretty_table;
use anyhow::Result;

pub fn handle(ledger: &Ledger, m: &clap::ArgMatches) -> Result<()> {
    let q = question(m);
    let tables = ledger.tables();
    let query = classify_query(&q, &tables.entities());

    let mut rows = vec![vec!["intent".to_string(), query.intent.tag().to_string()]];
    if let Intent::OpexBreakdown { category: Some(c) } = &query.intent {
        rows.push(vec!["category".into(), c.to_string()]);
    }
    rows.push(vec![
        "entity".into(),
        query.entity.clone().unwrap_or_else(|| "(all entities)".into()),
    ]);
    let period = if query.intent.is_unknown() {
        "(not resolved)".to_string()
    } else {
        match QueryPlanner::new(tables).resolve_period(&q) {
            Ok(p) => {
                let months: Vec<String> = p.months().iter().map(|m| m.to_string()).collect();
                format!("{} [{}]", p, months.join(", "))
            }
            Err(e) => format!("error: {}", e),
        }
    };
    rows.push(vec!["period".into(), period]);
    println!("{}", pretty_table(&["Field", "Value"], rows));

    let scores = IntentClassifier::scores(&q)
        .into_iter()
        .map(|(kind, score)| vec![format!("{:?}", kind), score.to_string()])
        .collect();
    println!("{}", pretty_table(&["Intent", "Score"], scores));
    Ok(())
}
