// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use cfo_copilot::{cli, commands, data, utils};

fn main() -> Result<()> {
    utils::init_tracing();
    let matches = cli::build_cli().get_matches();

    let Some((name, sub)) = matches.subcommand() else {
        cli::build_cli().print_help()?;
        println!();
        return Ok(());
    };

    let dir = data::resolve_data_dir(matches.get_one::<String>("data").map(String::as_str))?;
    let ledger = data::load_ledger(&dir)?;

    match name {
        "ask" => commands::ask::handle(&ledger, sub)?,
        "explain" => commands::explain::handle(&ledger, sub)?,
        "fx" => commands::fx::handle(&ledger, sub)?,
        "export" => commands::exporter::handle(&ledger, sub)?,
        "doctor" => commands::doctor::handle(&ledger)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
