// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, ArgMatches, Command, arg, command};

fn question_arg() -> Arg {
    Arg::new("question")
        .help("Question in plain English, e.g. \"What was June 2025 revenue vs budget?\"")
        .required(true)
        .num_args(1..)
}

fn json_flags(cmd: Command) -> Command {
    cmd.arg(arg!(--json "Print JSON").action(ArgAction::SetTrue))
        .arg(arg!(--jsonl "Print JSON lines").action(ArgAction::SetTrue))
}

pub fn build_cli() -> Command {
    command!()
        .name("cfo")
        .about("Ask financial questions over actuals, budget, cash and FX tables")
        .arg(
            arg!(--data <DIR> "Directory holding actuals.csv, budget.csv, cash.csv, fx.csv")
                .env("CFO_DATA_DIR")
                .global(true),
        )
        .subcommand(json_flags(
            Command::new("ask")
                .about("Answer a question with numbers and a chart spec")
                .arg(question_arg()),
        ))
        .subcommand(
            Command::new("explain")
                .about("Show how a question is classified and which period it resolves to")
                .arg(question_arg()),
        )
        .subcommand(
            Command::new("fx")
                .about("Inspect FX rates")
                .subcommand(
                    Command::new("list")
                        .about("List FX rates")
                        .arg(arg!(--month <MONTH> "Only this month (YYYY-MM)")),
                )
                .subcommand(
                    Command::new("convert")
                        .about("Convert an amount to USD at a month's rate")
                        .arg(arg!(--month <MONTH> "Month (YYYY-MM)").required(true))
                        .arg(arg!(--amount <AMOUNT> "Amount").required(true))
                        .arg(arg!(--currency <CCY> "ISO currency code").required(true)),
                ),
        )
        .subcommand(
            Command::new("export")
                .about("Write an answer to a file")
                .arg(arg!(--question <QUESTION> "Question to answer").required(true))
                .arg(
                    arg!(--format <FORMAT> "csv (breakdown rows) or json (full answer)")
                        .value_parser(["csv", "json"])
                        .default_value("json"),
                )
                .arg(arg!(--out <PATH> "Output file").required(true)),
        )
        .subcommand(Command::new("doctor").about("Check the tables for gaps that break answers"))
}

/// Joins the words of a multi-word positional question.
pub fn question(m: &ArgMatches) -> String {
    m.get_many::<String>("question")
        .map(|words| words.map(String::as_str).collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
        .trim()
        .to_string()
}
