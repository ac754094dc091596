// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn output_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .help("Print as pretty JSON")
            .action(ArgAction::SetTrue),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .help("Print as JSON lines")
            .action(ArgAction::SetTrue),
    )
}

fn as_of_arg() -> Arg {
    Arg::new("as-of")
        .long("as-of")
        .help("Evaluate against this date (YYYY-MM-DD) instead of today")
}

pub fn build_cli() -> Command {
    Command::new("centime")
        .about("Personal-finance ledger: accounts, cards, invoices, subscriptions")
        .subcommand_required(false)
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("account")
                .about("Manage bank accounts")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("currency").long("currency").required(true))
                        .arg(
                            Arg::new("balance")
                                .long("balance")
                                .help("Opening balance, defaults to 0"),
                        )
                        .arg(
                            Arg::new("default")
                                .long("default")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(output_flags(Command::new("list")))
                .subcommand(
                    Command::new("set-default").arg(Arg::new("name").long("name").required(true)),
                )
                .subcommand(Command::new("rm").arg(Arg::new("name").long("name").required(true))),
        )
        .subcommand(
            Command::new("card")
                .about("Manage debit/credit cards")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(
                            Arg::new("kind")
                                .long("kind")
                                .required(true)
                                .help("debit|credit"),
                        )
                        .arg(Arg::new("currency").long("currency").required(true))
                        .arg(
                            Arg::new("account")
                                .long("account")
                                .help("Linked account name (required for debit cards)"),
                        )
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .help("Credit limit (credit cards)"),
                        )
                        .arg(
                            Arg::new("default")
                                .long("default")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(output_flags(Command::new("list")))
                .subcommand(
                    Command::new("set-default").arg(Arg::new("name").long("name").required(true)),
                )
                .subcommand(Command::new("rm").arg(Arg::new("name").long("name").required(true))),
        )
        .subcommand(
            Command::new("category")
                .about("Manage spending categories")
                .subcommand(Command::new("add").arg(Arg::new("name").long("name").required(true)))
                .subcommand(Command::new("list"))
                .subcommand(Command::new("rm").arg(Arg::new("name").long("name").required(true))),
        )
        .subcommand(
            Command::new("tx")
                .about("Record and manage transactions")
                .subcommand(tx_shape(Command::new("add")))
                .subcommand(tx_shape(Command::new("edit").arg(
                    Arg::new("id").long("id").required(true).value_parser(value_parser!(i64)),
                )))
                .subcommand(
                    Command::new("rm").arg(
                        Arg::new("id")
                            .long("id")
                            .required(true)
                            .value_parser(value_parser!(i64)),
                    ),
                )
                .subcommand(
                    output_flags(Command::new("list"))
                        .arg(Arg::new("month").long("month").help("YYYY-MM"))
                        .arg(Arg::new("account").long("account"))
                        .arg(Arg::new("type").long("type"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        ),
                ),
        )
        .subcommand(
            Command::new("invoice")
                .about("Track invoices and their lifecycle")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("creditor").long("creditor"))
                        .arg(Arg::new("amount").long("amount"))
                        .arg(Arg::new("currency").long("currency"))
                        .arg(Arg::new("iban").long("iban"))
                        .arg(Arg::new("reference").long("reference"))
                        .arg(Arg::new("message").long("message"))
                        .arg(Arg::new("issue-date").long("issue-date"))
                        .arg(Arg::new("due-date").long("due-date"))
                        .arg(
                            Arg::new("recurring")
                                .long("recurring")
                                .action(ArgAction::SetTrue),
                        )
                        .arg(
                            Arg::new("frequency")
                                .long("frequency")
                                .help("monthly|quarterly|yearly"),
                        )
                        .arg(
                            Arg::new("billing-day")
                                .long("billing-day")
                                .help("Day of month 1-31"),
                        )
                        .arg(
                            Arg::new("qr-json")
                                .long("qr-json")
                                .help("Parsed QR-bill payload (JSON string or @file) to prefill from"),
                        ),
                )
                .subcommand(
                    output_flags(Command::new("list"))
                        .arg(Arg::new("status").long("status"))
                        .arg(as_of_arg()),
                )
                .subcommand(
                    Command::new("pay")
                        .arg(
                            Arg::new("id")
                                .long("id")
                                .required(true)
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(Arg::new("account").long("account"))
                        .arg(Arg::new("card").long("card"))
                        .arg(
                            Arg::new("no-transaction")
                                .long("no-transaction")
                                .help("Mark paid without creating an expense")
                                .action(ArgAction::SetTrue),
                        )
                        .arg(as_of_arg()),
                )
                .subcommand(
                    Command::new("cancel").arg(
                        Arg::new("id")
                            .long("id")
                            .required(true)
                            .value_parser(value_parser!(i64)),
                    ),
                )
                .subcommand(
                    Command::new("refresh")
                        .about("Persist overdue status for past-due pending invoices")
                        .arg(as_of_arg()),
                ),
        )
        .subcommand(
            Command::new("sub")
                .about("Manage subscriptions and recurring billing")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("currency").long("currency").required(true))
                        .arg(
                            Arg::new("cycle")
                                .long("cycle")
                                .required(true)
                                .help("daily|weekly|monthly|quarterly|yearly"),
                        )
                        .arg(
                            Arg::new("billing-day")
                                .long("billing-day")
                                .help("Day of month 1-31, or weekday 0-6 for weekly"),
                        )
                        .arg(Arg::new("start").long("start").required(true))
                        .arg(Arg::new("end").long("end"))
                        .arg(Arg::new("account").long("account"))
                        .arg(Arg::new("card").long("card"))
                        .arg(Arg::new("category").long("category"))
                        .arg(
                            Arg::new("no-auto-tx")
                                .long("no-auto-tx")
                                .help("Track the schedule without creating expenses")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(
                    output_flags(Command::new("list"))
                        .arg(Arg::new("due").long("due").action(ArgAction::SetTrue))
                        .arg(
                            Arg::new("overdue")
                                .long("overdue")
                                .action(ArgAction::SetTrue),
                        )
                        .arg(
                            Arg::new("due-soon")
                                .long("due-soon")
                                .action(ArgAction::SetTrue),
                        )
                        .arg(as_of_arg()),
                )
                .subcommand(
                    Command::new("toggle").arg(Arg::new("name").long("name").required(true)),
                )
                .subcommand(
                    Command::new("pay-now")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(as_of_arg()),
                )
                .subcommand(
                    Command::new("skip")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(as_of_arg()),
                )
                .subcommand(
                    Command::new("run-due")
                        .about("Scheduler tick: process everything due")
                        .arg(as_of_arg()),
                ),
        )
        .subcommand(
            Command::new("settings")
                .about("Tunables")
                .subcommand(Command::new("show"))
                .subcommand(
                    Command::new("set").arg(
                        Arg::new("reminder-days")
                            .long("reminder-days")
                            .value_parser(value_parser!(i64)),
                    ),
                ),
        )
        .subcommand(
            Command::new("export").about("Export data").subcommand(
                Command::new("transactions")
                    .arg(
                        Arg::new("format")
                            .long("format")
                            .default_value("csv")
                            .help("csv|json"),
                    )
                    .arg(Arg::new("out").long("out").required(true)),
            ),
        )
        .subcommand(Command::new("doctor").about("Check ledger integrity"))
}

fn tx_shape(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("type")
            .long("type")
            .required(true)
            .help("income|expense|transfer|card_payment"),
    )
    .arg(Arg::new("date").long("date").required(true))
    .arg(Arg::new("amount").long("amount").required(true))
    .arg(
        Arg::new("currency")
            .long("currency")
            .help("Defaults to the source/destination instrument currency"),
    )
    .arg(Arg::new("from-account").long("from-account"))
    .arg(Arg::new("from-card").long("from-card"))
    .arg(Arg::new("to-account").long("to-account"))
    .arg(Arg::new("to-card").long("to-card"))
    .arg(Arg::new("category").long("category"))
    .arg(Arg::new("merchant").long("merchant"))
    .arg(Arg::new("note").long("note"))
}
