use clap::{Arg, Command};

use crate::rate_limit::RateLimitType;

pub const NAME: &str = "rate-limit";

pub const ARG_LIMIT_TYPE: &str = "limit-type";
pub const ARG_TARGET: &str = "target";
pub const ARG_USER: &str = "user";
pub const ARG_DSN: &str = "dsn";

pub const OP_INCREMENT: &str = "increment";
pub const OP_STATUS: &str = "status";
pub const OP_RESET: &str = "reset";
pub const OP_LIMIT: &str = "limit";

fn with_subject_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_LIMIT_TYPE)
                .short('t')
                .long("limit-type")
                .help("Rate limit type")
                .env("AUTHN_CONTEXT_LIMIT_TYPE")
                .value_parser(RateLimitType::ALL.map(RateLimitType::as_str))
                .required(true),
        )
        .arg(
            Arg::new(ARG_TARGET)
                .long("target")
                .help("Free-form target: phone number, IP address, email digest")
                .conflicts_with(ARG_USER)
                .required_unless_present(ARG_USER),
        )
        .arg(
            Arg::new(ARG_USER)
                .long("user")
                .help("User id (UUID)")
                .value_parser(clap::value_parser!(uuid::Uuid)),
        )
}

#[must_use]
pub fn subcommand() -> Command {
    Command::new(NAME)
        .about("Inspect or update attempt counters")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long("dsn")
                .help("PostgreSQL connection string; counters are kept in memory when omitted")
                .env("AUTHN_CONTEXT_DSN")
                .global(true),
        )
        .subcommand(with_subject_args(
            Command::new(OP_INCREMENT).about("Count one attempt"),
        ))
        .subcommand(with_subject_args(
            Command::new(OP_STATUS).about("Show the current counter"),
        ))
        .subcommand(with_subject_args(
            Command::new(OP_RESET).about("Clear the counter"),
        ))
        .subcommand(with_subject_args(
            Command::new(OP_LIMIT).about("Mark the subject as limited for a full window"),
        ))
}
