pub mod logging;
pub mod rate_limit;
pub mod resolve;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_CONFIG: &str = "config";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("authn-context")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new(ARG_CONFIG)
                .short('c')
                .long("config")
                .help("Settings file (JSON) with `policy` and `rate_limits` sections")
                .env("AUTHN_CONTEXT_CONFIG")
                .global(true)
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .subcommand(resolve::subcommand())
        .subcommand(rate_limit::subcommand());

    logging::with_args(command)
}
