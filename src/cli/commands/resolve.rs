use clap::{Arg, ArgAction, Command};

pub const NAME: &str = "resolve";

pub const ARG_VTR: &str = "vtr";
pub const ARG_ACR_VALUES: &str = "acr-values";
pub const ARG_ISSUER: &str = "issuer";
pub const ARG_REQUESTER: &str = "requester";
pub const ARG_DEFAULT_AAL: &str = "default-aal";
pub const ARG_DEFAULT_IAL: &str = "default-ial";
pub const ARG_FACIAL_MATCH_ALLOWED: &str = "facial-match-allowed";
pub const ARG_AUTHORIZE: &str = "authorize";

#[must_use]
pub fn subcommand() -> Command {
    Command::new(NAME)
        .about("Resolve the authentication context of a request and print it as JSON")
        .arg(
            Arg::new(ARG_VTR)
                .long("vtr")
                .help("Vectors of trust: a JSON array such as '[\"C1.C2.P1.Pb\",\"C1.C2.P1\"]' or a single vector")
                .env("AUTHN_CONTEXT_VTR"),
        )
        .arg(
            Arg::new(ARG_ACR_VALUES)
                .long("acr-values")
                .help("Space-delimited ACR values, used only when no vector of trust is given")
                .env("AUTHN_CONTEXT_ACR_VALUES"),
        )
        .arg(
            Arg::new(ARG_ISSUER)
                .long("issuer")
                .help("Service provider issuer; its policy is read from the settings file")
                .env("AUTHN_CONTEXT_ISSUER"),
        )
        .arg(
            Arg::new(ARG_REQUESTER)
                .long("requester")
                .help("Proofing state of the requester")
                .env("AUTHN_CONTEXT_REQUESTER")
                .value_parser(["anonymous", "unverified", "verified", "verified-facial-match"])
                .default_value("anonymous"),
        )
        .arg(
            Arg::new(ARG_DEFAULT_AAL)
                .long("default-aal")
                .help("Override the provider default AAL: 1, 2 or 3")
                .requires(ARG_ISSUER)
                .value_parser(["1", "2", "3"]),
        )
        .arg(
            Arg::new(ARG_DEFAULT_IAL)
                .long("default-ial")
                .help("Override the provider default IAL: 1, 2 or 2-strict")
                .requires(ARG_ISSUER)
                .value_parser(["1", "2", "2-strict"]),
        )
        .arg(
            Arg::new(ARG_FACIAL_MATCH_ALLOWED)
                .long("facial-match-allowed")
                .help("Allow the provider to request facial match")
                .requires(ARG_ISSUER)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_AUTHORIZE)
                .long("authorize")
                .help("Fail if the provider is not allowed to request the resolved context")
                .requires(ARG_ISSUER)
                .action(ArgAction::SetTrue),
        )
}
