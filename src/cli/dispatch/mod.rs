use crate::cli::actions::{rate_limit, resolve, Action};
use crate::cli::commands::{self, rate_limit as rate_limit_cmd, resolve as resolve_cmd};
use crate::rate_limit::{RateLimitSubject, RateLimitType};
use crate::vot::{parser, AalLevel, AuthnRequest, IalLevel, RequesterState};
use anyhow::{anyhow, bail, Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;
use std::path::PathBuf;
use url::Url;
use uuid::Uuid;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((resolve_cmd::NAME, sub_m)) => Ok(Action::Resolve(resolve_args(sub_m)?)),
        Some((rate_limit_cmd::NAME, sub_m)) => Ok(Action::RateLimit(rate_limit_args(sub_m)?)),
        _ => bail!("unknown subcommand"),
    }
}

fn config_path(matches: &ArgMatches) -> Option<PathBuf> {
    matches.get_one::<PathBuf>(commands::ARG_CONFIG).cloned()
}

fn parse_value<T>(matches: &ArgMatches, id: &str) -> Result<Option<T>>
where
    T: std::str::FromStr<Err = String>,
{
    matches
        .get_one::<String>(id)
        .map(|raw| raw.parse::<T>().map_err(|e| anyhow!(e)))
        .transpose()
}

fn resolve_args(matches: &ArgMatches) -> Result<resolve::Args> {
    let vtr = match matches.get_one::<String>(resolve_cmd::ARG_VTR) {
        Some(raw) => parser::parse_vtr_param(raw).context("invalid --vtr")?,
        None => Vec::new(),
    };
    let request = AuthnRequest {
        vtr,
        acr_values: matches.get_one::<String>(resolve_cmd::ARG_ACR_VALUES).cloned(),
    };

    let requester = parse_value::<RequesterState>(matches, resolve_cmd::ARG_REQUESTER)?
        .unwrap_or_else(RequesterState::anonymous);

    Ok(resolve::Args {
        request,
        issuer: matches.get_one::<String>(resolve_cmd::ARG_ISSUER).cloned(),
        requester,
        default_aal: parse_value::<AalLevel>(matches, resolve_cmd::ARG_DEFAULT_AAL)?,
        default_ial: parse_value::<IalLevel>(matches, resolve_cmd::ARG_DEFAULT_IAL)?,
        facial_match_allowed: matches.get_flag(resolve_cmd::ARG_FACIAL_MATCH_ALLOWED),
        authorize: matches.get_flag(resolve_cmd::ARG_AUTHORIZE),
        config: config_path(matches),
    })
}

fn rate_limit_args(matches: &ArgMatches) -> Result<rate_limit::Args> {
    let (operation, op_m) = match matches.subcommand() {
        Some((rate_limit_cmd::OP_INCREMENT, m)) => (rate_limit::Operation::Increment, m),
        Some((rate_limit_cmd::OP_STATUS, m)) => (rate_limit::Operation::Status, m),
        Some((rate_limit_cmd::OP_RESET, m)) => (rate_limit::Operation::Reset, m),
        Some((rate_limit_cmd::OP_LIMIT, m)) => (rate_limit::Operation::Limit, m),
        _ => bail!("missing rate-limit operation"),
    };

    let limit_type = op_m
        .get_one::<String>(rate_limit_cmd::ARG_LIMIT_TYPE)
        .context("missing required argument: --limit-type")?
        .parse::<RateLimitType>()?;

    let subject = RateLimitSubject::from_parts(
        op_m.get_one::<Uuid>(rate_limit_cmd::ARG_USER).copied(),
        op_m.get_one::<String>(rate_limit_cmd::ARG_TARGET).cloned(),
    )?;

    let dsn = op_m
        .get_one::<String>(rate_limit_cmd::ARG_DSN)
        .map(|raw| parse_dsn(raw))
        .transpose()?;

    Ok(rate_limit::Args {
        operation,
        limit_type,
        subject,
        dsn,
        config: config_path(op_m),
    })
}

fn parse_dsn(raw: &str) -> Result<SecretString> {
    let url = Url::parse(raw).context("invalid --dsn")?;
    if !matches!(url.scheme(), "postgres" | "postgresql") {
        bail!("--dsn must be a postgres:// URL");
    }
    Ok(SecretString::from(raw.to_string()))
}
