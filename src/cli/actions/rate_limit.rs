use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

use crate::config::Settings;
use crate::rate_limit::{
    AttemptCounter, Clock, MemoryStore, PostgresStore, RateLimitSubject, RateLimitType,
    RateLimiter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Increment,
    Status,
    Reset,
    Limit,
}

#[derive(Debug)]
pub struct Args {
    pub operation: Operation,
    pub limit_type: RateLimitType,
    pub subject: RateLimitSubject,
    pub dsn: Option<SecretString>,
    pub config: Option<PathBuf>,
}

/// Counter state after the operation ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub key: String,
    pub limit_type: RateLimitType,
    pub attempts: u32,
    pub remaining: u32,
    pub limited: bool,
    pub attempted_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

/// Apply `operation` and report the resulting state.
///
/// # Errors
/// Returns an error if the store fails.
pub async fn run<S, C>(limiter: &RateLimiter<S, C>, operation: Operation) -> Result<Report>
where
    S: AttemptCounter,
    C: Clock,
{
    match operation {
        Operation::Increment => {
            limiter.increment().await?;
        }
        Operation::Limit => {
            limiter.increment_to_limited().await?;
        }
        Operation::Reset => limiter.reset().await?,
        Operation::Status => {}
    }

    Ok(Report {
        key: limiter.key().to_string(),
        limit_type: limiter.limit_type(),
        attempts: limiter.attempts().await?,
        remaining: limiter.remaining_count().await?,
        limited: limiter.limited().await?,
        attempted_at: limiter.attempted_at().await?,
        expires_at: limiter.expires_at().await?,
    })
}

/// # Errors
/// Returns an error if the settings, the database or the limiter setup fail.
pub async fn execute(args: Args) -> Result<()> {
    let settings = Settings::load_or_default(args.config.as_deref())?;
    let config = settings.rate_limit_config();

    let report = if let Some(dsn) = &args.dsn {
        let store = PostgresStore::connect(dsn)
            .await
            .context("failed to connect to database")?;
        store
            .migrate()
            .await
            .context("failed to create rate_limits table")?;
        let limiter = RateLimiter::new(args.limit_type, args.subject, store, &config)?;
        run(&limiter, args.operation).await?
    } else {
        warn!("no --dsn given, counters only live for this invocation");
        let limiter = RateLimiter::new(args.limit_type, args.subject, MemoryStore::new(), &config)?;
        run(&limiter, args.operation).await?
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::rate_limit::{LimitConfig, ManualClock, RateLimitConfig};

    fn limiter(store: MemoryStore, clock: ManualClock) -> RateLimiter<MemoryStore, ManualClock> {
        let config = RateLimitConfig::default()
            .with_limit(RateLimitType::PhoneOtp, LimitConfig::new(2, 10));
        RateLimiter::with_clock(
            RateLimitType::PhoneOtp,
            RateLimitSubject::target("+15555550100").unwrap(),
            store,
            clock,
            &config,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn operations_report_the_resulting_state() {
        let clock = ManualClock::default();
        let limiter = limiter(MemoryStore::new(), clock.clone());

        let report = run(&limiter, Operation::Status).await.unwrap();
        assert_eq!(report.attempts, 0);
        assert_eq!(report.remaining, 2);
        assert_eq!(report.expires_at, clock.now());
        assert_eq!(report.key, "rate_limit:+15555550100:phone_otp");

        let report = run(&limiter, Operation::Increment).await.unwrap();
        assert_eq!(report.attempts, 1);
        assert!(!report.limited);
        assert_eq!(report.attempted_at, Some(clock.now()));

        let report = run(&limiter, Operation::Limit).await.unwrap();
        assert_eq!(report.attempts, 2);
        assert_eq!(report.remaining, 0);
        assert!(report.limited);

        let report = run(&limiter, Operation::Reset).await.unwrap();
        assert_eq!(report.attempts, 0);
        assert!(!report.limited);
    }

    #[tokio::test]
    async fn report_serializes_limit_type_by_name() {
        let limiter = limiter(MemoryStore::new(), ManualClock::default());
        let report = run(&limiter, Operation::Increment).await.unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["limit_type"], "phone_otp");
        assert_eq!(json["attempts"], 1);
    }
}
