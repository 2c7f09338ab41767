use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

use super::clock::{Clock, SystemClock};
use super::config::{LimitConfig, RateLimitConfig, RateLimitType};
use super::store::{AttemptCounter, AttemptState};
use super::Error;

/// Who the attempts are counted for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RateLimitSubject {
    User(Uuid),
    /// Free-form target such as a phone number, IP address or email digest.
    Target(String),
}

impl RateLimitSubject {
    /// Build a subject from exactly one of `user` or `target`.
    ///
    /// # Errors
    /// Returns `Error::InvalidArgument` when both or neither are given, or when
    /// the target is blank.
    pub fn from_parts(user: Option<Uuid>, target: Option<String>) -> Result<Self, Error> {
        match (user, target) {
            (Some(_), Some(_)) => Err(Error::invalid(
                "rate limiter must have a user or a target, but both were provided",
            )),
            (None, None) => Err(Error::invalid(
                "rate limiter must have a user or a target, but neither were provided",
            )),
            (Some(user), None) => Ok(Self::User(user)),
            (None, Some(target)) => Self::target(target),
        }
    }

    /// # Errors
    /// Returns `Error::InvalidArgument` for a blank target.
    pub fn target(target: impl Into<String>) -> Result<Self, Error> {
        let target = target.into();
        if target.trim().is_empty() {
            return Err(Error::invalid("rate limiter target must not be blank"));
        }
        Ok(Self::Target(target))
    }
}

impl fmt::Display for RateLimitSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(user) => write!(f, "{user}"),
            Self::Target(target) => f.write_str(target),
        }
    }
}

/// Attempt limiter for one limit type and one subject.
///
/// Every read goes to the store, so limiters built for the same key in
/// different tasks or processes agree on the state.
#[derive(Debug)]
pub struct RateLimiter<S, C = SystemClock> {
    limit_type: RateLimitType,
    subject: RateLimitSubject,
    limit: LimitConfig,
    key: String,
    store: S,
    clock: C,
}

impl<S: AttemptCounter> RateLimiter<S> {
    /// Limiter on the system clock.
    ///
    /// # Errors
    /// See [`RateLimiter::with_clock`].
    pub fn new(
        limit_type: RateLimitType,
        subject: RateLimitSubject,
        store: S,
        config: &RateLimitConfig,
    ) -> Result<Self, Error> {
        Self::with_clock(limit_type, subject, store, SystemClock, config)
    }
}

impl<S: AttemptCounter, C: Clock> RateLimiter<S, C> {
    /// # Errors
    /// Returns `Error::InvalidArgument` if `config` has no valid limit for
    /// `limit_type`.
    pub fn with_clock(
        limit_type: RateLimitType,
        subject: RateLimitSubject,
        store: S,
        clock: C,
        config: &RateLimitConfig,
    ) -> Result<Self, Error> {
        let limit = *config
            .limit(limit_type)
            .ok_or_else(|| Error::invalid("rate_limit_type is not valid"))?;
        limit.validate()?;

        let key = format!("rate_limit:{subject}:{limit_type}");
        Ok(Self {
            limit_type,
            subject,
            limit,
            key,
            store,
            clock,
        })
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn limit_type(&self) -> RateLimitType {
        self.limit_type
    }

    #[must_use]
    pub fn subject(&self) -> &RateLimitSubject {
        &self.subject
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.limit.max_attempts
    }

    async fn state(&self) -> Result<Option<AttemptState>, Error> {
        self.store.fetch(&self.key, self.clock.now()).await
    }

    /// Attempts counted in the current window.
    ///
    /// # Errors
    /// Returns `Error::Database` if the store fails.
    pub async fn attempts(&self) -> Result<u32, Error> {
        Ok(self.state().await?.map_or(0, |state| state.attempts))
    }

    /// # Errors
    /// Returns `Error::Database` if the store fails.
    pub async fn attempted_at(&self) -> Result<Option<DateTime<Utc>>, Error> {
        Ok(self.state().await?.map(|state| state.attempted_at))
    }

    /// End of the current window, or now when nothing was attempted.
    ///
    /// # Errors
    /// Returns `Error::Database` if the store fails.
    pub async fn expires_at(&self) -> Result<DateTime<Utc>, Error> {
        let now = self.clock.now();
        Ok(self
            .store
            .fetch(&self.key, now)
            .await?
            .map_or(now, |state| state.expires_at))
    }

    /// # Errors
    /// Returns `Error::Database` if the store fails.
    pub async fn limited(&self) -> Result<bool, Error> {
        Ok(self
            .state()
            .await?
            .is_some_and(|state| state.attempts >= self.limit.max_attempts))
    }

    /// # Errors
    /// Returns `Error::Database` if the store fails.
    pub async fn remaining_count(&self) -> Result<u32, Error> {
        Ok(self.limit.max_attempts.saturating_sub(self.attempts().await?))
    }

    /// Count one attempt and return the attempts in the window.
    ///
    /// While limited this is a no-op and the window is not extended.
    ///
    /// # Errors
    /// Returns `Error::Database` if the store fails.
    pub async fn increment(&self) -> Result<u32, Error> {
        let state = self
            .store
            .increment(&self.key, &self.limit, self.clock.now())
            .await?;

        if state.attempts >= self.limit.max_attempts {
            info!(
                key = %self.key,
                attempts = state.attempts,
                expires_at = %state.expires_at,
                "rate limited"
            );
        } else {
            debug!(key = %self.key, attempts = state.attempts, "attempt counted");
        }

        Ok(state.attempts)
    }

    /// Jump straight to the limit, starting a fresh window.
    ///
    /// # Errors
    /// Returns `Error::Database` if the store fails.
    pub async fn increment_to_limited(&self) -> Result<u32, Error> {
        let now = self.clock.now();
        let state = AttemptState {
            attempts: self.limit.max_attempts,
            attempted_at: now,
            expires_at: now + self.limit.window_for(self.limit.max_attempts),
        };
        self.store.put(&self.key, state).await?;
        info!(key = %self.key, "rate limited");
        Ok(state.attempts)
    }

    /// Clear the counter.
    ///
    /// # Errors
    /// Returns `Error::Database` if the store fails.
    pub async fn reset(&self) -> Result<(), Error> {
        self.store.delete(&self.key).await?;
        debug!(key = %self.key, "rate limit reset");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::rate_limit::clock::ManualClock;
    use crate::rate_limit::store::MemoryStore;
    use chrono::Duration;

    fn limiter(
        max_attempts: u32,
        window_minutes: u32,
    ) -> (RateLimiter<MemoryStore, ManualClock>, ManualClock) {
        let clock = ManualClock::default();
        let config = RateLimitConfig::default().with_limit(
            RateLimitType::IdvDocAuth,
            LimitConfig::new(max_attempts, window_minutes),
        );
        let limiter = RateLimiter::with_clock(
            RateLimitType::IdvDocAuth,
            RateLimitSubject::target("1").unwrap(),
            MemoryStore::new(),
            clock.clone(),
            &config,
        )
        .unwrap();
        (limiter, clock)
    }

    #[test]
    fn subject_requires_exactly_one_part() {
        let user = Uuid::new_v4();
        assert_eq!(
            RateLimitSubject::from_parts(Some(user), None).unwrap(),
            RateLimitSubject::User(user)
        );
        assert!(RateLimitSubject::from_parts(None, None).is_err());
        assert!(RateLimitSubject::from_parts(Some(user), Some("1".into())).is_err());
        assert!(RateLimitSubject::from_parts(None, Some("  ".into())).is_err());
    }

    #[test]
    fn missing_limit_type_is_rejected() {
        let err = RateLimiter::new(
            RateLimitType::PhoneOtp,
            RateLimitSubject::target("+15555550100").unwrap(),
            MemoryStore::new(),
            &RateLimitConfig::empty(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "rate_limit_type is not valid");
    }

    #[test]
    fn key_combines_subject_and_type() {
        let user = Uuid::new_v4();
        let limiter = RateLimiter::new(
            RateLimitType::ProofSsn,
            RateLimitSubject::User(user),
            MemoryStore::new(),
            &RateLimitConfig::default(),
        )
        .unwrap();
        assert_eq!(limiter.key(), format!("rate_limit:{user}:proof_ssn"));
    }

    #[tokio::test]
    async fn fresh_limiter_has_nothing_attempted() {
        let (limiter, clock) = limiter(3, 10);
        assert_eq!(limiter.attempts().await.unwrap(), 0);
        assert_eq!(limiter.attempted_at().await.unwrap(), None);
        assert_eq!(limiter.expires_at().await.unwrap(), clock.now());
        assert_eq!(limiter.remaining_count().await.unwrap(), 3);
        assert!(!limiter.limited().await.unwrap());
    }

    #[tokio::test]
    async fn increment_counts_and_refreshes_attempted_at() {
        let (limiter, clock) = limiter(3, 10);
        let start = clock.now();

        assert_eq!(limiter.increment().await.unwrap(), 1);
        clock.advance(Duration::minutes(1));
        assert_eq!(limiter.increment().await.unwrap(), 2);

        assert_eq!(
            limiter.attempted_at().await.unwrap(),
            Some(start + Duration::minutes(1))
        );
        assert_eq!(limiter.remaining_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn limited_increments_do_not_extend_expiry() {
        let (limiter, clock) = limiter(1, 10);

        limiter.increment().await.unwrap();
        assert!(limiter.limited().await.unwrap());
        let expires_at = limiter.expires_at().await.unwrap();

        clock.advance(Duration::minutes(5));
        assert_eq!(limiter.increment().await.unwrap(), 1);
        assert_eq!(limiter.expires_at().await.unwrap(), expires_at);

        clock.advance(Duration::minutes(5));
        assert!(!limiter.limited().await.unwrap());
        assert_eq!(limiter.attempts().await.unwrap(), 0);
        assert_eq!(limiter.increment().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn increment_to_limited_and_reset() {
        let (limiter, _clock) = limiter(4, 10);

        assert_eq!(limiter.increment_to_limited().await.unwrap(), 4);
        assert!(limiter.limited().await.unwrap());
        assert_eq!(limiter.remaining_count().await.unwrap(), 0);

        limiter.reset().await.unwrap();
        assert_eq!(limiter.attempts().await.unwrap(), 0);
        assert!(!limiter.limited().await.unwrap());
    }

    #[tokio::test]
    async fn exponential_windows_grow_per_attempt() {
        let clock = ManualClock::default();
        let config = RateLimitConfig::empty().with_limit(
            RateLimitType::ProofAddress,
            LimitConfig::new(10, 60).with_exponential_window(2.0, 24 * 60),
        );
        let limiter = RateLimiter::with_clock(
            RateLimitType::ProofAddress,
            RateLimitSubject::target("1").unwrap(),
            MemoryStore::new(),
            clock.clone(),
            &config,
        )
        .unwrap();
        let now = clock.now();

        let mut expected_hours = Vec::new();
        for _ in 0..10 {
            limiter.increment().await.unwrap();
            let expires_at = limiter.expires_at().await.unwrap();
            expected_hours.push((expires_at - now).num_hours());
        }

        assert_eq!(expected_hours, vec![1, 2, 4, 8, 16, 24, 24, 24, 24, 24]);
        assert!(limiter.limited().await.unwrap());
    }
}
