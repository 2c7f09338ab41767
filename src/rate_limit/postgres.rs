//! `PostgreSQL`-backed attempt counters.
//!
//! Flow Overview:
//! 1) One row per key in `rate_limits` (see `db/sql/01_rate_limits.sql`).
//! 2) `increment` is a single upsert whose `WHERE` clause skips rows that are
//!    limited inside their window, so concurrent workers never overshoot.
//! 3) A skipped upsert returns no row; the unchanged state is then read back.
//!    If a concurrent reset deleted the row in between, the upsert is retried
//!    and counts into a fresh window.
//!
//! Scaling: every service instance sharing the database shares the counters.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::time::Duration;
use tracing::{debug, instrument, Instrument};

use super::config::LimitConfig;
use super::store::{AttemptCounter, AttemptState};
use super::Error;

pub const SCHEMA_SQL: &str = include_str!("../../db/sql/01_rate_limits.sql");

const INCREMENT_QUERY: &str = r"
    INSERT INTO rate_limits (key, attempts, attempted_at, expires_at)
    VALUES ($1, 1, $2, $2 + make_interval(secs => LEAST($3, $5)))
    ON CONFLICT (key) DO UPDATE SET
        attempts = CASE
            WHEN rate_limits.expires_at <= $2 THEN 1
            ELSE rate_limits.attempts + 1
        END,
        attempted_at = $2,
        expires_at = $2 + make_interval(secs => LEAST(
            $3 * power($4, CASE
                WHEN rate_limits.expires_at <= $2 THEN 0
                ELSE LEAST(rate_limits.attempts, $6)
            END),
            $5
        ))
    WHERE rate_limits.expires_at <= $2 OR rate_limits.attempts < $7
    RETURNING attempts, attempted_at, expires_at
";

// Upsert rounds before giving up on a key that keeps being reset underneath us.
const INCREMENT_ROUNDS: usize = 3;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a small pool to `dsn`.
    ///
    /// # Errors
    /// Returns `Error::Database` if the database cannot be reached.
    pub async fn connect(dsn: &SecretString) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(dsn.expose_secret())
            .await?;
        Ok(Self::new(pool))
    }

    /// Create the `rate_limits` table if it does not exist.
    ///
    /// # Errors
    /// Returns `Error::Database` if the schema statements fail.
    pub async fn migrate(&self) -> Result<(), Error> {
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "CREATE"
        );
        sqlx::Executor::execute(&self.pool, SCHEMA_SQL)
            .instrument(span)
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // `None` when the row is limited inside its window and was left alone.
    async fn upsert(
        &self,
        key: &str,
        limit: &LimitConfig,
        now: DateTime<Utc>,
    ) -> Result<Option<AttemptState>, Error> {
        let window = limit.window_parameters();
        let max_attempts = i32::try_from(limit.max_attempts).unwrap_or(i32::MAX);

        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT"
        );
        let row = sqlx::query(INCREMENT_QUERY)
            .bind(key)
            .bind(now)
            .bind(window.base_seconds)
            .bind(window.factor)
            .bind(window.max_seconds)
            .bind(window.max_exponent)
            .bind(max_attempts)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        row.as_ref().map(state_from_row).transpose()
    }
}

fn state_from_row(row: &sqlx::postgres::PgRow) -> Result<AttemptState, Error> {
    let attempts: i32 = row.try_get("attempts")?;
    Ok(AttemptState {
        attempts: u32::try_from(attempts).unwrap_or(0),
        attempted_at: row.try_get("attempted_at")?,
        expires_at: row.try_get("expires_at")?,
    })
}

impl AttemptCounter for PostgresStore {
    async fn fetch(&self, key: &str, now: DateTime<Utc>) -> Result<Option<AttemptState>, Error> {
        let query = "SELECT attempts, attempted_at, expires_at FROM rate_limits WHERE key = $1 AND expires_at > $2";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT"
        );
        let row = sqlx::query(query)
            .bind(key)
            .bind(now)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        row.as_ref().map(state_from_row).transpose()
    }

    #[instrument(level = "debug", skip(self, limit))]
    async fn increment(
        &self,
        key: &str,
        limit: &LimitConfig,
        now: DateTime<Utc>,
    ) -> Result<AttemptState, Error> {
        for round in 1..=INCREMENT_ROUNDS {
            if let Some(state) = self.upsert(key, limit, now).await? {
                return Ok(state);
            }

            // Limited inside the window: the upsert was skipped.
            if let Some(state) = self.fetch(key, now).await? {
                return Ok(state);
            }
            debug!(round, "Rate limit row reset during increment, retrying");
        }

        Err(Error::Database(sqlx::Error::RowNotFound))
    }

    async fn put(&self, key: &str, state: AttemptState) -> Result<(), Error> {
        let query = r"
            INSERT INTO rate_limits (key, attempts, attempted_at, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (key) DO UPDATE SET
                attempts = EXCLUDED.attempts,
                attempted_at = EXCLUDED.attempted_at,
                expires_at = EXCLUDED.expires_at
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT"
        );
        sqlx::query(query)
            .bind(key)
            .bind(i32::try_from(state.attempts).unwrap_or(i32::MAX))
            .bind(state.attempted_at)
            .bind(state.expires_at)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        let query = "DELETE FROM rate_limits WHERE key = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE"
        );
        sqlx::query(query)
            .bind(key)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }
}
