//! Windowed attempt counting for authentication and proofing flows.
//!
//! Flow Overview:
//! 1) A [`RateLimiter`] is built for one limit type and one subject (a user id
//!    or a free-form target such as a phone number or IP address).
//! 2) Each attempt is one atomic `increment` against an [`AttemptCounter`].
//! 3) Reaching `max_attempts` inside the window limits the subject until the
//!    window expires. Increments while limited are no-ops.
//!
//! Expiry is lazy: an expired counter reads as never attempted and is
//! overwritten by the next increment.

pub mod clock;
pub mod config;
pub mod limiter;
pub mod postgres;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{LimitConfig, RateLimitConfig, RateLimitType};
pub use limiter::{RateLimitSubject, RateLimiter};
pub use postgres::PostgresStore;
pub use store::{AttemptCounter, AttemptState, MemoryStore};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("rate limit store error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}
