use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitType {
    IdvDocAuth,
    RegUnconfirmedEmail,
    RegConfirmedEmail,
    ResetPasswordEmail,
    IdvResolution,
    IdvSendLink,
    VerifyPersonalKey,
    VerifyGpoKey,
    ProofSsn,
    ProofAddress,
    PhoneConfirmation,
    PhoneOtp,
}

impl RateLimitType {
    pub const ALL: [Self; 12] = [
        Self::IdvDocAuth,
        Self::RegUnconfirmedEmail,
        Self::RegConfirmedEmail,
        Self::ResetPasswordEmail,
        Self::IdvResolution,
        Self::IdvSendLink,
        Self::VerifyPersonalKey,
        Self::VerifyGpoKey,
        Self::ProofSsn,
        Self::ProofAddress,
        Self::PhoneConfirmation,
        Self::PhoneOtp,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IdvDocAuth => "idv_doc_auth",
            Self::RegUnconfirmedEmail => "reg_unconfirmed_email",
            Self::RegConfirmedEmail => "reg_confirmed_email",
            Self::ResetPasswordEmail => "reset_password_email",
            Self::IdvResolution => "idv_resolution",
            Self::IdvSendLink => "idv_send_link",
            Self::VerifyPersonalKey => "verify_personal_key",
            Self::VerifyGpoKey => "verify_gpo_key",
            Self::ProofSsn => "proof_ssn",
            Self::ProofAddress => "proof_address",
            Self::PhoneConfirmation => "phone_confirmation",
            Self::PhoneOtp => "phone_otp",
        }
    }
}

impl fmt::Display for RateLimitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RateLimitType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|limit_type| limit_type.as_str() == s)
            .ok_or_else(|| Error::invalid("rate_limit_type is not valid"))
    }
}

/// Attempts allowed for one limit type and the window they are counted in.
///
/// With an exponential factor the window for attempt `n` is
/// `attempt_window_minutes * factor^(n-1)`, capped at
/// `attempt_window_max_minutes`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitConfig {
    pub max_attempts: u32,
    pub attempt_window_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_window_exponential_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_window_max_minutes: Option<u32>,
}

impl LimitConfig {
    #[must_use]
    pub const fn new(max_attempts: u32, attempt_window_minutes: u32) -> Self {
        Self {
            max_attempts,
            attempt_window_minutes,
            attempt_window_exponential_factor: None,
            attempt_window_max_minutes: None,
        }
    }

    #[must_use]
    pub fn with_exponential_window(mut self, factor: f64, max_minutes: u32) -> Self {
        self.attempt_window_exponential_factor = Some(factor);
        self.attempt_window_max_minutes = Some(max_minutes);
        self
    }

    /// Window that applies once `attempts` attempts have been counted.
    #[must_use]
    pub fn window_for(&self, attempts: u32) -> Duration {
        Duration::seconds(self.window_seconds(attempts))
    }

    // Minutes are capped at u32::MAX so the result always fits a chrono
    // Duration and can be added to any realistic timestamp.
    #[allow(clippy::cast_possible_truncation)]
    fn window_seconds(&self, attempts: u32) -> i64 {
        let base = f64::from(self.attempt_window_minutes);
        let mut minutes = match self.attempt_window_exponential_factor {
            Some(factor) if attempts > 1 => {
                let exponent = i32::try_from(attempts - 1).unwrap_or(i32::MAX);
                base * factor.powi(exponent)
            }
            _ => base,
        };
        if let Some(max) = self.attempt_window_max_minutes {
            minutes = minutes.min(f64::from(max));
        }
        let minutes = minutes.clamp(0.0, f64::from(u32::MAX));
        (minutes * 60.0).round() as i64
    }

    /// Window rule in seconds, for stores that compute the window in SQL.
    #[must_use]
    pub fn window_parameters(&self) -> WindowParameters {
        let cap = f64::from(u32::MAX) * 60.0;
        let base_seconds = f64::from(self.attempt_window_minutes) * 60.0;
        let factor = self.attempt_window_exponential_factor.unwrap_or(1.0);
        let max_seconds = self
            .attempt_window_max_minutes
            .map_or(cap, |max| f64::from(max) * 60.0)
            .min(cap);

        // Past this exponent the window is pinned at max_seconds, so larger
        // powers never need to be evaluated.
        let mut max_exponent = 0;
        if base_seconds > 0.0 && factor > 1.0 {
            let mut window = base_seconds;
            while window < max_seconds && max_exponent < MAX_WINDOW_EXPONENT {
                window *= factor;
                max_exponent += 1;
            }
        }

        WindowParameters {
            base_seconds,
            factor,
            max_seconds,
            max_exponent,
        }
    }

    /// Check that the limit can be enforced.
    ///
    /// # Errors
    /// Returns `Error::InvalidArgument` for a zero attempt budget or window, or
    /// an exponential factor outside `1.0..=1000.0`.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_attempts == 0 {
            return Err(Error::invalid("max_attempts must be at least 1"));
        }
        if self.attempt_window_minutes == 0 {
            return Err(Error::invalid("attempt_window_minutes must be at least 1"));
        }
        if let Some(factor) = self.attempt_window_exponential_factor {
            if !(1.0..=MAX_EXPONENTIAL_FACTOR).contains(&factor) {
                return Err(Error::invalid(format!(
                    "attempt_window_exponential_factor must be between 1 and {MAX_EXPONENTIAL_FACTOR}"
                )));
            }
        }
        Ok(())
    }
}

const MAX_WINDOW_EXPONENT: i32 = 1024;
const MAX_EXPONENTIAL_FACTOR: f64 = 1000.0;

/// `min(base_seconds * factor^min(n - 1, max_exponent), max_seconds)` is the
/// window for attempt `n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowParameters {
    pub base_seconds: f64,
    pub factor: f64,
    pub max_seconds: f64,
    pub max_exponent: i32,
}

/// Limits per type. Every type has a built-in default.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RateLimitConfig {
    limits: BTreeMap<RateLimitType, LimitConfig>,
}

impl RateLimitConfig {
    /// Config without any limit type, for callers that want full control.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            limits: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn limit(&self, limit_type: RateLimitType) -> Option<&LimitConfig> {
        self.limits.get(&limit_type)
    }

    #[must_use]
    pub fn with_limit(mut self, limit_type: RateLimitType, limit: LimitConfig) -> Self {
        self.limits.insert(limit_type, limit);
        self
    }

    /// Layer `overrides` on top of the current limits.
    #[must_use]
    pub fn merged(mut self, overrides: &BTreeMap<RateLimitType, LimitConfig>) -> Self {
        self.limits
            .extend(overrides.iter().map(|(limit_type, limit)| (*limit_type, *limit)));
        self
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        use RateLimitType::{
            IdvDocAuth, IdvResolution, IdvSendLink, PhoneConfirmation, PhoneOtp, ProofAddress,
            ProofSsn, RegConfirmedEmail, RegUnconfirmedEmail, ResetPasswordEmail,
            VerifyGpoKey, VerifyPersonalKey,
        };

        let limits = [
            (IdvDocAuth, LimitConfig::new(5, 360)),
            (RegUnconfirmedEmail, LimitConfig::new(20, 60)),
            (RegConfirmedEmail, LimitConfig::new(20, 60)),
            (ResetPasswordEmail, LimitConfig::new(20, 60)),
            (IdvResolution, LimitConfig::new(5, 6 * 60)),
            (IdvSendLink, LimitConfig::new(5, 10)),
            (VerifyPersonalKey, LimitConfig::new(5, 15)),
            (VerifyGpoKey, LimitConfig::new(5, 10)),
            (ProofSsn, LimitConfig::new(10, 60)),
            (ProofAddress, LimitConfig::new(5, 360)),
            (PhoneConfirmation, LimitConfig::new(20, 60)),
            // OTP delivery allows one send beyond the retry budget.
            (PhoneOtp, LimitConfig::new(10 + 1, 10)),
        ];

        Self {
            limits: limits.into_iter().collect(),
        }
    }
}
