//! Settings file shared by the CLI subcommands.
//!
//! ```json
//! {
//!   "policy": {
//!     "force_facial_match_issuers": ["urn:gov:gsa:openidconnect:sp:forced"],
//!     "ialmax_issuers": [],
//!     "service_providers": [
//!       {"issuer": "urn:gov:gsa:openidconnect:sp:test", "default_aal": "aal2", "default_ial": "ial2"}
//!     ]
//!   },
//!   "rate_limits": {
//!     "phone_otp": {"max_attempts": 3, "attempt_window_minutes": 10}
//!   }
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::rate_limit::{LimitConfig, RateLimitConfig, RateLimitType};
use crate::vot::PolicyConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub policy: PolicyConfig,
    /// Overrides layered on top of the built-in limits.
    pub rate_limits: BTreeMap<RateLimitType, LimitConfig>,
}

impl Settings {
    /// Read settings from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid settings JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let settings = Self::from_json(&raw)
            .with_context(|| format!("invalid settings file {}", path.display()))?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Settings from `path`, or the defaults when no path is given.
    ///
    /// # Errors
    /// See [`Settings::load`].
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// # Errors
    /// Returns an error for malformed JSON or unknown keys.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    #[must_use]
    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig::default().merged(&self.rate_limits)
    }
}
