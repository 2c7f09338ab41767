//! Read-only inputs to resolution: who is asking and on whose behalf.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Proofing state of the requester at the time of the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequesterState {
    pub has_active_profile: bool,
    pub active_profile_used_facial_match: bool,
    pub anonymous: bool,
}

impl RequesterState {
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            has_active_profile: false,
            active_profile_used_facial_match: false,
            anonymous: true,
        }
    }

    #[must_use]
    pub const fn unverified() -> Self {
        Self {
            has_active_profile: false,
            active_profile_used_facial_match: false,
            anonymous: false,
        }
    }

    #[must_use]
    pub const fn verified() -> Self {
        Self {
            has_active_profile: true,
            active_profile_used_facial_match: false,
            anonymous: false,
        }
    }

    #[must_use]
    pub const fn verified_with_facial_match() -> Self {
        Self {
            has_active_profile: true,
            active_profile_used_facial_match: true,
            anonymous: false,
        }
    }

    #[must_use]
    pub const fn identity_verified(&self) -> bool {
        !self.anonymous && self.has_active_profile
    }

    #[must_use]
    pub const fn identity_verified_with_facial_match(&self) -> bool {
        self.identity_verified() && self.active_profile_used_facial_match
    }
}

impl FromStr for RequesterState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anonymous" => Ok(Self::anonymous()),
            "unverified" => Ok(Self::unverified()),
            "verified" => Ok(Self::verified()),
            "verified-facial-match" => Ok(Self::verified_with_facial_match()),
            _ => Err(format!("invalid requester state: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AalLevel {
    Aal1,
    Aal2,
    Aal3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IalLevel {
    Ial1,
    Ial2,
    /// IAL2 with facial match comparison.
    Ial2Strict,
}

impl FromStr for AalLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1" | "aal1" => Ok(Self::Aal1),
            "2" | "aal2" => Ok(Self::Aal2),
            "3" | "aal3" => Ok(Self::Aal3),
            _ => Err(format!("invalid AAL: {s}")),
        }
    }
}

impl FromStr for IalLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1" | "ial1" => Ok(Self::Ial1),
            "2" | "ial2" => Ok(Self::Ial2),
            "2-strict" | "ial2_strict" => Ok(Self::Ial2Strict),
            _ => Err(format!("invalid IAL: {s}")),
        }
    }
}

/// Service provider attributes that shape resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceProviderPolicy {
    pub issuer: String,
    #[serde(default)]
    pub default_aal: Option<AalLevel>,
    #[serde(default)]
    pub default_ial: Option<IalLevel>,
    #[serde(default)]
    pub facial_match_ial_allowed: bool,
}

impl ServiceProviderPolicy {
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            default_aal: None,
            default_ial: None,
            facial_match_ial_allowed: false,
        }
    }

    #[must_use]
    pub fn with_default_aal(mut self, aal: AalLevel) -> Self {
        self.default_aal = Some(aal);
        self
    }

    #[must_use]
    pub fn with_default_ial(mut self, ial: IalLevel) -> Self {
        self.default_ial = Some(ial);
        self
    }

    #[must_use]
    pub fn with_facial_match_ial_allowed(mut self, allowed: bool) -> Self {
        self.facial_match_ial_allowed = allowed;
        self
    }

    /// Whether the provider may request identity proofing at all.
    #[must_use]
    pub fn identity_verification_allowed(&self) -> bool {
        self.default_ial.is_some_and(|ial| ial >= IalLevel::Ial2)
    }
}

/// Process-wide policy, loaded once at startup and passed to the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Issuers whose plain identity-proofing requests always require facial match.
    pub force_facial_match_issuers: BTreeSet<String>,
    /// Issuers allowed to request IALMAX.
    pub ialmax_issuers: BTreeSet<String>,
    pub service_providers: Vec<ServiceProviderPolicy>,
}

impl PolicyConfig {
    #[must_use]
    pub fn forces_facial_match(&self, issuer: &str) -> bool {
        self.force_facial_match_issuers.contains(issuer)
    }

    #[must_use]
    pub fn allows_ialmax(&self, issuer: &str) -> bool {
        self.ialmax_issuers.contains(issuer)
    }

    #[must_use]
    pub fn service_provider(&self, issuer: &str) -> Option<&ServiceProviderPolicy> {
        self.service_providers
            .iter()
            .find(|sp| sp.issuer == issuer)
    }
}
