//! Catalog of supported Vector of Trust components and legacy ACR values.
//!
//! Both tables are fixed at compile time. Every entry belongs to exactly one
//! [`Category`] and contributes a fixed set of [`Requirement`]s. ACR tables are
//! listed in descending priority within their category; the position of an
//! entry is its priority.

use serde::Serialize;

use super::error::Error;

pub const LOA1_ACR: &str = "http://idmanagement.gov/ns/assurance/loa/1";
pub const LOA3_ACR: &str = "http://idmanagement.gov/ns/assurance/loa/3";
pub const IAL1_ACR: &str = "http://idmanagement.gov/ns/assurance/ial/1";
pub const IAL2_ACR: &str = "http://idmanagement.gov/ns/assurance/ial/2";
pub const IALMAX_ACR: &str = "http://idmanagement.gov/ns/assurance/ial/0";
pub const IAL2_BIO_REQUIRED_ACR: &str = "http://idmanagement.gov/ns/assurance/ial/2?bio=required";
pub const IAL2_BIO_PREFERRED_ACR: &str =
    "http://idmanagement.gov/ns/assurance/ial/2?bio=preferred";
pub const IAL_AUTH_ONLY_ACR: &str = "urn:acr.login.gov:auth-only";
pub const IAL_VERIFIED_ACR: &str = "urn:acr.login.gov:verified";
pub const IAL_VERIFIED_FACIAL_MATCH_REQUIRED_ACR: &str =
    "urn:acr.login.gov:verified-facial-match-required";
pub const IAL_VERIFIED_FACIAL_MATCH_PREFERRED_ACR: &str =
    "urn:acr.login.gov:verified-facial-match-preferred";

pub const DEFAULT_AAL_ACR: &str = "urn:gov:gsa:ac:classes:sp:PasswordProtectedTransport:duo";
pub const AAL1_ACR: &str = "http://idmanagement.gov/ns/assurance/aal/1";
pub const AAL2_ACR: &str = "http://idmanagement.gov/ns/assurance/aal/2";
pub const AAL2_PHISHING_RESISTANT_ACR: &str =
    "http://idmanagement.gov/ns/assurance/aal/2?phishing_resistant=true";
pub const AAL2_HSPD12_ACR: &str = "http://idmanagement.gov/ns/assurance/aal/2?hspd12=true";
pub const AAL3_ACR: &str = "http://idmanagement.gov/ns/assurance/aal/3";
pub const AAL3_HSPD12_ACR: &str = "http://idmanagement.gov/ns/assurance/aal/3?hspd12=true";

/// Axis a component constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    CredentialUsage,
    IdentityProofing,
}

impl Category {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CredentialUsage => "credential_usage",
            Self::IdentityProofing => "identity_proofing",
        }
    }
}

/// Capability a component asks the requester to prove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    Aal2,
    PhishingResistant,
    Hspd12,
    IdentityProofing,
    FacialMatch,
    Ialmax,
    EnhancedIpp,
    TwoPiecesOfFairEvidence,
}

/// A "facial match preferred" ACR resolves to one of these two names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FacialMatchPreference {
    pub required: &'static str,
    pub fallback: &'static str,
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ComponentValue {
    pub name: &'static str,
    pub description: &'static str,
    pub category: Category,
    pub implied: &'static [&'static str],
    pub requirements: &'static [Requirement],
    pub preference: Option<FacialMatchPreference>,
}

impl ComponentValue {
    #[must_use]
    pub fn requires(&self, requirement: Requirement) -> bool {
        self.requirements.contains(&requirement)
    }

    /// Position in its ACR priority table, 0 being the highest priority.
    #[must_use]
    pub fn acr_priority(&self) -> Option<usize> {
        acrs_by_priority(self.category)
            .iter()
            .position(|acr| acr.name == self.name)
    }
}

impl Serialize for ComponentValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

const fn vot(
    name: &'static str,
    description: &'static str,
    category: Category,
    implied: &'static [&'static str],
    requirements: &'static [Requirement],
) -> ComponentValue {
    ComponentValue {
        name,
        description,
        category,
        implied,
        requirements,
        preference: None,
    }
}

const fn acr(
    name: &'static str,
    description: &'static str,
    category: Category,
    requirements: &'static [Requirement],
) -> ComponentValue {
    ComponentValue {
        name,
        description,
        category,
        implied: &[],
        requirements,
        preference: None,
    }
}

const fn preferred_acr(
    name: &'static str,
    description: &'static str,
    requirements: &'static [Requirement],
    preference: FacialMatchPreference,
) -> ComponentValue {
    ComponentValue {
        name,
        description,
        category: Category::IdentityProofing,
        implied: &[],
        requirements,
        preference: Some(preference),
    }
}

use Category::{CredentialUsage, IdentityProofing};
use Requirement::{
    Aal2, EnhancedIpp, FacialMatch, Hspd12, Ialmax, PhishingResistant, TwoPiecesOfFairEvidence,
};

const VERIFIED: &[Requirement] = &[Aal2, Requirement::IdentityProofing];
const VERIFIED_FACIAL_MATCH: &[Requirement] = &[
    Aal2,
    Requirement::IdentityProofing,
    FacialMatch,
    TwoPiecesOfFairEvidence,
];

pub static VOT_COMPONENTS: &[ComponentValue] = &[
    vot("C1", "Multi-factor authentication", CredentialUsage, &[], &[]),
    vot(
        "C2",
        "AAL2 conformant features are engaged",
        CredentialUsage,
        &["C1"],
        &[Aal2],
    ),
    vot(
        "Ca",
        "A phishing resistant authenticator is required",
        CredentialUsage,
        &["C1"],
        &[PhishingResistant],
    ),
    vot(
        "Cb",
        "A PIV/CAC card is required",
        CredentialUsage,
        &["C1"],
        &[Hspd12],
    ),
    vot("P0", "No identity proofing", IdentityProofing, &[], &[]),
    vot(
        "P1",
        "Identity proofing is performed",
        IdentityProofing,
        &["C1", "C2"],
        &[Requirement::IdentityProofing],
    ),
    vot(
        "Pb",
        "A facial match comparison is performed against a collected document",
        IdentityProofing,
        &["P1"],
        &[FacialMatch, TwoPiecesOfFairEvidence],
    ),
    vot(
        "Pe",
        "Enhanced in-person identity proofing is performed",
        IdentityProofing,
        &["Pb"],
        &[EnhancedIpp],
    ),
];

pub static IAL_ACRS: &[ComponentValue] = &[
    acr(
        IAL_VERIFIED_FACIAL_MATCH_REQUIRED_ACR,
        "Identity proofing with facial match",
        IdentityProofing,
        VERIFIED_FACIAL_MATCH,
    ),
    acr(
        IAL2_BIO_REQUIRED_ACR,
        "IAL2 - require identity proofing with biometric comparison",
        IdentityProofing,
        VERIFIED_FACIAL_MATCH,
    ),
    preferred_acr(
        IAL_VERIFIED_FACIAL_MATCH_PREFERRED_ACR,
        "Identity proofing with facial match if already completed",
        VERIFIED_FACIAL_MATCH,
        FacialMatchPreference {
            required: IAL_VERIFIED_FACIAL_MATCH_REQUIRED_ACR,
            fallback: IAL_VERIFIED_ACR,
        },
    ),
    preferred_acr(
        IAL2_BIO_PREFERRED_ACR,
        "IAL2 - use identity proofing with biometric comparison if completed",
        VERIFIED_FACIAL_MATCH,
        FacialMatchPreference {
            required: IAL2_BIO_REQUIRED_ACR,
            fallback: IAL2_ACR,
        },
    ),
    acr(IAL_VERIFIED_ACR, "Identity proofing", IdentityProofing, VERIFIED),
    acr(IAL2_ACR, "Legacy IAL2", IdentityProofing, VERIFIED),
    acr(LOA3_ACR, "Legacy LOA3", IdentityProofing, VERIFIED),
    acr(IALMAX_ACR, "Legacy IALMAX", IdentityProofing, &[Aal2, Ialmax]),
    acr(
        IAL_AUTH_ONLY_ACR,
        "Authentication without identity proofing",
        IdentityProofing,
        &[],
    ),
    acr(IAL1_ACR, "Legacy IAL1", IdentityProofing, &[]),
    acr(LOA1_ACR, "Legacy LOA1", IdentityProofing, &[]),
];

pub static AAL_ACRS: &[ComponentValue] = &[
    acr(
        AAL2_HSPD12_ACR,
        "Legacy AAL2 with HSPD12",
        CredentialUsage,
        &[Aal2, Hspd12],
    ),
    acr(
        AAL3_HSPD12_ACR,
        "Legacy AAL3 with HSPD12",
        CredentialUsage,
        &[Aal2, Hspd12],
    ),
    acr(
        AAL2_PHISHING_RESISTANT_ACR,
        "Legacy AAL2 with phishing resistance",
        CredentialUsage,
        &[Aal2, PhishingResistant],
    ),
    acr(
        AAL3_ACR,
        "Legacy AAL3",
        CredentialUsage,
        &[Aal2, PhishingResistant],
    ),
    acr(AAL2_ACR, "Legacy AAL2", CredentialUsage, &[Aal2]),
    acr(AAL1_ACR, "Legacy AAL1", CredentialUsage, &[]),
    acr(
        DEFAULT_AAL_ACR,
        "Legacy default authentication",
        CredentialUsage,
        &[],
    ),
];

/// Look a code up in the VoT table, then in the ACR tables.
///
/// # Errors
/// Returns `Error::UnsupportedComponent` if neither table knows the code.
pub fn lookup(code: &str) -> Result<&'static ComponentValue, Error> {
    lookup_vot(code)
        .or_else(|| lookup_acr(code))
        .ok_or_else(|| Error::UnsupportedComponent {
            raw_code: code.to_string(),
        })
}

#[must_use]
pub fn lookup_vot(code: &str) -> Option<&'static ComponentValue> {
    VOT_COMPONENTS.iter().find(|component| component.name == code)
}

#[must_use]
pub fn lookup_acr(name: &str) -> Option<&'static ComponentValue> {
    IAL_ACRS
        .iter()
        .chain(AAL_ACRS.iter())
        .find(|component| component.name == name)
}

#[must_use]
pub fn acrs_by_priority(category: Category) -> &'static [ComponentValue] {
    match category {
        Category::IdentityProofing => IAL_ACRS,
        Category::CredentialUsage => AAL_ACRS,
    }
}

/// Highest-priority ACR of `category` among `components`.
pub fn highest_priority<I>(components: I, category: Category) -> Option<&'static ComponentValue>
where
    I: IntoIterator<Item = &'static ComponentValue>,
{
    components
        .into_iter()
        .filter(|component| component.category == category)
        .filter_map(|component| component.acr_priority().map(|rank| (rank, component)))
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, component)| component)
}

/// Whether the ACR named `name` covers every requirement in `requirements`.
#[must_use]
pub fn satisfies(name: &str, requirements: &[Requirement]) -> bool {
    lookup_acr(name).is_some_and(|component| {
        requirements
            .iter()
            .all(|requirement| component.requires(*requirement))
    })
}
