//! Resolution of a request's authentication context.
//!
//! Flow Overview:
//! 1) A non-empty `vtr` wins; `acr_values` is then ignored entirely.
//! 2) Several vectors are handed to the selector, one is used as is.
//! 3) ACR requests get the provider overlay: facial-match preference, default
//!    IAL, default AAL.
//! 4) Issuers on the force-facial-match list have plain identity proofing
//!    upgraded to facial match, for both request kinds.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::acr;
use super::component::{
    highest_priority, lookup, Category, Requirement, AAL2_ACR, AAL2_PHISHING_RESISTANT_ACR,
    IAL2_ACR, IAL2_BIO_REQUIRED_ACR, IAL_VERIFIED_ACR, IAL_VERIFIED_FACIAL_MATCH_REQUIRED_ACR,
};
use super::error::{Error, ParseError};
use super::parser;
use super::policy::{AalLevel, IalLevel, PolicyConfig, RequesterState, ServiceProviderPolicy};
use super::requirements::ResolvedRequirements;
use super::selector;
use super::vector::{Vector, VectorKind};

const FACIAL_MATCH_COMPONENT: &str = "Pb";

/// Authentication context as sent by the relying party.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthnRequest {
    #[serde(default)]
    pub vtr: Vec<String>,
    #[serde(default)]
    pub acr_values: Option<String>,
}

impl AuthnRequest {
    #[must_use]
    pub fn from_vtr<I, S>(vectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vtr: vectors.into_iter().map(Into::into).collect(),
            acr_values: None,
        }
    }

    #[must_use]
    pub fn from_acr_values(acr_values: impl Into<String>) -> Self {
        Self {
            vtr: Vec::new(),
            acr_values: Some(acr_values.into()),
        }
    }

    #[must_use]
    pub fn with_acr_values(mut self, acr_values: impl Into<String>) -> Self {
        self.acr_values = Some(acr_values.into());
        self
    }

    fn vectors(&self) -> Vec<&str> {
        self.vtr
            .iter()
            .map(String::as_str)
            .filter(|vector| !vector.trim().is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RequirementsResolver<'a> {
    config: &'a PolicyConfig,
}

impl<'a> RequirementsResolver<'a> {
    #[must_use]
    pub fn new(config: &'a PolicyConfig) -> Self {
        Self { config }
    }

    /// Resolve the requirements that apply to `request`.
    ///
    /// A missing requester is treated as anonymous, a missing provider as one
    /// without defaults.
    ///
    /// # Errors
    /// Returns `Error::Parse` for malformed `vtr` or `acr_values`, and
    /// `Error::UnsupportedComponent` if a policy default maps to no catalog
    /// entry.
    #[instrument(level = "debug", skip_all)]
    pub fn resolve(
        &self,
        request: &AuthnRequest,
        service_provider: Option<&ServiceProviderPolicy>,
        requester: Option<&RequesterState>,
    ) -> Result<ResolvedRequirements, Error> {
        let requester = requester.copied().unwrap_or_else(RequesterState::anonymous);
        let vectors = request.vectors();

        let vector = if vectors.is_empty() {
            let vector = acr::parse(request.acr_values.as_deref())?;
            let vector = resolve_facial_match_preference(vector, &requester)?;
            let vector = apply_default_ial(vector, service_provider)?;
            apply_default_aal(vector, service_provider)?
        } else {
            let parsed = parser::parse_all(&vectors)?;
            selector::select(&parsed, &requester)
                .cloned()
                .ok_or_else(|| ParseError::InvalidVtr {
                    reason: "no vectors of trust".to_string(),
                })?
        };

        let vector = self.apply_forced_facial_match(vector, service_provider)?;

        debug!(
            issuer = service_provider.map(|sp| sp.issuer.as_str()),
            resolved = %vector,
            "resolved authentication context"
        );

        Ok(ResolvedRequirements::new(vector))
    }

    fn apply_forced_facial_match(
        &self,
        vector: Vector,
        service_provider: Option<&ServiceProviderPolicy>,
    ) -> Result<Vector, Error> {
        let forced = service_provider.is_some_and(|sp| self.config.forces_facial_match(&sp.issuer));
        if !forced
            || !vector.requires(Requirement::IdentityProofing)
            || vector.requires(Requirement::FacialMatch)
        {
            return Ok(vector);
        }

        match vector.kind() {
            VectorKind::Vot => {
                Ok(parser::parse(&format!("{vector}.{FACIAL_MATCH_COMPONENT}"))?)
            }
            VectorKind::Acr => {
                let Some(ial) =
                    highest_priority(vector.component_values().iter().copied(), Category::IdentityProofing)
                else {
                    return Ok(vector);
                };
                let upgraded = if ial.name == IAL_VERIFIED_ACR {
                    IAL_VERIFIED_FACIAL_MATCH_REQUIRED_ACR
                } else {
                    IAL2_BIO_REQUIRED_ACR
                };
                debug!(from = ial.name, to = upgraded, "forcing facial match");
                Ok(vector.replacing(ial.name, lookup(upgraded)?))
            }
        }
    }
}

/// Resolve a request in one call.
///
/// # Errors
/// See [`RequirementsResolver::resolve`].
pub fn resolve(
    request: &AuthnRequest,
    service_provider: Option<&ServiceProviderPolicy>,
    requester: Option<&RequesterState>,
    config: &PolicyConfig,
) -> Result<ResolvedRequirements, Error> {
    RequirementsResolver::new(config).resolve(request, service_provider, requester)
}

// "Preferred" becomes "required" for requesters who have not been proofed yet
// or were proofed with facial match; everyone else keeps their profile.
fn resolve_facial_match_preference(
    vector: Vector,
    requester: &RequesterState,
) -> Result<Vector, Error> {
    let Some((name, preference)) = vector
        .component_values()
        .iter()
        .find_map(|component| component.preference.map(|p| (component.name, p)))
    else {
        return Ok(vector);
    };

    let target = if !requester.identity_verified() || requester.identity_verified_with_facial_match()
    {
        preference.required
    } else {
        preference.fallback
    };

    Ok(vector.replacing(name, lookup(target)?))
}

fn apply_default_ial(
    vector: Vector,
    service_provider: Option<&ServiceProviderPolicy>,
) -> Result<Vector, Error> {
    if vector.has_category(Category::IdentityProofing) {
        return Ok(vector);
    }
    match service_provider.and_then(|sp| sp.default_ial) {
        Some(IalLevel::Ial2) => Ok(vector.with(lookup(IAL2_ACR)?)),
        Some(IalLevel::Ial2Strict) => Ok(vector.with(lookup(IAL2_BIO_REQUIRED_ACR)?)),
        Some(IalLevel::Ial1) | None => Ok(vector),
    }
}

fn apply_default_aal(
    vector: Vector,
    service_provider: Option<&ServiceProviderPolicy>,
) -> Result<Vector, Error> {
    if vector.has_category(Category::CredentialUsage) {
        return Ok(vector);
    }
    match service_provider.and_then(|sp| sp.default_aal) {
        Some(AalLevel::Aal2) => Ok(vector.with(lookup(AAL2_ACR)?)),
        Some(AalLevel::Aal3) => Ok(vector.with(lookup(AAL2_PHISHING_RESISTANT_ACR)?)),
        Some(AalLevel::Aal1) | None => Ok(vector),
    }
}
