//! Provider authorization for resolved requirements.

use tracing::warn;

use super::error::Error;
use super::policy::{PolicyConfig, ServiceProviderPolicy};
use super::requirements::ResolvedRequirements;

/// Check that `service_provider` may ask for what was resolved.
///
/// # Errors
/// Returns `Error::Unauthorized` when the provider requests identity proofing
/// without being allowed to verify identities, IALMAX without being on the
/// allow-list, or facial match without facial-match IAL being enabled.
pub fn authorize(
    resolved: &ResolvedRequirements,
    service_provider: &ServiceProviderPolicy,
    config: &PolicyConfig,
) -> Result<(), Error> {
    let denied = if resolved.identity_proofing() && !service_provider.identity_verification_allowed()
    {
        Some("identity proofing")
    } else if resolved.ialmax() && !config.allows_ialmax(&service_provider.issuer) {
        Some("ialmax")
    } else if resolved.facial_match() && !service_provider.facial_match_ial_allowed {
        Some("facial match")
    } else {
        None
    };

    match denied {
        Some(requested) => {
            warn!(
                issuer = %service_provider.issuer,
                requested, "service provider requested unauthorized assurance"
            );
            Err(Error::Unauthorized {
                issuer: service_provider.issuer.clone(),
                requested,
            })
        }
        None => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::vot::component::{AAL2_ACR, IAL1_ACR, IAL2_ACR, IALMAX_ACR};
    use crate::vot::policy::IalLevel;
    use crate::vot::resolver::{resolve, AuthnRequest};

    const ISSUER: &str = "urn:gov:gsa:openidconnect:sp:test";

    fn resolved(request: &AuthnRequest) -> ResolvedRequirements {
        resolve(request, None, None, &PolicyConfig::default()).unwrap()
    }

    #[test]
    fn auth_only_requests_are_always_allowed() {
        let sp = ServiceProviderPolicy::new(ISSUER);
        let request = AuthnRequest::from_acr_values(format!("{AAL2_ACR} {IAL1_ACR}"));
        assert!(authorize(&resolved(&request), &sp, &PolicyConfig::default()).is_ok());
    }

    #[test]
    fn identity_proofing_needs_an_ial2_provider() {
        let request = AuthnRequest::from_acr_values(IAL2_ACR);

        let sp = ServiceProviderPolicy::new(ISSUER).with_default_ial(IalLevel::Ial1);
        let err = authorize(&resolved(&request), &sp, &PolicyConfig::default()).unwrap_err();
        assert_eq!(
            err,
            Error::Unauthorized {
                issuer: ISSUER.to_string(),
                requested: "identity proofing",
            }
        );

        let sp = ServiceProviderPolicy::new(ISSUER).with_default_ial(IalLevel::Ial2);
        assert!(authorize(&resolved(&request), &sp, &PolicyConfig::default()).is_ok());
    }

    #[test]
    fn ialmax_needs_the_allow_list() {
        let request = AuthnRequest::from_acr_values(IALMAX_ACR);
        let sp = ServiceProviderPolicy::new(ISSUER);

        assert!(authorize(&resolved(&request), &sp, &PolicyConfig::default()).is_err());

        let config = PolicyConfig {
            ialmax_issuers: [ISSUER.to_string()].into_iter().collect(),
            ..PolicyConfig::default()
        };
        assert!(authorize(&resolved(&request), &sp, &config).is_ok());
    }

    #[test]
    fn facial_match_needs_the_provider_flag() {
        let request = AuthnRequest::from_vtr(["C2.Pb"]);
        let sp = ServiceProviderPolicy::new(ISSUER).with_default_ial(IalLevel::Ial2);
        assert!(authorize(&resolved(&request), &sp, &PolicyConfig::default()).is_err());

        let sp = sp.with_facial_match_ial_allowed(true);
        assert!(authorize(&resolved(&request), &sp, &PolicyConfig::default()).is_ok());
    }
}
