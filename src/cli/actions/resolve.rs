use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

use crate::config::Settings;
use crate::vot::{
    authorize, AalLevel, AuthnRequest, IalLevel, PolicyConfig, RequesterState,
    RequirementsResolver, ServiceProviderPolicy,
};

#[derive(Debug, Clone, Default)]
pub struct Args {
    pub request: AuthnRequest,
    pub issuer: Option<String>,
    pub requester: RequesterState,
    pub default_aal: Option<AalLevel>,
    pub default_ial: Option<IalLevel>,
    pub facial_match_allowed: bool,
    pub authorize: bool,
    pub config: Option<PathBuf>,
}

// Provider policy from the settings file, with command line overrides on top.
// Unknown issuers start from a policy without defaults.
fn service_provider(args: &Args, policy: &PolicyConfig) -> Option<ServiceProviderPolicy> {
    let issuer = args.issuer.as_deref()?;
    let mut sp = policy
        .service_provider(issuer)
        .cloned()
        .unwrap_or_else(|| ServiceProviderPolicy::new(issuer));

    if let Some(aal) = args.default_aal {
        sp.default_aal = Some(aal);
    }
    if let Some(ial) = args.default_ial {
        sp.default_ial = Some(ial);
    }
    if args.facial_match_allowed {
        sp.facial_match_ial_allowed = true;
    }
    Some(sp)
}

/// Resolve `args` against `settings` and render the result as JSON.
///
/// # Errors
/// Returns an error for malformed requests, or when `--authorize` is set and
/// the provider may not request the resolved context.
pub fn render(args: &Args, settings: &Settings) -> Result<String> {
    let service_provider = service_provider(args, &settings.policy);

    let resolved = RequirementsResolver::new(&settings.policy)
        .resolve(&args.request, service_provider.as_ref(), Some(&args.requester))
        .context("failed to resolve authentication context")?;

    if args.authorize {
        if let Some(sp) = &service_provider {
            authorize(&resolved, sp, &settings.policy)?;
            debug!(issuer = %sp.issuer, "service provider authorized");
        }
    }

    Ok(serde_json::to_string_pretty(&resolved)?)
}

/// # Errors
/// Returns an error if the settings file cannot be loaded or resolution fails.
pub fn execute(args: &Args) -> Result<()> {
    let settings = Settings::load_or_default(args.config.as_deref())?;
    println!("{}", render(args, &settings)?);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::vot::component::{IAL2_ACR, IALMAX_ACR};

    const ISSUER: &str = "urn:gov:gsa:openidconnect:sp:test";

    fn render_json(args: &Args, settings: &Settings) -> serde_json::Value {
        serde_json::from_str(&render(args, settings).unwrap()).unwrap()
    }

    #[test]
    fn renders_resolved_vectors() {
        let args = Args {
            request: AuthnRequest::from_vtr(["C1.C2.P1.Pb", "C1.C2.P1"]),
            requester: RequesterState::verified(),
            ..Args::default()
        };
        let json = render_json(&args, &Settings::default());
        assert_eq!(json["vector_of_trust"], "C1.C2.P1");
        assert_eq!(json["facial_match"], false);
        assert_eq!(json["identity_proofing"], true);
    }

    #[test]
    fn settings_policy_is_used_for_known_issuers() {
        let settings = Settings::from_json(&format!(
            r#"{{"policy": {{"service_providers": [{{"issuer": "{ISSUER}", "default_aal": "aal3"}}]}}}}"#
        ))
        .unwrap();
        let args = Args {
            request: AuthnRequest::default(),
            issuer: Some(ISSUER.to_string()),
            ..Args::default()
        };
        let json = render_json(&args, &settings);
        assert_eq!(json["phishing_resistant"], true);
    }

    #[test]
    fn command_line_overrides_provider_defaults() {
        let args = Args {
            request: AuthnRequest::default(),
            issuer: Some(ISSUER.to_string()),
            default_ial: Some(IalLevel::Ial2),
            ..Args::default()
        };
        let json = render_json(&args, &Settings::default());
        assert_eq!(json["asserted_ial_acr"], IAL2_ACR);
    }

    #[test]
    fn authorize_rejects_unlisted_ialmax_issuers() {
        let args = Args {
            request: AuthnRequest::from_acr_values(IALMAX_ACR),
            issuer: Some(ISSUER.to_string()),
            authorize: true,
            ..Args::default()
        };
        let err = render(&args, &Settings::default()).unwrap_err();
        assert!(err.to_string().contains("ialmax"), "{err}");
    }

    #[test]
    fn malformed_vectors_fail_with_context() {
        let args = Args {
            request: AuthnRequest::from_vtr(["C1.D3"]),
            ..Args::default()
        };
        let err = render(&args, &Settings::default()).unwrap_err();
        assert_eq!(err.to_string(), "failed to resolve authentication context");
        assert!(format!("{err:#}").contains("unsupported component D3"));
    }
}
