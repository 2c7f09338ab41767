//! End-to-end resolution scenarios.
//!
//! Each test drives the public API the way a protocol handler would: build an
//! `AuthnRequest`, resolve it against a `PolicyConfig` and read the predicates
//! off the result.

use authn_context::vot::component::{
    AAL2_ACR, IAL1_ACR, IAL2_ACR, IAL2_BIO_REQUIRED_ACR, IAL_AUTH_ONLY_ACR, IAL_VERIFIED_ACR,
    IAL_VERIFIED_FACIAL_MATCH_REQUIRED_ACR,
};
use authn_context::vot::{
    acr, authorize, parser, resolve, selector, AalLevel, AuthnRequest, Error, IalLevel,
    ParseError, PolicyConfig, RequesterState, ServiceProviderPolicy,
};
use proptest::prelude::*;

const ISSUER: &str = "urn:gov:gsa:openidconnect:sp:scenario";
const VOT_CODES: [&str; 8] = ["C1", "C2", "Ca", "Cb", "P0", "P1", "Pb", "Pe"];

fn forcing_policy() -> PolicyConfig {
    PolicyConfig {
        force_facial_match_issuers: [ISSUER.to_string()].into(),
        ..PolicyConfig::default()
    }
}

#[test]
fn implied_components_are_expanded_and_sorted() {
    let vector = parser::parse("C2.Pb").unwrap();
    assert_eq!(vector.expanded(), "C1.C2.P1.Pb");
}

#[test]
fn enhanced_ipp_implies_facial_match_and_proofing() {
    let resolved = resolve(
        &AuthnRequest::from_vtr(["Pe"]),
        None,
        None,
        &PolicyConfig::default(),
    )
    .unwrap();
    assert!(resolved.enhanced_ipp());
    assert!(resolved.facial_match());
    assert!(resolved.identity_proofing());
}

#[test]
fn auth_only_acr_requests_aal2_without_proofing() {
    let vector = acr::parse(Some(&format!("{AAL2_ACR} {IAL_AUTH_ONLY_ACR}"))).unwrap();
    assert!(vector.requires(authn_context::vot::Requirement::Aal2));
    assert!(!vector.requires(authn_context::vot::Requirement::IdentityProofing));
}

#[test]
fn unknown_acr_values_fail_only_when_nothing_is_known() {
    let err = acr::parse(Some("unknown-acr-value")).unwrap_err();
    assert!(matches!(err, ParseError::UnknownAcrValues { .. }));

    let vector = acr::parse(Some(&format!("{IAL1_ACR} {IAL2_ACR} unknown-acr-value"))).unwrap();
    assert!(vector.contains(IAL2_ACR));
    assert!(!vector.contains(IAL1_ACR));
}

#[test]
fn selection_follows_requester_state() {
    let vectors = parser::parse_all(&["C2.Pb", "C2.P1"]).unwrap();
    let pick = |state: RequesterState| selector::select(&vectors, &state).unwrap().expanded();

    assert_eq!(pick(RequesterState::unverified()), "C1.C2.P1.Pb");
    assert_eq!(pick(RequesterState::anonymous()), "C1.C2.P1.Pb");
    assert_eq!(pick(RequesterState::verified_with_facial_match()), "C1.C2.P1.Pb");
    assert_eq!(pick(RequesterState::verified()), "C1.C2.P1");
}

#[test]
fn provider_default_aal_applies_to_empty_requests() {
    let sp = ServiceProviderPolicy::new(ISSUER).with_default_aal(AalLevel::Aal2);
    let resolved = resolve(
        &AuthnRequest::default(),
        Some(&sp),
        None,
        &PolicyConfig::default(),
    )
    .unwrap();
    assert!(resolved.aal2());
    assert!(!resolved.identity_proofing());
}

#[test]
fn forced_issuers_do_not_upgrade_auth_only_requests() {
    let sp = ServiceProviderPolicy::new(ISSUER);
    let resolved = resolve(
        &AuthnRequest::from_acr_values(IAL_AUTH_ONLY_ACR),
        Some(&sp),
        None,
        &forcing_policy(),
    )
    .unwrap();
    assert!(!resolved.identity_proofing());
    assert!(!resolved.facial_match());
}

#[test]
fn forced_issuers_upgrade_identity_verification() {
    let sp = ServiceProviderPolicy::new(ISSUER)
        .with_default_ial(IalLevel::Ial2)
        .with_facial_match_ial_allowed(true);
    let config = forcing_policy();

    let resolved = resolve(
        &AuthnRequest::from_acr_values(IAL_VERIFIED_ACR),
        Some(&sp),
        Some(&RequesterState::verified()),
        &config,
    )
    .unwrap();
    assert!(resolved.facial_match());
    assert_eq!(resolved.asserted_ial_acr(), Some(IAL_VERIFIED_FACIAL_MATCH_REQUIRED_ACR));

    let resolved = resolve(
        &AuthnRequest::from_acr_values(IAL2_ACR),
        Some(&sp),
        None,
        &config,
    )
    .unwrap();
    assert_eq!(resolved.asserted_ial_acr(), Some(IAL2_BIO_REQUIRED_ACR));

    let resolved = resolve(&AuthnRequest::from_vtr(["C2.P1"]), Some(&sp), None, &config).unwrap();
    assert_eq!(resolved.vector_of_trust().as_deref(), Some("C1.C2.P1.Pb"));

    authorize(&resolved, &sp, &config).unwrap();
}

#[test]
fn providers_without_facial_match_permission_are_refused() {
    let sp = ServiceProviderPolicy::new(ISSUER).with_default_ial(IalLevel::Ial2);
    let resolved = resolve(
        &AuthnRequest::from_vtr(["C2.Pb"]),
        Some(&sp),
        None,
        &PolicyConfig::default(),
    )
    .unwrap();

    let err = authorize(&resolved, &sp, &PolicyConfig::default()).unwrap_err();
    assert_eq!(
        err,
        Error::Unauthorized {
            issuer: ISSUER.to_string(),
            requested: "facial match",
        }
    );
}

#[test]
fn vtr_param_accepts_json_lists_and_bare_vectors() {
    assert_eq!(
        parser::parse_vtr_param(r#"["C1.C2.P1.Pb","C1.C2.P1"]"#).unwrap(),
        vec!["C1.C2.P1.Pb", "C1.C2.P1"]
    );
    assert_eq!(parser::parse_vtr_param("C2.P1").unwrap(), vec!["C2.P1"]);
    assert!(parser::parse_vtr_param("[1, 2]").is_err());
}

fn vot_string() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(VOT_CODES.to_vec()), 1..5)
        .prop_map(|codes| codes.join("."))
}

fn requester_state() -> impl Strategy<Value = RequesterState> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(profile, facial, anonymous)| {
        RequesterState {
            has_active_profile: profile,
            active_profile_used_facial_match: facial,
            anonymous,
        }
    })
}

proptest! {
    #[test]
    fn parsing_is_idempotent(raw in vot_string()) {
        prop_assert_eq!(parser::parse(&raw), parser::parse(&raw));

        if let Ok(vector) = parser::parse(&raw) {
            let reparsed = parser::parse(&vector.expanded()).unwrap();
            prop_assert_eq!(reparsed, vector);
        }
    }

    #[test]
    fn selection_is_deterministic(
        raws in prop::collection::vec(vot_string(), 1..4),
        state in requester_state(),
    ) {
        if let Ok(vectors) = parser::parse_all(&raws) {
            let first = selector::select(&vectors, &state).cloned();
            let second = selector::select(&vectors, &state).cloned();
            prop_assert!(first.is_some());
            prop_assert_eq!(first, second);
        }
    }
}
