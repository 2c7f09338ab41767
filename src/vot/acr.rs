//! Legacy ACR value parsing.
//!
//! Unlike vectors of trust, ACR lists are parsed leniently: relying parties may
//! send values from newer or foreign systems alongside ones we support, so
//! unknown URIs are dropped. A list made only of unknown values is still an
//! error since nothing in it can be honored.

use tracing::debug;

use super::component::{highest_priority, lookup_acr, Category, ComponentValue};
use super::error::ParseError;
use super::vector::{Vector, VectorKind};

/// Parse a space-delimited ACR list into a vector.
///
/// Only the highest-priority IAL and the highest-priority AAL are kept, in the
/// order the relying party listed them. Blank input yields an empty vector.
///
/// # Errors
/// Returns `ParseError::UnknownAcrValues` if the input is not blank and none of
/// its values is supported.
pub fn parse(raw: Option<&str>) -> Result<Vector, ParseError> {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return Ok(Vector::new(VectorKind::Acr, Vec::new()));
    };

    let mut known: Vec<&'static ComponentValue> = Vec::new();
    for token in raw.split_whitespace() {
        match lookup_acr(token) {
            Some(component) => known.push(component),
            None => debug!(acr = token, "ignoring unsupported ACR value"),
        }
    }

    if known.is_empty() {
        return Err(ParseError::UnknownAcrValues {
            raw: raw.to_string(),
        });
    }

    let ial = highest_priority(known.iter().copied(), Category::IdentityProofing);
    let aal = highest_priority(known.iter().copied(), Category::CredentialUsage);

    let selected = known
        .into_iter()
        .filter(|component| {
            ial.is_some_and(|ial| ial.name == component.name)
                || aal.is_some_and(|aal| aal.name == component.name)
        })
        .collect();

    Ok(Vector::new(VectorKind::Acr, selected))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::vot::component::{
        Requirement, AAL1_ACR, AAL2_ACR, AAL3_ACR, IAL1_ACR, IAL2_ACR, IAL_AUTH_ONLY_ACR,
    };

    #[test]
    fn parses_aal_and_auth_only() {
        let raw = format!("{AAL2_ACR} {IAL_AUTH_ONLY_ACR}");
        let vector = parse(Some(&raw)).unwrap();
        assert_eq!(vector.expanded(), raw);
        assert!(vector.requires(Requirement::Aal2));
        assert!(!vector.requires(Requirement::IdentityProofing));
    }

    #[test]
    fn single_unknown_value_is_an_error() {
        assert_eq!(
            parse(Some("unknown-acr-value")),
            Err(ParseError::UnknownAcrValues {
                raw: "unknown-acr-value".to_string()
            })
        );
    }

    #[test]
    fn mixed_unknown_values_degrade_to_highest_ial() {
        let raw = format!("{IAL1_ACR} {IAL2_ACR} unknown-acr-value");
        let vector = parse(Some(&raw)).unwrap();
        assert_eq!(vector.expanded(), IAL2_ACR);
        assert!(vector.requires(Requirement::IdentityProofing));
    }

    #[test]
    fn keeps_the_highest_aal_in_request_order() {
        let raw = format!("{AAL1_ACR} {IAL1_ACR} {AAL3_ACR} {AAL2_ACR}");
        let vector = parse(Some(&raw)).unwrap();
        assert_eq!(vector.expanded(), format!("{IAL1_ACR} {AAL3_ACR}"));
    }

    #[test]
    fn blank_input_is_an_empty_vector() {
        assert!(parse(None).unwrap().is_empty());
        assert!(parse(Some("   ")).unwrap().is_empty());
    }

    #[test]
    fn extra_whitespace_is_ignored() {
        let raw = format!("  {AAL2_ACR}\t\t{IAL1_ACR}  ");
        assert_eq!(
            parse(Some(&raw)).unwrap().expanded(),
            format!("{AAL2_ACR} {IAL1_ACR}")
        );
    }
}
