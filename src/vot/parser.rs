//! Vector of Trust parsing.
//!
//! A vector is a dot-delimited list of component codes (`C1.C2.P1.Pb`). Parsing
//! is strict: any malformed vector or unknown component is an error, because
//! silently weakening a requested assurance level is never acceptable.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use super::component::{lookup_vot, Category, ComponentValue};
use super::error::ParseError;
use super::vector::{Vector, VectorKind};

const DEFAULT_COMPONENTS: [&str; 2] = ["C1", "P0"];
const NO_IDENTITY_PROOFING: &str = "P0";

fn vot_grammar() -> Option<&'static Regex> {
    static GRAMMAR: OnceLock<Option<Regex>> = OnceLock::new();
    GRAMMAR
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9]+(\.[A-Za-z0-9]+)*$").ok())
        .as_ref()
}

/// Parse a single vector of trust.
///
/// An empty vector is valid and means "no special requirements": it yields the
/// category defaults `C1` and `P0`.
///
/// # Errors
/// Returns `ParseError::InvalidVot` if the string is not a dot-delimited list of
/// alphanumeric codes, `ParseError::UnsupportedComponent` for unknown codes and
/// `ParseError::ConflictingComponents` when `P0` is combined with proofing.
pub fn parse(raw: &str) -> Result<Vector, ParseError> {
    let codes: Vec<&str> = if raw.is_empty() {
        DEFAULT_COMPONENTS.to_vec()
    } else {
        let Some(grammar) = vot_grammar() else {
            return Err(ParseError::InvalidVot {
                raw: raw.to_string(),
            });
        };
        if !grammar.is_match(raw) {
            return Err(ParseError::InvalidVot {
                raw: raw.to_string(),
            });
        }
        raw.split('.').collect()
    };

    let mut expanded: Vec<&'static ComponentValue> = Vec::new();
    for code in codes {
        let component = lookup_vot(code).ok_or_else(|| ParseError::UnsupportedComponent {
            raw: raw.to_string(),
            component: code.to_string(),
        })?;
        expand(component, &mut expanded);
    }

    let proofing = expanded
        .iter()
        .filter(|component| component.category == Category::IdentityProofing)
        .count();
    if proofing > 1
        && expanded
            .iter()
            .any(|component| component.name == NO_IDENTITY_PROOFING)
    {
        return Err(ParseError::ConflictingComponents {
            raw: raw.to_string(),
            category: Category::IdentityProofing.as_str(),
        });
    }

    expanded.sort_by(|a, b| (a.category, a.name).cmp(&(b.category, b.name)));

    let vector = Vector::new(VectorKind::Vot, expanded);
    debug!(raw, expanded = %vector, "parsed vector of trust");

    Ok(vector)
}

/// Parse each vector of a multi-vector request independently.
///
/// # Errors
/// Fails on the first vector that does not parse.
pub fn parse_all<S: AsRef<str>>(vectors: &[S]) -> Result<Vec<Vector>, ParseError> {
    vectors.iter().map(|raw| parse(raw.as_ref())).collect()
}

/// Decode the `vtr` request parameter.
///
/// Relying parties send a JSON array of vectors (`["C1.C2.P1.Pb","C1.C2.P1"]`);
/// a bare vector is accepted as a one-element list.
///
/// # Errors
/// Returns `ParseError::InvalidVtr` for JSON that is not an array of strings.
pub fn parse_vtr_param(raw: &str) -> Result<Vec<String>, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return serde_json::from_str::<Vec<String>>(trimmed).map_err(|err| {
            ParseError::InvalidVtr {
                reason: err.to_string(),
            }
        });
    }
    Ok(vec![trimmed.to_string()])
}

// Depth-first so prerequisites land before the component that implies them;
// the final ordering is fixed by the caller's sort.
fn expand(component: &'static ComponentValue, into: &mut Vec<&'static ComponentValue>) {
    if into.iter().any(|existing| existing.name == component.name) {
        return;
    }
    for implied in component.implied {
        if let Some(implied) = lookup_vot(implied) {
            expand(implied, into);
        }
    }
    into.push(component);
}
