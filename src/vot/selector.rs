//! Selection of one vector out of a multi-vector request.
//!
//! Rules are evaluated in order and the first rule with a matching vector
//! wins. Within a rule, the relying party's list order decides.

use tracing::debug;

use super::component::Requirement;
use super::policy::RequesterState;
use super::vector::Vector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRule {
    /// A facial-match vector the requester's facial-match profile satisfies.
    FacialMatchSatisfied,
    /// The first vector the requester satisfies as they are.
    Satisfied,
    /// The first listed vector: what the requester still has to achieve.
    FirstListed,
}

pub const SELECTION_RULES: [SelectionRule; 3] = [
    SelectionRule::FacialMatchSatisfied,
    SelectionRule::Satisfied,
    SelectionRule::FirstListed,
];

impl SelectionRule {
    #[must_use]
    pub fn matches(self, vector: &Vector, state: &RequesterState) -> bool {
        match self {
            Self::FacialMatchSatisfied => {
                vector.requires(Requirement::FacialMatch)
                    && state.identity_verified_with_facial_match()
            }
            Self::Satisfied => satisfied_by(vector, state),
            Self::FirstListed => true,
        }
    }
}

/// Whether `state` already meets the proofing asked for by `vector`.
#[must_use]
pub fn satisfied_by(vector: &Vector, state: &RequesterState) -> bool {
    if !vector.requires(Requirement::IdentityProofing) {
        return true;
    }
    if vector.requires(Requirement::FacialMatch) {
        return state.identity_verified_with_facial_match();
    }
    state.identity_verified()
}

/// Pick the vector that applies to `state`, `None` only for an empty list.
#[must_use]
pub fn select<'a>(vectors: &'a [Vector], state: &RequesterState) -> Option<&'a Vector> {
    SELECTION_RULES.iter().find_map(|rule| {
        let selected = vectors.iter().find(|vector| rule.matches(vector, state))?;
        debug!(?rule, selected = %selected, "selected vector of trust");
        Some(selected)
    })
}
