use serde::{Serialize, Serializer};

use super::component::{
    acrs_by_priority, highest_priority, Category, ComponentValue, Requirement,
};
use super::vector::{Vector, VectorKind};

/// Final requirements for one request. Built once by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequirements {
    vector: Vector,
}

impl ResolvedRequirements {
    #[must_use]
    pub(crate) fn new(vector: Vector) -> Self {
        Self { vector }
    }

    #[must_use]
    pub fn vector(&self) -> &Vector {
        &self.vector
    }

    #[must_use]
    pub fn kind(&self) -> VectorKind {
        self.vector.kind()
    }

    #[must_use]
    pub fn component_values(&self) -> &[&'static ComponentValue] {
        self.vector.component_values()
    }

    #[must_use]
    pub fn aal2(&self) -> bool {
        self.vector.requires(Requirement::Aal2)
    }

    #[must_use]
    pub fn phishing_resistant(&self) -> bool {
        self.vector.requires(Requirement::PhishingResistant)
    }

    #[must_use]
    pub fn hspd12(&self) -> bool {
        self.vector.requires(Requirement::Hspd12)
    }

    #[must_use]
    pub fn identity_proofing(&self) -> bool {
        self.vector.requires(Requirement::IdentityProofing)
    }

    #[must_use]
    pub fn facial_match(&self) -> bool {
        self.vector.requires(Requirement::FacialMatch)
    }

    #[must_use]
    pub fn ialmax(&self) -> bool {
        self.vector.requires(Requirement::Ialmax)
    }

    #[must_use]
    pub fn enhanced_ipp(&self) -> bool {
        self.vector.requires(Requirement::EnhancedIpp)
    }

    #[must_use]
    pub fn two_pieces_of_fair_evidence(&self) -> bool {
        self.vector.requires(Requirement::TwoPiecesOfFairEvidence)
    }

    /// Canonical vector of trust to assert, for VoT requests only.
    #[must_use]
    pub fn vector_of_trust(&self) -> Option<String> {
        (self.kind() == VectorKind::Vot).then(|| self.vector.expanded())
    }

    /// AAL ACR to assert, `None` when no ACR covers the resolved flags.
    #[must_use]
    pub fn asserted_aal_acr(&self) -> Option<&'static str> {
        self.asserted_acr(Category::CredentialUsage)
    }

    /// IAL ACR to assert, `None` when no ACR covers the resolved flags.
    #[must_use]
    pub fn asserted_ial_acr(&self) -> Option<&'static str> {
        self.asserted_acr(Category::IdentityProofing)
    }

    fn requirements(&self) -> Vec<Requirement> {
        let mut requirements: Vec<Requirement> = self
            .component_values()
            .iter()
            .flat_map(|component| component.requirements.iter().copied())
            .collect();
        requirements.sort_unstable();
        requirements.dedup();
        requirements
    }

    // An ACR present in the vector is echoed back as is. Otherwise the first
    // ACR of the category, in priority order, that covers every resolved flag
    // of the category without asking for anything unresolved. "Preferred"
    // ACRs are never asserted.
    fn asserted_acr(&self, category: Category) -> Option<&'static str> {
        if let Some(present) = highest_priority(self.component_values().iter().copied(), category)
        {
            return Some(present.name);
        }

        let mut resolved = self.requirements();
        let implied: Vec<Requirement> = resolved
            .iter()
            .flat_map(|flag| implied_flags(*flag).iter().copied())
            .collect();
        resolved.extend(implied);
        resolved.sort_unstable();
        resolved.dedup();

        // Flags a stronger resolved flag already covers do not have to be
        // named by the ACR.
        let needed: Vec<Requirement> = axis(category)
            .iter()
            .copied()
            .filter(|flag| resolved.contains(flag))
            .filter(|flag| {
                !resolved
                    .iter()
                    .any(|other| implied_flags(*other).contains(flag))
            })
            .collect();

        acrs_by_priority(category)
            .iter()
            .filter(|acr| acr.preference.is_none())
            .find(|acr| {
                needed.iter().all(|flag| acr.requires(*flag))
                    && acr
                        .requirements
                        .iter()
                        .all(|requirement| resolved.contains(requirement))
            })
            .map(|acr| acr.name)
    }
}

// A PIV/CAC credential is phishing resistant, and both are AAL2 or better.
fn implied_flags(flag: Requirement) -> &'static [Requirement] {
    match flag {
        Requirement::Hspd12 => &[Requirement::PhishingResistant, Requirement::Aal2],
        Requirement::PhishingResistant => &[Requirement::Aal2],
        _ => &[],
    }
}

fn axis(category: Category) -> &'static [Requirement] {
    match category {
        Category::CredentialUsage => &[
            Requirement::Aal2,
            Requirement::PhishingResistant,
            Requirement::Hspd12,
        ],
        Category::IdentityProofing => &[
            Requirement::IdentityProofing,
            Requirement::FacialMatch,
            Requirement::Ialmax,
        ],
    }
}

impl Serialize for ResolvedRequirements {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct View<'a> {
            kind: VectorKind,
            component_values: &'a [&'static ComponentValue],
            vector_of_trust: Option<String>,
            asserted_aal_acr: Option<&'static str>,
            asserted_ial_acr: Option<&'static str>,
            aal2: bool,
            phishing_resistant: bool,
            hspd12: bool,
            identity_proofing: bool,
            facial_match: bool,
            ialmax: bool,
            enhanced_ipp: bool,
            two_pieces_of_fair_evidence: bool,
        }

        View {
            kind: self.kind(),
            component_values: self.component_values(),
            vector_of_trust: self.vector_of_trust(),
            asserted_aal_acr: self.asserted_aal_acr(),
            asserted_ial_acr: self.asserted_ial_acr(),
            aal2: self.aal2(),
            phishing_resistant: self.phishing_resistant(),
            hspd12: self.hspd12(),
            identity_proofing: self.identity_proofing(),
            facial_match: self.facial_match(),
            ialmax: self.ialmax(),
            enhanced_ipp: self.enhanced_ipp(),
            two_pieces_of_fair_evidence: self.two_pieces_of_fair_evidence(),
        }
        .serialize(serializer)
    }
}
