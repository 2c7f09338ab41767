//! Authentication context resolution.
//!
//! Requests carry either a list of vectors of trust (`vtr`) or legacy ACR
//! values. Both are mapped onto the same component catalog and resolved into a
//! [`ResolvedRequirements`] that downstream code asks yes/no questions of.

pub mod acr;
pub mod component;
pub mod error;
pub mod parser;
pub mod policy;
pub mod privileges;
pub mod requirements;
pub mod resolver;
pub mod selector;
pub mod vector;

pub use component::{Category, ComponentValue, Requirement};
pub use error::{Error, ParseError};
pub use policy::{AalLevel, IalLevel, PolicyConfig, RequesterState, ServiceProviderPolicy};
pub use privileges::authorize;
pub use requirements::ResolvedRequirements;
pub use resolver::{resolve, AuthnRequest, RequirementsResolver};
pub use vector::{Vector, VectorKind};
