use serde::Serialize;

use super::component::{Category, ComponentValue, Requirement};

/// Where a vector came from; decides how it is rendered back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorKind {
    Vot,
    Acr,
}

impl VectorKind {
    const fn delimiter(self) -> &'static str {
        match self {
            Self::Vot => ".",
            Self::Acr => " ",
        }
    }
}

/// Ordered, deduplicated set of component values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Vector {
    kind: VectorKind,
    component_values: Vec<&'static ComponentValue>,
}

impl Vector {
    #[must_use]
    pub fn new(kind: VectorKind, component_values: Vec<&'static ComponentValue>) -> Self {
        let mut deduped: Vec<&'static ComponentValue> = Vec::with_capacity(component_values.len());
        for component in component_values {
            if !deduped.iter().any(|existing| existing.name == component.name) {
                deduped.push(component);
            }
        }
        Self {
            kind,
            component_values: deduped,
        }
    }

    #[must_use]
    pub fn kind(&self) -> VectorKind {
        self.kind
    }

    #[must_use]
    pub fn component_values(&self) -> &[&'static ComponentValue] {
        &self.component_values
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.component_values.is_empty()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.component_values
            .iter()
            .any(|component| component.name == name)
    }

    #[must_use]
    pub fn has_category(&self, category: Category) -> bool {
        self.component_values
            .iter()
            .any(|component| component.category == category)
    }

    #[must_use]
    pub fn requires(&self, requirement: Requirement) -> bool {
        self.component_values
            .iter()
            .any(|component| component.requires(requirement))
    }

    /// Component names joined with the delimiter of the vector kind.
    #[must_use]
    pub fn expanded(&self) -> String {
        self.component_values
            .iter()
            .map(|component| component.name)
            .collect::<Vec<_>>()
            .join(self.kind.delimiter())
    }

    /// Replace the component named `name` in place, keeping its position.
    #[must_use]
    pub(crate) fn replacing(mut self, name: &str, with: &'static ComponentValue) -> Self {
        if let Some(slot) = self
            .component_values
            .iter_mut()
            .find(|component| component.name == name)
        {
            *slot = with;
        }
        Self::new(self.kind, self.component_values)
    }

    #[must_use]
    pub(crate) fn with(mut self, component: &'static ComponentValue) -> Self {
        self.component_values.push(component);
        Self::new(self.kind, self.component_values)
    }
}

impl std::fmt::Display for Vector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.expanded())
    }
}
