//! Insertion-ordered feature registry.

use crate::error::{ExtrasError, ExtrasResult};
use crate::features::Feature;

/// Every feature the engine drives, in fan-out order.
///
/// Built once and never resized; only the features' own state changes.
pub struct Registry {
    features: Vec<Box<dyn Feature>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.identifiers()).finish()
    }
}

impl Registry {
    /// Fails if two features share an identifier.
    pub fn new(features: Vec<Box<dyn Feature>>) -> ExtrasResult<Self> {
        for (i, feature) in features.iter().enumerate() {
            let id = feature.identifier();
            if features[..i].iter().any(|f| f.identifier() == id) {
                return Err(ExtrasError::DuplicateFeature(id.to_string()));
            }
        }
        Ok(Self { features })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.get(identifier).is_some()
    }

    pub fn get(&self, identifier: &str) -> Option<&dyn Feature> {
        self.features
            .iter()
            .find(|f| f.identifier() == identifier)
            .map(|f| f.as_ref())
    }

    pub fn get_mut(&mut self, identifier: &str) -> Option<&mut (dyn Feature + 'static)> {
        self.features
            .iter_mut()
            .find(|f| f.identifier() == identifier)
            .map(|f| f.as_mut())
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.features.iter().map(|f| f.identifier())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Feature> {
        self.features.iter().map(|f| f.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Feature>> {
        self.features.iter_mut()
    }
}
