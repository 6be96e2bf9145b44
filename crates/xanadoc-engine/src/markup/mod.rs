//! # Markup Resolution
//!
//! Computes the attributes of every object from the markup rules in scope.
//!
//! A [`Rule`] matches an object by name, by semantic class, by type, or by
//! class and type together, optionally restricted to objects nested inside
//! containers of some class (level scopes). Every matching rule contributes
//! a [`PotentialAttributeValue`] per attribute it sets; containers contribute
//! their content markup as inherited values. The candidates are ordered by
//! [`PotentialAttributeValue::compare_value_priority`] and the head wins.

pub mod levels;
pub mod priority;
pub mod resolve;
pub mod rule;

use std::collections::BTreeMap;

use serde::Serialize;

pub use levels::Nesting;
pub use priority::{AttributeRoute, PotentialAttributeValue, ValueOrigin};
pub use resolve::{MarkupResolver, ResolvedMarkup};
pub use rule::{AttributeDescriptor, InheritanceKind, LevelScope, Rule, RuleMatch, Specificity};

/// Winning value per attribute name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Markup(BTreeMap<String, PotentialAttributeValue>);

impl Markup {
    /// The winning value of `attribute`.
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.0.get(attribute).map(|v| v.attribute_value.as_str())
    }

    /// The full winning candidate of `attribute`.
    pub fn value(&self, attribute: &str) -> Option<&PotentialAttributeValue> {
        self.0.get(attribute)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Attribute names and winning values, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(name, value)| (name.as_str(), value.attribute_value.as_str()))
    }

    pub fn values(&self) -> impl Iterator<Item = &PotentialAttributeValue> {
        self.0.values()
    }

    pub(crate) fn insert(&mut self, value: PotentialAttributeValue) {
        self.0.insert(value.attribute_name.clone(), value);
    }
}
