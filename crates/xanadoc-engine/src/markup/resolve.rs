use std::collections::{BTreeMap, HashMap};

use crate::model::{DocumentModel, ObjectId};

use super::Markup;
use super::priority::{AttributeRoute, PotentialAttributeValue, ValueOrigin, sort_by_priority};

/// Winning values for one object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedMarkup {
    pub markup: Markup,
    /// Winners among heritable values only.
    pub content_markup: Markup,
}

impl ResolvedMarkup {
    pub fn from_candidates(candidates: Vec<PotentialAttributeValue>) -> Self {
        let mut by_name: BTreeMap<String, Vec<PotentialAttributeValue>> = BTreeMap::new();
        for candidate in candidates {
            by_name
                .entry(candidate.attribute_name.clone())
                .or_default()
                .push(candidate);
        }

        let mut resolved = ResolvedMarkup::default();
        for mut values in by_name.into_values() {
            sort_by_priority(&mut values);
            if let Some(heritable) = values.iter().find(|v| v.is_heritable) {
                resolved.content_markup.insert(heritable.clone());
            }
            if let Some(winner) = values.into_iter().next() {
                resolved.markup.insert(winner);
            }
        }
        resolved
    }
}

/// Resolves markup for objects of a model, each at most once.
///
/// An object's entry is reserved before its containers are resolved, so a
/// containment cycle sees an empty result instead of recursing forever.
pub struct MarkupResolver<'m> {
    model: &'m DocumentModel,
    resolved: HashMap<ObjectId, ResolvedMarkup>,
}

impl<'m> MarkupResolver<'m> {
    pub fn new(model: &'m DocumentModel) -> Self {
        Self {
            model,
            resolved: HashMap::new(),
        }
    }

    pub fn model(&self) -> &'m DocumentModel {
        self.model
    }

    pub fn resolve(&mut self, object: ObjectId) -> &ResolvedMarkup {
        if !self.resolved.contains_key(&object) {
            self.resolved.insert(object, ResolvedMarkup::default());
            let computed = self.compute(object);
            self.resolved.insert(object, computed);
        }
        &self.resolved[&object]
    }

    pub fn finish(self) -> HashMap<ObjectId, ResolvedMarkup> {
        self.resolved
    }

    fn compute(&mut self, object: ObjectId) -> ResolvedMarkup {
        let mut candidates = self.immediate_values(object);
        for container in self.model.containers(object) {
            let inherited: Vec<PotentialAttributeValue> = self
                .resolve(container)
                .content_markup
                .values()
                .map(PotentialAttributeValue::inherited)
                .collect();
            candidates.extend(inherited);
        }
        ResolvedMarkup::from_candidates(candidates)
    }

    /// Values endowed by rules in scope that match `object` itself.
    pub fn immediate_values(&self, object: ObjectId) -> Vec<PotentialAttributeValue> {
        let scope = self.model.edl(self.model.scope_of(object));
        let mut values = Vec::new();
        for &rule_link in &scope.markup_rules {
            let link = self.model.link(rule_link);
            let Some(rule) = &link.markup_rule else {
                continue;
            };
            let Some(matched) = rule.match_target(self.model, object) else {
                continue;
            };
            for descriptor in &rule.attribute_descriptors {
                values.push(PotentialAttributeValue::new(
                    &descriptor.attribute,
                    &descriptor.value,
                    AttributeRoute::immediate(matched.specificity, descriptor.inheritance),
                    ValueOrigin {
                        link: link.pointer.clone(),
                        index: link.index,
                        depth: link.depth,
                        is_default: link.is_default,
                        level_distance: matched.level_distance,
                    },
                ));
            }
        }
        values
    }
}
