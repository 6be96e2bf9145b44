//! Markup rules read from links of type `markup`.

use crate::model::{DocumentModel, ObjectId};
use crate::parts::Link;
use crate::pointers::{InlinePointer, Pointer};

use super::levels::nesting;

/// End names of a markup link.
pub mod ends {
    pub const TARGET: &str = "target";
    pub const CLASS: &str = "class";
    pub const LINK_TYPE: &str = "link type";
    pub const CLIP_TYPE: &str = "clip type";
    pub const EDL_TYPE: &str = "edl type";
    pub const LEVEL: &str = "level";
    pub const ATTRIBUTE: &str = "attribute";
}

/// Whether an attribute applies to the target only or also to its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InheritanceKind {
    Direct,
    Content,
}

impl InheritanceKind {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "direct" => Some(InheritanceKind::Direct),
            "content" => Some(InheritanceKind::Content),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub attribute: String,
    pub value: String,
    pub inheritance: InheritanceKind,
}

/// Requires a target to sit inside at least `depth` containers of `class`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelScope {
    pub class: Pointer,
    pub depth: usize,
}

/// How specifically a rule matched, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Specificity {
    Named,
    ClassAndType,
    Class,
    Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch {
    pub specificity: Specificity,
    /// Distance to the nearest scoping container, for scoped rules.
    pub level_distance: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rule {
    pub named_targets: Vec<Pointer>,
    pub classes: Vec<Pointer>,
    pub link_types: Vec<Pointer>,
    /// Pointer kind names (`span`, `image`, ...) of matching zettel.
    pub clip_types: Vec<String>,
    pub edl_types: Vec<Pointer>,
    pub levels: Vec<LevelScope>,
    pub attribute_descriptors: Vec<AttributeDescriptor>,
}

impl Rule {
    pub fn from_link(link: &Link) -> Rule {
        let pointers = |name: &str| -> Vec<Pointer> {
            link.ends_named(name)
                .flat_map(|end| end.pointers.iter().cloned())
                .collect()
        };

        let mut levels: Vec<LevelScope> = Vec::new();
        for class in pointers(ends::LEVEL) {
            match levels.iter_mut().find(|scope| scope.class.denotes_same(&class)) {
                Some(scope) => scope.depth += 1,
                None => levels.push(LevelScope { class, depth: 1 }),
            }
        }

        let clip_types = pointers(ends::CLIP_TYPE)
            .into_iter()
            .filter_map(|pointer| match pointer {
                Pointer::Inline(inline) => Some(inline.text),
                other => {
                    log::warn!("Ignoring non-inline clip type {}", other.hashable_name());
                    None
                }
            })
            .collect();

        let attribute_descriptors = link
            .ends_named(ends::ATTRIBUTE)
            .filter_map(|end| {
                let descriptor = attribute_descriptor(&end.pointers);
                if descriptor.is_none() {
                    log::warn!("Ignoring malformed attribute end in markup link");
                }
                descriptor
            })
            .collect();

        Rule {
            named_targets: pointers(ends::TARGET),
            classes: pointers(ends::CLASS),
            link_types: pointers(ends::LINK_TYPE),
            clip_types,
            edl_types: pointers(ends::EDL_TYPE),
            levels,
            attribute_descriptors,
        }
    }

    pub fn has_type_criteria(&self) -> bool {
        !self.link_types.is_empty() || !self.clip_types.is_empty() || !self.edl_types.is_empty()
    }

    /// Matches the rule against an object, `None` if it does not apply.
    pub fn match_target(&self, model: &DocumentModel, target: ObjectId) -> Option<RuleMatch> {
        let specificity = self.specificity(model, target)?;
        let level_distance = self.level_distance(model, target)?;
        Some(RuleMatch {
            specificity,
            level_distance,
        })
    }

    fn specificity(&self, model: &DocumentModel, target: ObjectId) -> Option<Specificity> {
        let pointer = model.object_pointer(target);
        if self.named_targets.iter().any(|named| named.endows_to(&pointer)) {
            return Some(Specificity::Named);
        }

        let type_match = self.has_type_criteria() && self.matches_type(model, target);
        if !self.classes.is_empty() {
            let classes = model.semantic_classes(target);
            let class_match = self
                .classes
                .iter()
                .any(|wanted| classes.iter().any(|class| class.denotes_same(wanted)));
            match (class_match, self.has_type_criteria(), type_match) {
                (false, _, _) => None,
                (true, false, _) => Some(Specificity::Class),
                (true, true, true) => Some(Specificity::ClassAndType),
                (true, true, false) => None,
            }
        } else if type_match {
            Some(Specificity::Type)
        } else {
            None
        }
    }

    fn matches_type(&self, model: &DocumentModel, target: ObjectId) -> bool {
        let any_same = |wanted: &[Pointer], actual: Option<&Pointer>| {
            actual.is_some_and(|actual| wanted.iter().any(|w| w.denotes_same(actual)))
        };
        match target {
            ObjectId::Edl(id) => any_same(&self.edl_types, model.edl(id).edl_type()),
            ObjectId::Link(id) => any_same(&self.link_types, Some(&model.link(id).link.link_type)),
            ObjectId::Zettel(id) => {
                let kind = model.zettel(id).pointer.kind().name();
                self.clip_types.iter().any(|clip_type| clip_type == kind)
            }
            ObjectId::Sequence(id) => {
                let sequence = model.sequence(id);
                let sequence_type = sequence
                    .sequence_type
                    .as_ref()
                    .unwrap_or(&model.link(sequence.defining_link).link.link_type);
                any_same(&self.link_types, Some(sequence_type))
            }
        }
    }

    /// `Some(None)` for unscoped rules, `Some(Some(d))` for satisfied level
    /// scopes, `None` if any scope is unmet.
    fn level_distance(&self, model: &DocumentModel, target: ObjectId) -> Option<Option<usize>> {
        let mut distance: Option<usize> = None;
        for scope in &self.levels {
            let found = nesting(model, target, &scope.class)?;
            if found.depth < scope.depth {
                return None;
            }
            distance = Some(distance.map_or(found.distance, |d| d.min(found.distance)));
        }
        Some(distance)
    }
}

fn attribute_descriptor(pointers: &[Pointer]) -> Option<AttributeDescriptor> {
    let text = |pointer: &Pointer| match pointer {
        Pointer::Inline(inline) => Some(inline.text.clone()),
        _ => None,
    };
    let attribute = text(pointers.first()?)?;
    let value = match pointers.get(1)? {
        Pointer::Inline(inline) => inline.text.clone(),
        other => other.hashable_name(),
    };
    let inheritance = match pointers.get(2) {
        Some(pointer) => InheritanceKind::parse(&text(pointer)?)?,
        None => InheritanceKind::Direct,
    };
    Some(AttributeDescriptor {
        attribute,
        value,
        inheritance,
    })
}

/// The three pointers of an `attribute` end.
pub fn attribute_end(attribute: &str, value: &str, inheritance: InheritanceKind) -> Vec<Pointer> {
    let inheritance = match inheritance {
        InheritanceKind::Direct => "direct",
        InheritanceKind::Content => "content",
    };
    vec![
        InlinePointer::new(attribute).into(),
        InlinePointer::new(value).into(),
        InlinePointer::new(inheritance).into(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::MARKUP;
    use crate::pointers::{LinkPointer, Span};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn markup_link() -> Link {
        Link::new(LinkPointer::new(MARKUP))
    }

    #[test]
    fn reads_every_criterion() {
        let link = markup_link()
            .with_end(Some(ends::TARGET), vec![Span::new("o", 0, 3).into()])
            .with_end(Some(ends::CLASS), vec![LinkPointer::new("heading").into()])
            .with_end(Some(ends::LINK_TYPE), vec![LinkPointer::new("paragraph").into()])
            .with_end(Some(ends::CLIP_TYPE), vec![InlinePointer::new("span").into()])
            .with_end(Some(ends::EDL_TYPE), vec![LinkPointer::new("article").into()])
            .with_end(
                Some(ends::ATTRIBUTE),
                attribute_end("bold", "true", InheritanceKind::Content),
            );

        let rule = Rule::from_link(&link);

        assert_eq!(rule.named_targets, vec![Pointer::from(Span::new("o", 0, 3))]);
        assert_eq!(rule.classes, vec![Pointer::from(LinkPointer::new("heading"))]);
        assert_eq!(rule.clip_types, vec!["span".to_string()]);
        assert!(rule.has_type_criteria());
        assert_eq!(
            rule.attribute_descriptors,
            vec![AttributeDescriptor {
                attribute: "bold".to_string(),
                value: "true".to_string(),
                inheritance: InheritanceKind::Content,
            }]
        );
    }

    #[test]
    fn repeated_level_class_raises_required_depth() {
        let list = Pointer::from(LinkPointer::new("list"));
        let link = markup_link().with_end(Some(ends::LEVEL), vec![list.clone(), list.clone()]);
        assert_eq!(
            Rule::from_link(&link).levels,
            vec![LevelScope {
                class: list,
                depth: 2
            }]
        );
    }

    #[rstest]
    #[case::two_pointers_default_to_direct(
        vec![InlinePointer::new("a").into(), InlinePointer::new("1").into()],
        Some(InheritanceKind::Direct)
    )]
    #[case::explicit_content(
        attribute_end("a", "1", InheritanceKind::Content),
        Some(InheritanceKind::Content)
    )]
    #[case::unknown_inheritance(
        vec![
            InlinePointer::new("a").into(),
            InlinePointer::new("1").into(),
            InlinePointer::new("sideways").into()
        ],
        None
    )]
    #[case::missing_value(vec![InlinePointer::new("a").into()], None)]
    fn attribute_end_parsing(
        #[case] pointers: Vec<Pointer>,
        #[case] expected: Option<InheritanceKind>,
    ) {
        assert_eq!(
            attribute_descriptor(&pointers).map(|d| d.inheritance),
            expected
        );
    }
}
