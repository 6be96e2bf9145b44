//! Candidate attribute values and the order that picks a winner.

use std::cmp::Ordering;

use serde::Serialize;

use crate::pointers::LinkPointer;

use super::rule::{InheritanceKind, Specificity};

/// How a value reached an object, most significant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributeRoute {
    DirectTarget,
    ContentTarget,
    DirectClassAndType,
    ContentClassAndType,
    DirectClass,
    ContentClass,
    DirectType,
    ContentType,
    /// Copied from a container's content markup.
    Inherited,
}

impl AttributeRoute {
    /// Route of a value endowed by a rule matching the object itself.
    pub fn immediate(specificity: Specificity, inheritance: InheritanceKind) -> Self {
        use AttributeRoute::*;
        use InheritanceKind::{Content, Direct};

        match (specificity, inheritance) {
            (Specificity::Named, Direct) => DirectTarget,
            (Specificity::Named, Content) => ContentTarget,
            (Specificity::ClassAndType, Direct) => DirectClassAndType,
            (Specificity::ClassAndType, Content) => ContentClassAndType,
            (Specificity::Class, Direct) => DirectClass,
            (Specificity::Class, Content) => ContentClass,
            (Specificity::Type, Direct) => DirectType,
            (Specificity::Type, Content) => ContentType,
        }
    }

    /// True if values on this route pass on to content.
    pub fn is_heritable(self) -> bool {
        !matches!(
            self,
            AttributeRoute::DirectTarget
                | AttributeRoute::DirectClassAndType
                | AttributeRoute::DirectClass
                | AttributeRoute::DirectType
        )
    }
}

/// The rule link a value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueOrigin {
    pub link: LinkPointer,
    pub index: usize,
    pub depth: usize,
    pub is_default: bool,
    pub level_distance: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PotentialAttributeValue {
    pub attribute_name: String,
    pub attribute_value: String,
    pub attribute_route: AttributeRoute,
    pub is_heritable: bool,
    pub origin: ValueOrigin,
}

impl PotentialAttributeValue {
    pub fn new(
        attribute_name: impl Into<String>,
        attribute_value: impl Into<String>,
        attribute_route: AttributeRoute,
        origin: ValueOrigin,
    ) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            attribute_value: attribute_value.into(),
            attribute_route,
            is_heritable: attribute_route.is_heritable(),
            origin,
        }
    }

    /// The same value arriving at a container's content.
    pub fn inherited(&self) -> Self {
        Self {
            attribute_route: AttributeRoute::Inherited,
            is_heritable: true,
            ..self.clone()
        }
    }

    /// Orders values so the winner sorts first.
    ///
    /// Non-default beats default, then route, then shallower link depth,
    /// then nearer level scope (scoped before unscoped), then later index.
    pub fn compare_value_priority(&self, other: &Self) -> Ordering {
        let level_key = |value: &Self| match value.origin.level_distance {
            Some(distance) => (0, distance),
            None => (1, 0),
        };
        self.origin
            .is_default
            .cmp(&other.origin.is_default)
            .then(self.attribute_route.cmp(&other.attribute_route))
            .then(self.origin.depth.cmp(&other.origin.depth))
            .then(level_key(self).cmp(&level_key(other)))
            .then(other.origin.index.cmp(&self.origin.index))
    }
}

/// Sorts candidate values so the winner comes first.
pub fn sort_by_priority(values: &mut [PotentialAttributeValue]) {
    values.sort_by(|a, b| a.compare_value_priority(b));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn value(name: &str, route: AttributeRoute, index: usize) -> PotentialAttributeValue {
        PotentialAttributeValue::new(
            "color",
            name,
            route,
            ValueOrigin {
                link: LinkPointer::new(name),
                index,
                depth: 0,
                is_default: false,
                level_distance: None,
            },
        )
    }

    fn winner(mut values: Vec<PotentialAttributeValue>) -> String {
        sort_by_priority(&mut values);
        values[0].attribute_value.clone()
    }

    #[test]
    fn route_order_decides_first() {
        let values = vec![
            value("inherited", AttributeRoute::Inherited, 9),
            value("type", AttributeRoute::DirectType, 8),
            value("class-and-type", AttributeRoute::DirectClassAndType, 7),
            value("target", AttributeRoute::DirectTarget, 0),
        ];
        let mut sorted = values.clone();
        sort_by_priority(&mut sorted);
        let order: Vec<&str> = sorted.iter().map(|v| v.attribute_value.as_str()).collect();
        assert_eq!(order, vec!["target", "class-and-type", "type", "inherited"]);
    }

    #[test]
    fn later_index_wins_a_tie() {
        assert_eq!(
            winner(vec![
                value("first", AttributeRoute::DirectTarget, 1),
                value("second", AttributeRoute::DirectTarget, 2),
            ]),
            "second"
        );
    }

    #[test]
    fn non_default_beats_a_more_specific_default() {
        let mut default = value("default", AttributeRoute::DirectTarget, 5);
        default.origin.is_default = true;
        assert_eq!(
            winner(vec![default, value("own", AttributeRoute::ContentType, 0)]),
            "own"
        );
    }

    #[test]
    fn shallower_depth_beats_later_index() {
        let mut inherited_link = value("parent", AttributeRoute::DirectType, 9);
        inherited_link.origin.depth = 1;
        assert_eq!(
            winner(vec![inherited_link, value("own", AttributeRoute::DirectType, 0)]),
            "own"
        );
    }

    #[test]
    fn nearer_level_scope_wins() {
        let mut near = value("near", AttributeRoute::DirectClass, 0);
        near.origin.level_distance = Some(1);
        let mut far = value("far", AttributeRoute::DirectClass, 3);
        far.origin.level_distance = Some(2);
        let unscoped = value("unscoped", AttributeRoute::DirectClass, 4);
        assert_eq!(winner(vec![unscoped, far, near]), "near");
    }

    #[rstest]
    #[case(AttributeRoute::DirectTarget, false)]
    #[case(AttributeRoute::ContentTarget, true)]
    #[case(AttributeRoute::DirectClass, false)]
    #[case(AttributeRoute::ContentClassAndType, true)]
    #[case(AttributeRoute::ContentType, true)]
    #[case(AttributeRoute::Inherited, true)]
    fn heritable_routes(#[case] route: AttributeRoute, #[case] heritable: bool) {
        assert_eq!(route.is_heritable(), heritable);
    }

    #[test]
    fn inherited_copy_keeps_origin() {
        let direct = value("x", AttributeRoute::ContentTarget, 3);
        let inherited = direct.inherited();
        assert_eq!(inherited.attribute_route, AttributeRoute::Inherited);
        assert_eq!(inherited.origin, direct.origin);
    }
}
