//! # Pointer Algebra
//!
//! Immutable value types identifying content ranges or objects. Every higher
//! level operation of the engine (zettel slicing, sequence matching, rule
//! targeting) is expressed in terms of the operations here.
//!
//! - **Clips** ([`Span`], [`Image`]) address content and support interval
//!   operations: `overlaps`, `engulfs`, `abuts`, `merge`, `intersect`,
//!   `nibble`. Operations across different origins are vacuously false.
//! - **Identity pointers** ([`EdlPointer`], [`LinkPointer`]) name parts;
//!   their `nibble` is identity-only.
//! - [`InlinePointer`] carries its text inline and points at nothing.
//!
//! [`Pointer`] closes over all five kinds so every operation is an
//! exhaustive match.

pub mod image;
pub mod leaf;
pub mod span;

use serde::{Deserialize, Serialize};

pub use image::Image;
pub use leaf::{FormatError, Leaf};
pub use span::Span;

use leaf::PointerLeaf;

/// Names an EDL part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "PointerLeaf", into = "PointerLeaf")]
pub struct EdlPointer {
    pub name: String,
}

impl EdlPointer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn hashable_name(&self) -> String {
        format!("edl:{}", self.name)
    }
}

/// Names a link part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "PointerLeaf", into = "PointerLeaf")]
pub struct LinkPointer {
    pub name: String,
}

impl LinkPointer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn hashable_name(&self) -> String {
        format!("link:{}", self.name)
    }
}

/// Text carried inside the pointer itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PointerLeaf", into = "PointerLeaf")]
pub struct InlinePointer {
    pub text: String,
}

impl InlinePointer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn hashable_name(&self) -> String {
        format!("inline:{}", self.text)
    }
}

/// Outcome of consuming a prefix of a pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Nibble<P = Pointer> {
    /// The candidate is not a prefix.
    Miss,
    /// The candidate consumed the pointer entirely.
    Whole,
    /// The candidate consumed a prefix; the suffix remains.
    Partial(P),
}

impl<P> Nibble<P> {
    pub fn nibbled(&self) -> bool {
        !matches!(self, Nibble::Miss)
    }

    pub fn remainder(self) -> Option<P> {
        match self {
            Nibble::Partial(rest) => Some(rest),
            Nibble::Miss | Nibble::Whole => None,
        }
    }

    pub fn map<Q>(self, f: impl FnOnce(P) -> Q) -> Nibble<Q> {
        match self {
            Nibble::Miss => Nibble::Miss,
            Nibble::Whole => Nibble::Whole,
            Nibble::Partial(rest) => Nibble::Partial(f(rest)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKind {
    Span,
    Image,
    Edl,
    Link,
    Inline,
}

impl PointerKind {
    /// Name used in leaf data and in rule `clip type` criteria.
    pub fn name(self) -> &'static str {
        match self {
            PointerKind::Span => "span",
            PointerKind::Image => "image",
            PointerKind::Edl => "edl",
            PointerKind::Link => "link",
            PointerKind::Inline => "inline",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PointerLeaf", into = "PointerLeaf")]
pub enum Pointer {
    Span(Span),
    Image(Image),
    Edl(EdlPointer),
    Link(LinkPointer),
    Inline(InlinePointer),
}

impl Pointer {
    pub fn kind(&self) -> PointerKind {
        match self {
            Pointer::Span(_) => PointerKind::Span,
            Pointer::Image(_) => PointerKind::Image,
            Pointer::Edl(_) => PointerKind::Edl,
            Pointer::Link(_) => PointerKind::Link,
            Pointer::Inline(_) => PointerKind::Inline,
        }
    }

    pub fn is_clip(&self) -> bool {
        matches!(self, Pointer::Span(_) | Pointer::Image(_))
    }

    /// Canonical identity string; equal names denote the same thing.
    pub fn hashable_name(&self) -> String {
        match self {
            Pointer::Span(span) => span.hashable_name(),
            Pointer::Image(image) => image.hashable_name(),
            Pointer::Edl(edl) => edl.hashable_name(),
            Pointer::Link(link) => link.hashable_name(),
            Pointer::Inline(inline) => inline.hashable_name(),
        }
    }

    /// Identity comparison ignoring clip context.
    pub fn denotes_same(&self, other: &Pointer) -> bool {
        match (self, other) {
            (Pointer::Span(a), Pointer::Span(b)) => a.denotes_same(b),
            (Pointer::Image(a), Pointer::Image(b)) => a.denotes_same(b),
            (Pointer::Edl(a), Pointer::Edl(b)) => a.name == b.name,
            (Pointer::Link(a), Pointer::Link(b)) => a.name == b.name,
            (Pointer::Inline(a), Pointer::Inline(b)) => a.text == b.text,
            _ => false,
        }
    }

    pub fn origin(&self) -> Option<&str> {
        match self {
            Pointer::Span(span) => Some(&span.origin),
            Pointer::Image(image) => Some(&image.origin),
            Pointer::Edl(_) | Pointer::Link(_) | Pointer::Inline(_) => None,
        }
    }

    pub fn overlaps(&self, other: &Pointer) -> bool {
        match (self, other) {
            (Pointer::Span(a), Pointer::Span(b)) => a.overlaps(b),
            (Pointer::Image(a), Pointer::Image(b)) => a.overlaps(b),
            _ => false,
        }
    }

    pub fn engulfs(&self, other: &Pointer) -> bool {
        match (self, other) {
            (Pointer::Span(a), Pointer::Span(b)) => a.engulfs(b),
            (Pointer::Image(a), Pointer::Image(b)) => a.engulfs(b),
            _ => false,
        }
    }

    pub fn abuts(&self, other: &Pointer) -> bool {
        match (self, other) {
            (Pointer::Span(a), Pointer::Span(b)) => a.abuts(b),
            (Pointer::Image(a), Pointer::Image(b)) => a.abuts(b),
            _ => false,
        }
    }

    pub fn merge(&self, other: &Pointer) -> Option<Pointer> {
        match (self, other) {
            (Pointer::Span(a), Pointer::Span(b)) => a.merge(b).map(Pointer::Span),
            (Pointer::Image(a), Pointer::Image(b)) => a.merge(b).map(Pointer::Image),
            _ => None,
        }
    }

    pub fn intersect(&self, other: &Pointer) -> Option<Pointer> {
        match (self, other) {
            (Pointer::Span(a), Pointer::Span(b)) => a.intersect(b).map(Pointer::Span),
            (Pointer::Image(a), Pointer::Image(b)) => a.intersect(b).map(Pointer::Image),
            _ => None,
        }
    }

    /// Consumes `candidate` from the front of `self`.
    ///
    /// Clips consume by range; every other kind consumes by identity and
    /// never leaves a remainder.
    pub fn nibble(&self, candidate: &Pointer) -> Nibble {
        match (self, candidate) {
            (Pointer::Span(a), Pointer::Span(b)) => a.nibble(b).map(Pointer::Span),
            (Pointer::Image(a), Pointer::Image(b)) => a.nibble(b).map(Pointer::Image),
            (Pointer::Edl(_), Pointer::Edl(_))
            | (Pointer::Link(_), Pointer::Link(_))
            | (Pointer::Inline(_), Pointer::Inline(_)) => {
                if self.denotes_same(candidate) {
                    Nibble::Whole
                } else {
                    Nibble::Miss
                }
            }
            _ => Nibble::Miss,
        }
    }

    /// True if a link end holding `self` endows its link onto `target`.
    pub fn endows_to(&self, target: &Pointer) -> bool {
        match (self, target) {
            (Pointer::Span(a), Pointer::Span(b)) => a.overlaps(b),
            (Pointer::Image(a), Pointer::Image(b)) => a.overlaps(b),
            (Pointer::Edl(a), Pointer::Edl(b)) => a.name == b.name,
            (Pointer::Link(a), Pointer::Link(b)) => a.name == b.name,
            // inline pointers carry their content and point at nothing
            _ => false,
        }
    }
}

impl From<Span> for Pointer {
    fn from(span: Span) -> Self {
        Pointer::Span(span)
    }
}

impl From<Image> for Pointer {
    fn from(image: Image) -> Self {
        Pointer::Image(image)
    }
}

impl From<EdlPointer> for Pointer {
    fn from(edl: EdlPointer) -> Self {
        Pointer::Edl(edl)
    }
}

impl From<LinkPointer> for Pointer {
    fn from(link: LinkPointer) -> Self {
        Pointer::Link(link)
    }
}

impl From<InlinePointer> for Pointer {
    fn from(inline: InlinePointer) -> Self {
        Pointer::Inline(inline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn edl_nibble_is_identity_only() {
        let foo = Pointer::from(EdlPointer::new("foo"));
        assert_eq!(foo.nibble(&foo.clone()), Nibble::Whole);
        assert!(foo.nibble(&foo.clone()).nibbled());
        assert_eq!(foo.nibble(&foo.clone()).remainder(), None);

        let foo1 = Pointer::from(EdlPointer::new("foo1"));
        let foo2 = Pointer::from(EdlPointer::new("foo2"));
        let missed = foo1.nibble(&foo2);
        assert!(!missed.nibbled());
        assert_eq!(missed.remainder(), None);
    }

    #[test]
    fn span_nibble_through_pointer() {
        let span = Pointer::from(Span::new("x", 1, 10));
        let result = span.nibble(&Span::new("x", 1, 4).into());
        assert!(result.nibbled());
        assert_eq!(result.remainder(), Some(Span::new("x", 5, 6).into()));
    }

    #[test]
    fn nibble_across_kinds_misses() {
        let span = Pointer::from(Span::new("x", 1, 10));
        assert_eq!(span.nibble(&EdlPointer::new("x").into()), Nibble::Miss);
    }

    #[rstest]
    #[case(Span::new("o", 1, 2).into(), "span:o:1:2")]
    #[case(Image::new("o", 1, 2, 3, 4).into(), "image:o:1:2:3:4")]
    #[case(EdlPointer::new("doc").into(), "edl:doc")]
    #[case(LinkPointer::new("l").into(), "link:l")]
    #[case(InlinePointer::new("hi").into(), "inline:hi")]
    fn hashable_names(#[case] pointer: Pointer, #[case] expected: &str) {
        assert_eq!(pointer.hashable_name(), expected);
    }

    #[test]
    fn context_does_not_change_identity() {
        let plain = Pointer::from(Span::new("o", 1, 2));
        let with_context = Pointer::from(Span::new("o", 1, 2).with_context(EdlPointer::new("d")));
        assert!(plain.denotes_same(&with_context));
        assert_eq!(plain.hashable_name(), with_context.hashable_name());
        assert_eq!(plain, with_context);

        let image = Image::new("pic", 0, 0, 2, 2);
        let set: std::collections::HashSet<Pointer> = [
            Pointer::from(image.clone()),
            Pointer::from(image.with_context(EdlPointer::new("d"))),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn endowment_by_kind() {
        let link = Pointer::from(LinkPointer::new("l"));
        assert!(link.endows_to(&LinkPointer::new("l").into()));
        assert!(!link.endows_to(&EdlPointer::new("l").into()));

        let span = Pointer::from(Span::new("o", 0, 5));
        assert!(span.endows_to(&Span::new("o", 4, 5).into()));
        assert!(!span.endows_to(&Span::new("o", 5, 5).into()));

        let inline = Pointer::from(InlinePointer::new("x"));
        assert!(!inline.endows_to(&inline.clone()));
    }

    #[test]
    fn clip_operations_on_identity_pointers_are_vacuous() {
        let edl = Pointer::from(EdlPointer::new("a"));
        assert!(!edl.overlaps(&edl.clone()));
        assert_eq!(edl.intersect(&edl.clone()), None);
        assert_eq!(edl.merge(&edl.clone()), None);
    }
}
