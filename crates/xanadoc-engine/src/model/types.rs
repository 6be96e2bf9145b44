//! Well-known link types and metalink resolution.
//!
//! A link's type is itself a link pointer. The type link's `metalinks` end
//! lists metalinks: links that give meaning to ends of links of that type,
//! either "this end defines a sequence" or "this end endows a semantic
//! class". A metalink's `end` end names the end it applies to; without one
//! it applies to every end.

use std::collections::HashMap;
use std::rc::Rc;

use crate::io::{FetchError, PartFetcher};
use crate::parts::{Edl, Link, LinkEnd, PartContent};
use crate::pointers::{InlinePointer, LinkPointer, Pointer};

pub const MARKUP: &str = "markup";
pub const DEFINES_SEQUENCE: &str = "defines sequence";
pub const DEFINES_SEMANTIC_CLASS: &str = "defines semantic class";
pub const MISSING_EDL: &str = "missing edl";
pub const MISSING_LINK: &str = "missing link";

/// End names used by type links and metalinks.
pub mod ends {
    pub const METALINKS: &str = "metalinks";
    pub const END: &str = "end";
    pub const SEQUENCE_TYPE: &str = "sequence type";
    pub const CLASS: &str = "class";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetalinkKind {
    DefinesSequence { sequence_type: Option<Pointer> },
    DefinesSemanticClass { class: Pointer },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metalink {
    pub pointer: LinkPointer,
    /// End name the metalink applies to; `None` applies to all ends.
    pub end: Option<String>,
    pub kind: MetalinkKind,
}

impl Metalink {
    /// Reads a metalink, or `None` if the link is not a well-formed one.
    pub fn from_link(pointer: &LinkPointer, link: &Link) -> Option<Metalink> {
        let end = match link.end_pointers(ends::END).first() {
            Some(Pointer::Inline(inline)) => Some(inline.text.clone()),
            Some(_) => return None,
            None => None,
        };
        let kind = if link.has_type(DEFINES_SEQUENCE) {
            MetalinkKind::DefinesSequence {
                sequence_type: link.end_pointers(ends::SEQUENCE_TYPE).first().cloned(),
            }
        } else if link.has_type(DEFINES_SEMANTIC_CLASS) {
            MetalinkKind::DefinesSemanticClass {
                class: link.end_pointers(ends::CLASS).first()?.clone(),
            }
        } else {
            return None;
        };
        Some(Metalink {
            pointer: pointer.clone(),
            end,
            kind,
        })
    }

    pub fn applies_to(&self, end: &LinkEnd) -> bool {
        match &self.end {
            Some(name) => end.is_named(name),
            None => true,
        }
    }
}

/// A metalink declaring that `end` of links of some type defines a sequence.
pub fn sequence_metalink(end: Option<&str>, sequence_type: Option<Pointer>) -> Link {
    let mut link = Link::new(LinkPointer::new(DEFINES_SEQUENCE));
    if let Some(end) = end {
        link = link.with_end(Some(ends::END), vec![InlinePointer::new(end).into()]);
    }
    if let Some(sequence_type) = sequence_type {
        link = link.with_end(Some(ends::SEQUENCE_TYPE), vec![sequence_type]);
    }
    link
}

/// A metalink declaring that `end` of links of some type endows `class`.
pub fn class_metalink(end: Option<&str>, class: Pointer) -> Link {
    let mut link = Link::new(LinkPointer::new(DEFINES_SEMANTIC_CLASS));
    if let Some(end) = end {
        link = link.with_end(Some(ends::END), vec![InlinePointer::new(end).into()]);
    }
    link.with_end(Some(ends::CLASS), vec![class])
}

/// A type link carrying the given metalinks.
pub fn type_link(metalinks: &[LinkPointer]) -> Link {
    Link::new(LinkPointer::new("type")).with_end(
        Some(ends::METALINKS),
        metalinks.iter().cloned().map(Pointer::from).collect(),
    )
}

pub(crate) fn missing_edl() -> Edl {
    Edl::new(Some(LinkPointer::new(MISSING_EDL).into()))
}

pub(crate) fn missing_link() -> Link {
    Link::new(LinkPointer::new(MISSING_LINK))
}

/// Resolves link types to their metalinks, once per type per build.
pub struct TypeResolver<'f> {
    fetcher: &'f dyn PartFetcher,
    cache: HashMap<String, Rc<[Metalink]>>,
}

impl<'f> TypeResolver<'f> {
    pub fn new(fetcher: &'f dyn PartFetcher) -> Self {
        Self {
            fetcher,
            cache: HashMap::new(),
        }
    }

    pub fn metalinks(&mut self, link_type: &Pointer) -> Result<Rc<[Metalink]>, FetchError> {
        let Pointer::Link(type_pointer) = link_type else {
            return Ok(Rc::from([]));
        };
        if let Some(cached) = self.cache.get(&type_pointer.name) {
            return Ok(cached.clone());
        }

        let mut metalinks = Vec::new();
        if let Some(type_link) = self.fetch_link(type_pointer)? {
            for pointer in type_link.end_pointers(ends::METALINKS) {
                let Pointer::Link(metalink_pointer) = pointer else {
                    log::warn!(
                        "Type {} lists a non-link metalink {}",
                        type_pointer.name,
                        pointer.hashable_name()
                    );
                    continue;
                };
                let Some(link) = self.fetch_link(metalink_pointer)? else {
                    log::warn!(
                        "Metalink {} of type {} is missing",
                        metalink_pointer.name,
                        type_pointer.name
                    );
                    continue;
                };
                match Metalink::from_link(metalink_pointer, &link) {
                    Some(metalink) => metalinks.push(metalink),
                    None => log::warn!("Skipping malformed metalink {}", metalink_pointer.name),
                }
            }
        }

        let metalinks: Rc<[Metalink]> = metalinks.into();
        self.cache.insert(type_pointer.name.clone(), metalinks.clone());
        Ok(metalinks)
    }

    fn fetch_link(&self, pointer: &LinkPointer) -> Result<Option<Link>, FetchError> {
        Ok(self
            .fetcher
            .get_part(&pointer.clone().into())?
            .and_then(|part| match part.content {
                PartContent::Link(link) => Some(link),
                _ => None,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryCache;
    use pretty_assertions::assert_eq;

    fn cache_with_paragraph_type() -> MemoryCache {
        let mut cache = MemoryCache::new();
        let metalinks = [LinkPointer::new("m-seq"), LinkPointer::new("m-class")];
        cache
            .insert_link("paragraph", type_link(&metalinks))
            .unwrap();
        cache
            .insert_link("m-seq", sequence_metalink(Some("text"), None))
            .unwrap();
        cache
            .insert_link("m-class", class_metalink(None, LinkPointer::new("block").into()))
            .unwrap();
        cache
    }

    #[test]
    fn resolves_metalinks_of_a_type() {
        let cache = cache_with_paragraph_type();
        let mut resolver = TypeResolver::new(&cache);

        let metalinks = resolver.metalinks(&LinkPointer::new("paragraph").into()).unwrap();

        assert_eq!(
            metalinks.to_vec(),
            vec![
                Metalink {
                    pointer: LinkPointer::new("m-seq"),
                    end: Some("text".to_string()),
                    kind: MetalinkKind::DefinesSequence { sequence_type: None },
                },
                Metalink {
                    pointer: LinkPointer::new("m-class"),
                    end: None,
                    kind: MetalinkKind::DefinesSemanticClass {
                        class: LinkPointer::new("block").into()
                    },
                },
            ]
        );
    }

    #[test]
    fn unknown_type_has_no_metalinks() {
        let cache = MemoryCache::new();
        let mut resolver = TypeResolver::new(&cache);
        assert!(resolver.metalinks(&LinkPointer::new("nope").into()).unwrap().is_empty());
    }

    #[test]
    fn malformed_metalinks_are_skipped() {
        let mut cache = MemoryCache::new();
        cache
            .insert_link("t", type_link(&[LinkPointer::new("bad"), LinkPointer::new("gone")]))
            .unwrap();
        // A class metalink without a class end
        cache
            .insert_link("bad", Link::new(LinkPointer::new(DEFINES_SEMANTIC_CLASS)))
            .unwrap();
        let mut resolver = TypeResolver::new(&cache);

        assert!(resolver.metalinks(&LinkPointer::new("t").into()).unwrap().is_empty());
    }

    #[test]
    fn metalink_end_filter() {
        let metalink = Metalink::from_link(
            &LinkPointer::new("m"),
            &sequence_metalink(Some("text"), None),
        )
        .unwrap();
        assert!(metalink.applies_to(&LinkEnd::new(Some("text"), vec![])));
        assert!(!metalink.applies_to(&LinkEnd::new(Some("title"), vec![])));
        assert!(!metalink.applies_to(&LinkEnd::new(None, vec![])));
    }
}
