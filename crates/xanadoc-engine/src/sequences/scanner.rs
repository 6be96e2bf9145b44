use std::collections::HashSet;

use crate::model::{DocumentModel, EdlId, SequenceId};
use crate::pointers::Pointer;

use super::{SequenceBuilder, SequencePrototype, StreamItem};

/// Finds every sequence of one EDL.
///
/// Prototypes whose endset names links that themselves define sequences
/// wait until those links have produced one, so outer sequences can take
/// inner ones as members. Scanning stops once a pass has nothing ready.
pub struct SequenceScanner {
    edl: EdlId,
}

impl SequenceScanner {
    pub fn new(edl: EdlId) -> Self {
        Self { edl }
    }

    pub fn scan(&self, model: &mut DocumentModel) -> Vec<SequenceId> {
        let stream = StreamItem::stream(model, self.edl);
        let mut pending = self.prototypes(model);
        let mut produced: HashSet<String> = HashSet::new();
        let mut found: Vec<SequenceId> = Vec::new();
        let mut pass = 0;

        while !pending.is_empty() {
            let (ready, blocked): (Vec<_>, Vec<_>) = pending.into_iter().partition(|prototype| {
                self.dependencies(model, prototype)
                    .iter()
                    .all(|name| produced.contains(name))
            });
            if ready.is_empty() {
                for prototype in &blocked {
                    log::warn!(
                        "Prototype for end {} of link {} waits on links with no sequence",
                        prototype.end,
                        prototype.defining_link.name
                    );
                }
                break;
            }

            pass += 1;
            let before = found.len();
            for prototype in ready {
                let name = prototype.defining_link.name.clone();
                let completed = SequenceBuilder::new(model, prototype).run(&stream, &found);
                for cursor in completed {
                    found.push(cursor.push_sequence(model, self.edl));
                    produced.insert(name.clone());
                }
            }
            log::debug!(
                "Sequence pass {pass} over EDL {}: {} new",
                model.edl(self.edl).key,
                found.len() - before
            );
            pending = blocked;
        }
        found
    }

    /// Prototypes declared by the EDL's links, each signature once.
    fn prototypes(&self, model: &DocumentModel) -> Vec<SequencePrototype> {
        let mut seen = HashSet::new();
        let mut prototypes = Vec::new();
        for &link_id in &model.edl(self.edl).links {
            let link = model.link(link_id);
            for prototype in link.sequence_prototypes.iter().flatten() {
                let has_endset = link
                    .link
                    .ends
                    .get(prototype.end)
                    .is_some_and(|end| !end.pointers.is_empty());
                if has_endset && seen.insert(prototype.signature.clone()) {
                    prototypes.push(prototype.clone());
                }
            }
        }
        prototypes
    }

    /// Names of in-scope links the prototype's endset refers to that can
    /// produce sequences themselves.
    fn dependencies(&self, model: &DocumentModel, prototype: &SequencePrototype) -> Vec<String> {
        let edl = model.edl(self.edl);
        let endset = &model.link(prototype.link).link.ends[prototype.end].pointers;
        endset
            .iter()
            .filter_map(|pointer| match pointer {
                Pointer::Link(link) => edl.link_named(link),
                _ => None,
            })
            .filter(|&id| model.link(id).sequence_prototypes.iter().any(|p| !p.is_empty()))
            .map(|id| model.link(id).pointer.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::io::MemoryCache;
    use crate::model::types::{sequence_metalink, type_link};
    use crate::model::{ContentId, Defaults, DocumentModel, DocumentModelBuilder};
    use crate::parts::{Edl, Link};
    use crate::pointers::{EdlPointer, LinkPointer, Pointer, Span};
    use crate::sequences::SequenceMember;
    use pretty_assertions::assert_eq;

    /// A `group` type whose `items` end defines a sequence.
    fn cache_with_group() -> MemoryCache {
        let mut cache = MemoryCache::new();
        cache.insert_text("x", "abcdefg").unwrap();
        cache.insert_link("group", type_link(&[LinkPointer::new("group-seq")])).unwrap();
        cache
            .insert_link("group-seq", sequence_metalink(Some("items"), None))
            .unwrap();
        cache
    }

    fn group(items: Vec<Pointer>) -> Link {
        Link::new(LinkPointer::new("group")).with_end(Some("items"), items)
    }

    fn build(cache: &mut MemoryCache, links: &[&str]) -> DocumentModel {
        let mut edl = Edl::new(None).with_clip(Span::new("x", 0, 7));
        for name in links {
            edl = edl.with_link(LinkPointer::new(*name));
        }
        cache.insert_edl("doc", edl).unwrap();
        DocumentModelBuilder::new(&*cache, &Defaults::none())
            .build(&EdlPointer::new("doc"))
            .unwrap()
    }

    #[test]
    fn mutually_dependent_prototypes_are_never_attempted() {
        let mut cache = cache_with_group();
        cache
            .insert_link("a", group(vec![LinkPointer::new("b").into()]))
            .unwrap();
        cache
            .insert_link("b", group(vec![LinkPointer::new("a").into()]))
            .unwrap();

        let model = build(&mut cache, &["a", "b"]);

        assert_eq!(model.sequence_ids().count(), 0);
    }

    #[test]
    fn prototype_waits_on_a_link_that_never_produces() {
        let mut cache = cache_with_group();
        cache
            .insert_link("inner", group(vec![Span::new("elsewhere", 0, 3).into()]))
            .unwrap();
        cache
            .insert_link("outer", group(vec![LinkPointer::new("inner").into()]))
            .unwrap();

        let model = build(&mut cache, &["outer", "inner"]);

        assert_eq!(model.sequence_ids().count(), 0);
    }

    #[test]
    fn outer_link_declared_first_still_nests_inner_sequence() {
        let mut cache = cache_with_group();
        cache
            .insert_link("inner", group(vec![Span::new("x", 0, 7).into()]))
            .unwrap();
        cache
            .insert_link("outer", group(vec![LinkPointer::new("inner").into()]))
            .unwrap();

        let model = build(&mut cache, &["outer", "inner"]);

        let roots: Vec<_> = model.root_sequences(model.root()).collect();
        assert_eq!(roots.len(), 1);
        let outer = model.sequence(roots[0]);
        assert_eq!(model.link(outer.defining_link).pointer.name, "outer");
        let [SequenceMember::Sequence(inner)] = &outer.members[..] else {
            panic!("expected one nested sequence, got {:?}", outer.members);
        };
        assert!(model.sequence(*inner).is_subordinated);
    }

    #[test]
    fn empty_endset_yields_no_sequence() {
        let mut cache = cache_with_group();
        cache.insert_link("hollow", group(vec![])).unwrap();

        let model = build(&mut cache, &["hollow"]);

        assert_eq!(model.sequence_ids().count(), 0);
    }

    #[test]
    fn every_end_under_an_unfiltered_metalink_is_scanned() {
        // Given a link whose two ends both define sequences
        let mut cache = MemoryCache::new();
        cache.insert_link("pair", type_link(&[LinkPointer::new("m")])).unwrap();
        cache.insert_link("m", sequence_metalink(None, None)).unwrap();
        cache
            .insert_link(
                "p",
                Link::new(LinkPointer::new("pair"))
                    .with_end(Some("a"), vec![Span::new("1", 0, 3).into()])
                    .with_end(Some("b"), vec![Span::new("2", 0, 3).into()]),
            )
            .unwrap();
        cache
            .insert_edl(
                "doc",
                Edl::new(None)
                    .with_clip(Span::new("1", 0, 3))
                    .with_clip(Span::new("2", 0, 3))
                    .with_link(LinkPointer::new("p")),
            )
            .unwrap();

        let model = DocumentModelBuilder::new(&cache, &Defaults::none())
            .build(&EdlPointer::new("doc"))
            .unwrap();

        // Then each end yields its own sequence over its own zettel
        let zettel: Vec<_> = model.zettel_of(model.root()).collect();
        let found: Vec<(usize, Vec<SequenceMember>)> = model
            .sequence_ids()
            .map(|id| (model.sequence(id).end, model.sequence(id).members.clone()))
            .collect();
        assert_eq!(
            found,
            vec![
                (0, vec![SequenceMember::Content(ContentId::Zettel(zettel[0]))]),
                (1, vec![SequenceMember::Content(ContentId::Zettel(zettel[1]))]),
            ]
        );
    }
}
