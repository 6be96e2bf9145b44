use std::rc::Rc;

use crate::model::{ContentId, DocumentModel, EdlId, SequenceId};
use crate::pointers::{LinkPointer, Pointer};

use super::{SequenceBuildingCursor, SequencePrototype, Signature};

/// An item of an EDL's content stream as seen by the sequence engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamItem {
    pub content: ContentId,
    pub pointer: Pointer,
    /// Signatures of every prototype whose end covers the item.
    pub signatures: Vec<Signature>,
}

impl StreamItem {
    /// The content stream of `edl`, zettel and child EDLs in order.
    pub fn stream(model: &DocumentModel, edl: EdlId) -> Vec<StreamItem> {
        model
            .edl(edl)
            .content
            .iter()
            .map(|&content| StreamItem {
                content,
                pointer: model.content_pointer(content),
                signatures: model.signatures_of(model.content_incoming(content)),
            })
            .collect()
    }
}

/// Runs one prototype over a content stream.
pub struct SequenceBuilder<'m> {
    model: &'m DocumentModel,
    prototype: Rc<SequencePrototype>,
    endset: Rc<[Pointer]>,
}

impl<'m> SequenceBuilder<'m> {
    pub fn new(model: &'m DocumentModel, prototype: SequencePrototype) -> Self {
        let endset: Rc<[Pointer]> = model
            .link(prototype.link)
            .link
            .ends
            .get(prototype.end)
            .map(|end| end.pointers.as_slice())
            .unwrap_or_default()
            .into();
        Self {
            model,
            prototype: Rc::new(prototype),
            endset,
        }
    }

    /// Walks `stream` and returns every cursor that completed.
    ///
    /// A cursor waiting for a link's sequence is forked once per sequence in
    /// `candidates` that the link defined and that starts at the current item.
    pub fn run(
        &self,
        stream: &[StreamItem],
        candidates: &[SequenceId],
    ) -> Vec<SequenceBuildingCursor> {
        if self.endset.is_empty() {
            return Vec::new();
        }
        let mut live: Vec<SequenceBuildingCursor> = Vec::new();
        let mut completed = Vec::new();

        for item in stream {
            live.push(SequenceBuildingCursor::new(
                self.prototype.clone(),
                self.endset.clone(),
            ));

            let mut advanced = Vec::with_capacity(live.len());
            for mut cursor in live.drain(..) {
                match cursor.stalled_on_link().cloned() {
                    Some(link) => {
                        for &candidate in candidates {
                            if !self.starts_at(candidate, &link, item.content) {
                                continue;
                            }
                            let mut fork = cursor.clone();
                            if fork.consume_sequence(self.model, candidate)
                                && fork.consume_zettel(self.model, item)
                            {
                                advanced.push(fork);
                            }
                        }
                    }
                    None => {
                        if cursor.consume_zettel(self.model, item) {
                            advanced.push(cursor);
                        }
                    }
                }
            }

            for cursor in advanced {
                if cursor.is_complete() {
                    completed.push(cursor);
                } else {
                    live.push(cursor);
                }
            }
        }
        completed
    }

    fn starts_at(&self, candidate: SequenceId, link: &LinkPointer, content: ContentId) -> bool {
        let sequence = self.model.sequence(candidate);
        sequence.signature.defining_link == *link
            && self.model.sequence_leaves(candidate).first() == Some(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryCache;
    use crate::model::types::{sequence_metalink, type_link};
    use crate::model::{Defaults, DocumentModelBuilder, LinkId};
    use crate::parts::{Edl, Link};
    use crate::pointers::{EdlPointer, Span};
    use crate::sequences::SequenceMember;
    use pretty_assertions::assert_eq;

    /// Link `i` defines two sequences from the same zettel: end `a` over
    /// x:0..3 and end `b` over x:0..7. Link `outer` groups `i`, and link
    /// `hollow` has an empty endset.
    fn model() -> DocumentModel {
        let mut cache = MemoryCache::new();
        cache.insert_text("x", "abcdefg").unwrap();
        cache.insert_link("pair", type_link(&[LinkPointer::new("pair-seq")])).unwrap();
        cache.insert_link("pair-seq", sequence_metalink(None, None)).unwrap();
        cache.insert_link("group", type_link(&[LinkPointer::new("group-seq")])).unwrap();
        cache
            .insert_link("group-seq", sequence_metalink(Some("items"), None))
            .unwrap();
        cache
            .insert_link(
                "i",
                Link::new(LinkPointer::new("pair"))
                    .with_end(Some("a"), vec![Span::new("x", 0, 3).into()])
                    .with_end(Some("b"), vec![Span::new("x", 0, 7).into()]),
            )
            .unwrap();
        cache
            .insert_link(
                "outer",
                Link::new(LinkPointer::new("group"))
                    .with_end(Some("items"), vec![LinkPointer::new("i").into()]),
            )
            .unwrap();
        cache
            .insert_link(
                "hollow",
                Link::new(LinkPointer::new("group")).with_end(Some("items"), vec![]),
            )
            .unwrap();
        cache
            .insert_edl(
                "doc",
                Edl::new(None)
                    .with_clip(Span::new("x", 0, 7))
                    .with_link(LinkPointer::new("i"))
                    .with_link(LinkPointer::new("outer"))
                    .with_link(LinkPointer::new("hollow")),
            )
            .unwrap();
        DocumentModelBuilder::new(&cache, &Defaults::none())
            .build(&EdlPointer::new("doc"))
            .unwrap()
    }

    fn link_named(model: &DocumentModel, name: &str) -> LinkId {
        model
            .root_edl()
            .link_named(&LinkPointer::new(name))
            .unwrap()
    }

    fn prototype_of(model: &DocumentModel, name: &str) -> SequencePrototype {
        model.link(link_named(model, name)).sequence_prototypes[0][0].clone()
    }

    fn sequences_of(model: &DocumentModel, name: &str) -> Vec<SequenceId> {
        let link = link_named(model, name);
        model
            .sequence_ids()
            .filter(|&id| model.sequence(id).defining_link == link)
            .collect()
    }

    #[test]
    fn stalled_cursor_forks_once_per_candidate() {
        let model = model();
        let stream = StreamItem::stream(&model, model.root());
        let candidates = sequences_of(&model, "i");
        assert_eq!(candidates.len(), 2);

        let completed = SequenceBuilder::new(&model, prototype_of(&model, "outer"))
            .run(&stream, &candidates);

        let mut nested: Vec<Vec<SequenceMember>> =
            completed.iter().map(SequenceBuildingCursor::members).collect();
        nested.sort_by_key(|members| format!("{members:?}"));
        let mut expected: Vec<Vec<SequenceMember>> = candidates
            .iter()
            .map(|&id| vec![SequenceMember::Sequence(id)])
            .collect();
        expected.sort_by_key(|members| format!("{members:?}"));
        assert_eq!(nested, expected);
    }

    #[test]
    fn stalled_cursor_without_candidates_dies() {
        let model = model();
        let stream = StreamItem::stream(&model, model.root());

        let completed =
            SequenceBuilder::new(&model, prototype_of(&model, "outer")).run(&stream, &[]);

        assert!(completed.is_empty());
    }

    #[test]
    fn empty_endset_completes_nothing() {
        let model = model();
        let stream = StreamItem::stream(&model, model.root());
        let candidates: Vec<_> = model.sequence_ids().collect();

        let completed = SequenceBuilder::new(&model, prototype_of(&model, "hollow"))
            .run(&stream, &candidates);

        assert!(completed.is_empty());
        assert!(sequences_of(&model, "hollow").is_empty());
    }

    #[test]
    fn full_build_nests_both_candidates() {
        let model = model();

        let outer = sequences_of(&model, "outer");
        assert_eq!(outer.len(), 2);
        for id in sequences_of(&model, "i") {
            assert!(model.sequence(id).is_subordinated);
        }
    }
}
