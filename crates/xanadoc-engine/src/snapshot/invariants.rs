use crate::model::{ContentId, DocumentModel};
use crate::pointers::Pointer;
use crate::sequences::SequenceMember;

/// Panics if the model breaks a structural invariant.
pub fn check(model: &DocumentModel) {
    for edl_id in model.edl_ids() {
        let edl = model.edl(edl_id);
        if let Some(parent) = edl.parent {
            let parent_key = &model.edl(parent).key;
            assert!(
                edl.key.starts_with(&format!("{parent_key}:")),
                "EDL key {} not under parent key {parent_key}",
                edl.key
            );
        }
        for &link in &edl.links {
            let entry = model.link(link);
            assert_eq!(entry.edl, edl_id, "link {} in a foreign scope", entry.key);
        }

        for (clip_index, clip) in edl.edl.clips.iter().enumerate() {
            let Pointer::Span(clip) = clip else {
                continue;
            };
            let mut cursor = clip.start;
            for zettel in model.zettel_of(edl_id).map(|id| model.zettel(id)) {
                if zettel.clip_index != clip_index {
                    continue;
                }
                let Pointer::Span(span) = &zettel.pointer else {
                    panic!("zettel {} of span clip is not a span", zettel.key);
                };
                assert_eq!(span.start, cursor, "gap or overlap before zettel {}", zettel.key);
                assert!(!span.is_empty(), "empty zettel {}", zettel.key);
                cursor = span.end();
            }
            if !clip.is_empty() {
                assert_eq!(cursor, clip.end(), "clip {clip_index} of {} not covered", edl.key);
            }
        }
    }

    for sequence_id in model.sequence_ids() {
        let sequence = model.sequence(sequence_id);
        assert_eq!(
            sequence.is_subordinated,
            !sequence.parents.is_empty(),
            "subordination out of sync"
        );
        assert!(!sequence.members.is_empty(), "empty sequence");
        for &member in &sequence.members {
            let registered = match member {
                SequenceMember::Content(ContentId::Zettel(id)) => {
                    model.zettel(id).sequences.contains(&sequence_id)
                }
                SequenceMember::Content(ContentId::Edl(id)) => {
                    model.edl(id).memberships.contains(&sequence_id)
                }
                SequenceMember::Sequence(id) => model.sequence(id).parents.contains(&sequence_id),
            };
            assert!(registered, "member {member:?} does not know its sequence");
        }
    }
}
