//! Cuts content clips into zettel at every link-end boundary.
//!
//! A span clip is split recursively: the first covering link-end pointer
//! divides it into prefix, intersection and suffix, and each piece is split
//! again by the pointers after it. Every resulting fragment carries exactly
//! the link-end pointers that cover it, in declaration order. Other clips
//! are never split.

use crate::parts::Link;
use crate::pointers::{Pointer, Span};

use super::{IncomingPointer, LinkId};

/// A slice of a clip and the link-end pointers covering it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub pointer: Pointer,
    pub incoming_pointers: Vec<IncomingPointer>,
}

/// Every link-end pointer in `links` endowing `target`, in link then end order.
pub fn covering_pointers(target: &Pointer, links: &[(LinkId, &Link)]) -> Vec<IncomingPointer> {
    let mut incoming = Vec::new();
    for (link_id, link) in links {
        for (end_index, end) in link.ends.iter().enumerate() {
            for pointer in &end.pointers {
                if pointer.endows_to(target) {
                    incoming.push(IncomingPointer {
                        pointer: pointer.clone(),
                        end: end_index,
                        link: *link_id,
                    });
                }
            }
        }
    }
    incoming
}

/// Slices `clip` against the ends of `links`.
///
/// Fragments of a span partition it exactly; empty fragments are dropped.
pub fn slice_clip(clip: &Pointer, links: &[(LinkId, &Link)]) -> Vec<Fragment> {
    let incoming = covering_pointers(clip, links);
    match clip {
        Pointer::Span(span) if span.is_empty() => Vec::new(),
        Pointer::Span(span) => {
            let cutters: Vec<(Span, IncomingPointer)> = incoming
                .into_iter()
                .filter_map(|ip| match &ip.pointer {
                    Pointer::Span(cutter) => Some((cutter.clone(), ip)),
                    _ => None,
                })
                .collect();
            let mut fragments = Vec::new();
            cut(span.clone(), &cutters, Vec::new(), &mut fragments);
            log::trace!("Sliced {} into {} zettel", span.hashable_name(), fragments.len());
            fragments
        }
        _ => vec![Fragment {
            pointer: clip.clone(),
            incoming_pointers: incoming,
        }],
    }
}

fn cut(
    span: Span,
    cutters: &[(Span, IncomingPointer)],
    covering: Vec<IncomingPointer>,
    fragments: &mut Vec<Fragment>,
) {
    if span.is_empty() {
        return;
    }
    let Some(((cutter, incoming), rest)) = cutters.split_first() else {
        fragments.push(Fragment {
            pointer: span.into(),
            incoming_pointers: covering,
        });
        return;
    };
    let Some(overlap) = span.intersect(cutter).filter(|o| !o.is_empty()) else {
        cut(span, rest, covering, fragments);
        return;
    };

    let prefix = span.crop(0, Some(overlap.start - span.start));
    let suffix_offset = i64::try_from(overlap.end() - span.start).unwrap_or(i64::MAX);
    let suffix = span.crop(suffix_offset, None);

    cut(prefix, rest, covering.clone(), fragments);
    let mut inner = covering.clone();
    inner.push(incoming.clone());
    cut(overlap, rest, inner, fragments);
    cut(suffix, rest, covering, fragments);
}
