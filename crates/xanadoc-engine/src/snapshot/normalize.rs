use std::collections::BTreeMap;

use serde::Serialize;

use crate::markup::Markup;
use crate::model::{ContentId, DocumentModel, EdlId, IncomingPointer, SequenceId};
use crate::sequences::SequenceMember;

#[derive(Serialize)]
pub struct Snap {
    pub root: EdlSnap,
}

#[derive(Serialize)]
pub struct EdlSnap {
    pub key: String,
    pub pointer: String,
    pub missing: bool,
    pub links: Vec<LinkSnap>,
    pub content: Vec<ContentSnap>,
    pub sequences: Vec<SequenceSnap>,
    pub markup: BTreeMap<String, String>,
    pub content_markup: BTreeMap<String, String>,
}

#[derive(Serialize)]
pub struct LinkSnap {
    pub key: String,
    pub pointer: String,
    pub depth: usize,
    pub default: bool,
    pub incoming: Vec<String>,
    pub markup: BTreeMap<String, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSnap {
    Zettel(ZettelSnap),
    Edl(EdlSnap),
}

#[derive(Serialize)]
pub struct ZettelSnap {
    pub key: String,
    pub pointer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub incoming: Vec<String>,
    pub sequences: Vec<String>,
    pub markup: BTreeMap<String, String>,
    pub content_markup: BTreeMap<String, String>,
}

#[derive(Serialize)]
pub struct SequenceSnap {
    pub label: String,
    pub members: Vec<String>,
    pub subordinated: bool,
    pub markup: BTreeMap<String, String>,
}

pub fn normalize(model: &DocumentModel) -> Snap {
    Snap {
        root: edl_snap(model, model.root()),
    }
}

fn edl_snap(model: &DocumentModel, id: EdlId) -> EdlSnap {
    let edl = model.edl(id);
    let links = edl
        .links
        .iter()
        .map(|&link_id| {
            let link = model.link(link_id);
            LinkSnap {
                key: link.key.clone(),
                pointer: link.pointer.hashable_name(),
                depth: link.depth,
                default: link.is_default,
                incoming: incoming_labels(model, &link.incoming_pointers),
                markup: markup_map(&link.markup),
            }
        })
        .collect();

    let content = edl
        .content
        .iter()
        .map(|&content| match content {
            ContentId::Zettel(zettel_id) => {
                let zettel = model.zettel(zettel_id);
                ContentSnap::Zettel(ZettelSnap {
                    key: zettel.key.clone(),
                    pointer: zettel.pointer.hashable_name(),
                    text: zettel
                        .content
                        .as_ref()
                        .and_then(|c| c.as_text())
                        .map(str::to_string),
                    incoming: incoming_labels(model, &zettel.incoming_pointers),
                    sequences: zettel
                        .sequences
                        .iter()
                        .map(|&s| sequence_label(model, s))
                        .collect(),
                    markup: markup_map(&zettel.markup),
                    content_markup: markup_map(&zettel.content_markup),
                })
            }
            ContentId::Edl(child) => ContentSnap::Edl(edl_snap(model, child)),
        })
        .collect();

    let sequences = edl
        .sequences
        .iter()
        .map(|&sequence_id| {
            let sequence = model.sequence(sequence_id);
            SequenceSnap {
                label: sequence_label(model, sequence_id),
                members: sequence
                    .members
                    .iter()
                    .map(|&member| member_label(model, member))
                    .collect(),
                subordinated: sequence.is_subordinated,
                markup: markup_map(&sequence.markup),
            }
        })
        .collect();

    EdlSnap {
        key: edl.key.clone(),
        pointer: edl.pointer.hashable_name(),
        missing: edl.is_missing,
        links,
        content,
        sequences,
        markup: markup_map(&edl.markup),
        content_markup: markup_map(&edl.content_markup),
    }
}

pub(crate) fn markup_map(markup: &Markup) -> BTreeMap<String, String> {
    markup
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// `<link>.<end>` for each pointer, the end named or numbered.
pub(crate) fn incoming_labels(model: &DocumentModel, incoming: &[IncomingPointer]) -> Vec<String> {
    incoming
        .iter()
        .map(|ip| {
            let link = model.link(ip.link);
            match link.end_name(ip.end) {
                Some(name) => format!("{}.{name}", link.pointer.name),
                None => format!("{}.{}", link.pointer.name, ip.end),
            }
        })
        .collect()
}

/// `<link>.<end>@<first leaf key>`
pub(crate) fn sequence_label(model: &DocumentModel, id: SequenceId) -> String {
    let sequence = model.sequence(id);
    let link = model.link(sequence.defining_link);
    let end = link
        .end_name(sequence.end)
        .map_or_else(|| sequence.end.to_string(), str::to_string);
    let start = model
        .sequence_leaves(id)
        .first()
        .map(|&leaf| content_key(model, leaf))
        .unwrap_or_default();
    format!("{}.{end}@{start}", link.pointer.name)
}

pub(crate) fn member_label(model: &DocumentModel, member: SequenceMember) -> String {
    match member {
        SequenceMember::Content(content) => content_key(model, content),
        SequenceMember::Sequence(inner) => sequence_label(model, inner),
    }
}

pub(crate) fn content_key(model: &DocumentModel, content: ContentId) -> String {
    match content {
        ContentId::Zettel(id) => model.zettel(id).key.clone(),
        ContentId::Edl(id) => model.edl(id).key.clone(),
    }
}
