//! # Document Model
//!
//! The resolved, hierarchical view of an EDL and everything linked to it.
//!
//! All objects live in one arena ([`DocumentModel`]) and refer to each other
//! by id, so back references (parent EDL, sequence membership) never own
//! what they point at:
//!
//! - [`EdlModel`]: a decorated EDL with its content stream (zettel and child
//!   EDLs), links in scope, rules and discovered sequences
//! - [`DocumentModelLink`]: a link decorated with scope depth, index,
//!   incoming pointers, sequence prototypes and an optional markup rule
//! - [`Zettel`]: an atomic content fragment and the link ends covering it
//! - [`Sequence`]: an ordered grouping discovered by the sequence engine
//!
//! The model is produced by [`DocumentModelBuilder`] in two phases: the
//! hierarchy pass (links, zettel, child EDLs, sequences) and the markup pass.

pub mod builder;
pub mod types;
pub mod zettel_schneider;

use std::collections::HashMap;

use crate::markup::{Markup, Rule, resolve::ResolvedMarkup};
use crate::parts::{Edl, Link, PartContent};
use crate::pointers::{EdlPointer, LinkPointer, Pointer};
use crate::sequences::{Sequence, SequenceMember, SequencePrototype, Signature};

pub use builder::{Defaults, DocumentModelBuilder};

macro_rules! arena_id {
    ($($(#[$meta:meta])* $name:ident;)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub(crate) usize);

            impl $name {
                pub fn index(self) -> usize {
                    self.0
                }
            }
        )*
    };
}

arena_id! {
    /// Index of an [`EdlModel`] in its [`DocumentModel`].
    EdlId;
    /// Index of a [`DocumentModelLink`] in its [`DocumentModel`].
    LinkId;
    /// Index of a [`Zettel`] in its [`DocumentModel`].
    ZettelId;
    /// Index of a [`Sequence`] in its [`DocumentModel`].
    SequenceId;
}

/// Any object that can carry markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectId {
    Edl(EdlId),
    Link(LinkId),
    Zettel(ZettelId),
    Sequence(SequenceId),
}

/// An item of an EDL's content stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContentId {
    Zettel(ZettelId),
    Edl(EdlId),
}

impl From<ContentId> for ObjectId {
    fn from(content: ContentId) -> Self {
        match content {
            ContentId::Zettel(id) => ObjectId::Zettel(id),
            ContentId::Edl(id) => ObjectId::Edl(id),
        }
    }
}

/// A link end pointer that covers some object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingPointer {
    pub pointer: Pointer,
    /// Index of the end within the link.
    pub end: usize,
    pub link: LinkId,
}

#[derive(Debug, Clone)]
pub struct DocumentModelLink {
    pub pointer: LinkPointer,
    pub link: Link,
    /// EDL whose scope this entry belongs to.
    pub edl: EdlId,
    pub key: String,
    /// Position in the EDL's combined link scope.
    pub index: usize,
    /// 0 for links native to the EDL, +1 per level of inheritance.
    pub depth: usize,
    pub is_default: bool,
    pub incoming_pointers: Vec<IncomingPointer>,
    /// Sequence prototypes per end, indexed like `link.ends`.
    pub sequence_prototypes: Vec<Vec<SequencePrototype>>,
    /// Semantic classes each end endows on its targets.
    pub semantic_classes: Vec<Vec<Pointer>>,
    pub markup_rule: Option<Rule>,
    pub markup: Markup,
    pub content_markup: Markup,
}

impl DocumentModelLink {
    pub fn end_name(&self, end: usize) -> Option<&str> {
        self.link.ends.get(end).and_then(|e| e.name.as_deref())
    }
}

#[derive(Debug, Clone)]
pub struct EdlModel {
    pub pointer: EdlPointer,
    pub edl: Edl,
    /// Set when the EDL could not be fetched and a stand-in was used.
    pub is_missing: bool,
    pub key: String,
    pub parent: Option<EdlId>,
    /// Zettel and child EDLs, in clip order.
    pub content: Vec<ContentId>,
    pub links: Vec<LinkId>,
    links_by_name: HashMap<String, LinkId>,
    pub incoming_pointers: Vec<IncomingPointer>,
    pub markup_rules: Vec<LinkId>,
    /// Every sequence discovered in this EDL, nested ones included.
    pub sequences: Vec<SequenceId>,
    /// Sequences of the parent EDL this EDL is a member of.
    pub memberships: Vec<SequenceId>,
    pub markup: Markup,
    pub content_markup: Markup,
}

impl EdlModel {
    pub(crate) fn new(
        pointer: EdlPointer,
        edl: Edl,
        is_missing: bool,
        key: String,
        parent: Option<EdlId>,
    ) -> Self {
        Self {
            pointer,
            edl,
            is_missing,
            key,
            parent,
            content: Vec::new(),
            links: Vec::new(),
            links_by_name: HashMap::new(),
            incoming_pointers: Vec::new(),
            markup_rules: Vec::new(),
            sequences: Vec::new(),
            memberships: Vec::new(),
            markup: Markup::default(),
            content_markup: Markup::default(),
        }
    }

    pub fn edl_type(&self) -> Option<&Pointer> {
        self.edl.edl_type.as_ref()
    }

    /// The in-scope link entry for a link pointer.
    pub fn link_named(&self, pointer: &LinkPointer) -> Option<LinkId> {
        self.links_by_name.get(&pointer.hashable_name()).copied()
    }

    pub(crate) fn set_links(&mut self, links: Vec<LinkId>, names: HashMap<String, LinkId>) {
        self.links = links;
        self.links_by_name = names;
    }
}

/// An atomic content fragment.
#[derive(Debug, Clone)]
pub struct Zettel {
    pub pointer: Pointer,
    pub edl: EdlId,
    pub key: String,
    /// Index of the clip this zettel was cut from.
    pub clip_index: usize,
    pub incoming_pointers: Vec<IncomingPointer>,
    pub sequences: Vec<SequenceId>,
    /// Content of the fragment, when it was available locally.
    pub content: Option<PartContent>,
    pub markup: Markup,
    pub content_markup: Markup,
}

#[derive(Debug, Clone)]
pub struct DocumentModel {
    pub(crate) edls: Vec<EdlModel>,
    pub(crate) links: Vec<DocumentModelLink>,
    pub(crate) zettel: Vec<Zettel>,
    pub(crate) sequences: Vec<Sequence>,
    pub(crate) root: EdlId,
}

impl DocumentModel {
    pub(crate) fn empty() -> Self {
        Self {
            edls: Vec::new(),
            links: Vec::new(),
            zettel: Vec::new(),
            sequences: Vec::new(),
            root: EdlId(0),
        }
    }

    pub fn root(&self) -> EdlId {
        self.root
    }

    pub fn root_edl(&self) -> &EdlModel {
        self.edl(self.root)
    }

    pub fn edl(&self, id: EdlId) -> &EdlModel {
        &self.edls[id.0]
    }

    pub fn link(&self, id: LinkId) -> &DocumentModelLink {
        &self.links[id.0]
    }

    pub fn zettel(&self, id: ZettelId) -> &Zettel {
        &self.zettel[id.0]
    }

    pub fn sequence(&self, id: SequenceId) -> &Sequence {
        &self.sequences[id.0]
    }

    pub fn edl_ids(&self) -> impl Iterator<Item = EdlId> {
        (0..self.edls.len()).map(EdlId)
    }

    pub fn zettel_ids(&self) -> impl Iterator<Item = ZettelId> {
        (0..self.zettel.len()).map(ZettelId)
    }

    pub fn sequence_ids(&self) -> impl Iterator<Item = SequenceId> {
        (0..self.sequences.len()).map(SequenceId)
    }

    pub(crate) fn edl_mut(&mut self, id: EdlId) -> &mut EdlModel {
        &mut self.edls[id.0]
    }

    pub(crate) fn link_mut(&mut self, id: LinkId) -> &mut DocumentModelLink {
        &mut self.links[id.0]
    }

    pub(crate) fn zettel_mut(&mut self, id: ZettelId) -> &mut Zettel {
        &mut self.zettel[id.0]
    }

    pub(crate) fn sequence_mut(&mut self, id: SequenceId) -> &mut Sequence {
        &mut self.sequences[id.0]
    }

    pub(crate) fn push_edl(&mut self, edl: EdlModel) -> EdlId {
        self.edls.push(edl);
        EdlId(self.edls.len() - 1)
    }

    pub(crate) fn push_link(&mut self, link: DocumentModelLink) -> LinkId {
        self.links.push(link);
        LinkId(self.links.len() - 1)
    }

    pub(crate) fn push_zettel(&mut self, zettel: Zettel) -> ZettelId {
        self.zettel.push(zettel);
        ZettelId(self.zettel.len() - 1)
    }

    pub(crate) fn push_sequence(&mut self, sequence: Sequence) -> SequenceId {
        self.sequences.push(sequence);
        SequenceId(self.sequences.len() - 1)
    }

    /// Zettel of an EDL's own content stream, child EDLs skipped.
    pub fn zettel_of(&self, edl: EdlId) -> impl Iterator<Item = ZettelId> + '_ {
        self.edl(edl).content.iter().filter_map(|c| match c {
            ContentId::Zettel(id) => Some(*id),
            ContentId::Edl(_) => None,
        })
    }

    /// Child EDLs of an EDL, in clip order.
    pub fn children_of(&self, edl: EdlId) -> impl Iterator<Item = EdlId> + '_ {
        self.edl(edl).content.iter().filter_map(|c| match c {
            ContentId::Edl(id) => Some(*id),
            ContentId::Zettel(_) => None,
        })
    }

    /// Sequences of an EDL that are not members of another sequence.
    pub fn root_sequences(&self, edl: EdlId) -> impl Iterator<Item = SequenceId> + '_ {
        self.edl(edl)
            .sequences
            .iter()
            .copied()
            .filter(|&id| !self.sequence(id).is_subordinated)
    }

    pub fn content_pointer(&self, content: ContentId) -> Pointer {
        match content {
            ContentId::Zettel(id) => self.zettel(id).pointer.clone(),
            ContentId::Edl(id) => Pointer::Edl(self.edl(id).pointer.clone()),
        }
    }

    pub fn content_incoming(&self, content: ContentId) -> &[IncomingPointer] {
        match content {
            ContentId::Zettel(id) => &self.zettel(id).incoming_pointers,
            ContentId::Edl(id) => &self.edl(id).incoming_pointers,
        }
    }

    /// Pointer used to name an object in rule targets.
    pub fn object_pointer(&self, object: ObjectId) -> Pointer {
        match object {
            ObjectId::Edl(id) => Pointer::Edl(self.edl(id).pointer.clone()),
            ObjectId::Link(id) => Pointer::Link(self.link(id).pointer.clone()),
            ObjectId::Zettel(id) => self.zettel(id).pointer.clone(),
            ObjectId::Sequence(id) => {
                Pointer::Link(self.link(self.sequence(id).defining_link).pointer.clone())
            }
        }
    }

    pub fn incoming_pointers(&self, object: ObjectId) -> &[IncomingPointer] {
        match object {
            ObjectId::Edl(id) => &self.edl(id).incoming_pointers,
            ObjectId::Link(id) => &self.link(id).incoming_pointers,
            ObjectId::Zettel(id) => &self.zettel(id).incoming_pointers,
            ObjectId::Sequence(id) => {
                &self.link(self.sequence(id).defining_link).incoming_pointers
            }
        }
    }

    /// Signatures of the sequence prototypes that `incoming` endows.
    pub fn signatures_of(&self, incoming: &[IncomingPointer]) -> Vec<Signature> {
        let mut signatures: Vec<Signature> = Vec::new();
        for ip in incoming {
            let link = self.link(ip.link);
            for prototype in link.sequence_prototypes.get(ip.end).into_iter().flatten() {
                if !signatures.contains(&prototype.signature) {
                    signatures.push(prototype.signature.clone());
                }
            }
        }
        signatures
    }

    /// Semantic classes endowed on an object by the link ends covering it.
    pub fn semantic_classes(&self, object: ObjectId) -> Vec<Pointer> {
        let mut classes: Vec<Pointer> = Vec::new();
        let mut add = |class: &Pointer| {
            if !classes.iter().any(|c| c.denotes_same(class)) {
                classes.push(class.clone());
            }
        };
        for ip in self.incoming_pointers(object) {
            let link = self.link(ip.link);
            link.semantic_classes
                .get(ip.end)
                .into_iter()
                .flatten()
                .for_each(&mut add);
        }
        if let ObjectId::Sequence(id) = object {
            let sequence = self.sequence(id);
            self.link(sequence.defining_link)
                .semantic_classes
                .get(sequence.end)
                .into_iter()
                .flatten()
                .for_each(&mut add);
        }
        classes
    }

    /// Objects an object's content markup is inherited from.
    ///
    /// Sequence membership takes the place of the lexical parent.
    pub fn containers(&self, object: ObjectId) -> Vec<ObjectId> {
        match object {
            ObjectId::Zettel(id) => {
                let zettel = self.zettel(id);
                if zettel.sequences.is_empty() {
                    vec![ObjectId::Edl(zettel.edl)]
                } else {
                    zettel.sequences.iter().copied().map(ObjectId::Sequence).collect()
                }
            }
            ObjectId::Edl(id) => {
                let edl = self.edl(id);
                if !edl.memberships.is_empty() {
                    edl.memberships.iter().copied().map(ObjectId::Sequence).collect()
                } else {
                    edl.parent.map(ObjectId::Edl).into_iter().collect()
                }
            }
            ObjectId::Sequence(id) => {
                let sequence = self.sequence(id);
                if sequence.parents.is_empty() {
                    vec![ObjectId::Edl(sequence.edl)]
                } else {
                    sequence.parents.iter().copied().map(ObjectId::Sequence).collect()
                }
            }
            ObjectId::Link(id) => vec![ObjectId::Edl(self.link(id).edl)],
        }
    }

    /// EDL whose markup rules apply to an object.
    pub fn scope_of(&self, object: ObjectId) -> EdlId {
        match object {
            ObjectId::Edl(id) => id,
            ObjectId::Link(id) => self.link(id).edl,
            ObjectId::Zettel(id) => self.zettel(id).edl,
            ObjectId::Sequence(id) => self.sequence(id).edl,
        }
    }

    /// Content items of a sequence in stream order, nested sequences expanded.
    pub fn sequence_leaves(&self, id: SequenceId) -> Vec<ContentId> {
        let mut leaves = Vec::new();
        self.collect_leaves(id, &mut leaves);
        leaves
    }

    fn collect_leaves(&self, id: SequenceId, leaves: &mut Vec<ContentId>) {
        for member in &self.sequence(id).members {
            match member {
                SequenceMember::Content(content) => leaves.push(*content),
                SequenceMember::Sequence(inner) => self.collect_leaves(*inner, leaves),
            }
        }
    }

    pub fn markup(&self, object: ObjectId) -> &Markup {
        match object {
            ObjectId::Edl(id) => &self.edl(id).markup,
            ObjectId::Link(id) => &self.link(id).markup,
            ObjectId::Zettel(id) => &self.zettel(id).markup,
            ObjectId::Sequence(id) => &self.sequence(id).markup,
        }
    }

    pub fn content_markup(&self, object: ObjectId) -> &Markup {
        match object {
            ObjectId::Edl(id) => &self.edl(id).content_markup,
            ObjectId::Link(id) => &self.link(id).content_markup,
            ObjectId::Zettel(id) => &self.zettel(id).content_markup,
            ObjectId::Sequence(id) => &self.sequence(id).content_markup,
        }
    }

    pub(crate) fn apply_markup(&mut self, resolved: HashMap<ObjectId, ResolvedMarkup>) {
        for (object, ResolvedMarkup { markup, content_markup }) in resolved {
            let (target, content_target) = match object {
                ObjectId::Edl(id) => {
                    let edl = self.edl_mut(id);
                    (&mut edl.markup, &mut edl.content_markup)
                }
                ObjectId::Link(id) => {
                    let link = self.link_mut(id);
                    (&mut link.markup, &mut link.content_markup)
                }
                ObjectId::Zettel(id) => {
                    let zettel = self.zettel_mut(id);
                    (&mut zettel.markup, &mut zettel.content_markup)
                }
                ObjectId::Sequence(id) => {
                    let sequence = self.sequence_mut(id);
                    (&mut sequence.markup, &mut sequence.content_markup)
                }
            };
            *target = markup;
            *content_target = content_markup;
        }
    }
}
