use std::rc::Rc;

use crate::markup::Markup;
use crate::model::{ContentId, DocumentModel, EdlId, SequenceId};
use crate::pointers::{LinkPointer, Nibble, Pointer};

use super::{Sequence, SequenceMember, SequencePrototype, StreamItem};

/// Persistent list of collected members, newest first.
#[derive(Debug)]
struct Collected {
    member: SequenceMember,
    previous: Option<Rc<Collected>>,
}

/// Interior of a nested sequence still being matched.
#[derive(Debug, Clone)]
struct NestedFrame {
    members: Rc<[SequenceMember]>,
    position: usize,
}

impl NestedFrame {
    fn new(members: &[SequenceMember]) -> Self {
        Self {
            members: members.into(),
            position: 0,
        }
    }

    fn is_drained(&self) -> bool {
        self.position >= self.members.len()
    }
}

/// One attempt at matching a prototype's endset against the stream.
///
/// Cloning is cheap: the endset and the collected members are shared, so
/// forks made while speculating on nested sequences only copy positions.
#[derive(Debug, Clone)]
pub struct SequenceBuildingCursor {
    prototype: Rc<SequencePrototype>,
    endset: Rc<[Pointer]>,
    next: usize,
    current: Option<Pointer>,
    collected: Option<Rc<Collected>>,
    valid_so_far: bool,
    nested: Vec<NestedFrame>,
}

impl SequenceBuildingCursor {
    pub fn new(prototype: Rc<SequencePrototype>, endset: Rc<[Pointer]>) -> Self {
        Self {
            prototype,
            endset,
            next: 0,
            current: None,
            collected: None,
            valid_so_far: true,
            nested: Vec::new(),
        }
    }

    pub fn prototype(&self) -> &SequencePrototype {
        &self.prototype
    }

    pub fn is_failed(&self) -> bool {
        !self.valid_so_far
    }

    pub fn is_complete(&self) -> bool {
        self.valid_so_far
            && self.current.is_none()
            && self.next >= self.endset.len()
            && self.nested.is_empty()
            && self.collected.is_some()
    }

    /// The link the cursor expects next, when it can only continue with a
    /// sequence defined by that link.
    pub fn stalled_on_link(&self) -> Option<&LinkPointer> {
        if !self.valid_so_far || self.current.is_some() || !self.nested.is_empty() {
            return None;
        }
        match self.endset.get(self.next) {
            Some(Pointer::Link(link)) => Some(link),
            _ => None,
        }
    }

    /// Members collected so far, in stream order.
    pub fn members(&self) -> Vec<SequenceMember> {
        let mut members = Vec::new();
        let mut node = self.collected.as_deref();
        while let Some(collected) = node {
            members.push(collected.member);
            node = collected.previous.as_deref();
        }
        members.reverse();
        members
    }

    pub fn consume_zettel(&mut self, model: &DocumentModel, item: &StreamItem) -> bool {
        if !self.valid_so_far {
            return false;
        }
        if self.is_complete() {
            return true;
        }
        if !self.nested.is_empty() {
            return self.consume_nested(model, item.content);
        }
        if !item.signatures.contains(&self.prototype.signature) {
            return self.fail();
        }

        let current = match self.current.take() {
            Some(current) => current,
            None => match self.endset.get(self.next) {
                Some(next) => {
                    self.next += 1;
                    next.clone()
                }
                None => return self.fail(),
            },
        };
        match current.nibble(&item.pointer) {
            Nibble::Miss => self.fail(),
            Nibble::Whole => {
                self.collect(SequenceMember::Content(item.content));
                true
            }
            Nibble::Partial(rest) => {
                self.current = Some(rest);
                self.collect(SequenceMember::Content(item.content));
                true
            }
        }
    }

    /// Accepts an already discovered sequence for the link pointer expected
    /// next; its interior must then be matched by the following items.
    pub fn consume_sequence(&mut self, model: &DocumentModel, id: SequenceId) -> bool {
        let Some(expected) = self.stalled_on_link() else {
            return self.fail();
        };
        let sequence = model.sequence(id);
        if sequence.signature.defining_link != *expected {
            return self.fail();
        }
        self.next += 1;
        self.collect(SequenceMember::Sequence(id));
        self.nested.push(NestedFrame::new(&sequence.members));
        true
    }

    /// Materializes the matched sequence and registers it on its members.
    ///
    /// # Panics
    ///
    /// If the cursor is not complete.
    pub fn push_sequence(self, model: &mut DocumentModel, edl: EdlId) -> SequenceId {
        assert!(
            self.is_complete(),
            "push_sequence on an incomplete cursor for link {}",
            self.prototype.defining_link.name
        );
        let members = self.members();
        let prototype = &*self.prototype;
        let id = model.push_sequence(Sequence {
            defining_link: prototype.link,
            end: prototype.end,
            sequence_type: prototype.sequence_type.clone(),
            signature: prototype.signature.clone(),
            members: members.clone(),
            is_subordinated: false,
            parents: Vec::new(),
            edl,
            markup: Markup::default(),
            content_markup: Markup::default(),
        });

        for member in members {
            match member {
                SequenceMember::Content(ContentId::Zettel(zettel)) => {
                    model.zettel_mut(zettel).sequences.push(id);
                }
                SequenceMember::Content(ContentId::Edl(child)) => {
                    model.edl_mut(child).memberships.push(id);
                }
                SequenceMember::Sequence(inner) => {
                    let inner = model.sequence_mut(inner);
                    inner.is_subordinated = true;
                    inner.parents.push(id);
                }
            }
        }
        model.edl_mut(edl).sequences.push(id);
        id
    }

    fn consume_nested(&mut self, model: &DocumentModel, content: ContentId) -> bool {
        loop {
            let Some(frame) = self.nested.last_mut() else {
                return self.fail();
            };
            let Some(member) = frame.members.get(frame.position).copied() else {
                self.nested.pop();
                continue;
            };
            frame.position += 1;
            match member {
                SequenceMember::Sequence(inner) => {
                    self.nested.push(NestedFrame::new(&model.sequence(inner).members));
                }
                SequenceMember::Content(expected) if expected == content => {
                    while self.nested.last().is_some_and(NestedFrame::is_drained) {
                        self.nested.pop();
                    }
                    return true;
                }
                SequenceMember::Content(_) => return self.fail(),
            }
        }
    }

    fn collect(&mut self, member: SequenceMember) {
        self.collected = Some(Rc::new(Collected {
            member,
            previous: self.collected.take(),
        }));
    }

    fn fail(&mut self) -> bool {
        self.valid_so_far = false;
        false
    }
}
