//! # Sequence Engine
//!
//! Discovers ordered groupings declared by "defines sequence" metalinks.
//!
//! Every link end a sequence metalink applies to yields a
//! [`SequencePrototype`]. The [`SequenceScanner`] walks an EDL's content
//! stream once per prototype; a [`SequenceBuilder`] keeps a set of
//! [`SequenceBuildingCursor`]s alive while walking, each cursor matching the
//! prototype's endset in order. Pointers of the endset may be matched
//! partially by consecutive zettel (clip nibbling), and link pointers in the
//! endset may be matched by sequences found earlier, which then become
//! subordinated members of the new sequence.

pub mod builder;
pub mod cursor;
pub mod prototype;
pub mod scanner;

use crate::markup::Markup;
use crate::model::{ContentId, EdlId, LinkId, SequenceId};
use crate::pointers::Pointer;

pub use builder::{SequenceBuilder, StreamItem};
pub use cursor::SequenceBuildingCursor;
pub use prototype::{SequencePrototype, Signature};
pub use scanner::SequenceScanner;

/// A member of a sequence: a content item or a nested sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceMember {
    Content(ContentId),
    Sequence(SequenceId),
}

#[derive(Debug, Clone)]
pub struct Sequence {
    pub defining_link: LinkId,
    /// Index of the defining end within the link.
    pub end: usize,
    pub sequence_type: Option<Pointer>,
    pub signature: Signature,
    pub members: Vec<SequenceMember>,
    /// Set once the sequence is a member of another sequence.
    pub is_subordinated: bool,
    /// Sequences this one is a member of.
    pub parents: Vec<SequenceId>,
    pub edl: EdlId,
    pub markup: Markup,
    pub content_markup: Markup,
}
