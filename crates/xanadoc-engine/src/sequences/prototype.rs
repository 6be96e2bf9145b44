use crate::model::LinkId;
use crate::pointers::{LinkPointer, Pointer};

/// Identity of a prototype: the defining link, the metalink that made one
/// of its ends a sequence, and that end.
///
/// A metalink without an end filter applies to every end of the link, so
/// the end index keeps those prototypes apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub defining_link: LinkPointer,
    pub metalink: LinkPointer,
    pub end: usize,
}

/// A sequence a link end may produce once its endset is found in the
/// content stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencePrototype {
    pub sequence_type: Option<Pointer>,
    /// Index of the end whose pointers make up the endset.
    pub end: usize,
    pub defining_link: LinkPointer,
    /// The defining link's entry in the EDL scope that declared it.
    pub link: LinkId,
    pub signature: Signature,
}
