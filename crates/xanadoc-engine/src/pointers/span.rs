use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use super::{EdlPointer, Nibble, leaf::PointerLeaf};

/// A run of `length` units of an origin's content, beginning at `start`.
///
/// Spans never carry text themselves; the text is fetched separately by
/// origin. Every interval operation requires both spans to share an origin
/// and is vacuously false (or `None`) otherwise.
///
/// Equality and hashing follow [`Span::hashable_name`]: the context is not
/// part of a span's identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "PointerLeaf", into = "PointerLeaf")]
pub struct Span {
    /// Name of the content origin the span points into.
    pub origin: String,
    /// Inclusive start offset.
    pub start: u64,
    /// Number of units covered.
    pub length: u64,
    /// EDL the span was originally clipped from, if known.
    pub context: Option<EdlPointer>,
}

impl PartialEq for Span {
    fn eq(&self, other: &Self) -> bool {
        self.denotes_same(other)
    }
}

impl Eq for Span {}

impl Hash for Span {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.origin.hash(state);
        self.start.hash(state);
        self.length.hash(state);
    }
}

impl Span {
    pub fn new(origin: impl Into<String>, start: u64, length: u64) -> Self {
        Self {
            origin: origin.into(),
            start,
            length,
            context: None,
        }
    }

    pub fn with_context(mut self, context: EdlPointer) -> Self {
        self.context = Some(context);
        self
    }

    /// Exclusive end offset, saturating at the largest offset.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.length)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn hashable_name(&self) -> String {
        format!("span:{}:{}:{}", self.origin, self.start, self.length)
    }

    pub fn same_origin(&self, other: &Span) -> bool {
        self.origin == other.origin
    }

    pub fn denotes_same(&self, other: &Span) -> bool {
        self.same_origin(other) && self.start == other.start && self.length == other.length
    }

    /// True if the two ranges share at least one unit.
    ///
    /// A zero-length span sits at a point and overlaps any range containing
    /// that point, boundaries included.
    pub fn overlaps(&self, other: &Span) -> bool {
        if !self.same_origin(other) {
            return false;
        }
        if self.is_empty() || other.is_empty() {
            return self.start <= other.end() && other.start <= self.end();
        }
        self.start < other.end() && other.start < self.end()
    }

    /// True if `other` lies entirely within `self`.
    pub fn engulfs(&self, other: &Span) -> bool {
        self.same_origin(other) && self.start <= other.start && other.end() <= self.end()
    }

    /// True if one span ends exactly where the other begins.
    pub fn abuts(&self, other: &Span) -> bool {
        self.same_origin(other) && (self.end() == other.start || other.end() == self.start)
    }

    /// The smallest span covering both, if they overlap or abut.
    pub fn merge(&self, other: &Span) -> Option<Span> {
        if !self.overlaps(other) && !self.abuts(other) {
            return None;
        }
        let start = self.start.min(other.start);
        let end = self.end().max(other.end());
        Some(Span {
            origin: self.origin.clone(),
            start,
            length: end - start,
            context: self.context.clone(),
        })
    }

    /// The shared sub-range, if any.
    pub fn intersect(&self, other: &Span) -> Option<Span> {
        if !self.overlaps(other) {
            return None;
        }
        let start = self.start.max(other.start);
        let end = self.end().min(other.end());
        Some(Span {
            origin: self.origin.clone(),
            start,
            length: end.saturating_sub(start),
            context: self.context.clone(),
        })
    }

    /// Shrinks the span from the front by `start_adjust` and optionally
    /// limits its length.
    ///
    /// Negative adjustments clamp to zero and the result never extends
    /// beyond the original bounds.
    pub fn crop(&self, start_adjust: i64, new_length: Option<u64>) -> Span {
        let adjust = u64::try_from(start_adjust).unwrap_or(0).min(self.length);
        let available = self.length - adjust;
        Span {
            origin: self.origin.clone(),
            start: self.start.saturating_add(adjust),
            length: new_length.map_or(available, |l| l.min(available)),
            context: self.context.clone(),
        }
    }

    /// Consumes `prefix` from the front of `self`.
    ///
    /// `prefix` must share the origin and start of `self` and be no longer
    /// than it.
    pub fn nibble(&self, prefix: &Span) -> Nibble<Span> {
        if !self.same_origin(prefix) || self.start != prefix.start || prefix.length > self.length
        {
            return Nibble::Miss;
        }
        if prefix.length == self.length {
            return Nibble::Whole;
        }
        Nibble::Partial(Span {
            origin: self.origin.clone(),
            start: self.start.saturating_add(prefix.length),
            length: self.length - prefix.length,
            context: self.context.clone(),
        })
    }
}
