use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use super::{EdlPointer, Nibble, leaf::PointerLeaf};

/// A rectangular region of an image origin.
///
/// Like [`Span`](super::Span), the context takes no part in equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "PointerLeaf", into = "PointerLeaf")]
pub struct Image {
    pub origin: String,
    pub x: u64,
    pub y: u64,
    pub width: u64,
    pub height: u64,
    pub context: Option<EdlPointer>,
}

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        self.denotes_same(other)
    }
}

impl Eq for Image {}

impl Hash for Image {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.origin.hash(state);
        self.x.hash(state);
        self.y.hash(state);
        self.width.hash(state);
        self.height.hash(state);
    }
}

impl Image {
    pub fn new(origin: impl Into<String>, x: u64, y: u64, width: u64, height: u64) -> Self {
        Self {
            origin: origin.into(),
            x,
            y,
            width,
            height,
            context: None,
        }
    }

    pub fn with_context(mut self, context: EdlPointer) -> Self {
        self.context = Some(context);
        self
    }

    pub fn right(&self) -> u64 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u64 {
        self.y.saturating_add(self.height)
    }

    pub fn hashable_name(&self) -> String {
        format!(
            "image:{}:{}:{}:{}:{}",
            self.origin, self.x, self.y, self.width, self.height
        )
    }

    pub fn same_origin(&self, other: &Image) -> bool {
        self.origin == other.origin
    }

    pub fn denotes_same(&self, other: &Image) -> bool {
        self.same_origin(other)
            && self.x == other.x
            && self.y == other.y
            && self.width == other.width
            && self.height == other.height
    }

    fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn overlaps(&self, other: &Image) -> bool {
        if !self.same_origin(other) {
            return false;
        }
        if self.is_empty() || other.is_empty() {
            return self.x <= other.right()
                && other.x <= self.right()
                && self.y <= other.bottom()
                && other.y <= self.bottom();
        }
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn engulfs(&self, other: &Image) -> bool {
        self.same_origin(other)
            && self.x <= other.x
            && self.y <= other.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// True if the rectangles share an edge segment without overlapping.
    pub fn abuts(&self, other: &Image) -> bool {
        if !self.same_origin(other) {
            return false;
        }
        let rows_overlap = self.y < other.bottom() && other.y < self.bottom();
        let columns_overlap = self.x < other.right() && other.x < self.right();
        let side_by_side = self.right() == other.x || other.right() == self.x;
        let stacked = self.bottom() == other.y || other.bottom() == self.y;
        (side_by_side && rows_overlap) || (stacked && columns_overlap)
    }

    /// Bounding rectangle of both, if they overlap or abut.
    pub fn merge(&self, other: &Image) -> Option<Image> {
        if !self.overlaps(other) && !self.abuts(other) {
            return None;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Some(Image {
            origin: self.origin.clone(),
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
            context: self.context.clone(),
        })
    }

    pub fn intersect(&self, other: &Image) -> Option<Image> {
        if !self.overlaps(other) {
            return None;
        }
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        Some(Image {
            origin: self.origin.clone(),
            x,
            y,
            width: self.right().min(other.right()).saturating_sub(x),
            height: self.bottom().min(other.bottom()).saturating_sub(y),
            context: self.context.clone(),
        })
    }

    /// Images cannot be partially consumed: only an identical region nibbles.
    pub fn nibble(&self, other: &Image) -> Nibble<Image> {
        if self.denotes_same(other) {
            Nibble::Whole
        } else {
            Nibble::Miss
        }
    }
}
