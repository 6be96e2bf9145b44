//! Leaf (wire) encoding shared by pointers, links and EDLs.
//!
//! Every pointer kind serializes to a small JSON object discriminated by
//! `typ`:
//!
//! | kind    | leaf data                                  |
//! |---------|--------------------------------------------|
//! | span    | `{typ:"span", ori, st, ln, ctx?}`          |
//! | image   | `{typ:"image", ori, x, y, wd, ht, ctx?}`   |
//! | edl     | `{typ:"edl", name}`                        |
//! | link    | `{typ:"link", name}`                       |
//! | inline  | `{typ:"inline", txt}`                      |
//!
//! Decoding an unrecognized `typ` fails with [`FormatError::Json`].

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use super::{EdlPointer, Image, InlinePointer, LinkPointer, Pointer, Span};

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Invalid leaf data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Expected a {expected} pointer, found a {found} pointer")]
    UnexpectedPointer {
        expected: &'static str,
        found: &'static str,
    },
    #[error("{kind} pointer into {origin} extends past the largest offset")]
    OutOfRange { kind: &'static str, origin: String },
    #[error("Content is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Values with a leaf encoding.
pub trait Leaf: Serialize + DeserializeOwned {
    /// Encodes the value as leaf data.
    fn leaf_data(&self) -> Result<serde_json::Value, FormatError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decodes a value from leaf data.
    fn from_leaf_data(data: serde_json::Value) -> Result<Self, FormatError> {
        Ok(serde_json::from_value(data)?)
    }

    /// Decodes a value from raw JSON bytes.
    fn from_leaf_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl Leaf for Pointer {}
impl Leaf for Span {}
impl Leaf for Image {}
impl Leaf for EdlPointer {}
impl Leaf for LinkPointer {}
impl Leaf for InlinePointer {}

/// Wire shape of every pointer kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "typ", rename_all = "lowercase")]
pub(crate) enum PointerLeaf {
    Span {
        ori: String,
        st: u64,
        ln: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ctx: Option<Box<PointerLeaf>>,
    },
    Image {
        ori: String,
        x: u64,
        y: u64,
        wd: u64,
        ht: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ctx: Option<Box<PointerLeaf>>,
    },
    Edl {
        name: String,
    },
    Link {
        name: String,
    },
    Inline {
        txt: String,
    },
}

fn context_from_leaf(ctx: Option<Box<PointerLeaf>>) -> Result<Option<EdlPointer>, FormatError> {
    ctx.map(|leaf| EdlPointer::try_from(*leaf)).transpose()
}

fn check_extent(
    kind: &'static str,
    origin: &str,
    extents: &[(u64, u64)],
) -> Result<(), FormatError> {
    if extents.iter().all(|&(at, size)| at.checked_add(size).is_some()) {
        Ok(())
    } else {
        Err(FormatError::OutOfRange {
            kind,
            origin: origin.to_string(),
        })
    }
}

fn context_to_leaf(ctx: Option<EdlPointer>) -> Option<Box<PointerLeaf>> {
    ctx.map(|edl| Box::new(PointerLeaf::Edl { name: edl.name }))
}

impl TryFrom<PointerLeaf> for Pointer {
    type Error = FormatError;

    fn try_from(leaf: PointerLeaf) -> Result<Self, Self::Error> {
        Ok(match leaf {
            PointerLeaf::Span { ori, st, ln, ctx } => {
                check_extent("span", &ori, &[(st, ln)])?;
                Pointer::Span(Span {
                    origin: ori,
                    start: st,
                    length: ln,
                    context: context_from_leaf(ctx)?,
                })
            }
            PointerLeaf::Image {
                ori,
                x,
                y,
                wd,
                ht,
                ctx,
            } => {
                check_extent("image", &ori, &[(x, wd), (y, ht)])?;
                Pointer::Image(Image {
                    origin: ori,
                    x,
                    y,
                    width: wd,
                    height: ht,
                    context: context_from_leaf(ctx)?,
                })
            }
            PointerLeaf::Edl { name } => Pointer::Edl(EdlPointer { name }),
            PointerLeaf::Link { name } => Pointer::Link(LinkPointer { name }),
            PointerLeaf::Inline { txt } => Pointer::Inline(InlinePointer { text: txt }),
        })
    }
}

impl From<Pointer> for PointerLeaf {
    fn from(pointer: Pointer) -> Self {
        match pointer {
            Pointer::Span(span) => PointerLeaf::Span {
                ori: span.origin,
                st: span.start,
                ln: span.length,
                ctx: context_to_leaf(span.context),
            },
            Pointer::Image(image) => PointerLeaf::Image {
                ori: image.origin,
                x: image.x,
                y: image.y,
                wd: image.width,
                ht: image.height,
                ctx: context_to_leaf(image.context),
            },
            Pointer::Edl(edl) => PointerLeaf::Edl { name: edl.name },
            Pointer::Link(link) => PointerLeaf::Link { name: link.name },
            Pointer::Inline(inline) => PointerLeaf::Inline { txt: inline.text },
        }
    }
}

/// Conversions between the leaf enum and each concrete pointer struct.
macro_rules! pointer_leaf_conversions {
    ($($ty:ident => $variant:ident, $expected:literal;)*) => {
        $(
            impl TryFrom<PointerLeaf> for $ty {
                type Error = FormatError;

                fn try_from(leaf: PointerLeaf) -> Result<Self, Self::Error> {
                    match Pointer::try_from(leaf)? {
                        Pointer::$variant(inner) => Ok(inner),
                        other => Err(FormatError::UnexpectedPointer {
                            expected: $expected,
                            found: other.kind().name(),
                        }),
                    }
                }
            }

            impl From<$ty> for PointerLeaf {
                fn from(inner: $ty) -> Self {
                    PointerLeaf::from(Pointer::$variant(inner))
                }
            }
        )*
    };
}

pointer_leaf_conversions! {
    Span => Span, "span";
    Image => Image, "image";
    EdlPointer => Edl, "edl";
    LinkPointer => Link, "link";
    InlinePointer => Inline, "inline";
}
