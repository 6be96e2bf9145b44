//! Parts: the stored units the engine consumes.
//!
//! A [`Link`] annotates content with a type and ordered, optionally named
//! ends. An [`Edl`] lists content clips and the links that apply to them. A
//! [`Part`] pairs a pointer with whatever content it resolved to.

use serde::{Deserialize, Serialize};

use crate::pointers::{FormatError, Leaf, LinkPointer, Pointer};

type EndLeaf = (Option<String>, Vec<Pointer>);

/// One end of a link: an optional name and the pointers it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EndLeaf", into = "EndLeaf")]
pub struct LinkEnd {
    pub name: Option<String>,
    pub pointers: Vec<Pointer>,
}

impl LinkEnd {
    pub fn new(name: Option<&str>, pointers: Vec<Pointer>) -> Self {
        Self {
            name: name.map(str::to_string),
            pointers,
        }
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }
}

impl From<EndLeaf> for LinkEnd {
    fn from((name, pointers): EndLeaf) -> Self {
        Self { name, pointers }
    }
}

impl From<LinkEnd> for EndLeaf {
    fn from(end: LinkEnd) -> Self {
        (end.name, end.pointers)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "typ")]
    pub link_type: Pointer,
    #[serde(rename = "es")]
    pub ends: Vec<LinkEnd>,
}

impl Link {
    pub fn new(link_type: impl Into<Pointer>) -> Self {
        Self {
            link_type: link_type.into(),
            ends: Vec::new(),
        }
    }

    /// Builder-style helper appending an end.
    pub fn with_end(mut self, name: Option<&str>, pointers: Vec<Pointer>) -> Self {
        self.ends.push(LinkEnd::new(name, pointers));
        self
    }

    /// All ends carrying `name`, in declaration order.
    pub fn ends_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a LinkEnd> + 'a {
        self.ends.iter().filter(move |end| end.is_named(name))
    }

    /// Pointers of the first end carrying `name`.
    pub fn end_pointers(&self, name: &str) -> &[Pointer] {
        self.ends
            .iter()
            .find(|end| end.is_named(name))
            .map(|end| end.pointers.as_slice())
            .unwrap_or_default()
    }

    /// True if the link's type is the well-known type `name`.
    pub fn has_type(&self, name: &str) -> bool {
        matches!(&self.link_type, Pointer::Link(p) if p.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Edl {
    #[serde(rename = "typ", default)]
    pub edl_type: Option<Pointer>,
    #[serde(rename = "cps")]
    pub clips: Vec<Pointer>,
    #[serde(rename = "lks")]
    pub links: Vec<LinkPointer>,
}

impl Edl {
    pub fn new(edl_type: Option<Pointer>) -> Self {
        Self {
            edl_type,
            clips: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn with_clip(mut self, clip: impl Into<Pointer>) -> Self {
        self.clips.push(clip.into());
        self
    }

    pub fn with_link(mut self, link: LinkPointer) -> Self {
        self.links.push(link);
        self
    }
}

impl Leaf for Link {}
impl Leaf for Edl {}

/// Content a pointer resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartContent {
    Edl(Edl),
    Link(Link),
    Text(String),
    Bytes(Vec<u8>),
}

impl PartContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PartContent::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub pointer: Pointer,
    pub content: PartContent,
}

impl Part {
    pub fn new(pointer: impl Into<Pointer>, content: PartContent) -> Self {
        Self {
            pointer: pointer.into(),
            content,
        }
    }

    /// Parses raw bytes according to the pointer's kind.
    ///
    /// EDL and link pointers expect leaf JSON. Spans expect the UTF-8 text
    /// of their whole origin and keep only the addressed byte range. Images
    /// keep the raw bytes. Inline pointers ignore `raw` and carry their own
    /// text.
    pub fn parse(pointer: &Pointer, raw: &[u8]) -> Result<Part, FormatError> {
        let content = match pointer {
            Pointer::Edl(_) => PartContent::Edl(Edl::from_leaf_bytes(raw)?),
            Pointer::Link(_) => PartContent::Link(Link::from_leaf_bytes(raw)?),
            Pointer::Span(span) => {
                let text = std::str::from_utf8(raw)?;
                PartContent::Text(slice_text(text, span.start, span.length).to_string())
            }
            Pointer::Image(_) => PartContent::Bytes(raw.to_vec()),
            Pointer::Inline(inline) => PartContent::Text(inline.text.clone()),
        };
        Ok(Part {
            pointer: pointer.clone(),
            content,
        })
    }

    pub fn as_edl(&self) -> Option<&Edl> {
        match &self.content {
            PartContent::Edl(edl) => Some(edl),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&Link> {
        match &self.content {
            PartContent::Link(link) => Some(link),
            _ => None,
        }
    }
}

/// Byte range of `text`, clamped to its bounds and to char boundaries.
pub(crate) fn slice_text(text: &str, start: u64, length: u64) -> &str {
    let clamp = |offset: u64| usize::try_from(offset).unwrap_or(usize::MAX).min(text.len());
    let mut from = clamp(start);
    let mut to = clamp(start.saturating_add(length));
    while !text.is_char_boundary(from) {
        from -= 1;
    }
    while !text.is_char_boundary(to) {
        to += 1;
    }
    &text[from..to]
}
