//! Part retrieval.
//!
//! The engine consumes parts through [`PartFetcher`]; it never decides where
//! they live. `Ok(None)` means the part does not exist, which the builder
//! treats as a local, recoverable absence. Errors are reserved for parts
//! that exist but cannot be read or decoded.

use relative_path::{Component, RelativePathBuf};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::parts::{Edl, Link, Part, PartContent, slice_text};
use crate::pointers::{FormatError, Pointer};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed part {name}: {source}")]
    Format { name: String, source: FormatError },
    #[error("Name conflict: {0} is already bound to different content")]
    NameConflict(String),
}

pub trait PartFetcher {
    /// Fetches the part addressed by `pointer`.
    fn get_part(&self, pointer: &Pointer) -> Result<Option<Part>, FetchError>;

    /// Returns the part only if it is available without further retrieval.
    fn cached_part(&self, _pointer: &Pointer) -> Option<Part> {
        None
    }
}

/// In-memory part store. Everything it holds counts as locally cached.
#[derive(Debug, Default, Clone)]
pub struct MemoryCache {
    edls: HashMap<String, Edl>,
    links: HashMap<String, Link>,
    texts: HashMap<String, String>,
    images: HashMap<String, Vec<u8>>,
}

fn bind<V: PartialEq>(
    map: &mut HashMap<String, V>,
    kind: &str,
    name: &str,
    value: V,
) -> Result<(), FetchError> {
    match map.get(name) {
        Some(existing) if *existing != value => {
            Err(FetchError::NameConflict(format!("{kind}:{name}")))
        }
        Some(_) => Ok(()),
        None => {
            map.insert(name.to_string(), value);
            Ok(())
        }
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to an EDL. Rebinding to identical content is a no-op.
    pub fn insert_edl(&mut self, name: &str, edl: Edl) -> Result<(), FetchError> {
        bind(&mut self.edls, "edl", name, edl)
    }

    pub fn insert_link(&mut self, name: &str, link: Link) -> Result<(), FetchError> {
        bind(&mut self.links, "link", name, link)
    }

    /// Binds a text origin that spans slice into.
    pub fn insert_text(&mut self, origin: &str, text: &str) -> Result<(), FetchError> {
        bind(&mut self.texts, "text", origin, text.to_string())
    }

    pub fn insert_image(&mut self, origin: &str, bytes: Vec<u8>) -> Result<(), FetchError> {
        bind(&mut self.images, "image", origin, bytes)
    }

    pub fn len(&self) -> usize {
        self.edls.len() + self.links.len() + self.texts.len() + self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, pointer: &Pointer) -> Option<Part> {
        let content = match pointer {
            Pointer::Edl(edl) => PartContent::Edl(self.edls.get(&edl.name)?.clone()),
            Pointer::Link(link) => PartContent::Link(self.links.get(&link.name)?.clone()),
            Pointer::Span(span) => {
                let text = self.texts.get(&span.origin)?;
                PartContent::Text(slice_text(text, span.start, span.length).to_string())
            }
            Pointer::Image(image) => PartContent::Bytes(self.images.get(&image.origin)?.clone()),
            Pointer::Inline(inline) => PartContent::Text(inline.text.clone()),
        };
        Some(Part {
            pointer: pointer.clone(),
            content,
        })
    }
}

impl PartFetcher for MemoryCache {
    fn get_part(&self, pointer: &Pointer) -> Result<Option<Part>, FetchError> {
        Ok(self.lookup(pointer))
    }

    fn cached_part(&self, pointer: &Pointer) -> Option<Part> {
        self.lookup(pointer)
    }
}

/// Reads parts from a directory laid out as:
///
/// ```text
/// <root>/edl/<name>.json     EDL leaf data
/// <root>/link/<name>.json    link leaf data
/// <root>/origin/<origin>     raw text or image bytes
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryFetcher {
    root: PathBuf,
}

impl DirectoryFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of a non-inline part below the root, or `None` if its name
    /// would leave the part's own directory.
    fn relative_path(pointer: &Pointer) -> Option<RelativePathBuf> {
        let (dir, file) = match pointer {
            Pointer::Edl(edl) => ("edl", format!("{}.json", edl.name)),
            Pointer::Link(link) => ("link", format!("{}.json", link.name)),
            Pointer::Span(span) => ("origin", span.origin.clone()),
            Pointer::Image(image) => ("origin", image.origin.clone()),
            Pointer::Inline(_) => return None,
        };
        let path = RelativePathBuf::from(format!("{dir}/{file}")).normalize();
        let mut components = path.components();
        let inside = components.next() == Some(Component::Normal(dir))
            && components.next().is_some()
            && !path.components().any(|c| c == Component::ParentDir);
        inside.then_some(path)
    }
}

impl PartFetcher for DirectoryFetcher {
    fn get_part(&self, pointer: &Pointer) -> Result<Option<Part>, FetchError> {
        if let Pointer::Inline(_) = pointer {
            return Part::parse(pointer, &[])
                .map(Some)
                .map_err(|source| FetchError::Format {
                    name: pointer.hashable_name(),
                    source,
                });
        }
        let Some(relative) = Self::relative_path(pointer) else {
            log::warn!("Part name {} leaves the parts directory", pointer.hashable_name());
            return Ok(None);
        };
        let absolute = relative.to_path(&self.root);
        if !absolute.exists() {
            return Ok(None);
        }
        let raw = fs::read(&absolute)?;
        Part::parse(pointer, &raw)
            .map(Some)
            .map_err(|source| FetchError::Format {
                name: pointer.hashable_name(),
                source,
            })
    }

    /// Origins on local disk count as cached.
    fn cached_part(&self, pointer: &Pointer) -> Option<Part> {
        if !pointer.is_clip() {
            return None;
        }
        self.get_part(pointer).ok().flatten()
    }
}

/// Tries each fetcher in turn; the first one that finds the part wins.
///
/// A fetcher that errors is skipped. The first error is reported only if no
/// fetcher found the part.
#[derive(Default)]
pub struct FallbackFetcher {
    fetchers: Vec<Box<dyn PartFetcher>>,
}

impl FallbackFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetcher(mut self, fetcher: impl PartFetcher + 'static) -> Self {
        self.fetchers.push(Box::new(fetcher));
        self
    }
}

impl std::fmt::Debug for FallbackFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackFetcher")
            .field("fetchers", &self.fetchers.len())
            .finish()
    }
}

impl PartFetcher for FallbackFetcher {
    fn get_part(&self, pointer: &Pointer) -> Result<Option<Part>, FetchError> {
        let mut first_error = None;
        for fetcher in &self.fetchers {
            match fetcher.get_part(pointer) {
                Ok(Some(part)) => return Ok(Some(part)),
                Ok(None) => {}
                Err(e) => {
                    log::warn!("Fetcher failed for {}: {e}", pointer.hashable_name());
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    fn cached_part(&self, pointer: &Pointer) -> Option<Part> {
        self.fetchers
            .iter()
            .find_map(|fetcher| fetcher.cached_part(pointer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointers::{EdlPointer, Leaf, LinkPointer, Span};
    use tempfile::TempDir;

    fn create_parts_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("edl")).unwrap();
        fs::create_dir_all(dir.path().join("link")).unwrap();
        fs::create_dir_all(dir.path().join("origin")).unwrap();
        dir
    }

    fn write_part(dir: &TempDir, relative: &str, content: &[u8]) {
        fs::write(dir.path().join(relative), content).unwrap();
    }

    #[test]
    fn memory_cache_serves_inserted_parts() {
        let mut cache = MemoryCache::new();
        cache.insert_edl("doc", Edl::default()).unwrap();
        cache.insert_text("o", "hello world").unwrap();

        let edl = cache.get_part(&EdlPointer::new("doc").into()).unwrap();
        assert_eq!(edl.unwrap().as_edl(), Some(&Edl::default()));

        let text = cache.get_part(&Span::new("o", 0, 5).into()).unwrap().unwrap();
        assert_eq!(text.content.as_text(), Some("hello"));

        assert!(cache.get_part(&EdlPointer::new("missing").into()).unwrap().is_none());
    }

    #[test]
    fn memory_cache_rejects_conflicting_binding() {
        let mut cache = MemoryCache::new();
        cache.insert_text("o", "first").unwrap();
        cache.insert_text("o", "first").unwrap();

        let result = cache.insert_text("o", "second");
        assert!(matches!(result, Err(FetchError::NameConflict(_))));
        assert!(result.unwrap_err().to_string().contains("text:o"));
    }

    #[test]
    fn memory_cache_parts_are_cached() {
        let mut cache = MemoryCache::new();
        cache.insert_text("o", "abc").unwrap();
        assert!(cache.cached_part(&Span::new("o", 0, 1).into()).is_some());
        assert!(cache.cached_part(&Span::new("other", 0, 1).into()).is_none());
    }

    #[test]
    fn directory_fetcher_reads_leaf_parts() {
        let dir = create_parts_dir();
        let edl = Edl::new(None)
            .with_clip(Span::new("greeting", 0, 5))
            .with_link(LinkPointer::new("l1"));
        let json = serde_json::to_vec(&edl.leaf_data().unwrap()).unwrap();
        write_part(&dir, "edl/doc.json", &json);
        write_part(&dir, "origin/greeting", b"hello world");

        let fetcher = DirectoryFetcher::new(dir.path());
        let part = fetcher.get_part(&EdlPointer::new("doc").into()).unwrap();
        assert_eq!(part.unwrap().as_edl(), Some(&edl));

        let text = fetcher
            .get_part(&Span::new("greeting", 6, 5).into())
            .unwrap()
            .unwrap();
        assert_eq!(text.content.as_text(), Some("world"));
    }

    #[test]
    fn directory_fetcher_missing_file_is_absent() {
        let dir = create_parts_dir();
        let fetcher = DirectoryFetcher::new(dir.path());
        let part = fetcher.get_part(&LinkPointer::new("nope").into()).unwrap();
        assert!(part.is_none());
    }

    #[test]
    fn directory_fetcher_keeps_names_inside_their_directory() {
        let outer = TempDir::new().unwrap();
        let root = outer.path().join("parts");
        for sub in ["edl", "link", "origin"] {
            fs::create_dir_all(root.join(sub)).unwrap();
        }
        let json = serde_json::to_vec(&Edl::default().leaf_data().unwrap()).unwrap();
        fs::write(outer.path().join("secret.json"), &json).unwrap();
        fs::write(root.join("link/doc.json"), &json).unwrap();
        fs::write(outer.path().join("passwd"), "root").unwrap();

        let fetcher = DirectoryFetcher::new(&root);
        let escaping: [Pointer; 4] = [
            EdlPointer::new("../../secret").into(),
            EdlPointer::new("../link/doc").into(),
            Span::new("../../passwd", 0, 4).into(),
            Span::new("..", 0, 1).into(),
        ];
        for pointer in &escaping {
            assert!(
                fetcher.get_part(pointer).unwrap().is_none(),
                "{} was read",
                pointer.hashable_name()
            );
        }
    }

    #[test]
    fn directory_fetcher_allows_nested_names() {
        let dir = create_parts_dir();
        fs::create_dir_all(dir.path().join("edl/chapters")).unwrap();
        let json = serde_json::to_vec(&Edl::default().leaf_data().unwrap()).unwrap();
        write_part(&dir, "edl/chapters/one.json", &json);

        let fetcher = DirectoryFetcher::new(dir.path());
        let part = fetcher.get_part(&EdlPointer::new("chapters/./one").into()).unwrap();
        assert_eq!(part.unwrap().as_edl(), Some(&Edl::default()));
    }

    #[test]
    fn directory_fetcher_reports_malformed_part() {
        let dir = create_parts_dir();
        write_part(&dir, "link/bad.json", br#"{"typ": {"typ": "mystery"}, "es": []}"#);

        let fetcher = DirectoryFetcher::new(dir.path());
        let result = fetcher.get_part(&LinkPointer::new("bad").into());
        assert!(matches!(result, Err(FetchError::Format { .. })));
    }

    #[test]
    fn fallback_uses_first_fetcher_that_finds_the_part() {
        let mut empty = MemoryCache::new();
        empty.insert_text("other", "x").unwrap();
        let mut full = MemoryCache::new();
        full.insert_edl("doc", Edl::default()).unwrap();

        let fetcher = FallbackFetcher::new().with_fetcher(empty).with_fetcher(full);
        let part = fetcher.get_part(&EdlPointer::new("doc").into()).unwrap();
        assert!(part.is_some());
        assert!(fetcher.get_part(&EdlPointer::new("none").into()).unwrap().is_none());
    }

    #[test]
    fn fallback_skips_failing_fetcher() {
        let dir = create_parts_dir();
        write_part(&dir, "edl/doc.json", b"not json");
        let mut cache = MemoryCache::new();
        cache.insert_edl("doc", Edl::default()).unwrap();

        let fetcher = FallbackFetcher::new()
            .with_fetcher(DirectoryFetcher::new(dir.path()))
            .with_fetcher(cache);
        let part = fetcher.get_part(&EdlPointer::new("doc").into()).unwrap();
        assert_eq!(part.unwrap().as_edl(), Some(&Edl::default()));
    }

    #[test]
    fn fallback_reports_error_when_nothing_found() {
        let dir = create_parts_dir();
        write_part(&dir, "edl/doc.json", b"not json");

        let fetcher = FallbackFetcher::new().with_fetcher(DirectoryFetcher::new(dir.path()));
        assert!(fetcher.get_part(&EdlPointer::new("doc").into()).is_err());
    }
}
