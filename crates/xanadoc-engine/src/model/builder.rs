use std::collections::{HashMap, HashSet};

use crate::io::{FetchError, PartFetcher};
use crate::markup::{MarkupResolver, Rule};
use crate::parts::{Edl, Link, PartContent};
use crate::pointers::{EdlPointer, LinkPointer, Pointer};
use crate::sequences::{SequencePrototype, SequenceScanner, Signature};

use super::types::{self, MARKUP, MetalinkKind, TypeResolver};
use super::zettel_schneider::{covering_pointers, slice_clip};
use super::{
    ContentId, DocumentModel, DocumentModelLink, EdlId, EdlModel, LinkId, ObjectId, Zettel,
};

/// Document-wide links applied to every EDL of a build, below its own.
#[derive(Debug, Clone, Default)]
pub struct Defaults {
    links: Vec<(LinkPointer, Link)>,
}

impl Defaults {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_links(links: Vec<(LinkPointer, Link)>) -> Self {
        Self { links }
    }

    /// Loads the links of a defaults EDL. A missing EDL yields no defaults.
    pub fn resolve(fetcher: &dyn PartFetcher, edl: &EdlPointer) -> Result<Self, FetchError> {
        let Some(PartContent::Edl(defaults)) =
            fetcher.get_part(&edl.clone().into())?.map(|part| part.content)
        else {
            log::warn!("Defaults EDL {} is missing; building without defaults", edl.name);
            return Ok(Self::none());
        };

        let mut links = Vec::with_capacity(defaults.links.len());
        for pointer in defaults.links {
            match fetch_link(fetcher, &pointer)? {
                Some(link) => links.push((pointer, link)),
                None => log::warn!("Default link {} is missing", pointer.name),
            }
        }
        Ok(Self { links })
    }

    pub fn links(&self) -> &[(LinkPointer, Link)] {
        &self.links
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Builds a [`DocumentModel`] for an EDL.
pub struct DocumentModelBuilder<'a> {
    fetcher: &'a dyn PartFetcher,
    defaults: &'a Defaults,
}

impl<'a> DocumentModelBuilder<'a> {
    pub fn new(fetcher: &'a dyn PartFetcher, defaults: &'a Defaults) -> Self {
        Self { fetcher, defaults }
    }

    /// Builds the hierarchy of `root` and resolves its markup.
    ///
    /// Missing parts degrade to stand-ins; only fetch failures are errors.
    pub fn build(&self, root: &EdlPointer) -> Result<DocumentModel, FetchError> {
        let mut state = BuildState {
            fetcher: self.fetcher,
            defaults: self.defaults,
            types: TypeResolver::new(self.fetcher),
            model: DocumentModel::empty(),
        };
        let tree = EdlBuilder::build_hierarchy(&mut state, root, None, "0".to_string())?;
        let mut model = state.model;
        model.root = tree.edl;

        let resolved = {
            let mut resolver = MarkupResolver::new(&model);
            tree.add_markup(&mut resolver);
            resolver.finish()
        };
        model.apply_markup(resolved);
        log::info!(
            "Built model for {}: {} EDLs, {} links, {} zettel, {} sequences",
            root.name,
            model.edls.len(),
            model.links.len(),
            model.zettel.len(),
            model.sequences.len()
        );
        Ok(model)
    }
}

struct BuildState<'a> {
    fetcher: &'a dyn PartFetcher,
    defaults: &'a Defaults,
    types: TypeResolver<'a>,
    model: DocumentModel,
}

/// A link entering an EDL's scope before it is placed in the arena.
struct ScopedLink {
    pointer: LinkPointer,
    link: Link,
    depth: usize,
    is_default: bool,
}

/// The hierarchy of EDLs built so far, driving the markup pass.
struct EdlBuilder {
    edl: EdlId,
    children: Vec<EdlBuilder>,
}

impl EdlBuilder {
    fn build_hierarchy(
        state: &mut BuildState<'_>,
        pointer: &EdlPointer,
        parent: Option<EdlId>,
        key: String,
    ) -> Result<EdlBuilder, FetchError> {
        log::debug!("Building EDL {} at {key}", pointer.name);

        let (edl, is_missing) = if is_ancestor(&state.model, parent, pointer) {
            log::warn!("EDL {} contains itself; cutting the cycle at {key}", pointer.name);
            (types::missing_edl(), true)
        } else {
            match state.fetcher.get_part(&pointer.clone().into())? {
                Some(part) => match part.content {
                    PartContent::Edl(edl) => (edl, false),
                    _ => {
                        log::warn!("Part for EDL {} is not an EDL", pointer.name);
                        (types::missing_edl(), true)
                    }
                },
                None => {
                    log::warn!("EDL {} is missing", pointer.name);
                    (types::missing_edl(), true)
                }
            }
        };

        let id = state.model.push_edl(EdlModel::new(
            pointer.clone(),
            edl.clone(),
            is_missing,
            key.clone(),
            parent,
        ));

        let links = Self::resolve_links(state, id, &edl, parent, &key)?;
        connect_links(&mut state.model, &links);

        let scope: Vec<(LinkId, &Link)> = links
            .iter()
            .map(|&link| (link, &state.model.link(link).link))
            .collect();
        let incoming = covering_pointers(&pointer.clone().into(), &scope);
        let markup_rules: Vec<LinkId> = links
            .iter()
            .copied()
            .filter(|&link| state.model.link(link).markup_rule.is_some())
            .collect();
        let edl_model = state.model.edl_mut(id);
        edl_model.incoming_pointers = incoming;
        edl_model.markup_rules = markup_rules;

        let mut content = Vec::new();
        let mut children = Vec::new();
        for (clip_index, clip) in edl.clips.iter().enumerate() {
            if let Pointer::Edl(child) = clip {
                let child_key = format!("{key}:{clip_index}");
                let child = Self::build_hierarchy(state, child, Some(id), child_key)?;
                content.push(ContentId::Edl(child.edl));
                children.push(child);
                continue;
            }

            let fragments = {
                let scope: Vec<(LinkId, &Link)> = links
                    .iter()
                    .map(|&link| (link, &state.model.link(link).link))
                    .collect();
                slice_clip(clip, &scope)
            };
            for (n, fragment) in fragments.into_iter().enumerate() {
                let cached = state.fetcher.cached_part(&fragment.pointer);
                let zettel = state.model.push_zettel(Zettel {
                    pointer: fragment.pointer,
                    edl: id,
                    key: format!("{key}:{clip_index}.{n}"),
                    clip_index,
                    incoming_pointers: fragment.incoming_pointers,
                    sequences: Vec::new(),
                    content: cached.map(|part| part.content),
                    markup: Default::default(),
                    content_markup: Default::default(),
                });
                content.push(ContentId::Zettel(zettel));
            }
        }
        state.model.edl_mut(id).content = content;

        let sequences = SequenceScanner::new(id).scan(&mut state.model);
        log::debug!("EDL {key} has {} sequences", sequences.len());

        Ok(EdlBuilder { edl: id, children })
    }

    /// Places the EDL's own links, its parent's inherited links and the
    /// defaults in the arena, first occurrence of a name winning.
    fn resolve_links(
        state: &mut BuildState<'_>,
        id: EdlId,
        edl: &Edl,
        parent: Option<EdlId>,
        key: &str,
    ) -> Result<Vec<LinkId>, FetchError> {
        let mut scoped = Vec::new();
        for pointer in &edl.links {
            let link = match fetch_link(state.fetcher, pointer)? {
                Some(link) => link,
                None => {
                    log::warn!("Link {} of EDL {key} is missing", pointer.name);
                    types::missing_link()
                }
            };
            scoped.push(ScopedLink {
                pointer: pointer.clone(),
                link,
                depth: 0,
                is_default: false,
            });
        }
        if let Some(parent) = parent {
            for &inherited in &state.model.edl(parent).links {
                let inherited = state.model.link(inherited);
                if !inherited.is_default {
                    scoped.push(ScopedLink {
                        pointer: inherited.pointer.clone(),
                        link: inherited.link.clone(),
                        depth: inherited.depth + 1,
                        is_default: false,
                    });
                }
            }
        }
        for (pointer, link) in state.defaults.links() {
            scoped.push(ScopedLink {
                pointer: pointer.clone(),
                link: link.clone(),
                depth: 0,
                is_default: true,
            });
        }

        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        let mut names = HashMap::new();
        for scoped in scoped {
            let name = scoped.pointer.hashable_name();
            if !seen.insert(name.clone()) {
                continue;
            }
            let index = ids.len();
            let link_id = LinkId(state.model.links.len());
            let decorated = decorate(state, scoped, id, link_id, index, key)?;
            state.model.push_link(decorated);
            ids.push(link_id);
            names.insert(name, link_id);
        }
        state.model.edl_mut(id).set_links(ids.clone(), names);
        Ok(ids)
    }

    fn add_markup(&self, resolver: &mut MarkupResolver<'_>) {
        let model = resolver.model();
        let edl = model.edl(self.edl);
        resolver.resolve(ObjectId::Edl(self.edl));
        for &link in &edl.links {
            resolver.resolve(ObjectId::Link(link));
        }
        for &sequence in &edl.sequences {
            resolver.resolve(ObjectId::Sequence(sequence));
        }
        for zettel in model.zettel_of(self.edl) {
            resolver.resolve(ObjectId::Zettel(zettel));
        }
        for child in &self.children {
            child.add_markup(resolver);
        }
    }
}

fn decorate(
    state: &mut BuildState<'_>,
    scoped: ScopedLink,
    edl: EdlId,
    id: LinkId,
    index: usize,
    key: &str,
) -> Result<DocumentModelLink, FetchError> {
    let metalinks = state.types.metalinks(&scoped.link.link_type)?;

    let mut sequence_prototypes = Vec::with_capacity(scoped.link.ends.len());
    let mut semantic_classes = Vec::with_capacity(scoped.link.ends.len());
    for (end_index, end) in scoped.link.ends.iter().enumerate() {
        let mut prototypes = Vec::new();
        let mut classes: Vec<Pointer> = Vec::new();
        for metalink in metalinks.iter().filter(|m| m.applies_to(end)) {
            match &metalink.kind {
                MetalinkKind::DefinesSequence { sequence_type } => {
                    prototypes.push(SequencePrototype {
                        sequence_type: sequence_type.clone(),
                        end: end_index,
                        defining_link: scoped.pointer.clone(),
                        link: id,
                        signature: Signature {
                            defining_link: scoped.pointer.clone(),
                            metalink: metalink.pointer.clone(),
                            end: end_index,
                        },
                    });
                }
                MetalinkKind::DefinesSemanticClass { class } => {
                    if !classes.iter().any(|c| c.denotes_same(class)) {
                        classes.push(class.clone());
                    }
                }
            }
        }
        sequence_prototypes.push(prototypes);
        semantic_classes.push(classes);
    }

    let markup_rule = scoped
        .link
        .has_type(MARKUP)
        .then(|| Rule::from_link(&scoped.link));

    Ok(DocumentModelLink {
        pointer: scoped.pointer,
        link: scoped.link,
        edl,
        key: format!("{key}#{index}"),
        index,
        depth: scoped.depth,
        is_default: scoped.is_default,
        incoming_pointers: Vec::new(),
        sequence_prototypes,
        semantic_classes,
        markup_rule,
        markup: Default::default(),
        content_markup: Default::default(),
    })
}

/// Records, on every link in scope, the ends of other links pointing at it.
fn connect_links(model: &mut DocumentModel, links: &[LinkId]) {
    for &target in links {
        let target_pointer = Pointer::Link(model.link(target).pointer.clone());
        let others: Vec<(LinkId, &Link)> = links
            .iter()
            .copied()
            .filter(|&source| source != target)
            .map(|source| (source, &model.link(source).link))
            .collect();
        let incoming = covering_pointers(&target_pointer, &others);
        model.link_mut(target).incoming_pointers = incoming;
    }
}

fn is_ancestor(model: &DocumentModel, mut parent: Option<EdlId>, pointer: &EdlPointer) -> bool {
    while let Some(id) = parent {
        let edl = model.edl(id);
        if edl.pointer == *pointer && !edl.is_missing {
            return true;
        }
        parent = edl.parent;
    }
    false
}

fn fetch_link(
    fetcher: &dyn PartFetcher,
    pointer: &LinkPointer,
) -> Result<Option<Link>, FetchError> {
    Ok(fetcher
        .get_part(&pointer.clone().into())?
        .and_then(|part| match part.content {
            PartContent::Link(link) => Some(link),
            _ => None,
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryCache;
    use crate::model::types::{sequence_metalink, type_link};
    use crate::pointers::Span;
    use pretty_assertions::assert_eq;

    fn build(cache: &MemoryCache, root: &str) -> DocumentModel {
        DocumentModelBuilder::new(cache, &Defaults::none())
            .build(&EdlPointer::new(root))
            .unwrap()
    }

    #[test]
    fn missing_root_is_a_stand_in() {
        let model = build(&MemoryCache::new(), "nowhere");
        let root = model.root_edl();
        assert!(root.is_missing);
        assert!(root.content.is_empty());
        assert_eq!(
            root.edl_type(),
            Some(&Pointer::from(LinkPointer::new(types::MISSING_EDL)))
        );
    }

    #[test]
    fn missing_link_is_a_placeholder() {
        let mut cache = MemoryCache::new();
        cache
            .insert_edl("doc", Edl::new(None).with_link(LinkPointer::new("gone")))
            .unwrap();

        let model = build(&cache, "doc");

        let link = model.link(model.root_edl().links[0]);
        assert!(link.link.has_type(types::MISSING_LINK));
        assert!(link.link.ends.is_empty());
    }

    #[test]
    fn child_edls_inherit_parent_links_one_level_deeper() {
        // Given a parent with one link and a child with its own link
        let mut cache = MemoryCache::new();
        cache
            .insert_edl(
                "parent",
                Edl::new(None)
                    .with_clip(EdlPointer::new("child"))
                    .with_link(LinkPointer::new("p")),
            )
            .unwrap();
        cache
            .insert_edl("child", Edl::new(None).with_link(LinkPointer::new("c")))
            .unwrap();
        cache.insert_link("p", Link::new(LinkPointer::new("t"))).unwrap();
        cache.insert_link("c", Link::new(LinkPointer::new("t"))).unwrap();

        // When building
        let model = build(&cache, "parent");

        // Then the child sees its own link first and the parent's at depth 1
        let child = model.edl(model.children_of(model.root()).next().unwrap());
        assert_eq!(child.key, "0:0");
        let scope: Vec<(String, usize, usize)> = child
            .links
            .iter()
            .map(|&id| {
                let link = model.link(id);
                (link.pointer.name.clone(), link.depth, link.index)
            })
            .collect();
        assert_eq!(
            scope,
            vec![("c".to_string(), 0, 0), ("p".to_string(), 1, 1)]
        );
    }

    #[test]
    fn defaults_come_last_and_never_shadow_own_links() {
        let mut cache = MemoryCache::new();
        cache
            .insert_edl("doc", Edl::new(None).with_link(LinkPointer::new("shared")))
            .unwrap();
        cache.insert_link("shared", Link::new(LinkPointer::new("own"))).unwrap();
        let defaults = Defaults::from_links(vec![
            (LinkPointer::new("shared"), Link::new(LinkPointer::new("default"))),
            (LinkPointer::new("extra"), Link::new(LinkPointer::new("default"))),
        ]);

        let model = DocumentModelBuilder::new(&cache, &defaults)
            .build(&EdlPointer::new("doc"))
            .unwrap();

        let links: Vec<(String, bool)> = model
            .root_edl()
            .links
            .iter()
            .map(|&id| (model.link(id).pointer.name.clone(), model.link(id).is_default))
            .collect();
        assert_eq!(
            links,
            vec![("shared".to_string(), false), ("extra".to_string(), true)]
        );
        assert!(model.link(model.root_edl().links[0]).link.has_type("own"));
    }

    #[test]
    fn links_pointing_at_links_are_connected() {
        let mut cache = MemoryCache::new();
        cache
            .insert_edl(
                "doc",
                Edl::new(None)
                    .with_link(LinkPointer::new("a"))
                    .with_link(LinkPointer::new("b")),
            )
            .unwrap();
        cache
            .insert_link(
                "a",
                Link::new(LinkPointer::new("t"))
                    .with_end(Some("about"), vec![LinkPointer::new("b").into()]),
            )
            .unwrap();
        cache.insert_link("b", Link::new(LinkPointer::new("t"))).unwrap();

        let model = build(&cache, "doc");

        let [a, b] = model.root_edl().links[..] else {
            panic!("expected two links");
        };
        assert!(model.link(a).incoming_pointers.is_empty());
        assert_eq!(model.link(b).incoming_pointers.len(), 1);
        assert_eq!(model.link(b).incoming_pointers[0].link, a);
    }

    #[test]
    fn self_including_edl_stops() {
        let mut cache = MemoryCache::new();
        cache
            .insert_edl("loop", Edl::new(None).with_clip(EdlPointer::new("loop")))
            .unwrap();

        let model = build(&cache, "loop");

        let child = model.edl(model.children_of(model.root()).next().unwrap());
        assert!(child.is_missing);
        assert_eq!(model.edl_ids().count(), 2);
    }

    #[test]
    fn sequence_prototypes_come_from_type_metalinks() {
        let mut cache = MemoryCache::new();
        cache.insert_link("list", type_link(&[LinkPointer::new("m")])).unwrap();
        cache.insert_link("m", sequence_metalink(Some("items"), None)).unwrap();
        cache
            .insert_link(
                "l",
                Link::new(LinkPointer::new("list"))
                    .with_end(Some("title"), vec![])
                    .with_end(Some("items"), vec![Span::new("o", 0, 1).into()]),
            )
            .unwrap();
        cache
            .insert_edl("doc", Edl::new(None).with_link(LinkPointer::new("l")))
            .unwrap();

        let model = build(&cache, "doc");

        let link = model.link(model.root_edl().links[0]);
        assert!(link.sequence_prototypes[0].is_empty());
        assert_eq!(link.sequence_prototypes[1].len(), 1);
        assert_eq!(link.sequence_prototypes[1][0].signature.metalink, LinkPointer::new("m"));
    }

    #[test]
    fn defaults_resolve_from_an_edl() {
        let mut cache = MemoryCache::new();
        cache
            .insert_edl(
                "defaults",
                Edl::new(None)
                    .with_link(LinkPointer::new("d1"))
                    .with_link(LinkPointer::new("absent")),
            )
            .unwrap();
        cache.insert_link("d1", Link::new(LinkPointer::new(MARKUP))).unwrap();

        let defaults = Defaults::resolve(&cache, &EdlPointer::new("defaults")).unwrap();

        assert_eq!(defaults.links().len(), 1);
        assert_eq!(defaults.links()[0].0, LinkPointer::new("d1"));
        assert!(Defaults::resolve(&cache, &EdlPointer::new("nope")).unwrap().is_empty());
    }
}
