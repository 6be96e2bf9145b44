//! Level scopes: how deeply an object is nested in containers of a class.

use std::collections::HashSet;

use crate::model::{DocumentModel, ObjectId};
use crate::pointers::Pointer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nesting {
    /// Containers walked to reach the nearest one carrying the class.
    pub distance: usize,
    /// Containers carrying the class along the deepest chain.
    pub depth: usize,
}

impl Nesting {
    fn combine(self, other: Nesting) -> Nesting {
        Nesting {
            distance: self.distance.min(other.distance),
            depth: self.depth.max(other.depth),
        }
    }
}

/// Nesting of `target` inside containers with semantic class `class`, or
/// `None` if no container carries it.
pub fn nesting(model: &DocumentModel, target: ObjectId, class: &Pointer) -> Option<Nesting> {
    walk(model, target, class, &mut HashSet::new())
}

fn walk(
    model: &DocumentModel,
    object: ObjectId,
    class: &Pointer,
    path: &mut HashSet<ObjectId>,
) -> Option<Nesting> {
    if !path.insert(object) {
        return None;
    }
    let mut best: Option<Nesting> = None;
    for container in model.containers(object) {
        let carries = model
            .semantic_classes(container)
            .iter()
            .any(|c| c.denotes_same(class));
        let above = walk(model, container, class, path);
        let candidate = match (carries, above) {
            (true, above) => Some(Nesting {
                distance: 1,
                depth: 1 + above.map_or(0, |n| n.depth),
            }),
            (false, Some(above)) => Some(Nesting {
                distance: above.distance + 1,
                depth: above.depth,
            }),
            (false, None) => None,
        };
        best = match (best, candidate) {
            (Some(a), Some(b)) => Some(a.combine(b)),
            (a, b) => a.or(b),
        };
    }
    path.remove(&object);
    best
}
