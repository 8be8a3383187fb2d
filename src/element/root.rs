// ============================================================================
// Root Linkage
// ============================================================================
//
// Every node keeps a non-owning link to the top of the structure it was last
// attached to. A node that was never attached is its own root; that case is
// stored as an empty link rather than a weak self-reference.
//
// ============================================================================

use super::{Element, WeakElement};
use crate::core::Result;
use log::trace;
use std::sync::{PoisonError, RwLock};

pub(crate) struct RootLink {
    target: RwLock<Option<WeakElement>>,
}

impl RootLink {
    pub(crate) fn detached() -> Self {
        Self {
            target: RwLock::new(None),
        }
    }

    /// Resolve the root, falling back to `this` when the node is self-rooted
    /// or its recorded root has already been dropped.
    pub(crate) fn resolve(&self, this: impl FnOnce() -> Element) -> Element {
        // The link is a plain pointer swap; a poisoned lock still holds a valid value.
        let target = self.target.read().unwrap_or_else(PoisonError::into_inner);
        match target.as_ref().and_then(WeakElement::upgrade) {
            Some(root) => root,
            None => this(),
        }
    }

    pub(crate) fn point_at(&self, root: &Element, this: &Element) {
        let mut target = self.target.write().unwrap_or_else(PoisonError::into_inner);
        *target = if root.ptr_eq(this) {
            None
        } else {
            Some(root.downgrade())
        };
    }

    #[cfg(test)]
    pub(crate) fn is_self_rooted(&self) -> bool {
        let target = self.target.read().unwrap_or_else(PoisonError::into_inner);
        target.as_ref().and_then(WeakElement::upgrade).is_none()
    }
}

/// Point `subtree` and every node reachable from it at `root`.
pub(crate) fn adopt_root(subtree: &Element, root: &Element) -> Result<usize> {
    let nodes = subtree.subtree()?;
    for node in &nodes {
        node.link().point_at(root, node);
    }
    trace!("re-rooted {} node(s) under {:?}", nodes.len(), root);
    Ok(nodes.len())
}
