// ============================================================================
// Recursive Lock Walk
// ============================================================================
//
// Stamps a transaction lease on a node and every descendant, depth-first
// pre-order (parent before children, children in index order). The walk never
// waits: a node owned by another transaction aborts it, and every node
// stamped by that walk is released before the error is returned.
//
// Each stamped node carries the lease, so nodes attached later under a
// stamped list can be enlisted into the same transaction. The lease records
// the exact set of stamped nodes; release touches those nodes and only those,
// whatever happens to the tree shape in between.
//
// ============================================================================

use super::TransactionToken;
use crate::core::Result;
use crate::element::{Element, WeakElement};
use log::{trace, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A transaction's claim on nodes: its token plus the shared record of
/// every node stamped under it.
#[derive(Clone)]
pub(crate) struct Lease {
    pub(crate) token: TransactionToken,
    nodes: Arc<Mutex<Vec<WeakElement>>>,
}

impl Lease {
    pub(crate) fn new(token: TransactionToken) -> Self {
        Self {
            token,
            nodes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn nodes(&self) -> MutexGuard<'_, Vec<WeakElement>> {
        // Only pushes and drains happen under this lock.
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stamp `start` and everything reachable from it with this lease.
    ///
    /// Nodes already carrying the lease are skipped. On conflict only the
    /// nodes stamped by this call are released.
    pub(crate) fn enlist(&self, start: &Element) -> Result<usize> {
        let mut stamped = Vec::new();
        let mut pending = vec![start.clone()];

        while let Some(node) = pending.pop() {
            match node.claim(self) {
                Ok(Some(children)) => {
                    stamped.push(node.downgrade());
                    pending.extend(children.into_iter().rev());
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        "{} aborted its lock walk at {:?}: {}; releasing {} node(s)",
                        self.token,
                        node,
                        err,
                        stamped.len()
                    );
                    release_all(self.token, stamped)?;
                    return Err(err);
                }
            }
        }

        let count = stamped.len();
        self.nodes().extend(stamped);
        Ok(count)
    }
}

/// Nodes stamped under one transaction, released on `release` or drop
pub(crate) struct LockedSet {
    lease: Lease,
}

impl LockedSet {
    pub(crate) fn len(&self) -> usize {
        self.lease.nodes().len()
    }

    /// Clear the token from every recorded node still alive.
    ///
    /// Keeps going past failures and reports the first one.
    pub(crate) fn release(&mut self) -> Result<()> {
        let nodes: Vec<_> = self.lease.nodes().drain(..).collect();
        release_all(self.lease.token, nodes)
    }

    #[cfg(test)]
    fn order(&self) -> Vec<Element> {
        self.lease.nodes().iter().filter_map(WeakElement::upgrade).collect()
    }
}

impl Drop for LockedSet {
    fn drop(&mut self) {
        let remaining = self.len();
        if remaining == 0 {
            return;
        }
        trace!("{} dropped with {} node(s) still stamped", self.lease.token, remaining);
        if let Err(err) = self.release() {
            warn!("{} could not release its nodes on drop: {}", self.lease.token, err);
        }
    }
}

fn release_all(token: TransactionToken, nodes: Vec<WeakElement>) -> Result<()> {
    let mut first_error = None;

    for node in nodes {
        let Some(node) = node.upgrade() else {
            continue;
        };
        if let Err(err) = node.release(token) {
            warn!("{} failed to release {:?}: {}", token, node, err);
            first_error.get_or_insert(err);
        }
    }

    first_error.map_or(Ok(()), Err)
}

/// Stamp `token` on `start` and everything reachable from it.
pub(crate) fn lock_subtree(start: &Element, token: TransactionToken) -> Result<LockedSet> {
    let lease = Lease::new(token);
    let count = lease.enlist(start)?;

    trace!("{} stamped {} node(s)", token, count);
    Ok(LockedSet { lease })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TreeError;
    use crate::element::{Atom, List};

    fn sample() -> (List, List, Atom) {
        let top = List::new();
        let inner = List::new();
        let leaf = Atom::new("leaf");
        inner.add(&leaf).unwrap();
        top.add(Atom::new("a")).unwrap();
        top.add(&inner).unwrap();
        (top, inner, leaf)
    }

    #[test]
    fn test_walk_stamps_every_node() {
        let (top, inner, leaf) = sample();
        let token = TransactionToken::mint();

        let mut locked = lock_subtree(&Element::from(&top), token).unwrap();
        assert_eq!(locked.len(), 4);
        assert_eq!(inner.active_token().unwrap(), Some(token));
        assert_eq!(leaf.active_token().unwrap(), Some(token));

        locked.release().unwrap();
        assert_eq!(locked.len(), 0);
        assert!(top.active_token().unwrap().is_none());
        assert!(leaf.active_token().unwrap().is_none());
    }

    #[test]
    fn test_walk_is_preorder_in_index_order() {
        let top = List::new();
        let first = List::new();
        let second = Atom::new("second");
        let nested = Atom::new("nested");
        let last = List::new();
        first.add(&nested).unwrap();
        top.add(&first).unwrap();
        top.add(&second).unwrap();
        top.add(&last).unwrap();

        let locked = lock_subtree(&Element::from(&top), TransactionToken::mint()).unwrap();
        let expected = [
            Element::from(&top),
            Element::from(&first),
            Element::from(&nested),
            Element::from(&second),
            Element::from(&last),
        ];

        let order = locked.order();
        assert_eq!(order.len(), expected.len());
        for (seen, want) in order.iter().zip(expected.iter()) {
            assert!(seen.ptr_eq(want), "expected {:?}, walked {:?}", want, seen);
        }
    }

    #[test]
    fn test_conflict_unwinds_partial_walk() {
        let (top, inner, leaf) = sample();
        let holder = TransactionToken::mint();
        let _held = lock_subtree(&Element::from(&leaf), holder).unwrap();

        let token = TransactionToken::mint();
        let err = lock_subtree(&Element::from(&top), token).err().unwrap();
        assert!(matches!(err, TreeError::TransactionConflict(t) if t == holder));

        assert!(top.active_token().unwrap().is_none());
        assert!(inner.active_token().unwrap().is_none());
        assert_eq!(leaf.active_token().unwrap(), Some(holder));
    }

    #[test]
    fn test_enlist_extends_the_locked_set() {
        let (top, _inner, _leaf) = sample();
        let token = TransactionToken::mint();
        let mut locked = lock_subtree(&Element::from(&top), token).unwrap();

        let extra = List::new();
        let extra_leaf = Atom::new("x");
        extra.add(&extra_leaf).unwrap();

        assert_eq!(locked.lease.enlist(&Element::from(&extra)).unwrap(), 2);
        // a second pass finds everything already stamped
        assert_eq!(locked.lease.enlist(&Element::from(&extra)).unwrap(), 0);
        assert_eq!(locked.len(), 6);
        assert_eq!(extra_leaf.active_token().unwrap(), Some(token));

        locked.release().unwrap();
        assert!(extra.active_token().unwrap().is_none());
        assert!(extra_leaf.active_token().unwrap().is_none());
    }

    #[test]
    fn test_enlist_conflict_keeps_existing_stamps() {
        let (top, inner, _leaf) = sample();
        let token = TransactionToken::mint();
        let locked = lock_subtree(&Element::from(&top), token).unwrap();

        let foreign = List::new();
        let taken = Atom::new("taken");
        foreign.add(&taken).unwrap();
        let holder = TransactionToken::mint();
        let _held = lock_subtree(&Element::from(&taken), holder).unwrap();

        let err = locked.lease.enlist(&Element::from(&foreign)).unwrap_err();
        assert!(matches!(err, TreeError::TransactionConflict(t) if t == holder));
        assert!(foreign.active_token().unwrap().is_none());
        assert_eq!(inner.active_token().unwrap(), Some(token));
        assert_eq!(locked.len(), 4);
    }

    #[test]
    fn test_drop_releases_remaining_nodes() {
        let (top, _inner, leaf) = sample();
        let token = TransactionToken::mint();
        {
            let _locked = lock_subtree(&Element::from(&top), token).unwrap();
            assert!(leaf.active_token().unwrap().is_some());
        }
        assert!(leaf.active_token().unwrap().is_none());
    }
}
