use super::cell::{NodeCell, Slot};
use super::root::{RootLink, adopt_root};
use super::{Element, ListMemento};
use crate::core::{BoundsPolicy, Result, TreeConfig, TreeError};
use crate::transaction::{TransactionFrame, TransactionToken};
use im::Vector;
use log::trace;
use std::fmt;
use std::sync::{Arc, MutexGuard};

pub(crate) struct ListState {
    pub(crate) children: Vector<Element>,
    /// One frame per open transaction started at this list
    pub(crate) history: Vec<TransactionFrame>,
}

pub(crate) struct ListNode {
    pub(crate) cell: NodeCell<ListState>,
    pub(crate) link: RootLink,
    pub(crate) config: Arc<TreeConfig>,
}

/// Interior element: an ordered sequence of children.
///
/// Cloning a `List` clones the handle, not the node.
#[derive(Clone)]
pub struct List {
    pub(crate) node: Arc<ListNode>,
}

impl List {
    /// Create an empty list that is its own root
    pub fn new() -> Self {
        Self::with_config(TreeConfig::default())
    }

    /// Create an empty root list with its own configuration.
    ///
    /// The configuration applies to every node attached below this list.
    pub fn with_config(config: TreeConfig) -> Self {
        Self {
            node: Arc::new(ListNode {
                cell: NodeCell::new(ListState {
                    children: Vector::new(),
                    history: Vec::new(),
                }),
                link: RootLink::detached(),
                config: Arc::new(config),
            }),
        }
    }

    /// Create an empty list that already belongs to the structure topped by `root`.
    pub fn with_root(root: &Element) -> Self {
        let list = Self::new();
        list.node.link.point_at(&root.root(), &Element::from(&list));
        list
    }

    /// Append `element` and re-root it (and its subtree) under this list's root.
    ///
    /// Inside a transaction holding this list, the attached subtree joins
    /// that transaction; it fails with `TransactionConflict` if another
    /// transaction holds any of it.
    pub fn add(&self, element: impl Into<Element>) -> Result<()> {
        let element = element.into();
        self.check_attachable(&element)?;
        self.enlist(&element)?;

        {
            let mut slot = self.access()?;
            slot.data.children.push_back(element.clone());
        }

        adopt_root(&element, &self.root())?;
        Ok(())
    }

    /// Insert `element` at `index`; `index == len` appends.
    ///
    /// Past the end the call is ignored, or fails with `OutOfRange` when the
    /// tree uses `BoundsPolicy::Strict`.
    pub fn insert(&self, index: usize, element: impl Into<Element>) -> Result<()> {
        let element = element.into();
        let bounds = self.config().bounds;
        self.check_attachable(&element)?;

        let len = self.len()?;
        if index > len {
            return out_of_range(bounds, index, len);
        }
        self.enlist(&element)?;

        {
            let mut slot = self.access()?;
            let len = slot.data.children.len();
            if index > len {
                return out_of_range(bounds, index, len);
            }
            slot.data.children.insert(index, element.clone());
        }

        adopt_root(&element, &self.root())?;
        Ok(())
    }

    /// Detach and return the child at `index`.
    ///
    /// The detached child keeps its own state, including its root link.
    pub fn remove(&self, index: usize) -> Result<Option<Element>> {
        let bounds = self.config().bounds;
        let mut slot = self.access()?;
        let len = slot.data.children.len();
        if index >= len {
            return out_of_range(bounds, index, len).map(|_| None);
        }
        Ok(Some(slot.data.children.remove(index)))
    }

    /// Child at `index`, or `None` when out of range.
    pub fn get(&self, index: usize) -> Result<Option<Element>> {
        let slot = self.access()?;
        Ok(slot.data.children.get(index).cloned())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.access()?.data.children.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Current children, in order
    pub fn children(&self) -> Result<Vec<Element>> {
        let slot = self.access()?;
        Ok(slot.data.children.iter().cloned().collect())
    }

    pub fn print(&self) -> Result<String> {
        crate::print::print(&Element::from(self))
    }

    pub fn root(&self) -> Element {
        self.node.link.resolve(|| Element::from(self))
    }

    pub fn config(&self) -> Arc<TreeConfig> {
        Element::from(self).config()
    }

    /// Snapshot the child sequence. Does not wait for transaction ownership.
    pub fn create_memento(&self) -> Result<ListMemento> {
        let slot = self.node.cell.raw()?;
        Ok(ListMemento::capture(&slot.data.children))
    }

    /// Replace the child sequence with a snapshot and re-root the restored children.
    pub fn set_memento(&self, memento: &ListMemento) -> Result<()> {
        for child in memento.children() {
            self.enlist(child)?;
        }

        {
            let mut slot = self.access()?;
            memento.restore(&mut slot.data.children);
        }

        let root = self.root();
        for child in memento.children() {
            adopt_root(child, &root)?;
        }
        Ok(())
    }

    pub fn active_token(&self) -> Result<Option<TransactionToken>> {
        self.node.cell.owner()
    }

    pub fn ptr_eq(&self, other: &List) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    pub(crate) fn access(&self) -> Result<MutexGuard<'_, Slot<ListState>>> {
        let timeout = self.config().lock_wait_timeout;
        self.node.cell.access(timeout)
    }

    /// Stamp `element` with the transaction holding this list, if any.
    ///
    /// Only the owning thread gets past `access` on a held list, and the
    /// lease stays until that thread commits or rolls back.
    fn enlist(&self, element: &Element) -> Result<()> {
        let lease = self.access()?.lease.clone();
        if let Some(lease) = lease {
            let stamped = lease.enlist(element)?;
            trace!("{} enlisted {} attached node(s)", lease.token, stamped);
        }
        Ok(())
    }

    /// A list may not end up inside its own subtree.
    fn check_attachable(&self, element: &Element) -> Result<()> {
        if element.is_atom() {
            return Ok(());
        }

        let me = Element::from(self);
        if element.subtree()?.iter().any(|node| node.ptr_eq(&me)) {
            return Err(TreeError::Usage(
                "cannot attach a list inside its own subtree".into(),
            ));
        }
        Ok(())
    }
}

impl Default for List {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "List@{:p}", Arc::as_ptr(&self.node))
    }
}

fn out_of_range(bounds: BoundsPolicy, index: usize, len: usize) -> Result<()> {
    match bounds {
        BoundsPolicy::Lenient => {
            trace!("ignoring index {} on list of length {}", index, len);
            Ok(())
        }
        BoundsPolicy::Strict => Err(TreeError::OutOfRange { index, len }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Atom;

    fn values(list: &List) -> Vec<String> {
        list.children()
            .unwrap()
            .iter()
            .map(|child| child.value().unwrap())
            .collect()
    }

    #[test]
    fn test_add_insert_remove() {
        let list = List::new();
        list.add(Atom::new("b")).unwrap();
        list.insert(0, Atom::new("a")).unwrap();
        list.insert(2, Atom::new("d")).unwrap();
        list.insert(2, Atom::new("c")).unwrap();
        assert_eq!(values(&list), ["a", "b", "c", "d"]);

        let removed = list.remove(1).unwrap().unwrap();
        assert_eq!(removed.value().unwrap(), "b");
        assert_eq!(values(&list), ["a", "c", "d"]);
        assert_eq!(list.len().unwrap(), 3);
    }

    #[test]
    fn test_lenient_bounds_are_silent() {
        let list = List::new();
        list.add(Atom::new("a")).unwrap();

        list.insert(5, Atom::new("z")).unwrap();
        assert!(list.remove(3).unwrap().is_none());
        assert_eq!(values(&list), ["a"]);
    }

    #[test]
    fn test_strict_bounds_fail() {
        let list = List::with_config(TreeConfig::new().strict());
        list.add(Atom::new("a")).unwrap();

        let err = list.insert(5, Atom::new("z")).unwrap_err();
        assert!(matches!(err, TreeError::OutOfRange { index: 5, len: 1 }));
        let err = list.remove(1).unwrap_err();
        assert!(matches!(err, TreeError::OutOfRange { index: 1, len: 1 }));

        // appending through insert stays valid
        list.insert(1, Atom::new("b")).unwrap();
        assert_eq!(values(&list), ["a", "b"]);
    }

    #[test]
    fn test_get_out_of_range_is_none() {
        let empty = List::new();
        assert!(empty.get(0).unwrap().is_none());
        assert!(empty.is_empty().unwrap());

        let strict = List::with_config(TreeConfig::new().strict());
        strict.add(Atom::new("a")).unwrap();
        assert!(strict.get(1).unwrap().is_none());
        assert!(strict.get(usize::MAX).unwrap().is_none());
    }

    #[test]
    fn test_cannot_attach_into_own_subtree() {
        let outer = List::new();
        let inner = List::new();
        outer.add(&inner).unwrap();

        assert!(matches!(outer.add(&outer), Err(TreeError::Usage(_))));
        assert!(matches!(inner.add(&outer), Err(TreeError::Usage(_))));
        assert!(matches!(inner.insert(0, &outer), Err(TreeError::Usage(_))));
        assert_eq!(inner.len().unwrap(), 0);
    }

    #[test]
    fn test_set_memento_restores_children_and_roots() {
        let list = List::new();
        let a = Atom::new("a");
        list.add(&a).unwrap();
        let memento = list.create_memento().unwrap();

        list.remove(0).unwrap();
        list.add(Atom::new("b")).unwrap();

        let elsewhere = List::new();
        elsewhere.add(&a).unwrap();
        assert!(a.root().ptr_eq(&Element::from(&elsewhere)));

        list.set_memento(&memento).unwrap();
        assert_eq!(values(&list), ["a"]);
        assert!(a.root().ptr_eq(&Element::from(&list)));
    }
}
