// ============================================================================
// Element Module
// ============================================================================
//
// The tree is a closed union of two node kinds:
// - Atom: leaf holding one text value
// - List: ordered sequence of child elements plus a transaction history
//
// `Atom` and `List` are cheap handles over shared nodes. Operations that only
// make sense for one kind live on that kind's type; the dynamic `Element`
// surface rejects the other kind's operations with `TreeError::Usage`.
//
// ============================================================================

pub mod atom;
pub(crate) mod cell;
pub mod list;
pub mod memento;
pub(crate) mod root;

pub use atom::Atom;
pub use list::List;
pub use memento::{AtomMemento, ListMemento, Memento};

use crate::core::{Result, TreeConfig, TreeError};
use crate::transaction::{Lease, TransactionToken};
use lazy_static::lazy_static;
use root::RootLink;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};

lazy_static! {
    /// Configuration of trees whose root is an atom.
    static ref DEFAULT_CONFIG: Arc<TreeConfig> = Arc::new(TreeConfig::default());
}

/// A node of the tree
#[derive(Clone)]
pub enum Element {
    Atom(Atom),
    List(List),
}

impl Element {
    pub fn is_atom(&self) -> bool {
        matches!(self, Element::Atom(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Element::List(_))
    }

    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Element::Atom(atom) => Some(atom),
            Element::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Element::List(list) => Some(list),
            Element::Atom(_) => None,
        }
    }

    /// Top of the structure this element currently belongs to
    pub fn root(&self) -> Element {
        match self {
            Element::Atom(atom) => atom.root(),
            Element::List(list) => list.root(),
        }
    }

    /// Render the element and everything below it
    pub fn print(&self) -> Result<String> {
        crate::print::print(self)
    }

    /// Value of an atom. Lists have no scalar value.
    pub fn value(&self) -> Result<String> {
        match self {
            Element::Atom(atom) => atom.value(),
            Element::List(_) => Err(TreeError::Usage("a list has no value".into())),
        }
    }

    /// Child at `index` of a list. Atoms have no children.
    pub fn get(&self, index: usize) -> Result<Option<Element>> {
        match self {
            Element::List(list) => list.get(index),
            Element::Atom(_) => Err(TreeError::Usage("an atom cannot be indexed".into())),
        }
    }

    pub fn create_memento(&self) -> Result<Memento> {
        match self {
            Element::Atom(atom) => Ok(Memento::Atom(atom.create_memento()?)),
            Element::List(list) => Ok(Memento::List(list.create_memento()?)),
        }
    }

    pub fn set_memento(&self, memento: &Memento) -> Result<()> {
        match (self, memento) {
            (Element::Atom(atom), Memento::Atom(m)) => atom.set_memento(m),
            (Element::List(list), Memento::List(m)) => list.set_memento(m),
            (_, other) => Err(TreeError::Usage(format!(
                "cannot restore a {} memento into {}",
                other.kind(),
                self.kind()
            ))),
        }
    }

    /// Transaction currently holding this node, if any
    pub fn active_token(&self) -> Result<Option<TransactionToken>> {
        match self {
            Element::Atom(atom) => atom.active_token(),
            Element::List(list) => list.active_token(),
        }
    }

    pub fn is_locked(&self) -> Result<bool> {
        Ok(self.active_token()?.is_some())
    }

    /// Configuration in force for this element: its root's.
    pub fn config(&self) -> Arc<TreeConfig> {
        self.root().own_config()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Element) -> bool {
        self.addr() == other.addr()
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Element::Atom(_) => "atom",
            Element::List(_) => "list",
        }
    }

    pub(crate) fn addr(&self) -> usize {
        match self {
            Element::Atom(atom) => Arc::as_ptr(&atom.node) as *const () as usize,
            Element::List(list) => Arc::as_ptr(&list.node) as *const () as usize,
        }
    }

    pub(crate) fn downgrade(&self) -> WeakElement {
        match self {
            Element::Atom(atom) => WeakElement::Atom(Arc::downgrade(&atom.node)),
            Element::List(list) => WeakElement::List(Arc::downgrade(&list.node)),
        }
    }

    pub(crate) fn link(&self) -> &RootLink {
        match self {
            Element::Atom(atom) => &atom.node.link,
            Element::List(list) => &list.node.link,
        }
    }

    fn own_config(&self) -> Arc<TreeConfig> {
        match self {
            Element::Atom(_) => Arc::clone(&DEFAULT_CONFIG),
            Element::List(list) => Arc::clone(&list.node.config),
        }
    }

    /// Children as seen right now, ignoring transaction ownership.
    pub(crate) fn children_raw(&self) -> Result<Vec<Element>> {
        match self {
            Element::Atom(_) => Ok(Vec::new()),
            Element::List(list) => Ok(list.node.cell.raw()?.data.children.iter().cloned().collect()),
        }
    }

    /// Every node reachable from this one, pre-order, each node once.
    pub(crate) fn subtree(&self) -> Result<Vec<Element>> {
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        let mut pending = vec![self.clone()];

        while let Some(node) = pending.pop() {
            if !seen.insert(node.addr()) {
                continue;
            }
            let children = node.children_raw()?;
            pending.extend(children.into_iter().rev());
            nodes.push(node);
        }
        Ok(nodes)
    }

    /// Stamp `lease` on this node for the lock walk.
    ///
    /// Returns the children to descend into, or `None` when the node already
    /// carries the lease.
    pub(crate) fn claim(&self, lease: &Lease) -> Result<Option<Vec<Element>>> {
        use cell::Claim;

        match self {
            Element::Atom(atom) => match atom.node.cell.claim(lease)? {
                Claim::Acquired(_) => Ok(Some(Vec::new())),
                Claim::AlreadyHeld => Ok(None),
            },
            Element::List(list) => match list.node.cell.claim(lease)? {
                Claim::Acquired(slot) => Ok(Some(slot.data.children.iter().cloned().collect())),
                Claim::AlreadyHeld => Ok(None),
            },
        }
    }

    pub(crate) fn release(&self, token: TransactionToken) -> Result<bool> {
        match self {
            Element::Atom(atom) => atom.node.cell.release(token),
            Element::List(list) => list.node.cell.release(token),
        }
    }
}

impl From<Atom> for Element {
    fn from(atom: Atom) -> Self {
        Element::Atom(atom)
    }
}

impl From<List> for Element {
    fn from(list: List) -> Self {
        Element::List(list)
    }
}

impl From<&Atom> for Element {
    fn from(atom: &Atom) -> Self {
        Element::Atom(atom.clone())
    }
}

impl From<&List> for Element {
    fn from(list: &List) -> Self {
        Element::List(list.clone())
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Atom(atom) => fmt::Debug::fmt(atom, f),
            Element::List(list) => fmt::Debug::fmt(list, f),
        }
    }
}

/// Non-owning counterpart of `Element`
#[derive(Clone)]
pub(crate) enum WeakElement {
    Atom(Weak<atom::AtomNode>),
    List(Weak<list::ListNode>),
}

impl WeakElement {
    pub(crate) fn upgrade(&self) -> Option<Element> {
        match self {
            WeakElement::Atom(weak) => weak.upgrade().map(|node| Element::Atom(Atom { node })),
            WeakElement::List(weak) => weak.upgrade().map(|node| Element::List(List { node })),
        }
    }
}
