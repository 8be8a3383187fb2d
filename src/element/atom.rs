use super::cell::NodeCell;
use super::root::RootLink;
use super::{AtomMemento, Element};
use crate::core::Result;
use crate::transaction::TransactionToken;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct AtomNode {
    pub(crate) cell: NodeCell<String>,
    pub(crate) link: RootLink,
}

/// Leaf element holding one text value, printed verbatim.
#[derive(Clone)]
pub struct Atom {
    pub(crate) node: Arc<AtomNode>,
}

impl Atom {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            node: Arc::new(AtomNode {
                cell: NodeCell::new(value.into()),
                link: RootLink::detached(),
            }),
        }
    }

    /// Create an atom that already belongs to the structure topped by `root`.
    pub fn with_root(value: impl Into<String>, root: &Element) -> Self {
        let atom = Self::new(value);
        atom.node.link.point_at(&root.root(), &Element::from(&atom));
        atom
    }

    pub fn value(&self) -> Result<String> {
        let slot = self.node.cell.access(self.wait_timeout())?;
        Ok(slot.data.clone())
    }

    pub fn set_value(&self, value: impl Into<String>) -> Result<()> {
        let mut slot = self.node.cell.access(self.wait_timeout())?;
        slot.data = value.into();
        Ok(())
    }

    pub fn print(&self) -> Result<String> {
        self.value()
    }

    /// Snapshot the current value. Does not wait for transaction ownership.
    pub fn create_memento(&self) -> Result<AtomMemento> {
        let slot = self.node.cell.raw()?;
        Ok(AtomMemento::capture(&slot.data))
    }

    pub fn set_memento(&self, memento: &AtomMemento) -> Result<()> {
        let mut slot = self.node.cell.access(self.wait_timeout())?;
        memento.restore(&mut slot.data);
        Ok(())
    }

    pub fn root(&self) -> Element {
        self.node.link.resolve(|| Element::from(self))
    }

    pub fn active_token(&self) -> Result<Option<TransactionToken>> {
        self.node.cell.owner()
    }

    pub fn ptr_eq(&self, other: &Atom) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    fn wait_timeout(&self) -> Option<Duration> {
        self.root().config().lock_wait_timeout
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Atom@{:p}", Arc::as_ptr(&self.node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::List;

    #[test]
    fn test_value_and_set_value() {
        let atom = Atom::new("hello");
        assert_eq!(atom.value().unwrap(), "hello");
        assert_eq!(atom.print().unwrap(), "hello");

        atom.set_value("bye").unwrap();
        assert_eq!(atom.value().unwrap(), "bye");
    }

    #[test]
    fn test_memento_restores_value() {
        let atom = Atom::new("v1");
        let memento = atom.create_memento().unwrap();
        atom.set_value("v2").unwrap();

        atom.set_memento(&memento).unwrap();
        assert_eq!(atom.value().unwrap(), "v1");
        assert_eq!(memento.value(), "v1");
    }

    #[test]
    fn test_with_root_points_at_ultimate_top() {
        let top = List::new();
        let middle = List::with_root(&Element::from(&top));
        let atom = Atom::with_root("x", &Element::from(&middle));

        assert!(atom.root().ptr_eq(&Element::from(&top)));
    }
}
