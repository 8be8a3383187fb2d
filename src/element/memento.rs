use super::Element;
use im::Vector;
use std::fmt;

/// Immutable snapshot of one node's state.
#[derive(Debug, Clone)]
pub enum Memento {
    Atom(AtomMemento),
    List(ListMemento),
}

impl Memento {
    pub fn kind(&self) -> &'static str {
        match self {
            Memento::Atom(_) => "atom",
            Memento::List(_) => "list",
        }
    }
}

impl From<AtomMemento> for Memento {
    fn from(memento: AtomMemento) -> Self {
        Memento::Atom(memento)
    }
}

impl From<ListMemento> for Memento {
    fn from(memento: ListMemento) -> Self {
        Memento::List(memento)
    }
}

/// Copy of an atom's value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomMemento {
    value: String,
}

impl AtomMemento {
    pub(crate) fn capture(value: &str) -> Self {
        Self {
            value: value.to_string(),
        }
    }

    pub(crate) fn restore(&self, target: &mut String) {
        target.clone_from(&self.value);
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Shallow copy of a list's child sequence: same child identities, no deep
/// copy of the subtrees. `im::Vector` shares structure, so capturing is O(1).
#[derive(Clone)]
pub struct ListMemento {
    children: Vector<Element>,
}

impl ListMemento {
    pub(crate) fn capture(children: &Vector<Element>) -> Self {
        Self {
            children: children.clone(),
        }
    }

    pub(crate) fn restore(&self, target: &mut Vector<Element>) {
        *target = self.children.clone();
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter()
    }
}

impl fmt::Debug for ListMemento {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.children.iter()).finish()
    }
}
