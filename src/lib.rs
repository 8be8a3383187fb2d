// ============================================================================
// sexpr-tree Library
// ============================================================================
//
// In-memory tree of atoms and lists with transactional multi-node edits.
// A transaction started on a list locks that list and its whole subtree under
// one token; other threads block on locked nodes until commit or rollback,
// while disjoint subtrees stay available to everyone else.
//
// ============================================================================

//! # Examples
//!
//! ```
//! use sexpr_tree::{Atom, List};
//!
//! # fn main() -> sexpr_tree::Result<()> {
//! let root = List::new();
//! root.add(Atom::new("hello"))?;
//! root.add(Atom::new("world"))?;
//! assert_eq!(root.print()?, "(hello world )");
//!
//! root.transaction_start()?;
//! root.add(Atom::new("draft"))?;
//! root.transaction_rollback()?;
//! assert_eq!(root.print()?, "(hello world )");
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod element;
mod print;
pub mod transaction;

pub use crate::core::{BoundsPolicy, Result, TreeConfig, TreeError};
pub use element::{Atom, AtomMemento, Element, List, ListMemento, Memento};
pub use print::print;
pub use transaction::{
    TransactionGuard, TransactionId, TransactionInfo, TransactionState, TransactionToken,
};
