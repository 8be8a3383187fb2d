use super::{TransactionState, TransactionToken};
use crate::core::Result;
use crate::element::List;
use log::{debug, warn};

/// Scoped transaction on a [`List`].
///
/// Rolls back on drop unless `commit` or `rollback` was called. The guard has
/// to be dropped on the thread that created it; a drop elsewhere cannot
/// finish the transaction and only logs a warning.
///
/// ```
/// use sexpr_tree::{Atom, List};
///
/// # fn main() -> sexpr_tree::Result<()> {
/// let root = List::new();
/// root.add(Atom::new("a"))?;
///
/// {
///     let _txn = root.begin()?;
///     root.add(Atom::new("discarded"))?;
/// }
/// assert_eq!(root.print()?, "(a )");
///
/// let txn = root.begin()?;
/// root.add(Atom::new("kept"))?;
/// txn.commit()?;
/// assert_eq!(root.print()?, "(a kept )");
/// # Ok(())
/// # }
/// ```
pub struct TransactionGuard {
    list: List,
    token: TransactionToken,
    state: TransactionState,
}

impl TransactionGuard {
    pub(crate) fn new(list: List, token: TransactionToken) -> Self {
        Self {
            list,
            token,
            state: TransactionState::Active,
        }
    }

    pub fn token(&self) -> TransactionToken {
        self.token
    }

    pub fn list(&self) -> &List {
        &self.list
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn commit(mut self) -> Result<()> {
        self.close(TransactionState::Committed)
    }

    pub fn rollback(mut self) -> Result<()> {
        self.close(TransactionState::Aborted)
    }

    fn close(&mut self, outcome: TransactionState) -> Result<()> {
        self.list.finish(outcome, Some(self.token))?;
        self.state = outcome;
        Ok(())
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        if !self.state.is_active() {
            return;
        }
        match self.close(TransactionState::Aborted) {
            Ok(()) => debug!("{} rolled back by guard drop", self.token),
            Err(err) => warn!("{} could not roll back on drop: {}", self.token, err),
        }
    }
}
