// ============================================================================
// Transaction Manager
// ============================================================================
//
// Transactions are rooted at a List:
// - start:    lock walk over the subtree, then push a frame holding a memento
//             of the list's own children and the locked set
// - commit:   pop the frame, discard the memento, release the locked set
// - rollback: pop the frame, restore the memento, release the locked set
//
// Rollback restores only the child sequence of the list the transaction was
// started on; descendants swept into the walk are locked, not snapshotted.
//
// ============================================================================

use super::walk::lock_subtree;
use super::{TransactionFrame, TransactionGuard, TransactionInfo, TransactionState, TransactionToken};
use crate::core::{Result, TreeError};
use crate::element::cell::Slot;
use crate::element::list::ListState;
use crate::element::root::adopt_root;
use crate::element::{Element, List, ListMemento};
use log::debug;

impl List {
    /// Lock this list and its whole subtree under a fresh token.
    ///
    /// Fails immediately with `TransactionConflict` if any node of the
    /// subtree is held by another transaction; nothing stays locked then.
    pub fn transaction_start(&self) -> Result<TransactionToken> {
        let token = TransactionToken::mint();
        let locked = lock_subtree(&Element::from(self), token)?;
        let locked_nodes = locked.len();

        let depth = {
            let mut slot = self.node.cell.raw()?;
            let memento = ListMemento::capture(&slot.data.children);
            slot.data
                .history
                .push(TransactionFrame::new(token, memento, locked));
            slot.data.history.len()
        };

        debug!(
            "{} started: {} node(s) locked, history depth {}",
            token, locked_nodes, depth
        );
        Ok(token)
    }

    /// Keep every change made since `transaction_start` and unlock the subtree.
    pub fn transaction_commit(&self) -> Result<()> {
        self.finish(TransactionState::Committed, None)
    }

    /// Restore the children captured at `transaction_start` and unlock the subtree.
    pub fn transaction_rollback(&self) -> Result<()> {
        self.finish(TransactionState::Aborted, None)
    }

    /// Start a transaction that rolls back when the guard is dropped.
    pub fn begin(&self) -> Result<TransactionGuard> {
        let token = self.transaction_start()?;
        Ok(TransactionGuard::new(self.clone(), token))
    }

    /// Innermost open transaction started at this list
    pub fn transaction_info(&self) -> Result<Option<TransactionInfo>> {
        let slot = self.node.cell.raw()?;
        let depth = slot.data.history.len();

        Ok(slot.data.history.last().map(|frame| TransactionInfo {
            token: frame.token,
            depth,
            locked_nodes: frame.locked.len(),
            duration: frame.duration(),
        }))
    }

    /// Number of open transactions started at this list
    pub fn history_depth(&self) -> Result<usize> {
        Ok(self.node.cell.raw()?.data.history.len())
    }

    pub fn in_transaction(&self) -> Result<bool> {
        Ok(self.history_depth()? > 0)
    }

    /// Close the innermost transaction. With `expected`, only that token's
    /// frame may be closed.
    pub(crate) fn finish(
        &self,
        outcome: TransactionState,
        expected: Option<TransactionToken>,
    ) -> Result<()> {
        let op = match outcome {
            TransactionState::Aborted => "rollback",
            _ => "commit",
        };

        let (mut frame, restored) = {
            let mut slot = self.node.cell.raw()?;
            let frame = pop_frame(&mut slot, op, expected)?;

            if outcome == TransactionState::Aborted {
                frame.memento.restore(&mut slot.data.children);
                (frame, Some(slot.data.children.clone()))
            } else {
                (frame, None)
            }
        };

        if let Some(children) = restored {
            let root = self.root();
            for child in children.iter() {
                adopt_root(child, &root)?;
            }
        }

        frame.locked.release()?;

        match outcome {
            TransactionState::Aborted => {
                debug!("{} rolled back after {:?}", frame.token, frame.duration())
            }
            _ => debug!("{} committed after {:?}", frame.token, frame.duration()),
        }
        Ok(())
    }
}

fn pop_frame(
    slot: &mut Slot<ListState>,
    op: &'static str,
    expected: Option<TransactionToken>,
) -> Result<TransactionFrame> {
    let Some(top) = slot.data.history.last() else {
        return Err(TreeError::NoActiveTransaction(op));
    };

    if expected.is_some_and(|token| token != top.token) {
        return Err(TreeError::NoActiveTransaction(op));
    }
    if !top.token.is_held_by_current_thread() {
        return Err(TreeError::NotTransactionOwner(top.token));
    }

    slot.data
        .history
        .pop()
        .ok_or(TreeError::NoActiveTransaction(op))
}
