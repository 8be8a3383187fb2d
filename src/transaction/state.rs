// ============================================================================
// Transaction State
// ============================================================================
//
// Identity and lifecycle of a tree transaction:
// - TransactionId: process-wide monotonically increasing counter
// - TransactionState: Active -> Committed / Aborted
// - TransactionFrame: what a List keeps on its history stack per open
//   transaction (token, memento of its children, the locked set)
//
// ============================================================================

use super::{LockedSet, TransactionToken};
use crate::element::ListMemento;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Global transaction ID counter
static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Generate a new unique transaction ID
    pub(crate) fn next() -> Self {
        TransactionId(NEXT_TXN_ID.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn_{}", self.0)
    }
}

/// Transaction state
///
/// ```text
/// Active ──commit──> Committed
///   │
///   └──rollback──> Aborted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

impl TransactionState {
    pub fn is_active(&self) -> bool {
        matches!(self, TransactionState::Active)
    }
}

/// One entry of a List's transaction history.
pub(crate) struct TransactionFrame {
    pub(crate) token: TransactionToken,
    pub(crate) memento: ListMemento,
    pub(crate) locked: LockedSet,
    started_at: Instant,
}

impl TransactionFrame {
    pub(crate) fn new(token: TransactionToken, memento: ListMemento, locked: LockedSet) -> Self {
        Self {
            token,
            memento,
            locked,
            started_at: Instant::now(),
        }
    }

    pub(crate) fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Snapshot of the innermost open transaction on a List
#[derive(Debug, Clone)]
pub struct TransactionInfo {
    pub token: TransactionToken,
    /// Open transactions started at this list
    pub depth: usize,
    /// Nodes stamped by the lock walk
    pub locked_nodes: usize,
    pub duration: Duration,
}
