// ============================================================================
// Transaction Module
// ============================================================================
//
// All-or-nothing edits over a subtree:
// - TransactionToken: identity stamped on every node of one transaction
// - walk: pre-order lock walk recording the exact locked set
// - manager: start / commit / rollback on List, memento history
// - guard: RAII rollback for scoped transactions
//
// ============================================================================

pub mod guard;
mod manager;
pub mod state;
pub mod token;
mod walk;

pub use guard::TransactionGuard;
pub use state::{TransactionId, TransactionInfo, TransactionState};
pub use token::TransactionToken;

pub(crate) use state::TransactionFrame;
pub(crate) use walk::{Lease, LockedSet};
