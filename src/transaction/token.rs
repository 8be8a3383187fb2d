use super::TransactionId;
use std::fmt;
use std::thread::{self, ThreadId};

/// Identity of the transaction holding a node.
///
/// Stamped on every node swept into one transaction. The owning thread may
/// keep operating on stamped nodes; every other thread waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionToken {
    id: TransactionId,
    owner: ThreadId,
}

impl TransactionToken {
    /// Mint a token owned by the calling thread
    pub fn mint() -> Self {
        Self {
            id: TransactionId::next(),
            owner: thread::current().id(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    pub fn is_held_by_current_thread(&self) -> bool {
        self.owner == thread::current().id()
    }
}

impl fmt::Display for TransactionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.id, self.owner)
    }
}
