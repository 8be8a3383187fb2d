// ============================================================================
// Node Cell
// ============================================================================
//
// Per-node concurrency primitive. The mutex is held only for the duration of
// one operation; transaction ownership is the stored lease, so a transaction
// can span many calls without keeping a guard alive.
//
// - access(): wait while another thread's transaction owns the node
// - claim():  stamp a lease without waiting (lock walk)
// - release(): clear the lease and wake waiters
//
// ============================================================================

use crate::core::{Result, TreeError};
use crate::transaction::{Lease, TransactionToken};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

pub(crate) struct Slot<S> {
    pub(crate) lease: Option<Lease>,
    pub(crate) data: S,
}

impl<S> Slot<S> {
    pub(crate) fn owner(&self) -> Option<TransactionToken> {
        self.lease.as_ref().map(|lease| lease.token)
    }

    fn accessible(&self) -> bool {
        self.owner()
            .is_none_or(|token| token.is_held_by_current_thread())
    }
}

pub(crate) enum Claim<'a, S> {
    Acquired(MutexGuard<'a, Slot<S>>),
    /// The node already carries this lease (reached twice through a shared child)
    AlreadyHeld,
}

pub(crate) struct NodeCell<S> {
    slot: Mutex<Slot<S>>,
    released: Condvar,
}

impl<S> NodeCell<S> {
    pub(crate) fn new(data: S) -> Self {
        Self {
            slot: Mutex::new(Slot { lease: None, data }),
            released: Condvar::new(),
        }
    }

    /// Lock the slot regardless of transaction ownership.
    pub(crate) fn raw(&self) -> Result<MutexGuard<'_, Slot<S>>> {
        Ok(self.slot.lock()?)
    }

    /// Lock the slot for the calling thread, waiting while a transaction
    /// owned by another thread holds the node.
    pub(crate) fn access(&self, timeout: Option<Duration>) -> Result<MutexGuard<'_, Slot<S>>> {
        let guard = self.slot.lock()?;

        match timeout {
            None => Ok(self.released.wait_while(guard, |slot| !slot.accessible())?),
            Some(limit) => {
                let (guard, wait) = self
                    .released
                    .wait_timeout_while(guard, limit, |slot| !slot.accessible())?;
                if wait.timed_out() && !guard.accessible() {
                    return Err(TreeError::LockTimeout(limit));
                }
                Ok(guard)
            }
        }
    }

    /// Stamp `lease` on the node. Never waits for ownership.
    pub(crate) fn claim(&self, lease: &Lease) -> Result<Claim<'_, S>> {
        let mut slot = self.slot.lock()?;

        match slot.owner() {
            Some(held) if held == lease.token => Ok(Claim::AlreadyHeld),
            Some(held) => Err(TreeError::TransactionConflict(held)),
            None => {
                slot.lease = Some(lease.clone());
                Ok(Claim::Acquired(slot))
            }
        }
    }

    /// Clear `token` if it still owns the node. Returns whether it did.
    pub(crate) fn release(&self, token: TransactionToken) -> Result<bool> {
        let mut slot = self.slot.lock()?;
        let released = slot.owner() == Some(token);
        if released {
            slot.lease = None;
        }
        drop(slot);

        if released {
            self.released.notify_all();
        }
        Ok(released)
    }

    pub(crate) fn owner(&self) -> Result<Option<TransactionToken>> {
        Ok(self.slot.lock()?.owner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, mpsc};
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_claim_and_release() {
        let cell = NodeCell::new(1);
        let lease = Lease::new(TransactionToken::mint());
        let token = lease.token;

        assert!(matches!(cell.claim(&lease).unwrap(), Claim::Acquired(_)));
        assert!(matches!(cell.claim(&lease).unwrap(), Claim::AlreadyHeld));
        assert_eq!(cell.owner().unwrap(), Some(token));

        let other = TransactionToken::mint();
        assert!(matches!(
            cell.claim(&Lease::new(other)),
            Err(TreeError::TransactionConflict(held)) if held == token
        ));

        assert!(!cell.release(other).unwrap());
        assert!(cell.release(token).unwrap());
        assert_eq!(cell.owner().unwrap(), None);
    }

    #[test]
    fn test_owner_thread_passes_through() {
        let cell = NodeCell::new(String::from("a"));
        let lease = Lease::new(TransactionToken::mint());
        let token = lease.token;
        drop(cell.claim(&lease).unwrap());

        let mut slot = cell.access(Some(Duration::from_millis(10))).unwrap();
        slot.data.push('b');
        drop(slot);

        assert_eq!(cell.raw().unwrap().data, "ab");
    }

    #[test]
    fn test_other_thread_times_out() {
        let cell = Arc::new(NodeCell::new(0));
        let lease = Lease::new(TransactionToken::mint());
        let token = lease.token;
        drop(cell.claim(&lease).unwrap());

        let waiter = Arc::clone(&cell);
        let result = thread::spawn(move || {
            waiter
                .access(Some(Duration::from_millis(30)))
                .map(|slot| slot.data)
        })
        .join()
        .unwrap();

        assert!(matches!(result, Err(TreeError::LockTimeout(_))));
    }

    #[test]
    fn test_other_thread_wakes_on_release() {
        let cell = Arc::new(NodeCell::new(0));
        let lease = Lease::new(TransactionToken::mint());
        let token = lease.token;
        drop(cell.claim(&lease).unwrap());

        let (ready_tx, ready_rx) = mpsc::channel();
        let waiter = Arc::clone(&cell);
        let handle = thread::spawn(move || {
            ready_tx.send(()).unwrap();
            let started = Instant::now();
            let mut slot = waiter.access(None).unwrap();
            slot.data += 1;
            started.elapsed()
        });

        ready_rx.recv().unwrap();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(cell.raw().unwrap().data, 0);

        cell.release(token).unwrap();
        let waited = handle.join().unwrap();

        assert!(waited >= Duration::from_millis(40));
        assert_eq!(cell.raw().unwrap().data, 1);
    }
}
