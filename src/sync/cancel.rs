//! Cooperative cancellation of blocking waits.
//!
//! Threads can't be interrupted from the outside, so a thread that may need
//! to give up a blocking wait passes a [`CancellationToken`] to the
//! cancellable variant of the operation. Calling [`CancellationToken::cancel`]
//! from any thread wakes every wait that uses the token.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use tracing::trace;

/// A structure whose parked threads can be woken up so that they re-check
/// their cancellation token.
pub(crate) trait Interrupt: Send + Sync {
    /// Wakes every thread parked on `self`.
    ///
    /// Implementations must acquire the lock the parked threads check their
    /// token under before notifying them, otherwise the wake-up can be lost.
    fn interrupt(&self);
}

#[derive(Default)]
struct Waiters {
    next_id: u64,
    entries: Vec<(u64, Arc<dyn Interrupt>)>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    waiters: Mutex<Waiters>,
}

impl Inner {
    fn waiters(&self) -> MutexGuard<'_, Waiters> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A token used to cancel blocking queue operations.
///
/// Clones share the same state: cancelling one cancels all of them.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// Creates a token that isn't cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token, waking every thread currently waiting on an
    /// operation that uses it. Calling this more than once has no further
    /// effect.
    pub fn cancel(&self) {
        let was_cancelled = self.inner.cancelled.swap(true, Ordering::SeqCst);
        // The registry lock is held while interrupting, so a waiter can't
        // unregister (and its queue can't go away) underneath us.
        let waiters = self.inner.waiters();
        trace!(
            waiters = waiters.entries.len(),
            was_cancelled,
            "cancelling token"
        );
        for (_, waiter) in &waiters.entries {
            waiter.interrupt();
        }
    }

    /// Returns true if [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Registers a structure to interrupt on cancellation for as long as the
    /// returned guard lives.
    ///
    /// Must not be called while holding a lock that [`Interrupt::interrupt`]
    /// acquires.
    pub(crate) fn register(&self, waiter: Arc<dyn Interrupt>) -> Registration<'_> {
        let mut waiters = self.inner.waiters();
        let id = waiters.next_id;
        waiters.next_id += 1;
        waiters.entries.push((id, waiter));
        Registration { token: self, id }
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Keeps a waiter registered with a [`CancellationToken`].
pub(crate) struct Registration<'a> {
    token: &'a CancellationToken,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let mut waiters = self.token.inner.waiters();
        if let Some(pos) = waiters.entries.iter().position(|(id, _)| *id == self.id) {
            waiters.entries.swap_remove(pos);
        }
    }
}
